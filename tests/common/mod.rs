// Shared test helpers
#![allow(dead_code)]

use std::cell::Cell;
use std::collections::{HashMap, VecDeque};
use std::rc::Rc;

use sysmon::error::StreamFault;
use sysmon::system::process::ProcessRecord;
use sysmon::system::resolver::StaticResolver;
use sysmon::system::snapshot::Snapshot;
use sysmon::system::source::{SnapshotSession, SnapshotSource};

/// Counters shared between a scripted source and the test body.
#[derive(Clone, Default)]
pub struct Probe {
    pub opened: Rc<Cell<u32>>,
    pub requested: Rc<Cell<u32>>,
    pub released: Rc<Cell<bool>>,
}

/// Hands out a fixed sequence of ticks, then end of stream (or waits forever
/// when stalling).
pub struct ScriptedSource {
    ticks: VecDeque<Result<Snapshot, StreamFault>>,
    stall: bool,
    pub probe: Probe,
}

impl ScriptedSource {
    pub fn new(snapshots: Vec<Snapshot>) -> Self {
        Self::with_ticks(snapshots.into_iter().map(Ok).collect())
    }

    pub fn with_ticks(ticks: Vec<Result<Snapshot, StreamFault>>) -> Self {
        Self {
            ticks: ticks.into(),
            stall: false,
            probe: Probe::default(),
        }
    }

    /// Once the script runs out, `next_snapshot` never completes.
    pub fn stalling(mut self) -> Self {
        self.stall = true;
        self
    }
}

impl SnapshotSource for ScriptedSource {
    type Session = ScriptedSession;

    fn description(&self) -> String {
        format!("scripted ({} ticks)", self.ticks.len())
    }

    async fn open(&mut self) -> Result<ScriptedSession, StreamFault> {
        self.probe.opened.set(self.probe.opened.get() + 1);
        Ok(ScriptedSession {
            ticks: std::mem::take(&mut self.ticks),
            stall: self.stall,
            probe: self.probe.clone(),
        })
    }
}

pub struct ScriptedSession {
    ticks: VecDeque<Result<Snapshot, StreamFault>>,
    stall: bool,
    probe: Probe,
}

impl SnapshotSession for ScriptedSession {
    async fn next_snapshot(&mut self) -> Result<Option<Snapshot>, StreamFault> {
        self.probe.requested.set(self.probe.requested.get() + 1);
        if self.ticks.is_empty() && self.stall {
            std::future::pending::<()>().await;
        }
        self.ticks.pop_front().transpose()
    }
}

impl Drop for ScriptedSession {
    fn drop(&mut self) {
        self.probe.released.set(true);
    }
}

/// The warm-up tick: same processes, no CPU reading yet.
pub fn warmup_of(snapshot: &Snapshot) -> Snapshot {
    snapshot
        .iter()
        .map(|r| ProcessRecord {
            cpu_usage: None,
            ..r.clone()
        })
        .collect()
}

/// `[{pid:1, name:"a", cpuUsage:0.5}, {pid:2, name:"b", cpuUsage:5.0}]`
pub fn two_process_snapshot() -> Snapshot {
    Snapshot::new(vec![
        ProcessRecord::new(1, "a").with_cpu_usage(0.5),
        ProcessRecord::new(2, "b").with_cpu_usage(5.0),
    ])
}

pub fn resolver(names: &[(u32, &str)]) -> StaticResolver {
    let table: HashMap<u32, String> = names
        .iter()
        .map(|(pid, name)| (*pid, name.to_string()))
        .collect();
    StaticResolver::new(table, "")
}
