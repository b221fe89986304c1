use std::time::Duration;

use serde_json::Value;
use sysinfo::{Pid, ProcessRefreshKind, ProcessesToUpdate, System, UpdateKind};
use tokio::time::{Interval, MissedTickBehavior};
use tracing::debug;

use super::process::ProcessRecord;
use super::snapshot::Snapshot;
use super::source::{NameResolver, SnapshotSession, SnapshotSource};
use crate::error::StreamFault;

/// Samples the process table of the machine this binary runs on.
#[derive(Debug, Clone)]
pub struct LocalSampler {
    interval: Duration,
}

impl LocalSampler {
    /// CPU usage is a delta between refreshes, so the interval never drops
    /// below what sysinfo needs to produce a meaningful reading.
    pub fn new(interval: Duration) -> Self {
        Self {
            interval: interval.max(sysinfo::MINIMUM_CPU_UPDATE_INTERVAL),
        }
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }
}

impl SnapshotSource for LocalSampler {
    type Session = LocalSession;

    fn description(&self) -> String {
        format!("local sampler every {} ms", self.interval.as_millis())
    }

    async fn open(&mut self) -> Result<LocalSession, StreamFault> {
        Ok(LocalSession::new(self.interval))
    }
}

pub struct LocalSession {
    sys: System,
    ticker: Interval,
    ticks: u64,
}

impl LocalSession {
    fn new(interval: Duration) -> Self {
        let mut ticker = tokio::time::interval(interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
        LocalSession {
            sys: System::new(),
            ticker,
            ticks: 0,
        }
    }

    fn refresh(&mut self) -> Snapshot {
        self.sys.refresh_processes_specifics(
            ProcessesToUpdate::All,
            true,
            ProcessRefreshKind::nothing().with_memory().with_cpu(),
        );
        // sysinfo reports 0% until it has two samples to diff.
        let cpu_ready = self.ticks > 0;
        self.ticks += 1;

        let mut records: Vec<ProcessRecord> = self
            .sys
            .processes()
            .iter()
            .filter(|(_, process)| process.thread_kind().is_none())
            .map(|(pid, process)| {
                let mut record = ProcessRecord::new(
                    pid.as_u32(),
                    process.name().to_string_lossy().to_string(),
                )
                .with_phys_footprint(process.memory())
                .with_attribute(
                    "ppid",
                    process
                        .parent()
                        .map(|p| Value::from(p.as_u32()))
                        .unwrap_or(Value::Null),
                )
                .with_attribute("status", process.status().to_string())
                .with_attribute("virtualMemory", process.virtual_memory())
                .with_attribute("startTime", process.start_time());
                if cpu_ready {
                    record.cpu_usage = Some(f64::from(process.cpu_usage()));
                }
                record
            })
            .collect();
        records.sort_unstable_by_key(|r| r.pid);

        debug!(tick = self.ticks, processes = records.len(), "sampled process table");
        Snapshot::new(records)
    }
}

impl SnapshotSession for LocalSession {
    async fn next_snapshot(&mut self) -> Result<Option<Snapshot>, StreamFault> {
        self.ticker.tick().await;
        Ok(Some(self.refresh()))
    }
}

/// Resolves exec names against the local process table.
pub struct LocalResolver {
    sys: System,
    fallback: String,
}

impl LocalResolver {
    pub fn new(fallback: impl Into<String>) -> Self {
        Self {
            sys: System::new(),
            fallback: fallback.into(),
        }
    }
}

impl NameResolver for LocalResolver {
    fn lookup(&mut self, pid: u32) -> Option<String> {
        let sys_pid = Pid::from_u32(pid);
        self.sys.refresh_processes_specifics(
            ProcessesToUpdate::Some(&[sys_pid]),
            true,
            ProcessRefreshKind::nothing().with_exe(UpdateKind::OnlyIfNotSet),
        );
        self.sys
            .process(sys_pid)
            .and_then(|p| p.exe())
            .map(|path| path.display().to_string())
    }

    fn fallback(&self) -> &str {
        &self.fallback
    }
}
