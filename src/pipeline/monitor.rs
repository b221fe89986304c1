use std::future::Future;
use std::pin::pin;

use serde::Serialize;
use tracing::{debug, info, warn};

use crate::error::StreamFault;
use crate::filter::by_threshold;
use crate::format::format_bytes;
use crate::system::process::MonitorEntry;
use crate::system::source::{SnapshotSession, SnapshotSource};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MonitorState {
    Connecting,
    Streaming,
    Stopped,
}

/// Everything at or above the threshold for one delivered snapshot.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MonitorTick {
    pub tick: u64,
    pub entries: Vec<MonitorEntry>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MonitorSummary {
    pub ticks: u64,
}

/// Streams threshold matches until `shutdown` resolves.
///
/// Every delivered snapshot produces exactly one [`MonitorTick`], possibly
/// with no entries. No warm-up skip is needed: the first snapshot carries no
/// `cpuUsage`, which the threshold filter already drops. The stream ending or
/// failing is fatal and returned as-is; there are no retries. The session is
/// dropped on every exit path.
pub async fn run<S, F, K>(
    source: &mut S,
    threshold: f64,
    shutdown: F,
    mut sink: K,
) -> Result<MonitorSummary, StreamFault>
where
    S: SnapshotSource,
    F: Future<Output = ()>,
    K: FnMut(&MonitorTick),
{
    let mut shutdown = pin!(shutdown);
    transition(MonitorState::Connecting);
    info!(source = %source.description(), threshold, "opening snapshot source");

    let mut session = tokio::select! {
        biased;
        () = &mut shutdown => {
            transition(MonitorState::Stopped);
            return Ok(MonitorSummary { ticks: 0 });
        }
        opened = source.open() => opened?,
    };
    transition(MonitorState::Streaming);

    let mut ticks = 0;
    loop {
        let next = tokio::select! {
            biased;
            () = &mut shutdown => break,
            next = session.next_snapshot() => next,
        };
        let snapshot = match next {
            Ok(Some(snapshot)) => snapshot,
            Ok(None) => {
                warn!(ticks, "snapshot stream closed");
                return Err(StreamFault::EndOfStream { delivered: ticks });
            }
            Err(err) => {
                warn!(ticks, error = %err, "snapshot stream failed");
                return Err(err);
            }
        };
        ticks += 1;

        let entries = by_threshold(&snapshot, threshold)
            .iter()
            .filter_map(MonitorEntry::from_record)
            .collect();
        sink(&MonitorTick { tick: ticks, entries });
    }

    drop(session);
    transition(MonitorState::Stopped);
    Ok(MonitorSummary { ticks })
}

fn transition(state: MonitorState) {
    debug!(?state, "monitor state");
}

/// Default sink: one structured event per tick.
pub fn log_tick(tick: &MonitorTick) {
    let entries = render_entries(tick);
    info!(
        tick = tick.tick,
        matched = tick.entries.len(),
        entries = %entries,
        "processes at or above threshold"
    );
    for entry in &tick.entries {
        debug!(
            pid = entry.pid,
            name = %entry.name,
            cpu_usage = entry.cpu_usage,
            footprint = %format_bytes(entry.phys_footprint),
            "match"
        );
    }
}

/// JSON array of the tick's entries; Debug text if serialization fails.
fn render_entries(tick: &MonitorTick) -> String {
    serde_json::to_string(&tick.entries).unwrap_or_else(|err| {
        warn!(tick = tick.tick, error = %err, "failed to serialize matched entries");
        format!("{:?}", tick.entries)
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::system::process::ProcessRecord;
    use crate::system::snapshot::Snapshot;
    use std::collections::VecDeque;

    struct Script(VecDeque<Snapshot>);

    impl SnapshotSource for Script {
        type Session = ScriptSession;

        fn description(&self) -> String {
            "script".to_string()
        }

        async fn open(&mut self) -> Result<ScriptSession, StreamFault> {
            Ok(ScriptSession(std::mem::take(&mut self.0)))
        }
    }

    struct ScriptSession(VecDeque<Snapshot>);

    impl SnapshotSession for ScriptSession {
        async fn next_snapshot(&mut self) -> Result<Option<Snapshot>, StreamFault> {
            Ok(self.0.pop_front())
        }
    }

    #[tokio::test]
    async fn shutdown_before_open_emits_nothing() {
        let mut source = Script(VecDeque::from(vec![Snapshot::default()]));
        let mut emitted = 0;
        let summary = run(&mut source, 0.0, async {}, |_| emitted += 1)
            .await
            .unwrap();
        assert_eq!(summary.ticks, 0);
        assert_eq!(emitted, 0);
    }

    #[tokio::test]
    async fn end_of_stream_is_fatal() {
        let mut source = Script(VecDeque::from(vec![Snapshot::new(vec![
            ProcessRecord::new(1, "a"),
        ])]));
        let mut ticks = Vec::new();
        let err = run(&mut source, 0.0, std::future::pending(), |t| ticks.push(t.clone()))
            .await
            .unwrap_err();
        assert!(matches!(err, StreamFault::EndOfStream { delivered: 1 }));
        assert_eq!(ticks.len(), 1);
        assert!(ticks[0].entries.is_empty());
    }

    #[test]
    fn entries_render_as_json_array() {
        let tick = MonitorTick {
            tick: 3,
            entries: vec![MonitorEntry {
                pid: 2,
                name: "b".to_string(),
                cpu_usage: 5.0,
                phys_footprint: 0,
            }],
        };
        assert_eq!(
            render_entries(&tick),
            r#"[{"pid":2,"name":"b","cpuUsage":5.0,"physFootprint":0}]"#
        );
        assert_eq!(render_entries(&MonitorTick { tick: 4, entries: Vec::new() }), "[]");
    }
}
