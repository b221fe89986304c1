pub mod monitor;
pub mod single;

use tracing::debug;

use crate::error::StreamFault;
use crate::system::snapshot::Snapshot;
use crate::system::source::SnapshotSession;

/// Number of leading ticks whose `cpuUsage` is not yet initialised.
pub const WARMUP_TICKS: u64 = 1;

/// Counts ticks of one session and rejects the warm-up ones.
#[derive(Debug, Default)]
pub struct WarmupGuard {
    delivered: u64,
}

impl WarmupGuard {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn delivered(&self) -> u64 {
        self.delivered
    }

    /// Records one delivered tick. Returns the snapshot only once the warm-up
    /// ticks have been consumed.
    pub fn admit(&mut self, snapshot: Snapshot) -> Option<Snapshot> {
        self.delivered += 1;
        if self.delivered <= WARMUP_TICKS {
            debug!(tick = self.delivered, "discarding warm-up snapshot");
            None
        } else {
            Some(snapshot)
        }
    }
}

/// Pulls from `session` until `guard` admits a snapshot. An early end of
/// stream is a fault, never an empty result.
pub async fn next_usable<S>(session: &mut S, guard: &mut WarmupGuard) -> Result<Snapshot, StreamFault>
where
    S: SnapshotSession,
{
    loop {
        let Some(snapshot) = session.next_snapshot().await? else {
            return Err(StreamFault::EndOfStream {
                delivered: guard.delivered(),
            });
        };
        if let Some(snapshot) = guard.admit(snapshot) {
            return Ok(snapshot);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn guard_rejects_only_the_first_tick() {
        let mut guard = WarmupGuard::new();
        assert!(guard.admit(Snapshot::default()).is_none());
        assert!(guard.admit(Snapshot::default()).is_some());
        assert!(guard.admit(Snapshot::default()).is_some());
        assert_eq!(guard.delivered(), 3);
    }
}
