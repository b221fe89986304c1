//! Seams between the pipeline and whatever samples the process table.
//!
//! A [`SnapshotSource`] is opened once per invocation and yields an exclusively
//! owned [`SnapshotSession`]. The session is pull-based: each call to
//! [`SnapshotSession::next_snapshot`] suspends until the next sampling tick and
//! returns `Ok(None)` once the stream has ended. Dropping the session releases
//! whatever it holds (socket, file, sampler state).

use std::future::Future;

use tracing::debug;

use super::snapshot::Snapshot;
use crate::error::StreamFault;

pub trait SnapshotSource {
    type Session: SnapshotSession;

    /// Human-readable origin of the snapshots, used in log events.
    fn description(&self) -> String;

    fn open(&mut self) -> impl Future<Output = Result<Self::Session, StreamFault>>;
}

pub trait SnapshotSession {
    /// Waits for the next tick. `Ok(None)` marks the end of the stream; the
    /// session must not be polled again after that.
    fn next_snapshot(&mut self) -> impl Future<Output = Result<Option<Snapshot>, StreamFault>>;
}

/// Maps a pid to the executable behind it.
pub trait NameResolver {
    fn lookup(&mut self, pid: u32) -> Option<String>;

    /// Value reported when `lookup` misses, e.g. the process exited between
    /// the snapshot and the lookup.
    fn fallback(&self) -> &str {
        ""
    }

    fn resolve(&mut self, pid: u32) -> String {
        match self.lookup(pid) {
            Some(name) => name,
            None => {
                debug!(pid, "exec name unresolved, using fallback");
                self.fallback().to_string()
            }
        }
    }
}
