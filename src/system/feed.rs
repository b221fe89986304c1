//! Newline-delimited JSON snapshot feed.
//!
//! Each non-blank line is one snapshot: a JSON array of process records.
//! The feed is read from a recorded file or from a TCP endpoint exposed by a
//! remote sampling service.

use std::fmt;
use std::path::PathBuf;
use std::time::Duration;

use tokio::io::{AsyncBufRead, AsyncBufReadExt, BufReader, Lines};
use tokio::net::TcpStream;
use tokio::time::{Interval, MissedTickBehavior};
use tracing::info;

use super::snapshot::Snapshot;
use super::source::{SnapshotSession, SnapshotSource};
use crate::error::StreamFault;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Endpoint {
    /// Replays a recording; ticks are paced locally.
    File(PathBuf),
    /// Live feed; the remote side sets the pace.
    Tcp(String),
}

impl fmt::Display for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Endpoint::File(path) => write!(f, "file: {}", path.display()),
            Endpoint::Tcp(addr) => write!(f, "tcp: {addr}"),
        }
    }
}

#[derive(Debug, Clone)]
pub struct FeedSource {
    endpoint: Endpoint,
    pace: Option<Duration>,
}

impl FeedSource {
    pub fn replay(path: impl Into<PathBuf>, pace: Option<Duration>) -> Self {
        Self {
            endpoint: Endpoint::File(path.into()),
            pace,
        }
    }

    pub fn connect(addr: impl Into<String>) -> Self {
        Self {
            endpoint: Endpoint::Tcp(addr.into()),
            pace: None,
        }
    }

    pub fn endpoint(&self) -> &Endpoint {
        &self.endpoint
    }
}

impl SnapshotSource for FeedSource {
    type Session = FeedSession;

    fn description(&self) -> String {
        self.endpoint.to_string()
    }

    async fn open(&mut self) -> Result<FeedSession, StreamFault> {
        let reader: Box<dyn AsyncBufRead + Unpin + Send> = match &self.endpoint {
            Endpoint::File(path) => {
                let file = tokio::fs::File::open(path)
                    .await
                    .map_err(|source| StreamFault::Connect {
                        endpoint: self.endpoint.to_string(),
                        source,
                    })?;
                Box::new(BufReader::new(file))
            }
            Endpoint::Tcp(addr) => {
                let stream =
                    TcpStream::connect(addr.as_str())
                        .await
                        .map_err(|source| StreamFault::Connect {
                            endpoint: self.endpoint.to_string(),
                            source,
                        })?;
                Box::new(BufReader::new(stream))
            }
        };
        info!(endpoint = %self.endpoint, "snapshot feed opened");

        let mut session = FeedSession::new(reader);
        if let Some(pace) = self.pace.filter(|p| !p.is_zero()) {
            session = session.paced(pace);
        }
        Ok(session)
    }
}

pub struct FeedSession {
    lines: Lines<Box<dyn AsyncBufRead + Unpin + Send>>,
    line_no: usize,
    pacer: Option<Interval>,
}

impl FeedSession {
    pub fn new<R>(reader: R) -> Self
    where
        R: AsyncBufRead + Unpin + Send + 'static,
    {
        let boxed: Box<dyn AsyncBufRead + Unpin + Send> = Box::new(reader);
        Self {
            lines: boxed.lines(),
            line_no: 0,
            pacer: None,
        }
    }

    /// Deliver at most one snapshot per `pace`.
    pub fn paced(mut self, pace: Duration) -> Self {
        let mut pacer = tokio::time::interval(pace);
        pacer.set_missed_tick_behavior(MissedTickBehavior::Delay);
        self.pacer = Some(pacer);
        self
    }
}

impl SnapshotSession for FeedSession {
    async fn next_snapshot(&mut self) -> Result<Option<Snapshot>, StreamFault> {
        loop {
            let Some(line) = self.lines.next_line().await? else {
                return Ok(None);
            };
            self.line_no += 1;
            let trimmed = line.trim();
            if trimmed.is_empty() {
                continue;
            }
            if let Some(pacer) = self.pacer.as_mut() {
                pacer.tick().await;
            }
            let snapshot =
                serde_json::from_str(trimmed).map_err(|source| StreamFault::Decode {
                    line: self.line_no,
                    source,
                })?;
            return Ok(Some(snapshot));
        }
    }
}
