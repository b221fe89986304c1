use thiserror::Error;

/// Caller-side mistakes detected before any snapshot is requested.
#[derive(Debug, Error)]
pub enum ConfigurationError {
    #[error("malformed attribute filter `{0}`: expected key=value")]
    MalformedAttribute(String),
}

/// The snapshot stream stopped delivering. Fatal for both pipeline modes.
#[derive(Debug, Error)]
pub enum StreamFault {
    #[error("snapshot stream ended after {delivered} snapshot(s)")]
    EndOfStream { delivered: u64 },

    #[error("failed to connect to sampling service at {endpoint}")]
    Connect {
        endpoint: String,
        #[source]
        source: std::io::Error,
    },

    #[error("transport error while waiting for the next snapshot")]
    Transport(#[from] std::io::Error),

    #[error("undecodable snapshot on line {line}")]
    Decode {
        line: usize,
        #[source]
        source: serde_json::Error,
    },
}

#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    Configuration(#[from] ConfigurationError),

    #[error(transparent)]
    Stream(#[from] StreamFault),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
