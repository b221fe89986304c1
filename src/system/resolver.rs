use std::collections::HashMap;
use std::path::Path;

use color_eyre::eyre::{Result, WrapErr};

use super::source::NameResolver;

/// Resolves exec names from a fixed pid table, for recorded or remote feeds
/// where the local process table means nothing.
#[derive(Debug, Default, Clone)]
pub struct StaticResolver {
    names: HashMap<u32, String>,
    fallback: String,
}

impl StaticResolver {
    pub fn new(names: HashMap<u32, String>, fallback: impl Into<String>) -> Self {
        Self {
            names,
            fallback: fallback.into(),
        }
    }

    /// Loads a JSON object mapping pids to exec names, e.g. `{"2": "/usr/bin/b"}`.
    pub fn from_path(path: &Path, fallback: impl Into<String>) -> Result<Self> {
        let contents = std::fs::read_to_string(path)
            .wrap_err_with(|| format!("failed to read exec names from {}", path.display()))?;
        let names: HashMap<u32, String> = serde_json::from_str(&contents)
            .wrap_err_with(|| format!("invalid exec name table in {}", path.display()))?;
        Ok(Self::new(names, fallback))
    }

    pub fn insert(&mut self, pid: u32, exec_name: impl Into<String>) {
        self.names.insert(pid, exec_name.into());
    }
}

impl NameResolver for StaticResolver {
    fn lookup(&mut self, pid: u32) -> Option<String> {
        self.names.get(&pid).cloned()
    }

    fn fallback(&self) -> &str {
        &self.fallback
    }
}
