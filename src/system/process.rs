use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::format::{UNSET, format_float, format_value};

/// One row of the process table as reported by the sampling service.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProcessRecord {
    pub pid: u32,
    pub name: String,
    /// Unset on the first snapshot of a session: usage is a delta between ticks.
    #[serde(default)]
    pub cpu_usage: Option<f64>,
    #[serde(default)]
    pub phys_footprint: u64,
    /// Any further attributes the sampling service supplies.
    #[serde(flatten)]
    pub extra: BTreeMap<String, Value>,
}

impl ProcessRecord {
    pub fn new(pid: u32, name: impl Into<String>) -> Self {
        Self {
            pid,
            name: name.into(),
            cpu_usage: None,
            phys_footprint: 0,
            extra: BTreeMap::new(),
        }
    }

    pub fn with_cpu_usage(mut self, cpu_usage: f64) -> Self {
        self.cpu_usage = Some(cpu_usage);
        self
    }

    pub fn with_phys_footprint(mut self, bytes: u64) -> Self {
        self.phys_footprint = bytes;
        self
    }

    pub fn with_attribute(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.extra.insert(key.into(), value.into());
        self
    }

    /// Text form of the attribute named `key`, or `None` when the record has
    /// no such attribute. Unset values render as `None`.
    pub fn attribute(&self, key: &str) -> Option<String> {
        match key {
            "pid" => Some(self.pid.to_string()),
            "name" => Some(self.name.clone()),
            "cpuUsage" => Some(self.cpu_usage.map_or_else(|| UNSET.to_string(), format_float)),
            "physFootprint" => Some(self.phys_footprint.to_string()),
            _ => self.extra.get(key).map(format_value),
        }
    }
}

/// A record that survived a single-shot query, with its executable name attached.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct EnrichedRecord {
    #[serde(flatten)]
    pub record: ProcessRecord,
    #[serde(rename = "execName")]
    pub exec_name: String,
}

/// What the monitor loop reports for each process above the threshold.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MonitorEntry {
    pub pid: u32,
    pub name: String,
    pub cpu_usage: f64,
    pub phys_footprint: u64,
}

impl MonitorEntry {
    /// `None` when the record carries no usable CPU reading.
    pub fn from_record(record: &ProcessRecord) -> Option<Self> {
        Some(Self {
            pid: record.pid,
            name: record.name.clone(),
            cpu_usage: record.cpu_usage?,
            phys_footprint: record.phys_footprint,
        })
    }
}
