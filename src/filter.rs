//! Snapshot filters. Pure functions over a snapshot; no I/O, no tick state.

use std::fmt;

use crate::error::ConfigurationError;
use crate::system::process::ProcessRecord;
use crate::system::snapshot::Snapshot;

/// Records with a defined `cpuUsage` at or above `threshold`, in snapshot order.
pub fn by_threshold(snapshot: &Snapshot, threshold: f64) -> Snapshot {
    snapshot
        .iter()
        .filter(|record| above_threshold(record, threshold))
        .cloned()
        .collect()
}

pub fn above_threshold(record: &ProcessRecord, threshold: f64) -> bool {
    record.cpu_usage.is_some_and(|usage| usage >= threshold)
}

/// One `key=value` constraint. The value is compared against the record's
/// attribute in text form.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttributePair {
    pub key: String,
    pub expected: String,
}

impl AttributePair {
    /// Splits on the first `=`, so the expected value may itself contain `=`.
    pub fn parse(raw: &str) -> Result<Self, ConfigurationError> {
        match raw.split_once('=') {
            Some((key, expected)) if !key.is_empty() => Ok(Self {
                key: key.to_string(),
                expected: expected.to_string(),
            }),
            _ => Err(ConfigurationError::MalformedAttribute(raw.to_string())),
        }
    }

    pub fn matches(&self, record: &ProcessRecord) -> bool {
        record.attribute(&self.key).as_deref() == Some(self.expected.as_str())
    }
}

impl fmt::Display for AttributePair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}={}", self.key, self.expected)
    }
}

/// AND-combination of attribute pairs. An empty filter accepts everything.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AttributeFilter {
    pairs: Vec<AttributePair>,
}

impl AttributeFilter {
    pub fn new(pairs: Vec<AttributePair>) -> Self {
        Self { pairs }
    }

    /// Validates every argument up front; the first malformed one is reported.
    pub fn parse<I, S>(args: I) -> Result<Self, ConfigurationError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let pairs = args
            .into_iter()
            .map(|raw| AttributePair::parse(raw.as_ref()))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self { pairs })
    }

    pub fn pairs(&self) -> &[AttributePair] {
        &self.pairs
    }

    pub fn is_empty(&self) -> bool {
        self.pairs.is_empty()
    }

    pub fn with(mut self, pair: AttributePair) -> Self {
        self.pairs.push(pair);
        self
    }

    /// Stops at the first pair that fails.
    pub fn matches(&self, record: &ProcessRecord) -> bool {
        self.pairs.iter().all(|pair| pair.matches(record))
    }

    pub fn apply(&self, snapshot: &Snapshot) -> Snapshot {
        snapshot
            .iter()
            .filter(|record| self.matches(record))
            .cloned()
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::Value;

    fn sample() -> Snapshot {
        Snapshot::new(vec![
            ProcessRecord::new(1, "a").with_cpu_usage(0.5),
            ProcessRecord::new(2, "b").with_cpu_usage(5.0),
            ProcessRecord::new(3, "c"),
            ProcessRecord::new(4, "b").with_cpu_usage(1.0),
        ])
    }

    fn pids(snapshot: &Snapshot) -> Vec<u32> {
        snapshot.iter().map(|r| r.pid).collect()
    }

    #[test]
    fn threshold_keeps_order_and_is_inclusive() {
        assert_eq!(pids(&by_threshold(&sample(), 1.0)), vec![2, 4]);
    }

    #[test]
    fn threshold_never_keeps_unset_usage() {
        assert_eq!(pids(&by_threshold(&sample(), f64::NEG_INFINITY)), vec![1, 2, 4]);
    }

    #[test]
    fn parse_splits_on_first_separator() {
        let pair = AttributePair::parse("args=--mode=fast").unwrap();
        assert_eq!(pair.key, "args");
        assert_eq!(pair.expected, "--mode=fast");
        assert_eq!(pair.to_string(), "args=--mode=fast");
    }

    #[test]
    fn parse_allows_empty_expected_value() {
        let pair = AttributePair::parse("status=").unwrap();
        assert_eq!(pair.expected, "");
    }

    #[test]
    fn parse_rejects_missing_separator_or_key() {
        assert!(matches!(
            AttributePair::parse("badattr"),
            Err(ConfigurationError::MalformedAttribute(raw)) if raw == "badattr"
        ));
        assert!(AttributePair::parse("=value").is_err());
    }

    #[test]
    fn filter_parse_fails_on_any_bad_argument() {
        let err = AttributeFilter::parse(["name=b", "badattr"]).unwrap_err();
        assert_eq!(err.to_string(), "malformed attribute filter `badattr`: expected key=value");
    }

    #[test]
    fn empty_filter_accepts_everything() {
        let filter = AttributeFilter::parse(Vec::<String>::new()).unwrap();
        assert!(filter.is_empty());
        assert_eq!(filter.apply(&sample()), sample());
    }

    #[test]
    fn pairs_are_and_combined() {
        let filter = AttributeFilter::parse(["name=b", "cpuUsage=5.0"]).unwrap();
        assert_eq!(pids(&filter.apply(&sample())), vec![2]);

        let by_pid = AttributeFilter::parse(["pid=4"]).unwrap();
        assert_eq!(pids(&by_pid.apply(&sample())), vec![4]);
    }

    #[test]
    fn unknown_attribute_never_matches() {
        let missing = AttributeFilter::parse(["uid=0"]).unwrap();
        assert!(missing.apply(&sample()).is_empty());
    }

    #[test]
    fn unset_attribute_matches_none() {
        let unset = AttributeFilter::parse(["cpuUsage=None"]).unwrap();
        assert_eq!(pids(&unset.apply(&sample())), vec![3]);

        let orphan = ProcessRecord::new(5, "kernel_task").with_attribute("ppid", Value::Null);
        assert!(AttributeFilter::parse(["ppid=None"]).unwrap().matches(&orphan));
    }

    #[test]
    fn booleans_and_tiny_floats_match_their_text_form() {
        let record = ProcessRecord::new(6, "Maps")
            .with_cpu_usage(1e-5)
            .with_attribute("isApp", true);

        assert!(AttributeFilter::parse(["isApp=True"]).unwrap().matches(&record));
        assert!(!AttributeFilter::parse(["isApp=true"]).unwrap().matches(&record));
        assert!(AttributeFilter::parse(["cpuUsage=1e-05"]).unwrap().matches(&record));
        assert!(!AttributeFilter::parse(["cpuUsage=0.00001"]).unwrap().matches(&record));
    }
}
