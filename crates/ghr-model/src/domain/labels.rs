use std::fmt;

use serde::{Deserialize, Serialize};

/// Labels every worker carries, in this order.
pub const MANDATORY_LABELS: &[&str] = &["self-hosted", "linux", "x64"];

/// Ordered label list: mandatory labels first, then user labels.
///
/// Blank entries are dropped and duplicates keep their first position.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LabelSet(Vec<String>);

impl LabelSet {
    /// Label set holding only [`MANDATORY_LABELS`].
    pub fn mandatory() -> Self {
        let mut set = Self(Vec::new());
        for label in MANDATORY_LABELS {
            set.push(*label);
        }
        set
    }

    /// Mandatory labels followed by the comma-separated `extra` list.
    pub fn with_extra(extra: &str) -> Self {
        let mut set = Self::mandatory();
        for label in extra.split(',') {
            set.push(label);
        }
        set
    }

    /// Append a label unless it is blank or already present.
    pub fn push(&mut self, label: impl AsRef<str>) -> &mut Self {
        let label = label.as_ref().trim();
        if !label.is_empty() && !self.0.iter().any(|l| l == label) {
            self.0.push(label.to_string());
        }
        self
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(String::as_str)
    }

    /// Delimited form consumed by the worker's configure step.
    pub fn to_delimited(&self) -> String {
        self.0.join(",")
    }
}

impl Default for LabelSet {
    fn default() -> Self {
        Self::mandatory()
    }
}

impl fmt::Display for LabelSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_delimited())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mandatory_labels_come_first() {
        let set = LabelSet::with_extra("gpu,docker");
        assert_eq!(set.to_delimited(), "self-hosted,linux,x64,gpu,docker");
    }

    #[test]
    fn blanks_and_duplicates_are_dropped() {
        let set = LabelSet::with_extra(" gpu , ,linux,gpu,, docker ");
        let labels: Vec<_> = set.iter().collect();
        assert_eq!(labels, ["self-hosted", "linux", "x64", "gpu", "docker"]);
    }

    #[test]
    fn empty_extra_yields_mandatory_only() {
        assert_eq!(LabelSet::with_extra(""), LabelSet::mandatory());
        assert_eq!(LabelSet::default().len(), MANDATORY_LABELS.len());
    }

    #[test]
    fn serde_is_a_plain_array() {
        let json = serde_json::to_string(&LabelSet::with_extra("gpu")).unwrap();
        assert_eq!(json, r#"["self-hosted","linux","x64","gpu"]"#);
    }
}
