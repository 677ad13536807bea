use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{ModelError, ModelResult};

/// User-supplied worker name; unique per target reference.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct WorkerName(String);

impl WorkerName {
    pub fn new(name: impl Into<String>) -> ModelResult<Self> {
        Self::try_from(name.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Exact (case-sensitive) match against a name reported by the control plane.
    pub fn matches(&self, other: &str) -> bool {
        self.0 == other
    }
}

impl TryFrom<String> for WorkerName {
    type Error = ModelError;
    fn try_from(s: String) -> Result<Self, Self::Error> {
        let trimmed = s.trim();
        if trimmed.is_empty() {
            return Err(ModelError::EmptyWorkerName);
        }
        Ok(Self(trimmed.to_string()))
    }
}

impl From<WorkerName> for String {
    fn from(n: WorkerName) -> Self {
        n.0
    }
}

impl fmt::Display for WorkerName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_blank_names() {
        assert!(matches!(WorkerName::new(""), Err(ModelError::EmptyWorkerName)));
        assert!(matches!(WorkerName::new(" \t"), Err(ModelError::EmptyWorkerName)));
    }

    #[test]
    fn matching_is_exact() {
        let name = WorkerName::new("runner-01").unwrap();
        assert!(name.matches("runner-01"));
        assert!(!name.matches("Runner-01"));
        assert!(!name.matches("runner-010"));
    }
}
