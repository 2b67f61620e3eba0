use serde::{Deserialize, Serialize};
use std::fmt;

/// Name of the executable work a leaf (or nested superjob) refers to.
///
/// The queue client and the handler registry are both keyed by this value.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct WorkerRef(String);

impl WorkerRef {
    pub fn new(s: impl Into<String>) -> Self {
        Self(s.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for WorkerRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl From<&str> for WorkerRef {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}
