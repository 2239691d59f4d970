// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Data recorder identifier (`DR1`..`DRN`).

use serde::{Deserialize, Serialize};
use std::borrow::Borrow;
use std::fmt;

/// Unique identifier for a data recorder, e.g. `DR1`. Doubles as the durable
/// queue's `queue_name` and the activity monitor's `subsystem` key.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct RecorderId(pub String);

impl RecorderId {
    /// Create a new RecorderId from any string-like value.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Get the string value of this RecorderId.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RecorderId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<String> for RecorderId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for RecorderId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl PartialEq<str> for RecorderId {
    fn eq(&self, other: &str) -> bool {
        self.0 == other
    }
}

impl PartialEq<&str> for RecorderId {
    fn eq(&self, other: &&str) -> bool {
        self.0 == *other
    }
}

impl Borrow<str> for RecorderId {
    fn borrow(&self) -> &str {
        &self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn displays_as_inner_string() {
        assert_eq!(RecorderId::new("DR1").to_string(), "DR1");
    }

    #[test]
    fn compares_against_str() {
        let id = RecorderId::new("DR3");
        assert_eq!(id, "DR3");
        assert_eq!(id, *"DR3");
    }

    #[test]
    fn orders_lexicographically() {
        let mut ids = vec![RecorderId::new("DR2"), RecorderId::new("DR1")];
        ids.sort();
        assert_eq!(ids, vec![RecorderId::new("DR1"), RecorderId::new("DR2")]);
    }
}
