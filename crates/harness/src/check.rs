//! Small expectation helpers for scenario bodies
//!
//! Each returns `HarnessError::AssertionFailed` so a scenario can bail out
//! with `?` and the runner reports the message alongside the interaction log.

use std::fmt::Debug;

use crate::error::{HarnessError, HarnessResult};
use crate::response::{truncate, ResponseRecord};

pub fn ensure(condition: bool, message: impl Into<String>) -> HarnessResult<()> {
    if condition {
        Ok(())
    } else {
        Err(HarnessError::AssertionFailed(message.into()))
    }
}

pub fn equal<T: PartialEq + Debug>(actual: T, expected: T, what: &str) -> HarnessResult<()> {
    if actual == expected {
        Ok(())
    } else {
        Err(HarnessError::AssertionFailed(format!(
            "{}: expected {:?}, got {:?}",
            what, expected, actual
        )))
    }
}

pub fn status(record: &ResponseRecord, expected: u16) -> HarnessResult<()> {
    if record.status == i32::from(expected) {
        Ok(())
    } else {
        Err(HarnessError::AssertionFailed(format!(
            "expected status {}, got {}: {}",
            expected,
            record.status,
            truncate(&record.body_text, 500)
        )))
    }
}

pub fn success(record: &ResponseRecord) -> HarnessResult<()> {
    ensure(
        record.success,
        format!(
            "expected a 2xx response, got {}: {}",
            record.status,
            truncate(&record.body_text, 500)
        ),
    )
}

/// Status in the 4xx range
pub fn client_error(record: &ResponseRecord) -> HarnessResult<()> {
    ensure(
        (400..500).contains(&record.status),
        format!("expected a 4xx response, got {}", record.status),
    )
}

/// Same ids regardless of order, duplicates included
pub fn same_ids(actual: &[String], expected: &[String], what: &str) -> HarnessResult<()> {
    let mut a: Vec<&String> = actual.iter().collect();
    let mut e: Vec<&String> = expected.iter().collect();
    a.sort();
    e.sort();
    if a == e {
        Ok(())
    } else {
        Err(HarnessError::AssertionFailed(format!(
            "{}: expected ids {:?}, got {:?}",
            what, e, a
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::response::Outcome;

    #[test]
    fn test_equal_message() {
        let err = equal(3, 5, "entries").unwrap_err();
        assert_eq!(err.to_string(), "Assertion failed: entries: expected 5, got 3");
    }

    #[test]
    fn test_status_helpers() {
        let record = ResponseRecord::from_outcome(&Outcome::Response {
            status: 404,
            headers: Default::default(),
            body: "nope".into(),
        });
        assert!(status(&record, 404).is_ok());
        assert!(status(&record, 200).is_err());
        assert!(success(&record).is_err());
        assert!(client_error(&record).is_ok());
    }

    #[test]
    fn test_same_ids_ignores_order() {
        let a = vec!["1".to_string(), "2".to_string()];
        let b = vec!["2".to_string(), "1".to_string()];
        assert!(same_ids(&a, &b, "ids").is_ok());
        assert!(same_ids(&a, &b[..1], "ids").is_err());
    }

    #[test]
    fn test_same_ids_counts_duplicates() {
        let ids = |v: &[&str]| v.iter().map(|s| s.to_string()).collect::<Vec<_>>();
        assert!(same_ids(&ids(&["a", "a", "b"]), &ids(&["a", "b", "b"]), "ids").is_err());
        assert!(same_ids(&ids(&["b", "a", "a"]), &ids(&["a", "b", "a"]), "ids").is_ok());
    }
}
