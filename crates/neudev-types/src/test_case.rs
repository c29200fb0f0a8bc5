//! Test-case records produced by the terminal and consumed by item authoring.

use serde::{Deserialize, Serialize};

/// A point-bearing expected-output record attached to an item.
///
/// Field names on the wire match the item persistence API.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TestCase {
    /// The whole run's output as one trimmed blob.
    pub expected_output: String,
    /// Left unset until the author assigns points.
    #[serde(default, rename = "testCasePoints")]
    pub points: Option<u32>,
    #[serde(default, rename = "isHidden")]
    pub hidden: bool,
}

impl TestCase {
    /// A visible test case with no points assigned yet.
    pub fn new(expected_output: impl Into<String>) -> Self {
        Self {
            expected_output: expected_output.into(),
            points: None,
            hidden: false,
        }
    }
}
