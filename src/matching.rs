//! Dataset/task pairing helpers.

use std::collections::HashSet;

use crate::api::types::{DatasetStats, TaskInfo};

/// Whether two datasets share the same column layout.
///
/// Comparison is by exact ordered equality: the same names in a different
/// order count as a mismatch. See [`columns_compatible_unordered`] for the
/// set comparison.
pub fn columns_compatible(a: &[String], b: &[String]) -> bool {
    a == b
}

/// Same names regardless of order (and ignoring duplicates).
pub fn columns_compatible_unordered(a: &[String], b: &[String]) -> bool {
    let left: HashSet<&str> = a.iter().map(String::as_str).collect();
    let right: HashSet<&str> = b.iter().map(String::as_str).collect();
    left == right
}

/// Explain a column mismatch between a training and a test dataset
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ColumnDiff {
    /// In the training set only
    pub missing_from_test: Vec<String>,
    /// In the test set only
    pub unexpected_in_test: Vec<String>,
    /// Same names, different order
    pub reordered: bool,
}

impl ColumnDiff {
    pub fn is_empty(&self) -> bool {
        self.missing_from_test.is_empty() && self.unexpected_in_test.is_empty() && !self.reordered
    }
}

pub fn column_diff(train: &[String], test: &[String]) -> ColumnDiff {
    let train_set: HashSet<&str> = train.iter().map(String::as_str).collect();
    let test_set: HashSet<&str> = test.iter().map(String::as_str).collect();

    let missing_from_test = train
        .iter()
        .filter(|c| !test_set.contains(c.as_str()))
        .cloned()
        .collect::<Vec<_>>();
    let unexpected_in_test = test
        .iter()
        .filter(|c| !train_set.contains(c.as_str()))
        .cloned()
        .collect::<Vec<_>>();
    let reordered = missing_from_test.is_empty()
        && unexpected_in_test.is_empty()
        && !columns_compatible(train, test);

    ColumnDiff {
        missing_from_test,
        unexpected_in_test,
        reordered,
    }
}

/// Tasks whose output columns all exist in the dataset
pub fn matching_tasks<'a>(columns: &[String], tasks: &'a [TaskInfo]) -> Vec<&'a TaskInfo> {
    let available: HashSet<&str> = columns.iter().map(String::as_str).collect();
    tasks
        .iter()
        .filter(|task| {
            !task.output_columns.is_empty()
                && task
                    .output_columns
                    .iter()
                    .all(|c| available.contains(c.as_str()))
        })
        .collect()
}

/// Columns a user may pick as outputs: everything except identifiers
pub fn selectable_output_columns(stats: &DatasetStats) -> Vec<String> {
    stats
        .columns
        .iter()
        .filter(|c| !stats.identifier_columns.contains(c))
        .cloned()
        .collect()
}
