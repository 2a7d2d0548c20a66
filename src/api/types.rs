//! Response and request shapes for the platform backends.
//!
//! Every response arrives wrapped in `{ "data": ..., "message": ... }`. Missing
//! fields deserialize to typed defaults here, at the boundary, so callers never
//! chase optional chains.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Standard backend envelope
#[derive(Debug, Clone, Deserialize)]
pub struct ApiEnvelope<T> {
    pub data: Option<T>,
    #[serde(default)]
    pub message: Option<String>,
}

impl<T: Default> ApiEnvelope<T> {
    /// Payload, or its default when the backend sent none
    pub fn into_data(self) -> T {
        self.data.unwrap_or_default()
    }
}

/// A dataset the user has uploaded
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DatasetSummary {
    pub id: String,
    #[serde(default)]
    pub filename: String,
    #[serde(default)]
    pub num_rows: u64,
    #[serde(default)]
    pub columns: Vec<String>,
    #[serde(default)]
    pub uploaded_at: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct DatasetListData {
    #[serde(default)]
    pub datasets: Vec<DatasetSummary>,
}

/// Per-column statistics computed by the preprocessing backend
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ColumnStats {
    #[serde(default)]
    pub dtype: Option<String>,
    #[serde(default)]
    pub missing: u64,
    #[serde(default)]
    pub unique: Option<u64>,
    #[serde(default)]
    pub mean: Option<f64>,
}

/// Column layout and summary statistics for one dataset file
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DatasetStats {
    #[serde(default)]
    pub filename: String,
    /// Column names in file order
    #[serde(default)]
    pub columns: Vec<String>,
    #[serde(default)]
    pub num_rows: u64,
    #[serde(default)]
    pub column_stats: BTreeMap<String, ColumnStats>,
    /// Columns the backend flagged as row identifiers
    #[serde(default)]
    pub identifier_columns: Vec<String>,
}

/// A learning task that can be paired with a dataset
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskInfo {
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub task_type: Option<String>,
    /// Columns the task predicts
    #[serde(default)]
    pub output_columns: Vec<String>,
    #[serde(default)]
    pub metrics: Vec<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct TaskListData {
    #[serde(default)]
    pub tasks: Vec<TaskInfo>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UploadedFile {
    pub filename: String,
    #[serde(default)]
    pub size_bytes: u64,
    #[serde(default)]
    pub uploaded_at: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct UploadedFilesData {
    #[serde(default)]
    pub files: Vec<UploadedFile>,
}

/// Returned by the orchestration backend once a training session exists
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CreateSessionResponse {
    pub session_id: String,
    #[serde(default)]
    pub status: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dataset_list_missing_data_defaults_empty() {
        let envelope: ApiEnvelope<DatasetListData> =
            serde_json::from_str(r#"{"message": "ok"}"#).unwrap();
        assert!(envelope.into_data().datasets.is_empty());

        let envelope: ApiEnvelope<DatasetListData> =
            serde_json::from_str(r#"{"data": {}}"#).unwrap();
        assert!(envelope.into_data().datasets.is_empty());
    }

    #[test]
    fn test_dataset_summary_tolerates_missing_fields() {
        let json = r#"{"data": {"datasets": [{"id": "ds-1"}]}}"#;
        let envelope: ApiEnvelope<DatasetListData> = serde_json::from_str(json).unwrap();
        let datasets = envelope.into_data().datasets;
        assert_eq!(datasets.len(), 1);
        assert_eq!(datasets[0].id, "ds-1");
        assert_eq!(datasets[0].num_rows, 0);
        assert!(datasets[0].columns.is_empty());
    }

    #[test]
    fn test_dataset_stats_deserialization() {
        let json = r#"{
            "data": {
                "filename": "train.csv",
                "columns": ["id", "age", "label"],
                "num_rows": 120,
                "column_stats": {"age": {"dtype": "int64", "missing": 2, "mean": 41.5}},
                "identifier_columns": ["id"]
            }
        }"#;
        let envelope: ApiEnvelope<DatasetStats> = serde_json::from_str(json).unwrap();
        let stats = envelope.into_data();
        assert_eq!(stats.columns, vec!["id", "age", "label"]);
        assert_eq!(stats.column_stats["age"].missing, 2);
        assert_eq!(stats.column_stats["age"].unique, None);
        assert_eq!(stats.identifier_columns, vec!["id"]);
    }

    #[test]
    fn test_task_info_defaults() {
        let json = r#"{"data": {"tasks": [{"id": "t1", "output_columns": ["label"]}]}}"#;
        let envelope: ApiEnvelope<TaskListData> = serde_json::from_str(json).unwrap();
        let tasks = envelope.into_data().tasks;
        assert_eq!(tasks[0].output_columns, vec!["label"]);
        assert!(tasks[0].metrics.is_empty());
        assert!(tasks[0].task_type.is_none());
    }

    #[test]
    fn test_create_session_response() {
        let json = r#"{"data": {"session_id": "sess-9", "status": "queued"}, "message": "created"}"#;
        let envelope: ApiEnvelope<CreateSessionResponse> = serde_json::from_str(json).unwrap();
        assert_eq!(envelope.message.as_deref(), Some("created"));
        assert_eq!(envelope.data.unwrap().session_id, "sess-9");
    }

    #[test]
    fn test_envelope_without_data_for_non_default_payload() {
        let envelope: ApiEnvelope<CreateSessionResponse> =
            serde_json::from_str(r#"{"message": "queue full"}"#).unwrap();
        assert!(envelope.data.is_none());
        assert_eq!(envelope.message.as_deref(), Some("queue full"));
    }
}
