//! Collaborators for the platform backends
//!
//! This module provides:
//! - Traits for the session-creation and dataset-catalog services
//! - A reqwest-backed client implementing both
//! - A TTL cache that decorates any catalog
//! - Error handling with user-facing messages

pub mod cache;
pub mod client;
pub mod error;
pub mod types;

use std::sync::Arc;

use async_trait::async_trait;

pub use cache::{CachedCatalog, TtlCache};
pub use client::PlatformClient;
pub use error::ApiError;
pub use types::{
    ColumnStats, CreateSessionResponse, DatasetStats, DatasetSummary, TaskInfo, UploadedFile,
};

use crate::wizard::FieldMap;

/// Creates training sessions on the orchestration backend
#[async_trait]
pub trait SessionCreator: Send + Sync {
    /// Submit the full field mapping. Success yields the new session's id.
    async fn create_session(&self, fields: &FieldMap) -> Result<CreateSessionResponse, ApiError>;
}

/// Read-only dataset and task listings
#[async_trait]
pub trait DatasetCatalog: Send + Sync {
    async fn list_datasets(&self) -> Result<Vec<DatasetSummary>, ApiError>;

    /// Column layout and statistics for an uploaded file
    async fn dataset_stats(&self, filename: &str) -> Result<DatasetStats, ApiError>;

    /// Tasks available for a dataset
    async fn list_tasks(&self, dataset_id: &str) -> Result<Vec<TaskInfo>, ApiError>;

    async fn list_uploaded_files(&self) -> Result<Vec<UploadedFile>, ApiError>;
}

#[async_trait]
impl<T: SessionCreator + ?Sized> SessionCreator for Arc<T> {
    async fn create_session(&self, fields: &FieldMap) -> Result<CreateSessionResponse, ApiError> {
        (**self).create_session(fields).await
    }
}

#[async_trait]
impl<T: DatasetCatalog + ?Sized> DatasetCatalog for Arc<T> {
    async fn list_datasets(&self) -> Result<Vec<DatasetSummary>, ApiError> {
        (**self).list_datasets().await
    }

    async fn dataset_stats(&self, filename: &str) -> Result<DatasetStats, ApiError> {
        (**self).dataset_stats(filename).await
    }

    async fn list_tasks(&self, dataset_id: &str) -> Result<Vec<TaskInfo>, ApiError> {
        (**self).list_tasks(dataset_id).await
    }

    async fn list_uploaded_files(&self) -> Result<Vec<UploadedFile>, ApiError> {
        (**self).list_uploaded_files().await
    }
}
