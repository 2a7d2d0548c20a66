//! HTTP client for the platform REST backends.
//!
//! Read-only fetches retry with exponential backoff on transient failures.
//! Session creation is never retried: a duplicate POST could create a second
//! training session.

use std::time::Duration;

use async_trait::async_trait;
use backon::{ExponentialBuilder, Retryable};
use reqwest::{header::RETRY_AFTER, Client, Url};
use serde::de::DeserializeOwned;
use tracing::{debug, instrument, warn};

use super::error::ApiError;
use super::types::{
    ApiEnvelope, CreateSessionResponse, DatasetListData, DatasetStats, DatasetSummary, TaskInfo,
    TaskListData, UploadedFile, UploadedFilesData,
};
use super::{DatasetCatalog, SessionCreator};
use crate::config::ApiConfig;
use crate::wizard::FieldMap;

const DATASETS_SERVICE: &str = "datasets";
const SESSIONS_SERVICE: &str = "sessions";

/// Client for the dataset and training-orchestration backends
pub struct PlatformClient {
    client: Client,
    base_url: Url,
    token: Option<String>,
    /// Maximum retry attempts for reads
    max_retries: usize,
    /// Base delay for exponential backoff
    base_delay: Duration,
    /// Maximum delay between retries
    max_delay: Duration,
}

impl PlatformClient {
    pub fn new(base_url: &str, token: Option<String>, timeout: Duration) -> Result<Self, ApiError> {
        let trimmed = base_url.trim().trim_end_matches('/');
        if trimmed.is_empty() {
            return Err(ApiError::not_configured(DATASETS_SERVICE));
        }
        let base_url = Url::parse(trimmed)
            .map_err(|e| ApiError::network(DATASETS_SERVICE, format!("invalid base URL: {}", e)))?;
        if base_url.cannot_be_a_base() {
            return Err(ApiError::not_configured(DATASETS_SERVICE));
        }

        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| ApiError::network(DATASETS_SERVICE, e.to_string()))?;

        Ok(Self {
            client,
            base_url,
            token,
            max_retries: 3,
            base_delay: Duration::from_millis(500),
            max_delay: Duration::from_secs(10),
        })
    }

    pub fn from_config(config: &ApiConfig) -> Result<Self, ApiError> {
        let mut client = Self::new(
            &config.base_url,
            config.token.clone(),
            Duration::from_secs(config.timeout_secs),
        )?;
        client.max_retries = config.max_retries;
        Ok(client)
    }

    /// Override retry settings
    pub fn with_retry_config(
        mut self,
        max_retries: usize,
        base_delay: Duration,
        max_delay: Duration,
    ) -> Self {
        self.max_retries = max_retries;
        self.base_delay = base_delay;
        self.max_delay = max_delay;
        self
    }

    /// Build an endpoint URL, percent-encoding each segment
    fn endpoint(&self, segments: &[&str]) -> Url {
        let mut url = self.base_url.clone();
        if let Ok(mut path) = url.path_segments_mut() {
            path.pop_if_empty().push("api").extend(segments);
        }
        url
    }

    fn retry_strategy(&self) -> ExponentialBuilder {
        ExponentialBuilder::default()
            .with_min_delay(self.base_delay)
            .with_max_delay(self.max_delay)
            .with_max_times(self.max_retries)
    }

    fn authorized(&self, request: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match &self.token {
            Some(token) => request.bearer_auth(token),
            None => request,
        }
    }

    async fn error_from_response(
        service: &str,
        resource: &str,
        response: reqwest::Response,
    ) -> ApiError {
        let status = response.status().as_u16();
        let retry_after = response
            .headers()
            .get(RETRY_AFTER)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.trim().parse::<u64>().ok());
        let body = response.text().await.unwrap_or_default();

        // Prefer the backend's own message when it sent an envelope
        let message = serde_json::from_str::<ApiEnvelope<serde_json::Value>>(&body)
            .ok()
            .and_then(|e| e.message)
            .unwrap_or(body);

        ApiError::from_status(service, status, resource, message, retry_after)
    }

    async fn get_once<T: DeserializeOwned + Default>(
        &self,
        url: &Url,
        resource: &str,
    ) -> Result<T, ApiError> {
        let response = self
            .authorized(self.client.get(url.clone()))
            .send()
            .await
            .map_err(|e| ApiError::network(DATASETS_SERVICE, e.to_string()))?;

        if !response.status().is_success() {
            return Err(Self::error_from_response(DATASETS_SERVICE, resource, response).await);
        }

        let envelope = response
            .json::<ApiEnvelope<T>>()
            .await
            .map_err(|e| ApiError::parse(DATASETS_SERVICE, e.to_string()))?;
        Ok(envelope.into_data())
    }

    /// GET with retry on transient failures
    async fn get<T: DeserializeOwned + Default>(
        &self,
        url: Url,
        resource: &str,
    ) -> Result<T, ApiError> {
        debug!(url = %url, "GET");
        let op = || async { self.get_once::<T>(&url, resource).await };

        op.retry(self.retry_strategy())
            .when(ApiError::is_transient)
            .notify(|err, dur| {
                warn!("Retrying {} after {:?}: {}", resource, dur, err);
            })
            .await
    }
}

#[async_trait]
impl DatasetCatalog for PlatformClient {
    #[instrument(skip(self))]
    async fn list_datasets(&self) -> Result<Vec<DatasetSummary>, ApiError> {
        let url = self.endpoint(&["datasets"]);
        let data: DatasetListData = self.get(url, "dataset list").await?;
        Ok(data.datasets)
    }

    #[instrument(skip(self))]
    async fn dataset_stats(&self, filename: &str) -> Result<DatasetStats, ApiError> {
        let url = self.endpoint(&["datasets", filename, "stats"]);
        self.get(url, &format!("dataset {}", filename)).await
    }

    #[instrument(skip(self))]
    async fn list_tasks(&self, dataset_id: &str) -> Result<Vec<TaskInfo>, ApiError> {
        let url = self.endpoint(&["datasets", dataset_id, "tasks"]);
        let data: TaskListData = self.get(url, &format!("tasks for {}", dataset_id)).await?;
        Ok(data.tasks)
    }

    #[instrument(skip(self))]
    async fn list_uploaded_files(&self) -> Result<Vec<UploadedFile>, ApiError> {
        let url = self.endpoint(&["files"]);
        let data: UploadedFilesData = self.get(url, "uploaded files").await?;
        Ok(data.files)
    }
}

#[async_trait]
impl SessionCreator for PlatformClient {
    #[instrument(skip(self, fields))]
    async fn create_session(&self, fields: &FieldMap) -> Result<CreateSessionResponse, ApiError> {
        let url = self.endpoint(&["sessions"]);
        let response = self
            .authorized(self.client.post(url).json(fields))
            .send()
            .await
            .map_err(|e| ApiError::network(SESSIONS_SERVICE, e.to_string()))?;

        if !response.status().is_success() {
            return Err(Self::error_from_response(SESSIONS_SERVICE, "session", response).await);
        }

        let envelope = response
            .json::<ApiEnvelope<CreateSessionResponse>>()
            .await
            .map_err(|e| ApiError::parse(SESSIONS_SERVICE, e.to_string()))?;
        envelope
            .data
            .ok_or_else(|| ApiError::parse(SESSIONS_SERVICE, "response carried no session"))
    }
}
