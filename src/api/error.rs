//! Collaborator error types

use std::fmt;

/// Errors that can occur when calling platform backends
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ApiError {
    /// 401 Unauthorized or 403 Forbidden - session token missing, invalid or expired
    Unauthorized { service: String },
    /// 404 Not Found - dataset, task or file does not exist
    NotFound { service: String, resource: String },
    /// 429 Rate Limited
    RateLimited {
        service: String,
        retry_after_secs: Option<u64>,
    },
    /// Network or timeout error
    NetworkError { service: String, message: String },
    /// Other HTTP errors
    HttpError {
        service: String,
        status: u16,
        message: String,
    },
    /// Response body did not match the expected shape
    ParseError { service: String, message: String },
    /// No base URL configured for the service
    NotConfigured { service: String },
}

impl ApiError {
    /// Check if this is an authentication error
    pub fn is_auth_error(&self) -> bool {
        matches!(self, ApiError::Unauthorized { .. })
    }

    /// Whether retrying the same request may succeed
    pub fn is_transient(&self) -> bool {
        match self {
            ApiError::NetworkError { .. } | ApiError::RateLimited { .. } => true,
            ApiError::HttpError { status, .. } => matches!(status, 502..=504),
            _ => false,
        }
    }

    /// Get the service name for this error
    pub fn service_name(&self) -> &str {
        match self {
            ApiError::Unauthorized { service } => service,
            ApiError::NotFound { service, .. } => service,
            ApiError::RateLimited { service, .. } => service,
            ApiError::NetworkError { service, .. } => service,
            ApiError::HttpError { service, .. } => service,
            ApiError::ParseError { service, .. } => service,
            ApiError::NotConfigured { service } => service,
        }
    }

    /// Short message suitable for a transient notification
    pub fn user_message(&self) -> String {
        match self {
            ApiError::Unauthorized { .. } => "Your session has expired. Please log in again.".to_string(),
            ApiError::NotFound { resource, .. } => format!("{} was not found.", resource),
            ApiError::RateLimited { .. } => {
                "Too many requests. Please wait a moment and try again.".to_string()
            }
            ApiError::NetworkError { .. } => {
                "Could not reach the server. Check your connection and try again.".to_string()
            }
            ApiError::HttpError { message, .. } if !message.is_empty() => message.clone(),
            ApiError::HttpError { status, .. } => {
                format!("The server returned an error ({}).", status)
            }
            ApiError::ParseError { .. } => "The server sent an unexpected response.".to_string(),
            ApiError::NotConfigured { service } => {
                format!("The {} service is not configured.", service)
            }
        }
    }

    /// Map a non-success HTTP status to an error
    pub fn from_status(
        service: impl Into<String>,
        status: u16,
        resource: impl Into<String>,
        body: impl Into<String>,
        retry_after_secs: Option<u64>,
    ) -> Self {
        let service = service.into();
        match status {
            401 | 403 => ApiError::Unauthorized { service },
            404 => ApiError::NotFound {
                service,
                resource: resource.into(),
            },
            429 => ApiError::RateLimited {
                service,
                retry_after_secs,
            },
            _ => ApiError::HttpError {
                service,
                status,
                message: body.into(),
            },
        }
    }

    /// Create a network error for a service
    pub fn network(service: impl Into<String>, message: impl Into<String>) -> Self {
        ApiError::NetworkError {
            service: service.into(),
            message: message.into(),
        }
    }

    /// Create a parse error for a service
    pub fn parse(service: impl Into<String>, message: impl Into<String>) -> Self {
        ApiError::ParseError {
            service: service.into(),
            message: message.into(),
        }
    }

    pub fn not_configured(service: impl Into<String>) -> Self {
        ApiError::NotConfigured {
            service: service.into(),
        }
    }
}

impl fmt::Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ApiError::Unauthorized { service } => {
                write!(f, "{}: Unauthorized - session token rejected", service)
            }
            ApiError::NotFound { service, resource } => {
                write!(f, "{}: Not found - {}", service, resource)
            }
            ApiError::RateLimited {
                service,
                retry_after_secs,
            } => {
                if let Some(secs) = retry_after_secs {
                    write!(f, "{}: Rate limited - retry after {}s", service, secs)
                } else {
                    write!(f, "{}: Rate limited", service)
                }
            }
            ApiError::NetworkError { service, message } => {
                write!(f, "{}: Network error - {}", service, message)
            }
            ApiError::HttpError {
                service,
                status,
                message,
            } => {
                write!(f, "{}: HTTP {} - {}", service, status, message)
            }
            ApiError::ParseError { service, message } => {
                write!(f, "{}: Parse error - {}", service, message)
            }
            ApiError::NotConfigured { service } => {
                write!(f, "{}: Not configured (no base URL)", service)
            }
        }
    }
}

impl std::error::Error for ApiError {}
