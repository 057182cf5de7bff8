// HTTP-facing error taxonomy for the threat monitor endpoints
// Provider failures never reach this type; they are absorbed by the scanners

use axum::{
    http::{header, HeaderValue, StatusCode},
    response::{IntoResponse, Json, Response},
};
use chrono::{DateTime, Local};
use serde::Serialize;
use thiserror::Error;

use crate::{config::ScanEndpoint, services::providers::ProviderConfigError};

#[derive(Error, Debug)]
pub enum ThreatMonitorError {
    #[error("Service temporarily unavailable")]
    Configuration(#[from] ProviderConfigError),

    #[error("{0}")]
    Validation(String),

    #[error("Unauthorized")]
    Unauthenticated,

    #[error(
        "Daily {} limit reached. You can run one check per day; try again after {}",
        .endpoint.label(),
        .reset_at.format("%Y-%m-%d %H:%M %Z")
    )]
    RateLimited {
        endpoint: ScanEndpoint,
        reset_at: DateTime<Local>,
    },

    #[error("An unexpected error occurred")]
    Internal(String),
}

/// Error envelope returned by every threat monitor endpoint
#[derive(Debug, Serialize)]
pub struct ThreatErrorResponse {
    pub success: bool,
    pub error: ThreatErrorDetail,
    pub status: u16,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ThreatErrorDetail {
    pub code: &'static str,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reset_at: Option<DateTime<Local>>,
}

impl ThreatMonitorError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            ThreatMonitorError::Configuration(_) => StatusCode::SERVICE_UNAVAILABLE,
            ThreatMonitorError::Validation(_) => StatusCode::BAD_REQUEST,
            ThreatMonitorError::Unauthenticated => StatusCode::UNAUTHORIZED,
            ThreatMonitorError::RateLimited { .. } => StatusCode::TOO_MANY_REQUESTS,
            ThreatMonitorError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    pub fn error_code(&self) -> &'static str {
        match self {
            ThreatMonitorError::Configuration(_) => "SERVICE_UNAVAILABLE",
            ThreatMonitorError::Validation(_) => "VALIDATION_ERROR",
            ThreatMonitorError::Unauthenticated => "UNAUTHORIZED",
            ThreatMonitorError::RateLimited { .. } => "RATE_LIMITED",
            ThreatMonitorError::Internal(_) => "INTERNAL_ERROR",
        }
    }

    /// Seconds until the quota resets, never less than one
    pub fn retry_after_seconds(&self) -> Option<i64> {
        match self {
            ThreatMonitorError::RateLimited { reset_at, .. } => {
                Some((*reset_at - Local::now()).num_seconds().max(1))
            },
            _ => None,
        }
    }
}

impl From<validator::ValidationErrors> for ThreatMonitorError {
    fn from(errors: validator::ValidationErrors) -> Self {
        let message = errors
            .field_errors()
            .values()
            .flat_map(|errors| errors.iter())
            .find_map(|error| error.message.as_ref().map(|m| m.to_string()))
            .unwrap_or_else(|| "Invalid request".to_string());
        ThreatMonitorError::Validation(message)
    }
}

impl IntoResponse for ThreatMonitorError {
    fn into_response(self) -> Response {
        match &self {
            ThreatMonitorError::Configuration(e) => {
                tracing::warn!(error = %e, "Threat monitor provider not configured");
            },
            ThreatMonitorError::Internal(detail) => {
                tracing::error!(detail = %detail, "Unexpected threat monitor failure");
            },
            _ => {},
        }

        let status = self.status_code();
        let retry_after = self.retry_after_seconds();
        let reset_at = match &self {
            ThreatMonitorError::RateLimited { reset_at, .. } => Some(*reset_at),
            _ => None,
        };

        let body = ThreatErrorResponse {
            success: false,
            error: ThreatErrorDetail {
                code: self.error_code(),
                message: self.to_string(),
                reset_at,
            },
            status: status.as_u16(),
        };

        let mut response = (status, Json(body)).into_response();
        if let Some(seconds) = retry_after {
            if let Ok(value) = HeaderValue::from_str(&seconds.to_string()) {
                response.headers_mut().insert(header::RETRY_AFTER, value);
            }
        }
        response
    }
}
