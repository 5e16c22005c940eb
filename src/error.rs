use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use tracing::{error, warn};

/// Failure of an external provider call.
#[derive(Debug, thiserror::Error)]
pub enum ProviderError {
    #[error("{provider} is not configured")]
    Unavailable { provider: &'static str },

    #[error("{provider} request failed: {source}")]
    Transport {
        provider: &'static str,
        #[source]
        source: reqwest::Error,
    },

    #[error("{provider} returned HTTP {status}: {body}")]
    Status {
        provider: &'static str,
        status: u16,
        body: String,
    },

    #[error("{provider} returned an unusable response: {detail}")]
    InvalidResponse {
        provider: &'static str,
        detail: String,
    },
}

impl ProviderError {
    pub fn transport(provider: &'static str) -> impl FnOnce(reqwest::Error) -> Self {
        move |source| Self::Transport { provider, source }
    }

    pub fn invalid(provider: &'static str, detail: impl Into<String>) -> Self {
        Self::InvalidResponse {
            provider,
            detail: detail.into(),
        }
    }

    /// Turn a non-2xx response into [`ProviderError::Status`], keeping a
    /// bounded slice of the body for the log and the caller.
    pub async fn check(
        provider: &'static str,
        response: reqwest::Response,
    ) -> Result<reqwest::Response, Self> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let body = response.text().await.unwrap_or_default();
        Err(Self::Status {
            provider,
            status: status.as_u16(),
            body: body.chars().take(500).collect(),
        })
    }
}

/// Every failure a request can end in. The HTTP boundary decides the status.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("{0}")]
    BadRequest(String),

    #[error("{0}")]
    Unprocessable(String),

    #[error(transparent)]
    Provider(#[from] ProviderError),

    #[error("invalid dialogue script: {0}")]
    Script(String),

    #[error("failed to build {what}: {source}")]
    Build {
        what: &'static str,
        #[source]
        source: anyhow::Error,
    },

    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

impl AppError {
    pub fn build(what: &'static str) -> impl FnOnce(anyhow::Error) -> Self {
        move |source| Self::Build { what, source }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            AppError::BadRequest(_) => StatusCode::BAD_REQUEST,
            AppError::Unprocessable(_) => StatusCode::UNPROCESSABLE_ENTITY,
            AppError::Provider(ProviderError::Unavailable { .. }) => {
                StatusCode::SERVICE_UNAVAILABLE
            }
            AppError::Provider(_) => StatusCode::BAD_GATEWAY,
            AppError::Script(_) | AppError::Build { .. } | AppError::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            AppError::BadRequest(_) => "bad_request",
            AppError::Unprocessable(_) => "unprocessable",
            AppError::Provider(ProviderError::Unavailable { .. }) => "unavailable",
            AppError::Provider(_) => "provider_error",
            AppError::Script(_) => "invalid_script",
            AppError::Build { .. } => "build_failed",
            AppError::Internal(_) => "internal",
        }
    }
}

impl From<tokio::task::JoinError> for AppError {
    fn from(err: tokio::task::JoinError) -> Self {
        AppError::Internal(anyhow::Error::new(err))
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            error!(kind = self.kind(), err = %self, "request failed");
        } else {
            warn!(kind = self.kind(), err = %self, "request rejected");
        }
        (
            status,
            Json(json!({
                "error": self.kind(),
                "detail": self.to_string(),
            })),
        )
            .into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unavailable_provider_maps_to_503() {
        let err = AppError::from(ProviderError::Unavailable { provider: "speech" });
        assert_eq!(err.status(), StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(err.kind(), "unavailable");
    }

    #[test]
    fn remote_failure_maps_to_502() {
        let err = AppError::from(ProviderError::Status {
            provider: "gemini",
            status: 429,
            body: "quota".into(),
        });
        assert_eq!(err.status(), StatusCode::BAD_GATEWAY);
        assert!(err.to_string().contains("gemini returned HTTP 429"));
    }

    #[test]
    fn script_errors_are_server_errors() {
        let err = AppError::Script("expected value".into());
        assert_eq!(err.into_response().status(), StatusCode::INTERNAL_SERVER_ERROR);
    }
}
