use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use postboard_core::PostboardError;
use serde::Serialize;
use thiserror::Error;
use tracing::error;

/// Every failure a handler can answer with. `summary` names the operation
/// that failed and `detail` says why; both end up in the JSON body.
#[derive(Error, Debug)]
pub enum ServerError {
    #[error("{summary}: {detail}")]
    BadRequest { summary: String, detail: String },

    #[error("{summary}: {detail}")]
    NotFound { summary: String, detail: String },

    #[error("{summary}: {detail}")]
    Internal { summary: String, detail: String },
}

#[derive(Serialize)]
struct ErrorBody<'a> {
    message: &'a str,
    error: &'a str,
}

impl ServerError {
    pub fn bad_request(summary: &str, detail: impl Into<String>) -> Self {
        Self::BadRequest {
            summary: summary.into(),
            detail: detail.into(),
        }
    }

    /// Classify an error coming out of the core crate. Validation errors are
    /// the caller's fault, missing rows are 404, the rest is ours.
    pub fn from_core(summary: &str, err: anyhow::Error) -> Self {
        let detail = err.to_string();
        match err.downcast_ref::<PostboardError>() {
            Some(core) if core.is_validation() => Self::BadRequest {
                summary: summary.into(),
                detail,
            },
            Some(PostboardError::PostNotFound { .. } | PostboardError::UserNotFound { .. }) => {
                Self::NotFound {
                    summary: summary.into(),
                    detail,
                }
            }
            _ => Self::Internal {
                summary: summary.into(),
                detail,
            },
        }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            ServerError::BadRequest { .. } => StatusCode::BAD_REQUEST,
            ServerError::NotFound { .. } => StatusCode::NOT_FOUND,
            ServerError::Internal { .. } => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ServerError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            error!(%self, "Request failed");
        }
        let (ServerError::BadRequest { summary, detail }
        | ServerError::NotFound { summary, detail }
        | ServerError::Internal { summary, detail }) = &self;
        let body = ErrorBody {
            message: summary,
            error: detail,
        };
        (status, Json(body)).into_response()
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn core_errors_map_to_status() {
        let err = ServerError::from_core("Failed to add post", PostboardError::EmptyTitle.into());
        assert_eq!(err.status(), StatusCode::BAD_REQUEST);

        let err = ServerError::from_core(
            "Failed to delete post",
            PostboardError::PostNotFound { id: 3 }.into(),
        );
        assert_eq!(err.status(), StatusCode::NOT_FOUND);
        assert_eq!(err.to_string(), "Failed to delete post: Post not found");

        let err = ServerError::from_core(
            "Failed to retrieve users",
            anyhow::anyhow!("disk I/O error"),
        );
        assert_eq!(err.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }
}
