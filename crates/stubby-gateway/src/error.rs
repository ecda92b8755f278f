use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;
use stubby_store::LinkError;
use tracing::warn;

pub type Result<T> = std::result::Result<T, AppError>;

#[derive(Debug)]
pub enum AppError {
    /// The request itself could not be understood.
    BadRequest(String),
    Link(LinkError),
}

#[derive(Serialize)]
struct ErrorBody {
    error: String,
}

impl From<LinkError> for AppError {
    fn from(err: LinkError) -> Self {
        AppError::Link(err)
    }
}

impl AppError {
    pub fn bad_request(message: impl Into<String>) -> Self {
        AppError::BadRequest(message.into())
    }

    fn status_and_message(&self) -> (StatusCode, String) {
        match self {
            AppError::BadRequest(message) => (StatusCode::BAD_REQUEST, message.clone()),
            AppError::Link(err @ LinkError::Validation(_)) => {
                (StatusCode::BAD_REQUEST, err.to_string())
            }
            AppError::Link(LinkError::InvalidKey(_) | LinkError::NotFound) => {
                (StatusCode::NOT_FOUND, "link not found".to_string())
            }
            AppError::Link(err @ LinkError::Expired) => (StatusCode::NOT_FOUND, err.to_string()),
            AppError::Link(LinkError::Backend(_)) => (
                StatusCode::SERVICE_UNAVAILABLE,
                "storage temporarily unavailable".to_string(),
            ),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        if let AppError::Link(LinkError::Backend(source)) = &self {
            warn!(error = %source, "link backend failed");
        }
        let (status, error) = self.status_and_message();
        (status, Json(ErrorBody { error })).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use stubby_core::{KeyError, StorageError};

    fn status(err: LinkError) -> StatusCode {
        AppError::from(err).into_response().status()
    }

    #[test]
    fn link_errors_map_to_statuses() {
        assert_eq!(
            status(LinkError::Validation("too long".into())),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(status(LinkError::InvalidKey(KeyError::Empty)), StatusCode::NOT_FOUND);
        assert_eq!(status(LinkError::NotFound), StatusCode::NOT_FOUND);
        assert_eq!(status(LinkError::Expired), StatusCode::NOT_FOUND);
        assert_eq!(
            status(LinkError::Backend(StorageError::Unavailable("refused".into()))),
            StatusCode::SERVICE_UNAVAILABLE
        );
    }

    #[test]
    fn backend_details_are_not_exposed() {
        let err = AppError::from(LinkError::Backend(StorageError::Query(
            "near \"SELEC\": syntax error".into(),
        )));
        let (_, message) = err.status_and_message();
        assert!(!message.contains("SELEC"));
    }
}
