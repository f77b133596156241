use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("not found")]
    NotFound,
    #[error("database error: {0}")]
    Database(#[from] mysql::Error),
    #[error("template error: {0}")]
    Template(#[from] tera::Error),
    #[error("malformed timestamp in row: {0}")]
    Timestamp(#[from] chrono::ParseError),
    #[error("configuration error: {0}")]
    Config(&'static str),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        match self {
            AppError::NotFound => (StatusCode::NOT_FOUND, "page not found").into_response(),
            other => {
                tracing::error!("request failed: {}", other);
                (StatusCode::INTERNAL_SERVER_ERROR, "internal server error").into_response()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn not_found_maps_to_404() {
        assert_eq!(
            AppError::NotFound.into_response().status(),
            StatusCode::NOT_FOUND
        );
    }

    #[test]
    fn other_errors_map_to_500() {
        let err = AppError::Config("DATABASE_URL is not set");
        assert_eq!(
            err.into_response().status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }
}
