use std::net::SocketAddr;
use std::path::PathBuf;

use axum::http::StatusCode;
use axum::response::{IntoResponse, Json, Response};
use kimp_core::QueryError;
use serde_json::json;
use thiserror::Error;

/// Startup failures mapped to process exit codes.
#[derive(Debug, Error)]
pub enum ServerError {
    #[error(transparent)]
    Validation(#[from] kimp_core::ValidationError),

    #[error(transparent)]
    Config(#[from] kimp_core::CoreError),

    #[error("failed to read config file {path}: {source}")]
    ConfigFile {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to bind {addr}: {source}")]
    Bind {
        addr: SocketAddr,
        #[source]
        source: std::io::Error,
    },

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl ServerError {
    pub const fn exit_code(&self) -> u8 {
        match self {
            Self::Validation(_) | Self::Config(_) | Self::ConfigFile { .. } => 2,
            Self::Bind { .. } => 3,
            Self::Io(_) => 10,
        }
    }
}

/// Query failure rendered as `{"error": code, "detail": message}`.
#[derive(Debug)]
pub struct ApiError(pub QueryError);

impl From<QueryError> for ApiError {
    fn from(err: QueryError) -> Self {
        Self(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match &self.0 {
            QueryError::NotFound { .. } => StatusCode::NOT_FOUND,
            QueryError::InvalidArgument { .. } => StatusCode::BAD_REQUEST,
            QueryError::NoData => StatusCode::INTERNAL_SERVER_ERROR,
        };

        let mut body = json!({
            "error": self.0.code(),
            "detail": self.0.to_string(),
        });
        if let QueryError::NotFound { available, .. } = &self.0 {
            body["available_symbols"] = json!(available);
        }

        if status.is_server_error() {
            tracing::warn!(error = %self.0, "query failed");
        }

        (status, Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn query_errors_map_to_status_codes() {
        let not_found = ApiError(QueryError::NotFound {
            symbol: String::from("DOGE"),
            available: vec![String::from("BTC")],
        })
        .into_response();
        assert_eq!(not_found.status(), StatusCode::NOT_FOUND);

        let invalid = ApiError(QueryError::InvalidArgument {
            message: String::from("n must be an integer between 1 and 50"),
        })
        .into_response();
        assert_eq!(invalid.status(), StatusCode::BAD_REQUEST);

        let no_data = ApiError::from(QueryError::NoData).into_response();
        assert_eq!(no_data.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn startup_errors_have_exit_codes() {
        let err = ServerError::from(kimp_core::ValidationError::EmptyMapping);
        assert_eq!(err.exit_code(), 2);

        let err = ServerError::Bind {
            addr: SocketAddr::from(([127, 0, 0, 1], 8000)),
            source: std::io::Error::from(std::io::ErrorKind::AddrInUse),
        };
        assert_eq!(err.exit_code(), 3);
        assert!(err.to_string().starts_with("failed to bind 127.0.0.1:8000"));
    }
}
