use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};
use rusqlite::ErrorCode;
use thiserror::Error;
use tracing::error;

use crate::{password::PasswordError, stream::StreamError};

#[derive(Error, Debug)]
pub enum DatabaseError {
    #[error("Record not found")]
    NotFound,

    #[error("Constraint violated: {0}")]
    Conflict(String),

    #[error("SQLite error: {0}")]
    Sqlite(rusqlite::Error),

    #[error("Malformed row: {0}")]
    Row(#[from] StreamError),

    #[error("Database task failed: {0}")]
    Task(String),
}

impl From<rusqlite::Error> for DatabaseError {
    fn from(error: rusqlite::Error) -> Self {
        match error {
            rusqlite::Error::QueryReturnedNoRows => DatabaseError::NotFound,
            rusqlite::Error::SqliteFailure(failure, message)
                if failure.code == ErrorCode::ConstraintViolation =>
            {
                DatabaseError::Conflict(message.unwrap_or_else(|| failure.to_string()))
            }
            other => DatabaseError::Sqlite(other),
        }
    }
}

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Malformed payload")]
    MalformedPayload,

    #[error("Invalid student ID")]
    InvalidId,

    #[error("{0}")]
    NotFound(&'static str),

    #[error("{0}")]
    Conflict(&'static str),

    #[error("{context}")]
    Database {
        context: &'static str,
        #[source]
        source: DatabaseError,
    },

    #[error("Error scanning student: {0}")]
    Stream(#[from] StreamError),

    #[error("Password error: {0}")]
    Password(#[from] PasswordError),

    #[error("Internal error: {0}")]
    InternalError(#[from] Box<dyn std::error::Error + Send + Sync>),
}

impl AppError {
    /// Wraps a database failure with the message shown to the client.
    pub fn database(context: &'static str) -> impl FnOnce(DatabaseError) -> AppError {
        move |source| match source {
            DatabaseError::Conflict(_) => AppError::Conflict(context),
            source => AppError::Database { context, source },
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = match self {
            AppError::MalformedPayload | AppError::InvalidId => StatusCode::BAD_REQUEST,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::Conflict(_) => StatusCode::CONFLICT,
            AppError::Database { .. }
            | AppError::Stream(_)
            | AppError::Password(_)
            | AppError::InternalError(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };

        if status.is_server_error() {
            match &self {
                AppError::Database { source, .. } => error!("{self}: {source}"),
                _ => error!("{self}"),
            }
        }

        (status, self.to_string()).into_response()
    }
}
