use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;
use crate::error::PipelineError;

pub fn success<T: Serialize>(data: T) -> (StatusCode, Json<T>) {
    (StatusCode::OK, Json(data))
}

/// `{ "error": ... }` with the status matching the error's outcome.
pub fn error(err: PipelineError) -> Response {
    err.into_response()
}
