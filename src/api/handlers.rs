use axum::extract::rejection::JsonRejection;
use axum::response::{IntoResponse, Response};
use axum::{Json, extract::State, http::StatusCode};
use std::sync::Arc;
use std::time::Instant;
use tracing::Instrument;

use crate::data_models::{PredictionRequest, PredictionResponse};
use crate::pipeline::Pipeline;

use super::models::ErrorBody;

/// Only client input problems are explained to the caller. Everything else
/// is logged and answered with a generic message.
#[derive(Debug)]
pub enum ApiError {
    BadRequest(String),
    Internal,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, detail) = match self {
            ApiError::BadRequest(detail) => (StatusCode::BAD_REQUEST, detail),
            ApiError::Internal => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "Internal server error".to_string(),
            ),
        };
        (status, Json(ErrorBody { detail })).into_response()
    }
}

pub async fn predict_handler(
    State(pipeline): State<Arc<Pipeline>>,
    payload: Result<Json<PredictionRequest>, JsonRejection>,
) -> Result<Json<PredictionResponse>, ApiError> {
    let Json(request) = payload.map_err(|e| {
        tracing::warn!(error = %e, "rejected request body");
        ApiError::BadRequest(e.body_text())
    })?;

    if request.query.trim().is_empty() {
        tracing::warn!(id = %request.id, "empty query");
        return Err(ApiError::BadRequest("Query cannot be empty".to_string()));
    }

    let span = tracing::info_span!("predict", id = %request.id);
    async move {
        let start = Instant::now();
        tracing::info!("processing prediction request");

        match pipeline.run(request.id, &request.query).await {
            Ok(response) => {
                tracing::info!(
                    elapsed_ms = start.elapsed().as_millis() as u64,
                    answer = ?response.answer,
                    sources = response.sources.len(),
                    "successfully processed request"
                );
                Ok(Json(response))
            }
            Err(e) => {
                tracing::error!(error = %e, "internal error processing request");
                Err(ApiError::Internal)
            }
        }
    }
    .instrument(span)
    .await
}
