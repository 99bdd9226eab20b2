use axum::{Router, routing::post};
use std::sync::Arc;
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

use crate::pipeline::Pipeline;

pub mod handlers;
pub mod models;

pub fn create_router(pipeline: Arc<Pipeline>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/api/request", post(handlers::predict_handler))
        .with_state(pipeline)
        .layer(TraceLayer::new_for_http())
        .layer(cors)
}
