//! rcon_builder の HTTP フロントエンド

pub mod handlers;
pub mod logging;
pub mod models;

use std::sync::Arc;

use axum::{
    routing::{get, post},
    Router,
};
use rcon_builder::BuildService;

/// ルーティング設定
pub fn router(service: Arc<BuildService>) -> Router {
    Router::new()
        // 建築APIルート（`/` は Content-Type なしで送ってくる従来のクライアント向け）
        .route("/", post(handlers::build_legacy))
        .route("/api/build", post(handlers::build_api))
        .route("/health", get(handlers::health))
        .with_state(service)
}
