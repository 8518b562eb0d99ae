use std::sync::Arc;

use axum::{
    body::Bytes,
    extract::{rejection::JsonRejection, Json, State},
    http::StatusCode,
    response::{IntoResponse, Response},
};

use rcon_builder::{BuildError, BuildRequest, BuildService};
use crate::models::{BuildRequestBody, BuildResponse, ErrorResponse, HealthResponse, PartialBuild};

/// POST /api/build - 建築リクエストを処理してコマンドを実行
#[axum::debug_handler]
pub async fn build_api(
    State(service): State<Arc<BuildService>>,
    payload: Result<Json<BuildRequestBody>, JsonRejection>,
) -> Response {
    run_build(&service, payload.map(|Json(body)| body)).await
}

/// POST / - 従来のクライアント向け。Content-Type を問わず本文を JSON として読む
#[axum::debug_handler]
pub async fn build_legacy(State(service): State<Arc<BuildService>>, body: Bytes) -> Response {
    let payload = Json::<BuildRequestBody>::from_bytes(&body).map(|Json(body)| body);
    run_build(&service, payload).await
}

async fn run_build(
    service: &BuildService,
    payload: Result<BuildRequestBody, JsonRejection>,
) -> Response {
    let body = match payload {
        Ok(body) => body,
        Err(rejection) => {
            tracing::warn!(target: "web::build", error = %rejection.body_text(), "Malformed build request");
            return error_response(BuildError::BadRequest(rejection.body_text()));
        }
    };

    tracing::info!(target: "web::build", player = %body.player_name, message = %body.message, "Received build request");

    let req = BuildRequest {
        player_name: body.player_name,
        message: body.message,
    };
    match service.handle(req).await {
        Ok(outcome) => {
            tracing::info!(target: "web::build", commands = outcome.commands.len(), "Build request successful");
            Json(BuildResponse::from(outcome)).into_response()
        }
        Err(e) => {
            tracing::error!(target: "web::build", error = %e, world_modified = e.world_modified(), "Build request failed");
            error_response(e)
        }
    }
}

/// GET /health
pub async fn health() -> Json<HealthResponse> {
    Json(HealthResponse { status: "ok" })
}

fn status_and_kind(err: &BuildError) -> (StatusCode, &'static str) {
    match err {
        BuildError::BadRequest(_) => (StatusCode::BAD_REQUEST, "bad_request"),
        BuildError::PlayerNotFound(_) => (StatusCode::NOT_FOUND, "player_not_found"),
        BuildError::Console(_) => (StatusCode::INTERNAL_SERVER_ERROR, "console"),
        BuildError::UpstreamModel(_) => (StatusCode::INTERNAL_SERVER_ERROR, "upstream_model"),
        BuildError::Parse(_) => (StatusCode::INTERNAL_SERVER_ERROR, "parse"),
        BuildError::Dispatch { .. } => (StatusCode::INTERNAL_SERVER_ERROR, "dispatch"),
        BuildError::Timeout { .. } => (StatusCode::INTERNAL_SERVER_ERROR, "timeout"),
    }
}

fn error_response(err: BuildError) -> Response {
    let (status, kind) = status_and_kind(&err);
    let error = err.to_string();
    let partial = match err {
        BuildError::Dispatch { command, index, succeeded, description, result, .. } => Some(PartialBuild {
            world_modified: result.world_modified(),
            completed: succeeded,
            failed_index: index,
            failed_command: command,
            description,
            results: result,
        }),
        _ => None,
    };
    (status, Json(ErrorResponse { error, kind, partial })).into_response()
}
