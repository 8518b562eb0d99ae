//! BuildService
//!
//! 建築リクエスト1件を処理するビジネスロジック層。HTTP 層から独立している。
//! プレイヤー解決 → プロンプト構築 → モデル呼び出し → パース → コマンド送信 の順に進み、
//! どこで失敗しても再試行はしない。

use std::sync::Arc;
use std::time::Duration;

use tokio::time::Instant;
use tracing::{info, instrument, warn};

use crate::console::{Console, ConsoleError};
use crate::dispatcher::{dispatch_until, DispatchResult};
use crate::gate::ConnectionGate;
use crate::openai::{ChatModel, ModelError};
use crate::parser::{parse_reply_with, ParseError, ParseMode};
use crate::prompt::build_prompt;
use crate::world::PlayerContext;

/// 共有コンソール（RCON クライアントまたはテスト用の実装）
pub type SharedConsole = Box<dyn Console>;

/// 建築リクエスト
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuildRequest {
    pub player_name: String,
    /// 自由記述。空でもよい
    pub message: String,
}

/// 成功時の結果
#[derive(Debug, Clone)]
pub struct BuildOutcome {
    pub player: PlayerContext,
    pub commands: Vec<String>,
    pub description: String,
    /// モデルの生の返答
    pub reply: String,
    pub dispatch: DispatchResult,
}

/// タイムアウトが発生した段階
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    PlayerLookup,
    Model,
    Dispatch,
}

impl std::fmt::Display for Stage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            Stage::PlayerLookup => "player lookup",
            Stage::Model => "model call",
            Stage::Dispatch => "dispatch",
        })
    }
}

#[derive(Debug, thiserror::Error)]
pub enum BuildError {
    #[error("bad request: {0}")]
    BadRequest(String),
    #[error("player not found: {0}")]
    PlayerNotFound(String),
    #[error("player lookup failed: {0}")]
    Console(#[source] ConsoleError),
    #[error("model call failed: {0}")]
    UpstreamModel(#[from] ModelError),
    #[error("could not parse model reply: {0}")]
    Parse(#[from] ParseError),
    /// 途中まで実行済みの可能性がある。`result.world_modified()` で確認する
    #[error("command #{} `{command}` failed after {succeeded} succeeded: {error}", .index + 1)]
    Dispatch {
        command: String,
        index: usize,
        succeeded: usize,
        error: String,
        description: String,
        result: DispatchResult,
    },
    #[error("timed out during {stage}")]
    Timeout { stage: Stage },
}

impl BuildError {
    /// ワールドが変更された状態で失敗したか
    pub fn world_modified(&self) -> bool {
        match self {
            BuildError::Dispatch { result, .. } => result.world_modified(),
            _ => false,
        }
    }
}

/// 建築サービス
pub struct BuildService {
    gate: ConnectionGate<SharedConsole>,
    model: Arc<dyn ChatModel>,
    parse_mode: ParseMode,
    request_timeout: Duration,
}

impl BuildService {
    /// 新しいBuildServiceインスタンスを作成
    pub fn new(
        gate: ConnectionGate<SharedConsole>,
        model: Arc<dyn ChatModel>,
        parse_mode: ParseMode,
        request_timeout: Duration,
    ) -> Self {
        Self { gate, model, parse_mode, request_timeout }
    }

    pub fn gate(&self) -> &ConnectionGate<SharedConsole> {
        &self.gate
    }

    /// リクエスト1件を処理する
    ///
    /// # Returns
    /// 全コマンド成功時は `BuildOutcome`。途中で失敗した場合は `BuildError::Dispatch` に部分結果が入る
    #[instrument(name = "build_request", skip_all, fields(player = %req.player_name, message_len = req.message.len()))]
    pub async fn handle(&self, req: BuildRequest) -> Result<BuildOutcome, BuildError> {
        let player_name = req.player_name.trim();
        if player_name.is_empty() {
            return Err(BuildError::BadRequest("player_name must not be empty".into()));
        }
        let deadline = Instant::now() + self.request_timeout;

        // 1. プレイヤー解決（毎回取り直す）
        let player = tokio::time::timeout_at(deadline, self.resolve_player(player_name))
            .await
            .map_err(|_| BuildError::Timeout { stage: Stage::PlayerLookup })??;
        info!(target: "build_service", position = %player.position, facing = %player.facing, "player resolved");

        // 2. プロンプト構築とモデル呼び出し
        let prompt = build_prompt(&player, &req.message);
        let reply = tokio::time::timeout_at(deadline, self.model.complete(&prompt))
            .await
            .map_err(|_| BuildError::Timeout { stage: Stage::Model })??;
        info!(target: "build_service", reply_len = reply.len(), "model replied");

        // 3. パース（失敗時は何も送らない）
        let parsed = parse_reply_with(&reply, self.parse_mode).inspect_err(|e| {
            warn!(target: "build_service", error = %e, "reply rejected");
        })?;
        info!(target: "build_service", commands = parsed.commands.len(), "reply parsed");

        // 4. ゲートを保持したまま全コマンドを送信
        let mut handle = tokio::time::timeout_at(deadline, self.gate.acquire())
            .await
            .map_err(|_| BuildError::Timeout { stage: Stage::Dispatch })?;
        let result = dispatch_until(&player, &parsed.commands, &mut handle, Some(deadline)).await;
        handle.release();

        let failure = result
            .failure()
            .map(|(index, command, error)| (index, command.to_string(), error.to_string()));
        if let Some((index, command, error)) = failure {
            return Err(BuildError::Dispatch {
                command,
                index,
                succeeded: result.succeeded(),
                error,
                description: parsed.description,
                result,
            });
        }

        Ok(BuildOutcome {
            player,
            commands: parsed.commands,
            description: parsed.description,
            reply,
            dispatch: result,
        })
    }

    async fn resolve_player(&self, name: &str) -> Result<PlayerContext, BuildError> {
        let mut handle = self.gate.acquire().await;
        let online = handle.list_players().await.map_err(BuildError::Console)?;
        if !online.iter().any(|n| n == name) {
            return Err(BuildError::PlayerNotFound(name.to_string()));
        }
        handle.fetch_player(name).await.map_err(BuildError::Console)
    }
}
