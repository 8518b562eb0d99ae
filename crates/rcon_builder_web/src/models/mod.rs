use serde::{Deserialize, Serialize};

use rcon_builder::{BuildOutcome, DispatchResult, PlayerContext};

/// 建築リクエスト
#[derive(Debug, Deserialize)]
pub struct BuildRequestBody {
    pub player_name: String,
    #[serde(default)]
    pub message: String,
}

/// 建築レスポンス（全コマンド成功時）
#[derive(Debug, Serialize)]
pub struct BuildResponse {
    pub player: PlayerContext,
    pub description: String,
    pub commands: Vec<String>,
    pub results: DispatchResult,
    /// モデルの生の返答
    pub reply: String,
}

impl From<BuildOutcome> for BuildResponse {
    fn from(o: BuildOutcome) -> Self {
        Self {
            player: o.player,
            description: o.description,
            commands: o.commands,
            results: o.dispatch,
            reply: o.reply,
        }
    }
}

/// 途中まで実行された建築の情報
#[derive(Debug, Serialize)]
pub struct PartialBuild {
    pub world_modified: bool,
    pub completed: usize,
    pub failed_index: usize,
    pub failed_command: String,
    pub description: String,
    pub results: DispatchResult,
}

/// エラーレスポンス
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
    pub kind: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub partial: Option<PartialBuild>,
}

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
}
