//! コマンド送信
//!
//! 保持中のゲートハンドルを通して、パース済みのコマンドを1件ずつ送る。
//! 各コマンドはプレイヤーの位置・権限で実行されるよう書き換える。最初の失敗で止まる。
//! 実行済みのコマンドは巻き戻さず、部分結果として返す。

use serde::ser::{Serialize, SerializeStruct, Serializer};
use std::fmt::{self, Display};
use tokio::time::Instant;
use tracing::{debug, info, instrument, warn};

use crate::console::Console;
use crate::gate::GateHandle;
use crate::world::PlayerContext;

/// コンソールとの1往復の結果
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    Success(String),
    Failure(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandOutcome {
    /// パース直後のコマンド（プレイヤー向け書き換え前）
    pub command: String,
    pub outcome: Outcome,
}

// {"command": .., "status": "success" | "failure", "output": ..}
impl Serialize for CommandOutcome {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let (status, output) = match &self.outcome {
            Outcome::Success(ack) => ("success", ack),
            Outcome::Failure(err) => ("failure", err),
        };
        let mut s = serializer.serialize_struct("CommandOutcome", 3)?;
        s.serialize_field("command", &self.command)?;
        s.serialize_field("status", status)?;
        s.serialize_field("output", output)?;
        s.end()
    }
}

/// 送信順の結果。失敗があるのは最後の要素だけ
#[derive(Debug, Clone, Default, PartialEq, Eq, serde::Serialize)]
#[serde(transparent)]
pub struct DispatchResult {
    pub entries: Vec<CommandOutcome>,
}

impl DispatchResult {
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn succeeded(&self) -> usize {
        self.entries
            .iter()
            .filter(|e| matches!(e.outcome, Outcome::Success(_)))
            .count()
    }

    /// 失敗した要素の (インデックス, コマンド, エラー)
    pub fn failure(&self) -> Option<(usize, &str, &str)> {
        self.entries
            .iter()
            .enumerate()
            .find_map(|(i, e)| match &e.outcome {
                Outcome::Failure(err) => Some((i, e.command.as_str(), err.as_str())),
                Outcome::Success(_) => None,
            })
    }

    /// 1件以上のコマンドがワールドに反映されたか
    pub fn world_modified(&self) -> bool {
        self.succeeded() > 0
    }
}

impl Display for DispatchResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.failure() {
            Some((i, cmd, err)) => write!(
                f,
                "{} succeeded, failed at #{} `{}`: {}",
                self.succeeded(),
                i + 1,
                cmd,
                err
            ),
            None => write!(f, "{} succeeded", self.succeeded()),
        }
    }
}

/// `execute at <name> as <name> run <command>`
pub fn relative_to_player(player_name: &str, command: &str) -> String {
    format!("execute at {player_name} as {player_name} run {command}")
}

/// 全コマンドを順に送る。最初の失敗で止まる
pub async fn dispatch<C: Console>(
    player: &PlayerContext,
    commands: &[String],
    handle: &mut GateHandle<C>,
) -> DispatchResult {
    dispatch_until(player, commands, handle, None).await
}

/// 期限付きの [`dispatch`]。
///
/// 送信中に期限を過ぎた場合、そのコマンドを失敗として記録し、残りは送らない。
#[instrument(name = "dispatch", skip_all, fields(player = %player.name, total = commands.len()))]
pub async fn dispatch_until<C: Console>(
    player: &PlayerContext,
    commands: &[String],
    handle: &mut GateHandle<C>,
    deadline: Option<Instant>,
) -> DispatchResult {
    let mut result = DispatchResult::default();
    for (index, command) in commands.iter().enumerate() {
        let wire = relative_to_player(&player.name, command);
        debug!(target: "dispatch", index, command = %wire, "sending command");

        let exchange = handle.send_command(&wire);
        let reply = match deadline {
            Some(at) => match tokio::time::timeout_at(at, exchange).await {
                Ok(r) => r.map_err(|e| e.to_string()),
                Err(_) => Err("request deadline exceeded".to_string()),
            },
            None => exchange.await.map_err(|e| e.to_string()),
        };

        match reply {
            Ok(ack) => {
                debug!(target: "dispatch", index, ack = %ack, "command acknowledged");
                result.entries.push(CommandOutcome {
                    command: command.clone(),
                    outcome: Outcome::Success(ack),
                });
            }
            Err(error) => {
                warn!(target: "dispatch", index, command = %command, error = %error, "command failed, stopping");
                result.entries.push(CommandOutcome {
                    command: command.clone(),
                    outcome: Outcome::Failure(error),
                });
                break;
            }
        }
    }
    info!(target: "dispatch", summary = %result, "dispatch finished");
    result
}
