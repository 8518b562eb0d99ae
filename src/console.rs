//! リモートコンソールの抽象
//!
//! 実装が必要なのは `send_command` だけ。プレイヤー情報の取得はその上に
//! バニラの `list` / `data get entity` で組み立てるため、テスト用の実装と
//! 本物の RCON クライアントで応答の解析を共有できる。

use async_trait::async_trait;
use tracing::debug;

use crate::world::{Facing, PlayerContext, Position};

#[derive(Debug, thiserror::Error)]
pub enum ConsoleError {
    #[error("console I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("console authentication failed")]
    AuthFailed,
    #[error("console protocol error: {0}")]
    Protocol(String),
    #[error("command is {len} bytes, console accepts at most {max}")]
    CommandTooLong { len: usize, max: usize },
    #[error("console exchange timed out")]
    TimedOut,
    #[error("unexpected console reply to `{command}`: {reply}")]
    UnexpectedReply { command: String, reply: String },
}

#[async_trait]
pub trait Console: Send {
    /// コマンドを1つ送り、応答テキストを待つ
    async fn send_command(&mut self, command: &str) -> Result<String, ConsoleError>;

    /// オンライン中のプレイヤー名
    async fn list_players(&mut self) -> Result<Vec<String>, ConsoleError> {
        let reply = self.send_command("list").await?;
        let names = parse_player_list(&reply);
        debug!(target: "rcon", online = names.len(), "player_list");
        Ok(names)
    }

    /// オンライン中のプレイヤーの現在のブロック座標と向き
    async fn fetch_player(&mut self, name: &str) -> Result<PlayerContext, ConsoleError> {
        let pos_cmd = format!("data get entity {name} Pos");
        let pos_reply = self.send_command(&pos_cmd).await?;
        let pos = parse_entity_vector(&pos_reply)
            .filter(|v| v.len() == 3)
            .ok_or_else(|| ConsoleError::UnexpectedReply {
                command: pos_cmd.clone(),
                reply: pos_reply.clone(),
            })?;

        let rot_cmd = format!("data get entity {name} Rotation");
        let rot_reply = self.send_command(&rot_cmd).await?;
        let rot = parse_entity_vector(&rot_reply)
            .filter(|v| v.len() == 2)
            .ok_or_else(|| ConsoleError::UnexpectedReply {
                command: rot_cmd.clone(),
                reply: rot_reply.clone(),
            })?;

        Ok(PlayerContext {
            name: name.to_string(),
            position: Position::new(
                pos[0].floor() as i32,
                pos[1].floor() as i32,
                pos[2].floor() as i32,
            ),
            facing: Facing::from_yaw(rot[0] as f32),
        })
    }
}

#[async_trait]
impl<C: Console + ?Sized> Console for Box<C> {
    async fn send_command(&mut self, command: &str) -> Result<String, ConsoleError> {
        (**self).send_command(command).await
    }

    async fn list_players(&mut self) -> Result<Vec<String>, ConsoleError> {
        (**self).list_players().await
    }

    async fn fetch_player(&mut self, name: &str) -> Result<PlayerContext, ConsoleError> {
        (**self).fetch_player(name).await
    }
}

/// "There are 2 of a max of 20 players online: Alex, Steve"
/// （古いサーバー: "There are 2/20 players online:\nAlex, Steve"）
pub fn parse_player_list(reply: &str) -> Vec<String> {
    let Some((_, names)) = reply.split_once(':') else {
        return Vec::new();
    };
    names
        .split([',', '\n'])
        .map(str::trim)
        .filter(|n| !n.is_empty())
        .map(str::to_string)
        .collect()
}

/// "Steve has the following entity data: [-12.5d, 64.0d, 103.3d]" → [-12.5, 64.0, 103.3]
pub fn parse_entity_vector(reply: &str) -> Option<Vec<f64>> {
    let open = reply.rfind('[')?;
    let close = open + reply[open..].find(']')?;
    reply[open + 1..close]
        .split(',')
        .map(|part| {
            part.trim()
                .trim_end_matches(['d', 'D', 'f', 'F'])
                .parse::<f64>()
                .ok()
                .filter(|v| v.is_finite())
        })
        .collect()
}
