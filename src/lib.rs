//! rcon_builder
//!
//! プレイヤーの建築リクエストをチャットモデルで Minecraft コマンド列に変換し、
//! 共有の RCON 接続を通してプレイヤーの位置・向きを基準に実行する。
//! HTTP 層は `crates/rcon_builder_web` にある。

pub mod config;
pub mod console;
pub mod dispatcher;
pub mod gate;
pub mod openai;
pub mod parser;
pub mod prompt;
pub mod rcon;
pub mod services;
pub mod world;

// 主要な型を再エクスポート
pub use config::{Config, ConfigError};
pub use console::{Console, ConsoleError};
pub use dispatcher::{dispatch, dispatch_until, CommandOutcome, DispatchResult, Outcome};
pub use gate::{ConnectionGate, GateHandle, GateTimeout};
pub use openai::{ChatModel, ModelError, OpenAIChat};
pub use parser::{parse_reply, parse_reply_with, ParseError, ParseMode, ParsedOutcome};
pub use prompt::{build_prompt, PromptMessages};
pub use rcon::RconClient;
pub use services::{BuildError, BuildOutcome, BuildRequest, BuildService, SharedConsole};
pub use world::{Facing, PlayerContext, Position};

// Ensure .env is loaded for tests before anything else runs in the test process.
#[cfg(test)]
#[ctor::ctor]
fn load_dotenv_for_tests() {
    let _ = dotenvy::dotenv();
}
