//! OpenAI連携のモジュール

pub mod client;
pub(crate) mod request;

// 代表的な公開APIを再エクスポート
pub use client::{ChatModel, ModelError, OpenAIChat};
