//! async-openai を使った ChatModel 実装

use async_openai::config::OpenAIConfig as ApiConfig;
use async_openai::error::OpenAIError;
use async_openai::Client;
use async_trait::async_trait;
use tracing::{debug, info, instrument};

use super::request::build_chat_request;
use crate::config::OpenAIConfig;
use crate::prompt::PromptMessages;

/// チャットモデル呼び出しのエラー
#[derive(Debug, thiserror::Error)]
pub enum ModelError {
    #[error("chat completion request failed: {0}")]
    Api(#[from] OpenAIError),
    #[error("chat completion returned no choices")]
    EmptyChoice,
    #[error("chat completion choice has no message content")]
    EmptyContent,
    #[error("chat completion transport error: {0}")]
    Transport(String),
}

/// チャット補完の呼び出し口。テストではスクリプト化した実装に差し替える。
#[async_trait]
pub trait ChatModel: Send + Sync {
    /// system → user の順で送り、最初の choice の本文を返す
    async fn complete(&self, prompt: &PromptMessages) -> Result<String, ModelError>;
}

/// OpenAI Chat Completions API クライアント
pub struct OpenAIChat {
    client: Client<ApiConfig>,
    config: OpenAIConfig,
}

impl OpenAIChat {
    pub fn new(config: OpenAIConfig) -> Result<Self, ModelError> {
        let mut api = ApiConfig::new().with_api_key(config.api_key.as_str());
        if let Some(base) = &config.api_base {
            api = api.with_api_base(base.as_str());
        }
        // タイムアウト付きの HTTP クライアントを差し込む
        let http = reqwest::Client::builder()
            .user_agent(concat!("rcon_builder/", env!("CARGO_PKG_VERSION")))
            .timeout(config.timeout)
            .build()
            .map_err(|e| ModelError::Transport(e.to_string()))?;
        let client = Client::with_config(api).with_http_client(http);
        Ok(Self { client, config })
    }

    pub fn model(&self) -> &str {
        &self.config.model
    }
}

#[async_trait]
impl ChatModel for OpenAIChat {
    #[instrument(name = "chat_complete", skip_all, fields(model = %self.config.model, user_len = prompt.user.len()))]
    async fn complete(&self, prompt: &PromptMessages) -> Result<String, ModelError> {
        let req = build_chat_request(prompt, &self.config)?;

        info!(target: "openai", "chat_request: model={}, max_tokens={}", self.config.model, self.config.max_tokens);
        let resp = self.client.chat().create(req).await?;
        debug!(target: "openai", "chat_response_choices: {}", resp.choices.len());

        let choice = resp.choices.into_iter().next().ok_or(ModelError::EmptyChoice)?;
        choice.message.content.ok_or(ModelError::EmptyContent)
    }
}
