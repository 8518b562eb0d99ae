use crate::config::OpenAIConfig;
use crate::prompt::PromptMessages;
use async_openai::error::OpenAIError;
use async_openai::types::{
    ChatCompletionRequestMessage, ChatCompletionRequestSystemMessageArgs,
    ChatCompletionRequestUserMessageArgs, CreateChatCompletionRequest,
    CreateChatCompletionRequestArgs,
};
use tracing::debug;

/// トークン制限戦略を表現する列挙型
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum TokenLimitStrategy {
    /// `max_tokens` を使用（4o / 3.5 系モデル向け）
    MaxTokens,
    /// `max_completion_tokens` を使用（それ以外のモデル向け）
    MaxCompletionTokens,
}

/// モデル名からトークン制限戦略を判定する
pub(crate) fn determine_token_limit_strategy(model: &str) -> TokenLimitStrategy {
    if model.contains("4o") || model.contains("3.5") {
        debug!(target: "openai", model = %model, strategy = "MaxTokens", "legacy token limit family");
        TokenLimitStrategy::MaxTokens
    } else {
        debug!(target: "openai", model = %model, strategy = "MaxCompletionTokens", "completion token limit family");
        TokenLimitStrategy::MaxCompletionTokens
    }
}

/// system → user の順でメッセージ列に変換する
pub(crate) fn to_chat_messages(
    prompt: &PromptMessages,
) -> Result<Vec<ChatCompletionRequestMessage>, OpenAIError> {
    let system = ChatCompletionRequestSystemMessageArgs::default()
        .content(prompt.system.as_str())
        .build()?;
    let user = ChatCompletionRequestUserMessageArgs::default()
        .content(prompt.user.as_str())
        .build()?;
    Ok(vec![system.into(), user.into()])
}

/// プロンプトと設定から ChatCompletion リクエストを構築する
pub(crate) fn build_chat_request(
    prompt: &PromptMessages,
    config: &OpenAIConfig,
) -> Result<CreateChatCompletionRequest, OpenAIError> {
    let mut builder = CreateChatCompletionRequestArgs::default();
    builder.model(&config.model).messages(to_chat_messages(prompt)?);

    let req = match determine_token_limit_strategy(&config.model) {
        TokenLimitStrategy::MaxTokens => builder.max_tokens(config.max_tokens).build()?,
        TokenLimitStrategy::MaxCompletionTokens => builder
            .max_completion_tokens(config.max_completion_tokens)
            .build()?,
    };
    Ok(req)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn prompt() -> PromptMessages {
        PromptMessages {
            system: "sys".into(),
            user: "usr".into(),
        }
    }

    #[test]
    fn strategy_by_model_family() {
        assert_eq!(determine_token_limit_strategy("gpt-4o-mini"), TokenLimitStrategy::MaxTokens);
        assert_eq!(determine_token_limit_strategy("gpt-3.5-turbo"), TokenLimitStrategy::MaxTokens);
        assert_eq!(determine_token_limit_strategy("gpt-5"), TokenLimitStrategy::MaxCompletionTokens);
    }

    #[test]
    fn messages_are_system_then_user() {
        let msgs = to_chat_messages(&prompt()).unwrap();
        assert_eq!(msgs.len(), 2);
        assert!(matches!(msgs[0], ChatCompletionRequestMessage::System(_)));
        assert!(matches!(msgs[1], ChatCompletionRequestMessage::User(_)));
    }

    #[test]
    fn request_uses_configured_model_and_limit() {
        let config = OpenAIConfig {
            model: "gpt-5".into(),
            max_completion_tokens: 1234,
            ..OpenAIConfig::default()
        };
        let req = build_chat_request(&prompt(), &config).unwrap();
        assert_eq!(req.model, "gpt-5");
        assert_eq!(req.max_completion_tokens, Some(1234));
        assert_eq!(req.max_tokens, None);
    }
}
