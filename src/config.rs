//! アプリケーション設定
//!
//! 起動時に一度だけ読み込む（`.env` → プロセス環境変数）。実行中の再設定はしない。
//! テストからは `Config::from_lookup` に任意の参照関数を渡して環境変数に触れずに構築できる。

use std::fmt;
use std::path::PathBuf;
use std::time::Duration;

use crate::parser::ParseMode;

/// デフォルトのモデル名
pub const DEFAULT_MODEL: &str = "gpt-4o-mini";

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConfigError {
    #[error("required setting {0} is not set")]
    Missing(&'static str),
    #[error("setting {key} has invalid value {value:?}: {reason}")]
    Invalid {
        key: &'static str,
        value: String,
        reason: String,
    },
}

/// RCON 接続設定
#[derive(Clone)]
pub struct RconConfig {
    /// `host:port`
    pub host_port: String,
    pub password: String,
    /// 1往復あたりのタイムアウト
    pub timeout: Duration,
}

// パスワードはログに出さない
impl fmt::Debug for RconConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RconConfig")
            .field("host_port", &self.host_port)
            .field("password", &"<redacted>")
            .field("timeout", &self.timeout)
            .finish()
    }
}

/// OpenAI 設定
#[derive(Clone)]
pub struct OpenAIConfig {
    pub api_key: String,
    /// 互換 API を使う場合のベース URL
    pub api_base: Option<String>,
    /// OpenAI APIモデル名
    pub model: String,
    /// 最大トークン数（4o/3.5 系）
    pub max_tokens: u32,
    /// 最大補完トークン数（それ以外のモデル）
    pub max_completion_tokens: u32,
    pub timeout: Duration,
}

impl Default for OpenAIConfig {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            api_base: None,
            model: DEFAULT_MODEL.to_string(),
            max_tokens: 2000,
            max_completion_tokens: 2000,
            timeout: Duration::from_secs(60),
        }
    }
}

impl fmt::Debug for OpenAIConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OpenAIConfig")
            .field("api_key", &"<redacted>")
            .field("api_base", &self.api_base)
            .field("model", &self.model)
            .field("max_tokens", &self.max_tokens)
            .field("max_completion_tokens", &self.max_completion_tokens)
            .field("timeout", &self.timeout)
            .finish()
    }
}

/// HTTP サーバーとパイプラインの設定
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub bind_addr: String,
    /// 1リクエスト全体の期限（ゲート待ち・モデル呼び出し・送信を含む）
    pub request_timeout: Duration,
    pub parse_mode: ParseMode,
    /// 設定時はこのディレクトリにも日次ローテーションでログを書く
    pub log_dir: Option<PathBuf>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: "0.0.0.0:8000".to_string(),
            request_timeout: Duration::from_secs(120),
            parse_mode: ParseMode::Lenient,
            log_dir: None,
        }
    }
}

/// アプリケーション設定
#[derive(Debug, Clone)]
pub struct Config {
    pub rcon: RconConfig,
    pub openai: OpenAIConfig,
    pub server: ServerConfig,
}

impl Config {
    /// `.env`（あれば）とプロセス環境変数から読み込む
    pub fn load() -> Result<Self, ConfigError> {
        let _ = dotenvy::dotenv();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// 任意の参照関数から設定を構築する
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &'static str| lookup(key).filter(|v| !v.trim().is_empty());
        let required = |key: &'static str| get(key).ok_or(ConfigError::Missing(key));

        let rcon = RconConfig {
            host_port: required("RCON_HOSTPORT")?,
            password: required("RCON_PASSWORD")?,
            timeout: secs(get("RCON_TIMEOUT_SECS"), "RCON_TIMEOUT_SECS", 10)?,
        };

        let openai_defaults = OpenAIConfig::default();
        let max_tokens = number(get("OPENAI_MAX_TOKENS"), "OPENAI_MAX_TOKENS", openai_defaults.max_tokens)?;
        let openai = OpenAIConfig {
            api_key: required("OPENAI_API_KEY")?,
            api_base: get("OPENAI_API_BASE"),
            model: get("OPENAI_MODEL").unwrap_or(openai_defaults.model),
            max_tokens,
            max_completion_tokens: max_tokens,
            timeout: secs(get("OPENAI_TIMEOUT_SECS"), "OPENAI_TIMEOUT_SECS", 60)?,
        };

        let server_defaults = ServerConfig::default();
        let parse_mode = match get("PARSE_MODE") {
            Some(v) => v.parse::<ParseMode>().map_err(|reason| ConfigError::Invalid {
                key: "PARSE_MODE",
                value: v.clone(),
                reason,
            })?,
            None => server_defaults.parse_mode,
        };
        let server = ServerConfig {
            bind_addr: get("BIND_ADDR").unwrap_or(server_defaults.bind_addr),
            request_timeout: secs(get("REQUEST_TIMEOUT_SECS"), "REQUEST_TIMEOUT_SECS", 120)?,
            parse_mode,
            log_dir: get("LOG_DIR").map(PathBuf::from),
        };

        Ok(Self { rcon, openai, server })
    }
}

fn number(value: Option<String>, key: &'static str, default: u32) -> Result<u32, ConfigError> {
    match value {
        None => Ok(default),
        Some(v) => v.trim().parse::<u32>().map_err(|e| ConfigError::Invalid {
            key,
            value: v.clone(),
            reason: e.to_string(),
        }),
    }
}

fn secs(value: Option<String>, key: &'static str, default: u64) -> Result<Duration, ConfigError> {
    let n = number(value, key, default as u32)?;
    if n == 0 {
        return Err(ConfigError::Invalid {
            key,
            value: n.to_string(),
            reason: "must be greater than zero".into(),
        });
    }
    Ok(Duration::from_secs(n.into()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |k: &str| map.get(k).cloned()
    }

    const REQUIRED: &[(&str, &str)] = &[
        ("RCON_HOSTPORT", "127.0.0.1:25575"),
        ("RCON_PASSWORD", "hunter2"),
        ("OPENAI_API_KEY", "sk-test"),
    ];

    #[test]
    fn defaults_applied() {
        let c = Config::from_lookup(lookup(REQUIRED)).unwrap();
        assert_eq!(c.openai.model, "gpt-4o-mini");
        assert_eq!(c.openai.max_tokens, 2000);
        assert_eq!(c.rcon.timeout, Duration::from_secs(10));
        assert_eq!(c.server.bind_addr, "0.0.0.0:8000");
        assert_eq!(c.server.request_timeout, Duration::from_secs(120));
        assert_eq!(c.server.parse_mode, ParseMode::Lenient);
        assert!(c.server.log_dir.is_none());
    }

    #[test]
    fn missing_password_is_reported() {
        let err = Config::from_lookup(lookup(&[
            ("RCON_HOSTPORT", "127.0.0.1:25575"),
            ("OPENAI_API_KEY", "sk-test"),
        ]))
        .unwrap_err();
        assert_eq!(err, ConfigError::Missing("RCON_PASSWORD"));
    }

    #[test]
    fn blank_value_counts_as_missing() {
        let mut pairs = REQUIRED.to_vec();
        pairs.push(("OPENAI_API_KEY", "  "));
        let err = Config::from_lookup(lookup(&pairs)).unwrap_err();
        assert_eq!(err, ConfigError::Missing("OPENAI_API_KEY"));
    }

    #[test]
    fn invalid_numbers_and_modes() {
        let mut pairs = REQUIRED.to_vec();
        pairs.push(("REQUEST_TIMEOUT_SECS", "soon"));
        assert!(matches!(
            Config::from_lookup(lookup(&pairs)),
            Err(ConfigError::Invalid { key: "REQUEST_TIMEOUT_SECS", .. })
        ));

        let mut pairs = REQUIRED.to_vec();
        pairs.push(("RCON_TIMEOUT_SECS", "0"));
        assert!(matches!(
            Config::from_lookup(lookup(&pairs)),
            Err(ConfigError::Invalid { key: "RCON_TIMEOUT_SECS", .. })
        ));

        let mut pairs = REQUIRED.to_vec();
        pairs.push(("PARSE_MODE", "loose"));
        assert!(matches!(
            Config::from_lookup(lookup(&pairs)),
            Err(ConfigError::Invalid { key: "PARSE_MODE", .. })
        ));
    }

    #[test]
    fn secrets_are_redacted_in_debug() {
        let c = Config::from_lookup(lookup(REQUIRED)).unwrap();
        let dbg = format!("{c:?}");
        assert!(!dbg.contains("hunter2"));
        assert!(!dbg.contains("sk-test"));
    }
}
