#![allow(dead_code)]

use async_trait::async_trait;
use once_cell::sync::Lazy;
use std::sync::{Arc, Mutex, Once};
use std::time::Duration;
use tracing_appender::rolling;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use rcon_builder::{
    BuildService, ChatModel, Console, ConsoleError, ConnectionGate, ModelError, ParseMode,
    Position, PromptMessages, SharedConsole,
};

static START: Once = Once::new();
static _GUARD: Lazy<Mutex<Option<tracing_appender::non_blocking::WorkerGuard>>> =
    Lazy::new(|| Mutex::new(None));

/// Initialize test environment: dotenv and tracing (stderr + file).
/// Idempotent: safe to call multiple times.
pub fn init() {
    START.call_once(|| {
        let _ = dotenvy::dotenv();
        let filter = EnvFilter::try_from_default_env()
            .or_else(|_| EnvFilter::try_new("info"))
            .expect("env filter");

        // Daily rotating log file separate from app runtime logs
        let file_appender = rolling::daily("logs", "tests.log");
        let (file_nb, guard) = tracing_appender::non_blocking(file_appender);
        *_GUARD.lock().unwrap() = Some(guard); // retain guard for lifetime

        let stderr_layer = fmt::layer()
            .with_target(true)
            .with_thread_ids(true)
            .with_writer(std::io::stderr);

        let file_layer = fmt::layer()
            .with_ansi(false)
            .with_target(true)
            .with_thread_ids(true)
            .with_writer(file_nb);

        let _ = tracing_subscriber::registry()
            .with(filter)
            .with(stderr_layer)
            .with(file_layer)
            .try_init();

        tracing::info!(target: "test_init", "Test tracing initialized (stderr + rotating file)");
    });
}

/// One online player as the fake server sees it.
#[derive(Debug, Clone)]
pub struct FakePlayer {
    pub name: String,
    pub pos: (f64, f64, f64),
    pub yaw: f32,
}

impl FakePlayer {
    pub fn new(name: &str, pos: Position, yaw: f32) -> Self {
        Self {
            name: name.to_string(),
            pos: (pos.x as f64 + 0.5, pos.y as f64, pos.z as f64 + 0.5),
            yaw,
        }
    }
}

/// Wire log shared between the fake and the test. Every exchange logs `>` on send and `<`
/// on reply, so overlapping exchanges would show up as two `>` in a row.
pub type WireLog = Arc<Mutex<Vec<String>>>;

/// In-memory console that answers `list` / `data get entity` like a vanilla server and
/// acknowledges everything else.
pub struct FakeConsole {
    pub players: Vec<FakePlayer>,
    pub log: WireLog,
    /// Commands containing this text fail with a protocol error.
    pub fail_on: Option<String>,
    /// Simulated round trip time.
    pub delay: Duration,
}

impl FakeConsole {
    pub fn new(players: Vec<FakePlayer>) -> Self {
        Self {
            players,
            log: Arc::new(Mutex::new(Vec::new())),
            fail_on: None,
            delay: Duration::ZERO,
        }
    }

    pub fn failing_on(mut self, needle: &str) -> Self {
        self.fail_on = Some(needle.to_string());
        self
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    fn answer(&self, command: &str) -> Result<String, ConsoleError> {
        if let Some(needle) = &self.fail_on {
            if command.contains(needle.as_str()) {
                return Err(ConsoleError::Protocol(format!("injected failure for `{command}`")));
            }
        }
        if command == "list" {
            let names: Vec<&str> = self.players.iter().map(|p| p.name.as_str()).collect();
            return Ok(format!(
                "There are {} of a max of 20 players online: {}",
                names.len(),
                names.join(", ")
            ));
        }
        if let Some(rest) = command.strip_prefix("data get entity ") {
            let mut parts = rest.split_whitespace();
            let name = parts.next().unwrap_or_default();
            let field = parts.next().unwrap_or_default();
            let Some(p) = self.players.iter().find(|p| p.name == name) else {
                return Ok("No entity was found".to_string());
            };
            return Ok(match field {
                "Pos" => format!(
                    "{name} has the following entity data: [{:?}d, {:?}d, {:?}d]",
                    p.pos.0, p.pos.1, p.pos.2
                ),
                "Rotation" => format!("{name} has the following entity data: [{:?}f, 0.0f]", p.yaw),
                _ => "Found no elements matching".to_string(),
            });
        }
        Ok(format!("ok: {command}"))
    }

    /// Only the `execute ...` commands, in wire order.
    pub fn executed(log: &WireLog) -> Vec<String> {
        log.lock()
            .unwrap()
            .iter()
            .filter_map(|l| l.strip_prefix("> "))
            .filter(|c| c.starts_with("execute "))
            .map(str::to_string)
            .collect()
    }
}

#[async_trait]
impl Console for FakeConsole {
    async fn send_command(&mut self, command: &str) -> Result<String, ConsoleError> {
        self.log.lock().unwrap().push(format!("> {command}"));
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        let answer = self.answer(command);
        self.log.lock().unwrap().push(format!("< {command}"));
        answer
    }
}

/// What the scripted model does when called.
#[derive(Debug, Clone)]
pub enum Script {
    Reply(String),
    NoChoices,
    /// Reply after sleeping.
    Slow(Duration, String),
}

pub struct ScriptedModel {
    pub script: Script,
    pub prompts: Mutex<Vec<PromptMessages>>,
}

impl ScriptedModel {
    pub fn new(script: Script) -> Self {
        Self { script, prompts: Mutex::new(Vec::new()) }
    }

    pub fn reply(text: &str) -> Self {
        Self::new(Script::Reply(text.to_string()))
    }
}

#[async_trait]
impl ChatModel for ScriptedModel {
    async fn complete(&self, prompt: &PromptMessages) -> Result<String, ModelError> {
        self.prompts.lock().unwrap().push(prompt.clone());
        match &self.script {
            Script::Reply(text) => Ok(text.clone()),
            Script::NoChoices => Err(ModelError::EmptyChoice),
            Script::Slow(delay, text) => {
                tokio::time::sleep(*delay).await;
                Ok(text.clone())
            }
        }
    }
}

pub fn service(console: FakeConsole, model: Arc<ScriptedModel>, timeout: Duration) -> BuildService {
    let console: SharedConsole = Box::new(console);
    BuildService::new(ConnectionGate::new(console), model, ParseMode::Lenient, timeout)
}

pub const PLATFORM_REPLY: &str =
    "```\n/fill 0 64 0 2 64 2 minecraft:stone\n```\nA 3x3 stone platform.";
