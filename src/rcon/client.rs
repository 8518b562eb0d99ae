//! 単一の TCP 接続上の非同期 RCON クライアント

use std::time::Duration;

use async_trait::async_trait;
use tokio::net::TcpStream;
use tokio::time::timeout;
use tracing::{debug, info, instrument, warn};

use super::packet::{
    read_packet, write_packet, Packet, AUTH, AUTH_RESPONSE, EXEC_COMMAND, MAX_OUTGOING_BODY,
    RESPONSE_VALUE,
};
use crate::config::RconConfig;
use crate::console::{Console, ConsoleError};

/// 認証済みの RCON 接続
///
/// 交換の途中で失敗した、あるいは future が破棄された接続は再利用しない。
/// 次の `send_command` で接続し直してから送る（同じコマンドの再送はしない）。
pub struct RconClient {
    addr: String,
    password: String,
    timeout: Duration,
    stream: Option<TcpStream>,
    next_id: i32,
    in_flight: bool,
}

impl RconClient {
    /// 接続してログインまで行う。起動時に失敗した場合は呼び出し側で致命的エラーとして扱う。
    #[instrument(name = "rcon_connect", skip(config), fields(addr = %config.host_port))]
    pub async fn connect(config: &RconConfig) -> Result<Self, ConsoleError> {
        let mut client = Self {
            addr: config.host_port.clone(),
            password: config.password.clone(),
            timeout: config.timeout,
            stream: None,
            next_id: 0,
            in_flight: false,
        };
        client.reconnect().await?;
        info!(target: "rcon", addr = %client.addr, "rcon_connected");
        Ok(client)
    }

    pub fn addr(&self) -> &str {
        &self.addr
    }

    fn next_request_id(&mut self) -> i32 {
        self.next_id = if self.next_id == i32::MAX { 1 } else { self.next_id + 1 };
        self.next_id
    }

    async fn reconnect(&mut self) -> Result<(), ConsoleError> {
        self.stream = None;
        let stream = timeout(self.timeout, TcpStream::connect(&self.addr))
            .await
            .map_err(|_| ConsoleError::TimedOut)??;
        stream.set_nodelay(true)?;
        self.stream = Some(stream);

        let id = self.next_request_id();
        let login = timeout(self.timeout, self.login(id))
            .await
            .unwrap_or(Err(ConsoleError::TimedOut));
        if login.is_err() {
            self.stream = None;
        }
        login
    }

    async fn login(&mut self, id: i32) -> Result<(), ConsoleError> {
        let stream = self
            .stream
            .as_mut()
            .ok_or_else(|| ConsoleError::Protocol("not connected".into()))?;
        write_packet(stream, &Packet::new(id, AUTH, self.password.as_str())).await?;
        loop {
            let reply = read_packet(stream).await?;
            if reply.kind != AUTH_RESPONSE {
                // 一部のサーバーは認証応答の前に空の RESPONSE_VALUE を返す
                continue;
            }
            return match reply.request_id {
                -1 => Err(ConsoleError::AuthFailed),
                rid if rid == id => Ok(()),
                rid => Err(ConsoleError::Protocol(format!(
                    "login reply id {rid}, expected {id}"
                ))),
            };
        }
    }

    async fn exchange(&mut self, command: &str) -> Result<String, ConsoleError> {
        let id = self.next_request_id();
        let stream = self
            .stream
            .as_mut()
            .ok_or_else(|| ConsoleError::Protocol("not connected".into()))?;
        write_packet(stream, &Packet::new(id, EXEC_COMMAND, command)).await?;
        loop {
            let reply = read_packet(stream).await?;
            if reply.request_id == id && reply.kind == RESPONSE_VALUE {
                return Ok(reply.body);
            }
            debug!(target: "rcon", expected = id, got = reply.request_id, "discarding stale packet");
        }
    }
}

#[async_trait]
impl Console for RconClient {
    async fn send_command(&mut self, command: &str) -> Result<String, ConsoleError> {
        if command.len() > MAX_OUTGOING_BODY {
            return Err(ConsoleError::CommandTooLong {
                len: command.len(),
                max: MAX_OUTGOING_BODY,
            });
        }

        let dirty = self.in_flight || self.stream.is_none();
        self.in_flight = true;
        if dirty {
            warn!(target: "rcon", addr = %self.addr, "reconnecting before command");
            if let Err(e) = self.reconnect().await {
                self.in_flight = false;
                return Err(e);
            }
        }

        let result = timeout(self.timeout, self.exchange(command))
            .await
            .unwrap_or(Err(ConsoleError::TimedOut));
        if result.is_err() {
            self.stream = None;
        }
        self.in_flight = false;
        result
    }
}
