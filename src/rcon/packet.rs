//! Source RCON のパケット形式
//!
//! `length:i32le | request_id:i32le | type:i32le | body | 0x00 0x00`
//! `length` は自身より後ろのバイト数。

use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

use crate::console::ConsoleError;

/// サーバー → クライアント: コマンドの出力
pub const RESPONSE_VALUE: i32 = 0;
/// クライアント → サーバー: コマンド実行。サーバーのログイン応答も同じ値
pub const EXEC_COMMAND: i32 = 2;
pub const AUTH_RESPONSE: i32 = 2;
/// クライアント → サーバー: 本文にパスワードを入れてログイン
pub const AUTH: i32 = 3;

/// id + type + 終端の NUL 2バイト
const HEADER_LEN: usize = 10;
/// Minecraft がクライアントから受け付ける本文の上限
pub const MAX_OUTGOING_BODY: usize = 1446;
/// Minecraft が1パケットで送る本文の上限
pub const MAX_INCOMING_BODY: usize = 4096;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Packet {
    pub request_id: i32,
    pub kind: i32,
    pub body: String,
}

impl Packet {
    pub fn new(request_id: i32, kind: i32, body: impl Into<String>) -> Self {
        Self { request_id, kind, body: body.into() }
    }

    pub fn encode(&self) -> Vec<u8> {
        let body = self.body.as_bytes();
        let mut buf = Vec::with_capacity(4 + HEADER_LEN + body.len());
        buf.extend_from_slice(&((HEADER_LEN + body.len()) as i32).to_le_bytes());
        buf.extend_from_slice(&self.request_id.to_le_bytes());
        buf.extend_from_slice(&self.kind.to_le_bytes());
        buf.extend_from_slice(body);
        buf.extend_from_slice(&[0, 0]);
        buf
    }
}

pub async fn write_packet<W>(writer: &mut W, packet: &Packet) -> Result<(), ConsoleError>
where
    W: AsyncWrite + Unpin,
{
    writer.write_all(&packet.encode()).await?;
    writer.flush().await?;
    Ok(())
}

pub async fn read_packet<R>(reader: &mut R) -> Result<Packet, ConsoleError>
where
    R: AsyncRead + Unpin,
{
    let length = reader.read_i32_le().await?;
    if length < HEADER_LEN as i32 || length as usize > HEADER_LEN + MAX_INCOMING_BODY {
        return Err(ConsoleError::Protocol(format!("invalid packet length {length}")));
    }
    let request_id = reader.read_i32_le().await?;
    let kind = reader.read_i32_le().await?;

    let mut rest = vec![0u8; length as usize - 8];
    reader.read_exact(&mut rest).await?;
    if rest[rest.len() - 2..] != [0, 0] {
        return Err(ConsoleError::Protocol("packet is not null terminated".into()));
    }
    rest.truncate(rest.len() - 2);
    let body = String::from_utf8_lossy(&rest).into_owned();

    Ok(Packet { request_id, kind, body })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn encode_layout() {
        let bytes = Packet::new(7, EXEC_COMMAND, "list").encode();
        assert_eq!(&bytes[0..4], &14i32.to_le_bytes());
        assert_eq!(&bytes[4..8], &7i32.to_le_bytes());
        assert_eq!(&bytes[8..12], &2i32.to_le_bytes());
        assert_eq!(&bytes[12..16], b"list");
        assert_eq!(&bytes[16..], &[0, 0]);
    }

    #[tokio::test]
    async fn read_back_encoded_packet() {
        let p = Packet::new(-1, AUTH_RESPONSE, "");
        let bytes = p.encode();
        let mut reader = bytes.as_slice();
        assert_eq!(read_packet(&mut reader).await.unwrap(), p);
    }

    #[tokio::test]
    async fn rejects_short_length() {
        let mut bytes = Vec::new();
        bytes.extend_from_slice(&4i32.to_le_bytes());
        bytes.extend_from_slice(&[0; 8]);
        let mut reader = bytes.as_slice();
        assert!(matches!(
            read_packet(&mut reader).await,
            Err(ConsoleError::Protocol(_))
        ));
    }

    #[tokio::test]
    async fn truncated_stream_is_io_error() {
        let bytes = Packet::new(1, RESPONSE_VALUE, "hello").encode();
        let mut reader = &bytes[..bytes.len() - 3];
        assert!(matches!(read_packet(&mut reader).await, Err(ConsoleError::Io(_))));
    }
}
