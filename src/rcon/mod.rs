//! RCON クライアント（Minecraft Java Edition のリモートコンソール）

pub mod client;
pub mod packet;

pub use client::RconClient;
pub use packet::{Packet, MAX_INCOMING_BODY, MAX_OUTGOING_BODY};
