//! プレイヤーの位置と向き
//!
//! 座標系の約束（プロンプトにも明記している）:
//! north = -Z, south = +Z, east = +X, west = -X

use serde::Serialize;
use std::fmt::{self, Display};
use std::str::FromStr;

/// ブロック単位のワールド座標
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct Position {
    pub x: i32,
    pub y: i32,
    pub z: i32,
}

impl Position {
    pub fn new(x: i32, y: i32, z: i32) -> Self {
        Self { x, y, z }
    }
}

impl Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "(X: {}, Y: {}, Z: {})", self.x, self.y, self.z)
    }
}

/// 東西南北の4方向
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Facing {
    North,
    South,
    East,
    West,
}

impl Facing {
    /// Minecraft の yaw（度）から向きを求める。
    ///
    /// yaw 0 = south, 90 = west, ±180 = north, -90 = east。各方向の前後45度を同じ向きとして扱う。
    pub fn from_yaw(yaw: f32) -> Self {
        let yaw = yaw.rem_euclid(360.0);
        if (45.0..135.0).contains(&yaw) {
            Facing::West
        } else if (135.0..225.0).contains(&yaw) {
            Facing::North
        } else if (225.0..315.0).contains(&yaw) {
            Facing::East
        } else {
            Facing::South
        }
    }

    /// 向きに対応する符号付きの軸
    pub fn axis(&self) -> &'static str {
        match self {
            Facing::North => "-Z",
            Facing::South => "+Z",
            Facing::East => "+X",
            Facing::West => "-X",
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Facing::North => "north",
            Facing::South => "south",
            Facing::East => "east",
            Facing::West => "west",
        }
    }
}

impl Display for Facing {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown facing: {0}")]
pub struct UnknownFacing(pub String);

impl FromStr for Facing {
    type Err = UnknownFacing;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "north" => Ok(Facing::North),
            "south" => Ok(Facing::South),
            "east" => Ok(Facing::East),
            "west" => Ok(Facing::West),
            _ => Err(UnknownFacing(s.to_string())),
        }
    }
}

/// リクエスト時点で解決したプレイヤー情報。リクエストごとに取り直し、キャッシュしない。
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PlayerContext {
    pub name: String,
    pub position: Position,
    pub facing: Facing,
}
