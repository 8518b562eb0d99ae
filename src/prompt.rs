//! モデルへ送る system / user メッセージの組み立て
//!
//! `SYSTEM_PROMPT` の例示ブロックはパーサが前提とする返答の形そのもの。
//! 文言を変えるとパース成功率が変わるため、変更時は `parser` のテストも見直すこと。

use crate::world::PlayerContext;

/// 建築アシスタントとしての振る舞い、座標系、返答フォーマットの例を固定する system メッセージ
pub const SYSTEM_PROMPT: &str = "\
The assistant possesses great Minecraft building skills and extensive knowledge of Minecraft commands.
The player is currently playing Minecraft Java Edition.
In Minecraft, the negative X-axis corresponds to facing west, while the positive X-axis corresponds to facing east.
Similarly, facing north corresponds to the negative Z-axis, and facing south corresponds to the positive Z-axis.
Position is specified as X, Y, Z order.

The assistant is capable of responding to certain commands and providing a description message.
These commands will execute in the Minecraft world with operator privileges.
The assistant's response follows a specific format, as demonstrated below:

```
/setblock 100 64 120 minecraft:oak_planks
/fill 110 64 130 150 67 170 minecraft:oak_planks
```

To place some oak planks blocks.
";

/// 1リクエスト分のメッセージ（送信順は system → user）
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PromptMessages {
    pub system: String,
    pub user: String,
}

/// プレイヤー情報と依頼文からメッセージを組み立てる。副作用なし、失敗しない。
pub fn build_prompt(context: &PlayerContext, request_text: &str) -> PromptMessages {
    PromptMessages {
        system: SYSTEM_PROMPT.to_string(),
        user: user_content(context, request_text),
    }
}

fn user_content(context: &PlayerContext, request_text: &str) -> String {
    format!(
        "The player is currently at {} facing {}.\nTell me the commands that do the following:\n\n{}",
        context.position, context.facing, request_text
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::world::{Facing, Position};

    fn steve() -> PlayerContext {
        PlayerContext {
            name: "Steve".into(),
            position: Position::new(10, 64, -20),
            facing: Facing::East,
        }
    }

    #[test]
    fn user_message_embeds_position_facing_and_request() {
        let p = build_prompt(&steve(), "build a 3x3 stone platform");
        assert!(p.user.contains("(X: 10, Y: 64, Z: -20)"));
        assert!(p.user.contains("facing east"));
        assert!(p.user.ends_with("build a 3x3 stone platform"));
    }

    #[test]
    fn system_message_is_fixed_and_carries_one_example_block() {
        let a = build_prompt(&steve(), "a");
        let b = build_prompt(&steve(), "b");
        assert_eq!(a.system, b.system);
        assert_eq!(a.system.matches("```").count(), 2);
        assert!(a.system.contains("negative Z-axis"));
    }

    #[test]
    fn deterministic() {
        assert_eq!(build_prompt(&steve(), "tower"), build_prompt(&steve(), "tower"));
    }

    #[test]
    fn empty_request_is_allowed() {
        let p = build_prompt(&steve(), "");
        assert!(p.user.ends_with("following:\n\n"));
    }
}
