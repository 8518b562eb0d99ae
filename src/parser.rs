//! モデル応答のパーサー
//!
//! 応答はコードフェンスを含む文章。閉じたブロックの空でない行がコマンドになり、
//! 最後のフェンス（閉じていなくてもよい）以降の文章が説明文になる。
//! Lenient はこの規則そのまま。Strict はコマンドブロック1つと任意の説明文だけを受け付ける。

use std::fmt::{self, Display};
use std::str::FromStr;

const FENCE: &str = "```";

/// プロンプトの例から外れた応答をどこまで許容するか
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ParseMode {
    /// 閉じたブロックをすべて連結し、末尾の文章を説明文とする
    #[default]
    Lenient,
    /// コマンドブロックはちょうど1つ。説明文は任意（素の文章またはフェンス内）
    Strict,
}

impl FromStr for ParseMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "lenient" => Ok(ParseMode::Lenient),
            "strict" => Ok(ParseMode::Strict),
            other => Err(format!("unknown parse mode: {other}")),
        }
    }
}

impl Display for ParseMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParseMode::Lenient => f.write_str("lenient"),
            ParseMode::Strict => f.write_str("strict"),
        }
    }
}

/// 実行順のコマンドと、建築物の説明文
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParsedOutcome {
    pub commands: Vec<String>,
    pub description: String,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ParseError {
    #[error("no fenced block found in model reply")]
    NoFencedBlock,
    #[error("fenced blocks in model reply contain no commands")]
    NoCommands,
    #[error("malformed block structure: {0}")]
    Malformed(String),
}

/// 閉じたフェンスブロック。`end` は閉じフェンス直後のバイト位置
#[derive(Debug, Clone, Copy)]
struct Block<'a> {
    content: &'a str,
    end: usize,
}

/// Lenient 規則でパースする
pub fn parse_reply(reply: &str) -> Result<ParsedOutcome, ParseError> {
    parse_reply_with(reply, ParseMode::Lenient)
}

pub fn parse_reply_with(reply: &str, mode: ParseMode) -> Result<ParsedOutcome, ParseError> {
    if !reply.contains(FENCE) {
        return Err(ParseError::NoFencedBlock);
    }
    match mode {
        ParseMode::Lenient => parse_lenient(reply),
        ParseMode::Strict => parse_strict(reply),
    }
}

/// 先頭の `/` をちょうど1つ取り除く
pub fn strip_leading_slash(command: &str) -> &str {
    command.strip_prefix('/').unwrap_or(command)
}

fn parse_lenient(reply: &str) -> Result<ParsedOutcome, ParseError> {
    let commands: Vec<String> = closed_blocks(reply)
        .iter()
        .flat_map(|b| block_commands(b.content))
        .collect();
    if commands.is_empty() {
        return Err(ParseError::NoCommands);
    }
    Ok(ParsedOutcome {
        commands,
        description: trailing_description(reply),
    })
}

fn parse_strict(reply: &str) -> Result<ParsedOutcome, ParseError> {
    let blocks = closed_blocks(reply);
    let first = blocks
        .first()
        .ok_or_else(|| ParseError::Malformed("command block is not closed".into()))?;
    let commands = block_commands(first.content);
    if commands.is_empty() {
        return Err(ParseError::NoCommands);
    }

    let rest = reply[first.end..].trim();
    let description = match rest.strip_prefix(FENCE) {
        Some(inner) => {
            let inner = inner.strip_suffix(FENCE).unwrap_or(inner);
            if inner.contains(FENCE) {
                return Err(ParseError::Malformed("more than one block after the command block".into()));
            }
            inner.trim().to_string()
        }
        None if rest.contains(FENCE) => {
            return Err(ParseError::Malformed("fenced block after the description".into()));
        }
        None => rest.to_string(),
    };

    Ok(ParsedOutcome { commands, description })
}

/// `FENCE 内容 FENCE` を最短一致で探す（内容は1文字以上）
fn closed_blocks(text: &str) -> Vec<Block<'_>> {
    let mut blocks = Vec::new();
    let mut cursor = 0;
    while let Some(open) = text[cursor..].find(FENCE) {
        let start = cursor + open + FENCE.len();
        let rest = &text[start..];
        let first_len = match rest.chars().next() {
            Some(c) => c.len_utf8(),
            None => break,
        };
        let close = match rest[first_len..].find(FENCE) {
            Some(i) => start + first_len + i,
            None => break,
        };
        blocks.push(Block {
            content: &text[start..close],
            end: close + FENCE.len(),
        });
        cursor = close + FENCE.len();
    }
    blocks
}

fn block_commands(content: &str) -> Vec<String> {
    let mut lines: Vec<&str> = content.lines().collect();
    if lines.len() > 1 && is_info_string(lines[0].trim_end()) {
        lines.remove(0);
    }
    lines
        .into_iter()
        .map(str::trim)
        .filter(|l| !l.is_empty())
        .map(|l| strip_leading_slash(l).to_string())
        .collect()
}

// ```mcfunction, ```sh などの言語指定
fn is_info_string(line: &str) -> bool {
    !line.is_empty()
        && !line.starts_with('/')
        && line
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '+' | '-'))
}

/// 最後のフェンス以降の文章。空、またはバッククォートを含む場合は空文字
fn trailing_description(text: &str) -> String {
    let Some(pos) = text.rfind(FENCE) else {
        return String::new();
    };
    let tail = &text[pos + FENCE.len()..];
    if tail.is_empty() || tail.contains('`') {
        return String::new();
    }
    tail.trim().to_string()
}
