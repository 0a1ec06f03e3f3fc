//! Tag 格式的字符转义与十六进制字节列表。
//!
//! 保留字符 `| [ ] { } ; # \` 以反斜杠转义；控制字符依宽度选用
//! `\n`、`\xNN`、`\uXXXX`、`\UXXXXXXXX` 形式。非 ASCII 文本保持
//! UTF-8 原样，不做逐字节转义。

use alloc::format;
use alloc::string::String;
use alloc::vec::Vec;

use blink_core::error::{BlinkError, Result};

/// Tag 格式的保留字符。
pub const RESERVED: &[char] = &['|', '[', ']', '{', '}', ';', '#', '\\'];

/// 转义字符串值。
pub fn escape_text(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for ch in text.chars() {
        match ch {
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            ch if RESERVED.contains(&ch) => {
                out.push('\\');
                out.push(ch);
            }
            ch if (ch as u32) < 0x20 || ch == '\u{7f}' => {
                out.push_str(&format!("\\x{:02x}", ch as u32));
            }
            ch => out.push(ch),
        }
    }
    out
}

/// 还原转义后的字符串值。
pub fn unescape_text(text: &str) -> Result<String> {
    let chars: Vec<char> = text.chars().collect();
    let mut out = String::with_capacity(text.len());
    let mut index = 0;
    while index < chars.len() {
        let ch = chars[index];
        if ch != '\\' {
            out.push(ch);
            index += 1;
            continue;
        }
        let Some(&next) = chars.get(index + 1) else {
            return Err(BlinkError::value(String::from("dangling escape in Tag value")));
        };
        match next {
            'n' => {
                out.push('\n');
                index += 2;
            }
            'r' => {
                out.push('\r');
                index += 2;
            }
            't' => {
                out.push('\t');
                index += 2;
            }
            'x' => {
                out.push(read_hex(&chars, index + 2, 2)?);
                index += 4;
            }
            'u' => {
                out.push(read_hex(&chars, index + 2, 4)?);
                index += 6;
            }
            'U' => {
                out.push(read_hex(&chars, index + 2, 8)?);
                index += 10;
            }
            other => {
                out.push(other);
                index += 2;
            }
        }
    }
    Ok(out)
}

fn read_hex(chars: &[char], start: usize, digits: usize) -> Result<char> {
    let mut value: u32 = 0;
    for offset in 0..digits {
        let digit = chars
            .get(start + offset)
            .and_then(|ch| ch.to_digit(16))
            .ok_or_else(|| BlinkError::value(String::from("incomplete hex escape in Tag value")))?;
        value = value * 16 + digit;
    }
    char::from_u32(value)
        .ok_or_else(|| BlinkError::value(format!("invalid code point {value:#x} in Tag value")))
}

/// 渲染字节列表：`[3e 6d 4a]`。
pub fn format_hex(data: &[u8]) -> String {
    let mut out = String::with_capacity(data.len() * 3 + 2);
    out.push('[');
    for (index, byte) in data.iter().enumerate() {
        if index > 0 {
            out.push(' ');
        }
        out.push_str(&format!("{byte:02x}"));
    }
    out.push(']');
    out
}

/// 解析字节列表。
pub fn parse_hex(text: &str) -> Result<Vec<u8>> {
    let trimmed = text.trim();
    let inner = trimmed
        .strip_prefix('[')
        .and_then(|rest| rest.strip_suffix(']'))
        .ok_or_else(|| BlinkError::value(format!("invalid binary literal {trimmed:?}")))?;
    let mut bytes = Vec::new();
    for part in inner.split_whitespace() {
        let byte = u8::from_str_radix(part, 16)
            .map_err(|_| BlinkError::value(format!("invalid hex byte {part:?}")))?;
        bytes.push(byte);
    }
    Ok(bytes)
}
