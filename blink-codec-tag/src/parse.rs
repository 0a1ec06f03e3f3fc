//! Tag 格式解析。
//!
//! # 实现策略（How）
//! - 顶层以 `|` 切分，切分器跳过转义序列并跟踪 `[ ]`/`{ }` 嵌套深度，
//!   因而嵌套消息、序列与扩展块中的分隔符不会误切。
//! - 值按字段声明类型解析；未声明的字段名被静默忽略（与线上旧实现
//!   保持兼容，文本格式不设严格模式）。

use alloc::string::{String, ToString};
use alloc::vec::Vec;

use blink_core::error::{BlinkError, Result};
use blink_core::{
    timefmt, DecimalValue, Message, Primitive, QName, Registry, StaticGroupValue, Type, Value,
};

use crate::escape::{parse_hex, unescape_text};
use alloc::format;

/// 解析单行 Tag 消息。
pub fn decode(text: &str, registry: &Registry) -> Result<Message> {
    let trimmed = text.trim();
    let body = trimmed
        .strip_prefix('@')
        .ok_or_else(|| BlinkError::parse(String::from("Tag message must start with '@'")))?;
    parse_message(body, registry)
}

/// 解析消息流：每行一条，空行与 `#` 注释行跳过。
pub fn decode_stream<'a>(
    text: &'a str,
    registry: &'a Registry,
) -> impl Iterator<Item = Result<Message>> + 'a {
    text.lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .map(|line| decode(line, registry))
}

fn parse_message(body: &str, registry: &Registry) -> Result<Message> {
    let parts = split_level(body, '|');
    let Some((type_name, field_parts)) = parts.split_first() else {
        return Err(BlinkError::parse(String::from("Tag message missing type name")));
    };
    let qname = QName::parse(type_name.trim(), None);
    let group_id = registry
        .find_group_by_name(&qname)
        .ok_or_else(|| BlinkError::resolve(format!("unknown group {qname}")))?;
    let mut message = Message::new(registry.group(group_id).name.clone());
    for part in field_parts {
        let part = part.trim();
        if part.is_empty() {
            continue;
        }
        if part.starts_with('[') && part.ends_with(']') {
            let inner = &part[1..part.len() - 1];
            for element in split_level(inner, ';') {
                let element = element.trim();
                if element.is_empty() {
                    continue;
                }
                message.extensions.push(decode(element, registry)?);
            }
            continue;
        }
        let (name, raw_value) = part.split_once('=').ok_or_else(|| {
            BlinkError::parse(format!("invalid Tag field segment {part:?}"))
        })?;
        let name = name.trim();
        let Some(field) = registry
            .all_fields(group_id)
            .find(|field| field.name == name)
        else {
            // 未声明字段：忽略，保持向前兼容。
            continue;
        };
        let ty = field.ty.clone();
        let value = parse_value(raw_value.trim(), &ty, registry)?;
        message.fields.insert(name.to_string(), value);
    }
    Ok(message)
}

fn parse_value(text: &str, ty: &Type, registry: &Registry) -> Result<Value> {
    match ty {
        Type::Primitive(primitive) => parse_primitive(text, *primitive),
        Type::String { .. } => Ok(Value::String(unescape_text(text)?)),
        Type::Binary { .. } => Ok(Value::Binary(parse_hex(text)?)),
        Type::Fixed { size } => {
            let data = parse_hex(text)?;
            if data.len() != *size as usize {
                return Err(BlinkError::value(format!(
                    "fixed field requires exactly {size} bytes, got {}",
                    data.len()
                )));
            }
            Ok(Value::Binary(data))
        }
        Type::Enum(_) => Ok(Value::Enum(text.to_string())),
        Type::Sequence(element) => {
            let inner = text
                .strip_prefix('[')
                .and_then(|rest| rest.strip_suffix(']'))
                .ok_or_else(|| BlinkError::parse(format!("invalid sequence literal {text:?}")))?;
            let mut items = Vec::new();
            for item in split_level(inner, ';') {
                let item = item.trim();
                if item.is_empty() {
                    continue;
                }
                items.push(parse_value(item, element, registry)?);
            }
            Ok(Value::Sequence(items))
        }
        Type::StaticGroup(group_id) => {
            let inner = text
                .strip_prefix('{')
                .and_then(|rest| rest.strip_suffix('}'))
                .ok_or_else(|| {
                    BlinkError::parse(format!("invalid static group literal {text:?}"))
                })?;
            let mut group = StaticGroupValue::new();
            for pair in split_level(inner, ',') {
                let pair = pair.trim();
                if pair.is_empty() {
                    continue;
                }
                let (name, raw_value) = pair.split_once('=').ok_or_else(|| {
                    BlinkError::parse(format!("invalid field pair {pair:?}"))
                })?;
                let name = name.trim();
                let Some(field) = registry
                    .all_fields(*group_id)
                    .find(|field| field.name == name)
                else {
                    continue;
                };
                let ty = field.ty.clone();
                let value = parse_value(raw_value.trim(), &ty, registry)?;
                group.fields.insert(name.to_string(), value);
            }
            Ok(Value::Group(group))
        }
        Type::DynamicGroup(_) | Type::Object => {
            let inner = text
                .strip_prefix('{')
                .and_then(|rest| rest.strip_suffix('}'))
                .ok_or_else(|| {
                    BlinkError::parse(format!("invalid dynamic group literal {text:?}"))
                })?;
            Ok(Value::from(decode(inner.trim(), registry)?))
        }
    }
}

fn parse_primitive(text: &str, primitive: Primitive) -> Result<Value> {
    match primitive {
        Primitive::Bool => match text {
            "Y" => Ok(Value::Bool(true)),
            "N" => Ok(Value::Bool(false)),
            other => Err(BlinkError::value(format!("invalid boolean literal {other:?}"))),
        },
        Primitive::F64 => match text {
            "NaN" => Ok(Value::F64(f64::NAN)),
            "Inf" => Ok(Value::F64(f64::INFINITY)),
            "-Inf" => Ok(Value::F64(f64::NEG_INFINITY)),
            other => other
                .parse::<f64>()
                .map(Value::F64)
                .map_err(|_| BlinkError::value(format!("invalid f64 literal {other:?}"))),
        },
        Primitive::Decimal => {
            let (mantissa, exponent) = text
                .split_once('e')
                .ok_or_else(|| BlinkError::value(format!("invalid decimal literal {text:?}")))?;
            let mantissa = mantissa
                .parse::<i64>()
                .map_err(|_| BlinkError::value(format!("invalid decimal literal {text:?}")))?;
            let exponent = exponent
                .parse::<i8>()
                .map_err(|_| BlinkError::value(format!("invalid decimal literal {text:?}")))?;
            Ok(Value::Decimal(DecimalValue::new(exponent, mantissa)))
        }
        Primitive::Date => timefmt::parse_date(text).map(Value::Int),
        Primitive::MilliTime => timefmt::parse_millitime(text).map(Value::Int),
        Primitive::NanoTime => timefmt::parse_nanotime(text).map(Value::Int),
        Primitive::TimeOfDayMilli => {
            timefmt::parse_time_of_day_milli(text).map(|millis| Value::UInt(millis as u64))
        }
        Primitive::TimeOfDayNano => timefmt::parse_time_of_day_nano(text).map(Value::UInt),
        _ => {
            if primitive.is_unsigned() {
                text.parse::<u64>()
                    .map(Value::UInt)
                    .map_err(|_| BlinkError::value(format!("invalid integer literal {text:?}")))
            } else {
                text.parse::<i64>()
                    .map(Value::Int)
                    .map_err(|_| BlinkError::value(format!("invalid integer literal {text:?}")))
            }
        }
    }
}

/// 在转义与嵌套深度感知下按 `separator` 切分。
fn split_level(text: &str, separator: char) -> Vec<&str> {
    let mut parts = Vec::new();
    let mut depth = 0usize;
    let mut start = 0usize;
    let mut escaped = false;
    for (index, ch) in text.char_indices() {
        if escaped {
            escaped = false;
            continue;
        }
        match ch {
            '\\' => escaped = true,
            '[' | '{' => depth += 1,
            ']' | '}' => depth = depth.saturating_sub(1),
            ch if ch == separator && depth == 0 => {
                parts.push(&text[start..index]);
                start = index + ch.len_utf8();
            }
            _ => {}
        }
    }
    parts.push(&text[start..]);
    parts
}

#[cfg(test)]
mod tests {
    use super::*;

    /// 深度感知切分：嵌套块内的分隔符不得误切。
    #[test]
    fn split_respects_nesting_and_escapes() {
        let parts = split_level("a|{b|c}|d\\|e|[f|g]", '|');
        assert_eq!(parts, ["a", "{b|c}", "d\\|e", "[f|g]"]);
    }
}
