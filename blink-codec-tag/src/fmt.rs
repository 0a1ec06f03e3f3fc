//! Tag 格式渲染。
//!
//! 语法：`@Ns:Name|field=value|...|[ext1;ext2]`。序列以 `[a;b;c]`
//! 包裹，静态组以 `{field=value,...}` 包裹，动态组以 `{@Type|...}`
//! 包裹；布尔取 `Y`/`N`，时间族取 ISO-8601 文本，字节串取
//! `[3e 6d 4a]` 形式。可空字段缺省时整段省略。

use alloc::format;
use alloc::string::{String, ToString};
use alloc::vec::Vec;

use blink_core::error::{BlinkError, Result};
use blink_core::{timefmt, Message, Primitive, Registry, StaticGroupValue, Type, Value};

use crate::escape::{escape_text, format_hex};

/// 渲染一条消息（单行）。
pub fn encode(message: &Message, registry: &Registry) -> Result<String> {
    let mut out = String::new();
    format_message(message, registry, &mut out)?;
    Ok(out)
}

/// 渲染消息流：每行一条。
pub fn encode_stream(messages: &[Message], registry: &Registry) -> Result<String> {
    let mut lines = Vec::with_capacity(messages.len());
    for message in messages {
        lines.push(encode(message, registry)?);
    }
    Ok(lines.join("\n"))
}

fn format_message(message: &Message, registry: &Registry, out: &mut String) -> Result<()> {
    let group_id = registry
        .find_group_by_name(&message.name)
        .ok_or_else(|| BlinkError::resolve(format!("unknown group {}", message.name)))?;
    let group = registry.group(group_id);
    out.push('@');
    out.push_str(&group.name.to_string());
    let fields: Vec<(String, Type)> = registry
        .all_fields(group_id)
        .map(|field| (field.name.clone(), field.ty.clone()))
        .collect();
    for (name, ty) in fields {
        let Some(value) = message.fields.get(&name) else {
            continue;
        };
        out.push('|');
        out.push_str(&name);
        out.push('=');
        format_value(value, &ty, registry, out)?;
    }
    if !message.extensions.is_empty() {
        out.push_str("|[");
        for (index, extension) in message.extensions.iter().enumerate() {
            if index > 0 {
                out.push(';');
            }
            format_message(extension, registry, out)?;
        }
        out.push(']');
    }
    Ok(())
}

fn format_value(value: &Value, ty: &Type, registry: &Registry, out: &mut String) -> Result<()> {
    match ty {
        Type::Primitive(primitive) => format_primitive(value, *primitive, out),
        Type::String { .. } => {
            let Value::String(text) = value else {
                return Err(type_mismatch("string", value));
            };
            out.push_str(&escape_text(text));
            Ok(())
        }
        Type::Binary { .. } | Type::Fixed { .. } => {
            let Value::Binary(data) = value else {
                return Err(type_mismatch("binary", value));
            };
            out.push_str(&format_hex(data));
            Ok(())
        }
        Type::Enum(_) => {
            let Value::Enum(symbol) = value else {
                return Err(type_mismatch("enum", value));
            };
            out.push_str(symbol);
            Ok(())
        }
        Type::Sequence(element) => {
            let Value::Sequence(items) = value else {
                return Err(type_mismatch("sequence", value));
            };
            out.push('[');
            for (index, item) in items.iter().enumerate() {
                if index > 0 {
                    out.push(';');
                }
                format_value(item, element, registry, out)?;
            }
            out.push(']');
            Ok(())
        }
        Type::StaticGroup(group_id) => {
            let Value::Group(StaticGroupValue { fields }) = value else {
                return Err(type_mismatch("static group", value));
            };
            let layout: Vec<(String, Type)> = registry
                .all_fields(*group_id)
                .map(|field| (field.name.clone(), field.ty.clone()))
                .collect();
            out.push('{');
            let mut first = true;
            for (name, ty) in layout {
                let Some(value) = fields.get(&name) else {
                    continue;
                };
                if !first {
                    out.push(',');
                }
                first = false;
                out.push_str(&name);
                out.push('=');
                format_value(value, &ty, registry, out)?;
            }
            out.push('}');
            Ok(())
        }
        Type::DynamicGroup(_) | Type::Object => {
            let Value::Message(message) = value else {
                return Err(type_mismatch("dynamic group", value));
            };
            out.push('{');
            format_message(message, registry, out)?;
            out.push('}');
            Ok(())
        }
    }
}

fn format_primitive(value: &Value, primitive: Primitive, out: &mut String) -> Result<()> {
    match primitive {
        Primitive::Bool => {
            let Value::Bool(flag) = value else {
                return Err(type_mismatch("bool", value));
            };
            out.push(if *flag { 'Y' } else { 'N' });
        }
        Primitive::F64 => {
            let Value::F64(number) = value else {
                return Err(type_mismatch("f64", value));
            };
            if number.is_nan() {
                out.push_str("NaN");
            } else if number.is_infinite() {
                out.push_str(if *number > 0.0 { "Inf" } else { "-Inf" });
            } else {
                out.push_str(&format!("{number}"));
            }
        }
        Primitive::Decimal => {
            let Value::Decimal(decimal) = value else {
                return Err(type_mismatch("decimal", value));
            };
            out.push_str(&format!("{}e{}", decimal.mantissa, decimal.exponent));
        }
        Primitive::Date => {
            let days = value.as_i64().ok_or_else(|| type_mismatch("date", value))?;
            out.push_str(&timefmt::format_date(days));
        }
        Primitive::MilliTime => {
            let millis = value
                .as_i64()
                .ok_or_else(|| type_mismatch("millitime", value))?;
            out.push_str(&timefmt::format_millitime(millis));
        }
        Primitive::NanoTime => {
            let nanos = value
                .as_i64()
                .ok_or_else(|| type_mismatch("nanotime", value))?;
            out.push_str(&timefmt::format_nanotime(nanos));
        }
        Primitive::TimeOfDayMilli => {
            let millis = value
                .as_u64()
                .ok_or_else(|| type_mismatch("timeOfDayMilli", value))?;
            out.push_str(&timefmt::format_time_of_day_milli(millis as u32));
        }
        Primitive::TimeOfDayNano => {
            let nanos = value
                .as_u64()
                .ok_or_else(|| type_mismatch("timeOfDayNano", value))?;
            out.push_str(&timefmt::format_time_of_day_nano(nanos));
        }
        _ => {
            if primitive.is_unsigned() {
                let number = value
                    .as_u64()
                    .ok_or_else(|| type_mismatch(primitive.name(), value))?;
                out.push_str(&format!("{number}"));
            } else {
                let number = value
                    .as_i64()
                    .ok_or_else(|| type_mismatch(primitive.name(), value))?;
                out.push_str(&format!("{number}"));
            }
        }
    }
    Ok(())
}

fn type_mismatch(expected: &str, value: &Value) -> BlinkError {
    BlinkError::value(format!("expected {expected} value, got {value:?}"))
}
