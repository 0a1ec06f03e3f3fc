//! XML 映射渲染。
//!
//! # 契约说明（What）
//! - 消息元素名取组的本地名，命名空间 URI 就是 Blink 命名空间字面量，
//!   前缀固定为 `ns0`（逐消息元素声明，嵌套消息可合法遮蔽）。
//! - 字段是子元素；序列字段包裹重复的 `<item>` 子元素；静态组内联
//!   其字段；动态组字段内嵌完整的消息元素。
//! - 扩展块是 `blink:extension` 元素，URI 为
//!   `http://blinkprotocol.org/ns/blink`。
//! - 字节串可作 UTF-8 且均为 XML 合法字符时写作元素文本，否则写作
//!   `binary="yes"` 属性加连写十六进制。
//! - 流包裹在单一 `<root>` 元素中。

use alloc::format;
use alloc::string::{String, ToString};
use alloc::vec::Vec;

use blink_core::error::{BlinkError, Result};
use blink_core::{timefmt, Message, Primitive, Registry, StaticGroupValue, Type, Value};

/// Blink 扩展元素的命名空间 URI。
pub const BLINK_NAMESPACE: &str = "http://blinkprotocol.org/ns/blink";

/// 渲染一条消息。
pub fn encode(message: &Message, registry: &Registry) -> Result<String> {
    let mut out = String::new();
    write_message(message, registry, &mut out)?;
    Ok(out)
}

/// 渲染消息流：单一 `<root>` 元素包裹全部消息。
pub fn encode_stream(messages: &[Message], registry: &Registry) -> Result<String> {
    let mut out = String::from("<root>");
    for message in messages {
        write_message(message, registry, &mut out)?;
    }
    out.push_str("</root>");
    Ok(out)
}

fn write_message(message: &Message, registry: &Registry, out: &mut String) -> Result<()> {
    let group_id = registry
        .find_group_by_name(&message.name)
        .ok_or_else(|| BlinkError::resolve(format!("unknown group {}", message.name)))?;
    let group = registry.group(group_id);
    let (tag, declaration) = match &group.name.namespace {
        Some(ns) => (
            format!("ns0:{}", group.name.name),
            Some(format!(" xmlns:ns0=\"{}\"", escape_attr(ns))),
        ),
        None => (group.name.name.clone(), None),
    };
    out.push('<');
    out.push_str(&tag);
    if let Some(declaration) = &declaration {
        out.push_str(declaration);
    }
    out.push('>');

    let layout: Vec<(String, Type)> = registry
        .all_fields(group_id)
        .map(|field| (field.name.clone(), field.ty.clone()))
        .collect();
    for (name, ty) in layout {
        let Some(value) = message.fields.get(&name) else {
            continue;
        };
        write_field(&name, value, &ty, registry, out)?;
    }

    if !message.extensions.is_empty() {
        out.push_str(&format!(
            "<blink:extension xmlns:blink=\"{BLINK_NAMESPACE}\">"
        ));
        for extension in message.extensions.iter() {
            write_message(extension, registry, out)?;
        }
        out.push_str("</blink:extension>");
    }

    out.push_str("</");
    out.push_str(&tag);
    out.push('>');
    Ok(())
}

fn write_field(
    name: &str,
    value: &Value,
    ty: &Type,
    registry: &Registry,
    out: &mut String,
) -> Result<()> {
    match ty {
        Type::Sequence(element) => {
            let Value::Sequence(items) = value else {
                return Err(type_mismatch("sequence", value));
            };
            out.push('<');
            out.push_str(name);
            out.push('>');
            for item in items {
                write_field("item", item, element, registry, out)?;
            }
            out.push_str("</");
            out.push_str(name);
            out.push('>');
            Ok(())
        }
        Type::StaticGroup(group_id) => {
            let Value::Group(StaticGroupValue { fields }) = value else {
                return Err(type_mismatch("static group", value));
            };
            out.push('<');
            out.push_str(name);
            out.push('>');
            let layout: Vec<(String, Type)> = registry
                .all_fields(*group_id)
                .map(|field| (field.name.clone(), field.ty.clone()))
                .collect();
            for (inner_name, inner_ty) in layout {
                let Some(inner_value) = fields.get(&inner_name) else {
                    continue;
                };
                write_field(&inner_name, inner_value, &inner_ty, registry, out)?;
            }
            out.push_str("</");
            out.push_str(name);
            out.push('>');
            Ok(())
        }
        Type::DynamicGroup(_) | Type::Object => {
            let Value::Message(message) = value else {
                return Err(type_mismatch("dynamic group", value));
            };
            out.push('<');
            out.push_str(name);
            out.push('>');
            write_message(message, registry, out)?;
            out.push_str("</");
            out.push_str(name);
            out.push('>');
            Ok(())
        }
        Type::Binary { .. } | Type::Fixed { .. } => {
            let Value::Binary(data) = value else {
                return Err(type_mismatch("binary", value));
            };
            match utf8_xml_text(data) {
                Some(text) => {
                    out.push('<');
                    out.push_str(name);
                    out.push('>');
                    out.push_str(&escape_text(text));
                    out.push_str("</");
                    out.push_str(name);
                    out.push('>');
                }
                None => {
                    out.push('<');
                    out.push_str(name);
                    out.push_str(" binary=\"yes\">");
                    for byte in data {
                        out.push_str(&format!("{byte:02x}"));
                    }
                    out.push_str("</");
                    out.push_str(name);
                    out.push('>');
                }
            }
            Ok(())
        }
        _ => {
            out.push('<');
            out.push_str(name);
            out.push('>');
            out.push_str(&escape_text(&scalar_text(value, ty)?));
            out.push_str("</");
            out.push_str(name);
            out.push('>');
            Ok(())
        }
    }
}

/// 标量值的元素文本。
fn scalar_text(value: &Value, ty: &Type) -> Result<String> {
    match ty {
        Type::String { .. } => {
            let Value::String(text) = value else {
                return Err(type_mismatch("string", value));
            };
            Ok(text.clone())
        }
        Type::Enum(_) => {
            let Value::Enum(symbol) = value else {
                return Err(type_mismatch("enum", value));
            };
            Ok(symbol.clone())
        }
        Type::Primitive(primitive) => match primitive {
            Primitive::Bool => {
                let Value::Bool(flag) = value else {
                    return Err(type_mismatch("bool", value));
                };
                Ok(String::from(if *flag { "true" } else { "false" }))
            }
            Primitive::F64 => {
                let Value::F64(number) = value else {
                    return Err(type_mismatch("f64", value));
                };
                if number.is_nan() {
                    Ok(String::from("NaN"))
                } else if number.is_infinite() {
                    Ok(String::from(if *number > 0.0 { "Inf" } else { "-Inf" }))
                } else {
                    Ok(format!("{number}"))
                }
            }
            Primitive::Decimal => {
                let Value::Decimal(decimal) = value else {
                    return Err(type_mismatch("decimal", value));
                };
                Ok(format!("{}e{}", decimal.mantissa, decimal.exponent))
            }
            Primitive::Date => {
                let days = value.as_i64().ok_or_else(|| type_mismatch("date", value))?;
                Ok(timefmt::format_date(days))
            }
            Primitive::MilliTime => {
                let millis = value
                    .as_i64()
                    .ok_or_else(|| type_mismatch("millitime", value))?;
                Ok(timefmt::format_millitime(millis))
            }
            Primitive::NanoTime => {
                let nanos = value
                    .as_i64()
                    .ok_or_else(|| type_mismatch("nanotime", value))?;
                Ok(timefmt::format_nanotime(nanos))
            }
            Primitive::TimeOfDayMilli => {
                let millis = value
                    .as_u64()
                    .ok_or_else(|| type_mismatch("timeOfDayMilli", value))?;
                Ok(timefmt::format_time_of_day_milli(millis as u32))
            }
            Primitive::TimeOfDayNano => {
                let nanos = value
                    .as_u64()
                    .ok_or_else(|| type_mismatch("timeOfDayNano", value))?;
                Ok(timefmt::format_time_of_day_nano(nanos))
            }
            _ => {
                if primitive.is_unsigned() {
                    value
                        .as_u64()
                        .map(|number| number.to_string())
                        .ok_or_else(|| type_mismatch(primitive.name(), value))
                } else {
                    value
                        .as_i64()
                        .map(|number| number.to_string())
                        .ok_or_else(|| type_mismatch(primitive.name(), value))
                }
            }
        },
        _ => Err(BlinkError::value(String::from(
            "composite value in scalar position",
        ))),
    }
}

/// 字节串可作元素文本的条件：UTF-8 且均为 XML 合法字符。
fn utf8_xml_text(data: &[u8]) -> Option<&str> {
    let text = core::str::from_utf8(data).ok()?;
    let safe = text
        .chars()
        .all(|ch| ch >= '\u{20}' || matches!(ch, '\t' | '\n' | '\r'));
    safe.then_some(text)
}

fn escape_text(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for ch in text.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            ch => out.push(ch),
        }
    }
    out
}

fn escape_attr(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for ch in text.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '"' => out.push_str("&quot;"),
            ch => out.push(ch),
        }
    }
    out
}

fn type_mismatch(expected: &str, value: &Value) -> BlinkError {
    BlinkError::value(format!("expected {expected} value, got {value:?}"))
}
