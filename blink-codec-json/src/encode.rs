//! JSON 映射渲染。
//!
//! # 契约说明（What）
//! - 消息对象：`{"$type": "Ns:Name", 字段..., "$extension": [..]}`；
//!   静态组对象同样携带 `"$type"`（取字段声明的组名）作自描述标记。
//! - 绝对值小于 1e15 的整数渲染为 JSON 数字，否则为十进制字符串；
//!   `f64` 特殊值取 `"NaN"`/`"Inf"`/`"-Inf"`。
//! - decimal 在尾数绝对值小于 1e15 时渲染为 JSON 数字，否则为
//!   `{"exponent":e,"mantissa":m}` 对象。
//! - 字节串可作 UTF-8 解码时渲染为字符串，否则为十六进制字符串数组。
//! - 可空字段缺省时整键省略。

use alloc::format;
use alloc::string::{String, ToString};
use alloc::vec::Vec;

use blink_core::error::{BlinkError, Result};
use blink_core::{timefmt, Message, Primitive, Registry, StaticGroupValue, Type, Value};
use serde_json::{json, Map, Number, Value as JsonValue};

/// JSON 数字与字符串表示的整数阈值。
pub const NUMERIC_THRESHOLD: i64 = 1_000_000_000_000_000;

/// 渲染一条消息为 JSON 文本（两空格缩进）。
pub fn encode(message: &Message, registry: &Registry) -> Result<String> {
    let value = message_to_json(message, registry)?;
    serde_json::to_string_pretty(&value)
        .map_err(|err| BlinkError::value(format!("JSON rendering failed: {err}")))
}

/// 渲染消息流为 JSON 数组文本。
pub fn encode_stream(messages: &[Message], registry: &Registry) -> Result<String> {
    let mut items = Vec::with_capacity(messages.len());
    for message in messages {
        items.push(message_to_json(message, registry)?);
    }
    serde_json::to_string_pretty(&JsonValue::Array(items))
        .map_err(|err| BlinkError::value(format!("JSON rendering failed: {err}")))
}

/// 消息到 JSON 对象。
pub fn message_to_json(message: &Message, registry: &Registry) -> Result<JsonValue> {
    let group_id = registry
        .find_group_by_name(&message.name)
        .ok_or_else(|| BlinkError::resolve(format!("unknown group {}", message.name)))?;
    let group = registry.group(group_id);
    let mut object = Map::new();
    object.insert(
        String::from("$type"),
        JsonValue::String(group.name.to_string()),
    );
    let layout: Vec<(String, Type)> = registry
        .all_fields(group_id)
        .map(|field| (field.name.clone(), field.ty.clone()))
        .collect();
    for (name, ty) in layout {
        let Some(value) = message.fields.get(&name) else {
            continue;
        };
        object.insert(name, value_to_json(value, &ty, registry)?);
    }
    if !message.extensions.is_empty() {
        let mut extensions = Vec::with_capacity(message.extensions.len());
        for extension in message.extensions.iter() {
            extensions.push(message_to_json(extension, registry)?);
        }
        object.insert(String::from("$extension"), JsonValue::Array(extensions));
    }
    Ok(JsonValue::Object(object))
}

fn value_to_json(value: &Value, ty: &Type, registry: &Registry) -> Result<JsonValue> {
    match ty {
        Type::Primitive(primitive) => primitive_to_json(value, *primitive),
        Type::String { .. } => {
            let Value::String(text) = value else {
                return Err(type_mismatch("string", value));
            };
            Ok(JsonValue::String(text.clone()))
        }
        Type::Binary { .. } | Type::Fixed { .. } => {
            let Value::Binary(data) = value else {
                return Err(type_mismatch("binary", value));
            };
            Ok(binary_to_json(data))
        }
        Type::Enum(_) => {
            let Value::Enum(symbol) = value else {
                return Err(type_mismatch("enum", value));
            };
            Ok(JsonValue::String(symbol.clone()))
        }
        Type::Sequence(element) => {
            let Value::Sequence(items) = value else {
                return Err(type_mismatch("sequence", value));
            };
            let mut rendered = Vec::with_capacity(items.len());
            for item in items {
                rendered.push(value_to_json(item, element, registry)?);
            }
            Ok(JsonValue::Array(rendered))
        }
        Type::StaticGroup(group_id) => {
            let Value::Group(StaticGroupValue { fields }) = value else {
                return Err(type_mismatch("static group", value));
            };
            let group = registry.group(*group_id);
            let mut object = Map::new();
            object.insert(
                String::from("$type"),
                JsonValue::String(group.name.to_string()),
            );
            let layout: Vec<(String, Type)> = registry
                .all_fields(*group_id)
                .map(|field| (field.name.clone(), field.ty.clone()))
                .collect();
            for (name, ty) in layout {
                let Some(value) = fields.get(&name) else {
                    continue;
                };
                object.insert(name, value_to_json(value, &ty, registry)?);
            }
            Ok(JsonValue::Object(object))
        }
        Type::DynamicGroup(_) | Type::Object => {
            let Value::Message(message) = value else {
                return Err(type_mismatch("dynamic group", value));
            };
            message_to_json(message, registry)
        }
    }
}

fn primitive_to_json(value: &Value, primitive: Primitive) -> Result<JsonValue> {
    match primitive {
        Primitive::Bool => {
            let Value::Bool(flag) = value else {
                return Err(type_mismatch("bool", value));
            };
            Ok(JsonValue::Bool(*flag))
        }
        Primitive::F64 => {
            let Value::F64(number) = value else {
                return Err(type_mismatch("f64", value));
            };
            if number.is_nan() {
                return Ok(JsonValue::String(String::from("NaN")));
            }
            if number.is_infinite() {
                return Ok(JsonValue::String(String::from(if *number > 0.0 {
                    "Inf"
                } else {
                    "-Inf"
                })));
            }
            Number::from_f64(*number)
                .map(JsonValue::Number)
                .ok_or_else(|| BlinkError::value(String::from("unrepresentable f64 value")))
        }
        Primitive::Decimal => {
            let Value::Decimal(decimal) = value else {
                return Err(type_mismatch("decimal", value));
            };
            if decimal.mantissa.abs() < NUMERIC_THRESHOLD {
                Ok(decimal_to_number(decimal.mantissa, decimal.exponent))
            } else {
                Ok(json!({
                    "exponent": decimal.exponent,
                    "mantissa": decimal.mantissa,
                }))
            }
        }
        Primitive::Date => {
            let days = value.as_i64().ok_or_else(|| type_mismatch("date", value))?;
            Ok(JsonValue::String(timefmt::format_date(days)))
        }
        Primitive::MilliTime => {
            let millis = value
                .as_i64()
                .ok_or_else(|| type_mismatch("millitime", value))?;
            Ok(JsonValue::String(timefmt::format_millitime(millis)))
        }
        Primitive::NanoTime => {
            let nanos = value
                .as_i64()
                .ok_or_else(|| type_mismatch("nanotime", value))?;
            Ok(JsonValue::String(timefmt::format_nanotime(nanos)))
        }
        Primitive::TimeOfDayMilli => {
            let millis = value
                .as_u64()
                .ok_or_else(|| type_mismatch("timeOfDayMilli", value))?;
            Ok(JsonValue::String(timefmt::format_time_of_day_milli(
                millis as u32,
            )))
        }
        Primitive::TimeOfDayNano => {
            let nanos = value
                .as_u64()
                .ok_or_else(|| type_mismatch("timeOfDayNano", value))?;
            Ok(JsonValue::String(timefmt::format_time_of_day_nano(nanos)))
        }
        _ => {
            if primitive.is_unsigned() {
                let number = value
                    .as_u64()
                    .ok_or_else(|| type_mismatch(primitive.name(), value))?;
                if number < NUMERIC_THRESHOLD as u64 {
                    Ok(JsonValue::Number(Number::from(number)))
                } else {
                    Ok(JsonValue::String(number.to_string()))
                }
            } else {
                let number = value
                    .as_i64()
                    .ok_or_else(|| type_mismatch(primitive.name(), value))?;
                if number.abs() < NUMERIC_THRESHOLD {
                    Ok(JsonValue::Number(Number::from(number)))
                } else {
                    Ok(JsonValue::String(number.to_string()))
                }
            }
        }
    }
}

/// 小尾数 decimal 的数字渲染。
fn decimal_to_number(mantissa: i64, exponent: i8) -> JsonValue {
    if exponent >= 0 {
        if let Some(scaled) = 10i64
            .checked_pow(exponent as u32)
            .and_then(|scale| mantissa.checked_mul(scale))
        {
            return JsonValue::Number(Number::from(scaled));
        }
    }
    let scaled = mantissa as f64 * pow10(exponent as i32);
    Number::from_f64(scaled)
        .map(JsonValue::Number)
        .unwrap_or_else(|| JsonValue::String(format!("{mantissa}e{exponent}")))
}

/// `10^exp`，无 `std` 环境下以循环乘除实现。
pub(crate) fn pow10(exp: i32) -> f64 {
    let mut result = 1.0f64;
    if exp >= 0 {
        for _ in 0..exp {
            result *= 10.0;
        }
    } else {
        for _ in 0..-exp {
            result /= 10.0;
        }
    }
    result
}

fn binary_to_json(data: &[u8]) -> JsonValue {
    match core::str::from_utf8(data) {
        Ok(text) => JsonValue::String(text.to_string()),
        Err(_) => JsonValue::Array(
            data.iter()
                .map(|byte| JsonValue::String(format!("{byte:02x}")))
                .collect(),
        ),
    }
}

fn type_mismatch(expected: &str, value: &Value) -> BlinkError {
    BlinkError::value(format!("expected {expected} value, got {value:?}"))
}
