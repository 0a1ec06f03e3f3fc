//! JSON 映射解析。
//!
//! # 契约说明（What）
//! - 消息对象必须携带 `"$type"`；静态组对象上的 `"$type"` 仅作标记，
//!   解析时忽略。
//! - 显式 `null` 与键缺失同义：均按字段缺省处理。
//! - 整数接受 JSON 数字与十进制字符串两种形态；字节串接受 UTF-8
//!   字符串或十六进制字符串数组（数组元素内允许以空白分组的多个
//!   字节对）。

use alloc::format;
use alloc::string::{String, ToString};
use alloc::vec::Vec;

use blink_core::error::{BlinkError, Result};
use blink_core::{
    timefmt, DecimalValue, Message, Primitive, QName, Registry, StaticGroupValue, Type, Value,
};
use serde_json::{Map, Value as JsonValue};

/// 解析一条 JSON 消息。
pub fn decode(text: &str, registry: &Registry) -> Result<Message> {
    let parsed: JsonValue = serde_json::from_str(text)
        .map_err(|err| BlinkError::parse(format!("invalid JSON document: {err}")))?;
    message_from_json(&parsed, registry)
}

/// 解析 JSON 数组形式的消息流。
pub fn decode_stream(text: &str, registry: &Registry) -> Result<Vec<Message>> {
    let parsed: JsonValue = serde_json::from_str(text)
        .map_err(|err| BlinkError::parse(format!("invalid JSON document: {err}")))?;
    let JsonValue::Array(items) = parsed else {
        return Err(BlinkError::parse(String::from("JSON stream must be an array")));
    };
    let mut messages = Vec::with_capacity(items.len());
    for item in &items {
        messages.push(message_from_json(item, registry)?);
    }
    Ok(messages)
}

/// JSON 对象到消息。
pub fn message_from_json(value: &JsonValue, registry: &Registry) -> Result<Message> {
    let JsonValue::Object(object) = value else {
        return Err(BlinkError::parse(String::from("JSON message must be an object")));
    };
    let type_name = object
        .get("$type")
        .and_then(JsonValue::as_str)
        .ok_or_else(|| BlinkError::parse(String::from("JSON message must include $type")))?;
    let qname = QName::parse(type_name, None);
    let group_id = registry
        .find_group_by_name(&qname)
        .ok_or_else(|| BlinkError::resolve(format!("unknown group {qname}")))?;
    let mut message = Message::new(registry.group(group_id).name.clone());
    fill_fields(object, group_id, registry, &mut message.fields)?;
    if let Some(extensions) = object.get("$extension") {
        let JsonValue::Array(items) = extensions else {
            return Err(BlinkError::parse(String::from("$extension must be an array")));
        };
        for item in items {
            message.extensions.push(message_from_json(item, registry)?);
        }
    }
    Ok(message)
}

fn fill_fields(
    object: &Map<String, JsonValue>,
    group_id: blink_core::GroupId,
    registry: &Registry,
    fields: &mut blink_core::FieldMap,
) -> Result<()> {
    let layout: Vec<(String, Type)> = registry
        .all_fields(group_id)
        .map(|field| (field.name.clone(), field.ty.clone()))
        .collect();
    for (name, ty) in layout {
        let Some(raw) = object.get(&name) else {
            continue;
        };
        if raw.is_null() {
            // 显式 null 等同缺省。
            continue;
        }
        let value = value_from_json(raw, &ty, registry)
            .map_err(|err| {
                if matches!(err.location(), blink_core::Location::None) {
                    err.in_field(name.as_str())
                } else {
                    err
                }
            })?;
        fields.insert(name, value);
    }
    Ok(())
}

fn value_from_json(raw: &JsonValue, ty: &Type, registry: &Registry) -> Result<Value> {
    match ty {
        Type::Primitive(primitive) => primitive_from_json(raw, *primitive),
        Type::String { .. } => raw
            .as_str()
            .map(|text| Value::String(text.to_string()))
            .ok_or_else(|| type_mismatch("string", raw)),
        Type::Binary { .. } => binary_from_json(raw),
        Type::Fixed { size } => {
            let value = binary_from_json(raw)?;
            let Value::Binary(data) = &value else {
                unreachable!("binary_from_json yields binary values");
            };
            if data.len() != *size as usize {
                return Err(BlinkError::value(format!(
                    "fixed field requires exactly {size} bytes, got {}",
                    data.len()
                )));
            }
            Ok(value)
        }
        Type::Enum(_) => raw
            .as_str()
            .map(|symbol| Value::Enum(symbol.to_string()))
            .ok_or_else(|| type_mismatch("enum", raw)),
        Type::Sequence(element) => {
            let JsonValue::Array(items) = raw else {
                return Err(type_mismatch("sequence", raw));
            };
            let mut values = Vec::with_capacity(items.len());
            for item in items {
                values.push(value_from_json(item, element, registry)?);
            }
            Ok(Value::Sequence(values))
        }
        Type::StaticGroup(group_id) => {
            let JsonValue::Object(object) = raw else {
                return Err(type_mismatch("static group", raw));
            };
            let mut group = StaticGroupValue::new();
            fill_fields(object, *group_id, registry, &mut group.fields)?;
            Ok(Value::Group(group))
        }
        Type::DynamicGroup(_) | Type::Object => {
            Ok(Value::from(message_from_json(raw, registry)?))
        }
    }
}

fn primitive_from_json(raw: &JsonValue, primitive: Primitive) -> Result<Value> {
    match primitive {
        Primitive::Bool => match raw {
            JsonValue::Bool(flag) => Ok(Value::Bool(*flag)),
            JsonValue::String(text) if text == "true" => Ok(Value::Bool(true)),
            JsonValue::String(text) if text == "false" => Ok(Value::Bool(false)),
            other => Err(type_mismatch("bool", other)),
        },
        Primitive::F64 => match raw {
            JsonValue::String(text) => match text.as_str() {
                "NaN" => Ok(Value::F64(f64::NAN)),
                "Inf" => Ok(Value::F64(f64::INFINITY)),
                "-Inf" => Ok(Value::F64(f64::NEG_INFINITY)),
                other => other
                    .parse::<f64>()
                    .map(Value::F64)
                    .map_err(|_| BlinkError::value(format!("invalid f64 literal {other:?}"))),
            },
            other => other
                .as_f64()
                .map(Value::F64)
                .ok_or_else(|| type_mismatch("f64", other)),
        },
        Primitive::Decimal => decimal_from_json(raw),
        Primitive::Date => {
            let text = raw.as_str().ok_or_else(|| type_mismatch("date", raw))?;
            timefmt::parse_date(text).map(Value::Int)
        }
        Primitive::MilliTime => {
            let text = raw.as_str().ok_or_else(|| type_mismatch("millitime", raw))?;
            timefmt::parse_millitime(text).map(Value::Int)
        }
        Primitive::NanoTime => {
            let text = raw.as_str().ok_or_else(|| type_mismatch("nanotime", raw))?;
            timefmt::parse_nanotime(text).map(Value::Int)
        }
        Primitive::TimeOfDayMilli => {
            let text = raw
                .as_str()
                .ok_or_else(|| type_mismatch("timeOfDayMilli", raw))?;
            timefmt::parse_time_of_day_milli(text).map(|millis| Value::UInt(millis as u64))
        }
        Primitive::TimeOfDayNano => {
            let text = raw
                .as_str()
                .ok_or_else(|| type_mismatch("timeOfDayNano", raw))?;
            timefmt::parse_time_of_day_nano(text).map(Value::UInt)
        }
        _ => {
            if primitive.is_unsigned() {
                match raw {
                    JsonValue::Number(number) => number
                        .as_u64()
                        .map(Value::UInt)
                        .ok_or_else(|| type_mismatch(primitive.name(), raw)),
                    JsonValue::String(text) => text
                        .parse::<u64>()
                        .map(Value::UInt)
                        .map_err(|_| BlinkError::value(format!("invalid integer literal {text:?}"))),
                    other => Err(type_mismatch(primitive.name(), other)),
                }
            } else {
                match raw {
                    JsonValue::Number(number) => number
                        .as_i64()
                        .map(Value::Int)
                        .ok_or_else(|| type_mismatch(primitive.name(), raw)),
                    JsonValue::String(text) => text
                        .parse::<i64>()
                        .map(Value::Int)
                        .map_err(|_| BlinkError::value(format!("invalid integer literal {text:?}"))),
                    other => Err(type_mismatch(primitive.name(), other)),
                }
            }
        }
    }
}

fn decimal_from_json(raw: &JsonValue) -> Result<Value> {
    match raw {
        JsonValue::Number(number) => decimal_from_text(&number.to_string()),
        JsonValue::String(text) => decimal_from_text(text),
        JsonValue::Object(object) => {
            let exponent = object
                .get("exponent")
                .and_then(JsonValue::as_i64)
                .ok_or_else(|| type_mismatch("decimal", raw))?;
            let mantissa = object
                .get("mantissa")
                .and_then(JsonValue::as_i64)
                .ok_or_else(|| type_mismatch("decimal", raw))?;
            let exponent = i8::try_from(exponent)
                .map_err(|_| BlinkError::value(String::from("decimal exponent exceeds i8 range")))?;
            Ok(Value::Decimal(DecimalValue::new(exponent, mantissa)))
        }
        other => Err(type_mismatch("decimal", other)),
    }
}

/// 从十进制/科学计数法文本恢复指数与尾数。
fn decimal_from_text(text: &str) -> Result<Value> {
    let invalid = || BlinkError::value(format!("invalid decimal literal {text:?}"));
    let (base, exp10) = match text.split_once(['e', 'E']) {
        Some((base, exponent)) => (base, exponent.parse::<i32>().map_err(|_| invalid())?),
        None => (text, 0),
    };
    let (int_part, frac_part) = match base.split_once('.') {
        Some((int_part, frac_part)) => (int_part, frac_part),
        None => (base, ""),
    };
    if frac_part.len() > i32::MAX as usize {
        return Err(invalid());
    }
    let mut digits = String::with_capacity(int_part.len() + frac_part.len());
    digits.push_str(int_part);
    digits.push_str(frac_part);
    let mantissa = digits.parse::<i64>().map_err(|_| invalid())?;
    let exponent = exp10 - frac_part.len() as i32;
    let exponent =
        i8::try_from(exponent).map_err(|_| BlinkError::value(String::from(
            "decimal exponent exceeds i8 range",
        )))?;
    Ok(Value::Decimal(DecimalValue::new(exponent, mantissa)))
}

fn binary_from_json(raw: &JsonValue) -> Result<Value> {
    match raw {
        JsonValue::String(text) => Ok(Value::Binary(text.as_bytes().to_vec())),
        JsonValue::Array(parts) => {
            let mut data = Vec::new();
            for part in parts {
                let text = part.as_str().ok_or_else(|| type_mismatch("binary", raw))?;
                // 每个数组元素允许携带以空白分组的多个字节对。
                for pair in text.split_whitespace() {
                    let byte = u8::from_str_radix(pair, 16)
                        .map_err(|_| BlinkError::value(format!("invalid hex byte {pair:?}")))?;
                    data.push(byte);
                }
            }
            Ok(Value::Binary(data))
        }
        other => Err(type_mismatch("binary", other)),
    }
}

fn type_mismatch(expected: &str, raw: &JsonValue) -> BlinkError {
    BlinkError::value(format!("expected {expected} value, got {raw}"))
}
