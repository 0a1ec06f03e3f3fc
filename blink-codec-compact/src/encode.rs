//! Compact Binary 编码路径。
//!
//! # 教案定位（Why）
//! - 按线性化声明序逐字段写出 VLC 编码，嵌套动态组递归成完整子帧，
//!   输出对同一消息逐比特确定。
//!
//! # 契约说明（What）
//! - 编码侧没有宽容模式：任何弱约束违反（位宽越界、超出声明长度、
//!   动态组基类型不符）都立即失败，保证线上只出现合法字节。
//! - 消息类型必须携带数值类型标识，否则无法成帧。

use alloc::format;
use alloc::string::String;
use alloc::vec::Vec;

use blink_core::error::{BlinkError, Result, WeakKind};
use blink_core::{
    DecimalValue, GroupId, Message, Primitive, Registry, StaticGroupValue, Type, Value,
};

use crate::frame::encode_frame;
use crate::vlc;

/// 编码一条消息为 Compact Binary 帧。
pub fn encode(message: &Message, registry: &Registry) -> Result<Vec<u8>> {
    let group_id = registry
        .find_group_by_name(&message.name)
        .ok_or_else(|| BlinkError::resolve(format!("unknown group {}", message.name)))?;
    let group = registry.group(group_id);
    let type_id = group.type_id.ok_or_else(|| {
        BlinkError::value(format!(
            "group {} is missing a type id and cannot be framed",
            group.name
        ))
    })?;
    let mut payload = Vec::new();
    encode_group_fields(group_id, &message.fields, registry, &mut payload)?;
    if !message.extensions.is_empty() {
        vlc::encode_u64(message.extensions.len() as u64, &mut payload);
        for extension in message.extensions.iter() {
            let nested = encode(extension, registry)?;
            payload.extend_from_slice(&nested);
        }
    }
    Ok(encode_frame(type_id, &payload))
}

fn encode_group_fields(
    group_id: GroupId,
    fields: &blink_core::FieldMap,
    registry: &Registry,
    out: &mut Vec<u8>,
) -> Result<()> {
    for field in registry.all_fields(group_id) {
        let value = fields.get(&field.name);
        if value.is_none() && !field.optional {
            return Err(
                BlinkError::value(String::from("missing required field")).in_field(field.name.as_str())
            );
        }
        encode_value(&field.ty, value, field.optional, registry, out).map_err(|err| {
            if matches!(err.location(), blink_core::Location::None) {
                err.in_field(field.name.as_str())
            } else {
                err
            }
        })?;
    }
    Ok(())
}

fn encode_value(
    ty: &Type,
    value: Option<&Value>,
    optional: bool,
    registry: &Registry,
    out: &mut Vec<u8>,
) -> Result<()> {
    match ty {
        Type::Primitive(primitive) => encode_primitive(*primitive, value, out),
        Type::String { max_size } => {
            let Some(value) = value else {
                vlc::encode_null(out);
                return Ok(());
            };
            let Value::String(text) = value else {
                return Err(type_mismatch("string", value));
            };
            encode_len_prefixed(text.as_bytes(), *max_size, out)
        }
        Type::Binary { max_size } => {
            let Some(value) = value else {
                vlc::encode_null(out);
                return Ok(());
            };
            let Value::Binary(data) = value else {
                return Err(type_mismatch("binary", value));
            };
            encode_len_prefixed(data, *max_size, out)
        }
        Type::Fixed { size } => {
            let Some(value) = value else {
                out.push(vlc::NULL_BYTE);
                return Ok(());
            };
            let Value::Binary(data) = value else {
                return Err(type_mismatch("fixed", value));
            };
            if data.len() != *size as usize {
                return Err(BlinkError::value(format!(
                    "fixed field requires exactly {size} bytes, got {}",
                    data.len()
                )));
            }
            if optional {
                out.push(0x01);
            }
            out.extend_from_slice(data);
            Ok(())
        }
        Type::Enum(enum_id) => {
            let Some(value) = value else {
                vlc::encode_null(out);
                return Ok(());
            };
            let number = match value {
                Value::Enum(symbol) => match registry.enum_def(*enum_id).value_for(symbol) {
                    Some(number) => number,
                    // 宽容解码产出的未知数值哨兵以十进制文本回写。
                    None => symbol.parse::<i32>().map_err(|_| {
                        BlinkError::value(format!(
                            "enum {} has no symbol {symbol}",
                            registry.enum_def(*enum_id).name
                        ))
                    })?,
                },
                Value::Int(number) => i32::try_from(*number)
                    .map_err(|_| BlinkError::value(String::from("enum value out of i32 range")))?,
                other => return Err(type_mismatch("enum", other)),
            };
            vlc::encode_i64(number as i64, out);
            Ok(())
        }
        Type::Sequence(element) => {
            let Some(value) = value else {
                vlc::encode_null(out);
                return Ok(());
            };
            let Value::Sequence(items) = value else {
                return Err(type_mismatch("sequence", value));
            };
            vlc::encode_u64(items.len() as u64, out);
            for item in items {
                encode_value(element, Some(item), false, registry, out)?;
            }
            Ok(())
        }
        Type::StaticGroup(group_id) => {
            let Some(value) = value else {
                out.push(vlc::NULL_BYTE);
                return Ok(());
            };
            let Value::Group(StaticGroupValue { fields }) = value else {
                return Err(type_mismatch("static group", value));
            };
            if optional {
                out.push(0x01);
            }
            encode_group_fields(*group_id, fields, registry, out)
        }
        Type::DynamicGroup(base) => {
            let Some(value) = value else {
                vlc::encode_null(out);
                return Ok(());
            };
            let Value::Message(message) = value else {
                return Err(type_mismatch("dynamic group", value));
            };
            let actual = registry
                .find_group_by_name(&message.name)
                .ok_or_else(|| BlinkError::resolve(format!("unknown group {}", message.name)))?;
            if !registry.is_descendant(actual, *base) {
                return Err(BlinkError::weak(
                    WeakKind::BaseTypeMismatch,
                    format!(
                        "group {} is not derived from {}",
                        message.name,
                        registry.group(*base).name
                    ),
                ));
            }
            let nested = encode(message, registry)?;
            out.extend_from_slice(&nested);
            Ok(())
        }
        Type::Object => {
            let Some(value) = value else {
                vlc::encode_null(out);
                return Ok(());
            };
            let Value::Message(message) = value else {
                return Err(type_mismatch("object", value));
            };
            let nested = encode(message, registry)?;
            out.extend_from_slice(&nested);
            Ok(())
        }
    }
}

fn encode_primitive(primitive: Primitive, value: Option<&Value>, out: &mut Vec<u8>) -> Result<()> {
    let Some(value) = value else {
        vlc::encode_null(out);
        return Ok(());
    };
    match primitive {
        Primitive::Bool => {
            let Value::Bool(flag) = value else {
                return Err(type_mismatch("bool", value));
            };
            vlc::encode_u64(u64::from(*flag), out);
            Ok(())
        }
        Primitive::F64 => {
            let Value::F64(number) = value else {
                return Err(type_mismatch("f64", value));
            };
            vlc::encode_u64(number.to_bits(), out);
            Ok(())
        }
        Primitive::Decimal => {
            let Value::Decimal(DecimalValue { exponent, mantissa }) = value else {
                return Err(type_mismatch("decimal", value));
            };
            vlc::encode_i64(*exponent as i64, out);
            vlc::encode_i64(*mantissa, out);
            Ok(())
        }
        _ => encode_int(primitive, value, out),
    }
}

fn encode_int(primitive: Primitive, value: &Value, out: &mut Vec<u8>) -> Result<()> {
    let bits = primitive
        .int_bits()
        .expect("integer family primitive has a bit width");
    if primitive.is_unsigned() {
        let number = value
            .as_u64()
            .ok_or_else(|| type_mismatch(primitive.name(), value))?;
        if bits < 64 && number >> bits != 0 {
            return Err(BlinkError::value(format!(
                "value {number} exceeds {} range",
                primitive.name()
            )));
        }
        vlc::encode_u64(number, out);
    } else {
        let number = value
            .as_i64()
            .ok_or_else(|| type_mismatch(primitive.name(), value))?;
        if bits < 64 {
            let max = (1i64 << (bits - 1)) - 1;
            let min = -(1i64 << (bits - 1));
            if number > max || number < min {
                return Err(BlinkError::value(format!(
                    "value {number} exceeds {} range",
                    primitive.name()
                )));
            }
        }
        vlc::encode_i64(number, out);
    }
    Ok(())
}

fn encode_len_prefixed(data: &[u8], max_size: Option<u32>, out: &mut Vec<u8>) -> Result<()> {
    if let Some(max) = max_size {
        if data.len() > max as usize {
            return Err(BlinkError::weak(
                WeakKind::OverMaxSize,
                format!("value length {} exceeds declared max {max}", data.len()),
            ));
        }
    }
    vlc::encode_u64(data.len() as u64, out);
    out.extend_from_slice(data);
    Ok(())
}

fn type_mismatch(expected: &str, value: &Value) -> BlinkError {
    BlinkError::value(format!("expected {expected} value, got {value:?}"))
}
