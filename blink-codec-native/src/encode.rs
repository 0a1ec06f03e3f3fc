//! Native Binary 编码路径。
//!
//! # 教案定位（Why）
//! - 定长区在前、变长区在后，指针必须是距帧起点的绝对偏移。编码器把
//!   指针槽先写为占位符并登记待处理载荷，载荷落位时回填真实偏移，
//!   任意深度的嵌套变长数据（序列中的字符串、序列中的序列元素载荷）
//!   都由同一个先进先出队列驱动。
//!
//! # 契约说明（What）
//! - `size` 字段计入自身之后的全部字节；扩展块始终是帧内最后的内容，
//!   帧头的 `extensionOffset` 指向它（绝对偏移，0 表示无扩展）。
//! - 编码侧无宽容模式：位宽越界、超长、基类型不符即失败。

use alloc::collections::VecDeque;
use alloc::format;
use alloc::string::String;
use alloc::vec::Vec;

use blink_core::error::{BlinkError, Result, WeakKind};
use blink_core::{
    DecimalValue, GroupId, Message, Primitive, Registry, StaticGroupValue, Type, Value,
};

use crate::layout::{is_pointer_slot, INLINE_MAX};

/// 编码一条消息为 Native Binary 帧。
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

    let mut writer = Writer {
        registry,
        buf: alloc::vec![0u8; crate::layout::HEADER_LEN],
        pending: VecDeque::new(),
    };
    writer.buf[4..12].copy_from_slice(&type_id.to_le_bytes());
    writer.write_group_fields(group_id, &message.fields)?;
    writer.drain_pending()?;

    if !message.extensions.is_empty() {
        let ext_offset = writer.buf.len() as u32;
        writer.buf[12..16].copy_from_slice(&ext_offset.to_le_bytes());
        for extension in message.extensions.iter() {
            let nested = encode(extension, registry)?;
            writer.buf.extend_from_slice(&nested);
        }
    }

    let size = (writer.buf.len() - 4) as u32;
    writer.buf[0..4].copy_from_slice(&size.to_le_bytes());
    Ok(writer.buf)
}

/// 待回填的变长载荷。
enum Pending {
    /// `u32 长度 + 原始字节`。
    Bytes { slot: usize, data: Vec<u8> },
    /// `u32 计数 + 逐元素槽位`。
    Sequence {
        slot: usize,
        element: Type,
        items: Vec<Value>,
    },
    /// 完整嵌套帧。
    Frame { slot: usize, message: Message },
}

struct Writer<'r> {
    registry: &'r Registry,
    buf: Vec<u8>,
    pending: VecDeque<Pending>,
}

impl Writer<'_> {
    fn write_group_fields(
        &mut self,
        group_id: GroupId,
        fields: &blink_core::FieldMap,
    ) -> Result<()> {
        let layout: Vec<(String, Type, bool)> = self
            .registry
            .all_fields(group_id)
            .map(|field| (field.name.clone(), field.ty.clone(), field.optional))
            .collect();
        for (name, ty, optional) in layout {
            let value = fields.get(&name);
            if value.is_none() && !optional {
                return Err(
                    BlinkError::value(String::from("missing required field")).in_field(name)
                );
            }
            self.write_slot(&ty, value, optional).map_err(|err| {
                if matches!(err.location(), blink_core::Location::None) {
                    err.in_field(name.as_str())
                } else {
                    err
                }
            })?;
        }
        Ok(())
    }

    /// 写一个字段槽位（含可空标志字节策略）。
    fn write_slot(&mut self, ty: &Type, value: Option<&Value>, optional: bool) -> Result<()> {
        if is_pointer_slot(ty) {
            let Some(value) = value else {
                self.buf.extend_from_slice(&0u32.to_le_bytes());
                return Ok(());
            };
            return self.write_pointer_slot(ty, value);
        }
        if optional {
            match value {
                None => {
                    self.buf.push(0xC0);
                    let width = crate::layout::slot_size(ty, self.registry);
                    self.buf.resize(self.buf.len() + width, 0);
                    return Ok(());
                }
                Some(_) => self.buf.push(0x01),
            }
        }
        let value = value.expect("inline slot value present");
        self.write_inline_slot(ty, value)
    }

    fn write_inline_slot(&mut self, ty: &Type, value: &Value) -> Result<()> {
        match ty {
            Type::Primitive(primitive) => self.write_primitive(*primitive, value),
            Type::Enum(enum_id) => {
                let number = match value {
                    Value::Enum(symbol) => {
                        match self.registry.enum_def(*enum_id).value_for(symbol) {
                            Some(number) => number,
                            None => symbol.parse::<i32>().map_err(|_| {
                                BlinkError::value(format!(
                                    "enum {} has no symbol {symbol}",
                                    self.registry.enum_def(*enum_id).name
                                ))
                            })?,
                        }
                    }
                    Value::Int(number) => i32::try_from(*number).map_err(|_| {
                        BlinkError::value(String::from("enum value out of i32 range"))
                    })?,
                    other => return Err(type_mismatch("enum", other)),
                };
                self.buf.extend_from_slice(&number.to_le_bytes());
                Ok(())
            }
            Type::Fixed { size } => {
                let Value::Binary(data) = value else {
                    return Err(type_mismatch("fixed", value));
                };
                if data.len() != *size as usize {
                    return Err(BlinkError::value(format!(
                        "fixed field requires exactly {size} bytes, got {}",
                        data.len()
                    )));
                }
                self.buf.extend_from_slice(data);
                Ok(())
            }
            Type::String { max_size } | Type::Binary { max_size } => {
                let data = match (ty, value) {
                    (Type::String { .. }, Value::String(text)) => text.as_bytes(),
                    (Type::Binary { .. }, Value::Binary(data)) => data.as_slice(),
                    _ => return Err(type_mismatch("string/binary", value)),
                };
                let capacity = max_size.expect("inline slot implies declared max");
                debug_assert!((1..=INLINE_MAX).contains(&capacity));
                if data.len() > capacity as usize {
                    return Err(BlinkError::weak(
                        WeakKind::OverMaxSize,
                        format!(
                            "value length {} exceeds declared max {capacity}",
                            data.len()
                        ),
                    ));
                }
                self.buf.push(data.len() as u8);
                self.buf.extend_from_slice(data);
                self.buf
                    .resize(self.buf.len() + capacity as usize - data.len(), 0);
                Ok(())
            }
            Type::StaticGroup(group_id) => {
                let Value::Group(StaticGroupValue { fields }) = value else {
                    return Err(type_mismatch("static group", value));
                };
                self.write_group_fields(*group_id, fields)
            }
            Type::Sequence(_) | Type::DynamicGroup(_) | Type::Object => {
                unreachable!("pointer slots handled by write_pointer_slot")
            }
        }
    }

    fn write_pointer_slot(&mut self, ty: &Type, value: &Value) -> Result<()> {
        let slot = self.buf.len();
        self.buf.extend_from_slice(&0u32.to_le_bytes());
        match ty {
            Type::String { max_size } | Type::Binary { max_size } => {
                let data = match (ty, value) {
                    (Type::String { .. }, Value::String(text)) => text.as_bytes().to_vec(),
                    (Type::Binary { .. }, Value::Binary(data)) => data.clone(),
                    _ => return Err(type_mismatch("string/binary", value)),
                };
                if let Some(max) = max_size {
                    if data.len() > *max as usize {
                        return Err(BlinkError::weak(
                            WeakKind::OverMaxSize,
                            format!("value length {} exceeds declared max {max}", data.len()),
                        ));
                    }
                }
                self.pending.push_back(Pending::Bytes { slot, data });
                Ok(())
            }
            Type::Sequence(element) => {
                let Value::Sequence(items) = value else {
                    return Err(type_mismatch("sequence", value));
                };
                self.pending.push_back(Pending::Sequence {
                    slot,
                    element: (**element).clone(),
                    items: items.clone(),
                });
                Ok(())
            }
            Type::DynamicGroup(base) => {
                let Value::Message(message) = value else {
                    return Err(type_mismatch("dynamic group", value));
                };
                let actual = self
                    .registry
                    .find_group_by_name(&message.name)
                    .ok_or_else(|| {
                        BlinkError::resolve(format!("unknown group {}", message.name))
                    })?;
                if !self.registry.is_descendant(actual, *base) {
                    return Err(BlinkError::weak(
                        WeakKind::BaseTypeMismatch,
                        format!(
                            "group {} is not derived from {}",
                            message.name,
                            self.registry.group(*base).name
                        ),
                    ));
                }
                self.pending.push_back(Pending::Frame {
                    slot,
                    message: (**message).clone(),
                });
                Ok(())
            }
            Type::Object => {
                let Value::Message(message) = value else {
                    return Err(type_mismatch("object", value));
                };
                self.pending.push_back(Pending::Frame {
                    slot,
                    message: (**message).clone(),
                });
                Ok(())
            }
            _ => unreachable!("inline slots handled by write_inline_slot"),
        }
    }

    /// 落位全部待处理载荷；载荷内的新指针会继续入队。
    fn drain_pending(&mut self) -> Result<()> {
        while let Some(pending) = self.pending.pop_front() {
            let target = self.buf.len() as u32;
            match pending {
                Pending::Bytes { slot, data } => {
                    self.patch(slot, target);
                    self.buf
                        .extend_from_slice(&(data.len() as u32).to_le_bytes());
                    self.buf.extend_from_slice(&data);
                }
                Pending::Sequence {
                    slot,
                    element,
                    items,
                } => {
                    self.patch(slot, target);
                    self.buf
                        .extend_from_slice(&(items.len() as u32).to_le_bytes());
                    for item in &items {
                        self.write_slot(&element, Some(item), false)?;
                    }
                }
                Pending::Frame { slot, message } => {
                    self.patch(slot, target);
                    let nested = encode(&message, self.registry)?;
                    self.buf.extend_from_slice(&nested);
                }
            }
        }
        Ok(())
    }

    fn patch(&mut self, slot: usize, target: u32) {
        self.buf[slot..slot + 4].copy_from_slice(&target.to_le_bytes());
    }

    fn write_primitive(&mut self, primitive: Primitive, value: &Value) -> Result<()> {
        match primitive {
            Primitive::Bool => {
                let Value::Bool(flag) = value else {
                    return Err(type_mismatch("bool", value));
                };
                self.buf.push(u8::from(*flag));
                Ok(())
            }
            Primitive::F64 => {
                let Value::F64(number) = value else {
                    return Err(type_mismatch("f64", value));
                };
                self.buf.extend_from_slice(&number.to_le_bytes());
                Ok(())
            }
            Primitive::Decimal => {
                let Value::Decimal(DecimalValue { exponent, mantissa }) = value else {
                    return Err(type_mismatch("decimal", value));
                };
                self.buf.push(*exponent as u8);
                self.buf.extend_from_slice(&mantissa.to_le_bytes());
                Ok(())
            }
            _ => self.write_int(primitive, value),
        }
    }

    fn write_int(&mut self, primitive: Primitive, value: &Value) -> Result<()> {
        let bits = primitive
            .int_bits()
            .expect("integer family primitive has a bit width");
        let width = crate::layout::primitive_width(primitive);
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
            self.buf.extend_from_slice(&number.to_le_bytes()[..width]);
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
            self.buf.extend_from_slice(&number.to_le_bytes()[..width]);
        }
        Ok(())
    }
}

fn type_mismatch(expected: &str, value: &Value) -> BlinkError {
    BlinkError::value(format!("expected {expected} value, got {value:?}"))
}
