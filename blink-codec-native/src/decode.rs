//! Native Binary 解码路径。
//!
//! # 教案定位（Why）
//! - 解码按定长区槽位顺序推进，变长数据经指针间接读取。指针合法性
//!   （落在定长区之后、帧尾之前）在解引用前逐一校验，越界即强帧错误。
//!
//! # 契约说明（What）
//! - `strict` 语义与 Compact 解码一致：弱错误（未知类型、UTF-8、
//!   越界枚举、非法存在标志）在严格模式中止、宽容模式记录恢复；
//!   指针损坏永远是强错误。
//! - 嵌套帧的指针以其自身帧起点为基准，解码递归时基准随之切换。

use alloc::format;
use alloc::string::{String, ToString};
use alloc::vec::Vec;

use blink_core::error::{BlinkError, Result, WeakKind};
use blink_core::{
    DecimalValue, FieldMap, GroupId, Message, Primitive, Registry, StaticGroupValue, Type, Value,
};

use crate::layout::{group_region_size, is_pointer_slot, HEADER_LEN, INLINE_MAX};

/// Native 帧解码器；`warnings` 积累宽容模式下的弱错误。
pub struct Decoder<'r> {
    registry: &'r Registry,
    strict: bool,
    warnings: Vec<BlinkError>,
}

/// 解码 `offset` 处的一帧；宽容模式下未知类型返回 `(None, 下一帧偏移)`。
pub fn decode_one(
    buf: &[u8],
    offset: usize,
    registry: &Registry,
    strict: bool,
) -> Result<(Option<Message>, usize)> {
    Decoder::new(registry, strict).decode_one(buf, offset)
}

impl<'r> Decoder<'r> {
    /// 构造解码器。
    pub fn new(registry: &'r Registry, strict: bool) -> Self {
        Self {
            registry,
            strict,
            warnings: Vec::new(),
        }
    }

    /// 宽容模式下记录的弱错误。
    pub fn warnings(&self) -> &[BlinkError] {
        &self.warnings
    }

    fn weak(&mut self, kind: WeakKind, message: String, offset: usize) -> Result<()> {
        let err = BlinkError::weak(kind, message).at_byte(offset);
        if self.strict {
            return Err(err);
        }
        self.warnings.push(err);
        Ok(())
    }

    /// 解码 `offset` 处的一帧。
    pub fn decode_one(&mut self, buf: &[u8], offset: usize) -> Result<(Option<Message>, usize)> {
        let frame = FrameView::parse(buf, offset)?;
        let Some(group_id) = self.registry.find_group_by_id(frame.type_id) else {
            self.weak(
                WeakKind::UnknownTypeId,
                format!("unknown type id {}", frame.type_id),
                offset + 4,
            )?;
            return Ok((None, frame.end));
        };
        let fixed_end = offset + HEADER_LEN + group_region_size(group_id, self.registry);
        if fixed_end > frame.end {
            return Err(BlinkError::framing(format!(
                "fixed region exceeds frame: needs {} bytes, frame ends at {}",
                fixed_end - offset,
                frame.end - offset
            ))
            .at_byte(offset));
        }
        let mut message = Message::new(self.registry.group(group_id).name.clone());
        let mut cursor = offset + HEADER_LEN;
        self.decode_group_fields(buf, &frame, fixed_end, &mut cursor, group_id, &mut message.fields)?;

        if frame.ext_offset != 0 {
            let mut pos = offset
                .checked_add(frame.ext_offset as usize)
                .filter(|pos| *pos >= fixed_end && *pos < frame.end)
                .ok_or_else(|| {
                    BlinkError::framing(String::from("extension offset outside frame"))
                        .at_byte(offset + 12)
                })?;
            while pos < frame.end {
                let (extension, next) = self.decode_one(buf, pos)?;
                if next > frame.end {
                    return Err(BlinkError::framing(String::from(
                        "extension frame exceeds enclosing frame",
                    ))
                    .at_byte(pos));
                }
                pos = next;
                if let Some(extension) = extension {
                    message.extensions.push(extension);
                }
            }
        }
        Ok((Some(message), frame.end))
    }

    #[allow(clippy::too_many_arguments)]
    fn decode_group_fields(
        &mut self,
        buf: &[u8],
        frame: &FrameView,
        fixed_end: usize,
        cursor: &mut usize,
        group_id: GroupId,
        fields: &mut FieldMap,
    ) -> Result<()> {
        let layout: Vec<(String, Type, bool)> = self
            .registry
            .all_fields(group_id)
            .map(|field| (field.name.clone(), field.ty.clone(), field.optional))
            .collect();
        for (name, ty, optional) in layout {
            if let Some(value) = self.decode_slot(buf, frame, fixed_end, cursor, &ty, optional)? {
                fields.insert(name, value);
            }
        }
        Ok(())
    }

    /// 解码一个定长区槽位。
    fn decode_slot(
        &mut self,
        buf: &[u8],
        frame: &FrameView,
        fixed_end: usize,
        cursor: &mut usize,
        ty: &Type,
        optional: bool,
    ) -> Result<Option<Value>> {
        if is_pointer_slot(ty) {
            let pointer = read_u32(buf, *cursor, frame.end)?;
            let slot_offset = *cursor;
            *cursor += 4;
            if pointer == 0 {
                if optional {
                    return Ok(None);
                }
                return Err(BlinkError::value(String::from(
                    "required variable field has a null pointer",
                ))
                .at_byte(slot_offset));
            }
            let target = frame
                .base
                .checked_add(pointer as usize)
                .filter(|target| *target >= fixed_end && *target < frame.end)
                .ok_or_else(|| {
                    BlinkError::framing(format!(
                        "pointer {pointer} outside variable region"
                    ))
                    .at_byte(slot_offset)
                })?;
            return self.decode_pointer_target(buf, frame, fixed_end, ty, target).map(Some);
        }

        if optional {
            let byte = *buf.get(*cursor).filter(|_| *cursor < frame.end).ok_or_else(|| {
                BlinkError::framing(String::from("truncated presence byte")).at_byte(*cursor)
            })?;
            let presence_offset = *cursor;
            *cursor += 1;
            let present = match byte {
                0x01 => true,
                0xC0 | 0x00 => false,
                other => {
                    self.weak(
                        WeakKind::InvalidPresence,
                        format!("invalid presence byte {other:#04x}"),
                        presence_offset,
                    )?;
                    true
                }
            };
            if !present {
                // 缺省时槽位字节未定义，跳过不读。
                *cursor += crate::layout::slot_size(ty, self.registry);
                return Ok(None);
            }
        }
        self.decode_inline_slot(buf, frame, fixed_end, cursor, ty).map(Some)
    }

    fn decode_inline_slot(
        &mut self,
        buf: &[u8],
        frame: &FrameView,
        fixed_end: usize,
        cursor: &mut usize,
        ty: &Type,
    ) -> Result<Value> {
        match ty {
            Type::Primitive(primitive) => self.decode_primitive(buf, frame, cursor, *primitive),
            Type::Enum(enum_id) => {
                let raw = read_u32(buf, *cursor, frame.end)? as i32;
                let offset = *cursor;
                *cursor += 4;
                match self.registry.enum_def(*enum_id).symbol_for(raw) {
                    Some(symbol) => Ok(Value::Enum(symbol.to_string())),
                    None => {
                        self.weak(
                            WeakKind::UnmappedEnum,
                            format!(
                                "enum {} has no symbol for value {raw}",
                                self.registry.enum_def(*enum_id).name
                            ),
                            offset,
                        )?;
                        Ok(Value::Enum(raw.to_string()))
                    }
                }
            }
            Type::Fixed { size } => {
                let data = read_bytes(buf, *cursor, *size as usize, frame.end)?;
                *cursor += *size as usize;
                Ok(Value::Binary(data))
            }
            Type::String { max_size } | Type::Binary { max_size } => {
                let capacity = max_size.expect("inline slot implies declared max");
                debug_assert!((1..=INLINE_MAX).contains(&capacity));
                let len_byte = read_bytes(buf, *cursor, 1, frame.end)?[0] as usize;
                let offset = *cursor;
                let mut len = len_byte;
                if len > capacity as usize {
                    self.weak(
                        WeakKind::OverMaxSize,
                        format!("inline length {len} exceeds declared max {capacity}"),
                        offset,
                    )?;
                    len = capacity as usize;
                }
                let data = read_bytes(buf, *cursor + 1, len, frame.end)?;
                *cursor += 1 + capacity as usize;
                if matches!(ty, Type::String { .. }) {
                    self.bytes_to_string(data, offset)
                } else {
                    Ok(Value::Binary(data))
                }
            }
            Type::StaticGroup(group_id) => {
                let mut group = StaticGroupValue::new();
                self.decode_group_fields(buf, frame, fixed_end, cursor, *group_id, &mut group.fields)?;
                Ok(Value::Group(group))
            }
            Type::Sequence(_) | Type::DynamicGroup(_) | Type::Object => {
                unreachable!("pointer slots handled by decode_slot")
            }
        }
    }

    /// 解引用指针槽：按类型读取变长区载荷。
    fn decode_pointer_target(
        &mut self,
        buf: &[u8],
        frame: &FrameView,
        fixed_end: usize,
        ty: &Type,
        target: usize,
    ) -> Result<Value> {
        match ty {
            Type::String { max_size } | Type::Binary { max_size } => {
                let len = read_u32(buf, target, frame.end)? as usize;
                let data = read_bytes(buf, target + 4, len, frame.end)?;
                if let Some(max) = max_size {
                    if len > *max as usize {
                        self.weak(
                            WeakKind::OverMaxSize,
                            format!("value length {len} exceeds declared max {max}"),
                            target,
                        )?;
                    }
                }
                if matches!(ty, Type::String { .. }) {
                    self.bytes_to_string(data, target)
                } else {
                    Ok(Value::Binary(data))
                }
            }
            Type::Sequence(element) => {
                let count = read_u32(buf, target, frame.end)? as usize;
                let mut cursor = target + 4;
                let mut items = Vec::with_capacity(count.min(1024));
                for _ in 0..count {
                    if let Some(item) =
                        self.decode_slot(buf, frame, fixed_end, &mut cursor, element, false)?
                    {
                        items.push(item);
                    }
                }
                Ok(Value::Sequence(items))
            }
            Type::DynamicGroup(base) => {
                let (message, next) = self.decode_one(buf, target)?;
                if next > frame.end {
                    return Err(BlinkError::framing(String::from(
                        "nested frame exceeds enclosing frame",
                    ))
                    .at_byte(target));
                }
                let Some(message) = message else {
                    return Err(BlinkError::framing(String::from(
                        "nested frame carries unknown type id",
                    ))
                    .at_byte(target));
                };
                if let Some(actual) = self.registry.find_group_by_name(&message.name) {
                    if !self.registry.is_descendant(actual, *base) {
                        self.weak(
                            WeakKind::BaseTypeMismatch,
                            format!(
                                "group {} is not derived from {}",
                                message.name,
                                self.registry.group(*base).name
                            ),
                            target,
                        )?;
                    }
                }
                Ok(Value::from(message))
            }
            Type::Object => {
                let (message, next) = self.decode_one(buf, target)?;
                if next > frame.end {
                    return Err(BlinkError::framing(String::from(
                        "nested frame exceeds enclosing frame",
                    ))
                    .at_byte(target));
                }
                let Some(message) = message else {
                    return Err(BlinkError::framing(String::from(
                        "nested frame carries unknown type id",
                    ))
                    .at_byte(target));
                };
                Ok(Value::from(message))
            }
            _ => unreachable!("inline slots handled by decode_inline_slot"),
        }
    }

    fn decode_primitive(
        &mut self,
        buf: &[u8],
        frame: &FrameView,
        cursor: &mut usize,
        primitive: Primitive,
    ) -> Result<Value> {
        let width = crate::layout::primitive_width(primitive);
        let bytes = read_bytes(buf, *cursor, width, frame.end)?;
        *cursor += width;
        Ok(match primitive {
            Primitive::Bool => Value::Bool(bytes[0] != 0),
            Primitive::F64 => Value::F64(f64::from_le_bytes(bytes.try_into().expect("8 bytes"))),
            Primitive::Decimal => {
                let exponent = bytes[0] as i8;
                let mantissa = i64::from_le_bytes(bytes[1..9].try_into().expect("8 bytes"));
                Value::Decimal(DecimalValue::new(exponent, mantissa))
            }
            Primitive::U8 => Value::UInt(bytes[0] as u64),
            Primitive::I8 => Value::Int(bytes[0] as i8 as i64),
            Primitive::U16 => {
                Value::UInt(u16::from_le_bytes(bytes.try_into().expect("2 bytes")) as u64)
            }
            Primitive::I16 => {
                Value::Int(i16::from_le_bytes(bytes.try_into().expect("2 bytes")) as i64)
            }
            Primitive::U32 | Primitive::TimeOfDayMilli => {
                Value::UInt(u32::from_le_bytes(bytes.try_into().expect("4 bytes")) as u64)
            }
            Primitive::I32 | Primitive::Date => {
                Value::Int(i32::from_le_bytes(bytes.try_into().expect("4 bytes")) as i64)
            }
            Primitive::U64 | Primitive::TimeOfDayNano => {
                Value::UInt(u64::from_le_bytes(bytes.try_into().expect("8 bytes")))
            }
            Primitive::I64 | Primitive::MilliTime | Primitive::NanoTime => {
                Value::Int(i64::from_le_bytes(bytes.try_into().expect("8 bytes")))
            }
        })
    }

    fn bytes_to_string(&mut self, data: Vec<u8>, offset: usize) -> Result<Value> {
        match core::str::from_utf8(&data) {
            Ok(text) => Ok(Value::String(text.to_string())),
            Err(_) => {
                self.weak(
                    WeakKind::InvalidUtf8,
                    String::from("string field is not valid UTF-8"),
                    offset,
                )?;
                Ok(Value::String(String::from_utf8_lossy(&data).into_owned()))
            }
        }
    }
}

/// 帧头视图。
struct FrameView {
    /// 帧起点（`size` 字段所在偏移），指针计算的基准。
    base: usize,
    /// 帧尾（不含）。
    end: usize,
    type_id: u64,
    ext_offset: u32,
}

impl FrameView {
    fn parse(buf: &[u8], offset: usize) -> Result<Self> {
        let size = read_u32(buf, offset, buf.len())? as usize;
        if size < 12 {
            return Err(BlinkError::framing(format!(
                "frame size {size} below minimum of 12"
            ))
            .at_byte(offset));
        }
        let end = offset
            .checked_add(4 + size)
            .filter(|end| *end <= buf.len())
            .ok_or_else(|| {
                BlinkError::framing(String::from("truncated Native Binary frame")).at_byte(offset)
            })?;
        let type_id = u64::from_le_bytes(
            buf[offset + 4..offset + 12].try_into().expect("8 bytes"),
        );
        let ext_offset = u32::from_le_bytes(
            buf[offset + 12..offset + 16].try_into().expect("4 bytes"),
        );
        Ok(Self {
            base: offset,
            end,
            type_id,
            ext_offset,
        })
    }
}

fn read_u32(buf: &[u8], offset: usize, end: usize) -> Result<u32> {
    let bytes = read_bytes_ref(buf, offset, 4, end)?;
    Ok(u32::from_le_bytes(bytes.try_into().expect("4 bytes")))
}

fn read_bytes(buf: &[u8], offset: usize, len: usize, end: usize) -> Result<Vec<u8>> {
    read_bytes_ref(buf, offset, len, end).map(<[u8]>::to_vec)
}

fn read_bytes_ref(buf: &[u8], offset: usize, len: usize, end: usize) -> Result<&[u8]> {
    let stop = offset
        .checked_add(len)
        .filter(|stop| *stop <= end && *stop <= buf.len())
        .ok_or_else(|| {
            BlinkError::framing(String::from("read beyond frame boundary")).at_byte(offset)
        })?;
    buf.get(offset..stop).ok_or_else(|| {
        BlinkError::framing(String::from("read beyond frame boundary")).at_byte(offset)
    })
}
