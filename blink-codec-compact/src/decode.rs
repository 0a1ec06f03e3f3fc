//! Compact Binary 解码路径。
//!
//! # 教案定位（Why）
//! - 解码按协议状态机推进：长度 → 类型标识 → 字段 → 扩展块，帧体必须
//!   被精确消费，任何边界偏差都是强帧错误。
//! - `strict` 标志递归传播进嵌套动态组与扩展块：严格模式下弱错误立即
//!   中止；宽容模式下弱错误被记录并按既定策略恢复（未知类型跳帧、
//!   非法 UTF-8 以替换字符续行、越界整数饱和、未映射枚举落哨兵）。
//!
//! # 契约说明（What）
//! - 解出的消息是完全自有的拷贝，调用结束后不再引用输入缓冲。
//! - 失败的解码不产生部分结果；游标只有整帧成功时才推进。

use alloc::format;
use alloc::string::{String, ToString};
use alloc::vec::Vec;

use blink_core::error::{BlinkError, Result, WeakKind};
use blink_core::{
    DecimalValue, FieldMap, GroupId, Message, Primitive, Registry, StaticGroupValue, Type, Value,
};

use crate::vlc;

/// 帧解码器：持有模式视图、严格标志与宽容模式下积累的弱错误。
///
/// ### 使用契约（What）
/// - 一个解码器可复用于同一缓冲上的多帧；[`Decoder::warnings`] 返回
///   宽容模式下已记录的弱错误，按发生顺序排列。
pub struct Decoder<'r> {
    registry: &'r Registry,
    strict: bool,
    warnings: Vec<BlinkError>,
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

    /// 处理一个弱错误：严格模式上抛，宽容模式记录。
    fn weak(&mut self, kind: WeakKind, message: String, offset: usize) -> Result<()> {
        let err = BlinkError::weak(kind, message).at_byte(offset);
        if self.strict {
            return Err(err);
        }
        self.warnings.push(err);
        Ok(())
    }

    /// 解码 `offset` 处的一帧。
    ///
    /// 返回 `(消息, 下一帧偏移)`；宽容模式下被跳过的未知帧返回
    /// `(None, 下一帧偏移)`。
    pub fn decode_one(&mut self, buf: &[u8], offset: usize) -> Result<(Option<Message>, usize)> {
        let length = vlc::decode_u64(buf, offset)?;
        let Some(body_len) = length.value else {
            return Err(
                BlinkError::framing(String::from("frame length cannot be NULL")).at_byte(offset),
            );
        };
        if length.overflowed {
            return Err(
                BlinkError::framing(String::from("frame length overflows")).at_byte(offset)
            );
        }
        let body_start = length.end;
        let end = body_start
            .checked_add(body_len as usize)
            .filter(|end| *end <= buf.len())
            .ok_or_else(|| {
                BlinkError::framing(String::from("truncated Compact Binary frame")).at_byte(offset)
            })?;
        let message = self.decode_frame_body(buf, body_start, end)?;
        Ok((message, end))
    }

    /// 解码帧体（类型标识 + 字段 + 扩展块），`end` 为帧尾。
    fn decode_frame_body(
        &mut self,
        buf: &[u8],
        body_start: usize,
        end: usize,
    ) -> Result<Option<Message>> {
        let bounded = &buf[..end];
        let type_id = vlc::decode_u64(bounded, body_start)?;
        let Some(type_id_value) = type_id.value else {
            return Err(BlinkError::framing(String::from("frame type id cannot be NULL"))
                .at_byte(body_start));
        };
        if type_id.overflowed {
            return Err(
                BlinkError::framing(String::from("frame type id overflows")).at_byte(body_start)
            );
        }
        let Some(group_id) = self.registry.find_group_by_id(type_id_value) else {
            self.weak(
                WeakKind::UnknownTypeId,
                format!("unknown type id {type_id_value}"),
                body_start,
            )?;
            return Ok(None);
        };
        let mut cursor = type_id.end;
        let mut message = Message::new(self.registry.group(group_id).name.clone());
        self.decode_group_fields(bounded, &mut cursor, group_id, &mut message.fields)?;
        if cursor < end {
            self.decode_extensions(bounded, &mut cursor, end, &mut message)?;
        }
        if cursor != end {
            return Err(BlinkError::framing(format!(
                "frame body not consumed exactly: cursor {cursor}, frame end {end}"
            ))
            .at_byte(cursor));
        }
        Ok(Some(message))
    }

    fn decode_group_fields(
        &mut self,
        buf: &[u8],
        cursor: &mut usize,
        group_id: GroupId,
        fields: &mut FieldMap,
    ) -> Result<()> {
        // 线性化字段在注册表中借用，与字段表写入互不冲突。
        let names: Vec<(String, Type, bool)> = self
            .registry
            .all_fields(group_id)
            .map(|field| (field.name.clone(), field.ty.clone(), field.optional))
            .collect();
        for (name, ty, optional) in names {
            let value = self
                .decode_value(buf, cursor, &ty, optional)
                .map_err(|err| {
                    if matches!(err.location(), blink_core::Location::Byte(_)) {
                        err
                    } else {
                        err.in_field(name.as_str())
                    }
                })?;
            if let Some(value) = value {
                fields.insert(name, value);
            }
        }
        Ok(())
    }

    fn decode_extensions(
        &mut self,
        buf: &[u8],
        cursor: &mut usize,
        end: usize,
        message: &mut Message,
    ) -> Result<()> {
        let count = vlc::decode_u64(buf, *cursor)?;
        let Some(count_value) = count.value else {
            return Err(BlinkError::framing(String::from("extension count cannot be NULL"))
                .at_byte(*cursor));
        };
        if count.overflowed {
            return Err(
                BlinkError::framing(String::from("extension count overflows")).at_byte(*cursor)
            );
        }
        *cursor = count.end;
        for _ in 0..count_value {
            if *cursor >= end {
                return Err(BlinkError::framing(String::from(
                    "extension block shorter than its declared count",
                ))
                .at_byte(*cursor));
            }
            let (element, next) = self.decode_one(buf, *cursor)?;
            *cursor = next;
            if let Some(element) = element {
                message.extensions.push(element);
            }
        }
        Ok(())
    }

    /// 解码单个值；`Ok(None)` 表示字段缺省（空值标记或宽容跳过）。
    fn decode_value(
        &mut self,
        buf: &[u8],
        cursor: &mut usize,
        ty: &Type,
        optional: bool,
    ) -> Result<Option<Value>> {
        match ty {
            Type::Primitive(primitive) => self.decode_primitive(buf, cursor, *primitive, optional),
            Type::String { max_size } => {
                let Some(data) = self.decode_len_prefixed(buf, cursor, *max_size, optional)? else {
                    return Ok(None);
                };
                match core::str::from_utf8(&data) {
                    Ok(text) => Ok(Some(Value::String(text.to_string()))),
                    Err(_) => {
                        self.weak(
                            WeakKind::InvalidUtf8,
                            String::from("string field is not valid UTF-8"),
                            *cursor,
                        )?;
                        Ok(Some(Value::String(
                            String::from_utf8_lossy(&data).into_owned(),
                        )))
                    }
                }
            }
            Type::Binary { max_size } => {
                let Some(data) = self.decode_len_prefixed(buf, cursor, *max_size, optional)? else {
                    return Ok(None);
                };
                Ok(Some(Value::Binary(data)))
            }
            Type::Fixed { size } => {
                if optional {
                    match self.decode_presence(buf, cursor)? {
                        false => return Ok(None),
                        true => {}
                    }
                }
                let size = *size as usize;
                let end = cursor
                    .checked_add(size)
                    .filter(|end| *end <= buf.len())
                    .ok_or_else(|| {
                        BlinkError::framing(String::from("truncated fixed field")).at_byte(*cursor)
                    })?;
                let data = buf[*cursor..end].to_vec();
                *cursor = end;
                Ok(Some(Value::Binary(data)))
            }
            Type::Enum(enum_id) => {
                let decoded = vlc::decode_i64(buf, *cursor)?;
                let offset = *cursor;
                *cursor = decoded.end;
                let Some(raw) = decoded.value else {
                    return self.null_value(optional, offset);
                };
                if decoded.overflowed || i32::try_from(raw).is_err() {
                    self.weak(
                        WeakKind::IntOutOfRange,
                        format!("enum value {raw} exceeds i32 range"),
                        offset,
                    )?;
                }
                let raw = raw.clamp(i32::MIN as i64, i32::MAX as i64) as i32;
                match self.registry.enum_def(*enum_id).symbol_for(raw) {
                    Some(symbol) => Ok(Some(Value::Enum(symbol.to_string()))),
                    None => {
                        self.weak(
                            WeakKind::UnmappedEnum,
                            format!(
                                "enum {} has no symbol for value {raw}",
                                self.registry.enum_def(*enum_id).name
                            ),
                            offset,
                        )?;
                        // 哨兵：以十进制文本保留原始数值。
                        Ok(Some(Value::Enum(raw.to_string())))
                    }
                }
            }
            Type::Sequence(element) => {
                let count = vlc::decode_u64(buf, *cursor)?;
                let offset = *cursor;
                *cursor = count.end;
                let Some(count_value) = count.value else {
                    return self.null_value(optional, offset);
                };
                if count.overflowed || count_value > u32::MAX as u64 {
                    return Err(BlinkError::framing(String::from(
                        "sequence count exceeds u32 range",
                    ))
                    .at_byte(offset));
                }
                let mut items = Vec::new();
                for _ in 0..count_value {
                    match self.decode_value(buf, cursor, element, false)? {
                        Some(item) => items.push(item),
                        // 宽容模式下被跳过的元素不占位。
                        None => {}
                    }
                }
                Ok(Some(Value::Sequence(items)))
            }
            Type::StaticGroup(group_id) => {
                if optional {
                    match self.decode_presence(buf, cursor)? {
                        false => return Ok(None),
                        true => {}
                    }
                }
                let mut group = StaticGroupValue::new();
                self.decode_group_fields(buf, cursor, *group_id, &mut group.fields)?;
                Ok(Some(Value::Group(group)))
            }
            Type::DynamicGroup(base) => {
                let offset = *cursor;
                let Some(message) = self.decode_nested(buf, cursor, optional)? else {
                    return Ok(None);
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
                            offset,
                        )?;
                    }
                }
                Ok(Some(Value::from(message)))
            }
            Type::Object => {
                let Some(message) = self.decode_nested(buf, cursor, optional)? else {
                    return Ok(None);
                };
                Ok(Some(Value::from(message)))
            }
        }
    }

    /// 嵌套动态组：可空长度，随后是完整子帧。
    fn decode_nested(
        &mut self,
        buf: &[u8],
        cursor: &mut usize,
        optional: bool,
    ) -> Result<Option<Message>> {
        if buf.get(*cursor).copied() == Some(vlc::NULL_BYTE) {
            let offset = *cursor;
            *cursor += 1;
            self.null_value(optional, offset)?;
            return Ok(None);
        }
        let (message, next) = self.decode_one(buf, *cursor)?;
        *cursor = next;
        Ok(message)
    }

    fn decode_presence(&mut self, buf: &[u8], cursor: &mut usize) -> Result<bool> {
        let byte = *buf.get(*cursor).ok_or_else(|| {
            BlinkError::framing(String::from("truncated presence byte")).at_byte(*cursor)
        })?;
        let offset = *cursor;
        *cursor += 1;
        match byte {
            0xC0 => Ok(false),
            0x01 => Ok(true),
            other => {
                self.weak(
                    WeakKind::InvalidPresence,
                    format!("invalid presence byte {other:#04x}"),
                    offset,
                )?;
                Ok(true)
            }
        }
    }

    fn decode_primitive(
        &mut self,
        buf: &[u8],
        cursor: &mut usize,
        primitive: Primitive,
        optional: bool,
    ) -> Result<Option<Value>> {
        match primitive {
            Primitive::Bool => {
                let decoded = vlc::decode_u64(buf, *cursor)?;
                let offset = *cursor;
                *cursor = decoded.end;
                let Some(raw) = decoded.value else {
                    return self.null_value(optional, offset);
                };
                if raw > 1 {
                    self.weak(
                        WeakKind::IntOutOfRange,
                        format!("bool field carries value {raw}"),
                        offset,
                    )?;
                }
                Ok(Some(Value::Bool(raw != 0)))
            }
            Primitive::F64 => {
                let decoded = vlc::decode_u64(buf, *cursor)?;
                let offset = *cursor;
                *cursor = decoded.end;
                let Some(bits) = decoded.value else {
                    return self.null_value(optional, offset);
                };
                if decoded.overflowed {
                    return Err(
                        BlinkError::framing(String::from("f64 payload overflows")).at_byte(offset)
                    );
                }
                Ok(Some(Value::F64(f64::from_bits(bits))))
            }
            Primitive::Decimal => {
                let exponent = vlc::decode_i64(buf, *cursor)?;
                let offset = *cursor;
                *cursor = exponent.end;
                let Some(mut exp) = exponent.value else {
                    return self.null_value(optional, offset);
                };
                if exponent.overflowed || i8::try_from(exp).is_err() {
                    self.weak(
                        WeakKind::IntOutOfRange,
                        format!("decimal exponent {exp} exceeds i8 range"),
                        offset,
                    )?;
                    exp = exp.clamp(i8::MIN as i64, i8::MAX as i64);
                }
                let mantissa = vlc::decode_i64(buf, *cursor)?;
                let mantissa_offset = *cursor;
                *cursor = mantissa.end;
                let Some(mantissa_value) = mantissa.value else {
                    return Err(BlinkError::value(String::from(
                        "decimal mantissa cannot be NULL",
                    ))
                    .at_byte(mantissa_offset));
                };
                if mantissa.overflowed {
                    return Err(BlinkError::value(String::from("decimal mantissa overflows"))
                        .at_byte(mantissa_offset));
                }
                Ok(Some(Value::Decimal(DecimalValue::new(
                    exp as i8,
                    mantissa_value,
                ))))
            }
            _ => self.decode_int(buf, cursor, primitive, optional),
        }
    }

    fn decode_int(
        &mut self,
        buf: &[u8],
        cursor: &mut usize,
        primitive: Primitive,
        optional: bool,
    ) -> Result<Option<Value>> {
        let bits = primitive
            .int_bits()
            .expect("integer family primitive has a bit width");
        let offset = *cursor;
        if primitive.is_unsigned() {
            let decoded = vlc::decode_u64(buf, offset)?;
            *cursor = decoded.end;
            let Some(mut raw) = decoded.value else {
                return self.null_value(optional, offset);
            };
            let max = if bits == 64 { u64::MAX } else { (1u64 << bits) - 1 };
            if decoded.overflowed || raw > max {
                self.weak(
                    WeakKind::IntOutOfRange,
                    format!("value {raw} exceeds {} range", primitive.name()),
                    offset,
                )?;
                raw = raw.min(max);
            }
            Ok(Some(Value::UInt(raw)))
        } else {
            let decoded = vlc::decode_i64(buf, offset)?;
            *cursor = decoded.end;
            let Some(mut raw) = decoded.value else {
                return self.null_value(optional, offset);
            };
            let (min, max) = if bits == 64 {
                (i64::MIN, i64::MAX)
            } else {
                (-(1i64 << (bits - 1)), (1i64 << (bits - 1)) - 1)
            };
            if decoded.overflowed || raw > max || raw < min {
                self.weak(
                    WeakKind::IntOutOfRange,
                    format!("value {raw} exceeds {} range", primitive.name()),
                    offset,
                )?;
                raw = raw.clamp(min, max);
            }
            Ok(Some(Value::Int(raw)))
        }
    }

    /// 长度前缀字节区；`Ok(None)` 表示空值标记。
    fn decode_len_prefixed(
        &mut self,
        buf: &[u8],
        cursor: &mut usize,
        max_size: Option<u32>,
        optional: bool,
    ) -> Result<Option<Vec<u8>>> {
        let length = vlc::decode_u64(buf, *cursor)?;
        let offset = *cursor;
        *cursor = length.end;
        let Some(len) = length.value else {
            self.null_value(optional, offset)?;
            return Ok(None);
        };
        if length.overflowed {
            return Err(
                BlinkError::framing(String::from("byte length overflows")).at_byte(offset)
            );
        }
        let end = cursor
            .checked_add(len as usize)
            .filter(|end| *end <= buf.len())
            .ok_or_else(|| {
                BlinkError::framing(String::from("truncated string/binary field")).at_byte(offset)
            })?;
        if let Some(max) = max_size {
            if len > max as u64 {
                self.weak(
                    WeakKind::OverMaxSize,
                    format!("value length {len} exceeds declared max {max}"),
                    offset,
                )?;
            }
        }
        let data = buf[*cursor..end].to_vec();
        *cursor = end;
        Ok(Some(data))
    }

    /// 空值标记统一处理：可空字段合法缺省，必填字段为强值错误。
    fn null_value(&mut self, optional: bool, offset: usize) -> Result<Option<Value>> {
        if optional {
            Ok(None)
        } else {
            Err(BlinkError::value(String::from("required field is NULL")).at_byte(offset))
        }
    }
}

/// 解码 `offset` 处的一帧。
///
/// 宽容模式下未知类型标识的帧被整帧跳过并返回 `(None, 下一帧偏移)`。
pub fn decode_one(
    buf: &[u8],
    offset: usize,
    registry: &Registry,
    strict: bool,
) -> Result<(Option<Message>, usize)> {
    Decoder::new(registry, strict).decode_one(buf, offset)
}

/// 顺序解码缓冲中的消息流。
pub fn decode_stream<'a>(buf: &'a [u8], registry: &'a Registry, strict: bool) -> MessageIter<'a> {
    MessageIter {
        decoder: Decoder::new(registry, strict),
        buf,
        offset: 0,
        failed: false,
    }
}

/// 消息流迭代器；跳帧（宽容模式）不产出条目。
pub struct MessageIter<'a> {
    decoder: Decoder<'a>,
    buf: &'a [u8],
    offset: usize,
    failed: bool,
}

impl Iterator for MessageIter<'_> {
    type Item = Result<Message>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if self.failed || self.offset >= self.buf.len() {
                return None;
            }
            match self.decoder.decode_one(self.buf, self.offset) {
                Ok((message, next)) => {
                    self.offset = next;
                    if let Some(message) = message {
                        return Some(Ok(message));
                    }
                }
                Err(err) => {
                    self.failed = true;
                    return Some(Err(err));
                }
            }
        }
    }
}
