//! 模式交换解码循环与消息→变更的转换。
//!
//! # 教案定位（Why）
//! - 解码流程先窥视帧的类型标识：落在保留区间的帧按自描述模式解码、
//!   转换为注册表变更并立即生效，随后才继续解码后续帧——于是同一
//!   字节流里"先声明类型、再发该类型的消息"是合法顺序。
//! - 交换帧不会作为应用消息浮出：调用方只看到注册表的状态变化。
//!
//! # 契约说明（What）
//! - 变更生效严格先于后续任何应用帧的解码；
//! - 违反注册表不变量的变更整体失败且不留痕迹（由
//!   `Registry::apply_update` 保证），错误以强错误浮出。

use alloc::format;
use alloc::string::String;
use alloc::vec::Vec;

use blink_codec_compact as compact;
use blink_core::error::{BlinkError, Result};
use blink_core::{
    EnumSymbol, FieldDecl, Message, Primitive, QName, Registry, SchemaUpdate, StaticGroupValue,
    TypeExpr, Value,
};

use crate::selfschema::is_reserved;

/// 解码一个字节流，静默应用保留标识帧。
///
/// 返回应用消息序列；模式交换帧只变更 `registry`，不出现在结果中。
pub fn decode_stream_with_exchange(
    buf: &[u8],
    registry: &mut Registry,
    strict: bool,
) -> Result<Vec<Message>> {
    let mut messages = Vec::new();
    let mut iter = ExchangeIter::new(buf, registry, strict);
    for item in &mut iter {
        messages.push(item?);
    }
    Ok(messages)
}

/// 带模式交换的消息流迭代器。
///
/// 迭代期间独占注册表：交换帧在产出下一条应用消息之前生效。
pub struct ExchangeIter<'a> {
    buf: &'a [u8],
    registry: &'a mut Registry,
    strict: bool,
    offset: usize,
    failed: bool,
}

impl<'a> ExchangeIter<'a> {
    /// 构造迭代器。
    pub fn new(buf: &'a [u8], registry: &'a mut Registry, strict: bool) -> Self {
        Self {
            buf,
            registry,
            strict,
            offset: 0,
            failed: false,
        }
    }

    fn step(&mut self) -> Result<Option<Option<Message>>> {
        if self.offset >= self.buf.len() {
            return Ok(None);
        }
        let (frame, next) = compact::decode_frame(self.buf, self.offset)?;
        if is_reserved(frame.type_id) {
            let (decoded, _) =
                compact::decode_one(self.buf, self.offset, self.registry, self.strict)?;
            self.offset = next;
            if let Some(decoded) = decoded {
                let update = message_to_update(&decoded)?;
                self.registry.apply_update(update)?;
            }
            return Ok(Some(None));
        }
        let (decoded, consumed) =
            compact::decode_one(self.buf, self.offset, self.registry, self.strict)?;
        self.offset = consumed;
        Ok(Some(decoded))
    }
}

impl Iterator for ExchangeIter<'_> {
    type Item = Result<Message>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if self.failed {
                return None;
            }
            match self.step() {
                Ok(None) => return None,
                Ok(Some(None)) => continue,
                Ok(Some(Some(message))) => return Some(Ok(message)),
                Err(err) => {
                    self.failed = true;
                    return Some(Err(err));
                }
            }
        }
    }
}

/// 编码一条模式交换消息（类型标识必须落在保留区间）。
pub fn encode_transport(message: &Message, registry: &Registry) -> Result<Vec<u8>> {
    let group = registry.get_group_by_name(&message.name)?;
    match group.type_id {
        Some(type_id) if is_reserved(type_id) => compact::encode(message, registry),
        Some(type_id) => Err(BlinkError::schema_update(format!(
            "type id {type_id} is not in the schema exchange range"
        ))),
        None => Err(BlinkError::schema_update(format!(
            "group {} has no type id",
            message.name
        ))),
    }
}

/// 把解码后的交换消息转换为注册表变更。
pub fn message_to_update(message: &Message) -> Result<SchemaUpdate> {
    match message.name.name.as_str() {
        "GroupDecl" => Ok(SchemaUpdate::DeclareGroup {
            name: nsname_field(message.get("Name"), "GroupDecl.Name")?,
            type_id: u64_field(message.get("Id"), "GroupDecl.Id")?,
        }),
        "GroupDef" => {
            let type_id = match message.get("Id") {
                None => None,
                Some(value) => Some(u64_value(value, "GroupDef.Id")?),
            };
            let super_name = match message.get("Super") {
                None => None,
                Some(value) => Some(nsname_value(value, "GroupDef.Super")?),
            };
            let mut fields = Vec::new();
            if let Some(Value::Sequence(items)) = message.get("Fields") {
                for item in items {
                    fields.push(field_decl(item)?);
                }
            }
            Ok(SchemaUpdate::DefineGroup {
                name: nsname_field(message.get("Name"), "GroupDef.Name")?,
                type_id,
                super_name,
                fields,
            })
        }
        "Define" => Ok(SchemaUpdate::DefineAlias {
            name: nsname_field(message.get("Name"), "Define.Name")?,
            ty: type_expr(message.get("Type"), "Define.Type")?,
        }),
        "SchemaAnnotation" => {
            let component = match message.get("Component") {
                None => None,
                Some(value) => Some(nsname_value(value, "SchemaAnnotation.Component")?),
            };
            let member = match message.get("Member") {
                None => None,
                Some(Value::String(text)) => Some(text.clone()),
                Some(other) => {
                    return Err(malformed("SchemaAnnotation.Member", other));
                }
            };
            let mut annotations = Vec::new();
            if let Some(Value::Sequence(items)) = message.get("Annotations") {
                for item in items {
                    let Value::Group(StaticGroupValue { fields }) = item else {
                        return Err(malformed("SchemaAnnotation.Annotations", item));
                    };
                    let name = nsname_field(fields.get("Name"), "Annotation.Name")?;
                    let Some(Value::String(value)) = fields.get("Value") else {
                        return Err(BlinkError::schema_update(String::from(
                            "Annotation.Value must be a string",
                        )));
                    };
                    annotations.push((name, value.clone()));
                }
            }
            Ok(SchemaUpdate::Annotate {
                component,
                member,
                annotations,
            })
        }
        other => Err(BlinkError::schema_update(format!(
            "{other} is not a schema transport message"
        ))),
    }
}

fn field_decl(item: &Value) -> Result<FieldDecl> {
    let Value::Group(StaticGroupValue { fields }) = item else {
        return Err(malformed("GroupDef.Fields", item));
    };
    let Some(Value::String(name)) = fields.get("Name") else {
        return Err(BlinkError::schema_update(String::from(
            "FieldDef.Name must be a string",
        )));
    };
    let optional = matches!(fields.get("Optional"), Some(Value::Bool(true)));
    Ok(FieldDecl {
        name: name.clone(),
        ty: type_expr(fields.get("Type"), "FieldDef.Type")?,
        optional,
    })
}

/// 类型描述符消息到类型表达式。
fn type_expr(value: Option<&Value>, context: &str) -> Result<TypeExpr> {
    let Some(Value::Message(descriptor)) = value else {
        return Err(BlinkError::schema_update(format!(
            "{context} must be a type descriptor message"
        )));
    };
    Ok(match descriptor.name.name.as_str() {
        "U8" => TypeExpr::Primitive(Primitive::U8),
        "U16" => TypeExpr::Primitive(Primitive::U16),
        "U32" => TypeExpr::Primitive(Primitive::U32),
        "U64" => TypeExpr::Primitive(Primitive::U64),
        "I8" => TypeExpr::Primitive(Primitive::I8),
        "I16" => TypeExpr::Primitive(Primitive::I16),
        "I32" => TypeExpr::Primitive(Primitive::I32),
        "I64" => TypeExpr::Primitive(Primitive::I64),
        "F64" => TypeExpr::Primitive(Primitive::F64),
        "Bool" => TypeExpr::Primitive(Primitive::Bool),
        // FixedDec/Number 是文档口径中的十进制描述符，统一落到 decimal。
        "Decimal" | "FixedDec" | "Number" => TypeExpr::Primitive(Primitive::Decimal),
        "MilliTime" => TypeExpr::Primitive(Primitive::MilliTime),
        "NanoTime" => TypeExpr::Primitive(Primitive::NanoTime),
        "Date" => TypeExpr::Primitive(Primitive::Date),
        "TimeOfDayMilli" => TypeExpr::Primitive(Primitive::TimeOfDayMilli),
        "TimeOfDayNano" => TypeExpr::Primitive(Primitive::TimeOfDayNano),
        "Object" => TypeExpr::Object,
        "String" => TypeExpr::String {
            max_size: optional_u32(descriptor.get("MaxSize"), "String.MaxSize")?,
        },
        "Binary" => TypeExpr::Binary {
            max_size: optional_u32(descriptor.get("MaxSize"), "Binary.MaxSize")?,
        },
        "Fixed" => TypeExpr::Fixed {
            size: optional_u32(descriptor.get("Size"), "Fixed.Size")?.unwrap_or(0),
        },
        "Ref" => TypeExpr::Named {
            name: nsname_field(descriptor.get("Type"), "Ref.Type")?,
            dynamic: false,
        },
        "DynRef" => TypeExpr::Named {
            name: nsname_field(descriptor.get("Type"), "DynRef.Type")?,
            dynamic: true,
        },
        "Sequence" => TypeExpr::Sequence(alloc::boxed::Box::new(type_expr(
            descriptor.get("Type"),
            "Sequence.Type",
        )?)),
        "Enum" => {
            let mut symbols = Vec::new();
            if let Some(Value::Sequence(items)) = descriptor.get("Symbols") {
                for item in items {
                    let Value::Group(StaticGroupValue { fields }) = item else {
                        return Err(malformed("Enum.Symbols", item));
                    };
                    let Some(Value::String(name)) = fields.get("Name") else {
                        return Err(BlinkError::schema_update(String::from(
                            "Symbol.Name must be a string",
                        )));
                    };
                    let value = fields
                        .get("Value")
                        .and_then(Value::as_i64)
                        .ok_or_else(|| {
                            BlinkError::schema_update(String::from(
                                "Symbol.Value must be an integer",
                            ))
                        })?;
                    let value = i32::try_from(value).map_err(|_| {
                        BlinkError::schema_update(String::from(
                            "Symbol.Value exceeds i32 range",
                        ))
                    })?;
                    symbols.push(EnumSymbol {
                        name: name.clone(),
                        value,
                        annotations: Vec::new(),
                    });
                }
            }
            TypeExpr::InlineEnum(symbols)
        }
        other => {
            return Err(BlinkError::schema_update(format!(
                "unknown type descriptor {other}"
            )))
        }
    })
}

fn nsname_field(value: Option<&Value>, context: &str) -> Result<QName> {
    let Some(value) = value else {
        return Err(BlinkError::schema_update(format!("{context} is missing")));
    };
    nsname_value(value, context)
}

fn nsname_value(value: &Value, context: &str) -> Result<QName> {
    let Value::Group(StaticGroupValue { fields }) = value else {
        return Err(malformed(context, value));
    };
    let Some(Value::String(name)) = fields.get("Name") else {
        return Err(BlinkError::schema_update(format!(
            "{context}.Name must be a string"
        )));
    };
    let namespace = match fields.get("Ns") {
        None => None,
        Some(Value::String(ns)) => Some(ns.clone()),
        Some(other) => return Err(malformed(context, other)),
    };
    Ok(QName {
        namespace,
        name: name.clone(),
    })
}

fn u64_field(value: Option<&Value>, context: &str) -> Result<u64> {
    let Some(value) = value else {
        return Err(BlinkError::schema_update(format!("{context} is missing")));
    };
    u64_value(value, context)
}

fn u64_value(value: &Value, context: &str) -> Result<u64> {
    value
        .as_u64()
        .ok_or_else(|| malformed(context, value))
}

fn optional_u32(value: Option<&Value>, context: &str) -> Result<Option<u32>> {
    match value {
        None => Ok(None),
        Some(value) => {
            let number = value.as_u64().ok_or_else(|| malformed(context, value))?;
            u32::try_from(number)
                .map(Some)
                .map_err(|_| BlinkError::schema_update(format!("{context} exceeds u32 range")))
        }
    }
}

fn malformed(context: &str, value: &Value) -> BlinkError {
    BlinkError::schema_update(format!("malformed {context}: {value:?}"))
}
