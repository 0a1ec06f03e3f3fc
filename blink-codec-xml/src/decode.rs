//! XML 映射解析。
//!
//! # 实现策略（How）
//! - 先经 [`crate::reader`] 得到元素树，再按模式声明逐字段求值；
//!   命名空间前缀在元素作用域内解析（`xmlns:*` 属性逐层继承）。
//! - 未声明的子元素被静默忽略，与其余文本格式的向前兼容约定一致。

use alloc::borrow::ToOwned;
use alloc::format;
use alloc::string::{String, ToString};
use alloc::vec::Vec;

use blink_core::error::{BlinkError, Result};
use blink_core::{
    timefmt, DecimalValue, GroupId, Message, Primitive, QName, Registry, StaticGroupValue, Type,
    Value,
};

use crate::reader::{parse_document, XmlElement};
use crate::writer::BLINK_NAMESPACE;

/// 解析一条 XML 消息。
pub fn decode(text: &str, registry: &Registry) -> Result<Message> {
    let root = parse_document(text)?;
    message_from_element(&root, &NamespaceScope::default(), registry)
}

/// 解析 `<root>` 包裹的消息流。
pub fn decode_stream(text: &str, registry: &Registry) -> Result<Vec<Message>> {
    let root = parse_document(text)?;
    let scope = NamespaceScope::default().extended(&root);
    let mut messages = Vec::with_capacity(root.children.len());
    for child in &root.children {
        messages.push(message_from_element(child, &scope, registry)?);
    }
    Ok(messages)
}

/// 前缀到 URI 的作用域映射。
#[derive(Debug, Clone, Default)]
struct NamespaceScope {
    bindings: Vec<(String, String)>,
}

impl NamespaceScope {
    fn extended(&self, element: &XmlElement) -> Self {
        let mut scope = self.clone();
        for (name, value) in &element.attributes {
            if let Some(prefix) = name.strip_prefix("xmlns:") {
                scope.bindings.push((prefix.to_owned(), value.clone()));
            }
        }
        scope
    }

    fn resolve(&self, prefix: &str) -> Option<&str> {
        self.bindings
            .iter()
            .rev()
            .find(|(bound, _)| bound == prefix)
            .map(|(_, uri)| uri.as_str())
    }
}

fn message_from_element(
    element: &XmlElement,
    outer: &NamespaceScope,
    registry: &Registry,
) -> Result<Message> {
    let scope = outer.extended(element);
    let (prefix, local) = element.split_name();
    let namespace = match prefix {
        None => None,
        Some(prefix) => Some(
            scope
                .resolve(prefix)
                .ok_or_else(|| BlinkError::parse(format!("undeclared XML prefix {prefix}")))?
                .to_owned(),
        ),
    };
    let qname = QName {
        namespace,
        name: local.to_owned(),
    };
    let group_id = registry
        .find_group_by_name(&qname)
        .ok_or_else(|| BlinkError::resolve(format!("unknown group {qname}")))?;
    let mut message = Message::new(registry.group(group_id).name.clone());

    for child in &element.children {
        if is_extension_element(child, &scope) {
            let inner = scope.extended(child);
            for extension in &child.children {
                message
                    .extensions
                    .push(message_from_element(extension, &inner, registry)?);
            }
            continue;
        }
        fill_field(child, group_id, &scope, registry, &mut message.fields)?;
    }
    Ok(message)
}

fn is_extension_element(element: &XmlElement, outer: &NamespaceScope) -> bool {
    let scope = outer.extended(element);
    let (prefix, local) = element.split_name();
    local == "extension"
        && prefix.is_some_and(|prefix| scope.resolve(prefix) == Some(BLINK_NAMESPACE))
}

fn fill_field(
    child: &XmlElement,
    group_id: GroupId,
    scope: &NamespaceScope,
    registry: &Registry,
    fields: &mut blink_core::FieldMap,
) -> Result<()> {
    let (_, local) = child.split_name();
    let Some(field) = registry
        .all_fields(group_id)
        .find(|field| field.name == local)
    else {
        // 未声明字段：忽略。
        return Ok(());
    };
    let ty = field.ty.clone();
    let value = value_from_element(child, &ty, scope, registry)?;
    fields.insert(local.to_owned(), value);
    Ok(())
}

fn value_from_element(
    element: &XmlElement,
    ty: &Type,
    scope: &NamespaceScope,
    registry: &Registry,
) -> Result<Value> {
    match ty {
        Type::Primitive(primitive) => primitive_from_text(element.text.trim(), *primitive),
        Type::String { .. } => Ok(Value::String(element.text.clone())),
        Type::Binary { .. } => binary_from_element(element),
        Type::Fixed { size } => {
            let value = binary_from_element(element)?;
            let Value::Binary(data) = &value else {
                unreachable!("binary_from_element yields binary values");
            };
            if data.len() != *size as usize {
                return Err(BlinkError::value(format!(
                    "fixed field requires exactly {size} bytes, got {}",
                    data.len()
                )));
            }
            Ok(value)
        }
        Type::Enum(_) => Ok(Value::Enum(element.text.trim().to_string())),
        Type::Sequence(item_type) => {
            let mut items = Vec::new();
            for child in &element.children {
                let (_, local) = child.split_name();
                if local != "item" {
                    continue;
                }
                items.push(value_from_element(child, item_type, scope, registry)?);
            }
            Ok(Value::Sequence(items))
        }
        Type::StaticGroup(group_id) => {
            let mut group = StaticGroupValue::new();
            for child in &element.children {
                fill_field(child, *group_id, scope, registry, &mut group.fields)?;
            }
            Ok(Value::Group(group))
        }
        Type::DynamicGroup(_) | Type::Object => {
            let nested = element.children.first().ok_or_else(|| {
                BlinkError::parse(String::from(
                    "dynamic group element must contain a message element",
                ))
            })?;
            Ok(Value::from(message_from_element(nested, scope, registry)?))
        }
    }
}

fn binary_from_element(element: &XmlElement) -> Result<Value> {
    if element.attribute("binary") == Some("yes") {
        let text = element.text.trim();
        if text.len() % 2 != 0 {
            return Err(BlinkError::value(format!("odd-length hex literal {text:?}")));
        }
        let mut data = Vec::with_capacity(text.len() / 2);
        let bytes = text.as_bytes();
        for pair in bytes.chunks(2) {
            let pair = core::str::from_utf8(pair)
                .map_err(|_| BlinkError::value(String::from("invalid hex literal")))?;
            data.push(
                u8::from_str_radix(pair, 16)
                    .map_err(|_| BlinkError::value(format!("invalid hex byte {pair:?}")))?,
            );
        }
        return Ok(Value::Binary(data));
    }
    Ok(Value::Binary(element.text.as_bytes().to_vec()))
}

fn primitive_from_text(text: &str, primitive: Primitive) -> Result<Value> {
    match primitive {
        Primitive::Bool => match text {
            "true" => Ok(Value::Bool(true)),
            "false" => Ok(Value::Bool(false)),
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
