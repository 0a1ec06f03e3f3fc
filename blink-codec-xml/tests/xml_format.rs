//! XML 映射的行为回归。
//!
//! # 教案式说明
//! - **Why**：锁定元素命名（前缀 + Blink 命名空间 URI）、扩展块的
//!   专用命名空间、字节串的两种表示与流的单根包裹。
//! - **How**：文本断言核对确定性的序列化产物，解码往返收尾。

use blink_codec_xml::{decode, decode_stream, encode, encode_stream, BLINK_NAMESPACE};
use blink_core::{Message, QName, Registry, StaticGroupValue, Value};

fn company_registry() -> Registry {
    Registry::from_schema_text(
        "namespace Demo\n\
         Address/1 -> string Street, string City, u32 ZipCode\n\
         Employee/2 -> string Name, u32 Age, Address HomeAddress\n\
         Manager/3 : Employee -> string Department, u32 TeamSize\n\
         Company/4 -> string CompanyName, Manager CEO\n",
    )
    .unwrap()
}

fn company_message() -> Message {
    let home = StaticGroupValue::new()
        .with("Street", Value::str("123 Main St"))
        .with("City", Value::str("San Francisco"))
        .with("ZipCode", Value::UInt(94102));
    let ceo = StaticGroupValue::new()
        .with("Name", Value::str("Alice"))
        .with("Age", Value::UInt(45))
        .with("HomeAddress", Value::Group(home))
        .with("Department", Value::str("Engineering"))
        .with("TeamSize", Value::UInt(50));
    Message::new(QName::new(Some("Demo"), "Company"))
        .with("CompanyName", Value::str("TechCorp"))
        .with("CEO", Value::Group(ceo))
}

/// 种子场景：前缀元素 + 命名空间声明，往返恒等。
#[test]
fn company_renders_with_namespace_prefix() {
    let registry = company_registry();
    let message = company_message();
    let encoded = encode(&message, &registry).unwrap();
    assert!(
        encoded.starts_with("<ns0:Company xmlns:ns0=\"Demo\">"),
        "{encoded}"
    );
    assert!(
        encoded.contains("<CompanyName>TechCorp</CompanyName>"),
        "{encoded}"
    );
    assert!(encoded.contains("<CEO>"), "{encoded}");
    assert!(encoded.ends_with("</ns0:Company>"), "{encoded}");
    assert_eq!(decode(&encoded, &registry).unwrap(), message);
}

/// 扩展块使用 Blink 专用命名空间。
#[test]
fn extension_namespace_matches_contract() {
    let registry = Registry::from_schema_text(
        "namespace Demo\n\
         Ext/1 -> string Info\n\
         Envelope/2 -> string Body\n",
    )
    .unwrap();
    let mut message =
        Message::new(QName::new(Some("Demo"), "Envelope")).with("Body", Value::str("Hello"));
    message
        .extensions
        .push(Message::new(QName::new(Some("Demo"), "Ext")).with("Info", Value::str("x")));
    let encoded = encode(&message, &registry).unwrap();
    assert!(encoded.contains(BLINK_NAMESPACE), "{encoded}");
    assert!(encoded.contains("<blink:extension"), "{encoded}");
    assert_eq!(decode(&encoded, &registry).unwrap(), message);
}

/// 流包裹在单一 root 元素中。
#[test]
fn stream_has_root_wrapper() {
    let registry =
        Registry::from_schema_text("namespace Demo\nEnvelope/1 -> string Body\n").unwrap();
    let messages = vec![
        Message::new(QName::new(Some("Demo"), "Envelope")).with("Body", Value::str("a")),
        Message::new(QName::new(Some("Demo"), "Envelope")).with("Body", Value::str("b")),
    ];
    let encoded = encode_stream(&messages, &registry).unwrap();
    assert!(encoded.trim_start().starts_with("<root"), "{encoded}");
    assert_eq!(decode_stream(&encoded, &registry).unwrap(), messages);
}

/// UTF-8 可解码的字节串写作元素文本。
#[test]
fn utf8_binary_is_text() {
    let registry =
        Registry::from_schema_text("namespace Demo\nPayload/1 -> binary Data\n").unwrap();
    let message = Message::new(QName::new(Some("Demo"), "Payload"))
        .with("Data", Value::Binary(vec![0xc3, 0xa4]));
    let encoded = encode(&message, &registry).unwrap();
    assert!(encoded.contains("<Data>\u{e4}</Data>"), "{encoded}");
    assert_eq!(decode(&encoded, &registry).unwrap(), message);
}

/// 非 UTF-8 字节串写作 `binary="yes"` 加连写十六进制。
#[test]
fn non_utf8_binary_uses_hex_attribute() {
    let registry =
        Registry::from_schema_text("namespace Demo\nPayload/1 -> binary Data\n").unwrap();
    let message = Message::new(QName::new(Some("Demo"), "Payload"))
        .with("Data", Value::Binary(vec![0xde, 0xad, 0xbe, 0xef]));
    let encoded = encode(&message, &registry).unwrap();
    assert!(
        encoded.contains("<Data binary=\"yes\">deadbeef</Data>"),
        "{encoded}"
    );
    assert_eq!(decode(&encoded, &registry).unwrap(), message);
}

/// 序列以重复的 item 子元素表达；嵌套动态组内嵌消息元素。
#[test]
fn sequences_and_nested_messages() {
    let registry = Registry::from_schema_text(
        "namespace Demo\n\
         Inner/1 -> u32 Id\n\
         Msg/2 -> u32 [] Values, Inner* Child\n",
    )
    .unwrap();
    let child = Message::new(QName::new(Some("Demo"), "Inner")).with("Id", Value::UInt(7));
    let message = Message::new(QName::new(Some("Demo"), "Msg"))
        .with(
            "Values",
            Value::Sequence(vec![Value::UInt(1), Value::UInt(2)]),
        )
        .with("Child", Value::from(child));
    let encoded = encode(&message, &registry).unwrap();
    assert!(
        encoded.contains("<Values><item>1</item><item>2</item></Values>"),
        "{encoded}"
    );
    assert!(
        encoded.contains("<Child><ns0:Inner xmlns:ns0=\"Demo\"><Id>7</Id></ns0:Inner></Child>"),
        "{encoded}"
    );
    assert_eq!(decode(&encoded, &registry).unwrap(), message);
}

/// 文本内容的实体转义往返。
#[test]
fn entity_escaping_round_trip() {
    let registry = Registry::from_schema_text("namespace Demo\nNote/1 -> string Text\n").unwrap();
    let message = Message::new(QName::new(Some("Demo"), "Note"))
        .with("Text", Value::str("a<b & c>d \"quoted\""));
    let encoded = encode(&message, &registry).unwrap();
    assert_eq!(decode(&encoded, &registry).unwrap(), message);
}
