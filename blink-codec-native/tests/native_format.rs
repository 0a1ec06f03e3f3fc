//! Native Binary 格式的行为回归。
//!
//! # 教案式说明
//! - **Why**：Native 的价值在于逐字节可预测的布局，这里既锁定帧头的
//!   精确字节，也锁定指针校验与内联/指针两种字符串表示的等价性。
//! - **How**：种子场景核对帧头三段（size/typeId/extensionOffset）的
//!   字面值与变长区内容顺序；其余用往返与负例覆盖。

use blink_codec_native::{decode_one, encode};
use blink_core::{
    DecimalValue, ErrorKind, Message, QName, Registry, StaticGroupValue, Value,
};

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

/// 种子场景：帧头逐字节匹配（size 112、typeId 4、无扩展），
/// 变长区按字段顺序存放五个字符串，往返恒等。
#[test]
fn company_frame_layout() {
    let registry = company_registry();
    let message = company_message();
    let encoded = encode(&message, &registry).unwrap();

    assert_eq!(&encoded[0..4], &[0x70, 0x00, 0x00, 0x00]);
    assert_eq!(&encoded[4..12], &4u64.to_le_bytes());
    assert_eq!(&encoded[12..16], &[0x00, 0x00, 0x00, 0x00]);
    assert_eq!(encoded.len(), 116);

    // 定长区 32 字节后是变长区，字符串按声明顺序带 u32 长度前缀排布。
    let mut cursor = 48usize;
    for expected in [
        "TechCorp",
        "Alice",
        "123 Main St",
        "San Francisco",
        "Engineering",
    ] {
        let len =
            u32::from_le_bytes(encoded[cursor..cursor + 4].try_into().unwrap()) as usize;
        assert_eq!(len, expected.len());
        assert_eq!(&encoded[cursor + 4..cursor + 4 + len], expected.as_bytes());
        cursor += 4 + len;
    }
    assert_eq!(cursor, encoded.len());

    let (decoded, consumed) = decode_one(&encoded, 0, &registry, true).unwrap();
    assert_eq!(consumed, encoded.len());
    assert_eq!(decoded, Some(message));
}

/// 首个指针槽指向定长区末尾（指针是距帧起点的绝对偏移）。
#[test]
fn pointers_are_absolute_from_frame_start() {
    let registry = company_registry();
    let encoded = encode(&company_message(), &registry).unwrap();
    let first_pointer = u32::from_le_bytes(encoded[16..20].try_into().unwrap());
    assert_eq!(first_pointer, 48);
}

/// 内联与指针两种字符串表示承载同一值都能往返。
#[test]
fn inline_and_pointer_strings_round_trip() {
    let registry = Registry::from_schema_text(
        "namespace Demo\n\
         Pair/1 -> string(255) Short, string Long\n",
    )
    .unwrap();
    let message = Message::new(QName::new(Some("Demo"), "Pair"))
        .with("Short", Value::str("hello"))
        .with("Long", Value::str("hello"));
    let encoded = encode(&message, &registry).unwrap();
    // 内联槽：1 字节长度 + 255 字节容量；指针槽固定 4 字节。
    assert_eq!(encoded[16], 5);
    let (decoded, _) = decode_one(&encoded, 0, &registry, true).unwrap();
    assert_eq!(decoded, Some(message));
}

/// 可空字段：内联槽带存在标志字节，指针槽以 0 表示缺省。
#[test]
fn optional_fields_presence_and_null_pointer() {
    let registry = Registry::from_schema_text(
        "namespace Demo\n\
         Opt/1 -> u32 A?, string B?\n",
    )
    .unwrap();
    let absent = Message::new(QName::new(Some("Demo"), "Opt"));
    let encoded = encode(&absent, &registry).unwrap();
    // 帧头 16 + 存在标志 1 + u32 槽 4 + 指针槽 4 = 25 字节。
    assert_eq!(encoded.len(), 25);
    assert_eq!(encoded[16], 0xC0);
    assert_eq!(&encoded[21..25], &[0, 0, 0, 0]);
    let (decoded, _) = decode_one(&encoded, 0, &registry, true).unwrap();
    assert_eq!(decoded, Some(absent));

    let present = Message::new(QName::new(Some("Demo"), "Opt"))
        .with("A", Value::UInt(7))
        .with("B", Value::str("x"));
    let encoded = encode(&present, &registry).unwrap();
    assert_eq!(encoded[16], 0x01);
    let (decoded, _) = decode_one(&encoded, 0, &registry, true).unwrap();
    assert_eq!(decoded, Some(present));
}

/// 序列、decimal 与嵌套动态组的组合往返。
#[test]
fn sequences_and_nested_frames_round_trip() {
    let registry = Registry::from_schema_text(
        "namespace Demo\n\
         Leg/1 -> string Venue, decimal Price\n\
         Order/2 -> u64 Id, Leg* Best, string [] Tags, u32 [] Sizes\n",
    )
    .unwrap();
    let leg = Message::new(QName::new(Some("Demo"), "Leg"))
        .with("Venue", Value::str("XNAS"))
        .with("Price", Value::Decimal(DecimalValue::new(-2, 10150)));
    let order = Message::new(QName::new(Some("Demo"), "Order"))
        .with("Id", Value::UInt(42))
        .with("Best", Value::from(leg))
        .with(
            "Tags",
            Value::Sequence(vec![Value::str("a"), Value::str("bb")]),
        )
        .with(
            "Sizes",
            Value::Sequence(vec![Value::UInt(1), Value::UInt(2), Value::UInt(3)]),
        );
    let encoded = encode(&order, &registry).unwrap();
    let (decoded, consumed) = decode_one(&encoded, 0, &registry, true).unwrap();
    assert_eq!(consumed, encoded.len());
    assert_eq!(decoded, Some(order));
}

/// 扩展块经帧头偏移寻址并以帧尾收束。
#[test]
fn extension_block_round_trip() {
    let registry = Registry::from_schema_text(
        "namespace Demo\n\
         Msg/1 -> u32 A\n\
         Ext/2 -> string Info\n",
    )
    .unwrap();
    let mut message = Message::new(QName::new(Some("Demo"), "Msg")).with("A", Value::UInt(5));
    message
        .extensions
        .push(Message::new(QName::new(Some("Demo"), "Ext")).with("Info", Value::str("x")));
    message
        .extensions
        .push(Message::new(QName::new(Some("Demo"), "Ext")).with("Info", Value::str("y")));
    let encoded = encode(&message, &registry).unwrap();
    let ext_offset = u32::from_le_bytes(encoded[12..16].try_into().unwrap());
    assert!(ext_offset >= 20);
    let (decoded, _) = decode_one(&encoded, 0, &registry, true).unwrap();
    assert_eq!(decoded, Some(message));
}

/// 指针越界是强帧错误。
#[test]
fn corrupt_pointer_is_framing_error() {
    let registry = Registry::from_schema_text("namespace Demo\nMsg/1 -> string S\n").unwrap();
    let message = Message::new(QName::new(Some("Demo"), "Msg")).with("S", Value::str("hi"));
    let mut encoded = encode(&message, &registry).unwrap();
    // 指针槽改写为帧外偏移。
    encoded[16..20].copy_from_slice(&0xFFFF_u32.to_le_bytes());
    let err = decode_one(&encoded, 0, &registry, true).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Framing);
}

/// size 与缓冲不符是强帧错误。
#[test]
fn truncated_frame_is_framing_error() {
    let registry = Registry::from_schema_text("namespace Demo\nMsg/1 -> u32 A\n").unwrap();
    let message = Message::new(QName::new(Some("Demo"), "Msg")).with("A", Value::UInt(1));
    let encoded = encode(&message, &registry).unwrap();
    let err = decode_one(&encoded[..encoded.len() - 1], 0, &registry, true).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Framing);
}
