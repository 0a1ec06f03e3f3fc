//! JSON 映射的行为回归。
//!
//! # 教案式说明
//! - **Why**：锁定 `$type`/`$extension` 信封、1e15 数字阈值、decimal
//!   双形态与字节串的两种表示。
//! - **How**：对编码产物先经 `serde_json` 反序列化再做结构断言，
//!   避免脆弱的字符串比对。

use blink_codec_json::{decode, decode_stream, encode, encode_stream};
use blink_core::{
    DecimalValue, Message, QName, Registry, StaticGroupValue, Value,
};
use serde_json::Value as JsonValue;

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

/// 种子场景：根对象与 CEO 子对象都携带 `$type`，往返恒等。
#[test]
fn company_carries_type_discriminators() {
    let registry = company_registry();
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
    let message = Message::new(QName::new(Some("Demo"), "Company"))
        .with("CompanyName", Value::str("TechCorp"))
        .with("CEO", Value::Group(ceo));
    let encoded = encode(&message, &registry).unwrap();
    let parsed: JsonValue = serde_json::from_str(&encoded).unwrap();
    assert_eq!(parsed["$type"], "Demo:Company");
    assert_eq!(parsed["CEO"]["$type"], "Demo:Manager");
    assert_eq!(parsed["CEO"]["HomeAddress"]["ZipCode"], 94102);
    assert_eq!(decode(&encoded, &registry).unwrap(), message);
}

/// 小尾数 decimal 渲染为 JSON 数字；大尾数改用对象形态。
#[test]
fn decimal_number_and_object_forms() {
    let registry =
        Registry::from_schema_text("namespace Demo\nEvent/1 -> decimal Price\n").unwrap();
    let small = Message::new(QName::new(Some("Demo"), "Event"))
        .with("Price", Value::Decimal(DecimalValue::new(-2, 10001)));
    let encoded = encode(&small, &registry).unwrap();
    let parsed: JsonValue = serde_json::from_str(&encoded).unwrap();
    assert!(parsed["Price"].is_number(), "{encoded}");
    assert_eq!(decode(&encoded, &registry).unwrap(), small);

    let large = Message::new(QName::new(Some("Demo"), "Event")).with(
        "Price",
        Value::Decimal(DecimalValue::new(-2, 2_000_000_000_000_000)),
    );
    let encoded = encode(&large, &registry).unwrap();
    let parsed: JsonValue = serde_json::from_str(&encoded).unwrap();
    assert_eq!(parsed["Price"]["mantissa"], 2_000_000_000_000_000i64);
    assert_eq!(parsed["Price"]["exponent"], -2);
    assert_eq!(decode(&encoded, &registry).unwrap(), large);
}

/// 达到 1e15 的整数改用字符串表示。
#[test]
fn big_integers_quoted() {
    let registry = Registry::from_schema_text("namespace Demo\nBig/1 -> u64 N, i64 M\n").unwrap();
    let message = Message::new(QName::new(Some("Demo"), "Big"))
        .with("N", Value::UInt(2_000_000_000_000_000))
        .with("M", Value::Int(-7));
    let encoded = encode(&message, &registry).unwrap();
    let parsed: JsonValue = serde_json::from_str(&encoded).unwrap();
    assert_eq!(parsed["N"], "2000000000000000");
    assert_eq!(parsed["M"], -7);
    assert_eq!(decode(&encoded, &registry).unwrap(), message);
}

/// `f64` 特殊值取引号记号。
#[test]
fn float_specials_quoted() {
    let registry = Registry::from_schema_text("namespace Demo\nF/1 -> f64 X\n").unwrap();
    let message =
        Message::new(QName::new(Some("Demo"), "F")).with("X", Value::F64(f64::INFINITY));
    let encoded = encode(&message, &registry).unwrap();
    let parsed: JsonValue = serde_json::from_str(&encoded).unwrap();
    assert_eq!(parsed["X"], "Inf");
    assert_eq!(decode(&encoded, &registry).unwrap(), message);
}

/// 时间族渲染为 ISO 字符串。
#[test]
fn time_values_are_strings() {
    let registry = Registry::from_schema_text(
        "namespace Demo\nEvent/1 -> millitime Timestamp, date TradeDate\n",
    )
    .unwrap();
    let message = Message::new(QName::new(Some("Demo"), "Event"))
        .with("Timestamp", Value::Int(0))
        .with("TradeDate", Value::Int(0));
    let encoded = encode(&message, &registry).unwrap();
    let parsed: JsonValue = serde_json::from_str(&encoded).unwrap();
    assert_eq!(parsed["Timestamp"], "1970-01-01T00:00:00.000Z");
    assert_eq!(parsed["TradeDate"], "1970-01-01");
    assert_eq!(decode(&encoded, &registry).unwrap(), message);
}

/// 非 UTF-8 字节串渲染为十六进制数组；解码接受空白分组的字节对。
#[test]
fn binary_hex_arrays() {
    let registry = Registry::from_schema_text("namespace Demo\nPacket/1 -> binary Data\n").unwrap();
    let message = Message::new(QName::new(Some("Demo"), "Packet"))
        .with("Data", Value::Binary(vec![0xff, 0x00, 0x3e]));
    let encoded = encode(&message, &registry).unwrap();
    let parsed: JsonValue = serde_json::from_str(&encoded).unwrap();
    assert_eq!(parsed["Data"][0], "ff");
    assert_eq!(decode(&encoded, &registry).unwrap(), message);

    let grouped = r#"{"$type": "Demo:Packet", "Data": ["3e 6d 3c ea"]}"#;
    let decoded = decode(grouped, &registry).unwrap();
    assert_eq!(
        decoded.get("Data"),
        Some(&Value::Binary(vec![0x3e, 0x6d, 0x3c, 0xea]))
    );
}

/// 显式 null 等同字段缺省。
#[test]
fn explicit_null_means_absence() {
    let registry = Registry::from_schema_text("namespace Demo\nOpt/1 -> u32 A?\n").unwrap();
    let decoded = decode(r#"{"$type": "Demo:Opt", "A": null}"#, &registry).unwrap();
    assert_eq!(decoded.get("A"), None);
}

/// 扩展数组往返。
#[test]
fn extensions_round_trip() {
    let registry = Registry::from_schema_text(
        "namespace Demo\nMsg/1 -> u32 A\nExt/2 -> string Info\n",
    )
    .unwrap();
    let mut message = Message::new(QName::new(Some("Demo"), "Msg")).with("A", Value::UInt(1));
    message
        .extensions
        .push(Message::new(QName::new(Some("Demo"), "Ext")).with("Info", Value::str("x")));
    let encoded = encode(&message, &registry).unwrap();
    let parsed: JsonValue = serde_json::from_str(&encoded).unwrap();
    assert_eq!(parsed["$extension"][0]["$type"], "Demo:Ext");
    assert_eq!(decode(&encoded, &registry).unwrap(), message);
}

/// 流是消息对象的 JSON 数组。
#[test]
fn stream_is_wrapped_array() {
    let registry = Registry::from_schema_text("namespace Demo\nPing/1 -> u32 A\n").unwrap();
    let messages = vec![
        Message::new(QName::new(Some("Demo"), "Ping")).with("A", Value::UInt(1)),
        Message::new(QName::new(Some("Demo"), "Ping")).with("A", Value::UInt(2)),
    ];
    let encoded = encode_stream(&messages, &registry).unwrap();
    let parsed: JsonValue = serde_json::from_str(&encoded).unwrap();
    assert!(parsed.is_array());
    assert_eq!(decode_stream(&encoded, &registry).unwrap(), messages);
}
