//! Tag 文本格式的行为回归。
//!
//! # 教案式说明
//! - **Why**：锁定规范规定的字面量形态（`Y`/`N`、`[a;b]`、`{...}`、
//!   `{@T|...}`、十六进制列表、ISO 时间）与转义往返。
//! - **How**：对编码产物做子串断言（文本格式的确定性使其可行），
//!   再以解码往返收尾。

use blink_codec_tag::{decode, decode_stream, encode, encode_stream};
use blink_core::{
    DecimalValue, Message, QName, Registry, StaticGroupValue, Value,
};

fn demo_registry() -> Registry {
    Registry::from_schema_text(
        "namespace Demo\n\
         Inner/1 -> u32 Id\n\
         Msg/2 -> bool Flag, u32 [] Values, Inner* Child?\n",
    )
    .unwrap()
}

/// 序列以方括号包裹、分号分隔。
#[test]
fn sequence_uses_brackets_and_semicolons() {
    let registry = demo_registry();
    let message = Message::new(QName::new(Some("Demo"), "Msg"))
        .with("Flag", Value::Bool(true))
        .with(
            "Values",
            Value::Sequence(vec![Value::UInt(1), Value::UInt(2), Value::UInt(3)]),
        );
    let encoded = encode(&message, &registry).unwrap();
    assert!(encoded.contains("Values=[1;2;3]"), "{encoded}");
}

/// 布尔取 `Y`/`N` 记号。
#[test]
fn bool_uses_y_n_tokens() {
    let registry = demo_registry();
    let message =
        Message::new(QName::new(Some("Demo"), "Msg")).with("Flag", Value::Bool(true));
    let encoded = encode(&message, &registry).unwrap();
    assert!(encoded.contains("Flag=Y"), "{encoded}");
}

/// 动态组字段以花括号包裹嵌套消息。
#[test]
fn dynamic_group_field_wrapped_in_braces() {
    let registry = demo_registry();
    let child = Message::new(QName::new(Some("Demo"), "Inner")).with("Id", Value::UInt(1));
    let message = Message::new(QName::new(Some("Demo"), "Msg"))
        .with("Flag", Value::Bool(true))
        .with("Child", Value::from(child));
    let encoded = encode(&message, &registry).unwrap();
    assert!(encoded.contains("Child={@Demo:Inner|Id=1}"), "{encoded}");
}

/// 扩展块在末尾以 `|[...]` 呈现、分号分隔。
#[test]
fn extensions_use_semicolons() {
    let registry = demo_registry();
    let mut message =
        Message::new(QName::new(Some("Demo"), "Msg")).with("Flag", Value::Bool(false));
    message
        .extensions
        .push(Message::new(QName::new(Some("Demo"), "Inner")).with("Id", Value::UInt(1)));
    message
        .extensions
        .push(Message::new(QName::new(Some("Demo"), "Inner")).with("Id", Value::UInt(2)));
    let encoded = encode(&message, &registry).unwrap();
    assert!(
        encoded.contains("|[@Demo:Inner|Id=1;@Demo:Inner|Id=2]"),
        "{encoded}"
    );
    assert_eq!(decode(&encoded, &registry).unwrap(), message);
}

/// 解码接受 `Y`/`N` 与分号分隔的序列。
#[test]
fn decode_accepts_canonical_tokens() {
    let registry = demo_registry();
    let decoded = decode("@Demo:Msg|Flag=Y|Values=[1;2]", &registry).unwrap();
    assert_eq!(decoded.get("Flag"), Some(&Value::Bool(true)));
    assert_eq!(
        decoded.get("Values"),
        Some(&Value::Sequence(vec![Value::UInt(1), Value::UInt(2)]))
    );
}

/// 种子场景：静态组字面量逐字符匹配。
#[test]
fn company_renders_as_single_line() {
    let registry = Registry::from_schema_text(
        "namespace Demo\n\
         Address/1 -> string Street, string City, u32 ZipCode\n\
         Employee/2 -> string Name, u32 Age, Address HomeAddress\n\
         Manager/3 : Employee -> string Department, u32 TeamSize\n\
         Company/4 -> string CompanyName, Manager CEO\n",
    )
    .unwrap();
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
    assert_eq!(
        encoded,
        "@Demo:Company|CompanyName=TechCorp|CEO={Name=Alice,Age=45,\
         HomeAddress={Street=123 Main St,City=San Francisco,ZipCode=94102},\
         Department=Engineering,TeamSize=50}"
    );
    assert_eq!(decode(&encoded, &registry).unwrap(), message);
}

/// 保留字符、控制字符与 Unicode 的转义往返。
#[test]
fn escape_round_trip() {
    let registry = Registry::from_schema_text("namespace Demo\nNote/1 -> string Text\n").unwrap();
    let tricky = "a|b[c]d{e}f;g#h\\i\nj\u{1}k\u{e9}";
    let message =
        Message::new(QName::new(Some("Demo"), "Note")).with("Text", Value::str(tricky));
    let encoded = encode(&message, &registry).unwrap();
    assert_eq!(decode(&encoded, &registry).unwrap(), message);
}

/// 字节串渲染为十六进制列表。
#[test]
fn binary_renders_as_hex_list() {
    let registry =
        Registry::from_schema_text("namespace Demo\nBlob/1 -> binary Raw, fixed(3) Key\n").unwrap();
    let message = Message::new(QName::new(Some("Demo"), "Blob"))
        .with("Raw", Value::Binary(vec![0x3e, 0x6d, 0x4a]))
        .with("Key", Value::Binary(vec![1, 2, 3]));
    let encoded = encode(&message, &registry).unwrap();
    assert!(encoded.contains("Raw=[3e 6d 4a]"), "{encoded}");
    assert_eq!(decode(&encoded, &registry).unwrap(), message);
}

/// `f64` 特殊值与 decimal 记号。
#[test]
fn float_specials_and_decimal() {
    let registry = Registry::from_schema_text(
        "namespace Demo\nTick/1 -> f64 Rate, decimal Price\n",
    )
    .unwrap();
    let message = Message::new(QName::new(Some("Demo"), "Tick"))
        .with("Rate", Value::F64(f64::NEG_INFINITY))
        .with("Price", Value::Decimal(DecimalValue::new(-2, 15005)));
    let encoded = encode(&message, &registry).unwrap();
    assert!(encoded.contains("Rate=-Inf"), "{encoded}");
    assert!(encoded.contains("Price=15005e-2"), "{encoded}");
    assert_eq!(decode(&encoded, &registry).unwrap(), message);
}

/// 时间族取 ISO-8601 文本。
#[test]
fn time_values_render_iso() {
    let registry = Registry::from_schema_text(
        "namespace Demo\n\
         Event/1 -> millitime At, date Day, timeOfDayMilli Tod\n",
    )
    .unwrap();
    let message = Message::new(QName::new(Some("Demo"), "Event"))
        .with("At", Value::Int(86_400_000))
        .with("Day", Value::Int(0))
        .with("Tod", Value::UInt(3_661_001));
    let encoded = encode(&message, &registry).unwrap();
    assert!(encoded.contains("At=1970-01-02T00:00:00.000Z"), "{encoded}");
    assert!(encoded.contains("Day=1970-01-01"), "{encoded}");
    assert!(encoded.contains("Tod=01:01:01.001"), "{encoded}");
    assert_eq!(decode(&encoded, &registry).unwrap(), message);
}

/// 流：一行一条，注释与空行跳过。
#[test]
fn stream_skips_comments_and_blank_lines() {
    let registry = demo_registry();
    let first = Message::new(QName::new(Some("Demo"), "Inner")).with("Id", Value::UInt(1));
    let second = Message::new(QName::new(Some("Demo"), "Inner")).with("Id", Value::UInt(2));
    let text = encode_stream(&[first.clone(), second.clone()], &registry).unwrap();
    let wrapped = format!("# header\n{text}\n\n");
    let decoded: Vec<Message> = decode_stream(&wrapped, &registry)
        .collect::<Result<_, _>>()
        .unwrap();
    assert_eq!(decoded, [first, second]);
}
