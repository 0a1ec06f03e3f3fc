//! 动态模式交换的行为回归。
//!
//! # 教案式说明
//! - **Why**：锁定自描述模式的两种标识映射、"声明 + 定义"两段式
//!   流程对后续帧的即时生效，以及失败变更的原子回退。
//! - **How**：交换帧用携带完整定义的影子注册表编码，再喂给只装了
//!   自描述模式的新注册表解码，观察注册表状态与产出消息。

use blink_codec_compact as compact;
use blink_core::{ErrorKind, Message, QName, Registry, StaticGroupValue, Value};
use blink_dynschema::{
    decode_stream_with_exchange, encode_transport, install_self_schema, is_reserved,
    SelfSchemaVariant,
};

fn blink(name: &str) -> QName {
    QName::new(Some("Blink"), name)
}

fn demo(name: &str) -> QName {
    QName::new(Some("Demo"), name)
}

fn nsname(ns: &str, name: &str) -> Value {
    Value::Group(
        StaticGroupValue::new()
            .with("Ns", Value::str(ns))
            .with("Name", Value::str(name)),
    )
}

/// 线上口径的保留标识映射。
#[test]
fn shipped_ids_match_wire_observations() {
    let mut registry = Registry::from_schema_text("namespace Demo\n").unwrap();
    install_self_schema(&mut registry, SelfSchemaVariant::Shipped).unwrap();
    for (name, id) in [
        ("GroupDecl", 16000u64),
        ("GroupDef", 16001),
        ("Define", 16002),
        ("Ref", 16003),
        ("DynRef", 16004),
        ("Sequence", 16005),
        ("String", 16006),
        ("Binary", 16007),
        ("Fixed", 16008),
        ("Enum", 16009),
        ("SchemaAnnotation", 16027),
    ] {
        assert_eq!(
            registry.get_group_by_id(id).unwrap().name,
            blink(name),
            "{name}"
        );
    }
    for name in ["FieldDef", "TypeDef", "Symbol", "NsName", "Annotated", "Annotation"] {
        let group = registry.get_group_by_name(&blink(name)).unwrap();
        assert_eq!(group.type_id, None, "{name}");
    }
}

/// 规范文档口径的保留标识映射。
#[test]
fn documented_ids_match_blink_documentation() {
    let mut registry = Registry::from_schema_text("namespace Demo\n").unwrap();
    install_self_schema(&mut registry, SelfSchemaVariant::Documented).unwrap();
    for (name, id) in [
        ("GroupDecl", 16000u64),
        ("GroupDef", 16001),
        ("FieldDef", 16002),
        ("Define", 16003),
        ("TypeDef", 16004),
        ("Ref", 16010),
        ("Symbol", 16019),
        ("U8", 16020),
        ("Object", 16036),
        ("SchemaAnnotation", 16037),
    ] {
        assert_eq!(
            registry.get_group_by_id(id).unwrap().name,
            blink(name),
            "{name}"
        );
    }
}

/// 保留区间判定。
#[test]
fn reserved_range_boundaries() {
    assert!(is_reserved(16000));
    assert!(is_reserved(16383));
    assert!(!is_reserved(15999));
    assert!(!is_reserved(16384));
}

/// 种子场景：GroupDecl + GroupDef 先行的流使新类型随即可解码。
#[test]
fn declare_define_then_decode_application_frame() {
    // 影子注册表：自描述模式 + 手工应用同样的更新，用于编码交换帧与应用帧。
    let mut shadow = Registry::from_schema_text("namespace Demo\nPing/1 -> u32 X\n").unwrap();
    install_self_schema(&mut shadow, SelfSchemaVariant::Shipped).unwrap();

    let decl = Message::new(blink("GroupDecl"))
        .with("Name", nsname("Demo", "Greeting"))
        .with("Id", Value::UInt(9000));
    let field = StaticGroupValue::new()
        .with("Name", Value::str("Text"))
        .with("Type", Value::from(Message::new(blink("String"))))
        .with("Optional", Value::Bool(false));
    let def = Message::new(blink("GroupDef"))
        .with("Name", nsname("Demo", "Greeting"))
        .with("Id", Value::UInt(9000))
        .with("Fields", Value::Sequence(vec![Value::Group(field)]));

    let mut bytes = Vec::new();
    bytes.extend(encode_transport(&decl, &shadow).unwrap());
    bytes.extend(encode_transport(&def, &shadow).unwrap());
    // 应用帧需要一个已认识 Greeting 的注册表来编码。
    let mut encoder = shadow.clone();
    for message in [&decl, &def] {
        encoder
            .apply_update(blink_dynschema::message_to_update(message).unwrap())
            .unwrap();
    }
    let greeting = Message::new(demo("Greeting")).with("Text", Value::str("hi"));
    bytes.extend(compact::encode(&greeting, &encoder).unwrap());

    // 目标注册表只认识自描述模式与 Ping；交换帧应静默生效。
    let mut registry = Registry::from_schema_text("namespace Demo\nPing/1 -> u32 X\n").unwrap();
    install_self_schema(&mut registry, SelfSchemaVariant::Shipped).unwrap();
    let messages = decode_stream_with_exchange(&bytes, &mut registry, true).unwrap();
    assert_eq!(messages, [greeting]);
    let group = registry.get_group_by_id(9000).unwrap();
    assert_eq!(group.name, demo("Greeting"));
    assert_eq!(group.fields.len(), 1);
}

/// 重复类型标识的交换帧被拒绝且注册表不变。
#[test]
fn duplicate_type_id_update_is_rejected_atomically() {
    let mut registry = Registry::from_schema_text("namespace Demo\nPing/1 -> u32 X\n").unwrap();
    install_self_schema(&mut registry, SelfSchemaVariant::Shipped).unwrap();
    let clash = Message::new(blink("GroupDecl"))
        .with("Name", nsname("Demo", "Clash"))
        .with("Id", Value::UInt(1));
    let bytes = encode_transport(&clash, &registry).unwrap();

    let before = registry.known_type_ids().count();
    let err = decode_stream_with_exchange(&bytes, &mut registry, true).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::SchemaUpdate);
    assert_eq!(registry.known_type_ids().count(), before);
    assert!(!registry.contains(&demo("Clash")));
}

/// 与既有名字冲突的交换帧（含自描述模式自身的名字）被拒绝。
#[test]
fn name_collision_with_self_schema_is_rejected() {
    let mut registry = Registry::from_schema_text("namespace Demo\n").unwrap();
    install_self_schema(&mut registry, SelfSchemaVariant::Shipped).unwrap();
    let clash = Message::new(blink("GroupDecl"))
        .with("Name", nsname("Blink", "GroupDecl"))
        .with("Id", Value::UInt(16200));
    let bytes = encode_transport(&clash, &registry).unwrap();
    let err = decode_stream_with_exchange(&bytes, &mut registry, true).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::SchemaUpdate);
}

/// 非保留标识的消息不得走交换编码入口。
#[test]
fn encode_transport_rejects_application_groups() {
    let mut registry = Registry::from_schema_text("namespace Demo\nPing/1 -> u32 X\n").unwrap();
    install_self_schema(&mut registry, SelfSchemaVariant::Shipped).unwrap();
    let ping = Message::new(demo("Ping")).with("X", Value::UInt(1));
    let err = encode_transport(&ping, &registry).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::SchemaUpdate);
}

/// 别名定义经由 Define 帧生效。
#[test]
fn define_alias_via_exchange() {
    let mut registry = Registry::from_schema_text("namespace Demo\n").unwrap();
    install_self_schema(&mut registry, SelfSchemaVariant::Shipped).unwrap();
    let define = Message::new(blink("Define"))
        .with("Name", nsname("Demo", "Qty"))
        .with("Type", Value::from(Message::new(blink("U32"))));
    let bytes = encode_transport(&define, &registry).unwrap();
    decode_stream_with_exchange(&bytes, &mut registry, true).unwrap();
    let ty = registry.typedef_by_name(&demo("Qty")).unwrap();
    assert_eq!(
        ty,
        &blink_core::Type::Primitive(blink_core::Primitive::U32)
    );
}
