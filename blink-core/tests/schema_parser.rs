//! 模式文本语法分析的行为回归。
//!
//! # 教案式说明
//! - **Why**：语法树是后续一切语义求解的输入，这里锁定组/枚举/别名/
//!   注解四类声明的识别行为与错误定位。
//! - **What**：断言只针对语法树形状，不触碰解析后模型。

use blink_core::schema::ast::{ByteKind, TypeRefAst};
use blink_core::schema::parser::parse_schema;
use blink_core::ErrorKind;

/// 组声明携带类型标识、父组与可空字段后缀。
#[test]
fn parses_group_with_id_super_and_optional_fields() {
    let ast = parse_schema(
        "namespace Demo\n\
         Base/1 -> u32 Id\n\
         Child/2 : Base -> string Name, u8 Level?\n",
    )
    .unwrap();
    assert_eq!(ast.namespace.as_deref(), Some("Demo"));
    assert_eq!(ast.groups.len(), 2);
    let child = &ast.groups[1];
    assert_eq!(child.type_id, Some(2));
    assert_eq!(child.super_name.as_ref().unwrap().name, "Base");
    assert_eq!(child.fields.len(), 2);
    assert!(!child.fields[0].optional);
    assert!(child.fields[1].optional);
}

/// 枚举符号自动递增，`/n` 显式赋值后从新值继续。
#[test]
fn enum_symbols_auto_increment() {
    let ast = parse_schema("Color = | Red | Green/5 | Blue\n").unwrap();
    assert_eq!(ast.enums.len(), 1);
    let symbols = &ast.enums[0].symbols;
    assert_eq!(
        symbols.iter().map(|s| (s.name.as_str(), s.value)).collect::<Vec<_>>(),
        [("Red", 0), ("Green", 5), ("Blue", 6)]
    );
}

/// `Name = type` 识别为类型别名而非枚举。
#[test]
fn typedef_is_distinguished_from_enum() {
    let ast = parse_schema("Ident = u64\nSeq = string []\n").unwrap();
    assert_eq!(ast.enums.len(), 0);
    assert_eq!(ast.type_defs.len(), 2);
    assert!(matches!(ast.type_defs[0].type_ref, TypeRefAst::Primitive(_)));
    assert!(matches!(ast.type_defs[1].type_ref, TypeRefAst::Sequence(_)));
}

/// 字节类类型的长度参数：string 可选、fixed 必填。
#[test]
fn byte_types_carry_sizes() {
    let ast = parse_schema("Blob/1 -> string(64) Name, fixed(8) Key, binary Raw\n").unwrap();
    let fields = &ast.groups[0].fields;
    assert!(matches!(
        fields[0].type_ref,
        TypeRefAst::Bytes { kind: ByteKind::String, size: Some(64) }
    ));
    assert!(matches!(
        fields[1].type_ref,
        TypeRefAst::Bytes { kind: ByteKind::Fixed, size: Some(8) }
    ));
    assert!(matches!(
        fields[2].type_ref,
        TypeRefAst::Bytes { kind: ByteKind::Binary, size: None }
    ));
}

/// 无长度的 fixed 是语法错误。
#[test]
fn fixed_without_size_is_rejected() {
    let err = parse_schema("Blob/1 -> fixed Key\n").unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Parse);
}

/// 内联注解与 `name/id` 数字标识都归并到字段注解。
#[test]
fn field_annotations_and_numeric_ids() {
    let ast = parse_schema("Msg/1 -> @doc=\"price\" u32 Price/7\n").unwrap();
    let field = &ast.groups[0].fields[0];
    assert_eq!(field.annotations.len(), 2);
    assert_eq!(field.annotations[0].name.name, "doc");
    assert_eq!(field.annotations[1].name.name, "id");
    assert_eq!(field.annotations[1].value, "7");
}

/// 增量注解语句与模式级注解链。
#[test]
fn incremental_and_schema_annotations() {
    let ast = parse_schema(
        "schema <- @version=\"4\"\n\
         Msg/1 -> u32 A\n\
         Msg <- @doc=\"msg\" <- @rank=\"1\"\n\
         Msg.A <- @doc=\"field\"\n",
    )
    .unwrap();
    assert_eq!(ast.schema_annotations.len(), 1);
    assert_eq!(ast.incremental_annotations.len(), 2);
    assert_eq!(ast.incremental_annotations[0].annotations.len(), 2);
    assert_eq!(
        ast.incremental_annotations[1].target.member.as_deref(),
        Some("A")
    );
}

/// 反斜杠引用使关键字可以作标识符，十六进制字面量可作类型标识。
#[test]
fn quoted_identifiers_and_hex_literals() {
    let ast = parse_schema("\\string/0x10 -> u32 A\n").unwrap();
    assert_eq!(ast.groups[0].name.name, "string");
    assert_eq!(ast.groups[0].type_id, Some(16));
}

/// 相邻字符串字面量在注解值中拼接。
#[test]
fn adjacent_string_literals_concatenate() {
    let ast = parse_schema("@doc=\"one \" \"two\" Msg/1 -> u32 A\n").unwrap();
    assert_eq!(ast.groups[0].annotations[0].value, "one two");
}

/// 语法错误携带行列定位。
#[test]
fn parse_errors_carry_line_and_column() {
    let err = parse_schema("Msg/1 ->\n    ,\n").unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Parse);
    assert!(matches!(
        err.location(),
        blink_core::Location::Text { line: 2, .. }
    ));
}
