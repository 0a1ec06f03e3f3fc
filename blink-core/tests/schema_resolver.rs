//! 模式语义求解的行为回归。
//!
//! # 教案式说明
//! - **Why**：解析后模型是编解码器共同的事实来源，这里锁定名称解析
//!   次序、继承线性化、注解合并与全部强约束。
//! - **What**：断言既覆盖成功路径的模型形状，也覆盖每类强错误。

use blink_core::{annotation_value, compile_schema, ErrorKind, QName, Registry, Type};

/// 线性化遍历：父组字段在前、本地字段在后。
#[test]
fn inheritance_linearizes_super_fields_first() {
    let registry = Registry::from_schema_text(
        "namespace Demo\n\
         Employee/2 -> string Name, u32 Age\n\
         Manager/3 : Employee -> string Department\n",
    )
    .unwrap();
    let id = registry
        .find_group_by_name(&QName::new(Some("Demo"), "Manager"))
        .unwrap();
    let names: Vec<&str> = registry.all_fields(id).map(|f| f.name.as_str()).collect();
    assert_eq!(names, ["Name", "Age", "Department"]);
}

/// 继承环是强解析错误。
#[test]
fn inheritance_cycle_is_rejected() {
    let err = compile_schema(
        "A/1 : B -> u32 X\n\
         B/2 : A -> u32 Y\n",
    )
    .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Resolve);
}

/// 线性化后的重名字段是强解析错误。
#[test]
fn duplicate_linearized_field_is_rejected() {
    let err = compile_schema(
        "Base/1 -> u32 Id\n\
         Child/2 : Base -> string Id\n",
    )
    .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Resolve);
}

/// 类型标识必须全局唯一。
#[test]
fn duplicate_type_id_is_rejected() {
    let err = compile_schema(
        "A/7 -> u32 X\n\
         B/7 -> u32 Y\n",
    )
    .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Resolve);
}

/// 序列不可嵌套，经由别名展开的嵌套同样被拒绝。
#[test]
fn nested_sequences_are_rejected() {
    assert_eq!(
        compile_schema("M/1 -> u32 [] [] X\n").unwrap_err().kind(),
        ErrorKind::Resolve
    );
    assert_eq!(
        compile_schema("Row = u32 []\nM/1 -> Row [] X\n")
            .unwrap_err()
            .kind(),
        ErrorKind::Resolve
    );
}

/// 类型别名环是强解析错误。
#[test]
fn typedef_cycle_is_rejected() {
    let err = compile_schema("A = B\nB = A\n").unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Resolve);
}

/// 名称解析次序：显式命名空间 → 模式命名空间 → 空命名空间。
#[test]
fn reference_resolution_prefers_schema_namespace() {
    let schema = compile_schema(
        "namespace Demo\n\
         Inner/1 -> u32 A\n\
         Outer/2 -> Inner Ref, Demo:Inner Explicit\n",
    )
    .unwrap();
    let registry = Registry::from_schema(schema).unwrap();
    let outer = registry
        .find_group_by_name(&QName::new(Some("Demo"), "Outer"))
        .unwrap();
    for field in registry.all_fields(outer) {
        let Type::StaticGroup(target) = &field.ty else {
            panic!("expected static group reference");
        };
        assert_eq!(registry.group(*target).name.name, "Inner");
    }
}

/// 动态引用必须指向组；指向枚举被拒绝。
#[test]
fn dynamic_reference_must_target_group() {
    let err = compile_schema(
        "Color = | Red | Green\n\
         M/1 -> Color * C\n",
    )
    .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Resolve);
}

/// 注解合并：内联在前、增量按词法顺序追加、后写者胜。
#[test]
fn annotation_merge_later_wins() {
    let schema = compile_schema(
        "namespace Demo\n\
         @doc=\"inline\" Msg/1 -> u32 A\n\
         Msg <- @doc=\"first\"\n\
         Msg <- @doc=\"second\"\n",
    )
    .unwrap();
    let registry = Registry::from_schema(schema).unwrap();
    let group = registry
        .get_group_by_name(&QName::new(Some("Demo"), "Msg"))
        .unwrap();
    assert_eq!(group.annotations.len(), 3);
    assert_eq!(
        annotation_value(&group.annotations, &QName::new(Some("Demo"), "doc")),
        Some("second")
    );
}

/// 枚举重复符号与重复数值均为强错误。
#[test]
fn enum_uniqueness_is_enforced() {
    assert_eq!(
        compile_schema("E = | A | A\n").unwrap_err().kind(),
        ErrorKind::Resolve
    );
    assert_eq!(
        compile_schema("E = | A/1 | B/1\n").unwrap_err().kind(),
        ErrorKind::Resolve
    );
}

/// 未知引用是强解析错误。
#[test]
fn unknown_reference_is_rejected() {
    let err = compile_schema("M/1 -> Missing X\n").unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Resolve);
}

/// 别名传递展开到最终类型。
#[test]
fn typedefs_expand_transitively() {
    let schema = compile_schema(
        "Ident = u64\n\
         Alias = Ident\n\
         M/1 -> Alias X\n",
    )
    .unwrap();
    let registry = Registry::from_schema(schema).unwrap();
    let group = registry.get_group_by_name(&QName::new(None, "M")).unwrap();
    assert!(matches!(
        group.fields[0].ty,
        Type::Primitive(blink_core::Primitive::U64)
    ));
}
