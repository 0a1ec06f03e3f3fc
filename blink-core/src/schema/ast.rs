//! 模式文本的未定型语法树。
//!
//! 解析器按词法顺序产出这些节点；所有名称尚未限定、所有引用尚未解析，
//! 交由解析后阶段（`resolve`）统一处理。

use alloc::string::String;
use alloc::vec::Vec;

use crate::schema::model::QName;

/// 内联注解 `@name="value"`。
#[derive(Debug, Clone, PartialEq)]
pub struct AnnotationAst {
    /// 注解名（可含命名空间）。
    pub name: QName,
    /// 字符串值（相邻字符串字面量已拼接）。
    pub value: String,
}

/// 字段或别名的类型引用。
#[derive(Debug, Clone, PartialEq)]
pub enum TypeRefAst {
    /// 基础标量关键字。
    Primitive(String),
    /// `string`/`binary`（可带最大长度）或 `fixed`（必带长度）。
    Bytes {
        /// `string` | `binary` | `fixed`。
        kind: ByteKind,
        /// 长度参数。
        size: Option<u32>,
    },
    /// `T []` 序列。
    Sequence(alloc::boxed::Box<TypeRefAst>),
    /// `object` 万能引用。
    Object,
    /// 具名引用；`dynamic` 对应 `Name *` 记法。
    Named {
        /// 引用目标名。
        name: QName,
        /// 是否显式标注为动态引用。
        dynamic: bool,
    },
}

/// 字节类字段的子类。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ByteKind {
    /// UTF-8 字符串。
    String,
    /// 原始字节串。
    Binary,
    /// 定长字节串。
    Fixed,
}

/// 字段声明。
#[derive(Debug, Clone, PartialEq)]
pub struct FieldAst {
    /// 字段名。
    pub name: String,
    /// 类型引用。
    pub type_ref: TypeRefAst,
    /// 是否带 `?` 后缀。
    pub optional: bool,
    /// 内联注解（含由 `name/id` 记法降级而来的 `blink:id`）。
    pub annotations: Vec<AnnotationAst>,
}

/// 组声明。
#[derive(Debug, Clone, PartialEq)]
pub struct GroupDefAst {
    /// 组名。
    pub name: QName,
    /// `/typeid` 记法给出的数值标识。
    pub type_id: Option<u64>,
    /// `: Super` 指定的父组名。
    pub super_name: Option<QName>,
    /// 本地字段。
    pub fields: Vec<FieldAst>,
    /// 内联注解。
    pub annotations: Vec<AnnotationAst>,
}

/// 枚举符号。
#[derive(Debug, Clone, PartialEq)]
pub struct EnumSymbolAst {
    /// 符号名。
    pub name: String,
    /// 符号值（显式 `/n` 或自动递增）。
    pub value: i32,
    /// 内联注解。
    pub annotations: Vec<AnnotationAst>,
}

/// 枚举声明 `Name = | A | B/5`。
#[derive(Debug, Clone, PartialEq)]
pub struct EnumDefAst {
    /// 枚举名。
    pub name: QName,
    /// 符号表。
    pub symbols: Vec<EnumSymbolAst>,
    /// 内联注解。
    pub annotations: Vec<AnnotationAst>,
}

/// 类型别名声明 `Name = type`。
#[derive(Debug, Clone, PartialEq)]
pub struct TypeDefAst {
    /// 别名。
    pub name: QName,
    /// 目标类型引用。
    pub type_ref: TypeRefAst,
    /// 内联注解。
    pub annotations: Vec<AnnotationAst>,
}

/// 增量注解的目标组件 `Name` 或 `Name.Member`。
#[derive(Debug, Clone, PartialEq)]
pub struct ComponentRefAst {
    /// 组件名。
    pub name: QName,
    /// 成员名（字段或枚举符号）。
    pub member: Option<String>,
}

/// 增量注解语句 `Component <- @a="v" <- @b="w"`。
#[derive(Debug, Clone, PartialEq)]
pub struct IncrementalAnnotationAst {
    /// 目标组件。
    pub target: ComponentRefAst,
    /// 按词法顺序排列的注解。
    pub annotations: Vec<AnnotationAst>,
}

/// 一份模式文本的完整语法树。
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SchemaAst {
    /// `namespace` 指令声明的命名空间。
    pub namespace: Option<String>,
    /// 枚举声明。
    pub enums: Vec<EnumDefAst>,
    /// 类型别名声明。
    pub type_defs: Vec<TypeDefAst>,
    /// 组声明。
    pub groups: Vec<GroupDefAst>,
    /// `schema <- ...` 模式级注解。
    pub schema_annotations: Vec<AnnotationAst>,
    /// 增量注解语句。
    pub incremental_annotations: Vec<IncrementalAnnotationAst>,
}
