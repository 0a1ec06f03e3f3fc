//! 解析完成后的模式模型。
//!
//! # 教案定位（Why）
//! - 模式中的组可以互相引用（A 引用 B，B 又动态引用 A），若用指针建模
//!   将产生自引用结构。此处采用扁平竞技场（arena）：组、枚举、类型别名
//!   各占一个 `Vec`，引用退化为稳定的整数下标，环形引用自然可表示。
//! - 该模型是只读快照：解析器产出后冻结，运行期的变更统一经由
//!   注册表的更新入口完成。
//!
//! # 契约说明（What）
//! - [`GroupId`]/[`EnumId`]/[`TypeDefId`] 仅在产出它们的 [`Schema`]
//!   （或由其构建的注册表）内有效，跨模式混用是逻辑错误。
//! - 组内只保存本地声明的字段；线性化遍历（父字段在前）由
//!   [`Schema::all_fields`] 动态完成，保证父组事后补全定义时不产生
//!   过期的副本。

use alloc::borrow::ToOwned;
use alloc::boxed::Box;
use alloc::string::String;
use alloc::vec::Vec;
use core::fmt;

/// 限定名：可选命名空间加本地名。
///
/// ### 契约说明（What）
/// - 相等性逐分量比较；字符串形式为 `ns:name`，无命名空间时为裸 `name`。
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub struct QName {
    /// 命名空间，缺省时为 `None`。
    pub namespace: Option<String>,
    /// 本地名，不可为空。
    pub name: String,
}

impl QName {
    /// 构造限定名。
    pub fn new(namespace: Option<&str>, name: &str) -> Self {
        Self {
            namespace: namespace.map(ToOwned::to_owned),
            name: name.to_owned(),
        }
    }

    /// 解析 `ns:name` 或裸 `name` 形式；裸名落入 `default_namespace`。
    pub fn parse(raw: &str, default_namespace: Option<&str>) -> Self {
        match raw.split_once(':') {
            Some((ns, name)) => Self {
                namespace: if ns.is_empty() {
                    None
                } else {
                    Some(ns.to_owned())
                },
                name: name.to_owned(),
            },
            None => Self::new(default_namespace, raw),
        }
    }

    /// 注册表索引用的键（与 `Display` 输出一致）。
    pub fn key(&self) -> String {
        use alloc::string::ToString;
        self.to_string()
    }
}

impl fmt::Display for QName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.namespace {
            Some(ns) => write!(f, "{ns}:{}", self.name),
            None => f.write_str(&self.name),
        }
    }
}

/// 组竞技场下标。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GroupId(pub(crate) u32);

/// 枚举竞技场下标。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EnumId(pub(crate) u32);

/// 类型别名竞技场下标。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TypeDefId(pub(crate) u32);

impl GroupId {
    /// 下标数值，供调试输出使用。
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

/// Blink 基础标量类型。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[allow(missing_docs)]
pub enum Primitive {
    U8,
    U16,
    U32,
    U64,
    I8,
    I16,
    I32,
    I64,
    Bool,
    F64,
    Decimal,
    MilliTime,
    NanoTime,
    Date,
    TimeOfDayMilli,
    TimeOfDayNano,
}

impl Primitive {
    /// 从模式文本关键字解析。
    pub fn from_name(name: &str) -> Option<Self> {
        Some(match name {
            "u8" => Self::U8,
            "u16" => Self::U16,
            "u32" => Self::U32,
            "u64" => Self::U64,
            "i8" => Self::I8,
            "i16" => Self::I16,
            "i32" => Self::I32,
            "i64" => Self::I64,
            "bool" => Self::Bool,
            "f64" => Self::F64,
            "decimal" => Self::Decimal,
            "millitime" => Self::MilliTime,
            "nanotime" => Self::NanoTime,
            "date" => Self::Date,
            "timeOfDayMilli" => Self::TimeOfDayMilli,
            "timeOfDayNano" => Self::TimeOfDayNano,
            _ => return None,
        })
    }

    /// 模式文本中的关键字。
    pub fn name(self) -> &'static str {
        match self {
            Self::U8 => "u8",
            Self::U16 => "u16",
            Self::U32 => "u32",
            Self::U64 => "u64",
            Self::I8 => "i8",
            Self::I16 => "i16",
            Self::I32 => "i32",
            Self::I64 => "i64",
            Self::Bool => "bool",
            Self::F64 => "f64",
            Self::Decimal => "decimal",
            Self::MilliTime => "millitime",
            Self::NanoTime => "nanotime",
            Self::Date => "date",
            Self::TimeOfDayMilli => "timeOfDayMilli",
            Self::TimeOfDayNano => "timeOfDayNano",
        }
    }

    /// 整数族（含时间/日期）是否为无符号解释。
    ///
    /// `bool`/`f64`/`decimal` 不属于整数族，返回值无意义，调用方不应依赖。
    pub fn is_unsigned(self) -> bool {
        matches!(
            self,
            Self::U8 | Self::U16 | Self::U32 | Self::U64 | Self::TimeOfDayMilli | Self::TimeOfDayNano
        )
    }

    /// 整数族的位宽；非整数族返回 `None`。
    pub fn int_bits(self) -> Option<u32> {
        Some(match self {
            Self::U8 | Self::I8 => 8,
            Self::U16 | Self::I16 => 16,
            Self::U32 | Self::I32 | Self::Date | Self::TimeOfDayMilli => 32,
            Self::U64
            | Self::I64
            | Self::MilliTime
            | Self::NanoTime
            | Self::TimeOfDayNano => 64,
            Self::Bool | Self::F64 | Self::Decimal => return None,
        })
    }
}

/// 解析完成后的字段类型（封闭和类型，供各编解码器穷尽匹配）。
#[derive(Debug, Clone, PartialEq)]
pub enum Type {
    /// 基础标量。
    Primitive(Primitive),
    /// UTF-8 字符串，可带弱约束的最大字节数。
    String {
        /// 最大字节数；超出按弱错误处理。
        max_size: Option<u32>,
    },
    /// 原始字节串，可带弱约束的最大字节数。
    Binary {
        /// 最大字节数；超出按弱错误处理。
        max_size: Option<u32>,
    },
    /// 定长字节串，长度必须精确匹配。
    Fixed {
        /// 精确字节数（至少 1）。
        size: u32,
    },
    /// 枚举引用。
    Enum(EnumId),
    /// 元素类型的序列；元素不可再是序列（解析期强校验）。
    Sequence(Box<Type>),
    /// 静态组内联嵌入。
    StaticGroup(GroupId),
    /// 动态组引用：实际类型须为该组或其派生组。
    DynamicGroup(GroupId),
    /// 万能动态引用，可容纳任意组。
    Object,
}

/// 注解表：按书写顺序保存，合并时后写者胜。
pub type AnnotationMap = Vec<(QName, String)>;

/// 在注解表中查找指定键的值（取最后一次写入）。
pub fn annotation_value<'a>(annotations: &'a AnnotationMap, key: &QName) -> Option<&'a str> {
    annotations
        .iter()
        .rev()
        .find(|(name, _)| name == key)
        .map(|(_, value)| value.as_str())
}

/// 字段定义。
#[derive(Debug, Clone, PartialEq)]
pub struct FieldDef {
    /// 字段名，线性化后在组内唯一。
    pub name: String,
    /// 字段类型。
    pub ty: Type,
    /// 是否可空。
    pub optional: bool,
    /// 字段注解。
    pub annotations: AnnotationMap,
}

/// 组（消息类型）定义。
///
/// `fields` 仅含本地声明；完整的线性化视图见 [`Schema::all_fields`]。
#[derive(Debug, Clone, PartialEq)]
pub struct GroupDef {
    /// 限定名。
    pub name: QName,
    /// 二进制帧使用的数值类型标识。
    pub type_id: Option<u64>,
    /// 父组。
    pub super_id: Option<GroupId>,
    /// 本地字段（不含父组字段）。
    pub fields: Vec<FieldDef>,
    /// 组注解。
    pub annotations: AnnotationMap,
}

/// 枚举符号。
#[derive(Debug, Clone, PartialEq)]
pub struct EnumSymbol {
    /// 符号名。
    pub name: String,
    /// 对应的 `i32` 值。
    pub value: i32,
    /// 符号注解。
    pub annotations: AnnotationMap,
}

/// 枚举定义。
#[derive(Debug, Clone, PartialEq)]
pub struct EnumDef {
    /// 限定名。
    pub name: QName,
    /// 符号表（保持声明顺序；名与值均唯一）。
    pub symbols: Vec<EnumSymbol>,
    /// 枚举注解。
    pub annotations: AnnotationMap,
}

impl EnumDef {
    /// 按数值查找符号名。
    pub fn symbol_for(&self, value: i32) -> Option<&str> {
        self.symbols
            .iter()
            .find(|symbol| symbol.value == value)
            .map(|symbol| symbol.name.as_str())
    }

    /// 按符号名查找数值。
    pub fn value_for(&self, name: &str) -> Option<i32> {
        self.symbols
            .iter()
            .find(|symbol| symbol.name == name)
            .map(|symbol| symbol.value)
    }
}

/// 类型别名定义（已传递展开为最终类型）。
#[derive(Debug, Clone, PartialEq)]
pub struct TypeDefEntry {
    /// 限定名。
    pub name: QName,
    /// 展开后的类型。
    pub ty: Type,
    /// 别名注解。
    pub annotations: AnnotationMap,
}

/// 解析完成并冻结的模式。
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Schema {
    /// 模式级命名空间。
    pub namespace: Option<String>,
    /// 模式级注解。
    pub annotations: AnnotationMap,
    pub(crate) groups: Vec<GroupDef>,
    pub(crate) enums: Vec<EnumDef>,
    pub(crate) typedefs: Vec<TypeDefEntry>,
}

impl Schema {
    /// 按下标取组定义。
    pub fn group(&self, id: GroupId) -> &GroupDef {
        &self.groups[id.0 as usize]
    }

    /// 按下标取枚举定义。
    pub fn enum_def(&self, id: EnumId) -> &EnumDef {
        &self.enums[id.0 as usize]
    }

    /// 按下标取类型别名。
    pub fn typedef(&self, id: TypeDefId) -> &TypeDefEntry {
        &self.typedefs[id.0 as usize]
    }

    /// 遍历全部组（按声明顺序，附带下标）。
    pub fn groups(&self) -> impl Iterator<Item = (GroupId, &GroupDef)> {
        self.groups
            .iter()
            .enumerate()
            .map(|(index, group)| (GroupId(index as u32), group))
    }

    /// 遍历全部枚举。
    pub fn enums(&self) -> impl Iterator<Item = (EnumId, &EnumDef)> {
        self.enums
            .iter()
            .enumerate()
            .map(|(index, def)| (EnumId(index as u32), def))
    }

    /// 遍历全部类型别名。
    pub fn typedefs(&self) -> impl Iterator<Item = (TypeDefId, &TypeDefEntry)> {
        self.typedefs
            .iter()
            .enumerate()
            .map(|(index, def)| (TypeDefId(index as u32), def))
    }

    /// 线性化字段遍历：父组字段在前、本地字段在后。
    ///
    /// ### 实现说明（How）
    /// - 先沿 `super_id` 链自底向上收集组下标，再反转后依次展开本地字段。
    ///   调用前须保证继承链无环（解析器与注册表更新入口均已校验）。
    pub fn all_fields(&self, id: GroupId) -> impl Iterator<Item = &FieldDef> {
        let mut chain = Vec::new();
        let mut current = Some(id);
        while let Some(group_id) = current {
            chain.push(group_id);
            current = self.group(group_id).super_id;
        }
        chain.reverse();
        chain
            .into_iter()
            .flat_map(|group_id| self.group(group_id).fields.iter())
    }

    /// 线性化字段总数。
    pub fn field_count(&self, id: GroupId) -> usize {
        self.all_fields(id).count()
    }

    /// `child` 是否为 `base` 或其派生组。
    pub fn is_descendant(&self, child: GroupId, base: GroupId) -> bool {
        let mut current = Some(child);
        while let Some(group_id) = current {
            if group_id == base {
                return true;
            }
            current = self.group(group_id).super_id;
        }
        false
    }
}
