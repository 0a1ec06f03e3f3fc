//! 运行时值模型。
//!
//! # 教案定位（Why）
//! - 五种编解码器共享同一套带标签的值表示，保证任意两种线格式之间
//!   转换时语义无损。
//! - 字段表必须按线性化声明顺序迭代才能获得确定性的编码输出，
//!   因此用保持插入顺序的键值对向量承载，而不是哈希表。
//!
//! # 契约说明（What）
//! - 可空字段取空值时**不存入**字段表（而非存显式空哨兵）。
//! - 值不持有任何指回注册表的引用，跨注册表传递是安全的。

use alloc::borrow::ToOwned;
use alloc::boxed::Box;
use alloc::string::String;
use alloc::vec::Vec;

use smallvec::SmallVec;

use crate::schema::model::QName;

/// 扩展块的内联容量：多数消息只携带零到两条扩展。
pub const DEFAULT_EXTENSION_CAPACITY: usize = 2;

/// 消息扩展列表。
///
/// 栈上内联前 [`DEFAULT_EXTENSION_CAPACITY`] 条，超出自动回退到堆，
/// 语义与 `SmallVec` 一致。
pub type ExtensionVec = SmallVec<[Message; DEFAULT_EXTENSION_CAPACITY]>;

/// 构造空的 [`ExtensionVec`]，调用方无须直接引用 `smallvec` 依赖。
#[must_use]
pub fn new_extension_vec() -> ExtensionVec {
    SmallVec::new()
}

/// Blink `decimal` 的指数/尾数对。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DecimalValue {
    /// 十进制指数。
    pub exponent: i8,
    /// 尾数。
    pub mantissa: i64,
}

impl DecimalValue {
    /// 构造 decimal 值。
    pub fn new(exponent: i8, mantissa: i64) -> Self {
        Self { exponent, mantissa }
    }
}

/// 保持插入顺序的字段表。
///
/// ### 实现说明（How）
/// - 消息字段数通常很小，线性查找优于哈希；迭代顺序即插入顺序，
///   编码器按线性化声明序写入即可获得逐比特确定的输出。
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FieldMap {
    entries: Vec<(String, Value)>,
}

impl FieldMap {
    /// 构造空字段表。
    pub fn new() -> Self {
        Self::default()
    }

    /// 按名查找。
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.entries
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value)
    }

    /// 写入字段；同名字段被替换但保持原位置。
    pub fn insert(&mut self, name: impl Into<String>, value: Value) {
        let name = name.into();
        if let Some(entry) = self.entries.iter_mut().find(|(key, _)| *key == name) {
            entry.1 = value;
        } else {
            self.entries.push((name, value));
        }
    }

    /// 是否包含指定字段。
    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    /// 按插入顺序迭代。
    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.entries
            .iter()
            .map(|(name, value)| (name.as_str(), value))
    }

    /// 字段数。
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// 是否为空。
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl FromIterator<(String, Value)> for FieldMap {
    fn from_iter<T: IntoIterator<Item = (String, Value)>>(iter: T) -> Self {
        let mut map = Self::new();
        for (name, value) in iter {
            map.insert(name, value);
        }
        map
    }
}

/// 静态组的具体取值。
///
/// 静态组类似结构体：字段直接内联，不引入嵌套消息帧，也不携带类型标识
/// （类型由所在字段的声明决定）。
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StaticGroupValue {
    /// 字段表。
    pub fields: FieldMap,
}

impl StaticGroupValue {
    /// 构造空静态组值。
    pub fn new() -> Self {
        Self::default()
    }

    /// 链式写入字段。
    #[must_use]
    pub fn with(mut self, name: &str, value: Value) -> Self {
        self.fields.insert(name, value);
        self
    }
}

/// 动态组（消息）的运行时表示。
#[derive(Debug, Clone, PartialEq)]
pub struct Message {
    /// 消息类型的限定名；须能在注册表中解析。
    pub name: QName,
    /// 字段表（可空字段缺省时不在表中）。
    pub fields: FieldMap,
    /// 扩展消息（按到达顺序）。
    pub extensions: Box<ExtensionVec>,
}

impl Message {
    /// 构造无字段消息。
    pub fn new(name: QName) -> Self {
        Self {
            name,
            fields: FieldMap::new(),
            extensions: Box::new(new_extension_vec()),
        }
    }

    /// 链式写入字段。
    #[must_use]
    pub fn with(mut self, name: &str, value: Value) -> Self {
        self.fields.insert(name, value);
        self
    }

    /// 链式追加扩展。
    #[must_use]
    pub fn with_extension(mut self, extension: Message) -> Self {
        self.extensions.push(extension);
        self
    }

    /// 按名读取字段。
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.fields.get(name)
    }
}

/// 运行期值（封闭和类型）。
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    /// 布尔。
    Bool(bool),
    /// 有符号整数（含 millitime/nanotime/date）。
    Int(i64),
    /// 无符号整数（含 timeOfDay 族）。
    UInt(u64),
    /// IEEE-754 双精度浮点。
    F64(f64),
    /// decimal 指数/尾数对。
    Decimal(DecimalValue),
    /// UTF-8 字符串。
    String(String),
    /// 字节串（binary 与 fixed 共用）。
    Binary(Vec<u8>),
    /// 枚举符号文本；宽容解码的未知数值以十进制文本作哨兵。
    Enum(String),
    /// 序列。
    Sequence(Vec<Value>),
    /// 静态组。
    Group(StaticGroupValue),
    /// 动态组（嵌套消息）。
    Message(Box<Message>),
}

impl Value {
    /// 便捷构造：字符串值。
    pub fn str(value: &str) -> Self {
        Self::String(value.to_owned())
    }

    /// 便捷构造：枚举符号。
    pub fn symbol(value: &str) -> Self {
        Self::Enum(value.to_owned())
    }

    /// 整数族取无符号视图（接受 `Int`/`UInt`，负数与溢出返回 `None`）。
    pub fn as_u64(&self) -> Option<u64> {
        match self {
            Self::UInt(value) => Some(*value),
            Self::Int(value) => u64::try_from(*value).ok(),
            _ => None,
        }
    }

    /// 整数族取有符号视图（接受 `Int`/`UInt`，溢出返回 `None`）。
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Self::Int(value) => Some(*value),
            Self::UInt(value) => i64::try_from(*value).ok(),
            _ => None,
        }
    }
}

impl From<Message> for Value {
    fn from(message: Message) -> Self {
        Self::Message(Box::new(message))
    }
}

impl From<StaticGroupValue> for Value {
    fn from(group: StaticGroupValue) -> Self {
        Self::Group(group)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// 字段表必须保持插入顺序，重复写入保留原位置。
    #[test]
    fn field_map_preserves_insertion_order() {
        let mut map = FieldMap::new();
        map.insert("b", Value::Int(1));
        map.insert("a", Value::Int(2));
        map.insert("b", Value::Int(3));
        let names: alloc::vec::Vec<&str> = map.iter().map(|(name, _)| name).collect();
        assert_eq!(names, ["b", "a"]);
        assert_eq!(map.get("b"), Some(&Value::Int(3)));
    }
}
