//! Blink 运行时统一错误域。
//!
//! # 教案定位（Why）
//! - 编解码器、模式解析器与注册表需要向调用方报告机器可分类的失败原因，
//!   供严格/宽容两种解码模式做出不同决策。
//! - 错误分级遵循协议规范：强错误（Strong）立即中止当前操作；
//!   弱错误（Weak）在严格模式下升级为失败，在宽容模式下被记录并恢复。
//!
//! # 契约说明（What）
//! - [`BlinkError`] 携带 `kind`（稳定分类）、`message`（人类可读描述）与
//!   `location`（二进制字节偏移、文本行列或字段路径）。
//! - 所有变体均实现 `Clone`/`PartialEq`，便于测试直接断言具体错误类别。
//!
//! # 设计考量（How）
//! - 仅存储整型与 `String`，保证在 `no_std + alloc` 环境中可用。
//! - 通过 `Display` 输出诊断文本，配合 `#[cfg(feature = "std")]` 的
//!   `Error` 实现接入常规错误栈。

use alloc::string::String;
use core::fmt;

/// 错误分类，对应协议规范中的失败类别。
///
/// ## 契约定义（What）
/// - `Parse`/`Resolve`/`Framing`/`Value`/`SchemaUpdate` 恒为强错误；
/// - `Weak` 的处置取决于解码模式：严格模式中止，宽容模式记录后继续。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// 模式文本词法或语法错误。
    Parse,
    /// 名称解析、继承或约束校验失败。
    Resolve,
    /// 帧边界损坏：截断、长度不符、VLC 终止符缺失、指针越界。
    Framing,
    /// 值级约束失败：必填字段缺失、fixed 长度不符、decimal 尾数非法。
    Value,
    /// 可恢复的弱错误，细分原因见 [`WeakKind`]。
    Weak(WeakKind),
    /// 模式交换消息违反注册表不变量。
    SchemaUpdate,
}

/// 弱错误的具体原因。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WeakKind {
    /// 注册表中不存在该类型标识。
    UnknownTypeId,
    /// 字节序列不是合法 UTF-8。
    InvalidUtf8,
    /// 整数超出字段声明的位宽。
    IntOutOfRange,
    /// 枚举数值没有对应符号。
    UnmappedEnum,
    /// 动态组的实际类型不是声明基类型或其派生（W15）。
    BaseTypeMismatch,
    /// string/binary 超过声明的最大长度。
    OverMaxSize,
    /// 存在标志字节不是 0x01 / 0xC0。
    InvalidPresence,
}

/// 错误定位信息。
///
/// 二进制输入用字节偏移，文本输入用行列，语义错误用字段路径。
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum Location {
    /// 无定位信息。
    #[default]
    None,
    /// 距输入缓冲起点的字节偏移。
    Byte(usize),
    /// 文本输入的行列（均从 1 开始）。
    Text {
        /// 行号。
        line: u32,
        /// 列号。
        column: u32,
    },
    /// 字段路径，如 `Company.CEO.Name`。
    Field(String),
}

/// Blink 核心库的统一错误类型。
///
/// ### 设计意图（Why）
/// - 单一错误类型贯穿解析、解析后校验与全部五种编解码器，
///   调用方只需按 `kind` 分派，无须理解内部模块划分。
///
/// ### 使用契约（What）
/// - 构造后错误即拥有全部所有权，可跨线程移动；
/// - `at_byte`/`at_line_col`/`in_field` 以 Builder 风格补充定位信息，
///   后设置者覆盖先设置者。
#[derive(Debug, Clone, PartialEq)]
pub struct BlinkError {
    kind: ErrorKind,
    message: String,
    location: Location,
}

impl BlinkError {
    /// 以指定分类与消息构造错误。
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            location: Location::None,
        }
    }

    /// 构造模式文本解析错误。
    pub fn parse(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Parse, message)
    }

    /// 构造名称解析/约束校验错误。
    pub fn resolve(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Resolve, message)
    }

    /// 构造帧边界错误。
    pub fn framing(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Framing, message)
    }

    /// 构造值级错误。
    pub fn value(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Value, message)
    }

    /// 构造弱错误。
    pub fn weak(kind: WeakKind, message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Weak(kind), message)
    }

    /// 构造模式交换错误。
    pub fn schema_update(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::SchemaUpdate, message)
    }

    /// 附加字节偏移定位。
    #[must_use]
    pub fn at_byte(mut self, offset: usize) -> Self {
        self.location = Location::Byte(offset);
        self
    }

    /// 附加文本行列定位。
    #[must_use]
    pub fn at_line_col(mut self, line: u32, column: u32) -> Self {
        self.location = Location::Text { line, column };
        self
    }

    /// 附加字段路径定位。
    #[must_use]
    pub fn in_field(mut self, path: impl Into<String>) -> Self {
        self.location = Location::Field(path.into());
        self
    }

    /// 错误分类。
    pub fn kind(&self) -> ErrorKind {
        self.kind
    }

    /// 人类可读的错误描述。
    pub fn message(&self) -> &str {
        &self.message
    }

    /// 定位信息。
    pub fn location(&self) -> &Location {
        &self.location
    }

    /// 该错误是否为弱错误。
    pub fn is_weak(&self) -> bool {
        matches!(self.kind, ErrorKind::Weak(_))
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Parse => f.write_str("parse"),
            Self::Resolve => f.write_str("resolve"),
            Self::Framing => f.write_str("framing"),
            Self::Value => f.write_str("value"),
            Self::Weak(weak) => write!(f, "weak:{weak}"),
            Self::SchemaUpdate => f.write_str("schema-update"),
        }
    }
}

impl fmt::Display for WeakKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            Self::UnknownTypeId => "unknown-type-id",
            Self::InvalidUtf8 => "invalid-utf8",
            Self::IntOutOfRange => "int-out-of-range",
            Self::UnmappedEnum => "unmapped-enum",
            Self::BaseTypeMismatch => "base-type-mismatch",
            Self::OverMaxSize => "over-max-size",
            Self::InvalidPresence => "invalid-presence",
        };
        f.write_str(text)
    }
}

impl fmt::Display for BlinkError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.kind, self.message)?;
        match &self.location {
            Location::None => Ok(()),
            Location::Byte(offset) => write!(f, " (byte {offset})"),
            Location::Text { line, column } => write!(f, " (line {line}, column {column})"),
            Location::Field(path) => write!(f, " (field {path})"),
        }
    }
}

#[cfg(feature = "std")]
impl std::error::Error for BlinkError {}

/// Blink 核心库统一的 `Result` 别名。
pub type Result<T> = core::result::Result<T, BlinkError>;
