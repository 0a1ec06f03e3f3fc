//! 模式子系统：文本 → 语法树 → 冻结模式。
//!
//! 模式文本只编译一次：[`compile_schema`] 串联词法、语法与解析三个
//! 阶段，产出可直接构建注册表的 [`Schema`](model::Schema)。

pub mod ast;
pub mod lexer;
pub mod model;
pub mod parser;
pub mod resolve;

use crate::error::Result;
use model::Schema;

/// 一次完成模式文本的解析与语义求解。
pub fn compile_schema(text: &str) -> Result<Schema> {
    let ast = parser::parse_schema(text)?;
    resolve::resolve_schema(&ast)
}

/// 读取并编译 `.blink` 模式文件。
#[cfg(feature = "std")]
pub fn load_schema_file(path: impl AsRef<std::path::Path>) -> Result<Schema> {
    use alloc::format;
    let path = path.as_ref();
    let text = std::fs::read_to_string(path).map_err(|err| {
        crate::error::BlinkError::parse(format!("cannot read {}: {err}", path.display()))
    })?;
    compile_schema(&text)
}
