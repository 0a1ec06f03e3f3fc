#![cfg_attr(not(feature = "std"), no_std)]
#![warn(missing_docs)]

//! # blink-codec-json
//!
//! ## 教案目的（Why）
//! - **定位**：Blink beta4 JSON 映射的编解码器，面向 Web 工具链与
//!   既有 JSON 基础设施的互操作。
//! - **架构角色**：在 `serde_json::Value` 树与 `blink-core` 值模型之间
//!   双向映射；保持插入顺序的对象实现保证输出按字段声明序排列。
//!
//! ## 交互契约（What）
//! - 消息对象以 `"$type"` 标注类型、`"$extension"` 携带扩展数组；
//!   流是消息对象的 JSON 数组。
//! - 数字边界：绝对值达到 1e15 的整数改用字符串；decimal 尾数达到
//!   1e15 时改用 `{"exponent":e,"mantissa":m}` 对象。
//! - 显式 `null` 与键缺失同义。
//!
//! ## 风险提示（Trade-offs）
//! - JSON 数字经由 IEEE-754 双精度通道，往返在文档化的规范化范围内
//!   （如 `100.0` 与 `1000e-1` 归一为相同数值表示）。

extern crate alloc;

pub mod decode;
pub mod encode;

pub use decode::{decode, decode_stream, message_from_json};
pub use encode::{encode, encode_stream, message_to_json, NUMERIC_THRESHOLD};
