#![cfg_attr(not(feature = "std"), no_std)]
#![warn(missing_docs)]

//! # blink-codec-tag
//!
//! ## 教案目的（Why）
//! - **定位**：Blink beta4 Tag 文本格式的编解码器，单行人类可读形式，
//!   面向日志、诊断与手工构造测试载荷的场景。
//! - **架构角色**：与二进制格式共享 `blink-core` 的值模型，任何消息在
//!   Tag 与 Compact/Native 之间往返语义无损。
//!
//! ## 交互契约（What）
//! - 线格式：`@Ns:Name|field=value|...|[ext1;ext2]`；一行一条消息，
//!   流中的空行与 `#` 注释行被跳过。
//! - 分隔约定：字段间 `|`，序列元素与扩展消息间 `;`，静态组字段间
//!   `,`；`[...]` 包裹序列与扩展块，`{...}` 包裹组字面量。
//! - 字面量：布尔 `Y`/`N`；`f64` 接受 `Inf`/`-Inf`/`NaN`；时间族为
//!   ISO-8601 文本；字节串为 `[3e 6d 4a]` 形式的十六进制列表。
//!
//! ## 风险提示（Trade-offs）
//! - 文本格式不设严格/宽容开关：未声明的字段名在解析时被静默忽略，
//!   以容纳新旧模式混用的日志流。

extern crate alloc;

pub mod escape;
pub mod fmt;
pub mod parse;

pub use fmt::{encode, encode_stream};
pub use parse::{decode, decode_stream};
