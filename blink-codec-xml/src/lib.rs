#![cfg_attr(not(feature = "std"), no_std)]
#![warn(missing_docs)]

//! # blink-codec-xml
//!
//! ## 教案目的（Why）
//! - **定位**：Blink beta4 XML 映射的编解码器，服务既有 XML 管道与
//!   模式化文档工具。
//! - **架构角色**：与其余四种线格式共享 `blink-core` 值模型；元素名
//!   取组本地名、命名空间 URI 取 Blink 命名空间字面量。
//!
//! ## 交互契约（What）
//! - 消息元素：`<ns0:Name xmlns:ns0="Ns">字段...</ns0:Name>`；字段是
//!   子元素，序列以重复的 `<item>` 表达，静态组内联字段，动态组内嵌
//!   消息元素。
//! - 扩展块：`blink:extension` 元素，URI
//!   `http://blinkprotocol.org/ns/blink`。
//! - 非 UTF-8 字节串写作 `binary="yes"` 加连写十六进制。
//! - 流是单一 `<root>` 元素下的消息序列。
//!
//! ## 实现策略（How）
//! - 本映射只消费自身写出的 XML 子集，读取器（[`reader`]）据此手写：
//!   元素、属性、五个预定义实体、数字字符引用，不含 DOCTYPE/CDATA。

extern crate alloc;

pub mod decode;
pub mod reader;
pub mod writer;

pub use decode::{decode, decode_stream};
pub use writer::{encode, encode_stream, BLINK_NAMESPACE};
