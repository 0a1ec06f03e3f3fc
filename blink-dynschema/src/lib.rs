#![cfg_attr(not(feature = "std"), no_std)]
#![warn(missing_docs)]

//! # blink-dynschema
//!
//! ## 教案目的（Why）
//! - **定位**：Blink beta4 动态模式交换。字节流中落在保留类型标识
//!   区间（16000..=16383）的帧不是应用消息，而是驱动注册表变更的
//!   内联模式片段。
//! - **架构角色**：在 Compact 解码器之上做一次类型标识分流；自描述
//!   模式以 `.blink` 文本内嵌并走与用户模式完全一致的编译与装载
//!   路径。
//!
//! ## 交互契约（What）
//! - 使用前先以 [`install_self_schema`] 把自描述模式并入注册表；
//! - [`decode_stream_with_exchange`] 静默应用交换帧、只产出应用消息；
//!   交换帧的生效严格先于后续帧的解码；
//! - 违反注册表不变量的交换帧是强错误且不产生部分变更。
//!
//! ## 风险提示（Trade-offs）
//! - 自描述模式的保留标识存在文档/实现两种口径
//!   （[`SelfSchemaVariant`]），互操作时必须与对端一致。

extern crate alloc;

pub mod exchange;
pub mod selfschema;

pub use exchange::{
    decode_stream_with_exchange, encode_transport, message_to_update, ExchangeIter,
};
pub use selfschema::{
    install_self_schema, is_reserved, SelfSchemaVariant, RESERVED_TYPE_ID_MAX,
    RESERVED_TYPE_ID_MIN,
};
