#![cfg_attr(not(feature = "std"), no_std)]
#![warn(missing_docs)]

//! # blink-codec-compact
//!
//! ## 教案目的（Why）
//! - **定位**：Blink beta4 Compact Binary 线格式的编解码器，体积优先的
//!   变长表示，是五种线格式中的默认互换格式。
//! - **架构角色**：消费 `blink-core` 的冻结模式与值模型；动态模式交换
//!   （`blink-dynschema`）在本编解码器之上对保留类型标识分流。
//! - **设计策略**：停止位 VLC（带内空值）、自描述帧长、声明序字段编码、
//!   尾部扩展块，向前兼容由扩展块与宽容跳帧共同承担。
//!
//! ## 交互契约（What）
//! - **编码**：[`encode`] 产出 `length + typeId + fields + extension?` 的
//!   完整帧；编码侧不设宽容模式，约束违反即失败。
//! - **解码**：[`decode_one`]/[`decode_stream`] 精确消费帧体；`strict`
//!   标志递归传播进嵌套动态组与扩展块。
//! - **帧视图**：[`encode_frame`]/[`decode_frame`]/[`iter_frames`] 提供
//!   不触碰字段的原始帧访问。
//!
//! ## 实现策略（How）
//! - VLC 层（[`vlc`]）上报溢出标志而不自行裁决，位宽弱错误由字段层
//!   结合声明类型判定；
//! - 解码器将帧体切片为边界缓冲，嵌套帧在切片内递归，任何越界立即
//!   成为强帧错误。
//!
//! ## 风险提示（Trade-offs）
//! - 解出的值全部是自有拷贝：牺牲零拷贝换取“调用结束即无借用”的
//!   简单生命周期契约；
//! - 嵌套深度未设上限，处理不可信输入的调用方应自行限制输入规模。

extern crate alloc;

pub mod decode;
pub mod encode;
pub mod frame;
pub mod vlc;

pub use decode::{decode_one, decode_stream, Decoder, MessageIter};
pub use encode::encode;
pub use frame::{decode_frame, encode_frame, iter_frames, Frame, FrameIter};
