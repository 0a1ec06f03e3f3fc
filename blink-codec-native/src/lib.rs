#![cfg_attr(not(feature = "std"), no_std)]
#![warn(missing_docs)]

//! # blink-codec-native
//!
//! ## 教案目的（Why）
//! - **定位**：Blink beta4 Native Binary 线格式的编解码器。定宽字段落在
//!   可预测偏移上、小端字节序、变长数据经 `u32` 指针寻址，为随机访问
//!   与零散读取优化。
//! - **架构角色**：与 Compact 共用 `blink-core` 的模式与值模型，两种
//!   二进制格式可无损互转。
//! - **设计策略**：布局（[`layout`]）是编码与解码共享的唯一事实来源；
//!   指针全部是距帧起点的绝对偏移，0 表示缺省。
//!
//! ## 交互契约（What）
//! - 帧头 16 字节：`u32 size`（计入自身之后的字节数）+ `u64 typeId` +
//!   `u32 extensionOffset`（0 表示无扩展块）。
//! - 非零指针必须落在 `[定长区末尾, 帧尾)`，否则强帧错误。
//! - 多帧拼接流不在本 crate 的承诺范围：`decode_one` 返回下一偏移，
//!   拼接语义由调用方自负。
//!
//! ## 风险提示（Trade-offs）
//! - 变长区按载荷入队顺序布置，重复载荷不做去重共享；
//! - 嵌套帧自带帧头，空间换取独立解码能力。

extern crate alloc;

pub mod decode;
pub mod encode;
pub mod layout;

pub use decode::{decode_one, Decoder};
pub use encode::encode;
