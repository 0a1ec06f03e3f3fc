#![cfg_attr(not(feature = "std"), no_std)]
#![warn(missing_docs)]

//! # blink-core
//!
//! ## 教案目的（Why）
//! - **定位**：Blink beta4 协议族的核心契约层，承载模式模型、
//!   类型注册表与运行时值，供五种线格式编解码器共同消费。
//! - **架构角色**：编解码器 crate（compact/native/tag/json/xml）只
//!   依赖本 crate 暴露的冻结模式与值模型；动态模式交换经由注册表的
//!   更新入口回写，核心库自身不持有任何全局状态。
//! - **设计策略**：模式内部互引用以竞技场下标表示，环形引用可直接
//!   建模；运行时值与注册表完全解耦，跨线格式转换语义无损。
//!
//! ## 交互契约（What）
//! - **输入**：UTF-8 的 `.blink` 模式文本（`#` 注释到行尾）；
//! - **输出**：[`Schema`]（冻结快照）、[`Registry`]（索引视图，唯一的
//!   可变资源）、[`Message`] 等运行时值；
//! - **错误面**：统一的 [`BlinkError`]，携带稳定分类与定位信息，
//!   强/弱错误语义见 [`error`] 模块。
//!
//! ## 实现策略（How）
//! - 模式编译分三阶段：词法（行列定位）→ 语法（递归下降）→ 求解
//!   （限定名、继承线性化、注解合并、约束校验）；
//! - 注册表变更全部“先校验、后提交”，失败的更新不留任何痕迹。
//!
//! ## 风险提示（Trade-offs）
//! - 注册表不内置锁：读可并行、写需独占由调用方保证，与协议规范的
//!   单线程变更纪律一致；
//! - `no_std` 构建仅依赖 `alloc`，文件装载等便利入口由 `std`
//!   特性门控。

extern crate alloc;

pub mod error;
pub mod registry;
pub mod schema;
pub mod timefmt;
pub mod value;

pub use error::{BlinkError, ErrorKind, Location, Result, WeakKind};
pub use registry::{FieldDecl, Registry, SchemaUpdate, TypeExpr};
pub use schema::model::{
    annotation_value, AnnotationMap, EnumDef, EnumId, EnumSymbol, FieldDef, GroupDef, GroupId,
    Primitive, QName, Schema, Type, TypeDefEntry, TypeDefId,
};
pub use schema::{compile_schema, parser::parse_schema};
pub use value::{
    new_extension_vec, DecimalValue, ExtensionVec, FieldMap, Message, StaticGroupValue, Value,
    DEFAULT_EXTENSION_CAPACITY,
};

#[cfg(feature = "std")]
pub use schema::load_schema_file;
