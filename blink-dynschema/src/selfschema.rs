//! Blink 自描述模式：描述模式交换消息自身的那份模式。
//!
//! # 教案定位（Why）
//! - 模式交换帧（保留类型标识 16000..=16383）的载荷用 Blink 自己的
//!   模式描述。把它作为 `.blink` 文本内嵌，装载路径与用户模式完全
//!   一致，交换层不需要任何特殊的手工注册。
//! - 规范文档与线上实现对部分组的保留标识存在分歧（TypeDef/FieldDef
//!   等），因此同时携带两份映射：`Shipped`（线上实测）与
//!   `Documented`（规范文档），由调用方按对端口径选择。
//!
//! # 契约说明（What）
//! - 两个变体的组形状一致，仅 `/typeid` 标注不同；
//! - `GroupDecl/16000` 与 `GroupDef/16001` 在两个变体中相同。

use blink_core::error::Result;
use blink_core::Registry;

/// 保留类型标识区间下界。
pub const RESERVED_TYPE_ID_MIN: u64 = 16000;
/// 保留类型标识区间上界（含）。
pub const RESERVED_TYPE_ID_MAX: u64 = 16383;

/// `type_id` 是否落在模式交换的保留区间。
pub fn is_reserved(type_id: u64) -> bool {
    (RESERVED_TYPE_ID_MIN..=RESERVED_TYPE_ID_MAX).contains(&type_id)
}

/// 自描述模式的标识映射变体。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SelfSchemaVariant {
    /// 线上实现采用的映射（默认）。
    #[default]
    Shipped,
    /// 规范文档记载的映射。
    Documented,
}

impl SelfSchemaVariant {
    /// 该变体的 `.blink` 模式文本。
    pub fn schema_text(self) -> &'static str {
        match self {
            Self::Shipped => SHIPPED_SCHEMA,
            Self::Documented => DOCUMENTED_SCHEMA,
        }
    }
}

/// 将自描述模式并入注册表；与既有定义的任何冲突都使装载失败。
pub fn install_self_schema(registry: &mut Registry, variant: SelfSchemaVariant) -> Result<()> {
    let schema = blink_core::compile_schema(variant.schema_text())?;
    registry.merge_schema(schema)
}

/// 线上实测的标识映射。
const SHIPPED_SCHEMA: &str = "\
namespace Blink

NsName -> string Ns?, string Name
Annotation -> NsName Name, string Value
Annotated -> Annotation [] Annotations

TypeDef
Ref/16003 : TypeDef -> NsName Type
DynRef/16004 : TypeDef -> NsName Type
Sequence/16005 : TypeDef -> TypeDef * Type
String/16006 : TypeDef -> u32 MaxSize?
Binary/16007 : TypeDef -> u32 MaxSize?
Fixed/16008 : TypeDef -> u32 Size
Symbol -> string Name, i32 Value
Enum/16009 : TypeDef -> Symbol [] Symbols
U8/16010 : TypeDef
I8/16011 : TypeDef
U16/16012 : TypeDef
I16/16013 : TypeDef
U32/16014 : TypeDef
I32/16015 : TypeDef
U64/16016 : TypeDef
I64/16017 : TypeDef
F64/16018 : TypeDef
Decimal/16019 : TypeDef
MilliTime/16020 : TypeDef
NanoTime/16021 : TypeDef
Date/16022 : TypeDef
TimeOfDayMilli/16023 : TypeDef
TimeOfDayNano/16024 : TypeDef
Bool/16025 : TypeDef
Object/16026 : TypeDef

FieldDef -> string Name, TypeDef * Type, bool Optional
GroupDecl/16000 -> NsName Name, u64 Id
GroupDef/16001 -> NsName Name, u64 Id?, NsName Super?, FieldDef [] Fields
Define/16002 -> NsName Name, TypeDef * Type
SchemaAnnotation/16027 -> NsName Component?, string Member?, Annotation [] Annotations
";

/// 规范文档记载的标识映射。
const DOCUMENTED_SCHEMA: &str = "\
namespace Blink

NsName -> string Ns?, string Name
Annotation/16039 -> NsName Name, string Value
Annotated/16038 -> Annotation [] Annotations

TypeDef/16004
Ref/16010 : TypeDef -> NsName Type
DynRef/16011 : TypeDef -> NsName Type
Sequence/16012 : TypeDef -> TypeDef * Type
String/16013 : TypeDef -> u32 MaxSize?
Binary/16014 : TypeDef -> u32 MaxSize?
Fixed/16015 : TypeDef -> u32 Size
FixedDec/16016 : TypeDef -> u8 Scale
Number/16017 : TypeDef
Symbol/16019 -> string Name, i32 Value
Enum/16018 : TypeDef -> Symbol [] Symbols
U8/16020 : TypeDef
I8/16021 : TypeDef
U16/16022 : TypeDef
I16/16023 : TypeDef
U32/16024 : TypeDef
I32/16025 : TypeDef
U64/16026 : TypeDef
I64/16027 : TypeDef
F64/16028 : TypeDef
Bool/16029 : TypeDef
Decimal/16030 : TypeDef
NanoTime/16031 : TypeDef
MilliTime/16032 : TypeDef
Date/16033 : TypeDef
TimeOfDayMilli/16034 : TypeDef
TimeOfDayNano/16035 : TypeDef
Object/16036 : TypeDef

FieldDef/16002 -> string Name, TypeDef * Type, bool Optional
GroupDecl/16000 -> NsName Name, u64 Id
GroupDef/16001 -> NsName Name, u64 Id?, NsName Super?, FieldDef [] Fields
Define/16003 -> NsName Name, TypeDef * Type
SchemaAnnotation/16037 -> NsName Component?, string Member?, Annotation [] Annotations
";
