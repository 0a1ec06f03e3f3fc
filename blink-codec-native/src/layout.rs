//! Native Binary 的定长布局计算。
//!
//! # 教案定位（Why）
//! - Native 格式以随机访问为先：每个字段在定长区内有可预测的槽位，
//!   变长数据经由 `u32` 指针间接寻址。布局函数是编码器与解码器共享的
//!   唯一事实来源，两侧偏移必须逐字节一致。
//!
//! # 契约说明（What）
//! - 指针槽一律 4 字节，指针值是**距帧起点的绝对偏移**，0 表示缺省。
//! - 声明了最大长度且不超过 255 的 string/binary 以 `u8 长度 + 容量`
//!   的形式内联。
//! - 可空字段：内联槽前置一个存在标志字节；指针槽直接以 0 表示缺省，
//!   不加标志字节。

use blink_core::{GroupId, Primitive, Registry, Type};

/// 帧头长度：`u32 size + u64 typeId + u32 extensionOffset`。
pub const HEADER_LEN: usize = 16;

/// 可内联 string/binary 的最大声明长度。
pub const INLINE_MAX: u32 = 255;

/// 该类型的槽位是否为指针（变长数据置于变长区）。
pub fn is_pointer_slot(ty: &Type) -> bool {
    match ty {
        Type::String { max_size } | Type::Binary { max_size } => {
            !matches!(max_size, Some(max) if (1..=INLINE_MAX).contains(max))
        }
        Type::Sequence(_) | Type::DynamicGroup(_) | Type::Object => true,
        _ => false,
    }
}

/// 基础标量的定长宽度。
pub fn primitive_width(primitive: Primitive) -> usize {
    match primitive {
        Primitive::Bool | Primitive::U8 | Primitive::I8 => 1,
        Primitive::U16 | Primitive::I16 => 2,
        Primitive::U32
        | Primitive::I32
        | Primitive::Date
        | Primitive::TimeOfDayMilli => 4,
        Primitive::U64
        | Primitive::I64
        | Primitive::F64
        | Primitive::MilliTime
        | Primitive::NanoTime
        | Primitive::TimeOfDayNano => 8,
        // i8 指数 + i64 尾数。
        Primitive::Decimal => 9,
    }
}

/// 字段值在定长区占用的槽位宽度（不含可空标志字节）。
pub fn slot_size(ty: &Type, registry: &Registry) -> usize {
    match ty {
        Type::Primitive(primitive) => primitive_width(*primitive),
        Type::Enum(_) => 4,
        Type::Fixed { size } => *size as usize,
        Type::String { max_size } | Type::Binary { max_size } => match max_size {
            Some(max) if (1..=INLINE_MAX).contains(max) => 1 + *max as usize,
            _ => 4,
        },
        Type::Sequence(_) | Type::DynamicGroup(_) | Type::Object => 4,
        Type::StaticGroup(group_id) => group_region_size(*group_id, registry),
    }
}

/// 组的线性化字段在定长区占用的总宽度。
pub fn group_region_size(group_id: GroupId, registry: &Registry) -> usize {
    registry
        .all_fields(group_id)
        .map(|field| {
            let presence = usize::from(field.optional && !is_pointer_slot(&field.ty));
            presence + slot_size(&field.ty, registry)
        })
        .sum()
}
