//! 类型注册表：模式的索引视图与运行期变更入口。
//!
//! # 教案定位（Why）
//! - 编解码器需要按限定名与数值类型标识两条路径检索组定义；
//!   动态模式交换则需要在运行期向同一份视图注入新定义。
//! - 注册表是整个核心库唯一的可变资源。变更入口全部做
//!   “先校验、后提交”，失败的更新不留下任何可观测状态。
//!
//! # 契约说明（What）
//! - 只读操作可在并行上下文间共享；[`Registry::apply_update`] 与
//!   [`Registry::merge_schema`] 要求独占访问，调用方负责与并发解码
//!   串行化（本库不强加锁原语）。
//! - 所有校验失败均为强错误：重复类型标识、重名、继承环、
//!   线性化字段重名、未知引用。
//!
//! # 实现策略（How）
//! - 底层沿用竞技场模型：更新只会向各 `Vec` 尾部追加或填充
//!   先行声明的空组，已发放的下标永不失效。

use alloc::borrow::ToOwned;
use alloc::boxed::Box;
use alloc::collections::{BTreeMap, BTreeSet};
use alloc::format;
use alloc::string::String;
use alloc::vec::Vec;

use crate::error::{BlinkError, Result};
use crate::schema::model::{
    EnumDef, EnumId, EnumSymbol, FieldDef, GroupDef, GroupId, Primitive, QName, Schema, Type,
    TypeDefEntry, TypeDefId,
};

/// 运行期模式变更中的未解析类型表达式。
///
/// 引用以名字表示，由 [`Registry::apply_update`] 针对当前注册表解析。
#[derive(Debug, Clone, PartialEq)]
pub enum TypeExpr {
    /// 基础标量。
    Primitive(Primitive),
    /// 字符串，可带最大长度。
    String {
        /// 最大字节数。
        max_size: Option<u32>,
    },
    /// 字节串，可带最大长度。
    Binary {
        /// 最大字节数。
        max_size: Option<u32>,
    },
    /// 定长字节串。
    Fixed {
        /// 精确字节数。
        size: u32,
    },
    /// 具名引用；`dynamic` 为真时要求目标是组。
    Named {
        /// 目标名。
        name: QName,
        /// 是否动态引用。
        dynamic: bool,
    },
    /// 随字段给出的内联枚举。
    InlineEnum(Vec<EnumSymbol>),
    /// 序列。
    Sequence(Box<TypeExpr>),
    /// 万能动态引用。
    Object,
}

/// 运行期字段声明。
#[derive(Debug, Clone, PartialEq)]
pub struct FieldDecl {
    /// 字段名。
    pub name: String,
    /// 类型表达式。
    pub ty: TypeExpr,
    /// 是否可空。
    pub optional: bool,
}

/// 一次模式交换产生的注册表变更。
#[derive(Debug, Clone, PartialEq)]
pub enum SchemaUpdate {
    /// 声明组：只登记名称与类型标识，字段后续补全。
    DeclareGroup {
        /// 组名。
        name: QName,
        /// 数值类型标识。
        type_id: u64,
    },
    /// 定义组：补全或新建完整定义。
    DefineGroup {
        /// 组名。
        name: QName,
        /// 数值类型标识（缺省时保留已声明的值）。
        type_id: Option<u64>,
        /// 父组名。
        super_name: Option<QName>,
        /// 字段表。
        fields: Vec<FieldDecl>,
    },
    /// 定义类型别名。
    DefineAlias {
        /// 别名。
        name: QName,
        /// 目标类型。
        ty: TypeExpr,
    },
    /// 追加增量注解。
    Annotate {
        /// 目标组件；`None` 表示模式级注解。
        component: Option<QName>,
        /// 目标成员（字段或枚举符号）。
        member: Option<String>,
        /// 按到达顺序追加的注解。
        annotations: Vec<(QName, String)>,
    },
}

/// 模式的索引视图。
#[derive(Debug, Clone, Default)]
pub struct Registry {
    schema: Schema,
    groups_by_name: BTreeMap<String, GroupId>,
    groups_by_id: BTreeMap<u64, GroupId>,
    enums_by_name: BTreeMap<String, EnumId>,
    typedefs_by_name: BTreeMap<String, TypeDefId>,
}

impl Registry {
    /// 由已解析模式构建注册表。
    pub fn from_schema(schema: Schema) -> Result<Self> {
        let mut registry = Self::default();
        registry.merge_schema(schema)?;
        Ok(registry)
    }

    /// 编译模式文本并构建注册表。
    pub fn from_schema_text(text: &str) -> Result<Self> {
        Self::from_schema(crate::schema::compile_schema(text)?)
    }

    /// 读取 `.blink` 模式文件并构建注册表。
    #[cfg(feature = "std")]
    pub fn from_schema_file(path: impl AsRef<std::path::Path>) -> Result<Self> {
        Self::from_schema(crate::schema::load_schema_file(path)?)
    }

    /// 底层模式快照。
    pub fn schema(&self) -> &Schema {
        &self.schema
    }

    /// 按下标取组定义。
    pub fn group(&self, id: GroupId) -> &GroupDef {
        self.schema.group(id)
    }

    /// 按下标取枚举定义。
    pub fn enum_def(&self, id: EnumId) -> &EnumDef {
        self.schema.enum_def(id)
    }

    /// 线性化字段遍历（父组字段在前）。
    pub fn all_fields(&self, id: GroupId) -> impl Iterator<Item = &FieldDef> {
        self.schema.all_fields(id)
    }

    /// `child` 是否为 `base` 或其派生组。
    pub fn is_descendant(&self, child: GroupId, base: GroupId) -> bool {
        self.schema.is_descendant(child, base)
    }

    /// 按限定名查找组下标。
    pub fn find_group_by_name(&self, name: &QName) -> Option<GroupId> {
        self.groups_by_name.get(&name.key()).copied()
    }

    /// 按类型标识查找组下标。
    pub fn find_group_by_id(&self, type_id: u64) -> Option<GroupId> {
        self.groups_by_id.get(&type_id).copied()
    }

    /// 按限定名取组定义，未注册时返回强错误。
    pub fn get_group_by_name(&self, name: &QName) -> Result<&GroupDef> {
        self.find_group_by_name(name)
            .map(|id| self.schema.group(id))
            .ok_or_else(|| BlinkError::resolve(format!("unknown group {name}")))
    }

    /// 按类型标识取组定义，未注册时返回强错误。
    pub fn get_group_by_id(&self, type_id: u64) -> Result<&GroupDef> {
        self.find_group_by_id(type_id)
            .map(|id| self.schema.group(id))
            .ok_or_else(|| BlinkError::resolve(format!("unknown type id {type_id}")))
    }

    /// 按限定名取枚举定义。
    pub fn enum_by_name(&self, name: &QName) -> Result<&EnumDef> {
        self.enums_by_name
            .get(&name.key())
            .map(|id| self.schema.enum_def(*id))
            .ok_or_else(|| BlinkError::resolve(format!("unknown enum {name}")))
    }

    /// 按限定名取类型别名展开后的类型。
    pub fn typedef_by_name(&self, name: &QName) -> Result<&Type> {
        self.typedefs_by_name
            .get(&name.key())
            .map(|id| &self.schema.typedef(*id).ty)
            .ok_or_else(|| BlinkError::resolve(format!("unknown type definition {name}")))
    }

    /// 是否存在指定限定名的组。
    pub fn contains(&self, name: &QName) -> bool {
        self.groups_by_name.contains_key(&name.key())
    }

    /// 已登记的全部类型标识。
    pub fn known_type_ids(&self) -> impl Iterator<Item = u64> + '_ {
        self.groups_by_id.keys().copied()
    }

    fn name_in_use(&self, key: &str) -> bool {
        self.groups_by_name.contains_key(key)
            || self.enums_by_name.contains_key(key)
            || self.typedefs_by_name.contains_key(key)
    }

    /// 合并另一份已解析模式（用于装载自描述模式等场景）。
    ///
    /// ### 契约说明（What）
    /// - 任何名称（跨组/枚举/别名）或类型标识冲突都使合并整体失败，
    ///   注册表保持原状。
    /// - 合并后，传入模式中的下标全部重定位，调用方不得继续使用
    ///   原下标。
    pub fn merge_schema(&mut self, other: Schema) -> Result<()> {
        // 校验：名称与类型标识都不得冲突。
        for (_, group) in other.groups() {
            let key = group.name.key();
            if self.name_in_use(&key) {
                return Err(BlinkError::schema_update(format!(
                    "name {key} is already registered"
                )));
            }
            if let Some(type_id) = group.type_id {
                if self.groups_by_id.contains_key(&type_id) {
                    return Err(BlinkError::schema_update(format!(
                        "type id {type_id} is already registered"
                    )));
                }
            }
        }
        for (_, def) in other.enums() {
            if self.name_in_use(&def.name.key()) {
                return Err(BlinkError::schema_update(format!(
                    "name {} is already registered",
                    def.name
                )));
            }
        }
        for (_, def) in other.typedefs() {
            if self.name_in_use(&def.name.key()) {
                return Err(BlinkError::schema_update(format!(
                    "name {} is already registered",
                    def.name
                )));
            }
        }

        // 提交：重定位下标后逐项追加。
        let group_offset = self.schema.groups.len() as u32;
        let enum_offset = self.schema.enums.len() as u32;
        let Schema {
            namespace,
            annotations,
            groups,
            enums,
            typedefs,
        } = other;
        if self.schema.namespace.is_none() {
            self.schema.namespace = namespace;
        }
        self.schema.annotations.extend(annotations);
        for mut group in groups {
            group.super_id = group.super_id.map(|id| GroupId(id.0 + group_offset));
            for field in &mut group.fields {
                rebase_type(&mut field.ty, group_offset, enum_offset);
            }
            let id = GroupId(self.schema.groups.len() as u32);
            self.groups_by_name.insert(group.name.key(), id);
            if let Some(type_id) = group.type_id {
                self.groups_by_id.insert(type_id, id);
            }
            self.schema.groups.push(group);
        }
        for def in enums {
            let id = EnumId(self.schema.enums.len() as u32);
            self.enums_by_name.insert(def.name.key(), id);
            self.schema.enums.push(def);
        }
        for mut def in typedefs {
            rebase_type(&mut def.ty, group_offset, enum_offset);
            let id = TypeDefId(self.schema.typedefs.len() as u32);
            self.typedefs_by_name.insert(def.name.key(), id);
            self.schema.typedefs.push(def);
        }
        Ok(())
    }

    /// 应用一次模式交换变更；失败时注册表保持原状。
    pub fn apply_update(&mut self, update: SchemaUpdate) -> Result<()> {
        match update {
            SchemaUpdate::DeclareGroup { name, type_id } => self.apply_declare(name, type_id),
            SchemaUpdate::DefineGroup {
                name,
                type_id,
                super_name,
                fields,
            } => self.apply_define(name, type_id, super_name, fields),
            SchemaUpdate::DefineAlias { name, ty } => self.apply_alias(name, ty),
            SchemaUpdate::Annotate {
                component,
                member,
                annotations,
            } => self.apply_annotate(component, member, annotations),
        }
    }

    fn apply_declare(&mut self, name: QName, type_id: u64) -> Result<()> {
        let key = name.key();
        if let Some(existing) = self.groups_by_id.get(&type_id) {
            if self.schema.group(*existing).name.key() != key {
                return Err(BlinkError::schema_update(format!(
                    "type id {type_id} is already registered"
                )));
            }
        }
        match self.groups_by_name.get(&key).copied() {
            Some(id) => {
                let current = self.schema.group(id).type_id;
                match current {
                    None => {
                        self.schema.groups[id.0 as usize].type_id = Some(type_id);
                        self.groups_by_id.insert(type_id, id);
                        Ok(())
                    }
                    Some(existing) if existing == type_id => Ok(()),
                    Some(existing) => Err(BlinkError::schema_update(format!(
                        "group {name} already has type id {existing}"
                    ))),
                }
            }
            None => {
                if self.name_in_use(&key) {
                    return Err(BlinkError::schema_update(format!(
                        "name {key} is already registered"
                    )));
                }
                let id = GroupId(self.schema.groups.len() as u32);
                self.schema.groups.push(GroupDef {
                    name,
                    type_id: Some(type_id),
                    super_id: None,
                    fields: Vec::new(),
                    annotations: Vec::new(),
                });
                self.groups_by_name.insert(key, id);
                self.groups_by_id.insert(type_id, id);
                Ok(())
            }
        }
    }

    fn apply_define(
        &mut self,
        name: QName,
        type_id: Option<u64>,
        super_name: Option<QName>,
        fields: Vec<FieldDecl>,
    ) -> Result<()> {
        let key = name.key();
        let existing = self.groups_by_name.get(&key).copied();
        if let Some(id) = existing {
            let group = self.schema.group(id);
            if !group.fields.is_empty() || group.super_id.is_some() {
                return Err(BlinkError::schema_update(format!(
                    "group {name} is already defined"
                )));
            }
        } else if self.name_in_use(&key) {
            return Err(BlinkError::schema_update(format!(
                "name {key} is already registered"
            )));
        }

        // 类型标识冲突与一致性。
        if let Some(requested) = type_id {
            if let Some(holder) = self.groups_by_id.get(&requested) {
                if self.schema.group(*holder).name.key() != key {
                    return Err(BlinkError::schema_update(format!(
                        "type id {requested} is already registered"
                    )));
                }
            }
            if let Some(id) = existing {
                if let Some(current) = self.schema.group(id).type_id {
                    if current != requested {
                        return Err(BlinkError::schema_update(format!(
                            "group {name} already has type id {current}"
                        )));
                    }
                }
            }
        }

        // 父组解析与环校验。
        let super_id = match &super_name {
            None => None,
            Some(raw) => {
                let id = self
                    .groups_by_name
                    .get(&raw.key())
                    .copied()
                    .ok_or_else(|| {
                        BlinkError::schema_update(format!("unknown super group {raw}"))
                    })?;
                if let Some(target) = existing {
                    if self.schema.is_descendant(id, target) {
                        return Err(BlinkError::schema_update(format!(
                            "cyclic inheritance involving {name}"
                        )));
                    }
                }
                Some(id)
            }
        };

        // 类型表达式干跑校验（不产生任何提交）。
        let mut planned_enum_names = BTreeSet::new();
        for field in &fields {
            self.validate_expr(&field.ty, &name, &field.name, &mut planned_enum_names)?;
        }

        // 线性化字段名唯一性：父链字段 + 新字段。
        let mut seen: BTreeSet<String> = BTreeSet::new();
        if let Some(super_id) = super_id {
            for field in self.schema.all_fields(super_id) {
                if !seen.insert(field.name.clone()) {
                    return Err(BlinkError::schema_update(format!(
                        "duplicate field {} in {name}",
                        field.name
                    )));
                }
            }
        }
        for field in &fields {
            if !seen.insert(field.name.clone()) {
                return Err(BlinkError::schema_update(format!(
                    "duplicate field {} in {name}",
                    field.name
                )));
            }
        }

        // 已有派生组的线性化也不得因本次补全产生重名。
        if let Some(target) = existing {
            for (derived_id, derived) in self.schema.groups() {
                if derived_id == target || !self.schema.is_descendant(derived_id, target) {
                    continue;
                }
                let mut names: BTreeSet<&str> = seen.iter().map(String::as_str).collect();
                let mut chain = Vec::new();
                let mut current = Some(derived_id);
                while let Some(group_id) = current {
                    if group_id == target {
                        break;
                    }
                    chain.push(group_id);
                    current = self.schema.group(group_id).super_id;
                }
                for group_id in chain.into_iter().rev() {
                    for field in &self.schema.group(group_id).fields {
                        if !names.insert(field.name.as_str()) {
                            return Err(BlinkError::schema_update(format!(
                                "duplicate field {} in {}",
                                field.name, derived.name
                            )));
                        }
                    }
                }
            }
        }

        // 提交。
        let mut built_fields = Vec::with_capacity(fields.len());
        for field in fields {
            let ty = self.build_expr(field.ty, &name, &field.name)?;
            built_fields.push(FieldDef {
                name: field.name,
                ty,
                optional: field.optional,
                annotations: Vec::new(),
            });
        }
        match existing {
            Some(id) => {
                let group = &mut self.schema.groups[id.0 as usize];
                group.super_id = super_id;
                group.fields = built_fields;
                if let Some(requested) = type_id {
                    if group.type_id.is_none() {
                        group.type_id = Some(requested);
                        self.groups_by_id.insert(requested, id);
                    }
                }
            }
            None => {
                let id = GroupId(self.schema.groups.len() as u32);
                self.schema.groups.push(GroupDef {
                    name,
                    type_id,
                    super_id,
                    fields: built_fields,
                    annotations: Vec::new(),
                });
                self.groups_by_name.insert(key, id);
                if let Some(requested) = type_id {
                    self.groups_by_id.insert(requested, id);
                }
            }
        }
        Ok(())
    }

    fn apply_alias(&mut self, name: QName, ty: TypeExpr) -> Result<()> {
        let key = name.key();
        if self.name_in_use(&key) {
            return Err(BlinkError::schema_update(format!(
                "name {key} is already registered"
            )));
        }
        let mut planned = BTreeSet::new();
        self.validate_expr(&ty, &name, "type", &mut planned)?;
        let built = self.build_expr(ty, &name, "type")?;
        let id = TypeDefId(self.schema.typedefs.len() as u32);
        self.schema.typedefs.push(TypeDefEntry {
            name,
            ty: built,
            annotations: Vec::new(),
        });
        self.typedefs_by_name.insert(key, id);
        Ok(())
    }

    fn apply_annotate(
        &mut self,
        component: Option<QName>,
        member: Option<String>,
        annotations: Vec<(QName, String)>,
    ) -> Result<()> {
        let Some(component) = component else {
            self.schema.annotations.extend(annotations);
            return Ok(());
        };
        let key = component.key();
        if let Some(id) = self.groups_by_name.get(&key).copied() {
            let group = &mut self.schema.groups[id.0 as usize];
            match member {
                None => group.annotations.extend(annotations),
                Some(member) => {
                    let field = group
                        .fields
                        .iter_mut()
                        .find(|field| field.name == member)
                        .ok_or_else(|| {
                            BlinkError::schema_update(format!(
                                "unknown field {member} on {key}"
                            ))
                        })?;
                    field.annotations.extend(annotations);
                }
            }
            return Ok(());
        }
        if let Some(id) = self.enums_by_name.get(&key).copied() {
            let def = &mut self.schema.enums[id.0 as usize];
            match member {
                None => def.annotations.extend(annotations),
                Some(member) => {
                    let symbol = def
                        .symbols
                        .iter_mut()
                        .find(|symbol| symbol.name == member)
                        .ok_or_else(|| {
                            BlinkError::schema_update(format!(
                                "unknown enum symbol {member} on {key}"
                            ))
                        })?;
                    symbol.annotations.extend(annotations);
                }
            }
            return Ok(());
        }
        if let Some(id) = self.typedefs_by_name.get(&key).copied() {
            if member.is_some() {
                return Err(BlinkError::schema_update(format!(
                    "type definition {key} has no members"
                )));
            }
            self.schema.typedefs[id.0 as usize]
                .annotations
                .extend(annotations);
            return Ok(());
        }
        Err(BlinkError::schema_update(format!(
            "unknown component {key} for incremental annotation"
        )))
    }

    /// 类型表达式干跑校验：只读，不提交任何状态。
    fn validate_expr(
        &self,
        expr: &TypeExpr,
        group: &QName,
        field: &str,
        planned_enums: &mut BTreeSet<String>,
    ) -> Result<()> {
        match expr {
            TypeExpr::Primitive(_) | TypeExpr::Object => Ok(()),
            TypeExpr::String { .. } | TypeExpr::Binary { .. } => Ok(()),
            TypeExpr::Fixed { size } => {
                if *size == 0 {
                    return Err(BlinkError::schema_update(
                        "fixed type requires a positive size",
                    ));
                }
                Ok(())
            }
            TypeExpr::Named { name, dynamic } => {
                let key = name.key();
                if self.groups_by_name.contains_key(&key) {
                    return Ok(());
                }
                if *dynamic {
                    return Err(BlinkError::schema_update(format!(
                        "dynamic reference {key} must target a group"
                    )));
                }
                if self.enums_by_name.contains_key(&key)
                    || self.typedefs_by_name.contains_key(&key)
                {
                    return Ok(());
                }
                Err(BlinkError::schema_update(format!("unknown type {key}")))
            }
            TypeExpr::InlineEnum(symbols) => {
                let synthetic = inline_enum_name(group, field).key();
                if self.name_in_use(&synthetic) || !planned_enums.insert(synthetic.clone()) {
                    return Err(BlinkError::schema_update(format!(
                        "name {synthetic} is already registered"
                    )));
                }
                let mut names = BTreeSet::new();
                let mut values = BTreeSet::new();
                for symbol in symbols {
                    if !names.insert(symbol.name.as_str()) || !values.insert(symbol.value) {
                        return Err(BlinkError::schema_update(format!(
                            "duplicate enum symbol {} in {synthetic}",
                            symbol.name
                        )));
                    }
                }
                Ok(())
            }
            TypeExpr::Sequence(element) => {
                if matches!(**element, TypeExpr::Sequence(_)) {
                    return Err(BlinkError::schema_update(
                        "nested sequences are not allowed",
                    ));
                }
                self.validate_expr(element, group, field, planned_enums)
            }
        }
    }

    /// 提交期类型构建；调用前必须通过 [`Self::validate_expr`]。
    fn build_expr(&mut self, expr: TypeExpr, group: &QName, field: &str) -> Result<Type> {
        Ok(match expr {
            TypeExpr::Primitive(primitive) => Type::Primitive(primitive),
            TypeExpr::String { max_size } => Type::String { max_size },
            TypeExpr::Binary { max_size } => Type::Binary { max_size },
            TypeExpr::Fixed { size } => Type::Fixed { size },
            TypeExpr::Object => Type::Object,
            TypeExpr::Named { name, dynamic } => {
                let key = name.key();
                if let Some(id) = self.groups_by_name.get(&key).copied() {
                    if dynamic {
                        Type::DynamicGroup(id)
                    } else {
                        Type::StaticGroup(id)
                    }
                } else if let Some(id) = self.enums_by_name.get(&key).copied() {
                    Type::Enum(id)
                } else {
                    self.typedef_by_name(&name)?.clone()
                }
            }
            TypeExpr::InlineEnum(symbols) => {
                let id = EnumId(self.schema.enums.len() as u32);
                let name = inline_enum_name(group, field);
                self.enums_by_name.insert(name.key(), id);
                self.schema.enums.push(EnumDef {
                    name,
                    symbols,
                    annotations: Vec::new(),
                });
                Type::Enum(id)
            }
            TypeExpr::Sequence(element) => {
                Type::Sequence(Box::new(self.build_expr(*element, group, field)?))
            }
        })
    }
}

/// 内联枚举的合成限定名：`组名.字段名`。
fn inline_enum_name(group: &QName, field: &str) -> QName {
    QName {
        namespace: group.namespace.clone(),
        name: format!("{}.{field}", group.name),
    }
}

/// 合并模式时重定位类型中的竞技场下标。
fn rebase_type(ty: &mut Type, group_offset: u32, enum_offset: u32) {
    match ty {
        Type::Enum(id) => id.0 += enum_offset,
        Type::StaticGroup(id) | Type::DynamicGroup(id) => id.0 += group_offset,
        Type::Sequence(element) => rebase_type(element, group_offset, enum_offset),
        _ => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn demo_registry() -> Registry {
        Registry::from_schema_text(
            "namespace Demo\n\
             Base/1 -> u32 Id\n\
             Extra/2 : Base -> string Tag\n",
        )
        .unwrap()
    }

    /// 声明后定义的两段式流程应使新组可按名与标识检索。
    #[test]
    fn declare_then_define() {
        let mut registry = demo_registry();
        registry
            .apply_update(SchemaUpdate::DeclareGroup {
                name: QName::new(Some("Demo"), "Greeting"),
                type_id: 9000,
            })
            .unwrap();
        registry
            .apply_update(SchemaUpdate::DefineGroup {
                name: QName::new(Some("Demo"), "Greeting"),
                type_id: Some(9000),
                super_name: None,
                fields: alloc::vec![FieldDecl {
                    name: String::from("Text"),
                    ty: TypeExpr::String { max_size: None },
                    optional: false,
                }],
            })
            .unwrap();
        let group = registry.get_group_by_id(9000).unwrap();
        assert_eq!(group.name.name, "Greeting");
        assert_eq!(group.fields.len(), 1);
    }

    /// 重复类型标识的更新必须被拒绝且不留痕迹。
    #[test]
    fn duplicate_type_id_is_rejected_atomically() {
        let mut registry = demo_registry();
        let before = registry.known_type_ids().count();
        let err = registry
            .apply_update(SchemaUpdate::DeclareGroup {
                name: QName::new(Some("Demo"), "Clash"),
                type_id: 1,
            })
            .unwrap_err();
        assert_eq!(err.kind(), crate::error::ErrorKind::SchemaUpdate);
        assert_eq!(registry.known_type_ids().count(), before);
        assert!(!registry.contains(&QName::new(Some("Demo"), "Clash")));
    }

    /// 补全先行声明的父组时，派生组的线性化重名必须被察觉。
    #[test]
    fn late_super_definition_checks_derived_groups() {
        let mut registry = demo_registry();
        registry
            .apply_update(SchemaUpdate::DeclareGroup {
                name: QName::new(Some("Demo"), "Late"),
                type_id: 50,
            })
            .unwrap();
        registry
            .apply_update(SchemaUpdate::DefineGroup {
                name: QName::new(Some("Demo"), "Child"),
                type_id: Some(51),
                super_name: Some(QName::new(Some("Demo"), "Late")),
                fields: alloc::vec![FieldDecl {
                    name: String::from("Tag"),
                    ty: TypeExpr::String { max_size: None },
                    optional: false,
                }],
            })
            .unwrap();
        let err = registry
            .apply_update(SchemaUpdate::DefineGroup {
                name: QName::new(Some("Demo"), "Late"),
                type_id: None,
                super_name: None,
                fields: alloc::vec![FieldDecl {
                    name: String::from("Tag"),
                    ty: TypeExpr::Primitive(Primitive::U8),
                    optional: false,
                }],
            })
            .unwrap_err();
        assert_eq!(err.kind(), crate::error::ErrorKind::SchemaUpdate);
    }
}
