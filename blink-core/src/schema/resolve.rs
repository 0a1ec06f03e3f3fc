//! 语法树到模式模型的解析阶段。
//!
//! # 教案定位（Why）
//! - 语法树只是文本的结构化镜像；本阶段为每个引用指派限定名、
//!   展开类型别名、链接继承关系并执行全部模式级约束校验，
//!   产出可直接供编解码器使用的冻结 [`Schema`]。
//!
//! # 契约说明（What）
//! - 名称解析次序：显式命名空间 → 模式命名空间 → 空命名空间。
//! - 注解合并：内联注解在前，增量注解按词法顺序追加；读取时后写者胜。
//! - 校验清单：定义名唯一、类型标识唯一、继承无环、线性化字段名唯一、
//!   序列不嵌套、`fixed(N)` 的 `N ≥ 1`、枚举符号与数值唯一、
//!   动态引用必须指向组。任何违反均为强错误。
//!
//! # 实现策略（How）
//! - 组竞技场先按声明顺序预建（名称与标识先行登记），字段与父组在
//!   第二趟填充，于是组间互相引用（含环形的动态引用）无需递归构建。
//! - 类型别名按需展开并用“进行中”集合侦测环；继承环在全部父链接
//!   完成后以步数上限统一侦测。

use alloc::borrow::ToOwned;
use alloc::boxed::Box;
use alloc::collections::{BTreeMap, BTreeSet};
use alloc::format;
use alloc::string::String;
use alloc::vec::Vec;

use crate::error::{BlinkError, Result};
use crate::schema::ast::{
    AnnotationAst, ByteKind, ComponentRefAst, EnumDefAst, GroupDefAst, SchemaAst, TypeDefAst,
    TypeRefAst,
};
use crate::schema::model::{
    AnnotationMap, EnumDef, EnumId, EnumSymbol, FieldDef, GroupDef, GroupId, Primitive, QName,
    Schema, Type, TypeDefEntry, TypeDefId,
};

/// 解析语法树为冻结模式。
pub fn resolve_schema(ast: &SchemaAst) -> Result<Schema> {
    Resolver::new(ast)?.resolve()
}

struct Resolver<'a> {
    ast: &'a SchemaAst,
    namespace: Option<String>,
    enum_asts: BTreeMap<String, &'a EnumDefAst>,
    typedef_asts: BTreeMap<String, &'a TypeDefAst>,
    group_asts: BTreeMap<String, &'a GroupDefAst>,
    group_ids: BTreeMap<String, GroupId>,
    group_order: Vec<String>,
    enum_ids: BTreeMap<String, EnumId>,
    typedef_ids: BTreeMap<String, TypeDefId>,
    typedefs_resolving: BTreeSet<String>,
    typedef_cache: BTreeMap<String, Type>,
    incremental: BTreeMap<String, Vec<&'a AnnotationAst>>,
    schema: Schema,
}

impl<'a> Resolver<'a> {
    fn new(ast: &'a SchemaAst) -> Result<Self> {
        let mut resolver = Self {
            ast,
            namespace: ast.namespace.clone(),
            enum_asts: BTreeMap::new(),
            typedef_asts: BTreeMap::new(),
            group_asts: BTreeMap::new(),
            group_ids: BTreeMap::new(),
            group_order: Vec::new(),
            enum_ids: BTreeMap::new(),
            typedef_ids: BTreeMap::new(),
            typedefs_resolving: BTreeSet::new(),
            typedef_cache: BTreeMap::new(),
            incremental: BTreeMap::new(),
            schema: Schema {
                namespace: ast.namespace.clone(),
                ..Schema::default()
            },
        };
        resolver.register_declarations()?;
        resolver.index_incremental_annotations()?;
        Ok(resolver)
    }

    fn resolve(mut self) -> Result<Schema> {
        self.resolve_enums()?;
        self.resolve_typedefs()?;
        self.resolve_groups()?;
        self.check_inheritance_cycles()?;
        self.check_linearized_field_names()?;
        self.check_type_id_uniqueness()?;
        self.schema.annotations = self.collect_annotations(&self.ast.schema_annotations, None);
        Ok(self.schema)
    }

    fn qualify(&self, raw: &QName) -> QName {
        if raw.namespace.is_some() {
            raw.clone()
        } else {
            QName {
                namespace: self.namespace.clone(),
                name: raw.name.clone(),
            }
        }
    }

    /// 引用解析的候选键序列。
    fn candidate_keys(&self, raw: &QName) -> Vec<String> {
        if raw.namespace.is_some() {
            return alloc::vec![raw.key()];
        }
        let mut keys = Vec::new();
        if let Some(ns) = &self.namespace {
            keys.push(format!("{ns}:{}", raw.name));
        }
        keys.push(raw.name.clone());
        keys
    }

    fn register_declarations(&mut self) -> Result<()> {
        let mut seen = BTreeSet::new();
        let mut ensure_unique = |key: &String| -> Result<()> {
            if !seen.insert(key.clone()) {
                return Err(BlinkError::resolve(format!("duplicate definition for {key}")));
            }
            Ok(())
        };
        for enum_ast in &self.ast.enums {
            let key = self.qualify(&enum_ast.name).key();
            ensure_unique(&key)?;
            self.enum_asts.insert(key, enum_ast);
        }
        for type_def in &self.ast.type_defs {
            let key = self.qualify(&type_def.name).key();
            ensure_unique(&key)?;
            self.typedef_asts.insert(key, type_def);
        }
        for group_ast in &self.ast.groups {
            let key = self.qualify(&group_ast.name).key();
            ensure_unique(&key)?;
            self.group_asts.insert(key.clone(), group_ast);
            self.group_order.push(key);
        }
        Ok(())
    }

    fn index_incremental_annotations(&mut self) -> Result<()> {
        for entry in &self.ast.incremental_annotations {
            let key = self.incremental_key(&entry.target)?;
            self.incremental
                .entry(key)
                .or_default()
                .extend(entry.annotations.iter());
        }
        Ok(())
    }

    fn incremental_key(&self, target: &ComponentRefAst) -> Result<String> {
        let base_key = self.qualify(&target.name).key();
        let Some(member) = &target.member else {
            if !self.group_asts.contains_key(&base_key)
                && !self.enum_asts.contains_key(&base_key)
                && !self.typedef_asts.contains_key(&base_key)
            {
                return Err(BlinkError::resolve(format!(
                    "unknown component {base_key} for incremental annotation"
                )));
            }
            return Ok(base_key);
        };
        if let Some(group_ast) = self.group_asts.get(&base_key) {
            if !group_ast.fields.iter().any(|field| &field.name == member) {
                return Err(BlinkError::resolve(format!(
                    "unknown field {member} on {base_key}"
                )));
            }
        } else if let Some(enum_ast) = self.enum_asts.get(&base_key) {
            if !enum_ast.symbols.iter().any(|symbol| &symbol.name == member) {
                return Err(BlinkError::resolve(format!(
                    "unknown enum symbol {member} on {base_key}"
                )));
            }
        } else {
            return Err(BlinkError::resolve(format!(
                "unknown component {base_key} for incremental annotation"
            )));
        }
        Ok(format!("{base_key}.{member}"))
    }

    /// 合并内联与增量注解；增量部分按 `extra_key` 查找。
    fn collect_annotations(
        &self,
        inline: &[AnnotationAst],
        extra_key: Option<&str>,
    ) -> AnnotationMap {
        let mut result: AnnotationMap = Vec::new();
        for annotation in inline {
            result.push((self.qualify(&annotation.name), annotation.value.clone()));
        }
        if let Some(key) = extra_key {
            if let Some(extras) = self.incremental.get(key) {
                for annotation in extras {
                    result.push((self.qualify(&annotation.name), annotation.value.clone()));
                }
            }
        }
        result
    }

    fn resolve_enums(&mut self) -> Result<()> {
        for enum_ast in &self.ast.enums {
            let qname = self.qualify(&enum_ast.name);
            let key = qname.key();
            let mut names = BTreeSet::new();
            let mut values = BTreeSet::new();
            let mut symbols = Vec::new();
            for symbol_ast in &enum_ast.symbols {
                if !names.insert(symbol_ast.name.clone()) {
                    return Err(BlinkError::resolve(format!(
                        "duplicate enum symbol {} in {key}",
                        symbol_ast.name
                    )));
                }
                if !values.insert(symbol_ast.value) {
                    return Err(BlinkError::resolve(format!(
                        "duplicate enum value {} for symbol {} in {key}",
                        symbol_ast.value, symbol_ast.name
                    )));
                }
                let symbol_key = format!("{key}.{}", symbol_ast.name);
                symbols.push(EnumSymbol {
                    name: symbol_ast.name.clone(),
                    value: symbol_ast.value,
                    annotations: self
                        .collect_annotations(&symbol_ast.annotations, Some(&symbol_key)),
                });
            }
            let id = EnumId(self.schema.enums.len() as u32);
            self.schema.enums.push(EnumDef {
                name: qname,
                symbols,
                annotations: self.collect_annotations(&enum_ast.annotations, Some(&key)),
            });
            self.enum_ids.insert(key, id);
        }
        Ok(())
    }

    fn resolve_typedefs(&mut self) -> Result<()> {
        let keys: Vec<String> = self.typedef_asts.keys().cloned().collect();
        for key in keys {
            self.ensure_typedef(&key)?;
        }
        Ok(())
    }

    fn ensure_typedef(&mut self, key: &str) -> Result<Type> {
        if let Some(ty) = self.typedef_cache.get(key) {
            return Ok(ty.clone());
        }
        let Some(type_def) = self.typedef_asts.get(key).copied() else {
            return Err(BlinkError::resolve(format!("unknown type definition {key}")));
        };
        if !self.typedefs_resolving.insert(key.to_owned()) {
            return Err(BlinkError::resolve(format!(
                "cyclic type definition involving {key}"
            )));
        }
        let resolved = self.resolve_type(&type_def.type_ref, false);
        self.typedefs_resolving.remove(key);
        let ty = resolved?;
        self.typedef_cache.insert(key.to_owned(), ty.clone());
        let id = TypeDefId(self.schema.typedefs.len() as u32);
        self.schema.typedefs.push(TypeDefEntry {
            name: self.qualify(&type_def.name),
            ty: ty.clone(),
            annotations: self.collect_annotations(&type_def.annotations, Some(key)),
        });
        self.typedef_ids.insert(key.to_owned(), id);
        Ok(ty)
    }

    fn resolve_groups(&mut self) -> Result<()> {
        // 第一趟：预建竞技场条目，指派稳定下标。
        for key in self.group_order.clone() {
            let group_ast = self.group_asts[&key];
            let id = GroupId(self.schema.groups.len() as u32);
            self.schema.groups.push(GroupDef {
                name: self.qualify(&group_ast.name),
                type_id: group_ast.type_id,
                super_id: None,
                fields: Vec::new(),
                annotations: self.collect_annotations(&group_ast.annotations, Some(&key)),
            });
            self.group_ids.insert(key, id);
        }
        // 第二趟：填充父组与字段。
        for key in self.group_order.clone() {
            let group_ast = self.group_asts[&key];
            let id = self.group_ids[&key];
            let super_id = match &group_ast.super_name {
                None => None,
                Some(raw) => Some(self.lookup_group(raw)?),
            };
            let mut fields = Vec::new();
            for field_ast in &group_ast.fields {
                let ty = self.resolve_type(&field_ast.type_ref, false)?;
                let field_key = format!("{key}.{}", field_ast.name);
                fields.push(FieldDef {
                    name: field_ast.name.clone(),
                    ty,
                    optional: field_ast.optional,
                    annotations: self.collect_annotations(&field_ast.annotations, Some(&field_key)),
                });
            }
            let group = &mut self.schema.groups[id.0 as usize];
            group.super_id = super_id;
            group.fields = fields;
        }
        Ok(())
    }

    fn lookup_group(&self, raw: &QName) -> Result<GroupId> {
        for candidate in self.candidate_keys(raw) {
            if let Some(id) = self.group_ids.get(&candidate) {
                return Ok(*id);
            }
        }
        Err(BlinkError::resolve(format!("unknown group {raw}")))
    }

    fn resolve_type(&mut self, type_ref: &TypeRefAst, in_sequence: bool) -> Result<Type> {
        match type_ref {
            TypeRefAst::Primitive(name) => Primitive::from_name(name)
                .map(Type::Primitive)
                .ok_or_else(|| BlinkError::resolve(format!("unknown primitive type: {name}"))),
            TypeRefAst::Bytes { kind, size } => match kind {
                ByteKind::String => Ok(Type::String { max_size: *size }),
                ByteKind::Binary => Ok(Type::Binary { max_size: *size }),
                ByteKind::Fixed => {
                    let size = size.unwrap_or(0);
                    if size == 0 {
                        return Err(BlinkError::resolve("fixed type requires a positive size"));
                    }
                    Ok(Type::Fixed { size })
                }
            },
            TypeRefAst::Sequence(element) => {
                if in_sequence {
                    return Err(BlinkError::resolve("nested sequences are not allowed"));
                }
                let element_type = self.resolve_type(element, true)?;
                if matches!(element_type, Type::Sequence(_)) {
                    return Err(BlinkError::resolve("nested sequences are not allowed"));
                }
                Ok(Type::Sequence(Box::new(element_type)))
            }
            TypeRefAst::Object => Ok(Type::Object),
            TypeRefAst::Named { name, dynamic } => self.resolve_named(name, *dynamic),
        }
    }

    fn resolve_named(&mut self, raw: &QName, dynamic: bool) -> Result<Type> {
        for candidate in self.candidate_keys(raw) {
            if self.enum_asts.contains_key(&candidate) {
                if dynamic {
                    return Err(BlinkError::resolve(format!(
                        "enum {candidate} cannot be the target of a dynamic reference"
                    )));
                }
                let id = self.enum_ids[&candidate];
                return Ok(Type::Enum(id));
            }
            if let Some(id) = self.group_ids.get(&candidate) {
                return Ok(if dynamic {
                    Type::DynamicGroup(*id)
                } else {
                    Type::StaticGroup(*id)
                });
            }
            if self.typedef_asts.contains_key(&candidate) {
                let expanded = self.ensure_typedef(&candidate)?;
                if dynamic {
                    return match expanded {
                        Type::StaticGroup(id) | Type::DynamicGroup(id) => {
                            Ok(Type::DynamicGroup(id))
                        }
                        _ => Err(BlinkError::resolve(format!(
                            "dynamic reference {candidate} must target a group"
                        ))),
                    };
                }
                return Ok(expanded);
            }
        }
        Err(BlinkError::resolve(format!("unknown type {raw}")))
    }

    fn check_inheritance_cycles(&self) -> Result<()> {
        let limit = self.schema.groups.len();
        for (id, group) in self.schema.groups() {
            let mut steps = 0usize;
            let mut current = self.schema.group(id).super_id;
            while let Some(super_id) = current {
                steps += 1;
                if steps > limit {
                    return Err(BlinkError::resolve(format!(
                        "cyclic inheritance involving {}",
                        group.name
                    )));
                }
                current = self.schema.group(super_id).super_id;
            }
        }
        Ok(())
    }

    fn check_linearized_field_names(&self) -> Result<()> {
        for (id, group) in self.schema.groups() {
            let mut seen = BTreeSet::new();
            for field in self.schema.all_fields(id) {
                if !seen.insert(field.name.as_str()) {
                    return Err(BlinkError::resolve(format!(
                        "duplicate field {} in {}",
                        field.name, group.name
                    )));
                }
            }
        }
        Ok(())
    }

    fn check_type_id_uniqueness(&self) -> Result<()> {
        let mut seen: BTreeMap<u64, &QName> = BTreeMap::new();
        for (_, group) in self.schema.groups() {
            if let Some(type_id) = group.type_id {
                if let Some(existing) = seen.insert(type_id, &group.name) {
                    return Err(BlinkError::resolve(format!(
                        "duplicate type id {type_id} for {existing} and {}",
                        group.name
                    )));
                }
            }
        }
        Ok(())
    }
}
