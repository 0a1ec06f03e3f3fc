//! 模式文本语法分析。
//!
//! # 教案定位（Why）
//! - 递归下降解析 Blink beta4 模式语法，产出未定型语法树；
//!   名称限定与引用解析推迟到 `resolve` 阶段，保持两阶段职责清晰。
//!
//! # 契约说明（What）
//! - 入口为 [`parse_schema`]；任何语法错误都携带行列定位并立即中止。
//! - 识别的结构：`namespace` 指令、组声明（`/typeid`、`: Super`、字段表、
//!   `?` 后缀）、`Name = ...` 枚举与类型别名、内联 `@a="v"` 注解、
//!   `Component <- ...` 增量注解与 `schema <- ...` 模式注解。
//!
//! # 实现策略（How）
//! - `Name = ...` 右侧在枚举与别名之间存在二义，先保存游标做一次
//!   前瞻判定（首 Token 为 `|`，或标识符后跟 `|`/`/`，即为枚举），
//!   再回退游标正式解析。
//! - 字段的 `name/7` 数字标识降级为 `blink:id` 注解，与增量注解里的
//!   裸数字共享同一约定。

use alloc::boxed::Box;
use alloc::format;
use alloc::string::{String, ToString};
use alloc::vec::Vec;

use crate::error::{BlinkError, Result};
use crate::schema::ast::{
    AnnotationAst, ByteKind, ComponentRefAst, EnumDefAst, EnumSymbolAst, FieldAst, GroupDefAst,
    IncrementalAnnotationAst, SchemaAst, TypeDefAst, TypeRefAst,
};
use crate::schema::lexer::{tokenize, Token, TokenKind};
use crate::schema::model::QName;

/// `name/7` 与裸数字增量注解降级使用的注解名。
fn numeric_annotation(value: i128) -> AnnotationAst {
    AnnotationAst {
        name: QName::new(Some("blink"), "id"),
        value: value.to_string(),
    }
}

/// 解析模式文本为语法树。
pub fn parse_schema(text: &str) -> Result<SchemaAst> {
    let tokens = tokenize(text)?;
    Parser {
        tokens,
        index: 0,
        ast: SchemaAst::default(),
    }
    .parse()
}

struct Parser {
    tokens: Vec<Token>,
    index: usize,
    ast: SchemaAst,
}

impl Parser {
    fn parse(mut self) -> Result<SchemaAst> {
        while !self.at_eof() {
            let definition_annots = self.parse_annotations()?;
            if self.peek_keyword("schema") {
                if !definition_annots.is_empty() {
                    return Err(self.error_here("annotations cannot precede schema annotations"));
                }
                self.advance();
                if !self.eat(&TokenKind::LeftArrow) {
                    return Err(self.error_here("schema annotations require '<-'"));
                }
                let chain = self.parse_incremental_chain()?;
                self.ast.schema_annotations.extend(chain);
                continue;
            }
            if self.peek_keyword("namespace") {
                if !definition_annots.is_empty() {
                    return Err(
                        self.error_here("annotations are not allowed on namespace declarations")
                    );
                }
                self.advance();
                self.parse_namespace_decl()?;
                continue;
            }

            let (name, type_id) = self.parse_name_with_id()?;
            let member = if self.eat(&TokenKind::Dot) {
                Some(self.expect_identifier()?)
            } else {
                None
            };
            if self.eat(&TokenKind::LeftArrow) {
                if type_id.is_some() {
                    return Err(self.error_here("component references cannot include identifiers"));
                }
                let annotations = self.parse_incremental_chain()?;
                self.ast
                    .incremental_annotations
                    .push(IncrementalAnnotationAst {
                        target: ComponentRefAst { name, member },
                        annotations,
                    });
                continue;
            }
            if member.is_some() {
                return Err(self.error_here("component references must be followed by '<-'"));
            }

            if self.eat(&TokenKind::Equal) {
                let saved = self.index;
                self.parse_annotations()?;
                let is_enum = self.detect_enum();
                self.index = saved;
                if is_enum {
                    let symbols = self.parse_enum_symbols()?;
                    self.ast.enums.push(EnumDefAst {
                        name,
                        symbols,
                        annotations: definition_annots,
                    });
                } else {
                    let mut annotations = definition_annots;
                    annotations.extend(self.parse_annotations()?);
                    let type_ref = self.parse_type()?;
                    self.ast.type_defs.push(TypeDefAst {
                        name,
                        type_ref,
                        annotations,
                    });
                }
            } else {
                let super_name = if self.eat(&TokenKind::Colon) {
                    Some(self.parse_qname()?)
                } else {
                    None
                };
                let fields = if self.eat(&TokenKind::Arrow) {
                    self.parse_fields()?
                } else {
                    Vec::new()
                };
                self.ast.groups.push(GroupDefAst {
                    name,
                    type_id,
                    super_name,
                    fields,
                    annotations: definition_annots,
                });
            }
        }
        Ok(self.ast)
    }

    fn parse_namespace_decl(&mut self) -> Result<()> {
        if self.ast.namespace.is_some() {
            return Err(self.error_here("duplicate namespace declaration"));
        }
        self.ast.namespace = Some(self.expect_identifier()?);
        Ok(())
    }

    fn parse_fields(&mut self) -> Result<Vec<FieldAst>> {
        let mut fields = Vec::new();
        loop {
            let mut annotations = self.parse_annotations()?;
            let type_ref = self.parse_type()?;
            annotations.extend(self.parse_annotations()?);
            let (field_name, field_id) = self.parse_name_with_raw_id()?;
            let optional = self.eat(&TokenKind::Question);
            if let Some(id) = field_id {
                annotations.push(numeric_annotation(id));
            }
            fields.push(FieldAst {
                name: field_name.name,
                type_ref,
                optional,
                annotations,
            });
            if !self.eat(&TokenKind::Comma) {
                break;
            }
        }
        Ok(fields)
    }

    fn parse_type(&mut self) -> Result<TypeRefAst> {
        let mut base = self.parse_single_type()?;
        while self.eat(&TokenKind::LBracket) {
            self.expect(&TokenKind::RBracket)?;
            base = TypeRefAst::Sequence(Box::new(base));
        }
        Ok(base)
    }

    fn parse_single_type(&mut self) -> Result<TypeRefAst> {
        if let TokenKind::Keyword(keyword) = &self.peek().kind {
            let keyword = keyword.clone();
            match keyword.as_str() {
                "string" | "binary" => {
                    self.advance();
                    let size = self.parse_optional_size()?;
                    let kind = if keyword == "string" {
                        ByteKind::String
                    } else {
                        ByteKind::Binary
                    };
                    return Ok(TypeRefAst::Bytes { kind, size });
                }
                "fixed" => {
                    self.advance();
                    let size = self.parse_optional_size()?.ok_or_else(|| {
                        self.error_here("fixed types must specify a size, e.g. fixed(8)")
                    })?;
                    return Ok(TypeRefAst::Bytes {
                        kind: ByteKind::Fixed,
                        size: Some(size),
                    });
                }
                "object" => {
                    self.advance();
                    return Ok(TypeRefAst::Object);
                }
                "namespace" | "type" | "schema" => {}
                _ => {
                    self.advance();
                    return Ok(TypeRefAst::Primitive(keyword));
                }
            }
        }
        let name = self.parse_qname()?;
        let dynamic = self.eat(&TokenKind::Star);
        Ok(TypeRefAst::Named { name, dynamic })
    }

    fn parse_optional_size(&mut self) -> Result<Option<u32>> {
        if !self.eat(&TokenKind::LParen) {
            return Ok(None);
        }
        let number = self.expect_number()?;
        self.expect(&TokenKind::RParen)?;
        let size = u32::try_from(number)
            .map_err(|_| self.error_here("size literal out of range"))?;
        Ok(Some(size))
    }

    fn parse_enum_symbols(&mut self) -> Result<Vec<EnumSymbolAst>> {
        let mut symbols = Vec::new();
        let mut next_value: i32 = 0;
        self.eat(&TokenKind::Pipe);
        loop {
            let symbol = self.parse_enum_symbol(next_value)?;
            next_value = symbol.value.wrapping_add(1);
            symbols.push(symbol);
            if !self.eat(&TokenKind::Pipe) {
                break;
            }
        }
        Ok(symbols)
    }

    fn parse_enum_symbol(&mut self, default_value: i32) -> Result<EnumSymbolAst> {
        let annotations = self.parse_annotations()?;
        let name = self.expect_identifier()?;
        let value = if self.eat(&TokenKind::Slash) {
            let number = self.expect_number()?;
            i32::try_from(number).map_err(|_| self.error_here("enum value out of i32 range"))?
        } else {
            default_value
        };
        Ok(EnumSymbolAst {
            name,
            value,
            annotations,
        })
    }

    fn parse_incremental_chain(&mut self) -> Result<Vec<AnnotationAst>> {
        let mut annotations = Vec::new();
        loop {
            if let TokenKind::Number(value) = self.peek().kind {
                self.advance();
                annotations.push(numeric_annotation(value));
            } else {
                let chunk = self.parse_annotations()?;
                if chunk.is_empty() {
                    return Err(self.error_here("expected annotation after '<-'"));
                }
                annotations.extend(chunk);
            }
            if !self.eat(&TokenKind::LeftArrow) {
                break;
            }
        }
        Ok(annotations)
    }

    fn parse_annotations(&mut self) -> Result<Vec<AnnotationAst>> {
        let mut items = Vec::new();
        while self.eat(&TokenKind::At) {
            let name = self.parse_qname()?;
            self.expect(&TokenKind::Equal)?;
            let mut value = String::new();
            let mut seen = false;
            while let TokenKind::Str(part) = &self.peek().kind {
                value.push_str(part);
                seen = true;
                self.advance();
            }
            if !seen {
                return Err(self.error_here("annotation must have a string literal value"));
            }
            items.push(AnnotationAst { name, value });
        }
        Ok(items)
    }

    fn parse_qname(&mut self) -> Result<QName> {
        let first = self.expect_identifier()?;
        if self.eat(&TokenKind::NsColon) {
            let name = self.expect_identifier()?;
            Ok(QName::new(Some(&first), &name))
        } else {
            Ok(QName::new(None, &first))
        }
    }

    fn parse_name_with_id(&mut self) -> Result<(QName, Option<u64>)> {
        let (qname, raw) = self.parse_name_with_raw_id()?;
        let type_id = match raw {
            None => None,
            Some(value) => Some(
                u64::try_from(value)
                    .map_err(|_| self.error_here("type id out of u64 range"))?,
            ),
        };
        Ok((qname, type_id))
    }

    fn parse_name_with_raw_id(&mut self) -> Result<(QName, Option<i128>)> {
        let qname = self.parse_qname()?;
        let id = if self.eat(&TokenKind::Slash) {
            Some(self.expect_number()?)
        } else {
            None
        };
        Ok((qname, id))
    }

    fn detect_enum(&self) -> bool {
        match &self.peek().kind {
            TokenKind::Pipe => true,
            TokenKind::Ident(_) => matches!(
                self.tokens.get(self.index + 1).map(|t| &t.kind),
                Some(TokenKind::Pipe) | Some(TokenKind::Slash)
            ),
            _ => false,
        }
    }

    fn at_eof(&self) -> bool {
        matches!(self.peek().kind, TokenKind::Eof)
    }

    fn peek(&self) -> &Token {
        &self.tokens[self.index]
    }

    fn peek_keyword(&self, keyword: &str) -> bool {
        matches!(&self.peek().kind, TokenKind::Keyword(k) if k == keyword)
    }

    fn advance(&mut self) -> &Token {
        let token = &self.tokens[self.index];
        if self.index + 1 < self.tokens.len() {
            self.index += 1;
        }
        token
    }

    fn eat(&mut self, kind: &TokenKind) -> bool {
        if &self.peek().kind == kind {
            self.advance();
            true
        } else {
            false
        }
    }

    fn expect(&mut self, kind: &TokenKind) -> Result<()> {
        if self.eat(kind) {
            Ok(())
        } else {
            Err(self.error_here(format!("expected {kind:?}, got {:?}", self.peek().kind)))
        }
    }

    fn expect_identifier(&mut self) -> Result<String> {
        match &self.peek().kind {
            TokenKind::Ident(name) => {
                let name = name.clone();
                self.advance();
                Ok(name)
            }
            other => Err(self.error_here(format!("expected identifier, found {other:?}"))),
        }
    }

    fn expect_number(&mut self) -> Result<i128> {
        match self.peek().kind {
            TokenKind::Number(value) => {
                self.advance();
                Ok(value)
            }
            ref other => Err(self.error_here(format!("expected number, found {other:?}"))),
        }
    }

    fn error_here(&self, message: impl Into<String>) -> BlinkError {
        let token = self.peek();
        BlinkError::parse(message).at_line_col(token.line, token.column)
    }
}
