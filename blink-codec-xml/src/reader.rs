//! 面向本映射的最小 XML 读取器。
//!
//! # 教案定位（Why）
//! - 本编解码器只消费自身写出的元素/属性/文本子集，一个手写的
//!   单遍读取器即可覆盖：元素嵌套、双/单引号属性、五个预定义实体、
//!   数字字符引用、XML 声明与注释的跳过。
//!
//! # 契约说明（What）
//! - 不支持 DOCTYPE、CDATA 与处理指令（声明除外）；遇到即报强解析
//!   错误。命名空间以前缀原样保留，由解码层按作用域解析。

use alloc::format;
use alloc::string::String;
use alloc::vec::Vec;

use blink_core::error::{BlinkError, Result};

/// 解析后的元素节点。
#[derive(Debug, Clone, Default, PartialEq)]
pub struct XmlElement {
    /// 元素名（保留前缀，如 `ns0:Company`）。
    pub name: String,
    /// 属性表（按出现顺序，名称保留前缀）。
    pub attributes: Vec<(String, String)>,
    /// 子元素。
    pub children: Vec<XmlElement>,
    /// 字符数据（子元素之间的文本拼接，实体已展开）。
    pub text: String,
}

impl XmlElement {
    /// 按名读取属性。
    pub fn attribute(&self, name: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value.as_str())
    }

    /// 元素名的 `(前缀, 本地名)` 拆分。
    pub fn split_name(&self) -> (Option<&str>, &str) {
        match self.name.split_once(':') {
            Some((prefix, local)) => (Some(prefix), local),
            None => (None, self.name.as_str()),
        }
    }
}

/// 解析文档中的唯一根元素。
pub fn parse_document(text: &str) -> Result<XmlElement> {
    let mut reader = Reader {
        chars: text.chars().collect(),
        index: 0,
    };
    reader.skip_misc();
    let element = reader.parse_element()?;
    reader.skip_misc();
    if reader.index < reader.chars.len() {
        return Err(BlinkError::parse(String::from(
            "trailing content after XML root element",
        )));
    }
    Ok(element)
}

struct Reader {
    chars: Vec<char>,
    index: usize,
}

impl Reader {
    fn peek(&self) -> Option<char> {
        self.chars.get(self.index).copied()
    }

    fn starts_with(&self, prefix: &str) -> bool {
        prefix
            .chars()
            .enumerate()
            .all(|(offset, expected)| self.chars.get(self.index + offset) == Some(&expected))
    }

    fn skip_whitespace(&mut self) {
        while matches!(self.peek(), Some(ch) if ch.is_whitespace()) {
            self.index += 1;
        }
    }

    /// 跳过空白、XML 声明与注释。
    fn skip_misc(&mut self) {
        loop {
            self.skip_whitespace();
            if self.starts_with("<?") {
                while self.index < self.chars.len() && !self.starts_with("?>") {
                    self.index += 1;
                }
                self.index += 2;
                continue;
            }
            if self.starts_with("<!--") {
                while self.index < self.chars.len() && !self.starts_with("-->") {
                    self.index += 1;
                }
                self.index += 3;
                continue;
            }
            return;
        }
    }

    fn parse_element(&mut self) -> Result<XmlElement> {
        if self.peek() != Some('<') {
            return Err(BlinkError::parse(String::from("expected XML element")));
        }
        self.index += 1;
        let name = self.read_name()?;
        let mut element = XmlElement {
            name,
            ..XmlElement::default()
        };
        loop {
            self.skip_whitespace();
            match self.peek() {
                Some('/') => {
                    self.index += 1;
                    if self.peek() != Some('>') {
                        return Err(BlinkError::parse(String::from("malformed empty-element tag")));
                    }
                    self.index += 1;
                    return Ok(element);
                }
                Some('>') => {
                    self.index += 1;
                    break;
                }
                Some(_) => {
                    let attr_name = self.read_name()?;
                    self.skip_whitespace();
                    if self.peek() != Some('=') {
                        return Err(BlinkError::parse(String::from("attribute missing '='")));
                    }
                    self.index += 1;
                    self.skip_whitespace();
                    let quote = match self.peek() {
                        Some(ch @ ('"' | '\'')) => ch,
                        _ => {
                            return Err(BlinkError::parse(String::from(
                                "attribute value must be quoted",
                            )))
                        }
                    };
                    self.index += 1;
                    let mut raw = String::new();
                    while let Some(ch) = self.peek() {
                        if ch == quote {
                            break;
                        }
                        raw.push(ch);
                        self.index += 1;
                    }
                    if self.peek() != Some(quote) {
                        return Err(BlinkError::parse(String::from("unterminated attribute value")));
                    }
                    self.index += 1;
                    element.attributes.push((attr_name, decode_entities(&raw)?));
                }
                None => {
                    return Err(BlinkError::parse(String::from("unterminated start tag")));
                }
            }
        }
        // 内容：文本与子元素交替，直到结束标签。
        let mut text = String::new();
        loop {
            match self.peek() {
                None => {
                    return Err(BlinkError::parse(format!(
                        "missing end tag for {}",
                        element.name
                    )))
                }
                Some('<') => {
                    if self.starts_with("</") {
                        self.index += 2;
                        let closing = self.read_name()?;
                        if closing != element.name {
                            return Err(BlinkError::parse(format!(
                                "mismatched end tag: expected {}, found {closing}",
                                element.name
                            )));
                        }
                        self.skip_whitespace();
                        if self.peek() != Some('>') {
                            return Err(BlinkError::parse(String::from("malformed end tag")));
                        }
                        self.index += 1;
                        element.text = decode_entities(&text)?;
                        return Ok(element);
                    }
                    if self.starts_with("<!--") {
                        self.skip_misc();
                        continue;
                    }
                    element.children.push(self.parse_element()?);
                }
                Some(ch) => {
                    text.push(ch);
                    self.index += 1;
                }
            }
        }
    }

    fn read_name(&mut self) -> Result<String> {
        let mut name = String::new();
        while let Some(ch) = self.peek() {
            if ch.is_whitespace() || matches!(ch, '>' | '/' | '=') {
                break;
            }
            name.push(ch);
            self.index += 1;
        }
        if name.is_empty() {
            return Err(BlinkError::parse(String::from("empty XML name")));
        }
        Ok(name)
    }
}

/// 展开预定义实体与数字字符引用。
pub fn decode_entities(text: &str) -> Result<String> {
    let mut out = String::with_capacity(text.len());
    let mut rest = text;
    while let Some(position) = rest.find('&') {
        out.push_str(&rest[..position]);
        let after = &rest[position + 1..];
        let Some(end) = after.find(';') else {
            return Err(BlinkError::parse(String::from("unterminated XML entity")));
        };
        let entity = &after[..end];
        match entity {
            "amp" => out.push('&'),
            "lt" => out.push('<'),
            "gt" => out.push('>'),
            "quot" => out.push('"'),
            "apos" => out.push('\''),
            _ => {
                let code = entity
                    .strip_prefix("#x")
                    .or_else(|| entity.strip_prefix("#X"))
                    .map(|digits| u32::from_str_radix(digits, 16))
                    .or_else(|| entity.strip_prefix('#').map(str::parse::<u32>))
                    .transpose()
                    .ok()
                    .flatten()
                    .ok_or_else(|| {
                        BlinkError::parse(format!("unknown XML entity &{entity};"))
                    })?;
                out.push(char::from_u32(code).ok_or_else(|| {
                    BlinkError::parse(format!("invalid character reference &{entity};"))
                })?);
            }
        }
        rest = &after[end + 1..];
    }
    out.push_str(rest);
    Ok(out)
}
