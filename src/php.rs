//! Structured-format codec: PHP source files that `return` a nested array.
//!
//! The parser accepts the subset of PHP that translation files use: an
//! optional `declare(...)`/`namespace`/`use` preamble, then
//! `return [...];` or `return array(...);` with string or integer keys,
//! string values (single or double quoted, `.` concatenation allowed),
//! nested arrays and comments. Anything else is rejected, nothing is
//! evaluated.

use crate::keypath::{Node, Tree};

const INDENT: &str = "    ";

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PhpError {
    #[error("syntax error at offset {offset}: {message}")]
    Syntax { offset: usize, message: String },

    #[error("file does not return an array")]
    NotAnArray,

    #[error("value for key '{key}' must be a string, found {found}")]
    InvalidValue { key: String, found: &'static str },
}

impl PhpError {
    fn nested_under(self, parent: &str) -> Self {
        match self {
            PhpError::InvalidValue { key, found } => PhpError::InvalidValue {
                key: crate::keypath::join(parent, &key),
                found,
            },
            other => other,
        }
    }
}

/// Parse a PHP translation file into a nested tree.
pub fn parse(source: &str) -> Result<Tree, PhpError> {
    Parser::new(source).parse_file()
}

/// Render a tree as a PHP translation file.
///
/// Output is deterministic: single-quoted keys and values, 4-space
/// indentation, trailing commas, keys in tree order.
pub fn render(tree: &Tree) -> String {
    format!("<?php\n\nreturn {};\n", render_array(tree, 0))
}

fn render_array(tree: &Tree, depth: usize) -> String {
    if tree.is_empty() {
        return "[]".to_string();
    }

    let indent = INDENT.repeat(depth);
    let inner = INDENT.repeat(depth + 1);
    let mut out = String::from("[\n");

    for (key, node) in tree {
        out.push_str(&inner);
        out.push_str(&quote(key));
        out.push_str(" => ");
        match node {
            Node::Leaf(value) => out.push_str(&quote(value)),
            Node::Branch(children) => out.push_str(&render_array(children, depth + 1)),
        }
        out.push_str(",\n");
    }

    out.push_str(&indent);
    out.push(']');
    out
}

fn quote(text: &str) -> String {
    format!("'{}'", text.replace('\\', "\\\\").replace('\'', "\\'"))
}

fn push_char(bytes: &mut Vec<u8>, c: char) {
    let mut buf = [0; 4];
    bytes.extend_from_slice(c.encode_utf8(&mut buf).as_bytes());
}

enum Parsed {
    Text(String),
    Array(Tree),
    Int(i64),
    Other(&'static str),
}

struct Parser {
    chars: Vec<char>,
    pos: usize,
}

impl Parser {
    fn new(source: &str) -> Self {
        Self {
            chars: source.chars().collect(),
            pos: 0,
        }
    }

    fn syntax<T>(&self, message: impl Into<String>) -> Result<T, PhpError> {
        Err(PhpError::Syntax {
            offset: self.pos,
            message: message.into(),
        })
    }

    fn peek(&self) -> Option<char> {
        self.chars.get(self.pos).copied()
    }

    fn peek_at(&self, ahead: usize) -> Option<char> {
        self.chars.get(self.pos + ahead).copied()
    }

    fn bump(&mut self) -> Option<char> {
        let c = self.peek()?;
        self.pos += 1;
        Some(c)
    }

    fn eat(&mut self, expected: char) -> bool {
        if self.peek() == Some(expected) {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    fn eat_str(&mut self, expected: &str) -> bool {
        let matches = expected
            .chars()
            .enumerate()
            .all(|(i, c)| self.peek_at(i).is_some_and(|p| p.eq_ignore_ascii_case(&c)));
        if matches {
            self.pos += expected.chars().count();
        }
        matches
    }

    fn expect(&mut self, expected: char) -> Result<(), PhpError> {
        if self.eat(expected) {
            Ok(())
        } else {
            self.syntax(format!("expected '{}'", expected))
        }
    }

    fn skip_trivia(&mut self) {
        loop {
            match (self.peek(), self.peek_at(1)) {
                (Some(c), _) if c.is_whitespace() => self.pos += 1,
                (Some('/'), Some('/')) | (Some('#'), _) => {
                    while let Some(c) = self.bump() {
                        if c == '\n' {
                            break;
                        }
                    }
                }
                (Some('/'), Some('*')) => {
                    self.pos += 2;
                    while self.peek().is_some()
                        && !(self.peek() == Some('*') && self.peek_at(1) == Some('/'))
                    {
                        self.pos += 1;
                    }
                    self.pos = (self.pos + 2).min(self.chars.len());
                }
                _ => return,
            }
        }
    }

    fn is_ident_char(c: char) -> bool {
        c.is_ascii_alphanumeric() || c == '_'
    }

    /// Consume `keyword` if it appears here as a whole identifier.
    fn eat_keyword(&mut self, keyword: &str) -> bool {
        let start = self.pos;
        if !self.eat_str(keyword) {
            return false;
        }
        if self.peek().is_some_and(Self::is_ident_char) {
            self.pos = start;
            return false;
        }
        true
    }

    fn read_ident(&mut self) -> String {
        let mut ident = String::new();
        while let Some(c) = self.peek().filter(|c| Self::is_ident_char(*c)) {
            ident.push(c);
            self.pos += 1;
        }
        ident
    }

    fn skip_statement(&mut self) {
        while let Some(c) = self.bump() {
            if c == ';' {
                break;
            }
        }
    }

    fn parse_file(&mut self) -> Result<Tree, PhpError> {
        self.skip_trivia();
        if !self.eat_str("<?php") {
            return self.syntax("missing <?php open tag");
        }

        loop {
            self.skip_trivia();
            if self.eat_keyword("declare") || self.eat_keyword("namespace") || self.eat_keyword("use") {
                self.skip_statement();
                continue;
            }
            break;
        }

        if !self.eat_keyword("return") {
            return Err(PhpError::NotAnArray);
        }

        match self.parse_value()? {
            Parsed::Array(tree) => {
                self.skip_trivia();
                self.eat(';');
                Ok(tree)
            }
            _ => Err(PhpError::NotAnArray),
        }
    }

    fn parse_value(&mut self) -> Result<Parsed, PhpError> {
        self.skip_trivia();
        match self.peek() {
            Some('\'') | Some('"') => self.parse_string_expr().map(Parsed::Text),
            Some('[') => {
                self.pos += 1;
                self.parse_entries(']').map(Parsed::Array)
            }
            Some(c) if c.is_ascii_digit() || c == '-' || c == '+' || c == '.' => self.parse_number(),
            Some(c) if c.is_ascii_alphabetic() || c == '_' => {
                let ident = self.read_ident();
                match ident.to_ascii_lowercase().as_str() {
                    "array" => {
                        self.skip_trivia();
                        self.expect('(')?;
                        self.parse_entries(')').map(Parsed::Array)
                    }
                    "true" | "false" => Ok(Parsed::Other("boolean")),
                    "null" => Ok(Parsed::Other("null")),
                    _ => self.syntax(format!("unsupported expression '{}'", ident)),
                }
            }
            Some(c) => self.syntax(format!("unexpected character '{}'", c)),
            None => self.syntax("unexpected end of input"),
        }
    }

    fn parse_number(&mut self) -> Result<Parsed, PhpError> {
        let mut literal = String::new();
        while let Some(c) = self
            .peek()
            .filter(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '.' | '+' | '-'))
        {
            literal.push(c);
            self.pos += 1;
        }

        let cleaned = literal.replace('_', "");
        if let Ok(value) = cleaned.parse::<i64>() {
            Ok(Parsed::Int(value))
        } else if cleaned.parse::<f64>().is_ok() {
            Ok(Parsed::Other("float"))
        } else {
            self.syntax(format!("invalid number '{}'", literal))
        }
    }

    fn parse_string_expr(&mut self) -> Result<String, PhpError> {
        let mut text = self.parse_string_literal()?;
        loop {
            self.skip_trivia();
            if self.peek() == Some('.') && !self.peek_at(1).is_some_and(|c| c.is_ascii_digit()) {
                self.pos += 1;
                self.skip_trivia();
                text.push_str(&self.parse_string_literal()?);
            } else {
                return Ok(text);
            }
        }
    }

    fn parse_string_literal(&mut self) -> Result<String, PhpError> {
        match self.bump() {
            Some('\'') => self.parse_single_quoted(),
            Some('"') => self.parse_double_quoted(),
            _ => self.syntax("expected string literal"),
        }
    }

    fn parse_single_quoted(&mut self) -> Result<String, PhpError> {
        let mut text = String::new();
        loop {
            match self.bump() {
                None => return self.syntax("unterminated string"),
                Some('\'') => return Ok(text),
                Some('\\') => match self.peek() {
                    Some(c @ ('\'' | '\\')) => {
                        text.push(c);
                        self.pos += 1;
                    }
                    _ => text.push('\\'),
                },
                Some(c) => text.push(c),
            }
        }
    }

    /// Double-quoted escapes work on bytes like PHP does, so `"\xC3\xA9"`
    /// decodes to `é`. Byte sequences that are not UTF-8 are a syntax error.
    fn parse_double_quoted(&mut self) -> Result<String, PhpError> {
        let mut bytes = Vec::new();
        loop {
            match self.bump() {
                None => return self.syntax("unterminated string"),
                Some('"') => break,
                Some('\\') => self.parse_escape(&mut bytes)?,
                Some(c) => push_char(&mut bytes, c),
            }
        }

        match String::from_utf8(bytes) {
            Ok(text) => Ok(text),
            Err(_) => self.syntax("escape sequences do not form valid UTF-8"),
        }
    }

    fn parse_escape(&mut self, bytes: &mut Vec<u8>) -> Result<(), PhpError> {
        let simple = match self.peek() {
            Some('n') => Some('\n'),
            Some('t') => Some('\t'),
            Some('r') => Some('\r'),
            Some('v') => Some('\u{0B}'),
            Some('f') => Some('\u{0C}'),
            Some('e') => Some('\u{1B}'),
            Some(c @ ('\\' | '$' | '"')) => Some(c),
            _ => None,
        };
        if let Some(c) = simple {
            push_char(bytes, c);
            self.pos += 1;
            return Ok(());
        }

        match self.peek() {
            Some('u') if self.peek_at(1) == Some('{') => {
                self.pos += 2;
                let mut hex = String::new();
                while let Some(c) = self.bump() {
                    if c == '}' {
                        break;
                    }
                    hex.push(c);
                }
                match u32::from_str_radix(&hex, 16).ok().and_then(char::from_u32) {
                    Some(c) => push_char(bytes, c),
                    None => return self.syntax(format!("invalid unicode escape '{}'", hex)),
                }
            }
            Some('x') if self.peek_at(1).is_some_and(|c| c.is_ascii_hexdigit()) => {
                self.pos += 1;
                bytes.push(self.take_digits(16, 2) as u8);
            }
            // Octal values above \377 wrap to one byte
            Some('0'..='7') => bytes.push((self.take_digits(8, 3) & 0xFF) as u8),
            _ => bytes.push(b'\\'),
        }
        Ok(())
    }

    fn take_digits(&mut self, radix: u32, max: usize) -> u32 {
        let mut value = 0;
        for _ in 0..max {
            match self.peek().and_then(|c| c.to_digit(radix)) {
                Some(digit) => {
                    value = value * radix + digit;
                    self.pos += 1;
                }
                None => break,
            }
        }
        value
    }

    fn parse_entries(&mut self, close: char) -> Result<Tree, PhpError> {
        let mut tree = Tree::new();
        let mut next_index: i64 = 0;

        loop {
            self.skip_trivia();
            if self.eat(close) {
                return Ok(tree);
            }

            let first = self.parse_value()?;
            self.skip_trivia();

            let (key, value) = if self.eat_str("=>") {
                let key = match first {
                    Parsed::Text(text) => text,
                    Parsed::Int(index) => index.to_string(),
                    _ => return self.syntax("invalid array key"),
                };
                let value = self.parse_value().map_err(|e| e.nested_under(&key))?;
                (key, value)
            } else {
                (next_index.to_string(), first)
            };

            if let Ok(index) = key.parse::<i64>() {
                if index.to_string() == key && index >= next_index {
                    next_index = index + 1;
                }
            }

            let node = match value {
                Parsed::Text(text) => Node::Leaf(text),
                Parsed::Array(children) => Node::Branch(children),
                Parsed::Int(_) => return Err(PhpError::InvalidValue { key, found: "integer" }),
                Parsed::Other(found) => return Err(PhpError::InvalidValue { key, found }),
            };
            tree.insert(key, node);

            self.skip_trivia();
            if !self.eat(',') {
                self.skip_trivia();
                self.expect(close)?;
                return Ok(tree);
            }
        }
    }
}
