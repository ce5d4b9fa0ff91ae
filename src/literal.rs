//! Safe parser for data literals written by language models.
//!
//! Models asked for JSON frequently answer with Python-flavoured literals:
//! single-quoted strings, `True`/`False`/`None`, tuples and trailing commas.
//! This parser accepts that superset of JSON and produces a [`serde_json::Value`].
//! It only recognises data; identifiers, calls and operators are rejected.

use serde_json::{Map, Number, Value};
use thiserror::Error;

const MAX_DEPTH: usize = 128;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{message} at offset {offset}")]
pub struct LiteralError {
    pub offset: usize,
    pub message: String,
}

/// Parses a single literal. The whole input must be consumed.
pub fn parse_literal(input: &str) -> Result<Value, LiteralError> {
    let mut parser = LiteralParser::new(input);
    parser.skip_whitespace();
    let value = parser.parse_value(0)?;
    parser.skip_whitespace();

    if parser.pos < parser.chars.len() {
        return Err(parser.error("unexpected trailing characters"));
    }

    Ok(value)
}

struct LiteralParser {
    chars: Vec<char>,
    pos: usize,
}

impl LiteralParser {
    fn new(input: &str) -> Self {
        Self {
            chars: input.chars().collect(),
            pos: 0,
        }
    }

    fn error(&self, message: impl Into<String>) -> LiteralError {
        LiteralError {
            offset: self.pos,
            message: message.into(),
        }
    }

    fn peek(&self) -> Option<char> {
        self.chars.get(self.pos).copied()
    }

    fn bump(&mut self) -> Option<char> {
        let c = self.peek()?;
        self.pos += 1;
        Some(c)
    }

    fn skip_whitespace(&mut self) {
        while let Some(c) = self.peek() {
            if c.is_whitespace() {
                self.pos += 1;
            } else {
                break;
            }
        }
    }

    fn expect(&mut self, expected: char) -> Result<(), LiteralError> {
        match self.bump() {
            Some(c) if c == expected => Ok(()),
            Some(c) => {
                self.pos -= 1;
                Err(self.error(format!("expected '{}', found '{}'", expected, c)))
            }
            None => Err(self.error(format!("expected '{}', found end of input", expected))),
        }
    }

    fn parse_value(&mut self, depth: usize) -> Result<Value, LiteralError> {
        if depth > MAX_DEPTH {
            return Err(self.error("literal nested too deeply"));
        }

        match self.peek() {
            Some('[') => {
                self.pos += 1;
                let items = self.parse_sequence(']', depth)?;
                Ok(Value::Array(items.0))
            }
            Some('(') => {
                self.pos += 1;
                let (mut items, trailing_comma) = self.parse_sequence(')', depth)?;
                // `(x)` is a parenthesised value, `(x,)` is a one-element tuple.
                if items.len() == 1 && !trailing_comma {
                    Ok(items.remove(0))
                } else {
                    Ok(Value::Array(items))
                }
            }
            Some('{') => {
                self.pos += 1;
                self.parse_mapping(depth)
            }
            Some('\'') | Some('"') => self.parse_string().map(Value::String),
            Some(c) if c.is_ascii_digit() || c == '-' || c == '+' || c == '.' => {
                self.parse_number()
            }
            Some(c) if c.is_alphabetic() || c == '_' => self.parse_keyword(),
            Some(c) => Err(self.error(format!("unexpected character '{}'", c))),
            None => Err(self.error("unexpected end of input")),
        }
    }

    /// Returns the items and whether the sequence ended with a trailing comma.
    fn parse_sequence(
        &mut self,
        close: char,
        depth: usize,
    ) -> Result<(Vec<Value>, bool), LiteralError> {
        let mut items = Vec::new();
        let mut trailing_comma = false;

        loop {
            self.skip_whitespace();
            if self.peek() == Some(close) {
                self.pos += 1;
                return Ok((items, trailing_comma));
            }

            items.push(self.parse_value(depth + 1)?);
            trailing_comma = false;
            self.skip_whitespace();

            match self.peek() {
                Some(',') => {
                    self.pos += 1;
                    trailing_comma = true;
                }
                Some(c) if c == close => {}
                Some(c) => return Err(self.error(format!("expected ',' or '{}', found '{}'", close, c))),
                None => return Err(self.error(format!("unterminated sequence, expected '{}'", close))),
            }
        }
    }

    fn parse_mapping(&mut self, depth: usize) -> Result<Value, LiteralError> {
        self.skip_whitespace();
        if self.peek() == Some('}') {
            self.pos += 1;
            return Ok(Value::Object(Map::new()));
        }

        let first = self.parse_value(depth + 1)?;
        self.skip_whitespace();

        // A brace literal without ':' after its first element is a set.
        if self.peek() != Some(':') {
            let mut items = vec![first];
            match self.peek() {
                Some(',') => {
                    self.pos += 1;
                    let (rest, _) = self.parse_sequence('}', depth)?;
                    items.extend(rest);
                }
                Some('}') => self.pos += 1,
                Some(c) => return Err(self.error(format!("expected ':' or ',', found '{}'", c))),
                None => return Err(self.error("unterminated mapping")),
            }
            return Ok(Value::Array(items));
        }

        let mut map = Map::new();
        let mut key = first;

        loop {
            self.expect(':')?;
            self.skip_whitespace();
            let value = self.parse_value(depth + 1)?;
            map.insert(self.key_string(key)?, value);
            self.skip_whitespace();

            match self.bump() {
                Some(',') => {
                    self.skip_whitespace();
                    if self.peek() == Some('}') {
                        self.pos += 1;
                        return Ok(Value::Object(map));
                    }
                    key = self.parse_value(depth + 1)?;
                    self.skip_whitespace();
                }
                Some('}') => return Ok(Value::Object(map)),
                Some(c) => {
                    self.pos -= 1;
                    return Err(self.error(format!("expected ',' or '}}', found '{}'", c)));
                }
                None => return Err(self.error("unterminated mapping")),
            }
        }
    }

    fn key_string(&self, key: Value) -> Result<String, LiteralError> {
        match key {
            Value::String(s) => Ok(s),
            Value::Number(n) => Ok(n.to_string()),
            Value::Bool(b) => Ok(if b { "True" } else { "False" }.to_string()),
            Value::Null => Ok("None".to_string()),
            _ => Err(self.error("mapping keys must be scalars")),
        }
    }

    fn parse_string(&mut self) -> Result<String, LiteralError> {
        let quote = match self.bump() {
            Some(q) => q,
            None => return Err(self.error("expected string")),
        };
        let mut out = String::new();

        loop {
            match self.bump() {
                Some(c) if c == quote => return Ok(out),
                Some('\\') => self.parse_escape(&mut out)?,
                Some(c) => out.push(c),
                None => return Err(self.error("unterminated string literal")),
            }
        }
    }

    fn parse_escape(&mut self, out: &mut String) -> Result<(), LiteralError> {
        match self.bump() {
            Some('n') => out.push('\n'),
            Some('t') => out.push('\t'),
            Some('r') => out.push('\r'),
            Some('b') => out.push('\u{8}'),
            Some('f') => out.push('\u{c}'),
            Some('0') => out.push('\0'),
            Some('\\') => out.push('\\'),
            Some('\'') => out.push('\''),
            Some('"') => out.push('"'),
            Some('/') => out.push('/'),
            Some('\n') => {}
            Some('x') => out.push(self.parse_hex_escape(2)?),
            Some('u') => out.push(self.parse_hex_escape(4)?),
            Some(other) => {
                out.push('\\');
                out.push(other);
            }
            None => return Err(self.error("unterminated escape sequence")),
        }
        Ok(())
    }

    fn parse_hex_escape(&mut self, digits: usize) -> Result<char, LiteralError> {
        let mut code = 0u32;
        for _ in 0..digits {
            let digit = self
                .bump()
                .and_then(|c| c.to_digit(16))
                .ok_or_else(|| self.error("invalid hex escape"))?;
            code = code * 16 + digit;
        }
        char::from_u32(code).ok_or_else(|| self.error("escape is not a valid character"))
    }

    fn parse_number(&mut self) -> Result<Value, LiteralError> {
        let start = self.pos;
        let mut text = String::new();
        let mut is_float = false;

        if let Some(sign @ ('-' | '+')) = self.peek() {
            self.pos += 1;
            if sign == '-' {
                text.push('-');
            }
            self.skip_whitespace();
        }

        let mut saw_digit = false;
        while let Some(c) = self.peek() {
            match c {
                '0'..='9' => {
                    saw_digit = true;
                    text.push(c);
                }
                '_' if saw_digit => {}
                '.' if !is_float => {
                    is_float = true;
                    text.push(c);
                }
                'e' | 'E' if saw_digit => {
                    is_float = true;
                    text.push(c);
                    self.pos += 1;
                    if let Some(sign @ ('-' | '+')) = self.peek() {
                        text.push(sign);
                        self.pos += 1;
                    }
                    continue;
                }
                _ => break,
            }
            self.pos += 1;
        }

        if !saw_digit {
            self.pos = start;
            return Err(self.error("invalid number"));
        }

        if !is_float {
            if let Ok(n) = text.parse::<i64>() {
                return Ok(Value::Number(n.into()));
            }
        }

        let parsed: f64 = text.parse().map_err(|_| LiteralError {
            offset: start,
            message: format!("invalid number '{}'", text),
        })?;

        Number::from_f64(parsed)
            .map(Value::Number)
            .ok_or_else(|| LiteralError {
                offset: start,
                message: format!("number '{}' is not finite", text),
            })
    }

    fn parse_keyword(&mut self) -> Result<Value, LiteralError> {
        let start = self.pos;
        let mut word = String::new();
        while let Some(c) = self.peek() {
            if c.is_alphanumeric() || c == '_' {
                word.push(c);
                self.pos += 1;
            } else {
                break;
            }
        }

        match word.as_str() {
            "True" | "true" => Ok(Value::Bool(true)),
            "False" | "false" => Ok(Value::Bool(false)),
            "None" | "null" => Ok(Value::Null),
            _ => Err(LiteralError {
                offset: start,
                message: format!("unsupported identifier '{}'", word),
            }),
        }
    }
}
