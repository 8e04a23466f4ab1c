//! Parser for the text-serialized visit list.
//!
//! Accepts nested lists or tuples of quoted strings (single or double
//! quotes), bare integers and `None`, e.g.
//! `[['9070', 'E11', None], (9072, "N18")]`. Integers are kept as their
//! decimal text so age-codes decode the same way whichever form they were
//! written in. Tuples parse as lists.

use std::{iter::Peekable, str::CharIndices};

/// A parsed literal: a list, a scalar kept as text, or `None`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Literal {
    List(Vec<Literal>),
    Text(String),
    None,
}

impl Literal {
    pub fn as_list(&self) -> Option<&[Literal]> {
        match self {
            Literal::List(items) => Some(items),
            Literal::Text(_) | Literal::None => None,
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            Literal::Text(s) => Some(s),
            Literal::List(_) | Literal::None => None,
        }
    }
}

/// Parse `input` as a single list literal. Trailing non-whitespace is an error.
pub fn parse_list(input: &str) -> Result<Vec<Literal>, String> {
    let mut parser = Parser {
        chars: input.char_indices().peekable(),
    };
    parser.skip_ws();
    let value = parser.value()?;
    parser.skip_ws();
    if let Some((pos, c)) = parser.chars.next() {
        return Err(format!("unexpected '{c}' at offset {pos} after the list"));
    }
    match value {
        Literal::List(items) => Ok(items),
        Literal::Text(_) | Literal::None => Err("expected a list literal".to_string()),
    }
}

struct Parser<'a> {
    chars: Peekable<CharIndices<'a>>,
}

impl Parser<'_> {
    fn skip_ws(&mut self) {
        while matches!(self.chars.peek(), Some((_, c)) if c.is_whitespace()) {
            self.chars.next();
        }
    }

    fn value(&mut self) -> Result<Literal, String> {
        match self.chars.peek().copied() {
            Some((_, '[')) => self.list(']'),
            Some((_, '(')) => self.list(')'),
            Some((_, q @ ('\'' | '"'))) => self.quoted(q),
            Some((_, c)) if c.is_ascii_digit() || c == '-' || c == '+' => self.number(),
            Some((pos, 'N')) => self.none(pos),
            Some((pos, c)) => Err(format!("unexpected '{c}' at offset {pos}")),
            None => Err("unexpected end of input".to_string()),
        }
    }

    fn list(&mut self, close: char) -> Result<Literal, String> {
        self.chars.next(); // '[' or '('
        let mut items = Vec::new();
        loop {
            self.skip_ws();
            match self.chars.peek().copied() {
                Some((_, c)) if c == close => {
                    self.chars.next();
                    return Ok(Literal::List(items));
                }
                Some(_) => items.push(self.value()?),
                None => return Err("unterminated list".to_string()),
            }
            self.skip_ws();
            match self.chars.next() {
                Some((_, ',')) => continue,
                Some((_, c)) if c == close => return Ok(Literal::List(items)),
                Some((pos, c)) => return Err(format!("expected ',' or '{close}' at offset {pos}, found '{c}'")),
                None => return Err("unterminated list".to_string()),
            }
        }
    }

    fn quoted(&mut self, quote: char) -> Result<Literal, String> {
        self.chars.next(); // opening quote
        let mut text = String::new();
        loop {
            match self.chars.next() {
                Some((_, '\\')) => match self.chars.next() {
                    Some((_, c)) => text.push(c),
                    None => return Err("unterminated escape".to_string()),
                },
                Some((_, c)) if c == quote => return Ok(Literal::Text(text)),
                Some((_, c)) => text.push(c),
                None => return Err("unterminated string".to_string()),
            }
        }
    }

    fn none(&mut self, pos: usize) -> Result<Literal, String> {
        for expected in "None".chars() {
            match self.chars.next() {
                Some((_, c)) if c == expected => {}
                _ => return Err(format!("unexpected identifier at offset {pos}")),
            }
        }
        if matches!(self.chars.peek(), Some((_, c)) if c.is_alphanumeric() || *c == '_') {
            return Err(format!("unexpected identifier at offset {pos}"));
        }
        Ok(Literal::None)
    }

    fn number(&mut self) -> Result<Literal, String> {
        let mut text = String::new();
        if let Some((_, sign @ ('-' | '+'))) = self.chars.peek().copied() {
            text.push(sign);
            self.chars.next();
        }
        while let Some((_, c)) = self.chars.peek().copied() {
            if c.is_ascii_digit() {
                text.push(c);
                self.chars.next();
            } else {
                break;
            }
        }
        if text.trim_start_matches(['-', '+']).is_empty() {
            return Err("sign without digits".to_string());
        }
        Ok(Literal::Text(text))
    }
}
