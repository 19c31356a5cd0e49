// Copyright 2025 JiangLong.
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

use super::SyntaxError;
use std::iter::Peekable;
use std::str::CharIndices;

#[derive(Debug, Clone, PartialEq)]
pub enum Token {
    /// A bare `.`
    Dot,
    /// `.name`, written without whitespace between the dot and the name
    Field(String),
    Ident(String),
    Str(String),
    Num(f64),
    LBracket,
    RBracket,
    LBrace,
    RBrace,
    LParen,
    RParen,
    Pipe,
    Comma,
    Colon,
    Question,
    /// `//`
    Alt,
    Assign,
    /// `|=`
    UpdateAssign,
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
    Plus,
    Minus,
    Star,
    Slash,
    Percent,
    Eof,
}

impl Token {
    pub fn describe(&self) -> String {
        let symbol = match self {
            Token::Dot => ".",
            Token::Field(name) => return format!("'.{}'", name),
            Token::Ident(name) => return format!("'{}'", name),
            Token::Str(s) => return format!("string {:?}", s),
            Token::Num(n) => return format!("number {}", n),
            Token::LBracket => "[",
            Token::RBracket => "]",
            Token::LBrace => "{",
            Token::RBrace => "}",
            Token::LParen => "(",
            Token::RParen => ")",
            Token::Pipe => "|",
            Token::Comma => ",",
            Token::Colon => ":",
            Token::Question => "?",
            Token::Alt => "//",
            Token::Assign => "=",
            Token::UpdateAssign => "|=",
            Token::Eq => "==",
            Token::Ne => "!=",
            Token::Lt => "<",
            Token::Le => "<=",
            Token::Gt => ">",
            Token::Ge => ">=",
            Token::Plus => "+",
            Token::Minus => "-",
            Token::Star => "*",
            Token::Slash => "/",
            Token::Percent => "%",
            Token::Eof => return "end of input".to_string(),
        };
        format!("'{}'", symbol)
    }
}

/// A token and the byte offset where it starts.
#[derive(Debug, Clone, PartialEq)]
pub struct Spanned {
    pub token: Token,
    pub pos: usize,
}

pub fn tokenize(source: &str) -> Result<Vec<Spanned>, SyntaxError> {
    let mut chars = source.char_indices().peekable();
    let mut tokens = Vec::new();

    while let Some(&(pos, c)) = chars.peek() {
        if c.is_whitespace() {
            chars.next();
            continue;
        }
        if c == '#' {
            while chars.next_if(|&(_, c)| c != '\n').is_some() {}
            continue;
        }

        let token = match c {
            '.' => {
                chars.next();
                match chars.peek() {
                    Some(&(_, next)) if is_ident_start(next) => Token::Field(consume_ident(&mut chars)),
                    Some(&(_, '.')) => {
                        return Err(SyntaxError::new(
                            pos,
                            "recursive descent '..' is not supported",
                        ))
                    }
                    _ => Token::Dot,
                }
            }
            '"' => {
                chars.next();
                Token::Str(consume_string(&mut chars, pos)?)
            }
            d if d.is_ascii_digit() => Token::Num(consume_number(&mut chars, pos)?),
            c if is_ident_start(c) => Token::Ident(consume_ident(&mut chars)),
            '!' => {
                chars.next();
                if chars.next_if(|&(_, c)| c == '=').is_none() {
                    return Err(SyntaxError::new(pos, "unexpected character '!'"));
                }
                Token::Ne
            }
            '=' | '<' | '>' | '|' => {
                chars.next();
                let followed_by_eq = chars.next_if(|&(_, c)| c == '=').is_some();
                match (c, followed_by_eq) {
                    ('=', true) => Token::Eq,
                    ('=', false) => Token::Assign,
                    ('<', true) => Token::Le,
                    ('<', false) => Token::Lt,
                    ('>', true) => Token::Ge,
                    ('>', false) => Token::Gt,
                    (_, true) => Token::UpdateAssign,
                    (_, false) => Token::Pipe,
                }
            }
            '/' => {
                chars.next();
                if chars.next_if(|&(_, c)| c == '/').is_some() {
                    Token::Alt
                } else {
                    Token::Slash
                }
            }
            _ => {
                chars.next();
                match c {
                    '[' => Token::LBracket,
                    ']' => Token::RBracket,
                    '{' => Token::LBrace,
                    '}' => Token::RBrace,
                    '(' => Token::LParen,
                    ')' => Token::RParen,
                    ',' => Token::Comma,
                    ':' => Token::Colon,
                    '?' => Token::Question,
                    '+' => Token::Plus,
                    '-' => Token::Minus,
                    '*' => Token::Star,
                    '%' => Token::Percent,
                    other => {
                        return Err(SyntaxError::new(
                            pos,
                            format!("unexpected character '{}'", other),
                        ))
                    }
                }
            }
        };

        tokens.push(Spanned { token, pos });
    }

    tokens.push(Spanned {
        token: Token::Eof,
        pos: source.len(),
    });
    Ok(tokens)
}

fn is_ident_start(c: char) -> bool {
    c.is_ascii_alphabetic() || c == '_'
}

fn consume_ident(chars: &mut Peekable<CharIndices>) -> String {
    let mut ident = String::new();
    while let Some(&(_, c)) = chars.peek() {
        if c.is_ascii_alphanumeric() || c == '_' {
            ident.push(c);
            chars.next();
        } else {
            break;
        }
    }
    ident
}

fn consume_number(chars: &mut Peekable<CharIndices>, start: usize) -> Result<f64, SyntaxError> {
    let mut text = String::new();
    while let Some(&(_, c)) = chars.peek() {
        if c.is_ascii_digit() || c == '.' {
            text.push(c);
            chars.next();
        } else {
            break;
        }
    }
    text.parse::<f64>()
        .map_err(|_| SyntaxError::new(start, format!("invalid number '{}'", text)))
}

fn consume_string(chars: &mut Peekable<CharIndices>, start: usize) -> Result<String, SyntaxError> {
    let mut value = String::new();
    loop {
        let Some((pos, c)) = chars.next() else {
            return Err(SyntaxError::new(start, "unterminated string literal"));
        };
        match c {
            '"' => return Ok(value),
            '\\' => {
                let Some((_, escaped)) = chars.next() else {
                    return Err(SyntaxError::new(start, "unterminated string literal"));
                };
                match escaped {
                    '"' => value.push('"'),
                    '\\' => value.push('\\'),
                    '/' => value.push('/'),
                    'n' => value.push('\n'),
                    't' => value.push('\t'),
                    'r' => value.push('\r'),
                    'u' => value.push(consume_unicode_escape(chars, pos)?),
                    '(' => {
                        return Err(SyntaxError::new(
                            pos,
                            "string interpolation is not supported",
                        ))
                    }
                    other => {
                        return Err(SyntaxError::new(
                            pos,
                            format!("invalid escape '\\{}'", other),
                        ))
                    }
                }
            }
            other => value.push(other),
        }
    }
}

fn consume_unicode_escape(
    chars: &mut Peekable<CharIndices>,
    pos: usize,
) -> Result<char, SyntaxError> {
    let hex: String = (0..4).filter_map(|_| chars.next().map(|(_, c)| c)).collect();
    u32::from_str_radix(&hex, 16)
        .ok()
        .filter(|_| hex.len() == 4)
        .and_then(char::from_u32)
        .ok_or_else(|| SyntaxError::new(pos, format!("invalid unicode escape '\\u{}'", hex)))
}
