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

//! Recursive-descent parser for filter expressions.
//!
//! Precedence, loosest first: `|` (right associative), `,`, `//` (right
//! associative), `=` and `|=`, `or`, `and`, comparisons, `+`/`-`,
//! `*`/`/`/`%`, unary `-`, then postfix terms such as `.a[0]?`.

use super::lexer::{tokenize, Spanned, Token};
use super::SyntaxError;
use serde_json::{Number, Value};

/// Deepest nesting a filter may reach before it is rejected.
pub const MAX_DEPTH: usize = 128;

#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    Identity,
    Literal(Value),
    /// `target[index]`; `.name` is `Index(Identity, "name")`
    Index {
        target: Box<Expr>,
        index: Box<Expr>,
    },
    Iterate(Box<Expr>),
    /// `expr?`: an error raised by `expr` ends its output quietly
    Try(Box<Expr>),
    Pipe(Box<Expr>, Box<Expr>),
    Comma(Box<Expr>, Box<Expr>),
    /// `lhs // rhs`
    Alternative(Box<Expr>, Box<Expr>),
    Compare {
        op: CompareOp,
        lhs: Box<Expr>,
        rhs: Box<Expr>,
    },
    Arith {
        op: ArithOp,
        lhs: Box<Expr>,
        rhs: Box<Expr>,
    },
    Neg(Box<Expr>),
    And(Box<Expr>, Box<Expr>),
    Or(Box<Expr>, Box<Expr>),
    If {
        cond: Box<Expr>,
        then: Box<Expr>,
        /// `None` when there is no `else`, which passes the input through
        otherwise: Option<Box<Expr>>,
    },
    /// `path = value`
    Assign {
        path: Box<Expr>,
        value: Box<Expr>,
    },
    /// `path |= update`
    Update {
        path: Box<Expr>,
        update: Box<Expr>,
    },
    Array(Option<Box<Expr>>),
    Object(Vec<(Expr, Expr)>),
    Builtin(Builtin),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompareOp {
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArithOp {
    Add,
    Sub,
    Mul,
    Div,
    Mod,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Builtin {
    Del(Box<Expr>),
    Select(Box<Expr>),
    Has(Box<Expr>),
    StartsWith(Box<Expr>),
    EndsWith(Box<Expr>),
    /// `error` raises its input, `error(msg)` raises `msg`
    Error(Option<Box<Expr>>),
    Keys,
    Length,
    Not,
    Empty,
    ToEntries,
    FromEntries,
    Type,
    Add,
    Sort,
}

const KEYWORDS: [&str; 7] = ["then", "elif", "else", "end", "and", "or", "if"];

pub fn parse(source: &str) -> Result<Expr, SyntaxError> {
    let tokens = tokenize(source)?;
    let mut parser = Parser {
        tokens,
        cursor: 0,
        depth: 0,
    };

    if parser.peek() == &Token::Eof {
        return Err(SyntaxError::new(0, "empty filter expression"));
    }

    let expr = parser.parse_pipe(true)?;
    match parser.peek() {
        Token::Eof => Ok(expr),
        other => Err(SyntaxError::new(
            parser.pos(),
            format!("unexpected {}", other.describe()),
        )),
    }
}

struct Parser {
    tokens: Vec<Spanned>,
    cursor: usize,
    /// Nesting of the expression being built. Each level restores it on
    /// the way out.
    depth: usize,
}

impl Parser {
    fn peek(&self) -> &Token {
        &self.tokens[self.cursor].token
    }

    fn pos(&self) -> usize {
        self.tokens[self.cursor].pos
    }

    fn advance(&mut self) -> Token {
        let token = self.tokens[self.cursor].token.clone();
        if token != Token::Eof {
            self.cursor += 1;
        }
        token
    }

    fn at_keyword(&self, keyword: &str) -> bool {
        matches!(self.peek(), Token::Ident(name) if name == keyword)
    }

    fn expect(&mut self, expected: Token) -> Result<(), SyntaxError> {
        if self.peek() == &expected {
            self.advance();
            Ok(())
        } else {
            Err(SyntaxError::new(
                self.pos(),
                format!(
                    "expected {} but found {}",
                    expected.describe(),
                    self.peek().describe()
                ),
            ))
        }
    }

    fn expect_keyword(&mut self, keyword: &str) -> Result<(), SyntaxError> {
        if self.at_keyword(keyword) {
            self.advance();
            Ok(())
        } else {
            Err(SyntaxError::new(
                self.pos(),
                format!("expected '{}' but found {}", keyword, self.peek().describe()),
            ))
        }
    }

    fn nest(&mut self) -> Result<(), SyntaxError> {
        self.depth += 1;
        if self.depth > MAX_DEPTH {
            return Err(SyntaxError::new(
                self.pos(),
                format!("filter is nested more than {} levels deep", MAX_DEPTH),
            ));
        }
        Ok(())
    }

    /// Object values may not contain a top-level comma, since `,` separates
    /// the entries there.
    fn parse_pipe(&mut self, allow_comma: bool) -> Result<Expr, SyntaxError> {
        let depth = self.depth;
        self.nest()?;

        let first = self.parse_pipe_segment(allow_comma)?;
        let mut rest = Vec::new();
        while self.peek() == &Token::Pipe {
            self.advance();
            self.nest()?;
            rest.push(self.parse_pipe_segment(allow_comma)?);
        }

        self.depth = depth;
        Ok(fold_right(first, rest, Expr::Pipe))
    }

    fn parse_pipe_segment(&mut self, allow_comma: bool) -> Result<Expr, SyntaxError> {
        if allow_comma {
            self.parse_comma()
        } else {
            self.parse_alternative()
        }
    }

    fn parse_comma(&mut self) -> Result<Expr, SyntaxError> {
        let depth = self.depth;
        let mut expr = self.parse_alternative()?;
        while self.peek() == &Token::Comma {
            self.advance();
            self.nest()?;
            let rhs = self.parse_alternative()?;
            expr = Expr::Comma(Box::new(expr), Box::new(rhs));
        }
        self.depth = depth;
        Ok(expr)
    }

    fn parse_alternative(&mut self) -> Result<Expr, SyntaxError> {
        let depth = self.depth;
        let first = self.parse_assignment()?;
        let mut rest = Vec::new();
        while self.peek() == &Token::Alt {
            self.advance();
            self.nest()?;
            rest.push(self.parse_assignment()?);
        }
        self.depth = depth;
        Ok(fold_right(first, rest, Expr::Alternative))
    }

    fn parse_assignment(&mut self) -> Result<Expr, SyntaxError> {
        let lhs = self.parse_or()?;
        let pos = self.pos();
        let operator = self.peek().clone();
        if !matches!(operator, Token::Assign | Token::UpdateAssign) {
            return Ok(lhs);
        }
        self.advance();

        if !is_path_expression(&lhs) {
            return Err(SyntaxError::new(
                pos,
                format!(
                    "left side of {} must be a path expression such as .a or .a[0]",
                    operator.describe()
                ),
            ));
        }

        let depth = self.depth;
        self.nest()?;
        let rhs = self.parse_or()?;
        self.depth = depth;

        if matches!(self.peek(), Token::Assign | Token::UpdateAssign) {
            return Err(SyntaxError::new(
                self.pos(),
                "assignment operators cannot be chained",
            ));
        }

        let (path, rhs) = (Box::new(lhs), Box::new(rhs));
        Ok(match operator {
            Token::Assign => Expr::Assign { path, value: rhs },
            _ => Expr::Update { path, update: rhs },
        })
    }

    fn parse_or(&mut self) -> Result<Expr, SyntaxError> {
        let depth = self.depth;
        let mut expr = self.parse_and()?;
        while self.at_keyword("or") {
            self.advance();
            self.nest()?;
            let rhs = self.parse_and()?;
            expr = Expr::Or(Box::new(expr), Box::new(rhs));
        }
        self.depth = depth;
        Ok(expr)
    }

    fn parse_and(&mut self) -> Result<Expr, SyntaxError> {
        let depth = self.depth;
        let mut expr = self.parse_comparison()?;
        while self.at_keyword("and") {
            self.advance();
            self.nest()?;
            let rhs = self.parse_comparison()?;
            expr = Expr::And(Box::new(expr), Box::new(rhs));
        }
        self.depth = depth;
        Ok(expr)
    }

    fn parse_comparison(&mut self) -> Result<Expr, SyntaxError> {
        let lhs = self.parse_additive()?;
        let Some(op) = compare_op(self.peek()) else {
            return Ok(lhs);
        };
        self.advance();
        let rhs = self.parse_additive()?;

        if compare_op(self.peek()).is_some() {
            return Err(SyntaxError::new(
                self.pos(),
                "comparison operators cannot be chained",
            ));
        }

        Ok(Expr::Compare {
            op,
            lhs: Box::new(lhs),
            rhs: Box::new(rhs),
        })
    }

    fn parse_additive(&mut self) -> Result<Expr, SyntaxError> {
        let depth = self.depth;
        let mut expr = self.parse_multiplicative()?;
        while let Some(op) = additive_op(self.peek()) {
            self.advance();
            self.nest()?;
            let rhs = self.parse_multiplicative()?;
            expr = arith(op, expr, rhs);
        }
        self.depth = depth;
        Ok(expr)
    }

    fn parse_multiplicative(&mut self) -> Result<Expr, SyntaxError> {
        let depth = self.depth;
        let mut expr = self.parse_unary()?;
        while let Some(op) = multiplicative_op(self.peek()) {
            self.advance();
            self.nest()?;
            let rhs = self.parse_unary()?;
            expr = arith(op, expr, rhs);
        }
        self.depth = depth;
        Ok(expr)
    }

    fn parse_unary(&mut self) -> Result<Expr, SyntaxError> {
        if self.peek() != &Token::Minus {
            return self.parse_postfix();
        }
        self.advance();

        let depth = self.depth;
        self.nest()?;
        let operand = self.parse_unary()?;
        self.depth = depth;

        if let Expr::Literal(Value::Number(n)) = &operand {
            if let Some(n) = n.as_f64() {
                return Ok(Expr::Literal(number(-n)));
            }
        }
        Ok(Expr::Neg(Box::new(operand)))
    }

    fn parse_postfix(&mut self) -> Result<Expr, SyntaxError> {
        let depth = self.depth;
        let mut expr = self.parse_primary()?;

        loop {
            let next = self.peek().clone();
            if matches!(
                next,
                Token::Field(_) | Token::Dot | Token::LBracket | Token::Question
            ) {
                self.nest()?;
            }
            match next {
                Token::Field(name) => {
                    self.advance();
                    expr = index(expr, Expr::Literal(Value::String(name)));
                }
                Token::Dot => {
                    // `.a."b"` and `.a.[0]`
                    self.advance();
                    match self.peek().clone() {
                        Token::Str(key) => {
                            self.advance();
                            expr = index(expr, Expr::Literal(Value::String(key)));
                        }
                        Token::LBracket => {
                            expr = self.parse_bracket(expr)?;
                        }
                        other => {
                            return Err(SyntaxError::new(
                                self.pos(),
                                format!("unexpected {} after '.'", other.describe()),
                            ))
                        }
                    }
                }
                Token::LBracket => {
                    expr = self.parse_bracket(expr)?;
                }
                Token::Question => {
                    self.advance();
                    expr = Expr::Try(Box::new(expr));
                }
                _ => {
                    self.depth = depth;
                    return Ok(expr);
                }
            }
        }
    }

    /// Parses `[]` or `[expr]` applied to `target`.
    fn parse_bracket(&mut self, target: Expr) -> Result<Expr, SyntaxError> {
        self.expect(Token::LBracket)?;
        if self.peek() == &Token::RBracket {
            self.advance();
            return Ok(Expr::Iterate(Box::new(target)));
        }
        let idx = self.parse_pipe(true)?;
        self.expect(Token::RBracket)?;
        Ok(index(target, idx))
    }

    fn parse_primary(&mut self) -> Result<Expr, SyntaxError> {
        let pos = self.pos();
        match self.advance() {
            Token::Dot => match self.peek().clone() {
                Token::Str(key) => {
                    self.advance();
                    Ok(index(Expr::Identity, Expr::Literal(Value::String(key))))
                }
                _ => Ok(Expr::Identity),
            },
            Token::Field(name) => Ok(index(
                Expr::Identity,
                Expr::Literal(Value::String(name)),
            )),
            Token::Str(s) => Ok(Expr::Literal(Value::String(s))),
            Token::Num(n) => Ok(Expr::Literal(number(n))),
            Token::LParen => {
                let expr = self.parse_pipe(true)?;
                self.expect(Token::RParen)?;
                Ok(expr)
            }
            Token::LBracket => {
                if self.peek() == &Token::RBracket {
                    self.advance();
                    return Ok(Expr::Array(None));
                }
                let inner = self.parse_pipe(true)?;
                self.expect(Token::RBracket)?;
                Ok(Expr::Array(Some(Box::new(inner))))
            }
            Token::LBrace => self.parse_object(),
            Token::Ident(name) => self.parse_ident(name, pos),
            other => Err(SyntaxError::new(
                pos,
                format!("unexpected {}", other.describe()),
            )),
        }
    }

    fn parse_ident(&mut self, name: String, pos: usize) -> Result<Expr, SyntaxError> {
        let builtin = match name.as_str() {
            "null" => return Ok(Expr::Literal(Value::Null)),
            "true" => return Ok(Expr::Literal(Value::Bool(true))),
            "false" => return Ok(Expr::Literal(Value::Bool(false))),
            "if" => return self.parse_if(),
            "keys" => Builtin::Keys,
            "length" => Builtin::Length,
            "not" => Builtin::Not,
            "empty" => Builtin::Empty,
            "to_entries" => Builtin::ToEntries,
            "from_entries" => Builtin::FromEntries,
            "type" => Builtin::Type,
            "add" => Builtin::Add,
            "sort" => Builtin::Sort,
            "error" => {
                let message = if self.peek() == &Token::LParen {
                    Some(Box::new(self.parse_call_argument(&name)?))
                } else {
                    None
                };
                Builtin::Error(message)
            }
            "del" => {
                let arg = self.parse_call_argument(&name)?;
                if !is_path_expression(&arg) {
                    return Err(SyntaxError::new(
                        pos,
                        "del() argument must be a path expression such as .a or .a[0]",
                    ));
                }
                Builtin::Del(Box::new(arg))
            }
            "select" => Builtin::Select(Box::new(self.parse_call_argument(&name)?)),
            "has" => Builtin::Has(Box::new(self.parse_call_argument(&name)?)),
            "startswith" => Builtin::StartsWith(Box::new(self.parse_call_argument(&name)?)),
            "endswith" => Builtin::EndsWith(Box::new(self.parse_call_argument(&name)?)),
            "map" => return Ok(map(self.parse_call_argument(&name)?)),
            "map_values" => {
                let update = self.parse_call_argument(&name)?;
                return Ok(Expr::Update {
                    path: Box::new(Expr::Iterate(Box::new(Expr::Identity))),
                    update: Box::new(update),
                });
            }
            "with_entries" => {
                let f = self.parse_call_argument(&name)?;
                return Ok(Expr::Pipe(
                    Box::new(Expr::Builtin(Builtin::ToEntries)),
                    Box::new(Expr::Pipe(
                        Box::new(map(f)),
                        Box::new(Expr::Builtin(Builtin::FromEntries)),
                    )),
                ));
            }
            keyword if KEYWORDS.contains(&keyword) => {
                return Err(SyntaxError::new(pos, format!("unexpected '{}'", name)))
            }
            _ => {
                return Err(SyntaxError::new(
                    pos,
                    format!("unknown function '{}'", name),
                ))
            }
        };
        Ok(Expr::Builtin(builtin))
    }

    /// `if c then a (elif c then a)* (else b)? end`, with the leading `if`
    /// already consumed.
    fn parse_if(&mut self) -> Result<Expr, SyntaxError> {
        let cond = self.parse_pipe(true)?;
        self.expect_keyword("then")?;
        let then = self.parse_pipe(true)?;

        let otherwise = if self.at_keyword("elif") {
            self.advance();
            let depth = self.depth;
            self.nest()?;
            let elif = self.parse_if()?;
            self.depth = depth;
            Some(Box::new(elif))
        } else if self.at_keyword("else") {
            self.advance();
            let otherwise = self.parse_pipe(true)?;
            self.expect_keyword("end")?;
            Some(Box::new(otherwise))
        } else {
            self.expect_keyword("end")?;
            None
        };

        Ok(Expr::If {
            cond: Box::new(cond),
            then: Box::new(then),
            otherwise,
        })
    }

    fn parse_call_argument(&mut self, name: &str) -> Result<Expr, SyntaxError> {
        if self.peek() != &Token::LParen {
            return Err(SyntaxError::new(
                self.pos(),
                format!("{}() requires an argument", name),
            ));
        }
        self.advance();
        let arg = self.parse_pipe(true)?;
        self.expect(Token::RParen)?;
        Ok(arg)
    }

    fn parse_object(&mut self) -> Result<Expr, SyntaxError> {
        let mut entries = Vec::new();

        if self.peek() == &Token::RBrace {
            self.advance();
            return Ok(Expr::Object(entries));
        }

        loop {
            let pos = self.pos();
            let (key, shorthand) = match self.advance() {
                Token::Ident(name) => (Expr::Literal(Value::String(name.clone())), Some(name)),
                Token::Str(name) => (Expr::Literal(Value::String(name.clone())), Some(name)),
                Token::LParen => {
                    let key = self.parse_pipe(true)?;
                    self.expect(Token::RParen)?;
                    (key, None)
                }
                other => {
                    return Err(SyntaxError::new(
                        pos,
                        format!("unexpected {} in object key", other.describe()),
                    ))
                }
            };

            let value = if self.peek() == &Token::Colon {
                self.advance();
                self.parse_pipe(false)?
            } else if let Some(name) = shorthand {
                // `{name}` is `{name: .name}`
                index(Expr::Identity, Expr::Literal(Value::String(name)))
            } else {
                return Err(SyntaxError::new(
                    self.pos(),
                    "computed object keys require a value",
                ));
            };

            entries.push((key, value));

            match self.advance() {
                Token::Comma => continue,
                Token::RBrace => return Ok(Expr::Object(entries)),
                other => {
                    return Err(SyntaxError::new(
                        self.tokens[self.cursor.saturating_sub(1)].pos,
                        format!("expected ',' or '}}' but found {}", other.describe()),
                    ))
                }
            }
        }
    }
}

fn compare_op(token: &Token) -> Option<CompareOp> {
    match token {
        Token::Eq => Some(CompareOp::Eq),
        Token::Ne => Some(CompareOp::Ne),
        Token::Lt => Some(CompareOp::Lt),
        Token::Le => Some(CompareOp::Le),
        Token::Gt => Some(CompareOp::Gt),
        Token::Ge => Some(CompareOp::Ge),
        _ => None,
    }
}

fn additive_op(token: &Token) -> Option<ArithOp> {
    match token {
        Token::Plus => Some(ArithOp::Add),
        Token::Minus => Some(ArithOp::Sub),
        _ => None,
    }
}

fn multiplicative_op(token: &Token) -> Option<ArithOp> {
    match token {
        Token::Star => Some(ArithOp::Mul),
        Token::Slash => Some(ArithOp::Div),
        Token::Percent => Some(ArithOp::Mod),
        _ => None,
    }
}

/// Joins `first, rest...` into a right-leaning chain.
fn fold_right(first: Expr, mut rest: Vec<Expr>, join: fn(Box<Expr>, Box<Expr>) -> Expr) -> Expr {
    let Some(mut acc) = rest.pop() else {
        return first;
    };
    while let Some(lhs) = rest.pop() {
        acc = join(Box::new(lhs), Box::new(acc));
    }
    join(Box::new(first), Box::new(acc))
}

fn index(target: Expr, idx: Expr) -> Expr {
    Expr::Index {
        target: Box::new(target),
        index: Box::new(idx),
    }
}

fn arith(op: ArithOp, lhs: Expr, rhs: Expr) -> Expr {
    Expr::Arith {
        op,
        lhs: Box::new(lhs),
        rhs: Box::new(rhs),
    }
}

/// `map(f)` is `[.[] | f]`
fn map(f: Expr) -> Expr {
    Expr::Array(Some(Box::new(Expr::Pipe(
        Box::new(Expr::Iterate(Box::new(Expr::Identity))),
        Box::new(f),
    ))))
}

/// Integral values become JSON integers so `2` prints as `2`, not `2.0`.
pub fn number(n: f64) -> Value {
    if n.fract() == 0.0 && n.abs() < i64::MAX as f64 {
        Value::Number(Number::from(n as i64))
    } else {
        Number::from_f64(n).map(Value::Number).unwrap_or(Value::Null)
    }
}

/// Whether `expr` designates locations in its input, as `del` and
/// assignment require.
pub fn is_path_expression(expr: &Expr) -> bool {
    match expr {
        Expr::Identity | Expr::Builtin(Builtin::Empty) | Expr::Builtin(Builtin::Select(_)) => {
            true
        }
        Expr::Index { target, .. } => is_path_expression(target),
        Expr::Iterate(target) | Expr::Try(target) => is_path_expression(target),
        Expr::Pipe(lhs, rhs) | Expr::Comma(lhs, rhs) | Expr::Alternative(lhs, rhs) => {
            is_path_expression(lhs) && is_path_expression(rhs)
        }
        Expr::If {
            then, otherwise, ..
        } => is_path_expression(then) && otherwise.as_deref().map_or(true, is_path_expression),
        _ => false,
    }
}
