//! The scan query language — a small predicate grammar over advertisements.
//!
//! A query is compiled once, at scan start, into an AST and evaluated as a
//! pure function of an advertisement. The grammar:
//!
//! ```text
//! Query   := '' | OrExpr
//! OrExpr  := AndExpr { 'or' AndExpr }
//! AndExpr := Clause  { 'and' Clause }
//! Clause  := '(' OrExpr ')'
//!          | 'v.InterfaceName' '=' StringLit
//!          | 'v.Attributes' '[' StringLit ']' '=' StringLit
//! ```
//!
//! The empty query matches every advertisement. String comparison is exact.
//! Malformed input is rejected at compile time with a position-carrying
//! [`QueryError`] — never per-event.

use std::fmt;

use crate::ad::Advertisement;

// ── AST ───────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq)]
enum Expr {
    /// Matches every advertisement. Produced only by the empty query.
    All,
    /// `v.InterfaceName = <literal>`, exact equality.
    InterfaceEq(String),
    /// `v.Attributes[<key>] = <literal>`; absent key never matches.
    AttributeEq(String, String),
    And(Box<Expr>, Box<Expr>),
    Or(Box<Expr>, Box<Expr>),
}

impl Expr {
    fn eval(&self, ad: &Advertisement) -> bool {
        match self {
            Expr::All => true,
            Expr::InterfaceEq(name) => ad.interface_name == *name,
            Expr::AttributeEq(key, value) => {
                ad.attributes.get(key).map(|v| v == value).unwrap_or(false)
            }
            Expr::And(l, r) => l.eval(ad) && r.eval(ad),
            Expr::Or(l, r) => l.eval(ad) || r.eval(ad),
        }
    }
}

/// A compiled query. Evaluation is pure and side-effect-free: the same query
/// against the same advertisement always yields the same answer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Query {
    expr: Expr,
    source: String,
}

impl Query {
    /// Compile a query string. Empty input compiles to match-all.
    pub fn parse(source: &str) -> Result<Query, QueryError> {
        let expr = if source.trim().is_empty() {
            Expr::All
        } else {
            let mut p = Parser::new(source);
            let expr = p.or_expr()?;
            p.skip_ws();
            if let Some((pos, ch)) = p.peek() {
                return Err(QueryError::TrailingInput { pos, ch });
            }
            expr
        };
        Ok(Query {
            expr,
            source: source.to_string(),
        })
    }

    /// Does this query select the given advertisement?
    pub fn matches(&self, ad: &Advertisement) -> bool {
        self.expr.eval(ad)
    }

    /// The query string this was compiled from.
    pub fn source(&self) -> &str {
        &self.source
    }
}

impl fmt::Display for Query {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.source)
    }
}

// ── Errors ────────────────────────────────────────────────────────────────────

/// Query compilation failures. Positions are byte offsets into the source.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum QueryError {
    #[error("expected {expected} at offset {pos}")]
    Expected { expected: &'static str, pos: usize },

    #[error("unterminated string literal starting at offset {pos}")]
    UnterminatedString { pos: usize },

    #[error("unknown field selector at offset {pos} (expected v.InterfaceName or v.Attributes)")]
    UnknownField { pos: usize },

    #[error("unexpected trailing input '{ch}' at offset {pos}")]
    TrailingInput { pos: usize, ch: char },

    #[error("unexpected end of query")]
    UnexpectedEnd,
}

// ── Parser ────────────────────────────────────────────────────────────────────

struct Parser<'a> {
    src: &'a str,
    pos: usize,
}

impl<'a> Parser<'a> {
    fn new(src: &'a str) -> Self {
        Parser { src, pos: 0 }
    }

    fn peek(&self) -> Option<(usize, char)> {
        self.src[self.pos..].chars().next().map(|c| (self.pos, c))
    }

    fn bump(&mut self) -> Option<char> {
        let c = self.src[self.pos..].chars().next()?;
        self.pos += c.len_utf8();
        Some(c)
    }

    fn skip_ws(&mut self) {
        while let Some((_, c)) = self.peek() {
            if c.is_whitespace() {
                self.bump();
            } else {
                break;
            }
        }
    }

    /// Consume `word` if it appears next (followed by a non-ident boundary).
    fn eat_keyword(&mut self, word: &str) -> bool {
        self.skip_ws();
        let rest = &self.src[self.pos..];
        if !rest.starts_with(word) {
            return false;
        }
        let boundary = rest[word.len()..]
            .chars()
            .next()
            .map(|c| !c.is_alphanumeric() && c != '_')
            .unwrap_or(true);
        if boundary {
            self.pos += word.len();
            true
        } else {
            false
        }
    }

    fn expect_char(&mut self, want: char, expected: &'static str) -> Result<(), QueryError> {
        self.skip_ws();
        match self.peek() {
            Some((_, c)) if c == want => {
                self.bump();
                Ok(())
            }
            Some((pos, _)) => Err(QueryError::Expected { expected, pos }),
            None => Err(QueryError::UnexpectedEnd),
        }
    }

    /// Parse a double-quoted string literal with `\"` and `\\` escapes.
    fn string_lit(&mut self) -> Result<String, QueryError> {
        self.skip_ws();
        let start = self.pos;
        match self.peek() {
            Some((_, '"')) => {
                self.bump();
            }
            Some((pos, _)) => {
                return Err(QueryError::Expected {
                    expected: "string literal",
                    pos,
                })
            }
            None => return Err(QueryError::UnexpectedEnd),
        }

        let mut out = String::new();
        loop {
            match self.bump() {
                Some('"') => return Ok(out),
                Some('\\') => match self.bump() {
                    Some(c @ ('"' | '\\')) => out.push(c),
                    Some(c) => {
                        out.push('\\');
                        out.push(c);
                    }
                    None => return Err(QueryError::UnterminatedString { pos: start }),
                },
                Some(c) => out.push(c),
                None => return Err(QueryError::UnterminatedString { pos: start }),
            }
        }
    }

    fn or_expr(&mut self) -> Result<Expr, QueryError> {
        let mut lhs = self.and_expr()?;
        while self.eat_keyword("or") {
            let rhs = self.and_expr()?;
            lhs = Expr::Or(Box::new(lhs), Box::new(rhs));
        }
        Ok(lhs)
    }

    fn and_expr(&mut self) -> Result<Expr, QueryError> {
        let mut lhs = self.clause()?;
        while self.eat_keyword("and") {
            let rhs = self.clause()?;
            lhs = Expr::And(Box::new(lhs), Box::new(rhs));
        }
        Ok(lhs)
    }

    fn clause(&mut self) -> Result<Expr, QueryError> {
        self.skip_ws();
        match self.peek() {
            Some((_, '(')) => {
                self.bump();
                let inner = self.or_expr()?;
                self.expect_char(')', "')'")?;
                Ok(inner)
            }
            Some(_) => self.field_clause(),
            None => Err(QueryError::UnexpectedEnd),
        }
    }

    fn field_clause(&mut self) -> Result<Expr, QueryError> {
        let field_pos = self.pos;
        if self.eat_keyword("v.InterfaceName") {
            self.expect_char('=', "'='")?;
            let lit = self.string_lit()?;
            Ok(Expr::InterfaceEq(lit))
        } else if self.eat_keyword("v.Attributes") {
            self.expect_char('[', "'['")?;
            let key = self.string_lit()?;
            self.expect_char(']', "']'")?;
            self.expect_char('=', "'='")?;
            let lit = self.string_lit()?;
            Ok(Expr::AttributeEq(key, lit))
        } else {
            Err(QueryError::UnknownField { pos: field_pos })
        }
    }
}
