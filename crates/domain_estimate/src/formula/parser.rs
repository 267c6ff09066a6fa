//! Recursive-descent parser producing an unresolved syntax tree
//!
//! ```text
//! expr    := term (('+' | '-') term)*
//! term    := unary (('*' | '/') unary)*
//! unary   := '-' unary | primary
//! primary := NUMBER | IDENT | IDENT '(' args? ')' | '(' expr ')'
//! args    := expr (',' expr)*
//! ```
//!
//! Identifiers are kept as written; the resolver decides whether they name
//! a metric, a helper function, or nothing on the whitelist.

use rust_decimal::Decimal;

use super::lexer::{Token, TokenKind};
use super::{FormulaError, MAX_DEPTH};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum BinaryOp {
    Add,
    Sub,
    Mul,
    Div,
}

impl BinaryOp {
    pub fn symbol(&self) -> char {
        match self {
            BinaryOp::Add => '+',
            BinaryOp::Sub => '-',
            BinaryOp::Mul => '*',
            BinaryOp::Div => '/',
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum Expr {
    Number(Decimal),
    /// A name, with an argument list when written as a call
    Identifier {
        name: String,
        args: Option<Vec<Expr>>,
        position: usize,
    },
    Negate(Box<Expr>),
    Binary {
        op: BinaryOp,
        lhs: Box<Expr>,
        rhs: Box<Expr>,
    },
}

pub(crate) fn parse(tokens: &[Token], source_len: usize) -> Result<Expr, FormulaError> {
    let mut parser = Parser {
        tokens,
        pos: 0,
        depth: 0,
        source_len,
    };
    let expr = parser.expression()?;
    match parser.peek() {
        None => Ok(expr),
        Some(token) => Err(FormulaError::Parse {
            position: token.position,
            message: "unexpected token after end of expression".to_string(),
        }),
    }
}

struct Parser<'a> {
    tokens: &'a [Token],
    pos: usize,
    depth: usize,
    source_len: usize,
}

impl<'a> Parser<'a> {
    fn peek(&self) -> Option<&'a Token> {
        self.tokens.get(self.pos)
    }

    fn advance(&mut self) -> Option<&'a Token> {
        let token = self.tokens.get(self.pos);
        if token.is_some() {
            self.pos += 1;
        }
        token
    }

    fn check(&self, kind: &TokenKind) -> bool {
        self.peek().map(|t| &t.kind == kind).unwrap_or(false)
    }

    fn expect(&mut self, kind: TokenKind, what: &str) -> Result<(), FormulaError> {
        match self.advance() {
            Some(token) if token.kind == kind => Ok(()),
            Some(token) => Err(FormulaError::Parse {
                position: token.position,
                message: format!("expected {}", what),
            }),
            None => Err(self.unexpected_end(what)),
        }
    }

    fn unexpected_end(&self, what: &str) -> FormulaError {
        FormulaError::Parse {
            position: self.source_len,
            message: format!("unexpected end of formula, expected {}", what),
        }
    }

    fn enter(&mut self) -> Result<(), FormulaError> {
        self.depth += 1;
        if self.depth > MAX_DEPTH {
            return Err(FormulaError::TooDeep { max: MAX_DEPTH });
        }
        Ok(())
    }

    fn leave(&mut self) {
        self.depth -= 1;
    }

    fn expression(&mut self) -> Result<Expr, FormulaError> {
        self.enter()?;
        let mut lhs = self.term()?;
        loop {
            let op = match self.peek().map(|t| &t.kind) {
                Some(TokenKind::Plus) => BinaryOp::Add,
                Some(TokenKind::Minus) => BinaryOp::Sub,
                _ => break,
            };
            self.advance();
            let rhs = self.term()?;
            lhs = Expr::Binary {
                op,
                lhs: Box::new(lhs),
                rhs: Box::new(rhs),
            };
        }
        self.leave();
        Ok(lhs)
    }

    fn term(&mut self) -> Result<Expr, FormulaError> {
        let mut lhs = self.unary()?;
        loop {
            let op = match self.peek().map(|t| &t.kind) {
                Some(TokenKind::Star) => BinaryOp::Mul,
                Some(TokenKind::Slash) => BinaryOp::Div,
                _ => break,
            };
            self.advance();
            let rhs = self.unary()?;
            lhs = Expr::Binary {
                op,
                lhs: Box::new(lhs),
                rhs: Box::new(rhs),
            };
        }
        Ok(lhs)
    }

    fn unary(&mut self) -> Result<Expr, FormulaError> {
        if self.check(&TokenKind::Minus) {
            self.advance();
            self.enter()?;
            let operand = self.unary()?;
            self.leave();
            return Ok(Expr::Negate(Box::new(operand)));
        }
        self.primary()
    }

    fn primary(&mut self) -> Result<Expr, FormulaError> {
        let token = self.advance().ok_or_else(|| self.unexpected_end("a value"))?;
        match &token.kind {
            TokenKind::Number(value) => Ok(Expr::Number(*value)),
            TokenKind::Ident(name) => {
                if !self.check(&TokenKind::LParen) {
                    return Ok(Expr::Identifier {
                        name: name.clone(),
                        args: None,
                        position: token.position,
                    });
                }
                self.advance();
                let mut args = Vec::new();
                if !self.check(&TokenKind::RParen) {
                    loop {
                        args.push(self.expression()?);
                        if self.check(&TokenKind::Comma) {
                            self.advance();
                        } else {
                            break;
                        }
                    }
                }
                self.expect(TokenKind::RParen, "')' to close argument list")?;
                Ok(Expr::Identifier {
                    name: name.clone(),
                    args: Some(args),
                    position: token.position,
                })
            }
            TokenKind::LParen => {
                let inner = self.expression()?;
                self.expect(TokenKind::RParen, "')'")?;
                Ok(inner)
            }
            _ => Err(FormulaError::Parse {
                position: token.position,
                message: "expected a number, metric or function".to_string(),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::formula::lexer::tokenize;
    use rust_decimal_macros::dec;

    fn parse_str(input: &str) -> Result<Expr, FormulaError> {
        parse(&tokenize(input)?, input.len())
    }

    #[test]
    fn test_precedence() {
        let expr = parse_str("1 + 2 * 3").unwrap();
        match expr {
            Expr::Binary { op: BinaryOp::Add, rhs, .. } => {
                assert!(matches!(*rhs, Expr::Binary { op: BinaryOp::Mul, .. }));
            }
            other => panic!("unexpected tree {:?}", other),
        }
    }

    #[test]
    fn test_call_with_arguments() {
        let expr = parse_str("MAX(3, 4)").unwrap();
        match expr {
            Expr::Identifier { name, args: Some(args), .. } => {
                assert_eq!(name, "MAX");
                assert_eq!(args, vec![Expr::Number(dec!(3)), Expr::Number(dec!(4))]);
            }
            other => panic!("unexpected tree {:?}", other),
        }
    }

    #[test]
    fn test_unbalanced_parentheses() {
        assert!(matches!(parse_str("(1 + 2"), Err(FormulaError::Parse { .. })));
        assert!(matches!(parse_str("1 + 2)"), Err(FormulaError::Parse { .. })));
    }

    #[test]
    fn test_dangling_operator() {
        assert!(matches!(parse_str("FLOOR_SF(zone) *"), Err(FormulaError::Parse { .. })));
    }

    #[test]
    fn test_depth_limit() {
        let deep = format!("{}1{}", "(".repeat(MAX_DEPTH + 1), ")".repeat(MAX_DEPTH + 1));
        assert!(matches!(parse_str(&deep), Err(FormulaError::TooDeep { .. })));
    }
}
