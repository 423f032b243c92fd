//! Expression parsing (Pratt)

use std::rc::Rc;

use super::super::ast::{AssignOp, BinOp, Expr, Literal, UnOp};
use super::super::lexer::tokens::TokenKind;
use super::*;

/// What an infix token does once its left operand is parsed
#[derive(Debug, Clone, Copy)]
enum Infix {
    Binary(BinOp),
    Assign(AssignOp),
    Ternary,
    Call,
    Field,
    Index,
}

impl<'a> Parser<'a> {
    pub(crate) fn expression(&mut self) -> ParseResult<Expr> {
        self.parse_expression(BP_LOWEST)
    }

    fn parse_expression(
        &mut self,
        min_bp: u8,
    ) -> ParseResult<Expr> {
        self.nested("expression", |p| p.parse_binding(min_bp))
    }

    fn parse_binding(
        &mut self,
        min_bp: u8,
    ) -> ParseResult<Expr> {
        let mut lhs = self.parse_prefix()?;

        while let Some((bp, infix)) = self.infix_info() {
            if bp < min_bp {
                break;
            }
            self.bump();
            lhs = match infix {
                Infix::Binary(op) => {
                    let rhs = self.parse_expression(bp + 1)?;
                    Expr::BinOp {
                        op,
                        lhs: Box::new(lhs),
                        rhs: Box::new(rhs),
                    }
                }
                Infix::Assign(op) => self.parse_assign(lhs, op)?,
                Infix::Ternary => {
                    let then = self.parse_expression(BP_LOWEST)?;
                    self.expect(TokenKind::Colon)?;
                    let otherwise = self.parse_expression(BP_TERNARY)?;
                    Expr::Ternary {
                        cond: Box::new(lhs),
                        then: Box::new(then),
                        otherwise: Box::new(otherwise),
                    }
                }
                Infix::Call => Expr::Call {
                    callee: Box::new(lhs),
                    args: self.parse_call_args()?,
                },
                Infix::Field => Expr::Field {
                    object: Box::new(lhs),
                    name: self.identifier()?,
                },
                Infix::Index => {
                    let index = self.expression()?;
                    self.expect(TokenKind::RBracket)?;
                    Expr::Index {
                        object: Box::new(lhs),
                        index: Box::new(index),
                    }
                }
            };
        }

        Ok(lhs)
    }

    /// Binding power and role of the current token in infix position
    fn infix_info(&self) -> Option<(u8, Infix)> {
        let info = match self.kind() {
            TokenKind::Assign => (BP_ASSIGN, Infix::Assign(AssignOp::Set)),
            TokenKind::NewSlot => (BP_ASSIGN, Infix::Assign(AssignOp::NewSlot)),
            TokenKind::PlusAssign => (BP_ASSIGN, Infix::Assign(AssignOp::Compound(BinOp::Add))),
            TokenKind::MinusAssign => (BP_ASSIGN, Infix::Assign(AssignOp::Compound(BinOp::Sub))),
            TokenKind::StarAssign => (BP_ASSIGN, Infix::Assign(AssignOp::Compound(BinOp::Mul))),
            TokenKind::SlashAssign => (BP_ASSIGN, Infix::Assign(AssignOp::Compound(BinOp::Div))),
            TokenKind::Question => (BP_TERNARY, Infix::Ternary),
            TokenKind::Or => (BP_OR, Infix::Binary(BinOp::Or)),
            TokenKind::And => (BP_AND, Infix::Binary(BinOp::And)),
            TokenKind::Eq => (BP_EQ, Infix::Binary(BinOp::Eq)),
            TokenKind::Neq => (BP_EQ, Infix::Binary(BinOp::Neq)),
            TokenKind::Lt => (BP_CMP, Infix::Binary(BinOp::Lt)),
            TokenKind::Le => (BP_CMP, Infix::Binary(BinOp::Le)),
            TokenKind::Gt => (BP_CMP, Infix::Binary(BinOp::Gt)),
            TokenKind::Ge => (BP_CMP, Infix::Binary(BinOp::Ge)),
            TokenKind::Plus => (BP_ADD, Infix::Binary(BinOp::Add)),
            TokenKind::Minus => (BP_ADD, Infix::Binary(BinOp::Sub)),
            TokenKind::Star => (BP_MUL, Infix::Binary(BinOp::Mul)),
            TokenKind::Slash => (BP_MUL, Infix::Binary(BinOp::Div)),
            TokenKind::Percent => (BP_MUL, Infix::Binary(BinOp::Mod)),
            TokenKind::LParen => (BP_CALL, Infix::Call),
            TokenKind::Dot => (BP_CALL, Infix::Field),
            TokenKind::LBracket => (BP_CALL, Infix::Index),
            _ => return None,
        };
        Some(info)
    }

    /// Right-associative assignment; only names, fields and indexes are targets
    fn parse_assign(
        &mut self,
        target: Expr,
        op: AssignOp,
    ) -> ParseResult<Expr> {
        if !matches!(
            target,
            Expr::Ident(_) | Expr::Field { .. } | Expr::Index { .. }
        ) {
            return Err(self.error_here("can't assign expression"));
        }
        let value = self.parse_expression(BP_ASSIGN)?;
        Ok(Expr::Assign {
            op,
            target: Box::new(target),
            value: Box::new(value),
        })
    }

    fn parse_call_args(&mut self) -> ParseResult<Vec<Expr>> {
        let mut args = Vec::new();
        while !self.eat(&TokenKind::RParen) {
            args.push(self.expression()?);
            if !self.at(&TokenKind::RParen) {
                self.expect(TokenKind::Comma)?;
            }
        }
        Ok(args)
    }

    fn parse_prefix(&mut self) -> ParseResult<Expr> {
        let token = self.bump();
        let expr = match token.kind {
            TokenKind::IntLiteral(i) => Expr::Lit(Literal::Integer(i)),
            TokenKind::FloatLiteral(f) => Expr::Lit(Literal::Float(f)),
            TokenKind::StringLiteral(s) => Expr::Lit(Literal::String(Rc::from(s))),
            TokenKind::KwNull => Expr::Lit(Literal::Null),
            TokenKind::KwTrue => Expr::Lit(Literal::Bool(true)),
            TokenKind::KwFalse => Expr::Lit(Literal::Bool(false)),
            TokenKind::Identifier(name) => Expr::Ident(Rc::from(name)),
            TokenKind::KwThis => Expr::This,
            TokenKind::LParen => {
                let inner = self.expression()?;
                self.expect(TokenKind::RParen)?;
                inner
            }
            TokenKind::LBracket => self.parse_array()?,
            TokenKind::LBrace => self.parse_table()?,
            TokenKind::KwFunction => {
                let name = match self.kind() {
                    TokenKind::Identifier(_) => Some(self.identifier()?),
                    _ => None,
                };
                Expr::Function(self.function_body(name)?)
            }
            TokenKind::Minus => self.parse_unary(UnOp::Neg)?,
            TokenKind::Not => self.parse_unary(UnOp::Not)?,
            TokenKind::KwTypeof => self.parse_unary(UnOp::Typeof)?,
            other => {
                return Err(CompileError::new(
                    format!("expression expected, found {}", other.describe()),
                    token.line,
                    token.column,
                ))
            }
        };
        Ok(expr)
    }

    fn parse_unary(
        &mut self,
        op: UnOp,
    ) -> ParseResult<Expr> {
        let operand = self.parse_expression(BP_UNARY)?;
        Ok(Expr::UnOp {
            op,
            expr: Box::new(operand),
        })
    }

    /// `[a, b, c]`, trailing comma allowed
    fn parse_array(&mut self) -> ParseResult<Expr> {
        let mut items = Vec::new();
        while !self.eat(&TokenKind::RBracket) {
            items.push(self.expression()?);
            if !self.at(&TokenKind::RBracket) {
                self.expect(TokenKind::Comma)?;
            }
        }
        Ok(Expr::Array(items))
    }

    /// `{ a = 1, ["b"] = 2, "c": 3, function d() {} }`, commas optional
    fn parse_table(&mut self) -> ParseResult<Expr> {
        let mut slots = Vec::new();
        while !self.eat(&TokenKind::RBrace) {
            if self.at_end() {
                return Err(self.error_here("expected '}'"));
            }
            let slot = match self.kind().clone() {
                TokenKind::Identifier(name) => {
                    self.bump();
                    if !self.eat(&TokenKind::Colon) {
                        self.expect(TokenKind::Assign)?;
                    }
                    (Expr::Lit(Literal::String(Rc::from(name))), self.expression()?)
                }
                TokenKind::StringLiteral(key) => {
                    self.bump();
                    self.expect(TokenKind::Colon)?;
                    (Expr::Lit(Literal::String(Rc::from(key))), self.expression()?)
                }
                TokenKind::LBracket => {
                    self.bump();
                    let key = self.expression()?;
                    self.expect(TokenKind::RBracket)?;
                    self.expect(TokenKind::Assign)?;
                    (key, self.expression()?)
                }
                TokenKind::KwFunction => {
                    self.bump();
                    let name = self.identifier()?;
                    let def = self.function_body(Some(Rc::clone(&name)))?;
                    (Expr::Lit(Literal::String(name)), Expr::Function(def))
                }
                other => {
                    return Err(self.error_here(format!(
                        "expected table slot, found {}",
                        other.describe()
                    )))
                }
            };
            slots.push(slot);
            self.eat(&TokenKind::Comma);
        }
        Ok(Expr::Table(slots))
    }
}
