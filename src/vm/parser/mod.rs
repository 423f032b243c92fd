//! Parser
//!
//! Recursive descent for statements, Pratt parsing for expressions
//! (see [`expr`]). Statement separators are optional: `;` is consumed when
//! present, otherwise the next statement starts wherever the previous
//! expression can no longer be continued.

mod expr;

use std::rc::Rc;

use super::ast::{FunctionDef, Stmt};
use super::errors::CompileError;
use super::lexer::tokenize;
use super::lexer::tokens::{Token, TokenKind};
use crate::util::stack::ensure_sufficient_stack;

/// Binding power levels for the Pratt parser
pub const BP_LOWEST: u8 = 0;
pub const BP_ASSIGN: u8 = 10;
pub const BP_TERNARY: u8 = 15;
pub const BP_OR: u8 = 20;
pub const BP_AND: u8 = 30;
pub const BP_EQ: u8 = 40;
pub const BP_CMP: u8 = 50;
pub const BP_ADD: u8 = 60;
pub const BP_MUL: u8 = 70;
pub const BP_UNARY: u8 = 80;
pub const BP_CALL: u8 = 90;

/// Expressions and statements nested deeper than this are rejected
pub const MAX_NESTING: usize = 256;

pub type ParseResult<T> = Result<T, CompileError>;

/// Parse a whole script into its top-level statements
pub fn parse(source: &str) -> ParseResult<Vec<Stmt>> {
    let tokens = tokenize(source)?;
    let mut parser = Parser::new(&tokens);
    let mut program = Vec::new();
    while !parser.at_end() {
        program.push(parser.statement()?);
    }
    Ok(program)
}

/// Parser state over a token stream ending in `Eof`
pub(crate) struct Parser<'a> {
    tokens: &'a [Token],
    pos: usize,
    /// Loops enclosing the current statement, within the current function
    loop_depth: usize,
    /// Open expressions and statements on the current parse path
    nesting: usize,
}

impl<'a> Parser<'a> {
    fn new(tokens: &'a [Token]) -> Self {
        Self {
            tokens,
            pos: 0,
            loop_depth: 0,
            nesting: 0,
        }
    }

    fn current(&self) -> &Token {
        let last = self.tokens.len().saturating_sub(1);
        &self.tokens[self.pos.min(last)]
    }

    fn kind(&self) -> &TokenKind {
        &self.current().kind
    }

    fn peek_kind(&self) -> Option<&TokenKind> {
        self.tokens.get(self.pos + 1).map(|t| &t.kind)
    }

    fn at(
        &self,
        kind: &TokenKind,
    ) -> bool {
        self.kind() == kind
    }

    fn at_end(&self) -> bool {
        self.at(&TokenKind::Eof)
    }

    fn bump(&mut self) -> Token {
        let token = self.current().clone();
        if self.pos < self.tokens.len() {
            self.pos += 1;
        }
        token
    }

    fn eat(
        &mut self,
        kind: &TokenKind,
    ) -> bool {
        if self.at(kind) {
            self.bump();
            true
        } else {
            false
        }
    }

    fn error_here(
        &self,
        desc: impl Into<String>,
    ) -> CompileError {
        let token = self.current();
        CompileError::new(desc, token.line, token.column)
    }

    fn expect(
        &mut self,
        kind: TokenKind,
    ) -> ParseResult<Token> {
        if self.at(&kind) {
            Ok(self.bump())
        } else {
            Err(self.error_here(format!("expected '{}'", kind.describe())))
        }
    }

    fn identifier(&mut self) -> ParseResult<Rc<str>> {
        match self.kind() {
            TokenKind::Identifier(name) => {
                let name = Rc::from(name.as_str());
                self.bump();
                Ok(name)
            }
            other => Err(self.error_here(format!(
                "expected identifier, found {}",
                other.describe()
            ))),
        }
    }

    fn at_statement_end(&self) -> bool {
        matches!(
            self.kind(),
            TokenKind::Semicolon | TokenKind::RBrace | TokenKind::Eof
        )
    }

    /// Run one recursive parse step, counting it against [`MAX_NESTING`]
    fn nested<T>(
        &mut self,
        what: &str,
        parse: impl FnOnce(&mut Self) -> ParseResult<T>,
    ) -> ParseResult<T> {
        if self.nesting >= MAX_NESTING {
            return Err(self.error_here(format!("{} too deeply nested", what)));
        }
        self.nesting += 1;
        let result = ensure_sufficient_stack(|| parse(self));
        self.nesting -= 1;
        result
    }

    pub(crate) fn statement(&mut self) -> ParseResult<Stmt> {
        self.nested("statement", Self::parse_statement)
    }

    fn parse_statement(&mut self) -> ParseResult<Stmt> {
        let stmt = match self.kind() {
            TokenKind::LBrace => Stmt::Block(self.block()?),
            TokenKind::KwLocal => self.local()?,
            TokenKind::KwFunction if matches!(self.peek_kind(), Some(TokenKind::Identifier(_))) => {
                self.bump();
                let name = self.identifier()?;
                Stmt::Function(self.function_body(Some(name))?)
            }
            TokenKind::KwReturn => {
                self.bump();
                if self.at_statement_end() {
                    Stmt::Return(None)
                } else {
                    Stmt::Return(Some(self.expression()?))
                }
            }
            TokenKind::KwIf => self.if_statement()?,
            TokenKind::KwWhile => {
                self.bump();
                let cond = self.condition()?;
                let body = self.loop_body()?;
                Stmt::While { cond, body }
            }
            TokenKind::KwFor => self.for_statement()?,
            TokenKind::KwBreak | TokenKind::KwContinue => {
                let token = self.bump();
                if self.loop_depth == 0 {
                    return Err(CompileError::new(
                        format!("'{}' has to be in a loop block", token.kind.describe()),
                        token.line,
                        token.column,
                    ));
                }
                if token.kind == TokenKind::KwBreak {
                    Stmt::Break
                } else {
                    Stmt::Continue
                }
            }
            TokenKind::Semicolon => Stmt::Empty,
            _ => Stmt::Expr(self.expression()?),
        };
        self.eat(&TokenKind::Semicolon);
        Ok(stmt)
    }

    fn block(&mut self) -> ParseResult<Vec<Stmt>> {
        self.expect(TokenKind::LBrace)?;
        let mut stmts = Vec::new();
        while !self.at(&TokenKind::RBrace) {
            if self.at_end() {
                return Err(self.error_here("expected '}'"));
            }
            stmts.push(self.statement()?);
        }
        self.bump();
        Ok(stmts)
    }

    fn local(&mut self) -> ParseResult<Stmt> {
        self.expect(TokenKind::KwLocal)?;
        let mut names = Vec::new();
        loop {
            let name = self.identifier()?;
            let init = if self.eat(&TokenKind::Assign) {
                Some(self.expression()?)
            } else {
                None
            };
            names.push((name, init));
            if !self.eat(&TokenKind::Comma) {
                break;
            }
        }
        Ok(Stmt::Local(names))
    }

    fn condition(&mut self) -> ParseResult<super::ast::Expr> {
        self.expect(TokenKind::LParen)?;
        let cond = self.expression()?;
        self.expect(TokenKind::RParen)?;
        Ok(cond)
    }

    fn loop_body(&mut self) -> ParseResult<Box<Stmt>> {
        self.loop_depth += 1;
        let body = self.statement();
        self.loop_depth -= 1;
        Ok(Box::new(body?))
    }

    fn if_statement(&mut self) -> ParseResult<Stmt> {
        self.expect(TokenKind::KwIf)?;
        let cond = self.condition()?;
        let then = Box::new(self.statement()?);
        let otherwise = if self.eat(&TokenKind::KwElse) {
            Some(Box::new(self.statement()?))
        } else {
            None
        };
        Ok(Stmt::If {
            cond,
            then,
            otherwise,
        })
    }

    fn for_statement(&mut self) -> ParseResult<Stmt> {
        self.expect(TokenKind::KwFor)?;
        self.expect(TokenKind::LParen)?;

        let init = match self.kind() {
            TokenKind::Semicolon => None,
            TokenKind::KwLocal => Some(Box::new(self.local()?)),
            _ => Some(Box::new(Stmt::Expr(self.expression()?))),
        };
        self.expect(TokenKind::Semicolon)?;

        let cond = if self.at(&TokenKind::Semicolon) {
            None
        } else {
            Some(self.expression()?)
        };
        self.expect(TokenKind::Semicolon)?;

        let step = if self.at(&TokenKind::RParen) {
            None
        } else {
            Some(self.expression()?)
        };
        self.expect(TokenKind::RParen)?;

        let body = self.loop_body()?;
        Ok(Stmt::For {
            init,
            cond,
            step,
            body,
        })
    }

    /// Parameter list and body, after `function [name]`
    fn function_body(
        &mut self,
        name: Option<Rc<str>>,
    ) -> ParseResult<Rc<FunctionDef>> {
        self.expect(TokenKind::LParen)?;
        let mut params = Vec::new();
        if !self.at(&TokenKind::RParen) {
            loop {
                params.push(self.identifier()?);
                if !self.eat(&TokenKind::Comma) {
                    break;
                }
            }
        }
        self.expect(TokenKind::RParen)?;

        let enclosing_loops = std::mem::replace(&mut self.loop_depth, 0);
        let body = self.block();
        self.loop_depth = enclosing_loops;

        Ok(Rc::new(FunctionDef {
            name,
            params,
            variadic: false,
            body: body?,
        }))
    }
}
