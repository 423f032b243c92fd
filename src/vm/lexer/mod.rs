//! Lexer module

pub mod tokens;

use std::iter::Peekable;
use std::str::Chars;

use tokens::{Token, TokenKind};

use super::errors::CompileError;

/// Tokenize source code. The last token is always [`TokenKind::Eof`].
pub fn tokenize(source: &str) -> Result<Vec<Token>, CompileError> {
    let mut lexer = Lexer::new(source);
    let mut tokens = Vec::new();
    loop {
        let token = lexer.next_token()?;
        let done = token.kind == TokenKind::Eof;
        tokens.push(token);
        if done {
            return Ok(tokens);
        }
    }
}

struct Lexer<'a> {
    chars: Peekable<Chars<'a>>,
    line: usize,
    column: usize,
    start_line: usize,
    start_column: usize,
}

impl<'a> Lexer<'a> {
    fn new(source: &'a str) -> Self {
        Self {
            chars: source.chars().peekable(),
            line: 1,
            column: 1,
            start_line: 1,
            start_column: 1,
        }
    }

    fn advance(&mut self) -> Option<char> {
        let c = self.chars.next()?;
        if c == '\n' {
            self.line += 1;
            self.column = 1;
        } else {
            self.column += 1;
        }
        Some(c)
    }

    fn peek(&mut self) -> Option<char> {
        self.chars.peek().copied()
    }

    fn peek_next(&self) -> Option<char> {
        self.chars.clone().nth(1)
    }

    fn eat(
        &mut self,
        expected: char,
    ) -> bool {
        if self.peek() == Some(expected) {
            self.advance();
            true
        } else {
            false
        }
    }

    fn error(
        &self,
        desc: impl Into<String>,
    ) -> CompileError {
        CompileError::new(desc, self.line, self.column)
    }

    fn token(
        &self,
        kind: TokenKind,
    ) -> Token {
        Token {
            kind,
            line: self.start_line,
            column: self.start_column,
        }
    }

    fn skip_whitespace_and_comments(&mut self) -> Result<(), CompileError> {
        while let Some(c) = self.peek() {
            match c {
                c if c.is_whitespace() => {
                    self.advance();
                }
                '#' => self.skip_line(),
                '/' if self.peek_next() == Some('/') => self.skip_line(),
                '/' if self.peek_next() == Some('*') => {
                    self.advance();
                    self.advance();
                    loop {
                        match self.advance() {
                            Some('*') if self.eat('/') => break,
                            Some(_) => {}
                            None => return Err(self.error("missing \"*/\" in comment")),
                        }
                    }
                }
                _ => break,
            }
        }
        Ok(())
    }

    fn skip_line(&mut self) {
        while let Some(c) = self.peek() {
            if c == '\n' {
                break;
            }
            self.advance();
        }
    }

    fn next_token(&mut self) -> Result<Token, CompileError> {
        self.skip_whitespace_and_comments()?;
        self.start_line = self.line;
        self.start_column = self.column;

        let c = match self.advance() {
            Some(c) => c,
            None => return Ok(self.token(TokenKind::Eof)),
        };

        let kind = match c {
            '(' => TokenKind::LParen,
            ')' => TokenKind::RParen,
            '{' => TokenKind::LBrace,
            '}' => TokenKind::RBrace,
            '[' => TokenKind::LBracket,
            ']' => TokenKind::RBracket,
            ',' => TokenKind::Comma,
            ';' => TokenKind::Semicolon,
            '.' => TokenKind::Dot,
            '?' => TokenKind::Question,
            ':' => TokenKind::Colon,
            '%' => TokenKind::Percent,
            '+' if self.eat('=') => TokenKind::PlusAssign,
            '+' => TokenKind::Plus,
            '-' if self.eat('=') => TokenKind::MinusAssign,
            '-' => TokenKind::Minus,
            '*' if self.eat('=') => TokenKind::StarAssign,
            '*' => TokenKind::Star,
            '/' if self.eat('=') => TokenKind::SlashAssign,
            '/' => TokenKind::Slash,
            '=' if self.eat('=') => TokenKind::Eq,
            '=' => TokenKind::Assign,
            '!' if self.eat('=') => TokenKind::Neq,
            '!' => TokenKind::Not,
            '<' if self.eat('=') => TokenKind::Le,
            '<' if self.eat('-') => TokenKind::NewSlot,
            '<' => TokenKind::Lt,
            '>' if self.eat('=') => TokenKind::Ge,
            '>' => TokenKind::Gt,
            '&' if self.eat('&') => TokenKind::And,
            '|' if self.eat('|') => TokenKind::Or,
            '"' => TokenKind::StringLiteral(self.string()?),
            '@' if self.eat('"') => TokenKind::StringLiteral(self.verbatim_string()?),
            '\'' => TokenKind::IntLiteral(self.char_literal()?),
            c if c.is_ascii_digit() => self.number(c)?,
            c if c == '_' || unicode_ident::is_xid_start(c) => self.identifier(c),
            other => {
                return Err(CompileError::new(
                    format!("unexpected character '{}'", other),
                    self.start_line,
                    self.start_column,
                ))
            }
        };
        Ok(self.token(kind))
    }

    fn identifier(
        &mut self,
        first: char,
    ) -> TokenKind {
        let mut name = String::from(first);
        while let Some(c) = self.peek() {
            if c == '_' || unicode_ident::is_xid_continue(c) {
                name.push(c);
                self.advance();
            } else {
                break;
            }
        }
        TokenKind::keyword(&name).unwrap_or(TokenKind::Identifier(name))
    }

    fn number(
        &mut self,
        first: char,
    ) -> Result<TokenKind, CompileError> {
        if first == '0' && matches!(self.peek(), Some('x') | Some('X')) {
            self.advance();
            let mut digits = String::new();
            while let Some(c) = self.peek() {
                if c.is_ascii_hexdigit() {
                    digits.push(c);
                    self.advance();
                } else {
                    break;
                }
            }
            return u64::from_str_radix(&digits, 16)
                .map(|v| TokenKind::IntLiteral(v as i64))
                .map_err(|_| self.error("malformed hexadecimal number"));
        }

        let mut text = String::from(first);
        let mut is_float = false;
        while let Some(c) = self.peek() {
            match c {
                '0'..='9' => {}
                '.' if !is_float && self.peek_next().is_some_and(|n| n.is_ascii_digit()) => {
                    is_float = true;
                }
                'e' | 'E' => {
                    is_float = true;
                    text.push(c);
                    self.advance();
                    if let Some(sign @ ('+' | '-')) = self.peek() {
                        text.push(sign);
                        self.advance();
                    }
                    continue;
                }
                _ => break,
            }
            text.push(c);
            self.advance();
        }

        if is_float {
            text.parse()
                .map(TokenKind::FloatLiteral)
                .map_err(|_| self.error("malformed number"))
        } else {
            text.parse()
                .map(TokenKind::IntLiteral)
                .map_err(|_| self.error("integer literal out of range"))
        }
    }

    fn escape(&mut self) -> Result<char, CompileError> {
        let c = match self.advance() {
            Some('n') => '\n',
            Some('t') => '\t',
            Some('r') => '\r',
            Some('0') => '\0',
            Some('\\') => '\\',
            Some('"') => '"',
            Some('\'') => '\'',
            Some('x') => {
                let mut code = 0u32;
                let mut digits = 0;
                while let Some(d) = self.peek().and_then(|c| c.to_digit(16)) {
                    if digits == 4 {
                        break;
                    }
                    code = code * 16 + d;
                    digits += 1;
                    self.advance();
                }
                if digits == 0 {
                    return Err(self.error("hexadecimal number expected"));
                }
                char::from_u32(code).ok_or_else(|| self.error("invalid escape code"))?
            }
            _ => return Err(self.error("unrecognised escaper char")),
        };
        Ok(c)
    }

    fn string(&mut self) -> Result<String, CompileError> {
        let mut s = String::new();
        loop {
            match self.advance() {
                Some('"') => return Ok(s),
                Some('\\') => s.push(self.escape()?),
                Some('\n') => return Err(self.error("newline in a constant")),
                Some(c) => s.push(c),
                None => return Err(self.error("unfinished string")),
            }
        }
    }

    fn verbatim_string(&mut self) -> Result<String, CompileError> {
        let mut s = String::new();
        loop {
            match self.advance() {
                Some('"') if self.eat('"') => s.push('"'),
                Some('"') => return Ok(s),
                Some(c) => s.push(c),
                None => return Err(self.error("unfinished string")),
            }
        }
    }

    fn char_literal(&mut self) -> Result<i64, CompileError> {
        let c = match self.advance() {
            Some('\\') => self.escape()?,
            Some('\'') | None => return Err(self.error("empty constant")),
            Some(c) => c,
        };
        if !self.eat('\'') {
            return Err(self.error("constant too long"));
        }
        Ok(c as i64)
    }
}
