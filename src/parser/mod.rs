//! Recursive-descent parser. Builds the AST via precedence climbing;
//! submodules are split by syntactic category
//! rather than one giant file.

mod class;
mod expr;
mod module;
mod pattern;
mod stmt;

use crate::ast::Program;
use crate::error::ParseError;
use crate::intern::{Interner, Symbol};
use crate::token::{Keyword, Span, Token, TokenKind};

pub struct Parser<'i> {
    tokens: Vec<Token>,
    pos: usize,
    interner: &'i Interner,
    constructor_sym: Option<Symbol>,
}

pub fn parse(tokens: Vec<Token>, interner: &Interner) -> Result<Program, ParseError> {
    let mut parser = Parser::new(tokens, interner);
    let program = parser.parse_program()?;
    parser.expect_eof()?;
    Ok(program)
}

impl<'i> Parser<'i> {
    pub fn new(tokens: Vec<Token>, interner: &'i Interner) -> Self {
        let constructor_sym = interner.lookup("constructor");
        Self { tokens, pos: 0, interner, constructor_sym }
    }

    fn is_constructor_name(&self, sym: Symbol) -> bool {
        Some(sym) == self.constructor_sym
    }

    fn parse_program(&mut self) -> Result<Program, ParseError> {
        let mut body = Vec::new();
        while !self.at_eof() {
            body.push(self.parse_top_level_item()?);
        }
        Ok(Program { body })
    }

    fn parse_top_level_item(&mut self) -> Result<crate::ast::Stmt, ParseError> {
        if self.at_keyword(Keyword::Import) {
            return self.parse_import();
        }
        if self.at_keyword(Keyword::Export) {
            return self.parse_export();
        }
        self.parse_statement()
    }

    fn expect_eof(&mut self) -> Result<(), ParseError> {
        if self.at_eof() {
            Ok(())
        } else {
            Err(self.error_here("expected end of input"))
        }
    }

    // -- low-level cursor helpers, shared by every submodule --

    fn peek(&self) -> &Token {
        &self.tokens[self.pos]
    }

    fn peek_kind(&self) -> &TokenKind {
        &self.peek().kind
    }

    fn peek_span(&self) -> Span {
        self.peek().span
    }

    fn at_eof(&self) -> bool {
        matches!(self.peek_kind(), TokenKind::Eof)
    }

    fn advance(&mut self) -> Token {
        let tok = self.tokens[self.pos].clone();
        if self.pos + 1 < self.tokens.len() {
            self.pos += 1;
        }
        tok
    }

    fn at_keyword(&self, kw: Keyword) -> bool {
        matches!(self.peek_kind(), TokenKind::Keyword(k) if *k == kw)
    }

    fn at_operator(&self, op: &str) -> bool {
        matches!(self.peek_kind(), TokenKind::Operator(o) if *o == op)
    }

    fn at_punct(&self, p: &str) -> bool {
        matches!(self.peek_kind(), TokenKind::Punct(p2) if *p2 == p)
    }

    fn eat_keyword(&mut self, kw: Keyword) -> bool {
        if self.at_keyword(kw) {
            self.advance();
            true
        } else {
            false
        }
    }

    fn eat_operator(&mut self, op: &str) -> bool {
        if self.at_operator(op) {
            self.advance();
            true
        } else {
            false
        }
    }

    fn eat_punct(&mut self, p: &str) -> bool {
        if self.at_punct(p) {
            self.advance();
            true
        } else {
            false
        }
    }

    fn expect_keyword(&mut self, kw: Keyword) -> Result<(), ParseError> {
        if self.eat_keyword(kw) {
            Ok(())
        } else {
            Err(self.error_here(format!("expected keyword '{kw:?}'")))
        }
    }

    fn expect_punct(&mut self, p: &str) -> Result<(), ParseError> {
        if self.eat_punct(p) {
            Ok(())
        } else {
            Err(self.error_here(format!("expected '{p}'")))
        }
    }

    fn expect_operator(&mut self, op: &str) -> Result<(), ParseError> {
        if self.eat_operator(op) {
            Ok(())
        } else {
            Err(self.error_here(format!("expected '{op}'")))
        }
    }

    /// Consumes a statement-terminating `;` if present. The grammar does
    /// not require ASI beyond this: a missing semicolon before a token that
    /// cannot continue the statement is accepted silently rather than
    /// backtracking past an already-parsed statement.
    fn consume_semicolon(&mut self) {
        self.eat_punct(";");
    }

    fn expect_ident(&mut self) -> Result<crate::intern::Symbol, ParseError> {
        match self.peek_kind().clone() {
            TokenKind::Ident(sym) => {
                self.advance();
                Ok(sym)
            }
            _ => Err(self.error_here("expected identifier")),
        }
    }

    fn error_here(&self, message: impl Into<String>) -> ParseError {
        ParseError::new(self.peek_span(), message.into())
    }
}
