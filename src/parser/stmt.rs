use super::Parser;
use crate::ast::*;
use crate::error::ParseError;
use crate::token::{Keyword, TokenKind};

impl<'i> Parser<'i> {
    pub(super) fn parse_statement(&mut self) -> Result<Stmt, ParseError> {
        match self.peek_kind().clone() {
            TokenKind::Punct("{") => Ok(Stmt::Block(self.parse_block_statements()?)),
            TokenKind::Keyword(Keyword::Var) | TokenKind::Keyword(Keyword::Let) | TokenKind::Keyword(Keyword::Const) => {
                let decl = self.parse_var_decl()?;
                self.consume_semicolon();
                Ok(Stmt::VarDecl(decl))
            }
            TokenKind::Keyword(Keyword::Function) => {
                let def = self.parse_function_decl_tail()?;
                Ok(Stmt::FunctionDecl(def))
            }
            TokenKind::Keyword(Keyword::Async) if self.next_is_keyword(Keyword::Function) => {
                self.advance();
                let def = self.parse_function_decl_tail()?;
                Ok(Stmt::FunctionDecl(FunctionDef { is_async: true, ..def }))
            }
            TokenKind::Keyword(Keyword::Class) => {
                let def = self.parse_class_tail()?;
                Ok(Stmt::ClassDecl(def))
            }
            TokenKind::Keyword(Keyword::If) => self.parse_if(),
            TokenKind::Keyword(Keyword::While) => self.parse_while(),
            TokenKind::Keyword(Keyword::For) => self.parse_for(),
            TokenKind::Keyword(Keyword::Return) => self.parse_return(),
            TokenKind::Keyword(Keyword::Break) => {
                self.advance();
                self.consume_semicolon();
                Ok(Stmt::Break)
            }
            TokenKind::Keyword(Keyword::Continue) => {
                self.advance();
                self.consume_semicolon();
                Ok(Stmt::Continue)
            }
            TokenKind::Keyword(Keyword::Throw) => {
                self.advance();
                let expr = self.parse_expression()?;
                self.consume_semicolon();
                Ok(Stmt::Throw(expr))
            }
            TokenKind::Keyword(Keyword::Try) => self.parse_try(),
            TokenKind::Keyword(Keyword::Switch) => self.parse_switch(),
            TokenKind::Punct(";") => {
                self.advance();
                Ok(Stmt::Block(Vec::new()))
            }
            _ => {
                let expr = self.parse_expression()?;
                self.consume_semicolon();
                Ok(Stmt::ExprStmt(expr))
            }
        }
    }

    fn next_is_keyword(&self, kw: Keyword) -> bool {
        matches!(self.tokens.get(self.pos + 1).map(|t| &t.kind), Some(TokenKind::Keyword(k)) if *k == kw)
    }

    pub(super) fn parse_block_statements(&mut self) -> Result<Vec<Stmt>, ParseError> {
        self.expect_punct("{")?;
        let mut body = Vec::new();
        while !self.at_punct("}") {
            body.push(self.parse_statement()?);
        }
        self.expect_punct("}")?;
        Ok(body)
    }

    fn parse_function_decl_tail(&mut self) -> Result<FunctionDef, ParseError> {
        self.expect_keyword(Keyword::Function)?;
        let is_generator = self.eat_operator("*");
        let name = Some(self.expect_ident()?);
        self.parse_function_tail(name, false, is_generator)
    }

    fn parse_var_decl(&mut self) -> Result<VarDecl, ParseError> {
        let kind = if self.eat_keyword(Keyword::Var) {
            VarKind::Var
        } else if self.eat_keyword(Keyword::Let) {
            VarKind::Let
        } else {
            self.expect_keyword(Keyword::Const)?;
            VarKind::Const
        };

        let mut declarators = Vec::new();
        loop {
            let target = self.parse_binding_pattern()?;
            let init = if self.eat_operator("=") { Some(self.parse_assignment()?) } else { None };
            declarators.push(VarDeclarator { target, init });
            if !self.eat_punct(",") {
                break;
            }
        }
        Ok(VarDecl { kind, declarators })
    }

    fn parse_if(&mut self) -> Result<Stmt, ParseError> {
        self.expect_keyword(Keyword::If)?;
        self.expect_punct("(")?;
        let test = self.parse_expression()?;
        self.expect_punct(")")?;
        let consequent = Box::new(self.parse_statement()?);
        let alternate = if self.eat_keyword(Keyword::Else) {
            Some(Box::new(self.parse_statement()?))
        } else {
            None
        };
        Ok(Stmt::If { test, consequent, alternate })
    }

    fn parse_while(&mut self) -> Result<Stmt, ParseError> {
        self.expect_keyword(Keyword::While)?;
        self.expect_punct("(")?;
        let test = self.parse_expression()?;
        self.expect_punct(")")?;
        let body = Box::new(self.parse_statement()?);
        Ok(Stmt::While { test, body })
    }

    fn parse_for(&mut self) -> Result<Stmt, ParseError> {
        self.expect_keyword(Keyword::For)?;
        self.expect_punct("(")?;

        // `for (let x in/of ...)` and `for (x in/of ...)` need a lookahead
        // past a single binding pattern to tell a for-in/of apart from a
        // C-style for with a comma-free init; try the pattern-led forms
        // first and fall back to the general init clause.
        if let Some(stmt) = self.try_parse_for_in_of()? {
            return Ok(stmt);
        }

        let init = if self.at_punct(";") {
            ForInit::None
        } else if self.at_keyword(Keyword::Var) || self.at_keyword(Keyword::Let) || self.at_keyword(Keyword::Const) {
            ForInit::VarDecl(self.parse_var_decl()?)
        } else {
            ForInit::Expr(self.parse_expression()?)
        };
        self.expect_punct(";")?;
        let test = if self.at_punct(";") { None } else { Some(self.parse_expression()?) };
        self.expect_punct(";")?;
        let update = if self.at_punct(")") { None } else { Some(self.parse_expression()?) };
        self.expect_punct(")")?;
        let body = Box::new(self.parse_statement()?);
        Ok(Stmt::For { init, test, update, body })
    }

    /// Attempts to parse the `for (<binding> in/of <expr>) <body>` forms.
    /// Restores the cursor and returns `None` if the lookahead doesn't
    /// confirm one of these forms, so the caller can fall through to the
    /// general C-style `for`.
    fn try_parse_for_in_of(&mut self) -> Result<Option<Stmt>, ParseError> {
        let start = self.pos;
        let has_decl_kw = self.at_keyword(Keyword::Var) || self.at_keyword(Keyword::Let) || self.at_keyword(Keyword::Const);
        if has_decl_kw {
            self.advance();
        }

        let left = match self.peek_kind().clone() {
            TokenKind::Ident(_) | TokenKind::Punct("{") | TokenKind::Punct("[") => {
                match self.parse_binding_pattern() {
                    Ok(p) => p,
                    Err(_) => {
                        self.pos = start;
                        return Ok(None);
                    }
                }
            }
            _ => {
                self.pos = start;
                return Ok(None);
            }
        };

        let is_in = self.at_keyword(Keyword::In);
        let is_of = self.at_keyword(Keyword::Of);
        if !is_in && !is_of {
            self.pos = start;
            return Ok(None);
        }
        self.advance();

        let right = self.parse_expression()?;
        self.expect_punct(")")?;
        let body = Box::new(self.parse_statement()?);

        Ok(Some(if is_in {
            Stmt::ForIn { left, right, body }
        } else {
            Stmt::ForOf { left, right, body }
        }))
    }

    fn parse_return(&mut self) -> Result<Stmt, ParseError> {
        self.expect_keyword(Keyword::Return)?;
        let value = if self.at_punct(";") || self.at_punct("}") || self.at_eof() {
            None
        } else {
            Some(self.parse_expression()?)
        };
        self.consume_semicolon();
        Ok(Stmt::Return(value))
    }

    fn parse_try(&mut self) -> Result<Stmt, ParseError> {
        self.expect_keyword(Keyword::Try)?;
        let block = self.parse_block_statements()?;

        let handler = if self.eat_keyword(Keyword::Catch) {
            let param = if self.eat_punct("(") {
                let pattern = self.parse_binding_pattern()?;
                self.expect_punct(")")?;
                Some(pattern)
            } else {
                None
            };
            let body = self.parse_block_statements()?;
            Some(CatchClause { param, body })
        } else {
            None
        };

        let finalizer = if self.eat_keyword(Keyword::Finally) {
            Some(self.parse_block_statements()?)
        } else {
            None
        };

        Ok(Stmt::Try { block, handler, finalizer })
    }

    fn parse_switch(&mut self) -> Result<Stmt, ParseError> {
        self.expect_keyword(Keyword::Switch)?;
        self.expect_punct("(")?;
        let discriminant = self.parse_expression()?;
        self.expect_punct(")")?;
        self.expect_punct("{")?;

        let mut cases = Vec::new();
        while !self.at_punct("}") {
            let test = if self.eat_keyword(Keyword::Case) {
                let test = self.parse_expression()?;
                self.expect_punct(":")?;
                Some(test)
            } else {
                self.expect_keyword(Keyword::Default)?;
                self.expect_punct(":")?;
                None
            };

            let mut body = Vec::new();
            while !self.at_keyword(Keyword::Case) && !self.at_keyword(Keyword::Default) && !self.at_punct("}") {
                body.push(self.parse_statement()?);
            }
            cases.push(SwitchCase { test, body });
        }
        self.expect_punct("}")?;
        Ok(Stmt::Switch { discriminant, cases })
    }
}
