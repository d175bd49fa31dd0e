use super::Parser;
use crate::ast::*;
use crate::error::ParseError;
use crate::token::{Keyword, TokenKind};

impl<'i> Parser<'i> {
    /// `import defaultExport, { a, b as c }, * as ns from "mod";` or a
    /// side-effect-only `import "mod";`.
    pub(super) fn parse_import(&mut self) -> Result<Stmt, ParseError> {
        self.expect_keyword(Keyword::Import)?;

        if let TokenKind::Str(_) = self.peek_kind().clone() {
            let source = self.expect_string()?;
            self.consume_semicolon();
            return Ok(Stmt::Import(ImportDecl { specifiers: Vec::new(), source }));
        }

        let mut specifiers = Vec::new();
        if let TokenKind::Ident(sym) = self.peek_kind().clone() {
            self.advance();
            specifiers.push(ImportSpecifier::Default(sym));
            self.eat_punct(",");
        }

        if self.eat_operator("*") {
            self.expect_keyword(Keyword::As)?;
            let sym = self.expect_ident()?;
            specifiers.push(ImportSpecifier::Namespace(sym));
        } else if self.at_punct("{") {
            self.advance();
            while !self.at_punct("}") {
                let imported = self.expect_ident()?;
                let local = if self.eat_keyword(Keyword::As) { self.expect_ident()? } else { imported };
                specifiers.push(ImportSpecifier::Named { imported, local });
                if !self.eat_punct(",") {
                    break;
                }
            }
            self.expect_punct("}")?;
        }

        if !self.eat_keyword(Keyword::From) {
            return Err(self.error_here("expected 'from' in import declaration"));
        }
        let source = self.expect_string()?;
        self.consume_semicolon();
        Ok(Stmt::Import(ImportDecl { specifiers, source }))
    }

    /// `export { a, b as c } [from "mod"];`, `export default <decl-or-expr>`,
    /// or `export <declaration>`.
    pub(super) fn parse_export(&mut self) -> Result<Stmt, ParseError> {
        self.expect_keyword(Keyword::Export)?;

        if self.eat_keyword(Keyword::Default) {
            let value = match self.peek_kind().clone() {
                TokenKind::Keyword(Keyword::Function) => {
                    ExportDefaultValue::Decl(Box::new(Stmt::FunctionDecl(self.parse_function_decl_for_export()?)))
                }
                TokenKind::Keyword(Keyword::Class) => {
                    ExportDefaultValue::Decl(Box::new(Stmt::ClassDecl(self.parse_class_tail()?)))
                }
                _ => {
                    let expr = self.parse_expression()?;
                    ExportDefaultValue::Expr(expr)
                }
            };
            self.consume_semicolon();
            return Ok(Stmt::ExportDefault(value));
        }

        if self.at_punct("{") {
            self.advance();
            let mut specifiers = Vec::new();
            while !self.at_punct("}") {
                let local = self.expect_ident()?;
                let exported = if self.eat_keyword(Keyword::As) { self.expect_ident()? } else { local };
                specifiers.push(ExportSpecifier { local, exported });
                if !self.eat_punct(",") {
                    break;
                }
            }
            self.expect_punct("}")?;
            let source = if self.eat_keyword(Keyword::From) { Some(self.expect_string()?) } else { None };
            self.consume_semicolon();
            return Ok(Stmt::ExportNamed(ExportNamedDecl { specifiers, source }));
        }

        match self.peek_kind().clone() {
            TokenKind::Keyword(Keyword::Var) | TokenKind::Keyword(Keyword::Let) | TokenKind::Keyword(Keyword::Const) => {
                let inner = self.parse_statement()?;
                Ok(Stmt::ExportDecl(Box::new(inner)))
            }
            TokenKind::Keyword(Keyword::Function) => {
                let def = self.parse_function_decl_for_export()?;
                Ok(Stmt::ExportDecl(Box::new(Stmt::FunctionDecl(def))))
            }
            TokenKind::Keyword(Keyword::Class) => {
                let def = self.parse_class_tail()?;
                Ok(Stmt::ExportDecl(Box::new(Stmt::ClassDecl(def))))
            }
            _ => Err(self.error_here("invalid export form")),
        }
    }

    fn parse_function_decl_for_export(&mut self) -> Result<FunctionDef, ParseError> {
        self.expect_keyword(Keyword::Function)?;
        let is_generator = self.eat_operator("*");
        let name = Some(self.expect_ident()?);
        self.parse_function_tail(name, false, is_generator)
    }

    fn expect_string(&mut self) -> Result<String, ParseError> {
        match self.peek_kind().clone() {
            TokenKind::Str(s) => {
                self.advance();
                Ok(s)
            }
            _ => Err(self.error_here("expected a string literal")),
        }
    }
}
