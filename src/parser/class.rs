use super::Parser;
use crate::ast::{ClassDef, MethodDef, MethodKind, PropertyKey};
use crate::error::ParseError;
use crate::token::Keyword;

impl<'i> Parser<'i> {
    /// Parses a class body. Class expressions and class declarations share
    /// this tail; the caller has already consumed nothing but the `class`
    /// keyword belongs to it too, since an anonymous class expression
    /// (`class { ... }`) and an anonymous default export share the same
    /// shape as a named declaration.
    pub(super) fn parse_class_tail(&mut self) -> Result<ClassDef, ParseError> {
        self.expect_keyword(Keyword::Class)?;
        let name = match self.peek_kind().clone() {
            crate::token::TokenKind::Ident(sym) => {
                self.advance();
                Some(sym)
            }
            _ => None,
        };

        let superclass = if self.eat_keyword(Keyword::Extends) {
            Some(Box::new(self.parse_expression()?))
        } else {
            None
        };

        self.expect_punct("{")?;
        let mut methods = Vec::new();
        while !self.at_punct("}") {
            if self.eat_punct(";") {
                continue;
            }
            methods.push(self.parse_class_member()?);
        }
        self.expect_punct("}")?;

        Ok(ClassDef { name, superclass, methods })
    }

    fn parse_class_member(&mut self) -> Result<MethodDef, ParseError> {
        let is_static = self.eat_keyword(Keyword::Static);

        let is_getter = self.at_keyword(Keyword::Get) && self.next_is_member_name();
        let is_setter = self.at_keyword(Keyword::Set) && self.next_is_member_name();
        if is_getter || is_setter {
            self.advance();
            let key = self.parse_method_key()?;
            let value = self.parse_function_tail(None, false, false)?;
            let kind = if is_getter { MethodKind::Get } else { MethodKind::Set };
            return Ok(MethodDef { key, kind, is_static, is_async: false, is_generator: false, params: value.params, body: value.body });
        }

        let is_async = self.eat_keyword(Keyword::Async);
        let is_generator = self.eat_operator("*");
        let key = self.parse_method_key()?;
        let kind = match &key {
            PropertyKey::Ident(sym) if !is_static && self.is_constructor_name(*sym) => MethodKind::Constructor,
            _ => MethodKind::Method,
        };
        let value = self.parse_function_tail(None, is_async, is_generator)?;

        Ok(MethodDef {
            key,
            kind,
            is_static,
            is_async,
            is_generator,
            params: value.params,
            body: value.body,
        })
    }

    /// A `get`/`set` token only introduces an accessor when it's followed
    /// by another member name rather than being used as a plain method
    /// name itself (`get() {}`).
    fn next_is_member_name(&self) -> bool {
        !matches!(
            self.tokens.get(self.pos + 1).map(|t| &t.kind),
            Some(crate::token::TokenKind::Punct("("))
        )
    }

    fn parse_method_key(&mut self) -> Result<PropertyKey, ParseError> {
        match self.peek_kind().clone() {
            crate::token::TokenKind::Ident(sym) => {
                self.advance();
                Ok(PropertyKey::Ident(sym))
            }
            crate::token::TokenKind::Keyword(_) => {
                let tok = self.advance();
                Ok(PropertyKey::Str(crate::token::Keyword::ALL
                    .iter()
                    .find(|(_, k)| matches!(&tok.kind, crate::token::TokenKind::Keyword(tk) if tk == k))
                    .map(|(s, _)| s.to_string())
                    .unwrap_or_default()))
            }
            crate::token::TokenKind::Str(s) => {
                self.advance();
                Ok(PropertyKey::Str(s))
            }
            crate::token::TokenKind::Punct("[") => {
                self.advance();
                let expr = self.parse_expression()?;
                self.expect_punct("]")?;
                Ok(PropertyKey::Computed(Box::new(expr)))
            }
            _ => Err(self.error_here("expected a method name")),
        }
    }
}
