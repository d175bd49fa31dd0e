use super::Parser;
use crate::ast::{ObjectPatternProp, Pattern, PropertyKey};
use crate::error::ParseError;
use crate::token::TokenKind;

impl<'i> Parser<'i> {
    /// Parses a binding target: a plain identifier or a destructuring
    /// pattern, used for parameters, `var`/`let`/`const` declarators, catch
    /// bindings, and `for`-`in`/`for`-`of` left-hand sides.
    pub(super) fn parse_binding_pattern(&mut self) -> Result<Pattern, ParseError> {
        match self.peek_kind().clone() {
            TokenKind::Ident(sym) => {
                self.advance();
                Ok(Pattern::Ident(sym))
            }
            TokenKind::Punct("{") => self.parse_object_pattern(),
            TokenKind::Punct("[") => self.parse_array_pattern(),
            _ => Err(self.error_here("expected a binding pattern")),
        }
    }

    fn parse_object_pattern(&mut self) -> Result<Pattern, ParseError> {
        self.expect_punct("{")?;
        let mut props = Vec::new();
        while !self.at_punct("}") {
            props.push(self.parse_object_pattern_prop()?);
            if !self.eat_punct(",") {
                break;
            }
        }
        self.expect_punct("}")?;
        Ok(Pattern::Object { props })
    }

    fn parse_object_pattern_prop(&mut self) -> Result<ObjectPatternProp, ParseError> {
        let key = self.parse_pattern_property_key()?;
        if self.eat_punct(":") {
            let value = self.parse_binding_pattern()?;
            let value = self.parse_pattern_default(value)?;
            return Ok(ObjectPatternProp { key, value });
        }
        // Shorthand: `{ x }` or `{ x = default }`.
        if let PropertyKey::Ident(name) = key {
            let value = self.parse_pattern_default(Pattern::Ident(name))?;
            return Ok(ObjectPatternProp { key, value });
        }
        Err(self.error_here("expected ':' in destructuring pattern"))
    }

    fn parse_pattern_property_key(&mut self) -> Result<PropertyKey, ParseError> {
        match self.peek_kind().clone() {
            TokenKind::Ident(sym) => {
                self.advance();
                Ok(PropertyKey::Ident(sym))
            }
            TokenKind::Str(s) => {
                self.advance();
                Ok(PropertyKey::Str(s))
            }
            TokenKind::Punct("[") => {
                self.advance();
                let expr = self.parse_expression()?;
                self.expect_punct("]")?;
                Ok(PropertyKey::Computed(Box::new(expr)))
            }
            _ => Err(self.error_here("expected a property name")),
        }
    }

    fn parse_array_pattern(&mut self) -> Result<Pattern, ParseError> {
        self.expect_punct("[")?;
        let mut elements = Vec::new();
        while !self.at_punct("]") {
            if self.at_punct(",") {
                elements.push(None);
                self.advance();
                continue;
            }
            let pattern = self.parse_binding_pattern()?;
            let pattern = self.parse_pattern_default(pattern)?;
            elements.push(Some(pattern));
            if !self.eat_punct(",") {
                break;
            }
        }
        self.expect_punct("]")?;
        Ok(Pattern::Array { elements })
    }

    /// Parses a binding pattern followed by an optional `= default`,
    /// shared by parameters and declarators.
    pub(super) fn parse_binding_pattern_with_default(&mut self) -> Result<Pattern, ParseError> {
        let pattern = self.parse_binding_pattern()?;
        self.parse_pattern_default(pattern)
    }

    /// Consumes an optional `= default` on a binding element, wrapping the
    /// pattern in `Pattern::Default` when present.
    fn parse_pattern_default(&mut self, pattern: Pattern) -> Result<Pattern, ParseError> {
        if self.eat_operator("=") {
            let default = self.parse_assignment()?;
            return Ok(Pattern::Default { pattern: Box::new(pattern), default: Box::new(default) });
        }
        Ok(pattern)
    }
}
