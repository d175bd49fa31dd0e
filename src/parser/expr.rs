use super::Parser;
use crate::ast::*;
use crate::error::ParseError;
use crate::token::{Keyword, TokenKind};

/// Binary/assignment operator spellings recognized at the assignment
/// precedence level, longest match not required here since the lexer
/// already produced maximal-munch operator tokens.
const ASSIGN_OPS: &[(&str, AssignOp)] = &[
    ("=", AssignOp::Assign),
    ("+=", AssignOp::AddAssign),
    ("-=", AssignOp::SubAssign),
    ("*=", AssignOp::MulAssign),
    ("/=", AssignOp::DivAssign),
    ("%=", AssignOp::ModAssign),
    ("**=", AssignOp::PowAssign),
    ("<<=", AssignOp::ShlAssign),
    (">>=", AssignOp::ShrAssign),
    (">>>=", AssignOp::UShrAssign),
    ("&=", AssignOp::BitAndAssign),
    ("|=", AssignOp::BitOrAssign),
    ("^=", AssignOp::BitXorAssign),
    ("&&=", AssignOp::AndAssign),
    ("||=", AssignOp::OrAssign),
    ("??=", AssignOp::CoalesceAssign),
];

impl<'i> Parser<'i> {
    pub(super) fn parse_expression(&mut self) -> Result<Expr, ParseError> {
        self.parse_assignment()
    }

    pub(super) fn parse_assignment(&mut self) -> Result<Expr, ParseError> {
        let left = self.parse_conditional()?;

        if let TokenKind::Operator(op) = self.peek_kind() {
            if let Some((_, assign_op)) = ASSIGN_OPS.iter().find(|(s, _)| s == op) {
                let assign_op = *assign_op;
                self.advance();
                let value = self.parse_assignment()?;
                let target = self.expr_to_assign_target(left)?;
                return Ok(Expr::Assign { op: assign_op, target, value: Box::new(value) });
            }
        }
        Ok(left)
    }

    /// Converts a parsed expression into an assignment target, lowering
    /// array/object literals into the equivalent destructuring pattern.
    fn expr_to_assign_target(&self, expr: Expr) -> Result<AssignTarget, ParseError> {
        match &expr {
            Expr::Identifier(_) | Expr::Member { .. } => Ok(AssignTarget::Expr(Box::new(expr))),
            Expr::Array { .. } | Expr::Object { .. } => {
                let pattern = self.expr_to_pattern(expr)?;
                Ok(AssignTarget::Pattern(pattern))
            }
            _ => Err(self.error_here("invalid assignment target")),
        }
    }

    fn expr_to_pattern(&self, expr: Expr) -> Result<Pattern, ParseError> {
        match expr {
            Expr::Identifier(sym) => Ok(Pattern::Ident(sym)),
            Expr::Assign { op: AssignOp::Assign, target: AssignTarget::Expr(target), value } => {
                let pattern = self.expr_to_pattern(*target)?;
                Ok(Pattern::Default { pattern: Box::new(pattern), default: value })
            }
            Expr::Array { elements } => {
                let mut out = Vec::with_capacity(elements.len());
                for element in elements {
                    out.push(match element {
                        None => None,
                        Some(e) => Some(self.expr_to_pattern(e)?),
                    });
                }
                Ok(Pattern::Array { elements: out })
            }
            Expr::Object { props } => {
                let mut out = Vec::with_capacity(props.len());
                for prop in props {
                    match prop {
                        Property::Shorthand { name } => {
                            out.push(ObjectPatternProp {
                                key: PropertyKey::Ident(name),
                                value: Pattern::Ident(name),
                            });
                        }
                        Property::Data { key, value } => {
                            out.push(ObjectPatternProp { key, value: self.expr_to_pattern(value)? });
                        }
                        _ => return Err(self.error_here("invalid destructuring target")),
                    }
                }
                Ok(Pattern::Object { props: out })
            }
            _ => Err(self.error_here("invalid destructuring target")),
        }
    }

    fn parse_conditional(&mut self) -> Result<Expr, ParseError> {
        let test = self.parse_nullish_or()?;
        if self.eat_operator("?") {
            let consequent = self.parse_assignment()?;
            self.expect_operator(":")?;
            let alternate = self.parse_assignment()?;
            return Ok(Expr::Conditional {
                test: Box::new(test),
                consequent: Box::new(consequent),
                alternate: Box::new(alternate),
            });
        }
        Ok(test)
    }

    /// `||` and `??` share a precedence tier in this grammar; mixing them
    /// without parens simply nests left-to-right rather than being a
    /// grammar error.
    fn parse_nullish_or(&mut self) -> Result<Expr, ParseError> {
        let mut left = self.parse_and()?;
        loop {
            if self.eat_operator("||") {
                let right = self.parse_and()?;
                left = Expr::Logical { op: LogicalOp::Or, left: Box::new(left), right: Box::new(right) };
            } else if self.eat_operator("??") {
                let right = self.parse_and()?;
                left = Expr::Logical { op: LogicalOp::Coalesce, left: Box::new(left), right: Box::new(right) };
            } else {
                break;
            }
        }
        Ok(left)
    }

    fn parse_and(&mut self) -> Result<Expr, ParseError> {
        let mut left = self.parse_bit_or()?;
        while self.eat_operator("&&") {
            let right = self.parse_bit_or()?;
            left = Expr::Logical { op: LogicalOp::And, left: Box::new(left), right: Box::new(right) };
        }
        Ok(left)
    }

    fn parse_bit_or(&mut self) -> Result<Expr, ParseError> {
        let mut left = self.parse_bit_xor()?;
        while self.eat_operator("|") {
            let right = self.parse_bit_xor()?;
            left = Expr::Binary { op: BinaryOp::BitOr, left: Box::new(left), right: Box::new(right) };
        }
        Ok(left)
    }

    fn parse_bit_xor(&mut self) -> Result<Expr, ParseError> {
        let mut left = self.parse_bit_and()?;
        while self.eat_operator("^") {
            let right = self.parse_bit_and()?;
            left = Expr::Binary { op: BinaryOp::BitXor, left: Box::new(left), right: Box::new(right) };
        }
        Ok(left)
    }

    fn parse_bit_and(&mut self) -> Result<Expr, ParseError> {
        let mut left = self.parse_equality()?;
        while self.eat_operator("&") {
            let right = self.parse_equality()?;
            left = Expr::Binary { op: BinaryOp::BitAnd, left: Box::new(left), right: Box::new(right) };
        }
        Ok(left)
    }

    fn parse_equality(&mut self) -> Result<Expr, ParseError> {
        let mut left = self.parse_relational()?;
        loop {
            let op = if self.eat_operator("===") {
                BinaryOp::StrictEq
            } else if self.eat_operator("!==") {
                BinaryOp::StrictNotEq
            } else if self.eat_operator("==") {
                BinaryOp::Eq
            } else if self.eat_operator("!=") {
                BinaryOp::NotEq
            } else {
                break;
            };
            let right = self.parse_relational()?;
            left = Expr::Binary { op, left: Box::new(left), right: Box::new(right) };
        }
        Ok(left)
    }

    fn parse_relational(&mut self) -> Result<Expr, ParseError> {
        let mut left = self.parse_shift()?;
        loop {
            let op = if self.eat_operator("<=") {
                BinaryOp::LtEq
            } else if self.eat_operator(">=") {
                BinaryOp::GtEq
            } else if self.eat_operator("<") {
                BinaryOp::Lt
            } else if self.eat_operator(">") {
                BinaryOp::Gt
            } else if self.eat_keyword(Keyword::In) {
                BinaryOp::In
            } else if self.eat_keyword(Keyword::Instanceof) {
                BinaryOp::Instanceof
            } else {
                break;
            };
            let right = self.parse_shift()?;
            left = Expr::Binary { op, left: Box::new(left), right: Box::new(right) };
        }
        Ok(left)
    }

    fn parse_shift(&mut self) -> Result<Expr, ParseError> {
        let mut left = self.parse_additive()?;
        loop {
            let op = if self.eat_operator(">>>") {
                BinaryOp::UShr
            } else if self.eat_operator("<<") {
                BinaryOp::Shl
            } else if self.eat_operator(">>") {
                BinaryOp::Shr
            } else {
                break;
            };
            let right = self.parse_additive()?;
            left = Expr::Binary { op, left: Box::new(left), right: Box::new(right) };
        }
        Ok(left)
    }

    fn parse_additive(&mut self) -> Result<Expr, ParseError> {
        let mut left = self.parse_multiplicative()?;
        loop {
            let op = if self.eat_operator("+") {
                BinaryOp::Add
            } else if self.eat_operator("-") {
                BinaryOp::Sub
            } else {
                break;
            };
            let right = self.parse_multiplicative()?;
            left = Expr::Binary { op, left: Box::new(left), right: Box::new(right) };
        }
        Ok(left)
    }

    fn parse_multiplicative(&mut self) -> Result<Expr, ParseError> {
        let mut left = self.parse_exponent()?;
        loop {
            let op = if self.eat_operator("*") {
                BinaryOp::Mul
            } else if self.eat_operator("/") {
                BinaryOp::Div
            } else if self.eat_operator("%") {
                BinaryOp::Mod
            } else {
                break;
            };
            let right = self.parse_exponent()?;
            left = Expr::Binary { op, left: Box::new(left), right: Box::new(right) };
        }
        Ok(left)
    }

    /// Right-associative.
    fn parse_exponent(&mut self) -> Result<Expr, ParseError> {
        let left = self.parse_unary()?;
        if self.eat_operator("**") {
            let right = self.parse_exponent()?;
            return Ok(Expr::Binary { op: BinaryOp::Pow, left: Box::new(left), right: Box::new(right) });
        }
        Ok(left)
    }

    fn parse_unary(&mut self) -> Result<Expr, ParseError> {
        let op = if self.eat_operator("!") {
            Some(UnaryOp::Not)
        } else if self.eat_operator("-") {
            Some(UnaryOp::Neg)
        } else if self.eat_operator("+") {
            Some(UnaryOp::Pos)
        } else if self.eat_operator("~") {
            Some(UnaryOp::BitNot)
        } else if self.eat_keyword(Keyword::Typeof) {
            Some(UnaryOp::Typeof)
        } else if self.eat_keyword(Keyword::Void) {
            Some(UnaryOp::Void)
        } else if self.eat_keyword(Keyword::Delete) {
            Some(UnaryOp::Delete)
        } else if self.eat_keyword(Keyword::Await) {
            Some(UnaryOp::Await)
        } else {
            None
        };
        if let Some(op) = op {
            let argument = self.parse_unary()?;
            return Ok(Expr::Unary { op, argument: Box::new(argument) });
        }

        if self.eat_operator("++") {
            let argument = self.parse_unary()?;
            return Ok(Expr::Update { op: UpdateOp::Inc, argument: Box::new(argument), prefix: true });
        }
        if self.eat_operator("--") {
            let argument = self.parse_unary()?;
            return Ok(Expr::Update { op: UpdateOp::Dec, argument: Box::new(argument), prefix: true });
        }

        self.parse_postfix_update()
    }

    fn parse_postfix_update(&mut self) -> Result<Expr, ParseError> {
        let expr = self.parse_call_member_chain()?;
        if self.eat_operator("++") {
            return Ok(Expr::Update { op: UpdateOp::Inc, argument: Box::new(expr), prefix: false });
        }
        if self.eat_operator("--") {
            return Ok(Expr::Update { op: UpdateOp::Dec, argument: Box::new(expr), prefix: false });
        }
        Ok(expr)
    }

    fn parse_call_member_chain(&mut self) -> Result<Expr, ParseError> {
        let mut expr = self.parse_new_or_primary()?;
        loop {
            if self.eat_operator("?.") {
                if self.at_punct("(") {
                    let args = self.parse_arguments()?;
                    expr = Expr::Call { callee: Box::new(expr), args, optional: true };
                } else if self.eat_punct("[") {
                    let prop = self.parse_expression()?;
                    self.expect_punct("]")?;
                    expr = Expr::Member { object: Box::new(expr), property: Box::new(prop), computed: true, optional: true };
                } else {
                    let name = self.expect_ident()?;
                    expr = Expr::Member {
                        object: Box::new(expr),
                        property: Box::new(Expr::Identifier(name)),
                        computed: false,
                        optional: true,
                    };
                }
            } else if self.eat_punct(".") {
                let name = self.expect_ident()?;
                expr = Expr::Member {
                    object: Box::new(expr),
                    property: Box::new(Expr::Identifier(name)),
                    computed: false,
                    optional: false,
                };
            } else if self.eat_punct("[") {
                let prop = self.parse_expression()?;
                self.expect_punct("]")?;
                expr = Expr::Member { object: Box::new(expr), property: Box::new(prop), computed: true, optional: false };
            } else if self.at_punct("(") {
                let args = self.parse_arguments()?;
                expr = Expr::Call { callee: Box::new(expr), args, optional: false };
            } else {
                break;
            }
        }
        Ok(expr)
    }

    fn parse_new_or_primary(&mut self) -> Result<Expr, ParseError> {
        if self.eat_keyword(Keyword::New) {
            let callee = self.parse_call_member_chain_no_call()?;
            let args = if self.at_punct("(") { self.parse_arguments()? } else { Vec::new() };
            return Ok(Expr::New { callee: Box::new(callee), args });
        }
        self.parse_primary()
    }

    /// Parses the callee of a `new` expression: a member chain without
    /// consuming the final call parens (those belong to `new`, not to a
    /// nested call).
    fn parse_call_member_chain_no_call(&mut self) -> Result<Expr, ParseError> {
        let mut expr = self.parse_primary()?;
        loop {
            if self.eat_punct(".") {
                let name = self.expect_ident()?;
                expr = Expr::Member {
                    object: Box::new(expr),
                    property: Box::new(Expr::Identifier(name)),
                    computed: false,
                    optional: false,
                };
            } else if self.eat_punct("[") {
                let prop = self.parse_expression()?;
                self.expect_punct("]")?;
                expr = Expr::Member { object: Box::new(expr), property: Box::new(prop), computed: true, optional: false };
            } else {
                break;
            }
        }
        Ok(expr)
    }

    fn parse_arguments(&mut self) -> Result<Vec<Expr>, ParseError> {
        self.expect_punct("(")?;
        let mut args = Vec::new();
        while !self.at_punct(")") {
            args.push(self.parse_assignment()?);
            if !self.eat_punct(",") {
                break;
            }
        }
        self.expect_punct(")")?;
        Ok(args)
    }

    fn parse_primary(&mut self) -> Result<Expr, ParseError> {
        match self.peek_kind().clone() {
            TokenKind::Number(n) => {
                self.advance();
                Ok(Expr::Literal(Literal::Number(n)))
            }
            TokenKind::BigInt(n) => {
                self.advance();
                Ok(Expr::Literal(Literal::BigInt(n)))
            }
            TokenKind::Str(s) => {
                self.advance();
                Ok(Expr::Literal(Literal::Str(s)))
            }
            TokenKind::Template(_)
            | TokenKind::TemplateHead(_)
            | TokenKind::TemplateMid(_)
            | TokenKind::TemplateTail(_) => self.parse_template(),
            TokenKind::Keyword(Keyword::True) => {
                self.advance();
                Ok(Expr::Literal(Literal::Bool(true)))
            }
            TokenKind::Keyword(Keyword::False) => {
                self.advance();
                Ok(Expr::Literal(Literal::Bool(false)))
            }
            TokenKind::Keyword(Keyword::Null) => {
                self.advance();
                Ok(Expr::Literal(Literal::Null))
            }
            TokenKind::Keyword(Keyword::This) => {
                self.advance();
                Ok(Expr::This)
            }
            TokenKind::Keyword(Keyword::Super) => {
                self.advance();
                Ok(Expr::Super)
            }
            TokenKind::Keyword(Keyword::Function) => self.parse_function_expr(),
            TokenKind::Keyword(Keyword::Async) => self.parse_function_expr(),
            TokenKind::Keyword(Keyword::Class) => self.parse_class_expr(),
            TokenKind::Keyword(Keyword::Yield) => self.parse_yield(),
            TokenKind::Keyword(Keyword::Import) => self.parse_dynamic_import(),
            TokenKind::Ident(sym) => {
                self.advance();
                Ok(Expr::Identifier(sym))
            }
            TokenKind::Punct("(") => {
                self.advance();
                let expr = self.parse_expression()?;
                self.expect_punct(")")?;
                Ok(expr)
            }
            TokenKind::Punct("[") => self.parse_array_literal(),
            TokenKind::Punct("{") => self.parse_object_literal(),
            _ => Err(self.error_here("expected an expression")),
        }
    }

    fn parse_template(&mut self) -> Result<Expr, ParseError> {
        match self.peek_kind().clone() {
            TokenKind::Template(text) => {
                self.advance();
                Ok(Expr::Template { quasis: vec![text], exprs: Vec::new() })
            }
            TokenKind::TemplateHead(head) => {
                self.advance();
                let mut quasis = vec![head];
                let mut exprs = Vec::new();
                loop {
                    let inner_tokens = match self.peek_kind().clone() {
                        TokenKind::TemplateExpr(tokens) => tokens,
                        _ => return Err(self.error_here("expected template interpolation")),
                    };
                    self.advance();
                    exprs.push(parse_expr_from_tokens(inner_tokens, self.interner)?);
                    match self.peek_kind().clone() {
                        TokenKind::TemplateMid(mid) => {
                            self.advance();
                            quasis.push(mid);
                        }
                        TokenKind::TemplateTail(tail) => {
                            self.advance();
                            quasis.push(tail);
                            break;
                        }
                        _ => return Err(self.error_here("malformed template literal")),
                    }
                }
                Ok(Expr::Template { quasis, exprs })
            }
            _ => Err(self.error_here("expected a template literal")),
        }
    }

    fn parse_array_literal(&mut self) -> Result<Expr, ParseError> {
        self.expect_punct("[")?;
        let mut elements = Vec::new();
        while !self.at_punct("]") {
            if self.at_punct(",") {
                elements.push(None);
                self.advance();
                continue;
            }
            elements.push(Some(self.parse_assignment()?));
            if !self.eat_punct(",") {
                break;
            }
        }
        self.expect_punct("]")?;
        Ok(Expr::Array { elements })
    }

    fn parse_object_literal(&mut self) -> Result<Expr, ParseError> {
        self.expect_punct("{")?;
        let mut props = Vec::new();
        while !self.at_punct("}") {
            props.push(self.parse_object_property()?);
            if !self.eat_punct(",") {
                break;
            }
        }
        self.expect_punct("}")?;
        Ok(Expr::Object { props })
    }

    fn parse_object_property(&mut self) -> Result<Property, ParseError> {
        let is_getter = self.at_keyword(Keyword::Get) && !self.peek_is_property_colon_or_paren_after_get();
        let is_setter = self.at_keyword(Keyword::Set) && !self.peek_is_property_colon_or_paren_after_set();
        if is_getter {
            self.advance();
            let key = self.parse_property_key()?;
            let value = self.parse_function_tail(None, false, false)?;
            return Ok(Property::Getter { key, value });
        }
        if is_setter {
            self.advance();
            let key = self.parse_property_key()?;
            let value = self.parse_function_tail(None, false, false)?;
            return Ok(Property::Setter { key, value });
        }

        let is_async = self.eat_keyword(Keyword::Async);
        let is_generator = self.eat_operator("*");
        let key = self.parse_property_key()?;

        if self.at_punct("(") {
            let value = self.parse_function_tail(None, is_async, is_generator)?;
            return Ok(Property::Method { key, value });
        }

        if self.eat_punct(":") {
            let value = self.parse_assignment()?;
            return Ok(Property::Data { key, value });
        }

        if let PropertyKey::Ident(name) = key {
            return Ok(Property::Shorthand { name });
        }
        Err(self.error_here("expected ':' in object property"))
    }

    /// Disambiguates `get` used as a shorthand property name from `get`
    /// introducing a getter: `{ get: 1 }` vs `{ get foo() {} }`.
    fn peek_is_property_colon_or_paren_after_get(&self) -> bool {
        matches!(self.tokens.get(self.pos + 1).map(|t| &t.kind), Some(TokenKind::Punct(":")) | Some(TokenKind::Punct("(")) | Some(TokenKind::Punct(",")) | Some(TokenKind::Punct("}")))
    }

    fn peek_is_property_colon_or_paren_after_set(&self) -> bool {
        self.peek_is_property_colon_or_paren_after_get()
    }

    fn parse_property_key(&mut self) -> Result<PropertyKey, ParseError> {
        match self.peek_kind().clone() {
            TokenKind::Ident(sym) => {
                self.advance();
                Ok(PropertyKey::Ident(sym))
            }
            TokenKind::Keyword(_) => {
                // Keywords are valid property names (e.g. `{ default: 1 }`).
                let tok = self.advance();
                let name = keyword_token_spelling(&tok.kind);
                Ok(PropertyKey::Str(name))
            }
            TokenKind::Str(s) => {
                self.advance();
                Ok(PropertyKey::Str(s))
            }
            TokenKind::Number(n) => {
                self.advance();
                Ok(PropertyKey::Str(number_property_key(n)))
            }
            TokenKind::Punct("[") => {
                self.advance();
                let expr = self.parse_assignment()?;
                self.expect_punct("]")?;
                Ok(PropertyKey::Computed(Box::new(expr)))
            }
            _ => Err(self.error_here("expected a property name")),
        }
    }

    fn parse_yield(&mut self) -> Result<Expr, ParseError> {
        self.expect_keyword(Keyword::Yield)?;
        let delegate = self.eat_operator("*");
        let argument = if self.can_start_expression() {
            Some(Box::new(self.parse_assignment()?))
        } else {
            None
        };
        Ok(Expr::Yield { argument, delegate })
    }

    fn parse_dynamic_import(&mut self) -> Result<Expr, ParseError> {
        self.expect_keyword(Keyword::Import)?;
        self.expect_punct("(")?;
        let source = self.parse_assignment()?;
        self.expect_punct(")")?;
        Ok(Expr::ImportExpr { source: Box::new(source) })
    }

    fn can_start_expression(&self) -> bool {
        !matches!(
            self.peek_kind(),
            TokenKind::Eof
                | TokenKind::Punct(";")
                | TokenKind::Punct(",")
                | TokenKind::Punct(")")
                | TokenKind::Punct("]")
                | TokenKind::Punct("}")
                | TokenKind::Punct(":")
        )
    }
}

/// Canonicalizes a numeric property key the way a property access would
/// stringify it, e.g. `{0: 'a'}` and `{1.5: 'b'}`.
fn number_property_key(n: f64) -> String {
    if n.fract() == 0.0 && n.abs() < 1e21 {
        format!("{}", n as i64)
    } else {
        format!("{}", n)
    }
}

impl<'i> Parser<'i> {
    fn parse_function_expr(&mut self) -> Result<Expr, ParseError> {
        let is_async = self.eat_keyword(Keyword::Async);
        self.expect_keyword(Keyword::Function)?;
        let is_generator = self.eat_operator("*");
        let name = if let TokenKind::Ident(_) = self.peek_kind() {
            Some(self.expect_ident()?)
        } else {
            None
        };
        let def = self.parse_function_tail(name, is_async, is_generator)?;
        Ok(Expr::Function(def))
    }

    /// Parses `(params) { body }` given the name/async/generator flags the
    /// caller already consumed; shared by function expressions, methods,
    /// getters, and setters.
    pub(super) fn parse_function_tail(
        &mut self,
        name: Option<crate::intern::Symbol>,
        is_async: bool,
        is_generator: bool,
    ) -> Result<FunctionDef, ParseError> {
        let params = self.parse_param_list()?;
        let body = self.parse_block_statements()?;
        Ok(FunctionDef { name, params, body, is_async, is_generator })
    }

    pub(super) fn parse_param_list(&mut self) -> Result<Vec<Pattern>, ParseError> {
        self.expect_punct("(")?;
        let mut params = Vec::new();
        while !self.at_punct(")") {
            params.push(self.parse_binding_pattern_with_default()?);
            if !self.eat_punct(",") {
                break;
            }
        }
        self.expect_punct(")")?;
        Ok(params)
    }

    fn parse_class_expr(&mut self) -> Result<Expr, ParseError> {
        let def = self.parse_class_tail()?;
        Ok(Expr::Class(def))
    }
}

fn keyword_token_spelling(kind: &TokenKind) -> String {
    if let TokenKind::Keyword(kw) = kind {
        if let Some((spelling, _)) = Keyword::ALL.iter().find(|(_, k)| k == kw) {
            return spelling.to_string();
        }
    }
    String::new()
}

fn parse_expr_from_tokens(
    tokens: Vec<crate::token::Token>,
    interner: &crate::intern::Interner,
) -> Result<Expr, ParseError> {
    let mut tokens = tokens;
    tokens.push(crate::token::Token::new(
        TokenKind::Eof,
        tokens.last().map(|t| t.span).unwrap_or_default(),
    ));
    let mut sub = Parser::new(tokens, interner);
    let expr = sub.parse_expression()?;
    sub.expect_eof()?;
    Ok(expr)
}
