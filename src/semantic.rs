//! Scope-aware binding analyzer. Walks the whole tree and collects every
//! diagnostic rather than stopping at the first, unlike the lexer and
//! parser.

use std::collections::HashMap;

use crate::ast::*;
use crate::error::SemanticError;
use crate::intern::{Interner, Symbol};

/// Identifiers resolvable without a declaration anywhere in the program.
const BUILTINS: &[&str] = &[
    "console", "Math", "JSON", "Object", "Array", "String", "Number", "Boolean", "Date", "RegExp",
    "Error", "Promise", "Map", "Set", "WeakMap", "WeakSet", "Symbol", "Reflect", "Proxy",
    "globalThis", "window", "document", "fetch", "setTimeout", "setInterval", "clearTimeout",
    "clearInterval", "WebSocket", "EventTarget", "Event",
];

fn is_builtin(name: &str) -> bool {
    BUILTINS.contains(&name)
}

/// Validates bindings across lexical scopes, returning every diagnostic
/// found in a single pass.
pub fn check(program: &Program, interner: &Interner) -> Result<(), SemanticError> {
    let mut analyzer = Analyzer { interner, scopes: Vec::new(), errors: Vec::new() };
    analyzer.push_scope();
    for stmt in &program.body {
        analyzer.check_stmt(stmt);
    }
    analyzer.pop_scope();

    if analyzer.errors.is_empty() {
        Ok(())
    } else {
        Err(SemanticError { messages: analyzer.errors })
    }
}

struct Analyzer<'i> {
    interner: &'i Interner,
    scopes: Vec<HashMap<Symbol, ()>>,
    errors: Vec<String>,
}

impl<'i> Analyzer<'i> {
    fn push_scope(&mut self) {
        self.scopes.push(HashMap::new());
    }

    fn pop_scope(&mut self) {
        self.scopes.pop();
    }

    fn name(&self, sym: Symbol) -> &str {
        self.interner.resolve(sym)
    }

    /// Binds `sym` in the innermost scope. A second declaration of the same
    /// name in that scope is an error; shadowing in a nested scope is not.
    fn declare(&mut self, sym: Symbol) {
        let scope = self.scopes.last_mut().expect("at least one scope is always active");
        if scope.insert(sym, ()).is_some() {
            self.errors.push(format!("Duplicate declaration: {}", self.interner.resolve(sym)));
        }
    }

    /// Declares every terminal identifier a destructuring pattern binds,
    /// descending into computed keys and default-value expressions (both
    /// of which are evaluated, not declared).
    fn declare_pattern(&mut self, pattern: &Pattern) {
        match pattern {
            Pattern::Ident(sym) => self.declare(*sym),
            Pattern::Object { props } => {
                for prop in props {
                    self.check_property_key(&prop.key);
                    self.declare_pattern(&prop.value);
                }
            }
            Pattern::Array { elements } => {
                for element in elements.iter().flatten() {
                    self.declare_pattern(element);
                }
            }
            Pattern::Default { pattern, default } => {
                self.check_expr(default);
                self.declare_pattern(pattern);
            }
        }
    }

    /// Resolves an identifier used as a value, walking outward through
    /// enclosing scopes and finally the built-in allowlist.
    fn reference(&mut self, sym: Symbol) {
        if self.scopes.iter().rev().any(|scope| scope.contains_key(&sym)) {
            return;
        }
        let name = self.name(sym);
        if is_builtin(name) {
            return;
        }
        self.errors.push(format!("Undefined variable: {name}"));
    }

    /// A pattern used as an assignment target (as opposed to a
    /// declaration): every terminal identifier is a reference to an
    /// existing binding, not a new one.
    fn check_pattern_reference(&mut self, pattern: &Pattern) {
        match pattern {
            Pattern::Ident(sym) => self.reference(*sym),
            Pattern::Object { props } => {
                for prop in props {
                    self.check_property_key(&prop.key);
                    self.check_pattern_reference(&prop.value);
                }
            }
            Pattern::Array { elements } => {
                for element in elements.iter().flatten() {
                    self.check_pattern_reference(element);
                }
            }
            Pattern::Default { pattern, default } => {
                self.check_expr(default);
                self.check_pattern_reference(pattern);
            }
        }
    }

    fn check_property_key(&mut self, key: &PropertyKey) {
        if let PropertyKey::Computed(expr) = key {
            self.check_expr(expr);
        }
    }

    fn check_stmts(&mut self, stmts: &[Stmt]) {
        for stmt in stmts {
            self.check_stmt(stmt);
        }
    }

    fn check_block(&mut self, stmts: &[Stmt]) {
        self.push_scope();
        self.check_stmts(stmts);
        self.pop_scope();
    }

    fn check_stmt(&mut self, stmt: &Stmt) {
        match stmt {
            Stmt::Block(stmts) => self.check_block(stmts),
            Stmt::FunctionDecl(def) => {
                if let Some(name) = def.name {
                    self.declare(name);
                }
                self.check_function(def);
            }
            Stmt::ClassDecl(def) => {
                if let Some(name) = def.name {
                    self.declare(name);
                }
                self.check_class(def);
            }
            Stmt::VarDecl(decl) => self.check_var_decl(decl),
            Stmt::If { test, consequent, alternate } => {
                self.check_expr(test);
                self.check_stmt(consequent);
                if let Some(alt) = alternate {
                    self.check_stmt(alt);
                }
            }
            Stmt::While { test, body } => {
                self.check_expr(test);
                self.check_stmt(body);
            }
            Stmt::For { init, test, update, body } => {
                self.push_scope();
                match init {
                    ForInit::VarDecl(decl) => self.check_var_decl(decl),
                    ForInit::Expr(expr) => self.check_expr(expr),
                    ForInit::None => {}
                }
                if let Some(test) = test {
                    self.check_expr(test);
                }
                if let Some(update) = update {
                    self.check_expr(update);
                }
                self.check_stmt(body);
                self.pop_scope();
            }
            Stmt::ForIn { left, right, body } | Stmt::ForOf { left, right, body } => {
                self.check_expr(right);
                self.push_scope();
                self.declare_pattern(left);
                self.check_stmt(body);
                self.pop_scope();
            }
            Stmt::Return(expr) => {
                if let Some(expr) = expr {
                    self.check_expr(expr);
                }
            }
            Stmt::Break | Stmt::Continue => {}
            Stmt::Throw(expr) => self.check_expr(expr),
            Stmt::Try { block, handler, finalizer } => {
                self.check_block(block);
                if let Some(CatchClause { param, body }) = handler {
                    self.push_scope();
                    if let Some(param) = param {
                        self.declare_pattern(param);
                    }
                    self.check_stmts(body);
                    self.pop_scope();
                }
                if let Some(finalizer) = finalizer {
                    self.check_block(finalizer);
                }
            }
            Stmt::Switch { discriminant, cases } => {
                self.check_expr(discriminant);
                for case in cases {
                    self.push_scope();
                    if let Some(test) = &case.test {
                        self.check_expr(test);
                    }
                    self.check_stmts(&case.body);
                    self.pop_scope();
                }
            }
            Stmt::Import(decl) => {
                for specifier in &decl.specifiers {
                    match specifier {
                        ImportSpecifier::Default(sym) => self.declare(*sym),
                        ImportSpecifier::Named { local, .. } => self.declare(*local),
                        ImportSpecifier::Namespace(sym) => self.declare(*sym),
                    }
                }
            }
            Stmt::ExportNamed(decl) => {
                for specifier in &decl.specifiers {
                    self.reference(specifier.local);
                }
            }
            Stmt::ExportDecl(inner) => self.check_stmt(inner),
            Stmt::ExportDefault(value) => match value {
                ExportDefaultValue::Decl(inner) => self.check_stmt(inner),
                ExportDefaultValue::Expr(expr) => self.check_expr(expr),
            },
            Stmt::ExprStmt(expr) => self.check_expr(expr),
        }
    }

    fn check_var_decl(&mut self, decl: &VarDecl) {
        for declarator in &decl.declarators {
            if let Some(init) = &declarator.init {
                self.check_expr(init);
            }
            self.declare_pattern(&declarator.target);
        }
    }

    /// A function's parameters and body share one scope; a named function
    /// expression's own name is bound there too, visible only to itself.
    fn check_function(&mut self, def: &FunctionDef) {
        self.push_scope();
        for param in &def.params {
            self.declare_pattern(param);
        }
        self.check_stmts(&def.body);
        self.pop_scope();
    }

    fn check_class(&mut self, def: &ClassDef) {
        if let Some(superclass) = &def.superclass {
            self.check_expr(superclass);
        }
        self.push_scope();
        if let Some(name) = def.name {
            self.declare(name);
        }
        for method in &def.methods {
            self.push_scope();
            for param in &method.params {
                self.declare_pattern(param);
            }
            self.check_property_key(&method.key);
            self.check_stmts(&method.body);
            self.pop_scope();
        }
        self.pop_scope();
    }

    fn check_expr(&mut self, expr: &Expr) {
        match expr {
            Expr::Identifier(sym) => self.reference(*sym),
            Expr::Literal(_) | Expr::This | Expr::Super => {}
            Expr::Template { quasis: _, exprs } => {
                for expr in exprs {
                    self.check_expr(expr);
                }
            }
            Expr::Array { elements } => {
                for element in elements.iter().flatten() {
                    self.check_expr(element);
                }
            }
            Expr::Object { props } => {
                for prop in props {
                    match prop {
                        Property::Data { key, value } => {
                            self.check_property_key(key);
                            self.check_expr(value);
                        }
                        Property::Shorthand { name } => self.reference(*name),
                        Property::Method { key, value }
                        | Property::Getter { key, value }
                        | Property::Setter { key, value } => {
                            self.check_property_key(key);
                            self.check_function(value);
                        }
                    }
                }
            }
            Expr::Function(def) => {
                self.push_scope();
                if let Some(name) = def.name {
                    self.declare(name);
                }
                for param in &def.params {
                    self.declare_pattern(param);
                }
                self.check_stmts(&def.body);
                self.pop_scope();
            }
            Expr::Class(def) => self.check_class(def),
            Expr::Unary { argument, .. } => self.check_expr(argument),
            Expr::Update { argument, .. } => self.check_expr(argument),
            Expr::Binary { left, right, .. } => {
                self.check_expr(left);
                self.check_expr(right);
            }
            Expr::Logical { left, right, .. } => {
                self.check_expr(left);
                self.check_expr(right);
            }
            Expr::Assign { target, value, .. } => {
                self.check_expr(value);
                match target {
                    AssignTarget::Expr(expr) => self.check_expr(expr),
                    AssignTarget::Pattern(pattern) => self.check_pattern_reference(pattern),
                }
            }
            Expr::Conditional { test, consequent, alternate } => {
                self.check_expr(test);
                self.check_expr(consequent);
                self.check_expr(alternate);
            }
            Expr::Call { callee, args, .. } => {
                self.check_expr(callee);
                for arg in args {
                    self.check_expr(arg);
                }
            }
            Expr::New { callee, args } => {
                self.check_expr(callee);
                for arg in args {
                    self.check_expr(arg);
                }
            }
            Expr::Member { object, property, computed, .. } => {
                self.check_expr(object);
                if *computed {
                    self.check_expr(property);
                }
            }
            Expr::Yield { argument, .. } => {
                if let Some(argument) = argument {
                    self.check_expr(argument);
                }
            }
            Expr::ImportExpr { source } => self.check_expr(source),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{intern::Interner, lexer, parser};

    fn check_source(source: &str) -> Result<(), SemanticError> {
        let mut interner = Interner::new();
        let tokens = lexer::lex(source, &mut interner).expect("lex");
        let program = parser::parse(tokens, &interner).expect("parse");
        check(&program, &interner)
    }

    #[test]
    fn duplicate_declaration_in_same_scope_is_an_error() {
        let err = check_source("let a; let a;").unwrap_err();
        assert_eq!(err.messages, vec!["Duplicate declaration: a"]);
    }

    #[test]
    fn shadowing_in_a_nested_block_is_allowed() {
        assert!(check_source("let a; { let a; }").is_ok());
    }

    #[test]
    fn undefined_identifier_is_reported() {
        let err = check_source("console.log(missing);").unwrap_err();
        assert_eq!(err.messages, vec!["Undefined variable: missing"]);
    }

    #[test]
    fn builtins_resolve_without_declaration() {
        assert!(check_source("console.log(Math.max(1, 2));").is_ok());
    }

    #[test]
    fn destructuring_declares_every_terminal_identifier() {
        assert!(check_source("let { a, b: [c, d] } = obj;").is_err());
        let err = check_source("let { a, b: [c, d] } = obj;").unwrap_err();
        assert_eq!(err.messages, vec!["Undefined variable: obj"]);
    }

    #[test]
    fn function_parameters_are_visible_in_the_body() {
        assert!(check_source("function f(x) { return x + 1; }").is_ok());
    }

    #[test]
    fn duplicate_parameter_names_are_an_error() {
        let err = check_source("function f(x, x) { return x; }").unwrap_err();
        assert_eq!(err.messages, vec!["Duplicate declaration: x"]);
    }

    #[test]
    fn catch_parameter_is_scoped_to_the_catch_clause() {
        assert!(check_source("try { risky(); } catch (e) { console.log(e); }").is_err());
        let err = check_source("try { risky(); } catch (e) { console.log(e); }").unwrap_err();
        assert_eq!(err.messages, vec!["Undefined variable: risky"]);
    }

    #[test]
    fn for_of_declares_the_loop_variable() {
        assert!(check_source("for (const x of items) { console.log(x); }").is_err());
        let err = check_source("for (const x of items) { console.log(x); }").unwrap_err();
        assert_eq!(err.messages, vec!["Undefined variable: items"]);
    }

    #[test]
    fn named_function_expression_can_call_itself() {
        assert!(check_source("let f = function fact(n) { return fact(n); };").is_ok());
    }
}
