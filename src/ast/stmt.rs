use crate::ast::expr::{ClassDef, Expr, FunctionDef};
use crate::ast::pattern::Pattern;
use crate::intern::Symbol;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VarKind {
    Var,
    Let,
    Const,
}

#[derive(Debug, Clone, PartialEq)]
pub struct VarDeclarator {
    pub target: Pattern,
    pub init: Option<Expr>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct VarDecl {
    pub kind: VarKind,
    pub declarators: Vec<VarDeclarator>,
}

/// The initializer clause of a C-style `for`: `for (<init>; test; update)`.
#[derive(Debug, Clone, PartialEq)]
pub enum ForInit {
    VarDecl(VarDecl),
    Expr(Expr),
    None,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SwitchCase {
    /// `None` marks the `default:` case.
    pub test: Option<Expr>,
    pub body: Vec<Stmt>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct CatchClause {
    pub param: Option<Pattern>,
    pub body: Vec<Stmt>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ImportSpecifier {
    Default(Symbol),
    Named { imported: Symbol, local: Symbol },
    Namespace(Symbol),
}

#[derive(Debug, Clone, PartialEq)]
pub struct ImportDecl {
    pub specifiers: Vec<ImportSpecifier>,
    pub source: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ExportSpecifier {
    pub local: Symbol,
    pub exported: Symbol,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ExportNamedDecl {
    pub specifiers: Vec<ExportSpecifier>,
    pub source: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ExportDefaultValue {
    Decl(Box<Stmt>),
    Expr(Expr),
}

#[derive(Debug, Clone, PartialEq)]
pub enum Stmt {
    Block(Vec<Stmt>),
    FunctionDecl(FunctionDef),
    ClassDecl(ClassDef),
    VarDecl(VarDecl),
    If { test: Expr, consequent: Box<Stmt>, alternate: Option<Box<Stmt>> },
    While { test: Expr, body: Box<Stmt> },
    For { init: ForInit, test: Option<Expr>, update: Option<Expr>, body: Box<Stmt> },
    ForIn { left: Pattern, right: Expr, body: Box<Stmt> },
    ForOf { left: Pattern, right: Expr, body: Box<Stmt> },
    Return(Option<Expr>),
    Break,
    Continue,
    Throw(Expr),
    Try { block: Vec<Stmt>, handler: Option<CatchClause>, finalizer: Option<Vec<Stmt>> },
    Switch { discriminant: Expr, cases: Vec<SwitchCase> },
    Import(ImportDecl),
    ExportNamed(ExportNamedDecl),
    /// `export function f() {}` / `export class C {}` / `export let x = 1;`
    ExportDecl(Box<Stmt>),
    ExportDefault(ExportDefaultValue),
    ExprStmt(Expr),
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct Program {
    pub body: Vec<Stmt>,
}
