//! Each phase of the pipeline raises a distinct error kind; `CompileError`
//! unifies them for callers that just want to report a single failure.

use crate::style::Style;
use crate::token::Span;

fn find_context(source: &str, pos: usize) -> (usize, usize, &str) {
    let mut line_num = 1;
    let mut line_start = 0;

    for (i, c) in source.char_indices() {
        if i >= pos {
            break;
        }
        if c == '\n' {
            line_num += 1;
            line_start = i + 1;
        }
    }

    let line_end = source[line_start..]
        .find('\n')
        .map(|off| line_start + off)
        .unwrap_or(source.len());

    (line_num, line_start, &source[line_start..line_end])
}

fn render_snippet(source: &str, span: Span, label: &str, message: &str) -> String {
    let (line_num, line_start, line_content) = find_context(source, span.start);
    let col = span.start.saturating_sub(line_start);
    let len = span.end.saturating_sub(span.start).max(1);
    let underline = format!("{}{}", " ".repeat(col), "^".repeat(len));

    format!(
        "{}: {}\n\n{:>4} | {}\n     | {}",
        Style::bold_red(label),
        message,
        Style::blue(&line_num.to_string()),
        line_content,
        Style::red(&underline),
    )
}

/// Unterminated literal, invalid number, unknown character, or unterminated
/// template interpolation.
#[derive(Debug, Clone)]
pub struct LexError {
    pub position: usize,
    pub message: String,
}

impl LexError {
    pub fn new(position: usize, message: impl Into<String>) -> Self {
        Self { position, message: message.into() }
    }

    pub fn display_with_source(&self, source: &str) -> String {
        let span = Span::new(self.position, self.position + 1);
        render_snippet(source, span, "lex error", &self.message)
    }
}

impl std::fmt::Display for LexError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "lex error at byte {}: {}", self.position, self.message)
    }
}

impl std::error::Error for LexError {}

/// Unexpected token, expected-token mismatch, invalid destructuring target,
/// missing `from` in imports, invalid export form.
#[derive(Debug, Clone)]
pub struct ParseError {
    pub span: Span,
    pub message: String,
}

impl ParseError {
    pub fn new(span: Span, message: impl Into<String>) -> Self {
        Self { span, message: message.into() }
    }

    pub fn display_with_source(&self, source: &str) -> String {
        render_snippet(source, self.span, "parse error", &self.message)
    }
}

impl std::fmt::Display for ParseError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "parse error at {}..{}: {}", self.span.start, self.span.end, self.message)
    }
}

impl std::error::Error for ParseError {}

/// Duplicate declaration, undefined identifier, or destructuring referencing
/// unknown patterns. Unlike every other error kind, all diagnostics found in
/// a single `check` pass are collected rather than stopping at the first.
#[derive(Debug, Clone)]
pub struct SemanticError {
    pub messages: Vec<String>,
}

impl std::fmt::Display for SemanticError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        for (i, msg) in self.messages.iter().enumerate() {
            if i > 0 {
                writeln!(f)?;
            }
            write!(f, "{}", msg)?;
        }
        Ok(())
    }
}

impl std::error::Error for SemanticError {}

/// `break`/`continue` outside a loop, compound assignment into a
/// non-identifier / non-member target, an unsupported node kind, or a jump
/// displacement outside the signed-16-bit range.
#[derive(Debug, Clone)]
pub enum EmitError {
    BreakOutsideLoop,
    ContinueOutsideLoop,
    InvalidAssignmentTarget(String),
    UnsupportedNode(String),
    DisplacementOutOfRange(i64),
}

impl std::fmt::Display for EmitError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            EmitError::BreakOutsideLoop => write!(f, "'break' outside of a loop"),
            EmitError::ContinueOutsideLoop => write!(f, "'continue' outside of a loop"),
            EmitError::InvalidAssignmentTarget(desc) => {
                write!(f, "invalid assignment target: {desc}")
            }
            EmitError::UnsupportedNode(desc) => write!(f, "unsupported node: {desc}"),
            EmitError::DisplacementOutOfRange(disp) => {
                write!(f, "jump displacement {disp} out of signed-16-bit range")
            }
        }
    }
}

impl std::error::Error for EmitError {}

/// Missing id/type, unknown endpoint, duplicate edge, no entry, multiple
/// entries, malformed `if`/`loop` config, multiple successors on a
/// non-branching block, unresolved jump target, displacement out of range.
#[derive(Debug, Clone)]
pub enum GraphError {
    MissingField { block: String, field: &'static str },
    UnknownEndpoint { edge_from: String, edge_to: String },
    DuplicateEdge { from: String, to: String },
    NoEntry,
    MultipleEntries(Vec<String>),
    MalformedIfConfig { block: String },
    MalformedLoopConfig { block: String },
    TooManySuccessors { block: String },
    UnresolvedTarget { block: String },
    DisplacementOutOfRange(i64),
}

impl std::fmt::Display for GraphError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            GraphError::MissingField { block, field } => {
                write!(f, "block '{block}' is missing required field '{field}'")
            }
            GraphError::UnknownEndpoint { edge_from, edge_to } => {
                write!(f, "connection {edge_from} -> {edge_to} references an unknown block")
            }
            GraphError::DuplicateEdge { from, to } => {
                write!(f, "duplicate connection {from} -> {to}")
            }
            GraphError::NoEntry => write!(f, "graph has no entry block"),
            GraphError::MultipleEntries(ids) => {
                write!(f, "multiple start blocks: {}", ids.join(", "))
            }
            GraphError::MalformedIfConfig { block } => {
                write!(f, "'if' block '{block}' is missing trueTarget/falseTarget")
            }
            GraphError::MalformedLoopConfig { block } => {
                write!(f, "'loop' block '{block}' is missing bodyStart/exitTarget")
            }
            GraphError::TooManySuccessors { block } => {
                write!(f, "block '{block}' has more than one successor")
            }
            GraphError::UnresolvedTarget { block } => {
                write!(f, "jump target '{block}' never resolved to a placed block")
            }
            GraphError::DisplacementOutOfRange(disp) => {
                write!(f, "jump displacement {disp} out of signed-16-bit range")
            }
        }
    }
}

impl std::error::Error for GraphError {}

/// The union of every error kind the core can raise, for callers that just
/// want to propagate the first failure with `?`.
#[derive(Debug)]
pub enum CompileError {
    Lex(LexError),
    Parse(ParseError),
    Semantic(SemanticError),
    Emit(EmitError),
    Graph(GraphError),
    Json(serde_json::Error),
}

impl std::fmt::Display for CompileError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CompileError::Lex(e) => write!(f, "{e}"),
            CompileError::Parse(e) => write!(f, "{e}"),
            CompileError::Semantic(e) => write!(f, "{e}"),
            CompileError::Emit(e) => write!(f, "{e}"),
            CompileError::Graph(e) => write!(f, "{e}"),
            CompileError::Json(e) => write!(f, "invalid NetBots JSON: {e}"),
        }
    }
}

impl std::error::Error for CompileError {}

impl From<LexError> for CompileError {
    fn from(e: LexError) -> Self {
        CompileError::Lex(e)
    }
}

impl From<ParseError> for CompileError {
    fn from(e: ParseError) -> Self {
        CompileError::Parse(e)
    }
}

impl From<SemanticError> for CompileError {
    fn from(e: SemanticError) -> Self {
        CompileError::Semantic(e)
    }
}

impl From<EmitError> for CompileError {
    fn from(e: EmitError) -> Self {
        CompileError::Emit(e)
    }
}

impl From<GraphError> for CompileError {
    fn from(e: GraphError) -> Self {
        CompileError::Graph(e)
    }
}

impl From<serde_json::Error> for CompileError {
    fn from(e: serde_json::Error) -> Self {
        CompileError::Json(e)
    }
}
