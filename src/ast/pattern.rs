use crate::ast::expr::{Expr, PropertyKey};
use crate::intern::Symbol;

/// A destructuring target: a declaration, parameter, catch binding,
/// for-in/of left-hand side, or assignment target can all be a `Pattern`.
#[derive(Debug, Clone, PartialEq)]
pub enum Pattern {
    Ident(Symbol),
    Object { props: Vec<ObjectPatternProp> },
    /// Holes (`[a, , b]`) are represented as `None` entries.
    Array { elements: Vec<Option<Pattern>> },
    /// `pattern = default`, evaluated when the bound value is `undefined`.
    Default { pattern: Box<Pattern>, default: Box<Expr> },
}

#[derive(Debug, Clone, PartialEq)]
pub struct ObjectPatternProp {
    pub key: PropertyKey,
    pub value: Pattern,
}

impl Pattern {
    /// Every terminal identifier this pattern binds, in left-to-right order.
    pub fn bound_names(&self, out: &mut Vec<Symbol>) {
        match self {
            Pattern::Ident(sym) => out.push(*sym),
            Pattern::Object { props } => {
                for prop in props {
                    prop.value.bound_names(out);
                }
            }
            Pattern::Array { elements } => {
                for element in elements.iter().flatten() {
                    element.bound_names(out);
                }
            }
            Pattern::Default { pattern, .. } => pattern.bound_names(out),
        }
    }
}
