//! AST node types for Simplex expressions.
//!
//! Every node carries a [`Span`] for error reporting.
//! Recursive children are boxed to keep enum sizes reasonable.
//! Object properties, array elements and call arguments keep source order,
//! which is also their evaluation order.
//!
//! The tree derives `serde` so that a parser living outside this workspace can
//! hand a tree over as JSON.

use crate::Span;
use serde::{Deserialize, Serialize};

// ══════════════════════════════════════════════════════════════════════════════
// Identifiers
// ══════════════════════════════════════════════════════════════════════════════

/// A spanned identifier.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Ident {
    pub name: String,
    pub span: Span,
}

impl Ident {
    pub fn new(name: impl Into<String>, span: Span) -> Self {
        Self {
            name: name.into(),
            span,
        }
    }
}

// ══════════════════════════════════════════════════════════════════════════════
// Expressions
// ══════════════════════════════════════════════════════════════════════════════

/// An expression node. Uses `Box` for recursive variants.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Expr {
    pub kind: ExprKind,
    pub span: Span,
}

/// Deepest tree the compiler accepts, counted in nodes from the root.
pub const MAX_EXPRESSION_DEPTH: usize = 128;

impl Expr {
    pub fn new(kind: ExprKind, span: Span) -> Self {
        Self { kind, span }
    }

    /// Direct subexpressions, in source order.
    pub fn children(&self) -> Vec<&Expr> {
        match &self.kind {
            ExprKind::Literal(_) | ExprKind::Identifier(_) | ExprKind::TopicReference => Vec::new(),
            ExprKind::Unary { argument, .. } => vec![&**argument],
            ExprKind::Binary { left, right, .. }
            | ExprKind::Logical { left, right, .. }
            | ExprKind::NullishCoalesce { left, right } => vec![&**left, &**right],
            ExprKind::Conditional {
                test,
                consequent,
                alternate,
            } => {
                let mut out: Vec<&Expr> = vec![&**test, &**consequent];
                out.extend(alternate.as_deref());
                out
            }
            ExprKind::Object(properties) => properties.iter().map(|p| &p.value).collect(),
            ExprKind::Array(elements) => elements.iter().flatten().collect(),
            ExprKind::Member {
                object, property, ..
            } => vec![&**object, &**property],
            ExprKind::Call { callee, arguments } => {
                let mut out: Vec<&Expr> = vec![&**callee];
                out.extend(arguments.iter().filter_map(|arg| match arg {
                    Argument::Expr(expr) => Some(expr),
                    Argument::Placeholder(_) => None,
                }));
                out
            }
            ExprKind::PipeSequence { head, tail } => {
                let mut out: Vec<&Expr> = vec![&**head];
                out.extend(tail.iter().map(|stage| &stage.expr));
                out
            }
            ExprKind::Lambda { body, .. } => vec![&**body],
            ExprKind::Let { declarations, body } => {
                let mut out: Vec<&Expr> = declarations.iter().map(|d| &d.init).collect();
                out.push(&**body);
                out
            }
        }
    }

    /// The first node, in depth-first order, that sits more than `limit`
    /// nodes below the root. Walks the tree without recursion.
    pub fn find_deeper_than(&self, limit: usize) -> Option<&Expr> {
        let mut stack = vec![(self, 1)];
        while let Some((expr, depth)) = stack.pop() {
            if depth > limit {
                return Some(expr);
            }
            stack.extend(expr.children().into_iter().rev().map(|child| (child, depth + 1)));
        }
        None
    }
}

impl ExprKind {
    /// Move the direct subexpressions into `out`.
    fn take_children(self, out: &mut Vec<Expr>) {
        match self {
            ExprKind::Literal(_) | ExprKind::Identifier(_) | ExprKind::TopicReference => {}
            ExprKind::Unary { argument, .. } => out.push(*argument),
            ExprKind::Binary { left, right, .. }
            | ExprKind::Logical { left, right, .. }
            | ExprKind::NullishCoalesce { left, right } => out.extend([*left, *right]),
            ExprKind::Conditional {
                test,
                consequent,
                alternate,
            } => {
                out.extend([*test, *consequent]);
                out.extend(alternate.map(|alt| *alt));
            }
            ExprKind::Object(properties) => out.extend(properties.into_iter().map(|p| p.value)),
            ExprKind::Array(elements) => out.extend(elements.into_iter().flatten()),
            ExprKind::Member {
                object, property, ..
            } => out.extend([*object, *property]),
            ExprKind::Call { callee, arguments } => {
                out.push(*callee);
                out.extend(arguments.into_iter().filter_map(|arg| match arg {
                    Argument::Expr(expr) => Some(expr),
                    Argument::Placeholder(_) => None,
                }));
            }
            ExprKind::PipeSequence { head, tail } => {
                out.push(*head);
                out.extend(tail.into_iter().map(|stage| stage.expr));
            }
            ExprKind::Lambda { body, .. } => out.push(*body),
            ExprKind::Let { declarations, body } => {
                out.extend(declarations.into_iter().map(|d| d.init));
                out.push(*body);
            }
        }
    }
}

// Long operator or member chains build trees far deeper than the stack
// allows a recursive drop to walk, so nodes are torn down from a worklist.
impl Drop for Expr {
    fn drop(&mut self) {
        if matches!(
            self.kind,
            ExprKind::Literal(_) | ExprKind::Identifier(_) | ExprKind::TopicReference
        ) {
            return;
        }
        let mut pending = Vec::new();
        std::mem::replace(&mut self.kind, ExprKind::TopicReference).take_children(&mut pending);
        while let Some(mut expr) = pending.pop() {
            std::mem::replace(&mut expr.kind, ExprKind::TopicReference).take_children(&mut pending);
        }
    }
}

/// The kind of expression.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExprKind {
    // ── Atoms ──
    /// `42`, `"text"`, `true`, `null`
    Literal(Literal),
    /// `name`
    Identifier(String),
    /// `%`, the upstream value inside a pipe stage
    TopicReference,

    // ── Operators ──
    /// `-x`, `not x`, `typeof x`
    Unary {
        op: UnaryOp,
        argument: Box<Expr>,
    },
    /// `a + b`, `a == b`, `a in b`, etc.
    Binary {
        op: BinaryOp,
        left: Box<Expr>,
        right: Box<Expr>,
    },
    /// `a and b`, `a or b`
    Logical {
        op: LogicalOp,
        left: Box<Expr>,
        right: Box<Expr>,
    },
    /// `a ?? b`
    NullishCoalesce {
        left: Box<Expr>,
        right: Box<Expr>,
    },
    /// `if test then a [else b]`
    Conditional {
        test: Box<Expr>,
        consequent: Box<Expr>,
        alternate: Option<Box<Expr>>,
    },

    // ── Composites ──
    /// `{ key: value, ... }`
    Object(Vec<Property>),
    /// `[a, , b]`; `None` marks a hole
    Array(Vec<Option<Expr>>),

    // ── Access & Calls ──
    /// `obj.name`, `obj::name`, `obj[expr]`
    Member {
        object: Box<Expr>,
        property: Box<Expr>,
        computed: bool,
        /// Written with `::`. Has no effect on evaluation.
        extension: bool,
    },
    /// `f(a, #, b)`
    Call {
        callee: Box<Expr>,
        arguments: Vec<Argument>,
    },
    /// `head | stage |? stage`
    PipeSequence {
        head: Box<Expr>,
        tail: Vec<PipeStage>,
    },

    // ── Binding forms ──
    /// `(a, b) => body`
    Lambda {
        params: Vec<Ident>,
        body: Box<Expr>,
    },
    /// `let a = 1, b = a + 1, body`
    Let {
        declarations: Vec<Declaration>,
        body: Box<Expr>,
    },
}

/// A literal value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Literal {
    Number(f64),
    String(String),
    Boolean(bool),
    Null,
}

/// An entry in an object literal.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Property {
    pub key: PropertyKey,
    pub value: Expr,
    pub span: Span,
}

/// The key of an object literal entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PropertyKey {
    /// `{ name: ... }`
    Identifier(Ident),
    /// `{ "name": ... }`, `{ 1: ... }`
    Literal(Literal, Span),
}

impl PropertyKey {
    pub fn span(&self) -> Span {
        match self {
            PropertyKey::Identifier(ident) => ident.span,
            PropertyKey::Literal(_, span) => *span,
        }
    }
}

/// A call argument.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Argument {
    Expr(Expr),
    /// `#`, filled in when the curried function is invoked
    Placeholder(Span),
}

/// One `| expr` or `|? expr` stage of a pipe sequence.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PipeStage {
    /// `|?`: stop when the upstream value is null or undefined.
    pub optional: bool,
    pub expr: Expr,
}

/// `name = init` inside a `let` expression.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Declaration {
    pub id: Ident,
    pub init: Expr,
    pub span: Span,
}

// ── Operators ─────────────────────────────────────────────────────────────────

/// Unary operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UnaryOp {
    /// `+x`
    Plus,
    /// `-x`
    Minus,
    /// `not x`
    Not,
    /// `typeof x`
    Typeof,
}

impl UnaryOp {
    /// Returns the operator symbol as written in source.
    pub fn as_str(&self) -> &'static str {
        match self {
            UnaryOp::Plus => "+",
            UnaryOp::Minus => "-",
            UnaryOp::Not => "not",
            UnaryOp::Typeof => "typeof",
        }
    }
}

/// Binary operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BinaryOp {
    // Arithmetic
    Add,
    Sub,
    Mul,
    Div,
    Mod,
    Pow,
    // String
    Concat,
    // Comparison
    Eq,
    NotEq,
    Less,
    LessEq,
    Greater,
    GreaterEq,
    // Membership
    In,
}

impl BinaryOp {
    /// Returns the operator symbol as written in source.
    pub fn as_str(&self) -> &'static str {
        match self {
            BinaryOp::Add => "+",
            BinaryOp::Sub => "-",
            BinaryOp::Mul => "*",
            BinaryOp::Div => "/",
            BinaryOp::Mod => "mod",
            BinaryOp::Pow => "^",
            BinaryOp::Concat => "&",
            BinaryOp::Eq => "==",
            BinaryOp::NotEq => "!=",
            BinaryOp::Less => "<",
            BinaryOp::LessEq => "<=",
            BinaryOp::Greater => ">",
            BinaryOp::GreaterEq => ">=",
            BinaryOp::In => "in",
        }
    }
}

/// Short-circuiting logical operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LogicalOp {
    And,
    Or,
}

impl LogicalOp {
    pub fn as_str(&self) -> &'static str {
        match self {
            LogicalOp::And => "and",
            LogicalOp::Or => "or",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Position;
    use pretty_assertions::assert_eq;

    fn span(start: u32, end: u32) -> Span {
        Span::new(
            Position::new(start, 1, start + 1),
            Position::new(end, 1, end + 1),
        )
    }

    fn ident(name: &str, start: u32) -> Expr {
        Expr::new(
            ExprKind::Identifier(name.into()),
            span(start, start + name.len() as u32),
        )
    }

    #[test]
    fn test_operator_symbols() {
        assert_eq!(BinaryOp::Mod.as_str(), "mod");
        assert_eq!(BinaryOp::Concat.as_str(), "&");
        assert_eq!(BinaryOp::Pow.as_str(), "^");
        assert_eq!(UnaryOp::Typeof.as_str(), "typeof");
        assert_eq!(LogicalOp::Or.as_str(), "or");
    }

    #[test]
    fn test_property_key_span() {
        let id = PropertyKey::Identifier(Ident::new("a", span(1, 2)));
        let lit = PropertyKey::Literal(Literal::String("b".into()), span(7, 10));
        assert_eq!(id.span(), span(1, 2));
        assert_eq!(lit.span(), span(7, 10));
    }

    /// `a.b.b.b...` with `links` member accesses.
    fn member_chain(links: usize) -> Expr {
        let mut expr = ident("a", 0);
        for i in 0..links {
            let end = 1 + 2 * (i as u32 + 1);
            expr = Expr::new(
                ExprKind::Member {
                    object: Box::new(expr),
                    property: Box::new(ident("b", end - 1)),
                    computed: false,
                    extension: false,
                },
                span(0, end),
            );
        }
        expr
    }

    #[test]
    fn test_children_in_source_order() {
        let expr = Expr::new(
            ExprKind::Conditional {
                test: Box::new(ident("a", 3)),
                consequent: Box::new(ident("b", 10)),
                alternate: Some(Box::new(ident("c", 17))),
            },
            span(0, 18),
        );
        let names: Vec<_> = expr
            .children()
            .into_iter()
            .map(|child| match &child.kind {
                ExprKind::Identifier(name) => name.as_str(),
                other => panic!("unexpected child {other:?}"),
            })
            .collect();
        assert_eq!(names, vec!["a", "b", "c"]);
        assert!(ident("x", 0).children().is_empty());
    }

    #[test]
    fn test_find_deeper_than() {
        let chain = member_chain(3);
        // root member, two more members, then `a`: four levels.
        assert!(chain.find_deeper_than(4).is_none());
        let too_deep = chain.find_deeper_than(3).expect("a node below depth 3");
        assert_eq!(too_deep.span, span(0, 1));
    }

    #[test]
    fn test_very_deep_tree_drops() {
        let chain = member_chain(200_000);
        assert!(chain.find_deeper_than(MAX_EXPRESSION_DEPTH).is_some());
        drop(chain);
    }

    #[test]
    fn test_expr_json_round_trip() {
        // a + b
        let expr = Expr::new(
            ExprKind::Binary {
                op: BinaryOp::Add,
                left: Box::new(ident("a", 0)),
                right: Box::new(ident("b", 4)),
            },
            span(0, 5),
        );
        let json = serde_json::to_string(&expr).unwrap();
        let back: Expr = serde_json::from_str(&json).unwrap();
        assert_eq!(back, expr);
    }

    #[test]
    fn test_expr_json_shape() {
        let expr = Expr::new(ExprKind::Literal(Literal::Number(1.5)), span(0, 3));
        let json = serde_json::to_value(&expr).unwrap();
        assert_eq!(json["kind"]["literal"]["number"], 1.5);
        assert_eq!(json["span"]["end"]["offset"], 3);

        let topic = serde_json::to_value(Expr::new(ExprKind::TopicReference, span(0, 1))).unwrap();
        assert_eq!(topic["kind"], "topic_reference");
    }
}
