//! Compilation driver.
//!
//! Owns the listing and span table while [`crate::expr`] compiles nodes,
//! then packages the root closure into a [`CompiledExpression`].

use std::sync::Arc;

use simplex_eval::{Env, Fault, Value};
use simplex_types::ast::Expr;
use simplex_types::{CompileError, ErrorCode, Span, MAX_EXPRESSION_DEPTH};
use tracing::debug;

use crate::compiled::CompiledExpression;
use crate::error::{CodegenError, CodegenResult};
use crate::options::CompileOptions;
use crate::source_map::SpanTable;

/// A compiled node.
pub(crate) type CompiledExpr = Arc<dyn Fn(&Env) -> Result<Value, Fault> + Send + Sync>;

// ══════════════════════════════════════════════════════════════════════════════
// Public API
// ══════════════════════════════════════════════════════════════════════════════

/// Compile an expression tree.
///
/// `source` is the text the tree was parsed from; it is attached to errors.
/// Fails only on static checks (repeated `let` names, trees nested past
/// [`MAX_EXPRESSION_DEPTH`]) or on a malformed tree.
#[tracing::instrument(level = "debug", skip_all)]
pub fn compile_tree(
    expr: &Expr,
    source: &str,
    options: CompileOptions,
) -> CodegenResult<CompiledExpression> {
    if let Some(node) = expr.find_deeper_than(MAX_EXPRESSION_DEPTH) {
        return Err(CompileError::new(
            ErrorCode::NESTING_TOO_DEEP,
            format!("expression is nested more than {MAX_EXPRESSION_DEPTH} levels deep"),
            node.span,
        )
        .with_expression(source)
        .into());
    }
    let mut compiler = Compiler::new(source);
    let root = compiler.compile_expr(expr)?;
    debug!(
        fragments = compiler.table.len(),
        listing_len = compiler.cursor,
        "compiled expression"
    );
    Ok(CompiledExpression::new(
        root,
        source.to_owned(),
        compiler.listing,
        compiler.table,
        options,
    ))
}

/// Compile an expression tree handed over as JSON.
pub fn compile_tree_json(
    tree: &str,
    source: &str,
    options: CompileOptions,
) -> CodegenResult<CompiledExpression> {
    let expr: Expr = serde_json::from_str(tree)
        .map_err(|e| CodegenError::Internal(format!("malformed expression tree: {e}")))?;
    compile_tree(&expr, source, options)
}

// ══════════════════════════════════════════════════════════════════════════════
// Compiler
// ══════════════════════════════════════════════════════════════════════════════

/// Compilation state for one expression.
pub(crate) struct Compiler<'a> {
    /// Source text, attached to static errors.
    pub(crate) source: &'a str,
    /// Textual rendering of the compiled form.
    listing: String,
    /// Listing length in characters.
    cursor: usize,
    table: SpanTable,
}

impl<'a> Compiler<'a> {
    fn new(source: &'a str) -> Self {
        Self {
            source,
            listing: String::new(),
            cursor: 0,
            table: SpanTable::new(),
        }
    }

    /// Append one listing fragment owned by the node at `span`.
    ///
    /// Returns the fragment's site: the 1-based listing position of its first
    /// character.
    pub(crate) fn emit(&mut self, text: &str, span: Span) -> usize {
        let len = text.chars().count();
        let site = self.cursor + 1;
        self.cursor += len;
        self.listing.push_str(text);
        self.table.push(len, span);
        site
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use simplex_types::Position;

    #[test]
    fn sites_are_one_based_fragment_starts() {
        let span = Span::point(Position::new(0, 1, 1));
        let mut compiler = Compiler::new("x");
        assert_eq!(compiler.emit("call(", span), 1);
        assert_eq!(compiler.emit("get(scope,\"f\")", span), 6);
        assert_eq!(compiler.emit(",null)", span), 20);
        assert_eq!(compiler.listing, "call(get(scope,\"f\"),null)");
        assert_eq!(compiler.table.listing_len(), compiler.cursor);
    }
}
