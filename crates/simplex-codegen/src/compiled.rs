//! The reusable evaluator produced by compilation.

use std::fmt;
use std::sync::Arc;

use simplex_eval::{Env, Fault, Value};
use tracing::debug;

use crate::compiler::CompiledExpr;
use crate::error::ExpressionError;
use crate::options::CompileOptions;
use crate::source_map::SpanTable;

/// A compiled Simplex expression.
///
/// Immutable after construction. Every [`evaluate`](Self::evaluate) call gets
/// its own scope frames, so one instance can be shared across threads.
pub struct CompiledExpression {
    root: CompiledExpr,
    source: String,
    listing: String,
    span_table: SpanTable,
    options: CompileOptions,
}

impl CompiledExpression {
    pub(crate) fn new(
        root: CompiledExpr,
        source: String,
        listing: String,
        span_table: SpanTable,
        options: CompileOptions,
    ) -> Self {
        Self {
            root,
            source,
            listing,
            span_table,
            options,
        }
    }

    /// Evaluate against `data`. Names resolve through enclosing frames, then
    /// globals, then `data`.
    pub fn evaluate(&self, data: Option<Value>) -> Result<Value, ExpressionError> {
        let env = Env::new(
            Arc::clone(&self.options.runtime),
            self.options.globals.clone(),
            data,
        );
        (self.root)(&env).map_err(|fault| self.explain(fault))
    }

    /// Evaluate against a JSON document.
    pub fn evaluate_json(&self, data: serde_json::Value) -> Result<Value, ExpressionError> {
        self.evaluate(Some(Value::from(data)))
    }

    /// Attribute a fault to its source span.
    ///
    /// Faults escaping from a function value returned by this expression and
    /// invoked later by the host can be passed here as well.
    pub fn explain(&self, fault: Fault) -> ExpressionError {
        let location = fault.site.and_then(|site| self.span_table.locate(site));
        debug!(?location, error = %fault.error, "expression evaluation failed");
        ExpressionError::new(self.source.as_str(), location, fault)
    }

    /// The expression text this was compiled from.
    pub fn source(&self) -> &str {
        &self.source
    }

    /// Textual rendering of the compiled form. The span table describes it
    /// fragment by fragment.
    pub fn listing(&self) -> &str {
        &self.listing
    }

    pub fn span_table(&self) -> &SpanTable {
        &self.span_table
    }

    pub fn options(&self) -> &CompileOptions {
        &self.options
    }
}

impl fmt::Debug for CompiledExpression {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CompiledExpression")
            .field("source", &self.source)
            .field("fragments", &self.span_table.len())
            .finish_non_exhaustive()
    }
}
