//! Codegen and evaluation error types.

use simplex_eval::Fault;
use simplex_types::{CompileError, SourceFile, Span};
use thiserror::Error;

/// Errors that can occur while compiling an expression tree.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum CodegenError {
    /// A static check rejected the tree.
    #[error(transparent)]
    Compile(#[from] CompileError),

    /// The tree violates a shape the compiler relies on. Never produced for
    /// trees built by the bundled parser.
    #[error("internal codegen error: {0}")]
    Internal(String),
}

/// Codegen result type alias.
pub type CodegenResult<T> = Result<T, CodegenError>;

/// A failure raised while evaluating a compiled expression.
#[derive(Debug, Clone, PartialEq, Error)]
#[error("{message}")]
pub struct ExpressionError {
    pub message: String,
    /// Full text of the compiled expression.
    pub expression: String,
    /// Source span the failure is attributed to, when it could be resolved.
    pub location: Option<Span>,
    #[source]
    pub cause: Fault,
}

impl ExpressionError {
    pub fn new(expression: impl Into<String>, location: Option<Span>, cause: Fault) -> Self {
        Self {
            message: cause.error.to_string(),
            expression: expression.into(),
            location,
            cause,
        }
    }

    /// Render the offending region of the expression, if it is known.
    pub fn code_frame(&self) -> Option<String> {
        let span = self.location?;
        Some(SourceFile::new("<expression>", self.expression.as_str()).code_frame(&span))
    }
}
