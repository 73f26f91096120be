//! Shared types for the Simplex expression compiler.
//!
//! This crate defines the expression tree, source spans, compile-time error
//! types and code-frame rendering used across all pipeline stages.

mod error;
mod span;
pub mod ast;

pub use error::{CompileError, CompileErrors, ErrorCategory, ErrorCode, MAX_ERRORS};
pub use span::{Position, SourceFile, Span};
pub use ast::MAX_EXPRESSION_DEPTH;

/// Result type used by the compile-time stages.
pub type Result<T> = std::result::Result<T, CompileError>;
