//! Simplex code generator: compiles an expression tree into a reusable
//! evaluator.
//!
//! # Architecture
//!
//! Each node compiles once into a closure that captures its already compiled
//! children. Invoking the root closure evaluates the expression; nothing walks
//! the tree again.
//!
//! Alongside the closures the compiler emits a textual *listing* of the
//! compiled form, one fragment at a time, and records each fragment's length
//! and owning node span in a [`SpanTable`]. Every closure knows the listing
//! position of its own first fragment (its *site*). A failing closure tags the
//! error with that site unless an inner closure already did, and
//! [`CompiledExpression`] maps the site back to a source span through the
//! table.

pub mod compiled;
pub mod compiler;
pub mod error;
mod expr;
pub mod options;
pub mod source_map;

pub use compiled::CompiledExpression;
pub use compiler::{compile_tree, compile_tree_json};
pub use error::{CodegenError, CodegenResult, ExpressionError};
pub use options::CompileOptions;
pub use source_map::{SpanEntry, SpanTable};
