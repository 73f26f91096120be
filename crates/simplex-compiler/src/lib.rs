//! Simplex compiler: orchestrates the full compilation pipeline.
//!
//! ```text
//! Simplex Source → Lexer → Parser → Closure Codegen → CompiledExpression
//! ```
//!
//! ```
//! use simplex_compiler::{compile, CompileOptions, Value};
//!
//! let expr = compile("a + b * 2", CompileOptions::new()).unwrap();
//! let data = Value::object([("a", Value::from(1)), ("b", Value::from(3))]);
//! assert_eq!(expr.evaluate(Some(data)).unwrap(), Value::from(7));
//! ```

use serde::Serialize;
use simplex_lexer::Lexer;
use simplex_parser::Parser;
use simplex_types::ast::Expr;
use simplex_types::{CompileErrors, SourceFile};
use tracing::debug;

pub use simplex_codegen::{
    compile_tree, CodegenError, CompileOptions, CompiledExpression, ExpressionError, SpanTable,
};
pub use simplex_eval::{
    EvalError, Fault, Function, Runtime, StandardRuntime, UnexpectedTypeError, Value,
};
pub use simplex_types::{CompileError, ErrorCode, Span};

/// Name used for the source file of a compiled expression.
const EXPRESSION_FILE: &str = "<expression>";

/// Lex and parse `source` into an expression tree.
///
/// Lexing errors stop the pipeline before parsing.
pub fn parse(source: &str) -> Result<Expr, CompileErrors> {
    let source_file = SourceFile::new(EXPRESSION_FILE, source);

    let lex = Lexer::new(&source_file).lex();
    if lex.errors.has_errors() {
        return Err(lex.errors);
    }

    let result = Parser::new(lex.tokens, &source_file).parse();
    if result.errors.has_errors() {
        return Err(result.errors);
    }
    result.expr.ok_or(result.errors)
}

/// Compile `source` into a reusable evaluator.
///
/// Reports the first syntax error, or the first static check failure.
#[tracing::instrument(level = "debug", skip(options), fields(len = source.len()))]
pub fn compile(source: &str, options: CompileOptions) -> Result<CompiledExpression, CodegenError> {
    let expr = parse(source).map_err(|errors| match errors.into_first() {
        Some(error) => CodegenError::Compile(error),
        None => CodegenError::Internal("parser produced no expression".into()),
    })?;
    compile_tree(&expr, source, options)
}

/// Outcome of a compilation, with every collected error.
#[derive(Debug, Clone, Serialize)]
pub struct CompileResult {
    pub success: bool,
    pub errors: Vec<CompileError>,
    /// Listing of the compiled form (on success).
    pub listing: Option<String>,
    /// Fragment spans of the listing (on success).
    pub span_table: Option<SpanTable>,
    /// Set when the tree violated a shape the code generator relies on.
    pub internal_error: Option<String>,
}

impl CompileResult {
    fn failed(errors: Vec<CompileError>) -> Self {
        Self {
            success: false,
            errors,
            listing: None,
            span_table: None,
            internal_error: None,
        }
    }

    /// Serialize to a JSON string.
    pub fn to_json(&self) -> String {
        serde_json::to_string(self).unwrap_or_default()
    }
}

/// Compile `source` and report every error instead of only the first.
pub fn compile_to_result(source: &str, options: CompileOptions) -> CompileResult {
    let expr = match parse(source) {
        Ok(expr) => expr,
        Err(errors) => {
            debug!(count = errors.errors.len(), "syntax errors");
            return CompileResult::failed(errors.errors);
        }
    };

    match compile_tree(&expr, source, options) {
        Ok(compiled) => CompileResult {
            success: true,
            errors: Vec::new(),
            listing: Some(compiled.listing().to_owned()),
            span_table: Some(compiled.span_table().clone()),
            internal_error: None,
        },
        Err(CodegenError::Compile(error)) => CompileResult::failed(vec![error]),
        Err(CodegenError::Internal(message)) => CompileResult {
            internal_error: Some(message),
            ..CompileResult::failed(Vec::new())
        },
    }
}
