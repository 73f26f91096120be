use crate::{SourceFile, Span};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Maximum number of errors collected before the lexer and parser stop recording.
pub const MAX_ERRORS: usize = 20;

/// Error category, determined by error code range.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ErrorCategory {
    Syntax,
    Scope,
}

/// Numeric error code (E100–E599).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ErrorCode(pub u16);

impl ErrorCode {
    // ── Syntax errors (E100–E199) ──
    pub const UNEXPECTED_TOKEN: Self = Self(100);
    pub const UNTERMINATED_STRING: Self = Self(101);
    pub const UNTERMINATED_COMMENT: Self = Self(102);
    pub const INVALID_NUMBER: Self = Self(103);
    pub const INVALID_ESCAPE: Self = Self(104);
    pub const UNEXPECTED_CHARACTER: Self = Self(105);
    pub const NESTING_TOO_DEEP: Self = Self(106);

    // ── Scope errors (E500–E599) ──
    pub const DUPLICATE_LET_BINDING: Self = Self(500);

    /// Get the category for this error code.
    pub fn category(self) -> ErrorCategory {
        match self.0 {
            500..=599 => ErrorCategory::Scope,
            _ => ErrorCategory::Syntax,
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "E{}", self.0)
    }
}

impl fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Syntax => write!(f, "syntax"),
            Self::Scope => write!(f, "scope"),
        }
    }
}

/// A structured compile-time error.
///
/// Raised by the lexer, the parser, and by code generation for static
/// checks such as repeated `let` bindings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, thiserror::Error)]
#[error("{span}: {code} [{category}] {message}")]
pub struct CompileError {
    /// Error code (e.g., E100).
    pub code: ErrorCode,
    /// Error category (derived from code).
    pub category: ErrorCategory,
    /// Human-readable error message.
    pub message: String,
    /// Full text of the expression being compiled.
    pub expression: String,
    /// Source location.
    pub span: Span,
}

impl CompileError {
    /// Create a new error. The expression text is attached later by the
    /// stage that owns it, see [`CompileError::with_expression`].
    pub fn new(code: ErrorCode, message: impl Into<String>, span: Span) -> Self {
        Self {
            code,
            category: code.category(),
            message: message.into(),
            expression: String::new(),
            span,
        }
    }

    /// Attach the expression text.
    pub fn with_expression(mut self, expression: impl Into<String>) -> Self {
        self.expression = expression.into();
        self
    }

    /// Render the offending region of the expression.
    pub fn code_frame(&self) -> String {
        SourceFile::new("<expression>", self.expression.as_str()).code_frame(&self.span)
    }
}

/// Collected errors from a single compile stage.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CompileErrors {
    pub errors: Vec<CompileError>,
    pub total_errors: usize,
}

impl CompileErrors {
    /// Create an empty result (no errors).
    pub fn empty() -> Self {
        Self::default()
    }

    /// Check if there are any errors.
    pub fn has_errors(&self) -> bool {
        self.total_errors > 0
    }

    /// Add an error, respecting the MAX_ERRORS limit.
    pub fn push_error(&mut self, error: CompileError) {
        if self.errors.len() < MAX_ERRORS {
            self.errors.push(error);
        }
        self.total_errors += 1;
    }

    /// The first recorded error, which is the one reported to callers.
    pub fn into_first(self) -> Option<CompileError> {
        self.errors.into_iter().next()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Position;

    fn span_at(offset: u32) -> Span {
        Span::new(
            Position::new(offset, 1, offset + 1),
            Position::new(offset + 1, 1, offset + 2),
        )
    }

    #[test]
    fn test_error_code_category() {
        assert_eq!(
            ErrorCode::UNEXPECTED_TOKEN.category(),
            ErrorCategory::Syntax
        );
        assert_eq!(
            ErrorCode::UNTERMINATED_COMMENT.category(),
            ErrorCategory::Syntax
        );
        assert_eq!(
            ErrorCode::DUPLICATE_LET_BINDING.category(),
            ErrorCategory::Scope
        );
    }

    #[test]
    fn test_error_code_display() {
        assert_eq!(format!("{}", ErrorCode::DUPLICATE_LET_BINDING), "E500");
        assert_eq!(format!("{}", ErrorCode::UNEXPECTED_TOKEN), "E100");
    }

    #[test]
    fn test_compile_error_display() {
        let err = CompileError::new(ErrorCode::UNEXPECTED_TOKEN, "Unexpected token ')'", span_at(4));
        assert_eq!(err.to_string(), "1:5: E100 [syntax] Unexpected token ')'");
    }

    #[test]
    fn test_compile_error_code_frame() {
        let err = CompileError::new(
            ErrorCode::DUPLICATE_LET_BINDING,
            "\"a\" name defined inside let expression was repeated",
            span_at(11),
        )
        .with_expression("let a = 1, a = 2, a");
        assert_eq!(
            err.code_frame(),
            ["> 1 | let a = 1, a = 2, a", "    |            ^"].join("\n")
        );
    }

    #[test]
    fn test_compile_error_json_serialization() {
        let err = CompileError::new(ErrorCode::INVALID_NUMBER, "Invalid number", span_at(0))
            .with_expression("1e");
        let json = serde_json::to_value(&err).unwrap();
        assert_eq!(json["code"], 103);
        assert_eq!(json["category"], "syntax");
        assert_eq!(json["expression"], "1e");

        let back: CompileError = serde_json::from_value(json).unwrap();
        assert_eq!(back, err);
    }

    #[test]
    fn test_compile_errors_max_limit() {
        let mut errs = CompileErrors::empty();
        for i in 0..25 {
            errs.push_error(CompileError::new(
                ErrorCode::UNEXPECTED_TOKEN,
                format!("Error {i}"),
                span_at(i),
            ));
        }
        // Only 20 stored, but total count is 25
        assert_eq!(errs.errors.len(), 20);
        assert_eq!(errs.total_errors, 25);
        assert!(errs.has_errors());
        assert_eq!(errs.into_first().map(|e| e.message), Some("Error 0".into()));
    }

    #[test]
    fn test_compile_errors_empty() {
        let errs = CompileErrors::empty();
        assert!(!errs.has_errors());
        assert!(errs.into_first().is_none());
    }
}
