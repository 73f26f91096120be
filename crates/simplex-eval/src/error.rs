//! Runtime error types for Simplex evaluation.

use thiserror::Error;

use crate::value::Value;

/// An operand, key or callee did not have an acceptable shape.
#[derive(Debug, Clone, PartialEq, Error)]
#[error("Expected {}, but got {} instead", join_expected(.expected), .received.type_of())]
pub struct UnexpectedTypeError {
    /// Accepted kinds, in the order they are listed in the message.
    pub expected: Vec<String>,
    /// The rejected value. The message names it by [`Value::type_of`].
    pub received: Value,
}

impl UnexpectedTypeError {
    pub fn new<I, S>(expected: I, received: impl Into<Value>) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            expected: expected.into_iter().map(Into::into).collect(),
            received: received.into(),
        }
    }
}

/// `["a"]` → `a`, `["a", "b"]` → `a or b`, `["a", "b", "c"]` → `a, b or c`.
fn join_expected(expected: &[String]) -> String {
    match expected {
        [] => String::new(),
        [only] => only.clone(),
        [init @ .., last] => format!("{} or {last}", init.join(", ")),
    }
}

/// Evaluation error raised by operators, lookups and host callables.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum EvalError {
    #[error(transparent)]
    UnexpectedType(#[from] UnexpectedTypeError),

    #[error("Unknown identifier - {0}")]
    UnknownIdentifier(String),

    #[error("Topic reference \"%\" is unbound; it must be inside a pipe body.")]
    UnboundTopic,

    #[error("Cannot use \"in\" operator to search for {key} key in {target}")]
    InvalidInOperands { key: String, target: String },

    #[error("Cannot mix BigInt and other types, use explicit conversions")]
    MixedNumeric,

    /// Arithmetic outside the representable range (big-integer division by zero, ...).
    #[error("{0}")]
    Range(String),

    /// Failure reported by a host-supplied callable or runtime override.
    #[error("{0}")]
    Host(String),
}

impl EvalError {
    pub fn unexpected_type<I, S>(expected: I, received: impl Into<Value>) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::UnexpectedType(UnexpectedTypeError::new(expected, received))
    }

    pub fn host(message: impl Into<String>) -> Self {
        Self::Host(message.into())
    }
}

/// Result alias for operator and lookup helpers.
pub type EvalResult<T> = Result<T, EvalError>;

/// An [`EvalError`] travelling out of compiled code.
///
/// `site` is the position in the compiled form of the innermost fragment the
/// error passed through. It stays `None` until a compiled node claims it.
#[derive(Debug, Clone, PartialEq, Error)]
#[error("{error}")]
pub struct Fault {
    pub error: EvalError,
    pub site: Option<usize>,
}

impl Fault {
    pub fn new(error: EvalError) -> Self {
        Self { error, site: None }
    }

    pub fn at(error: EvalError, site: usize) -> Self {
        Self {
            error,
            site: Some(site),
        }
    }

    /// Claim the fault for `site` unless an inner fragment already did.
    pub fn or_site(mut self, site: usize) -> Self {
        if self.site.is_none() {
            self.site = Some(site);
        }
        self
    }
}

impl From<EvalError> for Fault {
    fn from(error: EvalError) -> Self {
        Self::new(error)
    }
}

impl From<UnexpectedTypeError> for Fault {
    fn from(error: UnexpectedTypeError) -> Self {
        Self::new(error.into())
    }
}
