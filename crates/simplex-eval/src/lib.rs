//! Simplex runtime support.
//!
//! Everything a compiled expression needs while it runs:
//! - [`Value`]: the closed value model host data is converted into
//! - [`ops`]: coercions, guards and the default operator semantics
//! - [`Runtime`]: the replaceable capability interface used by compiled code
//! - [`Env`]: the lexical scope chain plus per-invocation context

pub mod error;
pub mod ops;
pub mod runtime;
pub mod scope;
pub mod value;

pub use error::{EvalError, EvalResult, Fault, UnexpectedTypeError};
pub use runtime::{
    BinaryFn, BinaryOperators, LogicalFn, LogicalOperators, PipeStage, Runtime, StandardRuntime,
    Thunk, UnaryFn, UnaryOperators,
};
pub use scope::{Env, Scope, TOPIC_TOKEN};
pub use value::{format_number, Function, Value};
