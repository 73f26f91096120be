//! Simplex parser: converts a token stream into an expression tree.

mod parse_expr;
mod parser;

pub use parser::{ParseResult, Parser};
