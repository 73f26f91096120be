//! The runtime capability interface and its standard implementation.
//!
//! Compiled code never calls operators directly. Every cast, lookup, call,
//! pipe and operator goes through a [`Runtime`], so hosts can swap any of
//! them by implementing the trait or by replacing whole operator tables on
//! [`StandardRuntime`].

use std::fmt;
use std::sync::{Arc, LazyLock};

use simplex_types::ast::{BinaryOp, LogicalOp, UnaryOp};

use crate::error::{EvalError, EvalResult, Fault};
use crate::ops;
use crate::scope::TOPIC_TOKEN;
use crate::value::Value;

pub type UnaryFn = Arc<dyn Fn(&Value) -> EvalResult<Value> + Send + Sync>;
pub type BinaryFn = Arc<dyn Fn(&Value, &Value) -> EvalResult<Value> + Send + Sync>;
/// A lazily evaluated operand.
pub type Thunk<'a> = &'a dyn Fn() -> Result<Value, Fault>;
pub type LogicalFn = Arc<dyn Fn(Thunk<'_>, Thunk<'_>) -> Result<Value, Fault> + Send + Sync>;

/// One stage of a pipe sequence.
pub struct PipeStage<'a> {
    pub optional: bool,
    pub next: Box<dyn Fn(Value) -> Result<Value, Fault> + 'a>,
}

impl<'a> PipeStage<'a> {
    pub fn new<F>(optional: bool, next: F) -> Self
    where
        F: Fn(Value) -> Result<Value, Fault> + 'a,
    {
        Self {
            optional,
            next: Box::new(next),
        }
    }
}

// ── Operator tables ───────────────────────────────────────────────────────────

/// Prefix operators. Replaced as a whole.
#[derive(Clone)]
pub struct UnaryOperators {
    pub plus: UnaryFn,
    pub minus: UnaryFn,
    pub not: UnaryFn,
    pub type_of: UnaryFn,
}

impl UnaryOperators {
    pub fn get(&self, op: UnaryOp) -> &UnaryFn {
        match op {
            UnaryOp::Plus => &self.plus,
            UnaryOp::Minus => &self.minus,
            UnaryOp::Not => &self.not,
            UnaryOp::Typeof => &self.type_of,
        }
    }
}

impl Default for UnaryOperators {
    fn default() -> Self {
        Self {
            plus: Arc::new(|v: &Value| ops::ensure_number(v).map(Value::from)),
            minus: Arc::new(ops::negate),
            not: Arc::new(|v: &Value| Ok(Value::Bool(!ops::cast_to_boolean(v)))),
            type_of: Arc::new(|v: &Value| Ok(Value::from(v.type_tag()))),
        }
    }
}

/// Infix operators. Replaced as a whole.
#[derive(Clone)]
pub struct BinaryOperators {
    pub add: BinaryFn,
    pub sub: BinaryFn,
    pub mul: BinaryFn,
    pub div: BinaryFn,
    pub rem: BinaryFn,
    pub pow: BinaryFn,
    pub concat: BinaryFn,
    pub eq: BinaryFn,
    pub not_eq: BinaryFn,
    pub less: BinaryFn,
    pub less_eq: BinaryFn,
    pub greater: BinaryFn,
    pub greater_eq: BinaryFn,
    pub in_: BinaryFn,
}

impl BinaryOperators {
    pub fn get(&self, op: BinaryOp) -> &BinaryFn {
        match op {
            BinaryOp::Add => &self.add,
            BinaryOp::Sub => &self.sub,
            BinaryOp::Mul => &self.mul,
            BinaryOp::Div => &self.div,
            BinaryOp::Mod => &self.rem,
            BinaryOp::Pow => &self.pow,
            BinaryOp::Concat => &self.concat,
            BinaryOp::Eq => &self.eq,
            BinaryOp::NotEq => &self.not_eq,
            BinaryOp::Less => &self.less,
            BinaryOp::LessEq => &self.less_eq,
            BinaryOp::Greater => &self.greater,
            BinaryOp::GreaterEq => &self.greater_eq,
            BinaryOp::In => &self.in_,
        }
    }
}

fn relational(test: fn(std::cmp::Ordering) -> bool) -> BinaryFn {
    Arc::new(move |a: &Value, b: &Value| Ok(Value::Bool(ops::compare(a, b)?.is_some_and(test))))
}

impl Default for BinaryOperators {
    fn default() -> Self {
        Self {
            add: Arc::new(ops::add),
            sub: Arc::new(ops::subtract),
            mul: Arc::new(ops::multiply),
            div: Arc::new(ops::divide),
            rem: Arc::new(ops::remainder),
            pow: Arc::new(ops::power),
            concat: Arc::new(ops::concat),
            eq: Arc::new(|a: &Value, b: &Value| Ok(Value::Bool(ops::strict_equals(a, b)))),
            not_eq: Arc::new(|a: &Value, b: &Value| Ok(Value::Bool(!ops::strict_equals(a, b)))),
            less: relational(|o| o.is_lt()),
            less_eq: relational(|o| o.is_le()),
            greater: relational(|o| o.is_gt()),
            greater_eq: relational(|o| o.is_ge()),
            in_: Arc::new(ops::has_key),
        }
    }
}

/// Short-circuit operators. Operands arrive as thunks.
#[derive(Clone)]
pub struct LogicalOperators {
    pub and: LogicalFn,
    pub or: LogicalFn,
}

impl LogicalOperators {
    pub fn get(&self, op: LogicalOp) -> &LogicalFn {
        match op {
            LogicalOp::And => &self.and,
            LogicalOp::Or => &self.or,
        }
    }
}

impl Default for LogicalOperators {
    fn default() -> Self {
        Self {
            and: Arc::new(|left: Thunk<'_>, right: Thunk<'_>| {
                let result = ops::cast_to_boolean(&left()?) && ops::cast_to_boolean(&right()?);
                Ok(Value::Bool(result))
            }),
            or: Arc::new(|left: Thunk<'_>, right: Thunk<'_>| {
                let result = ops::cast_to_boolean(&left()?) || ops::cast_to_boolean(&right()?);
                Ok(Value::Bool(result))
            }),
        }
    }
}

static DEFAULT_UNARY: LazyLock<UnaryOperators> = LazyLock::new(UnaryOperators::default);
static DEFAULT_BINARY: LazyLock<BinaryOperators> = LazyLock::new(BinaryOperators::default);
static DEFAULT_LOGICAL: LazyLock<LogicalOperators> = LazyLock::new(LogicalOperators::default);

// ── Runtime ───────────────────────────────────────────────────────────────────

/// Capabilities compiled code relies on. Every method has the standard
/// behaviour as its provided body.
pub trait Runtime: Send + Sync {
    fn cast_to_boolean(&self, value: &Value) -> bool {
        ops::cast_to_boolean(value)
    }

    fn get_property(&self, object: &Value, key: &Value) -> EvalResult<Value> {
        ops::get_property(object, key)
    }

    fn call_function(&self, callee: &Value, args: Option<Vec<Value>>) -> Result<Value, Fault> {
        ops::call_function(callee, args)
    }

    /// Resolve a name not bound by any enclosing frame: `undefined`, then
    /// globals, then data.
    fn resolve_identifier(
        &self,
        name: &str,
        globals: Option<&Value>,
        data: Option<&Value>,
    ) -> EvalResult<Value> {
        if name == TOPIC_TOKEN {
            return Err(EvalError::UnboundTopic);
        }
        if name == "undefined" {
            return Ok(Value::Undefined);
        }
        for source in [globals, data].into_iter().flatten() {
            if let Some(value) = source.own_property(name) {
                return Ok(value);
            }
        }
        Err(EvalError::UnknownIdentifier(name.to_owned()))
    }

    fn pipe(&self, head: Value, stages: &[PipeStage<'_>]) -> Result<Value, Fault> {
        ops::pipe(head, stages)
    }

    fn unary_operators(&self) -> &UnaryOperators {
        &DEFAULT_UNARY
    }

    fn binary_operators(&self) -> &BinaryOperators {
        &DEFAULT_BINARY
    }

    fn logical_operators(&self) -> &LogicalOperators {
        &DEFAULT_LOGICAL
    }
}

/// The default runtime, with replaceable operator tables.
#[derive(Clone, Default)]
pub struct StandardRuntime {
    unary: UnaryOperators,
    binary: BinaryOperators,
    logical: LogicalOperators,
}

impl StandardRuntime {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_unary_operators(mut self, table: UnaryOperators) -> Self {
        self.unary = table;
        self
    }

    pub fn with_binary_operators(mut self, table: BinaryOperators) -> Self {
        self.binary = table;
        self
    }

    pub fn with_logical_operators(mut self, table: LogicalOperators) -> Self {
        self.logical = table;
        self
    }
}

impl fmt::Debug for StandardRuntime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StandardRuntime").finish_non_exhaustive()
    }
}

impl Runtime for StandardRuntime {
    fn unary_operators(&self) -> &UnaryOperators {
        &self.unary
    }

    fn binary_operators(&self) -> &BinaryOperators {
        &self.binary
    }

    fn logical_operators(&self) -> &LogicalOperators {
        &self.logical
    }
}
