//! Lexical scope chain and per-invocation evaluation context.

use std::sync::Arc;

use crate::error::{EvalError, EvalResult};
use crate::runtime::Runtime;
use crate::value::Value;

/// Name bound to the upstream value inside a pipe stage.
pub const TOPIC_TOKEN: &str = "%";

/// One lexical frame: parallel name and value lists plus the enclosing frame.
///
/// A name without a value (a lambda called with fewer arguments than it
/// declares) reads as `undefined`.
#[derive(Debug)]
struct Frame {
    names: Arc<[String]>,
    values: Vec<Value>,
    parent: Scope,
}

/// A possibly empty chain of frames, innermost first.
#[derive(Debug, Clone, Default)]
pub struct Scope(Option<Arc<Frame>>);

impl Scope {
    pub fn root() -> Self {
        Self(None)
    }

    /// A new innermost frame on top of this chain.
    pub fn push(&self, names: Arc<[String]>, values: Vec<Value>) -> Self {
        Self(Some(Arc::new(Frame {
            names,
            values,
            parent: self.clone(),
        })))
    }

    /// Walk from the innermost frame outward.
    pub fn lookup(&self, name: &str) -> Option<Value> {
        let mut current = self.0.as_deref();
        while let Some(frame) = current {
            if let Some(index) = frame.names.iter().position(|n| n == name) {
                return Some(frame.values.get(index).cloned().unwrap_or_default());
            }
            current = frame.parent.0.as_deref();
        }
        None
    }

    pub fn depth(&self) -> usize {
        let mut depth = 0;
        let mut current = self.0.as_deref();
        while let Some(frame) = current {
            depth += 1;
            current = frame.parent.0.as_deref();
        }
        depth
    }
}

/// State shared by every frame of one evaluator invocation.
struct Context {
    runtime: Arc<dyn Runtime>,
    globals: Option<Value>,
    data: Option<Value>,
}

/// Evaluation environment: invocation context plus the current scope.
///
/// Cloning is cheap; closures created during evaluation keep their own copy.
#[derive(Clone)]
pub struct Env {
    context: Arc<Context>,
    scope: Scope,
}

impl Env {
    pub fn new(runtime: Arc<dyn Runtime>, globals: Option<Value>, data: Option<Value>) -> Self {
        Self {
            context: Arc::new(Context {
                runtime,
                globals,
                data,
            }),
            scope: Scope::root(),
        }
    }

    pub fn runtime(&self) -> &dyn Runtime {
        self.context.runtime.as_ref()
    }

    pub fn scope(&self) -> &Scope {
        &self.scope
    }

    /// The same context with a new innermost frame.
    pub fn with_frame(&self, names: Arc<[String]>, values: Vec<Value>) -> Self {
        Self {
            context: Arc::clone(&self.context),
            scope: self.scope.push(names, values),
        }
    }

    /// Frames first, then the runtime's identifier resolution.
    pub fn lookup(&self, name: &str) -> EvalResult<Value> {
        if let Some(value) = self.scope.lookup(name) {
            return Ok(value);
        }
        tracing::trace!(name, "resolving identifier outside lexical scope");
        self.runtime().resolve_identifier(
            name,
            self.context.globals.as_ref(),
            self.context.data.as_ref(),
        )
    }

    /// Value bound by the nearest enclosing pipe stage.
    pub fn topic(&self) -> EvalResult<Value> {
        self.scope.lookup(TOPIC_TOKEN).ok_or(EvalError::UnboundTopic)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::runtime::StandardRuntime;

    fn names(list: &[&str]) -> Arc<[String]> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn innermost_frame_wins() {
        let outer = Scope::root().push(names(&["a", "b"]), vec![Value::from(1), Value::from(2)]);
        let inner = outer.push(names(&["a"]), vec![Value::from(10)]);
        assert_eq!(inner.lookup("a"), Some(Value::from(10)));
        assert_eq!(inner.lookup("b"), Some(Value::from(2)));
        assert_eq!(outer.lookup("a"), Some(Value::from(1)));
        assert_eq!(inner.lookup("c"), None);
        assert_eq!(inner.depth(), 2);
    }

    #[test]
    fn missing_argument_reads_undefined() {
        let scope = Scope::root().push(names(&["a", "b"]), vec![Value::from(1)]);
        assert_eq!(scope.lookup("b"), Some(Value::Undefined));
    }

    #[test]
    fn env_falls_back_to_globals_then_data() {
        let env = Env::new(
            Arc::new(StandardRuntime::new()),
            Some(Value::object([("g", Value::from(1))])),
            Some(Value::object([("d", Value::from(2)), ("g", Value::from(3))])),
        );
        assert_eq!(env.lookup("g").unwrap(), Value::from(1));
        assert_eq!(env.lookup("d").unwrap(), Value::from(2));
        let shadowed = env.with_frame(names(&["g"]), vec![Value::from(9)]);
        assert_eq!(shadowed.lookup("g").unwrap(), Value::from(9));
        assert_eq!(env.lookup("x").unwrap_err(), EvalError::UnknownIdentifier("x".into()));
    }

    #[test]
    fn topic_requires_pipe_frame() {
        let env = Env::new(Arc::new(StandardRuntime::new()), None, None);
        assert_eq!(env.topic().unwrap_err(), EvalError::UnboundTopic);
        let stage = env.with_frame(names(&[TOPIC_TOKEN]), vec![Value::from(5)]);
        assert_eq!(stage.topic().unwrap(), Value::from(5));
    }
}
