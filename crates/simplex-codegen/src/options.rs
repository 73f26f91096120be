//! Compile-time configuration.

use std::fmt;
use std::sync::Arc;

use simplex_eval::{Runtime, StandardRuntime, Value};

/// Options fixed for the lifetime of one compiled expression.
#[derive(Clone)]
pub struct CompileOptions {
    /// Names visible to every evaluation, consulted before the data.
    pub globals: Option<Value>,
    /// Casts, lookups, calls, pipes and operator tables.
    pub runtime: Arc<dyn Runtime>,
}

impl CompileOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_globals(mut self, globals: impl Into<Value>) -> Self {
        self.globals = Some(globals.into());
        self
    }

    pub fn with_runtime(mut self, runtime: impl Runtime + 'static) -> Self {
        self.runtime = Arc::new(runtime);
        self
    }

    pub fn with_shared_runtime(mut self, runtime: Arc<dyn Runtime>) -> Self {
        self.runtime = runtime;
        self
    }

    /// Load globals from a JSON document.
    pub fn with_globals_json(self, json: &str) -> Result<Self, serde_json::Error> {
        let globals: serde_json::Value = serde_json::from_str(json)?;
        Ok(self.with_globals(globals))
    }
}

impl Default for CompileOptions {
    fn default() -> Self {
        Self {
            globals: None,
            runtime: Arc::new(StandardRuntime::new()),
        }
    }
}

impl fmt::Debug for CompileOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CompileOptions")
            .field("globals", &self.globals)
            .finish_non_exhaustive()
    }
}
