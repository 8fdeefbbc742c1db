use std::collections::HashMap;

use crate::value::Value;

/// Variable bindings for one query execution.
///
/// The caller seeds the globals (`$offset`, `$limit`, ...); `as` and
/// `let…in` push one frame per binding and pop it when the body finishes.
/// Lookup shadows outer frames; unknown variables read as `None`.
#[derive(Debug, Clone, Default)]
pub struct EvalContext {
    globals: HashMap<String, Value>,
    frames: Vec<(String, Value)>,
}

impl EvalContext {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_variables(globals: HashMap<String, Value>) -> Self {
        Self {
            globals,
            frames: Vec::new(),
        }
    }

    /// Seed one caller-level variable.
    pub fn define(&mut self, name: impl Into<String>, value: Value) {
        self.globals.insert(name.into(), value);
    }

    pub fn lookup(&self, name: &str) -> Option<Value> {
        for (frame_name, value) in self.frames.iter().rev() {
            if frame_name == name {
                return Some(value.clone());
            }
        }
        self.globals.get(name).cloned()
    }

    pub(crate) fn push(&mut self, name: impl Into<String>, value: Value) {
        self.frames.push((name.into(), value));
    }

    pub(crate) fn pop(&mut self) {
        self.frames.pop();
    }
}
