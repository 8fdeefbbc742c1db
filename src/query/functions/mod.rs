//! Built-in function registry.
//!
//! Functions are organized into categories:
//! - **stream**: whole-stream and per-collection operations (`reverse`,
//!   `unique`, `select`, `sort_by`, ...)
//! - **convert**: coercions and logic (`str`, `int`, `float`, `bool`,
//!   `type`, `not`)
//! - **dates**: Org date constructors (`ts`, `timestamp`, `clock`,
//!   `repeated_task`)
//! - **misc**: `sha256`, `match`, `uuid`, `debug`

mod convert;
mod dates;
mod misc;
mod stream;

use indexmap::IndexMap;

use crate::query::compiler::{Stage, Stream};
use crate::query::context::EvalContext;
use crate::query::error::QueryError;
use crate::query::evaluator::cartesian;
use crate::value::Value;

/// Uniform builtin signature: the input stream, the compiled argument
/// stages, and the evaluation context.
pub type BuiltinFn = fn(&[Value], &[Stage], &mut EvalContext) -> Result<Stream, QueryError>;

pub struct Builtin {
    pub min_args: usize,
    pub max_args: usize,
    pub run: BuiltinFn,
}

impl Builtin {
    fn new(min_args: usize, max_args: usize, run: BuiltinFn) -> Self {
        Self {
            min_args,
            max_args,
            run,
        }
    }
}

pub struct Registry {
    entries: IndexMap<&'static str, Builtin>,
}

impl Registry {
    /// The standard set of built-ins.
    pub fn standard() -> Self {
        let mut entries = IndexMap::new();
        let mut add = |name, min, max, run| {
            entries.insert(name, Builtin::new(min, max, run));
        };

        add("reverse", 0, 0, stream::builtin_reverse as BuiltinFn);
        add("unique", 0, 0, stream::builtin_unique);
        add("length", 0, 0, stream::builtin_length);
        add("sum", 0, 0, stream::builtin_sum);
        add("max", 0, 0, stream::builtin_max);
        add("min", 0, 0, stream::builtin_min);
        add("select", 1, 1, stream::builtin_select);
        add("sort_by", 1, 1, stream::builtin_sort_by);
        add("join", 1, 1, stream::builtin_join);
        add("map", 1, 1, stream::builtin_map);

        add("type", 0, 0, convert::builtin_type);
        add("not", 1, 1, convert::builtin_not);
        add("str", 1, 1, convert::builtin_str);
        add("int", 1, 1, convert::builtin_int);
        add("float", 1, 1, convert::builtin_float);
        add("bool", 1, 1, convert::builtin_bool);

        add("ts", 1, 1, dates::builtin_ts);
        add("timestamp", 1, 3, dates::builtin_timestamp);
        add("clock", 2, 3, dates::builtin_clock);
        add("repeated_task", 3, 4, dates::builtin_repeated_task);

        add("sha256", 0, 0, misc::builtin_sha256);
        add("match", 1, 1, misc::builtin_match);
        add("uuid", 0, 0, misc::builtin_uuid);
        add("debug", 0, 0, misc::builtin_debug);

        Self { entries }
    }

    pub fn get(&self, name: &str) -> Option<&Builtin> {
        self.entries.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.entries.contains_key(name)
    }

    pub fn names(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.entries.keys().copied()
    }
}

/// Evaluate argument stages against one item and yield every left-to-right
/// combination of their outputs. An argument that emits nothing drops the
/// item entirely.
pub(crate) fn argument_combinations(
    item: &Value,
    args: &[Stage],
    context: &mut EvalContext,
) -> Result<Vec<Vec<Value>>, QueryError> {
    let mut parts = Vec::with_capacity(args.len());
    for stage in args {
        let values = stage.run_on(item, context)?;
        if values.is_empty() {
            return Ok(Vec::new());
        }
        parts.push(values);
    }
    Ok(cartesian(&parts))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_standard_registry_arities() {
        let registry = Registry::standard();
        for name in ["reverse", "unique", "length", "sum", "max", "min", "type", "sha256", "uuid", "debug"] {
            let builtin = registry.get(name).expect("registered");
            assert_eq!((builtin.min_args, builtin.max_args), (0, 0), "{}", name);
        }
        for name in ["select", "sort_by", "join", "map", "not", "str", "int", "float", "bool", "ts", "match"] {
            let builtin = registry.get(name).expect("registered");
            assert_eq!((builtin.min_args, builtin.max_args), (1, 1), "{}", name);
        }
        let timestamp = registry.get("timestamp").expect("registered");
        assert_eq!((timestamp.min_args, timestamp.max_args), (1, 3));
        let clock = registry.get("clock").expect("registered");
        assert_eq!((clock.min_args, clock.max_args), (2, 3));
        let repeated = registry.get("repeated_task").expect("registered");
        assert_eq!((repeated.min_args, repeated.max_args), (3, 4));
    }

    #[test]
    fn test_unknown_name() {
        let registry = Registry::standard();
        assert!(!registry.contains("flatten"));
        assert!(registry.get("flatten").is_none());
    }
}
