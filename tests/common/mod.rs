#![allow(dead_code)]

use indexmap::IndexMap;

use orgq::query::{compile_query, EvalContext};
use orgq::{QueryError, Value};

/// Compile and run a query against an input stream with an empty context.
pub fn run(query: &str, input: Vec<Value>) -> Vec<Value> {
    try_run(query, input).expect("query failed")
}

pub fn try_run(query: &str, input: Vec<Value>) -> Result<Vec<Value>, QueryError> {
    let compiled = compile_query(query)?;
    let mut context = EvalContext::new();
    compiled.execute(&input, &mut context)
}

/// Run with caller-seeded variables.
pub fn run_with(query: &str, input: Vec<Value>, vars: &[(&str, Value)]) -> Vec<Value> {
    let compiled = compile_query(query).expect("compile failed");
    let mut context = EvalContext::new();
    for (name, value) in vars {
        context.define(*name, value.clone());
    }
    compiled.execute(&input, &mut context).expect("query failed")
}

pub fn ints(values: &[i64]) -> Value {
    Value::list(values.iter().copied().map(Value::Int).collect())
}

pub fn strs(values: &[&str]) -> Value {
    Value::list(values.iter().map(Value::str).collect())
}

pub fn dict(entries: &[(&str, Value)]) -> Value {
    let map: IndexMap<String, Value> = entries
        .iter()
        .map(|(key, value)| (key.to_string(), value.clone()))
        .collect();
    Value::dict(map)
}
