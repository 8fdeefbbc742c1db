//! Coercion and logic built-ins.

use crate::query::compiler::{Stage, Stream};
use crate::query::context::EvalContext;
use crate::query::error::QueryError;
use crate::query::evaluator::any_truthy;
use crate::value::Value;

pub(super) fn builtin_type(
    input: &[Value],
    _args: &[Stage],
    _context: &mut EvalContext,
) -> Result<Stream, QueryError> {
    Ok(input
        .iter()
        .map(|value| Value::str(value.kind_name()))
        .collect())
}

/// Negate the any-truthy test of the condition subquery, per item.
pub(super) fn builtin_not(
    input: &[Value],
    args: &[Stage],
    context: &mut EvalContext,
) -> Result<Stream, QueryError> {
    let mut output = Vec::with_capacity(input.len());
    for item in input {
        let conditions = args[0].run_on(item, context)?;
        output.push(Value::Bool(!any_truthy(&conditions)));
    }
    Ok(output)
}

pub(super) fn builtin_str(
    input: &[Value],
    args: &[Stage],
    context: &mut EvalContext,
) -> Result<Stream, QueryError> {
    let mut output = Vec::new();
    for item in input {
        for value in args[0].run_on(item, context)? {
            output.push(Value::str(value.to_string()));
        }
    }
    Ok(output)
}

pub(super) fn builtin_int(
    input: &[Value],
    args: &[Stage],
    context: &mut EvalContext,
) -> Result<Stream, QueryError> {
    let mut output = Vec::new();
    for item in input {
        for value in args[0].run_on(item, context)? {
            output.push(convert_to_int(&value)?);
        }
    }
    Ok(output)
}

pub(super) fn builtin_float(
    input: &[Value],
    args: &[Stage],
    context: &mut EvalContext,
) -> Result<Stream, QueryError> {
    let mut output = Vec::new();
    for item in input {
        for value in args[0].run_on(item, context)? {
            output.push(convert_to_float(&value)?);
        }
    }
    Ok(output)
}

pub(super) fn builtin_bool(
    input: &[Value],
    args: &[Stage],
    context: &mut EvalContext,
) -> Result<Stream, QueryError> {
    let mut output = Vec::new();
    for item in input {
        for value in args[0].run_on(item, context)? {
            output.push(convert_to_bool(&value)?);
        }
    }
    Ok(output)
}

fn convert_to_int(value: &Value) -> Result<Value, QueryError> {
    match value {
        Value::Int(value) => Ok(Value::Int(*value)),
        Value::Str(text) => text
            .trim()
            .parse::<i64>()
            .map(Value::Int)
            .map_err(|_| QueryError::runtime(format!("cannot parse int: {}", text))),
        _ => Err(QueryError::runtime(
            "int accepts integer and string values",
        )),
    }
}

fn convert_to_float(value: &Value) -> Result<Value, QueryError> {
    match value {
        Value::Float(value) => Ok(Value::Float(*value)),
        Value::Str(text) => text
            .trim()
            .parse::<f64>()
            .map(Value::Float)
            .map_err(|_| QueryError::runtime(format!("cannot parse float: {}", text))),
        _ => Err(QueryError::runtime(
            "float accepts float and string values",
        )),
    }
}

fn convert_to_bool(value: &Value) -> Result<Value, QueryError> {
    match value {
        Value::Bool(value) => Ok(Value::Bool(*value)),
        Value::Str(text) => {
            if text.eq_ignore_ascii_case("true") {
                Ok(Value::Bool(true))
            } else if text.eq_ignore_ascii_case("false") {
                Ok(Value::Bool(false))
            } else {
                Err(QueryError::runtime(format!("cannot parse bool: {}", text)))
            }
        }
        _ => Err(QueryError::runtime(
            "bool accepts boolean and string values",
        )),
    }
}
