//! Whole-stream and per-collection built-ins.

use std::cmp::Ordering;

use crate::query::compiler::{Stage, Stream};
use crate::query::context::EvalContext;
use crate::query::error::QueryError;
use crate::query::evaluator::{any_truthy, extract_collection, sort_key, SortKey};
use crate::value::Value;

/// Reverse the stream, or the container itself when the stream holds
/// exactly one list or tuple.
pub(super) fn builtin_reverse(
    input: &[Value],
    _args: &[Stage],
    _context: &mut EvalContext,
) -> Result<Stream, QueryError> {
    if let [single] = input {
        match single {
            Value::List(items) => {
                return Ok(vec![Value::list(items.iter().rev().cloned().collect())])
            }
            Value::Tuple(items) => {
                return Ok(vec![Value::tuple(items.iter().rev().cloned().collect())])
            }
            _ => {}
        }
    }
    Ok(input.iter().rev().cloned().collect())
}

/// Deduplicate the stream by structural equality, keeping first occurrences.
pub(super) fn builtin_unique(
    input: &[Value],
    _args: &[Stage],
    _context: &mut EvalContext,
) -> Result<Stream, QueryError> {
    let mut output: Stream = Vec::new();
    for value in input {
        if !output.contains(value) {
            output.push(value.clone());
        }
    }
    Ok(output)
}

pub(super) fn builtin_length(
    input: &[Value],
    _args: &[Stage],
    _context: &mut EvalContext,
) -> Result<Stream, QueryError> {
    Ok(input
        .iter()
        .map(|value| match value {
            Value::List(items) | Value::Tuple(items) => Value::Int(items.len() as i64),
            Value::Set(items) => Value::Int(items.len() as i64),
            Value::Dict(entries) => Value::Int(entries.borrow().len() as i64),
            Value::Str(text) => Value::Int(text.chars().count() as i64),
            Value::Root(root) => Value::Int(root.children.len() as i64),
            _ => Value::None,
        })
        .collect())
}

pub(super) fn builtin_sum(
    input: &[Value],
    _args: &[Stage],
    _context: &mut EvalContext,
) -> Result<Stream, QueryError> {
    let mut output = Vec::with_capacity(input.len());
    for value in input {
        let items = extract_collection(value)?;
        let mut int_total: i64 = 0;
        let mut float_total = 0.0;
        let mut saw_float = false;
        for item in &items {
            match item {
                Value::Int(value) => {
                    int_total = int_total.checked_add(*value).ok_or_else(|| {
                        QueryError::runtime("integer overflow in sum")
                    })?;
                    float_total += *value as f64;
                }
                Value::Float(value) => {
                    saw_float = true;
                    float_total += value;
                }
                other => {
                    return Err(QueryError::runtime(format!(
                        "sum requires a numeric collection, found {}",
                        other.kind_name()
                    )))
                }
            }
        }
        output.push(if saw_float {
            Value::Float(float_total)
        } else {
            Value::Int(int_total)
        });
    }
    Ok(output)
}

pub(super) fn builtin_max(
    input: &[Value],
    _args: &[Stage],
    _context: &mut EvalContext,
) -> Result<Stream, QueryError> {
    input
        .iter()
        .map(|value| collection_extreme(value, true, "max"))
        .collect()
}

pub(super) fn builtin_min(
    input: &[Value],
    _args: &[Stage],
    _context: &mut EvalContext,
) -> Result<Stream, QueryError> {
    input
        .iter()
        .map(|value| collection_extreme(value, false, "min"))
        .collect()
}

/// Best element of one collection: `None` entries are ignored, an empty or
/// all-`None` collection yields `None`, and the remaining values must share
/// one comparable category.
fn collection_extreme(value: &Value, want_max: bool, name: &str) -> Result<Value, QueryError> {
    let items: Vec<Value> = extract_collection(value)?
        .into_iter()
        .filter(|item| !matches!(item, Value::None))
        .collect();
    if items.is_empty() {
        return Ok(Value::None);
    }

    let mut best: Option<(SortKey, Value)> = None;
    let mut category = None;
    for item in items {
        let key = sort_key(&item)?.expect("none entries were filtered out");
        match category {
            None => category = Some(key.category()),
            Some(seen) if seen != key.category() => {
                return Err(QueryError::runtime(format!(
                    "{} requires collection items of one comparable category",
                    name
                )))
            }
            Some(_) => {}
        }
        match &best {
            None => best = Some((key, item)),
            Some((best_key, _)) => {
                let ordering = key.compare(best_key);
                let better = if want_max {
                    ordering == Ordering::Greater
                } else {
                    ordering == Ordering::Less
                };
                if better {
                    best = Some((key, item));
                }
            }
        }
    }
    Ok(best.expect("at least one comparable item").1)
}

/// Keep items whose condition subquery emits any truthy value.
pub(super) fn builtin_select(
    input: &[Value],
    args: &[Stage],
    context: &mut EvalContext,
) -> Result<Stream, QueryError> {
    let mut output = Vec::new();
    for item in input {
        let conditions = args[0].run_on(item, context)?;
        if any_truthy(&conditions) {
            output.push(item.clone());
        }
    }
    Ok(output)
}

/// Stable descending sort by a per-item key; `None` keys go last in their
/// original order. A stream holding exactly one list or tuple sorts inside
/// the container instead, preserving its kind.
pub(super) fn builtin_sort_by(
    input: &[Value],
    args: &[Stage],
    context: &mut EvalContext,
) -> Result<Stream, QueryError> {
    if let [single] = input {
        match single {
            Value::List(items) => {
                let sorted = sort_values(items, args, context)?;
                return Ok(vec![Value::list(sorted)]);
            }
            Value::Tuple(items) => {
                let sorted = sort_values(items, args, context)?;
                return Ok(vec![Value::tuple(sorted)]);
            }
            _ => {}
        }
    }
    sort_values(input, args, context)
}

fn sort_values(
    input: &[Value],
    args: &[Stage],
    context: &mut EvalContext,
) -> Result<Stream, QueryError> {
    let mut with_key: Vec<(SortKey, Value)> = Vec::new();
    let mut without_key: Vec<Value> = Vec::new();
    let mut category = None;

    for item in input {
        let keys = args[0].run_on(item, context)?;
        let key_value = keys.into_iter().next().unwrap_or(Value::None);
        match sort_key(&key_value)? {
            None => without_key.push(item.clone()),
            Some(key) => {
                match category {
                    None => category = Some(key.category()),
                    Some(seen) if seen != key.category() => {
                        return Err(QueryError::runtime(
                            "sort_by requires keys of one comparable category",
                        ))
                    }
                    Some(_) => {}
                }
                with_key.push((key, item.clone()));
            }
        }
    }

    with_key.sort_by(|(left, _), (right, _)| right.compare(left));
    let mut output: Stream = with_key.into_iter().map(|(_, item)| item).collect();
    output.extend(without_key);
    Ok(output)
}

/// Concatenate a collection's string forms with a separator evaluated per
/// item.
pub(super) fn builtin_join(
    input: &[Value],
    args: &[Stage],
    context: &mut EvalContext,
) -> Result<Stream, QueryError> {
    let mut output = Vec::with_capacity(input.len());
    for item in input {
        let separators = args[0].run_on(item, context)?;
        let separator = separators.into_iter().next().unwrap_or_else(|| Value::str(""));
        let Value::Str(separator) = &separator else {
            return Err(QueryError::runtime(format!(
                "join separator must evaluate to a string, got {}",
                separator.kind_name()
            )));
        };
        let items = extract_collection(item)?;
        let joined = items
            .iter()
            .map(ToString::to_string)
            .collect::<Vec<_>>()
            .join(&separator);
        output.push(Value::str(joined));
    }
    Ok(output)
}

/// Apply a subquery to each element of a collection, emitting one list per
/// input.
pub(super) fn builtin_map(
    input: &[Value],
    args: &[Stage],
    context: &mut EvalContext,
) -> Result<Stream, QueryError> {
    let mut output = Vec::with_capacity(input.len());
    for item in input {
        let mut mapped = Vec::new();
        for element in extract_collection(item)? {
            mapped.extend(args[0].run_on(&element, context)?);
        }
        output.push(Value::list(mapped));
    }
    Ok(output)
}
