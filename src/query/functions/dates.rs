//! Org date constructors.

use crate::org::date::{OrgDate, OrgDateClock, OrgDateRepeatedTask};
use crate::query::compiler::{Stage, Stream};
use crate::query::context::EvalContext;
use crate::query::error::QueryError;
use crate::query::functions::argument_combinations;
use crate::value::Value;

/// `ts(x)`: parse a timestamp string, or pass date values through.
pub(super) fn builtin_ts(
    input: &[Value],
    args: &[Stage],
    context: &mut EvalContext,
) -> Result<Stream, QueryError> {
    let mut output = Vec::new();
    for item in input {
        for value in args[0].run_on(item, context)? {
            output.push(Value::Date(parse_date_value(&value)?));
        }
    }
    Ok(output)
}

/// `timestamp(start[, end[, active]])`
pub(super) fn builtin_timestamp(
    input: &[Value],
    args: &[Stage],
    context: &mut EvalContext,
) -> Result<Stream, QueryError> {
    let mut output = Vec::new();
    for item in input {
        for arguments in argument_combinations(item, args, context)? {
            let start = parse_date_value(&arguments[0])?;
            let end = match arguments.get(1) {
                Some(value) => optional_date(value)?.map(|date| date.start),
                None => start.end,
            };
            let active = match arguments.get(2) {
                Some(value) => optional_active(value)?.unwrap_or(start.active),
                None => start.active,
            };
            output.push(Value::Date(OrgDate {
                start: start.start,
                end,
                active,
                has_time: start.has_time,
            }));
        }
    }
    Ok(output)
}

/// `clock(start, end[, active])`
pub(super) fn builtin_clock(
    input: &[Value],
    args: &[Stage],
    context: &mut EvalContext,
) -> Result<Stream, QueryError> {
    let mut output = Vec::new();
    for item in input {
        for arguments in argument_combinations(item, args, context)? {
            let start = parse_date_value(&arguments[0])?;
            let end = optional_date(&arguments[1])?
                .ok_or_else(|| QueryError::runtime("clock end value cannot be none"))?;
            let active = match arguments.get(2) {
                Some(value) => optional_active(value)?.unwrap_or(false),
                None => false,
            };
            output.push(Value::Clock(OrgDateClock::new(
                start.start,
                end.start,
                active,
            )));
        }
    }
    Ok(output)
}

/// `repeated_task(timestamp, before, after[, active])`
pub(super) fn builtin_repeated_task(
    input: &[Value],
    args: &[Stage],
    context: &mut EvalContext,
) -> Result<Stream, QueryError> {
    let mut output = Vec::new();
    for item in input {
        for arguments in argument_combinations(item, args, context)? {
            let start = parse_date_value(&arguments[0])?;
            let before = optional_state(&arguments[1], "before")?;
            let after = optional_state(&arguments[2], "after")?;
            let active = match arguments.get(3) {
                Some(value) => optional_active(value)?.unwrap_or(start.active),
                None => start.active,
            };
            output.push(Value::Repeated(OrgDateRepeatedTask::new(
                start.start,
                before,
                after,
                active,
            )));
        }
    }
    Ok(output)
}

pub(super) fn parse_date_value(value: &Value) -> Result<OrgDate, QueryError> {
    match value {
        Value::Date(date) => Ok(*date),
        Value::Clock(clock) => Ok(OrgDate::new(clock.start, Some(clock.end), clock.active)),
        Value::Repeated(task) => Ok(OrgDate::new(task.timestamp, None, task.active)),
        Value::Str(text) => OrgDate::parse(text)
            .or_else(|| OrgDate::scan(text))
            .ok_or_else(|| QueryError::runtime(format!("cannot parse timestamp: {}", text))),
        other => Err(QueryError::runtime(format!(
            "timestamp values must evaluate to string, org date, or none, got {}",
            other.kind_name()
        ))),
    }
}

fn optional_date(value: &Value) -> Result<Option<OrgDate>, QueryError> {
    match value {
        Value::None => Ok(None),
        other => Ok(Some(parse_date_value(other)?)),
    }
}

fn optional_active(value: &Value) -> Result<Option<bool>, QueryError> {
    match value {
        Value::None => Ok(None),
        Value::Bool(active) => Ok(Some(*active)),
        other => Err(QueryError::runtime(format!(
            "active value must evaluate to boolean or none, got {}",
            other.kind_name()
        ))),
    }
}

fn optional_state(value: &Value, field: &str) -> Result<Option<String>, QueryError> {
    match value {
        Value::None => Ok(None),
        Value::Str(text) => Ok(Some(text.to_string())),
        other => Err(QueryError::runtime(format!(
            "{} value must evaluate to string or none, got {}",
            field,
            other.kind_name()
        ))),
    }
}
