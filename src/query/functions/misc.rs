//! Hashing, regex capture, UUIDs, and debug logging.

use sha2::{Digest, Sha256};
use uuid::Uuid;

use crate::query::compiler::{Stage, Stream};
use crate::query::context::EvalContext;
use crate::query::error::QueryError;
use crate::query::evaluator::compile_regex;
use crate::value::Value;

/// Hex SHA-256 digest of each string in the stream.
pub(super) fn builtin_sha256(
    input: &[Value],
    _args: &[Stage],
    _context: &mut EvalContext,
) -> Result<Stream, QueryError> {
    input
        .iter()
        .map(|value| match value {
            Value::Str(text) => {
                let mut hasher = Sha256::new();
                hasher.update(text.as_bytes());
                Ok(Value::str(format!("{:x}", hasher.finalize())))
            }
            other => Err(QueryError::runtime(format!(
                "sha256 requires string input values, got {}",
                other.kind_name()
            ))),
        })
        .collect()
}

/// `match(pat)`: `[full, group1, ...]` on a hit, `none` otherwise.
pub(super) fn builtin_match(
    input: &[Value],
    args: &[Stage],
    context: &mut EvalContext,
) -> Result<Stream, QueryError> {
    let mut output = Vec::new();
    for item in input {
        let Value::Str(text) = item else {
            return Err(QueryError::runtime(format!(
                "match requires string input values, got {}",
                item.kind_name()
            )));
        };
        for pattern in args[0].run_on(item, context)? {
            let Value::Str(pattern) = &pattern else {
                return Err(QueryError::runtime(format!(
                    "match requires string regex values, got {}",
                    pattern.kind_name()
                )));
            };
            let regex = compile_regex(&pattern)?;
            match regex.captures(text) {
                Some(captures) => {
                    let groups: Vec<Value> = captures
                        .iter()
                        .map(|group| match group {
                            Some(found) => Value::str(found.as_str()),
                            None => Value::None,
                        })
                        .collect();
                    output.push(Value::list(groups));
                }
                None => output.push(Value::None),
            }
        }
    }
    Ok(output)
}

/// One fresh UUIDv4 per input item.
pub(super) fn builtin_uuid(
    input: &[Value],
    _args: &[Stage],
    _context: &mut EvalContext,
) -> Result<Stream, QueryError> {
    Ok(input
        .iter()
        .map(|_| Value::str(Uuid::new_v4().to_string()))
        .collect())
}

/// Log each value through the logger and pass the stream on unchanged.
pub(super) fn builtin_debug(
    input: &[Value],
    _args: &[Stage],
    _context: &mut EvalContext,
) -> Result<Stream, QueryError> {
    for value in input {
        tracing::info!(target: "orgq::query", "{}", value);
    }
    Ok(input.to_vec())
}
