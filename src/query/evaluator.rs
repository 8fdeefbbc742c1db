//! Operator and access semantics shared by compiled stages.
//!
//! Missing fields and out-of-range indices are forgiving and yield `None`;
//! genuine type mismatches are runtime errors naming the offending kind.

use std::cmp::Ordering;
use std::rc::Rc;

use chrono::NaiveDateTime;
use indexmap::{IndexMap, IndexSet};
use regex::Regex;

use crate::ast::BinaryOp;
use crate::org::date::OrgDate;
use crate::org::{OrgNode, OrgRootNode};
use crate::query::error::QueryError;
use crate::value::{Hashable, Value};

/// Pair two streams: equal lengths zip, a singleton broadcasts against the
/// other side.
pub fn broadcast<T: Clone>(left: &[Value], right: &[T]) -> Result<Vec<(Value, T)>, QueryError> {
    if left.len() == right.len() {
        return Ok(left.iter().cloned().zip(right.iter().cloned()).collect());
    }
    if left.len() == 1 {
        return Ok(right
            .iter()
            .map(|item| (left[0].clone(), item.clone()))
            .collect());
    }
    if right.len() == 1 {
        return Ok(left
            .iter()
            .map(|item| (item.clone(), right[0].clone()))
            .collect());
    }
    Err(QueryError::runtime(format!(
        "cannot combine streams of lengths {} and {}",
        left.len(),
        right.len()
    )))
}

pub fn any_truthy(values: &[Value]) -> bool {
    values.iter().any(Value::is_truthy)
}

/// Left-to-right cartesian product of per-child output streams.
pub fn cartesian(parts: &[Vec<Value>]) -> Vec<Vec<Value>> {
    let mut combos: Vec<Vec<Value>> = vec![Vec::new()];
    for part in parts {
        let mut extended = Vec::with_capacity(combos.len() * part.len());
        for combo in &combos {
            for value in part {
                let mut next = combo.clone();
                next.push(value.clone());
                extended.push(next);
            }
        }
        combos = extended;
    }
    combos
}

/// Attribute lookup. Unknown names and non-attribute kinds read as `None`.
pub fn resolve_field(value: &Value, field: &str) -> Value {
    match value {
        Value::Dict(entries) => entries.borrow().get(field).cloned().unwrap_or(Value::None),
        Value::Node(node) => node_field(node, field),
        Value::Root(root) => root_field(root, field),
        Value::Date(date) => date_field(date, field),
        Value::Clock(clock) => match field {
            "start" => Value::Date(OrgDate::new(clock.start, None, clock.active)),
            "end" => Value::Date(OrgDate::new(clock.end, None, clock.active)),
            "active" => Value::Bool(clock.active),
            "duration" => Value::Int(clock.duration_minutes()),
            _ => Value::None,
        },
        Value::Repeated(task) => match field {
            "timestamp" => Value::Date(OrgDate::new(task.timestamp, None, task.active)),
            "before" => opt_str(task.before.as_deref()),
            "after" => opt_str(task.after.as_deref()),
            "active" => Value::Bool(task.active),
            _ => Value::None,
        },
        _ => Value::None,
    }
}

fn opt_str(value: Option<&str>) -> Value {
    match value {
        Some(text) => Value::str(text),
        None => Value::None,
    }
}

fn node_field(node: &Rc<OrgNode>, field: &str) -> Value {
    match field {
        "filename" => Value::str(node.filename.as_ref()),
        "heading" => Value::str(&node.heading),
        "todo" => opt_str(node.todo.as_deref()),
        "tags" => Value::set_from_strs(node.tags.iter()),
        "level" => Value::Int(node.level as i64),
        "body" => Value::str(&node.body),
        "children" => Value::list(node.children.iter().cloned().map(Value::Node).collect()),
        "properties" => {
            let entries: IndexMap<String, Value> = node
                .properties
                .iter()
                .map(|(key, value)| (key.clone(), Value::str(value)))
                .collect();
            Value::dict(entries)
        }
        "scheduled" => node.scheduled.map(Value::Date).unwrap_or(Value::None),
        "deadline" => node.deadline.map(Value::Date).unwrap_or(Value::None),
        "closed" => node.closed.map(Value::Date).unwrap_or(Value::None),
        "repeated_tasks" => Value::list(
            node.repeated_tasks
                .iter()
                .cloned()
                .map(Value::Repeated)
                .collect(),
        ),
        "clocks" => Value::list(node.clocks.iter().copied().map(Value::Clock).collect()),
        _ => Value::None,
    }
}

fn root_field(root: &Rc<OrgRootNode>, field: &str) -> Value {
    match field {
        "filename" => Value::str(&root.filename),
        "children" => Value::list(root.children.iter().cloned().map(Value::Node).collect()),
        _ => Value::None,
    }
}

fn date_field(date: &OrgDate, field: &str) -> Value {
    match field {
        "start" => Value::Date(OrgDate {
            start: date.start,
            end: None,
            active: date.active,
            has_time: date.has_time,
        }),
        "end" => match date.end {
            Some(end) => Value::Date(OrgDate {
                start: end,
                end: None,
                active: date.active,
                has_time: date.has_time,
            }),
            None => Value::None,
        },
        "active" => Value::Bool(date.active),
        _ => Value::None,
    }
}

/// Bracket access dispatching on the key kind: strings act as field access,
/// integers index positional containers.
pub fn bracket_get(base: &Value, key: &Value) -> Result<Value, QueryError> {
    if matches!(base, Value::None) {
        return Ok(Value::None);
    }
    match key {
        Value::Str(name) => Ok(resolve_field(base, name)),
        Value::Int(index) => index_get(base, *index),
        other => Err(QueryError::runtime(format!(
            "bracket key must be a string or integer, got {}",
            other.kind_name()
        ))),
    }
}

fn index_get(base: &Value, index: i64) -> Result<Value, QueryError> {
    match base {
        Value::List(items) | Value::Tuple(items) => Ok(element_at(items, index)),
        Value::Str(text) => {
            if index < 0 {
                return Ok(Value::None);
            }
            Ok(text
                .chars()
                .nth(index as usize)
                .map(|ch| Value::str(ch.to_string()))
                .unwrap_or(Value::None))
        }
        Value::Root(root) => {
            if index < 0 {
                return Ok(Value::None);
            }
            Ok(root
                .children
                .get(index as usize)
                .cloned()
                .map(Value::Node)
                .unwrap_or(Value::None))
        }
        other => Err(QueryError::runtime(format!(
            "index access requires a list, tuple, string, or org root, got {}",
            other.kind_name()
        ))),
    }
}

fn element_at(items: &[Value], index: i64) -> Value {
    if index < 0 {
        return Value::None;
    }
    items.get(index as usize).cloned().unwrap_or(Value::None)
}

/// Slice with bounds clamped to `[0, len]`; an inverted range yields an
/// empty container of the same kind.
pub fn slice_value(base: &Value, start: &Value, end: &Value) -> Result<Value, QueryError> {
    let start = slice_bound(start)?;
    let end = slice_bound(end)?;
    match base {
        Value::List(items) => Ok(Value::list(slice_items(items, start, end))),
        Value::Tuple(items) => Ok(Value::tuple(slice_items(items, start, end))),
        Value::Str(text) => {
            let chars: Vec<char> = text.chars().collect();
            let (from, to) = clamp_range(chars.len(), start, end);
            Ok(Value::str(chars[from..to].iter().collect::<String>()))
        }
        Value::Root(root) => {
            let (from, to) = clamp_range(root.children.len(), start, end);
            Ok(Value::list(
                root.children[from..to]
                    .iter()
                    .cloned()
                    .map(Value::Node)
                    .collect(),
            ))
        }
        other => Err(QueryError::runtime(format!(
            "slice access requires a list, tuple, string, or org root, got {}",
            other.kind_name()
        ))),
    }
}

fn slice_bound(value: &Value) -> Result<Option<i64>, QueryError> {
    match value {
        Value::None => Ok(None),
        Value::Int(bound) => Ok(Some(*bound)),
        other => Err(QueryError::runtime(format!(
            "slice bound must be an integer or none, got {}",
            other.kind_name()
        ))),
    }
}

fn slice_items(items: &[Value], start: Option<i64>, end: Option<i64>) -> Vec<Value> {
    let (from, to) = clamp_range(items.len(), start, end);
    items[from..to].to_vec()
}

fn clamp_range(len: usize, start: Option<i64>, end: Option<i64>) -> (usize, usize) {
    let clamp = |bound: i64| bound.clamp(0, len as i64) as usize;
    let from = clamp(start.unwrap_or(0));
    let to = clamp(end.unwrap_or(len as i64));
    (from, to.max(from))
}

/// `expr[]`: one stream element per contained value.
pub fn iterate(value: &Value) -> Result<Vec<Value>, QueryError> {
    match value {
        Value::List(items) | Value::Tuple(items) => Ok(items.as_ref().clone()),
        Value::Set(items) => Ok(items.iter().map(Hashable::to_value).collect()),
        Value::Dict(entries) => Ok(entries.borrow().values().cloned().collect()),
        Value::Root(root) => Ok(root.children.iter().cloned().map(Value::Node).collect()),
        Value::Node(node) => Ok(node.children.iter().cloned().map(Value::Node).collect()),
        other => Err(QueryError::runtime(format!(
            "cannot iterate over {}",
            other.kind_name()
        ))),
    }
}

pub fn apply_binary(op: BinaryOp, left: &Value, right: &Value) -> Result<Value, QueryError> {
    match op {
        BinaryOp::Eq => Ok(Value::Bool(left == right)),
        BinaryOp::NotEq => Ok(Value::Bool(left != right)),
        BinaryOp::Greater | BinaryOp::Less | BinaryOp::GreaterEq | BinaryOp::LessEq => {
            compare(op, left, right)
        }
        BinaryOp::And => Ok(Value::Bool(left.is_truthy() && right.is_truthy())),
        // `or` is value-preserving: a truthy left passes through unchanged.
        BinaryOp::Or => Ok(if left.is_truthy() {
            left.clone()
        } else {
            right.clone()
        }),
        BinaryOp::In => value_in(left, right),
        BinaryOp::Matches => {
            let (text, pattern) = both_strings(left, right, "matches")?;
            let regex = compile_regex(pattern)?;
            Ok(Value::Bool(regex.is_match(text)))
        }
        BinaryOp::Add
        | BinaryOp::Sub
        | BinaryOp::Mul
        | BinaryOp::Div
        | BinaryOp::Mod
        | BinaryOp::Rem
        | BinaryOp::Quot
        | BinaryOp::Pow => arith(op, left, right),
    }
}

pub fn compile_regex(pattern: &str) -> Result<Regex, QueryError> {
    Regex::new(pattern)
        .map_err(|error| QueryError::runtime(format!("invalid regex {:?}: {}", pattern, error)))
}

fn both_strings<'a>(
    left: &'a Value,
    right: &'a Value,
    op: &str,
) -> Result<(&'a str, &'a str), QueryError> {
    match (left, right) {
        (Value::Str(left), Value::Str(right)) => Ok((left.as_ref(), right.as_ref())),
        _ => Err(QueryError::runtime(format!(
            "{} operator requires two strings, got {} and {}",
            op,
            left.kind_name(),
            right.kind_name()
        ))),
    }
}

fn compare(op: BinaryOp, left: &Value, right: &Value) -> Result<Value, QueryError> {
    // Ordering against none: strict comparisons are false, inclusive ones
    // hold only for none against none.
    if matches!(left, Value::None) || matches!(right, Value::None) {
        return Ok(Value::Bool(match op {
            BinaryOp::Greater | BinaryOp::Less => false,
            _ => matches!(left, Value::None) && matches!(right, Value::None),
        }));
    }

    let ordering = match (left, right) {
        _ if left.date_start().is_some() && right.date_start().is_some() => left
            .date_start()
            .expect("checked above")
            .cmp(&right.date_start().expect("checked above")),
        (Value::Str(left), Value::Str(right)) => left.cmp(right),
        _ => match (numeric(left), numeric(right)) {
            (Some(left), Some(right)) => left.partial_cmp(&right).unwrap_or(Ordering::Equal),
            _ => {
                return Err(QueryError::runtime(format!(
                    "comparison requires numeric, string, or date operands, got {} and {}",
                    left.kind_name(),
                    right.kind_name()
                )))
            }
        },
    };

    Ok(Value::Bool(match op {
        BinaryOp::Greater => ordering == Ordering::Greater,
        BinaryOp::Less => ordering == Ordering::Less,
        BinaryOp::GreaterEq => ordering != Ordering::Less,
        BinaryOp::LessEq => ordering != Ordering::Greater,
        _ => unreachable!("compare only handles ordering operators"),
    }))
}

fn numeric(value: &Value) -> Option<f64> {
    match value {
        Value::Int(value) => Some(*value as f64),
        Value::Float(value) => Some(*value),
        _ => None,
    }
}

fn value_in(left: &Value, right: &Value) -> Result<Value, QueryError> {
    match right {
        Value::Str(haystack) => Ok(Value::Bool(match left {
            Value::Str(needle) => haystack.contains(needle.as_ref()),
            _ => false,
        })),
        Value::List(items) | Value::Tuple(items) => {
            Ok(Value::Bool(items.iter().any(|item| item == left)))
        }
        Value::Set(items) => Ok(Value::Bool(
            left.to_hashable()
                .map(|key| items.contains(&key))
                .unwrap_or(false),
        )),
        Value::Dict(entries) => Ok(Value::Bool(match left {
            Value::Str(key) => entries.borrow().contains_key(key.as_ref()),
            _ => false,
        })),
        other => Err(QueryError::runtime(format!(
            "in operator requires a collection on the right, got {}",
            other.kind_name()
        ))),
    }
}

fn arith(op: BinaryOp, left: &Value, right: &Value) -> Result<Value, QueryError> {
    // String and collection overloads take precedence over numeric rules.
    match (op, left, right) {
        (BinaryOp::Mul, Value::Str(text), Value::Int(count))
        | (BinaryOp::Mul, Value::Int(count), Value::Str(text)) => {
            let count = (*count).max(0) as usize;
            return Ok(Value::str(text.repeat(count)));
        }
        (BinaryOp::Mul, Value::Str(_), other) | (BinaryOp::Mul, other, Value::Str(_)) => {
            return Err(QueryError::runtime(format!(
                "* requires an integer multiplier for strings, got {}",
                other.kind_name()
            )))
        }
        (BinaryOp::Add, Value::Str(left), Value::Str(right)) => {
            return Ok(Value::str(format!("{}{}", left, right)))
        }
        (BinaryOp::Add, Value::List(_) | Value::Tuple(_) | Value::Set(_), _) => {
            return append_to_collection(left, right)
        }
        (BinaryOp::Sub, Value::List(_) | Value::Tuple(_) | Value::Set(_), _) => {
            return subtract_from_collection(left, right)
        }
        _ => {}
    }

    let (Some(left_num), Some(right_num)) = (numeric(left), numeric(right)) else {
        return Err(QueryError::runtime(format!(
            "{} operator requires numeric operands, got {} and {}",
            op.symbol(),
            left.kind_name(),
            right.kind_name()
        )));
    };
    let ints = match (left, right) {
        (Value::Int(left), Value::Int(right)) => Some((*left, *right)),
        _ => None,
    };

    match op {
        BinaryOp::Add => Ok(match ints {
            Some((left, right)) => checked_int(left.checked_add(right), "+")?,
            None => Value::Float(left_num + right_num),
        }),
        BinaryOp::Sub => Ok(match ints {
            Some((left, right)) => checked_int(left.checked_sub(right), "-")?,
            None => Value::Float(left_num - right_num),
        }),
        BinaryOp::Mul => Ok(match ints {
            Some((left, right)) => checked_int(left.checked_mul(right), "*")?,
            None => Value::Float(left_num * right_num),
        }),
        BinaryOp::Div => {
            guard_non_zero(right_num, "division by zero")?;
            Ok(Value::Float(left_num / right_num))
        }
        BinaryOp::Mod => {
            guard_non_zero(right_num, "modulo by zero")?;
            Ok(match ints {
                Some((left, right)) => {
                    let modulus = right.abs();
                    Value::Int(((left % modulus) + modulus) % modulus)
                }
                None => {
                    let modulus = right_num.abs();
                    Value::Float(((left_num % modulus) + modulus) % modulus)
                }
            })
        }
        BinaryOp::Rem => {
            guard_non_zero(right_num, "remainder by zero")?;
            Ok(match ints {
                Some((left, right)) => Value::Int(left % right),
                None => Value::Float(left_num - right_num * (left_num / right_num).trunc()),
            })
        }
        BinaryOp::Quot => {
            guard_non_zero(right_num, "quotient by zero")?;
            Ok(match ints {
                Some((left, right)) => Value::Int(left / right),
                None => Value::Int((left_num / right_num).trunc() as i64),
            })
        }
        BinaryOp::Pow => Ok(match ints {
            Some((left, right)) if right >= 0 => {
                let exponent = u32::try_from(right)
                    .map_err(|_| QueryError::runtime("integer overflow in **"))?;
                checked_int(left.checked_pow(exponent), "**")?
            }
            _ => Value::Float(left_num.powf(right_num)),
        }),
        _ => unreachable!("arith only handles numeric operators"),
    }
}

fn checked_int(value: Option<i64>, op: &str) -> Result<Value, QueryError> {
    value
        .map(Value::Int)
        .ok_or_else(|| QueryError::runtime(format!("integer overflow in {}", op)))
}

fn guard_non_zero(value: f64, message: &str) -> Result<(), QueryError> {
    if value == 0.0 {
        return Err(QueryError::runtime(message));
    }
    Ok(())
}

/// Elements a right operand contributes when added to or removed from a
/// collection.
fn operand_elements(value: &Value) -> Vec<Value> {
    match value {
        Value::List(items) | Value::Tuple(items) => items.as_ref().clone(),
        Value::Set(items) => items.iter().map(Hashable::to_value).collect(),
        other => vec![other.clone()],
    }
}

fn append_to_collection(collection: &Value, value: &Value) -> Result<Value, QueryError> {
    let additions = operand_elements(value);
    match collection {
        Value::List(items) => {
            let mut items = items.as_ref().clone();
            items.extend(additions);
            Ok(Value::list(items))
        }
        Value::Tuple(items) => {
            let mut items = items.as_ref().clone();
            items.extend(additions);
            Ok(Value::tuple(items))
        }
        Value::Set(items) => {
            let mut items = items.as_ref().clone();
            for addition in additions {
                let key = addition.to_hashable().ok_or_else(|| {
                    QueryError::runtime(format!(
                        "set elements must be hashable scalars, got {}",
                        addition.kind_name()
                    ))
                })?;
                items.insert(key);
            }
            Ok(Value::set(items))
        }
        _ => unreachable!("callers check the collection kind"),
    }
}

fn subtract_from_collection(collection: &Value, value: &Value) -> Result<Value, QueryError> {
    let removals = operand_elements(value);
    let keep = |item: &Value| !removals.iter().any(|removed| removed == item);
    match collection {
        Value::List(items) => Ok(Value::list(
            items.iter().filter(|item| keep(item)).cloned().collect(),
        )),
        Value::Tuple(items) => Ok(Value::tuple(
            items.iter().filter(|item| keep(item)).cloned().collect(),
        )),
        Value::Set(items) => {
            let kept: IndexSet<Hashable> = items
                .iter()
                .filter(|key| keep(&key.to_value()))
                .cloned()
                .collect();
            Ok(Value::set(kept))
        }
        _ => unreachable!("callers check the collection kind"),
    }
}

/// In-place dict insertion for `=`; emits the mutated dict.
pub fn assign_into(base: &Value, key: &Value, value: Value) -> Result<Value, QueryError> {
    let Value::Dict(entries) = base else {
        return Err(QueryError::runtime(format!(
            "assignment target must evaluate to a dict, got {}",
            base.kind_name()
        )));
    };
    let Value::Str(key) = key else {
        return Err(QueryError::runtime(format!(
            "assignment key must evaluate to a string, got {}",
            key.kind_name()
        )));
    };
    entries.borrow_mut().insert(key.to_string(), value);
    Ok(base.clone())
}

/// Collection view used by `sum`, `min`, `max`, `join`, and `map`.
pub fn extract_collection(value: &Value) -> Result<Vec<Value>, QueryError> {
    match value {
        Value::List(items) | Value::Tuple(items) => Ok(items.as_ref().clone()),
        Value::Set(items) => Ok(items.iter().map(Hashable::to_value).collect()),
        Value::Root(root) => Ok(root.children.iter().cloned().map(Value::Node).collect()),
        other => Err(QueryError::runtime(format!(
            "operation requires a collection, got {}",
            other.kind_name()
        ))),
    }
}

/// Ordering key for `sort_by`, `min`, and `max`. Keys must share one
/// comparable category: numbers, strings, or dates.
#[derive(Debug, Clone)]
pub enum SortKey {
    Number(f64),
    Text(Rc<str>),
    Date(NaiveDateTime),
}

impl SortKey {
    pub fn category(&self) -> &'static str {
        match self {
            SortKey::Number(_) => "number",
            SortKey::Text(_) => "string",
            SortKey::Date(_) => "date",
        }
    }

    pub fn compare(&self, other: &SortKey) -> Ordering {
        match (self, other) {
            (SortKey::Number(left), SortKey::Number(right)) => {
                left.partial_cmp(right).unwrap_or(Ordering::Equal)
            }
            (SortKey::Text(left), SortKey::Text(right)) => left.cmp(right),
            (SortKey::Date(left), SortKey::Date(right)) => left.cmp(right),
            _ => unreachable!("callers reject mixed categories"),
        }
    }
}

/// `Ok(None)` for a `None` value; an error for kinds with no ordering.
pub fn sort_key(value: &Value) -> Result<Option<SortKey>, QueryError> {
    if let Some(start) = value.date_start() {
        return Ok(Some(SortKey::Date(start)));
    }
    match value {
        Value::None => Ok(None),
        Value::Int(key) => Ok(Some(SortKey::Number(*key as f64))),
        Value::Float(key) => Ok(Some(SortKey::Number(*key))),
        Value::Str(key) => Ok(Some(SortKey::Text(key.clone()))),
        other => Err(QueryError::runtime(format!(
            "cannot compare value of kind {}",
            other.kind_name()
        ))),
    }
}
