use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

use chrono::NaiveDateTime;
use indexmap::{IndexMap, IndexSet};

use crate::org::date::{OrgDate, OrgDateClock, OrgDateRepeatedTask};
use crate::org::{OrgNode, OrgRootNode};

/// The runtime value universe.
///
/// Containers own their elements; Org values are shared, read-only pieces of
/// the loaded tree. `Dict` is the only value the runtime ever mutates in
/// place (through `=` assignment), hence the `RefCell`.
#[derive(Debug, Clone)]
pub enum Value {
    None,
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(Rc<str>),
    List(Rc<Vec<Value>>),
    Tuple(Rc<Vec<Value>>),
    Set(Rc<IndexSet<Hashable>>),
    Dict(Rc<RefCell<IndexMap<String, Value>>>),
    Node(Rc<OrgNode>),
    Root(Rc<OrgRootNode>),
    Date(OrgDate),
    Clock(OrgDateClock),
    Repeated(OrgDateRepeatedTask),
}

impl Value {
    pub fn str(text: impl AsRef<str>) -> Self {
        Value::Str(Rc::from(text.as_ref()))
    }

    pub fn list(items: Vec<Value>) -> Self {
        Value::List(Rc::new(items))
    }

    pub fn tuple(items: Vec<Value>) -> Self {
        Value::Tuple(Rc::new(items))
    }

    pub fn set(items: IndexSet<Hashable>) -> Self {
        Value::Set(Rc::new(items))
    }

    pub fn set_from_strs<I, S>(items: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Value::Set(Rc::new(
            items
                .into_iter()
                .map(|item| Hashable::Str(Rc::from(item.as_ref())))
                .collect(),
        ))
    }

    pub fn dict(entries: IndexMap<String, Value>) -> Self {
        Value::Dict(Rc::new(RefCell::new(entries)))
    }

    /// Kind name used by `type` and in runtime error messages.
    pub fn kind_name(&self) -> &'static str {
        match self {
            Value::None => "none",
            Value::Bool(_) => "bool",
            Value::Int(_) => "int",
            Value::Float(_) => "float",
            Value::Str(_) => "str",
            Value::List(_) => "list",
            Value::Tuple(_) => "tuple",
            Value::Set(_) => "set",
            Value::Dict(_) => "dict",
            Value::Node(_) => "org_node",
            Value::Root(_) => "org_root",
            Value::Date(_) => "org_date",
            Value::Clock(_) => "org_date_clock",
            Value::Repeated(_) => "org_date_repeated_task",
        }
    }

    /// Only `none` and `false` are falsy; empty containers and zero count as
    /// truthy.
    pub fn is_truthy(&self) -> bool {
        !matches!(self, Value::None | Value::Bool(false))
    }

    /// Start instant shared by the three date kinds.
    pub fn date_start(&self) -> Option<NaiveDateTime> {
        match self {
            Value::Date(date) => Some(date.start),
            Value::Clock(clock) => Some(clock.start),
            Value::Repeated(task) => Some(task.timestamp),
            _ => None,
        }
    }

    pub fn as_int(&self) -> Option<i64> {
        if let Value::Int(value) = self {
            Some(*value)
        } else {
            None
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        if let Value::Str(text) = self {
            Some(text.as_ref())
        } else {
            None
        }
    }

    pub fn to_hashable(&self) -> Option<Hashable> {
        match self {
            Value::None => Some(Hashable::None),
            Value::Bool(value) => Some(Hashable::Bool(*value)),
            Value::Int(value) => Some(Hashable::Int(*value)),
            Value::Float(value) => Some(Hashable::Float(value.to_bits())),
            Value::Str(text) => Some(Hashable::Str(text.clone())),
            _ => None,
        }
    }
}

impl PartialEq for Value {
    /// Structural equality, with two cross-kind allowances: ints compare
    /// equal to floats of the same magnitude, and date kinds compare by
    /// their start instant.
    fn eq(&self, other: &Self) -> bool {
        if let (Some(left), Some(right)) = (self.date_start(), other.date_start()) {
            return left == right;
        }
        match (self, other) {
            (Value::None, Value::None) => true,
            (Value::Bool(left), Value::Bool(right)) => left == right,
            (Value::Int(left), Value::Int(right)) => left == right,
            (Value::Float(left), Value::Float(right)) => left == right,
            (Value::Int(left), Value::Float(right)) | (Value::Float(right), Value::Int(left)) => {
                *left as f64 == *right
            }
            (Value::Str(left), Value::Str(right)) => left == right,
            (Value::List(left), Value::List(right)) => left == right,
            (Value::Tuple(left), Value::Tuple(right)) => left == right,
            (Value::Set(left), Value::Set(right)) => left == right,
            (Value::Dict(left), Value::Dict(right)) => {
                Rc::ptr_eq(left, right) || *left.borrow() == *right.borrow()
            }
            (Value::Node(left), Value::Node(right)) => left == right,
            (Value::Root(left), Value::Root(right)) => left == right,
            _ => false,
        }
    }
}

/// Scalars usable as set elements and comparison keys in hashed containers.
/// Floats hash by bit pattern, the same trick the runtime uses everywhere a
/// float needs an `Eq` identity.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Hashable {
    None,
    Bool(bool),
    Int(i64),
    Float(u64),
    Str(Rc<str>),
}

impl Hashable {
    pub fn to_value(&self) -> Value {
        match self {
            Hashable::None => Value::None,
            Hashable::Bool(value) => Value::Bool(*value),
            Hashable::Int(value) => Value::Int(*value),
            Hashable::Float(bits) => Value::Float(f64::from_bits(*bits)),
            Hashable::Str(text) => Value::Str(text.clone()),
        }
    }
}

impl fmt::Display for Value {
    /// Natural string representation: scalars bare, containers in their
    /// bracketed forms with string elements quoted.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::None => write!(f, "none"),
            Value::Bool(value) => write!(f, "{}", value),
            Value::Int(value) => write!(f, "{}", value),
            Value::Float(value) => {
                if value.is_finite() && value.fract() == 0.0 {
                    write!(f, "{:.1}", value)
                } else {
                    write!(f, "{}", value)
                }
            }
            Value::Str(text) => write!(f, "{}", text),
            Value::List(items) => write_sequence(f, "[", items.iter(), "]"),
            Value::Tuple(items) => write_sequence(f, "(", items.iter(), ")"),
            Value::Set(items) => {
                let values: Vec<Value> = items.iter().map(Hashable::to_value).collect();
                write_sequence(f, "{", values.iter(), "}")
            }
            Value::Dict(entries) => {
                write!(f, "{{")?;
                for (index, (key, value)) in entries.borrow().iter().enumerate() {
                    if index > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "\"{}\": {}", key, display_element(value))?;
                }
                write!(f, "}}")
            }
            Value::Node(node) => write!(f, "{}", node),
            Value::Root(root) => write!(f, "{}", root),
            Value::Date(date) => write!(f, "{}", date),
            Value::Clock(clock) => write!(f, "{}", clock),
            Value::Repeated(task) => write!(f, "{}", task),
        }
    }
}

fn write_sequence<'a>(
    f: &mut fmt::Formatter<'_>,
    open: &str,
    items: impl Iterator<Item = &'a Value>,
    close: &str,
) -> fmt::Result {
    write!(f, "{}", open)?;
    for (index, item) in items.enumerate() {
        if index > 0 {
            write!(f, ", ")?;
        }
        write!(f, "{}", display_element(item))?;
    }
    write!(f, "{}", close)
}

/// Elements inside containers print with strings quoted, like the top-level
/// form would be written in a query.
fn display_element(value: &Value) -> String {
    match value {
        Value::Str(text) => format!("\"{}\"", text),
        _ => value.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_truthiness() {
        assert!(!Value::None.is_truthy());
        assert!(!Value::Bool(false).is_truthy());
        assert!(Value::Bool(true).is_truthy());
        assert!(Value::Int(0).is_truthy());
        assert!(Value::str("").is_truthy());
        assert!(Value::list(Vec::new()).is_truthy());
    }

    #[test]
    fn test_numeric_cross_kind_equality() {
        assert_eq!(Value::Int(1), Value::Float(1.0));
        assert_ne!(Value::Int(1), Value::Float(1.5));
    }

    #[test]
    fn test_list_and_tuple_are_distinct_kinds() {
        let items = vec![Value::Int(1), Value::Int(2)];
        assert_ne!(Value::list(items.clone()), Value::tuple(items));
    }

    #[test]
    fn test_set_equality_ignores_order() {
        let ab = Value::set_from_strs(["a", "b"]);
        let ba = Value::set_from_strs(["b", "a"]);
        assert_eq!(ab, ba);
    }

    #[test]
    fn test_display_forms() {
        assert_eq!(Value::None.to_string(), "none");
        assert_eq!(Value::Float(2.0).to_string(), "2.0");
        assert_eq!(Value::Float(2.5).to_string(), "2.5");
        assert_eq!(
            Value::list(vec![Value::Int(1), Value::str("x")]).to_string(),
            "[1, \"x\"]"
        );
        assert_eq!(
            Value::tuple(vec![Value::Int(1), Value::Int(2)]).to_string(),
            "(1, 2)"
        );
    }

    #[test]
    fn test_hashable_round_trip() {
        for value in [Value::None, Value::Bool(true), Value::Int(3), Value::str("s")] {
            let hashable = value.to_hashable().unwrap();
            assert_eq!(hashable.to_value(), value);
        }
        assert!(Value::list(Vec::new()).to_hashable().is_none());
    }
}
