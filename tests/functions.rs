//! Built-in function coverage.

mod common;

use common::{dict, ints, run, strs, try_run};
use orgq::Value;

// ============================================================================
// Stream functions
// ============================================================================

#[test]
fn test_reverse_stream() {
    assert_eq!(
        run(".[] | reverse", vec![ints(&[1, 2, 3])]),
        vec![Value::Int(3), Value::Int(2), Value::Int(1)]
    );
}

#[test]
fn test_reverse_single_container() {
    assert_eq!(run("reverse", vec![ints(&[1, 2, 3])]), vec![ints(&[3, 2, 1])]);
}

#[test]
fn test_unique_preserves_first_occurrence_order() {
    assert_eq!(
        run(".[] | unique", vec![strs(&["b", "a", "b", "c", "a"])]),
        vec![Value::str("b"), Value::str("a"), Value::str("c")]
    );
}

#[test]
fn test_length_by_kind() {
    assert_eq!(run("length", vec![ints(&[1, 2, 3])]), vec![Value::Int(3)]);
    assert_eq!(run("length", vec![Value::str("abcd")]), vec![Value::Int(4)]);
    assert_eq!(
        run("length", vec![dict(&[("a", Value::Int(1))])]),
        vec![Value::Int(1)]
    );
    assert_eq!(run("length", vec![Value::Int(5)]), vec![Value::None]);
    assert_eq!(run("length", vec![Value::None]), vec![Value::None]);
}

#[test]
fn test_sum() {
    assert_eq!(run("sum", vec![ints(&[1, 2, 3])]), vec![Value::Int(6)]);
    assert_eq!(
        run("sum", vec![Value::list(vec![Value::Int(1), Value::Float(0.5)])]),
        vec![Value::Float(1.5)]
    );
    assert_eq!(run("sum", vec![ints(&[])]), vec![Value::Int(0)]);
}

#[test]
fn test_sum_rejects_non_numeric() {
    assert!(try_run("sum", vec![strs(&["a"])]).is_err());
    assert!(try_run("sum", vec![Value::Int(1)]).is_err());
}

#[test]
fn test_max_min() {
    assert_eq!(run("max", vec![ints(&[3, 9, 4])]), vec![Value::Int(9)]);
    assert_eq!(run("min", vec![ints(&[3, 9, 4])]), vec![Value::Int(3)]);
    assert_eq!(
        run("max", vec![strs(&["pear", "apple"])]),
        vec![Value::str("pear")]
    );
}

#[test]
fn test_max_ignores_none_entries() {
    let input = vec![Value::list(vec![Value::None, Value::Int(2), Value::None])];
    assert_eq!(run("max", input), vec![Value::Int(2)]);
}

#[test]
fn test_max_of_empty_or_all_none_is_none() {
    assert_eq!(run("max", vec![ints(&[])]), vec![Value::None]);
    let all_none = vec![Value::list(vec![Value::None, Value::None])];
    assert_eq!(run("min", all_none), vec![Value::None]);
}

#[test]
fn test_max_rejects_mixed_categories() {
    let input = vec![Value::list(vec![Value::Int(1), Value::str("a")])];
    assert!(try_run("max", input).is_err());
}

#[test]
fn test_select_keeps_truthy_and_drops_falsy() {
    assert_eq!(
        run("select(. > 2)", vec![Value::Int(3)]),
        vec![Value::Int(3)]
    );
    assert_eq!(run("select(. > 2)", vec![Value::Int(1)]), Vec::<Value>::new());
}

#[test]
fn test_sort_by_key_descending() {
    let input = Value::list(vec![
        dict(&[("n", Value::Int(2))]),
        dict(&[("n", Value::Int(9))]),
        dict(&[("n", Value::Int(5))]),
    ]);
    assert_eq!(
        run("sort_by(.n) | .[] | .n", vec![input]),
        vec![Value::Int(9), Value::Int(5), Value::Int(2)]
    );
}

#[test]
fn test_join() {
    assert_eq!(
        run(r#"join(", ")"#, vec![strs(&["a", "b", "c"])]),
        vec![Value::str("a, b, c")]
    );
    assert_eq!(
        run(r#"join("-")"#, vec![ints(&[1, 2])]),
        vec![Value::str("1-2")]
    );
}

#[test]
fn test_join_separator_must_be_string() {
    assert!(try_run("join(1)", vec![strs(&["a"])]).is_err());
}

#[test]
fn test_map_emits_one_list_per_input() {
    assert_eq!(
        run("map(. * 2)", vec![ints(&[1, 2, 3])]),
        vec![ints(&[2, 4, 6])]
    );
}

#[test]
fn test_map_requires_collection() {
    assert!(try_run("map(.)", vec![Value::Int(1)]).is_err());
}

// ============================================================================
// Conversions
// ============================================================================

#[test]
fn test_type_names() {
    assert_eq!(run("type", vec![Value::None]), vec![Value::str("none")]);
    assert_eq!(run("type", vec![Value::Int(1)]), vec![Value::str("int")]);
    assert_eq!(run("type", vec![Value::Float(1.5)]), vec![Value::str("float")]);
    assert_eq!(run("type", vec![Value::str("s")]), vec![Value::str("str")]);
    assert_eq!(run("type", vec![ints(&[])]), vec![Value::str("list")]);
    assert_eq!(run("type", vec![dict(&[])]), vec![Value::str("dict")]);
}

#[test]
fn test_not_negates_condition_truthiness() {
    assert_eq!(run("not(.)", vec![Value::Bool(true)]), vec![Value::Bool(false)]);
    assert_eq!(run("not(.)", vec![Value::None]), vec![Value::Bool(true)]);
    assert_eq!(run("not(. > 5)", vec![Value::Int(3)]), vec![Value::Bool(true)]);
}

#[test]
fn test_str_coercion() {
    assert_eq!(run("str(.)", vec![Value::Int(42)]), vec![Value::str("42")]);
    assert_eq!(run("str(.)", vec![Value::Bool(true)]), vec![Value::str("true")]);
    assert_eq!(run("str(.)", vec![Value::None]), vec![Value::str("none")]);
    assert_eq!(run("str(.)", vec![Value::Float(2.0)]), vec![Value::str("2.0")]);
}

#[test]
fn test_int_coercion() {
    assert_eq!(run("int(.)", vec![Value::str("42")]), vec![Value::Int(42)]);
    assert_eq!(run("int(.)", vec![Value::Int(7)]), vec![Value::Int(7)]);
    assert!(try_run("int(.)", vec![Value::str("x")]).is_err());
    assert!(try_run("int(.)", vec![Value::Float(1.5)]).is_err());
    assert!(try_run("int(.)", vec![Value::Bool(true)]).is_err());
}

#[test]
fn test_float_coercion() {
    assert_eq!(run("float(.)", vec![Value::str("1.5")]), vec![Value::Float(1.5)]);
    assert_eq!(run("float(.)", vec![Value::Float(2.5)]), vec![Value::Float(2.5)]);
    assert!(try_run("float(.)", vec![Value::Int(1)]).is_err());
}

#[test]
fn test_bool_coercion_is_case_insensitive() {
    assert_eq!(run(r#"bool("TRUE")"#, vec![Value::None]), vec![Value::Bool(true)]);
    assert_eq!(run(r#"bool("false")"#, vec![Value::None]), vec![Value::Bool(false)]);
    assert!(try_run(r#"bool("yes")"#, vec![Value::None]).is_err());
}

// ============================================================================
// Dates
// ============================================================================

#[test]
fn test_ts_parses_timestamps() {
    let result = run(r#"ts("<2024-03-01 Fri>")"#, vec![Value::None]);
    let Value::Date(date) = &result[0] else {
        panic!("expected a date value");
    };
    assert!(date.active);
    assert_eq!(run(r#"str(ts("<2024-03-01 Fri>"))"#, vec![Value::None]),
        vec![Value::str("<2024-03-01 Fri>")]);
}

#[test]
fn test_ts_rejects_garbage() {
    assert!(try_run(r#"ts("not a date")"#, vec![Value::None]).is_err());
}

#[test]
fn test_timestamp_constructor_arities() {
    let one = run(r#"timestamp("<2024-03-01 Fri>")"#, vec![Value::None]);
    assert!(matches!(one[0], Value::Date(_)));

    let two = run(
        r#"timestamp("<2024-03-01 Fri>", "<2024-03-02 Sat>")"#,
        vec![Value::None],
    );
    let Value::Date(range) = &two[0] else {
        panic!("expected a date value");
    };
    assert!(range.end.is_some());

    let three = run(
        r#"timestamp("<2024-03-01 Fri>", none, false)"#,
        vec![Value::None],
    );
    let Value::Date(inactive) = &three[0] else {
        panic!("expected a date value");
    };
    assert!(!inactive.active);
    assert_eq!(inactive.end, None);
}

#[test]
fn test_clock_constructor() {
    let result = run(
        r#"clock("[2024-03-01 Fri 09:00]", "[2024-03-01 Fri 10:30]")"#,
        vec![Value::None],
    );
    let Value::Clock(clock) = &result[0] else {
        panic!("expected a clock value");
    };
    assert_eq!(clock.duration_minutes(), 90);
    assert!(!clock.active);
}

#[test]
fn test_clock_end_cannot_be_none() {
    assert!(try_run(r#"clock("[2024-03-01 Fri 09:00]", none)"#, vec![Value::None]).is_err());
}

#[test]
fn test_repeated_task_constructor() {
    let result = run(
        r#"repeated_task("[2024-03-01 Fri]", "TODO", "DONE")"#,
        vec![Value::None],
    );
    let Value::Repeated(task) = &result[0] else {
        panic!("expected a repeated task value");
    };
    assert_eq!(task.before.as_deref(), Some("TODO"));
    assert_eq!(task.after.as_deref(), Some("DONE"));
}

// ============================================================================
// Misc
// ============================================================================

#[test]
fn test_sha256_requires_strings() {
    assert!(try_run("sha256", vec![Value::Int(1)]).is_err());
}

#[test]
fn test_match_captures_groups() {
    let result = run(r#"match("(\\d+)-(\\d+)")"#, vec![Value::str("id 12-34")]);
    assert_eq!(
        result,
        vec![Value::list(vec![
            Value::str("12-34"),
            Value::str("12"),
            Value::str("34")
        ])]
    );
}

#[test]
fn test_match_miss_is_none() {
    assert_eq!(
        run(r#"match("\\d+")"#, vec![Value::str("letters")]),
        vec![Value::None]
    );
}

#[test]
fn test_match_invalid_pattern_errors() {
    assert!(try_run(r#"match("(")"#, vec![Value::str("x")]).is_err());
}

#[test]
fn test_uuid_emits_fresh_v4_per_item() {
    let results = run("uuid", vec![Value::Int(1), Value::Int(2)]);
    assert_eq!(results.len(), 2);
    let Value::Str(first) = &results[0] else {
        panic!("expected a string");
    };
    assert_eq!(first.len(), 36);
    assert_eq!(first.chars().filter(|c| *c == '-').count(), 4);
    assert_ne!(results[0], results[1]);
}

#[test]
fn test_debug_passes_stream_through() {
    assert_eq!(
        run(".[] | debug", vec![ints(&[1, 2])]),
        vec![Value::Int(1), Value::Int(2)]
    );
}

#[test]
fn test_nested_subquery_closures_reexecute() {
    // select's subquery sees variables bound outside it.
    let result = run(
        "3 as $limit | .[] | select(. < $limit)",
        vec![ints(&[1, 5, 2])],
    );
    assert_eq!(result, vec![Value::Int(1), Value::Int(2)]);
}
