//! Error taxonomy: lexical, parse, compile, and runtime failures.

mod common;

use common::{dict, ints, try_run};
use orgq::query::{compile_query, parse_query};
use orgq::{QueryError, Value};

fn parse_err(query: &str) -> QueryError {
    parse_query(query).expect_err("query must not parse")
}

fn compile_err(query: &str) -> QueryError {
    compile_query(query).expect_err("query must not compile")
}

// ============================================================================
// Lexical errors
// ============================================================================

#[test]
fn test_unknown_character() {
    let error = parse_err(".a ? .b");
    assert!(matches!(error, QueryError::Lexical { .. }), "{:?}", error);
}

#[test]
fn test_unterminated_string() {
    let error = parse_err(r#".a == "unclosed"#);
    assert!(matches!(error, QueryError::Lexical { .. }), "{:?}", error);
}

#[test]
fn test_lexical_error_carries_position() {
    let error = parse_err(".abc ?");
    let span = error.span().expect("lexical errors have spans");
    assert!(span.start >= 5, "span {:?}", span);
}

// ============================================================================
// Parse errors
// ============================================================================

#[test]
fn test_unexpected_token() {
    assert!(matches!(parse_err(".a | | .b"), QueryError::Parse { .. }));
    assert!(matches!(parse_err("1 +"), QueryError::Parse { .. }));
}

#[test]
fn test_unbalanced_brackets() {
    assert!(matches!(parse_err("[ .a"), QueryError::Parse { .. }));
    assert!(matches!(parse_err("(.a | .b"), QueryError::Parse { .. }));
    assert!(matches!(parse_err(".a[1"), QueryError::Parse { .. }));
}

#[test]
fn test_invalid_assignment_target() {
    assert!(matches!(parse_err("1 = 2"), QueryError::Parse { .. }));
    assert!(matches!(parse_err(".[] = 2"), QueryError::Parse { .. }));
    assert!(matches!(parse_err(r#""s" = 2"#), QueryError::Parse { .. }));
}

#[test]
fn test_comparison_chain_is_rejected() {
    assert!(matches!(parse_err("1 < 2 < 3"), QueryError::Parse { .. }));
}

#[test]
fn test_empty_query() {
    assert!(matches!(parse_err(""), QueryError::Parse { .. }));
    assert!(matches!(parse_err("   "), QueryError::Parse { .. }));
}

#[test]
fn test_as_requires_variable() {
    assert!(matches!(parse_err(".a as name | ."), QueryError::Parse { .. }));
}

#[test]
fn test_if_requires_then_and_else() {
    assert!(matches!(parse_err("if . then 1"), QueryError::Parse { .. }));
    assert!(matches!(parse_err("if . 1 else 2"), QueryError::Parse { .. }));
}

// ============================================================================
// Compile errors
// ============================================================================

#[test]
fn test_unknown_function() {
    let error = compile_err("flatten(.)");
    let QueryError::Compile { message, .. } = &error else {
        panic!("expected a compile error, got {:?}", error);
    };
    assert!(message.contains("unknown function"), "{}", message);
    assert!(message.contains("flatten"), "{}", message);
}

#[test]
fn test_arity_mismatch() {
    for query in ["length(1)", "select()", "timestamp(1, 2, 3, 4)", "clock(1)"] {
        let error = compile_err(query);
        assert!(
            matches!(error, QueryError::Compile { .. }),
            "{} -> {:?}",
            query,
            error
        );
    }
}

#[test]
fn test_compile_error_carries_span() {
    let error = compile_err(".a | flatten(.)");
    let span = error.span().expect("compile errors have spans");
    assert!(span.start >= 5, "span {:?}", span);
}

// ============================================================================
// Runtime errors
// ============================================================================

#[test]
fn test_runtime_errors_name_the_offending_kind() {
    let error = try_run(".[]", vec![Value::Int(1)]).expect_err("not iterable");
    assert!(error.to_string().contains("int"), "{}", error);

    let error = try_run(r#".["k"] = 1"#, vec![ints(&[1])]).expect_err("not a dict");
    assert!(error.to_string().contains("list"), "{}", error);
}

#[test]
fn test_runtime_error_kinds() {
    let failing = [
        r#"1 + "s""#,                 // operator type mismatch
        ".[]",                        // non-iterable (input below is an int)
        r#".["k"] = 1"#,              // non-dict assignment target
        r#""a" matches "(""#,         // invalid regex
        "sum",                        // sum on a non-collection
        "1 / 0",                      // division by zero
    ];
    for query in failing {
        let error = try_run(query, vec![Value::Int(1)]).expect_err(query);
        assert!(error.is_runtime(), "{} -> {:?}", query, error);
    }
}

#[test]
fn test_set_membership_of_unhashable_is_false_not_error() {
    let input = vec![dict(&[("s", Value::set_from_strs(["a", "b"]))])];
    let result = try_run(".s - .s in .s", input);
    // `[] in set` is simply false; removing elements is fine.
    assert_eq!(result.unwrap(), vec![Value::Bool(false)]);
}

#[test]
fn test_mixed_sort_categories_error() {
    let input = vec![Value::list(vec![Value::Int(1), Value::str("a")])];
    let error = try_run("sort_by(.)", input).expect_err("mixed keys");
    assert!(error.is_runtime());
}
