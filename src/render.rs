//! Printer collaborator: turns a result stream into terminal lines.

use crate::value::Value;

/// A query that produces a single container result prints its elements, not
/// the container.
pub fn flatten_result_stream(results: Vec<Value>) -> Vec<Value> {
    if results.len() != 1 {
        return results;
    }
    match &results[0] {
        Value::List(items) | Value::Tuple(items) => items.as_ref().clone(),
        Value::Set(items) => items.iter().map(|item| item.to_value()).collect(),
        _ => results,
    }
}

pub fn is_org_value(value: &Value) -> bool {
    matches!(
        value,
        Value::Node(_) | Value::Root(_) | Value::Date(_) | Value::Clock(_) | Value::Repeated(_)
    )
}

/// Org nodes print as a full Org block under a `# filename` comment line.
pub fn format_org_block(value: &Value) -> String {
    match value {
        Value::Node(node) => {
            let filename = if node.filename.is_empty() {
                "unknown"
            } else {
                node.filename.as_ref()
            };
            let text = node.to_string();
            let text = text.trim_end();
            if text.is_empty() {
                format!("# {}", filename)
            } else {
                format!("# {}\n{}", filename, text)
            }
        }
        Value::Root(root) => {
            let text = root.to_string();
            let text = text.trim_end();
            if text.is_empty() {
                format!("# {}", root.filename)
            } else {
                format!("# {}\n{}", root.filename, text)
            }
        }
        other => other.to_string(),
    }
}

/// Scalar and container rendering for mixed result streams.
pub fn format_query_value(value: &Value) -> String {
    match value {
        Value::Node(node) => node.to_string().trim_end().to_string(),
        other => other.to_string(),
    }
}

/// Render a full result stream into output lines. An empty stream renders
/// as `No results`.
pub fn render_lines(results: Vec<Value>) -> Vec<String> {
    let values = flatten_result_stream(results);
    if values.is_empty() {
        return vec!["No results".to_string()];
    }
    if values.iter().all(is_org_value) {
        return values.iter().map(format_org_block).collect();
    }
    values.iter().map(format_query_value).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_stream_renders_no_results() {
        assert_eq!(render_lines(Vec::new()), vec!["No results".to_string()]);
    }

    #[test]
    fn test_singleton_list_flattens() {
        let result = vec![Value::list(vec![Value::Int(1), Value::Int(2)])];
        assert_eq!(
            render_lines(result),
            vec!["1".to_string(), "2".to_string()]
        );
    }

    #[test]
    fn test_singleton_tuple_flattens() {
        let result = vec![Value::tuple(vec![Value::Int(2), Value::Int(-1)])];
        assert_eq!(
            render_lines(result),
            vec!["2".to_string(), "-1".to_string()]
        );
    }

    #[test]
    fn test_multiple_values_keep_their_own_lines() {
        let result = vec![Value::str("a"), Value::str("b")];
        assert_eq!(
            render_lines(result),
            vec!["a".to_string(), "b".to_string()]
        );
    }

    #[test]
    fn test_scalars_render_naturally() {
        assert_eq!(
            render_lines(vec![Value::Bool(true), Value::None]),
            vec!["true".to_string(), "none".to_string()]
        );
    }
}
