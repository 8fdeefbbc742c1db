//! The query language: parse, compile, execute.

pub mod compiler;
pub mod context;
pub mod error;
pub mod evaluator;
pub mod functions;
pub mod parser;

pub use compiler::{CompiledQuery, Compiler, Stage, Stream};
pub use context::EvalContext;
pub use error::QueryError;
pub use functions::Registry;
pub use parser::TokenParser;

use crate::ast::Expr;

/// Parse query text into an AST, resolving bare identifiers against the
/// standard registry.
pub fn parse_query(source: &str) -> Result<Expr, QueryError> {
    parser::parse_query_with_registry(source, &Registry::standard())
}

/// Lower a parsed expression against an explicit registry.
pub fn compile_expr(expr: &Expr, registry: &Registry) -> Result<CompiledQuery, QueryError> {
    Compiler::new(registry).compile(expr)
}

/// Parse and compile in one step with the standard registry.
pub fn compile_query(source: &str) -> Result<CompiledQuery, QueryError> {
    let registry = Registry::standard();
    let expr = parser::parse_query_with_registry(source, &registry)?;
    compile_expr(&expr, &registry)
}
