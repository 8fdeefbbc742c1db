pub mod ast;
pub mod cli;
pub mod config;
pub mod diagnostic;
pub mod lexer;
pub mod logging;
pub mod org;
pub mod query;
pub mod render;
pub mod value;

// Re-export commonly used types for convenience
pub use ast::{BinaryOp, Expr, ExprKind};
pub use lexer::Token;
pub use query::{compile_query, parse_query, CompiledQuery, EvalContext, QueryError};
pub use value::Value;
