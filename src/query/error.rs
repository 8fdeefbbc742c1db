use std::fmt;

use crate::diagnostic::{Diagnostic, Label, Span};

/// Failure taxonomy for the query pipeline.
///
/// Lexical and parse errors abort before compilation, compile errors before
/// any stream is produced, and runtime errors abort the execution with no
/// partial output.
#[derive(Debug, Clone)]
pub enum QueryError {
    Lexical { message: String, span: Span },
    Parse { message: String, span: Span },
    Compile { message: String, span: Span },
    Runtime { message: String },
}

impl QueryError {
    pub fn lexical(message: impl Into<String>, span: Span) -> Self {
        Self::Lexical {
            message: message.into(),
            span,
        }
    }

    pub fn parse(message: impl Into<String>, span: Span) -> Self {
        Self::Parse {
            message: message.into(),
            span,
        }
    }

    pub fn compile(message: impl Into<String>, span: Span) -> Self {
        Self::Compile {
            message: message.into(),
            span,
        }
    }

    pub fn runtime(message: impl Into<String>) -> Self {
        Self::Runtime {
            message: message.into(),
        }
    }

    pub fn span(&self) -> Option<Span> {
        match self {
            Self::Lexical { span, .. } | Self::Parse { span, .. } | Self::Compile { span, .. } => {
                Some(*span)
            }
            Self::Runtime { .. } => None,
        }
    }

    pub fn is_runtime(&self) -> bool {
        matches!(self, Self::Runtime { .. })
    }

    pub fn to_diagnostic(&self) -> Diagnostic {
        match self {
            Self::Lexical { message, span } => Diagnostic::error(format!("lexical error: {}", message))
                .with_label(Label::new(*span, "invalid token")),
            Self::Parse { message, span } => Diagnostic::error(format!("parse error: {}", message))
                .with_label(Label::new(*span, "unexpected here")),
            Self::Compile { message, span } => {
                Diagnostic::error(format!("compile error: {}", message))
                    .with_label(Label::new(*span, "resolved here"))
            }
            Self::Runtime { message } => Diagnostic::error(format!("runtime error: {}", message)),
        }
    }
}

impl fmt::Display for QueryError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Lexical { message, .. } => write!(f, "Lexical error: {}", message),
            Self::Parse { message, .. } => write!(f, "Parse error: {}", message),
            Self::Compile { message, .. } => write!(f, "Compile error: {}", message),
            Self::Runtime { message } => write!(f, "Runtime error: {}", message),
        }
    }
}

impl std::error::Error for QueryError {}
