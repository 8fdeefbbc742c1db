use std::fmt;

use owo_colors::OwoColorize;

/// Byte range into the query source text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Span {
    pub start: usize,
    pub end: usize,
}

impl Span {
    pub fn new(start: usize, end: usize) -> Self {
        Self { start, end }
    }

    pub fn dummy() -> Self {
        Self { start: 0, end: 0 }
    }

    pub fn merge(self, other: Span) -> Span {
        Span {
            start: self.start.min(other.start),
            end: self.end.max(other.end),
        }
    }

    pub fn is_dummy(&self) -> bool {
        self.start == 0 && self.end == 0
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    Error,
    Warning,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Severity::Error => write!(f, "error"),
            Severity::Warning => write!(f, "warning"),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Label {
    pub span: Span,
    pub message: String,
}

impl Label {
    pub fn new(span: Span, message: impl Into<String>) -> Self {
        Self {
            span,
            message: message.into(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Diagnostic {
    pub severity: Severity,
    pub message: String,
    pub labels: Vec<Label>,
    pub notes: Vec<String>,
}

impl Diagnostic {
    pub fn error(message: impl Into<String>) -> Self {
        Self {
            severity: Severity::Error,
            message: message.into(),
            labels: Vec::new(),
            notes: Vec::new(),
        }
    }

    pub fn with_label(mut self, label: Label) -> Self {
        self.labels.push(label);
        self
    }

    pub fn with_note(mut self, note: impl Into<String>) -> Self {
        self.notes.push(note.into());
        self
    }
}

pub fn line_col(source: &str, offset: usize) -> (usize, usize) {
    let mut line = 1;
    let mut col = 1;
    for (i, ch) in source.char_indices() {
        if i >= offset {
            break;
        }
        if ch == '\n' {
            line += 1;
            col = 1;
        } else {
            col += 1;
        }
    }
    (line, col)
}

/// Render a diagnostic against the query text it refers to.
pub fn render_diagnostic(source: &str, diagnostic: &Diagnostic, color: bool) -> String {
    let mut out = String::new();

    let header = format!("{}: {}", diagnostic.severity, diagnostic.message);
    if color {
        out.push_str(&format!("{}", header.red().bold()));
    } else {
        out.push_str(&header);
    }
    out.push('\n');

    for label in &diagnostic.labels {
        let (line, col) = line_col(source, label.span.start);
        out.push_str(&format!("  --> query:{}:{}\n", line, col));

        if let Some(line_text) = source.lines().nth(line - 1) {
            let gutter = format!("{:>3} | ", line);
            out.push_str(&gutter);
            out.push_str(line_text);
            out.push('\n');

            let width = label.span.end.saturating_sub(label.span.start).max(1);
            let underline = format!(
                "{}{}{} {}",
                " ".repeat(gutter.len()),
                " ".repeat(col - 1),
                "^".repeat(width),
                label.message
            );
            if color {
                out.push_str(&format!("{}", underline.red()));
            } else {
                out.push_str(&underline);
            }
            out.push('\n');
        }
    }

    for note in &diagnostic.notes {
        out.push_str(&format!("  = note: {}\n", note));
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_line_col() {
        assert_eq!(line_col("abc", 0), (1, 1));
        assert_eq!(line_col("abc", 2), (1, 3));
        assert_eq!(line_col("a\nbc", 2), (2, 1));
        assert_eq!(line_col("a\nbc", 3), (2, 2));
    }

    #[test]
    fn test_render_without_color() {
        let diag =
            Diagnostic::error("unexpected token").with_label(Label::new(Span::new(5, 6), "here"));
        let rendered = render_diagnostic(".a | )", &diag, false);
        assert!(rendered.contains("error: unexpected token"));
        assert!(rendered.contains("query:1:6"));
        assert!(rendered.contains('^'));
    }

    #[test]
    fn test_span_merge() {
        let merged = Span::new(2, 4).merge(Span::new(3, 9));
        assert_eq!(merged, Span::new(2, 9));
    }
}
