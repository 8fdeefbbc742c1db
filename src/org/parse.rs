//! Reader for Org-mode archive files.
//!
//! Produces the node tree the query runtime evaluates against. The reader is
//! deliberately forgiving: unknown drawer lines fall through into the body,
//! and malformed timestamps are ignored rather than rejected.

use std::rc::Rc;
use std::sync::OnceLock;

use indexmap::IndexSet;
use regex::Regex;

use crate::org::date::{OrgDate, OrgDateClock, OrgDateRepeatedTask};
use crate::org::{OrgNode, OrgRootNode};

fn heading_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^(\*+)\s+(.*)$").expect("heading pattern is valid"))
}

fn tags_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\s+:([A-Za-z0-9_@#%:]+):\s*$").expect("tags pattern is valid"))
}

fn property_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"^\s*:([A-Za-z0-9_+\-]+):\s*(.*)$").expect("property pattern is valid")
    })
}

fn clock_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^\s*CLOCK:\s*(.+?)\s*(?:=>.*)?$").expect("clock pattern is valid"))
}

fn state_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r#"^\s*-\s+State\s+"([^"]*)"\s+from\s+"([^"]*)"\s+(.*)$"#)
            .expect("state pattern is valid")
    })
}

/// Parse one archive into its file root.
pub fn parse_document(text: &str, filename: &str, todo_keys: &IndexSet<String>) -> OrgRootNode {
    let mut assembler = Assembler::new(filename);

    for line in text.lines() {
        if let Some(captures) = heading_regex().captures(line) {
            let level = captures[1].len();
            assembler.close_down_to(level);
            assembler.open(parse_heading(level, &captures[2], todo_keys));
            continue;
        }
        assembler.content_line(line);
    }

    assembler.finish()
}

fn parse_heading(level: usize, rest: &str, todo_keys: &IndexSet<String>) -> OrgNode {
    let mut node = OrgNode::new("", level);
    let mut text = rest.trim_end().to_string();

    if let Some(captures) = tags_regex().captures(&text) {
        let tag_start = captures.get(0).expect("whole match exists").start();
        for tag in captures[1].split(':').filter(|tag| !tag.is_empty()) {
            node.tags.insert(tag.to_string());
        }
        text.truncate(tag_start);
    }

    let trimmed = text.trim();
    match trimmed.split_once(char::is_whitespace) {
        Some((first, remainder)) if todo_keys.contains(first) => {
            node.todo = Some(first.to_string());
            node.heading = remainder.trim().to_string();
        }
        None if todo_keys.contains(trimmed) => {
            node.todo = Some(trimmed.to_string());
        }
        _ => node.heading = trimmed.to_string(),
    }
    node
}

struct Assembler {
    root: OrgRootNode,
    filename: Rc<str>,
    stack: Vec<OrgNode>,
    body_lines: Vec<String>,
    in_properties: bool,
    in_logbook: bool,
}

impl Assembler {
    fn new(filename: &str) -> Self {
        Self {
            root: OrgRootNode::new(filename),
            filename: Rc::from(filename),
            stack: Vec::new(),
            body_lines: Vec::new(),
            in_properties: false,
            in_logbook: false,
        }
    }

    fn open(&mut self, mut node: OrgNode) {
        node.filename = self.filename.clone();
        self.stack.push(node);
        self.in_properties = false;
        self.in_logbook = false;
    }

    /// Attach every completed node at or below `level` to its parent.
    fn close_down_to(&mut self, level: usize) {
        self.flush_body();
        while self.stack.last().is_some_and(|node| node.level >= level) {
            let node = self.stack.pop().expect("stack is non-empty");
            match self.stack.last_mut() {
                Some(parent) => parent.children.push(Rc::new(node)),
                None => self.root.children.push(Rc::new(node)),
            }
        }
    }

    fn content_line(&mut self, line: &str) {
        if self.stack.is_empty() {
            return; // preamble before the first heading
        }
        let trimmed = line.trim();

        if self.in_properties {
            if trimmed.eq_ignore_ascii_case(":END:") {
                self.in_properties = false;
            } else if let Some(captures) = property_regex().captures(line) {
                self.node()
                    .properties
                    .insert(captures[1].to_string(), captures[2].trim().to_string());
            }
            return;
        }
        if trimmed.eq_ignore_ascii_case(":PROPERTIES:") {
            self.in_properties = true;
            return;
        }
        if self.in_logbook && trimmed.eq_ignore_ascii_case(":END:") {
            self.in_logbook = false;
            return;
        }
        if trimmed.eq_ignore_ascii_case(":LOGBOOK:") {
            self.in_logbook = true;
            return;
        }

        if is_planning_line(trimmed) {
            apply_planning(self.node(), trimmed);
            return;
        }
        if let Some(captures) = clock_regex().captures(line) {
            if let Some(clock) = parse_clock(&captures[1]) {
                self.node().clocks.push(clock);
                return;
            }
        }
        if let Some(captures) = state_regex().captures(line) {
            if let Some(stamp) = OrgDate::scan(&captures[3]) {
                let task = OrgDateRepeatedTask::new(
                    stamp.start,
                    non_empty(&captures[2]),
                    non_empty(&captures[1]),
                    stamp.active,
                );
                self.node().repeated_tasks.push(task);
                return;
            }
        }
        if self.in_logbook {
            return;
        }
        self.body_lines.push(line.to_string());
    }

    fn node(&mut self) -> &mut OrgNode {
        self.stack.last_mut().expect("a heading is open")
    }

    fn flush_body(&mut self) {
        if self.body_lines.is_empty() {
            return;
        }
        if let Some(node) = self.stack.last_mut() {
            let body = self.body_lines.join("\n");
            node.body = body.trim().to_string();
        }
        self.body_lines.clear();
    }

    fn finish(mut self) -> OrgRootNode {
        self.close_down_to(1);
        self.root
    }
}

fn non_empty(text: &str) -> Option<String> {
    if text.is_empty() {
        None
    } else {
        Some(text.to_string())
    }
}

fn is_planning_line(line: &str) -> bool {
    ["SCHEDULED:", "DEADLINE:", "CLOSED:"]
        .iter()
        .any(|keyword| line.contains(keyword))
}

fn apply_planning(node: &mut OrgNode, line: &str) {
    if let Some(stamp) = planning_stamp(line, "SCHEDULED:") {
        node.scheduled = Some(stamp);
    }
    if let Some(stamp) = planning_stamp(line, "DEADLINE:") {
        node.deadline = Some(stamp);
    }
    if let Some(stamp) = planning_stamp(line, "CLOSED:") {
        node.closed = Some(stamp);
    }
}

fn planning_stamp(line: &str, keyword: &str) -> Option<OrgDate> {
    let position = line.find(keyword)?;
    OrgDate::scan(&line[position + keyword.len()..])
}

fn parse_clock(text: &str) -> Option<OrgDateClock> {
    let stamp = OrgDate::parse(text)?;
    let end = stamp.end?;
    Some(OrgDateClock::new(stamp.start, end, stamp.active))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn keys() -> IndexSet<String> {
        ["TODO", "DONE"].iter().map(|key| key.to_string()).collect()
    }

    const SAMPLE: &str = "\
* DONE Ship release  :work:release:
CLOSED: [2024-02-01 Thu 14:02] SCHEDULED: <2024-01-30 Tue>
:PROPERTIES:
:CATEGORY: infra
:END:
:LOGBOOK:
CLOCK: [2024-01-31 Wed 09:00]--[2024-01-31 Wed 10:30] =>  1:30
- State \"DONE\"       from \"TODO\"       [2024-02-01 Thu 14:02]
:END:
Release notes drafted.
** TODO Follow up
* Plain note
Some body text.
";

    #[test]
    fn test_parses_heading_todo_and_tags() {
        let root = parse_document(SAMPLE, "a.org", &keys());
        assert_eq!(root.children.len(), 2);
        let first = &root.children[0];
        assert_eq!(first.todo.as_deref(), Some("DONE"));
        assert_eq!(first.heading, "Ship release");
        assert!(first.tags.contains("work"));
        assert!(first.tags.contains("release"));
    }

    #[test]
    fn test_parses_planning_and_drawers() {
        let root = parse_document(SAMPLE, "a.org", &keys());
        let first = &root.children[0];
        assert!(first.closed.is_some());
        assert!(first.scheduled.is_some());
        assert_eq!(first.properties.get("CATEGORY").map(String::as_str), Some("infra"));
        assert_eq!(first.clocks.len(), 1);
        assert_eq!(first.clocks[0].duration_minutes(), 90);
        assert_eq!(first.repeated_tasks.len(), 1);
        assert_eq!(first.repeated_tasks[0].after.as_deref(), Some("DONE"));
        assert_eq!(first.repeated_tasks[0].before.as_deref(), Some("TODO"));
    }

    #[test]
    fn test_nests_children_and_bodies() {
        let root = parse_document(SAMPLE, "a.org", &keys());
        let first = &root.children[0];
        assert_eq!(first.body, "Release notes drafted.");
        assert_eq!(first.children.len(), 1);
        assert_eq!(first.children[0].heading, "Follow up");
        assert_eq!(first.children[0].todo.as_deref(), Some("TODO"));

        let second = &root.children[1];
        assert_eq!(second.heading, "Plain note");
        assert_eq!(second.todo, None);
        assert_eq!(second.body, "Some body text.");
    }

    #[test]
    fn test_heading_without_match_for_todo_keys() {
        let root = parse_document("* Working title\n", "b.org", &keys());
        assert_eq!(root.children[0].heading, "Working title");
        assert_eq!(root.children[0].todo, None);
    }
}
