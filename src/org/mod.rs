//! Org-mode domain values.
//!
//! The query core treats these as read-only descendants of a tree owned by
//! the loader; nodes are shared through `Rc` and never mutated.

pub mod date;
pub mod parse;

use std::fmt;
use std::rc::Rc;

use indexmap::{IndexMap, IndexSet};

use crate::org::date::{OrgDate, OrgDateClock, OrgDateRepeatedTask};

/// One heading in an Org archive, with its planning data and subtree.
#[derive(Debug, Clone, PartialEq)]
pub struct OrgNode {
    /// File the node was loaded from; the renderer's `# filename` header.
    pub filename: Rc<str>,
    pub heading: String,
    pub todo: Option<String>,
    pub tags: IndexSet<String>,
    pub level: usize,
    pub body: String,
    pub children: Vec<Rc<OrgNode>>,
    pub properties: IndexMap<String, String>,
    pub scheduled: Option<OrgDate>,
    pub deadline: Option<OrgDate>,
    pub closed: Option<OrgDate>,
    pub repeated_tasks: Vec<OrgDateRepeatedTask>,
    pub clocks: Vec<OrgDateClock>,
}

impl OrgNode {
    pub fn new(heading: impl Into<String>, level: usize) -> Self {
        Self {
            filename: Rc::from(""),
            heading: heading.into(),
            todo: None,
            tags: IndexSet::new(),
            level,
            body: String::new(),
            children: Vec::new(),
            properties: IndexMap::new(),
            scheduled: None,
            deadline: None,
            closed: None,
            repeated_tasks: Vec::new(),
            clocks: Vec::new(),
        }
    }
}

impl fmt::Display for OrgNode {
    /// Reformat the node as an Org block, planning lines and drawers included.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ", "*".repeat(self.level))?;
        if let Some(todo) = &self.todo {
            write!(f, "{} ", todo)?;
        }
        write!(f, "{}", self.heading)?;
        if !self.tags.is_empty() {
            let tags: Vec<&str> = self.tags.iter().map(String::as_str).collect();
            write!(f, "  :{}:", tags.join(":"))?;
        }

        let mut planning = Vec::new();
        if let Some(closed) = &self.closed {
            planning.push(format!("CLOSED: {}", closed));
        }
        if let Some(deadline) = &self.deadline {
            planning.push(format!("DEADLINE: {}", deadline));
        }
        if let Some(scheduled) = &self.scheduled {
            planning.push(format!("SCHEDULED: {}", scheduled));
        }
        if !planning.is_empty() {
            write!(f, "\n{}", planning.join(" "))?;
        }

        if !self.properties.is_empty() {
            write!(f, "\n:PROPERTIES:")?;
            for (key, value) in &self.properties {
                write!(f, "\n:{}: {}", key, value)?;
            }
            write!(f, "\n:END:")?;
        }

        for clock in &self.clocks {
            let minutes = clock.duration_minutes();
            write!(
                f,
                "\nCLOCK: {} => {}:{:02}",
                clock,
                minutes / 60,
                minutes % 60
            )?;
        }

        for task in &self.repeated_tasks {
            write!(
                f,
                "\n- State \"{}\"       from \"{}\"       {}",
                task.after.as_deref().unwrap_or(""),
                task.before.as_deref().unwrap_or(""),
                task
            )?;
        }

        if !self.body.is_empty() {
            write!(f, "\n{}", self.body)?;
        }

        for child in &self.children {
            write!(f, "\n{}", child)?;
        }
        Ok(())
    }
}

/// The file-level root: behaves as the list of its top-level headings.
#[derive(Debug, Clone, PartialEq)]
pub struct OrgRootNode {
    pub filename: String,
    pub children: Vec<Rc<OrgNode>>,
}

impl OrgRootNode {
    pub fn new(filename: impl Into<String>) -> Self {
        Self {
            filename: filename.into(),
            children: Vec::new(),
        }
    }
}

impl fmt::Display for OrgRootNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (index, child) in self.children.iter().enumerate() {
            if index > 0 {
                writeln!(f)?;
            }
            write!(f, "{}", child)?;
        }
        Ok(())
    }
}
