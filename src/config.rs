use indexmap::IndexSet;

use crate::cli::{Args, ColorChoice};

pub struct AppConfig {
    pub color_enabled: bool,
    pub todo_keys: IndexSet<String>,
    pub done_keys: IndexSet<String>,
    pub max_results: i64,
    pub offset: i64,
}

impl AppConfig {
    pub fn from_args(args: &Args) -> Self {
        let color_enabled = match args.color {
            ColorChoice::Always => true,
            ColorChoice::Never => false,
            ColorChoice::Auto => atty::is(atty::Stream::Stdout) && atty::is(atty::Stream::Stderr),
        };

        AppConfig {
            color_enabled,
            todo_keys: split_keys(&args.todo_keys),
            done_keys: split_keys(&args.done_keys),
            max_results: args.max_results,
            offset: args.offset,
        }
    }

    /// Every keyword the Org reader recognizes at the head of a heading.
    pub fn all_task_keys(&self) -> IndexSet<String> {
        self.todo_keys
            .iter()
            .chain(self.done_keys.iter())
            .cloned()
            .collect()
    }
}

fn split_keys(keys: &str) -> IndexSet<String> {
    keys.split(',')
        .map(str::trim)
        .filter(|key| !key.is_empty())
        .map(str::to_string)
        .collect()
}
