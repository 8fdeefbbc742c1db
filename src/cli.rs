use clap::{CommandFactory, Parser, Subcommand};
use clap_complete::{generate, Shell};
use std::io;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "orgq")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "jq-style queries over Org-mode task archives", long_about = None)]
pub struct Args {
    /// Query expression, e.g. `.[] | select(.todo == "TODO") | .heading`
    #[arg(value_name = "QUERY")]
    pub query: Option<String>,

    /// Org-mode archive files to load
    #[arg(value_name = "FILE")]
    pub files: Vec<PathBuf>,

    /// Comma-separated list of incomplete task states
    #[arg(long = "todo-keys", value_name = "KEYS", default_value = "TODO")]
    pub todo_keys: String,

    /// Comma-separated list of completed task states
    #[arg(long = "done-keys", value_name = "KEYS", default_value = "DONE")]
    pub done_keys: String,

    /// Maximum number of results, exposed to queries as `$limit`
    #[arg(short = 'n', long = "max-results", value_name = "N", default_value_t = 10)]
    pub max_results: i64,

    /// Results to skip, exposed to queries as `$offset`
    #[arg(long = "offset", value_name = "N", default_value_t = 0)]
    pub offset: i64,

    /// Extra query variables as NAME=VALUE, exposed as `$NAME`
    #[arg(long = "var", value_name = "NAME=VALUE")]
    pub vars: Vec<String>,

    #[arg(long = "color", value_name = "WHEN", default_value = "auto")]
    pub color: ColorChoice,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Generate shell completions
    Complete {
        #[arg(value_name = "SHELL")]
        shell: Shell,
    },
}

#[derive(Debug, Clone, Copy)]
pub enum ColorChoice {
    Auto,
    Always,
    Never,
}

impl std::str::FromStr for ColorChoice {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "auto" => Ok(ColorChoice::Auto),
            "always" => Ok(ColorChoice::Always),
            "never" => Ok(ColorChoice::Never),
            _ => Err(format!(
                "Invalid color choice: {}. Must be 'auto', 'always', or 'never'",
                s
            )),
        }
    }
}

pub fn generate_completions(shell: Shell) {
    let mut cmd = Args::command();
    let bin_name = cmd.get_name().to_string();
    generate(shell, &mut cmd, &bin_name, &mut io::stdout());
}
