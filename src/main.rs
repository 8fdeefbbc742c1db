use std::path::Path;
use std::rc::Rc;

use clap::Parser;
use owo_colors::OwoColorize;

use orgq::cli::{generate_completions, Args, Commands};
use orgq::config::AppConfig;
use orgq::diagnostic::render_diagnostic;
use orgq::org::parse::parse_document;
use orgq::query::{compile_query, EvalContext, QueryError};
use orgq::render::render_lines;
use orgq::value::Value;
use orgq::{logging, render};

fn main() {
    let args = Args::parse();

    if let Some(Commands::Complete { shell }) = args.command {
        generate_completions(shell);
        return;
    }

    logging::init();
    let config = AppConfig::from_args(&args);

    let Some(query_text) = args.query.as_deref() else {
        error_message(&config, "no query given");
        std::process::exit(2);
    };
    if args.files.is_empty() {
        error_message(&config, "no input files given");
        std::process::exit(2);
    }
    if config.offset < 0 {
        error_message(&config, "--offset must be non-negative");
        std::process::exit(2);
    }

    let compiled = match compile_query(query_text) {
        Ok(compiled) => compiled,
        Err(error) => report_query_error(query_text, &error, &config),
    };

    let roots = match load_roots(&args.files, &config) {
        Ok(roots) => roots,
        Err(message) => {
            error_message(&config, &message);
            std::process::exit(1);
        }
    };

    let mut context = EvalContext::new();
    context.define("offset", Value::Int(config.offset));
    context.define("limit", Value::Int(config.max_results));
    context.define("todo_keys", Value::set_from_strs(config.todo_keys.iter()));
    context.define("done_keys", Value::set_from_strs(config.done_keys.iter()));
    for var in &args.vars {
        match var.split_once('=') {
            Some((name, value)) => context.define(name.trim(), Value::str(value)),
            None => {
                error_message(&config, &format!("invalid --var `{}`: expected NAME=VALUE", var));
                std::process::exit(2);
            }
        }
    }

    let input = vec![Value::list(roots)];
    let results = match compiled.execute(&input, &mut context) {
        Ok(results) => results,
        Err(error) => report_query_error(query_text, &error, &config),
    };

    print_results(results);
}

fn load_roots(files: &[std::path::PathBuf], config: &AppConfig) -> Result<Vec<Value>, String> {
    let task_keys = config.all_task_keys();
    let mut roots = Vec::with_capacity(files.len());
    for path in files {
        let text = std::fs::read_to_string(path)
            .map_err(|error| format!("failed to read {}: {}", path.display(), error))?;
        let filename = display_name(path);
        let root = parse_document(&text, &filename, &task_keys);
        roots.push(Value::Root(Rc::new(root)));
    }
    Ok(roots)
}

fn display_name(path: &Path) -> String {
    path.file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

fn print_results(results: Vec<Value>) {
    let org_blocks = {
        let flattened = render::flatten_result_stream(results.clone());
        !flattened.is_empty() && flattened.iter().all(render::is_org_value)
    };
    let lines = render_lines(results);
    for (index, line) in lines.iter().enumerate() {
        // Org blocks are multi-line; keep one blank line between them.
        if org_blocks && index > 0 {
            println!();
        }
        println!("{}", line);
    }
}

fn report_query_error(query_text: &str, error: &QueryError, config: &AppConfig) -> ! {
    if error.is_runtime() {
        error_message(config, &error.to_string());
    } else {
        eprint!(
            "{}",
            render_diagnostic(query_text, &error.to_diagnostic(), config.color_enabled)
        );
    }
    std::process::exit(1);
}

fn error_message(config: &AppConfig, message: &str) {
    if config.color_enabled {
        eprintln!("{}", message.red().bold());
    } else {
        eprintln!("{}", message);
    }
}
