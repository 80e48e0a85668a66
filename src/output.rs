//! User-facing terminal output
//!
//! Colored messages and human-readable renderings of matches and
//! directories. Log output goes through `log`; this is for the CLI user.

use owo_colors::OwoColorize;

use crate::models::{Directory, Match};

/// Display a warning message to the user in yellow with padding
pub fn warn(message: &str) {
    eprintln!("\n{}\n", message.yellow());
}

/// Display an error message to the user in red with padding
///
/// # Example
/// ```ignore
/// output::error("Directory 3 not found");
/// ```
pub fn error(message: &str) {
    eprintln!("\n{}\n", message.red());
}

pub fn info(message: &str) {
    eprintln!("\n{}\n", message);
}

/// Print matches as `path:start-end` headers followed by numbered snippet lines
pub fn print_matches(matches: &[Match]) {
    if matches.is_empty() {
        println!("No matches found.");
        return;
    }

    for m in matches {
        println!(
            "{}:{}",
            m.path.cyan().bold(),
            format!("{}-{}", m.line_start, m.line_end).dimmed()
        );
        for (offset, line) in m.snippet.split('\n').enumerate() {
            println!("{:>6} | {}", (m.line_start + offset).dimmed(), line);
        }
        println!();
    }

    println!("{} match(es)", matches.len());
}

/// Print the directory table used by `dir list`
pub fn print_directories(dirs: &[Directory]) {
    if dirs.is_empty() {
        println!("No directories configured. Add one with 'codex-mcp dir add <path> --role <role>'.");
        return;
    }

    for dir in dirs {
        let state = if dir.enabled {
            "enabled".green().to_string()
        } else {
            "disabled".red().to_string()
        };
        let pull = if dir.git_auto_update_interval_sec > 0 {
            format!("auto-pull every {}s", dir.git_auto_update_interval_sec)
        } else {
            "auto-pull off".to_string()
        };

        println!(
            "{:>4}  {}  {}  [{}] {} ({})",
            dir.id.bold(),
            dir.name,
            dir.path.cyan(),
            dir.role,
            state,
            pull.dimmed()
        );
    }
}
