//! CLI argument parsing and command handlers

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};

use crate::config::AppConfig;
use crate::directories::DirectoryStore;
use crate::git;
use crate::ignore_file::{DEFAULT_IGNORE_CONTENT, read_ignore_file, write_ignore_file};
use crate::mcp::{McpHandler, run_mcp_server};
use crate::models::{SearchRequest, SearchResponse};
use crate::output;
use crate::scheduler;
use crate::search::SearchEngine;
use crate::server::{AppState, run_server};

/// codex-mcp: bounded code search over configured directories for AI agents
#[derive(Parser, Debug)]
#[command(
    name = "codex-mcp",
    version,
    about = "Bounded, containment-safe code search for AI agents (MCP + HTTP)",
    long_about = "codex-mcp searches a configured set of source directories for literal text \
                  and returns bounded, line-accurate snippets. It speaks MCP over stdio and \
                  streamable HTTP, and uses ripgrep when installed."
)]
pub struct Cli {
    /// Enable verbose logging (can be repeated for more verbosity)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Config file (defaults to ./data/config.toml when present)
    #[arg(long, global = true, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// SQLite database path (overrides [storage] db_path)
    #[arg(long, global = true, value_name = "FILE")]
    pub db: Option<PathBuf>,

    /// Ignore file path (overrides [storage] ignore_file_path)
    #[arg(long, global = true, value_name = "FILE")]
    pub ignore_file: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Start the HTTP server (MCP at POST /mcp, admin API under /api)
    Serve {
        /// Port to listen on (overrides [server] port)
        #[arg(short, long)]
        port: Option<u16>,

        /// Host to bind to (overrides [server] host)
        #[arg(long)]
        host: Option<String>,

        /// Do not run the git auto-pull scheduler
        #[arg(long)]
        no_scheduler: bool,
    },

    /// Run the MCP server on stdio
    Mcp,

    /// Search the enabled directories
    ///
    /// Examples:
    ///   codex-mcp search handleLogin
    ///   codex-mcp search "func Foo" --lang go --role backend --limit 5
    ///   codex-mcp search Foo --json --pretty
    Search {
        /// Literal text to find (case-insensitive)
        query: String,

        /// Language filter (go, py, ts, ...)
        #[arg(short, long)]
        lang: Option<String>,

        /// Only directories whose path contains this substring
        #[arg(long)]
        path_hint: Option<String>,

        /// frontend or backend
        #[arg(short, long)]
        role: Option<String>,

        /// Maximum matches (default 10, max 20)
        #[arg(short = 'n', long, default_value_t = 0)]
        limit: i64,

        /// Output format as JSON
        #[arg(long)]
        json: bool,

        /// Pretty-print JSON output (only with --json)
        #[arg(long)]
        pretty: bool,
    },

    /// Manage configured directories
    Dir {
        #[command(subcommand)]
        command: DirCommand,
    },

    /// Show or edit the ignore file
    Ignore {
        #[command(subcommand)]
        command: IgnoreCommand,
    },
}

#[derive(Subcommand, Debug)]
pub enum DirCommand {
    /// List all directories
    List {
        /// Output format as JSON
        #[arg(long)]
        json: bool,

        /// Pretty-print JSON output (only with --json)
        #[arg(long)]
        pretty: bool,
    },

    /// Add a directory to search
    Add {
        /// Existing directory
        path: PathBuf,

        /// Role tag: frontend-business, frontend-framework, backend-business, backend-framework
        #[arg(short, long)]
        role: String,

        /// Display name (defaults to the directory name)
        #[arg(long, default_value = "")]
        name: String,

        /// Primary language of the directory (informational)
        #[arg(short, long, default_value = "")]
        lang: String,
    },

    /// Remove a directory
    Remove { id: i64 },

    /// Include a directory in searches
    Enable { id: i64 },

    /// Exclude a directory from searches
    Disable { id: i64 },

    /// Set the git auto-pull interval in seconds (0 disables)
    AutoPull { id: i64, interval_secs: i64 },

    /// Run `git pull --ff-only` in a directory now
    Pull { id: i64 },
}

#[derive(Subcommand, Debug)]
pub enum IgnoreCommand {
    /// Print the current ignore file
    Show,

    /// Replace the ignore file with the contents of FILE
    Set { file: PathBuf },

    /// Restore the default ignore rules
    Reset,
}

impl Cli {
    /// Execute the parsed command
    pub fn execute(self) -> Result<()> {
        // Setup logging based on verbosity
        let log_level = match self.verbose {
            0 => "warn",   // Default: only warnings and errors
            1 => "info",   // -v: show info messages
            2 => "debug",  // -vv: show debug messages
            _ => "trace",  // -vvv: show trace messages
        };
        env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(log_level))
            .init();

        let mut config = AppConfig::load(self.config.as_deref())?;
        if let Some(db) = self.db {
            config.storage.db_path = db;
        }
        if let Some(ignore_file) = self.ignore_file {
            config.storage.ignore_file_path = ignore_file;
        }

        match self.command {
            Command::Serve { port, host, no_scheduler } => {
                if let Some(port) = port {
                    config.server.port = port;
                }
                if let Some(host) = host {
                    config.server.host = host;
                }
                if no_scheduler {
                    config.scheduler.enabled = false;
                }
                handle_serve(&config)
            }
            Command::Mcp => handle_mcp(&config),
            Command::Search { query, lang, path_hint, role, limit, json, pretty } => {
                let request = SearchRequest {
                    query,
                    language: lang,
                    path_hint,
                    role,
                    limit,
                };
                handle_search(&config, &request, json, pretty)
            }
            Command::Dir { command } => handle_dir(&config, command),
            Command::Ignore { command } => handle_ignore(&config, command),
        }
    }
}

fn open_store(config: &AppConfig) -> Result<DirectoryStore> {
    DirectoryStore::open(&config.storage.db_path)
}

fn build_engine(config: &AppConfig, store: DirectoryStore) -> SearchEngine {
    SearchEngine::new(Arc::new(store))
        .with_ignore_file(&config.storage.ignore_file_path)
        .with_accelerator(config.accelerator())
}

/// Handle the `serve` subcommand
fn handle_serve(config: &AppConfig) -> Result<()> {
    let addr = config.bind_address();
    log::info!("Starting HTTP server on {}", addr);

    let store = open_store(config)?;
    let engine = Arc::new(build_engine(config, store.clone()));
    let state = AppState::new(engine, store.clone(), config.storage.ignore_file_path.clone());

    let _scheduler = config.scheduler.enabled.then(|| {
        scheduler::spawn(store, Duration::from_secs(config.scheduler.tick_secs.max(1)))
    });

    println!("Starting codex-mcp HTTP server...");
    println!("  Address: http://{}", addr);
    println!("\nEndpoints:");
    println!("  POST   /mcp                              (MCP streamable HTTP)");
    println!("  POST   /mcp/search_internal_codebase");
    println!("  GET    /api/directories");
    println!("  POST   /api/directories");
    println!("  DELETE /api/directories/:id");
    println!("  PATCH  /api/directories/:id/enabled");
    println!("  PATCH  /api/directories/:id/git");
    println!("  POST   /api/directories/:id/git/pull");
    println!("  GET    /api/ignore-file");
    println!("  PUT    /api/ignore-file");
    println!("  GET    /health");
    println!("\nPress Ctrl+C to stop.");

    let runtime = tokio::runtime::Runtime::new()?;
    runtime.block_on(async { run_server(state, &addr).await })
}

/// Handle the `mcp` subcommand
fn handle_mcp(config: &AppConfig) -> Result<()> {
    let store = open_store(config)?;
    let handler = McpHandler::new(Arc::new(build_engine(config, store)));
    run_mcp_server(&handler)
}

/// Handle the `search` subcommand
fn handle_search(config: &AppConfig, request: &SearchRequest, json: bool, pretty: bool) -> Result<()> {
    let store = open_store(config)?;
    let engine = build_engine(config, store);

    let start = Instant::now();
    let matches = engine.search(request)?;
    log::info!("Search completed in {:?}", start.elapsed());

    if json {
        let response = SearchResponse { matches };
        let text = if pretty {
            serde_json::to_string_pretty(&response)?
        } else {
            serde_json::to_string(&response)?
        };
        println!("{}", text);
    } else {
        output::print_matches(&matches);
    }

    Ok(())
}

/// Handle `dir` subcommands
fn handle_dir(config: &AppConfig, command: DirCommand) -> Result<()> {
    let store = open_store(config)?;

    match command {
        DirCommand::List { json, pretty } => {
            let dirs = store.list()?;
            if json {
                let text = if pretty {
                    serde_json::to_string_pretty(&dirs)?
                } else {
                    serde_json::to_string(&dirs)?
                };
                println!("{}", text);
            } else {
                output::print_directories(&dirs);
            }
        }
        DirCommand::Add { path, role, name, lang } => {
            let dir = store.add(&name, &path.to_string_lossy(), &lang, &role)?;
            println!("Added directory {} ({}) with id {}", dir.name, dir.path, dir.id);
        }
        DirCommand::Remove { id } => {
            if !store.delete(id)? {
                anyhow::bail!("Directory {} not found", id);
            }
            println!("Removed directory {}", id);
        }
        DirCommand::Enable { id } => set_enabled(&store, id, true)?,
        DirCommand::Disable { id } => set_enabled(&store, id, false)?,
        DirCommand::AutoPull { id, interval_secs } => {
            if !store.set_git_interval(id, interval_secs)? {
                anyhow::bail!("Directory {} not found", id);
            }
            if interval_secs == 0 {
                println!("Auto-pull disabled for directory {}", id);
            } else {
                println!("Directory {} will be pulled every {}s", id, interval_secs);
            }
        }
        DirCommand::Pull { id } => {
            let dir = store
                .get(id)?
                .with_context(|| format!("Directory {} not found", id))?;
            let summary = git::pull(&dir.path)?;
            store.mark_pulled(id, chrono::Utc::now())?;
            println!("{}", summary);
        }
    }

    Ok(())
}

fn set_enabled(store: &DirectoryStore, id: i64, enabled: bool) -> Result<()> {
    if !store.set_enabled(id, enabled)? {
        anyhow::bail!("Directory {} not found", id);
    }
    println!(
        "Directory {} {}",
        id,
        if enabled { "enabled" } else { "disabled" }
    );
    Ok(())
}

/// Handle `ignore` subcommands
fn handle_ignore(config: &AppConfig, command: IgnoreCommand) -> Result<()> {
    let path = &config.storage.ignore_file_path;

    match command {
        IgnoreCommand::Show => {
            let data = read_ignore_file(path)?;
            print!("{}", String::from_utf8_lossy(&data));
        }
        IgnoreCommand::Set { file } => {
            let data = std::fs::read(&file)
                .with_context(|| format!("Failed to read {}", file.display()))?;
            write_ignore_file(path, &data)?;
            output::info(&format!("Ignore file updated from {}", file.display()));
        }
        IgnoreCommand::Reset => {
            write_ignore_file(path, DEFAULT_IGNORE_CONTENT.as_bytes())?;
            output::info("Ignore file reset to defaults");
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_search_flags() {
        let cli = Cli::try_parse_from([
            "codex-mcp", "-vv", "search", "Foo", "--lang", "go", "--role", "backend", "-n", "5", "--json",
        ])
        .unwrap();

        assert_eq!(cli.verbose, 2);
        match cli.command {
            Command::Search { query, lang, role, limit, json, .. } => {
                assert_eq!(query, "Foo");
                assert_eq!(lang.as_deref(), Some("go"));
                assert_eq!(role.as_deref(), Some("backend"));
                assert_eq!(limit, 5);
                assert!(json);
            }
            other => panic!("unexpected command: {:?}", other),
        }
    }

    #[test]
    fn test_parse_dir_auto_pull() {
        let cli = Cli::try_parse_from(["codex-mcp", "--db", "/tmp/x.db", "dir", "auto-pull", "3", "600"]).unwrap();
        assert_eq!(cli.db, Some(PathBuf::from("/tmp/x.db")));
        assert!(matches!(
            cli.command,
            Command::Dir {
                command: DirCommand::AutoPull { id: 3, interval_secs: 600 }
            }
        ));
    }
}
