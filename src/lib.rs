//! codex-mcp: bounded code search over configured directories for AI agents
//!
//! A search takes a literal query, resolves the set of enabled directories
//! (optionally narrowed by role and path hint), and returns at most 20
//! line-accurate snippets within a 50 KiB response budget. Every reported
//! path is guaranteed to lie inside one of the searched roots.
//!
//! # Architecture
//!
//! - **Search engine** ([`search`]): scope resolution plus two interchangeable
//!   scan strategies, an external `rg` process or a built-in directory walker
//! - **Exclusion rules** ([`ignore_rules`], [`ignore_file`]): gitignore-style
//!   patterns re-read on every search, plus an always-on deny-set
//! - **Containment guard** ([`security`]): lexical path cleaning and root checks
//! - **Directory store** ([`directories`]): SQLite configuration of roots
//! - **Adapters**: MCP over stdio/HTTP ([`mcp`], [`server`]) and the CLI
//!
//! # Example Usage
//!
//! ```no_run
//! use std::sync::Arc;
//! use codex::{Directory, SearchEngine, SearchRequest};
//!
//! let dirs = vec![Directory::new(1, "/srv/repos/orders-api", "backend-business")];
//! let engine = SearchEngine::new(Arc::new(dirs));
//!
//! let matches = engine.search(&SearchRequest::new("handleLogin")).unwrap();
//! for m in matches {
//!     println!("{}:{}-{}", m.path, m.line_start, m.line_end);
//! }
//! ```

pub mod cli;
pub mod config;
pub mod directories;
pub mod error;
pub mod git;
pub mod ignore_file;
pub mod ignore_rules;
pub mod mcp;
pub mod models;
pub mod output;
pub mod scheduler;
pub mod search;
pub mod security;
pub mod server;
pub mod snippet;

// Re-export commonly used types
pub use directories::{DirectorySource, DirectoryStore};
pub use error::{PathError, SearchError};
pub use ignore_rules::IgnoreRules;
pub use models::{Directory, DirectoryRole, Language, Match, MatchReason, SearchRequest, SearchResponse, SearchRole};
pub use search::{BuiltinStrategy, RipgrepStrategy, ScanStrategy, SearchEngine};
