//! Search orchestration
//!
//! A search resolves its directory scope from the configured directories,
//! re-reads the ignore file, picks a [`ScanStrategy`] and returns a bounded
//! list of [`Match`]es in discovery order.
//!
//! # Strategies
//!
//! - [`RipgrepStrategy`]: delegates to an external `rg` process and
//!   re-validates every reported path
//! - [`BuiltinStrategy`]: depth-first walk plus a case-insensitive literal
//!   line scan
//!
//! Both share the same limits: at most `limit` matches and at most
//! [`MAX_RESPONSE_BYTES`] of `path + snippet + 64` per match.

pub mod builtin;
pub mod ripgrep;

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use crate::directories::DirectorySource;
use crate::error::SearchError;
use crate::ignore_file::read_ignore_file;
use crate::ignore_rules::IgnoreRules;
use crate::models::{Match, MatchReason, SearchRequest, SearchRole};
use crate::security::clean_path;
use crate::snippet::{MAX_SNIPPET_LINES, build_snippet, snippet_span};

pub use builtin::BuiltinStrategy;
pub use ripgrep::RipgrepStrategy;

/// Combined `path + snippet + overhead` budget for one response
pub const MAX_RESPONSE_BYTES: usize = 50 * 1024;

/// Program name of the external search engine
pub const DEFAULT_ACCELERATOR: &str = "rg";

/// Everything a strategy needs for one scan
#[derive(Debug, Clone, Copy)]
pub struct ScanRequest<'a> {
    /// Literal query text (escaped by the strategy)
    pub query: &'a str,
    pub language: Option<&'a str>,
    /// Ignore file passed verbatim to the external engine
    pub ignore_file: Option<&'a Path>,
    /// Parsed rules for the built-in walker
    pub rules: &'a IgnoreRules,
    /// Root directories to search, in configuration order
    pub roots: &'a [PathBuf],
    /// Cleaned roots used as the containment allow-list
    pub allowed_roots: &'a [PathBuf],
    pub limit: usize,
    pub max_bytes: usize,
}

/// An engine that enumerates matches for a query across a set of roots
pub trait ScanStrategy {
    fn name(&self) -> &'static str;
    fn scan(&self, request: &ScanRequest<'_>) -> Result<Vec<Match>, SearchError>;
}

/// Accumulates matches while enforcing the count and byte budgets
#[derive(Debug)]
pub struct MatchCollector {
    limit: usize,
    max_bytes: usize,
    used_bytes: usize,
    exhausted: bool,
    matches: Vec<Match>,
}

impl MatchCollector {
    pub fn new(limit: usize, max_bytes: usize) -> Self {
        Self {
            limit,
            max_bytes,
            used_bytes: 0,
            exhausted: false,
            matches: Vec::new(),
        }
    }

    /// No further match will be accepted
    pub fn is_full(&self) -> bool {
        self.exhausted || self.matches.len() >= self.limit || self.used_bytes >= self.max_bytes
    }

    /// Add a match if it fits; the first match that would overflow the byte
    /// budget closes the collector.
    pub fn push(&mut self, m: Match) -> bool {
        if self.is_full() {
            return false;
        }
        let size = m.budget_size();
        if self.used_bytes + size > self.max_bytes {
            self.exhausted = true;
            return false;
        }
        self.used_bytes += size;
        self.matches.push(m);
        true
    }

    pub fn len(&self) -> usize {
        self.matches.len()
    }

    pub fn is_empty(&self) -> bool {
        self.matches.is_empty()
    }

    pub fn used_bytes(&self) -> usize {
        self.used_bytes
    }

    pub fn into_matches(self) -> Vec<Match> {
        self.matches
    }
}

/// Build a content match for `line_no` of `path`, reading the snippet from disk
pub(crate) fn content_match(path: &Path, line_no: usize, line_text: &str) -> Match {
    let snippet = build_snippet(path, line_no, line_text, MAX_SNIPPET_LINES);
    let (line_start, line_end) = snippet_span(line_no, snippet.split('\n').count());

    Match {
        path: path.to_string_lossy().into_owned(),
        line_start,
        line_end,
        snippet,
        match_reason: MatchReason::Content,
    }
}

/// Write-once flag; `first()` is true for exactly one caller
#[derive(Debug, Default)]
pub struct OnceFlag(AtomicBool);

impl OnceFlag {
    pub fn first(&self) -> bool {
        self.0
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_ok()
    }

    pub fn is_set(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Resolved scope and fresh rules for one search
struct ScanPlan {
    roots: Vec<PathBuf>,
    allowed_roots: Vec<PathBuf>,
    rules: IgnoreRules,
    ignore_file: Option<PathBuf>,
}

/// Entry point for searches over the configured directories
pub struct SearchEngine {
    directories: Arc<dyn DirectorySource>,
    ignore_file: Option<PathBuf>,
    /// External engine program; `None` always uses the built-in scanner
    accelerator: Option<String>,
    accelerator_notice: OnceFlag,
}

impl SearchEngine {
    pub fn new(directories: Arc<dyn DirectorySource>) -> Self {
        Self {
            directories,
            ignore_file: None,
            accelerator: Some(DEFAULT_ACCELERATOR.to_string()),
            accelerator_notice: OnceFlag::default(),
        }
    }

    /// Ignore file re-read on every search
    pub fn with_ignore_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.ignore_file = Some(path.into());
        self
    }

    /// External engine to prefer when it is installed (`None` disables it)
    pub fn with_accelerator(mut self, program: Option<String>) -> Self {
        self.accelerator = program.filter(|p| !p.trim().is_empty());
        self
    }

    pub fn ignore_file(&self) -> Option<&Path> {
        self.ignore_file.as_deref()
    }

    /// Whether the "accelerator not installed" hint has been logged
    pub fn accelerator_notice_emitted(&self) -> bool {
        self.accelerator_notice.is_set()
    }

    /// Pick the accelerated strategy when its program is on this machine.
    ///
    /// The lookup runs on every call; only the fallback hint is remembered.
    pub fn select_strategy(&self) -> Box<dyn ScanStrategy> {
        if let Some(program) = self.accelerator.as_deref() {
            if let Some(path) = RipgrepStrategy::locate(program) {
                return Box::new(RipgrepStrategy::new(path));
            }
            if self.accelerator_notice.first() {
                log::warn!(
                    "[search] {} not found, using built-in search. Install ripgrep for faster searches: \
                     https://github.com/BurntSushi/ripgrep#installation",
                    program
                );
            }
        }
        Box::new(BuiltinStrategy)
    }

    /// Run a search with the automatically selected strategy.
    ///
    /// The strategy is only chosen once there is something to scan.
    pub fn search(&self, request: &SearchRequest) -> Result<Vec<Match>, SearchError> {
        let Some(plan) = self.plan(request)? else {
            return Ok(Vec::new());
        };
        let strategy = self.select_strategy();
        self.execute(request, &plan, strategy.as_ref())
    }

    /// Run a search with an explicit strategy
    pub fn search_with_strategy(
        &self,
        request: &SearchRequest,
        strategy: &dyn ScanStrategy,
    ) -> Result<Vec<Match>, SearchError> {
        match self.plan(request)? {
            Some(plan) => self.execute(request, &plan, strategy),
            None => Ok(Vec::new()),
        }
    }

    /// Scope and rules for a request, `None` when there is nothing to scan
    fn plan(&self, request: &SearchRequest) -> Result<Option<ScanPlan>, SearchError> {
        if request.query.trim().is_empty() {
            log::debug!("Empty query, returning no matches");
            return Ok(None);
        }

        let roots = self.resolve_scope(request)?;
        if roots.is_empty() {
            log::info!("Search scope is empty, returning no matches");
            return Ok(None);
        }
        let allowed_roots = roots.iter().map(|r| clean_path(r)).collect();
        let (rules, ignore_file) = self.load_rules();

        Ok(Some(ScanPlan {
            roots,
            allowed_roots,
            rules,
            ignore_file,
        }))
    }

    fn execute(
        &self,
        request: &SearchRequest,
        plan: &ScanPlan,
        strategy: &dyn ScanStrategy,
    ) -> Result<Vec<Match>, SearchError> {
        let limit = request.effective_limit();
        log::info!(
            "Searching '{}' in {} directories with {} strategy (limit={})",
            request.query,
            plan.roots.len(),
            strategy.name(),
            limit
        );

        let scan = ScanRequest {
            query: &request.query,
            language: request.language_tag(),
            ignore_file: plan.ignore_file.as_deref(),
            rules: &plan.rules,
            roots: &plan.roots,
            allowed_roots: &plan.allowed_roots,
            limit,
            max_bytes: MAX_RESPONSE_BYTES,
        };

        let matches = strategy.scan(&scan)?;
        log::info!("Search found {} matches", matches.len());
        Ok(matches)
    }

    /// Enabled directories, narrowed by role and path hint
    pub fn resolve_scope(&self, request: &SearchRequest) -> Result<Vec<PathBuf>, SearchError> {
        let mut dirs = self.directories.enabled_directories()?;
        if dirs.is_empty() {
            return Ok(Vec::new());
        }

        if let Some(role) = request.role() {
            match role.parse::<SearchRole>() {
                Ok(role) => dirs.retain(|d| role.includes(&d.role)),
                Err(_) => log::debug!("Unknown search role '{}', searching all roles", role),
            }
        }
        if dirs.is_empty() {
            return Ok(Vec::new());
        }

        if let Some(hint) = request.path_hint() {
            dirs.retain(|d| d.path.contains(hint));
        }

        Ok(dirs.into_iter().map(|d| PathBuf::from(d.path)).collect())
    }

    /// Fresh rules for this search, plus the ignore file path if it is usable
    fn load_rules(&self) -> (IgnoreRules, Option<PathBuf>) {
        let Some(path) = self.ignore_file.as_ref() else {
            return (IgnoreRules::empty(), None);
        };

        match read_ignore_file(path) {
            Ok(data) => {
                let usable = path.exists().then(|| path.clone());
                (IgnoreRules::parse(&data), usable)
            }
            Err(e) => {
                log::warn!("Failed to read ignore file, using built-in rules only: {:#}", e);
                (IgnoreRules::empty(), None)
            }
        }
    }
}
