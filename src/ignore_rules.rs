//! Gitignore-style exclusion rules
//!
//! This is deliberately a name / segment / glob matcher and not the full
//! gitignore language: there is no negation (`!pattern`) and no anchoring to
//! a particular root. It covers the subset used by the default ignore file:
//! bare directory or file names (`node_modules`, `dist/`), relative segments
//! (`docs/generated`) and base-name globs (`*.log`, `**/*.tmp`).
//!
//! Patterns are evaluated independently and combined with OR, so their order
//! does not matter.

use globset::{Glob, GlobMatcher};
use std::path::Path;

/// Directory names that are excluded from every search regardless of rules
pub const DENY_SET: &[&str] = &[".git", "node_modules", "target", "vendor"];

/// Prefix meaning "at any depth" in a glob pattern
const ANY_DEPTH_PREFIX: &str = "**/";

/// A single parsed ignore pattern
#[derive(Debug, Clone)]
pub enum IgnorePattern {
    /// Wildcard pattern matched against the base name
    Glob {
        pattern: String,
        matcher: GlobMatcher,
        /// Same glob with a leading `**/` removed, if it had one
        any_depth: Option<GlobMatcher>,
    },
    /// Literal name or relative path segment (trailing `/` removed)
    Segment(String),
}

impl IgnorePattern {
    /// Build a pattern from one trimmed, non-comment line.
    ///
    /// Returns `None` for lines that cannot match anything (an empty segment
    /// or a glob that fails to compile).
    pub fn parse(line: &str) -> Option<Self> {
        let pattern = to_slash(line.trim());
        if pattern.is_empty() {
            return None;
        }

        if is_glob(&pattern) {
            let matcher = match compile_glob(&pattern) {
                Some(m) => m,
                None => {
                    log::debug!("Skipping invalid ignore glob: {}", pattern);
                    return None;
                }
            };
            let any_depth = pattern
                .strip_prefix(ANY_DEPTH_PREFIX)
                .and_then(compile_glob);
            return Some(IgnorePattern::Glob {
                pattern,
                matcher,
                any_depth,
            });
        }

        let segment = pattern.trim_end_matches('/');
        if segment.is_empty() {
            return None;
        }
        Some(IgnorePattern::Segment(segment.to_string()))
    }

    /// Whether this pattern excludes the slash-separated `path` with base name `base`
    pub fn matches(&self, path: &str, base: &str) -> bool {
        match self {
            IgnorePattern::Glob {
                matcher, any_depth, ..
            } => {
                matcher.is_match(base)
                    || any_depth.as_ref().is_some_and(|m| m.is_match(base))
            }
            IgnorePattern::Segment(segment) => {
                path.contains(&format!("/{}/", segment))
                    || path.ends_with(&format!("/{}", segment))
                    || path == segment
                    || base == segment
            }
        }
    }
}

/// Parsed ignore file plus the always-on deny-set
#[derive(Debug, Clone, Default)]
pub struct IgnoreRules {
    patterns: Vec<IgnorePattern>,
}

impl IgnoreRules {
    /// Rules with no user patterns (the deny-set still applies)
    pub fn empty() -> Self {
        Self::default()
    }

    /// Parse raw gitignore-style content.
    ///
    /// Blank lines and lines starting with `#` are discarded; every other
    /// trimmed line becomes a pattern, in file order. Invalid UTF-8 is
    /// decoded lossily.
    pub fn parse(data: &[u8]) -> Self {
        let text = String::from_utf8_lossy(data);
        let patterns = text
            .lines()
            .map(str::trim)
            .filter(|line| !line.is_empty() && !line.starts_with('#'))
            .filter_map(IgnorePattern::parse)
            .collect();

        Self { patterns }
    }

    pub fn patterns(&self) -> &[IgnorePattern] {
        &self.patterns
    }

    /// Whether `path` (absolute or root-relative) should be skipped.
    ///
    /// `_is_dir` is accepted for API symmetry with gitignore; directory-only
    /// patterns are not distinguished by this matcher.
    pub fn should_ignore(&self, path: &Path, _is_dir: bool) -> bool {
        let path = to_slash(&path.to_string_lossy());
        let base = base_name(&path);

        if path.split('/').any(|segment| DENY_SET.contains(&segment)) {
            return true;
        }

        self.patterns.iter().any(|p| p.matches(&path, base))
    }
}

fn is_glob(pattern: &str) -> bool {
    pattern.contains('*') || pattern.contains('?')
}

fn compile_glob(pattern: &str) -> Option<GlobMatcher> {
    Glob::new(pattern).ok().map(|g| g.compile_matcher())
}

fn to_slash(path: &str) -> String {
    if std::path::MAIN_SEPARATOR == '\\' {
        path.replace('\\', "/")
    } else {
        path.to_string()
    }
}

fn base_name(path: &str) -> &str {
    let trimmed = path.trim_end_matches('/');
    match trimmed.rfind('/') {
        Some(idx) => &trimmed[idx + 1..],
        None => trimmed,
    }
}
