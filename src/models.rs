//! Core data models for codex-mcp
//!
//! These structures are the wire-level shapes shared by the search engine,
//! the directory store and the protocol adapters (MCP, HTTP, CLI).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum::{Display, EnumIter, EnumString, IntoEnumIterator};

/// Default number of matches returned when the caller gives no usable limit
pub const DEFAULT_LIMIT: usize = 10;

/// Hard ceiling on the number of matches in one response
pub const MAX_LIMIT: usize = 20;

/// Fixed per-match overhead used when accounting the response byte budget
pub const MATCH_OVERHEAD_BYTES: usize = 64;

/// A free-text search request as received from a protocol adapter
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct SearchRequest {
    /// Text to find (literal, case-insensitive substring)
    #[serde(default)]
    pub query: String,
    /// Optional language tag (e.g. "go", "py", "rust")
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub language: Option<String>,
    /// Optional substring that a configured directory path must contain
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path_hint: Option<String>,
    /// Optional search role ("frontend" / "backend")
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,
    /// Requested result count; non-positive means "use the default"
    #[serde(default)]
    pub limit: i64,
}

impl SearchRequest {
    pub fn new(query: impl Into<String>) -> Self {
        Self {
            query: query.into(),
            ..Default::default()
        }
    }

    /// Limit clamped into `[1, MAX_LIMIT]`, non-positive values become `DEFAULT_LIMIT`
    pub fn effective_limit(&self) -> usize {
        if self.limit <= 0 {
            DEFAULT_LIMIT
        } else {
            (self.limit as u64).min(MAX_LIMIT as u64) as usize
        }
    }

    /// Language tag with surrounding whitespace removed, `None` when blank
    pub fn language_tag(&self) -> Option<&str> {
        non_blank(self.language.as_deref())
    }

    pub fn path_hint(&self) -> Option<&str> {
        non_blank(self.path_hint.as_deref())
    }

    pub fn role(&self) -> Option<&str> {
        non_blank(self.role.as_deref())
    }
}

fn non_blank(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}

/// Why a match was reported
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum MatchReason {
    /// The query occurs in the file content
    Content,
}

/// One line-level search hit with its surrounding context
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Match {
    /// Absolute path of the file
    pub path: String,
    /// First line covered by the snippet (1-indexed, inclusive)
    pub line_start: usize,
    /// Last line covered by the snippet (1-indexed, inclusive)
    pub line_end: usize,
    /// Contiguous block of source lines around the hit
    pub snippet: String,
    pub match_reason: MatchReason,
}

impl Match {
    /// Size charged against the response byte budget
    pub fn budget_size(&self) -> usize {
        self.path.len() + self.snippet.len() + MATCH_OVERHEAD_BYTES
    }
}

/// Response body for search endpoints and the MCP search tool
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SearchResponse {
    pub matches: Vec<Match>,
}

/// Role tag stored on a configured directory
#[derive(
    Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, EnumString, Display, EnumIter,
)]
#[serde(rename_all = "kebab-case")]
#[strum(serialize_all = "kebab-case")]
pub enum DirectoryRole {
    FrontendBusiness,
    FrontendFramework,
    BackendBusiness,
    BackendFramework,
}

impl DirectoryRole {
    pub fn all() -> Vec<DirectoryRole> {
        DirectoryRole::iter().collect()
    }
}

/// Scope selector accepted by search requests
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, EnumString, Display, EnumIter)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum SearchRole {
    Frontend,
    Backend,
}

impl SearchRole {
    /// Directory role tags that belong to this search role
    pub fn directory_roles(&self) -> [DirectoryRole; 2] {
        match self {
            SearchRole::Frontend => [DirectoryRole::FrontendBusiness, DirectoryRole::FrontendFramework],
            SearchRole::Backend => [DirectoryRole::BackendBusiness, DirectoryRole::BackendFramework],
        }
    }

    /// Whether a stored directory role tag falls inside this search role
    pub fn includes(&self, directory_role: &str) -> bool {
        self.directory_roles()
            .iter()
            .any(|r| r.to_string() == directory_role.trim())
    }

    pub fn label(&self) -> &'static str {
        match self {
            SearchRole::Frontend => "Frontend",
            SearchRole::Backend => "Backend",
        }
    }

    pub fn all() -> Vec<SearchRole> {
        SearchRole::iter().collect()
    }
}

/// A configured root directory
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Directory {
    pub id: i64,
    pub name: String,
    /// Absolute, cleaned path
    pub path: String,
    pub language: String,
    /// Directory role tag (see [`DirectoryRole`]); kept as text so unknown tags survive
    pub role: String,
    pub enabled: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
    /// Auto-pull interval in seconds (0 = disabled)
    #[serde(default)]
    pub git_auto_update_interval_sec: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub git_last_updated_at: Option<DateTime<Utc>>,
}

impl Directory {
    /// Convenience constructor for an enabled directory with no pull schedule
    pub fn new(id: i64, path: impl Into<String>, role: impl Into<String>) -> Self {
        let path = path.into();
        Self {
            id,
            name: path.clone(),
            path,
            language: String::new(),
            role: role.into(),
            enabled: true,
            updated_at: None,
            git_auto_update_interval_sec: 0,
            git_last_updated_at: None,
        }
    }

    /// Whether an auto-pull is due at `now`
    pub fn is_pull_due(&self, now: DateTime<Utc>) -> bool {
        if !self.enabled || self.git_auto_update_interval_sec <= 0 {
            return false;
        }
        match self.git_last_updated_at {
            None => true,
            Some(last) => (now - last).num_seconds() >= self.git_auto_update_interval_sec,
        }
    }
}

/// Programming / markup language understood by the language filter
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, EnumIter)]
#[serde(rename_all = "lowercase")]
pub enum Language {
    Go,
    Rust,
    Python,
    JavaScript,
    TypeScript,
    Java,
    C,
    Cpp,
    CSharp,
    Ruby,
    PHP,
    Swift,
    Kotlin,
    Scala,
    Vue,
    Shell,
    Html,
    Css,
    Json,
    Yaml,
}

impl Language {
    /// Resolve a user-supplied tag (case-insensitive, common aliases accepted)
    pub fn from_tag(tag: &str) -> Option<Self> {
        match tag.trim().to_lowercase().as_str() {
            "go" | "golang" => Some(Language::Go),
            "rust" | "rs" => Some(Language::Rust),
            "python" | "py" => Some(Language::Python),
            "javascript" | "js" | "jsx" => Some(Language::JavaScript),
            "typescript" | "ts" | "tsx" => Some(Language::TypeScript),
            "java" => Some(Language::Java),
            "c" => Some(Language::C),
            "cpp" | "c++" => Some(Language::Cpp),
            "csharp" | "c#" | "cs" => Some(Language::CSharp),
            "ruby" | "rb" => Some(Language::Ruby),
            "php" => Some(Language::PHP),
            "swift" => Some(Language::Swift),
            "kotlin" | "kt" => Some(Language::Kotlin),
            "scala" => Some(Language::Scala),
            "vue" => Some(Language::Vue),
            "sh" | "shell" | "bash" => Some(Language::Shell),
            "html" => Some(Language::Html),
            "css" => Some(Language::Css),
            "json" => Some(Language::Json),
            "yaml" | "yml" => Some(Language::Yaml),
            _ => None,
        }
    }

    /// File extensions (lowercase, without dot) scanned by the built-in strategy
    pub fn extensions(&self) -> &'static [&'static str] {
        match self {
            Language::Go => &["go"],
            Language::Rust => &["rs"],
            Language::Python => &["py"],
            Language::JavaScript => &["js", "jsx", "mjs", "cjs"],
            Language::TypeScript => &["ts", "tsx"],
            Language::Java => &["java"],
            Language::C => &["c", "h"],
            Language::Cpp => &["cpp", "cc", "cxx", "hpp", "hh", "hxx"],
            Language::CSharp => &["cs"],
            Language::Ruby => &["rb"],
            Language::PHP => &["php"],
            Language::Swift => &["swift"],
            Language::Kotlin => &["kt", "kts"],
            Language::Scala => &["scala"],
            Language::Vue => &["vue"],
            Language::Shell => &["sh", "bash"],
            Language::Html => &["html", "htm"],
            Language::Css => &["css"],
            Language::Json => &["json"],
            Language::Yaml => &["yml", "yaml"],
        }
    }

    /// File type name in ripgrep's `-t` vocabulary
    pub fn ripgrep_type(&self) -> &'static str {
        match self {
            Language::Go => "go",
            Language::Rust => "rust",
            Language::Python => "py",
            Language::JavaScript => "js",
            Language::TypeScript => "ts",
            Language::Java => "java",
            Language::C => "c",
            Language::Cpp => "cpp",
            Language::CSharp => "csharp",
            Language::Ruby => "ruby",
            Language::PHP => "php",
            Language::Swift => "swift",
            Language::Kotlin => "kotlin",
            Language::Scala => "scala",
            Language::Vue => "vue",
            Language::Shell => "sh",
            Language::Html => "html",
            Language::Css => "css",
            Language::Json => "json",
            Language::Yaml => "yaml",
        }
    }

    /// Human-readable name
    pub fn label(&self) -> &'static str {
        match self {
            Language::Go => "Go",
            Language::Rust => "Rust",
            Language::Python => "Python",
            Language::JavaScript => "JavaScript",
            Language::TypeScript => "TypeScript",
            Language::Java => "Java",
            Language::C => "C",
            Language::Cpp => "C++",
            Language::CSharp => "C#",
            Language::Ruby => "Ruby",
            Language::PHP => "PHP",
            Language::Swift => "Swift",
            Language::Kotlin => "Kotlin",
            Language::Scala => "Scala",
            Language::Vue => "Vue",
            Language::Shell => "Shell",
            Language::Html => "HTML",
            Language::Css => "CSS",
            Language::Json => "JSON",
            Language::Yaml => "YAML",
        }
    }

    /// Whether a path carries one of this language's extensions
    pub fn matches_path(&self, path: &std::path::Path) -> bool {
        let ext = match path.extension().and_then(|e| e.to_str()) {
            Some(ext) => ext.to_lowercase(),
            None => return false,
        };
        self.extensions().contains(&ext.as_str())
    }

    pub fn all() -> Vec<Language> {
        Language::iter().collect()
    }
}
