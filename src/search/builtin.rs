//! Built-in scan strategy: directory walk plus literal line matching

use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

use regex::{Regex, RegexBuilder};
use walkdir::{DirEntry, WalkDir};

use super::{MatchCollector, ScanRequest, ScanStrategy, content_match};
use crate::error::SearchError;
use crate::models::{Language, Match};
use crate::security::{clean_path, is_path_allowed};
use crate::snippet::decode_line;

/// Pure-Rust fallback used when no external engine is installed.
///
/// Roots are walked in the order given, each depth-first with entries sorted
/// by file name. Ignored or out-of-root directories are pruned without being
/// descended into.
#[derive(Debug, Clone, Copy, Default)]
pub struct BuiltinStrategy;

impl ScanStrategy for BuiltinStrategy {
    fn name(&self) -> &'static str {
        "builtin"
    }

    fn scan(&self, request: &ScanRequest<'_>) -> Result<Vec<Match>, SearchError> {
        let regex = RegexBuilder::new(&regex::escape(request.query))
            .case_insensitive(true)
            .build()?;

        let language = request.language.and_then(|tag| {
            let language = Language::from_tag(tag);
            if language.is_none() {
                log::debug!("Unknown language '{}', scanning all files", tag);
            }
            language
        });

        let mut collector = MatchCollector::new(request.limit, request.max_bytes);

        for root in request.roots {
            if collector.is_full() {
                break;
            }

            let walker = WalkDir::new(root)
                .follow_links(false)
                .sort_by_file_name()
                .into_iter()
                .filter_entry(|entry| admit_entry(entry, root, request));

            for entry in walker {
                if collector.is_full() {
                    break;
                }

                let entry = match entry {
                    Ok(entry) => entry,
                    Err(e) => {
                        log::debug!("Skipping unreadable entry: {}", e);
                        continue;
                    }
                };
                if !entry.file_type().is_file() {
                    continue;
                }

                let path = clean_path(entry.path());
                if let Some(language) = language {
                    if !language.matches_path(&path) {
                        continue;
                    }
                }

                scan_file(&path, &regex, &mut collector);
            }
        }

        Ok(collector.into_matches())
    }
}

/// Walk filter: containment first, then the ignore rules.
///
/// Rules see the path relative to `root`, so directories above the root
/// (a checkout living under `.../target/`, say) never exclude it.
fn admit_entry(entry: &DirEntry, root: &Path, request: &ScanRequest<'_>) -> bool {
    let path = clean_path(entry.path());

    if !is_path_allowed(&path, request.allowed_roots) {
        log::debug!("Skipping {:?}: outside allowed roots", path);
        return false;
    }

    if entry.depth() == 0 {
        return true;
    }
    let relative = entry.path().strip_prefix(root).unwrap_or(entry.path());
    !request.rules.should_ignore(relative, entry.file_type().is_dir())
}

/// Scan one file line by line, feeding matches into the collector
fn scan_file(path: &Path, regex: &Regex, collector: &mut MatchCollector) {
    let file = match File::open(path) {
        Ok(f) => f,
        Err(e) => {
            log::debug!("Skipping {:?}: {}", path, e);
            return;
        }
    };
    let mut reader = BufReader::new(file);

    if looks_binary(&mut reader) {
        log::trace!("Skipping binary file {:?}", path);
        return;
    }

    let mut buf = Vec::new();
    let mut line_no = 0;

    loop {
        buf.clear();
        match reader.read_until(b'\n', &mut buf) {
            Ok(0) => break,
            Ok(_) => {}
            Err(e) => {
                log::debug!("Stopped reading {:?}: {}", path, e);
                break;
            }
        }
        line_no += 1;

        let line = decode_line(&buf);
        if !regex.is_match(&line) {
            continue;
        }

        if !collector.push(content_match(path, line_no, &line)) || collector.is_full() {
            return;
        }
    }
}

/// NUL byte in the first buffered chunk
fn looks_binary<R: BufRead>(reader: &mut R) -> bool {
    match reader.fill_buf() {
        Ok(chunk) => chunk.contains(&0),
        Err(_) => false,
    }
}
