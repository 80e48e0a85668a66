//! Accelerated scan strategy backed by an external `rg` process
//!
//! The process output is treated as untrusted: every reported path is
//! cleaned and checked against the allowed roots before it becomes a match.

use std::ffi::OsString;
use std::io::{BufRead, BufReader, Read};
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};
use std::sync::OnceLock;

use regex::Regex;

use super::{MatchCollector, ScanRequest, ScanStrategy, content_match};
use crate::error::SearchError;
use crate::ignore_rules::DENY_SET;
use crate::models::{Language, Match};
use crate::security::{clean_path, is_path_allowed};
use crate::snippet::decode_line;

/// `path:line:content`
static OUTPUT_LINE: OnceLock<Regex> = OnceLock::new();

fn output_line_regex() -> &'static Regex {
    OUTPUT_LINE.get_or_init(|| Regex::new(r"^(.+?):(\d+):(.*)$").expect("static pattern"))
}

#[derive(Debug, Clone)]
pub struct RipgrepStrategy {
    program: PathBuf,
}

impl RipgrepStrategy {
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
        }
    }

    pub fn program(&self) -> &Path {
        &self.program
    }

    /// Find `program` as given (if it has a directory part) or on `PATH`
    pub fn locate(program: &str) -> Option<PathBuf> {
        let candidate = Path::new(program);
        if candidate.components().count() > 1 {
            return candidate.is_file().then(|| candidate.to_path_buf());
        }

        let paths = std::env::var_os("PATH")?;
        std::env::split_paths(&paths).find_map(|dir| {
            let full = dir.join(program);
            if full.is_file() {
                return Some(full);
            }
            if cfg!(windows) {
                let exe = dir.join(format!("{}.exe", program));
                if exe.is_file() {
                    return Some(exe);
                }
            }
            None
        })
    }

    /// Whether `program` can be found on this machine
    pub fn is_available(program: &str) -> bool {
        Self::locate(program).is_some()
    }

    /// Command-line arguments for one scan
    pub fn build_args(request: &ScanRequest<'_>) -> Vec<OsString> {
        let mut args: Vec<OsString> = vec!["-n".into(), "--no-heading".into(), "-i".into()];
        // Only the deny-set and the configured ignore file decide what is skipped;
        // --no-ignore leaves --ignore-file active
        args.push("--no-ignore".into());
        args.push("--hidden".into());

        for name in DENY_SET {
            args.push("-g".into());
            args.push(format!("!{}", name).into());
        }

        if let Some(file) = request.ignore_file {
            args.push("--ignore-file".into());
            args.push(file.as_os_str().to_owned());
        }

        if let Some(tag) = request.language {
            match Language::from_tag(tag) {
                Some(language) => {
                    args.push("-t".into());
                    args.push(language.ripgrep_type().into());
                }
                None => log::debug!("Unknown language '{}', not passing a type filter", tag),
            }
        }

        args.push("--".into());
        args.push(regex::escape(request.query).into());
        args.extend(request.roots.iter().map(|root| root.as_os_str().to_owned()));
        args
    }
}

impl ScanStrategy for RipgrepStrategy {
    fn name(&self) -> &'static str {
        "ripgrep"
    }

    fn scan(&self, request: &ScanRequest<'_>) -> Result<Vec<Match>, SearchError> {
        let program = self.program.display().to_string();
        let args = Self::build_args(request);
        log::debug!("Running {} {:?}", program, args);

        let mut child = Command::new(&self.program)
            .args(&args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|source| SearchError::Spawn {
                program: program.clone(),
                source,
            })?;

        // Drained on its own thread so a chatty stderr cannot block stdout
        let stderr = child.stderr.take();
        let stderr_reader = std::thread::spawn(move || {
            let mut text = String::new();
            if let Some(mut stderr) = stderr {
                let _ = stderr.read_to_string(&mut text);
            }
            text
        });

        let mut collector = MatchCollector::new(request.limit, request.max_bytes);
        let mut stopped_early = false;

        if let Some(stdout) = child.stdout.take() {
            let mut reader = BufReader::new(stdout);
            let mut buf = Vec::new();
            loop {
                buf.clear();
                match reader.read_until(b'\n', &mut buf) {
                    Ok(0) => break,
                    Ok(_) => {}
                    Err(e) => {
                        log::debug!("Stopped reading {} output: {}", program, e);
                        break;
                    }
                }
                collect_line(&decode_line(&buf), request.allowed_roots, &mut collector);
                if collector.is_full() {
                    stopped_early = true;
                    break;
                }
            }
        }

        if stopped_early {
            let _ = child.kill();
        }
        let status = child.wait().map_err(|source| SearchError::Spawn {
            program: program.clone(),
            source,
        })?;
        let stderr = stderr_reader.join().unwrap_or_default();

        // 0 = matches, 1 = no matches; a killed process is expected after early stop
        if !stopped_early && !matches!(status.code(), Some(0) | Some(1)) {
            return Err(SearchError::Subprocess {
                program,
                code: status.code(),
                stderr: stderr.trim().to_string(),
            });
        }

        Ok(collector.into_matches())
    }
}

/// A parsed `path:line:content` output line
#[derive(Debug, PartialEq, Eq)]
pub(crate) struct OutputLine<'a> {
    pub path: &'a str,
    pub line: usize,
    pub content: &'a str,
}

pub(crate) fn parse_output_line(line: &str) -> Option<OutputLine<'_>> {
    let caps = output_line_regex().captures(line)?;
    let line_no = caps.get(2)?.as_str().parse::<usize>().ok().filter(|n| *n > 0)?;
    Some(OutputLine {
        path: caps.get(1)?.as_str(),
        line: line_no,
        content: caps.get(3)?.as_str(),
    })
}

/// Turn one output line into a match if it parses and stays inside the roots
pub(crate) fn collect_line(line: &str, allowed_roots: &[PathBuf], collector: &mut MatchCollector) {
    let Some(hit) = parse_output_line(line) else {
        if !line.is_empty() {
            log::debug!("Skipping malformed search output line: {}", line);
        }
        return;
    };

    let raw = Path::new(hit.path);
    let path = clean_path(raw);
    if !is_path_allowed(raw, allowed_roots) {
        log::warn!("Dropping search result outside allowed roots: {:?}", path);
        return;
    }

    collector.push(content_match(&path, hit.line, hit.content));
}
