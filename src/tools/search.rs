//! File name and content search.
//!
//! Uses `ignore` for .gitignore-aware directory walking. Names are matched
//! either as globs or fuzzily with `nucleo-matcher`; contents with `regex`.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use ignore::overrides::{Override, OverrideBuilder};
use ignore::WalkBuilder;
use nucleo_matcher::pattern::{AtomKind, CaseMatching, Normalization, Pattern};
use nucleo_matcher::{Config, Matcher, Utf32Str};
use regex::Regex;
use serde_json::{Map, Value};

use crate::tools::types::{required_str, str_arg, Tool, ToolContext, ToolError};

pub const MAX_FILE_RESULTS: usize = 100;
pub const MAX_GREP_MATCHES: usize = 200;
/// Files larger than this are skipped by content search.
const MAX_GREP_FILE_BYTES: u64 = 1024 * 1024;
const MAX_GREP_LINE_CHARS: usize = 200;

fn is_glob(pattern: &str) -> bool {
    pattern.contains(['*', '?', '['])
}

fn walk_files(root: &Path) -> impl Iterator<Item = PathBuf> {
    WalkBuilder::new(root)
        .hidden(false)
        .follow_links(true)
        .require_git(false)
        .filter_entry(|entry| entry.file_name() != ".git")
        .build()
        .filter_map(Result::ok)
        .filter(|entry| entry.file_type().is_some_and(|ft| ft.is_file()))
        .map(ignore::DirEntry::into_path)
}

fn glob_matcher(root: &Path, glob: &str) -> Result<Override, ToolError> {
    let mut builder = OverrideBuilder::new(root);
    builder
        .add(glob)
        .map_err(|e| ToolError::InvalidInput(format!("invalid glob '{glob}': {e}")))?;
    builder
        .build()
        .map_err(|e| ToolError::InvalidInput(format!("invalid glob '{glob}': {e}")))
}

fn search_root(ctx: &ToolContext<'_>, args: &Map<String, Value>) -> Result<PathBuf, ToolError> {
    let raw = str_arg(args, "path").unwrap_or(".".into());
    let dir = ctx.resolve(&raw)?;
    if !dir.is_dir() {
        return Err(ToolError::NotFound(format!(
            "search directory '{}'",
            ctx.relative(&dir)
        )));
    }
    Ok(dir)
}

pub struct SearchFilesTool;

#[async_trait]
impl Tool for SearchFilesTool {
    fn name(&self) -> &str {
        "search_files"
    }

    async fn invoke(
        &self,
        ctx: &mut ToolContext<'_>,
        args: &Map<String, Value>,
    ) -> Result<String, ToolError> {
        let pattern = required_str(args, "pattern")?;
        let pattern = pattern.trim();
        if pattern.is_empty() {
            return Err(ToolError::InvalidInput("pattern must not be empty".into()));
        }
        let dir = search_root(ctx, args)?;

        let mut found: Vec<String> = if is_glob(pattern) {
            let globs = glob_matcher(&dir, pattern)?;
            walk_files(&dir)
                .filter(|path| globs.matched(path, false).is_whitelist())
                .map(|path| ctx.relative(&path))
                .collect()
        } else {
            fuzzy_rank(pattern, walk_files(&dir).map(|path| ctx.relative(&path)).collect())
        };

        if found.is_empty() {
            return Ok(format!("No files found matching '{pattern}'"));
        }

        let total = found.len();
        found.truncate(MAX_FILE_RESULTS);
        let mut out = found.join("\n");
        if total > MAX_FILE_RESULTS {
            out.push_str(&format!("\n... and {} more", total - MAX_FILE_RESULTS));
        }
        Ok(out)
    }
}

/// Orders `paths` by fuzzy score, best first, dropping non-matches.
fn fuzzy_rank(query: &str, paths: Vec<String>) -> Vec<String> {
    let pattern = Pattern::new(query, CaseMatching::Smart, Normalization::Smart, AtomKind::Fuzzy);
    let mut matcher = Matcher::new(Config::DEFAULT.match_paths());
    let mut utf32_buf = Vec::new();

    let mut scored: Vec<(u32, String)> = paths
        .into_iter()
        .filter_map(|path| {
            let score = pattern.score(Utf32Str::new(&path, &mut utf32_buf), &mut matcher)?;
            Some((score, path))
        })
        .collect();

    scored.sort_by(|a, b| b.0.cmp(&a.0).then_with(|| a.1.cmp(&b.1)));
    scored.into_iter().map(|(_, path)| path).collect()
}

pub struct GrepFilesTool;

#[async_trait]
impl Tool for GrepFilesTool {
    fn name(&self) -> &str {
        "grep_files"
    }

    async fn invoke(
        &self,
        ctx: &mut ToolContext<'_>,
        args: &Map<String, Value>,
    ) -> Result<String, ToolError> {
        let pattern = required_str(args, "pattern")?;
        if pattern.is_empty() {
            return Err(ToolError::InvalidInput("pattern must not be empty".into()));
        }
        let dir = search_root(ctx, args)?;
        let file_pattern = str_arg(args, "file_pattern").unwrap_or("*".into());

        // Models often pass literal text with regex metacharacters.
        let regex = Regex::new(&pattern)
            .or_else(|_| Regex::new(&regex::escape(&pattern)))
            .map_err(|e| ToolError::InvalidInput(format!("invalid pattern: {e}")))?;
        let filter = match file_pattern.trim() {
            "" | "*" => None,
            glob => Some(glob_matcher(&dir, glob)?),
        };

        let mut matches = Vec::new();
        let mut truncated = false;
        'files: for path in walk_files(&dir) {
            if let Some(filter) = &filter {
                if !filter.matched(&path, false).is_whitelist() {
                    continue;
                }
            }
            let too_big = std::fs::metadata(&path).map_or(true, |m| m.len() > MAX_GREP_FILE_BYTES);
            if too_big {
                continue;
            }
            // Non-UTF-8 files are treated as binary and skipped.
            let Ok(content) = std::fs::read_to_string(&path) else {
                continue;
            };

            let rel = ctx.relative(&path);
            for (idx, line) in content.lines().enumerate() {
                if !regex.is_match(line) {
                    continue;
                }
                if matches.len() == MAX_GREP_MATCHES {
                    truncated = true;
                    break 'files;
                }
                let shown: String = line.trim().chars().take(MAX_GREP_LINE_CHARS).collect();
                matches.push(format!("{rel}:{}: {shown}", idx + 1));
            }
        }

        if matches.is_empty() {
            return Ok(format!("No matches found for '{pattern}'"));
        }
        let mut out = matches.join("\n");
        if truncated {
            out.push_str(&format!("\n... results truncated at {MAX_GREP_MATCHES} matches"));
        }
        Ok(out)
    }
}
