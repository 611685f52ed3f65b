//! Charitable normalization of model-emitted tool calls.
//!
//! Models misspell tool names and invent argument keys. The middleware maps
//! them back onto the [`SchemaRegistry`] using exact, alias and fuzzy matches,
//! and records a warning for every correction it makes. It never fails.

use std::collections::{BTreeMap, HashSet};
use std::path::Path;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::schema::{ParamKind, SchemaRegistry, ToolSchema};

pub const TOOL_NAME_CUTOFF: f64 = 0.6;
pub const PARAM_NAME_CUTOFF: f64 = 0.7;

/// Scores how alike two strings are, in `0.0..=1.0`.
pub trait Similarity: Send + Sync {
    fn ratio(&self, a: &str, b: &str) -> f64;
}

/// Matching-blocks ratio `2*M / (len(a) + len(b))` over characters.
#[derive(Debug, Clone, Copy, Default)]
pub struct DiffRatio;

impl Similarity for DiffRatio {
    fn ratio(&self, a: &str, b: &str) -> f64 {
        if a.is_empty() && b.is_empty() {
            return 1.0;
        }
        f64::from(similar::TextDiff::from_chars(a, b).ratio())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NormalizedToolCall {
    pub tool: String,
    pub args: Map<String, Value>,
    /// Required parameters that could not be bound.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub missing: Vec<String>,
    /// False when the tool name did not resolve to any schema.
    pub known: bool,
}

impl NormalizedToolCall {
    pub fn is_valid(&self) -> bool {
        self.known && self.missing.is_empty()
    }
}

pub struct ToolMiddleware {
    registry: Arc<SchemaRegistry>,
    similarity: Arc<dyn Similarity>,
    /// Lowercased canonical names and aliases to canonical names.
    name_index: BTreeMap<String, String>,
}

impl std::fmt::Debug for ToolMiddleware {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ToolMiddleware")
            .field("tools", &self.registry.len())
            .field("names", &self.name_index.len())
            .finish()
    }
}

impl ToolMiddleware {
    pub fn new(registry: Arc<SchemaRegistry>) -> Self {
        Self::with_similarity(registry, Arc::new(DiffRatio))
    }

    pub fn with_similarity(registry: Arc<SchemaRegistry>, similarity: Arc<dyn Similarity>) -> Self {
        let mut name_index = BTreeMap::new();
        for schema in registry.iter() {
            for alias in &schema.aliases {
                name_index
                    .entry(alias.to_lowercase())
                    .or_insert_with(|| schema.name.clone());
            }
        }
        // Canonical names always win over another tool's alias.
        for schema in registry.iter() {
            name_index.insert(schema.name.to_lowercase(), schema.name.clone());
        }

        Self {
            registry,
            similarity,
            name_index,
        }
    }

    pub fn registry(&self) -> &Arc<SchemaRegistry> {
        &self.registry
    }

    /// Middleware over an updated catalog, keeping this one's similarity.
    pub fn for_registry(&self, registry: Arc<SchemaRegistry>) -> Self {
        Self::with_similarity(registry, self.similarity.clone())
    }

    /// Normalizes an untrusted `{ "tool": ..., "args": {...} }` value.
    ///
    /// Path-kind arguments are sanitized only when `workspace` is given.
    pub fn normalize_tool_call(
        &self,
        raw: &Value,
        workspace: Option<&Path>,
    ) -> (NormalizedToolCall, Vec<String>) {
        let mut warnings = Vec::new();

        let Some(object) = raw.as_object() else {
            warnings.push("Invalid tool call format".to_string());
            return (
                NormalizedToolCall {
                    tool: "unknown".to_string(),
                    args: Map::new(),
                    missing: Vec::new(),
                    known: false,
                },
                warnings,
            );
        };

        let raw_name = object
            .get("tool")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .trim()
            .to_lowercase();
        let raw_args = match object.get("args") {
            Some(Value::Object(args)) => args.clone(),
            _ => Map::new(),
        };

        let canonical = self.resolve_tool_name(&raw_name);
        if canonical != raw_name {
            warnings.push(format!("Tool '{raw_name}' resolved to '{canonical}'"));
        }

        let Some(schema) = self.registry.get(&canonical) else {
            warnings.push(format!("Unknown tool '{canonical}' - passing through"));
            tracing::debug!(tool = %canonical, "unknown tool passed through middleware");
            return (
                NormalizedToolCall {
                    tool: canonical,
                    args: raw_args,
                    missing: Vec::new(),
                    known: false,
                },
                warnings,
            );
        };

        if schema.open_parameters {
            return (
                NormalizedToolCall {
                    tool: canonical,
                    args: raw_args,
                    missing: Vec::new(),
                    known: true,
                },
                warnings,
            );
        }

        let (mut args, missing) = self.normalize_arguments(&raw_args, schema, &mut warnings);
        if workspace.is_some() {
            sanitize_path_args(&mut args, schema, &mut warnings);
        }

        if !warnings.is_empty() {
            tracing::debug!(tool = %canonical, ?warnings, "tool call normalized");
        }

        (
            NormalizedToolCall {
                tool: canonical,
                args,
                missing,
                known: true,
            },
            warnings,
        )
    }

    /// Exact (case-insensitive) canonical or alias match first, then the best
    /// fuzzy match above [`TOOL_NAME_CUTOFF`]. Unresolvable names come back
    /// lowercased and trimmed.
    pub fn resolve_tool_name(&self, raw: &str) -> String {
        let needle = raw.trim().to_lowercase();
        if let Some(canonical) = self.name_index.get(&needle) {
            return canonical.clone();
        }

        let best = best_match(
            self.similarity.as_ref(),
            &needle,
            self.name_index.keys().map(String::as_str),
            TOOL_NAME_CUTOFF,
        );
        match best.and_then(|name| self.name_index.get(name)) {
            Some(canonical) => canonical.clone(),
            None => needle,
        }
    }

    fn normalize_arguments(
        &self,
        raw_args: &Map<String, Value>,
        schema: &ToolSchema,
        warnings: &mut Vec<String>,
    ) -> (Map<String, Value>, Vec<String>) {
        let mut normalized = Map::new();
        let mut missing = Vec::new();
        let mut used: HashSet<&str> = HashSet::new();

        for param in &schema.parameters {
            let mut matched: Option<&str> = None;

            if raw_args.contains_key(&param.name) && !used.contains(param.name.as_str()) {
                matched = Some(param.name.as_str());
            }

            if matched.is_none() {
                matched = param
                    .aliases
                    .iter()
                    .filter(|alias| !used.contains(alias.as_str()))
                    .find(|alias| raw_args.contains_key(alias.as_str()))
                    .map(String::as_str);
                if let Some(alias) = matched {
                    warnings.push(format!("Arg '{alias}' normalized to '{}'", param.name));
                }
            }

            if matched.is_none() {
                let candidates: Vec<String> = std::iter::once(&param.name)
                    .chain(param.aliases.iter())
                    .map(|name| name.to_lowercase())
                    .collect();
                matched = raw_args
                    .keys()
                    .filter(|key| !used.contains(key.as_str()))
                    .find(|key| {
                        best_match(
                            self.similarity.as_ref(),
                            &key.to_lowercase(),
                            candidates.iter().map(String::as_str),
                            PARAM_NAME_CUTOFF,
                        )
                        .is_some()
                    })
                    .map(String::as_str);
                if let Some(key) = matched {
                    warnings.push(format!("Fuzzy matched '{key}' to '{}'", param.name));
                }
            }

            let value = matched.and_then(|key| {
                used.insert(key);
                raw_args.get(key).filter(|v| !v.is_null())
            });

            match (value, &param.default) {
                (Some(value), _) => {
                    normalized.insert(param.name.clone(), value.clone());
                }
                (None, Some(default)) => {
                    normalized.insert(param.name.clone(), default.clone());
                }
                (None, None) if param.required => {
                    warnings.push(format!("Missing required parameter '{}'", param.name));
                    missing.push(param.name.clone());
                }
                (None, None) => {}
            }
        }

        (normalized, missing)
    }

    /// One tool's signature and aliases, or the whole catalog when `name` is
    /// `None`.
    pub fn tool_help(&self, name: Option<&str>) -> String {
        match name {
            Some(name) => {
                let canonical = self.resolve_tool_name(name);
                match self.registry.get(&canonical) {
                    Some(schema) => {
                        let aliases = if schema.aliases.is_empty() {
                            "none".to_string()
                        } else {
                            schema
                                .aliases
                                .iter()
                                .take(3)
                                .cloned()
                                .collect::<Vec<_>>()
                                .join(", ")
                        };
                        format!("{}\n  Aliases: {aliases}", schema.signature())
                    }
                    None => format!("Unknown tool: {name}"),
                }
            }
            None => {
                let mut lines = vec!["Available tools:".to_string()];
                lines.extend(
                    self.registry
                        .iter()
                        .map(|schema| format!("  {}", schema.signature())),
                );
                lines.join("\n")
            }
        }
    }
}

fn best_match<'a>(
    similarity: &dyn Similarity,
    needle: &str,
    candidates: impl Iterator<Item = &'a str>,
    cutoff: f64,
) -> Option<&'a str> {
    let mut best: Option<(f64, &str)> = None;
    for candidate in candidates {
        let score = similarity.ratio(needle, candidate);
        if score < cutoff {
            continue;
        }
        if best.map_or(true, |(top, _)| score > top) {
            best = Some((score, candidate));
        }
    }
    best.map(|(_, name)| name)
}

fn sanitize_path_args(args: &mut Map<String, Value>, schema: &ToolSchema, warnings: &mut Vec<String>) {
    for param in schema.parameters.iter().filter(|p| p.kind == ParamKind::Path) {
        let Some(Value::String(original)) = args.get(&param.name) else {
            continue;
        };
        let sanitized = sanitize_path(original);
        if &sanitized != original {
            warnings.push(format!("Path sanitized: '{original}' -> '{sanitized}'"));
            tracing::warn!(from = %original, to = %sanitized, "path argument sanitized");
            args.insert(param.name.clone(), Value::String(sanitized));
        }
    }
}

/// Strips traversal out of a workspace-relative path.
///
/// Null bytes go, backslashes become slashes, leading and repeated slashes are
/// dropped and `..` pops the previous component (or vanishes at the top).
/// The result is never empty; `.` stands for the workspace root.
pub fn sanitize_path(raw: &str) -> String {
    let cleaned = raw.replace('\0', "").replace('\\', "/");
    let mut parts: Vec<&str> = Vec::new();
    for part in cleaned.split('/') {
        match part {
            "" | "." => {}
            ".." => {
                parts.pop();
            }
            other => parts.push(other),
        }
    }
    if parts.is_empty() {
        ".".to_string()
    } else {
        parts.join("/")
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;
    use serde_json::json;

    use super::*;

    fn middleware() -> ToolMiddleware {
        ToolMiddleware::new(Arc::new(SchemaRegistry::builtin()))
    }

    #[test]
    fn every_declared_alias_resolves_case_insensitively() {
        let mw = middleware();
        let registry = SchemaRegistry::builtin();
        for schema in registry.iter() {
            for alias in &schema.aliases {
                assert_eq!(mw.resolve_tool_name(&alias.to_uppercase()), schema.name, "alias {alias}");
            }
        }
    }

    #[test]
    fn misspelled_tool_name_is_fuzzy_resolved() {
        let mw = middleware();
        assert_eq!(mw.resolve_tool_name("read_fil"), "read_file");
        assert_eq!(mw.resolve_tool_name("  Write_Fille "), "write_file");
        assert_eq!(mw.resolve_tool_name("zzzz"), "zzzz");
    }

    #[test]
    fn aliases_bind_to_canonical_params() {
        let mw = middleware();
        let raw = json!({"tool": "save", "args": {"filename": "a.txt", "text": "hi"}});
        let (call, warnings) = mw.normalize_tool_call(&raw, None);

        assert_eq!(call.tool, "write_file");
        assert_eq!(call.args.get("path"), Some(&json!("a.txt")));
        assert_eq!(call.args.get("content"), Some(&json!("hi")));
        assert!(call.is_valid());
        assert!(warnings.contains(&"Tool 'save' resolved to 'write_file'".to_string()));
        assert!(warnings.contains(&"Arg 'filename' normalized to 'path'".to_string()));
        assert!(warnings.contains(&"Arg 'text' normalized to 'content'".to_string()));
    }

    #[test]
    fn raw_key_is_bound_at_most_once() {
        let mw = middleware();
        // "search" and "replace" are aliases of old_text and new_text.
        let raw = json!({"tool": "edit_file", "args": {"path": "a", "search": "x", "replace": "y"}});
        let (call, _) = mw.normalize_tool_call(&raw, None);
        assert_eq!(call.args.get("old_text"), Some(&json!("x")));
        assert_eq!(call.args.get("new_text"), Some(&json!("y")));
        assert_eq!(call.args.get("all_occurrences"), Some(&json!(false)));
    }

    #[test]
    fn fuzzy_param_key_is_recovered() {
        let mw = middleware();
        let raw = json!({"tool": "run_command", "args": {"comand": "ls"}});
        let (call, warnings) = mw.normalize_tool_call(&raw, None);
        assert_eq!(call.args.get("command"), Some(&json!("ls")));
        assert!(warnings.contains(&"Fuzzy matched 'comand' to 'command'".to_string()));
    }

    #[test]
    fn missing_required_param_is_flagged_not_fatal() {
        let mw = middleware();
        let raw = json!({"tool": "read_file", "args": {}});
        let (call, warnings) = mw.normalize_tool_call(&raw, None);
        assert_eq!(call.tool, "read_file");
        assert_eq!(call.missing, vec!["path".to_string()]);
        assert!(!call.is_valid());
        assert_eq!(warnings, vec!["Missing required parameter 'path'".to_string()]);
    }

    #[test]
    fn defaults_fill_silently() {
        let mw = middleware();
        let raw = json!({"tool": "ls", "args": {}});
        let (call, warnings) = mw.normalize_tool_call(&raw, None);
        assert_eq!(call.args.get("path"), Some(&json!(".")));
        assert_eq!(warnings, vec!["Tool 'ls' resolved to 'list_directory'".to_string()]);
    }

    #[test]
    fn unknown_tool_passes_args_through() {
        let mw = middleware();
        let raw = json!({"tool": "Deploy_Everything_Now", "args": {"env": "prod"}});
        let (call, warnings) = mw.normalize_tool_call(&raw, None);
        assert_eq!(call.tool, "deploy_everything_now");
        assert!(!call.known);
        assert_eq!(call.args.get("env"), Some(&json!("prod")));
        assert_eq!(
            warnings,
            vec!["Unknown tool 'deploy_everything_now' - passing through".to_string()]
        );
    }

    #[test]
    fn non_object_call_is_unknown() {
        let mw = middleware();
        let (call, warnings) = mw.normalize_tool_call(&json!(["read_file"]), None);
        assert_eq!(call.tool, "unknown");
        assert_eq!(warnings, vec!["Invalid tool call format".to_string()]);
    }

    #[test]
    fn path_args_sanitized_only_with_workspace() {
        let mw = middleware();
        let raw = json!({"tool": "read_file", "args": {"path": "../../etc/passwd"}});

        let (call, _) = mw.normalize_tool_call(&raw, None);
        assert_eq!(call.args.get("path"), Some(&json!("../../etc/passwd")));

        let (call, warnings) = mw.normalize_tool_call(&raw, Some(Path::new("/ws")));
        assert_eq!(call.args.get("path"), Some(&json!("etc/passwd")));
        assert!(warnings.contains(&"Path sanitized: '../../etc/passwd' -> 'etc/passwd'".to_string()));
    }

    #[test]
    fn sanitize_path_cases() {
        assert_eq!(sanitize_path("../../etc/passwd"), "etc/passwd");
        assert_eq!(sanitize_path("a\\b\\..\\c"), "a/c");
        assert_eq!(sanitize_path("//abs///x/./y"), "abs/x/y");
        assert_eq!(sanitize_path("..\0/.."), ".");
        assert_eq!(sanitize_path(""), ".");
        assert_eq!(sanitize_path("src/main.rs"), "src/main.rs");
    }

    #[test]
    fn sanitize_path_is_idempotent() {
        for raw in ["../a/../../b", "x//y\\..\\z", "./.", "/root/../..", "a/b/c/../../d"] {
            let once = sanitize_path(raw);
            assert_eq!(sanitize_path(&once), once, "input {raw}");
            assert!(!once.starts_with(".."));
        }
    }

    #[test]
    fn tool_help_renders_signature_and_aliases() {
        let mw = middleware();
        assert_eq!(
            mw.tool_help(Some("cat")),
            "read_file(path): Read the contents of a file\n  Aliases: cat, view_file, get_file"
        );
        assert_eq!(mw.tool_help(Some("qqqqqq")), "Unknown tool: qqqqqq");
        let all = mw.tool_help(None);
        assert!(all.starts_with("Available tools:"));
        assert!(all.contains("  edit_file(path, old_text, new_text, all_occurrences?)"));
    }

    struct Exact;
    impl Similarity for Exact {
        fn ratio(&self, a: &str, b: &str) -> f64 {
            if a == b { 1.0 } else { 0.0 }
        }
    }

    #[test]
    fn similarity_strategy_is_pluggable() {
        let mw = ToolMiddleware::with_similarity(Arc::new(SchemaRegistry::builtin()), Arc::new(Exact));
        assert_eq!(mw.resolve_tool_name("read_fil"), "read_fil");
    }
}
