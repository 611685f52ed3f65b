//! Static catalog of built-in tools, their canonical parameter names and the
//! aliases models tend to use instead.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::core::tool::ToolDescriptor;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ParamKind {
    String,
    Path,
    Content,
    Command,
    Boolean,
}

impl ParamKind {
    fn json_type(&self) -> &'static str {
        match self {
            Self::Boolean => "boolean",
            _ => "string",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolParameter {
    pub name: String,
    pub kind: ParamKind,
    pub required: bool,
    pub aliases: Vec<String>,
    pub default: Option<Value>,
}

impl ToolParameter {
    pub fn required(name: &str, kind: ParamKind, aliases: &[&str]) -> Self {
        Self {
            name: name.to_string(),
            kind,
            required: true,
            aliases: aliases.iter().map(|s| s.to_string()).collect(),
            default: None,
        }
    }

    pub fn optional(name: &str, kind: ParamKind, aliases: &[&str], default: Value) -> Self {
        Self {
            name: name.to_string(),
            kind,
            required: false,
            aliases: aliases.iter().map(|s| s.to_string()).collect(),
            default: Some(default),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolSchema {
    pub name: String,
    pub description: String,
    pub parameters: Vec<ToolParameter>,
    pub aliases: Vec<String>,
    /// Open schemas accept arbitrary arguments and pass them through as-is.
    #[serde(default)]
    pub open_parameters: bool,
}

impl ToolSchema {
    pub fn new(
        name: &str,
        description: &str,
        aliases: &[&str],
        parameters: Vec<ToolParameter>,
    ) -> Self {
        Self {
            name: name.to_string(),
            description: description.to_string(),
            parameters,
            aliases: aliases.iter().map(|s| s.to_string()).collect(),
            open_parameters: false,
        }
    }

    pub fn open(name: &str, description: &str) -> Self {
        Self {
            name: name.to_string(),
            description: description.to_string(),
            parameters: Vec::new(),
            aliases: Vec::new(),
            open_parameters: true,
        }
    }

    pub fn parameter(&self, name: &str) -> Option<&ToolParameter> {
        self.parameters.iter().find(|p| p.name == name)
    }

    /// `name(p1, p2?): description`
    pub fn signature(&self) -> String {
        let params = self
            .parameters
            .iter()
            .map(|p| {
                if p.required {
                    p.name.clone()
                } else {
                    format!("{}?", p.name)
                }
            })
            .collect::<Vec<_>>()
            .join(", ");
        format!("{}({params}): {}", self.name, self.description)
    }

    pub fn descriptor(&self) -> ToolDescriptor {
        let mut properties = serde_json::Map::new();
        for param in &self.parameters {
            let mut prop = json!({ "type": param.kind.json_type() });
            if let Some(default) = &param.default {
                prop["default"] = default.clone();
            }
            properties.insert(param.name.clone(), prop);
        }
        let required: Vec<&str> = self
            .parameters
            .iter()
            .filter(|p| p.required)
            .map(|p| p.name.as_str())
            .collect();

        ToolDescriptor {
            name: self.name.clone(),
            description: self.description.clone(),
            input_schema: json!({
                "type": "object",
                "properties": properties,
                "required": required,
                "additionalProperties": self.open_parameters,
            }),
            aliases: self.aliases.clone(),
        }
    }
}

/// Canonical name to schema. Built once and shared read-only afterwards.
#[derive(Debug, Clone, Default)]
pub struct SchemaRegistry {
    schemas: BTreeMap<String, ToolSchema>,
}

impl SchemaRegistry {
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn builtin() -> Self {
        let mut registry = Self::empty();
        for schema in builtin_schemas() {
            registry.register(schema);
        }
        registry
    }

    /// Adds or replaces a schema under its canonical name.
    pub fn register(&mut self, schema: ToolSchema) {
        self.schemas.insert(schema.name.clone(), schema);
    }

    pub fn with_schema(mut self, schema: ToolSchema) -> Self {
        self.register(schema);
        self
    }

    pub fn get(&self, name: &str) -> Option<&ToolSchema> {
        self.schemas.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.schemas.contains_key(name)
    }

    pub fn iter(&self) -> impl Iterator<Item = &ToolSchema> {
        self.schemas.values()
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.schemas.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.schemas.len()
    }

    pub fn is_empty(&self) -> bool {
        self.schemas.is_empty()
    }
}

fn builtin_schemas() -> Vec<ToolSchema> {
    use ParamKind::*;

    let file_path = |extra: &[&str]| {
        let mut aliases = vec!["filename", "file", "filepath"];
        aliases.extend_from_slice(extra);
        ToolParameter::required("path", Path, &aliases)
    };

    vec![
        ToolSchema::new(
            "list_directory",
            "List files and folders in a directory",
            &["ls", "dir", "list_dir", "listdir", "list_files"],
            vec![ToolParameter::optional(
                "path",
                Path,
                &["directory", "dir", "folder", "location"],
                json!("."),
            )],
        ),
        ToolSchema::new(
            "read_file",
            "Read the contents of a file",
            &["cat", "view_file", "get_file", "open_file", "read", "view"],
            vec![file_path(&["file_path", "name"])],
        ),
        ToolSchema::new(
            "write_file",
            "Write content to a file, creating it if needed",
            &["create_file", "save_file", "write", "save", "create", "put_file"],
            vec![
                file_path(&["file_path", "name"]),
                ToolParameter::required(
                    "content",
                    Content,
                    &["text", "data", "body", "contents", "code"],
                ),
            ],
        ),
        ToolSchema::new(
            "run_command",
            "Run a shell command in the workspace",
            &["exec", "execute", "shell", "bash", "cmd", "run", "terminal"],
            vec![ToolParameter::required(
                "command",
                Command,
                &["cmd", "shell_command", "script", "commands"],
            )],
        ),
        ToolSchema::new(
            "search_files",
            "Find files by name or glob pattern",
            &["find", "find_files", "glob", "locate"],
            vec![
                ToolParameter::required("pattern", String, &["glob", "query", "search", "name"]),
                ToolParameter::optional(
                    "path",
                    Path,
                    &["directory", "dir", "folder", "in"],
                    json!("."),
                ),
            ],
        ),
        ToolSchema::new(
            "grep_files",
            "Search file contents for a pattern",
            &["grep", "search", "find_text", "search_content", "search_in_files"],
            vec![
                ToolParameter::required(
                    "pattern",
                    String,
                    &["query", "search", "text", "regex", "term"],
                ),
                ToolParameter::optional(
                    "path",
                    Path,
                    &["directory", "dir", "folder", "in"],
                    json!("."),
                ),
                ToolParameter::optional(
                    "file_pattern",
                    String,
                    &["glob", "files", "filter", "extension"],
                    json!("*"),
                ),
            ],
        ),
        ToolSchema::new(
            "edit_file",
            "Replace text inside a file",
            &["replace", "modify", "update_file", "patch"],
            vec![
                file_path(&[]),
                ToolParameter::required(
                    "old_text",
                    Content,
                    &["find", "search", "original", "from", "old"],
                ),
                ToolParameter::required(
                    "new_text",
                    Content,
                    &["replace", "replacement", "to", "new", "with"],
                ),
                ToolParameter::optional(
                    "all_occurrences",
                    Boolean,
                    &["all", "global", "replace_all"],
                    json!(false),
                ),
            ],
        ),
        ToolSchema::new(
            "create_directory",
            "Create a directory, including parents",
            &["mkdir", "make_dir", "new_folder", "create_folder"],
            vec![ToolParameter::required(
                "path",
                Path,
                &["directory", "dir", "folder", "name"],
            )],
        ),
        ToolSchema::new(
            "delete_file",
            "Delete a file or empty directory",
            &["rm", "remove", "delete", "unlink", "rmdir"],
            vec![file_path(&["target"])],
        ),
        ToolSchema::new(
            "list_tools",
            "List all available tools",
            &["help", "tools", "available_tools"],
            vec![],
        ),
        ToolSchema::new(
            "read_tool",
            "Show the definition of a tool",
            &["view_tool", "tool_source"],
            vec![ToolParameter::required("name", String, &["tool", "tool_name"])],
        ),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builtin_registry_covers_core_tools() {
        let registry = SchemaRegistry::builtin();
        for name in [
            "list_directory",
            "read_file",
            "write_file",
            "run_command",
            "search_files",
            "grep_files",
            "edit_file",
            "create_directory",
            "delete_file",
            "list_tools",
            "read_tool",
        ] {
            assert!(registry.contains(name), "missing {name}");
        }
        assert_eq!(registry.len(), 11);
    }

    #[test]
    fn signature_marks_optional_params() {
        let registry = SchemaRegistry::builtin();
        let grep = registry.get("grep_files").expect("grep schema");
        assert_eq!(
            grep.signature(),
            "grep_files(pattern, path?, file_pattern?): Search file contents for a pattern"
        );
    }

    #[test]
    fn descriptor_lists_required_params() {
        let registry = SchemaRegistry::builtin();
        let descriptor = registry.get("write_file").expect("write schema").descriptor();
        assert_eq!(descriptor.input_schema["required"], json!(["path", "content"]));
        assert_eq!(descriptor.input_schema["properties"]["path"]["type"], "string");
    }

    #[test]
    fn with_schema_extends_without_touching_builtins() {
        let registry = SchemaRegistry::builtin().with_schema(ToolSchema::open("deploy", "Deploy"));
        assert!(registry.get("deploy").expect("deploy").open_parameters);
        assert_eq!(registry.len(), 12);
    }
}
