//! Tool registry: executable tools by canonical name plus the schema catalog
//! and middleware that describe them.
//!
//! Built-in tools are always present. Script tools are added from a tools
//! directory at construction; built-in names cannot be shadowed.

use std::collections::{BTreeMap, HashMap};
use std::path::Path;
use std::sync::Arc;

use serde_json::{Map, Value};

use crate::tools::cmd::RunCommandTool;
use crate::tools::fs::{
    CreateDirectoryTool, DeleteFileTool, EditFileTool, ListDirectoryTool, ReadFileTool,
    WriteFileTool,
};
use crate::core::tool::ToolDescriptor;
use crate::tools::middleware::{Similarity, ToolMiddleware};
use crate::tools::schema::SchemaRegistry;
use crate::tools::scripts::{self, ScriptTool};
use crate::tools::search::{GrepFilesTool, SearchFilesTool};
use crate::tools::types::{str_arg, Tool, ToolContext};

/// Tools answered from the catalog itself rather than by a [`Tool`].
const META_TOOLS: &[&str] = &["list_tools", "read_tool"];

pub struct ToolRegistry {
    tools: HashMap<String, Box<dyn Tool>>,
    scripts: BTreeMap<String, ScriptTool>,
    schemas: Arc<SchemaRegistry>,
    middleware: ToolMiddleware,
}

impl std::fmt::Debug for ToolRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ToolRegistry")
            .field("tools", &self.tools.keys().collect::<Vec<_>>())
            .field("scripts", &self.scripts.keys().collect::<Vec<_>>())
            .finish()
    }
}

impl Default for ToolRegistry {
    fn default() -> Self {
        Self::builtin()
    }
}

impl ToolRegistry {
    /// Registry with only the built-in tools.
    pub fn builtin() -> Self {
        let schemas = Arc::new(SchemaRegistry::builtin());
        let mut registry = Self {
            tools: HashMap::new(),
            scripts: BTreeMap::new(),
            middleware: ToolMiddleware::new(schemas.clone()),
            schemas,
        };

        registry.insert(Box::new(ListDirectoryTool));
        registry.insert(Box::new(ReadFileTool));
        registry.insert(Box::new(WriteFileTool));
        registry.insert(Box::new(EditFileTool));
        registry.insert(Box::new(CreateDirectoryTool));
        registry.insert(Box::new(DeleteFileTool));
        registry.insert(Box::new(SearchFilesTool));
        registry.insert(Box::new(GrepFilesTool));
        registry.insert(Box::new(RunCommandTool));
        registry
    }

    /// Built-ins plus every script found in `tools_dir`.
    pub fn with_tools_dir(tools_dir: Option<&Path>) -> Self {
        let mut registry = Self::builtin();
        if let Some(dir) = tools_dir {
            for script in scripts::discover(dir) {
                registry.register_script(script);
            }
        }
        registry
    }

    /// Swaps the fuzzy-matching strategy used for name resolution.
    pub fn with_similarity(mut self, similarity: Arc<dyn Similarity>) -> Self {
        self.middleware = ToolMiddleware::with_similarity(self.schemas.clone(), similarity);
        self
    }

    fn insert(&mut self, tool: Box<dyn Tool>) {
        self.tools.insert(tool.name().to_string(), tool);
    }

    /// Adds a tool with its own schema. Returns false when the name is
    /// already taken by a built-in or meta tool.
    pub fn register(&mut self, tool: Box<dyn Tool>) -> bool {
        let name = tool.name().to_string();
        if self.tools.contains_key(&name) || META_TOOLS.contains(&name.as_str()) {
            tracing::warn!(tool = %name, "tool name already registered, skipping");
            return false;
        }
        if let Some(schema) = tool.schema() {
            Arc::make_mut(&mut self.schemas).register(schema);
            self.middleware = self.middleware.for_registry(self.schemas.clone());
        }
        self.tools.insert(name, tool);
        true
    }

    fn register_script(&mut self, script: ScriptTool) {
        let name = script.name().to_string();
        if self.register(Box::new(script.clone())) {
            self.scripts.insert(name, script);
        }
    }

    pub fn middleware(&self) -> &ToolMiddleware {
        &self.middleware
    }

    pub fn schemas(&self) -> &Arc<SchemaRegistry> {
        &self.schemas
    }

    /// Machine-readable catalog of every schema, scripts included, sorted by
    /// name.
    pub fn descriptors(&self) -> Vec<ToolDescriptor> {
        let mut descriptors: Vec<ToolDescriptor> =
            self.schemas.iter().map(|schema| schema.descriptor()).collect();
        descriptors.sort_by(|a, b| a.name.cmp(&b.name));
        descriptors
    }

    pub fn script_names(&self) -> impl Iterator<Item = &str> {
        self.scripts.keys().map(String::as_str)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.tools.contains_key(name) || META_TOOLS.contains(&name)
    }

    /// Runs `tool` and renders the outcome as text. Failures become
    /// `Error: ...` so the model can see and correct them.
    pub async fn dispatch(
        &self,
        tool: &str,
        args: &Map<String, Value>,
        ctx: &mut ToolContext<'_>,
    ) -> String {
        match tool {
            "list_tools" => return self.list_tools(),
            "read_tool" => return self.read_tool(str_arg(args, "name").as_deref().unwrap_or_default()),
            _ => {}
        }

        let Some(handler) = self.tools.get(tool) else {
            tracing::warn!(tool, "dispatch to unknown tool");
            return format!("Error: Tool '{tool}' not found");
        };

        tracing::debug!(tool, "dispatching tool");
        match handler.invoke(ctx, args).await {
            Ok(text) => text,
            Err(err) => {
                tracing::warn!(tool, error = %err, "tool failed");
                format!("Error: {err}")
            }
        }
    }

    fn list_tools(&self) -> String {
        self.middleware.tool_help(None)
    }

    fn read_tool(&self, name: &str) -> String {
        let canonical = self.middleware.resolve_tool_name(name);
        if let Some(script) = self.scripts.get(&canonical) {
            return match script.source() {
                Ok(source) => source,
                Err(err) => format!("Error: {err}"),
            };
        }
        if self.schemas.contains(&canonical) {
            return self.middleware.tool_help(Some(&canonical));
        }
        format!("Error: Tool '{name}' not found")
    }
}
