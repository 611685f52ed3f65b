//! Tool catalog, call normalization and built-in tool implementations.
//!
//! # Module Structure
//!
//! - `schema`: static catalog of tools, parameters and aliases
//! - `middleware`: maps raw model calls onto the catalog
//! - `registry`: dispatches normalized calls to tools
//! - `fs`: list, read, write, edit, mkdir, delete
//! - `search`: file name and content search
//! - `cmd`: shell commands with timeout
//! - `scripts`: tools discovered from a directory
//!
//! # Adding New Tools
//!
//! 1. Implement [`Tool`] in the appropriate submodule
//! 2. Built-ins: add a schema in `schema.rs` and insert in `ToolRegistry::builtin`
//! 3. Anything else: return a schema from [`Tool::schema`] and call
//!    [`ToolRegistry::register`]

pub use cmd::{run_shell, CommandOutput};
pub use middleware::{
    sanitize_path, DiffRatio, NormalizedToolCall, Similarity, ToolMiddleware, PARAM_NAME_CUTOFF,
    TOOL_NAME_CUTOFF,
};
pub use registry::ToolRegistry;
pub use schema::{ParamKind, SchemaRegistry, ToolParameter, ToolSchema};
pub use scripts::ScriptTool;
pub use types::{Tool, ToolContext, ToolError};

mod cmd;
mod fs;
pub mod middleware;
mod registry;
pub mod schema;
mod scripts;
mod search;
mod types;

pub use fs::{MAX_LIST_ENTRIES, MAX_READ_BYTES};
