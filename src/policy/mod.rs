//! Workspace path containment.
//!
//! Every filesystem tool resolves its path arguments through [`PolicyEngine`]
//! so that operations stay inside the configured workspace root. Containment
//! is lexical (plus symlink resolution for paths that already exist); it is
//! best-effort and not a sandbox.

use std::path::{Component, Path, PathBuf};

use serde::{Deserialize, Serialize};

/// What happens when a resolved path escapes the workspace root.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ContainmentMode {
    /// Replace the escaping path with the workspace root and log a notice.
    #[default]
    Substitute,
    /// Refuse the path.
    Reject,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PolicyDecision {
    Allow(PathBuf),
    /// The requested path escaped the root and was swapped for the root.
    Contained { requested: PathBuf, resolved: PathBuf },
    Deny { requested: PathBuf },
}

impl PolicyDecision {
    /// The path a tool should operate on, if any.
    pub fn path(&self) -> Option<&Path> {
        match self {
            Self::Allow(path) => Some(path),
            Self::Contained { resolved, .. } => Some(resolved),
            Self::Deny { .. } => None,
        }
    }
}

#[derive(Debug, Clone)]
pub struct PolicyEngine {
    workspace_root: PathBuf,
    containment: ContainmentMode,
}

impl PolicyEngine {
    pub fn new(workspace_root: PathBuf) -> Self {
        Self::with_containment(workspace_root, ContainmentMode::default())
    }

    pub fn with_containment(workspace_root: PathBuf, containment: ContainmentMode) -> Self {
        let workspace_root = workspace_root
            .canonicalize()
            .unwrap_or_else(|_| normalize_lexically(&workspace_root));
        Self {
            workspace_root,
            containment,
        }
    }

    pub fn workspace_root(&self) -> &Path {
        &self.workspace_root
    }

    pub fn containment(&self) -> ContainmentMode {
        self.containment
    }

    /// Resolves `raw` against the workspace root and checks containment.
    ///
    /// Empty strings and `.` mean the root itself. Relative paths are joined
    /// onto the root, absolute paths are taken as given.
    pub fn evaluate_path(&self, raw: &str) -> PolicyDecision {
        let trimmed = raw.trim();
        if trimmed.is_empty() || trimmed == "." {
            return PolicyDecision::Allow(self.workspace_root.clone());
        }

        let requested = Path::new(trimmed);
        let joined = if requested.is_absolute() {
            requested.to_path_buf()
        } else {
            self.workspace_root.join(requested)
        };
        let resolved = normalize_lexically(&joined);

        if self.is_within_root(&resolved) {
            return PolicyDecision::Allow(resolved);
        }

        match self.containment {
            ContainmentMode::Substitute => {
                tracing::warn!(
                    requested = %resolved.display(),
                    root = %self.workspace_root.display(),
                    "path outside workspace, restricted to workspace root"
                );
                PolicyDecision::Contained {
                    requested: resolved,
                    resolved: self.workspace_root.clone(),
                }
            }
            ContainmentMode::Reject => {
                tracing::warn!(requested = %resolved.display(), "path outside workspace rejected");
                PolicyDecision::Deny { requested: resolved }
            }
        }
    }

    fn is_within_root(&self, candidate: &Path) -> bool {
        if !candidate.starts_with(&self.workspace_root) {
            return false;
        }

        // Existing paths may hide a symlink that points elsewhere.
        match candidate.canonicalize() {
            Ok(canonical) => canonical.starts_with(&self.workspace_root),
            Err(_) => true,
        }
    }

    /// Renders `path` relative to the workspace root with forward slashes,
    /// falling back to the full path when it lies outside.
    pub fn display_relative(&self, path: &Path) -> String {
        match path.strip_prefix(&self.workspace_root) {
            Ok(rel) if rel.as_os_str().is_empty() => ".".to_string(),
            Ok(rel) => rel.to_string_lossy().replace('\\', "/"),
            Err(_) => path.to_string_lossy().replace('\\', "/"),
        }
    }
}

/// Collapses `.` and `..` components without touching the filesystem.
/// A `..` at the root is dropped.
pub fn normalize_lexically(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                let popped = match out.components().next_back() {
                    Some(Component::Normal(_)) => out.pop(),
                    _ => false,
                };
                if !popped && !out.has_root() {
                    out.push("..");
                }
            }
            other => out.push(other.as_os_str()),
        }
    }
    out
}

#[cfg(test)]
mod tests;
