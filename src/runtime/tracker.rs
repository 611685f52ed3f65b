//! Per-session record of file contents before and after tool mutations.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FileOperation {
    Create,
    Modify,
    Delete,
    Unchanged,
}

impl std::fmt::Display for FileOperation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Create => "create",
            Self::Modify => "modify",
            Self::Delete => "delete",
            Self::Unchanged => "unchanged",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrackedFile {
    pub path: String,
    pub original_content: Option<String>,
    pub new_content: Option<String>,
    pub existed_originally: bool,
    /// Set once a write or delete has been observed. A file that was only
    /// read stays unchanged.
    touched: bool,
}

impl TrackedFile {
    pub fn operation(&self) -> FileOperation {
        if !self.touched {
            return FileOperation::Unchanged;
        }
        match (&self.original_content, &self.new_content) {
            (_, Some(_)) if !self.existed_originally => FileOperation::Create,
            (Some(_), None) if self.existed_originally => FileOperation::Delete,
            (original, Some(new)) if original.as_deref() != Some(new.as_str()) => {
                FileOperation::Modify
            }
            _ => FileOperation::Unchanged,
        }
    }

    pub fn is_changed(&self) -> bool {
        self.operation() != FileOperation::Unchanged
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileChange {
    pub path: String,
    pub operation: FileOperation,
    pub old_content: Option<String>,
    pub new_content: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChangedFile {
    pub path: String,
    pub operation: FileOperation,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChangeSummary {
    pub total_files: usize,
    pub created: usize,
    pub modified: usize,
    pub deleted: usize,
    pub files: Vec<ChangedFile>,
}

#[derive(Debug, Clone)]
pub struct FileChangeTracker {
    files: BTreeMap<String, TrackedFile>,
    enabled: bool,
}

impl Default for FileChangeTracker {
    fn default() -> Self {
        Self {
            files: BTreeMap::new(),
            enabled: true,
        }
    }
}

impl FileChangeTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Pauses or resumes recording. Already tracked files are kept.
    pub fn set_enabled(&mut self, enabled: bool) {
        self.enabled = enabled;
    }

    pub fn clear(&mut self) {
        self.files.clear();
    }

    pub fn get(&self, path: &str) -> Option<&TrackedFile> {
        self.files.get(&normalize_key(path))
    }

    pub fn len(&self) -> usize {
        self.files.len()
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }

    /// Records the first observed content of `path`. Later reads are ignored
    /// so the original survives repeated reads.
    pub fn record_read(&mut self, path: &str, content: &str, existed: bool) {
        if !self.enabled {
            return;
        }
        let key = normalize_key(path);
        self.files.entry(key.clone()).or_insert_with(|| TrackedFile {
            path: key,
            original_content: existed.then(|| content.to_string()),
            new_content: existed.then(|| content.to_string()),
            existed_originally: existed,
            touched: false,
        });
    }

    /// Records new content. Without a prior read the file counts as created.
    pub fn record_write(&mut self, path: &str, content: &str) {
        if !self.enabled {
            return;
        }
        let key = normalize_key(path);
        let tracked = self.files.entry(key.clone()).or_insert_with(|| TrackedFile {
            path: key,
            original_content: None,
            new_content: None,
            existed_originally: false,
            touched: false,
        });
        tracked.new_content = Some(content.to_string());
        tracked.touched = true;
    }

    /// Records a removal. Without a prior read there is no original content
    /// to show, so the file stays unchanged.
    pub fn record_delete(&mut self, path: &str) {
        if !self.enabled {
            return;
        }
        let key = normalize_key(path);
        let tracked = self.files.entry(key.clone()).or_insert_with(|| TrackedFile {
            path: key,
            original_content: None,
            new_content: None,
            existed_originally: false,
            touched: false,
        });
        tracked.new_content = None;
        tracked.touched = true;
    }

    pub fn changes(&self) -> Vec<FileChange> {
        self.files
            .values()
            .filter(|tracked| tracked.is_changed())
            .map(|tracked| FileChange {
                path: tracked.path.clone(),
                operation: tracked.operation(),
                old_content: tracked.original_content.clone(),
                new_content: tracked.new_content.clone(),
            })
            .collect()
    }

    /// Unified diff for one path, `None` when nothing changed.
    pub fn diff(&self, path: &str) -> Option<String> {
        let tracked = self.files.get(&normalize_key(path))?;
        if !tracked.is_changed() {
            return None;
        }

        let old = with_trailing_newline(tracked.original_content.as_deref().unwrap_or_default());
        let new = with_trailing_newline(tracked.new_content.as_deref().unwrap_or_default());
        if old == new {
            return None;
        }

        let text_diff = similar::TextDiff::from_lines(&old, &new);
        let diff = text_diff
            .unified_diff()
            .context_radius(3)
            .header(&format!("a/{}", tracked.path), &format!("b/{}", tracked.path))
            .to_string();
        if diff.is_empty() {
            None
        } else {
            Some(diff)
        }
    }

    /// Diffs of every changed file joined by blank lines.
    pub fn diff_all(&self) -> String {
        self.files
            .keys()
            .filter_map(|path| self.diff(path))
            .collect::<Vec<_>>()
            .join("\n")
    }

    pub fn summary(&self) -> ChangeSummary {
        let changes = self.changes();
        let count = |op: FileOperation| changes.iter().filter(|c| c.operation == op).count();
        ChangeSummary {
            total_files: changes.len(),
            created: count(FileOperation::Create),
            modified: count(FileOperation::Modify),
            deleted: count(FileOperation::Delete),
            files: changes
                .iter()
                .map(|c| ChangedFile {
                    path: c.path.clone(),
                    operation: c.operation,
                })
                .collect(),
        }
    }
}

fn normalize_key(path: &str) -> String {
    path.replace('\\', "/").trim_matches('/').to_string()
}

fn with_trailing_newline(content: &str) -> String {
    if content.is_empty() || content.ends_with('\n') {
        content.to_string()
    } else {
        format!("{content}\n")
    }
}
