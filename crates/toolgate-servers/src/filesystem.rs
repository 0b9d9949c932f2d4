// Filesystem tool server
//
// Tools operate relative to a configured root directory. Paths that are
// absolute or escape the root are a tool-level error; full sandbox
// hardening (symlinks, mounts) is outside this server's scope.

use async_trait::async_trait;
use serde_json::{json, Value};
use std::path::PathBuf;

use toolgate_core::{Tool, ToolExecution, ToolServer};

use crate::paths::resolve;

/// Maximum file size read_file will return
const MAX_READ_BYTES: u64 = 512 * 1024;

/// Filesystem tool server rooted at a directory
pub struct FilesystemServer {
    root: PathBuf,
}

impl FilesystemServer {
    /// Create a server rooted at the given directory
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }
}

impl ToolServer for FilesystemServer {
    fn name(&self) -> &str {
        "filesystem"
    }

    fn description(&self) -> &str {
        "Read, write, list, stat and delete files under a sandboxed root directory."
    }

    fn system_prompt_addition(&self) -> Option<&str> {
        Some("You have access to filesystem tools rooted at a working directory. All paths are relative to that root.")
    }

    fn tools(&self) -> Vec<Box<dyn Tool>> {
        vec![
            Box::new(ListDirTool {
                root: self.root.clone(),
            }),
            Box::new(ReadFileTool {
                root: self.root.clone(),
            }),
            Box::new(WriteFileTool {
                root: self.root.clone(),
            }),
            Box::new(DeleteFileTool {
                root: self.root.clone(),
            }),
            Box::new(StatFileTool {
                root: self.root.clone(),
            }),
        ]
    }
}

fn required_path(arguments: &Value) -> Result<&str, ToolExecution> {
    arguments
        .get("path")
        .and_then(|v| v.as_str())
        .ok_or_else(|| ToolExecution::tool_error("Missing required parameter: path"))
}

// ============================================================================
// Tool: list_dir
// ============================================================================

/// Lists directory entries under the root
pub struct ListDirTool {
    root: PathBuf,
}

impl ListDirTool {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }
}

#[async_trait]
impl Tool for ListDirTool {
    fn name(&self) -> &str {
        "list_dir"
    }

    fn description(&self) -> &str {
        "List the entries of a directory. Returns name, kind and size for each entry."
    }

    fn parameters_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "path": {
                    "type": "string",
                    "description": "Directory path relative to the root. Defaults to '.'"
                }
            },
            "additionalProperties": false
        })
    }

    async fn execute(&self, arguments: Value) -> ToolExecution {
        let raw = arguments.get("path").and_then(|v| v.as_str()).unwrap_or(".");

        let dir = match resolve(&self.root, raw) {
            Ok(p) => p,
            Err(msg) => return ToolExecution::tool_error(msg),
        };

        let mut read_dir = match tokio::fs::read_dir(&dir).await {
            Ok(rd) => rd,
            Err(e) => {
                return ToolExecution::tool_error(format!("Cannot read directory '{}': {}", raw, e))
            }
        };

        let mut entries = Vec::new();
        loop {
            match read_dir.next_entry().await {
                Ok(Some(entry)) => {
                    let name = entry.file_name().to_string_lossy().into_owned();
                    let (kind, size) = match entry.metadata().await {
                        Ok(meta) => (
                            if meta.is_dir() { "dir" } else { "file" },
                            meta.len(),
                        ),
                        Err(_) => ("unknown", 0),
                    };
                    entries.push(json!({
                        "name": name,
                        "kind": kind,
                        "size": size
                    }));
                }
                Ok(None) => break,
                Err(e) => {
                    return ToolExecution::internal_error(format!(
                        "Failed while iterating '{}': {}",
                        raw, e
                    ))
                }
            }
        }

        entries.sort_by(|a, b| a["name"].as_str().cmp(&b["name"].as_str()));

        ToolExecution::success(json!({
            "path": raw,
            "count": entries.len(),
            "entries": entries
        }))
    }
}

// ============================================================================
// Tool: read_file
// ============================================================================

/// Reads a UTF-8 file under the root
pub struct ReadFileTool {
    root: PathBuf,
}

impl ReadFileTool {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }
}

#[async_trait]
impl Tool for ReadFileTool {
    fn name(&self) -> &str {
        "read_file"
    }

    fn description(&self) -> &str {
        "Read a UTF-8 text file and return its content."
    }

    fn parameters_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "path": {
                    "type": "string",
                    "description": "File path relative to the root"
                }
            },
            "required": ["path"],
            "additionalProperties": false
        })
    }

    async fn execute(&self, arguments: Value) -> ToolExecution {
        let raw = match required_path(&arguments) {
            Ok(p) => p,
            Err(e) => return e,
        };

        let file = match resolve(&self.root, raw) {
            Ok(p) => p,
            Err(msg) => return ToolExecution::tool_error(msg),
        };

        match tokio::fs::metadata(&file).await {
            Ok(meta) if meta.len() > MAX_READ_BYTES => {
                return ToolExecution::tool_error(format!(
                    "File '{}' is too large ({} bytes, limit {})",
                    raw,
                    meta.len(),
                    MAX_READ_BYTES
                ));
            }
            Ok(_) => {}
            Err(e) => {
                return ToolExecution::tool_error(format!("Cannot stat '{}': {}", raw, e));
            }
        }

        let bytes = match tokio::fs::read(&file).await {
            Ok(b) => b,
            Err(e) => return ToolExecution::tool_error(format!("Cannot read '{}': {}", raw, e)),
        };

        match String::from_utf8(bytes) {
            Ok(content) => ToolExecution::success(json!({
                "path": raw,
                "size": content.len(),
                "content": content
            })),
            Err(_) => ToolExecution::tool_error(format!("File '{}' is not valid UTF-8", raw)),
        }
    }
}

// ============================================================================
// Tool: write_file
// ============================================================================

/// Writes (or appends to) a file under the root
pub struct WriteFileTool {
    root: PathBuf,
}

impl WriteFileTool {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }
}

#[async_trait]
impl Tool for WriteFileTool {
    fn name(&self) -> &str {
        "write_file"
    }

    fn description(&self) -> &str {
        "Write text content to a file, creating parent directories as needed. Set append to true to append instead of overwrite."
    }

    fn parameters_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "path": {
                    "type": "string",
                    "description": "File path relative to the root"
                },
                "content": {
                    "type": "string",
                    "description": "Text content to write"
                },
                "append": {
                    "type": "boolean",
                    "description": "Append instead of overwrite. Defaults to false."
                }
            },
            "required": ["path", "content"],
            "additionalProperties": false
        })
    }

    async fn execute(&self, arguments: Value) -> ToolExecution {
        let raw = match required_path(&arguments) {
            Ok(p) => p,
            Err(e) => return e,
        };
        let Some(content) = arguments.get("content").and_then(|v| v.as_str()) else {
            return ToolExecution::tool_error("Missing required parameter: content");
        };
        let append = arguments
            .get("append")
            .and_then(|v| v.as_bool())
            .unwrap_or(false);

        let file = match resolve(&self.root, raw) {
            Ok(p) => p,
            Err(msg) => return ToolExecution::tool_error(msg),
        };

        if let Some(parent) = file.parent() {
            if let Err(e) = tokio::fs::create_dir_all(parent).await {
                return ToolExecution::internal_error(format!(
                    "Failed to create parent directories for '{}': {}",
                    raw, e
                ));
            }
        }

        let result = if append {
            use tokio::io::AsyncWriteExt;
            match tokio::fs::OpenOptions::new()
                .create(true)
                .append(true)
                .open(&file)
                .await
            {
                Ok(mut f) => f.write_all(content.as_bytes()).await,
                Err(e) => Err(e),
            }
        } else {
            tokio::fs::write(&file, content).await
        };

        match result {
            Ok(()) => ToolExecution::success(json!({
                "path": raw,
                "bytes_written": content.len(),
                "append": append
            })),
            Err(e) => ToolExecution::tool_error(format!("Cannot write '{}': {}", raw, e)),
        }
    }
}

// ============================================================================
// Tool: delete_file
// ============================================================================

/// Deletes a file under the root
pub struct DeleteFileTool {
    root: PathBuf,
}

impl DeleteFileTool {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }
}

#[async_trait]
impl Tool for DeleteFileTool {
    fn name(&self) -> &str {
        "delete_file"
    }

    fn description(&self) -> &str {
        "Delete a file. Directories are not deleted."
    }

    fn parameters_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "path": {
                    "type": "string",
                    "description": "File path relative to the root"
                }
            },
            "required": ["path"],
            "additionalProperties": false
        })
    }

    async fn execute(&self, arguments: Value) -> ToolExecution {
        let raw = match required_path(&arguments) {
            Ok(p) => p,
            Err(e) => return e,
        };

        let file = match resolve(&self.root, raw) {
            Ok(p) => p,
            Err(msg) => return ToolExecution::tool_error(msg),
        };

        match tokio::fs::metadata(&file).await {
            Ok(meta) if meta.is_dir() => {
                return ToolExecution::tool_error(format!("'{}' is a directory", raw));
            }
            Ok(_) => {}
            Err(e) => {
                return ToolExecution::tool_error(format!("Cannot stat '{}': {}", raw, e));
            }
        }

        match tokio::fs::remove_file(&file).await {
            Ok(()) => ToolExecution::success(json!({ "path": raw, "deleted": true })),
            Err(e) => ToolExecution::tool_error(format!("Cannot delete '{}': {}", raw, e)),
        }
    }
}

// ============================================================================
// Tool: stat_file
// ============================================================================

/// Stats a path under the root
pub struct StatFileTool {
    root: PathBuf,
}

impl StatFileTool {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }
}

#[async_trait]
impl Tool for StatFileTool {
    fn name(&self) -> &str {
        "stat_file"
    }

    fn description(&self) -> &str {
        "Return metadata for a path: existence, kind, size and modification time."
    }

    fn parameters_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "path": {
                    "type": "string",
                    "description": "Path relative to the root"
                }
            },
            "required": ["path"],
            "additionalProperties": false
        })
    }

    async fn execute(&self, arguments: Value) -> ToolExecution {
        let raw = match required_path(&arguments) {
            Ok(p) => p,
            Err(e) => return e,
        };

        let target = match resolve(&self.root, raw) {
            Ok(p) => p,
            Err(msg) => return ToolExecution::tool_error(msg),
        };

        let meta = match tokio::fs::metadata(&target).await {
            Ok(meta) => meta,
            Err(_) => {
                return ToolExecution::success(json!({ "path": raw, "exists": false }));
            }
        };

        let modified = meta
            .modified()
            .ok()
            .map(chrono::DateTime::<chrono::Utc>::from)
            .map(|t| t.to_rfc3339());

        ToolExecution::success(json!({
            "path": raw,
            "exists": true,
            "kind": if meta.is_dir() { "dir" } else { "file" },
            "size": meta.len(),
            "modified": modified
        }))
    }
}

// ============================================================================
// Tests
// ============================================================================
