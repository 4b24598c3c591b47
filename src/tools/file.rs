use crate::discovery::{
    DirectoryListing, DiscoveryLedger, EntryInfo, EntryKind, file_extension, normalize_path,
    sanitize_path_tail,
};
use crate::tools::base::{Tool, ToolError, ToolResult, required_str};
use async_trait::async_trait;
use serde_json::{Value, json};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::RwLock;

pub type SharedLedger = Arc<RwLock<DiscoveryLedger>>;

fn schema_for_path(description: &str) -> Value {
    json!({
        "type": "object",
        "properties": {
            "path": {"type": "string", "description": description}
        },
        "required": ["path"],
    })
}

/// Non-recursive listing of `dir`, sorted by name. Entries that are
/// neither files nor directories (broken links, sockets) are skipped.
pub async fn list_directory(dir: &Path) -> Result<DirectoryListing, ToolError> {
    let meta = match tokio::fs::metadata(dir).await {
        Ok(m) => m,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            return Err(ToolError::PathNotFound(dir.to_path_buf()));
        }
        Err(e) => return Err(ToolError::io("stat error", dir, e)),
    };
    if !meta.is_dir() {
        return Err(ToolError::NotADirectory(dir.to_path_buf()));
    }

    let mut rd = tokio::fs::read_dir(dir)
        .await
        .map_err(|e| ToolError::io("list error", dir, e))?;
    let mut names = Vec::new();
    while let Some(entry) = rd
        .next_entry()
        .await
        .map_err(|e| ToolError::io("list error", dir, e))?
    {
        names.push(entry.file_name().to_string_lossy().to_string());
    }
    names.sort();

    let mut items = Vec::with_capacity(names.len());
    for name in names {
        let child = dir.join(&name);
        // follows symlinks, like a plain is_dir/is_file check
        let Ok(meta) = tokio::fs::metadata(&child).await else {
            continue;
        };
        let path = child.display().to_string();
        if meta.is_dir() {
            items.push(EntryInfo {
                name,
                path,
                kind: EntryKind::Directory,
                extension: None,
                size: None,
            });
        } else if meta.is_file() {
            let extension = file_extension(&name);
            items.push(EntryInfo {
                name,
                path,
                kind: EntryKind::File,
                extension,
                size: Some(meta.len()),
            });
        }
    }
    Ok(DirectoryListing {
        current_path: dir.display().to_string(),
        items,
    })
}

pub struct GetFileInfoTool {
    pub workspace: PathBuf,
    pub ledger: SharedLedger,
}

pub struct ReadFileTool {
    pub workspace: PathBuf,
    pub ledger: SharedLedger,
}

pub struct WriteFileTool {
    pub workspace: PathBuf,
    pub ledger: SharedLedger,
    pub allow_writes: bool,
}

impl GetFileInfoTool {
    async fn run(&self, args: &Value) -> Result<Value, ToolError> {
        let raw = sanitize_path_tail(required_str(args, "path")?);
        let dir = normalize_path(&self.workspace, raw);
        let listing = list_directory(&dir).await?;
        self.ledger.write().await.record_listing(&listing);
        tracing::debug!(path = %dir.display(), items = listing.items.len(), "listed directory");
        Ok(serde_json::to_value(listing).unwrap_or(Value::Null))
    }
}

#[async_trait]
impl Tool for GetFileInfoTool {
    fn name(&self) -> &str {
        "get_file_info"
    }
    fn description(&self) -> &str {
        "List files and directories (non-recursive) for a given directory path."
    }
    fn parameters(&self) -> Value {
        schema_for_path("Directory path to inspect. Use '.' for the repository root.")
    }
    async fn execute(&self, args: Value) -> ToolResult {
        self.run(&args).await.into()
    }
}

impl ReadFileTool {
    async fn run(&self, args: &Value) -> Result<Value, ToolError> {
        let path = normalize_path(&self.workspace, required_str(args, "path")?);
        if !self.ledger.read().await.is_file_confirmed(&path) {
            return Err(ToolError::FileNotConfirmed(path));
        }
        let meta = match tokio::fs::metadata(&path).await {
            Ok(m) => m,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(ToolError::PathNotFound(path));
            }
            Err(e) => return Err(ToolError::io("stat error", &path, e)),
        };
        if !meta.is_file() {
            return Err(ToolError::NotAFile(path));
        }
        let content = tokio::fs::read_to_string(&path)
            .await
            .map_err(|e| ToolError::io("read error", &path, e))?;
        Ok(json!({"path": path.display().to_string(), "content": content}))
    }
}

#[async_trait]
impl Tool for ReadFileTool {
    fn name(&self) -> &str {
        "read_file"
    }
    fn description(&self) -> &str {
        "Read a file's content (UTF-8). Must only be used after confirming existence via get_file_info."
    }
    fn parameters(&self) -> Value {
        schema_for_path("Path of the file to read.")
    }
    async fn execute(&self, args: Value) -> ToolResult {
        self.run(&args).await.into()
    }
}

/// Where `path` really lands: its deepest existing ancestor resolved
/// through symlinks, with the not-yet-created components re-appended.
/// `path` must already be lexically normalised.
async fn resolve_real_path(path: &Path) -> std::io::Result<PathBuf> {
    let mut existing = path;
    let mut missing = Vec::new();
    loop {
        match tokio::fs::symlink_metadata(existing).await {
            Ok(_) => break,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                let (Some(parent), Some(name)) = (existing.parent(), existing.file_name()) else {
                    return Err(e);
                };
                missing.push(name.to_os_string());
                existing = parent;
            }
            Err(e) => return Err(e),
        }
    }
    // a dangling link fails here rather than being written through
    let mut real = tokio::fs::canonicalize(existing).await?;
    real.extend(missing.iter().rev());
    Ok(real)
}

impl WriteFileTool {
    async fn run(&self, args: &Value) -> Result<Value, ToolError> {
        if !self.allow_writes {
            return Err(ToolError::WriteNotAllowed);
        }
        let path = normalize_path(&self.workspace, required_str(args, "path")?);
        let content = required_str(args, "content")?;
        let root = normalize_path(&self.workspace, ".");
        if path == root || !path.starts_with(&root) {
            return Err(ToolError::OutsideWorkspace(path));
        }
        // A symlinked directory inside the workspace may point anywhere.
        let real_root = tokio::fs::canonicalize(&root)
            .await
            .map_err(|e| ToolError::io("resolve error", &root, e))?;
        let real = resolve_real_path(&path)
            .await
            .map_err(|e| ToolError::io("resolve error", &path, e))?;
        if real == real_root || !real.starts_with(&real_root) {
            tracing::warn!(path = %path.display(), real = %real.display(), "write escapes workspace");
            return Err(ToolError::OutsideWorkspace(path));
        }
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| ToolError::io("create dir error", parent, e))?;
        }
        tokio::fs::write(&path, content)
            .await
            .map_err(|e| ToolError::io("write error", &path, e))?;
        self.ledger.write().await.record_file(&path);
        tracing::info!(path = %path.display(), bytes = content.len(), "wrote file");
        Ok(json!({
            "message": format!("Wrote {} bytes to {}", content.len(), path.display())
        }))
    }
}

#[async_trait]
impl Tool for WriteFileTool {
    fn name(&self) -> &str {
        "write_file"
    }
    fn description(&self) -> &str {
        "Create or update a file with the full content given. Creates parent directories if missing. Only when explicitly instructed."
    }
    fn parameters(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "path": {"type": "string", "description": "Path of the file to write."},
                "content": {"type": "string", "description": "Full content to write into the file."}
            },
            "required": ["path", "content"],
        })
    }
    async fn execute(&self, args: Value) -> ToolResult {
        self.run(&args).await.into()
    }
}
