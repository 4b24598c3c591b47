use async_trait::async_trait;
use serde_json::{Value, json};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

#[derive(Debug, Clone)]
pub struct ToolResult {
    pub success: bool,
    pub content: String,
    pub error: Option<String>,
}

impl ToolResult {
    pub fn ok(content: impl Into<String>) -> Self {
        Self {
            success: true,
            content: content.into(),
            error: None,
        }
    }

    pub fn json(value: &Value) -> Self {
        Self::ok(value.to_string())
    }

    /// Failure payload the model sees: `{"error": code, "message": ..}`
    /// plus the offending path when there is one.
    pub fn failure(err: ToolError) -> Self {
        let mut payload = json!({
            "error": err.code(),
            "message": err.to_string(),
        });
        if let Some(p) = err.path() {
            payload["path"] = json!(p.display().to_string());
        }
        Self {
            success: false,
            content: String::new(),
            error: Some(payload.to_string()),
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ToolError {
    #[error("missing '{0}'")]
    MissingArgument(&'static str),
    #[error("Path does not exist: {}", .0.display())]
    PathNotFound(PathBuf),
    #[error("Path is not a directory: {}", .0.display())]
    NotADirectory(PathBuf),
    #[error("Not a file: {}", .0.display())]
    NotAFile(PathBuf),
    #[error("Attempted to read a file that has not been confirmed via get_file_info.")]
    FileNotConfirmed(PathBuf),
    #[error("Write operations are disabled. Enable allow_writes to proceed.")]
    WriteNotAllowed,
    #[error("Refusing to write outside the workspace: {}", .0.display())]
    OutsideWorkspace(PathBuf),
    #[error("{context}: {source}")]
    Io {
        context: String,
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("git failed: {0}")]
    Git(String),
    #[error("Unknown tool: {0}")]
    UnknownTool(String),
}

impl ToolError {
    pub fn code(&self) -> &'static str {
        match self {
            ToolError::MissingArgument(_) => "missing_argument",
            ToolError::PathNotFound(_) => "path_not_found",
            ToolError::NotADirectory(_) => "not_a_directory",
            ToolError::NotAFile(_) => "not_a_file",
            ToolError::FileNotConfirmed(_) => "file_not_confirmed",
            ToolError::WriteNotAllowed => "write_not_allowed",
            ToolError::OutsideWorkspace(_) => "outside_workspace",
            ToolError::Io { .. } => "io_error",
            ToolError::Git(_) => "git_failed",
            ToolError::UnknownTool(_) => "unknown_tool",
        }
    }

    pub fn path(&self) -> Option<&Path> {
        match self {
            ToolError::PathNotFound(p)
            | ToolError::NotADirectory(p)
            | ToolError::NotAFile(p)
            | ToolError::FileNotConfirmed(p)
            | ToolError::OutsideWorkspace(p)
            | ToolError::Io { path: p, .. } => Some(p),
            _ => None,
        }
    }

    pub fn io(context: impl Into<String>, path: &Path, source: std::io::Error) -> Self {
        ToolError::Io {
            context: context.into(),
            path: path.to_path_buf(),
            source,
        }
    }
}

impl From<Result<Value, ToolError>> for ToolResult {
    fn from(r: Result<Value, ToolError>) -> Self {
        match r {
            Ok(v) => ToolResult::json(&v),
            Err(e) => ToolResult::failure(e),
        }
    }
}

pub fn required_str<'a>(args: &'a Value, key: &'static str) -> Result<&'a str, ToolError> {
    args.get(key)
        .and_then(|v| v.as_str())
        .ok_or(ToolError::MissingArgument(key))
}

#[async_trait]
pub trait Tool: Send + Sync {
    fn name(&self) -> &str;
    fn description(&self) -> &str;
    fn parameters(&self) -> Value;
    async fn execute(&self, args: Value) -> ToolResult;

    fn to_siumai_tool(&self) -> siumai::types::Tool {
        siumai::types::Tool::function(
            self.name().to_string(),
            self.description().to_string(),
            self.parameters(),
        )
    }
}

/// Name-indexed set of tools offered to the model.
#[derive(Clone, Default)]
pub struct Toolbox {
    tools: HashMap<String, Arc<dyn Tool>>,
}

impl Toolbox {
    pub fn new(tools: Vec<Arc<dyn Tool>>) -> Self {
        let mut map = HashMap::new();
        for t in tools {
            map.insert(t.name().to_string(), t);
        }
        Self { tools: map }
    }

    pub fn add(&mut self, tool: Arc<dyn Tool>) {
        self.tools.insert(tool.name().to_string(), tool);
    }

    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.tools.keys().cloned().collect();
        names.sort();
        names
    }

    pub fn schema(&self, name: &str) -> Option<(String, String, Value)> {
        self.tools.get(name).map(|t| {
            (
                t.name().to_string(),
                t.description().to_string(),
                t.parameters(),
            )
        })
    }

    /// Schemas in name order so requests are stable across runs.
    pub fn to_siumai_tools(&self) -> Vec<siumai::types::Tool> {
        self.names()
            .iter()
            .filter_map(|n| self.tools.get(n))
            .map(|t| t.to_siumai_tool())
            .collect()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.tools.contains_key(name)
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }

    pub async fn execute(&self, name: &str, args: Value) -> ToolResult {
        match self.tools.get(name) {
            Some(t) => t.execute(args).await,
            None => ToolResult::failure(ToolError::UnknownTool(name.to_string())),
        }
    }
}
