use crate::tools::base::{Tool, ToolError, ToolResult};
use async_trait::async_trait;
use serde_json::{Value, json};
use std::path::PathBuf;
use std::process::Stdio;

/// Shows the working-tree diff so the model can see what changed.
pub struct GitDiffTool {
    pub workspace: PathBuf,
    pub max_output_chars: usize,
}

#[derive(Debug, Default, PartialEq)]
struct DiffOptions {
    staged: bool,
    name_only: bool,
    base: Option<String>,
    paths: Vec<String>,
}

impl DiffOptions {
    fn from_args(args: &Value) -> Result<Self, ToolError> {
        let flag = |k: &str| args.get(k).and_then(|v| v.as_bool()).unwrap_or(false);
        let base = args
            .get("base")
            .and_then(|v| v.as_str())
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_string);
        if let Some(b) = &base {
            // a leading dash would be parsed as an option by git
            if b.starts_with('-') {
                return Err(ToolError::Git(format!("invalid base revision: {}", b)));
            }
        }
        let paths = args
            .get("paths")
            .and_then(|v| v.as_array())
            .map(|a| {
                a.iter()
                    .filter_map(|p| p.as_str())
                    .map(str::to_string)
                    .collect()
            })
            .unwrap_or_default();
        Ok(Self {
            staged: flag("staged"),
            name_only: flag("name_only"),
            base,
            paths,
        })
    }

    fn to_git_args(&self) -> Vec<String> {
        let mut out = vec!["--no-pager".to_string(), "diff".to_string()];
        out.push("--no-color".into());
        if self.staged {
            out.push("--cached".into());
        }
        if self.name_only {
            out.push("--name-status".into());
        }
        if let Some(b) = &self.base {
            out.push(b.clone());
        }
        if !self.paths.is_empty() {
            out.push("--".into());
            out.extend(self.paths.iter().cloned());
        }
        out
    }
}

/// Cut `s` to at most `max` characters, noting how much was dropped.
pub fn truncate_output(s: &str, max: usize) -> String {
    match s.char_indices().nth(max) {
        Some((idx, _)) => {
            let dropped = s[idx..].chars().count();
            format!("{}\n... [truncated {} chars]", &s[..idx], dropped)
        }
        None => s.to_string(),
    }
}

#[async_trait]
impl Tool for GitDiffTool {
    fn name(&self) -> &str {
        "git_diff"
    }
    fn description(&self) -> &str {
        "Show the git diff of the repository (unstaged by default). Use it to find developer-relevant changes before deciding on documentation updates."
    }
    fn parameters(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "staged": {"type": "boolean", "description": "Diff the index instead of the working tree"},
                "base": {"type": "string", "description": "Revision to diff against, e.g. HEAD~1 or main"},
                "paths": {"type": "array", "items": {"type": "string"}, "description": "Limit the diff to these paths"},
                "name_only": {"type": "boolean", "description": "Only list changed files with their status"}
            }
        })
    }
    async fn execute(&self, args: Value) -> ToolResult {
        let opts = match DiffOptions::from_args(&args) {
            Ok(o) => o,
            Err(e) => return ToolResult::failure(e),
        };
        let output = match tokio::process::Command::new("git")
            .args(opts.to_git_args())
            .current_dir(&self.workspace)
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .output()
            .await
        {
            Ok(o) => o,
            Err(e) => return ToolResult::failure(ToolError::Git(e.to_string())),
        };
        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return ToolResult::failure(ToolError::Git(format!(
                "{} ({})",
                stderr.trim(),
                output.status
            )));
        }
        let stdout = String::from_utf8_lossy(&output.stdout);
        if stdout.trim().is_empty() {
            return ToolResult::ok("No changes.");
        }
        ToolResult::ok(truncate_output(&stdout, self.max_output_chars))
    }
}
