use std::path::Path;

pub const DEFAULT_GOAL: &str = "Please analyze the codebase and update the documentations as needed. Focus on .md files, docs/ directory, and ensure all modified code has proper docstrings.";

pub const SYSTEM_PROMPT: &str = concat!(
    "You are a repository documentation agent.\n\n",
    "You can navigate repositories using tools.\n",
    "You must explore directories step by step.\n\n",
    "Rules:\n",
    "- Use get_file_info to list files and directories.\n",
    "- Start with get_file_info on '.' to list the root directory, then navigate between files.\n",
    "- Do not assume any file exists without checking.\n",
    "- Use read_file only after confirming the file exists.\n",
    "- Use write_file only when explicitly instructed.\n",
    "- Never hallucinate file paths.\n",
    "- Think step by step before taking actions.\n\n",
    "Documentation duties:\n",
    "- Use git_diff (when available) to identify developer-relevant changes.\n",
    "- Decide whether the documentation needs updating for those changes.\n",
    "- Update or create documentation only when it adds real value to developers.\n",
    "- Finish with a short summary of what you changed, or why nothing needed changing.\n",
);

/// Final system prompt: the base (built-in or loaded from file) with the
/// workspace location and, when writes are off, a read-only notice.
pub fn build_system_prompt(base: &str, workspace: &Path, allow_writes: bool) -> String {
    let mut prompt = base.trim_end().to_string();
    if !prompt.contains("## Current Workspace") {
        let abs = workspace
            .canonicalize()
            .unwrap_or_else(|_| workspace.to_path_buf());
        prompt.push_str(&format!(
            "\n\n## Current Workspace\nYou are currently working in: `{}`\nAll relative paths will be resolved relative to this directory.",
            abs.display()
        ));
    }
    if !allow_writes {
        prompt.push_str(
            "\n\n## Read-only Mode\nWrites are disabled for this run. Do not call write_file; describe the documentation changes you would make instead.",
        );
    }
    prompt
}

/// Built-in prompt unless `path` points at a readable file.
pub fn load_base_prompt(path: Option<&Path>) -> anyhow::Result<String> {
    match path {
        Some(p) if p.exists() => Ok(std::fs::read_to_string(p)?),
        Some(p) => {
            tracing::warn!(path = %p.display(), "system prompt file not found; using built-in prompt");
            Ok(SYSTEM_PROMPT.to_string())
        }
        None => Ok(SYSTEM_PROMPT.to_string()),
    }
}
