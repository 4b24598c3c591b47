//! Paths the agent has confirmed to exist.
//!
//! The model may only read files it has seen in a directory listing (or
//! written itself). Every path is normalised before it is recorded or
//! looked up so that `docs/../README.md` and `README.md` are the same key.

use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::{Component, Path, PathBuf};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntryKind {
    File,
    Directory,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntryInfo {
    pub name: String,
    pub path: String,
    #[serde(rename = "type")]
    pub kind: EntryKind,
    pub extension: Option<String>,
    pub size: Option<u64>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DirectoryListing {
    pub current_path: String,
    pub items: Vec<EntryInfo>,
}

#[derive(Debug, Default)]
pub struct DiscoveryLedger {
    files: HashSet<PathBuf>,
    dirs: HashSet<PathBuf>,
}

impl DiscoveryLedger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_listing(&mut self, listing: &DirectoryListing) {
        self.dirs.insert(lexical_normalize(Path::new(&listing.current_path)));
        for item in &listing.items {
            let p = lexical_normalize(Path::new(&item.path));
            match item.kind {
                EntryKind::Directory => {
                    self.dirs.insert(p);
                }
                EntryKind::File => {
                    self.files.insert(p);
                }
            }
        }
    }

    pub fn record_file(&mut self, path: &Path) {
        self.files.insert(lexical_normalize(path));
    }

    pub fn is_file_confirmed(&self, path: &Path) -> bool {
        self.files.contains(&lexical_normalize(path))
    }

    pub fn is_dir_confirmed(&self, path: &Path) -> bool {
        self.dirs.contains(&lexical_normalize(path))
    }

    pub fn file_count(&self) -> usize {
        self.files.len()
    }

    pub fn dir_count(&self) -> usize {
        self.dirs.len()
    }
}

/// Resolve `raw` against `base`: expand a leading `~`, make it absolute and
/// drop `.`/`..` components without touching the filesystem.
pub fn normalize_path(base: &Path, raw: &str) -> PathBuf {
    let raw = raw.trim();
    let expanded = expand_tilde(raw);
    let joined = if expanded.is_absolute() {
        expanded
    } else {
        base.join(expanded)
    };
    lexical_normalize(&joined)
}

fn expand_tilde(raw: &str) -> PathBuf {
    if raw == "~" {
        if let Some(home) = dirs::home_dir() {
            return home;
        }
    } else if let Some(rest) = raw.strip_prefix("~/") {
        if let Some(home) = dirs::home_dir() {
            return home.join(rest);
        }
    }
    PathBuf::from(raw)
}

fn lexical_normalize(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for comp in path.components() {
        match comp {
            Component::CurDir => {}
            Component::ParentDir => {
                // `..` at the root stays at the root
                out.pop();
            }
            other => out.push(other.as_os_str()),
        }
    }
    if out.as_os_str().is_empty() {
        out.push(".");
    }
    out
}

/// Strip trailing characters that cannot end a sensible path. Models
/// occasionally close a path argument with quotes or punctuation.
pub fn sanitize_path_tail(raw: &str) -> &str {
    raw.trim_end_matches(|c: char| {
        !(c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-' | '/' | '~' | ' '))
    })
}

/// Extension as the text after the last dot. Dot-files such as `.env` and
/// names without a dot have none.
pub fn file_extension(name: &str) -> Option<String> {
    let stem_start = name.len() - name.trim_start_matches('.').len();
    let rest = &name[stem_start..];
    let idx = rest.rfind('.')?;
    let ext = &rest[idx + 1..];
    if ext.is_empty() {
        None
    } else {
        Some(ext.to_string())
    }
}
