use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;

/// Install the global tracing subscriber. `RUST_LOG` wins over the
/// verbosity flag.
pub fn init_tracing(verbose: bool) {
    let default = if verbose { "docagent=debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}

/// Per-run transcript of requests, responses and tool results.
pub struct AgentLogger {
    log_dir: Option<PathBuf>,
    log_file: Option<PathBuf>,
    index: usize,
}

impl AgentLogger {
    pub fn new(dir: PathBuf) -> Self {
        Self {
            log_dir: Some(dir),
            log_file: None,
            index: 0,
        }
    }

    pub fn disabled() -> Self {
        Self {
            log_dir: None,
            log_file: None,
            index: 0,
        }
    }

    pub fn start_new_run(&mut self) {
        self.index = 0;
        self.log_file = None;
        let Some(dir) = &self.log_dir else {
            return;
        };
        if let Err(e) = fs::create_dir_all(dir) {
            tracing::warn!(dir = %dir.display(), error = %e, "cannot create log directory; run log disabled");
            return;
        }
        let ts = chrono::Local::now().format("%Y%m%d_%H%M%S%.3f");
        let file = dir.join(format!("agent_run_{}.log", ts));
        let header = format!(
            "{sep}\nAgent Run Log - {}\n{sep}\n\n",
            chrono::Local::now().format("%Y-%m-%d %H:%M:%S"),
            sep = "=".repeat(80)
        );
        match fs::write(&file, header) {
            Ok(()) => self.log_file = Some(file),
            Err(e) => {
                tracing::warn!(file = %file.display(), error = %e, "cannot create run log")
            }
        }
    }

    pub fn log_request(&mut self, payload: &serde_json::Value) {
        self.write("REQUEST", payload);
    }

    pub fn log_response(&mut self, payload: &serde_json::Value) {
        self.write("RESPONSE", payload);
    }

    pub fn log_tool_result(&mut self, payload: &serde_json::Value) {
        self.write("TOOL_RESULT", payload);
    }

    fn write(&mut self, kind: &str, payload: &serde_json::Value) {
        let Some(path) = &self.log_file else {
            return;
        };
        self.index += 1;
        let content = format!(
            "\n{sep}\n[{}] {}\nTimestamp: {}\n{sep}\n{}\n",
            self.index,
            kind,
            chrono::Local::now().format("%Y-%m-%d %H:%M:%S%.3f"),
            serde_json::to_string_pretty(payload).unwrap_or_default(),
            sep = "-".repeat(80),
        );
        let res = OpenOptions::new()
            .append(true)
            .open(path)
            .and_then(|mut f| f.write_all(content.as_bytes()));
        if let Err(e) = res {
            tracing::warn!(file = %path.display(), error = %e, "failed to append to run log");
        }
    }

    pub fn log_path(&self) -> Option<&Path> {
        self.log_file.as_deref()
    }
}
