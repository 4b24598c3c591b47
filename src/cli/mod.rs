use clap::{Parser, Subcommand};
use colored::*;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::RwLock;

use crate::agent::Agent;
use crate::config::Config;
use crate::discovery::DiscoveryLedger;
use crate::llm::LlmClient;
use crate::logger::AgentLogger;
use crate::observer::ConsoleObserver;
use crate::prompt::{DEFAULT_GOAL, build_system_prompt, load_base_prompt};
use crate::tools::Toolbox;
use crate::tools::file::{GetFileInfoTool, ReadFileTool, WriteFileTool};
use crate::tools::git::GitDiffTool;

mod run;
mod tools;

#[derive(Parser, Debug)]
#[command(
    name = "docagent",
    version,
    about = "Explore a repository with an LLM and keep its documentation up to date",
    long_about = None,
    disable_help_subcommand = true,
    subcommand_precedence_over_arg = true,
)]
pub struct Cli {
    /// Instruction for the agent. A goal that is exactly `tools` is read as
    /// the tools subcommand; pass a longer sentence in quotes instead.
    #[arg(value_name = "GOAL", default_value = DEFAULT_GOAL, hide_default_value = true)]
    pub goal: String,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Repository to work in (default: current dir)
    #[arg(short, long, global = true)]
    pub workspace: Option<PathBuf>,

    /// Config file (default: ./.docagent/config.yaml, then ~/.docagent/config.yaml)
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Override the model (otherwise OPENAI_MODEL, then gpt-4o-mini)
    #[arg(short, long)]
    pub model: Option<String>,

    /// Disable write_file for this run
    #[arg(long, global = true)]
    pub read_only: bool,

    /// Maximum number of LLM round trips
    #[arg(long, value_parser = clap::value_parser!(u32).range(1..))]
    pub max_steps: Option<u32>,

    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Inspect or call the agent's tools without the LLM
    Tools {
        #[command(subcommand)]
        cmd: tools::ToolsCmd,
    },
}

impl Cli {
    /// Fold command-line overrides into the loaded configuration.
    pub fn apply_overrides(&self, cfg: &mut Config) {
        if let Some(m) = &self.model {
            cfg.llm.model = m.clone();
        }
        if let Some(n) = self.max_steps {
            cfg.agent.max_steps = n as usize;
        }
        if self.read_only {
            cfg.agent.allow_writes = false;
        }
    }
}

pub async fn run_cli() -> anyhow::Result<()> {
    let cli = Cli::parse();
    crate::logger::init_tracing(cli.verbose);

    let workspace = match &cli.workspace {
        Some(w) => w.clone(),
        None => std::env::current_dir()?,
    };
    if !workspace.is_dir() {
        anyhow::bail!("Workspace is not a directory: {}", workspace.display());
    }
    let workspace = workspace.canonicalize().unwrap_or(workspace);

    let mut cfg = Config::resolve(cli.config.as_deref())?;
    cli.apply_overrides(&mut cfg);

    match &cli.command {
        Some(Command::Tools { cmd }) => tools::tools_cmd(&workspace, &cfg, cmd).await,
        None => {
            if let Err(e) = cfg.validate() {
                eprintln!("{} {}", "Error:".red(), e);
                return Err(e);
            }
            run::run_goal(workspace, cfg, &cli.goal, cli.verbose).await
        }
    }
}

/// Tools offered to the model for this workspace. All file tools share one
/// discovery ledger.
pub(super) fn build_toolbox(workspace: &Path, cfg: &Config) -> Toolbox {
    let ledger = Arc::new(RwLock::new(DiscoveryLedger::new()));
    let mut toolbox = Toolbox::default();
    toolbox.add(Arc::new(GetFileInfoTool {
        workspace: workspace.to_path_buf(),
        ledger: ledger.clone(),
    }));
    toolbox.add(Arc::new(ReadFileTool {
        workspace: workspace.to_path_buf(),
        ledger: ledger.clone(),
    }));
    toolbox.add(Arc::new(WriteFileTool {
        workspace: workspace.to_path_buf(),
        ledger,
        allow_writes: cfg.agent.allow_writes,
    }));
    if cfg.tools.enable_git {
        toolbox.add(Arc::new(GitDiffTool {
            workspace: workspace.to_path_buf(),
            max_output_chars: cfg.tools.max_output_chars,
        }));
    }
    toolbox
}

pub(super) async fn build_agent(workspace: &Path, cfg: &Config, verbose: bool) -> anyhow::Result<Agent> {
    let llm = LlmClient::from_config(&cfg.llm).await?;

    let prompt_path = cfg.agent.system_prompt_path.as_ref().map(PathBuf::from);
    let base = load_base_prompt(prompt_path.as_deref())?;
    let system_prompt = build_system_prompt(&base, workspace, cfg.agent.allow_writes);

    let logger = if cfg.agent.run_log {
        AgentLogger::new(cfg.log_dir())
    } else {
        AgentLogger::disabled()
    };

    Ok(Agent::builder(llm, system_prompt)
        .with_toolbox(build_toolbox(workspace, cfg))
        .with_max_steps(cfg.agent.max_steps)
        .with_logger(logger)
        .with_observer(Arc::new(ConsoleObserver::new(verbose)))
        .build())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_goal_and_flags() {
        let cli = Cli::try_parse_from(["docagent"]).unwrap();
        assert_eq!(cli.goal, DEFAULT_GOAL);
        assert!(!cli.verbose);
        assert!(cli.command.is_none());

        let cli = Cli::try_parse_from(["docagent", "-v", "Document the config module"]).unwrap();
        assert_eq!(cli.goal, "Document the config module");
        assert!(cli.verbose);
    }

    #[test]
    fn test_overrides_applied() {
        let cli = Cli::try_parse_from([
            "docagent",
            "--read-only",
            "--max-steps",
            "5",
            "--model",
            "gpt-4o",
            "goal",
        ])
        .unwrap();
        let mut cfg = Config::default();
        cli.apply_overrides(&mut cfg);
        assert!(!cfg.agent.allow_writes);
        assert_eq!(cfg.agent.max_steps, 5);
        assert_eq!(cfg.llm.model, "gpt-4o");
    }

    #[test]
    fn test_zero_max_steps_rejected() {
        assert!(Cli::try_parse_from(["docagent", "--max-steps", "0"]).is_err());
    }

    #[test]
    fn test_tools_subcommand() {
        let cli = Cli::try_parse_from(["docagent", "tools", "list"]).unwrap();
        assert!(matches!(cli.command, Some(Command::Tools { .. })));
    }

    #[test]
    fn test_bare_tools_word_is_the_subcommand() {
        assert!(Cli::try_parse_from(["docagent", "tools"]).is_err());

        let cli = Cli::try_parse_from(["docagent", "tools need better docs"]).unwrap();
        assert!(cli.command.is_none());
        assert_eq!(cli.goal, "tools need better docs");
    }

    #[test]
    fn test_toolbox_respects_git_flag() {
        let mut cfg = Config::default();
        let tb = build_toolbox(Path::new("/repo"), &cfg);
        assert_eq!(
            tb.names(),
            vec!["get_file_info", "git_diff", "read_file", "write_file"]
        );
        cfg.tools.enable_git = false;
        let tb = build_toolbox(Path::new("/repo"), &cfg);
        assert!(!tb.contains("git_diff"));
    }
}
