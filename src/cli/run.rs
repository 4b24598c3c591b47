use super::build_agent;
use crate::config::Config;
use colored::*;
use std::path::PathBuf;

pub async fn run_goal(
    workspace: PathBuf,
    cfg: Config,
    goal: &str,
    verbose: bool,
) -> anyhow::Result<()> {
    if verbose {
        println!("{} {}", "Workspace:".dimmed(), workspace.display());
        println!("{} {}", "Model:".dimmed(), cfg.llm.model);
        println!("{} {}", "Allow writes:".dimmed(), cfg.agent.allow_writes);
        println!("{} {}", "Goal:".dimmed(), goal);
    }
    let mut agent = build_agent(&workspace, &cfg, verbose).await?;
    let output = agent.run(goal).await?;
    if verbose {
        println!("\n{}", "-".repeat(60).dimmed());
    }
    println!("{}", output);
    Ok(())
}
