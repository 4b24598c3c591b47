use super::build_toolbox;
use crate::config::Config;
use clap::Subcommand;
use std::path::Path;

#[derive(Subcommand, Debug)]
pub enum ToolsCmd {
    /// List available tools
    List,
    /// Describe a tool (schema)
    Describe { name: String },
    /// Call a tool with JSON args
    Call {
        name: String,
        #[arg(short, long)]
        args: Option<String>,
    },
}

pub async fn tools_cmd(workspace: &Path, cfg: &Config, cmd: &ToolsCmd) -> anyhow::Result<()> {
    let toolbox = build_toolbox(workspace, cfg);
    match cmd {
        ToolsCmd::List => {
            let names = toolbox.names();
            println!("Available tools ({}):", names.len());
            for n in names {
                println!("  - {}", n);
            }
        }
        ToolsCmd::Describe { name } => match toolbox.schema(name) {
            Some((n, desc, params)) => {
                println!(
                    "name: {}\ndescription: {}\nparameters:\n{}",
                    n,
                    desc,
                    serde_json::to_string_pretty(&params).unwrap_or_default()
                );
            }
            None => anyhow::bail!("Tool '{}' not found", name),
        },
        ToolsCmd::Call { name, args } => {
            if !toolbox.contains(name) {
                anyhow::bail!("Tool '{}' not found", name);
            }
            let parsed: serde_json::Value = match args {
                Some(s) => serde_json::from_str(s)
                    .map_err(|e| anyhow::anyhow!("Invalid JSON for --args: {}", e))?,
                None => serde_json::json!({}),
            };
            let res = toolbox.execute(name, parsed).await;
            println!("success: {}", res.success);
            if res.success {
                println!("content:\n{}", res.content);
            }
            if let Some(err) = res.error {
                println!("error:\n{}", err);
            }
        }
    }
    Ok(())
}
