use std::path::Path;

pub trait AgentObserver: Send + Sync {
    fn on_log_file(&self, _path: &Path) {}
    fn on_step(&self, _step: usize, _max_steps: usize) {}
    fn on_assistant_text(&self, _text: &str) {}
    fn on_thinking(&self, _text: &str) {}
    fn on_tool_call(&self, _name: &str, _args_preview: &str) {}
    fn on_tool_result(&self, _name: &str, _success: bool, _preview: &str) {}
}

/// Observer that ignores everything.
pub struct NullObserver;

impl AgentObserver for NullObserver {}

/// Prints the agent's progress to stdout. Quiet unless `verbose`; the
/// final answer is always printed by the caller.
pub struct ConsoleObserver {
    verbose: bool,
}

impl ConsoleObserver {
    pub fn new(verbose: bool) -> Self {
        Self { verbose }
    }
}

impl AgentObserver for ConsoleObserver {
    fn on_log_file(&self, path: &Path) {
        use colored::*;
        if self.verbose {
            println!("{} {}", "Log file:".dimmed(), path.display());
        }
    }
    fn on_step(&self, step: usize, max_steps: usize) {
        use colored::*;
        if self.verbose {
            println!("\n{}", format!("Step {}/{}", step, max_steps).dimmed());
        }
    }
    fn on_assistant_text(&self, text: &str) {
        use colored::*;
        if self.verbose {
            println!("\n{}\n{}", "Assistant:".bright_blue().bold(), text);
        }
    }
    fn on_thinking(&self, text: &str) {
        use colored::*;
        if self.verbose {
            println!("\n{}\n{}", "Thinking:".magenta().bold(), text.dimmed());
        }
    }
    fn on_tool_call(&self, name: &str, args_preview: &str) {
        use colored::*;
        if self.verbose {
            println!("\n{} {}", "Tool Call:".yellow().bold(), name.cyan().bold());
            for line in args_preview.lines() {
                println!("   {}", line.dimmed());
            }
        }
    }
    fn on_tool_result(&self, _name: &str, success: bool, preview: &str) {
        use colored::*;
        if !self.verbose {
            return;
        }
        if success {
            println!("{} {}", "Result:".green(), preview);
        } else {
            println!("{} {}", "Error:".red().bold(), preview.red());
        }
    }
}
