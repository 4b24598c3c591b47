use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryConfig {
    pub enabled: bool,
    pub max_retries: u32,
    pub initial_delay: f32,
    pub max_delay: f32,
    pub exponential_base: f32,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            max_retries: 3,
            initial_delay: 1.0,
            max_delay: 60.0,
            exponential_base: 2.0,
        }
    }
}

impl RetryConfig {
    /// Longest delay accepted, one day.
    pub const MAX_DELAY_SECS: f32 = 86_400.0;

    pub fn validate(&self) -> anyhow::Result<()> {
        for (field, secs) in [
            ("initial_delay", self.initial_delay),
            ("max_delay", self.max_delay),
        ] {
            if !secs.is_finite() || !(0.0..=Self::MAX_DELAY_SECS).contains(&secs) {
                anyhow::bail!(
                    "llm.retry.{} must be between 0 and {} seconds, got {}",
                    field,
                    Self::MAX_DELAY_SECS,
                    secs
                );
            }
        }
        if self.max_delay < self.initial_delay {
            anyhow::bail!("llm.retry.max_delay must not be less than initial_delay");
        }
        if !self.exponential_base.is_finite() || self.exponential_base < 1.0 {
            anyhow::bail!(
                "llm.retry.exponential_base must be at least 1.0, got {}",
                self.exponential_base
            );
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmConfig {
    #[serde(default = "default_provider")]
    pub provider: String,
    #[serde(default)]
    pub api_key: String,
    #[serde(default = "default_model")]
    pub model: String,
    #[serde(default)]
    pub base_url: Option<String>,
    #[serde(default)]
    pub retry: RetryConfig,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            provider: default_provider(),
            api_key: String::new(),
            model: default_model(),
            base_url: None,
            retry: RetryConfig::default(),
        }
    }
}

fn default_provider() -> String {
    "openai".to_string()
}
fn default_model() -> String {
    "gpt-4o-mini".to_string()
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentConfig {
    #[serde(default = "default_max_steps")]
    pub max_steps: usize,
    #[serde(default = "default_true")]
    pub allow_writes: bool,
    /// Replaces the built-in system prompt when set.
    #[serde(default)]
    pub system_prompt_path: Option<String>,
    /// Directory for per-run transcripts (default: ~/.docagent/log)
    #[serde(default)]
    pub log_dir: Option<String>,
    #[serde(default = "default_true")]
    pub run_log: bool,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            max_steps: default_max_steps(),
            allow_writes: true,
            system_prompt_path: None,
            log_dir: None,
            run_log: true,
        }
    }
}

fn default_max_steps() -> usize {
    20
}
fn default_true() -> bool {
    true
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolsConfig {
    #[serde(default = "default_true")]
    pub enable_git: bool,
    #[serde(default = "default_max_output_chars")]
    pub max_output_chars: usize,
}

impl Default for ToolsConfig {
    fn default() -> Self {
        Self {
            enable_git: true,
            max_output_chars: default_max_output_chars(),
        }
    }
}

fn default_max_output_chars() -> usize {
    60_000
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub llm: LlmConfig,
    #[serde(default)]
    pub agent: AgentConfig,
    #[serde(default)]
    pub tools: ToolsConfig,
}

impl Config {
    /// Explicit file, else the first discovered `config.yaml`, else
    /// defaults; environment overrides applied on top. Not validated, so
    /// commands that never reach the LLM work without an API key.
    pub fn resolve(explicit: Option<&Path>) -> anyhow::Result<Self> {
        let path = match explicit {
            Some(p) => {
                if !p.exists() {
                    anyhow::bail!("Config file not found: {}", p.display());
                }
                Some(p.to_path_buf())
            }
            None => Self::find_config_file("config.yaml"),
        };
        let mut cfg = match &path {
            Some(p) => {
                tracing::debug!(path = %p.display(), "loading config file");
                Self::from_yaml_file(p)?
            }
            None => Self::default(),
        };
        cfg.apply_env_overrides(|key| std::env::var(key).ok());
        Ok(cfg)
    }

    pub fn from_yaml_file(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_yaml_str(&content)
    }

    pub fn from_yaml_str(content: &str) -> anyhow::Result<Self> {
        if content.trim().is_empty() {
            return Ok(Self::default());
        }
        Ok(serde_yaml::from_str(content)?)
    }

    pub fn user_config_dir() -> PathBuf {
        let mut p = dirs::home_dir().unwrap_or_else(|| PathBuf::from("."));
        p.push(".docagent");
        p
    }

    pub fn default_log_dir() -> PathBuf {
        Self::user_config_dir().join("log")
    }

    pub fn find_config_file(filename: &str) -> Option<PathBuf> {
        // Priority 1: ./.docagent/{filename}
        let local = std::env::current_dir()
            .ok()?
            .join(".docagent")
            .join(filename);
        if local.exists() {
            return Some(local);
        }

        // Priority 2: ~/.docagent/{filename}
        let user = Self::user_config_dir().join(filename);
        if user.exists() {
            return Some(user);
        }
        None
    }

    /// Apply environment overrides using `lookup` to read variables.
    /// Empty values are treated as unset.
    pub fn apply_env_overrides<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        if let Some(p) = get("DOCAGENT_PROVIDER") {
            self.llm.provider = p;
        }
        if let Some(m) = get("DOCAGENT_MODEL").or_else(|| get("OPENAI_MODEL")) {
            self.llm.model = m;
        }
        if let Some(u) = get("DOCAGENT_BASE_URL").or_else(|| get("OPENAI_BASE_URL")) {
            self.llm.base_url = Some(u);
        }

        // Priority: DOCAGENT_API_KEY > provider-specific > existing
        if let Some(k) = get("DOCAGENT_API_KEY") {
            self.llm.api_key = k;
            return;
        }
        if let Some(var) = provider_key_var(&self.llm.provider) {
            if let Some(k) = get(var) {
                self.llm.api_key = k;
            }
        }
    }

    pub fn validate(&self) -> anyhow::Result<()> {
        if self.llm.api_key.trim().is_empty() || self.llm.api_key == "YOUR_API_KEY_HERE" {
            let var = provider_key_var(&self.llm.provider).unwrap_or("DOCAGENT_API_KEY");
            anyhow::bail!(
                "No API key configured. Set {} (or DOCAGENT_API_KEY) in the environment or a .env file",
                var
            );
        }
        if self.llm.provider.eq_ignore_ascii_case("openai-compatible") && self.llm.base_url.is_none()
        {
            anyhow::bail!(
                "Provider 'openai-compatible' requires 'base_url' in config or env DOCAGENT_BASE_URL"
            );
        }
        if self.agent.max_steps == 0 {
            anyhow::bail!("agent.max_steps must be greater than zero");
        }
        self.llm.retry.validate()
    }

    pub fn log_dir(&self) -> PathBuf {
        self.agent
            .log_dir
            .as_ref()
            .map(PathBuf::from)
            .unwrap_or_else(Self::default_log_dir)
    }
}

fn provider_key_var(provider: &str) -> Option<&'static str> {
    match provider.to_lowercase().as_str() {
        "openai" | "openai-compatible" => Some("OPENAI_API_KEY"),
        "anthropic" => Some("ANTHROPIC_API_KEY"),
        "google" | "gemini" => Some("GEMINI_API_KEY"),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key: &str| map.get(key).cloned()
    }

    #[test]
    fn test_defaults_match_openai_mini() {
        let cfg = Config::default();
        assert_eq!(cfg.llm.provider, "openai");
        assert_eq!(cfg.llm.model, "gpt-4o-mini");
        assert_eq!(cfg.agent.max_steps, 20);
        assert!(cfg.agent.allow_writes);
        assert!(cfg.tools.enable_git);
    }

    #[test]
    fn test_openai_env_vars_applied() {
        let mut cfg = Config::default();
        cfg.apply_env_overrides(env(&[
            ("OPENAI_API_KEY", "sk-test"),
            ("OPENAI_MODEL", "gpt-4o"),
        ]));
        assert_eq!(cfg.llm.api_key, "sk-test");
        assert_eq!(cfg.llm.model, "gpt-4o");
        assert!(cfg.validate().is_ok());
    }

    #[test]
    fn test_docagent_vars_take_precedence() {
        let mut cfg = Config::default();
        cfg.apply_env_overrides(env(&[
            ("OPENAI_API_KEY", "sk-openai"),
            ("DOCAGENT_API_KEY", "sk-docagent"),
            ("OPENAI_MODEL", "gpt-4o"),
            ("DOCAGENT_MODEL", "gpt-4.1"),
        ]));
        assert_eq!(cfg.llm.api_key, "sk-docagent");
        assert_eq!(cfg.llm.model, "gpt-4.1");
    }

    #[test]
    fn test_empty_env_values_ignored() {
        let mut cfg = Config::default();
        cfg.apply_env_overrides(env(&[("OPENAI_MODEL", ""), ("OPENAI_API_KEY", "  ")]));
        assert_eq!(cfg.llm.model, "gpt-4o-mini");
        assert!(cfg.llm.api_key.is_empty());
    }

    #[test]
    fn test_missing_api_key_names_variable() {
        let cfg = Config::default();
        let err = cfg.validate().unwrap_err().to_string();
        assert!(err.contains("OPENAI_API_KEY"), "{}", err);
    }

    #[test]
    fn test_openai_compatible_requires_base_url() {
        let mut cfg = Config::default();
        cfg.llm.provider = "openai-compatible".into();
        cfg.llm.api_key = "k".into();
        assert!(cfg.validate().is_err());
        cfg.llm.base_url = Some("http://localhost:8000/v1".into());
        assert!(cfg.validate().is_ok());
    }

    #[test]
    fn test_partial_yaml_keeps_defaults() {
        let yaml = "llm:\n  model: gpt-4.1-mini\nagent:\n  allow_writes: false\n";
        let cfg = Config::from_yaml_str(yaml).unwrap();
        assert_eq!(cfg.llm.model, "gpt-4.1-mini");
        assert_eq!(cfg.llm.provider, "openai");
        assert!(!cfg.agent.allow_writes);
        assert_eq!(cfg.agent.max_steps, 20);
        assert_eq!(cfg.llm.retry, RetryConfig::default());
        assert_eq!(cfg.tools.max_output_chars, 60_000);
    }

    #[test]
    fn test_empty_yaml_is_default() {
        let cfg = Config::from_yaml_str("\n").unwrap();
        assert_eq!(cfg.llm.model, "gpt-4o-mini");
    }

    #[test]
    fn test_zero_max_steps_rejected() {
        let mut cfg = Config::default();
        cfg.llm.api_key = "k".into();
        cfg.agent.max_steps = 0;
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn test_bad_retry_delays_rejected() {
        for retry in [
            "initial_delay: -1.0",
            "initial_delay: .nan",
            "max_delay: 1.0e30",
            "max_delay: .inf",
            "initial_delay: 10.0\n    max_delay: 5.0",
            "exponential_base: 0.5",
        ] {
            let yaml = format!("llm:\n  api_key: k\n  retry:\n    {}\n", retry);
            let cfg = Config::from_yaml_str(&yaml).unwrap();
            let err = cfg.validate().unwrap_err().to_string();
            assert!(err.contains("llm.retry."), "{}: {}", retry, err);
        }
    }

    #[test]
    fn test_disabled_retry_passes_validation() {
        let cfg = Config::from_yaml_str("llm:\n  api_key: k\n  retry:\n    enabled: false\n").unwrap();
        assert!(cfg.validate().is_ok());
    }
}
