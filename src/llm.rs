use crate::config::{LlmConfig, RetryConfig};
use anyhow::Result;
use siumai::retry_api::{RetryBackend, RetryOptions, RetryPolicy};
use std::time::Duration;

#[derive(Clone)]
pub struct LlmClient {
    inner: siumai::provider::Siumai,
    model: String,
}

/// Collapse provider aliases onto siumai provider ids.
pub fn normalize_provider(provider: &str) -> String {
    match provider.trim().to_lowercase().as_str() {
        "google" => "gemini".to_string(),
        // OpenAI-compatible servers go through the OpenAI client with a custom base_url
        "openai-compatible" | "" => "openai".to_string(),
        other => other.to_string(),
    }
}

impl LlmClient {
    pub async fn from_config(cfg: &LlmConfig) -> Result<Self> {
        let provider = normalize_provider(&cfg.provider);
        let mut b = siumai::provider::Siumai::builder()
            .provider_id(provider.as_str())
            .api_key(cfg.api_key.clone())
            .model(cfg.model.clone());
        if let Some(url) = &cfg.base_url {
            b = b.base_url(url.clone());
        }
        let retry = retry_options(&cfg.retry)?;
        if let Some(options) = retry.clone() {
            b = b.with_retry(options);
        }
        let client = match b.build().await {
            Ok(c) => c,
            Err(e) => {
                let Some(url) = &cfg.base_url else {
                    return Err(anyhow::anyhow!(
                        "Failed to build provider '{}': {}. Set 'base_url' to use an OpenAI-compatible endpoint instead.",
                        provider,
                        e
                    ));
                };
                tracing::warn!(
                    provider = %provider,
                    error = %e,
                    "provider build failed; falling back to openai-compatible endpoint"
                );
                let mut fb = siumai::provider::Siumai::builder()
                    .openai()
                    .api_key(cfg.api_key.clone())
                    .model(cfg.model.clone())
                    .base_url(url.clone());
                if let Some(options) = retry {
                    fb = fb.with_retry(options);
                }
                fb.build().await?
            }
        };
        tracing::debug!(provider = %provider, model = %cfg.model, "LLM client ready");
        Ok(Self {
            inner: client,
            model: cfg.model.clone(),
        })
    }

    pub fn inner(&self) -> &siumai::provider::Siumai {
        &self.inner
    }

    pub fn model(&self) -> &str {
        &self.model
    }
}

/// Retry policy for the client, `None` when retries are off. Delays that
/// do not fit a `Duration` are rejected instead of panicking.
fn retry_options(cfg: &RetryConfig) -> anyhow::Result<Option<RetryOptions>> {
    if !cfg.enabled {
        return Ok(None);
    }
    let delay = |field: &str, secs: f32| {
        Duration::try_from_secs_f32(secs)
            .map_err(|e| anyhow::anyhow!("llm.retry.{} = {}: {}", field, secs, e))
    };
    let policy = RetryPolicy::new()
        .with_max_attempts(cfg.max_retries)
        .with_initial_delay(delay("initial_delay", cfg.initial_delay)?)
        .with_max_delay(delay("max_delay", cfg.max_delay)?)
        .with_backoff_multiplier(f64::from(cfg.exponential_base))
        .with_jitter(true);
    Ok(Some(RetryOptions {
        backend: RetryBackend::Policy,
        provider: None,
        policy: Some(policy),
        retry_401: false,
        idempotent: true,
    }))
}
