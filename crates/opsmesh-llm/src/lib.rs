//! LLM service boundary: provider-backed text generation with a
//! deterministic rule-based fallback.
//!
//! Agents never talk to a provider directly; they call [`LlmService`], which
//! tries the configured backend and degrades to [`fallback`] text on any
//! failure. The service never returns an error to its callers — provider
//! trouble may only lower downstream decision confidence, which the
//! orchestrator's escalation gate handles.
//!
//! # Main types
//!
//! - [`LlmService`] — The facade agents call.
//! - [`LlmBackend`] — Provider seam; implement to add a provider.
//! - [`OpenAiCompatBackend`] — Chat-completions backend (Groq/OpenAI/OpenRouter).
//! - [`ProviderConfig`] — Model, key, endpoint, and sampling knobs.

/// Deterministic rule-based responses used when no provider is available.
pub mod fallback;
/// OpenAI-compatible chat completions backend.
pub mod openai;

pub use openai::OpenAiCompatBackend;

use async_trait::async_trait;
use opsmesh_core::OpsmeshResult;
use serde::{Deserialize, Serialize};
use tracing::warn;

/// Supported LLM providers. All three speak the OpenAI chat completions API.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LlmProvider {
    /// Groq cloud inference — free tier with rate limits.
    Groq,
    /// OpenAI.
    OpenAi,
    /// OpenRouter aggregator.
    OpenRouter,
}

/// Provider connection and sampling configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderConfig {
    /// Which provider to talk to.
    pub provider: LlmProvider,
    /// Model identifier, e.g. `llama-3.1-8b-instant`.
    pub model_id: String,
    /// API key; an empty key means "no provider configured".
    #[serde(default)]
    pub api_key: String,
    /// Endpoint override (used by tests and self-hosted gateways).
    #[serde(default)]
    pub api_base_url: Option<String>,
    /// Sampling temperature.
    #[serde(default = "default_temperature")]
    pub temperature: f32,
    /// Completion token cap.
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,
}

fn default_temperature() -> f32 {
    0.7
}

fn default_max_tokens() -> u32 {
    800
}

impl ProviderConfig {
    /// Resolves the base URL, honoring any override.
    pub fn base_url(&self) -> &str {
        if let Some(url) = &self.api_base_url {
            url
        } else {
            match self.provider {
                LlmProvider::Groq => "https://api.groq.com/openai",
                LlmProvider::OpenAi => "https://api.openai.com",
                LlmProvider::OpenRouter => "https://openrouter.ai/api",
            }
        }
    }
}

/// Provider seam. Implementations perform one completion round-trip.
#[async_trait]
pub trait LlmBackend: Send + Sync {
    /// Runs one completion with an optional system prompt.
    async fn complete(&self, system_prompt: &str, prompt: &str) -> OpsmeshResult<String>;
}

/// The text-generation facade all agents share.
pub struct LlmService {
    backend: Option<Box<dyn LlmBackend>>,
}

impl LlmService {
    /// Builds a service from optional provider config. A missing config or
    /// empty API key yields a fallback-only service.
    pub fn new(config: Option<ProviderConfig>) -> Self {
        let backend: Option<Box<dyn LlmBackend>> = match config {
            Some(cfg) if !cfg.api_key.is_empty() => {
                Some(Box::new(OpenAiCompatBackend::new(cfg)))
            }
            _ => {
                warn!("no LLM provider configured; using rule-based fallback responses");
                None
            }
        };
        Self { backend }
    }

    /// Builds a service over a pre-built backend (tests, custom providers).
    pub fn from_backend(backend: Box<dyn LlmBackend>) -> Self {
        Self {
            backend: Some(backend),
        }
    }

    /// A service with no provider at all; every call answers via rules.
    pub fn fallback_only() -> Self {
        Self { backend: None }
    }

    /// General-purpose completion. Never fails: provider errors degrade to
    /// the deterministic fallback.
    pub async fn generate(&self, prompt: &str, system_prompt: &str) -> String {
        match &self.backend {
            Some(backend) => match backend.complete(system_prompt, prompt).await {
                Ok(text) => text,
                Err(e) => {
                    warn!(error = %e, "LLM backend failed; using fallback response");
                    fallback::completion(prompt)
                }
            },
            None => fallback::completion(prompt),
        }
    }

    /// Completion for prompts expecting a JSON object back. The caller
    /// parses the response and must tolerate non-JSON output (the fallback
    /// is plain text, which downstream parse-failure paths absorb).
    pub async fn generate_structured(&self, prompt: &str, system_prompt: &str) -> String {
        self.generate(prompt, system_prompt).await
    }

    /// Whether a real provider backend is configured.
    pub fn has_backend(&self) -> bool {
        self.backend.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use opsmesh_core::OpsmeshError;

    struct FailingBackend;

    #[async_trait]
    impl LlmBackend for FailingBackend {
        async fn complete(&self, _system: &str, _prompt: &str) -> OpsmeshResult<String> {
            Err(OpsmeshError::Llm("connection refused".to_string()))
        }
    }

    struct EchoBackend;

    #[async_trait]
    impl LlmBackend for EchoBackend {
        async fn complete(&self, _system: &str, prompt: &str) -> OpsmeshResult<String> {
            Ok(format!("echo: {prompt}"))
        }
    }

    #[tokio::test]
    async fn backend_failure_degrades_to_fallback() {
        let svc = LlmService::from_backend(Box::new(FailingBackend));
        let out = svc.generate("What is the leave policy?", "").await;
        // never an error, always some deterministic text
        assert!(!out.is_empty());
    }

    #[tokio::test]
    async fn backend_success_passes_through() {
        let svc = LlmService::from_backend(Box::new(EchoBackend));
        let out = svc.generate("route this task", "").await;
        assert_eq!(out, "echo: route this task");
    }

    #[tokio::test]
    async fn no_provider_uses_fallback() {
        let svc = LlmService::fallback_only();
        assert!(!svc.has_backend());
        let out = svc.generate("anything at all", "").await;
        assert!(!out.is_empty());
    }

    #[test]
    fn empty_api_key_means_no_backend() {
        let svc = LlmService::new(Some(ProviderConfig {
            provider: LlmProvider::Groq,
            model_id: "llama-3.1-8b-instant".to_string(),
            api_key: String::new(),
            api_base_url: None,
            temperature: 0.7,
            max_tokens: 800,
        }));
        assert!(!svc.has_backend());
    }

    #[test]
    fn provider_base_urls() {
        let mut cfg = ProviderConfig {
            provider: LlmProvider::Groq,
            model_id: "m".to_string(),
            api_key: "k".to_string(),
            api_base_url: None,
            temperature: 0.7,
            max_tokens: 800,
        };
        assert_eq!(cfg.base_url(), "https://api.groq.com/openai");
        cfg.api_base_url = Some("http://localhost:9999".to_string());
        assert_eq!(cfg.base_url(), "http://localhost:9999");
    }
}
