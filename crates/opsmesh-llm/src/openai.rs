use crate::{LlmBackend, LlmProvider, ProviderConfig};
use async_trait::async_trait;
use opsmesh_core::{OpsmeshError, OpsmeshResult};

/// OpenAI-compatible chat completions backend.
///
/// Works with OpenAI, OpenRouter, Groq, and any other provider implementing
/// the OpenAI chat completions API.
pub struct OpenAiCompatBackend {
    config: ProviderConfig,
    http: reqwest::Client,
}

impl OpenAiCompatBackend {
    /// Creates a backend for the given provider config.
    pub fn new(config: ProviderConfig) -> Self {
        Self {
            config,
            http: reqwest::Client::new(),
        }
    }

    fn build_messages(&self, system_prompt: &str, prompt: &str) -> Vec<serde_json::Value> {
        let mut messages = Vec::new();
        if !system_prompt.is_empty() {
            messages.push(serde_json::json!({
                "role": "system",
                "content": system_prompt
            }));
        }
        messages.push(serde_json::json!({
            "role": "user",
            "content": prompt
        }));
        messages
    }

    fn add_provider_headers(&self, request: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        let request = request
            .header("Authorization", format!("Bearer {}", self.config.api_key))
            .header("Content-Type", "application/json");

        // OpenRouter requires attribution headers
        if matches!(self.config.provider, LlmProvider::OpenRouter) {
            request
                .header("HTTP-Referer", "https://github.com/opsmesh/opsmesh")
                .header("X-Title", "Opsmesh")
        } else {
            request
        }
    }
}

#[async_trait]
impl LlmBackend for OpenAiCompatBackend {
    async fn complete(&self, system_prompt: &str, prompt: &str) -> OpsmeshResult<String> {
        let url = format!("{}/v1/chat/completions", self.config.base_url());

        let body = serde_json::json!({
            "model": self.config.model_id,
            "temperature": self.config.temperature,
            "max_tokens": self.config.max_tokens,
            "messages": self.build_messages(system_prompt, prompt),
        });

        let request = self.add_provider_headers(self.http.post(&url));

        let resp = request
            .json(&body)
            .send()
            .await
            .map_err(|e| OpsmeshError::Llm(e.to_string()))?;

        let status = resp.status();
        let resp_body: serde_json::Value = resp
            .json()
            .await
            .map_err(|e| OpsmeshError::Llm(e.to_string()))?;

        if !status.is_success() {
            return Err(OpsmeshError::Llm(format!(
                "provider API error {status}: {resp_body}"
            )));
        }

        resp_body["choices"][0]["message"]["content"]
            .as_str()
            .map(|s| s.to_string())
            .ok_or_else(|| {
                OpsmeshError::Llm(format!("malformed completion response: {resp_body}"))
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn config_for(server: &MockServer) -> ProviderConfig {
        ProviderConfig {
            provider: LlmProvider::Groq,
            model_id: "llama-3.1-8b-instant".to_string(),
            api_key: "test-key".to_string(),
            api_base_url: Some(server.uri()),
            temperature: 0.7,
            max_tokens: 800,
        }
    }

    #[tokio::test]
    async fn complete_parses_content() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/chat/completions"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "choices": [{"message": {"role": "assistant", "content": "finance | budget task"}}]
            })))
            .mount(&server)
            .await;

        let backend = OpenAiCompatBackend::new(config_for(&server));
        let out = backend.complete("", "route: allocate budget").await.unwrap();
        assert_eq!(out, "finance | budget task");
    }

    #[tokio::test]
    async fn non_success_status_is_an_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/chat/completions"))
            .respond_with(
                ResponseTemplate::new(429)
                    .set_body_json(serde_json::json!({"error": "rate limited"})),
            )
            .mount(&server)
            .await;

        let backend = OpenAiCompatBackend::new(config_for(&server));
        let err = backend.complete("", "hi").await.unwrap_err();
        assert!(err.to_string().contains("429"));
    }

    #[tokio::test]
    async fn malformed_body_is_an_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/chat/completions"))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(serde_json::json!({"choices": []})),
            )
            .mount(&server)
            .await;

        let backend = OpenAiCompatBackend::new(config_for(&server));
        assert!(backend.complete("sys", "hi").await.is_err());
    }
}
