//! HTTP client for the Cohere `generate` endpoint.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument};
use url::Url;

use roadmapper_shared::{AppConfig, Result, RoadmapError, resolve_api_key};

/// User-Agent string for generation requests.
const USER_AGENT: &str = concat!("Roadmapper/", env!("CARGO_PKG_VERSION"));

/// Longest slice of an error body echoed back in a transport error.
const MAX_ERROR_BODY: usize = 200;

// ---------------------------------------------------------------------------
// Request / response
// ---------------------------------------------------------------------------

/// A single text-generation request.
#[derive(Debug, Clone, PartialEq)]
pub struct CompletionRequest {
    pub model: String,
    pub prompt: String,
    pub max_tokens: u32,
    pub temperature: f32,
    pub stop_sequences: Vec<String>,
}

impl CompletionRequest {
    pub fn new(model: impl Into<String>, prompt: impl Into<String>, max_tokens: u32) -> Self {
        Self {
            model: model.into(),
            prompt: prompt.into(),
            max_tokens,
            temperature: 0.7,
            stop_sequences: Vec::new(),
        }
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature;
        self
    }

    pub fn with_stop(mut self, stop: impl Into<String>) -> Self {
        self.stop_sequences.push(stop.into());
        self
    }
}

/// Anything that turns a prompt into text.
#[async_trait]
pub trait TextCompletion: Send + Sync {
    /// Run the prompt and return the trimmed first generation.
    async fn complete(&self, request: &CompletionRequest) -> Result<String>;
}

#[derive(Debug, Serialize)]
struct GenerateBody<'a> {
    model: &'a str,
    prompt: &'a str,
    max_tokens: u32,
    temperature: f32,
    p: f32,
    #[serde(skip_serializing_if = "<[String]>::is_empty")]
    stop_sequences: &'a [String],
    num_generations: u32,
}

#[derive(Debug, Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    generations: Vec<Generation>,
}

#[derive(Debug, Deserialize)]
struct Generation {
    text: String,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    message: Option<String>,
}

// ---------------------------------------------------------------------------
// Client
// ---------------------------------------------------------------------------

/// Connection settings for [`CohereClient`].
#[derive(Debug, Clone)]
pub struct ClientOptions {
    pub endpoint: Url,
    pub api_key: String,
    pub timeout_secs: u64,
}

/// Client for the hosted text-generation service.
#[derive(Debug, Clone)]
pub struct CohereClient {
    http: Client,
    endpoint: Url,
    api_key: String,
}

impl CohereClient {
    pub fn new(options: &ClientOptions) -> Result<Self> {
        let http = Client::builder()
            .user_agent(USER_AGENT)
            .timeout(Duration::from_secs(options.timeout_secs))
            .build()
            .map_err(|e| RoadmapError::Transport(format!("client build: {e}")))?;

        Ok(Self {
            http,
            endpoint: options.endpoint.clone(),
            api_key: options.api_key.clone(),
        })
    }

    /// Build a client from config, reading the API key from the environment.
    pub fn from_config(config: &AppConfig) -> Result<Self> {
        let endpoint = Url::parse(&config.cohere.endpoint).map_err(|e| {
            RoadmapError::config(format!("invalid endpoint '{}': {e}", config.cohere.endpoint))
        })?;

        Self::new(&ClientOptions {
            endpoint,
            api_key: resolve_api_key(config)?,
            timeout_secs: config.cohere.timeout_secs,
        })
    }
}

#[async_trait]
impl TextCompletion for CohereClient {
    #[instrument(skip_all, fields(model = %request.model, max_tokens = request.max_tokens))]
    async fn complete(&self, request: &CompletionRequest) -> Result<String> {
        let body = GenerateBody {
            model: &request.model,
            prompt: &request.prompt,
            max_tokens: request.max_tokens,
            temperature: request.temperature,
            p: 1.0,
            stop_sequences: &request.stop_sequences,
            num_generations: 1,
        };

        let response = self
            .http
            .post(self.endpoint.clone())
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| RoadmapError::Transport(format!("{}: {e}", self.endpoint)))?;

        let status = response.status();
        let text = response
            .text()
            .await
            .map_err(|e| RoadmapError::Transport(format!("{}: {e}", self.endpoint)))?;

        if !status.is_success() {
            let detail = serde_json::from_str::<ErrorBody>(&text)
                .ok()
                .and_then(|b| b.message)
                .unwrap_or_else(|| text.chars().take(MAX_ERROR_BODY).collect());
            return Err(RoadmapError::Transport(format!("HTTP {status}: {detail}")));
        }

        let parsed: GenerateResponse = serde_json::from_str(&text)
            .map_err(|e| RoadmapError::Transport(format!("invalid generate response: {e}")))?;

        let generated = parsed
            .generations
            .into_iter()
            .next()
            .map(|g| g.text.trim().to_string())
            .ok_or_else(|| RoadmapError::Transport("response contained no generations".into()))?;

        debug!(chars = generated.len(), "generation received");
        Ok(generated)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{body_partial_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    async fn client_for(server: &MockServer) -> CohereClient {
        let endpoint = Url::parse(&format!("{}/v1/generate", server.uri())).unwrap();
        CohereClient::new(&ClientOptions {
            endpoint,
            api_key: "test-key".into(),
            timeout_secs: 5,
        })
        .unwrap()
    }

    #[tokio::test]
    async fn complete_returns_trimmed_first_generation() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/v1/generate"))
            .and(header("authorization", "Bearer test-key"))
            .and(body_partial_json(serde_json::json!({
                "model": "command",
                "num_generations": 1,
                "stop_sequences": ["\n\n"],
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "generations": [{ "text": "  | Basics\n|| Variables \n" }]
            })))
            .expect(1)
            .mount(&server)
            .await;

        let client = client_for(&server).await;
        let request = CompletionRequest::new("command", "roadmap please", 300).with_stop("\n\n");
        let text = client.complete(&request).await.unwrap();
        assert_eq!(text, "| Basics\n|| Variables");
    }

    #[tokio::test]
    async fn error_status_surfaces_service_message() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/v1/generate"))
            .respond_with(
                ResponseTemplate::new(429)
                    .set_body_json(serde_json::json!({ "message": "rate limited" })),
            )
            .mount(&server)
            .await;

        let client = client_for(&server).await;
        let err = client
            .complete(&CompletionRequest::new("command", "hi", 10))
            .await
            .unwrap_err();
        assert!(matches!(err, RoadmapError::Transport(_)));
        assert!(err.to_string().contains("rate limited"));
    }

    #[tokio::test]
    async fn empty_generations_is_transport_error() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/v1/generate"))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(serde_json::json!({ "generations": [] })),
            )
            .mount(&server)
            .await;

        let client = client_for(&server).await;
        let err = client
            .complete(&CompletionRequest::new("command", "hi", 10))
            .await
            .unwrap_err();
        assert!(err.to_string().contains("no generations"));
    }

    #[test]
    fn stop_sequences_omitted_when_empty() {
        let body = GenerateBody {
            model: "command",
            prompt: "p",
            max_tokens: 1,
            temperature: 0.7,
            p: 1.0,
            stop_sequences: &[],
            num_generations: 1,
        };
        let json = serde_json::to_string(&body).unwrap();
        assert!(!json.contains("stop_sequences"));
    }

    #[test]
    fn from_config_requires_api_key() {
        let mut config = AppConfig::default();
        config.cohere.api_key_env = "RM_TEST_MISSING_COHERE_KEY_987".into();
        let err = CohereClient::from_config(&config).unwrap_err();
        assert!(matches!(err, RoadmapError::Config { .. }));
    }
}
