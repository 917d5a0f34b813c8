use std::time::Duration;

use rand::Rng;
use reqwest::header::{HeaderMap, HeaderValue};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::types::{DocError, LlmError};

const ANTHROPIC_VERSION: &str = "2023-06-01";

pub const DEFAULT_BASE_URL: &str = "https://api.anthropic.com";
pub const DEFAULT_MAX_OUTPUT_TOKENS: u32 = 1024;
pub const DEFAULT_TEMPERATURE: f32 = 0.1;
pub const DEFAULT_TIMEOUT_SECONDS: u64 = 120;
pub const DEFAULT_MAX_RETRIES: u32 = 2;

const INITIAL_DELAY_MS: u64 = 200;
const BACKOFF_FACTOR: f64 = 2.0;

/// Connection settings for the Messages API.
#[derive(Debug, Clone)]
pub struct ClientOptions {
    pub api_key: String,
    pub base_url: String,
    pub max_output_tokens: u32,
    pub temperature: f32,
    pub timeout_seconds: u64,
    pub max_retries: u32,
}

impl Default for ClientOptions {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            base_url: DEFAULT_BASE_URL.to_string(),
            max_output_tokens: DEFAULT_MAX_OUTPUT_TOKENS,
            temperature: DEFAULT_TEMPERATURE,
            timeout_seconds: DEFAULT_TIMEOUT_SECONDS,
            max_retries: DEFAULT_MAX_RETRIES,
        }
    }
}

/// Claude Messages API client.
///
/// Transient failures (transport errors, 429, 5xx) are retried with
/// exponential backoff and jitter up to `max_retries`; permanent failures
/// (4xx, malformed responses) return immediately. Retries run inside the
/// caller's rate-limit permit, so they never add concurrent load.
pub struct AnthropicClient {
    http: reqwest::Client,
    headers: HeaderMap,
    base_url: String,
    max_output_tokens: u32,
    temperature: f32,
    max_retries: u32,
}

impl AnthropicClient {
    pub fn new(options: ClientOptions) -> Result<Self, DocError> {
        if options.api_key.trim().is_empty() {
            return Err(DocError::Config(
                "anthropic api key is empty (set ANTHROPIC_API_KEY)".to_string(),
            ));
        }
        let mut headers = HeaderMap::new();
        let key = HeaderValue::from_str(&options.api_key)
            .map_err(|_| DocError::Config("anthropic api key contains invalid characters".to_string()))?;
        headers.insert("x-api-key", key);
        headers.insert("anthropic-version", HeaderValue::from_static(ANTHROPIC_VERSION));

        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(options.timeout_seconds))
            .build()
            .map_err(|e| DocError::Config(format!("failed to build http client: {}", e)))?;

        Ok(Self {
            http,
            headers,
            base_url: options.base_url.trim_end_matches('/').to_string(),
            max_output_tokens: options.max_output_tokens,
            temperature: options.temperature,
            max_retries: options.max_retries,
        })
    }

    /// One prompt in, the model's text out.
    pub async fn complete(&self, model: &str, prompt: &str) -> Result<String, LlmError> {
        let request = MessagesRequest {
            model,
            max_tokens: self.max_output_tokens,
            temperature: self.temperature,
            messages: vec![RequestMessage {
                role: "user",
                content: prompt,
            }],
        };
        let response = self.post_messages(&request).await?;
        if response.content.is_empty() {
            return Err(LlmError::InvalidResponse(
                "response carried no content blocks".to_string(),
            ));
        }
        let text: String = response
            .content
            .iter()
            .filter(|block| block.kind == "text")
            .map(|block| block.text.as_str())
            .collect();
        Ok(text)
    }

    async fn post_messages(
        &self,
        request: &MessagesRequest<'_>,
    ) -> Result<MessagesResponse, LlmError> {
        let url = format!("{}/v1/messages", self.base_url);
        let mut last_error: Option<LlmError> = None;

        for attempt in 0..=self.max_retries {
            if attempt > 0 {
                tokio::time::sleep(backoff(attempt)).await;
            }
            debug!("POST {} (model {}, attempt {})", url, request.model, attempt + 1);

            let response = self
                .http
                .post(&url)
                .headers(self.headers.clone())
                .json(request)
                .send()
                .await;

            match response {
                Ok(resp) => {
                    let status = resp.status();
                    if status.is_success() {
                        return resp
                            .json::<MessagesResponse>()
                            .await
                            .map_err(LlmError::Transport);
                    }
                    let body = resp.text().await.unwrap_or_default();
                    let error = parse_api_error(status.as_u16(), &body);
                    if error.is_transient() && attempt < self.max_retries {
                        warn!("api call failed, will retry: {}", error);
                        last_error = Some(error);
                        continue;
                    }
                    return Err(error);
                }
                Err(e) => {
                    let error = LlmError::Transport(e);
                    if attempt < self.max_retries {
                        warn!("api call failed, will retry: {}", error);
                        last_error = Some(error);
                        continue;
                    }
                    return Err(error);
                }
            }
        }

        Err(last_error
            .unwrap_or_else(|| LlmError::InvalidResponse("retry loop exhausted".to_string())))
    }
}

fn backoff(attempt: u32) -> Duration {
    let exp = BACKOFF_FACTOR.powi(attempt.saturating_sub(1) as i32);
    let base = (INITIAL_DELAY_MS as f64 * exp) as u64;
    let jitter: f64 = rand::thread_rng().gen_range(0.9..1.1);
    Duration::from_millis((base as f64 * jitter) as u64)
}

fn parse_api_error(status: u16, body: &str) -> LlmError {
    let message = match serde_json::from_str::<ApiErrorResponse>(body) {
        Ok(parsed) if !parsed.error.message.is_empty() => parsed.error.message,
        Ok(parsed) => parsed.error.kind,
        Err(_) => body.to_string(),
    };
    match status {
        429 => LlmError::RateLimited(message),
        408 | 500..=599 => LlmError::Server { status, message },
        _ => LlmError::Api { status, message },
    }
}

#[derive(Serialize)]
struct MessagesRequest<'a> {
    model: &'a str,
    max_tokens: u32,
    temperature: f32,
    messages: Vec<RequestMessage<'a>>,
}

#[derive(Serialize)]
struct RequestMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Deserialize)]
struct MessagesResponse {
    content: Vec<ContentBlock>,
}

#[derive(Deserialize)]
struct ContentBlock {
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    text: String,
}

#[derive(Deserialize)]
struct ApiErrorResponse {
    error: ApiErrorDetail,
}

#[derive(Deserialize)]
struct ApiErrorDetail {
    #[serde(rename = "type", default)]
    kind: String,
    #[serde(default)]
    message: String,
}
