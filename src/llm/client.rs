//! Azure OpenAI chat-completions client. Every therapy operation goes
//! through [`LlmClient::chat_json`], which enforces JSON output, retries
//! transient failures, and records the call in the log store.

use crate::error::{AppError, AppResult};
use crate::llm::log_store::LogStore;
use crate::llm::parse::parse_model_json;
use serde::Deserialize;
use serde_json::json;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, RwLock};
use std::time::{Duration, Instant};
use tracing::warn;

const MAX_RETRIES: u32 = 3;
const RETRY_PAUSE: Duration = Duration::from_secs(1);

#[derive(Debug, Clone)]
pub struct LlmSettings {
    pub endpoint: String,
    pub deployment: String,
    pub api_key: String,
    pub api_version: String,
}

/// Per-operation call parameters.
#[derive(Debug, Clone, Copy)]
pub struct PromptOptions {
    pub system: &'static str,
    pub temperature: f64,
    pub max_tokens: u32,
}

pub struct LlmClient {
    http: reqwest::Client,
    endpoint: String,
    api_key: String,
    api_version: String,
    deployment: RwLock<String>,
    request_timeout_secs: AtomicU64,
    log_store: Arc<LogStore>,
}

#[derive(Deserialize)]
struct ChatResponse {
    choices: Vec<Choice>,
    usage: Option<Usage>,
}

#[derive(Deserialize)]
struct Choice {
    message: ChoiceMessage,
}

#[derive(Deserialize)]
struct ChoiceMessage {
    content: Option<String>,
}

#[derive(Deserialize, Default)]
struct Usage {
    #[serde(default)]
    prompt_tokens: u32,
    #[serde(default)]
    completion_tokens: u32,
}

impl LlmClient {
    pub fn new(settings: LlmSettings, log_store: Arc<LogStore>) -> Self {
        Self {
            http: reqwest::Client::new(),
            endpoint: settings.endpoint,
            api_key: settings.api_key,
            api_version: settings.api_version,
            deployment: RwLock::new(settings.deployment),
            request_timeout_secs: AtomicU64::new(120),
            log_store,
        }
    }

    pub fn deployment(&self) -> String {
        self.deployment.read().expect("deployment lock poisoned").clone()
    }

    pub fn set_deployment(&self, deployment: String) {
        *self.deployment.write().expect("deployment lock poisoned") = deployment;
    }

    pub fn set_request_timeout(&self, secs: u64) {
        self.request_timeout_secs.store(secs, Ordering::Relaxed);
    }

    fn chat_url(&self, deployment: &str) -> String {
        format!(
            "{}/openai/deployments/{}/chat/completions?api-version={}",
            self.endpoint.trim_end_matches('/'),
            deployment,
            self.api_version
        )
    }

    /// Sends one system+user exchange and returns the parsed JSON object
    /// from the completion. Non-success statuses and network errors are
    /// retried up to [`MAX_RETRIES`] times with a short pause.
    pub async fn chat_json(
        &self,
        operation: &str,
        prompt: &str,
        opts: PromptOptions,
    ) -> AppResult<serde_json::Value> {
        let deployment = self.deployment();
        let url = self.chat_url(&deployment);
        let timeout = Duration::from_secs(self.request_timeout_secs.load(Ordering::Relaxed));

        let payload = json!({
            "messages": [
                {"role": "system", "content": opts.system},
                {"role": "user", "content": prompt},
            ],
            "temperature": opts.temperature,
            "max_tokens": opts.max_tokens,
            "response_format": {"type": "json_object"},
        });

        let mut last_error: Option<AppError> = None;

        for attempt in 1..=MAX_RETRIES {
            let start = Instant::now();
            let result = self
                .http
                .post(&url)
                .header("api-key", &self.api_key)
                .timeout(timeout)
                .json(&payload)
                .send()
                .await;

            match result {
                Ok(response) => {
                    let status = response.status();
                    let latency_ms = start.elapsed().as_millis() as u32;

                    if !status.is_success() {
                        let text = response.text().await.unwrap_or_default();
                        warn!(
                            "[{}] upstream error: {} - {} (attempt {}/{})",
                            operation, status, text, attempt, MAX_RETRIES
                        );
                        self.log_store.record(
                            operation.to_string(),
                            deployment.clone(),
                            0,
                            0,
                            latency_ms,
                            status.as_u16(),
                            Some(format!("HTTP {} - {}", status, text)),
                        );
                        last_error =
                            Some(AppError::Upstream(format!("HTTP {} - {}", status, text)));
                        if attempt < MAX_RETRIES {
                            tokio::time::sleep(RETRY_PAUSE).await;
                        }
                        continue;
                    }

                    let chat: ChatResponse = response.json().await?;
                    let usage = chat.usage.unwrap_or_default();
                    self.log_store.record(
                        operation.to_string(),
                        deployment.clone(),
                        usage.prompt_tokens,
                        usage.completion_tokens,
                        latency_ms,
                        status.as_u16(),
                        None,
                    );

                    let content = chat
                        .choices
                        .into_iter()
                        .next()
                        .and_then(|c| c.message.content)
                        .ok_or_else(|| {
                            AppError::ModelOutput(format!("[{operation}] empty completion"))
                        })?;

                    return parse_model_json(&content);
                }
                Err(e) => {
                    warn!(
                        "[{}] request failed: {} (attempt {}/{})",
                        operation, e, attempt, MAX_RETRIES
                    );
                    self.log_store.record(
                        operation.to_string(),
                        deployment.clone(),
                        0,
                        0,
                        start.elapsed().as_millis() as u32,
                        0,
                        Some(e.to_string()),
                    );
                    last_error = Some(AppError::Network(e));
                    if attempt < MAX_RETRIES {
                        tokio::time::sleep(RETRY_PAUSE).await;
                    }
                }
            }
        }

        Err(last_error
            .unwrap_or_else(|| AppError::Unknown(format!("[{operation}] upstream call failed"))))
    }
}
