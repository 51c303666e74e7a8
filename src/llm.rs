use std::time::Duration;

use reqwest::blocking::Client;
use reqwest::header::{HeaderMap, HeaderValue, USER_AGENT};
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use tracing::debug;

use crate::config::{ProviderCredentials, Settings};
use crate::domain::Provider;
use crate::error::ScoutError;

const GEMINI_BASE: &str = "https://generativelanguage.googleapis.com/v1beta";
const OPENAI_BASE: &str = "https://api.openai.com/v1";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChatRole {
    User,
    Model,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatTurn {
    pub role: ChatRole,
    pub text: String,
}

impl ChatTurn {
    pub fn user(text: impl Into<String>) -> Self {
        Self {
            role: ChatRole::User,
            text: text.into(),
        }
    }

    pub fn model(text: impl Into<String>) -> Self {
        Self {
            role: ChatRole::Model,
            text: text.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct LlmRequest {
    pub system: Option<String>,
    pub history: Vec<ChatTurn>,
    pub prompt: String,
    pub web_search: bool,
    pub temperature: f32,
}

impl LlmRequest {
    pub fn new(prompt: impl Into<String>) -> Self {
        Self {
            system: None,
            history: Vec::new(),
            prompt: prompt.into(),
            web_search: false,
            temperature: 0.2,
        }
    }

    pub fn with_web_search(mut self) -> Self {
        self.web_search = true;
        self
    }

    pub fn with_system(mut self, system: impl Into<String>) -> Self {
        self.system = Some(system.into());
        self
    }

    pub fn with_history(mut self, history: Vec<ChatTurn>) -> Self {
        self.history = history;
        self
    }
}

pub trait LlmClient: Send + Sync {
    fn generate(&self, request: &LlmRequest) -> Result<String, ScoutError>;
}

impl<T: LlmClient + ?Sized> LlmClient for &T {
    fn generate(&self, request: &LlmRequest) -> Result<String, ScoutError> {
        (**self).generate(request)
    }
}

impl<T: LlmClient + ?Sized> LlmClient for Box<T> {
    fn generate(&self, request: &LlmRequest) -> Result<String, ScoutError> {
        (**self).generate(request)
    }
}

/// Fails with `MissingCredentials` before any network traffic when the
/// selected provider has no key.
pub fn build_client(settings: &Settings) -> Result<Box<dyn LlmClient>, ScoutError> {
    let credentials = settings.credentials()?;
    match credentials.provider {
        Provider::Gemini => Ok(Box::new(GeminiHttpClient::new(credentials)?)),
        Provider::OpenAi => Ok(Box::new(OpenAiHttpClient::new(credentials)?)),
    }
}

fn http_client(timeout: Duration) -> Result<Client, ScoutError> {
    let mut headers = HeaderMap::new();
    headers.insert(
        USER_AGENT,
        HeaderValue::from_str(&format!("paperscout/{}", env!("CARGO_PKG_VERSION")))
            .map_err(|err| ScoutError::ProviderHttp(err.to_string()))?,
    );
    Client::builder()
        .default_headers(headers)
        .timeout(timeout)
        .build()
        .map_err(|err| ScoutError::ProviderHttp(err.to_string()))
}

fn read_json(response: reqwest::blocking::Response) -> Result<Value, ScoutError> {
    let status = response.status();
    let text = response
        .text()
        .map_err(|err| ScoutError::ProviderHttp(err.to_string()))?;
    if !status.is_success() {
        return Err(ScoutError::ProviderStatus {
            status: status.as_u16(),
            message: provider_error_message(&text),
        });
    }
    serde_json::from_str(&text).map_err(|err| ScoutError::ProviderHttp(err.to_string()))
}

pub fn provider_error_message(body: &str) -> String {
    let parsed: Option<Value> = serde_json::from_str(body).ok();
    let error = parsed.as_ref().and_then(|value| value.get("error"));
    let message = error
        .and_then(|err| err.get("message"))
        .and_then(Value::as_str);
    let status = error
        .and_then(|err| err.get("status").or_else(|| err.get("code")))
        .and_then(Value::as_str);
    match (status, message) {
        (Some(status), Some(message)) => format!("{status}: {message}"),
        (None, Some(message)) => message.to_string(),
        _ => truncate_preview(body, 500),
    }
}

fn truncate_preview(input: &str, max: usize) -> String {
    if input.len() <= max {
        return input.to_string();
    }
    let mut end = max;
    while end > 0 && !input.is_char_boundary(end) {
        end -= 1;
    }
    format!("{}...", &input[..end])
}

#[derive(Clone)]
pub struct GeminiHttpClient {
    client: Client,
    api_key: String,
    model: String,
    base_url: String,
}

impl GeminiHttpClient {
    pub fn new(credentials: ProviderCredentials) -> Result<Self, ScoutError> {
        Ok(Self {
            client: http_client(Duration::from_secs(120))?,
            api_key: credentials.api_key,
            model: credentials.model,
            base_url: GEMINI_BASE.to_string(),
        })
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }
}

pub fn gemini_body(request: &LlmRequest) -> Value {
    let mut contents: Vec<Value> = request
        .history
        .iter()
        .map(|turn| {
            json!({
                "role": match turn.role {
                    ChatRole::User => "user",
                    ChatRole::Model => "model",
                },
                "parts": [{ "text": turn.text }]
            })
        })
        .collect();
    contents.push(json!({ "role": "user", "parts": [{ "text": request.prompt }] }));

    let mut body = json!({
        "contents": contents,
        "generationConfig": { "temperature": request.temperature }
    });
    if let Some(system) = &request.system {
        body["systemInstruction"] = json!({ "parts": [{ "text": system }] });
    }
    if request.web_search {
        body["tools"] = json!([{ "google_search": {} }]);
    }
    body
}

pub fn gemini_text(value: &Value) -> Option<String> {
    let parts = value
        .get("candidates")?
        .as_array()?
        .first()?
        .get("content")?
        .get("parts")?
        .as_array()?;
    let text = parts
        .iter()
        .filter_map(|part| part.get("text").and_then(Value::as_str))
        .collect::<Vec<_>>()
        .join("");
    let trimmed = text.trim();
    (!trimmed.is_empty()).then(|| trimmed.to_string())
}

impl LlmClient for GeminiHttpClient {
    fn generate(&self, request: &LlmRequest) -> Result<String, ScoutError> {
        let url = format!("{}/models/{}:generateContent", self.base_url, self.model);
        debug!(model = %self.model, web_search = request.web_search, "gemini request");
        let response = self
            .client
            .post(&url)
            .header("x-goog-api-key", &self.api_key)
            .json(&gemini_body(request))
            .send()
            .map_err(|err| ScoutError::ProviderHttp(err.to_string()))?;
        let value = read_json(response)?;
        gemini_text(&value).ok_or_else(|| {
            ScoutError::ProviderHttp("gemini response contained no text".to_string())
        })
    }
}

#[derive(Clone)]
pub struct OpenAiHttpClient {
    client: Client,
    api_key: String,
    model: String,
    base_url: String,
}

impl OpenAiHttpClient {
    pub fn new(credentials: ProviderCredentials) -> Result<Self, ScoutError> {
        Ok(Self {
            client: http_client(Duration::from_secs(120))?,
            api_key: credentials.api_key,
            model: credentials.model,
            base_url: OPENAI_BASE.to_string(),
        })
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    fn body(&self, request: &LlmRequest) -> Value {
        openai_body(&self.model, request)
    }
}

pub fn openai_body(model: &str, request: &LlmRequest) -> Value {
    let mut input: Vec<Value> = request
        .history
        .iter()
        .map(|turn| {
            json!({
                "role": match turn.role {
                    ChatRole::User => "user",
                    ChatRole::Model => "assistant",
                },
                "content": turn.text
            })
        })
        .collect();
    input.push(json!({ "role": "user", "content": request.prompt }));

    let mut body = json!({
        "model": model,
        "input": input,
        "temperature": request.temperature
    });
    if let Some(system) = &request.system {
        body["instructions"] = json!(system);
    }
    if request.web_search {
        body["tools"] = json!([{ "type": "web_search" }]);
    }
    body
}

pub fn openai_text(value: &Value) -> Option<String> {
    if let Some(output_text) = value.get("output_text").and_then(Value::as_str) {
        let trimmed = output_text.trim();
        if !trimmed.is_empty() {
            return Some(trimmed.to_string());
        }
    }
    let mut chunks = Vec::new();
    for item in value.get("output")?.as_array()? {
        let Some(content) = item.get("content").and_then(Value::as_array) else {
            continue;
        };
        for part in content {
            if let Some(text) = part.get("text").and_then(Value::as_str) {
                let trimmed = text.trim();
                if !trimmed.is_empty() {
                    chunks.push(trimmed.to_string());
                }
            }
        }
    }
    (!chunks.is_empty()).then(|| chunks.join("\n"))
}

impl LlmClient for OpenAiHttpClient {
    fn generate(&self, request: &LlmRequest) -> Result<String, ScoutError> {
        let url = format!("{}/responses", self.base_url);
        debug!(model = %self.model, web_search = request.web_search, "openai request");
        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.api_key)
            .json(&self.body(request))
            .send()
            .map_err(|err| ScoutError::ProviderHttp(err.to_string()))?;
        let value = read_json(response)?;
        openai_text(&value).ok_or_else(|| {
            ScoutError::ProviderHttp("openai response contained no text".to_string())
        })
    }
}
