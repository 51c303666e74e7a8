use serde::{Deserialize, Serialize};

use crate::domain::Provider;
use crate::error::ScoutError;

pub const GEMINI_API_KEY_ENV: &str = "GEMINI_API_KEY";
pub const OPENAI_API_KEY_ENV: &str = "OPENAI_API_KEY";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Settings {
    #[serde(default)]
    pub provider: Provider,
    #[serde(default)]
    pub gemini_api_key: String,
    #[serde(default = "default_gemini_model")]
    pub gemini_model: String,
    #[serde(default)]
    pub openai_api_key: String,
    #[serde(default = "default_openai_model")]
    pub openai_model: String,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            provider: Provider::default(),
            gemini_api_key: String::new(),
            gemini_model: default_gemini_model(),
            openai_api_key: String::new(),
            openai_model: default_openai_model(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProviderCredentials {
    pub provider: Provider,
    pub api_key: String,
    pub model: String,
}

impl Settings {
    pub fn from_json(content: &str) -> Result<Self, ScoutError> {
        serde_json::from_str(content).map_err(|err| ScoutError::ConfigParse {
            key: "settings".to_string(),
            message: err.to_string(),
        })
    }

    pub fn with_env_overlay(mut self) -> Self {
        self.apply_env(|name| std::env::var(name).ok());
        self
    }

    pub fn apply_env<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if self.gemini_api_key.trim().is_empty() {
            if let Some(key) = lookup(GEMINI_API_KEY_ENV).filter(|key| !key.trim().is_empty()) {
                self.gemini_api_key = key.trim().to_string();
            }
        }
        if self.openai_api_key.trim().is_empty() {
            if let Some(key) = lookup(OPENAI_API_KEY_ENV).filter(|key| !key.trim().is_empty()) {
                self.openai_api_key = key.trim().to_string();
            }
        }
    }

    pub fn credentials(&self) -> Result<ProviderCredentials, ScoutError> {
        let (api_key, model, env) = match self.provider {
            Provider::Gemini => (&self.gemini_api_key, &self.gemini_model, GEMINI_API_KEY_ENV),
            Provider::OpenAi => (&self.openai_api_key, &self.openai_model, OPENAI_API_KEY_ENV),
        };
        if api_key.trim().is_empty() {
            return Err(ScoutError::MissingCredentials(format!(
                "no API key configured for provider {} (set {env})",
                self.provider
            )));
        }
        Ok(ProviderCredentials {
            provider: self.provider,
            api_key: api_key.trim().to_string(),
            model: model.trim().to_string(),
        })
    }

    pub fn redacted(&self) -> Settings {
        Settings {
            gemini_api_key: redact(&self.gemini_api_key),
            openai_api_key: redact(&self.openai_api_key),
            ..self.clone()
        }
    }
}

fn redact(key: &str) -> String {
    if key.is_empty() {
        return String::new();
    }
    let tail: String = key.chars().rev().take(4).collect::<Vec<_>>().into_iter().rev().collect();
    format!("****{tail}")
}

pub fn default_gemini_model() -> String {
    "gemini-2.5-flash".to_string()
}

pub fn default_openai_model() -> String {
    "gpt-4o-mini".to_string()
}
