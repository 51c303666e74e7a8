use miette::Diagnostic;
use thiserror::Error;

#[derive(Debug, Error, Diagnostic)]
pub enum ScoutError {
    #[error("provider quota exceeded: {0}")]
    #[diagnostic(help("wait for the provider quota window to reset before collecting again"))]
    QuotaExceeded(String),

    #[error("provider returned status {status}: {message}")]
    ProviderStatus { status: u16, message: String },

    #[error("provider request failed: {0}")]
    ProviderHttp(String),

    #[error("missing credentials: {0}")]
    #[diagnostic(help("run `paperscout settings set` or export the provider API key"))]
    MissingCredentials(String),

    #[error("collection failed: {0}")]
    Collection(String),

    #[error("paper not found: {0}")]
    PaperNotFound(String),

    #[error("store error: {0}")]
    Store(String),

    #[error("failed to parse stored JSON under key {key}: {message}")]
    ConfigParse { key: String, message: String },

    #[error("invalid value: {0}")]
    InvalidValue(String),
}

const TRANSIENT_MARKERS: [&str; 6] = [
    "429",
    "503",
    "RESOURCE_EXHAUSTED",
    "rate limit",
    "overloaded",
    "UNAVAILABLE",
];

const QUOTA_MARKERS: [&str; 3] = ["429", "RESOURCE_EXHAUSTED", "quota"];

impl ScoutError {
    pub fn status(&self) -> Option<u16> {
        match self {
            ScoutError::ProviderStatus { status, .. } => Some(*status),
            _ => None,
        }
    }

    pub fn is_transient(&self) -> bool {
        if matches!(self, ScoutError::QuotaExceeded(_)) {
            return true;
        }
        if matches!(self.status(), Some(429 | 503)) {
            return true;
        }
        contains_marker(&self.to_string(), &TRANSIENT_MARKERS)
    }

    pub fn is_quota(&self) -> bool {
        if matches!(self, ScoutError::QuotaExceeded(_)) {
            return true;
        }
        if self.status() == Some(429) {
            return true;
        }
        contains_marker(&self.to_string(), &QUOTA_MARKERS)
    }

    pub fn into_quota(self) -> ScoutError {
        match self {
            ScoutError::QuotaExceeded(_) => self,
            other => ScoutError::QuotaExceeded(other.to_string()),
        }
    }
}

fn contains_marker(message: &str, markers: &[&str]) -> bool {
    let lowered = message.to_lowercase();
    markers
        .iter()
        .any(|marker| lowered.contains(&marker.to_lowercase()))
}
