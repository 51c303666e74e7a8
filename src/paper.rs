use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::{AiDomain, BankingDomain, DateRange, Methodology};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Paper {
    pub id: String,
    pub title: String,
    #[serde(rename = "abstract")]
    pub abstract_text: String,
    pub authors: Vec<String>,
    pub published_date: String,
    pub source: String,
    pub url: String,
    #[serde(default)]
    pub citation_count: u64,
    pub banking_domain: BankingDomain,
    pub ai_domain: AiDomain,
    pub methodology: Methodology,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub is_favorite: bool,
    pub collected_at: DateTime<Utc>,
}

impl Paper {
    pub fn title_key(&self) -> String {
        self.title.trim().to_lowercase()
    }

    pub fn has_tag(&self, tag: &str) -> bool {
        let needle = tag.trim().to_lowercase();
        self.tags.iter().any(|t| t.trim().to_lowercase() == needle)
    }

    pub fn matches_text(&self, query: &str) -> bool {
        let needle = query.trim().to_lowercase();
        if needle.is_empty() {
            return true;
        }
        self.title.to_lowercase().contains(&needle)
            || self.abstract_text.to_lowercase().contains(&needle)
            || self.tags.iter().any(|t| t.to_lowercase().contains(&needle))
    }
}

#[derive(Debug, Clone)]
pub struct SearchCriteria {
    pub topic: String,
    pub sources: Vec<String>,
    pub date_range: DateRange,
    pub optimize: bool,
}

impl SearchCriteria {
    pub fn new(topic: impl Into<String>) -> Self {
        Self {
            topic: topic.into(),
            sources: default_sources(),
            date_range: DateRange::default(),
            optimize: true,
        }
    }
}

pub fn default_sources() -> Vec<String> {
    vec![
        "arXiv".to_string(),
        "SSRN".to_string(),
        "Google Scholar".to_string(),
        "IEEE Xplore".to_string(),
    ]
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserProfile {
    #[serde(default = "default_user_name")]
    pub name: String,
    #[serde(default = "default_user_role")]
    pub role: String,
    #[serde(default)]
    pub joined_at: Option<DateTime<Utc>>,
}

impl Default for UserProfile {
    fn default() -> Self {
        Self {
            name: default_user_name(),
            role: default_user_role(),
            joined_at: None,
        }
    }
}

fn default_user_name() -> String {
    "Researcher".to_string()
}

fn default_user_role() -> String {
    "Banking AI Research".to_string()
}
