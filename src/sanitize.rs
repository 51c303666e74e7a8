use chrono::{DateTime, Duration, NaiveDate, Utc};
use reqwest::Url;
use serde_json::Value;
use uuid::Uuid;

use crate::domain::{AiDomain, BankingDomain, Methodology};
use crate::paper::Paper;

pub const PLACEHOLDER_TITLE: &str = "Untitled Research";
pub const UNKNOWN_AUTHOR: &str = "Unknown Author";
pub const PLACEHOLDER_ABSTRACT: &str = "No abstract available.";
pub const PLACEHOLDER_SOURCE: &str = "Web Search";
pub const MIN_TITLE_CHARS: usize = 5;

const SEARCH_FALLBACK_URL: &str = "https://scholar.google.com/scholar";

pub fn sanitize_papers(raw: &[Value], collected_at: DateTime<Utc>) -> Vec<Paper> {
    raw.iter()
        .filter_map(|candidate| sanitize_paper(candidate, collected_at))
        .collect()
}

pub fn sanitize_paper(candidate: &Value, collected_at: DateTime<Utc>) -> Option<Paper> {
    let object = candidate.as_object()?;

    // Blank titles are dropped before any placeholder would be substituted.
    let title = string_field(object.get("title"))?;
    if title.chars().count() < MIN_TITLE_CHARS || title == PLACEHOLDER_TITLE {
        return None;
    }

    let published_date = string_field(object.get("publishedDate"))
        .unwrap_or_else(|| collected_at.date_naive().to_string());
    if let Some(published) = parse_published(&published_date) {
        if published > collected_at + Duration::hours(24) {
            return None;
        }
    }

    let url = string_field(object.get("url"))
        .filter(|url| has_url_scheme(url))
        .unwrap_or_else(|| search_url(&title));

    Some(Paper {
        id: Uuid::new_v4().to_string(),
        abstract_text: string_field(object.get("abstract"))
            .unwrap_or_else(|| PLACEHOLDER_ABSTRACT.to_string()),
        authors: normalize_authors(object.get("authors")),
        published_date,
        source: string_field(object.get("source"))
            .unwrap_or_else(|| PLACEHOLDER_SOURCE.to_string()),
        url,
        citation_count: citation_count(object.get("citationCount")),
        banking_domain: BankingDomain::coerce(object.get("bankingDomain").and_then(Value::as_str)),
        ai_domain: AiDomain::coerce(object.get("aiDomain").and_then(Value::as_str)),
        methodology: Methodology::coerce(object.get("methodology").and_then(Value::as_str)),
        tags: normalize_tags(object.get("tags")),
        is_favorite: false,
        collected_at,
        title,
    })
}

pub fn normalize_authors(value: Option<&Value>) -> Vec<String> {
    let authors: Vec<String> = match value {
        Some(Value::Array(items)) => items
            .iter()
            .filter_map(Value::as_str)
            .map(str::trim)
            .filter(|name| !name.is_empty())
            .map(str::to_string)
            .collect(),
        Some(Value::String(text)) if text.contains(',') => text
            .split(',')
            .map(str::trim)
            .filter(|name| !name.is_empty())
            .map(str::to_string)
            .collect(),
        Some(Value::String(text)) if !text.trim().is_empty() => vec![text.trim().to_string()],
        _ => Vec::new(),
    };
    if authors.is_empty() {
        return vec![UNKNOWN_AUTHOR.to_string()];
    }
    authors
}

fn normalize_tags(value: Option<&Value>) -> Vec<String> {
    match value {
        Some(Value::Array(items)) => items
            .iter()
            .filter_map(Value::as_str)
            .map(|tag| tag.trim().to_string())
            .filter(|tag| !tag.is_empty())
            .collect(),
        _ => Vec::new(),
    }
}

fn citation_count(value: Option<&Value>) -> u64 {
    match value {
        Some(Value::Number(number)) => number
            .as_u64()
            .or_else(|| number.as_f64().filter(|n| *n >= 0.0).map(|n| n as u64))
            .unwrap_or(0),
        Some(Value::String(text)) => text.trim().parse().unwrap_or(0),
        _ => 0,
    }
}

fn string_field(value: Option<&Value>) -> Option<String> {
    let text = match value? {
        Value::String(text) => text.trim().to_string(),
        Value::Number(number) => number.to_string(),
        _ => return None,
    };
    (!text.is_empty()).then_some(text)
}

fn has_url_scheme(url: &str) -> bool {
    let lowered = url.to_ascii_lowercase();
    lowered.starts_with("http://") || lowered.starts_with("https://")
}

pub fn search_url(title: &str) -> String {
    match Url::parse_with_params(SEARCH_FALLBACK_URL, &[("q", title)]) {
        Ok(url) => url.to_string(),
        Err(_) => SEARCH_FALLBACK_URL.to_string(),
    }
}

/// Accepts `YYYY-MM-DD`, `YYYY-MM`, `YYYY` and RFC 3339 timestamps.
pub fn parse_published(value: &str) -> Option<DateTime<Utc>> {
    let value = value.trim();
    if let Ok(timestamp) = DateTime::parse_from_rfc3339(value) {
        return Some(timestamp.with_timezone(&Utc));
    }
    let date = NaiveDate::parse_from_str(value, "%Y-%m-%d")
        .or_else(|_| NaiveDate::parse_from_str(&format!("{value}-01"), "%Y-%m-%d"))
        .or_else(|_| NaiveDate::parse_from_str(&format!("{value}-01-01"), "%Y-%m-%d"))
        .ok()?;
    Some(date.and_hms_opt(0, 0, 0)?.and_utc())
}
