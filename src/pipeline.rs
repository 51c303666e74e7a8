use std::fmt;
use std::time::Duration;

use chrono::{NaiveDate, Utc};
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::domain::{AiDomain, BankingDomain, DateRange, Methodology};
use crate::error::ScoutError;
use crate::extract::extract_json_array;
use crate::llm::{LlmClient, LlmRequest};
use crate::paper::{Paper, SearchCriteria};
use crate::retry::{RetryPolicy, Sleeper, ThreadSleeper, with_retry};
use crate::sanitize::sanitize_papers;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum CollectStatus {
    Idle,
    Optimizing,
    Searching,
    Saving,
    Completed,
    Error,
}

impl fmt::Display for CollectStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            CollectStatus::Idle => "idle",
            CollectStatus::Optimizing => "optimizing",
            CollectStatus::Searching => "searching",
            CollectStatus::Saving => "saving",
            CollectStatus::Completed => "completed",
            CollectStatus::Error => "error",
        };
        f.write_str(label)
    }
}

#[derive(Debug, Clone)]
pub struct ProgressEvent {
    pub status: CollectStatus,
    pub message: String,
}

pub trait ProgressSink {
    fn event(&self, event: ProgressEvent);
}

pub struct NoopSink;

impl ProgressSink for NoopSink {
    fn event(&self, _event: ProgressEvent) {}
}

pub(crate) fn emit(sink: &dyn ProgressSink, status: CollectStatus, message: impl Into<String>) {
    sink.event(ProgressEvent {
        status,
        message: message.into(),
    });
}

pub fn fallback_policy() -> RetryPolicy {
    RetryPolicy::new(1, Duration::from_secs(5))
}

#[derive(Debug, Clone)]
pub struct Collection {
    pub query: String,
    pub papers: Vec<Paper>,
}

pub struct Collector<C: LlmClient> {
    client: C,
    sleeper: Box<dyn Sleeper>,
    search_policy: RetryPolicy,
    fallback_policy: RetryPolicy,
}

impl<C: LlmClient> Collector<C> {
    pub fn new(client: C) -> Self {
        Self {
            client,
            sleeper: Box::new(ThreadSleeper),
            search_policy: RetryPolicy::default(),
            fallback_policy: fallback_policy(),
        }
    }

    pub fn with_sleeper(mut self, sleeper: impl Sleeper + 'static) -> Self {
        self.sleeper = Box::new(sleeper);
        self
    }

    pub fn with_policies(mut self, search: RetryPolicy, fallback: RetryPolicy) -> Self {
        self.search_policy = search;
        self.fallback_policy = fallback;
        self
    }

    pub fn client(&self) -> &C {
        &self.client
    }

    pub fn optimize_query(&self, topic: &str, date_range: DateRange) -> String {
        let topic = topic.trim();
        let request = LlmRequest::new(optimize_prompt(topic, date_range));
        match self.client.generate(&request) {
            Ok(answer) => {
                let refined = clean_query(&answer);
                if refined.is_empty() {
                    return topic.to_string();
                }
                debug!(%topic, %refined, "query optimized");
                refined
            }
            Err(err) => {
                warn!(error = %err, "query optimization failed, using raw topic");
                topic.to_string()
            }
        }
    }

    pub fn collect_papers(
        &self,
        query: &str,
        sources: &[String],
        after: Option<NaiveDate>,
    ) -> Result<Vec<Paper>, ScoutError> {
        info!(%query, sources = sources.len(), ?after, "searching for papers");
        let request = LlmRequest::new(search_prompt(query, sources, after)).with_web_search();
        let search = with_retry(self.search_policy, self.sleeper.as_ref(), || {
            self.client.generate(&request)
        });

        let failure = match search {
            Ok(answer) => match extract_json_array(&answer) {
                Some(items) => {
                    let papers = sanitize_papers(&items, Utc::now());
                    info!(raw = items.len(), kept = papers.len(), "search results sanitized");
                    return Ok(papers);
                }
                None => {
                    warn!("search answer contained no JSON array, trying knowledge base");
                    ScoutError::Collection(
                        "search response did not contain a JSON array of papers".to_string(),
                    )
                }
            },
            Err(err) if err.is_quota() => return Err(err.into_quota()),
            Err(err) => {
                warn!(error = %err, "search failed, trying knowledge base");
                err
            }
        };

        self.knowledge_fallback(query, after, failure)
    }

    fn knowledge_fallback(
        &self,
        query: &str,
        after: Option<NaiveDate>,
        original: ScoutError,
    ) -> Result<Vec<Paper>, ScoutError> {
        let request = LlmRequest::new(knowledge_prompt(query, after));
        match with_retry(self.fallback_policy, self.sleeper.as_ref(), || {
            self.client.generate(&request)
        }) {
            Ok(answer) => {
                let items = extract_json_array(&answer).unwrap_or_default();
                let papers = sanitize_papers(&items, Utc::now());
                info!(kept = papers.len(), "knowledge base fallback returned");
                Ok(papers)
            }
            Err(err) if err.is_quota() => Err(err.into_quota()),
            Err(err) => {
                warn!(error = %err, "knowledge base fallback failed");
                Err(match original {
                    ScoutError::Collection(_) => original,
                    other => ScoutError::Collection(other.to_string()),
                })
            }
        }
    }

    pub fn run(
        &self,
        criteria: &SearchCriteria,
        sink: &dyn ProgressSink,
    ) -> Result<Collection, ScoutError> {
        let query = if criteria.optimize {
            emit(sink, CollectStatus::Optimizing, "refining search query");
            self.optimize_query(&criteria.topic, criteria.date_range)
        } else {
            criteria.topic.trim().to_string()
        };

        emit(sink, CollectStatus::Searching, format!("searching: {query}"));
        let after = criteria.date_range.after(Utc::now().date_naive());
        match self.collect_papers(&query, &criteria.sources, after) {
            Ok(papers) => Ok(Collection { query, papers }),
            Err(err) => {
                emit(sink, CollectStatus::Error, err.to_string());
                Err(err)
            }
        }
    }
}

fn clean_query(answer: &str) -> String {
    answer
        .trim()
        .trim_matches(|ch| matches!(ch, '`' | '"' | '\''))
        .trim()
        .to_string()
}

fn classification_rules() -> String {
    format!(
        "Classify every paper with exactly one value from each list, copied verbatim:\n\
- bankingDomain: {}\n\
- aiDomain: {}\n\
- methodology: {}\n",
        BankingDomain::literals().join(" | "),
        AiDomain::literals().join(" | "),
        Methodology::literals().join(" | "),
    )
}

fn output_format() -> &'static str {
    "Return the papers as a JSON array inside a ```json fenced code block. Each object has the keys \
\"title\", \"abstract\", \"authors\" (array of names), \"publishedDate\" (YYYY-MM-DD), \"source\", \
\"url\", \"citationCount\", \"bankingDomain\", \"aiDomain\", \"methodology\" and \"tags\" (array of short keywords)."
}

pub fn optimize_prompt(topic: &str, date_range: DateRange) -> String {
    format!(
        "You are a research librarian for a banking AI team. Rewrite the topic below into one \
precise boolean search string for academic search engines, targeting papers from {range}. \
Return only the search string, without explanation.\n\nTopic: {topic}",
        range = date_range.label(),
    )
}

pub fn search_prompt(query: &str, sources: &[String], after: Option<NaiveDate>) -> String {
    let sources = if sources.is_empty() {
        "any reputable academic source".to_string()
    } else {
        sources.join(", ")
    };
    let window = after
        .map(|date| format!("Only include papers published after {date}.\n"))
        .unwrap_or_default();
    format!(
        "Use web search to find 5 to 10 real, existing research papers for the query below. \
Prefer these sources: {sources}.\n{window}Never invent papers or URLs.\n\n{rules}\n{format}\n\nQuery: {query}",
        rules = classification_rules(),
        format = output_format(),
    )
}

pub fn knowledge_prompt(query: &str, after: Option<NaiveDate>) -> String {
    let window = after
        .map(|date| format!("Prefer papers published after {date}.\n"))
        .unwrap_or_default();
    format!(
        "Web search is unavailable. From your training knowledge, recall 5 to 10 real research \
papers relevant to the query below. Only list papers you are confident exist.\n{window}\n{rules}\n{format}\n\nQuery: {query}",
        rules = classification_rules(),
        format = output_format(),
    )
}
