use std::collections::VecDeque;
use std::sync::Mutex;
use std::time::Duration;

use assert_matches::assert_matches;
use chrono::Utc;

use paperscout::app::{App, PaperFilter};
use paperscout::domain::{BankingDomain, DateRange, Methodology};
use paperscout::error::ScoutError;
use paperscout::llm::{LlmClient, LlmRequest};
use paperscout::paper::SearchCriteria;
use paperscout::pipeline::{CollectStatus, Collector, ProgressEvent, ProgressSink};
use paperscout::retry::Sleeper;
use paperscout::store::{Library, MemoryStore};

struct QueueLlm {
    replies: Mutex<VecDeque<Result<String, ScoutError>>>,
}

impl QueueLlm {
    fn new(replies: Vec<Result<String, ScoutError>>) -> Self {
        Self {
            replies: Mutex::new(replies.into()),
        }
    }
}

impl LlmClient for QueueLlm {
    fn generate(&self, _request: &LlmRequest) -> Result<String, ScoutError> {
        self.replies
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Err(ScoutError::ProviderHttp("queue empty".to_string())))
    }
}

struct NoSleep;

impl Sleeper for NoSleep {
    fn sleep(&self, _duration: Duration) {}
}

#[derive(Default)]
struct RecordingSink {
    events: Mutex<Vec<ProgressEvent>>,
}

impl ProgressSink for RecordingSink {
    fn event(&self, event: ProgressEvent) {
        self.events.lock().unwrap().push(event);
    }
}

const PAPERS: &str = r#"```json
[
  {"title": "Agentic AML alert review", "url": "https://a.example/1", "bankingDomain": "AML Compliance & Control", "methodology": "Case Study", "tags": ["aml"]},
  {"title": "Robo-advisors with RLHF", "url": "https://a.example/2", "bankingDomain": "Portfolio Optimization", "aiDomain": "RLHF"},
  {"title": "AGENTIC AML ALERT REVIEW", "url": "https://a.example/3"}
]
```"#;

const MORE_PAPERS: &str = r#"```json
[
  {"title": "Agentic AML alert review", "url": "https://a.example/1"},
  {"title": "Synthetic identities in eKYC onboarding", "url": "https://a.example/4"}
]
```"#;

fn app(replies: Vec<Result<String, ScoutError>>) -> App<MemoryStore, QueueLlm> {
    App::new(
        Library::new(MemoryStore::new()),
        Collector::new(QueueLlm::new(replies)).with_sleeper(NoSleep),
    )
}

fn criteria() -> SearchCriteria {
    SearchCriteria {
        topic: "AML agents".to_string(),
        sources: vec!["SSRN".to_string()],
        date_range: DateRange::PastYear,
        optimize: false,
    }
}

#[test]
fn collect_tallies_saved_and_duplicates() {
    let app = app(vec![Ok(PAPERS.to_string())]);
    let sink = RecordingSink::default();
    let report = app.collect(&criteria(), &sink).unwrap();

    assert_eq!(report.found, 3);
    assert_eq!(report.saved, 2);
    assert_eq!(report.duplicates, 1);
    assert_eq!(app.library().papers().unwrap().len(), 2);
    assert_eq!(
        app.library().sources().unwrap(),
        Some(vec!["SSRN".to_string()])
    );

    let statuses: Vec<_> = sink.events.lock().unwrap().iter().map(|e| e.status).collect();
    assert_eq!(
        statuses,
        vec![
            CollectStatus::Searching,
            CollectStatus::Saving,
            CollectStatus::Completed
        ]
    );
}

#[test]
fn empty_result_is_not_an_error() {
    let app = app(vec![Ok("```json\n[]\n```".to_string())]);
    let sink = RecordingSink::default();
    let report = app.collect(&criteria(), &sink).unwrap();
    assert!(report.is_empty());
    let events = sink.events.lock().unwrap();
    assert_eq!(events.last().unwrap().message, "no papers found");
}

#[test]
fn quota_error_reaches_the_caller() {
    let quota = || {
        Err(ScoutError::ProviderStatus {
            status: 429,
            message: "quota".to_string(),
        })
    };
    let app = app(vec![quota(), quota(), quota()]);
    let sink = RecordingSink::default();
    let err = app.collect(&criteria(), &sink).unwrap_err();
    assert_matches!(err, ScoutError::QuotaExceeded(_));
    let events = sink.events.lock().unwrap();
    assert_eq!(events.last().unwrap().status, CollectStatus::Error);
}

#[test]
fn list_filters_and_stats_count() {
    let app = app(vec![Ok(PAPERS.to_string())]);
    app.collect(&criteria(), &RecordingSink::default()).unwrap();

    let aml = app
        .list(&PaperFilter {
            banking_domain: Some(BankingDomain::AmlCompliance),
            ..PaperFilter::default()
        })
        .unwrap();
    assert_eq!(aml.len(), 1);
    assert_eq!(aml[0].methodology, Methodology::CaseStudy);

    let by_tag = app
        .list(&PaperFilter {
            text: Some("AML".to_string()),
            ..PaperFilter::default()
        })
        .unwrap();
    assert_eq!(by_tag.len(), 1);

    let id = aml[0].id.clone();
    app.toggle_favorite(&id).unwrap();
    app.add_tag(&id, "review").unwrap();
    let favorites = app
        .list(&PaperFilter {
            favorites_only: true,
            ..PaperFilter::default()
        })
        .unwrap();
    assert_eq!(favorites.len(), 1);
    assert_eq!(favorites[0].tags, vec!["aml", "review"]);

    let stats = app.stats().unwrap();
    assert_eq!(stats.total, 2);
    assert_eq!(stats.favorites, 1);
    assert_eq!(stats.by_banking_domain["Portfolio Optimization"], 1);
    assert_eq!(stats.by_banking_domain["Fraud Detection"], 0);
    assert_eq!(stats.by_ai_domain["RLHF"], 1);
}

#[test]
fn batch_report_skips_when_not_due() {
    let app = app(vec![Ok(PAPERS.to_string())]);
    let no_sleep = NoSleep;
    let now = Utc::now();
    let first = app.daily_batch(now, Some(&no_sleep), false);
    assert!(first.ran);
    assert_eq!(first.saved, 2);

    let second = app.daily_batch(now, Some(&no_sleep), false);
    assert!(!second.ran);
    assert_eq!(second.saved, 0);
}

#[test]
fn forced_batch_ignores_recent_run() {
    let app = app(vec![Ok(PAPERS.to_string()), Ok(MORE_PAPERS.to_string())]);
    let no_sleep = NoSleep;
    let now = Utc::now();
    let first = app.daily_batch(now, Some(&no_sleep), false);
    assert!(first.ran);

    let later = now + chrono::TimeDelta::hours(1);
    let forced = app.daily_batch(later, Some(&no_sleep), true);
    assert!(forced.ran);
    assert_eq!(forced.saved, 1);
    assert_eq!(app.library().last_batch().unwrap(), Some(later));
    assert_eq!(app.library().papers().unwrap().len(), 3);
}

#[test]
fn chat_never_fails() {
    let app = app(vec![]);
    let reply = app.chat(&[], "What do we have on fraud?");
    assert!(!reply.is_empty());
}
