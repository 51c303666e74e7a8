use std::sync::Mutex;
use std::time::Duration;

use chrono::{DateTime, TimeDelta, Utc};
use rand::SeedableRng;
use rand::rngs::StdRng;

use paperscout::batch::DailyBatch;
use paperscout::error::ScoutError;
use paperscout::llm::{LlmClient, LlmRequest};
use paperscout::pipeline::Collector;
use paperscout::retry::Sleeper;
use paperscout::store::{Library, MemoryStore};

struct CountingLlm {
    reply: Result<String, u16>,
    calls: Mutex<Vec<LlmRequest>>,
}

impl CountingLlm {
    fn ok(reply: &str) -> Self {
        Self {
            reply: Ok(reply.to_string()),
            calls: Mutex::new(Vec::new()),
        }
    }

    fn failing(status: u16) -> Self {
        Self {
            reply: Err(status),
            calls: Mutex::new(Vec::new()),
        }
    }

    fn calls(&self) -> usize {
        self.calls.lock().unwrap().len()
    }
}

impl LlmClient for CountingLlm {
    fn generate(&self, request: &LlmRequest) -> Result<String, ScoutError> {
        self.calls.lock().unwrap().push(request.clone());
        match &self.reply {
            Ok(text) => Ok(text.clone()),
            Err(status) => Err(ScoutError::ProviderStatus {
                status: *status,
                message: "scripted failure".to_string(),
            }),
        }
    }
}

#[derive(Default)]
struct RecordingSleeper {
    waits: Mutex<Vec<Duration>>,
}

impl Sleeper for RecordingSleeper {
    fn sleep(&self, duration: Duration) {
        self.waits.lock().unwrap().push(duration);
    }
}

#[derive(Default)]
struct NoSleep;

impl Sleeper for NoSleep {
    fn sleep(&self, _duration: Duration) {}
}

const TWO_PAPERS: &str = "```json\n[\
{\"title\": \"Batch paper number one\", \"url\": \"https://b.example/1\", \"publishedDate\": \"2024-01-02\"},\
{\"title\": \"Batch paper number two\", \"url\": \"https://b.example/2\", \"publishedDate\": \"2024-01-03\"}\
]\n```";

fn now() -> DateTime<Utc> {
    DateTime::parse_from_rfc3339("2024-06-01T12:00:00Z")
        .unwrap()
        .with_timezone(&Utc)
}

#[test]
fn recent_run_makes_no_calls() {
    let library = Library::new(MemoryStore::new());
    let last = now() - TimeDelta::hours(23);
    library.set_last_batch(last).unwrap();
    let llm = CountingLlm::ok(TWO_PAPERS);
    let collector = Collector::new(&llm).with_sleeper(NoSleep);
    let sleeper = RecordingSleeper::default();

    let saved = DailyBatch::new(&library, &collector)
        .with_sleeper(&sleeper)
        .run(now());

    assert_eq!(saved, 0);
    assert_eq!(llm.calls(), 0);
    assert!(sleeper.waits.lock().unwrap().is_empty());
    assert_eq!(library.last_batch().unwrap(), Some(last));
}

#[test]
fn due_run_saves_and_commits_timestamp() {
    let library = Library::new(MemoryStore::new());
    let llm = CountingLlm::ok(TWO_PAPERS);
    let collector = Collector::new(&llm).with_sleeper(NoSleep);
    let sleeper = RecordingSleeper::default();
    let mut rng = StdRng::seed_from_u64(7);

    let batch = DailyBatch::new(&library, &collector).with_sleeper(&sleeper);
    assert!(batch.is_due(now()));
    let saved = batch.run_with_rng(now(), &mut rng);

    assert_eq!(saved, 2);
    assert_eq!(llm.calls(), 1);
    assert_eq!(
        sleeper.waits.lock().unwrap().clone(),
        vec![Duration::from_secs(20)]
    );
    assert_eq!(library.last_batch().unwrap(), Some(now()));
    assert!(!batch.is_due(now() + TimeDelta::hours(1)));

    let calls = llm.calls.lock().unwrap();
    let request = &calls[0];
    assert!(request.prompt.contains("in banking AI"));
    assert!(request.prompt.contains("after 2024-05-01"));
}

#[test]
fn second_day_counts_only_new_papers() {
    let library = Library::new(MemoryStore::new());
    let llm = CountingLlm::ok(TWO_PAPERS);
    let collector = Collector::new(&llm).with_sleeper(NoSleep);
    let no_sleep = NoSleep;
    let batch = DailyBatch::new(&library, &collector).with_sleeper(&no_sleep);

    assert_eq!(batch.run(now()), 2);
    assert_eq!(batch.run(now() + TimeDelta::hours(25)), 0);
    assert_eq!(library.papers().unwrap().len(), 2);
    assert_eq!(
        library.last_batch().unwrap(),
        Some(now() + TimeDelta::hours(25))
    );
}

#[test]
fn quota_failure_is_swallowed_and_timestamp_committed() {
    let library = Library::new(MemoryStore::new());
    let llm = CountingLlm::failing(429);
    let collector = Collector::new(&llm).with_sleeper(NoSleep);

    let saved = DailyBatch::new(&library, &collector)
        .with_sleeper(&NoSleep)
        .run(now());

    assert_eq!(saved, 0);
    assert_eq!(llm.calls(), 3);
    assert_eq!(library.last_batch().unwrap(), Some(now()));
}

#[test]
fn other_failures_are_swallowed_too() {
    let library = Library::new(MemoryStore::new());
    let llm = CountingLlm::failing(400);
    let collector = Collector::new(&llm).with_sleeper(NoSleep);

    let saved = DailyBatch::new(&library, &collector)
        .with_sleeper(&NoSleep)
        .run(now());

    assert_eq!(saved, 0);
    // search plus one knowledge-base attempt
    assert_eq!(llm.calls(), 2);
    assert_eq!(library.last_batch().unwrap(), Some(now()));
}
