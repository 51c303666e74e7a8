use std::sync::Mutex;

use chrono::Utc;

use paperscout::chat::{
    GENERIC_FAILURE_REPLY, MAX_CONTEXT_PAPERS, SYSTEM_OVERLOADED_REPLY, build_context,
    parse_history, query_corpus,
};
use paperscout::domain::{AiDomain, BankingDomain, Methodology};
use paperscout::error::ScoutError;
use paperscout::llm::{ChatRole, ChatTurn, LlmClient, LlmRequest};
use paperscout::paper::Paper;

struct OneShotLlm {
    reply: Mutex<Option<Result<String, ScoutError>>>,
    seen: Mutex<Option<LlmRequest>>,
}

impl OneShotLlm {
    fn new(reply: Result<String, ScoutError>) -> Self {
        Self {
            reply: Mutex::new(Some(reply)),
            seen: Mutex::new(None),
        }
    }
}

impl LlmClient for OneShotLlm {
    fn generate(&self, request: &LlmRequest) -> Result<String, ScoutError> {
        *self.seen.lock().unwrap() = Some(request.clone());
        self.reply
            .lock()
            .unwrap()
            .take()
            .unwrap_or_else(|| Err(ScoutError::ProviderHttp("called twice".to_string())))
    }
}

fn corpus(count: usize) -> Vec<Paper> {
    (0..count)
        .map(|i| Paper {
            id: format!("id-{i}"),
            title: format!("Paper title number {i}"),
            abstract_text: "x".repeat(300),
            authors: vec!["Unknown Author".to_string()],
            published_date: "2024-01-01".to_string(),
            source: "arXiv".to_string(),
            url: format!("https://p.example/{i}"),
            citation_count: 0,
            banking_domain: BankingDomain::GeneralBankingAi,
            ai_domain: AiDomain::LlmSft,
            methodology: Methodology::SurveyReview,
            tags: Vec::new(),
            is_favorite: false,
            collected_at: Utc::now(),
        })
        .collect()
}

#[test]
fn context_is_capped_and_numbered() {
    let papers = corpus(60);
    let context = build_context(&papers);
    assert_eq!(context.lines().count(), MAX_CONTEXT_PAPERS);
    assert!(context.starts_with("[1] Title: Paper title number 0"));
    assert!(context.contains("[50] Title: Paper title number 49"));
    assert!(!context.contains("Paper title number 50"));
    assert!(context.lines().all(|line| line.ends_with("...")));
}

#[test]
fn reply_is_forwarded_with_history() {
    let llm = OneShotLlm::new(Ok(" Paper [1] covers it. ".to_string()));
    let history = vec![ChatTurn::user("hello"), ChatTurn::model("hi")];
    let reply = query_corpus(&llm, &history, "Which paper uses RAG?", &corpus(2));

    assert_eq!(reply, "Paper [1] covers it.");
    let request = llm.seen.lock().unwrap().clone().unwrap();
    assert_eq!(request.prompt, "Which paper uses RAG?");
    assert_eq!(request.history.len(), 2);
    assert_eq!(request.history[1].role, ChatRole::Model);
    let system = request.system.unwrap();
    assert!(system.contains("[2] Title: Paper title number 1"));
    assert!(system.contains("square brackets"));
    assert!(!request.web_search);
}

#[test]
fn quota_becomes_overloaded_message() {
    let llm = OneShotLlm::new(Err(ScoutError::ProviderStatus {
        status: 429,
        message: "Too Many Requests".to_string(),
    }));
    assert_eq!(
        query_corpus(&llm, &[], "anything", &corpus(1)),
        SYSTEM_OVERLOADED_REPLY
    );
}

#[test]
fn other_failures_become_generic_message() {
    let llm = OneShotLlm::new(Err(ScoutError::MissingCredentials("no key".to_string())));
    assert_eq!(query_corpus(&llm, &[], "anything", &[]), GENERIC_FAILURE_REPLY);

    let llm = OneShotLlm::new(Ok("   ".to_string()));
    assert_eq!(query_corpus(&llm, &[], "anything", &[]), GENERIC_FAILURE_REPLY);
}

#[test]
fn abstract_preview_cuts_on_char_boundary() {
    let mut papers = corpus(2);
    papers[0].abstract_text = "é".repeat(250);
    papers[1].abstract_text = "short abstract".to_string();
    let context = build_context(&papers);
    let lines: Vec<&str> = context.lines().collect();
    assert!(lines[0].ends_with(&format!("Abstract: {}...", "é".repeat(200))));
    assert!(lines[1].ends_with("Abstract: short abstract"));
}

#[test]
fn history_file_parses_roles() {
    let history = parse_history(r#"[{"role":"user","text":"hi"},{"role":"model","text":"hello"}]"#)
        .unwrap();
    assert_eq!(history, vec![ChatTurn::user("hi"), ChatTurn::model("hello")]);

    let err = parse_history(r#"[{"role":"assistant","text":"x"}]"#).unwrap_err();
    assert!(matches!(err, ScoutError::InvalidValue(_)));
}
