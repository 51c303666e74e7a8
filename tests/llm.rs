use serde_json::json;

use paperscout::llm::{
    ChatTurn, LlmRequest, gemini_body, gemini_text, openai_body, openai_text,
    provider_error_message,
};

#[test]
fn gemini_body_shapes_history_and_tools() {
    let request = LlmRequest::new("find papers")
        .with_system("be precise")
        .with_history(vec![ChatTurn::user("hi"), ChatTurn::model("hello")])
        .with_web_search();
    let body = gemini_body(&request);
    let contents = body["contents"].as_array().unwrap();
    assert_eq!(contents.len(), 3);
    assert_eq!(contents[1]["role"], "model");
    assert_eq!(contents[2]["parts"][0]["text"], "find papers");
    assert_eq!(body["systemInstruction"]["parts"][0]["text"], "be precise");
    assert!(body["tools"][0].get("google_search").is_some());
}

#[test]
fn openai_body_without_tools() {
    let body = openai_body("gpt-test", &LlmRequest::new("recall papers"));
    assert_eq!(body["model"], "gpt-test");
    assert!(body.get("tools").is_none());
    assert!(body.get("instructions").is_none());
    assert_eq!(body["input"][0]["content"], "recall papers");
}

#[test]
fn response_text_extraction() {
    let gemini = json!({
        "candidates": [{ "content": { "parts": [{ "text": "part one " }, { "text": "two" }] } }]
    });
    assert_eq!(gemini_text(&gemini).as_deref(), Some("part one two"));

    let openai = json!({
        "output": [
            { "type": "web_search_call" },
            { "content": [{ "type": "output_text", "text": "answer" }] }
        ]
    });
    assert_eq!(openai_text(&openai).as_deref(), Some("answer"));
    assert_eq!(openai_text(&json!({ "output": [] })), None);
}

#[test]
fn provider_error_message_prefers_status() {
    let body = r#"{"error":{"code":429,"message":"Quota exceeded","status":"RESOURCE_EXHAUSTED"}}"#;
    assert_eq!(
        provider_error_message(body),
        "RESOURCE_EXHAUSTED: Quota exceeded"
    );
    assert_eq!(provider_error_message("plain"), "plain");
}
