use std::sync::OnceLock;

use regex::Regex;
use serde_json::Value;

fn fence_regex() -> &'static Regex {
    static FENCE: OnceLock<Regex> = OnceLock::new();
    FENCE.get_or_init(|| {
        Regex::new(r"(?s)```[ \t]*([A-Za-z0-9_-]*)[ \t]*\r?\n?(.*?)```").expect("valid fence regex")
    })
}

pub fn extract_json_array(text: &str) -> Option<Vec<Value>> {
    let blocks: Vec<(String, String)> = fence_regex()
        .captures_iter(text)
        .map(|caps| {
            (
                caps.get(1).map(|m| m.as_str().to_lowercase()).unwrap_or_default(),
                caps.get(2).map(|m| m.as_str().to_string()).unwrap_or_default(),
            )
        })
        .collect();

    let tagged = blocks
        .iter()
        .filter(|(lang, _)| lang == "json")
        .map(|(_, body)| body.as_str());
    let generic = blocks
        .iter()
        .filter(|(lang, _)| lang != "json")
        .map(|(_, body)| body.as_str());

    tagged
        .chain(generic)
        .find_map(parse_array)
        .or_else(|| parse_array(text))
}

fn parse_array(candidate: &str) -> Option<Vec<Value>> {
    let trimmed = candidate.trim();
    if let Ok(Value::Array(items)) = serde_json::from_str::<Value>(trimmed) {
        return Some(items);
    }

    // Prose may carry citations like `[1]` around the payload; prefer an array of objects.
    let mut first_array = None;
    for (start, _) in trimmed.match_indices('[') {
        let mut stream = serde_json::Deserializer::from_str(&trimmed[start..]).into_iter::<Value>();
        if let Some(Ok(Value::Array(items))) = stream.next() {
            if items.iter().any(Value::is_object) {
                return Some(items);
            }
            first_array.get_or_insert(items);
        }
    }
    first_array
}
