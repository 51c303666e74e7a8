use std::io::{self, Write};

use serde::Serialize;

use crate::app::{BatchReport, CollectReport, CorpusStats};
use crate::paper::Paper;
use crate::pipeline::{ProgressEvent, ProgressSink};

#[derive(Debug, Clone, Copy)]
pub enum OutputMode {
    Interactive,
    NonInteractive,
}

pub struct JsonOutput;

impl JsonOutput {
    pub fn print_collect(result: &CollectReport) -> io::Result<()> {
        Self::print_json(result)
    }

    pub fn print_papers(papers: &[Paper]) -> io::Result<()> {
        Self::print_json(&papers)
    }

    pub fn print_paper(paper: &Paper) -> io::Result<()> {
        Self::print_json(paper)
    }

    pub fn print_batch(result: &BatchReport) -> io::Result<()> {
        Self::print_json(result)
    }

    pub fn print_stats(result: &CorpusStats) -> io::Result<()> {
        Self::print_json(result)
    }

    pub fn print_reply(reply: &str) -> io::Result<()> {
        Self::print_json(&serde_json::json!({ "reply": reply }))
    }

    pub fn print_json<T: Serialize + ?Sized>(value: &T) -> io::Result<()> {
        let json = serde_json::to_string_pretty(value).map_err(io::Error::other)?;
        let mut stdout = io::stdout();
        stdout.write_all(json.as_bytes())?;
        stdout.write_all(b"\n")?;
        Ok(())
    }
}

impl ProgressSink for JsonOutput {
    fn event(&self, _event: ProgressEvent) {}
}

pub struct StatusLine;

impl ProgressSink for StatusLine {
    fn event(&self, event: ProgressEvent) {
        eprintln!("[{}] {}", event.status, event.message);
    }
}

pub fn paper_line(paper: &Paper) -> String {
    let star = if paper.is_favorite { "*" } else { " " };
    let tags = if paper.tags.is_empty() {
        String::new()
    } else {
        format!(" #{}", paper.tags.join(" #"))
    };
    format!(
        "{star} {id}  {date}  {title}\n    {banking} / {ai} / {method}  ({authors}){tags}\n    {url}",
        id = paper.id,
        date = paper.published_date,
        title = paper.title,
        banking = paper.banking_domain,
        ai = paper.ai_domain,
        method = paper.methodology,
        authors = paper.authors.join(", "),
        url = paper.url,
    )
}
