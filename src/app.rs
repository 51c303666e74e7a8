use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{info, warn};

use crate::batch::DailyBatch;
use crate::chat::query_corpus;
use crate::domain::{AiDomain, BankingDomain, Methodology};
use crate::error::ScoutError;
use crate::llm::{ChatTurn, LlmClient};
use crate::paper::{Paper, SearchCriteria};
use crate::pipeline::{CollectStatus, Collector, ProgressSink, emit};
use crate::retry::Sleeper;
use crate::store::{KeyValueStore, Library, SaveOutcome};

#[derive(Debug, Clone, Serialize)]
pub struct CollectReport {
    pub query: String,
    pub found: usize,
    pub saved: usize,
    pub duplicates: usize,
    pub papers: Vec<Paper>,
}

impl CollectReport {
    pub fn is_empty(&self) -> bool {
        self.found == 0
    }
}

#[derive(Debug, Clone, Default)]
pub struct PaperFilter {
    pub banking_domain: Option<BankingDomain>,
    pub ai_domain: Option<AiDomain>,
    pub methodology: Option<Methodology>,
    pub favorites_only: bool,
    pub text: Option<String>,
}

impl PaperFilter {
    pub fn matches(&self, paper: &Paper) -> bool {
        self.banking_domain.is_none_or(|d| paper.banking_domain == d)
            && self.ai_domain.is_none_or(|d| paper.ai_domain == d)
            && self.methodology.is_none_or(|m| paper.methodology == m)
            && (!self.favorites_only || paper.is_favorite)
            && self.text.as_deref().is_none_or(|text| paper.matches_text(text))
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct CorpusStats {
    pub total: usize,
    pub favorites: usize,
    pub by_banking_domain: BTreeMap<String, usize>,
    pub by_ai_domain: BTreeMap<String, usize>,
    pub by_methodology: BTreeMap<String, usize>,
}

#[derive(Debug, Clone, Serialize)]
pub struct BatchReport {
    pub ran: bool,
    pub saved: usize,
}

pub struct App<S: KeyValueStore, C: LlmClient> {
    library: Library<S>,
    collector: Collector<C>,
}

impl<S: KeyValueStore, C: LlmClient> App<S, C> {
    pub fn new(library: Library<S>, collector: Collector<C>) -> Self {
        Self { library, collector }
    }

    pub fn library(&self) -> &Library<S> {
        &self.library
    }

    pub fn collector(&self) -> &Collector<C> {
        &self.collector
    }

    pub fn collect(
        &self,
        criteria: &SearchCriteria,
        sink: &dyn ProgressSink,
    ) -> Result<CollectReport, ScoutError> {
        if let Err(err) = self.library.set_sources(&criteria.sources) {
            warn!(error = %err, "could not persist source list");
        }

        let collection = self.collector.run(criteria, sink)?;
        emit(
            sink,
            CollectStatus::Saving,
            format!("saving {} papers", collection.papers.len()),
        );

        let mut saved = 0;
        let mut duplicates = 0;
        let mut accepted = Vec::new();
        for paper in collection.papers.iter() {
            match self.library.save_paper(paper) {
                Ok(SaveOutcome::Saved) => {
                    saved += 1;
                    accepted.push(paper.clone());
                }
                Ok(SaveOutcome::Duplicate) => duplicates += 1,
                Err(err) => {
                    emit(sink, CollectStatus::Error, err.to_string());
                    return Err(err);
                }
            }
        }

        let message = if collection.papers.is_empty() {
            "no papers found".to_string()
        } else {
            format!("{saved} new, {duplicates} duplicates skipped")
        };
        emit(sink, CollectStatus::Completed, message);
        info!(query = %collection.query, saved, duplicates, "collection finished");

        Ok(CollectReport {
            query: collection.query,
            found: collection.papers.len(),
            saved,
            duplicates,
            papers: accepted,
        })
    }

    pub fn list(&self, filter: &PaperFilter) -> Result<Vec<Paper>, ScoutError> {
        let mut papers: Vec<Paper> = self
            .library
            .papers()?
            .into_iter()
            .filter(|paper| filter.matches(paper))
            .collect();
        papers.sort_by(|a, b| b.collected_at.cmp(&a.collected_at));
        Ok(papers)
    }

    pub fn toggle_favorite(&self, id: &str) -> Result<Paper, ScoutError> {
        self.library.toggle_favorite(id)
    }

    pub fn add_tag(&self, id: &str, tag: &str) -> Result<Paper, ScoutError> {
        self.library.add_tag(id, tag)
    }

    pub fn chat(&self, history: &[ChatTurn], message: &str) -> String {
        let papers = match self.library.papers() {
            Ok(papers) => papers,
            Err(err) => {
                warn!(error = %err, "could not load library for chat");
                Vec::new()
            }
        };
        query_corpus(self.collector.client(), history, message, &papers)
    }

    pub fn daily_batch(
        &self,
        now: DateTime<Utc>,
        sleeper: Option<&dyn Sleeper>,
        force: bool,
    ) -> BatchReport {
        let mut batch = DailyBatch::new(&self.library, &self.collector).with_force(force);
        if let Some(sleeper) = sleeper {
            batch = batch.with_sleeper(sleeper);
        }
        if !batch.is_due(now) {
            return BatchReport {
                ran: false,
                saved: 0,
            };
        }
        BatchReport {
            ran: true,
            saved: batch.run(now),
        }
    }

    pub fn stats(&self) -> Result<CorpusStats, ScoutError> {
        let papers = self.library.papers()?;
        let mut by_banking_domain: BTreeMap<String, usize> = BankingDomain::ALL
            .iter()
            .map(|d| (d.to_string(), 0))
            .collect();
        let mut by_ai_domain: BTreeMap<String, usize> =
            AiDomain::ALL.iter().map(|d| (d.to_string(), 0)).collect();
        let mut by_methodology: BTreeMap<String, usize> =
            Methodology::ALL.iter().map(|m| (m.to_string(), 0)).collect();
        for paper in &papers {
            *by_banking_domain
                .entry(paper.banking_domain.to_string())
                .or_default() += 1;
            *by_ai_domain.entry(paper.ai_domain.to_string()).or_default() += 1;
            *by_methodology
                .entry(paper.methodology.to_string())
                .or_default() += 1;
        }
        Ok(CorpusStats {
            total: papers.len(),
            favorites: papers.iter().filter(|p| p.is_favorite).count(),
            by_banking_domain,
            by_ai_domain,
            by_methodology,
        })
    }
}
