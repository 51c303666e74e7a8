use std::time::Duration;

use chrono::{DateTime, Months, TimeDelta, Utc};
use rand::Rng;
use rand::seq::SliceRandom;
use tracing::{error, info, warn};

use crate::domain::BankingDomain;
use crate::llm::LlmClient;
use crate::pipeline::Collector;
use crate::retry::{Sleeper, ThreadSleeper};
use crate::store::{KeyValueStore, Library, SaveOutcome};

#[derive(Debug, Clone, Copy)]
pub struct BatchConfig {
    pub interval: TimeDelta,
    pub startup_delay: Duration,
}

impl Default for BatchConfig {
    fn default() -> Self {
        Self {
            interval: TimeDelta::hours(24),
            startup_delay: Duration::from_secs(20),
        }
    }
}

pub fn batch_query(category: BankingDomain) -> String {
    format!("Latest research papers on {category} in banking AI")
}

static THREAD_SLEEPER: ThreadSleeper = ThreadSleeper;

pub struct DailyBatch<'a, S: KeyValueStore, C: LlmClient> {
    library: &'a Library<S>,
    collector: &'a Collector<C>,
    sleeper: &'a dyn Sleeper,
    config: BatchConfig,
    force: bool,
}

impl<'a, S: KeyValueStore, C: LlmClient> DailyBatch<'a, S, C> {
    pub fn new(library: &'a Library<S>, collector: &'a Collector<C>) -> Self {
        Self {
            library,
            collector,
            sleeper: &THREAD_SLEEPER,
            config: BatchConfig::default(),
            force: false,
        }
    }

    pub fn with_sleeper(mut self, sleeper: &'a dyn Sleeper) -> Self {
        self.sleeper = sleeper;
        self
    }

    pub fn with_config(mut self, config: BatchConfig) -> Self {
        self.config = config;
        self
    }

    // Forced runs skip the 24h gate but still commit their timestamp.
    pub fn with_force(mut self, force: bool) -> Self {
        self.force = force;
        self
    }

    pub fn is_due(&self, now: DateTime<Utc>) -> bool {
        if self.force {
            return true;
        }
        match self.library.last_batch() {
            Ok(Some(last)) => now - last >= self.config.interval,
            Ok(None) => true,
            Err(err) => {
                warn!(error = %err, "unreadable batch timestamp, treating batch as due");
                true
            }
        }
    }

    pub fn run(&self, now: DateTime<Utc>) -> usize {
        self.run_with_rng(now, &mut rand::thread_rng())
    }

    pub fn run_with_rng<R: Rng + ?Sized>(
        &self,
        now: DateTime<Utc>,
        rng: &mut R,
    ) -> usize {
        let last = match self.library.last_batch() {
            Ok(last) => last,
            Err(err) => {
                warn!(error = %err, "unreadable batch timestamp, running anyway");
                None
            }
        };
        if let Some(last) = last.filter(|_| !self.force) {
            if now - last < self.config.interval {
                info!(%last, "daily batch not due yet");
                return 0;
            }
        }

        self.sleeper.sleep(self.config.startup_delay);

        let after = last
            .map(|last| last.date_naive())
            .or_else(|| now.date_naive().checked_sub_months(Months::new(1)));

        let mut saved = 0usize;
        if let Some(&category) = BankingDomain::ALL.choose(rng) {
            let query = batch_query(category);
            info!(%category, "daily batch collecting");
            match self.collector.collect_papers(&query, &[], after) {
                Ok(papers) => {
                    for paper in &papers {
                        match self.library.save_paper(paper) {
                            Ok(SaveOutcome::Saved) => saved += 1,
                            Ok(SaveOutcome::Duplicate) => {}
                            Err(err) => warn!(error = %err, "daily batch could not save paper"),
                        }
                    }
                }
                Err(err) if err.is_quota() => {
                    warn!(error = %err, "daily batch stopped on provider quota");
                }
                Err(err) => {
                    error!(error = %err, %category, "daily batch collection failed");
                }
            }
        }

        if let Err(err) = self.library.set_last_batch(now) {
            error!(error = %err, "daily batch could not record its timestamp");
        }
        info!(saved, "daily batch finished");
        saved
    }
}
