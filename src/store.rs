use std::collections::HashMap;
use std::fs;
use std::sync::{Arc, Mutex};

use camino::{Utf8Path, Utf8PathBuf};
use chrono::{DateTime, Utc};
use directories::BaseDirs;
use serde::Serialize;
use serde::de::DeserializeOwned;
use tempfile::Builder;
use tracing::debug;

use crate::config::Settings;
use crate::error::ScoutError;
use crate::paper::{Paper, UserProfile};

pub const PAPERS_KEY: &str = "papers";
pub const USER_KEY: &str = "user";
pub const SOURCES_KEY: &str = "sources";
pub const SETTINGS_KEY: &str = "settings";
pub const LAST_BATCH_KEY: &str = "last_batch";

pub trait KeyValueStore: Send + Sync {
    fn get(&self, key: &str) -> Result<Option<String>, ScoutError>;
    fn set(&self, key: &str, value: &str) -> Result<(), ScoutError>;
}

impl<T: KeyValueStore + ?Sized> KeyValueStore for &T {
    fn get(&self, key: &str) -> Result<Option<String>, ScoutError> {
        (**self).get(key)
    }

    fn set(&self, key: &str, value: &str) -> Result<(), ScoutError> {
        (**self).set(key, value)
    }
}

impl<T: KeyValueStore + ?Sized> KeyValueStore for Arc<T> {
    fn get(&self, key: &str) -> Result<Option<String>, ScoutError> {
        (**self).get(key)
    }

    fn set(&self, key: &str, value: &str) -> Result<(), ScoutError> {
        (**self).set(key, value)
    }
}

#[derive(Debug, Clone)]
pub struct FileStore {
    root: Utf8PathBuf,
}

impl FileStore {
    pub fn new() -> Result<Self, ScoutError> {
        let cwd = std::env::current_dir().map_err(|err| ScoutError::Store(err.to_string()))?;
        let project_root = Utf8PathBuf::from_path_buf(cwd.join(".paperscout"))
            .map_err(|_| ScoutError::Store("invalid project path".to_string()))?;
        if project_root.as_std_path().exists() {
            return Ok(Self::new_with_root(project_root));
        }

        let data_root = BaseDirs::new()
            .and_then(|dirs| {
                Utf8PathBuf::from_path_buf(dirs.data_local_dir().join("paperscout")).ok()
            })
            .ok_or_else(|| ScoutError::Store("unable to resolve data directory".to_string()))?;
        Ok(Self::new_with_root(data_root))
    }

    pub fn new_with_root(root: Utf8PathBuf) -> Self {
        Self { root }
    }

    pub fn root(&self) -> &Utf8Path {
        &self.root
    }

    pub fn key_path(&self, key: &str) -> Utf8PathBuf {
        self.root.join(format!("{key}.json"))
    }
}

impl KeyValueStore for FileStore {
    fn get(&self, key: &str) -> Result<Option<String>, ScoutError> {
        let path = self.key_path(key);
        if !path.as_std_path().exists() {
            return Ok(None);
        }
        fs::read_to_string(path.as_std_path())
            .map(Some)
            .map_err(|err| ScoutError::Store(format!("read {path}: {err}")))
    }

    fn set(&self, key: &str, value: &str) -> Result<(), ScoutError> {
        fs::create_dir_all(self.root.as_std_path())
            .map_err(|err| ScoutError::Store(err.to_string()))?;
        let path = self.key_path(key);
        let mut temp = Builder::new()
            .prefix("paperscout-")
            .suffix(".tmp")
            .tempfile_in(self.root.as_std_path())
            .map_err(|err| ScoutError::Store(err.to_string()))?;
        std::io::Write::write_all(&mut temp, value.as_bytes())
            .map_err(|err| ScoutError::Store(err.to_string()))?;
        temp.persist(path.as_std_path())
            .map_err(|err| ScoutError::Store(err.to_string()))?;
        debug!(key, bytes = value.len(), "store write");
        Ok(())
    }
}

#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: Mutex<HashMap<String, String>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> Result<Option<String>, ScoutError> {
        let entries = self
            .entries
            .lock()
            .map_err(|_| ScoutError::Store("memory store poisoned".to_string()))?;
        Ok(entries.get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<(), ScoutError> {
        let mut entries = self
            .entries
            .lock()
            .map_err(|_| ScoutError::Store("memory store poisoned".to_string()))?;
        entries.insert(key.to_string(), value.to_string());
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SaveOutcome {
    Saved,
    Duplicate,
}

pub struct Library<S: KeyValueStore> {
    store: S,
}

impl<S: KeyValueStore> Library<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    fn read<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>, ScoutError> {
        let Some(content) = self.store.get(key)? else {
            return Ok(None);
        };
        if content.trim().is_empty() {
            return Ok(None);
        }
        serde_json::from_str(&content)
            .map(Some)
            .map_err(|err| ScoutError::ConfigParse {
                key: key.to_string(),
                message: err.to_string(),
            })
    }

    fn write<T: Serialize + ?Sized>(&self, key: &str, value: &T) -> Result<(), ScoutError> {
        let content =
            serde_json::to_string(value).map_err(|err| ScoutError::Store(err.to_string()))?;
        self.store.set(key, &content)
    }

    pub fn papers(&self) -> Result<Vec<Paper>, ScoutError> {
        Ok(self.read(PAPERS_KEY)?.unwrap_or_default())
    }

    /// Rejects a paper whose title matches a stored one case-insensitively
    /// or whose non-empty URL is identical to a stored URL.
    pub fn save_paper(&self, paper: &Paper) -> Result<SaveOutcome, ScoutError> {
        let mut papers = self.papers()?;
        let title_key = paper.title_key();
        let url = paper.url.trim();
        let duplicate = papers.iter().any(|existing| {
            existing.title_key() == title_key || (!url.is_empty() && existing.url.trim() == url)
        });
        if duplicate {
            debug!(title = %paper.title, "duplicate paper skipped");
            return Ok(SaveOutcome::Duplicate);
        }
        papers.push(paper.clone());
        self.write(PAPERS_KEY, &papers)?;
        Ok(SaveOutcome::Saved)
    }

    pub fn toggle_favorite(&self, id: &str) -> Result<Paper, ScoutError> {
        self.update_paper(id, |paper| paper.is_favorite = !paper.is_favorite)
    }

    pub fn add_tag(&self, id: &str, tag: &str) -> Result<Paper, ScoutError> {
        let tag = tag.trim().to_string();
        self.update_paper(id, |paper| {
            if !tag.is_empty() && !paper.has_tag(&tag) {
                paper.tags.push(tag.clone());
            }
        })
    }

    fn update_paper<F>(&self, id: &str, mutate: F) -> Result<Paper, ScoutError>
    where
        F: FnOnce(&mut Paper),
    {
        let mut papers = self.papers()?;
        let paper = papers
            .iter_mut()
            .find(|paper| paper.id == id)
            .ok_or_else(|| ScoutError::PaperNotFound(id.to_string()))?;
        mutate(paper);
        let updated = paper.clone();
        self.write(PAPERS_KEY, &papers)?;
        Ok(updated)
    }

    pub fn user(&self) -> Result<UserProfile, ScoutError> {
        Ok(self.read(USER_KEY)?.unwrap_or_default())
    }

    pub fn set_user(&self, user: &UserProfile) -> Result<(), ScoutError> {
        self.write(USER_KEY, user)
    }

    pub fn sources(&self) -> Result<Option<Vec<String>>, ScoutError> {
        self.read(SOURCES_KEY)
    }

    pub fn set_sources(&self, sources: &[String]) -> Result<(), ScoutError> {
        self.write(SOURCES_KEY, sources)
    }

    pub fn settings(&self) -> Result<Settings, ScoutError> {
        match self.store.get(SETTINGS_KEY)? {
            Some(content) if !content.trim().is_empty() => Settings::from_json(&content),
            _ => Ok(Settings::default()),
        }
    }

    pub fn set_settings(&self, settings: &Settings) -> Result<(), ScoutError> {
        self.write(SETTINGS_KEY, settings)
    }

    pub fn last_batch(&self) -> Result<Option<DateTime<Utc>>, ScoutError> {
        self.read(LAST_BATCH_KEY)
    }

    pub fn set_last_batch(&self, at: DateTime<Utc>) -> Result<(), ScoutError> {
        self.write(LAST_BATCH_KEY, &at)
    }
}
