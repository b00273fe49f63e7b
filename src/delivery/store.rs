//! Persisted subscriber list

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

/// Keyed store for subscriber ids
pub trait SubscriberStore: Send + Sync {
    /// Stored ids; a missing or unreadable store is an empty set
    fn load(&self) -> BTreeSet<i64>;
    /// Replace the stored set
    fn save(&self, ids: &BTreeSet<i64>) -> anyhow::Result<()>;
}

/// JSON array of chat ids in a single file, rewritten on every change
#[derive(Debug, Clone)]
pub struct JsonFileStore {
    path: PathBuf,
}

impl JsonFileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl SubscriberStore for JsonFileStore {
    fn load(&self) -> BTreeSet<i64> {
        let content = match std::fs::read_to_string(&self.path) {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return BTreeSet::new(),
            Err(e) => {
                tracing::warn!(path = %self.path.display(), error = %e, "Subscriber file unreadable, starting empty");
                return BTreeSet::new();
            }
        };

        match serde_json::from_str::<Vec<i64>>(&content) {
            Ok(ids) => ids.into_iter().collect(),
            Err(e) => {
                tracing::warn!(path = %self.path.display(), error = %e, "Subscriber file corrupt, starting empty");
                BTreeSet::new()
            }
        }
    }

    fn save(&self, ids: &BTreeSet<i64>) -> anyhow::Result<()> {
        let ids: Vec<i64> = ids.iter().copied().collect();
        let json = serde_json::to_string_pretty(&ids)?;

        // Atomic replace
        let tmp = self.path.with_extension("json.tmp");
        std::fs::write(&tmp, json)?;
        std::fs::rename(&tmp, &self.path)?;
        Ok(())
    }
}
