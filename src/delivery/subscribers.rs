//! Subscriber registry

use super::store::SubscriberStore;
use crate::telemetry::{self, GaugeMetric};
use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;
use tokio::sync::RwLock;

/// A delivery target and the message currently shown to it
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Subscriber {
    pub chat_id: i64,
    /// Message edited in place on refresh; `None` until one is sent
    pub message_id: Option<i32>,
}

/// Subscribed chats with their live message ids
///
/// Ids are persisted through the store on every add and remove. Message ids
/// live in memory only; after a restart every subscriber gets a fresh message.
#[derive(Clone)]
pub struct SubscriberRegistry {
    entries: Arc<RwLock<BTreeMap<i64, Option<i32>>>>,
    store: Arc<dyn SubscriberStore>,
}

impl SubscriberRegistry {
    /// Load persisted subscribers
    pub fn load(store: Arc<dyn SubscriberStore>) -> Self {
        let entries: BTreeMap<i64, Option<i32>> =
            store.load().into_iter().map(|id| (id, None)).collect();
        tracing::info!(subscribers = entries.len(), "Loaded subscribers");
        telemetry::set_gauge(GaugeMetric::Subscribers, entries.len() as f64);

        Self {
            entries: Arc::new(RwLock::new(entries)),
            store,
        }
    }

    /// Add a chat; returns false if it was already subscribed
    ///
    /// The chat is only added once the store accepted the new set.
    pub async fn subscribe(&self, chat_id: i64) -> anyhow::Result<bool> {
        let mut entries = self.entries.write().await;
        if entries.contains_key(&chat_id) {
            return Ok(false);
        }

        let mut ids: BTreeSet<i64> = entries.keys().copied().collect();
        ids.insert(chat_id);
        self.persist(ids).await?;

        entries.insert(chat_id, None);
        telemetry::set_gauge(GaugeMetric::Subscribers, entries.len() as f64);
        Ok(true)
    }

    /// Remove a chat; returns false if it was not subscribed
    pub async fn unsubscribe(&self, chat_id: i64) -> anyhow::Result<bool> {
        let mut entries = self.entries.write().await;
        if !entries.contains_key(&chat_id) {
            return Ok(false);
        }

        let ids: BTreeSet<i64> = entries.keys().copied().filter(|id| *id != chat_id).collect();
        self.persist(ids).await?;

        entries.remove(&chat_id);
        telemetry::set_gauge(GaugeMetric::Subscribers, entries.len() as f64);
        Ok(true)
    }

    /// Write the id set off the runtime threads
    ///
    /// Callers hold the write guard across this, so saves land in order.
    async fn persist(&self, ids: BTreeSet<i64>) -> anyhow::Result<()> {
        let store = Arc::clone(&self.store);
        tokio::task::spawn_blocking(move || store.save(&ids)).await?
    }

    /// Point-in-time copy for one delivery cycle
    pub async fn snapshot(&self) -> Vec<Subscriber> {
        self.entries
            .read()
            .await
            .iter()
            .map(|(&chat_id, &message_id)| Subscriber { chat_id, message_id })
            .collect()
    }

    pub async fn is_subscribed(&self, chat_id: i64) -> bool {
        self.entries.read().await.contains_key(&chat_id)
    }

    pub async fn message_id(&self, chat_id: i64) -> Option<i32> {
        self.entries.read().await.get(&chat_id).copied().flatten()
    }

    /// Record or clear the live message; ignored for chats no longer subscribed
    pub async fn set_message(&self, chat_id: i64, message_id: Option<i32>) {
        if let Some(slot) = self.entries.write().await.get_mut(&chat_id) {
            *slot = message_id;
        }
    }

    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.entries.read().await.is_empty()
    }
}
