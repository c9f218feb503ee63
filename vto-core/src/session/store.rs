//! In-memory session store with idle expiry and a size bound.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use tokio::task::JoinHandle;
use tokio::time::{interval, Duration, Instant};
use tracing::{debug, info};

use super::{AttachmentOutcome, SessionConfig, SessionStore};
use crate::types::{Session, SynthesisRequest};

struct Entry {
    session: Session,
    touched_at: Instant,
}

/// Session store backed by a `RwLock<HashMap>`.
///
/// Every mutation takes the write lock for its whole read-modify-write, so
/// two messages from the same sender can never interleave inside a
/// transition.
pub struct InMemorySessionStore {
    entries: RwLock<HashMap<String, Entry>>,
    config: SessionConfig,
}

impl Default for InMemorySessionStore {
    fn default() -> Self {
        Self::new(SessionConfig::default())
    }
}

impl InMemorySessionStore {
    pub fn new(config: SessionConfig) -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
            config,
        }
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    fn is_expired(&self, entry: &Entry, now: Instant) -> bool {
        now.duration_since(entry.touched_at) > self.config.ttl
    }

    /// Find or create the live entry for a sender and mark it touched.
    fn entry_mut<'a>(
        &self,
        entries: &'a mut HashMap<String, Entry>,
        sender: &str,
        now: Instant,
    ) -> &'a mut Entry {
        let expired = entries
            .get(sender)
            .is_some_and(|entry| self.is_expired(entry, now));
        if expired {
            entries.remove(sender);
            debug!(sender = %sender, "Session expired, starting fresh");
        }

        if !entries.contains_key(sender) && entries.len() >= self.config.max_entries.max(1) {
            self.make_room(entries, now);
        }

        let entry = entries.entry(sender.to_string()).or_insert_with(|| Entry {
            session: Session::default(),
            touched_at: now,
        });
        entry.touched_at = now;
        entry
    }

    /// Drop expired entries; if the map is still full, drop the least
    /// recently touched one.
    fn make_room(&self, entries: &mut HashMap<String, Entry>, now: Instant) {
        let ttl = self.config.ttl;
        entries.retain(|_, entry| now.duration_since(entry.touched_at) <= ttl);

        if entries.len() < self.config.max_entries.max(1) {
            return;
        }

        let oldest = entries
            .iter()
            .min_by_key(|(_, entry)| entry.touched_at)
            .map(|(sender, _)| sender.clone());

        if let Some(sender) = oldest {
            entries.remove(&sender);
            debug!(sender = %sender, "Evicted least recently used session");
        }
    }

    /// Start the periodic expiry sweep.
    pub fn spawn_pruner(self: Arc<Self>) -> JoinHandle<()> {
        let period = self.config.prune_interval.max(Duration::from_millis(10));

        tokio::spawn(async move {
            let mut ticker = interval(period);
            // First tick completes immediately
            ticker.tick().await;

            loop {
                ticker.tick().await;
                let removed = self.prune_expired().await;
                if removed > 0 {
                    info!(removed = removed, "Pruned expired sessions");
                }
            }
        })
    }
}

#[async_trait]
impl SessionStore for InMemorySessionStore {
    async fn get_or_create(&self, sender: &str) -> Session {
        let mut entries = self.entries.write().await;
        self.entry_mut(&mut entries, sender, Instant::now())
            .session
            .clone()
    }

    async fn set_person(&self, sender: &str, image_ref: &str) {
        let mut entries = self.entries.write().await;
        let entry = self.entry_mut(&mut entries, sender, Instant::now());
        entry.session.person_image_ref = Some(image_ref.to_string());
    }

    async fn set_garment(&self, sender: &str, image_ref: &str) {
        let mut entries = self.entries.write().await;
        let entry = self.entry_mut(&mut entries, sender, Instant::now());
        entry.session.garment_image_ref = Some(image_ref.to_string());
    }

    async fn reset(&self, sender: &str) {
        let mut entries = self.entries.write().await;
        if let Some(entry) = entries.get_mut(sender) {
            entry.session.clear();
            entry.touched_at = Instant::now();
        }
    }

    async fn record_attachment(&self, sender: &str, image_ref: &str) -> AttachmentOutcome {
        let mut entries = self.entries.write().await;
        let entry = self.entry_mut(&mut entries, sender, Instant::now());

        match entry.session.person_image_ref.take() {
            None => {
                entry.session.person_image_ref = Some(image_ref.to_string());
                entry.session.garment_image_ref = None;
                AttachmentOutcome::AwaitingGarment
            }
            Some(person) => {
                entry.session.clear();
                AttachmentOutcome::PairComplete(SynthesisRequest::new(person, image_ref))
            }
        }
    }

    async fn peek(&self, sender: &str) -> Option<Session> {
        let entries = self.entries.read().await;
        let now = Instant::now();
        entries
            .get(sender)
            .filter(|entry| !self.is_expired(entry, now))
            .map(|entry| entry.session.clone())
    }

    async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    async fn prune_expired(&self) -> usize {
        let mut entries = self.entries.write().await;
        let before = entries.len();
        let now = Instant::now();
        let ttl = self.config.ttl;
        entries.retain(|_, entry| now.duration_since(entry.touched_at) <= ttl);
        before - entries.len()
    }
}
