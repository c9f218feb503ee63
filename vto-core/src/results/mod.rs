//! Short-lived cache of synthesis payloads.
//!
//! The messaging provider fetches media by URL, so a finished try-on image is
//! parked here and served by the relay until it expires.

use bytes::Bytes;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use tokio::sync::RwLock;
use tokio::time::{Duration, Instant};
use tracing::debug;
use uuid::Uuid;

use crate::types::SynthesisOutput;

/// Result cache configuration
#[derive(Debug, Clone)]
pub struct ResultConfig {
    /// How long a result stays downloadable (default: 1 hour)
    pub ttl: Duration,
    /// Maximum cached results (default: 100)
    pub max_entries: usize,
}

impl Default for ResultConfig {
    fn default() -> Self {
        Self {
            ttl: Duration::from_secs(3600),
            max_entries: 100,
        }
    }
}

/// A cached synthesis payload
#[derive(Debug, Clone)]
pub struct StoredResult {
    pub id: String,
    pub bytes: Bytes,
    pub content_type: Option<String>,
    pub stored_at: DateTime<Utc>,
}

struct Slot {
    result: StoredResult,
    inserted: Instant,
}

/// Bounded, time-evicted result cache
pub struct ResultStore {
    slots: RwLock<HashMap<String, Slot>>,
    config: ResultConfig,
}

impl Default for ResultStore {
    fn default() -> Self {
        Self::new(ResultConfig::default())
    }
}

impl ResultStore {
    pub fn new(config: ResultConfig) -> Self {
        Self {
            slots: RwLock::new(HashMap::new()),
            config,
        }
    }

    /// Cache a payload and return its id.
    pub async fn put(&self, output: SynthesisOutput) -> String {
        let id = Uuid::new_v4().simple().to_string();
        let now = Instant::now();
        let ttl = self.config.ttl;

        let mut slots = self.slots.write().await;
        slots.retain(|_, slot| now.duration_since(slot.inserted) <= ttl);

        while slots.len() >= self.config.max_entries.max(1) {
            let oldest = slots
                .iter()
                .min_by_key(|(_, slot)| slot.inserted)
                .map(|(id, _)| id.clone());
            match oldest {
                Some(oldest) => {
                    slots.remove(&oldest);
                    debug!(result_id = %oldest, "Evicted oldest cached result");
                }
                None => break,
            }
        }

        slots.insert(
            id.clone(),
            Slot {
                result: StoredResult {
                    id: id.clone(),
                    bytes: output.bytes,
                    content_type: output.content_type,
                    stored_at: Utc::now(),
                },
                inserted: now,
            },
        );

        id
    }

    /// Fetch a live result.
    pub async fn get(&self, id: &str) -> Option<StoredResult> {
        let slots = self.slots.read().await;
        slots
            .get(id)
            .filter(|slot| slot.inserted.elapsed() <= self.config.ttl)
            .map(|slot| slot.result.clone())
    }

    pub async fn len(&self) -> usize {
        self.slots.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }

    /// Drop expired results.
    pub async fn prune_expired(&self) -> usize {
        let mut slots = self.slots.write().await;
        let before = slots.len();
        let ttl = self.config.ttl;
        slots.retain(|_, slot| slot.inserted.elapsed() <= ttl);
        before - slots.len()
    }
}
