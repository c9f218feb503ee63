//! Per-sender session tracking.
//!
//! A session walks through three implicit states:
//!
//! - `EMPTY`: nothing received yet
//! - `AWAITING_GARMENT`: the person image is held
//! - `PROCESSING`: both images received; the pair is handed to synthesis and
//!   the session is reset in the same step
//!
//! Stores are injected into the webhook handler as `Arc<dyn SessionStore>`.

mod store;

pub use store::InMemorySessionStore;

use async_trait::async_trait;
use std::time::Duration;

use crate::types::{Session, SynthesisRequest};

/// Result of feeding an attachment into a sender's session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AttachmentOutcome {
    /// The attachment became the person image; the garment is next.
    AwaitingGarment,
    /// The attachment completed the pair. The session has already been reset.
    PairComplete(SynthesisRequest),
}

/// Session store configuration
#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// Idle time after which a session is dropped (default: 30 minutes)
    pub ttl: Duration,
    /// Maximum number of tracked senders (default: 10000)
    pub max_entries: usize,
    /// How often the background pruner runs (default: 60 seconds)
    pub prune_interval: Duration,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            ttl: Duration::from_secs(30 * 60),
            max_entries: 10_000,
            prune_interval: Duration::from_secs(60),
        }
    }
}

/// Storage for per-sender sessions.
///
/// Implementations must make each call atomic with respect to other calls
/// for the same sender.
#[async_trait]
pub trait SessionStore: Send + Sync {
    /// Fetch the session for a sender, creating an empty one if needed.
    async fn get_or_create(&self, sender: &str) -> Session;

    /// Store the person image reference.
    async fn set_person(&self, sender: &str, image_ref: &str);

    /// Store the garment image reference.
    async fn set_garment(&self, sender: &str, image_ref: &str);

    /// Clear both image slots.
    async fn reset(&self, sender: &str);

    /// Apply one attachment to the sender's session as a single transition.
    ///
    /// The first attachment becomes the person image. The second becomes the
    /// garment image, and the completed pair is returned while the session is
    /// reset under the same lock.
    async fn record_attachment(&self, sender: &str, image_ref: &str) -> AttachmentOutcome;

    /// Look at a session without creating or touching it.
    async fn peek(&self, sender: &str) -> Option<Session>;

    /// Number of tracked senders.
    async fn len(&self) -> usize;

    async fn is_empty(&self) -> bool {
        self.len().await == 0
    }

    /// Drop sessions idle for longer than the configured TTL.
    async fn prune_expired(&self) -> usize;
}
