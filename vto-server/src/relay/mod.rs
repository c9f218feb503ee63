//! Webhook handler state machine.
//!
//! One [`Relay`] serves both execution strategies; what happens after a pair
//! is complete is delegated to the injected [`SynthesisExecutor`].

pub mod messages;

use std::sync::Arc;
use tracing::{debug, info, warn};
use vto_core::{AttachmentOutcome, InboundEvent, Notifier, SessionStore};

use crate::executor::SynthesisExecutor;

/// Text (and optional media link) sent back to the user
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reply {
    pub text: String,
    pub media_url: Option<String>,
}

impl Reply {
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            media_url: None,
        }
    }

    pub fn with_media(text: impl Into<String>, media_url: Option<String>) -> Self {
        Self {
            text: text.into(),
            media_url,
        }
    }
}

/// Send a reply, logging instead of failing when delivery does not work.
pub async fn deliver(notifier: &dyn Notifier, recipient: &str, reply: &Reply) {
    let result = match reply.media_url.as_deref() {
        Some(url) => notifier.notify_with_media(recipient, &reply.text, url).await,
        None => notifier.notify(recipient, &reply.text).await,
    };

    if let Err(e) = result {
        warn!(recipient = %recipient, error = %e, "Error sending reply");
    }
}

/// Inbound message handler
pub struct Relay {
    sessions: Arc<dyn SessionStore>,
    notifier: Arc<dyn Notifier>,
    executor: Arc<dyn SynthesisExecutor>,
}

impl Relay {
    pub fn new(
        sessions: Arc<dyn SessionStore>,
        notifier: Arc<dyn Notifier>,
        executor: Arc<dyn SynthesisExecutor>,
    ) -> Self {
        Self {
            sessions,
            notifier,
            executor,
        }
    }

    pub fn sessions(&self) -> &Arc<dyn SessionStore> {
        &self.sessions
    }

    pub fn executor(&self) -> &Arc<dyn SynthesisExecutor> {
        &self.executor
    }

    /// Advance the sender's session for one inbound message and send the reply.
    ///
    /// Returns the reply that was sent (or attempted).
    pub async fn handle(&self, event: &InboundEvent) -> Reply {
        let sender = event.sender.as_str();

        let reply = match event.attachment() {
            Some(url) => match self.sessions.record_attachment(sender, url).await {
                AttachmentOutcome::AwaitingGarment => {
                    info!(sender = %sender, "Person image received");
                    Reply::text(messages::GARMENT_PROMPT)
                }
                AttachmentOutcome::PairComplete(request) => {
                    info!(
                        sender = %sender,
                        mode = %self.executor.mode(),
                        "Garment image received, starting synthesis"
                    );
                    // The executor sends its own reply
                    return self
                        .executor
                        .execute(sender, request, self.notifier.as_ref())
                        .await;
                }
            },
            None => {
                self.sessions.get_or_create(sender).await;
                if event.is_start_command() {
                    Reply::text(messages::WELCOME)
                } else {
                    debug!(sender = %sender, "Text message without attachment");
                    Reply::text(messages::HELP)
                }
            }
        };

        deliver(self.notifier.as_ref(), sender, &reply).await;
        reply
    }
}
