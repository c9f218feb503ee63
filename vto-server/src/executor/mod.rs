//! Synthesis execution strategies.
//!
//! - [`InlineExecutor`]: awaits the synthesis call inside the webhook request
//! - [`QueuedExecutor`]: pushes a job onto the named [`JobQueue`] and
//!   acknowledges right away; a worker reports the outcome to the user later

pub mod queue;

pub use queue::{JobQueue, JobWorker, QueueSnapshot, QueueStats, QueueWorkers};

use async_trait::async_trait;
use std::sync::Arc;
use tracing::{error, info, warn};
use vto_core::{Notifier, ResultStore, SynthesisOutput, SynthesisRequest, Synthesizer};

use crate::config::ExecutionMode;
use crate::relay::{self, messages, Reply};

/// What happens to a completed image pair
#[async_trait]
pub trait SynthesisExecutor: Send + Sync {
    fn mode(&self) -> ExecutionMode;

    /// Run or schedule synthesis for `recipient`, send the immediate reply
    /// through `notifier` and return it.
    async fn execute(
        &self,
        recipient: &str,
        request: SynthesisRequest,
        notifier: &dyn Notifier,
    ) -> Reply;
}

/// Parks successful payloads in the result cache and builds their public link.
#[derive(Clone)]
pub struct ResultPublisher {
    results: Arc<ResultStore>,
    public_base_url: Option<String>,
}

impl ResultPublisher {
    pub fn new(results: Arc<ResultStore>, public_base_url: Option<String>) -> Self {
        Self {
            results,
            public_base_url,
        }
    }

    /// Cache the payload and return its URL. Without a public base URL the
    /// provider could never fetch it, so nothing is cached.
    pub async fn publish(&self, output: SynthesisOutput) -> Option<String> {
        let base = self.public_base_url.as_deref()?;
        let id = self.results.put(output).await;
        Some(format!("{}/results/{}", base, id))
    }
}

/// Turn a synthesis outcome into the user-facing reply.
pub async fn completion_reply(
    outcome: vto_core::Result<SynthesisOutput>,
    publisher: &ResultPublisher,
) -> Reply {
    match outcome {
        Ok(output) if !output.is_empty() => {
            let media_url = publisher.publish(output).await;
            Reply::with_media(messages::SUCCESS, media_url)
        }
        Ok(_) => {
            warn!("Synthesis returned an empty result");
            Reply::text(messages::ERROR)
        }
        Err(e) => {
            error!(error = %e, "Error in virtual try-on processing");
            Reply::text(messages::ERROR)
        }
    }
}

/// Calls the synthesis service inside the request
pub struct InlineExecutor {
    synthesizer: Arc<dyn Synthesizer>,
    publisher: ResultPublisher,
}

impl InlineExecutor {
    pub fn new(synthesizer: Arc<dyn Synthesizer>, publisher: ResultPublisher) -> Self {
        Self {
            synthesizer,
            publisher,
        }
    }
}

#[async_trait]
impl SynthesisExecutor for InlineExecutor {
    fn mode(&self) -> ExecutionMode {
        ExecutionMode::Inline
    }

    async fn execute(
        &self,
        recipient: &str,
        request: SynthesisRequest,
        notifier: &dyn Notifier,
    ) -> Reply {
        let outcome = self.synthesizer.synthesize(&request).await;
        if outcome.is_ok() {
            info!(recipient = %recipient, "Synthesis finished");
        }
        let reply = completion_reply(outcome, &self.publisher).await;
        relay::deliver(notifier, recipient, &reply).await;
        reply
    }
}

/// Hands the call to the background queue
pub struct QueuedExecutor {
    queue: JobQueue,
}

impl QueuedExecutor {
    pub fn new(queue: JobQueue) -> Self {
        Self { queue }
    }
}

#[async_trait]
impl SynthesisExecutor for QueuedExecutor {
    fn mode(&self) -> ExecutionMode {
        ExecutionMode::Queued
    }

    async fn execute(
        &self,
        recipient: &str,
        request: SynthesisRequest,
        notifier: &dyn Notifier,
    ) -> Reply {
        let slot = match self.queue.reserve() {
            Ok(slot) => slot,
            Err(e) => {
                error!(recipient = %recipient, error = %e, "Could not queue synthesis job");
                let reply = Reply::text(messages::ERROR);
                relay::deliver(notifier, recipient, &reply).await;
                return reply;
            }
        };

        // Acknowledge before any worker can see the job
        let reply = Reply::text(messages::PROCESSING);
        relay::deliver(notifier, recipient, &reply).await;

        let job_id = slot.fill(recipient, request);
        info!(
            recipient = %recipient,
            job_id = %job_id,
            queue = %self.queue.name(),
            "Synthesis job queued"
        );
        reply
    }
}
