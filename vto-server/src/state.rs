//! Application state.

use std::sync::Arc;
use std::time::Instant;
use vto_core::{Notifier, ResultStore, SessionStore, Synthesizer};

use crate::config::{Config, ExecutionMode};
use crate::executor::{
    InlineExecutor, JobQueue, JobWorker, QueueStats, QueueWorkers, QueuedExecutor,
    ResultPublisher, SynthesisExecutor,
};
use crate::relay::Relay;

/// Shared application state
pub struct AppState {
    /// Server configuration
    pub config: Arc<Config>,
    /// Webhook handler
    pub relay: Relay,
    /// Cached synthesis payloads served under `/results`
    pub results: Arc<ResultStore>,
    /// Queue counters (queued mode only)
    pub queue_stats: Option<Arc<QueueStats>>,
    /// Server start time
    pub start_time: Instant,
}

impl AppState {
    /// Wire the relay for the configured execution mode.
    ///
    /// In queued mode the worker pool is started here and returned so the
    /// caller can wait for it to drain on shutdown.
    pub fn new(
        config: Config,
        sessions: Arc<dyn SessionStore>,
        synthesizer: Arc<dyn Synthesizer>,
        notifier: Arc<dyn Notifier>,
    ) -> (Arc<Self>, Option<QueueWorkers>) {
        let results = Arc::new(ResultStore::new(config.results.clone()));
        let publisher = ResultPublisher::new(Arc::clone(&results), config.public_base_url.clone());

        let (executor, queue_stats, workers) = match config.mode {
            ExecutionMode::Inline => (
                Arc::new(InlineExecutor::new(synthesizer, publisher)) as Arc<dyn SynthesisExecutor>,
                None,
                None,
            ),
            ExecutionMode::Queued => {
                let worker = JobWorker {
                    synthesizer,
                    notifier: Arc::clone(&notifier),
                    publisher,
                };
                let (queue, workers) = JobQueue::start(&config.queue, worker);
                let stats = queue.stats();
                (
                    Arc::new(QueuedExecutor::new(queue)) as Arc<dyn SynthesisExecutor>,
                    Some(stats),
                    Some(workers),
                )
            }
        };

        let state = Arc::new(Self {
            config: Arc::new(config),
            relay: Relay::new(sessions, notifier, executor),
            results,
            queue_stats,
            start_time: Instant::now(),
        });

        (state, workers)
    }
}
