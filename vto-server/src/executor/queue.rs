//! Named in-process job queue for synthesis calls.
//!
//! A bounded mpsc channel feeds a fixed pool of worker tasks. Submitting never
//! waits: a full queue is reported back to the caller. Each worker runs the
//! synthesis call and then tells the user how it went.

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::sync::{mpsc, Mutex};
use tokio::task::JoinHandle;
use tracing::{debug, error, info};
use uuid::Uuid;
use vto_core::{Error, Notifier, SynthesisRequest, Synthesizer};

use super::{completion_reply, ResultPublisher};
use crate::config::QueueConfig;
use crate::relay;

/// A queued synthesis call
#[derive(Debug, Clone)]
pub struct SynthesisJob {
    pub id: Uuid,
    pub recipient: String,
    pub request: SynthesisRequest,
    pub enqueued_at: DateTime<Utc>,
}

/// Live queue counters
#[derive(Debug, Default)]
pub struct QueueStats {
    name: String,
    pending: AtomicUsize,
    completed: AtomicUsize,
    failed: AtomicUsize,
}

/// Point-in-time copy of [`QueueStats`] for health output
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct QueueSnapshot {
    pub name: String,
    pub pending: usize,
    pub completed: usize,
    pub failed: usize,
}

impl QueueStats {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    pub fn snapshot(&self) -> QueueSnapshot {
        QueueSnapshot {
            name: self.name.clone(),
            pending: self.pending.load(Ordering::SeqCst),
            completed: self.completed.load(Ordering::SeqCst),
            failed: self.failed.load(Ordering::SeqCst),
        }
    }
}

/// Producer handle for the queue
#[derive(Clone)]
pub struct JobQueue {
    tx: mpsc::Sender<SynthesisJob>,
    stats: Arc<QueueStats>,
}

/// Everything a worker needs to finish a job
#[derive(Clone)]
pub struct JobWorker {
    pub synthesizer: Arc<dyn Synthesizer>,
    pub notifier: Arc<dyn Notifier>,
    pub publisher: ResultPublisher,
}

impl JobWorker {
    /// Run one job to completion and notify the recipient. Returns whether
    /// synthesis produced a usable result.
    pub async fn run(&self, job: SynthesisJob) -> bool {
        let waited = Utc::now().signed_duration_since(job.enqueued_at);
        info!(
            job_id = %job.id,
            recipient = %job.recipient,
            waited_ms = waited.num_milliseconds(),
            "Processing synthesis job"
        );

        let outcome = self.synthesizer.synthesize(&job.request).await;
        let succeeded = matches!(&outcome, Ok(output) if !output.is_empty());

        let reply = completion_reply(outcome, &self.publisher).await;
        relay::deliver(self.notifier.as_ref(), &job.recipient, &reply).await;

        succeeded
    }
}

/// Running worker tasks
pub struct QueueWorkers {
    handles: Vec<JoinHandle<()>>,
    // Keeps the channel open even when no worker holds the receiver
    _receiver: Arc<Mutex<mpsc::Receiver<SynthesisJob>>>,
}

impl QueueWorkers {
    pub fn len(&self) -> usize {
        self.handles.len()
    }

    /// Wait until every worker has drained the queue and exited.
    ///
    /// Workers exit once all [`JobQueue`] handles are dropped.
    pub async fn join(self) {
        for handle in self.handles {
            if let Err(e) = handle.await {
                error!(error = %e, "Queue worker panicked");
            }
        }
    }
}

impl JobQueue {
    /// Create the queue and spawn its workers.
    pub fn start(config: &QueueConfig, worker: JobWorker) -> (Self, QueueWorkers) {
        let (tx, rx) = mpsc::channel(config.capacity.max(1));
        let rx = Arc::new(Mutex::new(rx));
        let stats = Arc::new(QueueStats::new(config.name.clone()));

        let handles = (0..config.workers)
            .map(|index| {
                let rx = Arc::clone(&rx);
                let stats = Arc::clone(&stats);
                let worker = worker.clone();
                tokio::spawn(worker_loop(index, rx, stats, worker))
            })
            .collect();

        info!(
            queue = %config.name,
            capacity = config.capacity,
            workers = config.workers,
            "Job queue started"
        );

        (
            Self { tx, stats },
            QueueWorkers {
                handles,
                _receiver: rx,
            },
        )
    }

    pub fn name(&self) -> &str {
        &self.stats.name
    }

    pub fn stats(&self) -> Arc<QueueStats> {
        Arc::clone(&self.stats)
    }

    /// Claim room for one job without waiting.
    ///
    /// Nothing reaches a worker until the returned slot is filled, so the
    /// caller can notify the user first.
    pub fn reserve(&self) -> vto_core::Result<JobSlot<'_>> {
        match self.tx.try_reserve() {
            Ok(permit) => Ok(JobSlot {
                permit,
                stats: &self.stats,
            }),
            Err(mpsc::error::TrySendError::Full(())) => {
                Err(Error::QueueFull(self.name().to_string()))
            }
            Err(mpsc::error::TrySendError::Closed(())) => {
                Err(Error::QueueClosed(self.name().to_string()))
            }
        }
    }
}

/// Reserved capacity for exactly one job
pub struct JobSlot<'a> {
    permit: mpsc::Permit<'a, SynthesisJob>,
    stats: &'a QueueStats,
}

impl JobSlot<'_> {
    /// Hand the job to the workers.
    pub fn fill(self, recipient: &str, request: SynthesisRequest) -> Uuid {
        let job = SynthesisJob {
            id: Uuid::new_v4(),
            recipient: recipient.to_string(),
            request,
            enqueued_at: Utc::now(),
        };
        let id = job.id;

        // Count before sending so a fast worker never decrements below zero
        self.stats.pending.fetch_add(1, Ordering::SeqCst);
        self.permit.send(job);
        id
    }
}

async fn worker_loop(
    index: usize,
    rx: Arc<Mutex<mpsc::Receiver<SynthesisJob>>>,
    stats: Arc<QueueStats>,
    worker: JobWorker,
) {
    debug!(queue = %stats.name, worker = index, "Queue worker started");

    loop {
        // Hold the lock only while waiting for the next job
        let job = { rx.lock().await.recv().await };
        let Some(job) = job else {
            break;
        };

        stats.pending.fetch_sub(1, Ordering::SeqCst);
        let job_id = job.id;

        if worker.run(job).await {
            stats.completed.fetch_add(1, Ordering::SeqCst);
            info!(queue = %stats.name, job_id = %job_id, "Synthesis job completed");
        } else {
            stats.failed.fetch_add(1, Ordering::SeqCst);
            error!(queue = %stats.name, job_id = %job_id, "Synthesis job failed");
        }
    }

    debug!(queue = %stats.name, worker = index, "Queue worker stopped");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::executor::{QueuedExecutor, SynthesisExecutor};
    use crate::relay::messages;
    use crate::testing::{FakeSynthesizer, RecordingNotifier};
    use std::time::Duration;
    use vto_core::ResultStore;

    fn worker(synthesizer: Arc<FakeSynthesizer>, notifier: Arc<RecordingNotifier>) -> JobWorker {
        JobWorker {
            synthesizer,
            notifier,
            publisher: ResultPublisher::new(Arc::new(ResultStore::default()), None),
        }
    }

    fn queue_config(capacity: usize, workers: usize) -> QueueConfig {
        QueueConfig {
            name: "test".to_string(),
            capacity,
            workers,
        }
    }

    async fn wait_for_messages(notifier: &RecordingNotifier, count: usize) {
        for _ in 0..200 {
            if notifier.sent().len() >= count {
                return;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        panic!("expected {} messages, got {:?}", count, notifier.sent());
    }

    #[tokio::test]
    async fn test_queued_job_acknowledges_then_notifies_result() {
        let synthesizer = Arc::new(FakeSynthesizer::succeeding(b"img"));
        let notifier = Arc::new(RecordingNotifier::default());
        let (queue, workers) =
            JobQueue::start(&queue_config(8, 1), worker(synthesizer.clone(), notifier.clone()));
        let stats = queue.stats();

        let executor = QueuedExecutor::new(queue);
        let reply = executor
            .execute("A", SynthesisRequest::new("X", "Y"), notifier.as_ref())
            .await;
        assert_eq!(reply.text, messages::PROCESSING);

        wait_for_messages(&notifier, 2).await;
        assert_eq!(
            notifier.texts_for("A"),
            vec![messages::PROCESSING, messages::SUCCESS]
        );
        assert_eq!(synthesizer.requests(), vec![SynthesisRequest::new("X", "Y")]);

        drop(executor);
        workers.join().await;

        let snapshot = stats.snapshot();
        assert_eq!(snapshot.name, "test");
        assert_eq!(snapshot.pending, 0);
        assert_eq!(snapshot.completed, 1);
        assert_eq!(snapshot.failed, 0);
    }

    #[tokio::test]
    async fn test_failed_job_notifies_error() {
        let notifier = Arc::new(RecordingNotifier::default());
        let (queue, workers) = JobQueue::start(
            &queue_config(8, 2),
            worker(Arc::new(FakeSynthesizer::failing()), notifier.clone()),
        );
        let stats = queue.stats();

        queue.reserve().unwrap().fill("A", SynthesisRequest::new("X", "Y"));
        drop(queue);
        workers.join().await;

        assert_eq!(notifier.texts_for("A"), vec![messages::ERROR]);
        assert_eq!(stats.snapshot().failed, 1);
    }

    #[tokio::test]
    async fn test_full_queue_rejects_submission() {
        let notifier = Arc::new(RecordingNotifier::default());
        // No workers: nothing drains the channel
        let (queue, _workers) = JobQueue::start(
            &queue_config(1, 0),
            worker(Arc::new(FakeSynthesizer::succeeding(b"img")), notifier),
        );

        queue.reserve().unwrap().fill("A", SynthesisRequest::new("X", "Y"));

        assert!(matches!(queue.reserve(), Err(Error::QueueFull(ref name)) if name == "test"));
        assert_eq!(queue.stats().snapshot().pending, 1);
    }

    #[tokio::test]
    async fn test_full_queue_replies_error() {
        let notifier = Arc::new(RecordingNotifier::default());
        let (queue, _workers) = JobQueue::start(
            &queue_config(1, 0),
            worker(Arc::new(FakeSynthesizer::succeeding(b"img")), notifier.clone()),
        );
        let executor = QueuedExecutor::new(queue);

        executor
            .execute("A", SynthesisRequest::new("X", "Y"), notifier.as_ref())
            .await;
        let reply = executor
            .execute("B", SynthesisRequest::new("X", "Y"), notifier.as_ref())
            .await;

        assert_eq!(reply.text, messages::ERROR);
        assert_eq!(notifier.texts_for("A"), vec![messages::PROCESSING]);
        assert_eq!(notifier.texts_for("B"), vec![messages::ERROR]);
    }

    #[tokio::test]
    async fn test_reserved_slot_holds_capacity_until_dropped() {
        let notifier = Arc::new(RecordingNotifier::default());
        let (queue, _workers) = JobQueue::start(
            &queue_config(1, 0),
            worker(Arc::new(FakeSynthesizer::succeeding(b"img")), notifier),
        );

        let slot = queue.reserve().unwrap();
        assert!(matches!(queue.reserve(), Err(Error::QueueFull(_))));
        assert_eq!(queue.stats().snapshot().pending, 0);

        drop(slot);
        queue.reserve().unwrap().fill("A", SynthesisRequest::new("X", "Y"));
        assert_eq!(queue.stats().snapshot().pending, 1);
    }

    #[tokio::test]
    async fn test_workers_drain_queue_on_shutdown() {
        let synthesizer = Arc::new(FakeSynthesizer::succeeding(b"img"));
        let notifier = Arc::new(RecordingNotifier::default());
        let (queue, workers) =
            JobQueue::start(&queue_config(16, 2), worker(synthesizer.clone(), notifier.clone()));
        assert_eq!(workers.len(), 2);

        for sender in ["A", "B", "C", "D"] {
            queue.reserve().unwrap().fill(sender, SynthesisRequest::new("X", "Y"));
        }
        drop(queue);
        workers.join().await;

        assert_eq!(synthesizer.requests().len(), 4);
        assert_eq!(notifier.sent().len(), 4);
    }
}
