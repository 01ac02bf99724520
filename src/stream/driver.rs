//! Stream driver: lifecycle, backpressure and the single consumer task

use super::queue::{handoff_queue, Disconnected, Handoff, PutError, QueueConsumer, QueueProducer};
use crate::config::ExcelConfig;
use crate::error::{ExcelError, Result};
use crate::sink::DocumentSink;
use crate::types::RowBatch;
use crossbeam_channel::{bounded, Receiver, RecvTimeoutError};
use rayon::ThreadPool;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, trace, warn};

/// Lifecycle of a [`StreamDriver`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DriverState {
    Unstarted,
    Running,
    Closed(Completion),
}

/// How a closed driver ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Completion {
    /// The sink was finalized and the artifact returned
    Artifact,
    /// The consumer failed, or the build deadline expired
    Error,
}

/// Owns the handoff queue and the consumer task for one document
///
/// The producer calls [`start`](Self::start) once, then
/// [`append`](Self::append) any number of times, then
/// [`build`](Self::build) once. Batches reach the sink in exactly the order
/// they were appended; `append` blocks while `queue_capacity` batches are
/// already waiting.
pub struct StreamDriver<S: DocumentSink> {
    config: ExcelConfig,
    state: DriverState,
    producer: Option<QueueProducer>,
    completion: Option<Receiver<Result<S::Artifact>>>,
    pool: Option<Arc<ThreadPool>>,
    batches_enqueued: u64,
    rows_enqueued: u64,
}

impl<S: DocumentSink> StreamDriver<S> {
    pub fn new(config: ExcelConfig) -> Self {
        StreamDriver {
            config,
            state: DriverState::Unstarted,
            producer: None,
            completion: None,
            pool: None,
            batches_enqueued: 0,
            rows_enqueued: 0,
        }
    }

    pub fn state(&self) -> DriverState {
        self.state
    }

    pub fn config(&self) -> &ExcelConfig {
        &self.config
    }

    /// Batches handed to the queue so far, header included
    pub fn batches_enqueued(&self) -> u64 {
        self.batches_enqueued
    }

    /// Rows handed to the queue so far, header included
    pub fn rows_enqueued(&self) -> u64 {
        self.rows_enqueued
    }

    /// Batches waiting for the consumer
    pub fn in_flight(&self) -> usize {
        self.producer.as_ref().map_or(0, |p| p.in_flight())
    }

    /// Spawn the consumer for `sink` and enqueue the header batch, if any
    pub fn start(&mut self, sink: S, header: Option<RowBatch>) -> Result<()> {
        self.ensure_unstarted()?;
        self.config.validate()?;

        let pool = self.config.execution().resolve()?;
        let (producer, consumer) = handoff_queue(self.config.queue_capacity());
        let (done_tx, done_rx) = bounded(1);

        pool.spawn(move || {
            let outcome = panic::catch_unwind(AssertUnwindSafe(|| run_consumer(consumer, sink)))
                .unwrap_or_else(|_| {
                    Err(ExcelError::WorkerUnavailable(
                        "consumer task panicked".to_string(),
                    ))
                });
            // The receiver is gone if build() already gave up waiting
            let _ = done_tx.send(outcome);
        });

        debug!(
            capacity = self.config.queue_capacity(),
            window = ?self.config.window_size(),
            "stream driver started"
        );
        self.producer = Some(producer);
        self.completion = Some(done_rx);
        self.pool = Some(pool);
        self.state = DriverState::Running;

        if let Some(header) = header.filter(|h| !h.is_empty()) {
            debug!(rows = header.len(), "enqueueing header batch");
            self.enqueue(header);
        }
        Ok(())
    }

    /// Hand one batch to the consumer, blocking while the queue is full
    ///
    /// Empty batches are ignored. If the consumer has already stopped on a
    /// sink error the batch is dropped; `build` reports that error.
    pub fn append(&mut self, batch: RowBatch) -> Result<()> {
        self.ensure_running("append")?;
        if batch.is_empty() {
            return Ok(());
        }
        self.enqueue(batch);
        Ok(())
    }

    /// Fail with a usage error unless the driver has not started yet
    pub fn ensure_unstarted(&self) -> Result<()> {
        match self.state {
            DriverState::Unstarted => Ok(()),
            DriverState::Running => Err(ExcelError::usage("start called twice")),
            DriverState::Closed(_) => Err(ExcelError::usage("start called after build")),
        }
    }

    /// Fail with a usage error unless the driver is running
    pub fn ensure_running(&self, operation: &str) -> Result<()> {
        match self.state {
            DriverState::Running => Ok(()),
            DriverState::Unstarted => Err(ExcelError::usage(format!(
                "{} called before start",
                operation
            ))),
            DriverState::Closed(_) => Err(ExcelError::usage(format!(
                "{} called after build",
                operation
            ))),
        }
    }

    fn enqueue(&mut self, batch: RowBatch) {
        let Some(producer) = self.producer.as_ref() else {
            return;
        };
        let rows = batch.len() as u64;
        match producer.put(Handoff::Batch(batch)) {
            Ok(()) => {
                self.batches_enqueued += 1;
                self.rows_enqueued += rows;
                trace!(batch = self.batches_enqueued, rows, "batch enqueued");
            }
            Err(Disconnected(lost)) => {
                let lost_rows = match lost {
                    Handoff::Batch(batch) => batch.len(),
                    Handoff::Sentinel => 0,
                };
                warn!(rows = lost_rows, "consumer stopped; batch discarded");
            }
        }
    }

    /// Signal end of stream and wait for the finished artifact
    ///
    /// Blocks until the consumer has committed every batch and finalized the
    /// sink, or until the configured build timeout expires.
    pub fn build(&mut self) -> Result<S::Artifact> {
        match self.state {
            DriverState::Running => {}
            DriverState::Unstarted => return Err(ExcelError::usage("build called before start")),
            DriverState::Closed(_) => return Err(ExcelError::usage("build called twice")),
        }

        let timeout = self.config.build_timeout();
        let deadline = timeout.map(|t| Instant::now() + t);
        let outcome = self.finish(deadline);

        if let (Err(ExcelError::BuildTimeout(_)), Some(t)) = (&outcome, timeout) {
            warn!(timeout = ?t, "build deadline expired");
        }
        self.state = DriverState::Closed(match outcome {
            Ok(_) => Completion::Artifact,
            Err(_) => Completion::Error,
        });
        self.pool = None;
        debug!(
            batches = self.batches_enqueued,
            rows = self.rows_enqueued,
            state = ?self.state,
            "stream driver closed"
        );
        outcome
    }

    fn finish(&mut self, deadline: Option<Instant>) -> Result<S::Artifact> {
        let timeout = self.config.build_timeout().unwrap_or_default();

        // Dropping the producer after the sentinel disconnects the queue
        if let Some(producer) = self.producer.take() {
            let sent = match deadline {
                Some(deadline) => producer.put_until(Handoff::Sentinel, deadline),
                None => producer
                    .put(Handoff::Sentinel)
                    .map_err(|_| PutError::Disconnected),
            };
            match sent {
                Ok(()) => debug!("sentinel enqueued"),
                Err(PutError::Timeout) => return Err(ExcelError::BuildTimeout(timeout)),
                Err(PutError::Disconnected) => debug!("consumer already stopped"),
            }
        }

        let completion = self.completion.take().ok_or_else(|| {
            ExcelError::WorkerUnavailable("completion slot already consumed".to_string())
        })?;
        match deadline {
            Some(deadline) => match completion.recv_deadline(deadline) {
                Ok(outcome) => outcome,
                Err(RecvTimeoutError::Timeout) => Err(ExcelError::BuildTimeout(timeout)),
                Err(RecvTimeoutError::Disconnected) => Err(consumer_vanished()),
            },
            None => completion.recv().unwrap_or_else(|_| Err(consumer_vanished())),
        }
    }
}

fn consumer_vanished() -> ExcelError {
    ExcelError::WorkerUnavailable("consumer exited without a result".to_string())
}

/// Consumer loop: the only code that touches the sink
fn run_consumer<S: DocumentSink>(consumer: QueueConsumer, mut sink: S) -> Result<S::Artifact> {
    debug!("consumer started");
    let mut batches = 0u64;
    loop {
        match consumer.take() {
            Some(Handoff::Batch(batch)) => {
                batches += 1;
                let rows = batch.len();
                if let Err(e) = sink.append(batch) {
                    warn!(batch = batches, error = %e, "sink rejected batch; consumer stopping");
                    return Err(ExcelError::BatchError {
                        batch: batches,
                        source: Box::new(e),
                    });
                }
                trace!(batch = batches, rows, "batch committed");
            }
            Some(Handoff::Sentinel) => {
                debug!(batches, "sentinel received; finalizing");
                return sink.finalize().map_err(|e| {
                    warn!(error = %e, "sink finalize failed");
                    e
                });
            }
            None => {
                debug!(batches, "producer dropped before build; consumer exiting");
                return Err(ExcelError::WorkerUnavailable(
                    "stream abandoned before build".to_string(),
                ));
            }
        }
    }
}
