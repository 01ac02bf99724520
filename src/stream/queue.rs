//! Bounded handoff between the producer and the consumer task

use crate::types::RowBatch;
use crossbeam_channel::{bounded, Receiver, SendTimeoutError, Sender};
use std::time::Instant;

/// Item carried by the queue
#[derive(Debug)]
pub(crate) enum Handoff {
    Batch(RowBatch),
    /// End of stream; enqueued exactly once, after every batch
    Sentinel,
}

/// Producer half: `put` blocks while `capacity` items are in flight
#[derive(Debug)]
pub(crate) struct QueueProducer {
    tx: Sender<Handoff>,
}

/// Consumer half: `take` blocks while the queue is empty
#[derive(Debug)]
pub(crate) struct QueueConsumer {
    rx: Receiver<Handoff>,
}

/// The consumer half has been dropped; the item is handed back
#[derive(Debug)]
pub(crate) struct Disconnected(pub Handoff);

/// Why a deadline-bound `put` gave up
#[derive(Debug)]
pub(crate) enum PutError {
    Disconnected,
    Timeout,
}

/// Fixed-capacity FIFO queue of row batches
pub(crate) fn handoff_queue(capacity: usize) -> (QueueProducer, QueueConsumer) {
    let (tx, rx) = bounded(capacity);
    (QueueProducer { tx }, QueueConsumer { rx })
}

impl QueueProducer {
    pub(crate) fn put(&self, item: Handoff) -> Result<(), Disconnected> {
        self.tx.send(item).map_err(|e| Disconnected(e.into_inner()))
    }

    /// Like `put`, but gives up at `deadline`
    pub(crate) fn put_until(&self, item: Handoff, deadline: Instant) -> Result<(), PutError> {
        self.tx.send_deadline(item, deadline).map_err(|e| match e {
            SendTimeoutError::Timeout(_) => PutError::Timeout,
            SendTimeoutError::Disconnected(_) => PutError::Disconnected,
        })
    }

    /// Items enqueued but not yet taken
    pub(crate) fn in_flight(&self) -> usize {
        self.tx.len()
    }
}

impl QueueConsumer {
    /// `None` once every producer is gone and the queue is drained
    pub(crate) fn take(&self) -> Option<Handoff> {
        self.rx.recv().ok()
    }
}
