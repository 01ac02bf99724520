//! Streaming build pipeline
//!
//! A [`StreamDriver`] connects one producer to one consumer task through a
//! bounded queue of row batches:
//!
//! - `append` renders nothing; it only moves a batch into the queue and blocks
//!   while the queue is full
//! - the consumer task is the only code that touches the document sink
//! - `build` enqueues the end-of-stream marker and waits for the artifact

mod driver;
mod queue;

pub use driver::{Completion, DriverState, StreamDriver};
