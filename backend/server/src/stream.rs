//! # Row Streaming
//!
//! Turns a synchronous, forward-only database cursor into a list of records
//! collected on the async side.
//!
//! ## Shape
//!
//! - One producer per call, running on the blocking pool since advancing a cursor is blocking I/O
//! - One consumer loop on the calling task
//! - One channel between them carrying events: `Item`, `Done` or `Failed`
//! - Every `Item` carries an ack, and the producer parks until the consumer has taken the record,
//!   so it never advances the cursor past what was accepted
//!
//! ## Guarantees
//!
//! - Records arrive in cursor order
//! - The first cursor or decode error wins, anything collected before it is dropped
//! - [`Producer`] is consumed by `Done`/`Failed`, so at most one terminal event is ever sent
//! - A producer that vanishes without a terminal event (panic) surfaces as
//!   [`StreamError::ProducerLost`]
//! - Dropping the consumer closes the channel, and the producer stops at its next publish
//!
//! No retries happen here. Re-running the whole query is up to the caller.
use std::{fmt::Display, time::Duration};

use thiserror::Error;
use tokio::{
    sync::{mpsc, oneshot},
    task,
    time::timeout,
};
use tracing::{debug, warn};

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StreamError {
    #[error("cursor failed: {0}")]
    Cursor(String),

    #[error("column {column}: {reason}")]
    Decode { column: usize, reason: String },

    #[error("row producer exited before finishing")]
    ProducerLost,

    #[error("row stream timed out")]
    TimedOut,
}

impl StreamError {
    pub fn cursor(error: impl Display) -> Self {
        Self::Cursor(error.to_string())
    }

    pub fn decode(column: usize, reason: impl Into<String>) -> Self {
        Self::Decode {
            column,
            reason: reason.into(),
        }
    }
}

#[derive(Debug, PartialEq, Eq)]
pub enum StreamOutcome<T> {
    Success(Vec<T>),
    Failure(StreamError),
}

impl<T> StreamOutcome<T> {
    pub fn into_result(self) -> Result<Vec<T>, StreamError> {
        match self {
            StreamOutcome::Success(records) => Ok(records),
            StreamOutcome::Failure(error) => Err(error),
        }
    }
}

/// Forward-only cursor over query rows.
///
/// `Ok(None)` means the cursor is exhausted. Implementations are only ever
/// driven from the producer thread.
pub trait RowCursor {
    type Row;

    fn advance(&mut self) -> Result<Option<Self::Row>, StreamError>;
}

enum Event<T> {
    Item(T, oneshot::Sender<()>),
    Done,
    Failed(StreamError),
}

/// Sending half handed to the producer closure.
pub struct Producer<T> {
    tx: mpsc::Sender<Event<T>>,
}

impl<T> Producer<T> {
    /// Advances `cursor` until it is exhausted or something fails, publishing
    /// every decoded row.
    pub fn drain<C, F>(self, mut cursor: C, mut decode: F)
    where
        C: RowCursor,
        F: FnMut(C::Row) -> Result<T, StreamError>,
    {
        loop {
            let row = match cursor.advance() {
                Ok(Some(row)) => row,
                Ok(None) => return self.finish(),
                Err(error) => return self.fail(error),
            };

            let record = match decode(row) {
                Ok(record) => record,
                Err(error) => return self.fail(error),
            };

            if !self.publish(record) {
                debug!("Row consumer went away, stopping producer");
                return;
            }
        }
    }

    /// Hands `record` over and waits until the consumer has taken it.
    /// `false` once the consumer is gone.
    fn publish(&self, record: T) -> bool {
        let (ack, accepted) = oneshot::channel();

        self.tx.blocking_send(Event::Item(record, ack)).is_ok() && accepted.blocking_recv().is_ok()
    }

    /// Ends the stream with `error`, for failures that happen before a cursor exists.
    pub fn fail(self, error: StreamError) {
        if self.tx.blocking_send(Event::Failed(error)).is_err() {
            debug!("Row consumer went away before the failure was delivered");
        }
    }

    fn finish(self) {
        if self.tx.blocking_send(Event::Done).is_err() {
            debug!("Row consumer went away before completion was delivered");
        }
    }
}

/// Runs `produce` on the blocking pool and collects whatever it publishes.
pub async fn collect<T, P>(produce: P) -> StreamOutcome<T>
where
    T: Send + 'static,
    P: FnOnce(Producer<T>) + Send + 'static,
{
    let (tx, mut rx) = mpsc::channel(1);

    // Detached: the producer ends on its own once its terminal event is sent
    // or the receiver is dropped.
    task::spawn_blocking(move || produce(Producer { tx }));

    let mut records = Vec::new();

    loop {
        match rx.recv().await {
            Some(Event::Item(record, ack)) => {
                records.push(record);
                let _ = ack.send(());
            }
            Some(Event::Done) => return StreamOutcome::Success(records),
            Some(Event::Failed(error)) => return StreamOutcome::Failure(error),
            None => return StreamOutcome::Failure(StreamError::ProducerLost),
        }
    }
}

/// [`collect`] for a cursor that can be moved onto the producer thread as is.
pub async fn collect_cursor<C, F, T>(cursor: C, decode: F) -> StreamOutcome<T>
where
    C: RowCursor + Send + 'static,
    F: FnMut(C::Row) -> Result<T, StreamError> + Send + 'static,
    T: Send + 'static,
{
    collect(move |producer| producer.drain(cursor, decode)).await
}

/// [`collect`] bounded by `deadline`. On expiry the channel is dropped, which
/// also stops the producer.
pub async fn collect_within<T, P>(deadline: Duration, produce: P) -> StreamOutcome<T>
where
    T: Send + 'static,
    P: FnOnce(Producer<T>) + Send + 'static,
{
    timeout(deadline, collect(produce))
        .await
        .unwrap_or_else(|_| {
            warn!("Row stream exceeded {}ms", deadline.as_millis());
            StreamOutcome::Failure(StreamError::TimedOut)
        })
}
