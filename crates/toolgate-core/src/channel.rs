// Event emission channel
//
// A single-producer/single-consumer bounded queue decouples event
// production inside the loop from consumption by a streaming caller.
// Delivery is FIFO; the queue is drained after the producer finishes so
// buffered events are never lost.

use async_trait::async_trait;
use futures::stream::Stream;
use std::pin::Pin;
use std::task::{Context, Poll};
use std::time::Duration;
use tokio::sync::mpsc;

use crate::error::{Result, TaskError};
use crate::events::TaskEvent;

/// Default bound of the event queue
pub const DEFAULT_EVENT_CAPACITY: usize = 64;

/// Interval at which the draining side polls the queue while the producer
/// is still running
const POLL_INTERVAL: Duration = Duration::from_millis(50);

// ============================================================================
// EventEmitter
// ============================================================================

/// Trait for emitting events during task execution
///
/// Implementations can:
/// - Send events to a bounded channel for streaming
/// - Collect events in memory for testing
/// - Do nothing (no-op implementation)
#[async_trait]
pub trait EventEmitter: Send + Sync {
    /// Emit a single event.
    ///
    /// An error means the consumer is gone; the runner treats that as
    /// cancellation and stops promptly instead of leaking background work.
    async fn emit(&self, event: TaskEvent) -> Result<()>;
}

/// Emitter backed by a bounded mpsc queue
#[derive(Clone)]
pub struct ChannelEventEmitter {
    tx: mpsc::Sender<TaskEvent>,
}

#[async_trait]
impl EventEmitter for ChannelEventEmitter {
    async fn emit(&self, event: TaskEvent) -> Result<()> {
        self.tx
            .send(event)
            .await
            .map_err(|_| TaskError::channel("event consumer disconnected"))
    }
}

// ============================================================================
// EventStream
// ============================================================================

/// Draining stream over the event queue.
///
/// Forwards each event as soon as it is available, polling with a short
/// timeout while the producing task is alive; once the producer drops its
/// sender the remaining buffered events are drained and the stream ends.
pub struct EventStream {
    inner: Pin<Box<dyn Stream<Item = TaskEvent> + Send>>,
}

impl EventStream {
    fn new(rx: mpsc::Receiver<TaskEvent>) -> Self {
        let inner = futures::stream::unfold(rx, |mut rx| async move {
            loop {
                match tokio::time::timeout(POLL_INTERVAL, rx.recv()).await {
                    // Event available: forward immediately
                    Ok(Some(event)) => return Some((event, rx)),
                    // Producer finished and buffer drained: end of stream
                    Ok(None) => return None,
                    // Poll timeout while the producer is still running
                    Err(_) => continue,
                }
            }
        });
        Self {
            inner: Box::pin(inner),
        }
    }

    /// Receive the next event, or None when the stream has ended
    pub async fn next(&mut self) -> Option<TaskEvent> {
        use futures::StreamExt;
        self.inner.next().await
    }

    /// Collect all remaining events (waits for the producer to finish)
    pub async fn collect(mut self) -> Vec<TaskEvent> {
        let mut events = Vec::new();
        while let Some(event) = self.next().await {
            events.push(event);
        }
        events
    }
}

impl Stream for EventStream {
    type Item = TaskEvent;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        self.inner.as_mut().poll_next(cx)
    }
}

/// Create a paired emitter and draining stream over a bounded queue
pub fn event_channel(capacity: usize) -> (ChannelEventEmitter, EventStream) {
    let (tx, rx) = mpsc::channel(capacity);
    (ChannelEventEmitter { tx }, EventStream::new(rx))
}

/// Emitter that discards every event (non-streaming callers)
#[derive(Debug, Clone, Copy, Default)]
pub struct NullEmitter;

#[async_trait]
impl EventEmitter for NullEmitter {
    async fn emit(&self, _event: TaskEvent) -> Result<()> {
        Ok(())
    }
}
