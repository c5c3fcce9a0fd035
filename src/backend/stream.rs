//! Resilient event stream.
//!
//! `NbxEventStream` turns the long-polling events endpoint into an infinite,
//! restartable sequence of typed events. On any failure the subscription is
//! re-issued after a bounded exponential backoff with jitter. The backend
//! guarantees no cursor across reconnects, so redelivered events are passed
//! through; idempotency lives downstream in the notification state.

use async_trait::async_trait;
use rand::Rng;
use std::collections::VecDeque;
use std::time::Duration;
use tokio::time::sleep;
use tracing::{debug, error, warn};

use super::client::NbxClient;
use super::events::{RawEvent, StreamEvent};
use crate::error::BackendError;

/// Source of watcher events. The real implementation never terminates;
/// test fakes return `None` when their script is exhausted.
#[async_trait]
pub trait EventSource: Send {
    async fn next_event(&mut self) -> Option<StreamEvent>;
}

/// One long-poll round against the events endpoint. `NbxClient` is the
/// real poller; tests script batches directly.
#[async_trait]
pub trait EventPoller: Send + Sync {
    async fn poll_events(&self, last_event_id: i64) -> Result<Vec<RawEvent>, BackendError>;
}

#[async_trait]
impl EventPoller for NbxClient {
    async fn poll_events(&self, last_event_id: i64) -> Result<Vec<RawEvent>, BackendError> {
        NbxClient::poll_events(self, last_event_id).await
    }
}

/// Bounded exponential backoff with jitter.
///
/// Grows from `base` to `max` doubling per failure; a successful round
/// resets it. The jitter adds up to a quarter of the current delay so a
/// fleet of watchers does not reconnect in lockstep.
#[derive(Debug)]
pub struct Backoff {
    base: Duration,
    max: Duration,
    current: Duration,
}

impl Backoff {
    pub fn new(base: Duration, max: Duration) -> Self {
        Self {
            base,
            max,
            current: base,
        }
    }

    pub fn reset(&mut self) {
        self.current = self.base;
    }

    /// Delay to apply for this failure; advances the schedule.
    pub fn next_delay(&mut self) -> Duration {
        let delay = self.current;
        let jitter_ceiling = (delay.as_millis() / 4) as u64;
        let jitter = if jitter_ceiling > 0 {
            Duration::from_millis(rand::thread_rng().gen_range(0..=jitter_ceiling))
        } else {
            Duration::ZERO
        };
        self.current = (self.current * 2).min(self.max);
        delay + jitter
    }
}

impl Default for Backoff {
    fn default() -> Self {
        Self::new(Duration::from_secs(1), Duration::from_secs(60))
    }
}

/// Infinite event sequence backed by the NBXplorer events endpoint.
pub struct NbxEventStream<P: EventPoller> {
    poller: P,
    last_event_id: i64,
    pending: VecDeque<RawEvent>,
    backoff: Backoff,
}

impl<P: EventPoller> NbxEventStream<P> {
    pub fn new(poller: P) -> Self {
        Self {
            poller,
            last_event_id: 0,
            pending: VecDeque::new(),
            backoff: Backoff::default(),
        }
    }
}

#[async_trait]
impl<P: EventPoller> EventSource for NbxEventStream<P> {
    async fn next_event(&mut self) -> Option<StreamEvent> {
        loop {
            // Drain the buffered batch first, advancing the session cursor
            // even past events we cannot decode.
            if let Some(raw) = self.pending.pop_front() {
                if let Some(id) = raw.event_id {
                    self.last_event_id = id;
                }
                match raw.classify() {
                    Ok(event) => return Some(event),
                    Err(e) => {
                        warn!("skipping malformed event: {e}");
                        continue;
                    }
                }
            }

            match self.poller.poll_events(self.last_event_id).await {
                Ok(batch) => {
                    self.backoff.reset();
                    if batch.is_empty() {
                        // Long-poll hold expired with nothing new.
                        debug!(last_event_id = self.last_event_id, "event poll idle");
                        continue;
                    }
                    self.pending.extend(batch);
                }
                Err(e) => {
                    let delay = self.backoff.next_delay();
                    if e.is_auth_rejection() {
                        // Retried like any transient fault: credentials are
                        // expected to become valid again, e.g. after a
                        // backend restart rewrites the cookie file.
                        error!("event subscription rejected by backend auth: {e}; retrying in {delay:?}");
                    } else {
                        warn!("event subscription failed: {e}; reconnecting in {delay:?}");
                    }
                    sleep(delay).await;
                }
            }
        }
    }
}
