//! Cancellable periodic fetch with at most one request in flight
//!
//! The timer task never awaits a fetch itself: each tick spawns the fetch as
//! its own task, guarded by a busy flag, so a hung remote call only delays
//! this subscriber. Results travel over an mpsc channel to whoever owns the
//! chart state.

use std::sync::atomic::{AtomicBool, AtomicU8, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::{mpsc, Notify};
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::console::client::ConsoleError;

pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(10);
/// Shorter periods are raised to this; a zero period would stop the timer.
pub const MIN_POLL_INTERVAL: Duration = Duration::from_millis(100);

#[async_trait]
pub trait PollFetch: Send + Sync + 'static {
    type Output: Send + 'static;

    async fn fetch(&self) -> Result<Self::Output, ConsoleError>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PollState {
    Idle,
    Polling,
    Stopped,
}

impl PollState {
    fn from_u8(value: u8) -> Self {
        match value {
            0 => Self::Idle,
            1 => Self::Polling,
            _ => Self::Stopped,
        }
    }
}

#[derive(Debug, Clone)]
pub struct Delivery<T> {
    pub received_at: DateTime<Utc>,
    pub value: T,
}

#[derive(Debug)]
struct Shared {
    label: String,
    state: AtomicU8,
    busy: AtomicBool,
    wake: Notify,
    shutdown: CancellationToken,
}

impl Shared {
    fn state(&self) -> PollState {
        PollState::from_u8(self.state.load(Ordering::Acquire))
    }

    /// Stopped is terminal, so only `from → to` moves are applied.
    fn transition(&self, from: PollState, to: PollState) {
        let _ = self.state.compare_exchange(
            from as u8,
            to as u8,
            Ordering::AcqRel,
            Ordering::Acquire,
        );
    }

    fn stop(&self) {
        if self.state.swap(PollState::Stopped as u8, Ordering::AcqRel) != PollState::Stopped as u8 {
            self.shutdown.cancel();
            info!(subscriber = %self.label, "poller stopped");
        }
    }
}

pub struct Poller<F> {
    fetcher: Arc<F>,
    interval: Duration,
    label: String,
    shutdown: CancellationToken,
}

impl<F: PollFetch> Poller<F> {
    pub fn new(fetcher: F) -> Self {
        Self {
            fetcher: Arc::new(fetcher),
            interval: DEFAULT_POLL_INTERVAL,
            label: "poller".to_string(),
            shutdown: CancellationToken::new(),
        }
    }

    pub fn with_interval(mut self, interval: Duration) -> Self {
        self.interval = interval.max(MIN_POLL_INTERVAL);
        self
    }

    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = label.into();
        self
    }

    /// Stops the poller together with a parent token.
    pub fn with_cancellation(mut self, parent: &CancellationToken) -> Self {
        self.shutdown = parent.child_token();
        self
    }

    /// Spawns the timer task; the first poll starts right away.
    pub fn start(self) -> Subscription<F::Output> {
        let shared = Arc::new(Shared {
            label: self.label,
            state: AtomicU8::new(PollState::Idle as u8),
            busy: AtomicBool::new(false),
            wake: Notify::new(),
            shutdown: self.shutdown,
        });
        let (sender, receiver) = mpsc::unbounded_channel();

        info!(
            subscriber = %shared.label,
            interval_secs = self.interval.as_secs_f64(),
            "starting poller"
        );
        tokio::spawn(run_timer(
            self.fetcher,
            Arc::clone(&shared),
            self.interval,
            sender,
        ));

        Subscription { shared, receiver }
    }
}

async fn run_timer<F: PollFetch>(
    fetcher: Arc<F>,
    shared: Arc<Shared>,
    period: Duration,
    sender: mpsc::UnboundedSender<Delivery<F::Output>>,
) {
    let mut interval = tokio::time::interval(period);
    interval.set_missed_tick_behavior(MissedTickBehavior::Skip);

    loop {
        tokio::select! {
            _ = shared.shutdown.cancelled() => {
                // Covers a cancelled parent token.
                shared.stop();
                debug!(subscriber = %shared.label, "poller timer shutting down");
                break;
            }
            _ = interval.tick() => {}
            _ = shared.wake.notified() => {}
        }
        begin_fetch(&fetcher, &shared, &sender);
    }
}

fn begin_fetch<F: PollFetch>(
    fetcher: &Arc<F>,
    shared: &Arc<Shared>,
    sender: &mpsc::UnboundedSender<Delivery<F::Output>>,
) {
    if shared.shutdown.is_cancelled() {
        return;
    }
    if shared
        .busy
        .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
        .is_err()
    {
        debug!(subscriber = %shared.label, "previous poll still in flight, skipping tick");
        return;
    }
    shared.transition(PollState::Idle, PollState::Polling);

    let fetcher = Arc::clone(fetcher);
    let shared = Arc::clone(shared);
    let sender = sender.clone();
    tokio::spawn(async move {
        if !shared.shutdown.is_cancelled() {
            match fetcher.fetch().await {
                Ok(value) if !shared.shutdown.is_cancelled() => {
                    let _ = sender.send(Delivery {
                        received_at: Utc::now(),
                        value,
                    });
                }
                Ok(_) => debug!(subscriber = %shared.label, "poll finished after stop, dropped"),
                Err(err) => warn!(subscriber = %shared.label, error = %err, "poll failed"),
            }
        }
        shared.transition(PollState::Polling, PollState::Idle);
        shared.busy.store(false, Ordering::Release);
    });
}

/// Cheap handle for triggering or stopping a poller from elsewhere.
#[derive(Debug, Clone)]
pub struct PollHandle {
    shared: Arc<Shared>,
}

impl PollHandle {
    pub fn poll_now(&self) {
        self.shared.wake.notify_one();
    }

    pub fn stop(&self) {
        self.shared.stop();
    }

    pub fn state(&self) -> PollState {
        self.shared.state()
    }
}

/// Receiving end of a poller. Dropping it stops the poller.
#[derive(Debug)]
pub struct Subscription<T> {
    shared: Arc<Shared>,
    receiver: mpsc::UnboundedReceiver<Delivery<T>>,
}

impl<T> Subscription<T> {
    pub fn handle(&self) -> PollHandle {
        PollHandle {
            shared: Arc::clone(&self.shared),
        }
    }

    pub fn poll_now(&self) {
        self.shared.wake.notify_one();
    }

    pub fn stop(&self) {
        self.shared.stop();
    }

    pub fn state(&self) -> PollState {
        self.shared.state()
    }

    /// Next delivery; `None` once the poller is stopped, even if results are
    /// still queued.
    pub async fn recv(&mut self) -> Option<Delivery<T>> {
        if self.shared.shutdown.is_cancelled() {
            return None;
        }
        tokio::select! {
            biased;
            _ = self.shared.shutdown.cancelled() => None,
            delivery = self.receiver.recv() => delivery,
        }
    }

    pub fn try_recv(&mut self) -> Option<Delivery<T>> {
        if self.shared.shutdown.is_cancelled() {
            return None;
        }
        self.receiver.try_recv().ok()
    }
}

impl<T> Drop for Subscription<T> {
    fn drop(&mut self) {
        self.shared.stop();
    }
}
