//! Debouncer
//!
//! Coalesces bursts of trigger events into one delayed action. Each trigger
//! replaces the pending timer; the action only runs once the quiescence
//! window passes without another trigger.

use std::future::Future;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::debug;

/// Default quiescence window for search-as-you-type
pub const DEFAULT_WINDOW: Duration = Duration::from_millis(300);

#[derive(Debug, Default)]
struct TimerState {
    /// Incremented by every trigger and cancel; a timer fires only if its
    /// generation is still current.
    generation: u64,
    pending: Option<JoinHandle<()>>,
}

/// Single-pending-timer debouncer carrying the state of the latest trigger.
///
/// Fired payloads are handed to one consumer task that runs the bound action
/// sequentially, so the action never overlaps with itself. Must be created
/// inside a tokio runtime.
pub struct Debouncer<T> {
    window: Duration,
    state: Arc<Mutex<TimerState>>,
    fire_tx: mpsc::UnboundedSender<T>,
    consumer: JoinHandle<()>,
}

impl<T: Send + 'static> Debouncer<T> {
    pub fn new<F, Fut>(window: Duration, action: F) -> Self
    where
        F: Fn(T) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        let (fire_tx, mut fire_rx) = mpsc::unbounded_channel::<T>();

        let consumer = tokio::spawn(async move {
            while let Some(payload) = fire_rx.recv().await {
                action(payload).await;
            }
        });

        Self {
            window,
            state: Arc::new(Mutex::new(TimerState::default())),
            fire_tx,
            consumer,
        }
    }

    fn lock(&self) -> MutexGuard<'_, TimerState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    // == Trigger ==
    /// Cancels any pending timer and schedules `payload` to fire after the
    /// window. Returns immediately.
    pub fn trigger(&self, payload: T) {
        let mut state = self.lock();
        state.generation += 1;
        if let Some(previous) = state.pending.take() {
            previous.abort();
            debug!("debounce timer superseded");
        }

        let generation = state.generation;
        let window = self.window;
        let timer_state = Arc::clone(&self.state);
        let fire_tx = self.fire_tx.clone();

        state.pending = Some(tokio::spawn(async move {
            tokio::time::sleep(window).await;

            let mut state = timer_state.lock().unwrap_or_else(PoisonError::into_inner);
            if state.generation != generation {
                return;
            }
            state.pending = None;
            drop(state);

            if fire_tx.send(payload).is_err() {
                debug!("debounce consumer gone, payload dropped");
            }
        }));
    }

    // == Cancel ==
    /// Drops the pending action, if any, without running it.
    pub fn cancel(&self) {
        let mut state = self.lock();
        state.generation += 1;
        if let Some(pending) = state.pending.take() {
            pending.abort();
            debug!("debounce timer cancelled");
        }
    }

    /// True while a trigger is waiting out its window.
    pub fn is_pending(&self) -> bool {
        self.lock().pending.is_some()
    }

    pub fn window(&self) -> Duration {
        self.window
    }
}

impl<T> Drop for Debouncer<T> {
    fn drop(&mut self) {
        let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        state.generation += 1;
        if let Some(pending) = state.pending.take() {
            pending.abort();
        }
        self.consumer.abort();
    }
}
