use std::sync::atomic::{AtomicBool, AtomicI64, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use chrono::{DateTime, TimeZone, Utc};
use serde::Serialize;
use tickercast_protocol::Ticker;

/// The ticker being broadcast, shared between the control plane (writers)
/// and the tick loop (reader).
///
/// The lock is only held to copy or replace the value, never across I/O.
#[derive(Debug, Clone)]
pub struct SelectedTicker {
    inner: Arc<Mutex<Ticker>>,
}

impl SelectedTicker {
    pub fn new(initial: Ticker) -> Self {
        Self {
            inner: Arc::new(Mutex::new(initial)),
        }
    }

    pub fn get(&self) -> Ticker {
        self.lock().clone()
    }

    /// Replace the selection, returning the previous ticker.
    pub fn set(&self, ticker: Ticker) -> Ticker {
        std::mem::replace(&mut *self.lock(), ticker)
    }

    // A panicking writer cannot leave a torn Ticker behind, so a poisoned
    // lock still holds a valid value.
    fn lock(&self) -> MutexGuard<'_, Ticker> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum BroadcastState {
    /// Before the first tick
    Idle,
    /// Steady state
    Cycling,
}

/// Tick counters shared with the health server
#[derive(Debug, Default)]
pub struct BroadcastStatus {
    cycling: AtomicBool,
    ticks_sent: AtomicU64,
    ticks_skipped: AtomicU64,
    send_failures: AtomicU64,
    /// Epoch millis of the last successful publish, 0 if none
    last_sent_ms: AtomicI64,
}

/// Point-in-time copy of [`BroadcastStatus`]
#[derive(Debug, Clone, Serialize)]
pub struct StatusReport {
    pub state: BroadcastState,
    pub ticks_sent: u64,
    pub ticks_skipped: u64,
    pub send_failures: u64,
    pub last_sent_at: Option<DateTime<Utc>>,
}

impl BroadcastStatus {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn mark_cycling(&self) {
        self.cycling.store(true, Ordering::SeqCst);
    }

    pub fn record_sent(&self) {
        self.ticks_sent.fetch_add(1, Ordering::SeqCst);
        self.last_sent_ms
            .store(Utc::now().timestamp_millis(), Ordering::SeqCst);
    }

    pub fn record_skipped(&self) {
        self.ticks_skipped.fetch_add(1, Ordering::SeqCst);
    }

    pub fn record_send_failure(&self) {
        self.send_failures.fetch_add(1, Ordering::SeqCst);
    }

    pub fn state(&self) -> BroadcastState {
        if self.cycling.load(Ordering::SeqCst) {
            BroadcastState::Cycling
        } else {
            BroadcastState::Idle
        }
    }

    /// True once at least one snapshot went out
    pub fn has_sent(&self) -> bool {
        self.ticks_sent.load(Ordering::SeqCst) > 0
    }

    pub fn report(&self) -> StatusReport {
        let last_ms = self.last_sent_ms.load(Ordering::SeqCst);
        StatusReport {
            state: self.state(),
            ticks_sent: self.ticks_sent.load(Ordering::SeqCst),
            ticks_skipped: self.ticks_skipped.load(Ordering::SeqCst),
            send_failures: self.send_failures.load(Ordering::SeqCst),
            last_sent_at: if last_ms == 0 {
                None
            } else {
                Utc.timestamp_millis_opt(last_ms).single()
            },
        }
    }
}
