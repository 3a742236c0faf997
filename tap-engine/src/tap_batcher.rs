use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use tap_core::{EngineEvent, FieldValue, UserField, UserUpdate, tap_yield};
use tap_types::RewardError;
use tokio::runtime::Handle;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::rate_limiter::RateLimiter;
use crate::session::Session;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TapOutcome {
    Accepted {
        earned: i64,
        balance: i64,
        taps_remaining: i64,
    },
    /// Daily tap energy is used up.
    OutOfEnergy,
    RateLimited,
}

struct BatcherInner {
    session: Session,
    debounce: Duration,
    /// Balance accrued locally and not yet written. Read at flush time.
    pending: Mutex<i64>,
    /// Held across a whole flush so writes land in the order they were taken.
    flush_turn: tokio::sync::Mutex<()>,
    timer: Mutex<Option<JoinHandle<()>>>,
    limiter: Mutex<RateLimiter>,
    closed: AtomicBool,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

impl BatcherInner {
    fn take_pending(&self) -> i64 {
        std::mem::take(&mut *lock(&self.pending))
    }

    fn restore_pending(&self, amount: i64) {
        *lock(&self.pending) += amount;
    }

    async fn flush(&self) -> Result<i64, RewardError> {
        let _turn = self.flush_turn.lock().await;
        let amount = self.take_pending();
        if amount == 0 {
            return Ok(0);
        }

        let Some(user_id) = self.session.user_id() else {
            debug!("Dropping {} offline tap reward", amount);
            return Ok(0);
        };

        let taps_remaining = self.session.mirror().taps_remaining();
        let mut update = UserUpdate::default();
        update.increments.insert(UserField::Balance, amount);
        update
            .patch
            .insert(UserField::TapsRemaining, FieldValue::Int(taps_remaining));

        match self.session.store().apply(user_id, &update).await {
            Ok(()) => {
                debug!("Flushed {} tap reward for user {}", amount, user_id);
                self.session.publish(EngineEvent::TapsFlushed {
                    user_id,
                    amount,
                    taps_remaining,
                });
                Ok(amount)
            }
            Err(e) => {
                // Keep what the player already sees; the next flush retries it
                warn!("Failed to flush {} tap reward for user {}: {}", amount, user_id, e);
                self.restore_pending(amount);
                self.session.publish(EngineEvent::TapFlushFailed {
                    user_id,
                    amount,
                    reason: e.to_string(),
                });
                Err(e.into())
            }
        }
    }
}

/// Turns taps into debounced writes: one atomic balance increment plus the
/// current tap energy per quiet period.
pub struct TapBatcher {
    inner: Arc<BatcherInner>,
}

impl TapBatcher {
    pub fn new(session: Session, debounce: Duration, limiter: RateLimiter) -> Self {
        Self {
            inner: Arc::new(BatcherInner {
                session,
                debounce,
                pending: Mutex::new(0),
                flush_turn: tokio::sync::Mutex::new(()),
                timer: Mutex::new(None),
                limiter: Mutex::new(limiter),
                closed: AtomicBool::new(false),
            }),
        }
    }

    /// Apply one tap locally and (re)start the debounce timer.
    pub fn tap(&self) -> TapOutcome {
        let mirror = self.inner.session.mirror();
        if mirror.taps_remaining() <= 0 {
            return TapOutcome::OutOfEnergy;
        }
        if !lock(&self.inner.limiter).try_acquire() {
            return TapOutcome::RateLimited;
        }

        let accepted = mirror.update(|record| {
            if record.taps_remaining <= 0 {
                return None;
            }
            let earned = tap_yield(&record.upgrades);
            record.taps_remaining -= 1;
            record.balance += earned;
            Some((earned, record.balance, record.taps_remaining))
        });
        let Some((earned, balance, taps_remaining)) = accepted else {
            return TapOutcome::OutOfEnergy;
        };

        self.inner.restore_pending(earned);
        self.schedule_flush();

        TapOutcome::Accepted {
            earned,
            balance,
            taps_remaining,
        }
    }

    fn schedule_flush(&self) {
        let inner = self.inner.clone();
        let debounce = self.inner.debounce;
        let timer = tokio::spawn(async move {
            tokio::time::sleep(debounce).await;
            // Detach so a tap resetting the timer cannot cancel a write in flight
            tokio::spawn(async move {
                let _ = inner.flush().await;
            });
        });

        if let Some(previous) = lock(&self.inner.timer).replace(timer) {
            previous.abort();
        }
    }

    /// Write pending taps now, regardless of the timer.
    pub async fn flush(&self) -> Result<i64, RewardError> {
        self.inner.flush().await
    }

    pub fn pending(&self) -> i64 {
        *lock(&self.inner.pending)
    }

    /// Cancel the timer and start a final flush without waiting for it.
    pub fn shutdown(self) -> JoinHandle<Result<i64, RewardError>> {
        self.inner.closed.store(true, Ordering::SeqCst);
        self.cancel_timer();
        let inner = self.inner.clone();
        tokio::spawn(async move { inner.flush().await })
    }

    fn cancel_timer(&self) {
        if let Some(timer) = lock(&self.inner.timer).take() {
            timer.abort();
        }
    }
}

impl Drop for TapBatcher {
    fn drop(&mut self) {
        if self.inner.closed.swap(true, Ordering::SeqCst) {
            return;
        }
        self.cancel_timer();
        if self.pending() == 0 {
            return;
        }
        match Handle::try_current() {
            Ok(handle) => {
                info!("Flushing pending taps on teardown");
                let inner = self.inner.clone();
                handle.spawn(async move {
                    let _ = inner.flush().await;
                });
            }
            Err(_) => warn!("No runtime on teardown; {} tap reward left unsaved", self.pending()),
        }
    }
}
