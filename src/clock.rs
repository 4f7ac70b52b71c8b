//! Timer capability used by slideshow schedulers.
//!
//! Schedulers never touch ambient timers directly. They receive a [`Timer`]
//! and arm one-shot or repeating callbacks through it:
//!
//! - [`ManualClock`] advances virtual time on demand. Tests and dry runs use
//!   it to replay a timeline deterministically.
//! - [`TokioTimer`] backs callbacks with `tokio::time`. Callbacks are `!Send`
//!   so it spawns local tasks and must run inside a [`tokio::task::LocalSet`].
//!
//! Every armed callback is paired with a [`TimerHandle`]. Dropping the
//! handle guarantees the callback never runs afterwards.

use std::cell::RefCell;
use std::collections::BTreeMap;
use std::rc::Rc;
use std::time::Duration;

use tokio::select;
use tokio::time::{Instant, MissedTickBehavior, interval_at, sleep};
use tokio_util::sync::CancellationToken;
use tracing::trace;

/// Shortest period a repeating timer may use.
pub const MIN_PERIOD: Duration = Duration::from_millis(1);

pub type OnceCallback = Box<dyn FnOnce()>;
pub type RepeatCallback = Box<dyn FnMut()>;

/// Scheduling capability handed to slideshow schedulers.
pub trait Timer {
    /// Run `callback` once after `delay`.
    fn after(&self, delay: Duration, callback: OnceCallback) -> TimerHandle;

    /// Run `callback` every `period`, first firing one `period` from now.
    fn every(&self, period: Duration, callback: RepeatCallback) -> TimerHandle;
}

/// Keeps an armed callback alive. Dropping it cancels the callback.
#[derive(Debug)]
pub struct TimerHandle {
    token: CancellationToken,
}

impl TimerHandle {
    fn new(token: CancellationToken) -> Self {
        Self { token }
    }
}

impl Drop for TimerHandle {
    fn drop(&mut self) {
        self.token.cancel();
    }
}

enum Callback {
    Once(OnceCallback),
    Every {
        period: Duration,
        callback: RepeatCallback,
    },
}

struct Pending {
    token: CancellationToken,
    callback: Callback,
}

#[derive(Default)]
struct Wheel {
    now: Duration,
    seq: u64,
    created: usize,
    // Keyed by (deadline, arm order) so equal deadlines fire first-armed-first.
    pending: BTreeMap<(Duration, u64), Pending>,
}

impl Wheel {
    fn insert(&mut self, due: Duration, pending: Pending) {
        self.seq += 1;
        self.pending.insert((due, self.seq), pending);
    }

    fn pop_due(&mut self, until: Duration) -> Option<(Duration, Pending)> {
        let (&key, _) = self.pending.iter().next()?;
        if key.0 > until {
            return None;
        }
        self.pending.remove(&key).map(|pending| (key.0, pending))
    }
}

/// Virtual clock that only moves when told to.
///
/// Clones share the same timeline. Callbacks run synchronously inside
/// [`ManualClock::advance`], in deadline order, and may arm further timers.
#[derive(Clone, Default)]
pub struct ManualClock {
    wheel: Rc<RefCell<Wheel>>,
}

impl ManualClock {
    pub fn new() -> Self {
        Self::default()
    }

    /// Virtual time elapsed since the clock was created.
    #[must_use]
    pub fn now(&self) -> Duration {
        self.wheel.borrow().now
    }

    /// Total number of timers ever armed on this clock.
    #[must_use]
    pub fn timers_created(&self) -> usize {
        self.wheel.borrow().created
    }

    /// Number of armed timers that have not been cancelled or fired.
    #[must_use]
    pub fn pending(&self) -> usize {
        self.wheel
            .borrow()
            .pending
            .values()
            .filter(|p| !p.token.is_cancelled())
            .count()
    }

    /// Deadline of the earliest live timer, if any.
    #[must_use]
    pub fn next_deadline(&self) -> Option<Duration> {
        self.wheel
            .borrow()
            .pending
            .iter()
            .find(|(_, p)| !p.token.is_cancelled())
            .map(|(&(due, _), _)| due)
    }

    /// Move virtual time forward by `by`, firing everything that comes due.
    pub fn advance(&self, by: Duration) {
        let target = self.now() + by;
        self.advance_to(target);
    }

    /// Move virtual time forward to `target`. Moving backwards is a no-op.
    pub fn advance_to(&self, target: Duration) {
        loop {
            // The wheel borrow must end before the callback runs; callbacks re-arm.
            let next = self.wheel.borrow_mut().pop_due(target);
            let Some((due, pending)) = next else {
                break;
            };
            self.wheel.borrow_mut().now = due;
            if pending.token.is_cancelled() {
                continue;
            }
            match pending.callback {
                Callback::Once(callback) => callback(),
                Callback::Every {
                    period,
                    mut callback,
                } => {
                    callback();
                    if !pending.token.is_cancelled() {
                        self.wheel.borrow_mut().insert(
                            due + period,
                            Pending {
                                token: pending.token,
                                callback: Callback::Every { period, callback },
                            },
                        );
                    }
                }
            }
        }
        let mut wheel = self.wheel.borrow_mut();
        if target > wheel.now {
            wheel.now = target;
        }
    }

    fn arm(&self, delay: Duration, callback: Callback) -> TimerHandle {
        let token = CancellationToken::new();
        let mut wheel = self.wheel.borrow_mut();
        wheel.created += 1;
        let due = wheel.now + delay;
        wheel.insert(
            due,
            Pending {
                token: token.clone(),
                callback,
            },
        );
        TimerHandle::new(token)
    }
}

impl Timer for ManualClock {
    fn after(&self, delay: Duration, callback: OnceCallback) -> TimerHandle {
        self.arm(delay, Callback::Once(callback))
    }

    fn every(&self, period: Duration, callback: RepeatCallback) -> TimerHandle {
        let period = period.max(MIN_PERIOD);
        self.arm(period, Callback::Every { period, callback })
    }
}

/// Timer backed by the tokio clock.
///
/// Every armed timer is a child of the token given at construction, so
/// cancelling that token silences all of them at once.
#[derive(Clone, Debug)]
pub struct TokioTimer {
    cancel: CancellationToken,
}

impl TokioTimer {
    pub fn new(cancel: CancellationToken) -> Self {
        Self { cancel }
    }
}

impl Timer for TokioTimer {
    fn after(&self, delay: Duration, callback: OnceCallback) -> TimerHandle {
        let token = self.cancel.child_token();
        let task_token = token.clone();
        tokio::task::spawn_local(async move {
            select! {
                biased;
                _ = task_token.cancelled() => {}
                _ = sleep(delay) => {
                    if !task_token.is_cancelled() {
                        callback();
                    }
                }
            }
        });
        trace!(delay_ms = delay.as_millis() as u64, "armed one-shot timer");
        TimerHandle::new(token)
    }

    fn every(&self, period: Duration, mut callback: RepeatCallback) -> TimerHandle {
        let period = period.max(MIN_PERIOD);
        let token = self.cancel.child_token();
        let task_token = token.clone();
        tokio::task::spawn_local(async move {
            let mut ticks = interval_at(Instant::now() + period, period);
            ticks.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                select! {
                    biased;
                    _ = task_token.cancelled() => break,
                    _ = ticks.tick() => {
                        if task_token.is_cancelled() {
                            break;
                        }
                        callback();
                    }
                }
            }
        });
        trace!(
            period_ms = period.as_millis() as u64,
            "armed repeating timer"
        );
        TimerHandle::new(token)
    }
}
