//! Definitions of the capabilities the controller needs from its platform
//!
//! A [`Provider`] supplies timers, frame transmission and reception, the
//! current monotonic and calendar time, the own hardware address and a sink
//! for status reports. Timer and frame registrations are kept in a
//! [`Registry`] owned by the provider; every registration is represented by a
//! scoped handle that unregisters on drop.

use core::time::Duration;
use std::{
    io,
    sync::{
        atomic::{AtomicU64, Ordering},
        Arc, Mutex, MutexGuard, RwLock, Weak,
    },
};

use crate::{
    frame::{EtherType, LinkFrame},
    time::{CalendarTime, LinearTime},
    HardwareAddress, Status,
};

/// Longest the event loop waits without re-checking its timers
pub const MAX_WAIT: Duration = Duration::from_secs(60);

/// Shortest the event loop waits, to avoid spinning on a due timer
pub const MIN_WAIT: Duration = Duration::from_millis(1);

/// A failure of the platform below the controller.
///
/// Carries the name of the failing operation and the OS level error. These
/// are fatal: nothing in the controller retries.
#[derive(Debug, thiserror::Error)]
#[error("{operation}: {source}")]
pub struct TransportError {
    operation: &'static str,
    #[source]
    source: io::Error,
}

impl TransportError {
    pub fn new(operation: &'static str, source: io::Error) -> Self {
        Self { operation, source }
    }

    /// Capture `errno` of the last failed OS call
    pub fn last_os_error(operation: &'static str) -> Self {
        Self::new(operation, io::Error::last_os_error())
    }

    pub fn operation(&self) -> &'static str {
        self.operation
    }

    pub fn io_error(&self) -> &io::Error {
        &self.source
    }
}

/// Called when a timer expires
pub type TimerHandler = Box<dyn FnMut() -> Result<(), TransportError> + Send>;

/// Called for every received frame on the pulse ethertype
pub type FrameHandler = Box<dyn FnMut(&LinkFrame) -> Result<(), TransportError> + Send>;

/// Capability set the [`SyncController`](crate::SyncController) is written
/// against.
///
/// Implementors only need to supply the clocks, the transport and the status
/// sink plus access to their [`Registry`]; timer and frame registration are
/// provided. The event loop driving the registry is the implementor's
/// business, see [`Registry::fire_expired_timer`] and
/// [`Registry::dispatch_frame`].
pub trait Provider: Send + Sync {
    /// The registry holding this provider's timers and frame subscribers
    fn registry(&self) -> &Arc<Registry>;

    /// Read the monotonic clock
    fn monotonic_now(&self) -> Result<LinearTime, TransportError>;

    /// Read the UTC wall clock
    fn utc_now(&self) -> Result<CalendarTime, TransportError>;

    /// Hardware address of the interface this provider sends on
    fn own_address(&self) -> HardwareAddress;

    /// Send a frame. A zero source address is replaced by
    /// [`own_address`](Self::own_address).
    fn send_frame(&self, frame: &LinkFrame) -> Result<(), TransportError>;

    /// Output a status report
    fn report(&self, status: &Status);

    /// Register a timer calling `handler` every `period`, first one `period`
    /// from now. Dropping the returned handle unregisters the timer.
    fn register_timer(
        &self,
        handler: TimerHandler,
        period: Duration,
    ) -> Result<TimerHandle, TransportError> {
        let now = self.monotonic_now()?;
        let token = self.registry().add_timer(handler, period, now);

        Ok(TimerHandle {
            registry: Arc::downgrade(self.registry()),
            token: Some(token),
        })
    }

    /// Subscribe to frames on the pulse ethertype. Dropping the returned
    /// handle ends the subscription.
    fn subscribe_frames(&self, handler: FrameHandler) -> SubscriptionHandle {
        let token = self.registry().add_subscriber(handler);

        SubscriptionHandle {
            registry: Arc::downgrade(self.registry()),
            token: Some(token),
        }
    }
}

/// Opaque identification of a registration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Token(u64);

struct TimerEntry {
    token: Token,
    handler: Arc<Mutex<TimerHandler>>,
    period: Duration,
    last_called: LinearTime,
}

impl TimerEntry {
    fn remaining(&self, now: LinearTime) -> Duration {
        self.period.saturating_sub(now.duration_since(self.last_called))
    }
}

struct SubscriberEntry {
    token: Token,
    handler: Arc<Mutex<FrameHandler>>,
}

// A handler is only ever invoked by the event loop, so a poisoned lock means
// an earlier handler panicked; the handler itself is still usable.
fn lock<T: ?Sized>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// Timer and frame subscriber registrations of a provider.
///
/// Handlers are never called while a registry lock is held, so a handler may
/// freely register or release timers and subscriptions.
#[derive(Default)]
pub struct Registry {
    next_token: AtomicU64,
    timers: Mutex<Vec<TimerEntry>>,
    subscribers: RwLock<Vec<SubscriberEntry>>,
}

impl core::fmt::Debug for Registry {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Registry")
            .field("timers", &self.timer_count())
            .field("subscribers", &self.subscriber_count())
            .finish()
    }
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    fn token(&self) -> Token {
        Token(self.next_token.fetch_add(1, Ordering::Relaxed))
    }

    /// Register `handler` to be called every `period`. Periods shorter than
    /// [`MIN_WAIT`] are raised to it, so a timer can never be due on every
    /// call of [`fire_expired_timer`](Self::fire_expired_timer).
    pub fn add_timer(&self, handler: TimerHandler, period: Duration, now: LinearTime) -> Token {
        let token = self.token();
        lock(&self.timers).push(TimerEntry {
            token,
            handler: Arc::new(Mutex::new(handler)),
            period: period.max(MIN_WAIT),
            last_called: now,
        });
        token
    }

    pub fn remove_timer(&self, token: Token) {
        lock(&self.timers).retain(|timer| timer.token != token);
    }

    pub fn add_subscriber(&self, handler: FrameHandler) -> Token {
        let token = self.token();
        self.subscribers
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .push(SubscriberEntry {
                token,
                handler: Arc::new(Mutex::new(handler)),
            });
        token
    }

    pub fn remove_subscriber(&self, token: Token) {
        self.subscribers
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .retain(|subscriber| subscriber.token != token);
    }

    pub fn timer_count(&self) -> usize {
        lock(&self.timers).len()
    }

    pub fn subscriber_count(&self) -> usize {
        self.subscribers
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .len()
    }

    /// Fire the first timer that has expired at `now`, if any.
    ///
    /// At most one timer fires per call since a handler may add or remove
    /// timers. Callers should loop, re-reading the clock, until this returns
    /// `false`.
    pub fn fire_expired_timer(&self, now: LinearTime) -> Result<bool, TransportError> {
        let handler = {
            let mut timers = lock(&self.timers);
            let Some(timer) = timers.iter_mut().find(|timer| timer.remaining(now).is_zero())
            else {
                return Ok(false);
            };
            timer.last_called = now;
            timer.handler.clone()
        };

        let mut handler = lock(&handler);
        (*handler)()?;

        Ok(true)
    }

    /// How long the event loop may wait before a timer is due, clamped to
    /// [`MIN_WAIT`]..=[`MAX_WAIT`].
    pub fn next_wait(&self, now: LinearTime) -> Duration {
        lock(&self.timers)
            .iter()
            .map(|timer| timer.remaining(now))
            .min()
            .unwrap_or(MAX_WAIT)
            .clamp(MIN_WAIT, MAX_WAIT)
    }

    /// Hand a received frame to every subscriber. Frames of a foreign
    /// ethertype are dropped.
    pub fn dispatch_frame(&self, frame: &LinkFrame) -> Result<(), TransportError> {
        if frame.ether_type != EtherType::PULSE_SYNC {
            log::trace!("Dropping frame with ethertype {:#06x}", frame.ether_type.0);
            return Ok(());
        }

        let handlers: Vec<_> = self
            .subscribers
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .iter()
            .map(|subscriber| subscriber.handler.clone())
            .collect();

        for handler in handlers {
            let mut handler = lock(&handler);
            (*handler)(frame)?;
        }

        Ok(())
    }
}

/// A registered timer.
///
/// The timer stays registered while this handle exists. Releasing it, either
/// with [`release`](Self::release) or by dropping, unregisters the timer
/// exactly once. Releasing after the provider is gone does nothing.
#[derive(Debug)]
#[must_use = "dropping the handle unregisters the timer"]
pub struct TimerHandle {
    registry: Weak<Registry>,
    token: Option<Token>,
}

impl TimerHandle {
    pub fn release(&mut self) {
        if let Some(token) = self.token.take() {
            if let Some(registry) = self.registry.upgrade() {
                registry.remove_timer(token);
            }
        }
    }

    pub fn is_registered(&self) -> bool {
        self.token.is_some() && self.registry.strong_count() > 0
    }
}

impl Drop for TimerHandle {
    fn drop(&mut self) {
        self.release();
    }
}

/// A frame subscription, see [`TimerHandle`] for the release rules.
#[derive(Debug)]
#[must_use = "dropping the handle ends the subscription"]
pub struct SubscriptionHandle {
    registry: Weak<Registry>,
    token: Option<Token>,
}

impl SubscriptionHandle {
    pub fn release(&mut self) {
        if let Some(token) = self.token.take() {
            if let Some(registry) = self.registry.upgrade() {
                registry.remove_subscriber(token);
            }
        }
    }

    pub fn is_registered(&self) -> bool {
        self.token.is_some() && self.registry.strong_count() > 0
    }
}

impl Drop for SubscriptionHandle {
    fn drop(&mut self) {
        self.release();
    }
}
