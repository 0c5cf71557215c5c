//! The election and synchronization state machine

use std::sync::{Arc, Mutex, MutexGuard, Weak};

use crate::{
    config::{ConfigError, ControllerConfig},
    provider::{FrameHandler, Provider, SubscriptionHandle, TimerHandle, TimerHandler},
    statistics::DeviationHistory,
    time::{CalendarTime, LinearTime},
    HardwareAddress, LinkFrame, Status, TimeSignalPulse, TransportError,
};

/// Role of a node in the election
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub enum Role {
    Slave,
    Master,
}

/// Election bookkeeping of a [`SyncController`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ElectionState {
    pub role: Role,
    /// Lowest address seen pulsing that is also lower than our own, or
    /// [`HardwareAddress::NO_MASTER`]
    pub chosen_master: HardwareAddress,
    /// Monotonic time of the last pulse from `chosen_master`
    pub last_master_pulse: LinearTime,
    /// Time carried by the last pulse from `chosen_master`
    pub last_received: CalendarTime,
    /// Time carried by the last pulse we sent
    pub last_sent: CalendarTime,
}

impl Default for ElectionState {
    fn default() -> Self {
        Self {
            role: Role::Slave,
            chosen_master: HardwareAddress::NO_MASTER,
            last_master_pulse: LinearTime::ZERO,
            last_received: CalendarTime::default(),
            last_sent: CalendarTime::default(),
        }
    }
}

/// Why [`SyncController::start`] failed
#[derive(Debug, thiserror::Error)]
pub enum StartError {
    #[error("invalid controller config: {0}")]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Transport(#[from] TransportError),
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// Elects a master by lowest hardware address, broadcasts pulses while
/// master and measures the deviation from the master while slave.
///
/// The controller is driven entirely by the [`Provider`]'s event loop. It is
/// created with [`start`](Self::start), which registers the liveness timer
/// and the frame subscription; both are released when the controller is
/// dropped.
///
/// A node starts as [`Role::Slave`] without a master. If no master has been
/// heard by the first liveness check it promotes itself. A master that has
/// been silent for [`ControllerConfig::liveness_timeout`] is forgotten, and
/// the next liveness check promotes this node unless a lower addressed node
/// pulsed in the meantime. A master demotes itself as soon as it hears a
/// pulse from a lower address.
#[derive(Debug)]
pub struct SyncController<P: Provider + 'static> {
    // Declared before the handles: when the provider goes first the handles
    // find its registry gone and release nothing.
    provider: Arc<P>,
    config: ControllerConfig,
    own_address: HardwareAddress,
    this: Weak<Mutex<Self>>,
    state: ElectionState,
    history: DeviationHistory,
    liveness_timer: Option<TimerHandle>,
    broadcast_timer: Option<TimerHandle>,
    subscription: Option<SubscriptionHandle>,
}

impl<P: Provider + 'static> SyncController<P> {
    /// Create a controller and hook it up to `provider`.
    ///
    /// The returned controller is shared with the provider's callbacks, which
    /// only hold a weak reference to it. Dropping the last strong reference
    /// stops the controller.
    ///
    /// Fails without registering anything if a period of `config` is zero.
    pub fn start(
        provider: Arc<P>,
        config: ControllerConfig,
    ) -> Result<Arc<Mutex<Self>>, StartError> {
        config.validate()?;

        let own_address = provider.own_address();
        let controller = Arc::new_cyclic(|this| {
            Mutex::new(Self {
                provider: provider.clone(),
                config,
                own_address,
                this: this.clone(),
                state: ElectionState::default(),
                history: DeviationHistory::new(),
                liveness_timer: None,
                broadcast_timer: None,
                subscription: None,
            })
        });

        {
            let mut this = lock(&controller);
            let liveness_handler = this.timer_handler(Self::handle_liveness_timer);
            this.liveness_timer =
                Some(provider.register_timer(liveness_handler, config.liveness_interval)?);
            let frame_handler = this.frame_handler();
            this.subscription = Some(provider.subscribe_frames(frame_handler));

            log::info!("Started on {own_address}, waiting for a master");
            this.report();
        }

        Ok(controller)
    }

    fn timer_handler(&self, event: fn(&mut Self) -> Result<(), TransportError>) -> TimerHandler {
        let this = self.this.clone();
        Box::new(move || match this.upgrade() {
            Some(controller) => event(&mut lock(&controller)),
            None => Ok(()),
        })
    }

    fn frame_handler(&self) -> FrameHandler {
        let this = self.this.clone();
        Box::new(move |frame| match this.upgrade() {
            Some(controller) => lock(&controller).handle_frame(frame),
            None => Ok(()),
        })
    }

    /// Liveness check, called every
    /// [`liveness_interval`](ControllerConfig::liveness_interval).
    pub fn handle_liveness_timer(&mut self) -> Result<(), TransportError> {
        if self.state.role == Role::Master {
            return Ok(());
        }

        if self.state.chosen_master.is_no_master() {
            self.enable_master_mode()?;
            self.report();
            return Ok(());
        }

        let now = self.provider.monotonic_now()?;
        if now.duration_since(self.state.last_master_pulse) >= self.config.liveness_timeout {
            log::info!(
                "Master {} silent for {}s, starting re-election",
                self.state.chosen_master,
                (now - self.state.last_master_pulse).as_secs_f64()
            );
            self.state.chosen_master = HardwareAddress::NO_MASTER;
            self.state.last_master_pulse = now;
            self.report();
        }

        Ok(())
    }

    /// Send a pulse with the current time, called every
    /// [`broadcast_interval`](ControllerConfig::broadcast_interval) while
    /// master.
    pub fn handle_broadcast_timer(&mut self) -> Result<(), TransportError> {
        let now = self.provider.utc_now()?;
        let pulse = TimeSignalPulse::from_calendar(now);

        self.provider.send_frame(&pulse.encode())?;
        log::trace!("Sent pulse {now}");

        self.state.last_sent = now;
        self.report();

        Ok(())
    }

    /// Handle a received frame. Frames that do not decode as a pulse are
    /// ignored.
    pub fn handle_frame(&mut self, frame: &LinkFrame) -> Result<(), TransportError> {
        let received_at = self.provider.utc_now()?;

        let Some(pulse) = TimeSignalPulse::decode(frame) else {
            log::trace!("Ignoring malformed frame from {}", frame.source);
            return Ok(());
        };

        // the sentinel can never be a sender, it would match "no master"
        if pulse.source.is_no_master() {
            log::debug!("Ignoring pulse with broadcast source address");
            return Ok(());
        }

        self.handle_pulse(pulse, received_at)
    }

    /// Handle a decoded pulse that arrived when the local UTC clock read
    /// `received_at`.
    pub fn handle_pulse(
        &mut self,
        pulse: TimeSignalPulse,
        received_at: CalendarTime,
    ) -> Result<(), TransportError> {
        let source = pulse.source;
        log::trace!("Pulse from {source}: {}", pulse.calendar());

        // Only adopt a master that beats both the current choice and
        // ourselves.
        if source < self.state.chosen_master && source < self.own_address {
            self.disable_master_mode()?;
            log::info!("Following master {source}");
            self.state.chosen_master = source;
        }

        if source == self.state.chosen_master {
            self.state.last_master_pulse = self.provider.monotonic_now()?;
            self.state.last_received = pulse.calendar();

            let deviation = received_at.seconds_until(&pulse.calendar());
            log::debug!("Deviation from {source}: {deviation:e}s");
            self.history.record(deviation);
        }

        self.report();

        Ok(())
    }

    fn enable_master_mode(&mut self) -> Result<(), TransportError> {
        if self.state.role == Role::Master {
            return Ok(());
        }

        log::info!("No master present, becoming master");

        self.state.role = Role::Master;
        self.state.last_sent = self.provider.utc_now()?;

        let handler = self.timer_handler(Self::handle_broadcast_timer);
        self.broadcast_timer = Some(
            self.provider
                .register_timer(handler, self.config.broadcast_interval)?,
        );

        Ok(())
    }

    fn disable_master_mode(&mut self) -> Result<(), TransportError> {
        if self.state.role != Role::Master {
            return Ok(());
        }

        log::info!("Lower addressed node present, leaving master mode");

        self.state.role = Role::Slave;
        self.broadcast_timer = None;

        self.state.chosen_master = HardwareAddress::NO_MASTER;
        self.state.last_master_pulse = self.provider.monotonic_now()?;
        self.state.last_received = CalendarTime::default();

        Ok(())
    }

    fn report(&self) {
        self.provider.report(&self.status());
    }

    /// Snapshot of the current state for reporting
    pub fn status(&self) -> Status {
        let chosen_master = match self.state.role {
            Role::Slave if !self.state.chosen_master.is_no_master() => {
                Some(self.state.chosen_master)
            }
            _ => None,
        };

        Status {
            role: self.state.role,
            chosen_master,
            last_sent: self.state.last_sent,
            last_received: self.state.last_received,
            current_deviation: self.history.current(),
            statistics: self.history,
        }
    }

    pub fn role(&self) -> Role {
        self.state.role
    }

    pub fn chosen_master(&self) -> HardwareAddress {
        self.state.chosen_master
    }

    pub fn election_state(&self) -> &ElectionState {
        &self.state
    }

    pub fn history(&self) -> &DeviationHistory {
        &self.history
    }

    pub fn config(&self) -> &ControllerConfig {
        &self.config
    }

    pub fn own_address(&self) -> HardwareAddress {
        self.own_address
    }
}
