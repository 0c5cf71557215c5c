//! [`Provider`] implementation on a Linux packet socket

use std::{convert::Infallible, sync::Arc};

use pulsesync::{
    provider::Registry, CalendarTime, EtherType, HardwareAddress, LinearTime, LinkFrame, Provider,
    Status, TransportError,
};

use crate::{
    clock::LinuxClock,
    network::{InterfaceName, PacketSocket},
    observer::StatusObserver,
};

/// Timers, the pulse socket, the system clocks and the status display of
/// one interface
#[derive(Debug)]
pub struct LinuxProvider {
    registry: Arc<Registry>,
    socket: PacketSocket,
    clock: LinuxClock,
    observer: StatusObserver,
}

impl LinuxProvider {
    /// Open the pulse socket on `interface`. Must be called from within a
    /// tokio runtime.
    pub fn open(interface: &InterfaceName, observer: StatusObserver) -> Result<Self, TransportError> {
        let socket = PacketSocket::open(interface, EtherType::PULSE_SYNC)?;

        Ok(Self {
            registry: Arc::new(Registry::new()),
            socket,
            clock: LinuxClock,
            observer,
        })
    }

    /// Fire expired timers one at a time until none is due
    fn fire_expired_timers(&self) -> Result<LinearTime, TransportError> {
        loop {
            let now = self.clock.monotonic_now()?;
            if !self.registry.fire_expired_timer(now)? {
                return Ok(now);
            }
        }
    }

    /// Drive timers and frame reception. Only returns on failure.
    pub async fn run(&self) -> Result<Infallible, TransportError> {
        loop {
            let now = self.fire_expired_timers()?;
            let wait = self.registry.next_wait(now);

            tokio::select! {
                () = tokio::time::sleep(wait) => {}
                frame = self.socket.recv() => {
                    let frame = frame?;
                    log::trace!("Received {} bytes from {}", frame.payload.len(), frame.source);
                    self.registry.dispatch_frame(&frame)?;
                }
            }
        }
    }
}

impl Provider for LinuxProvider {
    fn registry(&self) -> &Arc<Registry> {
        &self.registry
    }

    fn monotonic_now(&self) -> Result<LinearTime, TransportError> {
        self.clock.monotonic_now()
    }

    fn utc_now(&self) -> Result<CalendarTime, TransportError> {
        self.clock.utc_now()
    }

    fn own_address(&self) -> HardwareAddress {
        self.socket.hardware_address()
    }

    // the kernel fills in the source address
    fn send_frame(&self, frame: &LinkFrame) -> Result<(), TransportError> {
        self.socket.send(frame)
    }

    fn report(&self, status: &Status) {
        self.observer.observe(status);
    }
}
