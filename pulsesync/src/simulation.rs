//! An in-memory network of simulated nodes
//!
//! All nodes share one simulated monotonic clock that only moves when
//! [`SimulatedNetwork::advance`] is called. Frames are delivered without
//! latency to every node but the sender. Each node's wall clock is the shared
//! clock plus a configurable offset, starting just before a new year so that
//! day and year boundaries get exercised.

use core::time::Duration;
use std::{
    io,
    sync::{
        atomic::{AtomicBool, AtomicUsize, Ordering},
        Arc, Mutex, MutexGuard,
    },
};

use crate::{
    provider::{Provider, Registry},
    time::{CalendarTime, LinearTime, NANOS_PER_SECOND},
    HardwareAddress, LinkFrame, Status, TransportError,
};

/// 2024-12-31T23:59:58Z
pub const DEFAULT_EPOCH: u64 = 1_735_689_598;

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

#[derive(Debug, Default)]
struct SimulatedClock {
    now: Mutex<LinearTime>,
}

impl SimulatedClock {
    fn now(&self) -> LinearTime {
        *lock(&self.now)
    }

    fn advance(&self, step: Duration) -> LinearTime {
        let mut now = lock(&self.now);
        *now = *now + step;
        *now
    }
}

/// The [`Provider`] of a single simulated node
#[derive(Debug)]
pub struct SimulatedProvider {
    registry: Arc<Registry>,
    clock: Arc<SimulatedClock>,
    wire: Arc<Mutex<Vec<LinkFrame>>>,
    address: HardwareAddress,
    epoch: u64,
    clock_offset_nanos: i64,
    muted: AtomicBool,
    sent: AtomicUsize,
    reports: Mutex<Vec<Status>>,
    fail_sends: AtomicBool,
}

impl SimulatedProvider {
    /// Cut the node off the network: nothing it sends arrives anywhere and
    /// nothing reaches it.
    pub fn mute(&self) {
        self.muted.store(true, Ordering::SeqCst);
    }

    pub fn unmute(&self) {
        self.muted.store(false, Ordering::SeqCst);
    }

    pub fn is_muted(&self) -> bool {
        self.muted.load(Ordering::SeqCst)
    }

    /// Make every following [`send_frame`](Provider::send_frame) fail
    pub fn fail_sends(&self) {
        self.fail_sends.store(true, Ordering::SeqCst);
    }

    /// Number of frames this node sent, muted or not
    pub fn sent_count(&self) -> usize {
        self.sent.load(Ordering::SeqCst)
    }

    pub fn last_status(&self) -> Option<Status> {
        lock(&self.reports).last().copied()
    }

    /// All status reports in order
    pub fn reports(&self) -> Vec<Status> {
        lock(&self.reports).clone()
    }
}

impl Provider for SimulatedProvider {
    fn registry(&self) -> &Arc<Registry> {
        &self.registry
    }

    fn monotonic_now(&self) -> Result<LinearTime, TransportError> {
        Ok(self.clock.now())
    }

    fn utc_now(&self) -> Result<CalendarTime, TransportError> {
        let now = self.clock.now();
        let nanos = (self.epoch as i128 + now.seconds() as i128) * NANOS_PER_SECOND as i128
            + now.subsec_nanos() as i128
            + self.clock_offset_nanos as i128;

        let nanos = nanos.max(0);
        let seconds = (nanos / NANOS_PER_SECOND as i128) as u64;
        let subsec = (nanos % NANOS_PER_SECOND as i128) as u32;

        Ok(CalendarTime::from_unix_time(seconds, subsec))
    }

    fn own_address(&self) -> HardwareAddress {
        self.address
    }

    fn send_frame(&self, frame: &LinkFrame) -> Result<(), TransportError> {
        if self.fail_sends.load(Ordering::SeqCst) {
            return Err(TransportError::new(
                "sendto",
                io::Error::from(io::ErrorKind::NetworkDown),
            ));
        }

        self.sent.fetch_add(1, Ordering::SeqCst);
        if self.is_muted() {
            return Ok(());
        }

        let mut frame = frame.clone();
        if frame.source == HardwareAddress::ZERO {
            frame.source = self.address;
        }
        lock(&self.wire).push(frame);

        Ok(())
    }

    fn report(&self, status: &Status) {
        lock(&self.reports).push(*status);
    }
}

/// A broadcast segment connecting [`SimulatedProvider`]s
#[derive(Debug)]
pub struct SimulatedNetwork {
    clock: Arc<SimulatedClock>,
    wire: Arc<Mutex<Vec<LinkFrame>>>,
    nodes: Vec<Arc<SimulatedProvider>>,
    epoch: u64,
}

impl Default for SimulatedNetwork {
    fn default() -> Self {
        Self::new()
    }
}

impl SimulatedNetwork {
    /// Resolution at which simulated time advances
    pub const TICK: Duration = Duration::from_millis(10);

    pub fn new() -> Self {
        Self::with_epoch(DEFAULT_EPOCH)
    }

    /// A network whose monotonic zero is `epoch` seconds after the unix epoch
    pub fn with_epoch(epoch: u64) -> Self {
        Self {
            clock: Arc::default(),
            wire: Arc::default(),
            nodes: Vec::new(),
            epoch,
        }
    }

    /// Attach a node whose wall clock is `clock_offset` seconds ahead of the
    /// network's (negative for behind).
    pub fn add_node(
        &mut self,
        address: HardwareAddress,
        clock_offset: f64,
    ) -> Arc<SimulatedProvider> {
        let node = Arc::new(SimulatedProvider {
            registry: Arc::new(Registry::new()),
            clock: self.clock.clone(),
            wire: self.wire.clone(),
            address,
            epoch: self.epoch,
            clock_offset_nanos: (clock_offset * 1e9).round() as i64,
            muted: AtomicBool::new(false),
            sent: AtomicUsize::new(0),
            reports: Mutex::new(Vec::new()),
            fail_sends: AtomicBool::new(false),
        });

        self.nodes.push(node.clone());
        node
    }

    pub fn now(&self) -> LinearTime {
        self.clock.now()
    }

    /// Run the network for `duration`, in steps of at most [`Self::TICK`].
    ///
    /// Every step first fires the expired timers of each node, one at a time,
    /// then delivers all frames sent so far, including frames sent by
    /// receivers in response.
    pub fn advance(&self, duration: Duration) -> Result<(), TransportError> {
        let end = self.clock.now() + duration;

        while self.clock.now() < end {
            let step = end.duration_since(self.clock.now()).min(Self::TICK);
            let now = self.clock.advance(step);

            for node in &self.nodes {
                while node.registry.fire_expired_timer(now)? {}
            }

            self.deliver()?;
        }

        Ok(())
    }

    fn deliver(&self) -> Result<(), TransportError> {
        loop {
            let frames = core::mem::take(&mut *lock(&self.wire));
            if frames.is_empty() {
                return Ok(());
            }

            for frame in &frames {
                for node in &self.nodes {
                    if node.address != frame.source && !node.is_muted() {
                        node.registry.dispatch_frame(frame)?;
                    }
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::TimeSignalPulse;

    const A: HardwareAddress = HardwareAddress([0x02, 0, 0, 0, 0, 0x01]);
    const B: HardwareAddress = HardwareAddress([0x02, 0, 0, 0, 0, 0x02]);

    #[test]
    fn wall_clock_follows_offset() {
        let mut network = SimulatedNetwork::new();
        let ahead = network.add_node(A, 2.5);
        let behind = network.add_node(B, -0.25);

        assert_eq!(
            ahead.utc_now().unwrap(),
            CalendarTime::new(2025, 0, 0, 500_000_000)
        );
        assert_eq!(
            behind.utc_now().unwrap(),
            CalendarTime::new(2024, 365, 86_397, 750_000_000)
        );

        network.advance(Duration::from_millis(1234)).unwrap();
        assert_eq!(network.now(), LinearTime::from_millis(1234));
        assert_eq!(
            ahead.monotonic_now().unwrap(),
            behind.monotonic_now().unwrap()
        );
    }

    #[test]
    fn frames_reach_other_nodes_with_source() {
        let mut network = SimulatedNetwork::new();
        let a = network.add_node(A, 0.0);
        let b = network.add_node(B, 0.0);

        let received = Arc::new(Mutex::new(Vec::new()));
        for node in [&a, &b] {
            let received = received.clone();
            let address = node.own_address();
            let _ = node.registry().add_subscriber(Box::new(move |frame| {
                lock(&received).push((address, frame.source));
                Ok(())
            }));
        }

        a.send_frame(&TimeSignalPulse::default().encode()).unwrap();
        network.advance(SimulatedNetwork::TICK).unwrap();

        assert_eq!(*lock(&received), vec![(B, A)]);
    }

    #[test]
    fn muted_node_is_isolated() {
        let mut network = SimulatedNetwork::new();
        let a = network.add_node(A, 0.0);
        let b = network.add_node(B, 0.0);

        let received = Arc::new(AtomicUsize::new(0));
        for node in [&a, &b] {
            let received = received.clone();
            let _ = node.registry().add_subscriber(Box::new(move |_| {
                received.fetch_add(1, Ordering::SeqCst);
                Ok(())
            }));
        }

        a.mute();
        a.send_frame(&TimeSignalPulse::default().encode()).unwrap();
        b.send_frame(&TimeSignalPulse::default().encode()).unwrap();
        network.advance(SimulatedNetwork::TICK).unwrap();

        assert_eq!(received.load(Ordering::SeqCst), 0);
        assert_eq!(a.sent_count(), 1);
    }

    #[test]
    fn send_failure_surfaces_from_advance() {
        let mut network = SimulatedNetwork::new();
        let a = network.add_node(A, 0.0);
        let _controller =
            crate::SyncController::start(a.clone(), crate::config::ControllerConfig::default())
                .unwrap();

        a.fail_sends();
        // promotion at 1.5s, first pulse at 2.5s fails
        let error = network.advance(Duration::from_secs(3)).unwrap_err();
        assert_eq!(error.operation(), "sendto");
        assert_eq!(error.io_error().kind(), io::ErrorKind::NetworkDown);
    }
}
