//! Link-layer frames as exchanged with the transport

use arrayvec::ArrayVec;

use crate::HardwareAddress;

/// Largest payload carried for this protocol. Frames received with a longer
/// payload are truncated by the transport.
pub const MAX_PAYLOAD_LEN: usize = 46;

/// The 16 bit protocol type tag of an Ethernet II frame
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct EtherType(pub u16);

impl EtherType {
    /// The ethertype on which time signal pulses are exchanged (IEEE 802
    /// local experimental ethertype 2).
    pub const PULSE_SYNC: Self = Self(0x88b6);

    pub fn to_be_bytes(self) -> [u8; 2] {
        self.0.to_be_bytes()
    }
}

/// An Ethernet II frame as seen at the transport boundary.
///
/// On receipt the transport fills in `source` and `ether_type`; the
/// destination may be left zero. On send, the transport replaces a zero
/// `source` with the address of the interface.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LinkFrame {
    pub destination: HardwareAddress,
    pub source: HardwareAddress,
    pub ether_type: EtherType,
    pub payload: ArrayVec<u8, MAX_PAYLOAD_LEN>,
}

impl LinkFrame {
    /// Build a frame from raw payload bytes, truncating anything beyond
    /// [`MAX_PAYLOAD_LEN`].
    pub fn new(
        destination: HardwareAddress,
        source: HardwareAddress,
        ether_type: EtherType,
        payload: &[u8],
    ) -> Self {
        let len = payload.len().min(MAX_PAYLOAD_LEN);

        Self {
            destination,
            source,
            ether_type,
            payload: payload[..len].iter().copied().collect(),
        }
    }

    pub fn is_pulse_sync(&self) -> bool {
        self.ether_type == EtherType::PULSE_SYNC
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_truncates_long_payload() {
        let frame = LinkFrame::new(
            HardwareAddress::BROADCAST,
            HardwareAddress::ZERO,
            EtherType::PULSE_SYNC,
            &[7; 100],
        );
        assert_eq!(frame.payload.len(), MAX_PAYLOAD_LEN);
        assert!(frame.is_pulse_sync());
    }

    #[test]
    fn foreign_ethertype() {
        let frame = LinkFrame::new(
            HardwareAddress::BROADCAST,
            HardwareAddress::ZERO,
            EtherType(0x0800),
            &[],
        );
        assert!(!frame.is_pulse_sync());
        assert!(frame.payload.is_empty());
    }
}
