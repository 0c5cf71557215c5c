//! The time signal pulse and its 14 byte wire format

use crate::{
    frame::{EtherType, LinkFrame},
    time::CalendarTime,
    HardwareAddress,
};

/// Marker at the start of every pulse payload
pub const PULSE_MAGIC: u16 = 0x0133;

/// Size of a serialized pulse payload
pub const PULSE_WIRE_SIZE: usize = 14;

/// A broadcast carrying the sender's wall-clock time.
///
/// Wire layout of the payload, all fields big-endian:
///
/// | offset | size | field         |
/// |--------|------|---------------|
/// | 0      | 2    | magic 0x0133  |
/// | 2      | 2    | year          |
/// | 4      | 2    | day of year   |
/// | 6      | 4    | second of day |
/// | 10     | 4    | nanosecond    |
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct TimeSignalPulse {
    /// Sender of the pulse. Only meaningful on received pulses, filled in
    /// from the frame by [`decode`](Self::decode).
    pub source: HardwareAddress,
    pub year: u16,
    pub day_of_year: u16,
    pub second_of_day: u32,
    pub nanosecond: u32,
}

impl TimeSignalPulse {
    pub fn from_calendar(time: CalendarTime) -> Self {
        Self {
            source: HardwareAddress::ZERO,
            year: time.year,
            day_of_year: time.day_of_year,
            second_of_day: time.second_of_day,
            nanosecond: time.nanosecond,
        }
    }

    pub fn calendar(&self) -> CalendarTime {
        CalendarTime {
            year: self.year,
            day_of_year: self.day_of_year,
            second_of_day: self.second_of_day,
            nanosecond: self.nanosecond,
        }
    }

    pub(crate) fn serialize(&self, buffer: &mut [u8; PULSE_WIRE_SIZE]) {
        buffer[0..2].copy_from_slice(&PULSE_MAGIC.to_be_bytes());
        buffer[2..4].copy_from_slice(&self.year.to_be_bytes());
        buffer[4..6].copy_from_slice(&self.day_of_year.to_be_bytes());
        buffer[6..10].copy_from_slice(&self.second_of_day.to_be_bytes());
        buffer[10..14].copy_from_slice(&self.nanosecond.to_be_bytes());
    }

    /// Serialize into a broadcast frame on the pulse ethertype.
    ///
    /// The source address is left as `00:00:00:00:00:00`, the transport
    /// fills in its own.
    pub fn encode(&self) -> LinkFrame {
        let mut buffer = [0; PULSE_WIRE_SIZE];
        self.serialize(&mut buffer);

        LinkFrame::new(
            HardwareAddress::BROADCAST,
            HardwareAddress::ZERO,
            EtherType::PULSE_SYNC,
            &buffer,
        )
    }

    /// Deserialize a pulse captured from the wire.
    ///
    /// Returns `None` for frames of another ethertype, payloads shorter than
    /// [`PULSE_WIRE_SIZE`] and payloads not starting with [`PULSE_MAGIC`].
    /// Bytes beyond the pulse (Ethernet padding) are ignored.
    pub fn decode(frame: &LinkFrame) -> Option<Self> {
        if !frame.is_pulse_sync() {
            return None;
        }

        let buffer: &[u8; PULSE_WIRE_SIZE] = frame.payload.get(..PULSE_WIRE_SIZE)?.try_into().ok()?;

        if u16::from_be_bytes([buffer[0], buffer[1]]) != PULSE_MAGIC {
            return None;
        }

        Some(Self {
            source: frame.source,
            year: u16::from_be_bytes([buffer[2], buffer[3]]),
            day_of_year: u16::from_be_bytes([buffer[4], buffer[5]]),
            second_of_day: u32::from_be_bytes([buffer[6], buffer[7], buffer[8], buffer[9]]),
            nanosecond: u32::from_be_bytes([buffer[10], buffer[11], buffer[12], buffer[13]]),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn received(mut frame: LinkFrame, source: HardwareAddress) -> LinkFrame {
        frame.source = source;
        frame
    }

    #[test]
    fn wire_layout() {
        let pulse = TimeSignalPulse {
            source: HardwareAddress::ZERO,
            year: 2024,
            day_of_year: 59,
            second_of_day: 86399,
            nanosecond: 999_999_999,
        };

        let frame = pulse.encode();
        assert_eq!(frame.destination, HardwareAddress::BROADCAST);
        assert_eq!(frame.source, HardwareAddress::ZERO);
        assert_eq!(frame.ether_type, EtherType(0x88b6));
        assert_eq!(
            frame.payload.as_slice(),
            &[
                0x01, 0x33, // magic
                0x07, 0xe8, // year
                0x00, 0x3b, // day
                0x00, 0x01, 0x51, 0x7f, // second
                0x3b, 0x9a, 0xc9, 0xff, // nanosecond
            ]
        );
    }

    #[test]
    fn decode_reproduces_fields() {
        let source = HardwareAddress([0x02, 0, 0, 0, 0, 0x01]);
        let values = [
            (0, 0, 0, 0),
            (1970, 0, 0, 0),
            (2000, 365, 86399, 999_999_999),
            (u16::MAX, u16::MAX, u32::MAX, u32::MAX),
        ];

        for (year, day_of_year, second_of_day, nanosecond) in values {
            let pulse = TimeSignalPulse {
                source,
                year,
                day_of_year,
                second_of_day,
                nanosecond,
            };
            let decoded = TimeSignalPulse::decode(&received(pulse.encode(), source)).unwrap();
            assert_eq!(decoded, pulse);
        }
    }

    #[test]
    fn decode_ignores_padding() {
        let pulse = TimeSignalPulse::from_calendar(CalendarTime::new(2023, 10, 20, 30));
        let mut frame = pulse.encode();
        frame.payload.extend([0u8; 32]);

        let decoded = TimeSignalPulse::decode(&frame).unwrap();
        assert_eq!(decoded.calendar(), CalendarTime::new(2023, 10, 20, 30));
    }

    #[test]
    fn decode_rejects_short_payload() {
        let frame = TimeSignalPulse::default().encode();
        for len in 0..PULSE_WIRE_SIZE {
            let short = LinkFrame::new(
                frame.destination,
                frame.source,
                frame.ether_type,
                &frame.payload[..len],
            );
            assert_eq!(TimeSignalPulse::decode(&short), None);
        }
    }

    #[test]
    fn decode_rejects_foreign_ethertype() {
        let mut frame = TimeSignalPulse::default().encode();
        frame.ether_type = EtherType(0x88f7);
        assert_eq!(TimeSignalPulse::decode(&frame), None);
    }

    #[test]
    fn decode_rejects_bad_magic() {
        let mut frame = TimeSignalPulse::default().encode();
        frame.payload[1] = 0x34;
        assert_eq!(TimeSignalPulse::decode(&frame), None);

        let mut frame = TimeSignalPulse::default().encode();
        frame.payload[0] = 0x33;
        frame.payload[1] = 0x01;
        assert_eq!(TimeSignalPulse::decode(&frame), None);
    }
}
