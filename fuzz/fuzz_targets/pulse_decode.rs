#![no_main]

use libfuzzer_sys::fuzz_target;

use pulsesync::{EtherType, HardwareAddress, LinkFrame, TimeSignalPulse, PULSE_WIRE_SIZE};

fuzz_target!(|data: &[u8]| {
    let source = HardwareAddress([0x02, 0, 0, 0, 0, 0x01]);
    let frame = LinkFrame::new(HardwareAddress::BROADCAST, source, EtherType::PULSE_SYNC, data);

    if let Some(pulse) = TimeSignalPulse::decode(&frame) {
        assert_eq!(pulse.source, source);

        // everything past the pulse is padding
        let encoded = pulse.encode();
        assert_eq!(encoded.payload[..], frame.payload[..PULSE_WIRE_SIZE]);
    }
});
