//! Link-layer networking on Linux

use std::{fmt, io, str::FromStr};

use nix::{ifaddrs::getifaddrs, net::if_::if_nametoindex};
use pulsesync::{HardwareAddress, TransportError};

pub mod linux;

pub use linux::PacketSocket;

/// Name of a network interface, as accepted by `if_nametoindex`
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct InterfaceName {
    bytes: [u8; libc::IFNAMSIZ],
}

impl InterfaceName {
    pub const LOOPBACK: Self = {
        let mut bytes = [0; libc::IFNAMSIZ];
        bytes[0] = b'l';
        bytes[1] = b'o';
        Self { bytes }
    };

    pub fn as_str(&self) -> &str {
        let len = self
            .bytes
            .iter()
            .position(|byte| *byte == 0)
            .unwrap_or(self.bytes.len());

        // only ever built from a &str, cut at a char boundary
        std::str::from_utf8(&self.bytes[..len]).unwrap_or_default()
    }

    /// Kernel index of the interface
    pub fn index(&self) -> Result<libc::c_int, TransportError> {
        let index = if_nametoindex(self.as_str())
            .map_err(|errno| TransportError::new("if_nametoindex", errno.into()))?;

        libc::c_int::try_from(index).map_err(|_| {
            TransportError::new(
                "if_nametoindex",
                io::Error::new(io::ErrorKind::InvalidData, "interface index out of range"),
            )
        })
    }

    /// Hardware address of the interface, from its link-layer entry
    pub fn hardware_address(&self) -> Result<HardwareAddress, TransportError> {
        let addresses =
            getifaddrs().map_err(|errno| TransportError::new("getifaddrs", errno.into()))?;

        addresses
            .filter(|entry| entry.interface_name == self.as_str())
            .find_map(|entry| entry.address?.as_link_addr()?.addr())
            .map(HardwareAddress)
            .ok_or_else(|| {
                TransportError::new(
                    "getifaddrs",
                    io::Error::new(io::ErrorKind::NotFound, "interface has no hardware address"),
                )
            })
    }
}

impl fmt::Debug for InterfaceName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("InterfaceName").field(&self.as_str()).finish()
    }
}

impl fmt::Display for InterfaceName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum InterfaceNameError {
    #[error("interface name is empty")]
    Empty,
    #[error("interface name is longer than {} bytes", libc::IFNAMSIZ - 1)]
    TooLong,
    #[error("interface name contains a nul byte")]
    ContainsNul,
}

impl FromStr for InterfaceName {
    type Err = InterfaceNameError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.is_empty() {
            return Err(InterfaceNameError::Empty);
        }

        // one byte for the terminator
        if s.len() >= libc::IFNAMSIZ {
            return Err(InterfaceNameError::TooLong);
        }

        if s.bytes().any(|byte| byte == 0) {
            return Err(InterfaceNameError::ContainsNul);
        }

        let mut bytes = [0; libc::IFNAMSIZ];
        bytes[..s.len()].copy_from_slice(s.as_bytes());

        Ok(Self { bytes })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_interface_name() {
        let name: InterfaceName = "enp0s31f6".parse().unwrap();
        assert_eq!(name.as_str(), "enp0s31f6");
        assert_eq!(name.to_string(), "enp0s31f6");
        assert_eq!("lo".parse::<InterfaceName>().unwrap(), InterfaceName::LOOPBACK);
    }

    #[test]
    fn loopback_lookup() {
        assert!(InterfaceName::LOOPBACK.index().unwrap() > 0);
        assert_eq!(
            InterfaceName::LOOPBACK.hardware_address().unwrap(),
            HardwareAddress::ZERO
        );
    }

    #[test]
    fn missing_interface_lookup() {
        let name: InterfaceName = "pulsesync-none".parse().unwrap();

        let error = name.index().unwrap_err();
        assert_eq!(error.operation(), "if_nametoindex");

        let error = name.hardware_address().unwrap_err();
        assert_eq!(error.io_error().kind(), io::ErrorKind::NotFound);
    }

    #[test]
    fn reject_invalid_names() {
        assert_eq!("".parse::<InterfaceName>(), Err(InterfaceNameError::Empty));
        assert_eq!(
            "a-very-long-interface".parse::<InterfaceName>(),
            Err(InterfaceNameError::TooLong)
        );
        assert_eq!(
            "eth\00".parse::<InterfaceName>(),
            Err(InterfaceNameError::ContainsNul)
        );

        // 15 bytes is the longest the kernel accepts
        assert!("abcdefghijklmno".parse::<InterfaceName>().is_ok());
        assert!("abcdefghijklmnop".parse::<InterfaceName>().is_err());
    }
}
