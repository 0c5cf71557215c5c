//! Datagram packet socket (`AF_PACKET`, `SOCK_DGRAM`) bound to one interface
//!
//! The kernel builds and strips the Ethernet header; the socket sends and
//! receives bare payloads, with addresses and ethertype carried in a
//! `sockaddr_ll`. These are the only raw syscalls of the daemon.

use std::{
    io, mem,
    os::fd::{AsRawFd, FromRawFd, OwnedFd, RawFd},
};

use pulsesync::{EtherType, HardwareAddress, LinkFrame, TransportError};
use tokio::io::{unix::AsyncFd, Interest};

use super::InterfaceName;

/// Largest Ethernet payload
const RECEIVE_BUFFER_LEN: usize = 1500;

fn cvt(result: libc::c_int, operation: &'static str) -> Result<libc::c_int, TransportError> {
    if result == -1 {
        Err(TransportError::last_os_error(operation))
    } else {
        Ok(result)
    }
}

fn link_address(
    interface_index: libc::c_int,
    ether_type: EtherType,
    destination: HardwareAddress,
) -> libc::sockaddr_ll {
    let mut sll_addr = [0; 8];
    sll_addr[..6].copy_from_slice(&destination.octets());

    libc::sockaddr_ll {
        sll_family: libc::AF_PACKET as libc::c_ushort,
        sll_protocol: ether_type.0.to_be(),
        sll_ifindex: interface_index,
        sll_hatype: 0,
        sll_pkttype: 0,
        sll_halen: 6,
        sll_addr,
    }
}

fn recv_from(fd: RawFd) -> io::Result<LinkFrame> {
    let mut buffer = [0u8; RECEIVE_BUFFER_LEN];
    // SAFETY: sockaddr_ll is plain old data, all zeroes is a valid value
    let mut address: libc::sockaddr_ll = unsafe { mem::zeroed() };
    let mut address_len = mem::size_of::<libc::sockaddr_ll>() as libc::socklen_t;

    // SAFETY: buffer and address are valid for writes of the passed lengths
    let received = unsafe {
        libc::recvfrom(
            fd,
            buffer.as_mut_ptr().cast(),
            buffer.len(),
            0,
            (&mut address as *mut libc::sockaddr_ll).cast(),
            &mut address_len,
        )
    };

    if received < 0 {
        return Err(io::Error::last_os_error());
    }

    let mut source = [0; 6];
    source.copy_from_slice(&address.sll_addr[..6]);

    Ok(LinkFrame::new(
        HardwareAddress::ZERO,
        HardwareAddress(source),
        EtherType(u16::from_be(address.sll_protocol)),
        &buffer[..received as usize],
    ))
}

/// A non-blocking packet socket registered with the tokio reactor
#[derive(Debug)]
pub struct PacketSocket {
    fd: AsyncFd<OwnedFd>,
    interface_index: libc::c_int,
    hardware_address: HardwareAddress,
}

impl PacketSocket {
    /// Open a socket on `interface` that only receives `ether_type`.
    ///
    /// Needs `CAP_NET_RAW` and a running tokio runtime.
    pub fn open(interface: &InterfaceName, ether_type: EtherType) -> Result<Self, TransportError> {
        log::info!("Opening packet socket on '{interface}'");

        let interface_index = interface.index()?;
        let hardware_address = interface.hardware_address()?;

        let protocol = ether_type.0.to_be() as libc::c_int;
        // SAFETY: no pointers are passed
        let fd = cvt(
            unsafe {
                libc::socket(
                    libc::AF_PACKET,
                    libc::SOCK_DGRAM | libc::SOCK_NONBLOCK | libc::SOCK_CLOEXEC,
                    protocol,
                )
            },
            "socket(AF_PACKET, SOCK_DGRAM)",
        )?;
        // SAFETY: fd was just created and is not owned by anything else
        let fd = unsafe { OwnedFd::from_raw_fd(fd) };

        // only receive from the requested interface
        let bind_address = link_address(interface_index, ether_type, HardwareAddress::ZERO);
        // SAFETY: bind_address is a valid sockaddr_ll of the passed length
        cvt(
            unsafe {
                libc::bind(
                    fd.as_raw_fd(),
                    (&bind_address as *const libc::sockaddr_ll).cast(),
                    mem::size_of::<libc::sockaddr_ll>() as libc::socklen_t,
                )
            },
            "bind",
        )?;

        let fd = AsyncFd::with_interest(fd, Interest::READABLE)
            .map_err(|error| TransportError::new("epoll_ctl", error))?;

        log::debug!("Interface {interface} has index {interface_index}, address {hardware_address}");

        Ok(Self {
            fd,
            interface_index,
            hardware_address,
        })
    }

    pub fn hardware_address(&self) -> HardwareAddress {
        self.hardware_address
    }

    /// Send the payload of `frame` to its destination. The source address is
    /// always the interface's own.
    pub fn send(&self, frame: &LinkFrame) -> Result<(), TransportError> {
        let address = link_address(self.interface_index, frame.ether_type, frame.destination);

        // SAFETY: payload and address are valid for reads of the passed
        // lengths
        let sent = unsafe {
            libc::sendto(
                self.fd.as_raw_fd(),
                frame.payload.as_ptr().cast(),
                frame.payload.len(),
                0,
                (&address as *const libc::sockaddr_ll).cast(),
                mem::size_of::<libc::sockaddr_ll>() as libc::socklen_t,
            )
        };

        if sent < 0 {
            return Err(TransportError::last_os_error("sendto"));
        }

        log::trace!("Sent {sent} bytes to {}", frame.destination);

        Ok(())
    }

    /// Wait for and receive the next frame. The destination of the returned
    /// frame is left zero.
    ///
    /// Cancel safe: dropping the future before completion loses no frame.
    pub async fn recv(&self) -> Result<LinkFrame, TransportError> {
        loop {
            let mut guard = self
                .fd
                .readable()
                .await
                .map_err(|error| TransportError::new("epoll_wait", error))?;

            match guard.try_io(|fd| recv_from(fd.as_raw_fd())) {
                Ok(result) => return result.map_err(|error| TransportError::new("recvfrom", error)),
                Err(_would_block) => continue,
            }
        }
    }
}
