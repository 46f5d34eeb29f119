//! Encapsulates a network interface card.
//!
//! The IGMP machinery needs only two services from the layers below it: sending an IGMP message
//! in an IPv4 datagram with the right header options, and programming the hardware multicast
//! reception filter. Both are captured by the [`Device`] trait.
//!
//! Also permits software emulation of a device, see [`loopback::Loopback`].
//!
//! [`Device`]: trait.Device.html
//! [`loopback::Loopback`]: loopback/struct.Loopback.html
use core::fmt;

use crate::wire::{EthernetAddress, Ipv4Address};

pub mod loopback;

/// The errors reported by a device.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Error {
    /// No transmit buffer or filter slot was available.
    ///
    /// The caller may retry at a later point, the operation had no effect.
    Exhausted,

    /// The device does not support the operation.
    Illegal,
}

/// The result type of device operations.
pub type Result<T> = core::result::Result<T, Error>;

/// Information for the IP layer on how to encapsulate an outgoing message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Meta {
    /// The source address of the datagram.
    ///
    /// Unspecified when the interface has no address yet.
    pub src_addr: Ipv4Address,
    /// The destination address of the datagram.
    pub dst_addr: Ipv4Address,
    /// The time-to-live to use.
    pub hop_limit: u8,
    /// Whether to include an IP Router Alert option.
    pub router_alert: bool,
    /// The type-of-service octet.
    pub tos: u8,
}

/// A layer 2 device with an IPv4 send path.
pub trait Device {
    /// Encapsulate and queue an IGMP message.
    ///
    /// The device must not block. If no buffer is available it fails immediately.
    fn send(&mut self, meta: Meta, message: &[u8]) -> Result<()>;

    /// Start receiving frames for a multicast MAC address.
    ///
    /// Different IPv4 groups may map to the same MAC address so implementations should count
    /// acceptance requests and only stop receiving when all of them were dropped.
    fn accept_multicast(&mut self, addr: EthernetAddress) -> Result<()>;

    /// Undo one previous `accept_multicast` for the address.
    fn drop_multicast(&mut self, addr: EthernetAddress) -> Result<()>;
}

impl<D: Device + ?Sized> Device for &'_ mut D {
    fn send(&mut self, meta: Meta, message: &[u8]) -> Result<()> {
        (**self).send(meta, message)
    }

    fn accept_multicast(&mut self, addr: EthernetAddress) -> Result<()> {
        (**self).accept_multicast(addr)
    }

    fn drop_multicast(&mut self, addr: EthernetAddress) -> Result<()> {
        (**self).drop_multicast(addr)
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Error::Exhausted => write!(f, "device resources exhausted"),
            Error::Illegal => write!(f, "operation not supported by the device"),
        }
    }
}

#[cfg(feature = "std")]
impl std::error::Error for Error { }
