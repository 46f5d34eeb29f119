//! The process logic of protocol layers.
//!
//! ## Layering
//!
//! Each protocol layer is split into two parts; the packet logic contained in `wire` and the
//! processing part in this module. The state of a layer is owned by one network interface and can
//! be modified by the user program while processing does not take place, similar to
//! reconfiguration on the OS level with utilities such as `ip maddr`.
//!
//! * [`mcast`] keeps the multicast reception state of an interface. It aggregates the filters of
//!   all local sockets into one filter per group, programs the MAC filter of the device and
//!   announces every change to the group management protocol.
//! * [`igmp`] is the host side of the group management protocol. It reports the reception state
//!   to multicast routers and answers their queries.
//! * [`interface`] bundles both for a single network interface.
//!
//! ## Receiving
//!
//! Inbound messages are dispatched to the protocol state machine by an [`igmp::Receiver`]. Every
//! validated message is passed on to an upper handler, the place where router or snooping logic
//! would attach.
//!
//! ## Sending
//!
//! All outbound traffic is fire-and-forget. An [`igmp::Sender`] encapsulates messages for the
//! device and a failure to send is logged but never reported to the caller, the protocol repairs
//! lost messages through its own retransmissions and queries.
//!
//! ## Time
//!
//! No layer reads a clock. The current time is an argument of every operation and all timers are
//! polled on [`interface::Interface::tick`].
//!
//! [`mcast`]: mcast/index.html
//! [`igmp`]: igmp/index.html
//! [`interface`]: interface/index.html
//! [`igmp::Receiver`]: igmp/struct.Receiver.html
//! [`igmp::Sender`]: igmp/struct.Sender.html
//! [`interface::Interface::tick`]: interface/struct.Interface.html#method.tick
use core::fmt;

pub mod igmp;
pub mod interface;
pub mod mcast;

/// The result type of synchronous layer operations.
pub type Result<T> = core::result::Result<T, Error>;

/// Errors of operations invoked directly by a user of a layer.
///
/// Problems with received messages are never reported this way, such messages are dropped.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Error {
    /// The address is not valid for the operation.
    ///
    /// Returned when joining or leaving an address that is not a multicast address.
    InvalidAddress,

    /// The action could not be completed because there were not enough resources.
    ///
    /// All slots of a fixed capacity table are in use. The operation had no effect.
    OutOfResources,

    /// The address is not known.
    ///
    /// Returned when leaving a group that was never joined.
    AddressNotFound,
}

/// A standard wrapper for a function implementing receive or send traits.
///
/// Keeps the type alias overhead low by providing a single wrapper type that implements the
/// handler traits for all layers, where applicable.
pub struct FnHandler<F>(pub F);

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Error::InvalidAddress => write!(f, "not a multicast address"),
            Error::OutOfResources => write!(f, "multicast table full"),
            Error::AddressNotFound => write!(f, "multicast group not joined"),
        }
    }
}

#[cfg(feature = "std")]
impl std::error::Error for Error { }
