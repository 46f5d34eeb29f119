//! The host side of the Internet Group Management Protocol.
//!
//! Implements the host behavior of IGMPv1 ([RFC 1112]), IGMPv2 ([RFC 2236]) and IGMPv3
//! ([RFC 3376]), including the compatibility modes that a version 3 host falls back to when older
//! queriers are present on the link.
//!
//! The state of one interface is a [`Host`]. It learns about reception state changes through the
//! [`mcast::StateChange`] trait, answers queries delivered by a [`Receiver`] and sends all of its
//! messages through a [`Sender`]. Timers are evaluated in [`Host::tick`].
//!
//! ## Groups
//!
//! Each group with reception state, or with pending retransmissions, occupies one slot of the
//! host. A group starts in [`GroupState::InitMember`] where it waits for the interface address.
//! It then announces itself and alternates between idle and delaying a response to a query. A
//! group is deleted as soon as it does not receive anything and nothing remains to be sent about
//! it.
//!
//! ## Reports
//!
//! In version 3 mode, reports are packed greedily: group records are appended to a message as
//! long as they fit [`Config::max_message_size`], then the message is sent and a new one started.
//! A record is never split over two messages. A single record whose sources do not fit into an
//! empty message is sent without its sources.
//!
//! [RFC 1112]: https://tools.ietf.org/html/rfc1112
//! [RFC 2236]: https://tools.ietf.org/html/rfc2236
//! [RFC 3376]: https://tools.ietf.org/html/rfc3376
//! [`Host`]: struct.Host.html
//! [`Host::tick`]: struct.Host.html#method.tick
//! [`Receiver`]: struct.Receiver.html
//! [`Sender`]: struct.Sender.html
//! [`mcast::StateChange`]: ../mcast/trait.StateChange.html
//! [`GroupState::InitMember`]: enum.GroupState.html#variant.InitMember
//! [`Config::max_message_size`]: struct.Config.html#structfield.max_message_size
use crate::layer::FnHandler;
use crate::time::Duration;
use crate::wire::{igmp_packet, IgmpRepr, Ipv4Repr};

mod dispatch;
mod group;
mod host;
mod report;
#[cfg(test)]
mod tests;

pub use crate::wire::IgmpVersion as Version;

pub use dispatch::{
    Receiver,
    Sender,
};

pub use group::{
    Group,
    GroupState,
};

pub use host::Host;

pub use report::MAX_MESSAGE_SIZE;

/// Protocol constants of the host.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct Config {
    /// The Robustness Variable, the number of transmissions of each state change.
    ///
    /// Replaced by the robustness announced in IGMPv3 queries.
    pub robustness: u8,

    /// Delay before repeating the unsolicited report of a version 1 or 2 join.
    pub unsolicited_report_interval: Duration,

    /// Upper bound of the random delay between retransmissions of state change reports.
    pub v3_unsolicited_report_interval: Duration,

    /// How long an older version querier is assumed present after its last query.
    pub older_querier_present_timeout: Duration,

    /// The response time assumed for IGMPv1 queries, which do not carry one.
    pub v1_max_resp_time: Duration,

    /// The largest version 3 report to send, in octets of IGMP message.
    ///
    /// Values above [`MAX_MESSAGE_SIZE`] are clamped.
    ///
    /// [`MAX_MESSAGE_SIZE`]: constant.MAX_MESSAGE_SIZE.html
    pub max_message_size: usize,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            robustness: 2,
            unsolicited_report_interval: Duration::from_secs(10),
            v3_unsolicited_report_interval: Duration::from_secs(1),
            older_querier_present_timeout: Duration::from_secs(400),
            v1_max_resp_time: Duration::from_secs(10),
            max_message_size: MAX_MESSAGE_SIZE,
        }
    }
}

/// An upper layer IGMP handler.
///
/// Receives every message that passed validation, after the host processed it. Routers and
/// snooping switches attach here.
pub trait Recv {
    /// Inspect one incoming message.
    fn receive(&mut self, ip: &Ipv4Repr, repr: &IgmpRepr, packet: &igmp_packet);
}

impl<F> Recv for FnHandler<F>
    where F: FnMut(&Ipv4Repr, &IgmpRepr, &igmp_packet)
{
    fn receive(&mut self, ip: &Ipv4Repr, repr: &IgmpRepr, packet: &igmp_packet) {
        self.0(ip, repr, packet)
    }
}

/// Discards all messages.
impl Recv for () {
    fn receive(&mut self, _: &Ipv4Repr, _: &IgmpRepr, _: &igmp_packet) { }
}
