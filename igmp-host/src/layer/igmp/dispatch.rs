use rand::RngCore;

use crate::nic::{Device, Meta};
use crate::time::Instant;
use crate::wire::{igmp_packet, Checksum, IgmpRepr, IpProtocol, Ipv4Address, Ipv4Repr};
use crate::wire::{IGMP_HOP_LIMIT, TOS_INTERNETWORK_CONTROL};
use crate::wire::igmp::HEADER_LEN;

use super::{Host, Recv, Version};

/// The outbound path of the host, borrowed for one operation.
///
/// Encapsulation follows [RFC 2236 § 2] and [RFC 3376 § 4]: all messages are sent with a TTL of 1
/// and a Router Alert option, version 3 reports additionally with Internetwork Control
/// precedence. Failed sends are logged and otherwise ignored.
///
/// [RFC 2236 § 2]: https://tools.ietf.org/html/rfc2236#section-2
/// [RFC 3376 § 4]: https://tools.ietf.org/html/rfc3376#section-4
pub struct Sender<'a, D: ?Sized> {
    nic: &'a mut D,
    src_addr: Option<Ipv4Address>,
}

/// The host, borrowed for receiving.
///
/// Validates inbound messages, lets the host process them and passes them on to an upper
/// handler.
pub struct Receiver<'a, R: ?Sized, H, const G: usize, const S: usize> {
    pub(super) host: &'a mut Host<G, S>,
    pub(super) rng: &'a mut R,
    pub(super) handler: H,
}

impl<'a, D: Device + ?Sized> Sender<'a, D> {
    /// Send through a device, with the unicast address of the interface if it has one.
    pub fn new(nic: &'a mut D, src_addr: Option<Ipv4Address>) -> Self {
        Sender { nic, src_addr }
    }

    /// Whether the interface has a unicast address.
    pub fn has_address(&self) -> bool {
        self.src_addr.is_some()
    }

    /// Send a version 1 or version 2 membership report to the group.
    pub fn send_report(&mut self, version: Version, group: Ipv4Address) {
        self.send_repr(group, IgmpRepr::MembershipReport { version, group_addr: group })
    }

    /// Send a leave group message to all routers.
    pub fn send_leave(&mut self, group: Ipv4Address) {
        self.send_repr(Ipv4Address::MULTICAST_ALL_ROUTERS, IgmpRepr::LeaveGroup { group_addr: group })
    }

    /// Send a complete version 3 report to all IGMPv3 routers.
    pub fn send_v3_report(&mut self, message: &[u8]) {
        self.send(Ipv4Address::MULTICAST_ALL_IGMPV3_ROUTERS, TOS_INTERNETWORK_CONTROL, message)
    }

    fn send_repr(&mut self, dst_addr: Ipv4Address, repr: IgmpRepr) {
        let mut buffer = [0; HEADER_LEN];
        repr.emit(igmp_packet::new_unchecked_mut(&mut buffer), Checksum::Manual);
        net_trace!("igmp: sending {} to {}", repr, dst_addr);
        self.send(dst_addr, 0, &buffer)
    }

    fn send(&mut self, dst_addr: Ipv4Address, tos: u8, message: &[u8]) {
        let meta = Meta {
            src_addr: self.src_addr.unwrap_or(Ipv4Address::UNSPECIFIED),
            dst_addr,
            hop_limit: IGMP_HOP_LIMIT,
            router_alert: true,
            tos,
        };

        if let Err(err) = self.nic.send(meta, message) {
            net_debug!("igmp: send to {} failed: {}", dst_addr, err);
        }
    }
}

impl<R, H, const G: usize, const S: usize> Receiver<'_, R, H, G, S>
where
    R: RngCore + ?Sized,
    H: Recv,
{
    /// Process one message received in an IPv4 datagram.
    ///
    /// Messages that are not IGMP, are malformed, fail the checksum or were not sent with a TTL of
    /// 1 are dropped.
    pub fn receive(&mut self, now: Instant, ip: &Ipv4Repr, message: &[u8]) {
        if ip.protocol != IpProtocol::Igmp {
            net_trace!("igmp: ignoring {} datagram", ip.protocol);
            return;
        }

        let packet = match igmp_packet::new_checked(message) {
            Ok(packet) => packet,
            Err(err) => {
                net_debug!("igmp: dropping message from {}: {}", ip.src_addr, err);
                return;
            },
        };

        let repr = match IgmpRepr::parse(packet, Checksum::Manual) {
            Ok(repr) => repr,
            Err(err) => {
                net_debug!("igmp: dropping message from {}: {}", ip.src_addr, err);
                return;
            },
        };

        if ip.hop_limit != IGMP_HOP_LIMIT {
            net_debug!("igmp: dropping {} with ttl {}", repr, ip.hop_limit);
            return;
        }

        match repr {
            IgmpRepr::MembershipQuery { .. } => {
                self.host.process_query(&mut *self.rng, now, ip, &repr, packet)
            },
            IgmpRepr::MembershipReport { group_addr, .. } => {
                if ip.dst_addr == group_addr {
                    self.host.process_report(&repr)
                } else {
                    net_debug!("igmp: report for {} sent to {}", group_addr, ip.dst_addr);
                }
            },
            // Only of interest to routers.
            IgmpRepr::LeaveGroup { .. } | IgmpRepr::ReportV3 { .. } => (),
        }

        self.handler.receive(ip, &repr, packet);
    }
}
