use core::fmt;

use super::Ipv4Address;

/// A six-octet Ethernet II address.
#[derive(Debug, Hash, PartialEq, Eq, PartialOrd, Ord, Clone, Copy, Default)]
pub struct Address(pub [u8; 6]);

impl Address {
    /// The broadcast address.
    pub const BROADCAST: Address = Address([0xff; 6]);

    /// Map an IPv4 multicast group onto its Ethernet multicast address.
    ///
    /// The low-order 23 bits of the group are placed into the low-order 23 bits of
    /// `01:00:5e:00:00:00` as specified in [RFC 1112 § 6.4]. The mapping is not injective, 32
    /// groups share each MAC address. A receiver must still filter on the IP destination.
    ///
    /// Returns `None` for addresses that are not multicast.
    ///
    /// [RFC 1112 § 6.4]: https://tools.ietf.org/html/rfc1112#section-6.4
    pub fn from_ipv4_multicast(group: Ipv4Address) -> Option<Address> {
        if !group.is_multicast() {
            return None;
        }

        let ip = group.0;
        Some(Address([0x01, 0x00, 0x5e, ip[1] & 0x7f, ip[2], ip[3]]))
    }

    /// Query whether this address is the broadcast address.
    pub fn is_broadcast(&self) -> bool {
        *self == Self::BROADCAST
    }

    /// Query whether the "multicast" bit in the OUI is set.
    pub fn is_multicast(&self) -> bool {
        self.0[0] & 0x01 != 0
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let bytes = self.0;
        write!(f, "{:02x}-{:02x}-{:02x}-{:02x}-{:02x}-{:02x}",
               bytes[0], bytes[1], bytes[2], bytes[3], bytes[4], bytes[5])
    }
}
