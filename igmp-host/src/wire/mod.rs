/*! Low-level packet access and construction.

# An overview over packet representations

The `wire` module deals with the packet *representation*. It provides two levels of
functionality.

 * First, it provides functions to extract fields from sequences of octets, and to insert fields
   into sequences of octets. This happens in the lowercase structures e.g. [`igmp_packet`] or
   [`igmp_group_record`].
 * Second, it provides a compact, high-level representation of header data that can be created from
   parsing and emitted into a sequence of octets. This happens through the `Repr` family of structs
   and enums, e.g. [`IgmpRepr`] or [`IgmpRecordRepr`].

[`igmp_packet`]: igmp/struct.igmp.html
[`igmp_group_record`]: igmp/struct.group_record.html
[`IgmpRepr`]: igmp/enum.Repr.html
[`IgmpRecordRepr`]: igmp/struct.RecordRepr.html

The lowercase wrappers guarantee that, if their `check_len()` method returned `Ok(())`, then no
header field accessor or setter method will panic. Variable length parts, such as the group records
of a version 3 report, are checked again when they are accessed.

In the `Repr` family of data structures, the `Repr::parse()` method never panics and the
`Repr::emit()` method never panics as long as the underlying buffer is at least
`Repr::buffer_len()` octets long.

The network layer below IGMP is represented only by addresses and by [`Ipv4Repr`], the header
information that the IP layer passes along with a received payload.

[`Ipv4Repr`]: struct.Ipv4Repr.html

# Examples

To emit a membership report into an octet buffer, and then parse it back:

```rust
use igmp_host::wire::*;
let repr = IgmpRepr::MembershipReport {
    version: IgmpVersion::V2,
    group_addr: Ipv4Address::new(239, 1, 1, 1),
};
let mut buffer = vec![0; repr.buffer_len()];
{ // emission
    let packet = igmp_packet::new_unchecked_mut(&mut buffer);
    repr.emit(packet, Checksum::Manual);
}
{ // parsing
    let packet = igmp_packet::new_checked(&buffer)
        .expect("truncated packet");
    let parsed = IgmpRepr::parse(packet, Checksum::Manual)
        .expect("malformed packet");
    assert_eq!(repr, parsed);
}
```
*/
// Copyright (C) 2016 whitequark@whitequark.org
// Copyright (C) 2019 Andreas Molzer <andreas.molzer@tum.de>
//
// in large parts from `smoltcp` originally distributed under 0-clause BSD
//
// Applies to files in this folder unless otherwise noted. These are:
// * `error.rs`
// * `ethernet.rs`
// * `ip.rs`
// * `ipv4.rs`
// * `mod.rs` (this file)

mod field {
    pub(crate) type Field = ::core::ops::Range<usize>;
}

mod ethernet;
mod error;
pub(crate) mod ip;
mod ipv4;
pub mod igmp;

/// Describes how to handle checksums.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Checksum {
    /// Checksum must be computed or checked manually.
    Manual,

    /// The checksum field is filled or checked by the NIC.
    Ignored,
}

pub use self::ethernet::{
    Address as EthernetAddress};

pub use self::error::{
    Error,
    Result};

pub use self::ip::Protocol as IpProtocol;

pub use self::ipv4::{
    Address as Ipv4Address,
    Cidr as Ipv4Cidr,
    Repr as Ipv4Repr,
    IGMP_HOP_LIMIT,
    TOS_INTERNETWORK_CONTROL};

pub use self::igmp::{
    igmp as igmp_packet,
    group_record as igmp_group_record,
    Message as IgmpMessage,
    RecordType as IgmpRecordType,
    Version as IgmpVersion,
    Repr as IgmpRepr,
    RecordRepr as IgmpRecordRepr};

impl Checksum {
    /// Check if a checksum should be calculated by the library.
    ///
    /// Otherwise it is ignored due to the assumption that it was offloaded or is otherwise
    /// undesirable to check.
    pub fn manual(self) -> bool {
        match self {
            Checksum::Manual => true,
            Checksum::Ignored => false,
        }
    }
}
