//! Multicast reception state of an interface.
//!
//! Each socket may be a member of a multicast group with its own source filter. The interface
//! receives a group if any of its sockets does. Its filter per group is the combination of the
//! socket filters according to [RFC 3376 § 3.2], plus plain any-source joins that are not bound
//! to a socket.
//!
//! The [`FilterTable`] recomputes the filter of a group after every change, programs the MAC
//! filter of the device accordingly, and passes the new state to a [`StateChange`] receiver,
//! usually the IGMP host of the interface.
//!
//! Sources are kept in a bounded [`SourceAddrList`]. A capacity of zero disables source filtering
//! altogether, all filters are then either `INCLUDE {}` or `EXCLUDE {}`.
//!
//! [RFC 3376 § 3.2]: https://tools.ietf.org/html/rfc3376#section-3.2
//! [`FilterTable`]: struct.FilterTable.html
//! [`StateChange`]: trait.StateChange.html
//! [`SourceAddrList`]: struct.SourceAddrList.html
mod filter;
mod source;
mod table;

pub use filter::{
    Filter,
    FilterMode,
    Memberships,
    SocketFilter,
};

pub use source::{
    CapacityError,
    SourceAddr,
    SourceAddrList,
};

pub use table::{
    FilterEntry,
    FilterTable,
    StateChange,
};
