//! Host side multicast group management for small network stacks.
//!
//! ## Table of contents
//!
//! 1. [Design](#design-and-relevant-core-concepts)
//! 2. [The wire module](wire/index.html)
//!    1. [Igmp messages and group records](wire/igmp/index.html)
//! 3. [The layers](layer/index.html)
//!    1. [Reception filter aggregation](layer/mcast/index.html)
//!    1. [The Igmp host](layer/igmp/index.html)
//!    1. [Tying both to an interface](layer/interface/index.html)
//! 4. [Network interfaces](nic/index.html)
//! 5. Internals
//!    1. [The managed module](managed/index.html)
//!    2. [Timers](time/index.html)
//!
//! ## Design and relevant core concepts
//!
//! The crate implements the host part of IGMP (RFC 1112, RFC 2236 and RFC 3376) together with the
//! per-interface IPv4 multicast reception state that drives it. Sockets express interest in
//! multicast groups, optionally filtered by source. The interface folds all of these into one
//! reception state per group, programs the link layer filter accordingly and tells the IGMP host
//! about the change. The host then reports to the routers on the link, in whatever protocol
//! version the routers understand.
//!
//! Nothing within this crate ever dynamically allocates memory. All tables have a capacity fixed
//! by const generic parameters and report exhaustion instead of growing. There is no internal
//! clock either: each entry point receives the current `Instant` and timers are simple deadlines
//! compared against it on the next tick. Everything runs to completion on the caller's thread.
#![warn(missing_docs)]
#![warn(unreachable_pub)]

// tests should be able to use `std`
#![cfg_attr(all(
    not(feature = "std"),
    not(test)),
no_std)]

#[macro_use] mod macros;
pub mod layer;
pub mod managed;
pub mod nic;
pub mod time;
pub mod wire;
