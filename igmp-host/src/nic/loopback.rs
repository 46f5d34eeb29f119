//! Implementation of a software device recording its traffic.
use crate::managed::List;
use crate::wire::{EthernetAddress, Ipv4Address};

use super::{Device, Error, Meta, Result};

/// The largest message a `Loopback` can hold.
pub const FRAME_LEN: usize = 1500;

/// A software device.
///
/// Maintains a ring buffer of sent messages that can be taken out again in order, and a
/// reference counted multicast filter. Both are bounded, operations fail with `Exhausted` when
/// they run out of space.
pub struct Loopback<const FRAMES: usize, const FILTERS: usize> {
    buffer: [Frame; FRAMES],
    next_recv: usize,
    sent: usize,
    filter: List<FilterSlot, FILTERS>,
    fail_sends: bool,
}

/// A message sent through a `Loopback`.
#[derive(Clone)]
pub struct Frame {
    meta: Meta,
    len: usize,
    data: [u8; FRAME_LEN],
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
struct FilterSlot {
    addr: EthernetAddress,
    refs: usize,
}

impl<const FRAMES: usize, const FILTERS: usize> Loopback<FRAMES, FILTERS> {
    /// Create an empty device.
    pub fn new() -> Self {
        Loopback {
            buffer: core::array::from_fn(|_| Frame::empty()),
            next_recv: 0,
            sent: 0,
            filter: List::new(),
            fail_sends: false,
        }
    }

    /// Let all future sends fail, or succeed again.
    pub fn set_fail_sends(&mut self, fail: bool) {
        self.fail_sends = fail;
    }

    /// The number of sent frames not yet taken.
    pub fn pending(&self) -> usize {
        self.sent
    }

    /// Take the oldest sent frame.
    pub fn take(&mut self) -> Option<Frame> {
        if self.sent == 0 {
            return None;
        }

        let frame = self.buffer[self.next_recv].clone();
        self.next_recv = (self.next_recv + 1) % FRAMES;
        self.sent -= 1;
        Some(frame)
    }

    /// Discard all sent frames.
    pub fn clear(&mut self) {
        self.next_recv = 0;
        self.sent = 0;
    }

    /// Check if frames for a MAC address are received.
    pub fn accepts(&self, addr: EthernetAddress) -> bool {
        addr.is_broadcast() || self.filter.iter().any(|slot| slot.addr == addr)
    }

    /// Check if frames for an IPv4 multicast group pass the MAC filter.
    pub fn accepts_group(&self, group: Ipv4Address) -> bool {
        match EthernetAddress::from_ipv4_multicast(group) {
            Some(mac) => self.accepts(mac),
            None => false,
        }
    }

    /// The number of distinct MAC addresses in the filter.
    pub fn filter_len(&self) -> usize {
        self.filter.len()
    }
}

impl Frame {
    fn empty() -> Self {
        Frame {
            meta: Meta {
                src_addr: Ipv4Address::UNSPECIFIED,
                dst_addr: Ipv4Address::UNSPECIFIED,
                hop_limit: 0,
                router_alert: false,
                tos: 0,
            },
            len: 0,
            data: [0; FRAME_LEN],
        }
    }

    /// The encapsulation information given with the message.
    pub fn meta(&self) -> Meta {
        self.meta
    }

    /// The bytes of the message.
    pub fn message(&self) -> &[u8] {
        &self.data[..self.len]
    }
}

impl<const FRAMES: usize, const FILTERS: usize> Default for Loopback<FRAMES, FILTERS> {
    fn default() -> Self {
        Loopback::new()
    }
}

impl<const FRAMES: usize, const FILTERS: usize> Device for Loopback<FRAMES, FILTERS> {
    fn send(&mut self, meta: Meta, message: &[u8]) -> Result<()> {
        if self.fail_sends || self.sent == FRAMES {
            return Err(Error::Exhausted);
        }

        if message.len() > FRAME_LEN {
            return Err(Error::Illegal);
        }

        let idx = (self.next_recv + self.sent) % FRAMES;
        let frame = &mut self.buffer[idx];
        frame.meta = meta;
        frame.len = message.len();
        frame.data[..message.len()].copy_from_slice(message);
        self.sent += 1;
        Ok(())
    }

    fn accept_multicast(&mut self, addr: EthernetAddress) -> Result<()> {
        if !addr.is_multicast() {
            return Err(Error::Illegal);
        }

        if let Some(slot) = self.filter.iter_mut().find(|slot| slot.addr == addr) {
            slot.refs += 1;
            return Ok(());
        }

        self.filter.push(FilterSlot { addr, refs: 1 })
            .map(|_| ())
            .map_err(|_| Error::Exhausted)
    }

    fn drop_multicast(&mut self, addr: EthernetAddress) -> Result<()> {
        let pos = match self.filter.iter().position(|slot| slot.addr == addr) {
            Some(pos) => pos,
            None => return Err(Error::Illegal),
        };

        let slot = &mut self.filter.as_mut_slice()[pos];
        slot.refs -= 1;
        if slot.refs == 0 {
            self.filter.remove_at(pos);
        }

        Ok(())
    }
}
