use core::fmt;

use crate::managed::List;
use crate::wire::Ipv4Address;

/// A source address together with its pending retransmissions.
///
/// The counter is only meaningful in the ALLOW and BLOCK lists of a group, elsewhere it stays
/// zero.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct SourceAddr {
    /// The unicast source.
    pub addr: Ipv4Address,
    /// How many more reports must mention this source.
    pub retransmit: u8,
}

/// Returned when a source list has no room for another address.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct CapacityError;

/// A bounded set of source addresses.
///
/// The list never contains the same address twice. It does not grow, adding to a full list is an
/// error. The order of elements carries no meaning but is stable.
#[derive(Clone, PartialEq, Eq)]
pub struct SourceAddrList<const N: usize> {
    list: List<SourceAddr, N>,
}

impl<const N: usize> SourceAddrList<N> {
    /// Create an empty list.
    pub fn new() -> Self {
        SourceAddrList { list: List::new() }
    }

    /// The number of addresses.
    pub fn len(&self) -> usize {
        self.list.len()
    }

    /// Check if the list has no addresses.
    pub fn is_empty(&self) -> bool {
        self.list.is_empty()
    }

    /// The maximum number of addresses.
    pub const fn capacity(&self) -> usize {
        N
    }

    /// Iterate over the entries.
    pub fn iter(&self) -> core::slice::Iter<'_, SourceAddr> {
        self.list.iter()
    }

    /// Iterate over the addresses.
    pub fn addrs(&self) -> impl Iterator<Item=Ipv4Address> + Clone + '_ {
        self.list.iter().map(|src| src.addr)
    }

    /// Find the index of an address.
    pub fn find(&self, addr: Ipv4Address) -> Option<usize> {
        self.list.iter().position(|src| src.addr == addr)
    }

    /// Check if the address is in the list.
    pub fn contains(&self, addr: Ipv4Address) -> bool {
        self.find(addr).is_some()
    }

    /// Add an address, without retransmissions.
    ///
    /// Adding an address that is already present succeeds without changes.
    pub fn add(&mut self, addr: Ipv4Address) -> Result<(), CapacityError> {
        if self.contains(addr) {
            return Ok(());
        }

        self.list.push(SourceAddr { addr, retransmit: 0 })
            .map(|_| ())
            .map_err(|_| CapacityError)
    }

    /// Add an address or reset the counter of a present one.
    pub fn add_with_retransmit(&mut self, addr: Ipv4Address, retransmit: u8)
        -> Result<(), CapacityError>
    {
        if let Some(idx) = self.find(addr) {
            self.list.as_mut_slice()[idx].retransmit = retransmit;
            return Ok(());
        }

        self.list.push(SourceAddr { addr, retransmit })
            .map(|_| ())
            .map_err(|_| CapacityError)
    }

    /// Remove an address, returning if it was present.
    pub fn remove(&mut self, addr: Ipv4Address) -> bool {
        match self.find(addr) {
            Some(idx) => self.list.remove_at(idx).is_some(),
            None => false,
        }
    }

    /// Remove all addresses.
    pub fn clear(&mut self) {
        self.list.clear()
    }

    /// Compare the addresses as sets, ignoring order and counters.
    pub fn same_set(&self, other: &Self) -> bool {
        self.len() == other.len()
            && self.addrs().all(|addr| other.contains(addr))
    }

    /// Add all addresses of another list.
    ///
    /// On error, the addresses that fit have been added.
    pub fn union_with(&mut self, other: &Self) -> Result<(), CapacityError> {
        for addr in other.addrs() {
            self.add(addr)?;
        }
        Ok(())
    }

    /// Only keep addresses that are also in another list.
    pub fn intersect_with(&mut self, other: &Self) {
        self.list.retain(|src| other.contains(src.addr))
    }

    /// Remove all addresses that are in another list.
    pub fn subtract(&mut self, other: &Self) {
        self.list.retain(|src| !other.contains(src.addr))
    }

    /// Decrement all retransmission counters, dropping the entries that reach zero.
    ///
    /// Returns whether any entry remains.
    pub fn retransmitted(&mut self) -> bool {
        for src in self.list.iter_mut() {
            src.retransmit = src.retransmit.saturating_sub(1);
        }
        self.list.retain(|src| src.retransmit > 0);
        !self.list.is_empty()
    }
}

impl<const N: usize> Default for SourceAddrList<N> {
    fn default() -> Self {
        SourceAddrList::new()
    }
}

impl<const N: usize> fmt::Debug for SourceAddrList<N> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_set().entries(self.addrs()).finish()
    }
}

impl fmt::Display for CapacityError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "source list full")
    }
}

#[cfg(feature = "std")]
impl std::error::Error for CapacityError { }
