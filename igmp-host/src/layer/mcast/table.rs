use crate::layer::{Error, Result};
use crate::managed::Slots;
use crate::nic::Device;
use crate::wire::{EthernetAddress, Ipv4Address};

use super::{Filter, Memberships};

/// The reception state of one group on an interface.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FilterEntry<const S: usize> {
    addr: Ipv4Address,
    any_source_refs: usize,
    filter: Filter<S>,
    mac_programmed: bool,
}

/// Receives the new reception state of a group after every recomputation.
///
/// Called synchronously, with the device so that the receiver can send reports.
pub trait StateChange<D: ?Sized, const S: usize> {
    /// The interface filter of `group` is now `filter`.
    fn state_change(&mut self, nic: &mut D, group: Ipv4Address, filter: &Filter<S>);
}

/// The multicast filter aggregator of one interface.
///
/// Holds one entry for each group with any membership. The filter of an entry is always
/// recomputed from scratch, from the any-source joins counted in the entry and the socket
/// memberships enumerated through [`Memberships`].
///
/// [`Memberships`]: trait.Memberships.html
#[derive(Clone, Debug)]
pub struct FilterTable<const G: usize, const S: usize> {
    entries: Slots<FilterEntry<S>, G>,
}

impl<const S: usize> FilterEntry<S> {
    fn new(addr: Ipv4Address) -> Self {
        FilterEntry {
            addr,
            any_source_refs: 0,
            filter: Filter::include(),
            mac_programmed: false,
        }
    }

    /// The multicast group.
    pub fn addr(&self) -> Ipv4Address {
        self.addr
    }

    /// The number of any-source joins.
    pub fn any_source_refs(&self) -> usize {
        self.any_source_refs
    }

    /// The aggregated filter.
    pub fn filter(&self) -> &Filter<S> {
        &self.filter
    }

    /// Whether the device accepts frames for the group.
    pub fn mac_programmed(&self) -> bool {
        self.mac_programmed
    }

    fn is_nonexistent(&self) -> bool {
        self.any_source_refs == 0 && self.filter.is_nonexistent()
    }
}

impl<const G: usize, const S: usize> FilterTable<G, S> {
    /// Create an empty table.
    pub fn new() -> Self {
        FilterTable { entries: Slots::new() }
    }

    /// Look up the entry of a group.
    pub fn get(&self, group: Ipv4Address) -> Option<&FilterEntry<S>> {
        self.entries.find(|entry| entry.addr == group)
    }

    /// Iterate over all entries.
    pub fn iter(&self) -> impl Iterator<Item=&FilterEntry<S>> + '_ {
        self.entries.iter().map(|(_, entry)| entry)
    }

    /// The number of groups with reception state.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Check if there is no reception state at all.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Check if a datagram from `src` to `group` should be received.
    pub fn accepts(&self, group: Ipv4Address, src: Ipv4Address) -> bool {
        match self.get(group) {
            Some(entry) => entry.filter.accepts(src),
            None => false,
        }
    }

    /// Join a group for all sources.
    ///
    /// Joins are counted, each must be undone by one `leave`.
    pub fn join<D, M, H>(&mut self, nic: &mut D, sockets: &M, group: Ipv4Address, host: &mut H)
        -> Result<()>
    where
        D: Device + ?Sized,
        M: Memberships<S> + ?Sized,
        H: StateChange<D, S>,
    {
        if !group.is_multicast() {
            return Err(Error::InvalidAddress);
        }

        let idx = self.find_or_insert(group)?;
        if let Some(entry) = self.entries.get_mut(idx) {
            entry.any_source_refs += 1;
        }

        self.recompute_entry(nic, sockets, idx, host);
        Ok(())
    }

    /// Undo one any-source join of a group.
    pub fn leave<D, M, H>(&mut self, nic: &mut D, sockets: &M, group: Ipv4Address, host: &mut H)
        -> Result<()>
    where
        D: Device + ?Sized,
        M: Memberships<S> + ?Sized,
        H: StateChange<D, S>,
    {
        if !group.is_multicast() {
            return Err(Error::InvalidAddress);
        }

        let idx = self.entries
            .position(|entry| entry.addr == group && entry.any_source_refs > 0)
            .ok_or(Error::AddressNotFound)?;
        if let Some(entry) = self.entries.get_mut(idx) {
            entry.any_source_refs -= 1;
        }

        self.recompute_entry(nic, sockets, idx, host);
        Ok(())
    }

    /// Recompute the reception state after socket memberships changed.
    ///
    /// With a group, creates the entry if sockets newly reference it. Without one, all present
    /// entries are recomputed.
    pub fn recompute<D, M, H>(&mut self, nic: &mut D, sockets: &M, group: Option<Ipv4Address>, host: &mut H)
    where
        D: Device + ?Sized,
        M: Memberships<S> + ?Sized,
        H: StateChange<D, S>,
    {
        match group {
            Some(group) => {
                if let Some(idx) = self.entries.position(|entry| entry.addr == group) {
                    self.recompute_entry(nic, sockets, idx, host);
                    return;
                }

                let mut referenced = false;
                sockets.for_each(group, &mut |_| referenced = true);
                if !referenced || !group.is_multicast() {
                    return;
                }

                match self.find_or_insert(group) {
                    Ok(idx) => self.recompute_entry(nic, sockets, idx, host),
                    Err(_) => { net_debug!("no filter entry for socket membership in {}", group); },
                }
            },
            None => {
                for idx in 0..G {
                    if self.entries.get(idx).is_some() {
                        self.recompute_entry(nic, sockets, idx, host);
                    }
                }
            },
        }
    }

    fn find_or_insert(&mut self, group: Ipv4Address) -> Result<usize> {
        if let Some(idx) = self.entries.position(|entry| entry.addr == group) {
            return Ok(idx);
        }

        self.entries.insert(FilterEntry::new(group)).map_err(|_| {
            net_debug!("multicast filter table full, cannot add {}", group);
            Error::OutOfResources
        })
    }

    fn recompute_entry<D, M, H>(&mut self, nic: &mut D, sockets: &M, idx: usize, host: &mut H)
    where
        D: Device + ?Sized,
        M: Memberships<S> + ?Sized,
        H: StateChange<D, S>,
    {
        let entry = match self.entries.get_mut(idx) {
            Some(entry) => entry,
            None => return,
        };

        let mut filter = if entry.any_source_refs > 0 {
            Filter::exclude()
        } else {
            Filter::include()
        };
        sockets.for_each(entry.addr, &mut |socket| filter.combine(socket));

        if let Some(mac) = EthernetAddress::from_ipv4_multicast(entry.addr) {
            let required = filter.requires_reception();
            if required && !entry.mac_programmed {
                match nic.accept_multicast(mac) {
                    Ok(()) => entry.mac_programmed = true,
                    Err(err) => { net_debug!("cannot accept {} on device: {}", mac, err); },
                }
            } else if !required && entry.mac_programmed {
                if let Err(err) = nic.drop_multicast(mac) {
                    net_debug!("cannot drop {} on device: {}", mac, err);
                }
                entry.mac_programmed = false;
            }
        }

        entry.filter = filter;
        host.state_change(nic, entry.addr, &entry.filter);

        if entry.is_nonexistent() {
            net_trace!("removing filter entry {}", entry.addr);
            self.entries.remove(idx);
        }
    }
}

impl<const G: usize, const S: usize> Default for FilterTable<G, S> {
    fn default() -> Self {
        FilterTable::new()
    }
}
