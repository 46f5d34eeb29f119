use core::fmt;

use crate::wire::Ipv4Address;
use super::SourceAddrList;

/// The filter mode of a source filter.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum FilterMode {
    /// Receive only from the listed sources.
    Include,
    /// Receive from all but the listed sources.
    Exclude,
}

/// A source filter, the reception state of one group.
///
/// `INCLUDE {}` is the state of a group that is not joined at all.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Filter<const S: usize> {
    /// Interpretation of the source list.
    pub mode: FilterMode,
    /// The listed sources.
    pub sources: SourceAddrList<S>,
}

/// The membership of one socket in one group.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SocketFilter<const S: usize> {
    /// The joined group.
    pub group: Ipv4Address,
    /// The sources the socket wants to receive from.
    pub filter: Filter<S>,
}

/// Access to the multicast memberships of all sockets bound to one interface.
///
/// The filter table holds no reference to sockets. Instead, it enumerates their memberships
/// through this trait every time it recomputes the state of a group.
pub trait Memberships<const S: usize> {
    /// Call `f` with the filter of each socket membership for `group`.
    fn for_each(&self, group: Ipv4Address, f: &mut dyn FnMut(&Filter<S>));
}

impl<const S: usize> Filter<S> {
    /// The filter of a group that is not joined.
    pub fn include() -> Self {
        Filter { mode: FilterMode::Include, sources: SourceAddrList::new() }
    }

    /// The filter of an any-source membership.
    pub fn exclude() -> Self {
        Filter { mode: FilterMode::Exclude, sources: SourceAddrList::new() }
    }

    /// Check if this is the state of a group that was not joined, `INCLUDE {}`.
    pub fn is_nonexistent(&self) -> bool {
        self.mode == FilterMode::Include && self.sources.is_empty()
    }

    /// Check if any traffic of the group may pass this filter.
    pub fn requires_reception(&self) -> bool {
        !self.is_nonexistent()
    }

    /// Check if traffic from a source passes this filter.
    pub fn accepts(&self, src: Ipv4Address) -> bool {
        match self.mode {
            FilterMode::Include => self.sources.contains(src),
            FilterMode::Exclude => !self.sources.contains(src),
        }
    }

    /// Merge the filter of one more socket into this interface filter.
    ///
    /// The result receives everything that either filter receives ([RFC 3376 § 3.2]). When the
    /// union of two include lists does not fit the capacity, the result degrades to `EXCLUDE {}`
    /// which receives more traffic than required but never less.
    ///
    /// [RFC 3376 § 3.2]: https://tools.ietf.org/html/rfc3376#section-3.2
    pub fn combine(&mut self, socket: &Filter<S>) {
        match (self.mode, socket.mode) {
            (FilterMode::Include, FilterMode::Include) => {
                if self.sources.union_with(&socket.sources).is_err() {
                    net_debug!("source list full, falling back to any-source reception");
                    *self = Filter::exclude();
                }
            },
            (FilterMode::Exclude, FilterMode::Exclude) => {
                self.sources.intersect_with(&socket.sources);
            },
            (FilterMode::Exclude, FilterMode::Include) => {
                self.sources.subtract(&socket.sources);
            },
            (FilterMode::Include, FilterMode::Exclude) => {
                let mut sources = socket.sources.clone();
                sources.subtract(&self.sources);
                *self = Filter { mode: FilterMode::Exclude, sources };
            },
        }
    }
}

impl<const S: usize> SocketFilter<S> {
    /// An any-source membership of a socket.
    pub fn any_source(group: Ipv4Address) -> Self {
        SocketFilter { group, filter: Filter::exclude() }
    }

    /// A membership with a source filter.
    pub fn new(group: Ipv4Address, filter: Filter<S>) -> Self {
        SocketFilter { group, filter }
    }
}

impl<const S: usize> Memberships<S> for [SocketFilter<S>] {
    fn for_each(&self, group: Ipv4Address, f: &mut dyn FnMut(&Filter<S>)) {
        self.iter()
            .filter(|socket| socket.group == group)
            .for_each(|socket| f(&socket.filter))
    }
}

impl<const S: usize, const N: usize> Memberships<S> for [SocketFilter<S>; N] {
    fn for_each(&self, group: Ipv4Address, f: &mut dyn FnMut(&Filter<S>)) {
        self[..].for_each(group, f)
    }
}

impl fmt::Display for FilterMode {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            FilterMode::Include => write!(f, "INCLUDE"),
            FilterMode::Exclude => write!(f, "EXCLUDE"),
        }
    }
}
