use core::fmt;

use crate::layer::mcast::{Filter, SourceAddrList};
use crate::time::Timer;
use crate::wire::Ipv4Address;

/// The host state of one group.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum GroupState {
    /// The group is not joined. Never stored in the group table.
    NonMember,
    /// Joined, but nothing was reported yet.
    InitMember,
    /// A report for the group is scheduled on the group timer.
    DelayingMember,
    /// Joined and reported, no response pending.
    IdleMember,
}

/// The host side membership of one group.
#[derive(Clone, Debug)]
pub struct Group<const S: usize> {
    pub(super) state: GroupState,
    pub(super) addr: Ipv4Address,
    /// Whether this host sent the last report heard for the group.
    pub(super) last_reporter: bool,
    /// Pending retransmissions of the filter mode.
    pub(super) retransmit: u8,
    pub(super) timer: Timer,
    pub(super) filter: Filter<S>,
    pub(super) allow: SourceAddrList<S>,
    pub(super) block: SourceAddrList<S>,
    /// Sources of a pending group-and-source specific response.
    pub(super) queried: SourceAddrList<S>,
}

impl<const S: usize> Group<S> {
    pub(super) fn new(addr: Ipv4Address) -> Self {
        Group {
            state: GroupState::InitMember,
            addr,
            last_reporter: false,
            retransmit: 0,
            timer: Timer::stopped(),
            filter: Filter::include(),
            allow: SourceAddrList::new(),
            block: SourceAddrList::new(),
            queried: SourceAddrList::new(),
        }
    }

    /// The current state.
    pub fn state(&self) -> GroupState {
        self.state
    }

    /// The group address.
    pub fn addr(&self) -> Ipv4Address {
        self.addr
    }

    /// Whether the last report for the group on the link was ours.
    pub fn last_reporter(&self) -> bool {
        self.last_reporter
    }

    /// Remaining retransmissions of a filter mode change.
    pub fn retransmit(&self) -> u8 {
        self.retransmit
    }

    /// The group timer, delaying responses to queries.
    pub fn timer(&self) -> &Timer {
        &self.timer
    }

    /// The reception state of the interface for this group.
    pub fn filter(&self) -> &Filter<S> {
        &self.filter
    }

    /// Sources whose reception started recently.
    pub fn allow(&self) -> &SourceAddrList<S> {
        &self.allow
    }

    /// Sources whose reception stopped recently.
    pub fn block(&self) -> &SourceAddrList<S> {
        &self.block
    }

    /// Sources of a pending group-and-source specific query.
    pub fn queried(&self) -> &SourceAddrList<S> {
        &self.queried
    }

    /// Check if state change records remain to be sent.
    pub fn has_pending_changes(&self) -> bool {
        self.retransmit > 0 || !self.allow.is_empty() || !self.block.is_empty()
    }

    /// Reset the state change bookkeeping.
    pub(super) fn clear_changes(&mut self) {
        self.retransmit = 0;
        self.allow.clear();
        self.block.clear();
    }

    /// A group is deleted once it receives nothing and has nothing left to send.
    pub(super) fn is_deletable(&self) -> bool {
        !self.has_pending_changes() && self.filter.is_nonexistent()
    }
}

impl fmt::Display for GroupState {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            GroupState::NonMember => write!(f, "non-member"),
            GroupState::InitMember => write!(f, "init"),
            GroupState::DelayingMember => write!(f, "delaying"),
            GroupState::IdleMember => write!(f, "idle"),
        }
    }
}
