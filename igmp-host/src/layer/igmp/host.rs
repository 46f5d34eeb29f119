use rand::{Rng, RngCore};

use crate::layer::mcast::{Filter, FilterMode};
use crate::managed::Slots;
use crate::nic::Device;
use crate::time::{Duration, Expiration, Instant, Timer};
use crate::wire::{igmp_packet, IgmpRepr, Ipv4Address, Ipv4Repr};

use super::{Config, Group, GroupState, Receiver, Recv, Sender, Version};
use super::report::{self, Packer};

/// The IGMP host state of one interface.
///
/// Starts in IGMPv3 mode with all timers stopped. Holds at most `G` groups with up to `S`
/// sources each, `S == 0` disables source filtering.
#[derive(Clone, Debug)]
pub struct Host<const G: usize, const S: usize> {
    config: Config,
    robustness: u8,
    version: Version,
    v1_querier: Timer,
    v2_querier: Timer,
    /// Delays the response to a version 3 General Query.
    general_query: Timer,
    /// Paces retransmissions of state change reports.
    state_change: Timer,
    groups: Slots<Group<S>, G>,
}

impl<const G: usize, const S: usize> Host<G, S> {
    /// Create the host state of a freshly brought up interface.
    pub fn new(config: Config) -> Self {
        Host {
            config,
            robustness: config.robustness.max(1),
            version: Version::V3,
            v1_querier: Timer::stopped(),
            v2_querier: Timer::stopped(),
            general_query: Timer::stopped(),
            state_change: Timer::stopped(),
            groups: Slots::new(),
        }
    }

    /// A receiver for inbound messages, answering queries internally.
    pub fn recv<'a, R>(&'a mut self, rng: &'a mut R) -> Receiver<'a, R, (), G, S>
        where R: RngCore + ?Sized,
    {
        self.recv_with(rng, ())
    }

    /// A receiver that passes all valid messages on to an upper handler.
    pub fn recv_with<'a, R, H>(&'a mut self, rng: &'a mut R, handler: H) -> Receiver<'a, R, H, G, S>
    where
        R: RngCore + ?Sized,
        H: Recv,
    {
        Receiver { host: self, rng, handler }
    }

    /// The configuration.
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// The current compatibility mode.
    pub fn version(&self) -> Version {
        self.version
    }

    /// The Robustness Variable in use, possibly learned from a querier.
    pub fn robustness(&self) -> u8 {
        self.robustness
    }

    /// Look up a group.
    pub fn group(&self, addr: Ipv4Address) -> Option<&Group<S>> {
        self.groups.find(|group| group.addr == addr)
    }

    /// The state of a group, `NonMember` for unknown groups.
    pub fn group_state(&self, addr: Ipv4Address) -> GroupState {
        self.group(addr).map_or(GroupState::NonMember, |group| group.state)
    }

    /// Iterate over all groups.
    pub fn groups(&self) -> impl Iterator<Item=&Group<S>> + '_ {
        self.groups.iter().map(|(_, group)| group)
    }

    /// The IGMPv1 Querier Present timer.
    pub fn v1_querier_timer(&self) -> &Timer {
        &self.v1_querier
    }

    /// The IGMPv2 Querier Present timer.
    pub fn v2_querier_timer(&self) -> &Timer {
        &self.v2_querier
    }

    /// The timer of a pending General Query response.
    pub fn general_query_timer(&self) -> &Timer {
        &self.general_query
    }

    /// The state change retransmission timer.
    pub fn state_change_timer(&self) -> &Timer {
        &self.state_change
    }

    /// The next instant at which `tick` has work to do.
    ///
    /// Groups waiting for the interface address make every tick relevant once `has_address`.
    pub fn poll_at(&self, now: Instant, has_address: bool) -> Expiration {
        let init = has_address && self.groups.iter()
            .any(|(_, group)| group.state == GroupState::InitMember);
        if init {
            return Expiration::When(now);
        }

        let interface = self.v1_querier.deadline()
            .min(self.v2_querier.deadline())
            .min(self.general_query.deadline())
            .min(self.state_change.deadline());
        self.groups.iter()
            .map(|(_, group)| group.timer.deadline())
            .fold(interface, Expiration::min)
    }

    /// Process a change of the interface reception state of a group.
    ///
    /// A group with reception state that is not known yet is created in `InitMember` state and
    /// announced on the next tick. In version 3 mode, the changes against the previous state are
    /// reported at once. In older modes, leaving a group sends a Leave Group message if this host
    /// sent the last report.
    pub fn state_change<D, R>(
        &mut self,
        tx: &mut Sender<'_, D>,
        rng: &mut R,
        now: Instant,
        addr: Ipv4Address,
        filter: &Filter<S>,
    )
    where
        D: Device + ?Sized,
        R: RngCore + ?Sized,
    {
        // Membership in the all-systems group is implicit.
        if addr == Ipv4Address::MULTICAST_ALL_SYSTEMS {
            return;
        }

        let idx = match self.groups.position(|group| group.addr == addr) {
            Some(idx) => idx,
            None if filter.is_nonexistent() => return,
            None => match self.groups.insert(Group::new(addr)) {
                Ok(idx) => {
                    net_trace!("igmp: new group {}", addr);
                    idx
                },
                Err(_) => {
                    net_debug!("igmp: group table full, not reporting {}", addr);
                    return;
                },
            },
        };

        let version = self.version;
        let robustness = self.robustness;
        let group = match self.groups.get_mut(idx) {
            Some(group) => group,
            None => return,
        };

        match version {
            Version::V1 | Version::V2 => {
                group.filter = filter.clone();
                if group.filter.is_nonexistent() {
                    let reported = group.state != GroupState::InitMember;
                    if version == Version::V2 && reported && group.last_reporter {
                        tx.send_leave(group.addr);
                    }
                    net_trace!("igmp: leaving group {}", addr);
                    self.groups.remove(idx);
                }
            },
            Version::V3 => {
                if group.state == GroupState::InitMember {
                    group.filter = filter.clone();
                } else {
                    merge_change(group, filter.clone(), robustness);
                    // Without an address the changes wait for the retransmission timer.
                    if tx.has_address() {
                        let mut packer = Packer::new(self.config.max_message_size);
                        report::state_change_records(&mut packer, tx, group);
                        packer.flush(tx);
                        group.retransmitted();
                    }

                    if group.has_pending_changes() && !self.state_change.is_running() {
                        let delay = random_delay(rng, self.config.v3_unsolicited_report_interval);
                        self.state_change.start(now, delay);
                    }
                }

                if group.is_deletable() {
                    net_trace!("igmp: leaving group {}", addr);
                    self.groups.remove(idx);
                }
            },
        }
    }

    /// Evaluate all timers and announce new groups.
    pub fn tick<D, R>(&mut self, tx: &mut Sender<'_, D>, rng: &mut R, now: Instant)
    where
        D: Device + ?Sized,
        R: RngCore + ?Sized,
    {
        if self.v1_querier.fire(now) {
            let version = if self.v2_querier.is_running() { Version::V2 } else { Version::V3 };
            self.change_compatibility_mode(version);
        }

        if self.v2_querier.fire(now) && !self.v1_querier.is_running() {
            self.change_compatibility_mode(Version::V3);
        }

        // Reports are deferred until the interface has an address to send them from.
        if tx.has_address() {
            self.announce_groups(tx, now);
        }

        if self.general_query.fire(now) {
            self.send_current_state(tx);
        }

        if self.state_change.fire(now) {
            self.retransmit_changes(tx, rng, now);
        }

        self.group_timers(tx, now);

        self.groups.retain(|group| !group.is_deletable());
    }

    /// Process a received Membership Query.
    pub fn process_query<R>(
        &mut self,
        rng: &mut R,
        now: Instant,
        ip: &Ipv4Repr,
        repr: &IgmpRepr,
        packet: &igmp_packet,
    )
        where R: RngCore + ?Sized,
    {
        let (version, max_resp_time, group_addr, qrv) = match *repr {
            IgmpRepr::MembershipQuery { version, max_resp_time, group_addr, qrv, .. } => {
                (version, max_resp_time, group_addr, qrv)
            },
            _ => return,
        };

        let max_resp_time = match version {
            Version::V1 => {
                self.v1_querier.start(now, self.config.older_querier_present_timeout);
                if self.version > Version::V1 {
                    self.change_compatibility_mode(Version::V1);
                }
                self.config.v1_max_resp_time
            },
            Version::V2 => {
                self.v2_querier.start(now, self.config.older_querier_present_timeout);
                if self.version > Version::V2 {
                    self.change_compatibility_mode(Version::V2);
                }
                max_resp_time
            },
            Version::V3 => max_resp_time,
        };

        let general = group_addr.is_unspecified();
        if general && ip.dst_addr != Ipv4Address::MULTICAST_ALL_SYSTEMS {
            net_debug!("igmp: general query sent to {}", ip.dst_addr);
            return;
        }

        if !general && !group_addr.is_multicast() {
            net_debug!("igmp: query for invalid group {}", group_addr);
            return;
        }

        match self.version {
            Version::V1 | Version::V2 => {
                for group in self.groups.values_mut() {
                    if !general && group.addr != group_addr {
                        continue;
                    }

                    match group.state {
                        GroupState::IdleMember => {
                            group.timer.start(now, random_delay(rng, max_resp_time));
                            group.state = GroupState::DelayingMember;
                        },
                        GroupState::DelayingMember => {
                            group.timer.start_or_shorten(now, random_delay(rng, max_resp_time));
                        },
                        GroupState::InitMember | GroupState::NonMember => (),
                    }
                }
            },
            Version::V3 => {
                if qrv != 0 {
                    self.robustness = qrv;
                }

                let delay = random_delay(rng, max_resp_time);
                self.schedule_v3_response(now, delay, general, group_addr, packet);
            },
        }
    }

    /// Process an overheard version 1 or 2 Membership Report.
    ///
    /// Suppresses our own pending report for the group.
    pub fn process_report(&mut self, repr: &IgmpRepr) {
        let group_addr = match *repr {
            IgmpRepr::MembershipReport { group_addr, .. } => group_addr,
            _ => return,
        };

        if self.version == Version::V3 {
            return;
        }

        if let Some(group) = self.groups.find_mut(|group| group.addr == group_addr) {
            if group.state == GroupState::DelayingMember {
                group.timer.stop();
                group.last_reporter = false;
                group.state = GroupState::IdleMember;
            }
        }
    }

    /// Reset after the link went down and up again.
    ///
    /// All groups are announced again, in version 3 mode.
    pub fn link_change(&mut self) {
        self.version = Version::V3;
        self.robustness = self.config.robustness.max(1);
        self.v1_querier.stop();
        self.v2_querier.stop();
        self.general_query.stop();
        self.state_change.stop();

        for group in self.groups.values_mut() {
            group.clear_changes();
            group.queried.clear();
            group.timer.stop();
            group.last_reporter = false;
            group.state = GroupState::InitMember;
        }

        self.groups.retain(|group| !group.filter.is_nonexistent());
    }

    /// Switch to another compatibility mode.
    ///
    /// Pending responses and retransmissions are canceled. Every group becomes idle, including
    /// those that did not announce themselves yet.
    fn change_compatibility_mode(&mut self, version: Version) {
        net_debug!("igmp: compatibility mode {} -> {}", self.version, version);
        self.version = version;
        self.general_query.stop();
        self.state_change.stop();

        for group in self.groups.values_mut() {
            group.clear_changes();
            group.queried.clear();
            group.timer.stop();
            group.state = GroupState::IdleMember;
        }
    }

    /// Apply the response rules of [RFC 3376 § 5.2].
    ///
    /// [RFC 3376 § 5.2]: https://tools.ietf.org/html/rfc3376#section-5.2
    fn schedule_v3_response(
        &mut self,
        now: Instant,
        delay: Duration,
        general: bool,
        group_addr: Ipv4Address,
        packet: &igmp_packet,
    ) {
        if let Expiration::When(pending) = self.general_query.deadline() {
            if pending <= now + delay {
                return;
            }
        }

        if general {
            self.general_query.start(now, delay);
            return;
        }

        let group = match self.groups.find_mut(|group| {
            group.addr == group_addr && group.state != GroupState::InitMember
        }) {
            Some(group) => group,
            None => return,
        };

        let source_specific = packet.num_sources() > 0;
        if !group.timer.is_running() {
            group.timer.start(now, delay);
            group.queried.clear();
            group.state = GroupState::DelayingMember;
        } else {
            group.timer.start_or_shorten(now, delay);
            if group.queried.is_empty() {
                // A group specific response is already pending, it covers all sources.
                return;
            }
        }

        if !source_specific {
            group.queried.clear();
            return;
        }

        for addr in packet.sources() {
            if group.queried.add(addr).is_err() {
                net_debug!("igmp: too many queried sources for {}", group.addr);
                group.queried.clear();
                return;
            }
        }
    }

    /// Send the first report of groups in `InitMember` state.
    fn announce_groups<D>(&mut self, tx: &mut Sender<'_, D>, now: Instant)
        where D: Device + ?Sized,
    {
        let version = self.version;
        let robustness = self.robustness;
        let interval = self.config.unsolicited_report_interval;
        let mut changed = false;

        for group in self.groups.values_mut() {
            if group.state != GroupState::InitMember {
                continue;
            }

            match version {
                Version::V1 | Version::V2 => {
                    tx.send_report(version, group.addr);
                    group.timer.start(now, interval);
                    group.last_reporter = true;
                    group.state = GroupState::DelayingMember;
                },
                Version::V3 => {
                    let filter = core::mem::replace(&mut group.filter, Filter::include());
                    merge_change(group, filter, robustness);
                    group.state = GroupState::IdleMember;
                    changed = true;
                },
            }
        }

        if changed {
            self.state_change.start(now, Duration::from_millis(0));
        }
    }

    /// Respond to a General Query with the state of all groups.
    fn send_current_state<D>(&mut self, tx: &mut Sender<'_, D>)
        where D: Device + ?Sized,
    {
        let mut packer = Packer::new(self.config.max_message_size);
        for (_, group) in self.groups.iter() {
            report::current_state_record(&mut packer, tx, group);
        }
        packer.flush(tx);
    }

    fn retransmit_changes<D, R>(&mut self, tx: &mut Sender<'_, D>, rng: &mut R, now: Instant)
    where
        D: Device + ?Sized,
        R: RngCore + ?Sized,
    {
        let mut packer = Packer::new(self.config.max_message_size);
        let has_address = tx.has_address();
        let mut pending = false;

        for group in self.groups.values_mut() {
            if group.state == GroupState::InitMember || !group.has_pending_changes() {
                continue;
            }

            if has_address {
                report::state_change_records(&mut packer, tx, group);
                group.retransmitted();
            }
            pending |= group.has_pending_changes();
        }

        packer.flush(tx);

        if pending {
            let delay = random_delay(rng, self.config.v3_unsolicited_report_interval);
            self.state_change.start(now, delay);
        }
    }

    fn group_timers<D>(&mut self, tx: &mut Sender<'_, D>, now: Instant)
        where D: Device + ?Sized,
    {
        let version = self.version;
        let mut packer = Packer::new(self.config.max_message_size);

        for group in self.groups.values_mut() {
            if !group.timer.fire(now) {
                continue;
            }

            match version {
                Version::V1 | Version::V2 => {
                    if group.state == GroupState::DelayingMember {
                        tx.send_report(version, group.addr);
                        group.last_reporter = true;
                        group.state = GroupState::IdleMember;
                    }
                },
                Version::V3 => {
                    report::query_response_record(&mut packer, tx, group);
                    group.queried.clear();
                    group.state = GroupState::IdleMember;
                },
            }
        }

        packer.flush(tx);
    }
}

impl<const S: usize> Group<S> {
    /// Count one transmission of the pending state change records.
    fn retransmitted(&mut self) {
        self.retransmit = self.retransmit.saturating_sub(1);
        self.allow.retransmitted();
        self.block.retransmitted();
    }
}

/// Merge the change from the current filter of a group to `new` into its pending records.
///
/// A filter mode change discards source list changes, the mode change record lists all current
/// sources. In `INCLUDE` mode, new sources are allowed and removed ones blocked. In `EXCLUDE`
/// mode it is the other way around. A source that changes back before its record was sent often
/// enough moves to the other list with a fresh counter.
fn merge_change<const S: usize>(group: &mut Group<S>, new: Filter<S>, robustness: u8) {
    if group.filter.mode != new.mode {
        group.clear_changes();
        group.retransmit = robustness;
        group.filter = new;
        return;
    }

    let (listed, unlisted) = match new.mode {
        FilterMode::Include => (&mut group.allow, &mut group.block),
        FilterMode::Exclude => (&mut group.block, &mut group.allow),
    };

    let old = &group.filter.sources;
    let mut result = Ok(());
    for addr in new.sources.addrs().filter(|&addr| !old.contains(addr)) {
        unlisted.remove(addr);
        result = result.and(listed.add_with_retransmit(addr, robustness));
    }

    for addr in old.addrs().filter(|&addr| !new.sources.contains(addr)) {
        listed.remove(addr);
        result = result.and(unlisted.add_with_retransmit(addr, robustness));
    }

    if result.is_err() {
        net_debug!("igmp: source changes of {} overflow, reporting the filter mode", group.addr);
        group.clear_changes();
        group.retransmit = robustness;
    }

    group.filter = new;
}

/// A uniformly random delay in `[0, max)`.
fn random_delay<R: RngCore + ?Sized>(rng: &mut R, max: Duration) -> Duration {
    let max = max.as_millis().min(u128::from(u64::MAX)) as u64;
    if max == 0 {
        return Duration::from_millis(0);
    }

    Duration::from_millis(rng.gen_range(0..max))
}
