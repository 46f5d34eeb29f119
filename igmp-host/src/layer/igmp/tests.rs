use rand::{SeedableRng, rngs::SmallRng};

use crate::layer::FnHandler;
use crate::layer::interface::Interface;
use crate::layer::mcast::{Filter, FilterMode, SocketFilter, SourceAddrList};
use crate::nic::{Meta, loopback::Loopback};
use crate::time::{Duration, Expiration, Instant};
use crate::wire::{igmp_packet, Checksum, IgmpRecordType, IgmpRepr, IpProtocol, Ipv4Address, Ipv4Cidr, Ipv4Repr};

use super::{Config, GroupState, Version};

const HOST: Ipv4Address = Ipv4Address::new(10, 0, 0, 1);
const OTHER_HOST: Ipv4Address = Ipv4Address::new(10, 0, 0, 2);
const ROUTER: Ipv4Address = Ipv4Address::new(10, 0, 0, 254);
const GROUP: Ipv4Address = Ipv4Address::new(239, 1, 1, 1);
const SRC_A: Ipv4Address = Ipv4Address::new(192, 168, 0, 1);
const SRC_B: Ipv4Address = Ipv4Address::new(192, 168, 0, 2);
const SRC_C: Ipv4Address = Ipv4Address::new(192, 168, 0, 3);

const NO_SOCKETS: [SocketFilter<4>; 0] = [];

type Nic = Loopback<8, 64>;
type Iface = Interface<SmallRng, 64, 4>;
type Record = (IgmpRecordType, Ipv4Address, Vec<Ipv4Address>);

/// A message taken from the loopback device.
struct Sent {
    meta: Meta,
    repr: IgmpRepr,
    records: Vec<Record>,
    len: usize,
}

fn at(millis: i64) -> Instant {
    Instant::from_millis(millis)
}

fn interface(config: Config) -> Iface {
    let mut iface = Interface::new(config, SmallRng::seed_from_u64(0x1617));
    iface.set_address(Some(Ipv4Cidr::new(HOST, 24)));
    iface
}

fn sent(nic: &mut Nic) -> Vec<Sent> {
    let mut all = Vec::new();
    while let Some(frame) = nic.take() {
        let packet = igmp_packet::new_checked(frame.message()).unwrap();
        let repr = IgmpRepr::parse(packet, Checksum::Manual).unwrap();
        let records = match repr {
            IgmpRepr::ReportV3 { .. } => packet.group_records()
                .map(|record| {
                    let record = record.unwrap();
                    let mut sources: Vec<_> = record.sources().collect();
                    sources.sort();
                    (record.record_type(), record.mcast_addr(), sources)
                })
                .collect(),
            _ => Vec::new(),
        };
        all.push(Sent { meta: frame.meta(), repr, records, len: frame.message().len() });
    }
    all
}

fn query(version: Version, max_resp_time: Duration, group_addr: Ipv4Address, sources: &[Ipv4Address], qrv: u8)
    -> Vec<u8>
{
    let repr = IgmpRepr::MembershipQuery {
        version,
        max_resp_time,
        group_addr,
        suppress: false,
        qrv,
        query_interval: Duration::from_secs(125),
        num_sources: sources.len() as u16,
    };
    let mut bytes = vec![0; repr.buffer_len()];
    let packet = igmp_packet::new_unchecked_mut(&mut bytes);
    repr.emit(packet, Checksum::Manual);
    for (idx, &src) in sources.iter().enumerate() {
        packet.set_source(idx, src);
    }
    packet.fill_checksum();
    bytes
}

fn general_query(version: Version, max_resp_time: Duration) -> Vec<u8> {
    query(version, max_resp_time, Ipv4Address::UNSPECIFIED, &[], 0)
}

fn report(version: Version, group_addr: Ipv4Address) -> Vec<u8> {
    let repr = IgmpRepr::MembershipReport { version, group_addr };
    let mut bytes = vec![0; repr.buffer_len()];
    repr.emit(igmp_packet::new_unchecked_mut(&mut bytes), Checksum::Manual);
    bytes
}

fn ip(src_addr: Ipv4Address, dst_addr: Ipv4Address, message: &[u8]) -> Ipv4Repr {
    Ipv4Repr {
        src_addr,
        dst_addr,
        protocol: IpProtocol::Igmp,
        payload_len: message.len(),
        hop_limit: 1,
    }
}

fn deliver(iface: &mut Iface, now: Instant, dst_addr: Ipv4Address, message: &[u8]) {
    iface.process_message(now, &ip(ROUTER, dst_addr, message), message)
}

fn socket(mode: FilterMode, addrs: &[Ipv4Address]) -> [SocketFilter<4>; 1] {
    let mut sources = SourceAddrList::new();
    for &addr in addrs {
        sources.add(addr).unwrap();
    }
    [SocketFilter::new(GROUP, Filter { mode, sources })]
}

/// Join `GROUP` for all sources and let all state change reports pass.
fn joined(nic: &mut Nic) -> Iface {
    let mut iface = interface(Config::default());
    iface.join(nic, &NO_SOCKETS, at(0), GROUP).unwrap();
    iface.tick(nic, at(0));
    iface.tick(nic, at(1000));
    assert_eq!(sent(nic).len(), 2);
    iface
}

#[test]
fn join_sends_change_to_exclude() {
    let mut nic = Nic::new();
    let mut iface = interface(Config::default());

    iface.join(&mut nic, &NO_SOCKETS, at(0), GROUP).unwrap();
    assert_eq!(iface.host().group_state(GROUP), GroupState::InitMember);
    assert_eq!(nic.pending(), 0);
    assert!(nic.accepts_group(GROUP));

    iface.tick(&mut nic, at(0));
    assert_eq!(iface.host().group_state(GROUP), GroupState::IdleMember);
    let messages = sent(&mut nic);
    assert_eq!(messages.len(), 1);
    assert_eq!(messages[0].meta, Meta {
        src_addr: HOST,
        dst_addr: Ipv4Address::MULTICAST_ALL_IGMPV3_ROUTERS,
        hop_limit: 1,
        router_alert: true,
        tos: 0xc0,
    });
    assert_eq!(messages[0].repr, IgmpRepr::ReportV3 { num_records: 1 });
    assert_eq!(messages[0].records, vec![(IgmpRecordType::ChangeToExclude, GROUP, vec![])]);

    // Retransmitted once more within the unsolicited report interval.
    assert!(iface.host().state_change_timer().is_running());
    iface.tick(&mut nic, at(1000));
    let messages = sent(&mut nic);
    assert_eq!(messages.len(), 1);
    assert_eq!(messages[0].records, vec![(IgmpRecordType::ChangeToExclude, GROUP, vec![])]);

    iface.tick(&mut nic, at(5000));
    assert_eq!(nic.pending(), 0);
    assert!(!iface.host().state_change_timer().is_running());
    assert_eq!(iface.host().group(GROUP).unwrap().retransmit(), 0);
}

#[test]
fn reports_wait_for_address() {
    let mut nic = Nic::new();
    let mut iface: Iface = Interface::new(Config::default(), SmallRng::seed_from_u64(1));

    iface.join(&mut nic, &NO_SOCKETS, at(0), GROUP).unwrap();
    assert_eq!(iface.poll_at(at(0)), Expiration::Never);
    iface.tick(&mut nic, at(0));
    iface.tick(&mut nic, at(60_000));
    assert_eq!(nic.pending(), 0);
    assert_eq!(iface.host().group_state(GROUP), GroupState::InitMember);

    iface.set_address(Some(Ipv4Cidr::new(HOST, 24)));
    assert_eq!(iface.poll_at(at(60_000)), Expiration::When(at(60_000)));
    iface.tick(&mut nic, at(60_000));
    let messages = sent(&mut nic);
    assert_eq!(messages.len(), 1);
    assert_eq!(messages[0].meta.src_addr, HOST);
    assert_eq!(iface.host().group_state(GROUP), GroupState::IdleMember);
}

#[test]
fn v1_query_downgrades() {
    let mut nic = Nic::new();
    let mut iface = interface(Config::default());
    iface.join(&mut nic, &NO_SOCKETS, at(0), GROUP).unwrap();
    iface.tick(&mut nic, at(0));
    nic.clear();
    // A retransmission is still pending.
    assert_eq!(iface.host().group(GROUP).unwrap().retransmit(), 1);

    let message = general_query(Version::V1, Duration::from_secs(0));
    assert_eq!(message[1], 0);
    deliver(&mut iface, at(100), Ipv4Address::MULTICAST_ALL_SYSTEMS, &message);

    let host = iface.host();
    assert_eq!(host.version(), Version::V1);
    assert_eq!(host.v1_querier_timer().remaining(at(100)), Some(Duration::from_secs(400)));
    assert!(!host.state_change_timer().is_running());
    let group = host.group(GROUP).unwrap();
    assert_eq!(group.retransmit(), 0);
    assert!(group.allow().is_empty() && group.block().is_empty());
    // The query itself schedules a report within the default response time.
    assert_eq!(group.state(), GroupState::DelayingMember);
    assert!(group.timer().remaining(at(100)).unwrap() < Duration::from_secs(10));

    iface.tick(&mut nic, at(10_100));
    let messages = sent(&mut nic);
    assert_eq!(messages.len(), 1);
    assert_eq!(messages[0].repr, IgmpRepr::MembershipReport { version: Version::V1, group_addr: GROUP });
    assert_eq!(messages[0].meta.dst_addr, GROUP);
    assert_eq!(messages[0].meta.tos, 0);
    assert_eq!(iface.host().group_state(GROUP), GroupState::IdleMember);
}

#[test]
fn v2_group_specific_query() {
    let mut nic = Nic::new();
    let mut iface = joined(&mut nic);

    // Code 50, five seconds.
    let message = query(Version::V2, Duration::from_secs(5), GROUP, &[], 0);
    assert_eq!(message.len(), 8);
    assert_eq!(message[1], 50);
    deliver(&mut iface, at(2000), GROUP, &message);

    let host = iface.host();
    assert_eq!(host.version(), Version::V2);
    let group = host.group(GROUP).unwrap();
    assert_eq!(group.state(), GroupState::DelayingMember);
    assert!(group.timer().remaining(at(2000)).unwrap() < Duration::from_secs(5));

    iface.tick(&mut nic, at(7000));
    let messages = sent(&mut nic);
    assert_eq!(messages.len(), 1);
    assert_eq!(messages[0].repr, IgmpRepr::MembershipReport { version: Version::V2, group_addr: GROUP });
    assert_eq!(messages[0].meta.dst_addr, GROUP);
    let group = iface.host().group(GROUP).unwrap();
    assert_eq!(group.state(), GroupState::IdleMember);
    assert!(group.last_reporter());

    iface.tick(&mut nic, at(20_000));
    assert_eq!(nic.pending(), 0);
}

#[test]
fn other_queries_do_not_affect_unrelated_groups() {
    let mut nic = Nic::new();
    let mut iface = joined(&mut nic);

    let other = Ipv4Address::new(239, 9, 9, 9);
    let message = query(Version::V2, Duration::from_secs(5), other, &[], 0);
    deliver(&mut iface, at(2000), other, &message);
    assert_eq!(iface.host().group_state(GROUP), GroupState::IdleMember);
    assert_eq!(iface.host().group_state(other), GroupState::NonMember);
}

#[test]
fn packs_reports() {
    let mut nic = Nic::new();
    let config = Config {
        // Header and thirty records without sources.
        max_message_size: 8 + 30 * 8,
        ..Config::default()
    };
    let mut iface = interface(config);

    let groups: Vec<_> = (0..40).map(|i| Ipv4Address::new(239, 1, 0, i)).collect();
    for &group in &groups {
        iface.join(&mut nic, &NO_SOCKETS, at(0), group).unwrap();
    }

    iface.tick(&mut nic, at(0));
    let messages = sent(&mut nic);
    assert_eq!(messages.len(), 2);
    assert_eq!(messages[0].records.len(), 30);
    assert_eq!(messages[1].records.len(), 10);
    iface.tick(&mut nic, at(1000));
    assert_eq!(sent(&mut nic).len(), 2);
    iface.tick(&mut nic, at(2000));
    assert_eq!(nic.pending(), 0);

    let message = general_query(Version::V3, Duration::from_secs(1));
    deliver(&mut iface, at(2000), Ipv4Address::MULTICAST_ALL_SYSTEMS, &message);
    assert!(iface.host().general_query_timer().is_running());
    iface.tick(&mut nic, at(3000));

    let messages = sent(&mut nic);
    assert_eq!(messages.len(), 2);
    assert_eq!(messages[0].records.len(), 30);
    assert_eq!(messages[1].records.len(), 10);
    let mut reported: Vec<_> = messages.iter()
        .inspect(|message| assert!(message.len <= 8 + 30 * 8))
        .flat_map(|message| message.records.iter())
        .inspect(|record| assert_eq!(record.0, IgmpRecordType::ModeIsExclude))
        .map(|record| record.1)
        .collect();
    reported.sort();
    assert_eq!(reported, groups);
}

#[test]
fn compatibility_mode_follows_oldest_querier() {
    let mut nic = Nic::new();
    let mut iface = interface(Config::default());
    let v1 = general_query(Version::V1, Duration::from_secs(0));
    let v2 = general_query(Version::V2, Duration::from_secs(10));
    let v3 = general_query(Version::V3, Duration::from_secs(10));

    deliver(&mut iface, at(0), Ipv4Address::MULTICAST_ALL_SYSTEMS, &v2);
    assert_eq!(iface.host().version(), Version::V2);
    // Newer queriers do not upgrade the mode.
    deliver(&mut iface, at(50_000), Ipv4Address::MULTICAST_ALL_SYSTEMS, &v3);
    assert_eq!(iface.host().version(), Version::V2);
    deliver(&mut iface, at(100_000), Ipv4Address::MULTICAST_ALL_SYSTEMS, &v1);
    assert_eq!(iface.host().version(), Version::V1);

    // The version 2 querier timed out but the version 1 querier is still present.
    iface.tick(&mut nic, at(400_000));
    assert_eq!(iface.host().version(), Version::V1);
    assert!(!iface.host().v2_querier_timer().is_running());
    iface.tick(&mut nic, at(500_000));
    assert_eq!(iface.host().version(), Version::V3);
}

#[test]
fn v1_querier_expiry_falls_back_to_v2() {
    let mut nic = Nic::new();
    let mut iface = interface(Config::default());
    let v1 = general_query(Version::V1, Duration::from_secs(0));
    let v2 = general_query(Version::V2, Duration::from_secs(10));

    deliver(&mut iface, at(0), Ipv4Address::MULTICAST_ALL_SYSTEMS, &v1);
    deliver(&mut iface, at(100_000), Ipv4Address::MULTICAST_ALL_SYSTEMS, &v2);
    assert_eq!(iface.host().version(), Version::V1);

    iface.tick(&mut nic, at(400_000));
    assert_eq!(iface.host().version(), Version::V2);
    iface.tick(&mut nic, at(500_000));
    assert_eq!(iface.host().version(), Version::V3);
}

#[test]
fn leave_retransmits_until_deleted() {
    let mut nic = Nic::new();
    let mut iface = joined(&mut nic);

    iface.leave(&mut nic, &NO_SOCKETS, at(2000), GROUP).unwrap();
    assert!(iface.filters().get(GROUP).is_none());
    assert!(!nic.accepts_group(GROUP));
    assert!(!iface.accepts(GROUP, SRC_A));

    let messages = sent(&mut nic);
    assert_eq!(messages.len(), 1);
    assert_eq!(messages[0].records, vec![(IgmpRecordType::ChangeToInclude, GROUP, vec![])]);

    // Kept while a retransmission is pending.
    let group = iface.host().group(GROUP).unwrap();
    assert_eq!(group.retransmit(), 1);
    assert!(group.filter().is_nonexistent());

    iface.tick(&mut nic, at(3000));
    let messages = sent(&mut nic);
    assert_eq!(messages.len(), 1);
    assert_eq!(messages[0].records, vec![(IgmpRecordType::ChangeToInclude, GROUP, vec![])]);
    assert_eq!(iface.host().group_state(GROUP), GroupState::NonMember);
    assert_eq!(iface.host().groups().count(), 0);
}

#[test]
fn rejoin_during_leave() {
    let mut nic = Nic::new();
    let mut iface = joined(&mut nic);

    iface.leave(&mut nic, &NO_SOCKETS, at(2000), GROUP).unwrap();
    iface.join(&mut nic, &NO_SOCKETS, at(2100), GROUP).unwrap();
    let messages = sent(&mut nic);
    assert_eq!(messages.len(), 2);
    assert_eq!(messages[1].records, vec![(IgmpRecordType::ChangeToExclude, GROUP, vec![])]);
    let group = iface.host().group(GROUP).unwrap();
    assert_eq!(group.state(), GroupState::IdleMember);
    assert_eq!(group.retransmit(), 1);
}

#[test]
fn group_and_source_specific_query() {
    let mut nic = Nic::new();
    let mut iface = interface(Config::default());
    let sockets = socket(FilterMode::Include, &[SRC_A, SRC_B]);
    iface.update_multicast_filter(&mut nic, &sockets, at(0), Some(GROUP));

    iface.tick(&mut nic, at(0));
    let messages = sent(&mut nic);
    assert_eq!(messages.len(), 1);
    assert_eq!(messages[0].records, vec![(IgmpRecordType::AllowNewSources, GROUP, vec![SRC_A, SRC_B])]);
    iface.tick(&mut nic, at(1000));
    assert_eq!(sent(&mut nic).len(), 1);
    assert!(!iface.host().group(GROUP).unwrap().has_pending_changes());

    let message = query(Version::V3, Duration::from_secs(1), GROUP, &[SRC_B, SRC_C], 0);
    deliver(&mut iface, at(2000), GROUP, &message);
    let group = iface.host().group(GROUP).unwrap();
    assert_eq!(group.state(), GroupState::DelayingMember);
    assert_eq!(group.queried().len(), 2);

    iface.tick(&mut nic, at(3000));
    let messages = sent(&mut nic);
    assert_eq!(messages.len(), 1);
    assert_eq!(messages[0].records, vec![(IgmpRecordType::ModeIsInclude, GROUP, vec![SRC_B])]);
    let group = iface.host().group(GROUP).unwrap();
    assert_eq!(group.state(), GroupState::IdleMember);
    assert!(group.queried().is_empty());

    // No queried source is received, nothing to report.
    let message = query(Version::V3, Duration::from_secs(1), GROUP, &[SRC_C], 0);
    deliver(&mut iface, at(4000), GROUP, &message);
    iface.tick(&mut nic, at(5000));
    assert_eq!(nic.pending(), 0);

    // A group specific query is answered with the complete state.
    let message = query(Version::V3, Duration::from_secs(1), GROUP, &[], 0);
    deliver(&mut iface, at(6000), GROUP, &message);
    iface.tick(&mut nic, at(7000));
    let messages = sent(&mut nic);
    assert_eq!(messages.len(), 1);
    assert_eq!(messages[0].records, vec![(IgmpRecordType::ModeIsInclude, GROUP, vec![SRC_A, SRC_B])]);
}

#[test]
fn source_specific_query_in_exclude_mode() {
    let mut nic = Nic::new();
    let mut iface = interface(Config::default());
    let sockets = socket(FilterMode::Exclude, &[SRC_A]);
    iface.update_multicast_filter(&mut nic, &sockets, at(0), Some(GROUP));

    iface.tick(&mut nic, at(0));
    let messages = sent(&mut nic);
    assert_eq!(messages[0].records, vec![(IgmpRecordType::ChangeToExclude, GROUP, vec![SRC_A])]);
    iface.tick(&mut nic, at(1000));
    nic.clear();

    let message = query(Version::V3, Duration::from_secs(1), GROUP, &[SRC_A, SRC_C], 0);
    deliver(&mut iface, at(2000), GROUP, &message);
    iface.tick(&mut nic, at(3000));
    let messages = sent(&mut nic);
    assert_eq!(messages.len(), 1);
    assert_eq!(messages[0].records, vec![(IgmpRecordType::ModeIsInclude, GROUP, vec![SRC_C])]);
}

#[test]
fn pending_queries_merge() {
    let mut nic = Nic::new();
    let mut iface = interface(Config::default());
    let sockets = socket(FilterMode::Include, &[SRC_A, SRC_B]);
    iface.update_multicast_filter(&mut nic, &sockets, at(0), Some(GROUP));
    iface.tick(&mut nic, at(0));
    iface.tick(&mut nic, at(1000));
    nic.clear();

    let first = query(Version::V3, Duration::from_secs(1), GROUP, &[SRC_A], 0);
    let second = query(Version::V3, Duration::from_secs(1), GROUP, &[SRC_B], 0);
    deliver(&mut iface, at(2000), GROUP, &first);
    deliver(&mut iface, at(2100), GROUP, &second);
    assert_eq!(iface.host().group(GROUP).unwrap().queried().len(), 2);

    // Widened to the whole group.
    let group_specific = query(Version::V3, Duration::from_secs(1), GROUP, &[], 0);
    deliver(&mut iface, at(2200), GROUP, &group_specific);
    assert!(iface.host().group(GROUP).unwrap().queried().is_empty());
    deliver(&mut iface, at(2300), GROUP, &first);
    assert!(iface.host().group(GROUP).unwrap().queried().is_empty());

    iface.tick(&mut nic, at(4000));
    let messages = sent(&mut nic);
    assert_eq!(messages.len(), 1);
    assert_eq!(messages[0].records, vec![(IgmpRecordType::ModeIsInclude, GROUP, vec![SRC_A, SRC_B])]);
}

#[test]
fn pending_general_response_covers_groups() {
    let mut nic = Nic::new();
    let mut iface = joined(&mut nic);

    let general = general_query(Version::V3, Duration::from_millis(0));
    deliver(&mut iface, at(2000), Ipv4Address::MULTICAST_ALL_SYSTEMS, &general);
    assert!(iface.host().general_query_timer().is_running());

    // Any group response would be scheduled later than the general one.
    let specific = query(Version::V3, Duration::from_secs(25), GROUP, &[], 0);
    deliver(&mut iface, at(2000), GROUP, &specific);
    assert!(!iface.host().group(GROUP).unwrap().timer().is_running());

    iface.tick(&mut nic, at(2100));
    let messages = sent(&mut nic);
    assert_eq!(messages.len(), 1);
    assert_eq!(messages[0].records, vec![(IgmpRecordType::ModeIsExclude, GROUP, vec![])]);
}

#[test]
fn exclude_source_changes() {
    let mut nic = Nic::new();
    let mut iface = interface(Config::default());
    let sockets = socket(FilterMode::Exclude, &[SRC_A]);
    iface.update_multicast_filter(&mut nic, &sockets, at(0), Some(GROUP));
    iface.tick(&mut nic, at(0));
    iface.tick(&mut nic, at(1000));
    nic.clear();

    // Newly excluded sources are blocked.
    let sockets = socket(FilterMode::Exclude, &[SRC_A, SRC_B]);
    iface.update_multicast_filter(&mut nic, &sockets, at(2000), Some(GROUP));
    let messages = sent(&mut nic);
    assert_eq!(messages.len(), 1);
    assert_eq!(messages[0].records, vec![(IgmpRecordType::BlockOldSources, GROUP, vec![SRC_B])]);

    // No longer excluded sources are allowed, the pending block is repeated.
    let sockets = socket(FilterMode::Exclude, &[SRC_B]);
    iface.update_multicast_filter(&mut nic, &sockets, at(2100), Some(GROUP));
    let messages = sent(&mut nic);
    assert_eq!(messages.len(), 1);
    assert_eq!(messages[0].records, vec![
        (IgmpRecordType::AllowNewSources, GROUP, vec![SRC_A]),
        (IgmpRecordType::BlockOldSources, GROUP, vec![SRC_B]),
    ]);

    // The block was sent twice already, the allow once.
    iface.tick(&mut nic, at(3100));
    let messages = sent(&mut nic);
    assert_eq!(messages.len(), 1);
    assert_eq!(messages[0].records, vec![(IgmpRecordType::AllowNewSources, GROUP, vec![SRC_A])]);
    assert!(!iface.host().group(GROUP).unwrap().has_pending_changes());
    assert!(iface.accepts(GROUP, SRC_A));
    assert!(!iface.accepts(GROUP, SRC_B));
}

#[test]
fn mode_change_reports_all_sources() {
    let mut nic = Nic::new();
    let mut iface = interface(Config::default());
    let sockets = socket(FilterMode::Include, &[SRC_A]);
    iface.update_multicast_filter(&mut nic, &sockets, at(0), Some(GROUP));
    iface.tick(&mut nic, at(0));
    iface.tick(&mut nic, at(1000));
    nic.clear();

    let sockets = socket(FilterMode::Exclude, &[SRC_B, SRC_C]);
    iface.update_multicast_filter(&mut nic, &sockets, at(2000), Some(GROUP));
    let messages = sent(&mut nic);
    assert_eq!(messages.len(), 1);
    assert_eq!(messages[0].records, vec![(IgmpRecordType::ChangeToExclude, GROUP, vec![SRC_B, SRC_C])]);
    let group = iface.host().group(GROUP).unwrap();
    assert_eq!(group.retransmit(), 1);
    assert!(group.allow().is_empty() && group.block().is_empty());
}

#[test]
fn report_suppression() {
    let mut nic = Nic::new();
    let mut iface = joined(&mut nic);

    deliver(&mut iface, at(2000), Ipv4Address::MULTICAST_ALL_SYSTEMS,
        &general_query(Version::V2, Duration::from_secs(10)));
    assert_eq!(iface.host().group_state(GROUP), GroupState::DelayingMember);

    // Another member answered first.
    let message = report(Version::V2, GROUP);
    iface.process_message(at(2500), &ip(OTHER_HOST, GROUP, &message), &message);
    let group = iface.host().group(GROUP).unwrap();
    assert_eq!(group.state(), GroupState::IdleMember);
    assert!(!group.timer().is_running());
    assert!(!group.last_reporter());

    iface.tick(&mut nic, at(20_000));
    assert_eq!(nic.pending(), 0);

    // We were not the last to report, routers learn about the leave by timeout.
    iface.leave(&mut nic, &NO_SOCKETS, at(20_000), GROUP).unwrap();
    assert_eq!(nic.pending(), 0);
    assert_eq!(iface.host().group_state(GROUP), GroupState::NonMember);
}

#[test]
fn v2_join_and_leave() {
    let mut nic = Nic::new();
    let mut iface = interface(Config::default());
    deliver(&mut iface, at(0), Ipv4Address::MULTICAST_ALL_SYSTEMS,
        &general_query(Version::V2, Duration::from_secs(10)));

    iface.join(&mut nic, &NO_SOCKETS, at(0), GROUP).unwrap();
    iface.tick(&mut nic, at(0));
    let messages = sent(&mut nic);
    assert_eq!(messages.len(), 1);
    assert_eq!(messages[0].repr, IgmpRepr::MembershipReport { version: Version::V2, group_addr: GROUP });
    assert_eq!(messages[0].meta.dst_addr, GROUP);
    assert!(messages[0].meta.router_alert);
    assert_eq!(iface.host().group_state(GROUP), GroupState::DelayingMember);

    // The unsolicited report is repeated once.
    iface.tick(&mut nic, at(10_000));
    assert_eq!(sent(&mut nic).len(), 1);
    assert_eq!(iface.host().group_state(GROUP), GroupState::IdleMember);
    iface.tick(&mut nic, at(20_000));
    assert_eq!(nic.pending(), 0);

    iface.leave(&mut nic, &NO_SOCKETS, at(20_000), GROUP).unwrap();
    let messages = sent(&mut nic);
    assert_eq!(messages.len(), 1);
    assert_eq!(messages[0].repr, IgmpRepr::LeaveGroup { group_addr: GROUP });
    assert_eq!(messages[0].meta.dst_addr, Ipv4Address::MULTICAST_ALL_ROUTERS);
    assert_eq!(iface.host().group_state(GROUP), GroupState::NonMember);
}

#[test]
fn v1_leave_is_silent() {
    let mut nic = Nic::new();
    let mut iface = interface(Config::default());
    deliver(&mut iface, at(0), Ipv4Address::MULTICAST_ALL_SYSTEMS,
        &general_query(Version::V1, Duration::from_secs(0)));

    iface.join(&mut nic, &NO_SOCKETS, at(0), GROUP).unwrap();
    iface.tick(&mut nic, at(0));
    let messages = sent(&mut nic);
    assert_eq!(messages.len(), 1);
    assert_eq!(messages[0].repr, IgmpRepr::MembershipReport { version: Version::V1, group_addr: GROUP });

    iface.leave(&mut nic, &NO_SOCKETS, at(1000), GROUP).unwrap();
    assert_eq!(nic.pending(), 0);
    assert_eq!(iface.host().group_state(GROUP), GroupState::NonMember);
}

#[test]
fn all_systems_is_not_reported() {
    let mut nic = Nic::new();
    let mut iface = interface(Config::default());

    iface.join(&mut nic, &NO_SOCKETS, at(0), Ipv4Address::MULTICAST_ALL_SYSTEMS).unwrap();
    iface.tick(&mut nic, at(0));
    assert_eq!(nic.pending(), 0);
    assert_eq!(iface.host().groups().count(), 0);
    assert!(nic.accepts_group(Ipv4Address::MULTICAST_ALL_SYSTEMS));
}

#[test]
fn invalid_messages_are_dropped() {
    let mut nic = Nic::new();
    let mut iface = joined(&mut nic);
    let v1 = general_query(Version::V1, Duration::from_secs(0));

    // Wrong TTL.
    let mut repr = ip(ROUTER, Ipv4Address::MULTICAST_ALL_SYSTEMS, &v1);
    repr.hop_limit = 2;
    iface.process_message(at(2000), &repr, &v1);
    assert_eq!(iface.host().version(), Version::V3);

    // Wrong checksum.
    let mut corrupt = v1.clone();
    corrupt[4] ^= 0x01;
    deliver(&mut iface, at(2000), Ipv4Address::MULTICAST_ALL_SYSTEMS, &corrupt);
    assert_eq!(iface.host().version(), Version::V3);

    // Truncated.
    deliver(&mut iface, at(2000), Ipv4Address::MULTICAST_ALL_SYSTEMS, &v1[..6]);
    assert_eq!(iface.host().version(), Version::V3);

    // Not IGMP.
    let mut repr = ip(ROUTER, Ipv4Address::MULTICAST_ALL_SYSTEMS, &v1);
    repr.protocol = IpProtocol::Udp;
    iface.process_message(at(2000), &repr, &v1);
    assert_eq!(iface.host().version(), Version::V3);

    // A general query must be sent to all systems.
    let v3 = general_query(Version::V3, Duration::from_secs(1));
    deliver(&mut iface, at(2000), HOST, &v3);
    assert!(!iface.host().general_query_timer().is_running());

    // A group specific query for a unicast address.
    let bogus = query(Version::V3, Duration::from_secs(1), OTHER_HOST, &[], 0);
    deliver(&mut iface, at(2000), GROUP, &bogus);
    assert!(!iface.host().group(GROUP).unwrap().timer().is_running());

    iface.tick(&mut nic, at(10_000));
    assert_eq!(nic.pending(), 0);
}

#[test]
fn adopts_querier_robustness() {
    let mut nic = Nic::new();
    let mut iface = joined(&mut nic);
    assert_eq!(iface.host().robustness(), 2);

    let message = query(Version::V3, Duration::from_secs(1), Ipv4Address::UNSPECIFIED, &[], 3);
    deliver(&mut iface, at(2000), Ipv4Address::MULTICAST_ALL_SYSTEMS, &message);
    assert_eq!(iface.host().robustness(), 3);

    iface.leave(&mut nic, &NO_SOCKETS, at(2000), GROUP).unwrap();
    assert_eq!(iface.host().group(GROUP).unwrap().retransmit(), 2);

    iface.link_change();
    assert_eq!(iface.host().robustness(), 2);
}

#[test]
fn link_change_restarts() {
    let mut nic = Nic::new();
    let mut iface = joined(&mut nic);
    deliver(&mut iface, at(2000), Ipv4Address::MULTICAST_ALL_SYSTEMS,
        &general_query(Version::V2, Duration::from_secs(10)));
    assert_eq!(iface.host().version(), Version::V2);

    iface.link_change();
    let host = iface.host();
    assert_eq!(host.version(), Version::V3);
    assert!(!host.v2_querier_timer().is_running());
    let group = host.group(GROUP).unwrap();
    assert_eq!(group.state(), GroupState::InitMember);
    assert!(!group.timer().is_running());

    iface.tick(&mut nic, at(3000));
    let messages = sent(&mut nic);
    assert_eq!(messages.len(), 1);
    assert_eq!(messages[0].records, vec![(IgmpRecordType::ChangeToExclude, GROUP, vec![])]);
}

#[test]
fn forwards_to_handler() {
    let mut nic = Nic::new();
    let mut iface = joined(&mut nic);
    let message = report(Version::V2, GROUP);
    let repr = ip(OTHER_HOST, GROUP, &message);

    let mut seen = Vec::new();
    iface.process_message_with(at(2000), &repr, &message,
        FnHandler(|ip: &Ipv4Repr, repr: &IgmpRepr, _: &igmp_packet| seen.push((ip.src_addr, *repr))));
    assert_eq!(seen, vec![(OTHER_HOST, IgmpRepr::MembershipReport { version: Version::V2, group_addr: GROUP })]);

    // Invalid messages are not forwarded.
    let mut seen = 0;
    iface.process_message_with(at(2000), &repr, &message[..4],
        FnHandler(|_: &Ipv4Repr, _: &IgmpRepr, _: &igmp_packet| seen += 1));
    assert_eq!(seen, 0);
}

#[test]
fn poll_at_next_timer() {
    let mut nic = Nic::new();
    let mut iface = interface(Config::default());
    assert_eq!(iface.poll_at(at(0)), Expiration::Never);

    iface.join(&mut nic, &NO_SOCKETS, at(0), GROUP).unwrap();
    assert_eq!(iface.poll_at(at(0)), Expiration::When(at(0)));

    iface.tick(&mut nic, at(0));
    let next = iface.host().state_change_timer().deadline();
    assert_eq!(iface.poll_at(at(0)), next);
    match next {
        Expiration::When(deadline) => assert!(deadline < at(1000)),
        Expiration::Never => panic!("retransmission not scheduled"),
    }
}

#[test]
fn send_failures_are_tolerated() {
    let mut nic = Nic::new();
    let mut iface = interface(Config::default());
    nic.set_fail_sends(true);

    iface.join(&mut nic, &NO_SOCKETS, at(0), GROUP).unwrap();
    iface.tick(&mut nic, at(0));
    assert_eq!(iface.host().group_state(GROUP), GroupState::IdleMember);

    // The retransmission still goes out.
    nic.set_fail_sends(false);
    iface.tick(&mut nic, at(1000));
    assert_eq!(sent(&mut nic).len(), 1);
}

#[test]
fn without_source_filtering() {
    let mut nic = Nic::new();
    let mut iface: Interface<SmallRng, 4, 0> = Interface::new(Config::default(), SmallRng::seed_from_u64(7));
    iface.set_address(Some(Ipv4Cidr::new(HOST, 24)));
    let sockets: [SocketFilter<0>; 0] = [];

    iface.join(&mut nic, &sockets, at(0), GROUP).unwrap();
    iface.tick(&mut nic, at(0));
    iface.tick(&mut nic, at(1000));
    let messages = sent(&mut nic);
    assert_eq!(messages.len(), 2);
    assert_eq!(messages[1].records, vec![(IgmpRecordType::ChangeToExclude, GROUP, vec![])]);

    // Source specific queries degrade to group specific ones.
    let message = query(Version::V3, Duration::from_secs(1), GROUP, &[SRC_A], 0);
    deliver_to(&mut iface, at(2000), GROUP, &message);
    iface.tick(&mut nic, at(3000));
    let messages = sent(&mut nic);
    assert_eq!(messages.len(), 1);
    assert_eq!(messages[0].records, vec![(IgmpRecordType::ModeIsExclude, GROUP, vec![])]);

    iface.leave(&mut nic, &sockets, at(4000), GROUP).unwrap();
    let messages = sent(&mut nic);
    assert_eq!(messages[0].records, vec![(IgmpRecordType::ChangeToInclude, GROUP, vec![])]);
}

#[test]
fn mode_change_settles_unannounced_groups() {
    let mut nic = Nic::new();
    let mut iface: Iface = Interface::new(Config::default(), SmallRng::seed_from_u64(3));
    iface.join(&mut nic, &NO_SOCKETS, at(0), GROUP).unwrap();
    iface.tick(&mut nic, at(0));
    assert_eq!(iface.host().group_state(GROUP), GroupState::InitMember);

    let other = Ipv4Address::new(239, 9, 9, 9);
    let message = query(Version::V2, Duration::from_secs(5), other, &[], 0);
    deliver(&mut iface, at(100), other, &message);
    assert_eq!(iface.host().version(), Version::V2);
    assert_eq!(iface.host().group_state(GROUP), GroupState::IdleMember);
    assert!(!iface.host().group(GROUP).unwrap().timer().is_running());

    // Answers general queries like any other group.
    let message = general_query(Version::V1, Duration::from_secs(0));
    deliver(&mut iface, at(200), Ipv4Address::MULTICAST_ALL_SYSTEMS, &message);
    assert_eq!(iface.host().version(), Version::V1);
    assert_eq!(iface.host().group_state(GROUP), GroupState::DelayingMember);

    iface.tick(&mut nic, at(10_200));
    let messages = sent(&mut nic);
    assert_eq!(messages.len(), 1);
    assert_eq!(messages[0].repr, IgmpRepr::MembershipReport { version: Version::V1, group_addr: GROUP });
    assert_eq!(iface.host().group_state(GROUP), GroupState::IdleMember);
}

#[test]
fn state_changes_wait_for_address() {
    let mut nic = Nic::new();
    let mut iface = joined(&mut nic);
    iface.set_address(None);

    iface.leave(&mut nic, &NO_SOCKETS, at(2000), GROUP).unwrap();
    assert_eq!(nic.pending(), 0);
    assert_eq!(iface.host().group(GROUP).unwrap().retransmit(), 2);
    assert!(iface.host().state_change_timer().is_running());

    // Retransmissions are not counted while nothing can be sent.
    iface.tick(&mut nic, at(3000));
    assert_eq!(nic.pending(), 0);
    assert_eq!(iface.host().group(GROUP).unwrap().retransmit(), 2);
    assert!(iface.host().state_change_timer().is_running());

    iface.set_address(Some(Ipv4Cidr::new(HOST, 24)));
    iface.tick(&mut nic, at(4000));
    let messages = sent(&mut nic);
    assert_eq!(messages.len(), 1);
    assert_eq!(messages[0].meta.src_addr, HOST);
    assert_eq!(messages[0].records, vec![(IgmpRecordType::ChangeToInclude, GROUP, vec![])]);
    assert_eq!(iface.host().group(GROUP).unwrap().retransmit(), 1);
}

fn deliver_to<const G: usize, const S: usize>(
    iface: &mut Interface<SmallRng, G, S>,
    now: Instant,
    dst_addr: Ipv4Address,
    message: &[u8],
) {
    iface.process_message(now, &ip(ROUTER, dst_addr, message), message)
}
