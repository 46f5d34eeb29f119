//! Construction of version 3 reports.
use crate::layer::mcast::FilterMode;
use crate::nic::Device;
use crate::wire::{igmp_group_record, igmp_packet, Checksum, IgmpRecordRepr, IgmpRecordType, IgmpRepr};
use crate::wire::igmp::{HEADER_LEN, RECORD_HEADER_LEN};
use crate::wire::Ipv4Address;

use super::{Group, GroupState, Sender};

/// The largest report that is ever built.
///
/// An Ethernet MTU minus the IPv4 header with its Router Alert option.
pub const MAX_MESSAGE_SIZE: usize = 1500 - 20 - 4;

/// Streams group records into as few messages as possible.
///
/// Records are appended until the next one does not fit, then the message is sent and a new one
/// is started. Each caller must `flush` at the end.
pub(super) struct Packer {
    buffer: [u8; MAX_MESSAGE_SIZE],
    limit: usize,
    len: usize,
    records: u16,
}

impl Packer {
    pub(super) fn new(max_message_size: usize) -> Self {
        let smallest = HEADER_LEN + RECORD_HEADER_LEN;
        Packer {
            buffer: [0; MAX_MESSAGE_SIZE],
            limit: max_message_size.min(MAX_MESSAGE_SIZE).max(smallest),
            len: HEADER_LEN,
            records: 0,
        }
    }

    /// Append one record, sending the current message first if the record does not fit.
    pub(super) fn push<D, I>(
        &mut self,
        tx: &mut Sender<'_, D>,
        record_type: IgmpRecordType,
        group: Ipv4Address,
        sources: I,
    )
    where
        D: Device + ?Sized,
        I: Iterator<Item=Ipv4Address> + Clone,
    {
        let max_sources = (self.limit - HEADER_LEN - RECORD_HEADER_LEN) / 4;
        let mut num_sources = sources.clone().count();
        if num_sources > max_sources {
            net_debug!("igmp: {} sources of {} exceed a report, sending none", num_sources, group);
            num_sources = 0;
        }

        let repr = IgmpRecordRepr {
            record_type,
            aux_data_len: 0,
            num_sources: num_sources as u16,
            mcast_addr: group,
        };

        let len = repr.buffer_len();
        if self.len + len > self.limit {
            self.flush(tx);
        }

        let record = igmp_group_record::new_unchecked_mut(&mut self.buffer[self.len..self.len + len]);
        repr.emit(record);
        for (idx, addr) in sources.take(num_sources).enumerate() {
            record.set_source(idx, addr);
        }

        self.len += len;
        self.records += 1;
    }

    /// Send the message in progress, if it holds any record.
    pub(super) fn flush<D>(&mut self, tx: &mut Sender<'_, D>)
        where D: Device + ?Sized,
    {
        if self.records == 0 {
            return;
        }

        let packet = igmp_packet::new_unchecked_mut(&mut self.buffer[..self.len]);
        let repr = IgmpRepr::ReportV3 { num_records: self.records };
        repr.emit(packet, Checksum::Manual);
        net_trace!("igmp: sending {}", repr);
        tx.send_v3_report(packet.as_bytes());

        self.len = HEADER_LEN;
        self.records = 0;
    }
}

/// Append the pending state change records of a group.
///
/// A pending filter mode change is reported with the complete source list and replaces the
/// source list changes.
pub(super) fn state_change_records<D, const S: usize>(
    packer: &mut Packer,
    tx: &mut Sender<'_, D>,
    group: &Group<S>,
)
    where D: Device + ?Sized,
{
    if group.retransmit > 0 {
        let record_type = match group.filter.mode {
            FilterMode::Include => IgmpRecordType::ChangeToInclude,
            FilterMode::Exclude => IgmpRecordType::ChangeToExclude,
        };
        packer.push(tx, record_type, group.addr, group.filter.sources.addrs());
        return;
    }

    if !group.allow.is_empty() {
        packer.push(tx, IgmpRecordType::AllowNewSources, group.addr, group.allow.addrs());
    }

    if !group.block.is_empty() {
        packer.push(tx, IgmpRecordType::BlockOldSources, group.addr, group.block.addrs());
    }
}

/// Append the current state record of a group, if it has reception state.
pub(super) fn current_state_record<D, const S: usize>(
    packer: &mut Packer,
    tx: &mut Sender<'_, D>,
    group: &Group<S>,
)
    where D: Device + ?Sized,
{
    if group.state == GroupState::InitMember || group.filter.is_nonexistent() {
        return;
    }

    let record_type = match group.filter.mode {
        FilterMode::Include => IgmpRecordType::ModeIsInclude,
        FilterMode::Exclude => IgmpRecordType::ModeIsExclude,
    };
    packer.push(tx, record_type, group.addr, group.filter.sources.addrs());
}

/// Append the response to a group specific or group-and-source specific query.
///
/// Of the queried sources, reports those that are received.
pub(super) fn query_response_record<D, const S: usize>(
    packer: &mut Packer,
    tx: &mut Sender<'_, D>,
    group: &Group<S>,
)
    where D: Device + ?Sized,
{
    if group.queried.is_empty() {
        return current_state_record(packer, tx, group);
    }

    let queried = &group.queried;
    let current = &group.filter.sources;
    match group.filter.mode {
        FilterMode::Include => {
            let sources = current.addrs().filter(move |&addr| queried.contains(addr));
            if sources.clone().next().is_some() {
                packer.push(tx, IgmpRecordType::ModeIsInclude, group.addr, sources);
            }
        },
        FilterMode::Exclude => {
            let sources = queried.addrs().filter(move |&addr| !current.contains(addr));
            if sources.clone().next().is_some() {
                packer.push(tx, IgmpRecordType::ModeIsInclude, group.addr, sources);
            }
        },
    }
}
