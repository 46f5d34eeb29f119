//! Internet Group Management Protocol messages.
//!
//! Covers the version 1 and 2 messages of [RFC 1112] and [RFC 2236] as well as the version 3
//! queries and reports with their group records of [RFC 3376].
//!
//! [RFC 1112]: https://tools.ietf.org/html/rfc1112
//! [RFC 2236]: https://tools.ietf.org/html/rfc2236
//! [RFC 3376]: https://tools.ietf.org/html/rfc3376
use core::fmt;
use byteorder::{ByteOrder, NetworkEndian};

use crate::time::Duration;
use super::{Error, Checksum, Result};
use super::ip::checksum;
use super::Ipv4Address as Address;

enum_with_unknown! {
    /// Internet Group Management Protocol message type.
    pub doc enum Message(u8) {
        /// Membership Query, of any version
        MembershipQuery    = 0x11,
        /// Version 1 Membership Report
        MembershipReportV1 = 0x12,
        /// Version 2 Membership Report
        MembershipReportV2 = 0x16,
        /// Leave Group (version 2 only)
        LeaveGroup         = 0x17,
        /// Version 3 Membership Report
        MembershipReportV3 = 0x22,
    }
}

impl fmt::Display for Message {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Message::MembershipQuery    => write!(f, "membership query"),
            Message::MembershipReportV1 => write!(f, "version 1 membership report"),
            Message::MembershipReportV2 => write!(f, "version 2 membership report"),
            Message::LeaveGroup         => write!(f, "leave group"),
            Message::MembershipReportV3 => write!(f, "version 3 membership report"),
            Message::Unknown(id)        => write!(f, "{}", id)
        }
    }
}

enum_with_unknown! {
    /// The type of a group record in a version 3 report.
    pub doc enum RecordType(u8) {
        /// Current-State Record, MODE_IS_INCLUDE
        ModeIsInclude   = 1,
        /// Current-State Record, MODE_IS_EXCLUDE
        ModeIsExclude   = 2,
        /// Filter-Mode-Change Record, CHANGE_TO_INCLUDE_MODE
        ChangeToInclude = 3,
        /// Filter-Mode-Change Record, CHANGE_TO_EXCLUDE_MODE
        ChangeToExclude = 4,
        /// Source-List-Change Record, ALLOW_NEW_SOURCES
        AllowNewSources = 5,
        /// Source-List-Change Record, BLOCK_OLD_SOURCES
        BlockOldSources = 6,
    }
}

impl fmt::Display for RecordType {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            RecordType::ModeIsInclude   => write!(f, "IS_IN"),
            RecordType::ModeIsExclude   => write!(f, "IS_EX"),
            RecordType::ChangeToInclude => write!(f, "TO_IN"),
            RecordType::ChangeToExclude => write!(f, "TO_EX"),
            RecordType::AllowNewSources => write!(f, "ALLOW"),
            RecordType::BlockOldSources => write!(f, "BLOCK"),
            RecordType::Unknown(id)     => write!(f, "{}", id)
        }
    }
}

/// The protocol version of a message, or the compatibility mode of a host.
///
/// Versions are ordered, an older querier forces a host into an older mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Version {
    /// IGMPv1, [RFC 1112](https://tools.ietf.org/html/rfc1112)
    V1,
    /// IGMPv2, [RFC 2236](https://tools.ietf.org/html/rfc2236)
    V2,
    /// IGMPv3, [RFC 3376](https://tools.ietf.org/html/rfc3376)
    V3,
}

impl fmt::Display for Version {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Version::V1 => write!(f, "IGMPv1"),
            Version::V2 => write!(f, "IGMPv2"),
            Version::V3 => write!(f, "IGMPv3"),
        }
    }
}

byte_wrapper! {
    /// A byte sequence representing an IGMP message.
    #[derive(Debug, PartialEq, Eq)]
    pub struct igmp([u8]);
}

byte_wrapper! {
    /// A byte sequence representing a group record of a version 3 report.
    #[derive(Debug, PartialEq, Eq)]
    pub struct group_record([u8]);
}

mod field {
    use crate::wire::field::Field;

    pub const TYPE:          usize = 0;
    pub const MAX_RESP_CODE: usize = 1;
    pub const CHECKSUM:      Field = 2..4;
    pub const GROUP_ADDR:    Field = 4..8;

    pub const HEADER_END:    usize = 8;

    // Version 3 query.
    pub const QUERY_FLAGS:   usize = 8;
    pub const QQIC:          usize = 9;
    pub const NUM_SOURCES:   Field = 10..12;
    pub const QUERY_END:     usize = 12;

    // Version 3 report.
    pub const REPORT_FLAGS:  Field = 4..6;
    pub const NUM_RECORDS:   Field = 6..8;

    // Group record.
    pub const RECORD_TYPE:   usize = 0;
    pub const AUX_DATA_LEN:  usize = 1;
    pub const RECORD_NUM_SOURCES: Field = 2..4;
    pub const MCAST_ADDR:    Field = 4..8;
    pub const RECORD_END:    usize = 8;
}

/// The length of the common IGMP message header.
pub const HEADER_LEN: usize = field::HEADER_END;

/// The length of a version 3 query without sources.
pub const V3_QUERY_LEN: usize = field::QUERY_END;

/// The length of a group record without sources or auxiliary data.
pub const RECORD_HEADER_LEN: usize = field::RECORD_END;

/// The maximum Querier's Robustness Variable representable in a query.
pub const MAX_QRV: u8 = 7;

/// Code values at or above this are in the floating point format.
const FLOATING_POINT_SWITCH_POINT: u8 = 128;

/// The largest value representable by a floating point code.
pub const FLOATING_POINT_MAX_VALUE: u32 = (0x0f | 0x10) << (7 + 3);

/// Decode the 8-bit Max Resp Code or QQIC of a version 3 message.
///
/// A code below 128 is the literal value. Otherwise, the code is a floating point value with a
/// three bit exponent and a four bit mantissa, see [RFC 3376 § 4.1.1].
///
/// ```
/// # use igmp_host::wire::igmp::decode_time_code;
/// assert_eq!(decode_time_code(100), 100);
/// assert_eq!(decode_time_code(0x80), 128);
/// assert_eq!(decode_time_code(0xff), 31744);
/// ```
///
/// [RFC 3376 § 4.1.1]: https://tools.ietf.org/html/rfc3376#section-4.1.1
pub fn decode_time_code(code: u8) -> u32 {
    if code < FLOATING_POINT_SWITCH_POINT {
        code.into()
    } else {
        let exp = u32::from((code >> 4) & 0x07);
        let mant = u32::from(code & 0x0f);
        (mant | 0x10) << (exp + 3)
    }
}

/// Encode a value as an 8-bit Max Resp Code or QQIC.
///
/// Values that have no exact representation are rounded down, values beyond the representable
/// range saturate.
pub fn encode_time_code(value: u32) -> u8 {
    if value < u32::from(FLOATING_POINT_SWITCH_POINT) {
        return value as u8;
    }

    if value >= FLOATING_POINT_MAX_VALUE {
        return 0xff;
    }

    let mut exp = 0u8;
    while value >> (exp + 3) > 0x1f {
        exp += 1;
    }

    let mant = (value >> (exp + 3)) as u8 & 0x0f;
    0x80 | (exp << 4) | mant
}

impl igmp {
    /// Imbue a raw octet buffer with IGMP message structure.
    pub fn new_unchecked(buffer: &[u8]) -> &igmp {
        Self::__from_macro_new_unchecked(buffer)
    }

    /// Imbue a mutable octet buffer with IGMP message structure.
    pub fn new_unchecked_mut(buffer: &mut [u8]) -> &mut igmp {
        Self::__from_macro_new_unchecked_mut(buffer)
    }

    /// Shorthand for a combination of [new_unchecked] and [check_len].
    ///
    /// [new_unchecked]: #method.new_unchecked
    /// [check_len]: #method.check_len
    pub fn new_checked(data: &[u8]) -> Result<&igmp> {
        let packet = Self::new_unchecked(data);
        packet.check_len()?;
        Ok(packet)
    }

    /// Unwrap the packet as a raw byte slice.
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    /// Unwrap the packet as a mutable raw byte slice.
    pub fn as_bytes_mut(&mut self) -> &mut [u8] {
        &mut self.0
    }

    /// Ensure that no header accessor method will panic if called.
    ///
    /// Returns `Err(Error::Truncated)` if the buffer is shorter than the common header. For a
    /// version 3 query, the source list must also be contained in the buffer. Group records of a
    /// version 3 report are checked individually while iterating them.
    pub fn check_len(&self) -> Result<()> {
        let len = self.0.len();
        if len < field::HEADER_END {
            return Err(Error::Truncated);
        }

        if self.msg_type() == Message::MembershipQuery && len >= field::QUERY_END {
            let sources = usize::from(self.num_sources()) * 4;
            if len < field::QUERY_END + sources {
                return Err(Error::Truncated);
            }
        }

        Ok(())
    }

    /// Return the message type field.
    #[inline]
    pub fn msg_type(&self) -> Message {
        Message::from(self.0[field::TYPE])
    }

    /// Return the maximum response code field.
    ///
    /// In version 1 messages this field is unused and zero.
    #[inline]
    pub fn max_resp_code(&self) -> u8 {
        self.0[field::MAX_RESP_CODE]
    }

    /// Return the checksum field.
    #[inline]
    pub fn checksum(&self) -> u16 {
        NetworkEndian::read_u16(&self.0[field::CHECKSUM])
    }

    /// Return the group address field.
    ///
    /// # Panics
    /// This function may panic if this is a version 3 report.
    #[inline]
    pub fn group_addr(&self) -> Address {
        Address::from_bytes(&self.0[field::GROUP_ADDR])
    }

    /// Return the Suppress Router-Side Processing flag of a version 3 query.
    #[inline]
    pub fn s_flag(&self) -> bool {
        self.0[field::QUERY_FLAGS] & 0x08 != 0
    }

    /// Return the Querier's Robustness Variable of a version 3 query.
    #[inline]
    pub fn qrv(&self) -> u8 {
        self.0[field::QUERY_FLAGS] & 0x07
    }

    /// Return the Querier's Query Interval Code of a version 3 query.
    #[inline]
    pub fn qqic(&self) -> u8 {
        self.0[field::QQIC]
    }

    /// Return the number of sources of a version 3 query.
    #[inline]
    pub fn num_sources(&self) -> u16 {
        NetworkEndian::read_u16(&self.0[field::NUM_SOURCES])
    }

    /// Return a source address of a version 3 query.
    ///
    /// # Panics
    /// This function panics if the index is beyond the checked source list.
    pub fn source(&self, idx: usize) -> Address {
        let start = field::QUERY_END + idx * 4;
        Address::from_bytes(&self.0[start..start + 4])
    }

    /// Iterate over the sources of a version 3 query.
    pub fn sources(&self) -> impl Iterator<Item=Address> + '_ {
        (0..usize::from(self.num_sources())).map(move |idx| self.source(idx))
    }

    /// Return the number of group records of a version 3 report.
    #[inline]
    pub fn num_group_records(&self) -> u16 {
        NetworkEndian::read_u16(&self.0[field::NUM_RECORDS])
    }

    /// Iterate over the group records of a version 3 report.
    ///
    /// Each record is length checked. The iteration ends after the announced number of records,
    /// or after the first record that does not fit the message.
    pub fn group_records(&self) -> GroupRecords<'_> {
        GroupRecords {
            remaining: self.num_group_records(),
            data: &self.0[field::HEADER_END..],
        }
    }

    /// Validate the checksum over the whole message.
    pub fn verify_checksum(&self) -> bool {
        checksum::data(&self.0) == !0
    }

    /// Set the message type field.
    #[inline]
    pub fn set_msg_type(&mut self, value: Message) {
        self.0[field::TYPE] = value.into()
    }

    /// Set the maximum response code field.
    #[inline]
    pub fn set_max_resp_code(&mut self, value: u8) {
        self.0[field::MAX_RESP_CODE] = value
    }

    /// Set the checksum field.
    #[inline]
    pub fn set_checksum(&mut self, value: u16) {
        NetworkEndian::write_u16(&mut self.0[field::CHECKSUM], value)
    }

    /// Set the group address field.
    #[inline]
    pub fn set_group_addr(&mut self, addr: Address) {
        self.0[field::GROUP_ADDR].copy_from_slice(addr.as_bytes())
    }

    /// Set the flags octet of a version 3 query from its parts.
    ///
    /// A robustness variable larger than 7 is written as 0, as mandated for queriers.
    #[inline]
    pub fn set_query_flags(&mut self, s_flag: bool, qrv: u8) {
        let qrv = if qrv > MAX_QRV { 0 } else { qrv };
        self.0[field::QUERY_FLAGS] = (u8::from(s_flag) << 3) | qrv
    }

    /// Set the Querier's Query Interval Code of a version 3 query.
    #[inline]
    pub fn set_qqic(&mut self, value: u8) {
        self.0[field::QQIC] = value
    }

    /// Set the number of sources of a version 3 query.
    #[inline]
    pub fn set_num_sources(&mut self, value: u16) {
        NetworkEndian::write_u16(&mut self.0[field::NUM_SOURCES], value)
    }

    /// Set a source address of a version 3 query.
    pub fn set_source(&mut self, idx: usize, addr: Address) {
        let start = field::QUERY_END + idx * 4;
        self.0[start..start + 4].copy_from_slice(addr.as_bytes())
    }

    /// Clear the reserved fields of a version 3 report.
    #[inline]
    pub fn clear_report_flags(&mut self) {
        NetworkEndian::write_u16(&mut self.0[field::REPORT_FLAGS], 0)
    }

    /// Set the number of group records of a version 3 report.
    #[inline]
    pub fn set_num_group_records(&mut self, value: u16) {
        NetworkEndian::write_u16(&mut self.0[field::NUM_RECORDS], value)
    }

    /// Compute and fill in the checksum over the whole message.
    pub fn fill_checksum(&mut self) {
        self.set_checksum(0);
        let checksum = !checksum::data(&self.0);
        self.set_checksum(checksum)
    }

    /// The group records area of a version 3 report.
    pub fn records_mut_slice(&mut self) -> &mut [u8] {
        &mut self.0[field::HEADER_END..]
    }
}

impl AsRef<[u8]> for igmp {
    fn as_ref(&self) -> &[u8] {
        self.as_bytes()
    }
}

impl AsMut<[u8]> for igmp {
    fn as_mut(&mut self) -> &mut [u8] {
        self.as_bytes_mut()
    }
}

/// Iterator over the group records of a version 3 report.
pub struct GroupRecords<'a> {
    remaining: u16,
    data: &'a [u8],
}

impl<'a> Iterator for GroupRecords<'a> {
    type Item = Result<&'a group_record>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.remaining == 0 {
            return None;
        }

        match group_record::new_checked(self.data) {
            Ok(record) => {
                let len = record.total_len();
                self.remaining -= 1;
                self.data = &self.data[len..];
                Some(Ok(group_record::new_unchecked(&record.0[..len])))
            },
            Err(err) => {
                self.remaining = 0;
                Some(Err(err))
            },
        }
    }
}

impl group_record {
    /// Imbue a raw octet buffer with group record structure.
    pub fn new_unchecked(buffer: &[u8]) -> &group_record {
        Self::__from_macro_new_unchecked(buffer)
    }

    /// Imbue a mutable octet buffer with group record structure.
    pub fn new_unchecked_mut(buffer: &mut [u8]) -> &mut group_record {
        Self::__from_macro_new_unchecked_mut(buffer)
    }

    /// Shorthand for a combination of [new_unchecked] and [check_len].
    ///
    /// [new_unchecked]: #method.new_unchecked
    /// [check_len]: #method.check_len
    pub fn new_checked(data: &[u8]) -> Result<&group_record> {
        let record = Self::new_unchecked(data);
        record.check_len()?;
        Ok(record)
    }

    /// Unwrap the record as a raw byte slice.
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    /// Ensure that no accessor method will panic if called.
    ///
    /// The buffer may be longer than the record, see [`total_len`].
    ///
    /// [`total_len`]: #method.total_len
    pub fn check_len(&self) -> Result<()> {
        if self.0.len() < field::RECORD_END {
            return Err(Error::Truncated);
        }

        if self.0.len() < self.total_len() {
            return Err(Error::Truncated);
        }

        Ok(())
    }

    /// Return the record type field.
    #[inline]
    pub fn record_type(&self) -> RecordType {
        RecordType::from(self.0[field::RECORD_TYPE])
    }

    /// Return the length of the auxiliary data in 32-bit words.
    #[inline]
    pub fn aux_data_len(&self) -> u8 {
        self.0[field::AUX_DATA_LEN]
    }

    /// Return the number of sources field.
    #[inline]
    pub fn num_sources(&self) -> u16 {
        NetworkEndian::read_u16(&self.0[field::RECORD_NUM_SOURCES])
    }

    /// Return the multicast address field.
    #[inline]
    pub fn mcast_addr(&self) -> Address {
        Address::from_bytes(&self.0[field::MCAST_ADDR])
    }

    /// The length of the whole record, including sources and auxiliary data.
    pub fn total_len(&self) -> usize {
        field::RECORD_END
            + usize::from(self.num_sources()) * 4
            + usize::from(self.aux_data_len()) * 4
    }

    /// Return a source address.
    ///
    /// # Panics
    /// This function panics if the index is beyond the checked source list.
    pub fn source(&self, idx: usize) -> Address {
        let start = field::RECORD_END + idx * 4;
        Address::from_bytes(&self.0[start..start + 4])
    }

    /// Iterate over the source addresses.
    pub fn sources(&self) -> impl Iterator<Item=Address> + '_ {
        (0..usize::from(self.num_sources())).map(move |idx| self.source(idx))
    }

    /// The auxiliary data following the sources.
    pub fn aux_data(&self) -> &[u8] {
        let start = field::RECORD_END + usize::from(self.num_sources()) * 4;
        &self.0[start..self.total_len()]
    }

    /// Set the record type field.
    #[inline]
    pub fn set_record_type(&mut self, value: RecordType) {
        self.0[field::RECORD_TYPE] = value.into()
    }

    /// Set the length of the auxiliary data in 32-bit words.
    #[inline]
    pub fn set_aux_data_len(&mut self, value: u8) {
        self.0[field::AUX_DATA_LEN] = value
    }

    /// Set the number of sources field.
    #[inline]
    pub fn set_num_sources(&mut self, value: u16) {
        NetworkEndian::write_u16(&mut self.0[field::RECORD_NUM_SOURCES], value)
    }

    /// Set the multicast address field.
    #[inline]
    pub fn set_mcast_addr(&mut self, addr: Address) {
        self.0[field::MCAST_ADDR].copy_from_slice(addr.as_bytes())
    }

    /// Set a source address.
    pub fn set_source(&mut self, idx: usize, addr: Address) {
        let start = field::RECORD_END + idx * 4;
        self.0[start..start + 4].copy_from_slice(addr.as_bytes())
    }
}

/// A high-level representation of an IGMP message header.
///
/// Variable length parts, i.e. the sources of a version 3 query and the group records of a
/// version 3 report, are accessed on the byte wrapper directly.
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub enum Repr {
    /// A membership query of any version.
    MembershipQuery {
        /// The version, derived from message length and response code.
        version: Version,
        /// The maximum response time.
        ///
        /// Zero for version 1 queries, where the receiver uses its default.
        max_resp_time: Duration,
        /// The queried group, unspecified for General Queries.
        group_addr: Address,
        /// The Suppress Router-Side Processing flag (version 3).
        suppress: bool,
        /// The Querier's Robustness Variable (version 3).
        qrv: u8,
        /// The Querier's Query Interval (version 3).
        query_interval: Duration,
        /// The number of queried sources (version 3).
        num_sources: u16,
    },
    /// A version 1 or version 2 membership report.
    MembershipReport {
        /// The version of the report message type.
        version: Version,
        /// The group being reported.
        group_addr: Address,
    },
    /// A version 2 leave group message.
    LeaveGroup {
        /// The group being left.
        group_addr: Address,
    },
    /// A version 3 membership report.
    ReportV3 {
        /// The number of group records that follow the header.
        num_records: u16,
    },
}

impl Repr {
    /// Parse an IGMP message and return a high-level representation.
    ///
    /// Queries are classified by length as in [RFC 3376 § 7.1]: an 8 octet query is version 1 if
    /// its response code is zero and version 2 otherwise, a query of at least 12 octets is
    /// version 3. Other query lengths are malformed.
    ///
    /// [RFC 3376 § 7.1]: https://tools.ietf.org/html/rfc3376#section-7.1
    pub fn parse(packet: &igmp, checksum: Checksum) -> Result<Repr> {
        packet.check_len()?;

        // Valid checksum is expected.
        if checksum.manual() && !packet.verify_checksum() {
            return Err(Error::WrongChecksum);
        }

        match packet.msg_type() {
            Message::MembershipQuery => {
                let len = packet.as_bytes().len();
                let code = packet.max_resp_code();
                if len == field::HEADER_END {
                    let (version, tenths) = if code == 0 {
                        (Version::V1, 0)
                    } else {
                        (Version::V2, u64::from(code))
                    };

                    Ok(Repr::MembershipQuery {
                        version,
                        max_resp_time: Duration::from_millis(tenths * 100),
                        group_addr: packet.group_addr(),
                        suppress: false,
                        qrv: 0,
                        query_interval: Duration::from_secs(0),
                        num_sources: 0,
                    })
                } else if len >= field::QUERY_END {
                    let tenths = u64::from(decode_time_code(code));
                    let qqi = u64::from(decode_time_code(packet.qqic()));
                    Ok(Repr::MembershipQuery {
                        version: Version::V3,
                        max_resp_time: Duration::from_millis(tenths * 100),
                        group_addr: packet.group_addr(),
                        suppress: packet.s_flag(),
                        qrv: packet.qrv(),
                        query_interval: Duration::from_secs(qqi),
                        num_sources: packet.num_sources(),
                    })
                } else {
                    Err(Error::Malformed)
                }
            },
            Message::MembershipReportV1 => Ok(Repr::MembershipReport {
                version: Version::V1,
                group_addr: packet.group_addr(),
            }),
            Message::MembershipReportV2 => Ok(Repr::MembershipReport {
                version: Version::V2,
                group_addr: packet.group_addr(),
            }),
            Message::LeaveGroup => Ok(Repr::LeaveGroup {
                group_addr: packet.group_addr(),
            }),
            Message::MembershipReportV3 => Ok(Repr::ReportV3 {
                num_records: packet.num_group_records(),
            }),
            Message::Unknown(_) => Err(Error::Unrecognized),
        }
    }

    /// Return the length of a message that will be emitted from this high-level representation.
    ///
    /// This includes the source list of a version 3 query but not the group records of a version
    /// 3 report.
    pub fn buffer_len(&self) -> usize {
        match self {
            Repr::MembershipQuery { version: Version::V3, num_sources, .. } => {
                field::QUERY_END + usize::from(*num_sources) * 4
            },
            _ => field::HEADER_END,
        }
    }

    /// Emit a high-level representation into an IGMP message.
    ///
    /// The sources of a version 3 query and the group records of a version 3 report are not
    /// written. When there are any, write them afterwards and then call `fill_checksum` again.
    pub fn emit(&self, packet: &mut igmp, checksum: Checksum) {
        match *self {
            Repr::MembershipQuery {
                version, max_resp_time, group_addr, suppress, qrv, query_interval, num_sources,
            } => {
                let tenths = max_resp_time.as_millis() / 100;
                packet.set_msg_type(Message::MembershipQuery);
                packet.set_group_addr(group_addr);
                match version {
                    Version::V1 => packet.set_max_resp_code(0),
                    Version::V2 => {
                        packet.set_max_resp_code(tenths.min(255) as u8)
                    },
                    Version::V3 => {
                        let tenths = tenths.min(u128::from(u32::MAX)) as u32;
                        let qqi = query_interval.as_secs().min(u64::from(u32::MAX)) as u32;
                        packet.set_max_resp_code(encode_time_code(tenths));
                        packet.set_query_flags(suppress, qrv);
                        packet.set_qqic(encode_time_code(qqi));
                        packet.set_num_sources(num_sources);
                    },
                }
            },
            Repr::MembershipReport { version, group_addr } => {
                packet.set_msg_type(match version {
                    Version::V1 => Message::MembershipReportV1,
                    _ => Message::MembershipReportV2,
                });
                packet.set_max_resp_code(0);
                packet.set_group_addr(group_addr);
            },
            Repr::LeaveGroup { group_addr } => {
                packet.set_msg_type(Message::LeaveGroup);
                packet.set_max_resp_code(0);
                packet.set_group_addr(group_addr);
            },
            Repr::ReportV3 { num_records } => {
                packet.set_msg_type(Message::MembershipReportV3);
                packet.set_max_resp_code(0);
                packet.clear_report_flags();
                packet.set_num_group_records(num_records);
            },
        }

        if checksum.manual() {
            packet.fill_checksum();
        } else {
            packet.set_checksum(0);
        }
    }
}

impl fmt::Display for Repr {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Repr::MembershipQuery { version, max_resp_time, group_addr, num_sources, .. } => {
                write!(f, "{} query group={} max_resp={}ms sources={}",
                       version, group_addr, max_resp_time.as_millis(), num_sources)
            },
            Repr::MembershipReport { version, group_addr } => {
                write!(f, "{} report group={}", version, group_addr)
            },
            Repr::LeaveGroup { group_addr } => {
                write!(f, "IGMPv2 leave group={}", group_addr)
            },
            Repr::ReportV3 { num_records } => {
                write!(f, "IGMPv3 report records={}", num_records)
            },
        }
    }
}

/// A high-level representation of a group record header.
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub struct RecordRepr {
    /// The kind of record.
    pub record_type: RecordType,
    /// Length of auxiliary data, in 32-bit words.
    pub aux_data_len: u8,
    /// Number of source addresses following the header.
    pub num_sources: u16,
    /// The multicast group this record pertains to.
    pub mcast_addr: Address,
}

impl RecordRepr {
    /// Parse a group record header.
    pub fn parse(record: &group_record) -> Result<RecordRepr> {
        record.check_len()?;
        Ok(RecordRepr {
            record_type: record.record_type(),
            aux_data_len: record.aux_data_len(),
            num_sources: record.num_sources(),
            mcast_addr: record.mcast_addr(),
        })
    }

    /// The length of the record, including sources and auxiliary data.
    pub fn buffer_len(&self) -> usize {
        field::RECORD_END
            + usize::from(self.num_sources) * 4
            + usize::from(self.aux_data_len) * 4
    }

    /// Emit the header of the record.
    ///
    /// Sources and auxiliary data must be written separately.
    pub fn emit(&self, record: &mut group_record) {
        record.set_record_type(self.record_type);
        record.set_aux_data_len(self.aux_data_len);
        record.set_num_sources(self.num_sources);
        record.set_mcast_addr(self.mcast_addr);
    }
}

impl fmt::Display for RecordRepr {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}({}) sources={}", self.record_type, self.mcast_addr, self.num_sources)
    }
}
