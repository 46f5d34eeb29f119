use core::fmt;

/// The error type for parsing of the network stack.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Error {
    /// An incoming packet could not be parsed because it was shorter than assumed.
    ///
    /// The packet may be shorter than the minimum length of its message type, or a count field
    /// such as the number of sources or group records may point past the end of the data.
    Truncated,

    /// An incoming packet had an incorrect checksum and was dropped.
    ///
    /// Checksum checks can be disabled with [`Checksum::Ignored`] to enable fuzzing.
    ///
    /// [`Checksum::Ignored`]: enum.Checksum.html
    WrongChecksum,

    /// An incoming packet could not be recognized and was dropped.
    ///
    /// E.g. an IGMP message with an unknown type. Well-crafted standards consider interoperability
    /// with older revisions of their protocols and allow ignoring such messages.
    Unrecognized,

    /// An incoming packet was recognized but was self-contradictory.
    ///
    /// Example: a membership query whose length matches none of the protocol versions.
    Malformed,
}

/// The result type for the wire layer.
pub type Result<T> = core::result::Result<T, Error>;

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Error::Truncated     => write!(f, "truncated packet"),
            Error::WrongChecksum => write!(f, "checksum error"),
            Error::Unrecognized  => write!(f, "unrecognized packet"),
            Error::Malformed     => write!(f, "malformed packet"),
        }
    }
}

#[cfg(feature = "std")]
impl std::error::Error for Error { }
