/*! Time structures.

The protocol engine never reads a clock on its own. Every entry point takes the current
[`Instant`] as an argument and timers are stored as absolute deadlines.

 - [`Instant`] is used to represent absolute time.
 - [`Duration`] is used to represent relative time.
 - [`Timer`] is a one-shot deadline that can be started, shortened and stopped.
*/
use core::{cmp, fmt, ops};
pub use core::time::Duration;

/// A representation of an absolute time value.
///
/// The `Instant` type is a wrapper around a `i64` value that represents a number of
/// milliseconds, monotonically increasing since an arbitrary moment in time, such as system
/// startup.
///
/// * A value of `0` is inherently arbitrary.
/// * A value less than `0` indicates a time before the starting point.
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Instant {
    /// Milliseconds since the arbitrary origin.
    pub millis: i64,
}

/// An expiration time, inversion of `Option`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Expiration {
    /// Expires at the given instant.
    When(Instant),
    /// Never expires.
    Never,
}

use Expiration::{When, Never};

/// A one-shot protocol timer.
///
/// The timer is *running* while it holds a deadline. It *fires* when polled at or after that
/// deadline, which also stops it.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Timer {
    deadline: Expiration,
}

impl Instant {
    /// Create a new `Instant` from a number of milliseconds.
    pub fn from_millis<T: Into<i64>>(millis: T) -> Instant {
        Instant { millis: millis.into() }
    }

    /// Create a new `Instant` from a number of seconds.
    pub fn from_secs<T: Into<i64>>(secs: T) -> Instant {
        Instant { millis: secs.into() * 1000 }
    }

    /// Create a new `Instant` from the current [`std::time::SystemTime`].
    #[cfg(feature = "std")]
    pub fn now() -> Instant {
        Self::from(::std::time::SystemTime::now())
    }

    /// The fractional number of milliseconds that have passed
    /// since the beginning of time.
    pub fn millis(&self) -> i64 {
        self.millis % 1000
    }

    /// The number of whole seconds that have passed since the
    /// beginning of time.
    pub fn secs(&self) -> i64 {
        self.millis / 1000
    }

    /// The total number of milliseconds that have passed since
    /// the beginning of time.
    pub fn total_millis(&self) -> i64 {
        self.millis
    }
}

impl Timer {
    /// A timer that is not running.
    pub const fn stopped() -> Self {
        Timer { deadline: Never }
    }

    /// (Re)start the timer so that it fires `delay` after `now`.
    pub fn start(&mut self, now: Instant, delay: Duration) {
        self.deadline = When(now + delay);
    }

    /// Start the timer, unless it is already running with an earlier deadline.
    ///
    /// Returns whether the deadline was changed.
    pub fn start_or_shorten(&mut self, now: Instant, delay: Duration) -> bool {
        let candidate = When(now + delay);
        if candidate < self.deadline {
            self.deadline = candidate;
            true
        } else {
            false
        }
    }

    /// Stop the timer without firing it.
    pub fn stop(&mut self) {
        self.deadline = Never;
    }

    /// Whether a deadline is pending.
    pub fn is_running(&self) -> bool {
        self.deadline != Never
    }

    /// The pending deadline.
    pub fn deadline(&self) -> Expiration {
        self.deadline
    }

    /// Time left until the deadline, zero if it already passed.
    pub fn remaining(&self, now: Instant) -> Option<Duration> {
        match self.deadline {
            Never => None,
            When(at) if at <= now => Some(Duration::from_millis(0)),
            When(at) => Some(at - now),
        }
    }

    /// Poll the timer, stopping it if it is due.
    ///
    /// Returns `true` exactly once per started deadline.
    pub fn fire(&mut self, now: Instant) -> bool {
        match self.deadline {
            When(at) if at <= now => {
                self.deadline = Never;
                true
            },
            _ => false,
        }
    }
}

#[cfg(feature = "std")]
impl From<::std::time::SystemTime> for Instant {
    fn from(other: ::std::time::SystemTime) -> Instant {
        // A clock before the epoch is clamped to the origin.
        let n = other.duration_since(::std::time::UNIX_EPOCH)
            .unwrap_or_default();
        Self::from_millis(n.as_secs() as i64 * 1000 + (n.subsec_nanos() / 1000000) as i64)
    }
}

impl fmt::Display for Instant {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}.{:03}s", self.secs(), self.millis())
    }
}

impl ops::Add<Duration> for Instant {
    type Output = Instant;

    fn add(self, rhs: Duration) -> Instant {
        Instant::from_millis(self.millis + rhs.as_millis() as i64)
    }
}

impl ops::AddAssign<Duration> for Instant {
    fn add_assign(&mut self, rhs: Duration) {
        self.millis += rhs.as_millis() as i64;
    }
}

impl ops::Sub<Duration> for Instant {
    type Output = Instant;

    fn sub(self, rhs: Duration) -> Instant {
        Instant::from_millis(self.millis - rhs.as_millis() as i64)
    }
}

impl ops::Sub<Instant> for Instant {
    type Output = Duration;

    fn sub(self, rhs: Instant) -> Duration {
        Duration::from_millis((self.millis - rhs.millis).unsigned_abs())
    }
}

impl Default for Expiration {
    fn default() -> Self {
        Expiration::Never
    }
}

impl From<Option<Instant>> for Expiration {
    fn from(opt: Option<Instant>) -> Self {
        match opt {
            Some(instant) => When(instant),
            None => Never,
        }
    }
}

impl From<Expiration> for Option<Instant> {
    fn from(opt: Expiration) -> Self {
        match opt {
            When(instant) => Some(instant),
            Never => None,
        }
    }
}

impl cmp::PartialOrd<Self> for Expiration {
    fn partial_cmp(&self, other: &Self) -> Option<cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl cmp::Ord for Expiration {
    fn cmp(&self, other: &Self) -> cmp::Ordering {
        match (*self, *other) {
            (Never, Never) => cmp::Ordering::Equal,
            (Never, When(_)) => cmp::Ordering::Greater,
            (When(_), Never) => cmp::Ordering::Less,
            (When(ref a), When(ref b)) => a.cmp(b),
        }
    }
}
