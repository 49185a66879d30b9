//! Simulated time and time advance.
//!
//! This module provides most notably:
//!
//! * [`MonotonicTime`]: a monotonic timestamp based on the [TAI] time
//!   standard, used as the simulated-time axis,
//! * [`TimeAdvance`]: the duration an atomic model remains in its current
//!   state absent external input, possibly infinite.
//!
//! Simulated time is totally ordered and ties are resolved by exact equality:
//! the engine never applies an epsilon tolerance, so any such tolerance must
//! be baked into the time representation by the scheduling collaborator.
//!
//! [TAI]: https://en.wikipedia.org/wiki/International_Atomic_Time

use std::cmp::Ordering;
use std::fmt;
use std::time::Duration;

pub use tai_time::MonotonicTime;

/// The time advance of an atomic model.
///
/// A time advance is either a finite [`Duration`] or [`TimeAdvance::INFINITY`]
/// for a passive state, i.e. a state that can only be left upon reception of
/// an external event. Time advances are totally ordered, with the infinite
/// value comparing greater than all finite values.
///
/// A zero time advance is legal and describes a transitory state that is left
/// immediately.
///
/// # Examples
///
/// ```
/// use std::time::Duration;
/// use pardevs::time::TimeAdvance;
///
/// let busy = TimeAdvance::new(Duration::from_secs(5));
/// let passive = TimeAdvance::INFINITY;
///
/// assert!(busy < passive);
/// assert_eq!(busy.as_duration(), Some(Duration::from_secs(5)));
/// assert_eq!(passive.as_duration(), None);
/// ```
#[derive(Copy, Clone, PartialEq, Eq)]
pub struct TimeAdvance(Option<Duration>);

impl TimeAdvance {
    /// The time advance of a passive state.
    pub const INFINITY: Self = Self(None);

    /// A zero time advance, describing a transitory state.
    pub const ZERO: Self = Self(Some(Duration::ZERO));

    /// Creates a finite time advance.
    pub const fn new(duration: Duration) -> Self {
        Self(Some(duration))
    }

    /// Returns `true` if the time advance is finite.
    pub const fn is_finite(&self) -> bool {
        self.0.is_some()
    }

    /// Returns `true` if the time advance is infinite.
    pub const fn is_infinite(&self) -> bool {
        self.0.is_none()
    }

    /// Returns the finite duration, or `None` for an infinite time advance.
    pub const fn as_duration(&self) -> Option<Duration> {
        self.0
    }

    /// Returns the absolute deadline obtained by adding this time advance to
    /// the provided timestamp, or `None` for an infinite time advance.
    pub fn deadline(&self, since: MonotonicTime) -> Option<MonotonicTime> {
        self.0.map(|duration| since + duration)
    }
}

impl From<Duration> for TimeAdvance {
    fn from(duration: Duration) -> Self {
        Self::new(duration)
    }
}

impl Ord for TimeAdvance {
    fn cmp(&self, other: &Self) -> Ordering {
        match (self.0, other.0) {
            (None, None) => Ordering::Equal,
            (None, Some(_)) => Ordering::Greater,
            (Some(_), None) => Ordering::Less,
            (Some(lhs), Some(rhs)) => lhs.cmp(&rhs),
        }
    }
}

impl PartialOrd for TimeAdvance {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl fmt::Debug for TimeAdvance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.0 {
            Some(duration) => write!(f, "TimeAdvance({:?})", duration),
            None => f.write_str("TimeAdvance(inf)"),
        }
    }
}
