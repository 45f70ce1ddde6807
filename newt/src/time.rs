use embedded_time::duration::{Milliseconds, Seconds};

/// A duration or a point in time, in milliseconds
///
/// Points in time are relative to whatever epoch the caller
/// of [`Engine::exec`](crate::engine::Engine::exec) counts from.
pub type Millis = Milliseconds<u64>;

/// Convert a (coarse) number of seconds into [`Millis`]
///
/// ```
/// use embedded_time::duration::{Milliseconds, Seconds};
/// use newt::time;
///
/// assert_eq!(time::millis(Seconds(3u32)), Milliseconds(3_000u64));
/// ```
pub fn millis(Seconds(s): Seconds<u32>) -> Millis {
  Milliseconds(u64::from(s) * 1000)
}

/// Data associated with a timestamp
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Stamped<T>(pub T, pub Millis);

impl<T> Stamped<T> {
  /// Borrow the data
  pub fn data(&self) -> &T {
    &self.0
  }

  /// Mutably borrow the data
  pub fn data_mut(&mut self) -> &mut T {
    &mut self.0
  }

  /// When was this stamped?
  pub fn time(&self) -> Millis {
    self.1
  }

  /// Replace the timestamp
  pub fn restamp(&mut self, now: Millis) {
    self.1 = now;
  }

  /// Has more than `max_age` passed between stamping and `now`?
  ///
  /// ```
  /// use embedded_time::duration::Milliseconds;
  /// use newt::time::Stamped;
  ///
  /// let stamped = Stamped((), Milliseconds(1_000u64));
  /// assert!(!stamped.expired(Milliseconds(2_000), Milliseconds(1_000)));
  /// assert!(stamped.expired(Milliseconds(2_001), Milliseconds(1_000)));
  /// ```
  pub fn expired(&self, now: Millis, max_age: Millis) -> bool {
    now.0.saturating_sub(self.1 .0) > max_age.0
  }

  /// Discard the timestamp
  pub fn discard_timestamp(self) -> T {
    self.0
  }
}
