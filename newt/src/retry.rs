use core::ops::RangeInclusive;

use embedded_time::duration::Milliseconds;
use rand::Rng;
use toad_macros::rfc_7252_doc;

use crate::time::Millis;

/// A non-blocking timer that allows exponential-backoff retries
/// of some operation that lives alongside it.
///
/// It does not _contain_ the work to be done (e.g. `Box<fn()>`);
/// whoever owns the timer asks it what to do each time the work
/// is due to be checked on.
///
/// ```
/// use embedded_time::duration::Milliseconds;
/// use newt::retry::{Attempts, RetryTimer, Strategy, YouShould};
/// use rand::SeedableRng;
///
/// let mut rand = rand_chacha::ChaCha8Rng::seed_from_u64(0);
/// let strategy = Strategy { init_min: Milliseconds(1_000),
///                           init_max: Milliseconds(1_000) };
/// let mut retry = RetryTimer::new(Milliseconds(0), strategy, Attempts(1), &mut rand);
///
/// assert_eq!(retry.what_should_i_do(Milliseconds(999)),
///            Err(nb::Error::WouldBlock));
/// assert_eq!(retry.what_should_i_do(Milliseconds(1_000)),
///            Ok(YouShould::Retry));
///
/// // the next deadline is twice as far away
/// assert_eq!(retry.what_should_i_do(Milliseconds(2_999)),
///            Err(nb::Error::WouldBlock));
/// assert_eq!(retry.what_should_i_do(Milliseconds(3_000)),
///            Ok(YouShould::Cry));
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryTimer {
  next: Millis,
  init: Millis,
  strategy: Strategy,
  attempts: Attempts,
  max_attempts: Attempts,
}

/// A number of attempts
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Attempts(pub u16);

/// Result of [`RetryTimer::what_should_i_do`].
///
/// This tells you if a retry should be attempted or not.
#[derive(PartialEq, Eq, Debug, Clone, Copy)]
pub enum YouShould {
  /// Attempts have been exhausted and the work that is
  /// being retried should be considered poisoned.
  Cry,
  /// A retry should be performed
  Retry,
}

impl RetryTimer {
  /// Create a new retrier for work that was first attempted at `start`.
  ///
  /// The initial delay is drawn from `rand` once; every retry after that
  /// doubles it.
  pub fn new(start: Millis, strategy: Strategy, max_attempts: Attempts, rand: &mut impl Rng) -> Self {
    let init = if strategy.has_jitter() {
      Milliseconds(rand.gen_range(strategy.range()))
    } else {
      Milliseconds(*strategy.range().start())
    };

    Self { next: Milliseconds(start.0 + init.0),
           init,
           strategy,
           max_attempts,
           attempts: Attempts(0) }
  }

  /// When the thing we keep trying has not yet succeeded, invoke this to
  /// ask the timer "it still hasn't worked! what do I do??"
  ///
  /// Returns `nb::Error::WouldBlock` when we have not yet
  /// waited the appropriate amount of time to retry.
  pub fn what_should_i_do(&mut self, now: Millis) -> nb::Result<YouShould, core::convert::Infallible> {
    if now.0 < self.next.0 {
      Err(nb::Error::WouldBlock)
    } else if self.attempts >= self.max_attempts {
      Ok(YouShould::Cry)
    } else {
      self.attempts.0 += 1;
      self.next = Milliseconds(now.0 + Strategy::delay_exp(self.init, self.attempts.0));
      Ok(YouShould::Retry)
    }
  }

  /// The point in time at which the work should next be checked on
  pub fn next(&self) -> Millis {
    self.next
  }

  /// Number of retries performed so far
  pub fn attempts(&self) -> Attempts {
    self.attempts
  }

  /// The strategy this timer follows
  pub fn strategy(&self) -> Strategy {
    self.strategy
  }
}

/// Exponential backoff: generate a random delay between `init_min` and `init_max`,
/// and wait until this delay has passed before the first retry.
///
/// After each retry, double the delay before retrying again.
#[doc = concat!("\n#", rfc_7252_doc!("4.2"))]
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Strategy {
  /// Minimum (inclusive) delay for the first retry
  pub init_min: Milliseconds<u64>,
  /// Maximum (inclusive) delay for the first retry
  pub init_max: Milliseconds<u64>,
}

impl Strategy {
  /// Are min & max delays the same? if so, we should probably skip the random number generation.
  pub fn has_jitter(&self) -> bool {
    let rng = self.range();
    rng.start() != rng.end()
  }

  /// Get the min & max durations as an inclusive range
  pub fn range(&self) -> RangeInclusive<u64> {
    self.init_min.0..=self.init_max.0.max(self.init_min.0)
  }

  /// Get the longest amount of time this strategy will take if all attempts fail
  ///
  /// ```
  /// use embedded_time::duration::Milliseconds;
  /// use newt::retry::{Attempts, Strategy};
  ///
  /// let strategy = Strategy { init_min: Milliseconds(1_000),
  ///                           init_max: Milliseconds(2_000) };
  ///
  /// // 2s + 4s + 8s, then 16s waiting for the final answer
  /// assert_eq!(strategy.max_time(Attempts(3)), Milliseconds(30_000u64));
  /// ```
  pub fn max_time(&self, max_attempts: Attempts) -> Milliseconds<u64> {
    Milliseconds((0..=max_attempts.0).map(|n| Self::delay_exp(self.init_max, n))
                                     .sum())
  }

  /// Given the initial delay and number of retries that have been performed,
  /// yields the delay until the next check.
  const fn delay_exp(Milliseconds(init): Milliseconds<u64>, attempt: u16) -> u64 {
    // | attempt | delay       |
    // | 0       | init        |
    // | 1       | init * 2    |
    // | 2       | init * 4    |
    // | n       | init * 2^n  |
    init << attempt
  }
}
