use core::fmt::{Display, Formatter};

use embedded_time::duration::{Milliseconds, Seconds};
use toad_macros::rfc_7252_doc;

use crate::retry::{Attempts, Strategy};
use crate::time;

/// Every legal block size, `0` meaning "block-wise transfer disabled"
pub const BLOCK_SIZES: [u16; 8] = [0, 16, 32, 64, 128, 256, 512, 1024];

/// Largest number of entries allowed in the duplicate detection buffer
pub const MAX_DUPLICATE_BUFFER_SIZE: u8 = 64;

/// Largest number of messages allowed in the retransmission queue
pub const MAX_RETRANSMISSION_BUFFER_MSGS: u8 = 64;

/// Largest number of times a message may be retransmitted
pub const MAX_RETRANSMISSIONS: u8 = 6;

/// Legal range for the base retransmission interval, in seconds
pub const RETRANSMISSION_INTERVAL_RANGE: core::ops::RangeInclusive<u32> = 1..=40;

/// A tuning value was out of its legal range.
///
/// The configuration in effect before the setter was called is kept.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum ConfigError {
  /// Block size was not one of [`BLOCK_SIZES`]
  BlockSize(u16),
  /// Duplicate buffer was larger than [`MAX_DUPLICATE_BUFFER_SIZE`]
  DuplicateBufferSize(u8),
  /// Resend count was larger than [`MAX_RETRANSMISSIONS`]
  RetransmissionCount(u8),
  /// Interval was outside of [`RETRANSMISSION_INTERVAL_RANGE`]
  RetransmissionInterval(u32),
  /// Retransmission queue was larger than [`MAX_RETRANSMISSION_BUFFER_MSGS`]
  RetransmissionBuffer(u8),
  /// Random factor was not `100 <= min <= max <= 200`
  #[allow(missing_docs)]
  RandomFactor { min_pct: u8, max_pct: u8 },
  /// A lifetime or max age was zero
  ZeroDuration,
}

impl ConfigError {
  /// Numeric error code
  pub fn code(&self) -> i32 {
    -1
  }
}

impl Display for ConfigError {
  fn fmt(&self, f: &mut Formatter<'_>) -> core::fmt::Result {
    match self {
      | Self::BlockSize(n) => write!(f, "{} is not a block size", n),
      | Self::DuplicateBufferSize(n) => write!(f, "duplicate buffer of {} exceeds {}", n, MAX_DUPLICATE_BUFFER_SIZE),
      | Self::RetransmissionCount(n) => write!(f, "{} retransmissions exceeds {}", n, MAX_RETRANSMISSIONS),
      | Self::RetransmissionInterval(n) => write!(f, "retransmission interval of {}s is out of range", n),
      | Self::RetransmissionBuffer(n) => {
        write!(f, "retransmission queue of {} exceeds {}", n, MAX_RETRANSMISSION_BUFFER_MSGS)
      },
      | Self::RandomFactor { min_pct, max_pct } => {
        write!(f, "random factor {}%..={}% is out of range", min_pct, max_pct)
      },
      | Self::ZeroDuration => write!(f, "duration must be at least 1 second"),
    }
  }
}

/// Bounds of the random factor applied to the retransmission interval,
/// in percent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct RandomFactor {
  /// Lower bound (inclusive)
  pub min_pct: u8,
  /// Upper bound (inclusive)
  pub max_pct: u8,
}

/// Configuration options related to outbound CON messages
#[doc = concat!("\n#", rfc_7252_doc!("4.8"))]
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Con {
  /// Number of times we are allowed to resend a CON message
  /// before giving up on it.
  ///
  /// Defaults to 4 retransmissions.
  /// ```
  /// use newt::config::Con;
  /// use newt::retry::Attempts;
  ///
  /// assert_eq!(Con::default().max_attempts, Attempts(4));
  /// ```
  pub max_attempts: Attempts,
  /// Base delay between sending a CON message and retransmitting it.
  ///
  /// Defaults to 2 seconds.
  /// ```
  /// use embedded_time::duration::Seconds;
  /// use newt::config::Con;
  ///
  /// assert_eq!(Con::default().interval, Seconds(2u32));
  /// ```
  pub interval: Seconds<u32>,
  /// The base delay is multiplied by a factor chosen randomly
  /// from this range, so that many endpoints retransmitting at
  /// once spread out.
  ///
  /// Defaults to `100%..=150%`.
  /// ```
  /// use newt::config::{Con, RandomFactor};
  ///
  /// assert_eq!(Con::default().random_factor_pct,
  ///            RandomFactor { min_pct: 100,
  ///                           max_pct: 150 });
  /// ```
  pub random_factor_pct: RandomFactor,
}

impl Con {
  /// The retry strategy described by this configuration
  ///
  /// ```
  /// use embedded_time::duration::Milliseconds;
  /// use newt::config::Con;
  /// use newt::retry::Strategy;
  ///
  /// assert_eq!(Con::default().strategy(),
  ///            Strategy { init_min: Milliseconds(2_000),
  ///                       init_max: Milliseconds(3_000) });
  /// ```
  pub fn strategy(&self) -> Strategy {
    let Milliseconds(interval) = time::millis(self.interval);
    let pct = |p: u8| Milliseconds(interval * u64::from(p) / 100);

    Strategy { init_min: pct(self.random_factor_pct.min_pct),
               init_max: pct(self.random_factor_pct.max_pct) }
  }
}

/// Configuration options related to outbound messages
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Msg {
  /// See [`Con`]
  pub con: Con,
  /// Maximum number of messages held for retransmission
  /// at once; `0` means no limit on the count.
  ///
  /// Defaults to 8.
  /// ```
  /// use newt::config::Msg;
  ///
  /// assert_eq!(Msg::default().resend_buffer_msgs, 8);
  /// ```
  pub resend_buffer_msgs: u8,
  /// Maximum number of bytes held for retransmission at once;
  /// `0` means no limit on the size.
  ///
  /// When both this and [`Msg::resend_buffer_msgs`] are 0,
  /// nothing is ever retransmitted.
  ///
  /// ```
  /// use newt::config::Msg;
  ///
  /// assert_eq!(Msg::default().resend_buffer_bytes, 0);
  /// ```
  pub resend_buffer_bytes: u16,
  /// Seed for the random number generator that picks
  /// the first message [`Id`](newt_msg::Id) and the
  /// retransmission jitter.
  ///
  /// The default value is 0, although it is
  /// best practice to set this to something else.
  /// (random integer, machine identifier)
  ///
  /// ```
  /// use newt::config::Msg;
  ///
  /// assert_eq!(Msg::default().id_seed, 0);
  /// ```
  pub id_seed: u64,
}

impl Msg {
  /// Are we allowed to keep any messages around for retransmission?
  pub fn resending_enabled(&self) -> bool {
    self.resend_buffer_msgs > 0 || self.resend_buffer_bytes > 0
  }
}

/// Configuration options related to duplicate detection
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Dup {
  /// Number of recently seen messages remembered;
  /// `0` disables duplicate detection.
  ///
  /// ```
  /// use newt::config::Dup;
  ///
  /// assert_eq!(Dup::default().capacity, 8);
  /// ```
  pub capacity: u8,
  /// How long a message is remembered after it is first seen
  ///
  /// ```
  /// use embedded_time::duration::Seconds;
  /// use newt::config::Dup;
  ///
  /// assert_eq!(Dup::default().lifetime, Seconds(60u32));
  /// ```
  pub lifetime: Seconds<u32>,
}

/// Configuration options related to block-wise transfer
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Block {
  /// Size of blocks we send, and the largest we accept.
  ///
  /// Must be one of [`BLOCK_SIZES`]; defaults to 0 (block-wise transfer disabled).
  ///
  /// ```
  /// use newt::config::Block;
  ///
  /// assert_eq!(Block::default().size, 0);
  /// ```
  pub size: u16,
  /// How long a partial transfer is kept around without progress
  ///
  /// ```
  /// use embedded_time::duration::Seconds;
  /// use newt::config::Block;
  ///
  /// assert_eq!(Block::default().max_age, Seconds(60u32));
  /// ```
  pub max_age: Seconds<u32>,
}

impl Block {
  /// Is block-wise transfer enabled?
  pub fn enabled(&self) -> bool {
    self.size > 0
  }
}

impl Default for Con {
  fn default() -> Self {
    Con { max_attempts: Attempts(4),
          interval: Seconds(2),
          random_factor_pct: RandomFactor { min_pct: 100,
                                            max_pct: 150 } }
  }
}

impl Default for Msg {
  fn default() -> Self {
    Msg { con: Con::default(),
          resend_buffer_msgs: 8,
          resend_buffer_bytes: 0,
          id_seed: 0 }
  }
}

impl Default for Dup {
  fn default() -> Self {
    Dup { capacity: 8,
          lifetime: Seconds(60) }
  }
}

impl Default for Block {
  fn default() -> Self {
    Block { size: 0,
            max_age: Seconds(60) }
  }
}

/// Runtime config
///
/// ```
/// use newt::config::Config;
///
/// let mut config = Config::default();
/// config.set_block_size(64).unwrap();
///
/// assert_eq!(config.block.size, 64);
/// assert!(config.set_block_size(100).is_err());
/// assert_eq!(config.block.size, 64);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Config {
  /// See [`Msg`]
  pub msg: Msg,
  /// See [`Dup`]
  pub dup: Dup,
  /// See [`Block`]
  pub block: Block,
}

impl Config {
  /// Set the block size; must be one of [`BLOCK_SIZES`]
  pub fn set_block_size(&mut self, size: u16) -> Result<(), ConfigError> {
    if !BLOCK_SIZES.contains(&size) {
      return Err(ConfigError::BlockSize(size));
    }

    self.block.size = size;
    Ok(())
  }

  /// Set the number of messages remembered for duplicate detection
  pub fn set_duplicate_buffer_size(&mut self, size: u8) -> Result<(), ConfigError> {
    if size > MAX_DUPLICATE_BUFFER_SIZE {
      return Err(ConfigError::DuplicateBufferSize(size));
    }

    self.dup.capacity = size;
    Ok(())
  }

  /// Set the number of retransmissions and the base interval between them
  ///
  /// ```
  /// use embedded_time::duration::Seconds;
  /// use newt::config::{Config, ConfigError};
  ///
  /// let mut config = Config::default();
  /// assert_eq!(config.set_retransmission_parameters(7, Seconds(2)),
  ///            Err(ConfigError::RetransmissionCount(7)));
  /// assert_eq!(config.set_retransmission_parameters(3, Seconds(41)),
  ///            Err(ConfigError::RetransmissionInterval(41)));
  /// assert_eq!(config.set_retransmission_parameters(3, Seconds(5)), Ok(()));
  /// ```
  pub fn set_retransmission_parameters(&mut self,
                                       count: u8,
                                       interval: Seconds<u32>)
                                       -> Result<(), ConfigError> {
    if count > MAX_RETRANSMISSIONS {
      return Err(ConfigError::RetransmissionCount(count));
    }

    if !RETRANSMISSION_INTERVAL_RANGE.contains(&interval.0) {
      return Err(ConfigError::RetransmissionInterval(interval.0));
    }

    self.msg.con.max_attempts = Attempts(u16::from(count));
    self.msg.con.interval = interval;
    Ok(())
  }

  /// Bound the retransmission queue by message count and total bytes
  pub fn set_retransmission_buffer(&mut self, msgs: u8, bytes: u16) -> Result<(), ConfigError> {
    if msgs > MAX_RETRANSMISSION_BUFFER_MSGS {
      return Err(ConfigError::RetransmissionBuffer(msgs));
    }

    self.msg.resend_buffer_msgs = msgs;
    self.msg.resend_buffer_bytes = bytes;
    Ok(())
  }

  /// Set the range the retransmission random factor is drawn from
  pub fn set_random_factor(&mut self, min_pct: u8, max_pct: u8) -> Result<(), ConfigError> {
    if min_pct < 100 || max_pct > 200 || min_pct > max_pct {
      return Err(ConfigError::RandomFactor { min_pct, max_pct });
    }

    self.msg.con.random_factor_pct = RandomFactor { min_pct, max_pct };
    Ok(())
  }

  /// Set how long messages are remembered for duplicate detection
  pub fn set_duplicate_lifetime(&mut self, lifetime: Seconds<u32>) -> Result<(), ConfigError> {
    if lifetime.0 == 0 {
      return Err(ConfigError::ZeroDuration);
    }

    self.dup.lifetime = lifetime;
    Ok(())
  }

  /// Set how long partial block-wise transfers are kept without progress
  pub fn set_blockwise_max_age(&mut self, max_age: Seconds<u32>) -> Result<(), ConfigError> {
    if max_age.0 == 0 {
      return Err(ConfigError::ZeroDuration);
    }

    self.block.max_age = max_age;
    Ok(())
  }
}
