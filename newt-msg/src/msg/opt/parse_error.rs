use core::fmt::{Display, Formatter};

use super::OptNumber;

/// Errors encounterable while parsing an option from bytes
#[derive(Copy, Clone, Debug, PartialEq, PartialOrd, Eq, Ord)]
pub enum OptParseError {
  /// Reached end of stream before parsing was finished
  UnexpectedEndOfStream,

  /// Option Delta was set to 15, which is invalid.
  OptionDeltaReservedValue(u8),

  /// Value Length was set to 15, which is invalid.
  ValueLengthReservedValue(u8),

  /// The running sum of option deltas exceeded 65535
  OptionNumberOverflow,

  /// The option number is not one of the [`known`](crate::known) options
  UnknownOption(OptNumber),

  /// The option value's length is outside the legal range for this option
  #[allow(missing_docs)]
  InvalidLength { number: OptNumber, len: usize },

  /// An option that may only appear once appeared again
  Repeated(OptNumber),
}

impl OptParseError {
  /// Shorthand for [`OptParseError::UnexpectedEndOfStream`]
  pub fn eof() -> Self {
    Self::UnexpectedEndOfStream
  }
}

impl Display for OptParseError {
  fn fmt(&self, f: &mut Formatter<'_>) -> core::fmt::Result {
    match self {
      | Self::UnexpectedEndOfStream => write!(f, "unexpected end of stream"),
      | Self::OptionDeltaReservedValue(n) => write!(f, "option delta nibble {} is reserved", n),
      | Self::ValueLengthReservedValue(n) => write!(f, "option length nibble {} is reserved", n),
      | Self::OptionNumberOverflow => write!(f, "option number overflowed 65535"),
      | Self::UnknownOption(n) => write!(f, "unknown option {}", n.0),
      | Self::InvalidLength { number, len } => {
        write!(f, "option {} may not be {} bytes long", number.0, len)
      },
      | Self::Repeated(n) => write!(f, "option {} may not be repeated", n.0),
    }
  }
}
