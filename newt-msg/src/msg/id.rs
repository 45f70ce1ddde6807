use core::fmt::{Display, Formatter};

use toad_cursor::Cursor;

use super::MessageParseError;
use crate::from_bytes::TryConsumeBytes;

/// # Message ID
///
/// Big-endian 16 bits in bytes 2 and 3 of the header.
///
/// Pairs an Acknowledgement or Reset with the Confirmable (or Non-confirmable)
/// message it answers, and lets a receiver recognize a retransmission of a
/// message it already processed. It says nothing about which request a response
/// belongs to; that's what [`Token`](crate::Token)s are for.
///
/// `Id(0)` is a legal id on the wire, but engines treat it as "not assigned yet"
/// and never hand it out; see [`Id::successor`].
#[derive(Copy, Clone, Hash, PartialEq, PartialOrd, Debug, Eq, Ord, Default)]
pub struct Id(pub u16);

impl Id {
  /// Read an id from its wire representation
  pub fn from_be_bytes(bs: [u8; 2]) -> Self {
    Self(u16::from_be_bytes(bs))
  }

  /// The id after this one, skipping `Id(0)` when wrapping around.
  ///
  /// ```
  /// use newt_msg::Id;
  ///
  /// assert_eq!(Id(41).successor(), Id(42));
  /// assert_eq!(Id(u16::MAX).successor(), Id(1));
  /// ```
  pub fn successor(self) -> Self {
    match self.0 {
      | u16::MAX => Id(1),
      | n => Id(n + 1),
    }
  }
}

impl Display for Id {
  fn fmt(&self, f: &mut Formatter<'_>) -> core::fmt::Result {
    write!(f, "{}", self.0)
  }
}

impl<Bytes: AsRef<[u8]>> TryConsumeBytes<Bytes> for Id {
  type Error = MessageParseError;

  fn try_consume_bytes(bytes: &mut Cursor<Bytes>) -> Result<Self, Self::Error> {
    bytes.take_exact(2)
         .map(|bs| Id::from_be_bytes([bs[0], bs[1]]))
         .ok_or_else(MessageParseError::eof)
  }
}
