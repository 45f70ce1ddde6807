use core::fmt::{Display, Formatter};

use newt_msg::{InvalidHeader, MessageToBytesError};

/// An error encounterable while building an outbound message
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum BuildError {
  /// The message's version, type and code don't make sense together
  InvalidHeader(InvalidHeader),
  /// Serializing the message to bytes failed
  /// (the buffer was too small, or an option was illegal)
  ToBytes(MessageToBytesError),
  /// A Reset carried a code other than Empty, or an Empty message
  /// carried a token, options or a payload
  MalformedEmpty,
  /// There was no memory to keep a copy of the message for retransmission
  ResendStore,
}

impl BuildError {
  /// Numeric error code
  ///
  /// ```
  /// use newt::engine::BuildError;
  ///
  /// assert_eq!(BuildError::MalformedEmpty.code(), -3);
  /// ```
  pub fn code(&self) -> i32 {
    match self {
      | Self::InvalidHeader(_) => -1,
      | Self::ToBytes(_) => -2,
      | Self::MalformedEmpty => -3,
      | Self::ResendStore => -4,
    }
  }
}

impl From<InvalidHeader> for BuildError {
  fn from(e: InvalidHeader) -> Self {
    Self::InvalidHeader(e)
  }
}

impl From<MessageToBytesError> for BuildError {
  fn from(e: MessageToBytesError) -> Self {
    Self::ToBytes(e)
  }
}

impl Display for BuildError {
  fn fmt(&self, f: &mut Formatter<'_>) -> core::fmt::Result {
    match self {
      | Self::InvalidHeader(e) => write!(f, "invalid header: {}", e),
      | Self::ToBytes(e) => write!(f, "could not serialize message: {}", e),
      | Self::MalformedEmpty => write!(f, "empty message carries more than a header"),
      | Self::ResendStore => write!(f, "out of memory storing message for retransmission"),
    }
  }
}

/// At least one transmission made while sweeping timed-out state failed.
///
/// The sweep still ran to completion.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ExecError {
  /// Number of failed transmissions
  pub failed_sends: u16,
}

impl ExecError {
  /// Numeric error code
  pub fn code(&self) -> i32 {
    -1
  }
}

impl Display for ExecError {
  fn fmt(&self, f: &mut Formatter<'_>) -> core::fmt::Result {
    write!(f, "{} retransmission(s) could not be sent", self.failed_sends)
  }
}
