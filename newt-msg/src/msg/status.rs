/// Out-of-band result attached to a [`Message`](crate::Message)
/// by whoever processed it last.
///
/// This is never serialized; a freshly built or parsed message is [`Status::Ok`]
/// unless parsing failed partway through.
#[derive(Copy, Clone, Hash, PartialEq, Eq, PartialOrd, Ord, Debug)]
pub enum Status {
  /// Nothing noteworthy happened
  Ok,
  /// The header was readable, but something after it was not.
  ///
  /// Fields after the header hold whatever was parsed before the failure.
  ParserError,
  /// A message with this source address and id was already seen
  Duplicated,
  /// A block-wise transfer we are sending advanced by one block
  BlockwiseAck,
  /// A block of an incoming block-wise transfer was stored, more are expected
  BlockwiseReceiving,
  /// The final block of an incoming transfer arrived; the payload is complete
  BlockwiseReceived,
  /// An incoming block-wise transfer exceeded the maximum message size
  EntityTooLarge,
  /// An incoming block-wise transfer arrived out of order
  EntityIncomplete,
  /// The message was retransmitted the maximum number of times
  /// without being acknowledged
  SendingFailed,
}

impl Default for Status {
  fn default() -> Self {
    Status::Ok
  }
}
