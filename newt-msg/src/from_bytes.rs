use toad_cursor::Cursor;

/// Parse a whole structure out of a byte buffer.
///
/// Implemented by [`Message`](crate::Message) for anything that derefs to `[u8]`;
/// the buffer must hold exactly one message and nothing else.
pub trait TryFromBytes<A: AsRef<[u8]>>: Sized {
  /// Why parsing failed
  type Error;

  /// Parse `bytes`
  fn try_from_bytes(bytes: A) -> Result<Self, Self::Error>;
}

/// Parse one field of a message, advancing the cursor past it
pub(crate) trait TryConsumeBytes<A: AsRef<[u8]>>: Sized {
  type Error;

  fn try_consume_bytes(bytes: &mut Cursor<A>) -> Result<Self, Self::Error>;
}

/// Number of bytes left in a cursor over a buffer of `len` bytes
pub(crate) fn remaining<A: AsRef<[u8]>>(bytes: &Cursor<A>, len: usize) -> usize {
  len.saturating_sub(bytes.position())
}
