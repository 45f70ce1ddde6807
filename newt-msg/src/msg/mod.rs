use std_alloc::vec::Vec;
use toad_cursor::Cursor;
use toad_macros::rfc_7252_doc;

/// Message Code
pub mod code;

/// Message parsing errors
pub mod parse_error;

/// Message ID
pub mod id;

/// Message Options
pub mod opt;

/// Out-of-band processing status
pub mod status;

/// Message Type
pub mod ty;

/// Message Token
pub mod token;

/// Message Version
pub mod ver;

pub use code::{Code, CodeKind};
pub use id::*;
pub use opt::*;
pub use parse_error::*;
pub use status::*;
pub use token::*;
pub use ty::*;
pub use ver::*;

use crate::from_bytes::{remaining, TryConsumeBytes};
use crate::TryFromBytes;

#[doc = rfc_7252_doc!("5.5")]
#[derive(Default, Clone, Hash, PartialEq, Eq, PartialOrd, Ord, Debug)]
pub struct Payload(pub Vec<u8>);

impl Payload {
  /// Borrow the payload's bytes
  pub fn as_bytes(&self) -> &[u8] {
    &self.0
  }
}

/// Struct representing the first byte of a message.
///
/// ```text
/// CoAP version
/// |
/// |  Message type (request, response, empty)
/// |  |
/// |  |  Length of token, in bytes. (4-bit integer)
/// |  |  |
/// vv vv vvvv
/// 01 00 0000
/// ```
#[derive(Clone, Copy, Debug, PartialEq, PartialOrd)]
pub(crate) struct Byte1 {
  pub(crate) ver: Version,
  pub(crate) ty: Type,
  pub(crate) tkl: u8,
}

impl From<u8> for Byte1 {
  fn from(b: u8) -> Self {
    let ver = b >> 6; // bits 0 & 1
    let ty = b >> 4 & 0b11; // bits 2 & 3
    let tkl = b & 0b1111u8; // last 4 bits

    Byte1 { ver: Version(ver),
            ty: Type::from(ty),
            tkl }
  }
}

/// # `Message` struct
/// Low-level representation of a CoAP message.
///
/// Messages support both serializing to bytes and from bytes, by using the provided
/// [`TryFromBytes`] and [`TryIntoBytes`](crate::TryIntoBytes) traits.
///
/// Besides the fields that make up the message on the wire, a `Message` carries a [`Status`]
/// that is never serialized; a protocol engine uses it to tell the caller what happened to the message.
///
/// <details>
/// <summary><b>RFC7252 - CoAP Messaging Model</b></summary>
#[doc = concat!("\n#", rfc_7252_doc!("2.1"))]
/// </details>
/// <details>
/// <summary><b>RFC7252 - CoAP Message Binary Format</b></summary>
#[doc = concat!("\n#", rfc_7252_doc!("3"))]
/// </details>
///
/// ```
/// use newt_msg::*;
///
/// let packet = [0x63u8, 0x44, 0x12, 0x34, b'a', b'b', b'c', 0xFF, b'a', b'b', b'c'];
/// let msg = Message::try_from_bytes(&packet).unwrap();
///
/// let mut expected = Message::new(Type::Ack,
///                                 code::CHANGED,
///                                 Id(0x1234),
///                                 Token::try_from_slice(b"abc").unwrap());
/// expected.payload = Payload(b"abc".to_vec());
///
/// assert_eq!(msg, expected);
/// ```
#[derive(Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Debug)]
pub struct Message {
  /// see [`Id`] for details
  pub id: Id,
  /// see [`Type`] for details
  pub ty: Type,
  /// see [`Version`] for details
  pub ver: Version,
  /// see [`Token`] for details
  pub token: Token,
  /// see [`Code`] for details
  pub code: Code,
  /// see [`OptionMap`] for details
  pub opts: OptionMap,
  /// see [`Payload`]
  pub payload: Payload,
  /// see [`Status`]
  pub status: Status,
}

impl Default for Message {
  fn default() -> Self {
    Self::new(Type::Con, code::EMPTY, Id(0), Token::default())
  }
}

/// A parse that failed partway through, holding
/// the message as far as it was read (if the header was readable)
pub(crate) struct Partial(pub(crate) Option<Message>, pub(crate) MessageParseError);

impl Message {
  /// Create a message with no options and no payload
  pub fn new(ty: Type, code: Code, id: Id, token: Token) -> Self {
    Self { id,
           ty,
           ver: Version::default(),
           token,
           code,
           opts: OptionMap::default(),
           payload: Payload::default(),
           status: Status::Ok }
  }

  /// Create a new empty message that ACKs this one.
  ///
  /// ```
  /// use newt_msg::*;
  ///
  /// let req = Message::new(Type::Con, code::GET, Id(12), Token::default());
  /// let ack = req.ack();
  ///
  /// assert_eq!(ack.ty, Type::Ack);
  /// assert_eq!(ack.id, Id(12));
  /// assert_eq!(ack.code, code::EMPTY);
  /// ```
  pub fn ack(&self) -> Self {
    Self::new(Type::Ack, code::EMPTY, self.id, Token::default())
  }

  /// Create a Reset message rejecting this one
  pub fn reset(&self) -> Self {
    Self::new(Type::Reset, code::EMPTY, self.id, Token::default())
  }

  /// Is this message's payload non-empty?
  pub fn has_payload(&self) -> bool {
    !self.payload.0.is_empty()
  }

  /// Parse a message, recovering as much as possible when it is malformed.
  ///
  /// Yields `None` only when `bytes` doesn't contain a full 4-byte header.
  /// Otherwise, a message that failed to parse will have
  /// [`Status::ParserError`] and contain the fields that were read before
  /// the failure; the header (notably [`Id`]) is always accurate, so that
  /// the sender can be sent a Reset.
  ///
  /// ```
  /// use newt_msg::*;
  ///
  /// assert_eq!(Message::parse_partial([0x40u8, 0x01, 0x00]), None);
  ///
  /// // token length 9
  /// let msg = Message::parse_partial([0x49u8, 0x01, 0x00, 0x07]).unwrap();
  /// assert_eq!(msg.status, Status::ParserError);
  /// assert_eq!(msg.id, Id(7));
  /// ```
  pub fn parse_partial(bytes: impl AsRef<[u8]>) -> Option<Message> {
    match Self::parse(bytes) {
      | Ok(msg) => Some(msg),
      | Err(Partial(msg, _)) => msg.map(|mut msg| {
                                     msg.status = Status::ParserError;
                                     msg
                                   }),
    }
  }

  pub(crate) fn parse<A: AsRef<[u8]>>(bytes: A) -> Result<Message, Partial> {
    let len = bytes.as_ref().len();
    if len < 4 {
      return Err(Partial(None, MessageParseError::TooShort(len)));
    }

    let mut bytes = Cursor::new(bytes);
    let header_err = || Partial(None, MessageParseError::eof());

    let Byte1 { tkl, ty, ver } = bytes.next().ok_or_else(header_err)?.into();
    let code: Code = bytes.next().ok_or_else(header_err)?.into();
    let id = Id::try_consume_bytes(&mut bytes).map_err(|e| Partial(None, e))?;

    let mut msg = Message::new(ty, code, id, Token::default());
    msg.ver = ver;

    if tkl > 8 {
      return Err(Partial(Some(msg), MessageParseError::InvalidTokenLength(tkl)));
    }

    match bytes.take_exact(tkl as usize).and_then(Token::try_from_slice) {
      | Some(token) => msg.token = token,
      | None => return Err(Partial(Some(msg), MessageParseError::eof())),
    }

    let marker = match opt::consume_opts(&mut bytes, &mut msg.opts) {
      | Ok(marker) => marker,
      | Err(e) => return Err(Partial(Some(msg), MessageParseError::OptParseError(e))),
    };

    if marker {
      let rest = remaining(&bytes, len);
      if rest == 0 {
        return Err(Partial(Some(msg), MessageParseError::EmptyPayload));
      }

      match bytes.take_exact(rest) {
        | Some(payload) => msg.payload = Payload(payload.to_vec()),
        | None => return Err(Partial(Some(msg), MessageParseError::eof())),
      }
    }

    Ok(msg)
  }
}

impl<Bytes: AsRef<[u8]>> TryFromBytes<Bytes> for Message {
  type Error = MessageParseError;

  fn try_from_bytes(bytes: Bytes) -> Result<Self, Self::Error> {
    Self::parse(bytes).map_err(|Partial(_, e)| e)
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn parse_msg() {
    let (expect, msg) = crate::test_msg();
    assert_eq!(Message::try_from_bytes(&msg).unwrap(), expect)
  }

  #[test]
  fn parse_byte1() {
    let byte = 0b_01_10_0011u8;
    let byte = Byte1::from(byte);
    assert_eq!(byte,
               Byte1 { ver: Version(1),
                       ty: Type::Ack,
                       tkl: 3 });
    assert_eq!(u8::from(byte), 0b_01_10_0011u8);
  }

  #[test]
  fn parse_id() {
    let mut id_bytes = Cursor::new(34u16.to_be_bytes());
    let id = Id::try_consume_bytes(&mut id_bytes).unwrap();
    assert_eq!(id, Id(34));
  }

  #[test]
  fn header_only() {
    let msg = Message::try_from_bytes([0x60u8, 0x44, 0x12, 0x34]).unwrap();
    assert_eq!(msg.ty, Type::Ack);
    assert_eq!(msg.code, code::CHANGED);
    assert_eq!(msg.id, Id(0x1234));
    assert!(msg.token.is_empty());
    assert!(msg.opts.is_empty());
    assert!(!msg.has_payload());
    assert_eq!(msg.status, Status::Ok);
  }

  #[test]
  fn too_short() {
    assert_eq!(Message::try_from_bytes([0x60u8, 0x44, 0x12]),
               Err(MessageParseError::TooShort(3)));
    assert_eq!(Message::try_from_bytes([0u8; 0]),
               Err(MessageParseError::TooShort(0)));
    assert_eq!(Message::parse_partial([0x60u8]), None);
  }

  #[test]
  fn token_too_long() {
    assert_eq!(Message::try_from_bytes([0x49u8, 0x01, 0, 1, 0, 0, 0, 0, 0, 0, 0, 0, 0]),
               Err(MessageParseError::InvalidTokenLength(9)));
  }

  #[test]
  fn token_truncated() {
    assert_eq!(Message::try_from_bytes([0x43u8, 0x01, 0, 1, b'a', b'b']),
               Err(MessageParseError::UnexpectedEndOfStream));
  }

  #[test]
  fn empty_payload() {
    assert_eq!(Message::try_from_bytes([0x40u8, 0x01, 0, 1, 0xFF]),
               Err(MessageParseError::EmptyPayload));
  }

  #[test]
  fn partial_keeps_fields_parsed_so_far() {
    // token "ab", Uri-Path "x", then an unknown option (13)
    let bytes = [0x42u8, 0x01, 0x00, 0x05, b'a', b'b', 0b1011_0001, b'x', 0b0010_0000];
    let msg = Message::parse_partial(bytes).unwrap();

    assert_eq!(msg.status, Status::ParserError);
    assert_eq!(msg.id, Id(5));
    assert_eq!(msg.token.as_bytes(), b"ab");
    assert_eq!(msg.opts.joined(known::URI_PATH).unwrap(), b"x".to_vec());
  }
}
