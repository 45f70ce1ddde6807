use core::fmt::{Display, Formatter};

use std_alloc::vec::Vec;
use tinyvec::ArrayVec;

use crate::msg::Byte1;
use crate::*;

/// Largest length or delta expressible in an option header
/// (nibble 14 plus a 2-byte extension)
pub const MAX_OPT_LEN_OR_DELTA: usize = 65535 + 269;

/// Trait allowing fallible conversion into bytes
pub trait TryIntoBytes {
  /// Error yielded if serializing fails
  type Error;

  /// Try to write the message into `buf`, yielding the number of bytes written.
  ///
  /// ```
  /// use newt_msg::*;
  ///
  /// let msg = Message::new(Type::Con, code::GET, Id(1), Token::default());
  ///
  /// let mut buf = [0u8; 16];
  /// let n = msg.try_write_bytes(&mut buf).unwrap();
  /// assert_eq!(&buf[..n], &[0x40, 0x01, 0x00, 0x01]);
  ///
  /// let mut tiny = [0u8; 2];
  /// assert_eq!(msg.try_write_bytes(&mut tiny),
  ///            Err(MessageToBytesError::TooLong { capacity: 2, size: 4 }));
  /// ```
  fn try_write_bytes(&self, buf: &mut [u8]) -> Result<usize, Self::Error>;

  /// Try to convert into a newly allocated `Vec` of bytes
  fn try_into_bytes(&self) -> Result<Vec<u8>, Self::Error>;
}

/// Errors encounterable serializing to bytes
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum MessageToBytesError {
  /// Reserved capacity was not enough for size of message
  #[allow(missing_docs)]
  TooLong { capacity: usize, size: usize },

  /// An option value was too long to be expressed in an option header
  #[allow(missing_docs)]
  OptionTooLong { number: OptNumber, len: usize },

  /// The option is unknown, has an illegal length, or may not repeat but does
  InvalidOption(OptNumber),
}

impl Display for MessageToBytesError {
  fn fmt(&self, f: &mut Formatter<'_>) -> core::fmt::Result {
    match self {
      | Self::TooLong { capacity, size } => {
        write!(f, "message of {} bytes does not fit in {} bytes", size, capacity)
      },
      | Self::OptionTooLong { number, len } => {
        write!(f, "option {} of {} bytes is too long to encode", number.0, len)
      },
      | Self::InvalidOption(n) => write!(f, "option {} is not legal here", n.0),
    }
  }
}

fn ext_size(n: usize) -> usize {
  match n {
    | n if n >= 269 => 2,
    | n if n >= 13 => 1,
    | _ => 0,
  }
}

pub(crate) fn opt_len_or_delta(val: u16) -> (u8, Option<ArrayVec<[u8; 2]>>) {
  match val {
    | n if n >= 269 => {
      let mut bytes = ArrayVec::new();
      bytes.extend((n - 269).to_be_bytes());
      (14, Some(bytes))
    },
    | n if n >= 13 => {
      let mut bytes = ArrayVec::new();
      bytes.push((n as u8) - 13);
      (13, Some(bytes))
    },
    | n => (n as u8, None),
  }
}

/// Write an option with the minimal header encoding.
///
/// `len` must be at most [`MAX_OPT_LEN_OR_DELTA`].
pub(crate) fn write_opt(delta: u16, value: &[u8], out: &mut impl FnMut(&[u8])) {
  let (del, del_bytes) = opt_len_or_delta(delta);
  // lengths up to 65804 fit; the extension holds `len - 269`
  let (len, len_bytes) = match value.len() {
    | n if n >= 269 => {
      let ext = ((n - 269) as u16).to_be_bytes();
      (14u8, Some(ArrayVec::from(ext)))
    },
    | n => opt_len_or_delta(n as u16),
  };

  out(&[del << 4 | len]);

  if let Some(bs) = del_bytes {
    out(&bs);
  }

  if let Some(bs) = len_bytes {
    out(&bs);
  }

  out(value);
}

impl Message {
  /// Exact number of bytes this message occupies on the wire
  ///
  /// ```
  /// use newt_msg::*;
  ///
  /// let mut msg = Message::new(Type::Con, code::GET, Id(1), Token::default());
  /// assert_eq!(msg.calc_size(), 4);
  ///
  /// msg.payload = Payload(b"hi".to_vec());
  /// assert_eq!(msg.calc_size(), 7);
  /// ```
  pub fn calc_size(&self) -> usize {
    let header_size = 4;
    let token_size = self.token.len();

    let mut prev = 0u16;
    let opts_size: usize = self.opts
                               .iter()
                               .map(|(n, v)| {
                                 let delta = n.0 - prev;
                                 prev = n.0;
                                 1 + ext_size(delta as usize) + ext_size(v.len()) + v.len()
                               })
                               .sum();

    let payload_size = match self.payload.0.len() {
      | 0 => 0,
      | n => 1 + n,
    };

    header_size + token_size + opts_size + payload_size
  }

  fn check_opts(&self) -> Result<(), MessageToBytesError> {
    let mut prev: Option<OptNumber> = None;

    self.opts.iter().try_for_each(|(n, v)| {
                      if v.len() > MAX_OPT_LEN_OR_DELTA {
                        return Err(MessageToBytesError::OptionTooLong { number: n,
                                                                        len: v.len() });
                      }

                      let def = known::lookup(n).ok_or(MessageToBytesError::InvalidOption(n))?;
                      let repeated = prev == Some(n) && !def.repeatable;
                      prev = Some(n);

                      if !def.len_ok(v.len()) || repeated {
                        Err(MessageToBytesError::InvalidOption(n))
                      } else {
                        Ok(())
                      }
                    })
  }

  fn write(&self, out: &mut impl FnMut(&[u8])) {
    let byte1: u8 = Byte1 { tkl: self.token.len() as u8,
                            ver: self.ver,
                            ty: self.ty }.into();
    let code: u8 = self.code.into();
    let id: [u8; 2] = self.id.into();

    out(&[byte1, code]);
    out(&id);
    out(self.token.as_bytes());

    let mut prev = 0u16;
    for (n, v) in self.opts.iter() {
      write_opt(n.0 - prev, v.as_bytes(), out);
      prev = n.0;
    }

    if self.has_payload() {
      out(&[0b11111111]);
      out(self.payload.as_bytes());
    }
  }
}

impl TryIntoBytes for Message {
  type Error = MessageToBytesError;

  fn try_write_bytes(&self, buf: &mut [u8]) -> Result<usize, Self::Error> {
    self.check_opts()?;

    let size = self.calc_size();
    if buf.len() < size {
      return Err(Self::Error::TooLong { capacity: buf.len(),
                                        size });
    }

    let mut ix = 0;
    self.write(&mut |bs: &[u8]| {
          buf[ix..ix + bs.len()].copy_from_slice(bs);
          ix += bs.len();
        });

    Ok(ix)
  }

  fn try_into_bytes(&self) -> Result<Vec<u8>, Self::Error> {
    self.check_opts()?;

    let mut bytes = Vec::with_capacity(self.calc_size());
    self.write(&mut |bs: &[u8]| bytes.extend_from_slice(bs));

    Ok(bytes)
  }
}

impl From<Id> for [u8; 2] {
  fn from(id: Id) -> [u8; 2] {
    id.0.to_be_bytes()
  }
}

impl From<Type> for u8 {
  fn from(t: Type) -> u8 {
    use Type::*;
    match t {
      | Con => 0,
      | Non => 1,
      | Ack => 2,
      | Reset => 3,
    }
  }
}

impl From<Byte1> for u8 {
  fn from(b: Byte1) -> u8 {
    let ver = b.ver.0 << 6;
    let ty = u8::from(b.ty) << 4;
    let tkl = b.tkl & 0b1111;

    ver | ty | tkl
  }
}
