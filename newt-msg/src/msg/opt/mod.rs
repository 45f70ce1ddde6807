use core::fmt::{Display, Formatter};

use std_alloc::collections::BTreeMap;
use std_alloc::vec::Vec;
use toad_cursor::Cursor;
use toad_macros::rfc_7252_doc;

/// Option numbers & the table of options this crate understands
pub mod known;
pub use known::Block;

/// Option parsing errors
pub mod parse_error;
pub use parse_error::*;

pub(crate) fn parse_opt_len_or_delta<A: AsRef<[u8]>>(head: u8,
                                                     bytes: &mut Cursor<A>,
                                                     reserved_err: OptParseError)
                                                     -> Result<u32, OptParseError> {
  match head {
    | 13 => {
      let n = bytes.next().ok_or_else(OptParseError::eof)?;
      Ok(u32::from(n) + 13)
    },
    | 14 => match bytes.take_exact(2) {
      | Some(&[a, b]) => Ok(u32::from(u16::from_be_bytes([a, b])) + 269),
      | _ => Err(OptParseError::eof()),
    },
    | 15 => Err(reserved_err),
    | _ => Ok(u32::from(head)),
  }
}

/// Read options off of `bytes` into `opts` until the payload marker
/// or the end of input.
///
/// Yields whether the payload marker was consumed.
pub(crate) fn consume_opts<A: AsRef<[u8]>>(bytes: &mut Cursor<A>,
                                           opts: &mut OptionMap)
                                           -> Result<bool, OptParseError> {
  let mut running = 0u32;

  loop {
    let head = match bytes.next() {
      | None => return Ok(false),
      | Some(0xFF) => return Ok(true),
      | Some(b) => b,
    };

    // delta is always consumed before length
    let delta = parse_opt_len_or_delta(head >> 4,
                                       bytes,
                                       OptParseError::OptionDeltaReservedValue(15))?;
    let len = parse_opt_len_or_delta(head & 0b1111,
                                     bytes,
                                     OptParseError::ValueLengthReservedValue(15))?
              as usize;

    running += delta;
    let number = u16::try_from(running).map(OptNumber)
                                       .map_err(|_| OptParseError::OptionNumberOverflow)?;

    let value = bytes.take_exact(len)
                     .ok_or_else(OptParseError::eof)?
                     .to_vec();

    let def = known::lookup(number).ok_or(OptParseError::UnknownOption(number))?;

    if !def.len_ok(len) {
      return Err(OptParseError::InvalidLength { number, len });
    }

    if !def.repeatable && opts.contains(number) {
      return Err(OptParseError::Repeated(number));
    }

    opts.push(number, OptValue(value));
  }
}

#[doc = rfc_7252_doc!("5.4.6")]
/// <details><summary><b>RFC7252 Section 12.2 Core CoAP Option Numbers</b></summary>
#[doc = concat!("\n#", rfc_7252_doc!("12.2"))]
/// </details>
#[derive(Copy, Clone, Hash, PartialEq, Eq, PartialOrd, Ord, Debug, Default)]
pub struct OptNumber(pub u16);

impl OptNumber {
  /// Critical options must be understood by the recipient
  /// (the option number is odd)
  pub fn is_critical(&self) -> bool {
    self.0 & 0b1 == 1
  }
}

#[doc = rfc_7252_doc!("3.2")]
#[derive(Default, Clone, Hash, PartialEq, Eq, PartialOrd, Ord, Debug)]
pub struct OptValue(pub Vec<u8>);

impl OptValue {
  /// Encode an unsigned integer in the minimal number of big-endian bytes.
  ///
  /// ```
  /// use newt_msg::OptValue;
  ///
  /// assert_eq!(OptValue::from_uint(0).0, Vec::<u8>::new());
  /// assert_eq!(OptValue::from_uint(255).0, vec![255]);
  /// assert_eq!(OptValue::from_uint(256).0, vec![1, 0]);
  /// ```
  pub fn from_uint(n: u32) -> Self {
    let bytes = n.to_be_bytes();
    let skip = bytes.iter().take_while(|b| **b == 0).count();
    Self(bytes[skip..].to_vec())
  }

  /// Interpret this value as a big-endian unsigned integer
  ///
  /// An empty value is zero.
  pub fn as_uint(&self) -> u32 {
    self.0.iter().fold(0u32, |n, b| n << 8 | u32::from(*b))
  }

  /// Borrow the value's bytes
  pub fn as_bytes(&self) -> &[u8] {
    &self.0
  }

  /// Length of the value
  pub fn len(&self) -> usize {
    self.0.len()
  }

  /// Is this a zero-length value?
  pub fn is_empty(&self) -> bool {
    self.0.is_empty()
  }
}

impl<'a> From<&'a [u8]> for OptValue {
  fn from(b: &'a [u8]) -> Self {
    Self(b.to_vec())
  }
}

/// The option is not a repeatable string option with a separator
/// (e.g. Uri-Path's `/`), so it can't be joined or split.
#[derive(Copy, Clone, Hash, PartialEq, Eq, PartialOrd, Ord, Debug)]
pub struct NotJoinable(pub OptNumber);

impl Display for NotJoinable {
  fn fmt(&self, f: &mut Formatter<'_>) -> core::fmt::Result {
    write!(f, "option {} has no separator", (self.0).0)
  }
}

#[doc = rfc_7252_doc!("5.4")]
/// <details><summary><b>RFC7252 Section 3.1 Option binary format</b></summary>
#[doc = concat!("\n#", rfc_7252_doc!("3.1"))]
/// </details>
///
/// # `OptionMap`
/// The options of a message, keyed by [`OptNumber`].
///
/// Iteration is always in ascending option number, which is the order
/// options must be written in. Options that may repeat keep each value
/// in the order it was added.
///
/// ```
/// use newt_msg::{known, OptionMap};
///
/// let mut opts = OptionMap::default();
/// opts.set_joined(known::URI_PATH, "a/b/c").unwrap();
/// opts.set_uint(known::CONTENT_FORMAT, 50);
///
/// assert_eq!(opts.get_all(known::URI_PATH).len(), 3);
/// assert_eq!(opts.joined(known::URI_PATH).unwrap(), b"a/b/c".to_vec());
/// assert_eq!(opts.get_uint(known::CONTENT_FORMAT), Some(50));
/// assert_eq!(opts.len(), 4);
/// ```
#[derive(Default, Clone, Hash, PartialEq, Eq, PartialOrd, Ord, Debug)]
pub struct OptionMap(BTreeMap<OptNumber, Vec<OptValue>>);

impl OptionMap {
  /// The first value of an option
  pub fn get_first(&self, n: OptNumber) -> Option<&OptValue> {
    self.0.get(&n).and_then(|vs| vs.first())
  }

  /// All values of an option, empty if it isn't present
  pub fn get_all(&self, n: OptNumber) -> &[OptValue] {
    self.0.get(&n).map(|vs| vs.as_slice()).unwrap_or(&[])
  }

  /// Replace all values of an option with `v`
  pub fn insert(&mut self, n: OptNumber, v: OptValue) {
    self.0.insert(n, Vec::from([v]));
  }

  /// Add a value to an option, after any values it already has
  pub fn push(&mut self, n: OptNumber, v: OptValue) {
    self.0.entry(n).or_default().push(v);
  }

  /// Remove an option, yielding its values
  pub fn remove(&mut self, n: OptNumber) -> Option<Vec<OptValue>> {
    self.0.remove(&n)
  }

  /// Does this map contain a value for an option?
  pub fn contains(&self, n: OptNumber) -> bool {
    self.0.get(&n).map(|vs| !vs.is_empty()).unwrap_or(false)
  }

  /// Remove all options
  pub fn clear(&mut self) {
    self.0.clear()
  }

  /// Every option instance, in ascending option number
  pub fn iter(&self) -> impl Iterator<Item = (OptNumber, &OptValue)> {
    self.0.iter().flat_map(|(n, vs)| vs.iter().map(move |v| (*n, v)))
  }

  /// Number of option instances (a repeated option counts once per value)
  pub fn len(&self) -> usize {
    self.0.values().map(|vs| vs.len()).sum()
  }

  /// Are there no options?
  pub fn is_empty(&self) -> bool {
    self.len() == 0
  }

  /// Interpret the first value of an option as a uint
  pub fn get_uint(&self, n: OptNumber) -> Option<u32> {
    self.get_first(n).map(OptValue::as_uint)
  }

  /// Set an option to a uint value
  pub fn set_uint(&mut self, n: OptNumber, v: u32) {
    self.insert(n, OptValue::from_uint(v))
  }

  /// Join all values of a separated option (e.g. `Uri-Path`) into one string.
  ///
  /// Yields `None` if the option isn't present.
  pub fn joined(&self, n: OptNumber) -> Option<Vec<u8>> {
    let sep = known::lookup(n).and_then(|def| def.separator).unwrap_or(b'/');
    let vs = self.0.get(&n).filter(|vs| !vs.is_empty())?;

    let mut out = Vec::with_capacity(vs.iter().map(|v| v.len() + 1).sum());
    vs.iter().enumerate().for_each(|(ix, v)| {
                           if ix > 0 {
                             out.push(sep);
                           }
                           out.extend_from_slice(&v.0);
                         });
    Some(out)
  }

  /// Replace all values of a separated option (e.g. `Uri-Query`) by splitting
  /// `s` on the option's separator.
  ///
  /// An empty `s` removes the option.
  ///
  /// ```
  /// use newt_msg::{known, NotJoinable, OptionMap};
  ///
  /// let mut opts = OptionMap::default();
  /// opts.set_joined(known::URI_QUERY, "a=1&b=2").unwrap();
  /// assert_eq!(opts.get_all(known::URI_QUERY)[1].as_bytes(), b"b=2");
  ///
  /// assert_eq!(opts.set_joined(known::CONTENT_FORMAT, "x"),
  ///            Err(NotJoinable(known::CONTENT_FORMAT)));
  /// ```
  pub fn set_joined(&mut self, n: OptNumber, s: impl AsRef<[u8]>) -> Result<(), NotJoinable> {
    let sep = known::lookup(n).and_then(|def| def.separator)
                              .ok_or(NotJoinable(n))?;
    let s = s.as_ref();

    if s.is_empty() {
      self.remove(n);
      return Ok(());
    }

    let vs = s.split(|b| *b == sep).map(OptValue::from).collect();
    self.0.insert(n, vs);
    Ok(())
  }

  /// Get the Block1 option
  pub fn block1(&self) -> Option<Block> {
    self.get_uint(known::BLOCK1).map(Block::from)
  }

  /// Set the Block1 option
  pub fn set_block1(&mut self, b: Block) {
    self.set_uint(known::BLOCK1, b.into())
  }

  /// Get the Block2 option
  pub fn block2(&self) -> Option<Block> {
    self.get_uint(known::BLOCK2).map(Block::from)
  }

  /// Set the Block2 option
  pub fn set_block2(&mut self, b: Block) {
    self.set_uint(known::BLOCK2, b.into())
  }

  /// Get the Size1 option
  pub fn size1(&self) -> Option<u32> {
    self.get_uint(known::SIZE1)
  }

  /// Get the Size2 option
  pub fn size2(&self) -> Option<u32> {
    self.get_uint(known::SIZE2)
  }

  /// Get the Observe option
  pub fn observe(&self) -> Option<u32> {
    self.get_uint(known::OBSERVE)
  }

  /// Get the Content-Format option
  pub fn content_format(&self) -> Option<u16> {
    self.get_uint(known::CONTENT_FORMAT).map(|n| n as u16)
  }
}
