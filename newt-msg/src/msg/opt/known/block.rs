/// Three items of information may need to be transferred in a
/// Block (Block1 or Block2) option:
/// * the size of the block ([`Block::size`])
/// * whether more blocks are following ([`Block::more`])
/// * the relative number of the block ([`Block::num`]) within a sequence of blocks with the given size.
///
/// On the wire this is the uint `NUM << 4 | M << 3 | SZX`, where the block size is `2^(SZX + 4)`.
///
/// ```
/// use newt_msg::Block;
///
/// let b = Block::new(64, 3, true);
/// assert_eq!(u32::from(b), 3 << 4 | 1 << 3 | 2);
/// assert_eq!(b.size(), 64);
/// assert_eq!(b.num(), 3);
/// assert!(b.more());
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Block(u32);

impl Block {
  /// Create a block option value.
  ///
  /// `size` is rounded down to a power of 2 in `16..=1024`.
  pub fn new(size: u16, num: u32, more: bool) -> Self {
    Self(num << 4 | u32::from(more) << 3 | u32::from(Self::szx_of(size)))
  }

  /// Get the SZX exponent for a block size, rounding down to a power of 2 in `16..=1024`
  ///
  /// ```
  /// use newt_msg::Block;
  ///
  /// assert_eq!(Block::szx_of(16), 0);
  /// assert_eq!(Block::szx_of(1024), 6);
  /// assert_eq!(Block::szx_of(1000), 5);
  /// assert_eq!(Block::szx_of(4096), 6);
  /// ```
  pub fn szx_of(size: u16) -> u8 {
    let size = size.clamp(16, 1024);
    (15 - size.leading_zeros() as u8) - 4
  }

  /// The block size in bytes.
  ///
  /// The reserved SZX value 7 is treated as 1024.
  pub fn size(&self) -> u16 {
    let szx = self.szx().min(6);
    1u16 << (szx + 4)
  }

  /// The raw SZX exponent
  pub fn szx(&self) -> u8 {
    (self.0 & 0b111) as u8
  }

  /// Are there more blocks after this one?
  pub fn more(&self) -> bool {
    (self.0 & 0b1000) >> 3 == 1
  }

  /// The block number
  pub fn num(&self) -> u32 {
    self.0 >> 4
  }

  /// Byte offset of this block within the whole body
  pub fn offset(&self) -> usize {
    self.num() as usize * self.size() as usize
  }
}

impl From<Block> for u32 {
  fn from(b: Block) -> Self {
    b.0
  }
}

impl From<u32> for Block {
  fn from(n: u32) -> Self {
    Block(n)
  }
}

#[cfg(test)]
mod test {
  use super::*;

  #[test]
  fn block() {
    let b = Block(33);
    assert_eq!(b.size(), 32);
    assert_eq!(b.num(), 2);
    assert_eq!(b.more(), false);

    let b = Block(59);
    assert_eq!(b.size(), 128);
    assert_eq!(b.num(), 3);
    assert_eq!(b.more(), true);

    let b = Block::new(32, 2, false);
    assert_eq!(b, Block(33));

    let b = Block::new(128, 3, true);
    assert_eq!(b, Block(59));
  }

  #[test]
  fn szx_7_is_1024() {
    let b = Block(0b1111);
    assert_eq!(b.szx(), 7);
    assert_eq!(b.size(), 1024);
    assert!(b.more());
  }

  #[test]
  fn offset() {
    assert_eq!(Block::new(16, 0, true).offset(), 0);
    assert_eq!(Block::new(16, 3, true).offset(), 48);
    assert_eq!(Block::new(1024, 2, false).offset(), 2048);
  }
}
