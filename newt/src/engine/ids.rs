use newt_msg::Id;
use rand::Rng;

/// Hands out message ids.
///
/// The first id is random, every id after it is the [successor](Id::successor)
/// of the previous one.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct Ids {
  next: Id,
}

impl Ids {
  pub(crate) fn new(rand: &mut impl Rng) -> Self {
    Self { next: Id(rand.gen_range(1..=u16::MAX)) }
  }

  #[cfg(test)]
  pub(crate) fn starting_at(next: u16) -> Self {
    Self { next: Id(next.max(1)) }
  }

  pub(crate) fn next(&mut self) -> Id {
    let id = self.next;
    self.next = id.successor();
    id
  }
}
