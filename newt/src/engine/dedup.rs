use newt_msg::Id;
use no_std_net::SocketAddr;
use std_alloc::vec::Vec;

use crate::time::{Millis, Stamped};

/// A message we received recently, and what we answered it with
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct Seen {
  pub(crate) addr: SocketAddr,
  pub(crate) id: Id,
  pub(crate) response: Option<Vec<u8>>,
}

/// Remembers the (source address, id) pairs of recent CON and NON messages
/// so that retransmissions by the peer are not processed twice.
///
/// Oldest entries are evicted first when the buffer is full.
#[derive(Debug, Clone, Default)]
pub(crate) struct Dedup {
  seen: Vec<Stamped<Seen>>,
}

impl Dedup {
  pub(crate) fn len(&self) -> usize {
    self.seen.len()
  }

  fn position(&self, addr: SocketAddr, id: Id) -> Option<usize> {
    self.seen
        .iter()
        .position(|s| s.data().addr == addr && s.data().id == id)
  }

  /// If this message was seen before, yield what we remember of it.
  ///
  /// Otherwise remember it, evicting the oldest entry if we are already
  /// holding `capacity` entries.
  pub(crate) fn check(&mut self, addr: SocketAddr, id: Id, now: Millis, capacity: u8) -> Option<&Seen> {
    if capacity == 0 {
      return None;
    }

    if let Some(ix) = self.position(addr, id) {
      return Some(self.seen[ix].data());
    }

    while self.seen.len() >= usize::from(capacity) {
      let oldest = self.seen.remove(0);
      log::trace!("forgetting {} from {:?} to make room",
                  oldest.data().id.0,
                  oldest.data().addr);
    }

    self.seen.push(Stamped(Seen { addr,
                                  id,
                                  response: None },
                           now));
    None
  }

  /// Remember the bytes we answered a message with,
  /// so we can answer its duplicates with the same thing.
  pub(crate) fn respond(&mut self, addr: SocketAddr, id: Id, bytes: &[u8]) {
    if let Some(ix) = self.position(addr, id) {
      self.seen[ix].data_mut().response = Some(bytes.to_vec());
    }
  }

  /// Forget everything older than `lifetime`
  pub(crate) fn prune(&mut self, now: Millis, lifetime: Millis) {
    let before = self.seen.len();
    self.seen.retain(|s| !s.expired(now, lifetime));

    if before != self.seen.len() {
      log::debug!("forgot {} message id(s)", before - self.seen.len());
    }
  }
}
