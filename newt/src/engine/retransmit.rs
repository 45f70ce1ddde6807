use newt_msg::{Id, Message};
use no_std_net::SocketAddr;
use std_alloc::collections::TryReserveError;
use std_alloc::vec::Vec;

use crate::config;
use crate::net::Addrd;
use crate::retry::{RetryTimer, YouShould};
use crate::time::Millis;

/// A confirmable message waiting to be acknowledged
#[derive(Debug, Clone)]
pub(crate) struct Resend<Param> {
  pub(crate) dgram: Addrd<Vec<u8>>,
  pub(crate) msg: Message,
  pub(crate) timer: RetryTimer,
  pub(crate) param: Param,
}

/// Why a message was not put in the retransmission queue
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum NotStored {
  Disabled,
  Full,
  NoMemory(TryReserveError),
}

/// Confirmable messages we sent that have not been acknowledged yet
#[derive(Debug, Clone)]
pub(crate) struct Retransmit<Param> {
  entries: Vec<Resend<Param>>,
}

impl<Param> Default for Retransmit<Param> {
  fn default() -> Self {
    Self { entries: Vec::new() }
  }
}

impl<Param> Retransmit<Param> {
  pub(crate) fn len(&self) -> usize {
    self.entries.len()
  }

  pub(crate) fn bytes(&self) -> usize {
    self.entries.iter().map(|e| e.dgram.data().len()).sum()
  }

  /// Queue a message, unless the queue is at either of its limits.
  pub(crate) fn store(&mut self, entry: Resend<Param>, limits: &config::Msg) -> Result<(), NotStored> {
    if !limits.resending_enabled() {
      return Err(NotStored::Disabled);
    }

    let max_msgs = usize::from(limits.resend_buffer_msgs);
    let max_bytes = usize::from(limits.resend_buffer_bytes);
    let full_of_msgs = max_msgs > 0 && self.len() >= max_msgs;
    let full_of_bytes = max_bytes > 0 && self.bytes() + entry.dgram.data().len() > max_bytes;

    if full_of_msgs || full_of_bytes {
      return Err(NotStored::Full);
    }

    self.entries.try_reserve(1).map_err(NotStored::NoMemory)?;
    self.entries.push(entry);
    Ok(())
  }

  /// An Ack or Reset arrived; stop retransmitting what it answers.
  pub(crate) fn acked(&mut self, addr: SocketAddr, id: Id) -> bool {
    let before = self.len();
    self.entries
        .retain(|e| !(e.dgram.addr() == addr && e.msg.id == id));
    before != self.len()
  }

  pub(crate) fn remove_id(&mut self, id: Id) -> bool {
    let before = self.len();
    self.entries.retain(|e| e.msg.id != id);
    before != self.len()
  }

  pub(crate) fn clear(&mut self) {
    self.entries.clear();
  }

  /// Ask every entry's timer what to do, invoking `resend` on the ones
  /// that are due for a retransmission.
  ///
  /// Entries that ran out of attempts are removed and yielded.
  pub(crate) fn sweep(&mut self,
                      now: Millis,
                      mut resend: impl FnMut(Addrd<&[u8]>, &Param))
                      -> Vec<Resend<Param>> {
    let mut exhausted = Vec::new();
    let mut ix = 0;

    while ix < self.entries.len() {
      match self.entries[ix].timer.what_should_i_do(now) {
        | Ok(YouShould::Retry) => {
          let entry = &self.entries[ix];
          log::trace!("retransmitting {} (retry {})",
                      entry.msg.id.0,
                      entry.timer.attempts().0);
          resend(entry.dgram.as_bytes(), &entry.param);
          ix += 1;
        },
        | Ok(YouShould::Cry) => exhausted.push(self.entries.remove(ix)),
        | Err(nb::Error::WouldBlock) => ix += 1,
        | Err(nb::Error::Other(never)) => match never {},
      }
    }

    exhausted
  }
}
