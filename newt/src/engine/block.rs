use newt_msg::{code, known, Block, Id, Message, Payload, Status, Token};
use no_std_net::SocketAddr;
use std_alloc::vec::Vec;

use super::{Engine, MAX_INCOMING_MESSAGE_SIZE};
use crate::net::Addrd;
use crate::platform::Platform;
use crate::time::{Millis, Stamped};

/// Which block option a transfer uses
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub(crate) enum Kind {
  /// Request payloads, sent by the client
  Block1,
  /// Response payloads, sent by the server
  Block2,
}

impl Kind {
  fn set(self, msg: &mut Message, block: Block, total: usize) {
    let total = total as u32;
    match self {
      | Kind::Block1 => {
        msg.opts.set_block1(block);
        msg.opts.set_uint(known::SIZE1, total);
      },
      | Kind::Block2 => {
        msg.opts.set_block2(block);
        msg.opts.set_uint(known::SIZE2, total);
      },
    }
  }
}

/// What a stored outbound message is waiting for
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub(crate) enum Waiting {
  /// A request we are sending in pieces; waiting for the server to ask for more
  Block1,
  /// A response we are sending in pieces; waiting for the client to ask for more
  Block2,
  /// A GET whose response may arrive in pieces
  Get,
}

/// An outbound message too big (or possibly answered with something too big)
/// to fit in one block
#[derive(Debug, Clone)]
pub(crate) struct Sent<Param> {
  /// The message with its complete payload
  pub(crate) msg: Addrd<Message>,
  /// Id of the most recent packet sent on behalf of this message
  pub(crate) id: Id,
  pub(crate) waiting: Waiting,
  /// Start of the most recent block sent
  pub(crate) start: usize,
  /// End of the most recent block sent
  pub(crate) offset: usize,
  pub(crate) param: Param,
}

/// A piece of an inbound transfer
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct Fragment {
  pub(crate) addr: SocketAddr,
  pub(crate) kind: Kind,
  pub(crate) num: u32,
  pub(crate) payload: Vec<u8>,
}

/// Copy of `full` carrying only block `num` (of `size` bytes) of its payload,
/// along with the block & size options describing it
pub(crate) fn nth_block(full: &Message, kind: Kind, size: u16, num: u32) -> Message {
  let len = full.payload.0.len();
  let start = (num as usize * usize::from(size)).min(len);
  let end = (start + usize::from(size)).min(len);

  let mut msg = Message::new(full.ty, full.code, full.id, full.token);
  msg.ver = full.ver;
  msg.opts = full.opts.clone();
  msg.payload = Payload(full.payload.0[start..end].to_vec());

  kind.set(&mut msg, Block::new(size, num, end < len), len);
  msg
}

/// Block-wise transfers in progress
#[derive(Debug, Clone)]
pub(crate) struct Blockwise<Param> {
  sent: Vec<Stamped<Sent<Param>>>,
  received: Vec<Stamped<Fragment>>,
}

impl<Param> Default for Blockwise<Param> {
  fn default() -> Self {
    Self { sent: Vec::new(),
           received: Vec::new() }
  }
}

impl<Param> Blockwise<Param> {
  pub(crate) fn sent_len(&self) -> usize {
    self.sent.len()
  }

  pub(crate) fn received_len(&self) -> usize {
    self.received.len()
  }

  pub(crate) fn store(&mut self, sent: Sent<Param>, now: Millis) {
    match self.sent.try_reserve(1) {
      | Ok(()) => self.sent.push(Stamped(sent, now)),
      | Err(_) => log::warn!("out of memory; not tracking block-wise message {}", sent.id.0),
    }
  }

  pub(crate) fn get_mut(&mut self, ix: usize) -> &mut Stamped<Sent<Param>> {
    &mut self.sent[ix]
  }

  pub(crate) fn remove(&mut self, ix: usize) -> Sent<Param> {
    self.sent.remove(ix).discard_timestamp()
  }

  pub(crate) fn clear_sent(&mut self) {
    self.sent.clear();
  }

  fn position(&self, addr: SocketAddr, waiting: Waiting, f: impl Fn(&Sent<Param>) -> bool) -> Option<usize> {
    self.sent.iter().position(|s| {
                      let s = s.data();
                      s.waiting == waiting && s.msg.addr() == addr && f(s)
                    })
  }

  /// Find a stored message by the id of the last packet sent on its behalf
  pub(crate) fn find_by_id(&self, addr: SocketAddr, waiting: Waiting, id: Id) -> Option<usize> {
    self.position(addr, waiting, |s| s.id == id)
  }

  /// Find a stored message, first by the id of the last packet sent on its behalf
  /// and failing that by token
  pub(crate) fn find(&self, addr: SocketAddr, waiting: Waiting, id: Id, token: Token) -> Option<usize> {
    self.find_by_id(addr, waiting, id)
        .or_else(|| self.position(addr, waiting, |s| s.msg.data().token == token))
  }

  /// Find the response we are sending to `addr` in pieces, by token.
  ///
  /// Falls back to the newest one for that address.
  pub(crate) fn find_response(&self, addr: SocketAddr, token: Token) -> Option<usize> {
    let for_addr = || {
      self.sent.iter().enumerate().filter(|(_, s)| {
                                    s.data().waiting == Waiting::Block2 && s.data().msg.addr() == addr
                                  })
    };

    for_addr().find(|(_, s)| s.data().msg.data().token == token)
              .or_else(|| for_addr().max_by_key(|(_, s)| s.time()))
              .map(|(ix, _)| ix)
  }

  /// A Reset arrived; abandon whatever it rejected
  pub(crate) fn reset(&mut self, addr: SocketAddr, id: Id) {
    let before = self.sent.len();
    self.sent
        .retain(|s| !(s.data().msg.addr() == addr && s.data().id == id));

    if before != self.sent.len() {
      log::debug!("{:?} reset block-wise message {}", addr, id.0);
    }
  }

  /// Number of payload bytes received so far
  pub(crate) fn received_bytes(&self, addr: SocketAddr, kind: Kind) -> usize {
    self.fragments(addr, kind).map(|f| f.payload.len()).sum()
  }

  fn fragments(&self, addr: SocketAddr, kind: Kind) -> impl Iterator<Item = &Fragment> {
    self.received
        .iter()
        .map(|f| f.data())
        .filter(move |f| f.addr == addr && f.kind == kind)
  }

  pub(crate) fn push(&mut self, fragment: Fragment, now: Millis) -> Result<(), ()> {
    let (addr, kind) = (fragment.addr, fragment.kind);
    self.received.try_reserve(1).map_err(|_| ())?;
    self.received.push(Stamped(fragment, now));

    // progress on the transfer keeps all of its pieces alive
    self.received
        .iter_mut()
        .filter(|f| f.data().addr == addr && f.data().kind == kind)
        .for_each(|f| f.restamp(now));
    Ok(())
  }

  pub(crate) fn drop_fragments(&mut self, addr: SocketAddr, kind: Kind) {
    self.received
        .retain(|f| !(f.data().addr == addr && f.data().kind == kind));
  }

  /// Remove the pieces of a transfer, concatenated in the order they arrived
  pub(crate) fn take_fragments(&mut self, addr: SocketAddr, kind: Kind) -> Vec<u8> {
    let mut payload = Vec::with_capacity(self.received_bytes(addr, kind));
    let mut ix = 0;

    while ix < self.received.len() {
      let f = self.received[ix].data();
      if f.addr == addr && f.kind == kind {
        payload.extend_from_slice(&self.received.remove(ix).discard_timestamp().payload);
      } else {
        ix += 1;
      }
    }

    payload
  }

  /// Forget transfers that have not progressed in `max_age`
  pub(crate) fn prune(&mut self, now: Millis, max_age: Millis) {
    let before = (self.sent.len(), self.received.len());

    self.sent.retain(|s| !s.expired(now, max_age));
    self.received.retain(|f| !f.expired(now, max_age));

    let after = (self.sent.len(), self.received.len());
    if before != after {
      log::debug!("expired {} block-wise message(s) and {} fragment(s)",
                  before.0 - after.0,
                  before.1 - after.1);
    }
  }
}

impl<P: Platform> Engine<P> {
  /// Block-wise handling of an inbound message that passed all other checks
  pub(super) fn blockwise(&mut self, msg: &mut Message, addr: SocketAddr, param: &P::Param) {
    use newt_msg::CodeKind;

    match msg.code.kind() {
      | CodeKind::Request => match (msg.opts.block1(), msg.opts.block2()) {
        | (Some(b), _) => self.receive_block1(msg, addr, b, param),
        | (None, Some(b)) => self.serve_block2(msg, addr, b),
        | (None, None) => (),
      },
      | CodeKind::Response => {
        if let Some(b) = msg.opts.block1() {
          self.continue_block1(msg, addr, b);
        }

        match msg.opts.block2() {
          | Some(b) => self.receive_block2(msg, addr, b),
          | None => self.forget_get(msg, addr),
        }
      },
      | CodeKind::Empty => (),
    }
  }

  fn local_block_size(&self) -> u16 {
    self.config.block.size
  }

  /// A piece of a request body arrived
  fn receive_block1(&mut self, msg: &mut Message, addr: SocketAddr, b: Block, param: &P::Param) {
    if b.num() == 0 {
      self.block.drop_fragments(addr, Kind::Block1);
      if !b.more() {
        return;
      }
    } else if b.offset() != self.block.received_bytes(addr, Kind::Block1) {
      log::warn!("block {} of request {} from {:?} arrived out of order",
                 b.num(),
                 msg.id.0,
                 addr);
      self.block.drop_fragments(addr, Kind::Block1);
      self.reply(msg, addr, code::REQUEST_ENTITY_INCOMPLETE, param, |_| ());
      msg.status = Status::EntityIncomplete;
      return;
    }

    let total = self.block.received_bytes(addr, Kind::Block1) + msg.payload.0.len();
    let declared = msg.opts.size1().map(|n| n as usize).unwrap_or(0);
    if total > MAX_INCOMING_MESSAGE_SIZE || declared > MAX_INCOMING_MESSAGE_SIZE {
      log::warn!("request {} from {:?} is too large", msg.id.0, addr);
      self.block.drop_fragments(addr, Kind::Block1);
      self.reply(msg, addr, code::REQUEST_ENTITY_TOO_LARGE, param, |rep| {
            rep.opts.set_uint(known::SIZE1, MAX_INCOMING_MESSAGE_SIZE as u32)
          });
      msg.status = Status::EntityTooLarge;
      return;
    }

    if b.more() {
      let fragment = Fragment { addr,
                                kind: Kind::Block1,
                                num: b.num(),
                                payload: msg.payload.0.clone() };

      if self.block.push(fragment, self.now).is_err() {
        log::warn!("out of memory storing block {} from {:?}", b.num(), addr);
        self.block.drop_fragments(addr, Kind::Block1);
        self.reply(msg, addr, code::REQUEST_ENTITY_TOO_LARGE, param, |_| ());
        msg.status = Status::EntityTooLarge;
        return;
      }

      let size = b.size().min(self.local_block_size());
      self.reply(msg, addr, code::CONTINUE, param, |rep| {
            rep.opts.set_block1(Block::new(size, b.num(), true))
          });
      msg.status = Status::BlockwiseReceiving;
    } else {
      let mut payload = self.block.take_fragments(addr, Kind::Block1);
      payload.extend_from_slice(&msg.payload.0);
      log::debug!("received {} byte request body from {:?}", payload.len(), addr);

      msg.payload = Payload(payload);
      msg.status = Status::BlockwiseReceived;
    }
  }

  /// A client asked for a piece of a response we are sending block-wise
  fn serve_block2(&mut self, msg: &mut Message, addr: SocketAddr, b: Block) {
    let ix = match self.block.find_response(addr, msg.token) {
      | Some(ix) => ix,
      | None => return,
    };

    let size = b.size().min(self.local_block_size());
    let num = (b.offset() / usize::from(size)) as u32;
    let (ty, id) = self.reply_header(msg);

    let entry = self.block.get_mut(ix);
    if num as usize * usize::from(size) >= entry.data().msg.data().payload.0.len() {
      log::warn!("{:?} asked for block {} past the end of the response", addr, b.num());
      return;
    }

    let mut rep = nth_block(entry.data().msg.data(), Kind::Block2, size, num);
    rep.ty = ty;
    rep.id = id;
    rep.token = msg.token;

    let last = !rep.opts.block2().map(|b| b.more()).unwrap_or(false);
    let param = if last {
      self.block.remove(ix).param
    } else {
      entry.restamp(self.now);
      let sent = entry.data_mut();
      sent.id = id;
      sent.start = num as usize * usize::from(size);
      sent.offset = sent.start + rep.payload.0.len();
      sent.param.clone()
    };

    self.send(Addrd(rep, addr), &param);
    msg.status = Status::BlockwiseAck;
  }

  /// The server acknowledged a piece of a request we are sending block-wise.
  ///
  /// Only an answer to the most recent block moves the transfer forward;
  /// answers to packets we've moved past are ignored.
  fn continue_block1(&mut self, msg: &mut Message, addr: SocketAddr, b: Block) {
    let ix = match self.block.find_by_id(addr, Waiting::Block1, msg.id) {
      | Some(ix) => ix,
      | None => return,
    };

    let start = self.block.get_mut(ix).data().start;
    if b.offset() != start {
      log::warn!("{:?} acknowledged block {} of {} but we last sent the block at byte {}",
                 addr,
                 b.num(),
                 msg.id.0,
                 start);
      return;
    }

    if !b.more() {
      log::debug!("{:?} received request {} in full", addr, msg.id.0);
      self.block.remove(ix);
      return;
    }

    let size = b.size().min(self.local_block_size());
    let id = self.ids.next();
    let now = self.now;

    let entry = self.block.get_mut(ix);
    let offset = entry.data().offset;
    if offset >= entry.data().msg.data().payload.0.len() {
      return;
    }

    let mut next = nth_block(entry.data().msg.data(), Kind::Block1, size, (offset / usize::from(size)) as u32);
    next.id = id;

    entry.restamp(now);
    let sent = entry.data_mut();
    sent.id = id;
    sent.start = offset;
    sent.offset = offset + next.payload.0.len();
    let param = sent.param.clone();

    self.send(Addrd(next, addr), &param);
    msg.status = Status::BlockwiseAck;
  }

  /// A piece of a response to a GET we sent arrived
  fn receive_block2(&mut self, msg: &mut Message, addr: SocketAddr, b: Block) {
    let ix = match self.block.find(addr, Waiting::Get, msg.id, msg.token) {
      | Some(ix) => ix,
      | None => return,
    };

    let received = self.block.received_bytes(addr, Kind::Block2);
    if b.offset() < received && b.offset() + msg.payload.0.len() <= received {
      log::debug!("block {} of response {} from {:?} is a duplicate",
                  b.num(),
                  msg.id.0,
                  addr);
      msg.status = Status::Duplicated;
      return;
    }

    if b.num() == 0 {
      self.block.drop_fragments(addr, Kind::Block2);
      if !b.more() {
        self.block.remove(ix);
        return;
      }
    } else if b.offset() != self.block.received_bytes(addr, Kind::Block2) {
      log::warn!("block {} of response {} from {:?} arrived out of order",
                 b.num(),
                 msg.id.0,
                 addr);
      self.block.drop_fragments(addr, Kind::Block2);
      self.block.remove(ix);
      msg.status = Status::EntityIncomplete;
      return;
    }

    let total = self.block.received_bytes(addr, Kind::Block2) + msg.payload.0.len();
    let declared = msg.opts.size2().map(|n| n as usize).unwrap_or(0);
    if total > MAX_INCOMING_MESSAGE_SIZE || declared > MAX_INCOMING_MESSAGE_SIZE {
      log::warn!("response {} from {:?} is too large", msg.id.0, addr);
      self.block.drop_fragments(addr, Kind::Block2);
      self.block.remove(ix);
      msg.status = Status::EntityTooLarge;
      return;
    }

    if !b.more() {
      let mut payload = self.block.take_fragments(addr, Kind::Block2);
      payload.extend_from_slice(&msg.payload.0);
      log::debug!("received {} byte response body from {:?}", payload.len(), addr);

      self.block.remove(ix);
      msg.payload = Payload(payload);
      msg.status = Status::BlockwiseReceived;
      return;
    }

    let fragment = Fragment { addr,
                              kind: Kind::Block2,
                              num: b.num(),
                              payload: msg.payload.0.clone() };
    if self.block.push(fragment, self.now).is_err() {
      log::warn!("out of memory storing block {} from {:?}", b.num(), addr);
      self.block.drop_fragments(addr, Kind::Block2);
      self.block.remove(ix);
      msg.status = Status::EntityTooLarge;
      return;
    }

    let size = b.size().min(self.local_block_size());
    let received = self.block.received_bytes(addr, Kind::Block2);
    let id = self.ids.next();
    let now = self.now;

    let entry = self.block.get_mut(ix);
    entry.restamp(now);

    let sent = entry.data_mut();
    let mut next = sent.msg.data().clone();
    next.id = id;
    next.opts
        .set_block2(Block::new(size, (received / usize::from(size)) as u32, false));
    sent.id = id;
    let param = sent.param.clone();

    self.send(Addrd(next, addr), &param);
    msg.status = Status::BlockwiseReceiving;
  }

  /// A response without Block2 answered a GET; it's complete
  fn forget_get(&mut self, msg: &Message, addr: SocketAddr) {
    if let Some(ix) = self.block.find(addr, Waiting::Get, msg.id, msg.token) {
      self.block.remove(ix);
    }
  }
}
