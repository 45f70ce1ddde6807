use core::fmt::{Debug, Formatter};

use embedded_time::duration::{Milliseconds, Seconds};
use newt_msg::{code, validate, Code, CodeKind, Id, Message, Status, TryIntoBytes, Type,
               SUPPORTED_VERSION};
use no_std_net::SocketAddr;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use std_alloc::vec::Vec;

use crate::config::{Config, ConfigError};
use crate::logging::msg_summary;
use crate::net::Addrd;
use crate::platform::Platform;
use crate::retry::RetryTimer;
use crate::time::{self, Millis};

mod block;
mod dedup;
mod error;
mod ids;
mod retransmit;

use block::{Blockwise, Kind, Sent, Waiting};
use dedup::Dedup;
#[doc(inline)]
pub use error::*;
use ids::Ids;
use retransmit::{NotStored, Resend, Retransmit};

/// Largest payload we are willing to reassemble from a block-wise transfer
pub const MAX_INCOMING_MESSAGE_SIZE: usize = 65535;

/// # CoAP protocol engine
///
/// Owns everything one CoAP endpoint needs to remember between datagrams:
/// - confirmable messages awaiting acknowledgement, retransmitted with exponential backoff
/// - recently seen message ids, so that retransmissions by peers are not processed twice
/// - block-wise transfers in progress, in both directions
///
/// The engine never blocks and never touches a socket; inbound datagrams are fed to
/// [`Engine::parse`], outbound messages are serialized by [`Engine::build`], and
/// [`Engine::exec`] should be invoked periodically to retransmit and expire state.
/// Datagrams the engine sends of its own accord go through the [`Platform`].
///
/// ```
/// use newt::config::Config;
/// use newt::engine::Engine;
/// use newt::net::Addrd;
/// use newt::platform::Platform;
/// use newt_msg::*;
/// use no_std_net::{Ipv4Addr, SocketAddr, SocketAddrV4};
///
/// #[derive(Debug, Default)]
/// struct Outbox(Vec<Addrd<Vec<u8>>>);
///
/// impl Platform for Outbox {
///   type Param = ();
///   type Error = ();
///
///   fn send(&mut self, dgram: Addrd<&[u8]>, _: &()) -> Result<(), ()> {
///     self.0.push(dgram.map(|bytes| bytes.to_vec()));
///     Ok(())
///   }
/// }
///
/// let server = SocketAddr::V4(SocketAddrV4::new(Ipv4Addr::LOCALHOST, 5683));
/// let mut engine = Engine::new(Outbox::default(), Config::default());
///
/// let mut req = Message::new(Type::Con, code::GET, Id(0), Token::default());
/// req.opts.set_joined(known::URI_PATH, "hello").unwrap();
///
/// let mut buf = [0u8; 64];
/// let n = engine.build(server, &mut buf, &mut req, ()).unwrap();
/// assert_ne!(req.id, Id(0));
/// assert_eq!(engine.resend_queue_len(), 1);
///
/// // the server acknowledges our request
/// let ack = req.ack().try_into_bytes().unwrap();
/// let parsed = engine.parse(server, &ack, ()).unwrap();
/// assert_eq!(parsed.ty, Type::Ack);
/// assert_eq!(engine.resend_queue_len(), 0);
/// # let _ = n;
/// ```
pub struct Engine<P: Platform> {
  platform: P,
  config: Config,
  now: Millis,
  rand: ChaCha8Rng,
  ids: Ids,
  resend: Retransmit<P::Param>,
  dedup: Dedup,
  block: Blockwise<P::Param>,
}

impl<P: Platform> Debug for Engine<P> {
  fn fmt(&self, f: &mut Formatter<'_>) -> core::fmt::Result {
    f.debug_struct("Engine")
     .field("config", &self.config)
     .field("now", &self.now)
     .field("resend_queue_len", &self.resend.len())
     .field("duplicate_len", &self.dedup.len())
     .field("blockwise_sent_len", &self.block.sent_len())
     .field("blockwise_received_len", &self.block.received_len())
     .finish()
  }
}

impl<P: Platform> Engine<P> {
  /// Create an engine that sends through `platform`
  pub fn new(platform: P, config: Config) -> Self {
    let mut rand = ChaCha8Rng::seed_from_u64(config.msg.id_seed);
    let ids = Ids::new(&mut rand);

    Self { platform,
           config,
           now: Milliseconds(0),
           rand,
           ids,
           resend: Default::default(),
           dedup: Default::default(),
           block: Default::default() }
  }

  /// Tear the engine down, releasing everything it was tracking
  /// and handing back the platform
  pub fn destroy(self) -> P {
    log::debug!("dropping {} unacknowledged message(s) and {} block-wise message(s)",
                self.resend.len(),
                self.block.sent_len());
    self.platform
  }

  /// Borrow the platform
  pub fn platform(&self) -> &P {
    &self.platform
  }

  /// Mutably borrow the platform
  pub fn platform_mut(&mut self) -> &mut P {
    &mut self.platform
  }

  /// The configuration in effect
  pub fn config(&self) -> Config {
    self.config
  }

  /// See [`Config::set_block_size`]
  pub fn set_block_size(&mut self, size: u16) -> Result<(), ConfigError> {
    self.config.set_block_size(size)
  }

  /// See [`Config::set_duplicate_buffer_size`]
  pub fn set_duplicate_buffer_size(&mut self, size: u8) -> Result<(), ConfigError> {
    self.config.set_duplicate_buffer_size(size)
  }

  /// See [`Config::set_retransmission_parameters`]
  pub fn set_retransmission_parameters(&mut self,
                                       count: u8,
                                       interval: Seconds<u32>)
                                       -> Result<(), ConfigError> {
    self.config.set_retransmission_parameters(count, interval)
  }

  /// See [`Config::set_retransmission_buffer`]
  pub fn set_retransmission_buffer(&mut self, msgs: u8, bytes: u16) -> Result<(), ConfigError> {
    self.config.set_retransmission_buffer(msgs, bytes)
  }

  /// See [`Config::set_random_factor`]
  pub fn set_random_factor(&mut self, min_pct: u8, max_pct: u8) -> Result<(), ConfigError> {
    self.config.set_random_factor(min_pct, max_pct)
  }

  /// See [`Config::set_duplicate_lifetime`]
  pub fn set_duplicate_lifetime(&mut self, lifetime: Seconds<u32>) -> Result<(), ConfigError> {
    self.config.set_duplicate_lifetime(lifetime)
  }

  /// See [`Config::set_blockwise_max_age`]
  pub fn set_blockwise_max_age(&mut self, max_age: Seconds<u32>) -> Result<(), ConfigError> {
    self.config.set_blockwise_max_age(max_age)
  }

  /// Number of confirmable messages awaiting acknowledgement
  pub fn resend_queue_len(&self) -> usize {
    self.resend.len()
  }

  /// Number of message ids remembered for duplicate detection
  pub fn duplicate_len(&self) -> usize {
    self.dedup.len()
  }

  /// Number of outbound messages with block-wise state
  pub fn blockwise_sent_len(&self) -> usize {
    self.block.sent_len()
  }

  /// Number of inbound block-wise fragments held for reassembly
  pub fn blockwise_received_len(&self) -> usize {
    self.block.received_len()
  }

  /// Stop retransmitting the message with this id.
  ///
  /// Returns whether there was such a message.
  pub fn remove_resend(&mut self, id: Id) -> bool {
    self.resend.remove_id(id)
  }

  /// Stop retransmitting everything
  pub fn clear_resend_queue(&mut self) {
    self.resend.clear();
  }

  /// Abandon every outbound block-wise transfer
  pub fn clear_blockwise_sent(&mut self) {
    self.block.clear_sent();
  }

  /// Would `msg` be split into blocks, and with which option?
  fn fragmentation(&self, msg: &Message) -> Option<Kind> {
    let size = usize::from(self.config.block.size);
    let explicit = msg.opts.block1().is_some() || msg.opts.block2().is_some();

    if size == 0 || msg.payload.0.len() <= size || explicit {
      return None;
    }

    match msg.code.kind() {
      | CodeKind::Request => Some(Kind::Block1),
      | CodeKind::Response => Some(Kind::Block2),
      | CodeKind::Empty => None,
    }
  }

  /// Number of bytes [`Engine::build`] will write for `msg`.
  ///
  /// When `msg` will be split into blocks, this is the size of the first block.
  pub fn calc_size(&self, msg: &Message) -> usize {
    match self.fragmentation(msg) {
      | Some(kind) => block::nth_block(msg, kind, self.config.block.size, 0).calc_size(),
      | None => msg.calc_size(),
    }
  }

  /// Serialize an outbound message into `buf`, yielding the number of bytes written.
  ///
  /// - A CON or NON with `Id(0)` is assigned a fresh id, written back into `msg`.
  /// - A payload larger than the block size is split; only the first block is written
  ///   to `buf`, the rest are sent as the peer asks for them.
  /// - Confirmable messages are kept for retransmission until acknowledged.
  /// - Acks and Resets are remembered as the answer to the message they answer,
  ///   so duplicates of that message get the same answer.
  ///
  /// `param` is handed back to the [`Platform`] on every transmission made on
  /// this message's behalf.
  ///
  /// Retransmission deadlines count from the `now` of the most recent [`Engine::exec`].
  pub fn build(&mut self,
               addr: SocketAddr,
               buf: &mut [u8],
               msg: &mut Message,
               param: P::Param)
               -> Result<usize, BuildError> {
    validate(msg, SUPPORTED_VERSION)?;
    check_empty(msg)?;

    if matches!(msg.ty, Type::Con | Type::Non) && msg.id == Id(0) {
      msg.id = self.ids.next();
    }

    let fragmented = self.fragmentation(msg);
    let first = fragmented.map(|kind| block::nth_block(msg, kind, self.config.block.size, 0));
    let out: &Message = first.as_ref().unwrap_or(&*msg);

    let n = out.try_write_bytes(buf)?;
    let bytes = &buf[..n];

    if let Err(NotStored::NoMemory(_)) = self.remember_con(Addrd(bytes, addr), out, &param) {
      return Err(BuildError::ResendStore);
    }

    if matches!(out.ty, Type::Ack | Type::Reset) {
      self.dedup.respond(addr, out.id, bytes);
    }

    let waiting = match fragmented {
      | Some(Kind::Block1) => Some(Waiting::Block1),
      | Some(Kind::Block2) => Some(Waiting::Block2),
      | None if self.config.block.enabled() && msg.code == code::GET => Some(Waiting::Get),
      | None => None,
    };

    if let Some(waiting) = waiting {
      log::debug!("tracking {:?} block-wise message {}", waiting, msg.id.0);
      let sent = Sent { msg: Addrd(msg.clone(), addr),
                        id: msg.id,
                        waiting,
                        start: 0,
                        offset: first.as_ref().map(|m| m.payload.0.len()).unwrap_or(0),
                        param };
      self.block.store(sent, self.now);
    }

    log::trace!("built {} for {:?}", msg_summary(msg).as_str(), addr);
    Ok(n)
  }

  /// Feed an inbound datagram to the engine.
  ///
  /// Yields `None` when the datagram is too short to hold a header, when the
  /// header is invalid and when it is a CoAP ping; those are fully handled here.
  /// Anything else is yielded, with [`Message::status`] saying what the
  /// engine made of it.
  ///
  /// The engine's clock only advances in [`Engine::exec`]; everything remembered
  /// about this datagram (for duplicate detection or block-wise reassembly) is
  /// stamped with the `now` of the most recent `exec`. Lifetimes are therefore
  /// only as precise as the interval between `exec` calls.
  pub fn parse(&mut self, addr: SocketAddr, bytes: &[u8], param: P::Param) -> Option<Message> {
    let mut msg = match Message::parse_partial(bytes) {
      | Some(msg) => msg,
      | None => {
        log::warn!("ignoring {} byte datagram from {:?}", bytes.len(), addr);
        return None;
      },
    };

    if msg.status == Status::ParserError {
      log::warn!("message {} from {:?} is malformed", msg.id.0, addr);
      if msg.ty == Type::Con {
        self.send(Addrd(msg.reset(), addr), &param);
      }
      return Some(msg);
    }

    if let Err(e) = validate(&msg, SUPPORTED_VERSION) {
      log::warn!("rejecting {} from {:?}: {}", msg_summary(&msg).as_str(), addr, e);
      if e.should_reset() {
        self.send(Addrd(msg.reset(), addr), &param);
      }
      return None;
    }

    log::trace!("received {} from {:?}", msg_summary(&msg).as_str(), addr);

    if msg.ty == Type::Con && msg.code == code::EMPTY {
      log::debug!("{:?} pinged us", addr);
      self.send(Addrd(msg.reset(), addr), &param);
      return None;
    }

    if matches!(msg.ty, Type::Con | Type::Non) {
      let seen = self.dedup
                     .check(addr, msg.id, self.now, self.config.dup.capacity)
                     .map(|seen| seen.response.clone());

      if let Some(response) = seen {
        log::debug!("{} from {:?} is a duplicate", msg.id.0, addr);
        if let Some(bytes) = response {
          if let Err(e) = self.platform.send(Addrd(bytes.as_slice(), addr), &param) {
            log::warn!("resending answer to duplicate {} failed: {:?}", msg.id.0, e);
          }
        }

        msg.status = Status::Duplicated;
        return Some(msg);
      }
    }

    if matches!(msg.ty, Type::Ack | Type::Reset) {
      if self.resend.acked(addr, msg.id) {
        log::debug!("{:?} answered {} with {:?}", addr, msg.id.0, msg.ty);
      }

      if msg.ty == Type::Reset {
        self.block.reset(addr, msg.id);
      }
    }

    if self.config.block.enabled() {
      self.blockwise(&mut msg, addr, &param);
    }

    Some(msg)
  }

  /// Advance the engine's clock to `now`, retransmitting unacknowledged
  /// messages that are due and forgetting state that has expired.
  ///
  /// Messages that run out of retransmissions are handed to
  /// [`Platform::send_failed`].
  ///
  /// Every due message is handled even when some transmissions fail;
  /// the failures are then reported in the error.
  pub fn exec(&mut self, now: Seconds<u32>) -> Result<(), ExecError> {
    self.now = time::millis(now);
    let now = self.now;

    let platform = &mut self.platform;
    let mut failed_sends = 0u16;
    let exhausted = self.resend.sweep(now, |dgram, param| {
                                 if let Err(e) = platform.send(dgram, param) {
                                   log::warn!("retransmission to {:?} failed: {:?}", dgram.addr(), e);
                                   failed_sends = failed_sends.saturating_add(1);
                                 }
                               });

    for Resend { dgram, mut msg, param, .. } in exhausted {
      log::warn!("{:?} never acknowledged {}", dgram.addr(), msg.id.0);
      msg.status = Status::SendingFailed;
      self.platform.send_failed(Addrd(msg, dgram.addr()), param);
    }

    self.dedup.prune(now, time::millis(self.config.dup.lifetime));
    self.block.prune(now, time::millis(self.config.block.max_age));

    match failed_sends {
      | 0 => Ok(()),
      | failed_sends => Err(ExecError { failed_sends }),
    }
  }

  /// If `msg` is confirmable, keep a copy around for retransmission
  fn remember_con(&mut self,
                  dgram: Addrd<&[u8]>,
                  msg: &Message,
                  param: &P::Param)
                  -> Result<(), NotStored> {
    if msg.ty != Type::Con {
      return Ok(());
    }

    let mut bytes = Vec::new();
    bytes.try_reserve_exact(dgram.data().len())
         .map_err(NotStored::NoMemory)?;
    bytes.extend_from_slice(dgram.data());

    let con = self.config.msg.con;
    let timer = RetryTimer::new(self.now, con.strategy(), con.max_attempts, &mut self.rand);
    let entry = Resend { dgram: Addrd(bytes, dgram.addr()),
                         msg: msg.clone(),
                         timer,
                         param: param.clone() };

    match self.resend.store(entry, &self.config.msg) {
      | Ok(()) => {
        log::debug!("will retransmit {} at {}ms", msg.id.0, timer.next().0);
        Ok(())
      },
      | Err(NotStored::Disabled) => Ok(()),
      | Err(e) => {
        log::warn!("not retransmitting {}: {:?}", msg.id.0, e);
        Err(e)
      },
    }
  }

  /// Send a message the engine originated
  fn send(&mut self, msg: Addrd<Message>, param: &P::Param) {
    let bytes = match msg.data().try_into_bytes() {
      | Ok(bytes) => bytes,
      | Err(e) => {
        log::warn!("could not serialize {}: {}", msg_summary(msg.data()).as_str(), e);
        return;
      },
    };

    let dgram = Addrd(bytes.as_slice(), msg.addr());
    log::trace!("sending {} to {:?}", msg_summary(msg.data()).as_str(), msg.addr());

    if let Err(e) = self.platform.send(dgram, param) {
      log::warn!("sending {} failed: {:?}", msg.data().id.0, e);
    }

    self.remember_con(dgram, msg.data(), param).ok();

    if matches!(msg.data().ty, Type::Ack | Type::Reset) {
      self.dedup.respond(msg.addr(), msg.data().id, &bytes);
    }
  }

  /// The type and id of a response to `req`: piggybacked on
  /// an Ack when it is confirmable, a fresh NON otherwise
  fn reply_header(&mut self, req: &Message) -> (Type, Id) {
    match req.ty {
      | Type::Con => (Type::Ack, req.id),
      | _ => (Type::Non, self.ids.next()),
    }
  }

  /// Respond to a request on the application's behalf
  fn reply(&mut self,
           req: &Message,
           addr: SocketAddr,
           code: Code,
           param: &P::Param,
           f: impl FnOnce(&mut Message)) {
    let (ty, id) = self.reply_header(req);
    let mut rep = Message::new(ty, code, id, req.token);
    f(&mut rep);
    self.send(Addrd(rep, addr), param);
  }
}

/// Resets may only be Empty, and Empty messages may only be a header
fn check_empty(msg: &Message) -> Result<(), BuildError> {
  let empty = msg.code == code::EMPTY;
  let bare = msg.token.is_empty() && msg.opts.is_empty() && !msg.has_payload();

  if (msg.ty == Type::Reset && !empty) || (empty && !bare) {
    Err(BuildError::MalformedEmpty)
  } else {
    Ok(())
  }
}

#[cfg(test)]
mod tests;
