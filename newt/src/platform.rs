use core::fmt::Debug;

use newt_msg::Message;

use crate::net::Addrd;

/// The seam between the protocol engine and the world around it.
///
/// The engine never touches sockets itself; whenever it needs to put a
/// datagram on the wire of its own accord (retransmissions, resets,
/// block-wise continuations, cached responses to duplicates) it asks
/// the platform to do it.
///
/// ```
/// use newt::net::Addrd;
/// use newt::platform::Platform;
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
/// ```
pub trait Platform {
  /// Opaque context the caller hands to [`Engine::build`](crate::engine::Engine::build)
  /// and [`Engine::parse`](crate::engine::Engine::parse), handed back on every
  /// transmission made on that exchange's behalf
  type Param: Clone;

  /// The error yielded when sending fails
  type Error: Debug;

  /// Send a datagram to a remote address
  fn send(&mut self, dgram: Addrd<&[u8]>, param: &Self::Param) -> Result<(), Self::Error>;

  /// A confirmable message was retransmitted as many times as allowed
  /// and never acknowledged.
  ///
  /// `msg` has [`Status::SendingFailed`](newt_msg::Status::SendingFailed).
  /// Does nothing by default.
  fn send_failed(&mut self, msg: Addrd<Message>, param: Self::Param) {
    let _ = (msg, param);
  }
}
