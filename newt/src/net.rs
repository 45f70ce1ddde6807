use no_std_net::SocketAddr;
use std_alloc::vec::Vec;

/// A value paired with the address of the peer it came from or is headed to
///
/// ```
/// use newt::net::Addrd;
/// use no_std_net::{Ipv4Addr, SocketAddr, SocketAddrV4};
///
/// let addr = SocketAddr::V4(SocketAddrV4::new(Ipv4Addr::LOCALHOST, 5683));
/// let dgram = Addrd(vec![1u8, 2, 3], addr);
///
/// assert_eq!(dgram.as_ref().map(|bytes| bytes.len()), Addrd(3, addr));
/// assert_eq!(dgram.as_bytes(), Addrd(&[1u8, 2, 3][..], addr));
/// ```
#[derive(PartialEq, PartialOrd, Eq, Ord, Hash, Debug, Clone, Copy)]
pub struct Addrd<T>(pub T, pub SocketAddr);

impl<T> Addrd<T> {
  /// Borrow the value, keeping the address
  pub fn as_ref(&self) -> Addrd<&T> {
    Addrd(self.data(), self.addr())
  }

  /// Transform the value, keeping the address
  pub fn map<R>(self, f: impl FnOnce(T) -> R) -> Addrd<R> {
    Addrd(f(self.0), self.1)
  }

  /// The value
  pub fn data(&self) -> &T {
    &self.0
  }

  /// The value, mutably
  pub fn data_mut(&mut self) -> &mut T {
    &mut self.0
  }

  /// The peer's address
  pub fn addr(&self) -> SocketAddr {
    self.1
  }
}

impl Addrd<Vec<u8>> {
  /// Borrow an owned datagram as the slice [`Platform::send`](crate::platform::Platform::send) takes
  pub fn as_bytes(&self) -> Addrd<&[u8]> {
    Addrd(self.0.as_slice(), self.1)
  }
}
