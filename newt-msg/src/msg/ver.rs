/// The 2-bit version field at the top of the first header byte.
///
/// RFC7252 defines version 1 only. Messages claiming any other version
/// parse fine but fail [`validate`](crate::validate()).
#[derive(Copy, Clone, Hash, PartialEq, Eq, PartialOrd, Ord, Debug)]
pub struct Version(pub u8);

impl Default for Version {
  fn default() -> Self {
    crate::SUPPORTED_VERSION
  }
}
