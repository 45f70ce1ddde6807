use core::fmt::{Display, Formatter};

use crate::{code, Code, CodeKind, Message, Type, Version};

/// The only CoAP version there is
pub const SUPPORTED_VERSION: Version = Version(1);

/// Why a message's header is not acceptable
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum InvalidHeader {
  /// The message's version is not the one we support
  UnsupportedVersion(Version),
  /// The code's class is one of the reserved classes 1, 6 or 7
  ReservedClass(u8),
  /// The code is not a method or response code we know
  UnknownCode(Code),
  /// An Acknowledgement or Reset carried a request method
  #[allow(missing_docs)]
  IllegalCodeForType { ty: Type, code: Code },
}

impl InvalidHeader {
  /// Should the sender of a message with this header be sent a Reset?
  ///
  /// Only messages using a reserved code class are actively rejected;
  /// everything else is silently dropped.
  pub fn should_reset(&self) -> bool {
    matches!(self, Self::ReservedClass(_))
  }
}

impl Display for InvalidHeader {
  fn fmt(&self, f: &mut Formatter<'_>) -> core::fmt::Result {
    match self {
      | Self::UnsupportedVersion(v) => write!(f, "unsupported version {}", v.0),
      | Self::ReservedClass(c) => write!(f, "code class {} is reserved", c),
      | Self::UnknownCode(c) => write!(f, "unknown code {}", c),
      | Self::IllegalCodeForType { ty, code } => write!(f, "{:?} may not carry {}", ty, code),
    }
  }
}

/// Check that a message's version, code and type are legal together.
///
/// ```
/// use newt_msg::*;
///
/// let ack_get = Message::new(Type::Ack, code::GET, Id(1), Token::default());
/// assert_eq!(validate(&ack_get, Version(1)),
///            Err(InvalidHeader::IllegalCodeForType { ty: Type::Ack,
///                                                    code: code::GET }));
///
/// let ack_content = Message::new(Type::Ack, code::CONTENT, Id(1), Token::default());
/// assert_eq!(validate(&ack_content, Version(1)), Ok(()));
/// ```
pub fn validate(msg: &Message, supported: Version) -> Result<(), InvalidHeader> {
  if msg.ver != supported {
    return Err(InvalidHeader::UnsupportedVersion(msg.ver));
  }

  if msg.code.is_reserved_class() {
    return Err(InvalidHeader::ReservedClass(msg.code.class));
  }

  if !code::KNOWN.contains(&msg.code) {
    return Err(InvalidHeader::UnknownCode(msg.code));
  }

  match (msg.ty, msg.code.kind()) {
    | (Type::Ack | Type::Reset, CodeKind::Request) => {
      Err(InvalidHeader::IllegalCodeForType { ty: msg.ty,
                                              code: msg.code })
    },
    | _ => Ok(()),
  }
}
