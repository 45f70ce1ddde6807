//! Low-level representation of CoAP messages.
//!
//! The most notable item in `newt_msg` is [`Message`];
//! a CoAP message very close to the actual byte layout,
//! plus the out-of-band [`Status`] a protocol engine attaches
//! after processing it.
//!
//! `newt_msg` is deliberately **strict**:
//!  - every variable-length field is checked against the bounds of the input buffer
//!  - only the options listed in [`known`] are accepted, each with a legal length range
//!  - non-repeatable options may only appear once
//!
//! ## Parsing
//! ```
//! use newt_msg::*;
//!
//! //             ver=1 ACK tkl=0  2.04      id=0x1234
//! let bytes = [0b01_10_0000u8, 0x44, 0x12, 0x34];
//! let msg = Message::try_from_bytes(&bytes).unwrap();
//!
//! assert_eq!(msg.ty, Type::Ack);
//! assert_eq!(msg.code, Code::new(2, 4));
//! assert_eq!(msg.id, Id(0x1234));
//! ```
//!
//! ## Serializing
//! ```
//! use newt_msg::*;
//!
//! let mut msg = Message::new(Type::Con, code::GET, Id(1), Token::default());
//! msg.opts.set_joined(known::URI_PATH, "sensors/temp").unwrap();
//!
//! let bytes = msg.try_into_bytes().unwrap();
//! assert_eq!(bytes.len(), msg.calc_size());
//! assert_eq!(Message::try_from_bytes(&bytes).unwrap(), msg);
//! ```

#![doc(html_root_url = "https://docs.rs/newt-msg/0.1.0")]
#![cfg_attr(not(feature = "std"), no_std)]
#![cfg_attr(not(test), forbid(missing_debug_implementations, unreachable_pub))]
#![cfg_attr(not(test), deny(unsafe_code, missing_copy_implementations))]
#![cfg_attr(any(docsrs, feature = "docs"), feature(doc_cfg))]
#![deny(missing_docs)]

extern crate alloc as std_alloc;

#[doc(hidden)]
pub mod from_bytes;

/// Message structs
pub mod msg;

#[doc(hidden)]
pub mod to_bytes;

/// Header validity checks
pub mod validate;

#[doc(inline)]
pub use from_bytes::TryFromBytes;
#[doc(inline)]
pub use msg::*;
#[doc(inline)]
pub use to_bytes::{MessageToBytesError, TryIntoBytes};
#[doc(inline)]
pub use validate::{validate, InvalidHeader, SUPPORTED_VERSION};

#[cfg(test)]
pub(crate) fn test_msg() -> (Message, Vec<u8>) {
  let header: [u8; 4] = 0b0100_0001_0100_0101_0000_0000_0000_0001_u32.to_be_bytes();
  let token: [u8; 1] = [254u8];
  let content_format: &[u8] = &[0, 50];
  let options: [&[u8]; 2] = [&[0b_1100_0010u8], content_format];
  let payload: [&[u8]; 2] = [&[0b1111_1111_u8], b"hello, world!"];
  let bytes = [header.as_ref(),
               token.as_ref(),
               options.concat().as_ref(),
               payload.concat().as_ref()].concat();

  let mut msg = Message::new(Type::Con,
                             Code { class: 2,
                                    detail: 5 },
                             Id(1),
                             Token(tinyvec::array_vec!([u8; 8] => 254)));
  msg.opts.insert(known::CONTENT_FORMAT, OptValue(content_format.to_vec()));
  msg.payload = Payload(b"hello, world!".to_vec());

  (msg, bytes)
}
