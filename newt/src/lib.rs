//! A CoAP protocol engine.
//!
//! `newt` sits between a datagram transport and an application, and handles
//! the parts of [RFC7252](https://datatracker.ietf.org/doc/html/rfc7252) and
//! [RFC7959](https://datatracker.ietf.org/doc/html/rfc7959) that are about
//! messages rather than resources:
//!  - confirmable messages are retransmitted with randomized exponential backoff until acknowledged
//!  - duplicate messages are detected and answered with the answer given the first time
//!  - pings are answered, and messages with illegal headers rejected
//!  - large payloads are sent and received block-wise
//!
//! `newt` does no I/O of its own and never blocks. The application feeds
//! datagrams it receives to [`engine::Engine::parse`], serializes what it
//! wants to send with [`engine::Engine::build`], and calls
//! [`engine::Engine::exec`] periodically with the current time.
//! Whatever the engine needs to send by itself goes through the
//! [`platform::Platform`] it was created with.
//!
//! Message types live in [`newt_msg`].

#![doc(html_root_url = "https://docs.rs/newt/0.1.0")]
#![cfg_attr(not(feature = "std"), no_std)]
#![cfg_attr(not(test), forbid(missing_debug_implementations, unreachable_pub))]
#![cfg_attr(not(test), deny(unsafe_code, missing_copy_implementations))]
#![cfg_attr(any(docsrs, feature = "docs"), feature(doc_cfg))]
#![deny(missing_docs)]

extern crate alloc as std_alloc;

/// Tuning parameters
pub mod config;

/// The protocol engine
pub mod engine;

pub(crate) mod logging;

/// Network primitives
pub mod net;

/// The engine's view of the outside world
pub mod platform;

/// Non-blocking exponential backoff
pub mod retry;

/// Timestamps
pub mod time;
