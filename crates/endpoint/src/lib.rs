//! The trellis router: the per-chain endpoint applications talk to.
//!
//! The endpoint owns the versioned registry of message-library
//! implementations, routes each application's send and receive traffic to
//! its selected version, sequences nonces, and holds the blocked-payload
//! queue that gives failed deliveries a durable retry path.
#![warn(missing_debug_implementations, missing_docs, unreachable_pub, rustdoc::all)]
#![deny(unused_must_use, rust_2018_idioms)]
#![cfg_attr(docsrs, feature(doc_cfg, doc_auto_cfg))]
#![cfg_attr(not(test), no_std)]

extern crate alloc;

mod errors;
pub use errors::{
    RegistryError, ResumeError, RetryError, RouteError, RouterSendError, SetConfigError,
    VersionError,
};

mod traits;
pub use traits::{Clock, InboundMessage, MessageReceiver, ReceiveError};

mod endpoint;
pub use endpoint::Endpoint;

mod deliver;
pub use deliver::StoredPayload;

#[cfg(any(test, feature = "test-utils"))]
pub mod test_utils;
