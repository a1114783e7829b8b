//! Core types shared across the trellis cross-chain messaging protocol:
//! packet wire codec, adapter (transaction) parameters, library version
//! selection, and per-application configuration records.
#![warn(missing_debug_implementations, missing_docs, unreachable_pub, rustdoc::all)]
#![deny(unused_must_use, rust_2018_idioms)]
#![cfg_attr(docsrs, feature(doc_cfg, doc_auto_cfg))]
#![cfg_attr(not(test), no_std)]

extern crate alloc;

mod packet;
pub use packet::{packet_topic, Packet, PacketDecodeError};

mod params;
pub use params::{AdapterParams, AdapterParamsError};

mod version;
pub use version::{VersionSelector, BLOCKED_VERSION, DEFAULT_VERSION};

mod config;
pub use config::{AppConfig, AppConfigOverrides, ConfigUpdate};

/// Identifier of a remote chain from the perspective of the local
/// deployment. Zero is reserved and never names a valid chain.
pub type ChainId = u16;

/// A per-channel, strictly increasing message sequence number.
pub type Nonce = u64;

/// An outbound proof type offered for a destination chain.
pub type ProofType = u16;
