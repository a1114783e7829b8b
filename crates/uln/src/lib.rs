//! The ultra light node: the pluggable message library behind the trellis
//! router.
//!
//! Outbound, it quotes and settles fees, notifies the attestation provider,
//! and emits the canonical packet. Inbound, it gates delivery behind the
//! configured relayer, an attested block header with enough confirmations,
//! a verified inclusion proof, and strict nonce ordering, then hands the
//! payload to the router.
#![warn(missing_debug_implementations, missing_docs, unreachable_pub, rustdoc::all)]
#![deny(unused_must_use, rust_2018_idioms)]
#![cfg_attr(docsrs, feature(doc_cfg, doc_auto_cfg))]
#![cfg_attr(not(test), no_std)]

extern crate alloc;

mod errors;
pub use errors::{
    AttestationError, ConfigError, ConfigResult, DeliverError, SendError, SendResult,
    ValidateError, ValidateResult, WithdrawError,
};

mod traits;
pub use traits::{
    DeliveryOutcome, FeeToken, FeeTreasury, MessageLibrary, MessageRouter, NativeVault,
    OracleProvider, ProviderError, RelayerProvider, SendContext, TransferError,
};

mod node;
pub use node::{BlockHeaderRecord, UltraLightNode};

mod send;
mod validate;

#[cfg(any(test, feature = "test-utils"))]
pub mod test_utils;
