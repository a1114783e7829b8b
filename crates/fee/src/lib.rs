//! Pricing models for the trellis messaging protocol: what the relaying
//! service charges to deliver a message, what the attestation service
//! charges to attest a block, and the protocol surcharge on top.
//!
//! These are quote-side tables only; settlement (balance accrual and
//! withdrawal) lives with the message library.
#![warn(missing_debug_implementations, missing_docs, unreachable_pub, rustdoc::all)]
#![deny(unused_must_use, rust_2018_idioms)]
#![cfg_attr(docsrs, feature(doc_cfg, doc_auto_cfg))]
#![cfg_attr(not(test), no_std)]

mod errors;
pub use errors::{FeeError, FeeResult};

mod relayer;
pub use relayer::{DstConfig, DstPrice, RelayerFeeTable, PRICE_RATIO_DENOMINATOR};

mod oracle;
pub use oracle::OracleFeeTable;

mod treasury;
pub use treasury::{Treasury, BP_DENOMINATOR};
