//! Inclusion-proof verification for trellis packets.
//!
//! A relaying provider proves that an outbound-packet event is contained in
//! an attested source block by supplying the Merkle-Patricia path from the
//! block's receipts root down to the receipt holding the event. This crate
//! walks that path over the supplied node preimages, decodes the receipt,
//! and extracts the packet from the proven log.
#![warn(missing_debug_implementations, missing_docs, unreachable_pub, rustdoc::all)]
#![deny(unused_must_use, rust_2018_idioms)]
#![cfg_attr(docsrs, feature(doc_cfg, doc_auto_cfg))]
#![cfg_attr(not(test), no_std)]

extern crate alloc;

mod errors;
pub use errors::{ProofError, ProofResult, TrieWalkError, TrieWalkResult};

mod node;
pub use node::{NodeElement, TrieNode};

mod walker;
pub use walker::ProofNodeMap;

mod receipt;
pub use receipt::{ProofContext, ProofValidator, ReceiptInclusionProof, ReceiptProofValidator};

#[cfg(any(test, feature = "test-utils"))]
pub mod fixtures;
