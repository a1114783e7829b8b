//! Errors for the `trellis-proof` crate.

use alloy_primitives::B256;
use thiserror::Error;
use trellis_primitives::PacketDecodeError;

/// A [Result] type alias where the error is [TrieWalkError].
pub type TrieWalkResult<T> = Result<T, TrieWalkError>;

/// An error walking a Merkle-Patricia path over supplied node preimages.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TrieWalkError {
    /// A referenced trie node preimage was not supplied with the proof.
    #[error("missing trie node preimage: {0}")]
    MissingNode(B256),
    /// Failed to RLP-decode a trie node.
    #[error("failed to decode trie node: {0}")]
    RlpError(alloy_rlp::Error),
    /// A node element was not of a shape the walk can follow.
    #[error("invalid trie node element encountered")]
    InvalidNode,
    /// The key does not exist under the claimed root.
    #[error("key does not exist in trie")]
    KeyNotFound,
}

/// A [Result] type alias where the error is [ProofError].
pub type ProofResult<T> = Result<T, ProofError>;

/// An error verifying a packet inclusion proof.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ProofError {
    /// The proof envelope itself failed to decode.
    #[error("malformed proof envelope: {0}")]
    MalformedProof(alloy_rlp::Error),
    /// Walking the receipt trie failed.
    #[error("trie walk failed: {0}")]
    TrieWalk(#[from] TrieWalkError),
    /// The proven trie value is not a decodable receipt envelope.
    #[error("failed to decode proven receipt")]
    ReceiptDecode,
    /// The proven receipt does not carry the claimed log.
    #[error("log index {index} out of range: receipt has {count} logs")]
    LogOutOfRange {
        /// The claimed log index.
        index: u64,
        /// The number of logs in the proven receipt.
        count: usize,
    },
    /// The proven log was emitted by an address other than the registered
    /// remote library.
    #[error("log emitted by an untrusted address")]
    UntrustedEmitter,
    /// The proven log is not an outbound-packet event.
    #[error("log topic is not the packet topic")]
    UnexpectedTopic,
    /// The packet carried by the event failed to decode.
    #[error(transparent)]
    Packet(#[from] PacketDecodeError),
}
