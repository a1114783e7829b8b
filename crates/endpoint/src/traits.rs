//! Traits at the router's outer seam: the receiving application and the
//! host clock.

use alloc::string::String;
use thiserror::Error;
use trellis_primitives::{ChainId, Nonce};

/// A delivered cross-chain message, as handed to the receiving
/// application.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InboundMessage<'a> {
    /// Chain the message came from.
    pub src_chain: ChainId,
    /// Sending application, in the source chain's address width.
    pub src_address: &'a [u8],
    /// The channel nonce being consumed by this delivery.
    pub nonce: Nonce,
    /// The application payload.
    pub payload: &'a [u8],
    /// Execution budget the relayer paid for on this delivery.
    pub gas_limit: u64,
}

/// A failure raised by the receiving application's callback.
///
/// Not a protocol error: the router absorbs it into a stored payload.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{0}")]
pub struct ReceiveError(pub String);

/// The receiving side of a user application.
pub trait MessageReceiver: core::fmt::Debug + Send + Sync {
    /// Handles one delivered message. Any error is caught by the router
    /// and converted into a blocked payload rather than propagated.
    fn on_message_received(&self, message: InboundMessage<'_>) -> Result<(), ReceiveError>;
}

/// The host's wall clock, used to timestamp stored payloads.
pub trait Clock: core::fmt::Debug + Send + Sync {
    /// Seconds since the Unix epoch.
    fn unix_timestamp(&self) -> u64;
}
