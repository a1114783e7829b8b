//! Errors for the `trellis-fee` crate.

use alloy_primitives::U256;
use thiserror::Error;
use trellis_primitives::{AdapterParamsError, ChainId, ProofType};

/// A [Result] type alias where the error is [FeeError].
pub type FeeResult<T> = Result<T, FeeError>;

/// An error produced while quoting fees.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FeeError {
    /// The adapter parameter blob failed to decode.
    #[error(transparent)]
    Params(#[from] AdapterParamsError),
    /// The total destination gas (base + extra) is zero.
    #[error("destination gas too low")]
    GasTooLow,
    /// The requested airdrop exceeds the destination chain's cap.
    #[error("airdrop amount {amount} exceeds cap {cap}")]
    AirdropCapExceeded {
        /// The requested airdrop amount.
        amount: U256,
        /// The configured per-chain cap.
        cap: U256,
    },
    /// The (chain, proof type) route is not offered at all — distinct from
    /// an offered route whose price is simply unset (which quotes zero).
    #[error("no attestation route offered for chain {chain}, proof type {proof_type}")]
    UnsupportedRoute {
        /// The destination chain queried.
        chain: ChainId,
        /// The outbound proof type queried.
        proof_type: ProofType,
    },
    /// Fee-token payment was requested while globally disabled.
    #[error("fee token payment is disabled")]
    FeeTokenDisabled,
}
