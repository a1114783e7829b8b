//! Errors for the `trellis-uln` crate.

use crate::traits::TransferError;
use alloy_primitives::{Address, B256, U256};
use thiserror::Error;
use trellis_fee::FeeError;
use trellis_primitives::{ChainId, Nonce};
use trellis_proof::ProofError;

/// A [Result] type alias where the error is [SendError].
pub type SendResult<T> = Result<T, SendError>;

/// An error aborting an outbound send. Nothing is settled on failure.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SendError {
    /// A send was started while another send is outstanding.
    #[error("reentrant send")]
    SendReentrancy,
    /// The destination chain has no registered remote library counterpart.
    #[error("unknown destination chain {0}")]
    UnknownChain(ChainId),
    /// The destination address does not match the chain's address width.
    #[error("invalid destination address: {actual} bytes, chain uses {expected}")]
    InvalidDestination {
        /// Address width configured for the destination chain.
        expected: usize,
        /// Width of the address supplied.
        actual: usize,
    },
    /// Application configuration failed to resolve.
    #[error(transparent)]
    Config(#[from] ConfigError),
    /// Fee quotation failed.
    #[error(transparent)]
    Fee(#[from] FeeError),
    /// The configured relayer or oracle has no registered provider handle.
    #[error("no provider registered for {0}")]
    UnknownProvider(Address),
    /// The fee-token payer is neither the caller nor the originator.
    #[error("invalid fee payer {0}")]
    InvalidFeePayer(Address),
    /// Pulling the fee-token payment failed.
    #[error("fee token payment failed: {0}")]
    FeeTokenPayment(TransferError),
    /// The attached native value does not cover the quoted fees.
    #[error("insufficient native payment: required {required}, provided {provided}")]
    InsufficientNativePayment {
        /// Total quoted fee.
        required: U256,
        /// Native value attached to the call.
        provided: U256,
    },
    /// Refunding excess native value failed; the send is aborted rather
    /// than silently keeping the surplus.
    #[error("refund failed: {0}")]
    RefundFailed(TransferError),
}

/// A [Result] type alias where the error is [ValidateError].
pub type ValidateResult<T> = Result<T, ValidateError>;

/// An error aborting inbound proof validation. The relaying provider is
/// expected to retry later with a better proof or more confirmations.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidateError {
    /// Application configuration failed to resolve.
    #[error(transparent)]
    Config(#[from] ConfigError),
    /// The caller is not the application's configured relayer.
    #[error("invalid relayer {0}")]
    InvalidRelayer(Address),
    /// No block header record exists for the claimed block.
    #[error("no attestation for block {0}")]
    NoAttestation(B256),
    /// The attested block has fewer confirmations than the application
    /// requires.
    #[error("insufficient confirmations: have {have}, need {need}")]
    InsufficientConfirmations {
        /// Confirmations on the header record.
        have: u64,
        /// The application's inbound threshold.
        need: u64,
    },
    /// The source chain has no address size / remote library registered.
    #[error("unknown source chain {0}")]
    UnknownChain(ChainId),
    /// The configured inbound proof library version is not registered.
    #[error("invalid inbound proof library version {0}")]
    InvalidProofLibrary(u16),
    /// Cryptographic proof verification failed.
    #[error(transparent)]
    Proof(#[from] ProofError),
    /// The proven packet names a different source chain.
    #[error("packet source chain {got} does not match {expected}")]
    SourceChainMismatch {
        /// The chain the proof was submitted for.
        expected: ChainId,
        /// The chain in the packet.
        got: ChainId,
    },
    /// The proven packet is addressed to a different chain.
    #[error("packet destination chain {got} does not match local chain {expected}")]
    DestinationChainMismatch {
        /// The local chain.
        expected: ChainId,
        /// The chain in the packet.
        got: ChainId,
    },
    /// The packet's source address width or value is wrong for the chain.
    #[error("invalid source address")]
    InvalidSourceAddress,
    /// The proven packet is addressed to a different application.
    #[error("packet destination does not match claimed application")]
    DestinationMismatch,
    /// The packet's nonce is not the next inbound nonce for the channel.
    #[error("wrong nonce: expected {expected}, got {got}")]
    WrongNonce {
        /// The next deliverable nonce.
        expected: Nonce,
        /// The nonce carried by the proof.
        got: Nonce,
    },
    /// The router refused delivery.
    #[error(transparent)]
    Deliver(#[from] DeliverError),
}

/// A [Result] type alias where the error is [ConfigError].
pub type ConfigResult<T> = Result<T, ConfigError>;

/// An error mutating or resolving configuration.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    /// The caller is not the owner.
    #[error("caller is not the owner")]
    Unauthorized,
    /// No default configuration exists for the chain.
    #[error("chain {0} is not configured")]
    NotConfigured(ChainId),
    /// The inbound proof library version exceeds the registered maximum.
    #[error("invalid inbound proof library version {0}")]
    InvalidProofLibraryVersion(u16),
    /// The inbound proof library registry for the chain is full.
    #[error("inbound proof library limit reached for chain {0}")]
    ProofLibraryLimitReached(ChainId),
    /// The outbound proof type is not enabled for the chain.
    #[error("invalid outbound proof type {0}")]
    InvalidProofType(u16),
    /// A confirmation threshold of zero was supplied for a default.
    #[error("invalid block confirmations")]
    InvalidConfirmations,
    /// A required address field is zero or empty.
    #[error("invalid {0} address")]
    InvalidAddress(&'static str),
    /// The chain's address size is already set and is immutable.
    #[error("address size already set for chain {0}")]
    AddressSizeAlreadySet(ChainId),
}

/// An error recording an attested block header.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AttestationError {
    /// The record may only be overwritten with equal or more
    /// confirmations by the same provider.
    #[error("stale confirmations: stored {stored}, submitted {submitted}")]
    StaleConfirmations {
        /// Confirmations already on record.
        stored: u64,
        /// Confirmations in the rejected write.
        submitted: u64,
    },
}

/// An error withdrawing accrued fees.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum WithdrawError {
    /// The requested amount exceeds the caller's accrued balance. There
    /// are no partial withdrawals.
    #[error("insufficient balance: have {balance}, requested {requested}")]
    InsufficientBalance {
        /// The caller's accrued balance.
        balance: U256,
        /// The amount requested.
        requested: U256,
    },
    /// No fee token is wired.
    #[error("fee token payment is disabled")]
    FeeTokenDisabled,
    /// The outbound transfer was refused; the balance is left untouched.
    #[error("withdraw transfer failed: {0}")]
    WithdrawFailed(TransferError),
}

/// An error refusing router delivery.
///
/// Produced by the [MessageRouter](crate::MessageRouter) implementation;
/// distinct from a failing application callback, which is absorbed into a
/// stored payload instead.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DeliverError {
    /// The calling library is not the application's receive library.
    #[error("caller is not the receive library for {0}")]
    InvalidLibrary(Address),
    /// The application's resolved receive version is the blocked sentinel.
    #[error("receive version is blocked")]
    BlockedVersion,
    /// The application's resolved receive version is not registered.
    #[error("invalid receive version")]
    InvalidVersion,
    /// The destination application is not registered with the router.
    #[error("unknown application {0}")]
    UnknownApplication(Address),
    /// A blocked payload already occupies the channel.
    #[error("message blocking: channel has a stored payload")]
    MessageBlocked,
    /// A delivery to this application is already in progress.
    #[error("reentrant receive for {0}")]
    ReceiveReentrancy(Address),
    /// The nonce is not the next inbound nonce for the channel.
    #[error("wrong nonce: expected {expected}, got {got}")]
    WrongNonce {
        /// The next deliverable nonce.
        expected: Nonce,
        /// The delivered nonce.
        got: Nonce,
    },
}
