//! Traits at the seams of the message library: the router above it, the
//! external providers beside it, and the ledgers value moves through.
//!
//! Every external value transfer is a `Result`-returning operation; the
//! library never assumes a transfer succeeded.

use crate::errors::{ConfigError, DeliverError, SendError};
use alloc::string::String;
use alloy_primitives::{Address, Bytes, U256};
use thiserror::Error;
use trellis_fee::FeeResult;
use trellis_primitives::{
    AdapterParams, AppConfig, ChainId, ConfigUpdate, Nonce, Packet, ProofType,
};

/// The request context of a send: who called, who originated the
/// transaction, and the native value attached.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SendContext {
    /// Immediate caller (the sending application).
    pub sender: Address,
    /// Ultimate originator of the transaction.
    pub origin: Address,
    /// Native value attached to the call.
    pub value: U256,
}

impl SendContext {
    /// Context for a self-originated call with the given attached value.
    pub const fn with_value(sender: Address, value: U256) -> Self {
        Self { sender, origin: sender, value }
    }
}

/// How the router disposed of a delivered payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeliveryOutcome {
    /// The application callback completed; the inbound nonce advanced.
    Delivered,
    /// The callback failed; the payload is stored for retry and the nonce
    /// did not advance.
    Stored,
}

/// The router surface the library depends on: nonce reads and delivery
/// hand-off.
pub trait MessageRouter: Send + Sync {
    /// The last inbound nonce consumed for a channel.
    fn inbound_nonce(&self, src_chain: ChainId, src_address: &[u8]) -> Nonce;

    /// Hands a verified payload to the destination application.
    ///
    /// `library` is the identity of the calling message library; the
    /// router rejects libraries the application has not selected.
    #[allow(clippy::too_many_arguments)]
    fn deliver(
        &self,
        library: Address,
        src_chain: ChainId,
        src_address: &[u8],
        dst_address: Address,
        nonce: Nonce,
        gas_limit: u64,
        payload: &[u8],
    ) -> Result<DeliveryOutcome, DeliverError>;
}

/// A versioned message library, as the router dispatches to it.
pub trait MessageLibrary: core::fmt::Debug + Send + Sync {
    /// Stable identity of this library version.
    fn address(&self) -> Address;

    /// Sends a message: quotes and settles fees, notifies the attestation
    /// provider, and returns the emitted packet.
    #[allow(clippy::too_many_arguments)]
    fn send(
        &self,
        ctx: &SendContext,
        application: Address,
        nonce: Nonce,
        dst_chain: ChainId,
        dst_address: &[u8],
        payload: Bytes,
        refund_address: Address,
        fee_payment_address: Address,
        adapter_params: &[u8],
    ) -> Result<Packet, SendError>;

    /// Quotes the (native, fee-token) cost a send with these inputs would
    /// settle for.
    fn estimate_fees(
        &self,
        application: Address,
        dst_chain: ChainId,
        payload_len: usize,
        pay_in_fee_token: bool,
        adapter_params: &[u8],
    ) -> Result<(U256, U256), SendError>;

    /// Applies a single-field configuration update for an application.
    fn set_app_config(
        &self,
        application: Address,
        chain: ChainId,
        update: ConfigUpdate,
    ) -> Result<(), ConfigError>;

    /// Resolves an application's effective configuration for a chain.
    fn app_config(&self, chain: ChainId, application: Address) -> Result<AppConfig, ConfigError>;
}

/// An attestation ("oracle") provider: notified on send, priced on quote.
pub trait OracleProvider: core::fmt::Debug + Send + Sync {
    /// Asks the provider to attest the next outbound block for a route
    /// once it has the requested confirmations. Best-effort from the
    /// protocol's perspective.
    fn notify(
        &self,
        dst_chain: ChainId,
        proof_type: ProofType,
        confirmations: u64,
    ) -> Result<(), ProviderError>;

    /// Quotes the attestation price for a route.
    fn price(&self, dst_chain: ChainId, proof_type: ProofType) -> FeeResult<U256>;
}

/// A relaying provider's quote surface.
pub trait RelayerProvider: core::fmt::Debug + Send + Sync {
    /// Quotes the relaying price for one message.
    fn price(
        &self,
        dst_chain: ChainId,
        proof_type: ProofType,
        application: Address,
        payload_len: usize,
        params: &AdapterParams,
    ) -> FeeResult<U256>;
}

/// The protocol treasury's surcharge policy.
pub trait FeeTreasury: core::fmt::Debug + Send + Sync {
    /// Computes the protocol cut on top of the quoted provider fees.
    fn surcharge(
        &self,
        pay_in_fee_token: bool,
        relaying_fee: U256,
        attestation_fee: U256,
    ) -> FeeResult<U256>;
}

/// The alternate settlement asset applications may pay fees in.
pub trait FeeToken: core::fmt::Debug + Send + Sync {
    /// Moves pre-approved tokens between accounts.
    fn transfer_from(&self, from: Address, to: Address, amount: U256)
        -> Result<(), TransferError>;
}

/// The native-currency ledger refunds and withdrawals move through.
pub trait NativeVault: core::fmt::Debug + Send + Sync {
    /// Transfers native currency out of the library's custody.
    fn transfer(&self, to: Address, amount: U256) -> Result<(), TransferError>;
}

/// A failed external value transfer.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TransferError {
    /// The recipient refused the transfer.
    #[error("transfer rejected by recipient")]
    Rejected,
    /// The paying account lacks funds.
    #[error("insufficient funds")]
    InsufficientFunds,
    /// The paying account has not approved enough allowance.
    #[error("insufficient allowance")]
    InsufficientAllowance,
}

/// A failed best-effort provider call.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("provider call failed: {0}")]
pub struct ProviderError(pub String);

impl RelayerProvider for trellis_fee::RelayerFeeTable {
    fn price(
        &self,
        dst_chain: ChainId,
        proof_type: ProofType,
        application: Address,
        payload_len: usize,
        params: &AdapterParams,
    ) -> FeeResult<U256> {
        Self::price(self, dst_chain, proof_type, application, payload_len, params)
    }
}

impl FeeTreasury for trellis_fee::Treasury {
    fn surcharge(
        &self,
        pay_in_fee_token: bool,
        relaying_fee: U256,
        attestation_fee: U256,
    ) -> FeeResult<U256> {
        Self::surcharge(self, pay_in_fee_token, relaying_fee, attestation_fee)
    }
}
