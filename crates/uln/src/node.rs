//! The ultra light node's state and administration surface.

use crate::{
    errors::{AttestationError, ConfigError, ConfigResult, SendError, WithdrawError},
    traits::{
        FeeToken, FeeTreasury, MessageLibrary, NativeVault, OracleProvider, RelayerProvider,
        SendContext,
    },
};
use alloc::{sync::Arc, vec::Vec};
use alloy_primitives::{Address, Bytes, B256, U256};
use core::sync::atomic::AtomicBool;
use hashbrown::{HashMap, HashSet};
use spin::RwLock;
use trellis_primitives::{
    AppConfig, AppConfigOverrides, ChainId, ConfigUpdate, Nonce, Packet, ProofType,
};
use trellis_proof::ProofValidator;

/// An attested source-chain block header, as recorded by an attestation
/// provider.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BlockHeaderRecord {
    /// Confirmations the provider claims the block has.
    pub confirmations: u64,
    /// Opaque attested data, e.g. the block's receipts root.
    pub data: B256,
}

/// The ultra light node message library.
///
/// All state is behind interior locks so the library can sit behind a
/// shared handle; execution is single-threaded per call, and no lock is
/// held across a call into external code.
#[derive(Debug)]
pub struct UltraLightNode {
    /// Stable identity of this library deployment.
    address: Address,
    /// The chain this deployment lives on.
    local_chain: ChainId,
    /// Administrative owner.
    owner: Address,
    /// Native-currency ledger for refunds and withdrawals.
    pub(crate) native: Arc<dyn NativeVault>,
    /// Per-chain default application configuration.
    defaults: RwLock<HashMap<ChainId, AppConfig>>,
    /// Per-(chain, application) explicit overrides.
    overrides: RwLock<HashMap<(ChainId, Address), AppConfigOverrides>>,
    /// Append-only, 1-indexed inbound proof libraries per source chain.
    proof_libraries: RwLock<HashMap<ChainId, Vec<Arc<dyn ProofValidator>>>>,
    /// Outbound proof types enabled per destination chain.
    outbound_proof_types: RwLock<HashSet<(ChainId, ProofType)>>,
    /// Address width per remote chain, immutable once set.
    address_sizes: RwLock<HashMap<ChainId, usize>>,
    /// Byte identity of the remote library per chain.
    remote_libraries: RwLock<HashMap<ChainId, Bytes>>,
    /// Default adapter params per (destination chain, proof type).
    default_adapter_params: RwLock<HashMap<(ChainId, ProofType), Bytes>>,
    /// Attested headers keyed by (provider, source chain, block hash).
    block_headers: RwLock<HashMap<(Address, ChainId, B256), BlockHeaderRecord>>,
    /// Registered relaying provider handles.
    relayers: RwLock<HashMap<Address, Arc<dyn RelayerProvider>>>,
    /// Registered attestation provider handles.
    oracles: RwLock<HashMap<Address, Arc<dyn OracleProvider>>>,
    /// The protocol treasury, once wired.
    pub(crate) treasury: RwLock<Option<(Address, Arc<dyn FeeTreasury>)>>,
    /// The fee token, once wired.
    pub(crate) fee_token: RwLock<Option<(Address, Arc<dyn FeeToken>)>>,
    /// Accrued native balances per provider/treasury identity.
    pub(crate) native_balances: RwLock<HashMap<Address, U256>>,
    /// Accrued fee-token balances per provider/treasury identity.
    pub(crate) fee_token_balances: RwLock<HashMap<Address, U256>>,
    /// Library-wide single-flight send flag.
    pub(crate) sending: AtomicBool,
}

impl UltraLightNode {
    /// Creates a new library deployment.
    pub fn new(
        address: Address,
        local_chain: ChainId,
        owner: Address,
        native: Arc<dyn NativeVault>,
    ) -> Self {
        Self {
            address,
            local_chain,
            owner,
            native,
            defaults: RwLock::new(HashMap::new()),
            overrides: RwLock::new(HashMap::new()),
            proof_libraries: RwLock::new(HashMap::new()),
            outbound_proof_types: RwLock::new(HashSet::new()),
            address_sizes: RwLock::new(HashMap::new()),
            remote_libraries: RwLock::new(HashMap::new()),
            default_adapter_params: RwLock::new(HashMap::new()),
            block_headers: RwLock::new(HashMap::new()),
            relayers: RwLock::new(HashMap::new()),
            oracles: RwLock::new(HashMap::new()),
            treasury: RwLock::new(None),
            fee_token: RwLock::new(None),
            native_balances: RwLock::new(HashMap::new()),
            fee_token_balances: RwLock::new(HashMap::new()),
            sending: AtomicBool::new(false),
        }
    }

    /// Stable identity of this deployment.
    pub const fn library_address(&self) -> Address {
        self.address
    }

    /// The chain this deployment lives on.
    pub const fn local_chain(&self) -> ChainId {
        self.local_chain
    }

    fn ensure_owner(&self, caller: Address) -> ConfigResult<()> {
        if caller != self.owner {
            return Err(ConfigError::Unauthorized);
        }
        Ok(())
    }

    /// Registers the remote library counterpart for a chain.
    pub fn set_remote_library(
        &self,
        caller: Address,
        chain: ChainId,
        library: Bytes,
    ) -> ConfigResult<()> {
        self.ensure_owner(caller)?;
        if library.is_empty() {
            return Err(ConfigError::InvalidAddress("remote library"));
        }
        self.remote_libraries.write().insert(chain, library);
        tracing::info!(target: "uln", chain, "remote library set");
        Ok(())
    }

    /// Sets a chain's address width. Immutable once set.
    pub fn set_chain_address_size(
        &self,
        caller: Address,
        chain: ChainId,
        size: usize,
    ) -> ConfigResult<()> {
        self.ensure_owner(caller)?;
        let mut sizes = self.address_sizes.write();
        if sizes.contains_key(&chain) {
            return Err(ConfigError::AddressSizeAlreadySet(chain));
        }
        sizes.insert(chain, size);
        tracing::info!(target: "uln", chain, size, "chain address size set");
        Ok(())
    }

    /// Appends an inbound proof library for a source chain and returns its
    /// 1-indexed version.
    pub fn add_inbound_proof_library(
        &self,
        caller: Address,
        chain: ChainId,
        validator: Arc<dyn ProofValidator>,
    ) -> ConfigResult<u16> {
        self.ensure_owner(caller)?;
        let mut libraries = self.proof_libraries.write();
        let registry = libraries.entry(chain).or_default();
        if registry.len() >= usize::from(u16::MAX - 1) {
            return Err(ConfigError::ProofLibraryLimitReached(chain));
        }
        registry.push(validator);
        let version = registry.len() as u16;
        tracing::info!(target: "uln", chain, version, "inbound proof library added");
        Ok(version)
    }

    /// Enables an outbound proof type for a destination chain.
    pub fn enable_outbound_proof_type(
        &self,
        caller: Address,
        chain: ChainId,
        proof_type: ProofType,
    ) -> ConfigResult<()> {
        self.ensure_owner(caller)?;
        self.outbound_proof_types.write().insert((chain, proof_type));
        tracing::info!(target: "uln", chain, proof_type, "outbound proof type enabled");
        Ok(())
    }

    /// Sets the default adapter params used when a send supplies none.
    pub fn set_default_adapter_params(
        &self,
        caller: Address,
        chain: ChainId,
        proof_type: ProofType,
        params: Bytes,
    ) -> ConfigResult<()> {
        self.ensure_owner(caller)?;
        self.default_adapter_params.write().insert((chain, proof_type), params);
        Ok(())
    }

    /// Sets a chain's default application configuration. Every field must
    /// be valid and non-zero.
    pub fn set_default_config(
        &self,
        caller: Address,
        chain: ChainId,
        config: AppConfig,
    ) -> ConfigResult<()> {
        self.ensure_owner(caller)?;
        let max_version = self.max_inbound_proof_library(chain);
        if config.inbound_proof_library_version == 0
            || config.inbound_proof_library_version > max_version
        {
            return Err(ConfigError::InvalidProofLibraryVersion(
                config.inbound_proof_library_version,
            ));
        }
        if config.inbound_confirmations == 0 || config.outbound_confirmations == 0 {
            return Err(ConfigError::InvalidConfirmations);
        }
        if config.relayer.is_zero() {
            return Err(ConfigError::InvalidAddress("relayer"));
        }
        if config.oracle.is_zero() {
            return Err(ConfigError::InvalidAddress("oracle"));
        }
        if !self.outbound_proof_types.read().contains(&(chain, config.outbound_proof_type)) {
            return Err(ConfigError::InvalidProofType(config.outbound_proof_type));
        }
        self.defaults.write().insert(chain, config);
        tracing::info!(target: "uln", chain, "default app config set");
        Ok(())
    }

    /// Registers a relaying provider handle under its identity.
    pub fn register_relayer(
        &self,
        caller: Address,
        address: Address,
        provider: Arc<dyn RelayerProvider>,
    ) -> ConfigResult<()> {
        self.ensure_owner(caller)?;
        if address.is_zero() {
            return Err(ConfigError::InvalidAddress("relayer"));
        }
        self.relayers.write().insert(address, provider);
        Ok(())
    }

    /// Registers an attestation provider handle under its identity.
    pub fn register_oracle(
        &self,
        caller: Address,
        address: Address,
        provider: Arc<dyn OracleProvider>,
    ) -> ConfigResult<()> {
        self.ensure_owner(caller)?;
        if address.is_zero() {
            return Err(ConfigError::InvalidAddress("oracle"));
        }
        self.oracles.write().insert(address, provider);
        Ok(())
    }

    /// Wires the protocol treasury.
    pub fn set_treasury(
        &self,
        caller: Address,
        address: Address,
        treasury: Arc<dyn FeeTreasury>,
    ) -> ConfigResult<()> {
        self.ensure_owner(caller)?;
        if address.is_zero() {
            return Err(ConfigError::InvalidAddress("treasury"));
        }
        *self.treasury.write() = Some((address, treasury));
        tracing::info!(target: "uln", %address, "treasury set");
        Ok(())
    }

    /// Wires the fee token.
    pub fn set_fee_token(
        &self,
        caller: Address,
        address: Address,
        token: Arc<dyn FeeToken>,
    ) -> ConfigResult<()> {
        self.ensure_owner(caller)?;
        if address.is_zero() {
            return Err(ConfigError::InvalidAddress("fee token"));
        }
        *self.fee_token.write() = Some((address, token));
        tracing::info!(target: "uln", %address, "fee token set");
        Ok(())
    }

    /// Applies a single-field configuration update for an application.
    ///
    /// Zero/empty values reset the field to the chain default; non-zero
    /// values are validated against the chain's registries.
    pub fn set_app_config(
        &self,
        application: Address,
        chain: ChainId,
        update: ConfigUpdate,
    ) -> ConfigResult<()> {
        if !update.is_reset() {
            match update {
                ConfigUpdate::InboundProofLibraryVersion(v) => {
                    if v > self.max_inbound_proof_library(chain) {
                        return Err(ConfigError::InvalidProofLibraryVersion(v));
                    }
                }
                ConfigUpdate::OutboundProofType(t) => {
                    if !self.outbound_proof_types.read().contains(&(chain, t)) {
                        return Err(ConfigError::InvalidProofType(t));
                    }
                }
                _ => {}
            }
        }
        self.overrides.write().entry((chain, application)).or_default().apply(update);
        tracing::debug!(
            target: "uln",
            %application,
            chain,
            field = update.field(),
            "app config updated"
        );
        Ok(())
    }

    /// Resolves an application's effective configuration for a chain:
    /// explicit overrides over the chain default.
    pub fn app_config(&self, chain: ChainId, application: Address) -> ConfigResult<AppConfig> {
        let defaults = self.defaults.read();
        let default = defaults.get(&chain).ok_or(ConfigError::NotConfigured(chain))?;
        Ok(self
            .overrides
            .read()
            .get(&(chain, application))
            .map_or_else(|| default.clone(), |overrides| overrides.resolve(default)))
    }

    /// The highest registered inbound proof library version for a chain,
    /// zero when none.
    pub fn max_inbound_proof_library(&self, chain: ChainId) -> u16 {
        self.proof_libraries.read().get(&chain).map_or(0, |v| v.len() as u16)
    }

    /// Records an attested block header under the caller's identity.
    ///
    /// A record may only be overwritten by the same provider with equal or
    /// more confirmations for the same block hash.
    pub fn update_block_header(
        &self,
        caller: Address,
        src_chain: ChainId,
        block_hash: B256,
        confirmations: u64,
        data: B256,
    ) -> Result<(), AttestationError> {
        let mut headers = self.block_headers.write();
        let key = (caller, src_chain, block_hash);
        if let Some(existing) = headers.get(&key) {
            if confirmations < existing.confirmations {
                return Err(AttestationError::StaleConfirmations {
                    stored: existing.confirmations,
                    submitted: confirmations,
                });
            }
        }
        headers.insert(key, BlockHeaderRecord { confirmations, data });
        tracing::info!(
            target: "uln",
            oracle = %caller,
            src_chain,
            %block_hash,
            confirmations,
            "block header recorded"
        );
        Ok(())
    }

    /// Reads the header record an attestation provider has on file.
    pub fn block_header(
        &self,
        oracle: Address,
        src_chain: ChainId,
        block_hash: B256,
    ) -> Option<BlockHeaderRecord> {
        self.block_headers.read().get(&(oracle, src_chain, block_hash)).copied()
    }

    /// The byte identity registered for a chain's remote library.
    pub fn remote_library(&self, chain: ChainId) -> Option<Bytes> {
        self.remote_libraries.read().get(&chain).cloned()
    }

    /// The accrued native balance for an identity.
    pub fn native_balance(&self, of: Address) -> U256 {
        self.native_balances.read().get(&of).copied().unwrap_or_default()
    }

    /// The accrued fee-token balance for an identity.
    pub fn fee_token_balance(&self, of: Address) -> U256 {
        self.fee_token_balances.read().get(&of).copied().unwrap_or_default()
    }

    /// Withdraws from the caller's accrued native balance.
    pub fn withdraw_native(
        &self,
        caller: Address,
        to: Address,
        amount: U256,
    ) -> Result<(), WithdrawError> {
        let balance = self.native_balance(caller);
        if amount > balance {
            return Err(WithdrawError::InsufficientBalance { balance, requested: amount });
        }
        // Interaction before effect commit: a refused transfer leaves the
        // balance untouched.
        self.native.transfer(to, amount).map_err(WithdrawError::WithdrawFailed)?;
        *self.native_balances.write().entry(caller).or_default() = balance - amount;
        tracing::info!(target: "uln", from = %caller, %to, %amount, "native fees withdrawn");
        Ok(())
    }

    /// Withdraws from the caller's accrued fee-token balance.
    pub fn withdraw_fee_token(
        &self,
        caller: Address,
        to: Address,
        amount: U256,
    ) -> Result<(), WithdrawError> {
        let token = self.fee_token.read().clone().ok_or(WithdrawError::FeeTokenDisabled)?.1;
        let balance = self.fee_token_balance(caller);
        if amount > balance {
            return Err(WithdrawError::InsufficientBalance { balance, requested: amount });
        }
        token
            .transfer_from(self.address, to, amount)
            .map_err(WithdrawError::WithdrawFailed)?;
        *self.fee_token_balances.write().entry(caller).or_default() = balance - amount;
        tracing::info!(target: "uln", from = %caller, %to, %amount, "fee token fees withdrawn");
        Ok(())
    }

    pub(crate) fn relayer_provider(
        &self,
        address: Address,
    ) -> Result<Arc<dyn RelayerProvider>, SendError> {
        self.relayers.read().get(&address).cloned().ok_or(SendError::UnknownProvider(address))
    }

    pub(crate) fn oracle_provider(
        &self,
        address: Address,
    ) -> Result<Arc<dyn OracleProvider>, SendError> {
        self.oracles.read().get(&address).cloned().ok_or(SendError::UnknownProvider(address))
    }

    pub(crate) fn chain_address_size(&self, chain: ChainId) -> Option<usize> {
        self.address_sizes.read().get(&chain).copied()
    }

    pub(crate) fn proof_library(
        &self,
        chain: ChainId,
        version: u16,
    ) -> Option<Arc<dyn ProofValidator>> {
        self.proof_libraries
            .read()
            .get(&chain)
            .and_then(|registry| registry.get(usize::from(version).checked_sub(1)?))
            .cloned()
    }

    pub(crate) fn default_adapter_params_for(
        &self,
        chain: ChainId,
        proof_type: ProofType,
    ) -> Bytes {
        self.default_adapter_params
            .read()
            .get(&(chain, proof_type))
            .cloned()
            .unwrap_or_default()
    }
}

impl MessageLibrary for UltraLightNode {
    fn address(&self) -> Address {
        self.address
    }

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
    ) -> Result<Packet, SendError> {
        Self::send(
            self,
            ctx,
            application,
            nonce,
            dst_chain,
            dst_address,
            payload,
            refund_address,
            fee_payment_address,
            adapter_params,
        )
    }

    fn estimate_fees(
        &self,
        application: Address,
        dst_chain: ChainId,
        payload_len: usize,
        pay_in_fee_token: bool,
        adapter_params: &[u8],
    ) -> Result<(U256, U256), SendError> {
        Self::estimate_fees(self, application, dst_chain, payload_len, pay_in_fee_token, adapter_params)
    }

    fn set_app_config(
        &self,
        application: Address,
        chain: ChainId,
        update: ConfigUpdate,
    ) -> Result<(), ConfigError> {
        Self::set_app_config(self, application, chain, update)
    }

    fn app_config(&self, chain: ChainId, application: Address) -> Result<AppConfig, ConfigError> {
        Self::app_config(self, chain, application)
    }
}
