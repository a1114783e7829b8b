//! Relaying-service pricing.
//!
//! The price of delivering a message is quoted from two per-destination
//! tables: a price row (source/destination currency ratio and destination
//! gas price) and a per-proof-type config row (airdrop cap, base gas, gas
//! per payload byte). Unset rows quote zero rather than failing, so a
//! non-zero quote must never be read as proof of configuration.

use crate::errors::{FeeError, FeeResult};
use alloy_primitives::{Address, U256};
use hashbrown::HashMap;
use spin::RwLock;
use trellis_primitives::{AdapterParams, ChainId, ProofType};

/// Fixed-point scale of [DstPrice::price_ratio]: a ratio of `r` means the
/// destination currency is worth `r / PRICE_RATIO_DENOMINATOR` units of the
/// local currency.
pub const PRICE_RATIO_DENOMINATOR: U256 = U256::from_limbs([10_000_000_000, 0, 0, 0]);

/// Per-destination-chain price row.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DstPrice {
    /// Destination/local currency ratio, scaled by
    /// [PRICE_RATIO_DENOMINATOR].
    pub price_ratio: U256,
    /// Destination gas price in destination wei.
    pub gas_price: U256,
}

/// Per-(destination chain, proof type) config row.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DstConfig {
    /// Maximum destination-native airdrop a single message may request.
    pub native_cap: U256,
    /// Gas consumed by delivery before the application callback runs.
    pub base_gas: U256,
    /// Destination gas charged per payload byte.
    pub gas_per_byte: U256,
}

/// The relaying service's quote tables.
#[derive(Debug, Default)]
pub struct RelayerFeeTable {
    prices: RwLock<HashMap<ChainId, DstPrice>>,
    configs: RwLock<HashMap<(ChainId, ProofType), DstConfig>>,
}

impl RelayerFeeTable {
    /// Creates an empty table; every destination quotes zero until priced.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the price row for a destination chain.
    pub fn set_dst_price(&self, chain: ChainId, price_ratio: U256, gas_price: U256) {
        self.prices.write().insert(chain, DstPrice { price_ratio, gas_price });
    }

    /// Sets the config row for a (destination chain, proof type) pair.
    pub fn set_dst_config(&self, chain: ChainId, proof_type: ProofType, config: DstConfig) {
        self.configs.write().insert((chain, proof_type), config);
    }

    /// Returns the price row for a destination chain, zeroed when unset.
    pub fn dst_price(&self, chain: ChainId) -> DstPrice {
        self.prices.read().get(&chain).copied().unwrap_or_default()
    }

    /// Returns the config row for a pair, zeroed when unset.
    pub fn dst_config(&self, chain: ChainId, proof_type: ProofType) -> DstConfig {
        self.configs.read().get(&(chain, proof_type)).copied().unwrap_or_default()
    }

    /// Quotes the relaying price for one message.
    ///
    /// Parameter validation applies even to unpriced destinations: the
    /// requested destination gas must be non-zero and any airdrop must fit
    /// under the configured cap.
    pub fn price(
        &self,
        dst_chain: ChainId,
        proof_type: ProofType,
        application: Address,
        payload_len: usize,
        params: &AdapterParams,
    ) -> FeeResult<U256> {
        let config = self.dst_config(dst_chain, proof_type);
        let price = self.dst_price(dst_chain);

        let total_gas = config.base_gas + params.extra_gas();
        if total_gas.is_zero() {
            return Err(FeeError::GasTooLow);
        }
        let airdrop = params.airdrop_amount();
        if airdrop > config.native_cap {
            return Err(FeeError::AirdropCapExceeded { amount: airdrop, cap: config.native_cap });
        }

        let base = (airdrop + price.gas_price * total_gas) * price.price_ratio
            / PRICE_RATIO_DENOMINATOR;
        let per_byte =
            price.gas_price * config.gas_per_byte * price.price_ratio / PRICE_RATIO_DENOMINATOR;
        let quote = base + per_byte * U256::from(payload_len);

        tracing::trace!(
            target: "fee",
            %application,
            dst_chain,
            proof_type,
            payload_len,
            quote = %quote,
            "quoted relaying price"
        );
        Ok(quote)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloy_primitives::Address;

    const CHAIN: ChainId = 1;
    const PROOF_TYPE: ProofType = 1;

    fn priced_table() -> RelayerFeeTable {
        let table = RelayerFeeTable::new();
        // Destination currency worth half the local one.
        table.set_dst_price(CHAIN, PRICE_RATIO_DENOMINATOR / U256::from(2), U256::from(10));
        table.set_dst_config(
            CHAIN,
            PROOF_TYPE,
            DstConfig {
                native_cap: U256::from(200_000),
                base_gas: U256::from(10),
                gas_per_byte: U256::from(20),
            },
        );
        table
    }

    #[test]
    fn unpriced_destination_quotes_zero() {
        let table = RelayerFeeTable::new();
        let quote = table
            .price(
                CHAIN,
                PROOF_TYPE,
                Address::ZERO,
                2,
                &AdapterParams::Standard { extra_gas: U256::ONE },
            )
            .unwrap();
        assert_eq!(quote, U256::ZERO);
    }

    #[test]
    fn zero_total_gas_is_rejected_even_unpriced() {
        let table = RelayerFeeTable::new();
        let err = table
            .price(
                CHAIN,
                PROOF_TYPE,
                Address::ZERO,
                2,
                &AdapterParams::Standard { extra_gas: U256::ZERO },
            )
            .unwrap_err();
        assert_eq!(err, FeeError::GasTooLow);
    }

    #[test]
    fn airdrop_over_cap_is_rejected() {
        let table = priced_table();
        // Lower the cap below the requested amount.
        table.set_dst_config(
            CHAIN,
            PROOF_TYPE,
            DstConfig {
                native_cap: U256::from(9),
                base_gas: U256::from(10),
                gas_per_byte: U256::from(20),
            },
        );
        let err = table
            .price(
                CHAIN,
                PROOF_TYPE,
                Address::ZERO,
                2,
                &AdapterParams::NativeDrop {
                    extra_gas: U256::ONE,
                    amount: U256::from(10),
                    recipient: Address::ZERO,
                },
            )
            .unwrap_err();
        assert_eq!(
            err,
            FeeError::AirdropCapExceeded { amount: U256::from(10), cap: U256::from(9) }
        );
    }

    #[test]
    fn standard_price_formula() {
        let table = priced_table();
        let quote = table
            .price(
                CHAIN,
                PROOF_TYPE,
                Address::ZERO,
                2,
                &AdapterParams::Standard { extra_gas: U256::ONE },
            )
            .unwrap();
        // base = (0 + 10 * (10 + 1)) / 2 = 55; per byte = 10 * 20 / 2 = 100.
        assert_eq!(quote, U256::from(55 + 100 * 2));
    }

    #[test]
    fn native_drop_price_includes_airdrop() {
        let table = priced_table();
        let quote = table
            .price(
                CHAIN,
                PROOF_TYPE,
                Address::ZERO,
                2,
                &AdapterParams::NativeDrop {
                    extra_gas: U256::ONE,
                    amount: U256::from(10),
                    recipient: Address::ZERO,
                },
            )
            .unwrap();
        // base = (10 + 10 * 11) / 2 = 60; per byte unchanged.
        assert_eq!(quote, U256::from(60 + 100 * 2));
    }

    #[test]
    fn truncating_division() {
        let table = RelayerFeeTable::new();
        // ratio 1/3 of the denominator truncates the quote.
        table.set_dst_price(CHAIN, U256::from(3_333_333_333u64), U256::from(1));
        table.set_dst_config(
            CHAIN,
            PROOF_TYPE,
            DstConfig {
                native_cap: U256::ZERO,
                base_gas: U256::from(10),
                gas_per_byte: U256::ZERO,
            },
        );
        let quote = table
            .price(
                CHAIN,
                PROOF_TYPE,
                Address::ZERO,
                0,
                &AdapterParams::Standard { extra_gas: U256::ZERO },
            )
            .unwrap();
        // 10 * 3_333_333_333 / 10_000_000_000 = 3 (truncated).
        assert_eq!(quote, U256::from(3));
    }
}
