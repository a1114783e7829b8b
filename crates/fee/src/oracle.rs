//! Attestation-service pricing.

use crate::errors::{FeeError, FeeResult};
use alloy_primitives::U256;
use hashbrown::HashMap;
use spin::RwLock;
use trellis_primitives::{ChainId, ProofType};

/// The attestation service's quote table, keyed by (destination chain,
/// outbound proof type) route.
///
/// A route must be offered before it can be quoted; an offered route with
/// no explicit price quotes zero. The distinction keeps "this oracle does
/// not serve that chain" observable as an error rather than a free quote.
#[derive(Debug, Default)]
pub struct OracleFeeTable {
    routes: RwLock<HashMap<(ChainId, ProofType), U256>>,
}

impl OracleFeeTable {
    /// Creates an empty table with no routes offered.
    pub fn new() -> Self {
        Self::default()
    }

    /// Offers a route without pricing it; it quotes zero until priced.
    pub fn offer_route(&self, chain: ChainId, proof_type: ProofType) {
        self.routes.write().entry((chain, proof_type)).or_insert(U256::ZERO);
    }

    /// Sets the price of a route, offering it if necessary.
    pub fn set_price(&self, chain: ChainId, proof_type: ProofType, price: U256) {
        self.routes.write().insert((chain, proof_type), price);
    }

    /// Returns whether the route is offered at all.
    pub fn offers(&self, chain: ChainId, proof_type: ProofType) -> bool {
        self.routes.read().contains_key(&(chain, proof_type))
    }

    /// Quotes the attestation price for a route.
    pub fn price(&self, chain: ChainId, proof_type: ProofType) -> FeeResult<U256> {
        self.routes
            .read()
            .get(&(chain, proof_type))
            .copied()
            .ok_or(FeeError::UnsupportedRoute { chain, proof_type })
    }
}
