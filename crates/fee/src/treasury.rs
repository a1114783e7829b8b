//! Protocol surcharge policy.

use crate::errors::{FeeError, FeeResult};
use alloy_primitives::U256;
use core::sync::atomic::{AtomicBool, Ordering};
use spin::RwLock;

/// Denominator of the treasury's basis-point rates.
pub const BP_DENOMINATOR: U256 = U256::from_limbs([10_000, 0, 0, 0]);

/// The protocol treasury's surcharge policy: a basis-point cut of the
/// relaying + attestation fees, in whichever denomination the sender pays.
#[derive(Debug, Default)]
pub struct Treasury {
    native_bp: RwLock<U256>,
    fee_token_bp: RwLock<U256>,
    fee_enabled: AtomicBool,
    fee_token_enabled: AtomicBool,
}

impl Treasury {
    /// Creates a treasury with fees disabled and zero rates.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the basis-point rate applied to native-currency payments.
    pub fn set_native_bp(&self, bp: U256) {
        *self.native_bp.write() = bp;
    }

    /// Sets the basis-point rate applied to fee-token payments.
    pub fn set_fee_token_bp(&self, bp: U256) {
        *self.fee_token_bp.write() = bp;
    }

    /// Globally enables or disables the surcharge.
    pub fn set_fee_enabled(&self, enabled: bool) {
        self.fee_enabled.store(enabled, Ordering::Release);
    }

    /// Globally enables or disables paying the surcharge in the fee token.
    pub fn set_fee_token_enabled(&self, enabled: bool) {
        self.fee_token_enabled.store(enabled, Ordering::Release);
    }

    /// Computes the surcharge on top of the quoted relaying and attestation
    /// fees.
    pub fn surcharge(
        &self,
        pay_in_fee_token: bool,
        relaying_fee: U256,
        attestation_fee: U256,
    ) -> FeeResult<U256> {
        if !self.fee_enabled.load(Ordering::Acquire) {
            return Ok(U256::ZERO);
        }
        let bp = if pay_in_fee_token {
            if !self.fee_token_enabled.load(Ordering::Acquire) {
                return Err(FeeError::FeeTokenDisabled);
            }
            *self.fee_token_bp.read()
        } else {
            *self.native_bp.read()
        };
        Ok((relaying_fee + attestation_fee) * bp / BP_DENOMINATOR)
    }
}
