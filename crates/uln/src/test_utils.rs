//! Test doubles for the library's external collaborators: a native ledger,
//! a fee token with allowances, and a recording oracle provider.

use crate::traits::{FeeToken, NativeVault, OracleProvider, ProviderError, TransferError};
use alloc::{string::ToString, vec::Vec};
use alloy_primitives::{Address, U256};
use core::sync::atomic::{AtomicBool, Ordering};
use hashbrown::{HashMap, HashSet};
use spin::{Mutex, RwLock};
use trellis_fee::{FeeResult, OracleFeeTable};
use trellis_primitives::{ChainId, ProofType};

/// An in-memory native ledger. Recipients can be rigged to refuse
/// transfers, mirroring a refund target that cannot accept value.
#[derive(Debug, Default)]
pub struct TestVault {
    balances: RwLock<HashMap<Address, U256>>,
    rejecting: RwLock<HashSet<Address>>,
}

impl TestVault {
    /// Creates an empty ledger.
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes every transfer to `recipient` fail.
    pub fn reject_transfers_to(&self, recipient: Address) {
        self.rejecting.write().insert(recipient);
    }

    /// The amount transferred to `of` so far.
    pub fn balance_of(&self, of: Address) -> U256 {
        self.balances.read().get(&of).copied().unwrap_or_default()
    }
}

impl NativeVault for TestVault {
    fn transfer(&self, to: Address, amount: U256) -> Result<(), TransferError> {
        if self.rejecting.read().contains(&to) {
            return Err(TransferError::Rejected);
        }
        *self.balances.write().entry(to).or_default() += amount;
        Ok(())
    }
}

/// An in-memory fee token with per-owner allowances granted to the
/// library.
#[derive(Debug, Default)]
pub struct TestToken {
    balances: RwLock<HashMap<Address, U256>>,
    allowances: RwLock<HashMap<Address, U256>>,
}

impl TestToken {
    /// Creates an empty token ledger.
    pub fn new() -> Self {
        Self::default()
    }

    /// Credits `to` with `amount` tokens.
    pub fn mint(&self, to: Address, amount: U256) {
        *self.balances.write().entry(to).or_default() += amount;
    }

    /// Approves the library to spend `amount` of `owner`'s tokens.
    pub fn approve(&self, owner: Address, amount: U256) {
        self.allowances.write().insert(owner, amount);
    }

    /// The token balance of `of`.
    pub fn balance_of(&self, of: Address) -> U256 {
        self.balances.read().get(&of).copied().unwrap_or_default()
    }
}

impl FeeToken for TestToken {
    fn transfer_from(
        &self,
        from: Address,
        to: Address,
        amount: U256,
    ) -> Result<(), TransferError> {
        {
            let mut allowances = self.allowances.write();
            let allowance = allowances.entry(from).or_default();
            if *allowance < amount {
                return Err(TransferError::InsufficientAllowance);
            }
            *allowance -= amount;
        }
        let mut balances = self.balances.write();
        let from_balance = balances.entry(from).or_default();
        if *from_balance < amount {
            return Err(TransferError::InsufficientFunds);
        }
        *from_balance -= amount;
        *balances.entry(to).or_default() += amount;
        Ok(())
    }
}

/// An oracle provider over a fee table that records every notification and
/// can be rigged to fail them.
#[derive(Debug, Default)]
pub struct TestOracle {
    /// The quote table served through [OracleProvider::price].
    pub fees: OracleFeeTable,
    notifications: Mutex<Vec<(ChainId, ProofType, u64)>>,
    fail_notify: AtomicBool,
}

impl TestOracle {
    /// Creates an oracle with no routes offered.
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes subsequent notifications fail.
    pub fn fail_notifications(&self, fail: bool) {
        self.fail_notify.store(fail, Ordering::Release);
    }

    /// Drains and returns the recorded notifications.
    pub fn take_notifications(&self) -> Vec<(ChainId, ProofType, u64)> {
        core::mem::take(&mut *self.notifications.lock())
    }
}

impl OracleProvider for TestOracle {
    fn notify(
        &self,
        dst_chain: ChainId,
        proof_type: ProofType,
        confirmations: u64,
    ) -> Result<(), ProviderError> {
        if self.fail_notify.load(Ordering::Acquire) {
            return Err(ProviderError("oracle offline".to_string()));
        }
        self.notifications.lock().push((dst_chain, proof_type, confirmations));
        Ok(())
    }

    fn price(&self, dst_chain: ChainId, proof_type: ProofType) -> FeeResult<U256> {
        self.fees.price(dst_chain, proof_type)
    }
}
