//! Test doubles for the router's outer seam.

use crate::traits::{Clock, InboundMessage, MessageReceiver, ReceiveError};
use alloc::{string::ToString, vec::Vec};
use core::sync::atomic::{AtomicU64, Ordering};
use spin::Mutex;
use trellis_primitives::{ChainId, Nonce};

/// A clock pinned to a fixed instant.
#[derive(Debug)]
pub struct FixedClock(u64);

impl FixedClock {
    /// Creates a clock that always reads `now`.
    pub const fn new(now: u64) -> Self {
        Self(now)
    }
}

impl Clock for FixedClock {
    fn unix_timestamp(&self) -> u64 {
        self.0
    }
}

/// A receiving application that records every delivery and can demand a
/// minimum gas budget, aborting under-provisioned deliveries the way a
/// real callback runs out of gas.
#[derive(Debug, Default)]
pub struct CounterReceiver {
    received: Mutex<Vec<(ChainId, Vec<u8>, Nonce, Vec<u8>)>>,
    required_gas: AtomicU64,
}

impl CounterReceiver {
    /// Creates a receiver that accepts every delivery.
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes deliveries with less than `gas` fail.
    pub fn require_gas(&self, gas: u64) {
        self.required_gas.store(gas, Ordering::Release);
    }

    /// The number of successful deliveries.
    pub fn count(&self) -> usize {
        self.received.lock().len()
    }

    /// Everything successfully delivered so far.
    pub fn received(&self) -> Vec<(ChainId, Vec<u8>, Nonce, Vec<u8>)> {
        self.received.lock().clone()
    }
}

impl MessageReceiver for CounterReceiver {
    fn on_message_received(&self, message: InboundMessage<'_>) -> Result<(), ReceiveError> {
        if message.gas_limit < self.required_gas.load(Ordering::Acquire) {
            return Err(ReceiveError("out of gas".to_string()));
        }
        self.received.lock().push((
            message.src_chain,
            message.src_address.to_vec(),
            message.nonce,
            message.payload.to_vec(),
        ));
        Ok(())
    }
}
