//! Delivery, the blocked-payload queue, and its recovery paths.

use crate::{
    endpoint::Endpoint,
    errors::{ResumeError, RetryError, RouteError},
    traits::{InboundMessage, MessageReceiver},
};
use alloc::sync::Arc;
use alloy_primitives::{keccak256, Address, Bytes, B256};
use hashbrown::HashSet;
use spin::Mutex;
use trellis_primitives::{ChainId, Nonce};
use trellis_uln::{DeliverError, DeliveryOutcome, MessageRouter};

/// A message that failed delivery, held pending retry or force-clear.
///
/// At most one exists per (source chain, source application) channel, and
/// its presence blocks all further deliveries on that channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StoredPayload {
    /// The application the payload is addressed to.
    pub dst_address: Address,
    /// Hash of the stored payload bytes.
    pub payload_hash: B256,
    /// Length of the stored payload bytes.
    pub payload_length: usize,
    /// When the payload was stored, per the router's clock.
    pub timestamp: u64,
}

/// Scoped hold on an application's receive flag: acquire-or-fail,
/// released on every exit path.
struct ReceiveGuard<'a> {
    receiving: &'a Mutex<HashSet<Address>>,
    application: Address,
}

impl<'a> ReceiveGuard<'a> {
    fn acquire(
        receiving: &'a Mutex<HashSet<Address>>,
        application: Address,
    ) -> Result<Self, Address> {
        if !receiving.lock().insert(application) {
            return Err(application);
        }
        Ok(Self { receiving, application })
    }
}

impl Drop for ReceiveGuard<'_> {
    fn drop(&mut self) {
        self.receiving.lock().remove(&self.application);
    }
}

impl Endpoint {
    fn receiver_for(&self, application: Address) -> Option<Arc<dyn MessageReceiver>> {
        self.receivers.read().get(&application).cloned()
    }

    /// Whether a blocked payload occupies the channel.
    pub fn has_stored_payload(&self, src_chain: ChainId, src_address: &[u8]) -> bool {
        self.stored_payloads
            .read()
            .contains_key(&(src_chain, Bytes::copy_from_slice(src_address)))
    }

    /// The blocked payload record for a channel, if any.
    pub fn stored_payload(&self, src_chain: ChainId, src_address: &[u8]) -> Option<StoredPayload> {
        self.stored_payloads
            .read()
            .get(&(src_chain, Bytes::copy_from_slice(src_address)))
            .copied()
    }

    /// Re-runs a blocked payload's delivery with the exact stored bytes.
    ///
    /// A failing callback leaves the record untouched; the same payload
    /// may be retried any number of times. Success clears the record and
    /// advances the inbound nonce.
    pub fn retry_payload(
        &self,
        src_chain: ChainId,
        src_address: &[u8],
        payload: &[u8],
        gas_limit: u64,
    ) -> Result<(), RetryError> {
        let key = (src_chain, Bytes::copy_from_slice(src_address));
        let stored =
            self.stored_payloads.read().get(&key).copied().ok_or(RetryError::NoStoredPayload)?;
        if stored.payload_length != payload.len() || stored.payload_hash != keccak256(payload) {
            return Err(RetryError::PayloadMismatch);
        }

        let receiver = self
            .receiver_for(stored.dst_address)
            .ok_or(RetryError::UnknownApplication(stored.dst_address))?;
        let _guard = ReceiveGuard::acquire(&self.receiving, stored.dst_address)
            .map_err(RetryError::ReceiveReentrancy)?;

        let nonce = self.inbound_nonces.read().get(&key).copied().unwrap_or_default() + 1;
        receiver
            .on_message_received(InboundMessage {
                src_chain,
                src_address,
                nonce,
                payload,
                gas_limit,
            })
            .map_err(RetryError::Receive)?;

        self.stored_payloads.write().remove(&key);
        self.inbound_nonces.write().insert(key, nonce);
        tracing::info!(
            target: "endpoint",
            src_chain,
            nonce,
            application = %stored.dst_address,
            "stored payload cleared"
        );
        Ok(())
    }

    /// Unconditionally discards a channel's blocked payload and advances
    /// the inbound nonce, without invoking the callback.
    ///
    /// The escape hatch for permanently undeliverable messages; only the
    /// destination application named in the record may pull it.
    pub fn force_resume_receive(
        &self,
        caller: Address,
        src_chain: ChainId,
        src_address: &[u8],
    ) -> Result<(), ResumeError> {
        let key = (src_chain, Bytes::copy_from_slice(src_address));
        let stored =
            self.stored_payloads.read().get(&key).copied().ok_or(ResumeError::NoStoredPayload)?;
        if caller != stored.dst_address {
            return Err(ResumeError::InvalidCaller);
        }

        self.stored_payloads.write().remove(&key);
        let mut nonces = self.inbound_nonces.write();
        let nonce = nonces.get(&key).copied().unwrap_or_default() + 1;
        nonces.insert(key, nonce);
        tracing::warn!(
            target: "endpoint",
            src_chain,
            nonce,
            application = %caller,
            "receive force-resumed, payload discarded"
        );
        Ok(())
    }
}

impl MessageRouter for Endpoint {
    fn inbound_nonce(&self, src_chain: ChainId, src_address: &[u8]) -> Nonce {
        self.inbound_nonces
            .read()
            .get(&(src_chain, Bytes::copy_from_slice(src_address)))
            .copied()
            .unwrap_or_default()
    }

    fn deliver(
        &self,
        library: Address,
        src_chain: ChainId,
        src_address: &[u8],
        dst_address: Address,
        nonce: Nonce,
        gas_limit: u64,
        payload: &[u8],
    ) -> Result<DeliveryOutcome, DeliverError> {
        let receive_library = self.get_receive_library(dst_address).map_err(|err| match err {
            RouteError::BlockedVersion => DeliverError::BlockedVersion,
            RouteError::InvalidVersion => DeliverError::InvalidVersion,
        })?;
        if receive_library.address() != library {
            return Err(DeliverError::InvalidLibrary(dst_address));
        }

        let key = (src_chain, Bytes::copy_from_slice(src_address));
        if self.stored_payloads.read().contains_key(&key) {
            return Err(DeliverError::MessageBlocked);
        }

        let expected = self.inbound_nonces.read().get(&key).copied().unwrap_or_default() + 1;
        if nonce != expected {
            return Err(DeliverError::WrongNonce { expected, got: nonce });
        }

        let receiver = self
            .receiver_for(dst_address)
            .ok_or(DeliverError::UnknownApplication(dst_address))?;
        let _guard = ReceiveGuard::acquire(&self.receiving, dst_address)
            .map_err(DeliverError::ReceiveReentrancy)?;

        match receiver.on_message_received(InboundMessage {
            src_chain,
            src_address,
            nonce,
            payload,
            gas_limit,
        }) {
            Ok(()) => {
                self.inbound_nonces.write().insert(key, nonce);
                tracing::info!(
                    target: "endpoint",
                    src_chain,
                    nonce,
                    application = %dst_address,
                    "payload delivered"
                );
                Ok(DeliveryOutcome::Delivered)
            }
            Err(err) => {
                // The one failure that produces durable state instead of a
                // clean abort: park the payload, leave the nonce alone.
                self.stored_payloads.write().insert(
                    key,
                    StoredPayload {
                        dst_address,
                        payload_hash: keccak256(payload),
                        payload_length: payload.len(),
                        timestamp: self.clock.unix_timestamp(),
                    },
                );
                tracing::warn!(
                    target: "endpoint",
                    src_chain,
                    nonce,
                    application = %dst_address,
                    %err,
                    "delivery failed, payload stored"
                );
                Ok(DeliveryOutcome::Stored)
            }
        }
    }
}
