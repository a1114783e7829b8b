//! The inbound path: two-phase verification (attestation + inclusion
//! proof), ordering, and hand-off to the router.

use crate::{
    errors::{ValidateError, ValidateResult},
    node::UltraLightNode,
    traits::{DeliveryOutcome, MessageRouter},
};
use alloy_primitives::{Address, B256};
use trellis_primitives::ChainId;
use trellis_proof::ProofContext;

impl UltraLightNode {
    /// Validates an inbound message proof and, on success, hands the
    /// payload to the router for delivery.
    ///
    /// Only the application's configured relayer may submit. The claimed
    /// block must have an attestation on record from the application's
    /// oracle with enough confirmations; the inclusion proof must prove a
    /// packet event emitted by the registered remote library; and the
    /// packet's nonce must be exactly the next one for the channel.
    ///
    /// Whether the application callback itself succeeds is the router's
    /// business: a failed callback stores the payload and is not an error
    /// here.
    #[allow(clippy::too_many_arguments)]
    pub fn validate_and_deliver(
        &self,
        router: &dyn MessageRouter,
        caller: Address,
        src_chain: ChainId,
        src_address: &[u8],
        dst_application: Address,
        gas_limit: u64,
        block_hash: B256,
        proof: &[u8],
    ) -> ValidateResult<DeliveryOutcome> {
        let config = self.app_config(src_chain, dst_application)?;
        if caller != config.relayer {
            return Err(ValidateError::InvalidRelayer(caller));
        }

        let record = self
            .block_header(config.oracle, src_chain, block_hash)
            .ok_or(ValidateError::NoAttestation(block_hash))?;
        if record.confirmations < config.inbound_confirmations {
            return Err(ValidateError::InsufficientConfirmations {
                have: record.confirmations,
                need: config.inbound_confirmations,
            });
        }

        let address_size = self
            .chain_address_size(src_chain)
            .ok_or(ValidateError::UnknownChain(src_chain))?;
        let remote = self
            .remote_library(src_chain)
            .ok_or(ValidateError::UnknownChain(src_chain))?;
        let validator = self
            .proof_library(src_chain, config.inbound_proof_library_version)
            .ok_or(ValidateError::InvalidProofLibrary(config.inbound_proof_library_version))?;

        let packet = validator.validate_proof(
            record.data,
            proof,
            ProofContext { emitter: &remote, src_address_size: address_size },
        )?;

        if packet.src_chain != src_chain {
            return Err(ValidateError::SourceChainMismatch {
                expected: src_chain,
                got: packet.src_chain,
            });
        }
        if packet.dst_chain != self.local_chain() {
            return Err(ValidateError::DestinationChainMismatch {
                expected: self.local_chain(),
                got: packet.dst_chain,
            });
        }
        if packet.src_address.len() != address_size || packet.src_address.as_ref() != src_address {
            return Err(ValidateError::InvalidSourceAddress);
        }
        if packet.dst_address.as_ref() != dst_application.as_slice() {
            return Err(ValidateError::DestinationMismatch);
        }

        // Strict ordering: only the next nonce on the channel may deliver,
        // however valid the proof.
        let expected = router.inbound_nonce(src_chain, src_address) + 1;
        if packet.nonce != expected {
            return Err(ValidateError::WrongNonce { expected, got: packet.nonce });
        }

        tracing::debug!(
            target: "uln",
            src_chain,
            nonce = packet.nonce,
            application = %dst_application,
            "inbound proof verified"
        );

        let outcome = router.deliver(
            self.library_address(),
            src_chain,
            src_address,
            dst_application,
            packet.nonce,
            gas_limit,
            &packet.payload,
        )?;
        Ok(outcome)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::{TestOracle, TestVault};
    use alloc::{sync::Arc, vec::Vec};
    use alloy_primitives::{address, Bytes};
    use core::sync::atomic::{AtomicU64, Ordering};
    use spin::Mutex;
    use trellis_fee::RelayerFeeTable;
    use trellis_primitives::{AppConfig, Nonce, Packet};
    use trellis_proof::{fixtures, ReceiptProofValidator};

    const OWNER: Address = address!("00000000000000000000000000000000000000a0");
    const ULN_ADDR: Address = address!("00000000000000000000000000000000000000e0");
    const REMOTE_ULN: Address = address!("00000000000000000000000000000000000000e2");
    const RELAYER: Address = address!("0000000000000000000000000000000000000011");
    const ORACLE: Address = address!("0000000000000000000000000000000000000022");
    const APP: Address = address!("00000000000000000000000000000000000000c1");
    const REMOTE_APP: Address = address!("00000000000000000000000000000000000000c2");
    const SRC: ChainId = 2;

    /// Records deliveries and serves a settable inbound nonce.
    #[derive(Debug, Default)]
    struct MockRouter {
        nonce: AtomicU64,
        delivered: Mutex<Vec<(ChainId, Nonce, Vec<u8>)>>,
    }

    impl MessageRouter for MockRouter {
        fn inbound_nonce(&self, _src_chain: ChainId, _src_address: &[u8]) -> Nonce {
            self.nonce.load(Ordering::Acquire)
        }

        fn deliver(
            &self,
            _library: Address,
            src_chain: ChainId,
            _src_address: &[u8],
            _dst_address: Address,
            nonce: Nonce,
            _gas_limit: u64,
            payload: &[u8],
        ) -> Result<DeliveryOutcome, crate::errors::DeliverError> {
            self.delivered.lock().push((src_chain, nonce, payload.to_vec()));
            self.nonce.store(nonce, Ordering::Release);
            Ok(DeliveryOutcome::Delivered)
        }
    }

    fn node() -> UltraLightNode {
        let node = UltraLightNode::new(ULN_ADDR, 1, OWNER, Arc::new(TestVault::new()));
        node.set_remote_library(
            OWNER,
            SRC,
            Bytes::copy_from_slice(REMOTE_ULN.as_slice()),
        )
        .unwrap();
        node.set_chain_address_size(OWNER, SRC, 20).unwrap();
        node.add_inbound_proof_library(OWNER, SRC, Arc::new(ReceiptProofValidator::new()))
            .unwrap();
        node.enable_outbound_proof_type(OWNER, SRC, 1).unwrap();
        node.register_relayer(OWNER, RELAYER, Arc::new(RelayerFeeTable::new())).unwrap();
        node.register_oracle(OWNER, ORACLE, Arc::new(TestOracle::new())).unwrap();
        node.set_default_config(
            OWNER,
            SRC,
            AppConfig {
                inbound_proof_library_version: 1,
                inbound_confirmations: 15,
                relayer: RELAYER,
                outbound_proof_type: 1,
                outbound_confirmations: 15,
                oracle: ORACLE,
            },
        )
        .unwrap();
        node
    }

    fn inbound_packet(nonce: Nonce) -> Packet {
        Packet {
            nonce,
            src_chain: SRC,
            src_address: Bytes::copy_from_slice(REMOTE_APP.as_slice()),
            dst_chain: 1,
            dst_address: Bytes::copy_from_slice(APP.as_slice()),
            payload: Bytes::from_static(&[0x12, 0x34]),
        }
    }

    /// Attests the block and returns (block hash, proof) for the packet.
    fn attested_proof(node: &UltraLightNode, packet: &Packet, confirmations: u64) -> (B256, Bytes) {
        let receipts = alloc::vec![fixtures::packet_receipt(REMOTE_ULN, packet)];
        let (root, proof) = fixtures::inclusion_proof(&receipts, 0, 0);
        let block_hash = B256::with_last_byte(0x42);
        node.update_block_header(ORACLE, SRC, block_hash, confirmations, root).unwrap();
        (block_hash, proof)
    }

    #[test]
    fn valid_proof_delivers() {
        let node = node();
        let router = MockRouter::default();
        let packet = inbound_packet(1);
        let (block_hash, proof) = attested_proof(&node, &packet, 15);

        let outcome = node
            .validate_and_deliver(
                &router,
                RELAYER,
                SRC,
                REMOTE_APP.as_slice(),
                APP,
                100_000,
                block_hash,
                &proof,
            )
            .unwrap();
        assert_eq!(outcome, DeliveryOutcome::Delivered);
        assert_eq!(
            router.delivered.lock().as_slice(),
            [(SRC, 1, alloc::vec![0x12, 0x34])]
        );
    }

    #[test]
    fn only_the_configured_relayer_may_submit() {
        let node = node();
        let router = MockRouter::default();
        let packet = inbound_packet(1);
        let (block_hash, proof) = attested_proof(&node, &packet, 15);

        let err = node
            .validate_and_deliver(
                &router,
                ORACLE,
                SRC,
                REMOTE_APP.as_slice(),
                APP,
                100_000,
                block_hash,
                &proof,
            )
            .unwrap_err();
        assert_eq!(err, ValidateError::InvalidRelayer(ORACLE));
    }

    #[test]
    fn missing_attestation_is_rejected() {
        let node = node();
        let router = MockRouter::default();
        let packet = inbound_packet(1);
        let receipts = alloc::vec![fixtures::packet_receipt(REMOTE_ULN, &packet)];
        let (_, proof) = fixtures::inclusion_proof(&receipts, 0, 0);
        let block_hash = B256::with_last_byte(0x43);

        let err = node
            .validate_and_deliver(
                &router,
                RELAYER,
                SRC,
                REMOTE_APP.as_slice(),
                APP,
                100_000,
                block_hash,
                &proof,
            )
            .unwrap_err();
        assert_eq!(err, ValidateError::NoAttestation(block_hash));
    }

    #[test]
    fn confirmation_threshold_is_enforced() {
        let node = node();
        let router = MockRouter::default();
        let packet = inbound_packet(1);
        let (block_hash, proof) = attested_proof(&node, &packet, 14);

        let err = node
            .validate_and_deliver(
                &router,
                RELAYER,
                SRC,
                REMOTE_APP.as_slice(),
                APP,
                100_000,
                block_hash,
                &proof,
            )
            .unwrap_err();
        assert_eq!(err, ValidateError::InsufficientConfirmations { have: 14, need: 15 });

        // Once the oracle re-attests with enough confirmations, the same
        // proof goes through.
        node.update_block_header(
            ORACLE,
            SRC,
            block_hash,
            15,
            node.block_header(ORACLE, SRC, block_hash).unwrap().data,
        )
        .unwrap();
        node.validate_and_deliver(
            &router,
            RELAYER,
            SRC,
            REMOTE_APP.as_slice(),
            APP,
            100_000,
            block_hash,
            &proof,
        )
        .unwrap();
    }

    #[test]
    fn nonce_must_be_exactly_next() {
        let node = node();
        let router = MockRouter::default();

        // A proof for nonce 2 while 1 is outstanding is rejected, however
        // valid in isolation.
        let packet = inbound_packet(2);
        let (block_hash, proof) = attested_proof(&node, &packet, 15);
        let err = node
            .validate_and_deliver(
                &router,
                RELAYER,
                SRC,
                REMOTE_APP.as_slice(),
                APP,
                100_000,
                block_hash,
                &proof,
            )
            .unwrap_err();
        assert_eq!(err, ValidateError::WrongNonce { expected: 1, got: 2 });
    }

    #[test]
    fn replayed_proof_is_rejected() {
        let node = node();
        let router = MockRouter::default();
        let packet = inbound_packet(1);
        let (block_hash, proof) = attested_proof(&node, &packet, 15);

        node.validate_and_deliver(
            &router,
            RELAYER,
            SRC,
            REMOTE_APP.as_slice(),
            APP,
            100_000,
            block_hash,
            &proof,
        )
        .unwrap();

        // Identical resubmission: nonce now expects 2, proof still claims 1.
        let err = node
            .validate_and_deliver(
                &router,
                RELAYER,
                SRC,
                REMOTE_APP.as_slice(),
                APP,
                100_000,
                block_hash,
                &proof,
            )
            .unwrap_err();
        assert_eq!(err, ValidateError::WrongNonce { expected: 2, got: 1 });
        assert_eq!(router.delivered.lock().len(), 1);
    }

    #[test]
    fn packet_identities_are_cross_checked() {
        let node = node();
        let router = MockRouter::default();

        // Claimed source application differs from the packet's.
        let packet = inbound_packet(1);
        let (block_hash, proof) = attested_proof(&node, &packet, 15);
        let err = node
            .validate_and_deliver(
                &router,
                RELAYER,
                SRC,
                APP.as_slice(),
                APP,
                100_000,
                block_hash,
                &proof,
            )
            .unwrap_err();
        assert_eq!(err, ValidateError::InvalidSourceAddress);

        // Claimed destination application differs from the packet's.
        let err = node
            .validate_and_deliver(
                &router,
                RELAYER,
                SRC,
                REMOTE_APP.as_slice(),
                REMOTE_APP,
                100_000,
                block_hash,
                &proof,
            )
            .unwrap_err();
        assert_eq!(err, ValidateError::DestinationMismatch);
    }

    #[test]
    fn proof_from_untrusted_emitter_is_rejected() {
        let node = node();
        let router = MockRouter::default();
        let packet = inbound_packet(1);

        // The packet event was emitted by something other than the
        // registered remote library.
        let receipts = alloc::vec![fixtures::packet_receipt(APP, &packet)];
        let (root, proof) = fixtures::inclusion_proof(&receipts, 0, 0);
        let block_hash = B256::with_last_byte(0x44);
        node.update_block_header(ORACLE, SRC, block_hash, 15, root).unwrap();

        let err = node
            .validate_and_deliver(
                &router,
                RELAYER,
                SRC,
                REMOTE_APP.as_slice(),
                APP,
                100_000,
                block_hash,
                &proof,
            )
            .unwrap_err();
        assert!(matches!(err, ValidateError::Proof(_)));
    }
}
