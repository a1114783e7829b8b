//! Receipt-based packet inclusion proofs.
//!
//! The canonical inbound proof library: proves a receipt into an attested
//! receipts root, then extracts the outbound-packet event from it.

use crate::{
    errors::{ProofError, ProofResult},
    walker::ProofNodeMap,
};
use alloc::vec::Vec;
use alloy_consensus::ReceiptEnvelope;
use alloy_eips::eip2718::Decodable2718;
use alloy_primitives::{Bytes, B256};
use alloy_rlp::{Decodable, RlpDecodable, RlpEncodable};
use trellis_primitives::{packet_topic, Packet};

/// Chain-scoped inputs a proof is validated against.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProofContext<'a> {
    /// Byte identity of the remote library trusted to emit packets on the
    /// source chain.
    pub emitter: &'a [u8],
    /// Configured address width of the source chain.
    pub src_address_size: usize,
}

/// An inbound proof library: verifies that a packet event is included in
/// the block a header record attests to, and decodes the packet.
///
/// Registered per source chain in an append-only, versioned list; the
/// version an application verifies with is part of its configuration.
pub trait ProofValidator: core::fmt::Debug + Send + Sync {
    /// Verifies `proof` against the attested data root and returns the
    /// proven packet.
    fn validate_proof(
        &self,
        attested_root: B256,
        proof: &[u8],
        cx: ProofContext<'_>,
    ) -> ProofResult<Packet>;
}

/// Wire form of a receipt inclusion proof.
#[derive(Debug, Clone, PartialEq, Eq, RlpEncodable, RlpDecodable)]
pub struct ReceiptInclusionProof {
    /// Index of the transaction whose receipt carries the packet event.
    pub tx_index: u64,
    /// Index of the packet event within that receipt's logs.
    pub log_index: u64,
    /// Trie node preimages covering the path from the receipts root to the
    /// receipt.
    pub nodes: Vec<Bytes>,
}

/// The canonical [ProofValidator] over receipt tries.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[non_exhaustive]
pub struct ReceiptProofValidator;

impl ReceiptProofValidator {
    /// Creates a new receipt proof validator.
    pub const fn new() -> Self {
        Self
    }
}

impl ProofValidator for ReceiptProofValidator {
    fn validate_proof(
        &self,
        attested_root: B256,
        proof: &[u8],
        cx: ProofContext<'_>,
    ) -> ProofResult<Packet> {
        let proof = ReceiptInclusionProof::decode(&mut &proof[..])
            .map_err(ProofError::MalformedProof)?;

        // The receipts trie is keyed by the RLP of the transaction index.
        let nodes = ProofNodeMap::new(proof.nodes);
        let value = nodes.retrieve(attested_root, &alloy_rlp::encode(proof.tx_index))?;

        let envelope = ReceiptEnvelope::decode_2718(&mut value.as_ref())
            .map_err(|_| ProofError::ReceiptDecode)?;
        let receipt = envelope.as_receipt().ok_or(ProofError::ReceiptDecode)?;

        let log = receipt.logs.get(proof.log_index as usize).ok_or(
            ProofError::LogOutOfRange { index: proof.log_index, count: receipt.logs.len() },
        )?;
        if log.address.as_slice() != cx.emitter {
            return Err(ProofError::UntrustedEmitter);
        }
        if log.data.topics().first() != Some(&packet_topic()) {
            return Err(ProofError::UnexpectedTopic);
        }

        Packet::decode(&log.data.data, cx.src_address_size).map_err(Into::into)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{errors::TrieWalkError, fixtures};
    use alloc::vec;
    use alloy_primitives::{address, Address};

    fn test_packet(nonce: u64) -> Packet {
        Packet {
            nonce,
            src_chain: 1,
            src_address: Bytes::copy_from_slice(
                address!("00000000000000000000000000000000000000f0").as_slice(),
            ),
            dst_chain: 2,
            dst_address: Bytes::copy_from_slice(
                address!("00000000000000000000000000000000000000fe").as_slice(),
            ),
            payload: vec![0x12, 0x34].into(),
        }
    }

    const EMITTER: Address = address!("00000000000000000000000000000000000000e1");

    #[test]
    fn proves_packet_in_singleton_trie() {
        let packet = test_packet(1);
        let receipts = vec![fixtures::packet_receipt(EMITTER, &packet)];
        let (root, proof) = fixtures::inclusion_proof(&receipts, 0, 0);

        let proven = ReceiptProofValidator::new()
            .validate_proof(root, &proof, ProofContext { emitter: EMITTER.as_slice(), src_address_size: 20 })
            .unwrap();
        assert_eq!(proven, packet);
    }

    #[test]
    fn proves_packet_among_unrelated_receipts() {
        let packet = test_packet(9);
        let receipts = vec![
            fixtures::noise_receipt(address!("00000000000000000000000000000000000000d1")),
            fixtures::packet_receipt(EMITTER, &packet),
            fixtures::noise_receipt(address!("00000000000000000000000000000000000000d2")),
        ];
        let (root, proof) = fixtures::inclusion_proof(&receipts, 1, 0);

        let proven = ReceiptProofValidator::new()
            .validate_proof(root, &proof, ProofContext { emitter: EMITTER.as_slice(), src_address_size: 20 })
            .unwrap();
        assert_eq!(proven, packet);
    }

    #[test]
    fn rejects_unexpected_emitter() {
        let packet = test_packet(1);
        let receipts = vec![fixtures::packet_receipt(EMITTER, &packet)];
        let (root, proof) = fixtures::inclusion_proof(&receipts, 0, 0);

        let err = ReceiptProofValidator::new()
            .validate_proof(
                root,
                &proof,
                ProofContext {
                    emitter: address!("00000000000000000000000000000000000000d9").as_slice(),
                    src_address_size: 20,
                },
            )
            .unwrap_err();
        assert_eq!(err, ProofError::UntrustedEmitter);
    }

    #[test]
    fn rejects_wrong_root() {
        let packet = test_packet(1);
        let receipts = vec![fixtures::packet_receipt(EMITTER, &packet)];
        let (_, proof) = fixtures::inclusion_proof(&receipts, 0, 0);

        let err = ReceiptProofValidator::new()
            .validate_proof(
                B256::with_last_byte(0xEE),
                &proof,
                ProofContext { emitter: EMITTER.as_slice(), src_address_size: 20 },
            )
            .unwrap_err();
        assert!(matches!(err, ProofError::TrieWalk(TrieWalkError::MissingNode(_))));
    }

    #[test]
    fn rejects_log_index_out_of_range() {
        let packet = test_packet(1);
        let receipts = vec![fixtures::packet_receipt(EMITTER, &packet)];
        let (root, proof) = fixtures::inclusion_proof(&receipts, 0, 3);

        let err = ReceiptProofValidator::new()
            .validate_proof(root, &proof, ProofContext { emitter: EMITTER.as_slice(), src_address_size: 20 })
            .unwrap_err();
        assert_eq!(err, ProofError::LogOutOfRange { index: 3, count: 1 });
    }

    #[test]
    fn rejects_non_packet_event() {
        let receipts = vec![fixtures::noise_receipt(EMITTER)];
        let (root, proof) = fixtures::inclusion_proof(&receipts, 0, 0);

        let err = ReceiptProofValidator::new()
            .validate_proof(root, &proof, ProofContext { emitter: EMITTER.as_slice(), src_address_size: 20 })
            .unwrap_err();
        assert_eq!(err, ProofError::UnexpectedTopic);
    }

    #[test]
    fn rejects_garbage_envelope() {
        let err = ReceiptProofValidator::new()
            .validate_proof(
                B256::ZERO,
                &[0x01, 0x02],
                ProofContext { emitter: EMITTER.as_slice(), src_address_size: 20 },
            )
            .unwrap_err();
        assert!(matches!(err, ProofError::MalformedProof(_)));
    }
}
