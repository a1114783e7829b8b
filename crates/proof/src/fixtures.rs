//! Fixture builders for proof tests: merkleized receipt lists and encoded
//! inclusion proofs.

use crate::ReceiptInclusionProof;
use alloc::{vec, vec::Vec};
use alloy_consensus::{Receipt, ReceiptEnvelope, ReceiptWithBloom};
use alloy_eips::eip2718::Encodable2718;
use alloy_primitives::{keccak256, Address, Bloom, Bytes, Log, LogData, B256};
use alloy_rlp::{BufMut, Encodable};
use alloy_trie::{proof::ProofRetainer, HashBuilder, Nibbles};
use trellis_primitives::{packet_topic, Packet};

/// Builds a receipt carrying a single outbound-packet event emitted by
/// `emitter`.
pub fn packet_receipt(emitter: Address, packet: &Packet) -> ReceiptEnvelope {
    let log = Log {
        address: emitter,
        data: LogData::new_unchecked(vec![packet_topic()], packet.encode()),
    };
    ReceiptEnvelope::Legacy(ReceiptWithBloom::new(
        Receipt { logs: vec![log], ..Default::default() },
        Bloom::default(),
    ))
}

/// Builds a receipt with one unrelated (non-packet) event.
pub fn noise_receipt(emitter: Address) -> ReceiptEnvelope {
    let log = Log {
        address: emitter,
        data: LogData::new_unchecked(
            vec![keccak256(b"Transfer(address,address,uint256)")],
            vec![0xde, 0xad].into(),
        ),
    };
    ReceiptEnvelope::Legacy(ReceiptWithBloom::new(
        Receipt { logs: vec![log], ..Default::default() },
        Bloom::default(),
    ))
}

/// Merkleizes the receipt list and returns the root together with every
/// retained trie node preimage.
pub fn receipts_trie(receipts: &[ReceiptEnvelope]) -> (B256, Vec<Bytes>) {
    let mut hb = ordered_trie_with_encoder(receipts, |receipt: &ReceiptEnvelope, buf| {
        receipt.encode_2718(buf)
    });
    let root = hb.root();
    let nodes =
        hb.take_proof_nodes().into_inner().into_iter().map(|(_, node)| node).collect();
    (root, nodes)
}

/// Merkleizes the receipt list and returns the root plus an encoded
/// [ReceiptInclusionProof] for the given transaction and log index.
pub fn inclusion_proof(
    receipts: &[ReceiptEnvelope],
    tx_index: u64,
    log_index: u64,
) -> (B256, Bytes) {
    let (root, nodes) = receipts_trie(receipts);
    let proof = ReceiptInclusionProof { tx_index, log_index, nodes };
    (root, alloy_rlp::encode(&proof).into())
}

/// Computes a trie root of the collection of items with a custom encoder,
/// retaining every intermediate node.
fn ordered_trie_with_encoder<T, F>(items: &[T], mut encode: F) -> HashBuilder
where
    F: FnMut(&T, &mut dyn BufMut),
{
    let mut index_buffer = Vec::new();
    let mut value_buffer = Vec::new();
    let items_len = items.len();

    // Retain preimages for all intermediates.
    let path_nibbles = (0..items_len)
        .map(|i| {
            let i = adjust_index_for_rlp(i, items_len);
            index_buffer.clear();
            i.encode(&mut index_buffer);
            Nibbles::unpack(&index_buffer)
        })
        .collect::<Vec<_>>();

    let mut hb = HashBuilder::default().with_proof_retainer(ProofRetainer::new(path_nibbles));
    for i in 0..items_len {
        let index = adjust_index_for_rlp(i, items_len);

        index_buffer.clear();
        index.encode(&mut index_buffer);

        value_buffer.clear();
        encode(&items[index], &mut value_buffer);

        hb.add_leaf(Nibbles::unpack(&index_buffer), &value_buffer);
    }

    hb
}

/// Adjust the index of an item for rlp encoding.
const fn adjust_index_for_rlp(i: usize, len: usize) -> usize {
    if i > 0x7f {
        i
    } else if i == 0x7f || i + 1 == len {
        0
    } else {
        i + 1
    }
}
