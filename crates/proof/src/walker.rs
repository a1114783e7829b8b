//! Path retrieval over a set of trie node preimages.

use crate::{
    errors::{TrieWalkError, TrieWalkResult},
    node::{decode_path, unpack_nibbles, NodeElement, TrieNode},
};
use alloc::vec::Vec;
use alloy_primitives::{keccak256, Bytes, B256};
use alloy_rlp::Decodable;
use hashbrown::HashMap;

/// A keyed set of trie node preimages, as carried by an inclusion proof.
///
/// The proof is trust-free: nodes are looked up by their hash, so a proof
/// can only ever reproduce values actually committed to by the root.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProofNodeMap {
    nodes: HashMap<B256, Bytes>,
}

impl ProofNodeMap {
    /// Builds the map from raw node preimages.
    pub fn new(nodes: impl IntoIterator<Item = Bytes>) -> Self {
        Self { nodes: nodes.into_iter().map(|node| (keccak256(&node), node)).collect() }
    }

    /// Retrieves the value stored under `key` in the trie committed to by
    /// `root`, walking only the supplied preimages.
    pub fn retrieve(&self, root: B256, key: &[u8]) -> TrieWalkResult<Bytes> {
        let nibbles = unpack_nibbles(key);
        let mut path: &[u8] = &nibbles;
        let mut node = self.node_by_hash(root)?;

        loop {
            match node {
                TrieNode::Leaf { key, value } => {
                    return if decode_path(&key) == path {
                        Ok(value)
                    } else {
                        Err(TrieWalkError::KeyNotFound)
                    };
                }
                TrieNode::Extension { prefix, child } => {
                    let prefix = decode_path(&prefix);
                    let Some(rest) = path.strip_prefix(prefix.as_slice()) else {
                        return Err(TrieWalkError::KeyNotFound);
                    };
                    path = rest;
                    node = self.resolve(&child)?;
                }
                TrieNode::Branch { stack } => match path.split_first() {
                    None => {
                        return match stack.last() {
                            Some(NodeElement::String(value)) if !value.is_empty() => {
                                Ok(value.clone())
                            }
                            _ => Err(TrieWalkError::KeyNotFound),
                        };
                    }
                    Some((&nibble, rest)) => {
                        let element =
                            stack.get(nibble as usize).ok_or(TrieWalkError::InvalidNode)?;
                        node = self.resolve(element)?;
                        path = rest;
                    }
                },
            }
        }
    }

    /// Looks up and decodes the node with the given hash.
    fn node_by_hash(&self, hash: B256) -> TrieWalkResult<TrieNode> {
        let preimage =
            self.nodes.get(&hash).ok_or(TrieWalkError::MissingNode(hash))?;
        TrieNode::decode(&mut preimage.as_ref()).map_err(TrieWalkError::RlpError)
    }

    /// Follows a child reference: a 32-byte hash resolves through the node
    /// map, an inlined list decodes in place.
    fn resolve(&self, element: &NodeElement) -> TrieWalkResult<TrieNode> {
        match element {
            NodeElement::String(bytes) if bytes.len() == 32 => {
                self.node_by_hash(B256::from_slice(bytes))
            }
            NodeElement::List(_) => element.try_list_into_node(),
            NodeElement::EmptyString => Err(TrieWalkError::KeyNotFound),
            _ => Err(TrieWalkError::InvalidNode),
        }
    }

    /// The number of distinct preimages supplied.
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Returns true when no preimages were supplied.
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Consumes the map, returning the raw preimages.
    pub fn into_nodes(self) -> Vec<Bytes> {
        self.nodes.into_values().collect()
    }
}
