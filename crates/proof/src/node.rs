//! Merkle-Patricia trie node decoding.
//!
//! Only the node shapes needed to follow a single key path are modeled:
//! branch, leaf, and extension nodes, with child references that are either
//! a 32-byte hash or an inlined short node.

use crate::errors::{TrieWalkError, TrieWalkResult};
use alloc::vec::Vec;
use alloy_primitives::Bytes;
use alloy_rlp::{Buf, Decodable, EMPTY_LIST_CODE, EMPTY_STRING_CODE};

/// The length of the branch list when RLP encoded.
const BRANCH_LIST_LENGTH: usize = 17;

/// The length of a leaf or extension node's RLP encoded list.
const LEAF_OR_EXTENSION_LIST_LENGTH: usize = 2;

/// Prefix for even-nibbled extension node paths.
const PREFIX_EXTENSION_EVEN: u8 = 0;

/// Prefix for odd-nibbled extension node paths.
const PREFIX_EXTENSION_ODD: u8 = 1;

/// Prefix for even-nibbled leaf node paths.
const PREFIX_LEAF_EVEN: u8 = 2;

/// Prefix for odd-nibbled leaf node paths.
const PREFIX_LEAF_ODD: u8 = 3;

/// A node within a standard Merkle-Patricia trie.
#[derive(Debug, Clone, Eq, PartialEq)]
pub enum TrieNode {
    /// A branch node refers to up to 16 child nodes and a value, with the
    /// encoding `rlp([ v0, ..., v15, value ])`.
    Branch {
        /// The 16 child elements and trailing value element.
        stack: Vec<NodeElement>,
    },
    /// A leaf node is a 2-item node with the encoding
    /// `rlp([encoded_path, value])`.
    Leaf {
        /// The compact-encoded remainder of the key.
        key: Bytes,
        /// The value stored at the key.
        value: Bytes,
    },
    /// An extension node is a 2-item pointer node with the encoding
    /// `rlp([encoded_path, child])`.
    Extension {
        /// The compact-encoded shared path prefix.
        prefix: Bytes,
        /// The pointer to the child node.
        child: NodeElement,
    },
}

impl TrieNode {
    /// Attempts to classify a 2-item `(path, value)` pair as a
    /// [TrieNode::Leaf] or [TrieNode::Extension] from the path's prefix
    /// nibble.
    pub fn try_from_path_and_value(path: Bytes, value: NodeElement) -> TrieWalkResult<Self> {
        if path.is_empty() {
            return Err(TrieWalkError::InvalidNode);
        }
        match path[0] >> 4 {
            PREFIX_EXTENSION_EVEN | PREFIX_EXTENSION_ODD => {
                Ok(Self::Extension { prefix: path, child: value })
            }
            PREFIX_LEAF_EVEN | PREFIX_LEAF_ODD => {
                let NodeElement::String(value) = value else {
                    return Err(TrieWalkError::InvalidNode);
                };
                Ok(Self::Leaf { key: path, value })
            }
            _ => Err(TrieWalkError::InvalidNode),
        }
    }
}

impl Decodable for TrieNode {
    fn decode(buf: &mut &[u8]) -> alloy_rlp::Result<Self> {
        let mut list = Vec::<NodeElement>::decode(buf)?;

        match list.len() {
            BRANCH_LIST_LENGTH => Ok(Self::Branch { stack: list }),
            LEAF_OR_EXTENSION_LIST_LENGTH => {
                let value = list.pop().expect("length checked");
                let Some(NodeElement::String(path)) = list.pop() else {
                    return Err(alloy_rlp::Error::UnexpectedList);
                };
                Self::try_from_path_and_value(path, value)
                    .map_err(|_| alloy_rlp::Error::UnexpectedList)
            }
            _ => Err(alloy_rlp::Error::UnexpectedLength),
        }
    }
}

/// An element within a trie node's RLP array.
#[derive(Debug, Clone, Eq, PartialEq)]
pub enum NodeElement {
    /// An RLP string: a hashed child reference (32 bytes) or a stored value.
    String(Bytes),
    /// An empty RLP string (`0x80`): no child / no value.
    EmptyString,
    /// An RLP list: an inlined short node.
    List(Vec<Bytes>),
    /// An empty RLP list (`0xC0`).
    EmptyList,
}

impl NodeElement {
    /// Attempts to convert an inlined [NodeElement::List] into a
    /// [TrieNode::Leaf] or [TrieNode::Extension].
    pub fn try_list_into_node(&self) -> TrieWalkResult<TrieNode> {
        let Self::List(list) = self else {
            return Err(TrieWalkError::InvalidNode);
        };
        if list.len() != LEAF_OR_EXTENSION_LIST_LENGTH {
            return Err(TrieWalkError::InvalidNode);
        }
        TrieNode::try_from_path_and_value(
            list[0].clone(),
            NodeElement::String(list[1].clone()),
        )
    }
}

impl Decodable for NodeElement {
    fn decode(buf: &mut &[u8]) -> alloy_rlp::Result<Self> {
        let Some(&prefix) = buf.first() else {
            return Err(alloy_rlp::Error::InputTooShort);
        };
        match prefix {
            EMPTY_STRING_CODE => {
                buf.advance(1);
                Ok(Self::EmptyString)
            }
            EMPTY_LIST_CODE => {
                buf.advance(1);
                Ok(Self::EmptyList)
            }
            p if p < EMPTY_LIST_CODE => Ok(Self::String(Bytes::decode(buf)?)),
            _ => Ok(Self::List(Vec::<Bytes>::decode(buf)?)),
        }
    }
}

/// Unpacks bytes into their nibble sequence.
pub(crate) fn unpack_nibbles(bytes: &[u8]) -> Vec<u8> {
    let mut nibbles = Vec::with_capacity(bytes.len() * 2);
    for byte in bytes {
        nibbles.push(byte >> 4);
        nibbles.push(byte & 0x0F);
    }
    nibbles
}

/// Decodes a compact-encoded leaf/extension path into its nibble sequence,
/// dropping the flag nibble (and, for even paths, its padding nibble).
pub(crate) fn decode_path(encoded: &[u8]) -> Vec<u8> {
    let mut nibbles = unpack_nibbles(encoded);
    let skip = if nibbles.first().is_some_and(|flag| flag & 1 == 1) { 1 } else { 2 };
    nibbles.drain(..skip.min(nibbles.len()));
    nibbles
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloc::vec;
    use alloy_rlp::Encodable;

    #[test]
    fn decode_leaf_node() {
        // rlp([compact_path, value]) with a leaf flag nibble.
        let mut out = alloc::vec::Vec::new();
        let items: Vec<Bytes> = vec![vec![0x20, 0x01, 0x02].into(), vec![0xaa, 0xbb].into()];
        items.encode(&mut out);
        let node = TrieNode::decode(&mut out.as_slice()).unwrap();
        assert_eq!(
            node,
            TrieNode::Leaf { key: vec![0x20, 0x01, 0x02].into(), value: vec![0xaa, 0xbb].into() }
        );
    }

    #[test]
    fn path_nibbles_respect_parity_flag() {
        // Even leaf path: flag byte 0x20, then full bytes.
        assert_eq!(decode_path(&[0x20, 0x12]), vec![1, 2]);
        // Odd leaf path: flag nibble 3 carries the first path nibble.
        assert_eq!(decode_path(&[0x31, 0x23]), vec![1, 2, 3]);
        // Odd extension path.
        assert_eq!(decode_path(&[0x1a]), vec![0xa]);
    }
}
