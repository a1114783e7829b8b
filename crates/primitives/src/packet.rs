//! The outbound packet: the canonical record of a cross-chain message,
//! emitted by the sending library and reconstructed on the destination
//! chain from an inclusion proof.

use crate::{ChainId, Nonce};
use alloc::vec::Vec;
use alloy_primitives::{keccak256, Bytes, B256};
use thiserror::Error;

/// Minimum encoded packet size: nonce + source chain + destination chain +
/// destination address, with an empty source address and payload.
const PACKET_MIN_LEN: usize = 8 + 2 + 2 + 20;

/// Returns the log topic under which outbound packets are emitted.
///
/// Off-chain infrastructure filters receipts for this topic; the inbound
/// proof validator requires it on the proven log.
pub fn packet_topic() -> B256 {
    keccak256(b"Packet(bytes)")
}

/// A cross-chain message packet.
///
/// Both addresses are variable-width on the wire; each side reads them at
/// the widths its chain configuration prescribes.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Packet {
    /// Outbound nonce assigned by the source router for the
    /// (source application, destination chain) channel.
    pub nonce: Nonce,
    /// Chain the packet was sent from.
    pub src_chain: ChainId,
    /// Sending application, in the source chain's address width.
    pub src_address: Bytes,
    /// Chain the packet is addressed to.
    pub dst_chain: ChainId,
    /// Receiving application, in the destination chain's address width.
    /// Inbound decoding always reads the local 20-byte width.
    pub dst_address: Bytes,
    /// Opaque application payload.
    pub payload: Bytes,
}

impl Packet {
    /// Encodes the packet into its wire form:
    /// `nonce (8) || src_chain (2) || src_address || dst_chain (2) ||
    /// dst_address (20) || payload`, all integers big-endian.
    pub fn encode(&self) -> Bytes {
        let mut out = Vec::with_capacity(PACKET_MIN_LEN + self.src_address.len() + self.payload.len());
        out.extend_from_slice(&self.nonce.to_be_bytes());
        out.extend_from_slice(&self.src_chain.to_be_bytes());
        out.extend_from_slice(&self.src_address);
        out.extend_from_slice(&self.dst_chain.to_be_bytes());
        out.extend_from_slice(&self.dst_address);
        out.extend_from_slice(&self.payload);
        out.into()
    }

    /// Decodes a packet from its wire form.
    ///
    /// The source address width is not self-describing, so the caller must
    /// supply the address size configured for the source chain.
    pub fn decode(buf: &[u8], src_address_size: usize) -> Result<Self, PacketDecodeError> {
        let min = PACKET_MIN_LEN + src_address_size;
        if buf.len() < min {
            return Err(PacketDecodeError::Truncated { len: buf.len(), min });
        }

        let (nonce, rest) = buf.split_at(8);
        let (src_chain, rest) = rest.split_at(2);
        let (src_address, rest) = rest.split_at(src_address_size);
        let (dst_chain, rest) = rest.split_at(2);
        let (dst_address, payload) = rest.split_at(20);

        Ok(Self {
            nonce: u64::from_be_bytes(nonce.try_into().expect("split at 8")),
            src_chain: u16::from_be_bytes(src_chain.try_into().expect("split at 2")),
            src_address: Bytes::copy_from_slice(src_address),
            dst_chain: u16::from_be_bytes(dst_chain.try_into().expect("split at 2")),
            dst_address: Bytes::copy_from_slice(dst_address),
            payload: Bytes::copy_from_slice(payload),
        })
    }
}

/// An error decoding a [Packet] from its wire form.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PacketDecodeError {
    /// The buffer is shorter than the fixed-width fields require.
    #[error("packet truncated: {len} bytes, expected at least {min}")]
    Truncated {
        /// Length of the provided buffer.
        len: usize,
        /// Minimum length for the configured source address size.
        min: usize,
    },
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloc::vec;
    use alloy_primitives::address;

    fn test_packet() -> Packet {
        Packet {
            nonce: 7,
            src_chain: 1,
            src_address: Bytes::copy_from_slice(address!("2a07706473244bc757e10f2a9e86fb532828afe3").as_slice()),
            dst_chain: 2,
            dst_address: Bytes::copy_from_slice(
                address!("00000000000000000000000000000000000000fe").as_slice(),
            ),
            payload: vec![0x12, 0x34].into(),
        }
    }

    #[test]
    fn roundtrip_matches_field_layout() {
        let packet = test_packet();
        let encoded = packet.encode();
        assert_eq!(&encoded[..8], 7u64.to_be_bytes());
        assert_eq!(&encoded[8..10], 1u16.to_be_bytes());
        assert_eq!(Packet::decode(&encoded, 20).unwrap(), packet);
    }

    #[test]
    fn decode_rejects_short_buffer() {
        let packet = test_packet();
        let encoded = packet.encode();
        // Stripping the payload still decodes; stripping into the fixed
        // fields does not.
        assert!(Packet::decode(&encoded[..encoded.len() - 2], 20).is_ok());
        assert!(matches!(
            Packet::decode(&encoded[..PACKET_MIN_LEN + 19], 20),
            Err(PacketDecodeError::Truncated { .. })
        ));
    }

    #[test]
    fn empty_source_address_width() {
        // A zero address size is never configured, but the codec itself is
        // width-agnostic.
        let encoded = test_packet().encode();
        let decoded = Packet::decode(&encoded, 0).unwrap();
        assert_eq!(decoded.src_address.len(), 0);
    }
}
