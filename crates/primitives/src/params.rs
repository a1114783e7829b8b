//! Adapter parameters: the self-describing transaction-parameter blob a
//! sending application attaches to a message to size destination-chain
//! execution, with an optional native-currency airdrop.

use alloc::vec::Vec;
use alloy_primitives::{Address, Bytes, U256};
use thiserror::Error;

/// Encoded size of [AdapterParams::Standard]: type tag + extra gas.
const STANDARD_LEN: usize = 2 + 32;

/// Encoded size of [AdapterParams::NativeDrop]: type tag + extra gas +
/// airdrop amount + airdrop recipient.
const NATIVE_DROP_LEN: usize = 2 + 32 + 32 + 20;

/// Type tag of [AdapterParams::Standard].
const TX_TYPE_STANDARD: u16 = 1;

/// Type tag of [AdapterParams::NativeDrop].
const TX_TYPE_NATIVE_DROP: u16 = 2;

/// Decoded adapter parameters.
///
/// Two layouts exist on the wire, discriminated by a leading 16-bit type
/// tag and the exact blob length.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum AdapterParams {
    /// Type 1: extra destination gas on top of the configured base.
    Standard {
        /// Destination gas requested beyond the per-chain base gas.
        extra_gas: U256,
    },
    /// Type 2: extra gas plus a destination-native airdrop.
    NativeDrop {
        /// Destination gas requested beyond the per-chain base gas.
        extra_gas: U256,
        /// Amount of destination-native currency to drop.
        amount: U256,
        /// Destination recipient of the airdrop.
        recipient: Address,
    },
}

impl AdapterParams {
    /// Returns the wire type tag for this layout.
    pub const fn tx_type(&self) -> u16 {
        match self {
            Self::Standard { .. } => TX_TYPE_STANDARD,
            Self::NativeDrop { .. } => TX_TYPE_NATIVE_DROP,
        }
    }

    /// Returns the extra destination gas requested.
    pub const fn extra_gas(&self) -> U256 {
        match self {
            Self::Standard { extra_gas } | Self::NativeDrop { extra_gas, .. } => *extra_gas,
        }
    }

    /// Returns the requested airdrop amount, zero for [Self::Standard].
    pub const fn airdrop_amount(&self) -> U256 {
        match self {
            Self::Standard { .. } => U256::ZERO,
            Self::NativeDrop { amount, .. } => *amount,
        }
    }

    /// Encodes the parameters into their packed wire form.
    pub fn encode(&self) -> Bytes {
        let mut out = Vec::with_capacity(NATIVE_DROP_LEN);
        out.extend_from_slice(&self.tx_type().to_be_bytes());
        match self {
            Self::Standard { extra_gas } => {
                out.extend_from_slice(&extra_gas.to_be_bytes::<32>());
            }
            Self::NativeDrop { extra_gas, amount, recipient } => {
                out.extend_from_slice(&extra_gas.to_be_bytes::<32>());
                out.extend_from_slice(&amount.to_be_bytes::<32>());
                out.extend_from_slice(recipient.as_slice());
            }
        }
        out.into()
    }

    /// Decodes a parameter blob.
    ///
    /// The blob length must exactly match one of the two known layouts and
    /// the type tag must agree with the layout the length selects.
    pub fn decode(buf: &[u8]) -> Result<Self, AdapterParamsError> {
        let expected_type = match buf.len() {
            STANDARD_LEN => TX_TYPE_STANDARD,
            NATIVE_DROP_LEN => TX_TYPE_NATIVE_DROP,
            len => return Err(AdapterParamsError::MalformedParams { len }),
        };
        let tx_type = u16::from_be_bytes(buf[..2].try_into().expect("length checked"));
        if tx_type != expected_type {
            return Err(AdapterParamsError::UnsupportedTxType { tx_type });
        }

        let extra_gas = U256::from_be_slice(&buf[2..34]);
        match tx_type {
            TX_TYPE_STANDARD => Ok(Self::Standard { extra_gas }),
            _ => Ok(Self::NativeDrop {
                extra_gas,
                amount: U256::from_be_slice(&buf[34..66]),
                recipient: Address::from_slice(&buf[66..86]),
            }),
        }
    }
}

/// An error decoding an [AdapterParams] blob.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AdapterParamsError {
    /// The blob length matches neither known layout.
    #[error("malformed adapter params: {len} bytes")]
    MalformedParams {
        /// Length of the provided blob.
        len: usize,
    },
    /// The type tag does not name the layout the blob length selects.
    #[error("unsupported adapter params tx type: {tx_type}")]
    UnsupportedTxType {
        /// The tag found in the blob.
        tx_type: u16,
    },
}
