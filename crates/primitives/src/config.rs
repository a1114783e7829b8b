//! Per-application messaging configuration.
//!
//! Each (remote chain, local application) pair resolves to an [AppConfig].
//! Fields start unset, inherit the chain default, and may be individually
//! overridden; writing a field's zero sentinel reverts just that field to
//! the default.

use crate::{ChainId, ProofType};
use alloy_primitives::Address;

/// Fully resolved configuration for one application on one remote chain.
///
/// Also the shape of a chain's default configuration, where every field is
/// required to be set and non-zero.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct AppConfig {
    /// 1-indexed inbound proof library version for the remote chain.
    pub inbound_proof_library_version: u16,
    /// Block confirmations required on an attested source block before
    /// inbound proofs against it are accepted.
    pub inbound_confirmations: u64,
    /// The only identity allowed to submit inbound proofs.
    pub relayer: Address,
    /// Proof type requested for outbound messages.
    pub outbound_proof_type: ProofType,
    /// Confirmations the attestation provider is asked to wait for on
    /// outbound messages.
    pub outbound_confirmations: u64,
    /// Attestation provider trusted for this application.
    pub oracle: Address,
}

/// Per-field overrides an application has explicitly set for one remote
/// chain. `None` inherits the chain default.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct AppConfigOverrides {
    /// Override of [AppConfig::inbound_proof_library_version].
    pub inbound_proof_library_version: Option<u16>,
    /// Override of [AppConfig::inbound_confirmations].
    pub inbound_confirmations: Option<u64>,
    /// Override of [AppConfig::relayer].
    pub relayer: Option<Address>,
    /// Override of [AppConfig::outbound_proof_type].
    pub outbound_proof_type: Option<ProofType>,
    /// Override of [AppConfig::outbound_confirmations].
    pub outbound_confirmations: Option<u64>,
    /// Override of [AppConfig::oracle].
    pub oracle: Option<Address>,
}

impl AppConfigOverrides {
    /// Returns true when no field is overridden.
    pub const fn is_empty(&self) -> bool {
        self.inbound_proof_library_version.is_none()
            && self.inbound_confirmations.is_none()
            && self.relayer.is_none()
            && self.outbound_proof_type.is_none()
            && self.outbound_confirmations.is_none()
            && self.oracle.is_none()
    }

    /// Resolves the effective configuration: overrides over the chain
    /// default.
    pub fn resolve(&self, default: &AppConfig) -> AppConfig {
        AppConfig {
            inbound_proof_library_version: self
                .inbound_proof_library_version
                .unwrap_or(default.inbound_proof_library_version),
            inbound_confirmations: self
                .inbound_confirmations
                .unwrap_or(default.inbound_confirmations),
            relayer: self.relayer.unwrap_or(default.relayer),
            outbound_proof_type: self
                .outbound_proof_type
                .unwrap_or(default.outbound_proof_type),
            outbound_confirmations: self
                .outbound_confirmations
                .unwrap_or(default.outbound_confirmations),
            oracle: self.oracle.unwrap_or(default.oracle),
        }
    }

    /// Applies a single-field update. A zero/empty value clears the
    /// override, reverting the field to the chain default.
    pub fn apply(&mut self, update: ConfigUpdate) {
        match update {
            ConfigUpdate::InboundProofLibraryVersion(v) => {
                self.inbound_proof_library_version = (v != 0).then_some(v);
            }
            ConfigUpdate::InboundConfirmations(c) => {
                self.inbound_confirmations = (c != 0).then_some(c);
            }
            ConfigUpdate::Relayer(a) => {
                self.relayer = (!a.is_zero()).then_some(a);
            }
            ConfigUpdate::OutboundProofType(t) => {
                self.outbound_proof_type = (t != 0).then_some(t);
            }
            ConfigUpdate::OutboundConfirmations(c) => {
                self.outbound_confirmations = (c != 0).then_some(c);
            }
            ConfigUpdate::Oracle(a) => {
                self.oracle = (!a.is_zero()).then_some(a);
            }
        }
    }
}

/// A single-field configuration update for one (chain, application) pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum ConfigUpdate {
    /// Set (or, with 0, reset) the inbound proof library version.
    InboundProofLibraryVersion(u16),
    /// Set (or, with 0, reset) the inbound confirmation threshold.
    InboundConfirmations(u64),
    /// Set (or, with the zero address, reset) the relayer.
    Relayer(Address),
    /// Set (or, with 0, reset) the outbound proof type.
    OutboundProofType(ProofType),
    /// Set (or, with 0, reset) the outbound confirmation threshold.
    OutboundConfirmations(u64),
    /// Set (or, with the zero address, reset) the attestation provider.
    Oracle(Address),
}

impl ConfigUpdate {
    /// The chain this update is scoped to is carried alongside; this names
    /// the field for diagnostics.
    pub const fn field(&self) -> &'static str {
        match self {
            Self::InboundProofLibraryVersion(_) => "inbound_proof_library_version",
            Self::InboundConfirmations(_) => "inbound_confirmations",
            Self::Relayer(_) => "relayer",
            Self::OutboundProofType(_) => "outbound_proof_type",
            Self::OutboundConfirmations(_) => "outbound_confirmations",
            Self::Oracle(_) => "oracle",
        }
    }

    /// Returns true when the carried value is the zero sentinel, i.e. the
    /// update clears the field back to the chain default.
    pub fn is_reset(&self) -> bool {
        match self {
            Self::InboundProofLibraryVersion(v) | Self::OutboundProofType(v) => *v == 0,
            Self::InboundConfirmations(c) | Self::OutboundConfirmations(c) => *c == 0,
            Self::Relayer(a) | Self::Oracle(a) => a.is_zero(),
        }
    }
}
