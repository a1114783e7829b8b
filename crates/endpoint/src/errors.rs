//! Errors for the `trellis-endpoint` crate.

use crate::traits::ReceiveError;
use alloy_primitives::Address;
use thiserror::Error;
use trellis_uln::{ConfigError, SendError};

/// An error mutating the library registry.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RegistryError {
    /// The caller is not the owner.
    #[error("caller is not the owner")]
    Unauthorized,
    /// The library has a zero identity.
    #[error("library address cannot be zero")]
    InvalidLibrary,
    /// The version counter would collide with the blocked sentinel.
    #[error("library version limit reached")]
    LibraryLimitReached,
}

/// An error updating a version selection.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum VersionError {
    /// The caller is not the owner.
    #[error("caller is not the owner")]
    Unauthorized,
    /// The version is zero, unregistered, or otherwise not selectable.
    #[error("invalid library version {0}")]
    InvalidVersion(u16),
}

/// An error resolving an application's effective library.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum RouteError {
    /// The resolved version is not a registered library.
    #[error("invalid library version")]
    InvalidVersion,
    /// The resolved version is the blocked sentinel; explicit migration is
    /// required before further activity.
    #[error("library version is blocked")]
    BlockedVersion,
}

/// An error aborting a routed send.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RouterSendError {
    /// The application's send library failed to resolve.
    #[error(transparent)]
    Route(#[from] RouteError),
    /// The library rejected the send.
    #[error(transparent)]
    Library(#[from] SendError),
}

/// An error routing a configuration call.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SetConfigError {
    /// The default version is frozen for migration; configuration through
    /// it is suspended.
    #[error("migration in progress: default version is blocked")]
    MigrationInProgress,
    /// The addressed version is unregistered or the blocked sentinel.
    #[error("invalid library version {0}")]
    InvalidVersion(u16),
    /// The library rejected the configuration change.
    #[error(transparent)]
    Config(#[from] ConfigError),
}

/// An error retrying a blocked payload.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RetryError {
    /// Nothing is stored for the channel.
    #[error("no stored payload")]
    NoStoredPayload,
    /// The supplied bytes do not match the stored record.
    #[error("payload mismatch")]
    PayloadMismatch,
    /// The destination application is not registered.
    #[error("unknown application {0}")]
    UnknownApplication(Address),
    /// A delivery to this application is already in progress.
    #[error("reentrant receive for {0}")]
    ReceiveReentrancy(Address),
    /// The callback failed again; the record stays blocked and may be
    /// retried any number of times.
    #[error("delivery failed again: {0}")]
    Receive(ReceiveError),
}

/// An error force-clearing a blocked payload.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ResumeError {
    /// Nothing is stored for the channel.
    #[error("no stored payload")]
    NoStoredPayload,
    /// Only the destination application named in the record may discard it.
    #[error("invalid caller")]
    InvalidCaller,
}
