//! Messaging-library version selection.
//!
//! Raw versions are 16-bit with two reserved values: `0` inherits the
//! router default, and `u16::MAX` is the blocked sentinel used to freeze a
//! selection during migrations. [VersionSelector] models the three cases as
//! a tagged enum so resolution is an explicit `match` rather than numeric
//! comparison.

/// Raw version value meaning "use the configured default".
pub const DEFAULT_VERSION: u16 = 0;

/// Raw version sentinel disabling sending/receiving for anyone pinned to it.
pub const BLOCKED_VERSION: u16 = u16::MAX;

/// A send or receive library selection for one application.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum VersionSelector {
    /// Inherit the router's default version.
    #[default]
    Default,
    /// Pin a specific registered version.
    Explicit(u16),
    /// Frozen: all activity through this selection fails until re-pinned.
    Blocked,
}

impl VersionSelector {
    /// Interprets a raw 16-bit version value.
    pub const fn from_raw(raw: u16) -> Self {
        match raw {
            DEFAULT_VERSION => Self::Default,
            BLOCKED_VERSION => Self::Blocked,
            v => Self::Explicit(v),
        }
    }

    /// Returns the raw wire value of this selection.
    pub const fn raw(&self) -> u16 {
        match self {
            Self::Default => DEFAULT_VERSION,
            Self::Explicit(v) => *v,
            Self::Blocked => BLOCKED_VERSION,
        }
    }
}
