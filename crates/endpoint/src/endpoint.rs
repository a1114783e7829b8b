//! The endpoint's registry, version selection, and send routing.

use crate::{
    deliver::StoredPayload,
    errors::{RegistryError, RouteError, RouterSendError, SetConfigError, VersionError},
    traits::{Clock, MessageReceiver},
};
use alloc::{sync::Arc, vec::Vec};
use alloy_primitives::{Address, Bytes, U256};
use hashbrown::{HashMap, HashSet};
use spin::{Mutex, RwLock};
use trellis_primitives::{
    AppConfig, ChainId, ConfigUpdate, Nonce, Packet, VersionSelector, BLOCKED_VERSION,
    DEFAULT_VERSION,
};
use trellis_uln::{MessageLibrary, SendContext};

/// An application's send/receive version pins. Mutating one never affects
/// the other.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub(crate) struct UaVersions {
    pub(crate) send: VersionSelector,
    pub(crate) receive: VersionSelector,
}

/// The per-chain router.
///
/// Registered libraries are append-only and 1-indexed; an application's
/// traffic goes through its pinned version or, by default, the owner-set
/// default version. The blocked sentinel freezes whatever selection
/// resolves to it, which is how versions are retired.
#[derive(Debug)]
pub struct Endpoint {
    owner: Address,
    pub(crate) clock: Arc<dyn Clock>,
    libraries: RwLock<Vec<Arc<dyn MessageLibrary>>>,
    default_send_version: RwLock<u16>,
    default_receive_version: RwLock<u16>,
    selections: RwLock<HashMap<Address, UaVersions>>,
    pub(crate) receivers: RwLock<HashMap<Address, Arc<dyn MessageReceiver>>>,
    outbound_nonces: RwLock<HashMap<(ChainId, Address), Nonce>>,
    pub(crate) inbound_nonces: RwLock<HashMap<(ChainId, Bytes), Nonce>>,
    pub(crate) stored_payloads: RwLock<HashMap<(ChainId, Bytes), StoredPayload>>,
    pub(crate) receiving: Mutex<HashSet<Address>>,
}

impl Endpoint {
    /// Creates a router with an empty registry. Default versions are unset
    /// until the owner picks one.
    pub fn new(owner: Address, clock: Arc<dyn Clock>) -> Self {
        Self {
            owner,
            clock,
            libraries: RwLock::new(Vec::new()),
            default_send_version: RwLock::new(DEFAULT_VERSION),
            default_receive_version: RwLock::new(DEFAULT_VERSION),
            selections: RwLock::new(HashMap::new()),
            receivers: RwLock::new(HashMap::new()),
            outbound_nonces: RwLock::new(HashMap::new()),
            inbound_nonces: RwLock::new(HashMap::new()),
            stored_payloads: RwLock::new(HashMap::new()),
            receiving: Mutex::new(HashSet::new()),
        }
    }

    /// Appends a new library version and returns it.
    pub fn register_library(
        &self,
        caller: Address,
        library: Arc<dyn MessageLibrary>,
    ) -> Result<u16, RegistryError> {
        if caller != self.owner {
            return Err(RegistryError::Unauthorized);
        }
        if library.address().is_zero() {
            return Err(RegistryError::InvalidLibrary);
        }
        let mut libraries = self.libraries.write();
        // The next version must stay clear of the blocked sentinel.
        if libraries.len() + 1 >= usize::from(BLOCKED_VERSION) {
            return Err(RegistryError::LibraryLimitReached);
        }
        libraries.push(library);
        let version = libraries.len() as u16;
        tracing::info!(target: "endpoint", version, "library version registered");
        Ok(version)
    }

    /// The highest registered version, zero when the registry is empty.
    pub fn latest_version(&self) -> u16 {
        self.libraries.read().len() as u16
    }

    fn validate_selectable(&self, version: u16) -> Result<(), VersionError> {
        if version == DEFAULT_VERSION
            || (version != BLOCKED_VERSION && version > self.latest_version())
        {
            return Err(VersionError::InvalidVersion(version));
        }
        Ok(())
    }

    /// Sets the default send version: any registered version, or the
    /// blocked sentinel to freeze every application still on default.
    pub fn set_default_send_version(&self, caller: Address, version: u16) -> Result<(), VersionError> {
        if caller != self.owner {
            return Err(VersionError::Unauthorized);
        }
        self.validate_selectable(version)?;
        *self.default_send_version.write() = version;
        tracing::info!(target: "endpoint", version, "default send version set");
        Ok(())
    }

    /// Sets the default receive version.
    pub fn set_default_receive_version(
        &self,
        caller: Address,
        version: u16,
    ) -> Result<(), VersionError> {
        if caller != self.owner {
            return Err(VersionError::Unauthorized);
        }
        self.validate_selectable(version)?;
        *self.default_receive_version.write() = version;
        tracing::info!(target: "endpoint", version, "default receive version set");
        Ok(())
    }

    /// Pins the calling application's send version; zero resets to
    /// default.
    pub fn set_send_version(&self, application: Address, version: u16) -> Result<(), VersionError> {
        let selector = self.selector_for(version)?;
        self.selections.write().entry(application).or_default().send = selector;
        tracing::debug!(target: "endpoint", %application, version, "send version pinned");
        Ok(())
    }

    /// Pins the calling application's receive version; zero resets to
    /// default.
    pub fn set_receive_version(
        &self,
        application: Address,
        version: u16,
    ) -> Result<(), VersionError> {
        let selector = self.selector_for(version)?;
        self.selections.write().entry(application).or_default().receive = selector;
        tracing::debug!(target: "endpoint", %application, version, "receive version pinned");
        Ok(())
    }

    fn selector_for(&self, version: u16) -> Result<VersionSelector, VersionError> {
        let selector = VersionSelector::from_raw(version);
        if let VersionSelector::Explicit(v) = selector {
            if v > self.latest_version() {
                return Err(VersionError::InvalidVersion(v));
            }
        }
        Ok(selector)
    }

    /// Registers the receiving half of an application under its identity.
    pub fn register_receiver(&self, application: Address, receiver: Arc<dyn MessageReceiver>) {
        self.receivers.write().insert(application, receiver);
    }

    /// Resolves the library an application's sends go through.
    pub fn get_send_library(
        &self,
        application: Address,
    ) -> Result<Arc<dyn MessageLibrary>, RouteError> {
        let selector =
            self.selections.read().get(&application).map(|v| v.send).unwrap_or_default();
        self.resolve(selector, *self.default_send_version.read())
    }

    /// Resolves the library an application's receives go through.
    pub fn get_receive_library(
        &self,
        application: Address,
    ) -> Result<Arc<dyn MessageLibrary>, RouteError> {
        let selector =
            self.selections.read().get(&application).map(|v| v.receive).unwrap_or_default();
        self.resolve(selector, *self.default_receive_version.read())
    }

    fn resolve(
        &self,
        selector: VersionSelector,
        default_version: u16,
    ) -> Result<Arc<dyn MessageLibrary>, RouteError> {
        let version = match selector {
            VersionSelector::Blocked => return Err(RouteError::BlockedVersion),
            VersionSelector::Explicit(v) => v,
            VersionSelector::Default => match VersionSelector::from_raw(default_version) {
                VersionSelector::Blocked => return Err(RouteError::BlockedVersion),
                VersionSelector::Explicit(v) => v,
                // No default has been configured yet.
                VersionSelector::Default => return Err(RouteError::InvalidVersion),
            },
        };
        self.libraries
            .read()
            .get(usize::from(version) - 1)
            .cloned()
            .ok_or(RouteError::InvalidVersion)
    }

    /// Sends a message through the calling application's send library.
    ///
    /// The outbound nonce for the (application, destination chain) channel
    /// is assigned strictly in call order and committed only if the
    /// library accepts the send.
    #[allow(clippy::too_many_arguments)]
    pub fn send(
        &self,
        ctx: &SendContext,
        dst_chain: ChainId,
        dst_address: &[u8],
        payload: Bytes,
        refund_address: Address,
        fee_payment_address: Address,
        adapter_params: &[u8],
    ) -> Result<Packet, RouterSendError> {
        let application = ctx.sender;
        let library = self.get_send_library(application)?;

        let key = (dst_chain, application);
        let nonce = self.outbound_nonces.read().get(&key).copied().unwrap_or_default() + 1;

        let packet = library.send(
            ctx,
            application,
            nonce,
            dst_chain,
            dst_address,
            payload,
            refund_address,
            fee_payment_address,
            adapter_params,
        )?;

        // Commit only after the library accepted: a failed send leaves no
        // trace.
        self.outbound_nonces.write().insert(key, nonce);
        tracing::info!(target: "endpoint", %application, dst_chain, nonce, "message sent");
        Ok(packet)
    }

    /// Quotes a send through the application's send library.
    pub fn estimate_fees(
        &self,
        application: Address,
        dst_chain: ChainId,
        payload_len: usize,
        pay_in_fee_token: bool,
        adapter_params: &[u8],
    ) -> Result<(U256, U256), RouterSendError> {
        let library = self.get_send_library(application)?;
        Ok(library.estimate_fees(
            application,
            dst_chain,
            payload_len,
            pay_in_fee_token,
            adapter_params,
        )?)
    }

    /// Routes a configuration update to a specific library version, or to
    /// the default version when `version` is zero.
    ///
    /// While the default is frozen for migration, only configuration
    /// scoped to an explicitly named version remains possible.
    pub fn set_config(
        &self,
        application: Address,
        version: u16,
        chain: ChainId,
        update: ConfigUpdate,
    ) -> Result<(), SetConfigError> {
        let library = self.config_library(version)?;
        library.set_app_config(application, chain, update)?;
        Ok(())
    }

    /// Reads an application's resolved configuration from a library
    /// version (zero for the default version).
    pub fn get_config(
        &self,
        application: Address,
        version: u16,
        chain: ChainId,
    ) -> Result<AppConfig, SetConfigError> {
        Ok(self.config_library(version)?.app_config(chain, application)?)
    }

    fn config_library(&self, version: u16) -> Result<Arc<dyn MessageLibrary>, SetConfigError> {
        let version = match VersionSelector::from_raw(version) {
            VersionSelector::Blocked => return Err(SetConfigError::InvalidVersion(version)),
            VersionSelector::Explicit(v) => {
                if v > self.latest_version() {
                    return Err(SetConfigError::InvalidVersion(v));
                }
                v
            }
            VersionSelector::Default => {
                let default = *self.default_send_version.read();
                match VersionSelector::from_raw(default) {
                    VersionSelector::Blocked => return Err(SetConfigError::MigrationInProgress),
                    VersionSelector::Explicit(v) => v,
                    VersionSelector::Default => {
                        return Err(SetConfigError::InvalidVersion(DEFAULT_VERSION))
                    }
                }
            }
        };
        self.libraries
            .read()
            .get(usize::from(version) - 1)
            .cloned()
            .ok_or(SetConfigError::InvalidVersion(version))
    }

    /// The last outbound nonce assigned on a channel.
    pub fn outbound_nonce(&self, dst_chain: ChainId, application: Address) -> Nonce {
        self.outbound_nonces.read().get(&(dst_chain, application)).copied().unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::FixedClock;
    use alloy_primitives::address;
    use trellis_uln::SendError;

    const OWNER: Address = address!("00000000000000000000000000000000000000a0");
    const APP: Address = address!("00000000000000000000000000000000000000c1");

    /// A registry-only library stub: accepts every call, sends nothing.
    #[derive(Debug)]
    struct StubLibrary(Address);

    impl MessageLibrary for StubLibrary {
        fn address(&self) -> Address {
            self.0
        }

        fn send(
            &self,
            _ctx: &SendContext,
            _application: Address,
            nonce: Nonce,
            dst_chain: ChainId,
            dst_address: &[u8],
            payload: Bytes,
            _refund_address: Address,
            _fee_payment_address: Address,
            _adapter_params: &[u8],
        ) -> Result<Packet, SendError> {
            Ok(Packet {
                nonce,
                src_chain: 1,
                src_address: Bytes::new(),
                dst_chain,
                dst_address: Bytes::copy_from_slice(dst_address),
                payload,
            })
        }

        fn estimate_fees(
            &self,
            _application: Address,
            _dst_chain: ChainId,
            _payload_len: usize,
            _pay_in_fee_token: bool,
            _adapter_params: &[u8],
        ) -> Result<(U256, U256), SendError> {
            Ok((U256::ZERO, U256::ZERO))
        }

        fn set_app_config(
            &self,
            _application: Address,
            _chain: ChainId,
            _update: ConfigUpdate,
        ) -> Result<(), trellis_uln::ConfigError> {
            Ok(())
        }

        fn app_config(
            &self,
            chain: ChainId,
            _application: Address,
        ) -> Result<AppConfig, trellis_uln::ConfigError> {
            Err(trellis_uln::ConfigError::NotConfigured(chain))
        }
    }

    fn endpoint() -> Endpoint {
        Endpoint::new(OWNER, Arc::new(FixedClock::new(1_700_000_000)))
    }

    fn with_library() -> Endpoint {
        let endpoint = endpoint();
        endpoint
            .register_library(
                OWNER,
                Arc::new(StubLibrary(address!("00000000000000000000000000000000000000e1"))),
            )
            .unwrap();
        endpoint.set_default_send_version(OWNER, 1).unwrap();
        endpoint.set_default_receive_version(OWNER, 1).unwrap();
        endpoint
    }

    #[test]
    fn registry_is_append_only_and_owner_gated() {
        let endpoint = endpoint();
        assert_eq!(
            endpoint.register_library(
                APP,
                Arc::new(StubLibrary(address!("00000000000000000000000000000000000000e1")))
            ),
            Err(RegistryError::Unauthorized)
        );
        assert_eq!(
            endpoint.register_library(OWNER, Arc::new(StubLibrary(Address::ZERO))),
            Err(RegistryError::InvalidLibrary)
        );

        let v1 = endpoint
            .register_library(
                OWNER,
                Arc::new(StubLibrary(address!("00000000000000000000000000000000000000e1"))),
            )
            .unwrap();
        let v2 = endpoint
            .register_library(
                OWNER,
                Arc::new(StubLibrary(address!("00000000000000000000000000000000000000e2"))),
            )
            .unwrap();
        assert_eq!((v1, v2), (1, 2));
        assert_eq!(endpoint.latest_version(), 2);
    }

    #[test]
    fn default_version_bounds() {
        let endpoint = with_library();
        assert_eq!(
            endpoint.set_default_send_version(OWNER, 0),
            Err(VersionError::InvalidVersion(0))
        );
        assert_eq!(
            endpoint.set_default_send_version(OWNER, 2),
            Err(VersionError::InvalidVersion(2))
        );
        assert_eq!(
            endpoint.set_default_send_version(APP, 1),
            Err(VersionError::Unauthorized)
        );
        // The blocked sentinel is how a default gets retired.
        endpoint.set_default_send_version(OWNER, BLOCKED_VERSION).unwrap();
    }

    #[test]
    fn unset_default_does_not_resolve() {
        let endpoint = endpoint();
        endpoint
            .register_library(
                OWNER,
                Arc::new(StubLibrary(address!("00000000000000000000000000000000000000e1"))),
            )
            .unwrap();
        assert!(matches!(
            endpoint.get_send_library(APP),
            Err(RouteError::InvalidVersion)
        ));
    }

    #[test]
    fn per_app_pins_and_resets() {
        let endpoint = with_library();
        assert_eq!(endpoint.set_send_version(APP, 2), Err(VersionError::InvalidVersion(2)));

        endpoint.set_send_version(APP, 1).unwrap();
        assert_eq!(
            endpoint.get_send_library(APP).unwrap().address(),
            address!("00000000000000000000000000000000000000e1")
        );

        // Blocking the default freezes default-pinned apps, not explicit
        // pins; one selection never affects the other.
        endpoint.set_default_send_version(OWNER, BLOCKED_VERSION).unwrap();
        assert!(endpoint.get_send_library(APP).is_ok());
        assert!(endpoint.get_receive_library(APP).is_ok());

        // Reset to default: now frozen.
        endpoint.set_send_version(APP, 0).unwrap();
        assert!(matches!(endpoint.get_send_library(APP), Err(RouteError::BlockedVersion)));
    }

    #[test]
    fn blocked_pin_freezes_a_single_app() {
        let endpoint = with_library();
        endpoint.set_send_version(APP, BLOCKED_VERSION).unwrap();
        assert!(matches!(endpoint.get_send_library(APP), Err(RouteError::BlockedVersion)));
        // Other applications are untouched.
        let other = address!("00000000000000000000000000000000000000c2");
        assert!(endpoint.get_send_library(other).is_ok());
    }

    #[test]
    fn send_assigns_nonces_in_call_order() {
        let endpoint = with_library();
        let ctx = SendContext::with_value(APP, U256::ZERO);
        let dst = [0xFE; 20];

        let first = endpoint
            .send(&ctx, 2, &dst, Bytes::from_static(&[1]), Address::ZERO, Address::ZERO, &[])
            .unwrap();
        let second = endpoint
            .send(&ctx, 2, &dst, Bytes::from_static(&[2]), Address::ZERO, Address::ZERO, &[])
            .unwrap();
        assert_eq!((first.nonce, second.nonce), (1, 2));
        assert_eq!(endpoint.outbound_nonce(2, APP), 2);

        // Channels are per destination chain.
        let elsewhere = endpoint
            .send(&ctx, 3, &dst, Bytes::from_static(&[3]), Address::ZERO, Address::ZERO, &[])
            .unwrap();
        assert_eq!(elsewhere.nonce, 1);
    }

    #[test]
    fn blocked_default_blocks_send_and_config() {
        let endpoint = with_library();
        endpoint.set_default_send_version(OWNER, BLOCKED_VERSION).unwrap();

        let ctx = SendContext::with_value(APP, U256::ZERO);
        assert_eq!(
            endpoint
                .send(&ctx, 2, &[0xFE; 20], Bytes::new(), Address::ZERO, Address::ZERO, &[])
                .unwrap_err(),
            RouterSendError::Route(RouteError::BlockedVersion)
        );

        // Config through the frozen default is suspended...
        assert_eq!(
            endpoint.set_config(APP, 0, 2, ConfigUpdate::InboundConfirmations(4)),
            Err(SetConfigError::MigrationInProgress)
        );
        // ...but an explicitly named version stays configurable.
        endpoint.set_config(APP, 1, 2, ConfigUpdate::InboundConfirmations(4)).unwrap();
        // The sentinel itself is never addressable.
        assert_eq!(
            endpoint.set_config(APP, BLOCKED_VERSION, 2, ConfigUpdate::InboundConfirmations(4)),
            Err(SetConfigError::InvalidVersion(BLOCKED_VERSION))
        );
        assert_eq!(
            endpoint.set_config(APP, 9, 2, ConfigUpdate::InboundConfirmations(4)),
            Err(SetConfigError::InvalidVersion(9))
        );
    }
}
