//! The outbound send path: single-flight guard, fee quotation and
//! settlement, oracle notification, and packet emission.

use crate::{
    errors::{SendError, SendResult},
    node::UltraLightNode,
    traits::SendContext,
};
use alloy_primitives::{Address, Bytes, U256};
use core::sync::atomic::{AtomicBool, Ordering};
use trellis_fee::FeeError;
use trellis_primitives::{AdapterParams, AppConfig, ChainId, Nonce, Packet};

/// Scoped hold on the library-wide send flag: acquire-or-fail, released on
/// every exit path.
struct SendGuard<'a>(&'a AtomicBool);

impl<'a> SendGuard<'a> {
    fn acquire(flag: &'a AtomicBool) -> SendResult<Self> {
        flag.compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .map(|_| Self(flag))
            .map_err(|_| SendError::SendReentrancy)
    }
}

impl Drop for SendGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

/// One message's quoted fees.
struct Quote {
    relaying: U256,
    attestation: U256,
    surcharge: U256,
    treasury: Address,
}

impl Quote {
    fn total(&self) -> U256 {
        self.relaying + self.attestation + self.surcharge
    }
}

impl UltraLightNode {
    /// Sends a message.
    ///
    /// The router assigns the nonce and dispatches here; one send may be in
    /// flight at a time across the whole library. Fees are quoted, settled
    /// in native currency or the fee token, excess native value is
    /// refunded, the attestation provider is notified best-effort, and the
    /// packet is emitted.
    #[allow(clippy::too_many_arguments)]
    pub fn send(
        &self,
        ctx: &SendContext,
        application: Address,
        nonce: Nonce,
        dst_chain: ChainId,
        dst_address: &[u8],
        payload: Bytes,
        refund_address: Address,
        fee_payment_address: Address,
        adapter_params: &[u8],
    ) -> SendResult<Packet> {
        let _guard = SendGuard::acquire(&self.sending)?;

        if self.remote_library(dst_chain).is_none() {
            return Err(SendError::UnknownChain(dst_chain));
        }
        let expected = self
            .chain_address_size(dst_chain)
            .ok_or(SendError::UnknownChain(dst_chain))?;
        if dst_address.len() != expected {
            return Err(SendError::InvalidDestination { expected, actual: dst_address.len() });
        }

        let config = self.app_config(dst_chain, application)?;
        let pay_in_fee_token = !fee_payment_address.is_zero();
        let quote = self.quote(
            &config,
            application,
            dst_chain,
            payload.len(),
            pay_in_fee_token,
            adapter_params,
        )?;

        if pay_in_fee_token {
            self.settle_fee_token(ctx, fee_payment_address, refund_address, &config, &quote)?;
        } else {
            self.settle_native(ctx, refund_address, &config, &quote)?;
        }

        // Best-effort: a deaf oracle does not fail the send, it only means
        // the message will never become deliverable until re-attested.
        let oracle = self.oracle_provider(config.oracle)?;
        if let Err(err) = oracle.notify(
            dst_chain,
            config.outbound_proof_type,
            config.outbound_confirmations,
        ) {
            tracing::warn!(target: "uln", oracle = %config.oracle, %err, "oracle notify failed");
        }

        let packet = Packet {
            nonce,
            src_chain: self.local_chain(),
            src_address: Bytes::copy_from_slice(application.as_slice()),
            dst_chain,
            dst_address: Bytes::copy_from_slice(dst_address),
            payload,
        };
        tracing::info!(
            target: "uln",
            nonce,
            %application,
            dst_chain,
            payload_len = packet.payload.len(),
            "packet emitted"
        );
        Ok(packet)
    }

    /// Quotes the (native, fee-token) cost a send with these inputs would
    /// settle for. Zero for the denomination not being paid in.
    pub fn estimate_fees(
        &self,
        application: Address,
        dst_chain: ChainId,
        payload_len: usize,
        pay_in_fee_token: bool,
        adapter_params: &[u8],
    ) -> SendResult<(U256, U256)> {
        let config = self.app_config(dst_chain, application)?;
        let quote = self.quote(
            &config,
            application,
            dst_chain,
            payload_len,
            pay_in_fee_token,
            adapter_params,
        )?;
        let total = quote.total();
        Ok(if pay_in_fee_token { (U256::ZERO, total) } else { (total, U256::ZERO) })
    }

    fn quote(
        &self,
        config: &AppConfig,
        application: Address,
        dst_chain: ChainId,
        payload_len: usize,
        pay_in_fee_token: bool,
        adapter_params: &[u8],
    ) -> SendResult<Quote> {
        // An empty blob resolves to the owner-set default for the route
        // before decoding.
        let params = if adapter_params.is_empty() {
            let default = self.default_adapter_params_for(dst_chain, config.outbound_proof_type);
            AdapterParams::decode(&default).map_err(FeeError::from)?
        } else {
            AdapterParams::decode(adapter_params).map_err(FeeError::from)?
        };

        let relaying = self.relayer_provider(config.relayer)?.price(
            dst_chain,
            config.outbound_proof_type,
            application,
            payload_len,
            &params,
        )?;
        let attestation =
            self.oracle_provider(config.oracle)?.price(dst_chain, config.outbound_proof_type)?;

        let wired_treasury = self.treasury.read().clone();
        let (surcharge, treasury) = match wired_treasury {
            Some((address, treasury)) => {
                (treasury.surcharge(pay_in_fee_token, relaying, attestation)?, address)
            }
            None => (U256::ZERO, Address::ZERO),
        };

        Ok(Quote { relaying, attestation, surcharge, treasury })
    }

    fn settle_fee_token(
        &self,
        ctx: &SendContext,
        payer: Address,
        refund_address: Address,
        config: &AppConfig,
        quote: &Quote,
    ) -> SendResult<()> {
        let (token_address, token) =
            self.fee_token.read().clone().ok_or(SendError::Fee(FeeError::FeeTokenDisabled))?;
        // Closed allowlist: the payer must be the immediate caller or the
        // transaction originator.
        if payer != ctx.sender && payer != ctx.origin {
            return Err(SendError::InvalidFeePayer(payer));
        }

        token
            .transfer_from(payer, self.library_address(), quote.total())
            .map_err(SendError::FeeTokenPayment)?;

        // Any attached native value is not part of a fee-token settlement;
        // hand it back in full.
        if !ctx.value.is_zero() {
            self.native.transfer(refund_address, ctx.value).map_err(SendError::RefundFailed)?;
        }

        let mut balances = self.fee_token_balances.write();
        for (owner, amount) in [
            (config.relayer, quote.relaying),
            (config.oracle, quote.attestation),
            (quote.treasury, quote.surcharge),
        ] {
            if !amount.is_zero() {
                *balances.entry(owner).or_default() += amount;
            }
        }
        tracing::debug!(
            target: "uln",
            token = %token_address,
            total = %quote.total(),
            "fees settled in fee token"
        );
        Ok(())
    }

    fn settle_native(
        &self,
        ctx: &SendContext,
        refund_address: Address,
        config: &AppConfig,
        quote: &Quote,
    ) -> SendResult<()> {
        let required = quote.total();
        if ctx.value < required {
            return Err(SendError::InsufficientNativePayment { required, provided: ctx.value });
        }

        let excess = ctx.value - required;
        if !excess.is_zero() {
            self.native.transfer(refund_address, excess).map_err(SendError::RefundFailed)?;
        }

        let mut balances = self.native_balances.write();
        for (owner, amount) in [
            (config.relayer, quote.relaying),
            (config.oracle, quote.attestation),
            (quote.treasury, quote.surcharge),
        ] {
            if !amount.is_zero() {
                *balances.entry(owner).or_default() += amount;
            }
        }
        tracing::debug!(target: "uln", total = %required, refund = %excess, "fees settled in native");
        Ok(())
    }
}
