//! Price Oracle — base/quote exchange rates from on-chain pool state
//!
//! Two venue variants behind one closed enum, selected by the pool's
//! venue-family tag: constant-product reserve ratios (V2) and
//! concentrated-liquidity sqrt-price/TWAP reads (V3). An unsupported tag is
//! a configuration error for that pool only.
//!
//! The orientation rule is shared: if the configured base token is the
//! pool's token0, the token1-per-token0 ratio is used directly; if it is
//! token1, the ratio is inverted; otherwise the pool is misconfigured.
//! All results are scaled by 10^(baseDecimals − quoteDecimals).
//!
//! Author: AI-Generated
//! Created: 2026-02-03

pub mod v2;
pub mod v3;

use crate::config::PoolConfig;
use crate::error::{MonitorError, Result};
use crate::types::{pow10, PoolKind, PriceQuote};
use alloy::primitives::Address;
use alloy::providers::DynProvider;
use rust_decimal::Decimal;

pub use v2::V2PriceSource;
pub use v3::V3PriceSource;

/// Closed set of venue price sources.
pub enum PriceSource {
    V2(V2PriceSource),
    V3(V3PriceSource),
}

impl PriceSource {
    /// Select the venue variant for a pool. Unsupported venue tags are a
    /// pool-local configuration error.
    pub fn build(pool: &PoolConfig) -> Result<Self> {
        match pool.kind()? {
            PoolKind::UniswapV2 => Ok(PriceSource::V2(V2PriceSource::new(pool.clone()))),
            PoolKind::UniswapV3 => Ok(PriceSource::V3(V3PriceSource::new(pool.clone()))),
        }
    }

    /// Compute "quote units per one base unit" from current pool state.
    /// A zero price signals an uninitialized pool and is returned as a
    /// zero quote, not an error.
    pub async fn fetch(
        &self,
        provider: &DynProvider,
        base_decimals: u8,
        quote_decimals: u8,
    ) -> Result<PriceQuote> {
        match self {
            PriceSource::V2(source) => source.fetch(provider, base_decimals, quote_decimals).await,
            PriceSource::V3(source) => source.fetch(provider, base_decimals, quote_decimals).await,
        }
    }
}

/// Orient a raw token1-per-token0 ratio to "quote per base" and apply
/// decimals scaling. Shared by both venue variants.
pub(crate) fn orient_and_scale(
    ratio_token1_per_token0: Decimal,
    token0: Address,
    token1: Address,
    base_token: Address,
    base_decimals: u8,
    quote_decimals: u8,
) -> Result<Decimal> {
    let scale = pow10(base_decimals as i32 - quote_decimals as i32);
    if base_token == token0 {
        Ok(ratio_token1_per_token0 * scale)
    } else if base_token == token1 {
        if ratio_token1_per_token0.is_zero() {
            // Uninitialized pool; surfaces as an invalid-price HOLD upstream
            Ok(Decimal::ZERO)
        } else {
            Ok((Decimal::ONE / ratio_token1_per_token0) * scale)
        }
    } else {
        Err(MonitorError::config(format!(
            "base token {base_token} matches neither pool constituent ({token0}, {token1})"
        )))
    }
}
