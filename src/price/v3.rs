//! Concentrated-liquidity (Uniswap V3) price source
//!
//! Spot variant reads slot0 and rescales sqrtPriceX96² by 2^-192. When the
//! pool has a positive TWAP window configured, a time-weighted read is
//! attempted first: cumulative ticks at [window, 0] seconds ago, averaged,
//! and exponentiated as 1.0001^tick. Any TWAP failure (stale pool,
//! unsupported window, call error) falls back silently to the spot variant.
//!
//! Raw ratios are computed in f64 and converted to Decimal: sqrtPriceX96 is
//! a uint160 and does not fit Decimal's 96-bit mantissa, and the tick
//! exponent is fractional. All downstream threshold math stays in Decimal.

use super::orient_and_scale;
use crate::config::PoolConfig;
use crate::contracts::UniswapV3Pool;
use crate::error::{MonitorError, Result};
use crate::types::PriceQuote;
use alloy::primitives::{Address, U256};
use alloy::providers::DynProvider;
use rust_decimal::prelude::FromPrimitive;
use rust_decimal::Decimal;
use tracing::debug;

pub struct V3PriceSource {
    pool: PoolConfig,
}

impl V3PriceSource {
    pub fn new(pool: PoolConfig) -> Self {
        Self { pool }
    }

    pub async fn fetch(
        &self,
        provider: &DynProvider,
        base_decimals: u8,
        quote_decimals: u8,
    ) -> Result<PriceQuote> {
        let contract = UniswapV3Pool::new(self.pool.address, provider.clone());
        let token0 = contract.token0().call().await?;
        let token1 = contract.token1().call().await?;

        if let Some(window) = twap_window(&self.pool) {
            match self
                .fetch_twap(provider, window, token0, token1, base_decimals, quote_decimals)
                .await
            {
                Ok(quote) => return Ok(quote),
                Err(e) => debug!(
                    "TWAP read failed for pool {} (window {window}s), falling back to spot: {e}",
                    self.pool.address
                ),
            }
        }

        self.fetch_spot(provider, token0, token1, base_decimals, quote_decimals).await
    }

    async fn fetch_twap(
        &self,
        provider: &DynProvider,
        window: u32,
        token0: Address,
        token1: Address,
        base_decimals: u8,
        quote_decimals: u8,
    ) -> Result<PriceQuote> {
        let contract = UniswapV3Pool::new(self.pool.address, provider.clone());
        let observed = contract.observe(vec![window, 0]).call().await?;
        let cumulatives = &observed.tickCumulatives;
        if cumulatives.len() != 2 {
            return Err(MonitorError::config("unexpected observe() response shape"));
        }

        let delta = i64::try_from(cumulatives[1] - cumulatives[0])
            .map_err(|_| MonitorError::config("cumulative tick delta out of range"))?;
        let average_tick = delta as f64 / window as f64;

        let ratio = ratio_from_tick(average_tick);
        let price = orient_and_scale(
            ratio,
            token0,
            token1,
            self.pool.base_token,
            base_decimals,
            quote_decimals,
        )?;

        Ok(PriceQuote {
            price,
            tick: Some(average_tick.round_ties_even() as i32),
        })
    }

    async fn fetch_spot(
        &self,
        provider: &DynProvider,
        token0: Address,
        token1: Address,
        base_decimals: u8,
        quote_decimals: u8,
    ) -> Result<PriceQuote> {
        let contract = UniswapV3Pool::new(self.pool.address, provider.clone());
        let slot0 = contract.slot0().call().await?;

        let sqrt_price_x96 = U256::from(slot0.sqrtPriceX96);
        let tick = i32::try_from(slot0.tick).unwrap_or(0);

        let ratio = ratio_from_sqrt_price(sqrt_price_x96);
        let price = orient_and_scale(
            ratio,
            token0,
            token1,
            self.pool.base_token,
            base_decimals,
            quote_decimals,
        )?;

        Ok(PriceQuote { price, tick: Some(tick) })
    }
}

/// The TWAP window to use, if any. Gated solely on the per-pool window;
/// no other configuration influences whether a time-weighted read is
/// attempted.
pub(crate) fn twap_window(pool: &PoolConfig) -> Option<u32> {
    pool.twap_seconds.filter(|w| *w > 0)
}

/// token1-per-token0 ratio from a Q64.96 sqrt price: (sqrtP / 2^96)².
/// Zero (uninitialized pool) stays zero; ratios beyond Decimal range
/// degrade to zero and surface as an invalid-price HOLD.
pub(crate) fn ratio_from_sqrt_price(sqrt_price_x96: U256) -> Decimal {
    let sqrt: f64 = sqrt_price_x96.to_string().parse().unwrap_or(0.0);
    let scaled = sqrt / 2f64.powi(96);
    Decimal::from_f64(scaled * scaled).unwrap_or(Decimal::ZERO)
}

/// token1-per-token0 ratio from an (average, possibly fractional) tick.
pub(crate) fn ratio_from_tick(tick: f64) -> Decimal {
    Decimal::from_f64(1.0001_f64.powf(tick)).unwrap_or(Decimal::ZERO)
}
