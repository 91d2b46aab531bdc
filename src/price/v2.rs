//! Constant-product (Uniswap V2) price source
//!
//! Price is the paired-reserve ratio, oriented to the configured base token
//! and scaled for decimals. Pairs with an empty reserve are reported as a
//! zero quote (uninitialized), never as an error.

use super::orient_and_scale;
use crate::config::PoolConfig;
use crate::contracts::IUniswapV2Pair;
use crate::error::Result;
use crate::types::{u256_to_decimal, PriceQuote};
use alloy::primitives::{Address, U256};
use alloy::providers::DynProvider;
use rust_decimal::Decimal;

pub struct V2PriceSource {
    pool: PoolConfig,
}

impl V2PriceSource {
    pub fn new(pool: PoolConfig) -> Self {
        Self { pool }
    }

    pub async fn fetch(
        &self,
        provider: &DynProvider,
        base_decimals: u8,
        quote_decimals: u8,
    ) -> Result<PriceQuote> {
        let pair = IUniswapV2Pair::new(self.pool.address, provider.clone());

        let reserves = pair.getReserves().call().await?;
        let token0 = pair.token0().call().await?;
        let token1 = pair.token1().call().await?;

        let price = price_from_reserves(
            U256::from(reserves.reserve0),
            U256::from(reserves.reserve1),
            token0,
            token1,
            self.pool.base_token,
            base_decimals,
            quote_decimals,
        )?;

        Ok(PriceQuote::spot(price))
    }
}

/// Pure reserve-ratio math, factored out of the RPC path.
pub(crate) fn price_from_reserves(
    reserve0: U256,
    reserve1: U256,
    token0: Address,
    token1: Address,
    base_token: Address,
    base_decimals: u8,
    quote_decimals: u8,
) -> Result<Decimal> {
    if reserve0.is_zero() || reserve1.is_zero() {
        // Uninitialized pair
        return Ok(Decimal::ZERO);
    }
    let ratio = u256_to_decimal(reserve1) / u256_to_decimal(reserve0);
    orient_and_scale(ratio, token0, token1, base_token, base_decimals, quote_decimals)
}
