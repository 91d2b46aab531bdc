//! Concentrated-liquidity (Uniswap V3) pool lookup
//!
//! Queries the factory across the configured fee tiers for each quote
//! candidate and keeps initialized pools (non-zero sqrt price) whose
//! in-range liquidity clears the floor.

use super::quotes::QuoteCandidate;
use crate::contracts::{fee_to_u24, UniswapV3Factory, UniswapV3Pool};
use crate::error::Result;
use alloy::primitives::{Address, U256};
use alloy::providers::DynProvider;
use tracing::{debug, warn};

pub const FEE_TIERS_VAR: &str = "UNIV3_FEE_TIERS";
const DEFAULT_FEE_TIERS: [u32; 3] = [500, 3_000, 10_000];

#[derive(Debug, Clone)]
pub struct V3PoolHit {
    pub pool: Address,
    pub quote: QuoteCandidate,
    pub fee: u32,
    pub liquidity: u128,
}

pub async fn find_v3_pools(
    provider: &DynProvider,
    factory: Address,
    token: Address,
    quotes: &[QuoteCandidate],
    fee_tiers: &[u32],
    min_liquidity: u128,
) -> Result<Vec<V3PoolHit>> {
    let factory = UniswapV3Factory::new(factory, provider.clone());
    let mut hits = Vec::new();

    for quote in quotes {
        if quote.address == token {
            continue;
        }
        for &fee in fee_tiers {
            let pool_address = factory
                .getPool(token, quote.address, fee_to_u24(fee)?)
                .call()
                .await?;
            if pool_address == Address::ZERO {
                continue;
            }

            match read_pool_state(provider, pool_address).await {
                Ok((sqrt_price, liquidity)) => {
                    if sqrt_price.is_zero() {
                        debug!("v3 pool {pool_address} uninitialized, skipping");
                        continue;
                    }
                    if liquidity < min_liquidity {
                        debug!("v3 pool {pool_address} below liquidity floor, skipping");
                        continue;
                    }
                    debug!(
                        "v3 pool {pool_address} for {token}/{} fee {fee} (liquidity {liquidity})",
                        quote.env_var
                    );
                    hits.push(V3PoolHit {
                        pool: pool_address,
                        quote: quote.clone(),
                        fee,
                        liquidity,
                    });
                }
                Err(e) => warn!("failed to read v3 pool {pool_address}: {e}"),
            }
        }
    }

    Ok(hits)
}

async fn read_pool_state(provider: &DynProvider, pool_address: Address) -> Result<(U256, u128)> {
    let pool = UniswapV3Pool::new(pool_address, provider.clone());
    let slot0 = pool.slot0().call().await?;
    let liquidity = pool.liquidity().call().await?;
    Ok((U256::from(slot0.sqrtPriceX96), liquidity))
}

/// Fee tiers to scan, from `UNIV3_FEE_TIERS` (JSON array or comma list)
/// with the canonical three tiers as the default.
pub fn fee_tiers_from_env() -> Vec<u32> {
    match std::env::var(FEE_TIERS_VAR) {
        Ok(raw) => {
            let tiers = parse_fee_tiers(&raw);
            if tiers.is_empty() {
                warn!("{FEE_TIERS_VAR} contained no valid tiers, using defaults");
                DEFAULT_FEE_TIERS.to_vec()
            } else {
                tiers
            }
        }
        Err(_) => DEFAULT_FEE_TIERS.to_vec(),
    }
}

pub(crate) fn parse_fee_tiers(raw: &str) -> Vec<u32> {
    match serde_json::from_str::<Vec<u32>>(raw) {
        Ok(list) => list,
        Err(_) => raw
            .split(',')
            .filter_map(|part| part.trim().parse().ok())
            .collect(),
    }
}
