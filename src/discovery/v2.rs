//! Constant-product (Uniswap V2) pool lookup
//!
//! Queries the factory for a pair against each quote candidate and keeps
//! pairs whose token-side reserve clears the liquidity floor. A failed
//! read on one pair never aborts the scan.

use super::quotes::QuoteCandidate;
use crate::contracts::{IUniswapV2Factory, IUniswapV2Pair};
use crate::error::Result;
use alloy::primitives::{Address, U256};
use alloy::providers::DynProvider;
use tracing::{debug, warn};

/// A live pair found for the token, with its token-side reserve.
#[derive(Debug, Clone)]
pub struct V2PoolHit {
    pub pool: Address,
    pub quote: QuoteCandidate,
    pub token_reserve: U256,
}

pub async fn find_v2_pools(
    provider: &DynProvider,
    factory: Address,
    token: Address,
    quotes: &[QuoteCandidate],
    min_token_reserve: U256,
) -> Result<Vec<V2PoolHit>> {
    let factory = IUniswapV2Factory::new(factory, provider.clone());
    let mut hits = Vec::new();

    for quote in quotes {
        if quote.address == token {
            continue;
        }
        let pair_address = factory.getPair(token, quote.address).call().await?;
        if pair_address == Address::ZERO {
            continue;
        }

        match read_token_reserve(provider, pair_address, token).await {
            Ok(reserve) if !reserve.is_zero() && reserve >= min_token_reserve => {
                debug!(
                    "v2 pair {pair_address} for {token}/{} (reserve {reserve})",
                    quote.env_var
                );
                hits.push(V2PoolHit {
                    pool: pair_address,
                    quote: quote.clone(),
                    token_reserve: reserve,
                });
            }
            Ok(_) => debug!("v2 pair {pair_address} below reserve floor, skipping"),
            Err(e) => warn!("failed to read v2 pair {pair_address}: {e}"),
        }
    }

    Ok(hits)
}

async fn read_token_reserve(
    provider: &DynProvider,
    pair_address: Address,
    token: Address,
) -> Result<U256> {
    let pair = IUniswapV2Pair::new(pair_address, provider.clone());
    let reserves = pair.getReserves().call().await?;
    let token0 = pair.token0().call().await?;
    let reserve = if token0 == token {
        reserves.reserve0
    } else {
        reserves.reserve1
    };
    Ok(U256::from(reserve))
}
