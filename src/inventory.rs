//! Vault inventory snapshots
//!
//! Reads current vault balances and token metadata (decimals, symbol) for
//! the configured tokens. Metadata is immutable on-chain, so it is cached
//! per address; balances are re-read on every fetch.
//!
//! Author: AI-Generated
//! Created: 2026-02-03

use crate::config::TokenConfig;
use crate::contracts::IERC20;
use crate::error::Result;
use crate::types::{to_human_units, TokenInventory};
use alloy::primitives::Address;
use alloy::providers::DynProvider;
use std::collections::HashMap;
use tracing::debug;

#[derive(Debug, Clone)]
struct TokenMetadata {
    decimals: u8,
    symbol: String,
}

/// Fetches point-in-time vault balances with per-address metadata caching.
pub struct InventoryFetcher {
    provider: DynProvider,
    vault: Address,
    metadata_cache: HashMap<Address, TokenMetadata>,
}

impl InventoryFetcher {
    pub fn new(provider: DynProvider, vault: Address) -> Self {
        Self {
            provider,
            vault,
            metadata_cache: HashMap::new(),
        }
    }

    /// Snapshot balances for all configured tokens, sequentially.
    ///
    /// Decimals failures propagate (the snapshot would be meaningless
    /// without them); symbol failures degrade to "UNKNOWN".
    pub async fn fetch(&mut self, tokens: &[TokenConfig]) -> Result<HashMap<Address, TokenInventory>> {
        let mut balances = HashMap::with_capacity(tokens.len());

        for token in tokens {
            let contract = IERC20::new(token.address, self.provider.clone());
            let raw_balance = contract.balanceOf(self.vault).call().await?;

            let metadata = match self.metadata_cache.get(&token.address) {
                Some(cached) => cached.clone(),
                None => {
                    let decimals = match token.decimals {
                        Some(d) => d,
                        None => contract.decimals().call().await?,
                    };
                    let symbol = match &token.symbol {
                        Some(s) => s.clone(),
                        None => match contract.symbol().call().await {
                            Ok(s) => s,
                            Err(e) => {
                                debug!("symbol() failed for {}: {e}", token.address);
                                "UNKNOWN".to_string()
                            }
                        },
                    };
                    let metadata = TokenMetadata { decimals, symbol };
                    self.metadata_cache.insert(token.address, metadata.clone());
                    metadata
                }
            };

            balances.insert(
                token.address,
                TokenInventory {
                    token: token.clone(),
                    raw_balance,
                    human_balance: to_human_units(raw_balance, metadata.decimals),
                    decimals: metadata.decimals,
                    symbol: metadata.symbol,
                },
            );
        }

        Ok(balances)
    }
}
