//! Pool lookup orchestration
//!
//! Scans each venue family whose factory is configured in the environment
//! (`UNIV2_FACTORY` / `UNIV3_FACTORY`, routers via `UNIV2_ROUTER` /
//! `UNIV3_ROUTER`) and produces deduplicated registry-ready pool matches.
//! Addresses in the produced entries are symbolic placeholders so the
//! rewritten registry stays environment-portable.
//!
//! Author: AI-Generated
//! Created: 2026-02-03

use super::quotes::load_quote_candidates;
use super::v2::find_v2_pools;
use super::v3::{fee_tiers_from_env, find_v3_pools};
use crate::error::{MonitorError, Result};
use crate::types::PoolKind;
use alloy::primitives::{Address, U256};
use alloy::providers::DynProvider;
use serde_json::{json, Map, Value};
use std::collections::HashSet;
use tracing::{debug, info};

pub const UNIV2_FACTORY_VAR: &str = "UNIV2_FACTORY";
pub const UNIV2_ROUTER_VAR: &str = "UNIV2_ROUTER";
pub const UNIV3_FACTORY_VAR: &str = "UNIV3_FACTORY";
pub const UNIV3_ROUTER_VAR: &str = "UNIV3_ROUTER";

/// A discovered pool as it will be written into the registry.
#[derive(Debug, Clone)]
pub struct PoolMatch {
    pub pool_address: Address,
    /// Env var that will carry the pool address
    pub pool_env: String,
    pub pool_placeholder: String,
    pub quote_address: Address,
    pub quote_env: String,
    pub quote_placeholder: String,
    pub kind: PoolKind,
    pub fee: Option<u32>,
    /// Ready-made pool metadata (router placeholder, path, deadlineBuffer)
    pub metadata: Map<String, Value>,
}

/// Find registry-ready pools for one token across all configured venue
/// families. `token_env` is the symbolic identity the token will carry in
/// the registry; a token without one is written as a literal address.
pub async fn find_pools(
    provider: &DynProvider,
    token: Address,
    token_env: Option<&str>,
) -> Result<Vec<PoolMatch>> {
    let quotes = load_quote_candidates()?;
    let token_placeholder = match token_env {
        Some(name) => format!("${name}"),
        None => token.to_string(),
    };
    let token_suffix = env_suffix(token_env, token);

    let mut matches = Vec::new();

    // Constant-product family first; dedup keeps the first sighting of a
    // pool address, so V2 wins when both families report the same pair.
    if let Some(factory) = factory_from_env(UNIV2_FACTORY_VAR)? {
        let router = require_router(UNIV2_ROUTER_VAR)?;
        let hits = find_v2_pools(provider, factory, token, &quotes, U256::from(1u8)).await?;
        for hit in hits {
            let quote_suffix = env_suffix(Some(&hit.quote.env_var), hit.quote.address);
            let mut metadata = Map::new();
            metadata.insert("router".to_string(), json!(format!("${router}")));
            metadata.insert(
                "path".to_string(),
                json!([token_placeholder.clone(), hit.quote.placeholder.clone()]),
            );
            metadata.insert("deadlineBuffer".to_string(), json!(600));

            let pool_env = pool_env_name("UNIV2", &token_suffix, &quote_suffix, None);
            matches.push(PoolMatch {
                pool_address: hit.pool,
                pool_placeholder: format!("${pool_env}"),
                pool_env,
                quote_address: hit.quote.address,
                quote_env: hit.quote.env_var.clone(),
                quote_placeholder: hit.quote.placeholder.clone(),
                kind: PoolKind::UniswapV2,
                fee: None,
                metadata,
            });
        }
    } else {
        debug!("{UNIV2_FACTORY_VAR} not set, skipping constant-product scan");
    }

    if let Some(factory) = factory_from_env(UNIV3_FACTORY_VAR)? {
        let router = require_router(UNIV3_ROUTER_VAR)?;
        let fee_tiers = fee_tiers_from_env();
        let hits = find_v3_pools(provider, factory, token, &quotes, &fee_tiers, 1).await?;
        for hit in hits {
            let quote_suffix = env_suffix(Some(&hit.quote.env_var), hit.quote.address);
            let mut metadata = Map::new();
            metadata.insert("router".to_string(), json!(format!("${router}")));
            metadata.insert("deadlineBuffer".to_string(), json!(600));

            let pool_env = pool_env_name("UNIV3", &token_suffix, &quote_suffix, Some(hit.fee));
            matches.push(PoolMatch {
                pool_address: hit.pool,
                pool_placeholder: format!("${pool_env}"),
                pool_env,
                quote_address: hit.quote.address,
                quote_env: hit.quote.env_var.clone(),
                quote_placeholder: hit.quote.placeholder.clone(),
                kind: PoolKind::UniswapV3,
                fee: Some(hit.fee),
                metadata,
            });
        }
    } else {
        debug!("{UNIV3_FACTORY_VAR} not set, skipping concentrated-liquidity scan");
    }

    let matches = dedup_matches(matches);
    info!("found {} pool(s) for token {token}", matches.len());
    Ok(matches)
}

fn factory_from_env(var: &str) -> Result<Option<Address>> {
    match std::env::var(var) {
        Ok(value) => value
            .parse::<Address>()
            .map(Some)
            .map_err(|e| MonitorError::config(format!("{var} is not an address: {e}"))),
        Err(_) => Ok(None),
    }
}

/// A configured factory without its router is a misconfiguration: the
/// discovered pools would be unusable for swap construction.
fn require_router(var: &str) -> Result<String> {
    match std::env::var(var) {
        Ok(value) => {
            value
                .parse::<Address>()
                .map_err(|e| MonitorError::config(format!("{var} is not an address: {e}")))?;
            Ok(var.to_string())
        }
        Err(_) => Err(MonitorError::config(format!(
            "{var} must be set when the matching factory is configured"
        ))),
    }
}

/// First sighting of a pool address wins; scan order makes that
/// deterministic (quotes in candidate order, V2 before V3).
pub(crate) fn dedup_matches(matches: Vec<PoolMatch>) -> Vec<PoolMatch> {
    let mut seen = HashSet::new();
    matches
        .into_iter()
        .filter(|m| seen.insert(m.pool_address))
        .collect()
}

/// Symbolic env name for a discovered token: `MONITOR_TOKEN_<HEX>`.
pub fn derive_token_env(token: Address) -> String {
    format!("MONITOR_TOKEN_{}", address_suffix(token))
}

/// `MONITOR_POOL_<FAMILY>_<TOKEN>_<QUOTE>[_FEE<fee>]`
pub(crate) fn pool_env_name(family: &str, token: &str, quote: &str, fee: Option<u32>) -> String {
    let mut name = format!("MONITOR_POOL_{family}_{token}_{quote}");
    if let Some(fee) = fee {
        name.push_str(&format!("_FEE{fee}"));
    }
    name
}

/// Compact identifier for env name composition: the token's own env
/// suffix when it has one, else its address hex.
fn env_suffix(env: Option<&str>, address: Address) -> String {
    match env {
        Some(name) => normalize_component(name.trim_start_matches("MONITOR_TOKEN_")),
        None => address_suffix(address),
    }
}

fn address_suffix(address: Address) -> String {
    address.to_string().trim_start_matches("0x").to_uppercase()
}

fn normalize_component(raw: &str) -> String {
    raw.chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() {
                c.to_ascii_uppercase()
            } else {
                '_'
            }
        })
        .collect()
}
