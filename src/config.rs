//! Token/pool registry configuration
//!
//! The registry is a JSON document describing the vault, the RPC endpoints,
//! the strategy parameters and the tracked tokens with their pools. Address
//! fields may be literal hex or symbolic `$NAME` / `${NAME}` placeholders
//! resolved against the environment at load time; any unresolved placeholder
//! fails configuration loading.
//!
//! Token discovery rewrites the document on disk, so the raw (unresolved)
//! form is also exposed here together with an atomic write helper.
//!
//! Author: AI-Generated
//! Created: 2026-02-03

use crate::error::{MonitorError, Result};
use crate::types::PoolKind;
use alloy::primitives::Address;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fs;
use std::path::{Path, PathBuf};

/// One AMM pool a token is priced against. Immutable once loaded for a cycle.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PoolConfig {
    /// Venue family tag ("uniswap_v2", "uniswap_v3", ...)
    #[serde(rename = "type")]
    pub kind: String,
    pub address: Address,
    pub base_token: Address,
    pub quote_token: Address,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fee: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub threshold_bps: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub twap_seconds: Option<u32>,
    /// Free-form per-pool settings: router, path, recipient overrides,
    /// deadlineBuffer, slippageBps, cooldownSeconds
    #[serde(default)]
    pub metadata: Map<String, Value>,
}

impl PoolConfig {
    pub fn kind(&self) -> Result<PoolKind> {
        PoolKind::parse(&self.kind)
    }

    /// Metadata value as an address. Present-but-malformed is a
    /// configuration error; absent is `None`.
    pub fn metadata_address(&self, key: &str) -> Result<Option<Address>> {
        match self.metadata.get(key) {
            None | Some(Value::Null) => Ok(None),
            Some(Value::String(s)) => s.parse::<Address>().map(Some).map_err(|e| {
                MonitorError::config(format!("pool {}: metadata '{key}' is not an address: {e}", self.address))
            }),
            Some(other) => Err(MonitorError::config(format!(
                "pool {}: metadata '{key}' must be an address string, got {other}",
                self.address
            ))),
        }
    }

    /// Metadata value as an unsigned integer (accepts numbers and numeric strings).
    pub fn metadata_u64(&self, key: &str) -> Option<u64> {
        match self.metadata.get(key)? {
            Value::Number(n) => n.as_u64(),
            Value::String(s) => s.parse().ok(),
            _ => None,
        }
    }

    /// The multi-hop address path required by constant-product routers.
    pub fn metadata_path(&self) -> Result<Option<Vec<Address>>> {
        let raw = match self.metadata.get("path") {
            None | Some(Value::Null) => return Ok(None),
            Some(Value::Array(items)) => items,
            Some(other) => {
                return Err(MonitorError::config(format!(
                    "pool {}: metadata 'path' must be an address array, got {other}",
                    self.address
                )))
            }
        };
        let mut path = Vec::with_capacity(raw.len());
        for item in raw {
            let text = item.as_str().ok_or_else(|| {
                MonitorError::config(format!("pool {}: path entries must be strings", self.address))
            })?;
            let address = text.parse::<Address>().map_err(|e| {
                MonitorError::config(format!("pool {}: bad path entry '{text}': {e}", self.address))
            })?;
            path.push(address);
        }
        Ok(Some(path))
    }
}

/// A tracked vault token with its priced pools.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenConfig {
    pub address: Address,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub symbol: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub decimals: Option<u8>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub threshold_bps: Option<i64>,
    #[serde(default)]
    pub pools: Vec<PoolConfig>,
}

/// Strategy-wide defaults; pools and tokens may override thresholds,
/// pools may override slippage and cooldown via metadata.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StrategyConfig {
    /// Fraction of the holding to liquidate per trigger, in basis points
    pub sell_percentage_bps: u32,
    #[serde(default)]
    pub cooldown_seconds: u64,
    #[serde(default = "default_slippage_bps")]
    pub default_slippage_bps: u32,
    #[serde(default = "default_threshold_bps")]
    pub default_threshold_bps: i64,
    /// Accepted for registry compatibility but not consulted: TWAP reads
    /// are gated solely on each pool's `twapSeconds` window.
    #[serde(default = "default_use_twap")]
    pub use_twap: bool,
}

fn default_slippage_bps() -> u32 {
    100
}

fn default_threshold_bps() -> i64 {
    1000
}

fn default_use_twap() -> bool {
    true
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct RpcConfig {
    pub http: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ws: Option<String>,
}

/// Fully resolved monitor configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MonitorConfig {
    pub vault_address: Address,
    pub executor_address: Address,
    pub rpc: RpcConfig,
    pub strategy: StrategyConfig,
    #[serde(default)]
    pub tokens: Vec<TokenConfig>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub state_file: Option<PathBuf>,
    /// Where this config was loaded from (needed for discovery write-back)
    #[serde(skip)]
    pub source_path: Option<PathBuf>,
}

// ── Environment placeholder resolution ───────────────────────────────

/// Extract the env var name from a `$NAME` / `${NAME}` placeholder.
/// Returns `None` for anything that is not a full-string placeholder.
pub fn placeholder_env_name(value: &str) -> Option<&str> {
    let trimmed = value.trim();
    let name = trimmed
        .strip_prefix("${")
        .and_then(|rest| rest.strip_suffix('}'))
        .or_else(|| trimmed.strip_prefix('$'))?;
    let mut chars = name.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' => {}
        _ => return None,
    }
    if chars.all(|c| c.is_ascii_alphanumeric() || c == '_') {
        Some(name)
    } else {
        None
    }
}

/// Recursively resolve placeholders in a JSON document.
/// An unresolved placeholder fails configuration loading.
pub fn resolve_env(value: &Value) -> Result<Value> {
    match value {
        Value::String(s) => match placeholder_env_name(s) {
            Some(name) => match std::env::var(name) {
                Ok(resolved) => Ok(Value::String(resolved)),
                Err(_) => Err(MonitorError::config(format!(
                    "environment variable '{name}' is not set"
                ))),
            },
            None => Ok(value.clone()),
        },
        Value::Array(items) => items.iter().map(resolve_env).collect::<Result<_>>().map(Value::Array),
        Value::Object(map) => {
            let mut out = Map::with_capacity(map.len());
            for (key, item) in map {
                out.insert(key.clone(), resolve_env(item)?);
            }
            Ok(Value::Object(out))
        }
        _ => Ok(value.clone()),
    }
}

// ── Loading and write-back ───────────────────────────────────────────

/// Load and fully resolve the registry document.
pub fn load_config(path: impl AsRef<Path>) -> Result<MonitorConfig> {
    let path = path.as_ref();
    let raw = load_raw_document(path)?;
    let resolved = resolve_env(&raw)?;
    let mut config: MonitorConfig = serde_json::from_value(resolved)?;
    config.source_path = Some(path.to_path_buf());
    Ok(config)
}

/// Load the registry document without resolving placeholders.
/// Token discovery works on this form so placeholders survive rewrites.
pub fn load_raw_document(path: impl AsRef<Path>) -> Result<Value> {
    let text = fs::read_to_string(path.as_ref())?;
    Ok(serde_json::from_str(&text)?)
}

/// Rewrite the registry document via temp-file-then-rename so a crash
/// mid-write can never truncate it.
pub fn write_document_atomic(path: impl AsRef<Path>, document: &Value) -> Result<()> {
    let path = path.as_ref();
    let tmp = path.with_extension("json.tmp");
    fs::write(&tmp, serde_json::to_string_pretty(document)?)?;
    fs::rename(&tmp, path)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_placeholder_forms() {
        assert_eq!(placeholder_env_name("$WETH"), Some("WETH"));
        assert_eq!(placeholder_env_name("${WETH}"), Some("WETH"));
        assert_eq!(placeholder_env_name(" $MONITOR_TOKEN_AB12 "), Some("MONITOR_TOKEN_AB12"));
        assert_eq!(placeholder_env_name("0xdeadbeef"), None);
        assert_eq!(placeholder_env_name("$9BAD"), None);
        assert_eq!(placeholder_env_name("not $WETH"), None);
    }

    #[test]
    fn test_resolve_env_success_and_failure() {
        std::env::set_var("VM_CFG_TEST_ADDR", "0x1111111111111111111111111111111111111111");
        let doc = json!({ "a": "$VM_CFG_TEST_ADDR", "b": ["${VM_CFG_TEST_ADDR}"], "c": 7 });
        let resolved = resolve_env(&doc).unwrap();
        assert_eq!(resolved["a"], json!("0x1111111111111111111111111111111111111111"));
        assert_eq!(resolved["b"][0], json!("0x1111111111111111111111111111111111111111"));
        assert_eq!(resolved["c"], json!(7));

        let missing = json!({ "a": "$VM_CFG_TEST_MISSING_VAR" });
        assert!(resolve_env(&missing).is_err());
    }

    #[test]
    fn test_full_document_parse() {
        let doc = json!({
            "vaultAddress": "0x1111111111111111111111111111111111111111",
            "executorAddress": "0x2222222222222222222222222222222222222222",
            "rpc": { "http": "http://localhost:8545" },
            "strategy": { "sellPercentageBps": 500, "cooldownSeconds": 3600 },
            "tokens": [{
                "address": "0x3333333333333333333333333333333333333333",
                "symbol": "TKN",
                "decimals": 18,
                "pools": [{
                    "type": "uniswap_v3",
                    "address": "0x4444444444444444444444444444444444444444",
                    "baseToken": "0x3333333333333333333333333333333333333333",
                    "quoteToken": "0x5555555555555555555555555555555555555555",
                    "fee": 3000,
                    "twapSeconds": 300,
                    "metadata": { "router": "0x6666666666666666666666666666666666666666" }
                }]
            }]
        });
        let config: MonitorConfig = serde_json::from_value(doc).unwrap();
        assert_eq!(config.strategy.sell_percentage_bps, 500);
        // Defaults applied when absent
        assert_eq!(config.strategy.default_slippage_bps, 100);
        assert_eq!(config.strategy.default_threshold_bps, 1000);
        assert!(config.strategy.use_twap);

        let pool = &config.tokens[0].pools[0];
        assert_eq!(pool.kind().unwrap(), PoolKind::UniswapV3);
        assert_eq!(pool.fee, Some(3000));
        assert_eq!(pool.twap_seconds, Some(300));
        assert!(pool.metadata_address("router").unwrap().is_some());
        assert!(pool.metadata_address("recipient").unwrap().is_none());
    }

    #[test]
    fn test_metadata_accessors() {
        let doc = json!({
            "type": "uniswap_v2",
            "address": "0x4444444444444444444444444444444444444444",
            "baseToken": "0x3333333333333333333333333333333333333333",
            "quoteToken": "0x5555555555555555555555555555555555555555",
            "metadata": {
                "deadlineBuffer": 900,
                "slippageBps": "75",
                "path": [
                    "0x3333333333333333333333333333333333333333",
                    "0x5555555555555555555555555555555555555555"
                ]
            }
        });
        let pool: PoolConfig = serde_json::from_value(doc).unwrap();
        assert_eq!(pool.metadata_u64("deadlineBuffer"), Some(900));
        assert_eq!(pool.metadata_u64("slippageBps"), Some(75));
        assert_eq!(pool.metadata_u64("cooldownSeconds"), None);
        let path = pool.metadata_path().unwrap().unwrap();
        assert_eq!(path.len(), 2);
    }

    #[test]
    fn test_malformed_metadata_is_config_error() {
        let doc = json!({
            "type": "uniswap_v2",
            "address": "0x4444444444444444444444444444444444444444",
            "baseToken": "0x3333333333333333333333333333333333333333",
            "quoteToken": "0x5555555555555555555555555555555555555555",
            "metadata": { "router": "not-an-address", "path": "not-an-array" }
        });
        let pool: PoolConfig = serde_json::from_value(doc).unwrap();
        assert!(pool.metadata_address("router").is_err());
        assert!(pool.metadata_path().is_err());
    }
}
