//! Strategy Engine — per-(token, pool) threshold/cooldown state machine
//!
//! Holds one persisted state record per (token, pool) key: the baseline
//! price and the last trigger timestamp. Each evaluation compares the
//! current price to the baseline and emits a HOLD/SELL decision with a
//! machine-readable reason. The store is rewritten in full, synchronously,
//! after every mutation — before any swap instruction is built, let alone
//! submitted (known limitation replicated from the original design).
//!
//! Note: the threshold comparison `change_bps < threshold_bps` carries no
//! sign guard, so a negative configured threshold triggers on price
//! decreases. Preserved deliberately; see the tests.
//!
//! Author: AI-Generated
//! Created: 2026-02-03

use crate::config::{PoolConfig, StrategyConfig};
use crate::types::{DecisionReason, PriceQuote, StrategyDecision, TokenInventory};
use alloy::primitives::{Address, U256};
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs;
use std::path::PathBuf;
use tracing::{debug, warn};

/// Persisted per-(token, pool) record.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StrategyState {
    /// Reference price subsequent moves are measured against (decimal string on disk)
    pub baseline: Decimal,
    /// Epoch seconds of the last triggered sell, absent until the first trigger
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_trigger: Option<u64>,
}

/// File-backed map of strategy states, keyed `"<token>::<pool>"` (lowercase).
///
/// Loaded once at engine construction; rewritten in full (temp file, then
/// rename) after every mutating evaluation. A missing or corrupt file
/// starts the engine empty rather than aborting.
pub struct StateStore {
    path: Option<PathBuf>,
    entries: HashMap<String, StrategyState>,
}

impl StateStore {
    pub fn load(path: Option<PathBuf>) -> Self {
        let mut entries = HashMap::new();
        if let Some(ref p) = path {
            match fs::read_to_string(p) {
                Ok(text) => match serde_json::from_str(&text) {
                    Ok(parsed) => entries = parsed,
                    Err(e) => warn!("state file {} is corrupt, starting empty: {e}", p.display()),
                },
                Err(_) => debug!("no state file at {}, starting empty", p.display()),
            }
        }
        Self { path, entries }
    }

    pub fn key(token: Address, pool: Address) -> String {
        format!(
            "{}::{}",
            token.to_string().to_lowercase(),
            pool.to_string().to_lowercase()
        )
    }

    pub fn get(&self, key: &str) -> Option<&StrategyState> {
        self.entries.get(key)
    }

    pub fn insert(&mut self, key: String, state: StrategyState) {
        self.entries.insert(key, state);
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Rewrite the whole store. Write failures are logged, not fatal —
    /// a transient disk error must not abort the evaluation cycle.
    pub fn persist(&self) {
        let Some(ref path) = self.path else { return };
        let result = serde_json::to_string_pretty(&self.entries)
            .map_err(std::io::Error::other)
            .and_then(|text| {
                let tmp = path.with_extension("json.tmp");
                fs::write(&tmp, text)?;
                fs::rename(&tmp, path)
            });
        if let Err(e) = result {
            warn!("failed to persist strategy state to {}: {e}", path.display());
        }
    }
}

/// The decision engine. Owns the state store explicitly (no hidden
/// singleton); all reads/writes of a key within a cycle are sequential.
pub struct StrategyEngine {
    strategy: StrategyConfig,
    store: StateStore,
}

impl StrategyEngine {
    pub fn new(strategy: StrategyConfig, store: StateStore) -> Self {
        Self { strategy, store }
    }

    /// Evaluate one (token, pool) pair at `now` (epoch seconds).
    ///
    /// State machine:
    /// 1. invalid price → HOLD
    /// 2. no state → initialize baseline, HOLD
    /// 3. corrupt baseline → reset baseline, HOLD
    /// 4. change below threshold → HOLD
    /// 5. cooldown active → HOLD
    /// 6. zero sell amount → HOLD
    /// 7. otherwise SELL: baseline := price, lastTrigger := now, persist
    pub fn evaluate(
        &mut self,
        inventory: &TokenInventory,
        pool: &PoolConfig,
        quote: &PriceQuote,
        now: u64,
    ) -> StrategyDecision {
        let slippage_bps = self.resolve_slippage(pool);
        let key = StateStore::key(inventory.token.address, pool.address);
        let price = quote.price;

        let hold = |change_bps: i64, reason: DecisionReason| StrategyDecision {
            should_sell: false,
            inventory: inventory.clone(),
            pool: pool.clone(),
            price,
            change_bps,
            sell_amount: U256::ZERO,
            slippage_bps,
            reason,
        };

        if price <= Decimal::ZERO {
            return hold(0, DecisionReason::InvalidPrice);
        }

        let Some(state) = self.store.get(&key) else {
            self.store.insert(
                key,
                StrategyState {
                    baseline: price,
                    last_trigger: None,
                },
            );
            self.store.persist();
            return hold(0, DecisionReason::BaselineInitialized);
        };

        if state.baseline <= Decimal::ZERO {
            let last_trigger = state.last_trigger;
            self.store.insert(
                key,
                StrategyState {
                    baseline: price,
                    last_trigger,
                },
            );
            self.store.persist();
            return hold(0, DecisionReason::BaselineReset);
        }

        let change_bps = change_bps(price, state.baseline);

        let threshold_bps = self.resolve_threshold(inventory, pool);
        if change_bps < threshold_bps {
            return hold(change_bps, DecisionReason::ThresholdNotMet);
        }

        let cooldown = self.resolve_cooldown(pool);
        if let Some(last_trigger) = state.last_trigger {
            if now.saturating_sub(last_trigger) < cooldown {
                return hold(change_bps, DecisionReason::CooldownActive);
            }
        }

        let sell_amount =
            inventory.raw_balance * U256::from(self.strategy.sell_percentage_bps) / U256::from(10_000u64);
        if sell_amount.is_zero() {
            return hold(change_bps, DecisionReason::InsufficientBalance);
        }

        self.store.insert(
            key,
            StrategyState {
                baseline: price,
                last_trigger: Some(now),
            },
        );
        self.store.persist();

        StrategyDecision {
            should_sell: true,
            inventory: inventory.clone(),
            pool: pool.clone(),
            price,
            change_bps,
            sell_amount,
            slippage_bps,
            reason: DecisionReason::ThresholdMet,
        }
    }

    /// Pool-level override, else token-level, else strategy-wide default.
    fn resolve_threshold(&self, inventory: &TokenInventory, pool: &PoolConfig) -> i64 {
        pool.threshold_bps
            .or(inventory.token.threshold_bps)
            .unwrap_or(self.strategy.default_threshold_bps)
    }

    fn resolve_slippage(&self, pool: &PoolConfig) -> u32 {
        pool.metadata_u64("slippageBps")
            .map(|v| v as u32)
            .unwrap_or(self.strategy.default_slippage_bps)
    }

    fn resolve_cooldown(&self, pool: &PoolConfig) -> u64 {
        pool.metadata_u64("cooldownSeconds")
            .unwrap_or(self.strategy.cooldown_seconds)
    }

    /// Persisted baseline for a pair, if any (primarily for inspection).
    pub fn baseline(&self, token: Address, pool: Address) -> Option<Decimal> {
        self.store.get(&StateStore::key(token, pool)).map(|s| s.baseline)
    }

    pub fn state_count(&self) -> usize {
        self.store.len()
    }
}

/// Signed basis-point change vs. baseline, truncated toward zero.
fn change_bps(price: Decimal, baseline: Decimal) -> i64 {
    let delta = (price / baseline - Decimal::ONE) * Decimal::from(10_000u32);
    let truncated = delta.trunc();
    truncated.to_i64().unwrap_or(if truncated.is_sign_negative() {
        i64::MIN
    } else {
        i64::MAX
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::TokenConfig;
    use rust_decimal_macros::dec;
    use serde_json::json;

    const TOKEN: &str = "0x3333333333333333333333333333333333333333";
    const POOL: &str = "0x4444444444444444444444444444444444444444";
    const QUOTE: &str = "0x5555555555555555555555555555555555555555";

    fn pool_with(threshold: Option<i64>, metadata: serde_json::Value) -> PoolConfig {
        let mut doc = json!({
            "type": "uniswap_v2",
            "address": POOL,
            "baseToken": TOKEN,
            "quoteToken": QUOTE,
            "metadata": metadata,
        });
        if let Some(t) = threshold {
            doc["thresholdBps"] = json!(t);
        }
        serde_json::from_value(doc).unwrap()
    }

    fn inventory(raw_balance: u64) -> TokenInventory {
        let token: TokenConfig = serde_json::from_value(json!({
            "address": TOKEN,
            "symbol": "TKN",
            "decimals": 18,
        }))
        .unwrap();
        TokenInventory {
            token,
            raw_balance: U256::from(raw_balance),
            human_balance: crate::types::to_human_units(U256::from(raw_balance), 18),
            decimals: 18,
            symbol: "TKN".to_string(),
        }
    }

    fn strategy(sell_bps: u32, cooldown: u64, threshold: i64) -> StrategyConfig {
        StrategyConfig {
            sell_percentage_bps: sell_bps,
            cooldown_seconds: cooldown,
            default_slippage_bps: 100,
            default_threshold_bps: threshold,
            use_twap: false,
        }
    }

    fn engine(config: StrategyConfig) -> StrategyEngine {
        StrategyEngine::new(config, StateStore::load(None))
    }

    fn quote(price: Decimal) -> PriceQuote {
        PriceQuote::spot(price)
    }

    #[test]
    fn test_first_evaluation_initializes_baseline() {
        let mut eng = engine(strategy(500, 0, 1000));
        let inv = inventory(1_000_000);
        let pool = pool_with(None, json!({}));

        let decision = eng.evaluate(&inv, &pool, &quote(dec!(100)), 1_000);
        assert!(!decision.should_sell);
        assert_eq!(decision.reason, DecisionReason::BaselineInitialized);
        assert_eq!(eng.state_count(), 1);

        // Second evaluation at the identical price: zero change, below threshold
        let decision = eng.evaluate(&inv, &pool, &quote(dec!(100)), 1_060);
        assert!(!decision.should_sell);
        assert_eq!(decision.change_bps, 0);
        assert_eq!(decision.reason, DecisionReason::ThresholdNotMet);
        assert_eq!(eng.state_count(), 1);
    }

    #[test]
    fn test_threshold_met_sells_and_moves_baseline() {
        let mut eng = engine(strategy(500, 0, 1000));
        let inv = inventory(1_000_000);
        let pool = pool_with(Some(900), json!({}));

        eng.evaluate(&inv, &pool, &quote(dec!(100)), 1_000);
        let decision = eng.evaluate(&inv, &pool, &quote(dec!(110)), 2_000);

        assert!(decision.should_sell);
        assert_eq!(decision.change_bps, 1000);
        assert_eq!(decision.reason, DecisionReason::ThresholdMet);
        // sellPercentageBps = 500 of 1,000,000 = 50,000 exactly
        assert_eq!(decision.sell_amount, U256::from(50_000u64));
        assert_eq!(
            eng.baseline(TOKEN.parse().unwrap(), POOL.parse().unwrap()),
            Some(dec!(110))
        );
    }

    #[test]
    fn test_cooldown_holds_then_sells_after_expiry() {
        // Threshold 0 so the still-elevated price keeps passing the gate
        let mut eng = engine(strategy(500, 3_600, 1000));
        let inv = inventory(1_000_000);
        let pool = pool_with(Some(0), json!({}));

        eng.evaluate(&inv, &pool, &quote(dec!(100)), 1_000);
        let first = eng.evaluate(&inv, &pool, &quote(dec!(110)), 2_000);
        assert!(first.should_sell);

        let during = eng.evaluate(&inv, &pool, &quote(dec!(110)), 2_500);
        assert!(!during.should_sell);
        assert_eq!(during.reason, DecisionReason::CooldownActive);

        let after = eng.evaluate(&inv, &pool, &quote(dec!(110)), 2_000 + 3_601);
        assert!(after.should_sell);
        assert_eq!(after.reason, DecisionReason::ThresholdMet);
    }

    #[test]
    fn test_cooldown_metadata_override() {
        let mut eng = engine(strategy(500, 3_600, 1000));
        let inv = inventory(1_000_000);
        let pool = pool_with(Some(0), json!({ "cooldownSeconds": 60 }));

        eng.evaluate(&inv, &pool, &quote(dec!(100)), 1_000);
        assert!(eng.evaluate(&inv, &pool, &quote(dec!(110)), 2_000).should_sell);
        // Pool-level 60s cooldown applies, not the 3600s default
        assert!(eng.evaluate(&inv, &pool, &quote(dec!(110)), 2_061).should_sell);
    }

    #[test]
    fn test_invalid_price_holds_without_state() {
        let mut eng = engine(strategy(500, 0, 1000));
        let inv = inventory(1_000_000);
        let pool = pool_with(None, json!({}));

        let decision = eng.evaluate(&inv, &pool, &quote(Decimal::ZERO), 1_000);
        assert!(!decision.should_sell);
        assert_eq!(decision.reason, DecisionReason::InvalidPrice);
        assert_eq!(eng.state_count(), 0);
    }

    #[test]
    fn test_corrupt_baseline_resets() {
        let mut store = StateStore::load(None);
        store.insert(
            StateStore::key(TOKEN.parse().unwrap(), POOL.parse().unwrap()),
            StrategyState {
                baseline: Decimal::ZERO,
                last_trigger: None,
            },
        );
        let mut eng = StrategyEngine::new(strategy(500, 0, 1000), store);
        let inv = inventory(1_000_000);
        let pool = pool_with(None, json!({}));

        let decision = eng.evaluate(&inv, &pool, &quote(dec!(42)), 1_000);
        assert_eq!(decision.reason, DecisionReason::BaselineReset);
        assert_eq!(
            eng.baseline(TOKEN.parse().unwrap(), POOL.parse().unwrap()),
            Some(dec!(42))
        );
    }

    #[test]
    fn test_insufficient_balance_holds() {
        let mut eng = engine(strategy(500, 0, 0));
        // 500 bps of 19 raw units floors to 0
        let inv = inventory(19);
        let pool = pool_with(None, json!({}));

        eng.evaluate(&inv, &pool, &quote(dec!(100)), 1_000);
        let decision = eng.evaluate(&inv, &pool, &quote(dec!(100)), 2_000);
        assert!(!decision.should_sell);
        assert_eq!(decision.reason, DecisionReason::InsufficientBalance);
    }

    #[test]
    fn test_threshold_precedence_pool_over_token_over_default() {
        let mut eng = engine(strategy(500, 0, 5_000));
        let mut inv = inventory(1_000_000);
        inv.token.threshold_bps = Some(2_000);
        // Pool override (900) wins over token (2000) and default (5000)
        let pool = pool_with(Some(900), json!({}));

        eng.evaluate(&inv, &pool, &quote(dec!(100)), 1_000);
        let decision = eng.evaluate(&inv, &pool, &quote(dec!(110)), 2_000);
        assert!(decision.should_sell);

        // Without the pool override the token-level 2000 bps gate holds
        let mut eng = engine(strategy(500, 0, 5_000));
        let pool = pool_with(None, json!({}));
        eng.evaluate(&inv, &pool, &quote(dec!(100)), 1_000);
        let decision = eng.evaluate(&inv, &pool, &quote(dec!(110)), 2_000);
        assert!(!decision.should_sell);
        assert_eq!(decision.reason, DecisionReason::ThresholdNotMet);
    }

    #[test]
    fn test_change_bps_truncates_toward_zero() {
        // +9.99% → 999, not 1000
        assert_eq!(change_bps(dec!(109.99999), dec!(100)), 999);
        // -9.99% → -999, not -1000
        assert_eq!(change_bps(dec!(90.00001), dec!(100)), -999);
        assert_eq!(change_bps(dec!(110), dec!(100)), 1000);
    }

    #[test]
    fn test_negative_threshold_triggers_on_drawdown() {
        // The comparison has no sign guard: change_bps >= threshold_bps with
        // threshold -1500 fires on a 10% price decrease. Deliberate.
        let mut eng = engine(strategy(500, 0, 1000));
        let inv = inventory(1_000_000);
        let pool = pool_with(Some(-1_500), json!({}));

        eng.evaluate(&inv, &pool, &quote(dec!(100)), 1_000);
        let decision = eng.evaluate(&inv, &pool, &quote(dec!(90)), 2_000);
        assert!(decision.should_sell);
        assert_eq!(decision.change_bps, -1000);
    }

    #[test]
    fn test_slippage_metadata_override() {
        let mut eng = engine(strategy(500, 0, 1000));
        let inv = inventory(1_000_000);
        let pool = pool_with(None, json!({ "slippageBps": 250 }));
        let decision = eng.evaluate(&inv, &pool, &quote(dec!(100)), 1_000);
        assert_eq!(decision.slippage_bps, 250);

        let pool = pool_with(None, json!({}));
        let decision = eng.evaluate(&inv, &pool, &quote(dec!(100)), 1_000);
        assert_eq!(decision.slippage_bps, 100);
    }

    #[test]
    fn test_state_persists_across_reload() {
        let path = std::env::temp_dir().join(format!(
            "vault-monitor-state-test-{}.json",
            std::process::id()
        ));
        let _ = std::fs::remove_file(&path);

        let store = StateStore::load(Some(path.clone()));
        let mut eng = StrategyEngine::new(strategy(500, 0, 900), store);
        let inv = inventory(1_000_000);
        let pool = pool_with(None, json!({}));

        eng.evaluate(&inv, &pool, &quote(dec!(100)), 1_000);
        assert!(eng.evaluate(&inv, &pool, &quote(dec!(110)), 2_000).should_sell);

        // On-disk format: lowercase "<token>::<pool>" → { baseline, lastTrigger }
        let text = std::fs::read_to_string(&path).unwrap();
        let parsed: serde_json::Value = serde_json::from_str(&text).unwrap();
        let key = format!("{TOKEN}::{POOL}");
        assert_eq!(parsed[&key]["baseline"], json!("110"));
        assert_eq!(parsed[&key]["lastTrigger"], json!(2_000));

        // Reload picks the baseline back up
        let reloaded = StateStore::load(Some(path.clone()));
        let mut eng = StrategyEngine::new(strategy(500, 0, 900), reloaded);
        let decision = eng.evaluate(&inv, &pool, &quote(dec!(110)), 3_000);
        assert_eq!(decision.change_bps, 0);
        assert_eq!(decision.reason, DecisionReason::ThresholdNotMet);

        let _ = std::fs::remove_file(&path);
    }
}
