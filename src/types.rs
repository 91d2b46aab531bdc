//! Core data structures shared across the monitoring pipeline

use crate::config::{PoolConfig, TokenConfig};
use crate::error::{MonitorError, Result};
use alloy::primitives::{Address, Bytes, U256};
use rust_decimal::prelude::{FromPrimitive, ToPrimitive};
use rust_decimal::Decimal;
use std::fmt;

/// Venue families we support
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PoolKind {
    /// Constant-product pair (Uniswap V2 and forks)
    UniswapV2,
    /// Concentrated-liquidity pool (Uniswap V3)
    UniswapV3,
}

impl PoolKind {
    /// Parse a registry `type` tag. Unknown tags are a configuration error
    /// for the pool being processed, never a panic.
    pub fn parse(tag: &str) -> Result<Self> {
        match tag.to_ascii_lowercase().as_str() {
            "uniswap_v2" | "univ2" | "sushiswap" => Ok(PoolKind::UniswapV2),
            "uniswap_v3" | "univ3" => Ok(PoolKind::UniswapV3),
            other => Err(MonitorError::config(format!(
                "unsupported pool type: {other}"
            ))),
        }
    }

    /// Canonical tag written back to the registry by discovery.
    pub fn registry_tag(&self) -> &'static str {
        match self {
            PoolKind::UniswapV2 => "uniswap_v2",
            PoolKind::UniswapV3 => "uniswap_v3",
        }
    }

    /// Returns true for concentrated-liquidity venues
    pub fn is_v3(&self) -> bool {
        matches!(self, PoolKind::UniswapV3)
    }
}

impl fmt::Display for PoolKind {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(self.registry_tag())
    }
}

/// Point-in-time snapshot of a vault holding.
/// Owned by the cycle that created it; never mutated after creation.
#[derive(Debug, Clone)]
pub struct TokenInventory {
    pub token: TokenConfig,
    pub raw_balance: U256,
    pub human_balance: Decimal,
    pub decimals: u8,
    pub symbol: String,
}

/// A computed base/quote exchange rate.
/// `tick` is present only for concentrated-liquidity venues.
#[derive(Debug, Clone, PartialEq)]
pub struct PriceQuote {
    pub price: Decimal,
    pub tick: Option<i32>,
}

impl PriceQuote {
    pub fn spot(price: Decimal) -> Self {
        Self { price, tick: None }
    }
}

/// Machine-readable reason attached to every strategy decision
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DecisionReason {
    InvalidPrice,
    BaselineInitialized,
    BaselineReset,
    ThresholdNotMet,
    CooldownActive,
    InsufficientBalance,
    ThresholdMet,
}

impl DecisionReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            DecisionReason::InvalidPrice => "invalid price",
            DecisionReason::BaselineInitialized => "baseline initialized",
            DecisionReason::BaselineReset => "baseline reset",
            DecisionReason::ThresholdNotMet => "threshold not met",
            DecisionReason::CooldownActive => "cooldown active",
            DecisionReason::InsufficientBalance => "insufficient balance",
            DecisionReason::ThresholdMet => "price threshold met",
        }
    }
}

impl fmt::Display for DecisionReason {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Outcome of one strategy evaluation for a (token, pool) pair.
/// Produced fresh per evaluation; never mutated.
#[derive(Debug, Clone)]
pub struct StrategyDecision {
    pub should_sell: bool,
    pub inventory: TokenInventory,
    pub pool: PoolConfig,
    pub price: Decimal,
    /// Signed change vs. baseline in basis points, truncated toward zero
    pub change_bps: i64,
    /// Proposed sell amount in raw token units (zero when holding)
    pub sell_amount: U256,
    pub slippage_bps: u32,
    pub reason: DecisionReason,
}

/// A ready-to-sign vault swap instruction.
/// Construction only — this core never submits or confirms transactions.
#[derive(Debug, Clone)]
pub struct SwapExecution {
    pub venue: Address,
    pub token_in: Address,
    pub token_out: Address,
    pub amount_in: U256,
    pub min_amount_out: U256,
    pub recipient: Address,
    /// Opaque venue calldata produced by the adapter
    pub payload: Bytes,
}

// ── Decimal conversion helpers ───────────────────────────────────────

/// 10^exp as a Decimal. Token decimals keep `exp` small, so the loop is fine.
pub fn pow10(exp: i32) -> Decimal {
    let mut value = Decimal::ONE;
    for _ in 0..exp.unsigned_abs() {
        if exp >= 0 {
            value *= Decimal::TEN;
        } else {
            value /= Decimal::TEN;
        }
    }
    value
}

/// Convert a raw integer amount to a Decimal.
///
/// rust_decimal carries a 96-bit mantissa, so very large balances
/// (> ~7.9e28) fall back to an f64 approximation — more than enough
/// precision for threshold and slippage math.
pub fn u256_to_decimal(value: U256) -> Decimal {
    let text = value.to_string();
    if let Ok(exact) = text.parse::<Decimal>() {
        return exact;
    }
    let approx: f64 = text.parse().unwrap_or(f64::MAX);
    Decimal::from_f64(approx).unwrap_or(Decimal::MAX)
}

/// Decimal-normalize a raw amount by the token's decimals.
pub fn to_human_units(raw: U256, decimals: u8) -> Decimal {
    u256_to_decimal(raw) / pow10(decimals as i32)
}

/// Floor a non-negative Decimal to a U256, discarding the fraction.
pub fn decimal_to_u256_floor(value: Decimal) -> U256 {
    if value <= Decimal::ZERO {
        return U256::ZERO;
    }
    let floored = value.trunc();
    match floored.to_u128() {
        Some(v) => U256::from(v),
        // Integer part wider than u128: parse its digits directly
        None => {
            let text = floored.to_string();
            let digits = text.split('.').next().unwrap_or("0");
            U256::from_str_radix(digits, 10).unwrap_or(U256::ZERO)
        }
    }
}
