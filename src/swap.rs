//! Swap construction — venue calldata and vault call encoding
//!
//! Turns a SELL decision into a ready-to-sign `SwapExecution`: the venue
//! router, the ABI-encoded router calldata, and the minimum acceptable
//! output derived from the observed price and the effective slippage.
//! Construction only; nothing here signs or submits.
//!
//! Author: AI-Generated
//! Created: 2026-02-03

use crate::config::PoolConfig;
use crate::contracts::{fee_to_u24, ISwapRouter, IUniswapV2Router02, IVault};
use crate::error::{MonitorError, Result};
use crate::types::{
    decimal_to_u256_floor, pow10, to_human_units, PoolKind, StrategyDecision, SwapExecution,
};
use alloy::primitives::{aliases::U160, Address, Bytes, U256};
use alloy::sol_types::SolCall;
use rust_decimal::Decimal;

/// Default seconds added to `now` for router deadlines when the pool
/// metadata carries no `deadlineBuffer`.
const DEFAULT_DEADLINE_BUFFER: u64 = 600;

/// Builds vault swap instructions from strategy decisions.
pub struct SwapPlanner {
    vault: Address,
    executor: Address,
}

impl SwapPlanner {
    pub fn new(vault: Address, executor: Address) -> Self {
        Self { vault, executor }
    }

    /// Build the swap instruction for a SELL decision.
    ///
    /// Missing router/path/fee metadata is a pool-local configuration
    /// error; the caller skips the pool and keeps the cycle alive.
    pub fn build_execution(
        &self,
        decision: &StrategyDecision,
        quote_decimals: u8,
        now: u64,
    ) -> Result<SwapExecution> {
        let pool = &decision.pool;
        let min_amount_out = compute_min_amount_out(
            decision.sell_amount,
            decision.inventory.decimals,
            decision.price,
            decision.slippage_bps,
            quote_decimals,
        );

        let router = pool.metadata_address("router")?.ok_or_else(|| {
            MonitorError::config(format!("pool {}: metadata 'router' is required", pool.address))
        })?;
        let deadline = now + pool.metadata_u64("deadlineBuffer").unwrap_or(DEFAULT_DEADLINE_BUFFER);

        let payload = match pool.kind()? {
            PoolKind::UniswapV2 => {
                self.encode_v2(pool, decision.sell_amount, min_amount_out, deadline)?
            }
            PoolKind::UniswapV3 => {
                self.encode_v3(pool, decision.sell_amount, min_amount_out, deadline)?
            }
        };

        // Proceeds destination for the vault call itself; defaults to the
        // executor contract unless the pool redirects them.
        let recipient = pool.metadata_address("recipient")?.unwrap_or(self.executor);

        Ok(SwapExecution {
            venue: router,
            token_in: pool.base_token,
            token_out: pool.quote_token,
            amount_in: decision.sell_amount,
            min_amount_out,
            recipient,
            payload,
        })
    }

    fn encode_v2(
        &self,
        pool: &PoolConfig,
        amount_in: U256,
        amount_out_min: U256,
        deadline: u64,
    ) -> Result<Bytes> {
        let path = pool
            .metadata_path()?
            .filter(|p| !p.is_empty())
            .ok_or_else(|| {
                MonitorError::config(format!(
                    "pool {}: metadata 'path' is required for constant-product swaps",
                    pool.address
                ))
            })?;

        let call = IUniswapV2Router02::swapExactTokensForTokensCall {
            amountIn: amount_in,
            amountOutMin: amount_out_min,
            path,
            // Router output lands back in the vault; the vault forwards
            // proceeds to the configured recipient itself.
            to: self.vault,
            deadline: U256::from(deadline),
        };
        Ok(call.abi_encode().into())
    }

    fn encode_v3(
        &self,
        pool: &PoolConfig,
        amount_in: U256,
        amount_out_min: U256,
        deadline: u64,
    ) -> Result<Bytes> {
        let fee = pool.fee.ok_or_else(|| {
            MonitorError::config(format!(
                "pool {}: 'fee' is required for concentrated-liquidity swaps",
                pool.address
            ))
        })?;
        let recipient = pool.metadata_address("routerRecipient")?.unwrap_or(self.vault);

        let params = ISwapRouter::ExactInputSingleParams {
            tokenIn: pool.base_token,
            tokenOut: pool.quote_token,
            fee: fee_to_u24(fee)?,
            recipient,
            deadline: U256::from(deadline),
            amountIn: amount_in,
            amountOutMinimum: amount_out_min,
            // Zero disables the in-router price limit
            sqrtPriceLimitX96: U160::ZERO,
        };
        let call = ISwapRouter::exactInputSingleCall { params };
        Ok(call.abi_encode().into())
    }
}

/// ABI-encode the vault's `swapTokens` call for a built execution.
pub fn encode_vault_call(execution: &SwapExecution) -> Bytes {
    IVault::swapTokensCall {
        dex: execution.venue,
        tokenIn: execution.token_in,
        tokenOut: execution.token_out,
        amountIn: execution.amount_in,
        minAmountOut: execution.min_amount_out,
        recipient: execution.recipient,
        data: execution.payload.clone(),
    }
    .abi_encode()
    .into()
}

/// Minimum acceptable output in raw quote units:
/// humanSell × price × (1 − slippage/10000), rescaled and floored,
/// clamped to at least 1 so a rounded-to-zero bound can never disable
/// slippage protection entirely.
pub(crate) fn compute_min_amount_out(
    sell_amount: U256,
    base_decimals: u8,
    price: Decimal,
    slippage_bps: u32,
    quote_decimals: u8,
) -> U256 {
    let human_sell = to_human_units(sell_amount, base_decimals);
    let slippage_factor = Decimal::ONE - Decimal::from(slippage_bps) / Decimal::from(10_000u32);
    let min_human = human_sell * price * slippage_factor;
    let raw = decimal_to_u256_floor(min_human * pow10(quote_decimals as i32));
    raw.max(U256::from(1u8))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::TokenConfig;
    use crate::types::{DecisionReason, TokenInventory};
    use rust_decimal_macros::dec;
    use serde_json::json;

    const VAULT: &str = "0x1111111111111111111111111111111111111111";
    const EXECUTOR: &str = "0x2222222222222222222222222222222222222222";
    const TOKEN: &str = "0x3333333333333333333333333333333333333333";
    const QUOTE: &str = "0x5555555555555555555555555555555555555555";
    const ROUTER: &str = "0x6666666666666666666666666666666666666666";

    fn pool(doc: serde_json::Value) -> PoolConfig {
        serde_json::from_value(doc).unwrap()
    }

    fn v2_pool() -> PoolConfig {
        pool(json!({
            "type": "uniswap_v2",
            "address": "0x4444444444444444444444444444444444444444",
            "baseToken": TOKEN,
            "quoteToken": QUOTE,
            "metadata": { "router": ROUTER, "path": [TOKEN, QUOTE] }
        }))
    }

    fn v3_pool() -> PoolConfig {
        pool(json!({
            "type": "uniswap_v3",
            "address": "0x4444444444444444444444444444444444444444",
            "baseToken": TOKEN,
            "quoteToken": QUOTE,
            "fee": 3000,
            "metadata": { "router": ROUTER }
        }))
    }

    fn decision(pool: PoolConfig, sell_amount: U256, price: Decimal) -> StrategyDecision {
        let token: TokenConfig = serde_json::from_value(json!({
            "address": TOKEN, "symbol": "TKN", "decimals": 18
        }))
        .unwrap();
        StrategyDecision {
            should_sell: true,
            inventory: TokenInventory {
                token,
                raw_balance: sell_amount * U256::from(20u8),
                human_balance: to_human_units(sell_amount * U256::from(20u8), 18),
                decimals: 18,
                symbol: "TKN".to_string(),
            },
            pool,
            price,
            change_bps: 1000,
            sell_amount,
            slippage_bps: 100,
            reason: DecisionReason::ThresholdMet,
        }
    }

    fn planner() -> SwapPlanner {
        SwapPlanner::new(VAULT.parse().unwrap(), EXECUTOR.parse().unwrap())
    }

    #[test]
    fn test_min_amount_out_exact() {
        // Sell 1.0 (18 dec) at price 2 with 1% slippage into a 6-dec quote:
        // 1 × 2 × 0.99 = 1.98 → 1_980_000 raw
        let one = U256::from(10u64).pow(U256::from(18));
        let min = compute_min_amount_out(one, 18, dec!(2), 100, 6);
        assert_eq!(min, U256::from(1_980_000u64));
    }

    #[test]
    fn test_min_amount_out_never_zero() {
        // A dust sell with near-total slippage still demands one raw unit
        let min = compute_min_amount_out(U256::from(1u8), 18, dec!(0.000001), 9999, 6);
        assert_eq!(min, U256::from(1u8));
    }

    #[test]
    fn test_v2_payload_round_trip() {
        let one = U256::from(10u64).pow(U256::from(18));
        let execution = planner()
            .build_execution(&decision(v2_pool(), one, dec!(2)), 6, 1_000)
            .unwrap();

        assert_eq!(execution.venue, ROUTER.parse::<Address>().unwrap());
        assert_eq!(execution.min_amount_out, U256::from(1_980_000u64));
        // No recipient override: proceeds go to the executor
        assert_eq!(execution.recipient, EXECUTOR.parse::<Address>().unwrap());

        let call =
            IUniswapV2Router02::swapExactTokensForTokensCall::abi_decode(&execution.payload)
                .unwrap();
        assert_eq!(call.amountIn, one);
        assert_eq!(call.amountOutMin, U256::from(1_980_000u64));
        assert_eq!(call.path, vec![TOKEN.parse::<Address>().unwrap(), QUOTE.parse().unwrap()]);
        assert_eq!(call.to, VAULT.parse::<Address>().unwrap());
        // Default deadline buffer of 600s
        assert_eq!(call.deadline, U256::from(1_600u64));
    }

    #[test]
    fn test_v3_payload_and_router_recipient_override() {
        let mut p = v3_pool();
        p.metadata.insert(
            "routerRecipient".to_string(),
            json!("0x7777777777777777777777777777777777777777"),
        );
        p.metadata.insert("deadlineBuffer".to_string(), json!(120));
        let one = U256::from(10u64).pow(U256::from(18));
        let execution = planner().build_execution(&decision(p, one, dec!(2)), 6, 1_000).unwrap();

        let call = ISwapRouter::exactInputSingleCall::abi_decode(&execution.payload).unwrap();
        assert_eq!(call.params.tokenIn, TOKEN.parse::<Address>().unwrap());
        assert_eq!(call.params.tokenOut, QUOTE.parse::<Address>().unwrap());
        assert_eq!(call.params.fee, fee_to_u24(3000).unwrap());
        assert_eq!(
            call.params.recipient,
            "0x7777777777777777777777777777777777777777".parse::<Address>().unwrap()
        );
        assert_eq!(call.params.deadline, U256::from(1_120u64));
        assert_eq!(call.params.sqrtPriceLimitX96, U160::ZERO);
    }

    #[test]
    fn test_v3_default_router_recipient_is_vault() {
        let one = U256::from(10u64).pow(U256::from(18));
        let execution = planner()
            .build_execution(&decision(v3_pool(), one, dec!(2)), 6, 1_000)
            .unwrap();
        let call = ISwapRouter::exactInputSingleCall::abi_decode(&execution.payload).unwrap();
        assert_eq!(call.params.recipient, VAULT.parse::<Address>().unwrap());
    }

    #[test]
    fn test_recipient_metadata_override() {
        let mut p = v2_pool();
        p.metadata.insert(
            "recipient".to_string(),
            json!("0x8888888888888888888888888888888888888888"),
        );
        let execution = planner()
            .build_execution(&decision(p, U256::from(1_000u64), dec!(2)), 6, 1_000)
            .unwrap();
        assert_eq!(
            execution.recipient,
            "0x8888888888888888888888888888888888888888".parse::<Address>().unwrap()
        );
    }

    #[test]
    fn test_missing_router_is_config_error() {
        let mut p = v2_pool();
        p.metadata.remove("router");
        let result = planner().build_execution(&decision(p, U256::from(1u8), dec!(2)), 6, 1_000);
        assert!(matches!(result, Err(MonitorError::Config(_))));
    }

    #[test]
    fn test_missing_or_empty_path_is_config_error() {
        let mut p = v2_pool();
        p.metadata.remove("path");
        let missing = planner().build_execution(&decision(p, U256::from(1u8), dec!(2)), 6, 1_000);
        assert!(matches!(missing, Err(MonitorError::Config(_))));

        let mut p = v2_pool();
        p.metadata.insert("path".to_string(), json!([]));
        let empty = planner().build_execution(&decision(p, U256::from(1u8), dec!(2)), 6, 1_000);
        assert!(matches!(empty, Err(MonitorError::Config(_))));
    }

    #[test]
    fn test_missing_fee_is_config_error() {
        let mut p = v3_pool();
        p.fee = None;
        let result = planner().build_execution(&decision(p, U256::from(1u8), dec!(2)), 6, 1_000);
        assert!(matches!(result, Err(MonitorError::Config(_))));
    }

    #[test]
    fn test_out_of_range_fee_is_config_error() {
        // uint24 tops out at 16_777_215; a fat-fingered registry fee must
        // surface as a pool-local error, not a panic
        let mut p = v3_pool();
        p.fee = Some(20_000_000);
        let result = planner().build_execution(&decision(p, U256::from(1u8), dec!(2)), 6, 1_000);
        assert!(matches!(result, Err(MonitorError::Config(_))));
    }

    #[test]
    fn test_vault_call_encoding_round_trip() {
        let one = U256::from(10u64).pow(U256::from(18));
        let execution = planner()
            .build_execution(&decision(v2_pool(), one, dec!(2)), 6, 1_000)
            .unwrap();
        let calldata = encode_vault_call(&execution);

        let call = IVault::swapTokensCall::abi_decode(&calldata).unwrap();
        assert_eq!(call.dex, execution.venue);
        assert_eq!(call.tokenIn, execution.token_in);
        assert_eq!(call.tokenOut, execution.token_out);
        assert_eq!(call.amountIn, execution.amount_in);
        assert_eq!(call.minAmountOut, execution.min_amount_out);
        assert_eq!(call.recipient, execution.recipient);
        assert_eq!(call.data, execution.payload);
    }
}
