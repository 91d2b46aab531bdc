//! Centralized Contract Definitions
//!
//! All Solidity contract interfaces for the vault monitor,
//! defined using alloy's `sol!` macro.
//!
//! Each interface is annotated with `#[sol(rpc)]` to generate
//! contract instance types that can make RPC calls via any alloy Provider.
//!
//! Author: AI-Generated
//! Created: 2026-02-03

use alloy::sol;

// ── ERC20 ─────────────────────────────────────────────────────────────

sol! {
    #[sol(rpc)]
    interface IERC20 {
        event Transfer(address indexed from, address indexed to, uint256 value);

        function balanceOf(address account) external view returns (uint256);
        function decimals() external view returns (uint8);
        function symbol() external view returns (string);
    }
}

// ── Uniswap V2 ───────────────────────────────────────────────────────

sol! {
    #[sol(rpc)]
    interface IUniswapV2Factory {
        function getPair(address tokenA, address tokenB) external view returns (address pair);
    }
}

sol! {
    #[sol(rpc)]
    interface IUniswapV2Pair {
        function getReserves() external view returns (uint112 reserve0, uint112 reserve1, uint32 blockTimestampLast);
        function token0() external view returns (address);
        function token1() external view returns (address);
    }
}

sol! {
    #[sol(rpc)]
    interface IUniswapV2Router02 {
        function swapExactTokensForTokens(uint256 amountIn, uint256 amountOutMin, address[] calldata path, address to, uint256 deadline) external returns (uint256[] memory amounts);
    }
}

// ── Uniswap V3 ───────────────────────────────────────────────────────

sol! {
    #[sol(rpc)]
    interface UniswapV3Factory {
        function getPool(address tokenA, address tokenB, uint24 fee) external view returns (address pool);
    }
}

sol! {
    #[sol(rpc)]
    interface UniswapV3Pool {
        function slot0() external view returns (uint160 sqrtPriceX96, int24 tick, uint16 observationIndex, uint16 observationCardinality, uint16 observationCardinalityNext, uint8 feeProtocol, bool unlocked);
        function observe(uint32[] calldata secondsAgos) external view returns (int56[] memory tickCumulatives, uint160[] memory secondsPerLiquidityCumulativeX128s);
        function liquidity() external view returns (uint128);
        function token0() external view returns (address);
        function token1() external view returns (address);
    }
}

sol! {
    #[sol(rpc)]
    interface ISwapRouter {
        struct ExactInputSingleParams {
            address tokenIn;
            address tokenOut;
            uint24 fee;
            address recipient;
            uint256 deadline;
            uint256 amountIn;
            uint256 amountOutMinimum;
            uint160 sqrtPriceLimitX96;
        }

        function exactInputSingle(ExactInputSingleParams calldata params) external payable returns (uint256 amountOut);
    }
}

// ── Vault ────────────────────────────────────────────────────────────

sol! {
    #[sol(rpc)]
    interface IVault {
        function swapTokens(address dex, address tokenIn, address tokenOut, uint256 amountIn, uint256 minAmountOut, address recipient, bytes calldata data) external;
    }
}

/// Helper: convert a u32 fee tier to alloy's uint24 type for contract calls.
/// Uses from_limbs() because Uint<24, 1> doesn't impl From<u32>. Fee tiers
/// come from operator-supplied registry entries, so an out-of-range value is
/// a configuration error for that pool, never a panic.
pub fn fee_to_u24(fee: u32) -> crate::error::Result<alloy::primitives::Uint<24, 1>> {
    if fee > 0xFFFFFF {
        return Err(crate::error::MonitorError::config(format!(
            "fee {fee} exceeds uint24 range (16777215)"
        )));
    }
    Ok(alloy::primitives::Uint::from_limbs([fee as u64]))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fee_to_u24_bounds() {
        assert_eq!(fee_to_u24(3000).unwrap().to::<u32>(), 3000);
        assert_eq!(fee_to_u24(0xFFFFFF).unwrap().to::<u32>(), 0xFFFFFF);
        assert!(fee_to_u24(0x1000000).is_err());
        assert!(fee_to_u24(u32::MAX).is_err());
    }
}
