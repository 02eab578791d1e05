// src/utils/precision.rs
use rust_decimal::{Decimal, RoundingStrategy};

fn round(value: Decimal, dp: u32) -> Decimal {
    value.round_dp_with_strategy(dp, RoundingStrategy::MidpointAwayFromZero)
}

/// Large balances get cents, small ones keep satoshi-level precision.
/// Example: 1500 -> "1500.00", 0.5 -> "0.50000000"
pub fn format_balance(balance: Decimal) -> String {
    if balance >= Decimal::ONE_THOUSAND {
        format!("{:.2}", round(balance, 2))
    } else {
        format!("{:.8}", round(balance, 8))
    }
}

/// Example: 7500 -> "$7500.00"
pub fn format_usd(value: Decimal) -> String {
    format!("${:.2}", round(value, 2))
}
