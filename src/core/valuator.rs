// src/core/valuator.rs
use crate::core::instruments::{display_symbol, pair_for, FIAT_CODE, FIAT_SYMBOL};
use crate::core::ledger::PriceLedger;
use crate::types::{AssetValuation, Holdings};
use rust_decimal::Decimal;

/// Values every holding that has a price source. Unmapped assets are left out.
/// Order follows the holdings map and carries no meaning.
/// A product too large for `Decimal` saturates at `Decimal::MAX`.
pub fn valuate(holdings: &Holdings, ledger: &PriceLedger) -> Vec<AssetValuation> {
    holdings
        .iter()
        .filter_map(|(asset, &balance)| {
            if asset == FIAT_SYMBOL {
                return Some(AssetValuation {
                    asset: FIAT_CODE.to_string(),
                    balance,
                    price: Decimal::ONE,
                    prev_price: Decimal::ONE,
                    usd_value: balance,
                });
            }

            let pair = pair_for(asset)?;
            let (price, prev_price) = ledger.read(pair);
            Some(AssetValuation {
                asset: display_symbol(asset).to_string(),
                balance,
                price,
                prev_price,
                usd_value: balance.checked_mul(price).unwrap_or(Decimal::MAX),
            })
        })
        .collect()
}
