// src/core/instruments.rs
use crate::types::Holdings;

/// Balance entry valued at exactly 1 USD per unit; it has no price feed.
pub const FIAT_SYMBOL: &str = "ZUSD";
pub const FIAT_CODE: &str = "USD";

/// Exchange asset symbol -> ticker pair. Fixed table, not discovered at runtime.
const ASSET_PAIRS: &[(&str, &str)] = &[
    ("XETH", "ETH/USD"),
    ("SOL", "SOL/USD"),
    ("XXBT", "XBT/USD"),
    (FIAT_SYMBOL, FIAT_CODE),
];

pub fn pair_for(asset: &str) -> Option<&'static str> {
    ASSET_PAIRS
        .iter()
        .find(|(symbol, _)| *symbol == asset)
        .map(|(_, pair)| *pair)
}

/// "XETH" -> "ETH", "XXBT" -> "XBT", "SOL" -> "SOL".
pub fn display_symbol(asset: &str) -> &str {
    let asset = asset.strip_prefix('X').unwrap_or(asset);
    asset.strip_prefix('Z').unwrap_or(asset)
}

/// Pairs to stream for the given holdings, sorted, without the fiat entry.
pub fn subscription_pairs(holdings: &Holdings) -> Vec<String> {
    let mut pairs: Vec<String> = holdings
        .keys()
        .filter_map(|asset| pair_for(asset))
        .filter(|pair| *pair != FIAT_CODE)
        .map(str::to_string)
        .collect();
    pairs.sort();
    pairs.dedup();
    pairs
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal::Decimal;

    #[test]
    fn known_assets_map_to_usd_pairs() {
        assert_eq!(pair_for("XETH"), Some("ETH/USD"));
        assert_eq!(pair_for("SOL"), Some("SOL/USD"));
        assert_eq!(pair_for("XXBT"), Some("XBT/USD"));
        assert_eq!(pair_for("ZUSD"), Some("USD"));
        assert_eq!(pair_for("DOT"), None);
    }

    #[test]
    fn display_symbol_strips_exchange_prefixes() {
        assert_eq!(display_symbol("XETH"), "ETH");
        assert_eq!(display_symbol("XXBT"), "XBT");
        assert_eq!(display_symbol("SOL"), "SOL");
    }

    #[test]
    fn subscription_skips_fiat_and_unmapped_assets() {
        let holdings: Holdings = [
            ("XXBT", 1),
            ("XETH", 2),
            ("ZUSD", 1000),
            ("DOT", 5),
        ]
        .into_iter()
        .map(|(k, v)| (k.to_string(), Decimal::from(v)))
        .collect();

        assert_eq!(subscription_pairs(&holdings), vec!["ETH/USD", "XBT/USD"]);
    }

    #[test]
    fn fiat_only_holdings_need_no_subscription() {
        let holdings: Holdings = [("ZUSD".to_string(), Decimal::from(10))].into_iter().collect();
        assert!(subscription_pairs(&holdings).is_empty());
    }
}
