// src/core/ledger.rs
use rust_decimal::Decimal;
use std::collections::HashMap;

/// Latest and one-step-previous price per pair symbol.
#[derive(Debug, Default, Clone)]
pub struct PriceLedger {
    current: HashMap<String, Decimal>,
    previous: HashMap<String, Decimal>,
}

impl PriceLedger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn update(&mut self, pair: &str, price: Decimal) {
        let before = self.current.insert(pair.to_string(), price);
        self.previous
            .insert(pair.to_string(), before.unwrap_or(Decimal::ZERO));
    }

    /// `(current, previous)`, zero for pairs that have not ticked yet.
    pub fn read(&self, pair: &str) -> (Decimal, Decimal) {
        (self.current(pair), self.previous(pair))
    }

    pub fn current(&self, pair: &str) -> Decimal {
        self.current.get(pair).copied().unwrap_or(Decimal::ZERO)
    }

    pub fn previous(&self, pair: &str) -> Decimal {
        self.previous.get(pair).copied().unwrap_or(Decimal::ZERO)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unseen_pair_reads_zero() {
        let ledger = PriceLedger::new();
        assert_eq!(ledger.read("ETH/USD"), (Decimal::ZERO, Decimal::ZERO));
    }

    #[test]
    fn first_update_has_zero_previous() {
        let mut ledger = PriceLedger::new();
        ledger.update("ETH/USD", Decimal::from(3000));
        assert_eq!(ledger.read("ETH/USD"), (Decimal::from(3000), Decimal::ZERO));
    }

    #[test]
    fn previous_lags_current_by_one_update() {
        let mut ledger = PriceLedger::new();
        for (price, expected_prev) in [(3000, 0), (3100, 3000), (2900, 3100)] {
            ledger.update("ETH/USD", Decimal::from(price));
            assert_eq!(
                ledger.read("ETH/USD"),
                (Decimal::from(price), Decimal::from(expected_prev))
            );
        }
    }

    #[test]
    fn pairs_are_tracked_independently() {
        let mut ledger = PriceLedger::new();
        ledger.update("ETH/USD", Decimal::from(3000));
        ledger.update("SOL/USD", Decimal::from(100));
        ledger.update("ETH/USD", Decimal::from(3100));

        assert_eq!(ledger.read("SOL/USD"), (Decimal::from(100), Decimal::ZERO));
        assert_eq!(ledger.previous("ETH/USD"), Decimal::from(3000));
    }
}
