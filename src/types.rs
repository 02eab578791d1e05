// src/types.rs
use rust_decimal::Decimal;
use std::collections::HashMap;

/// Exchange-native asset symbol -> strictly positive balance.
pub type Holdings = HashMap<String, Decimal>;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Tick {
    pub pair: String,
    pub price: Decimal,
}

/// One held asset valued in USD at the latest observed price.
#[derive(Debug, Clone, PartialEq)]
pub struct AssetValuation {
    pub asset: String, // display symbol, e.g. "ETH"
    pub balance: Decimal,
    pub price: Decimal,
    pub prev_price: Decimal,
    pub usd_value: Decimal,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClientState {
    Idle,
    BalancesLoaded,
    Connected,
    Subscribed,
    Streaming,
    Closed,
    Error,
}

// --- TUI ---

#[derive(Debug, Clone)]
pub enum UiEvent {
    Portfolio(Vec<AssetValuation>),
    Log(String),
}
