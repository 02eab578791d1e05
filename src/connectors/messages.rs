// src/connectors/messages.rs
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;
use std::str::FromStr;

/// Envelope returned by every private REST endpoint.
/// `result` values are kept loose so that one odd entry cannot sink the whole response.
#[derive(Debug, Deserialize)]
pub struct BalanceResponse {
    #[serde(default)]
    pub error: Vec<String>,
    #[serde(default)]
    pub result: HashMap<String, Value>,
}

#[derive(Debug, Serialize)]
pub struct SubscribeRequest<'a> {
    pub event: &'static str,
    pub pair: &'a [String],
    pub subscription: Subscription,
}

#[derive(Debug, Serialize)]
pub struct Subscription {
    pub name: &'static str,
}

impl<'a> SubscribeRequest<'a> {
    pub fn ticker(pairs: &'a [String]) -> Self {
        Self {
            event: "subscribe",
            pair: pairs,
            subscription: Subscription { name: "ticker" },
        }
    }
}

/// `"c"` = last trade closed: `[price, lot volume]`.
#[derive(Debug, Deserialize)]
struct TickerPayload {
    #[serde(rename = "c")]
    close: Vec<Value>,
}

/// A decoded inbound frame on the public stream.
///
/// Ticker updates look like `[channelID, {"c": ["3050.5", "1.2"], ...}, "ticker", "ETH/USD"]`.
/// Heartbeats, system status, subscription acks and anything else that does not have
/// exactly that shape decode to `Ignored`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StreamFrame {
    Ticker { pair: String, price: Decimal },
    Ignored,
}

impl StreamFrame {
    pub fn decode(text: &str) -> Self {
        Self::decode_ticker(text).unwrap_or(StreamFrame::Ignored)
    }

    fn decode_ticker(text: &str) -> Option<Self> {
        let Value::Array(items) = serde_json::from_str::<Value>(text).ok()? else {
            return None;
        };
        if items.len() < 4 || !items[1].is_object() {
            return None;
        }

        let payload = TickerPayload::deserialize(&items[1]).ok()?;
        let price_str = payload.close.first()?.as_str()?;
        let pair = items[3].as_str()?;
        let price = Decimal::from_str(price_str).ok()?;
        if price < Decimal::ZERO {
            return None;
        }

        Some(StreamFrame::Ticker {
            pair: pair.to_string(),
            price,
        })
    }
}
