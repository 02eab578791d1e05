use crate::error::Result;
use crate::types::Holdings;
use async_trait::async_trait;

#[async_trait]
pub trait BalanceSource: Send + Sync {
    /// Strictly positive balances keyed by exchange-native asset symbol.
    async fn fetch_balances(&self) -> Result<Holdings>;
}
