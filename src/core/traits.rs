// src/core/traits.rs
use crate::types::AssetValuation;

/// Receives the full portfolio valuation once per processed tick, synchronously,
/// on the stream loop's task. A slow sink holds up the next tick.
pub trait ValuationSink: Send {
    fn deliver(&mut self, valuations: Vec<AssetValuation>);
}

impl<F> ValuationSink for F
where
    F: FnMut(Vec<AssetValuation>) + Send,
{
    fn deliver(&mut self, valuations: Vec<AssetValuation>) {
        self(valuations)
    }
}
