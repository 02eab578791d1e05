pub mod engine;
pub mod instruments;
pub mod ledger;
pub mod traits;
pub mod valuator;
