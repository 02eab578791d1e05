pub mod kraken;
pub mod messages;
pub mod signer;
pub mod stream;
pub mod traits;
