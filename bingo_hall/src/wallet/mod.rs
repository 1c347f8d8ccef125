//! Balance management: entry-fee debits and prize credits.

pub mod errors;
pub mod manager;

pub use errors::{WalletError, WalletResult};
pub use manager::{WalletManager, WalletStore};
