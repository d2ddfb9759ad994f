//! Transaction model, signature-hash engine, and fluent builder.
//!
//! [`Transaction`] is the wire-level model with full serialization support.
//! [`builder::TxBuilder`] assembles transactions from UTXOs with fee, dust,
//! and change validation. [`sighash`] implements both the legacy and the
//! fork-id digest algorithms, and [`checker::TransactionSignatureChecker`]
//! plugs them into the script interpreter.

pub mod amount;
pub mod builder;
pub mod checker;
mod error;
pub mod input;
pub mod outpoint;
pub mod output;
pub mod params;
pub mod sighash;
pub mod template;
pub mod transaction;

pub use amount::Amount;
pub use builder::TxBuilder;
pub use checker::TransactionSignatureChecker;
pub use error::TransactionError;
pub use input::TransactionInput;
pub use outpoint::{OutPoint, Utxo};
pub use output::TransactionOutput;
pub use params::NetworkParams;
pub use transaction::Transaction;

#[cfg(test)]
mod tests;
