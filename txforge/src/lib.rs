#![deny(missing_docs)]

//! Transaction construction, scripting, and signing engine.
//!
//! Re-exports the component crates for convenient single-crate usage.

pub use txforge_primitives as primitives;
pub use txforge_script as script;
pub use txforge_transaction as transaction;

pub use txforge_script::{Address, Network, Script};
pub use txforge_transaction::{Amount, NetworkParams, OutPoint, Transaction, TxBuilder, Utxo};
