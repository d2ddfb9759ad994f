//! Full script interpreter.
//!
//! Executes locking and unlocking scripts to verify transaction inputs,
//! supporting all standard opcodes and verification flags.
//!
//! # Architecture
//!
//! The interpreter does not depend on the transaction crate directly to avoid
//! circular dependencies. Instead, callers provide a [`SignatureChecker`]
//! trait implementation that handles signature hash computation and
//! verification for the input under evaluation.
//!
//! # Example
//!
//! ```ignore
//! use txforge_script::interpreter::{verify_script, ScriptFlags};
//!
//! let (ok, code) = verify_script(
//!     &unlocking_script,
//!     &locking_script,
//!     ScriptFlags::VERIFY_P2SH,
//!     None, // no signature checker needed for simple scripts
//! );
//! ```

pub mod config;
pub mod error;
pub mod flags;
mod ops_arithmetic;
mod ops_crypto;
mod ops_data;
mod ops_flow;
mod ops_stack;
pub mod parsed_opcode;
pub mod scriptnum;
pub mod stack;
pub mod thread;

pub use config::Config;
pub use error::{InterpreterError, InterpreterErrorCode};
pub use flags::ScriptFlags;
pub use parsed_opcode::{ParsedOpcode, ParsedScript};
pub use scriptnum::ScriptNumber;
pub use stack::Stack;

use crate::Script;
use thread::Thread;

/// Signature checker trait — provides transaction-dependent verification
/// without a circular dependency on the transaction crate.
///
/// Implementors back OP_CHECKSIG, OP_CHECKMULTISIG, OP_CHECKLOCKTIMEVERIFY,
/// and OP_CHECKSEQUENCEVERIFY for a single transaction input.
pub trait SignatureChecker {
    /// Verify a signature against a public key.
    ///
    /// `sig_with_type` includes the sighash flag byte at the end.
    /// `pub_key` is the public key bytes.
    /// `sub_script` is the relevant portion of the locking script.
    /// `flags` are the active verification flags.
    ///
    /// Returns Ok(true) if valid, Ok(false) if invalid, Err on failure.
    fn check_signature(
        &self,
        sig_with_type: &[u8],
        pub_key: &[u8],
        sub_script: &Script,
        flags: ScriptFlags,
    ) -> Result<bool, InterpreterError>;

    /// The transaction lock time.
    fn lock_time(&self) -> u32;

    /// The transaction version.
    fn tx_version(&self) -> u32;

    /// The sequence number of the input being verified.
    fn sequence(&self) -> u32;
}

/// The script execution engine.
pub struct Engine;

impl Engine {
    pub fn new() -> Self {
        Engine
    }

    /// Execute unlocking + locking scripts.
    ///
    /// # Arguments
    /// * `unlocking_script` - The input's unlocking (signature) script.
    /// * `locking_script` - The output's locking (pubkey) script.
    /// * `flags` - Verification flags.
    /// * `checker` - Optional signature checker for checksig operations.
    pub fn execute(
        &self,
        unlocking_script: &Script,
        locking_script: &Script,
        flags: ScriptFlags,
        checker: Option<&dyn SignatureChecker>,
    ) -> Result<(), InterpreterError> {
        let mut thread = Thread::new(unlocking_script, locking_script, flags, checker)?;
        thread.execute()
    }
}

impl Default for Engine {
    fn default() -> Self {
        Engine::new()
    }
}

/// Verify a script pair, returning the outcome as a value instead of an error.
///
/// This never panics and never returns an error: malformed scripts, limit
/// violations, and evaluation failures all map to `(false, code)` where the
/// code identifies the first violation encountered.
pub fn verify_script(
    script_sig: &Script,
    script_pub_key: &Script,
    flags: ScriptFlags,
    checker: Option<&dyn SignatureChecker>,
) -> (bool, InterpreterErrorCode) {
    match Engine::new().execute(script_sig, script_pub_key, flags, checker) {
        Ok(()) => (true, InterpreterErrorCode::Ok),
        Err(e) => (false, e.code),
    }
}
