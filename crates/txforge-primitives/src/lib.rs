/// txforge - Cryptographic primitives, hashing, and byte-level utilities.
///
/// This crate provides the foundational building blocks for the engine:
/// - Hash functions (SHA-256, SHA-256d, RIPEMD-160, Hash160)
/// - Chain hash type for transaction identification
/// - Variable-length integer and little-endian byte codecs
/// - Elliptic curve cryptography (secp256k1 keys and signatures)

pub mod hash;
pub mod chainhash;
pub mod util;
pub mod ec;

mod error;
pub use ec::{PrivateKey, PublicKey, Signature};
pub use error::PrimitivesError;
