//! Digest functions used across the wire format and script system.
//!
//! Everything here is a thin wrapper over the RustCrypto hashers with
//! fixed-size array outputs: SHA-256, the double SHA-256 used for
//! transaction ids and Base58Check checksums, RIPEMD-160, and the
//! RIPEMD-160-over-SHA-256 combination behind addresses.

use ripemd::Ripemd160;
use sha2::{Digest, Sha256};

/// SHA-256 of `data`.
pub fn sha256(data: &[u8]) -> [u8; 32] {
    Sha256::digest(data).into()
}

/// Double SHA-256: `SHA256(SHA256(data))`.
pub fn sha256d(data: &[u8]) -> [u8; 32] {
    sha256(&sha256(data))
}

/// RIPEMD-160 of `data`.
pub fn ripemd160(data: &[u8]) -> [u8; 20] {
    Ripemd160::digest(data).into()
}

/// Hash160: `RIPEMD160(SHA256(data))`, the digest embedded in P2PKH
/// and P2SH locking scripts.
pub fn hash160(data: &[u8]) -> [u8; 20] {
    ripemd160(&sha256(data))
}
