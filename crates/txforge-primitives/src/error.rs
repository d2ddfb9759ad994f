/// Error type shared by the key, signature, hash, and serialization
/// primitives.
#[derive(Debug, thiserror::Error)]
pub enum PrimitivesError {
    // Key material
    #[error("invalid private key: {0}")]
    InvalidPrivateKey(String),

    #[error("invalid public key: {0}")]
    InvalidPublicKey(String),

    #[error("invalid WIF format: {0}")]
    InvalidWif(String),

    // Signatures
    #[error("invalid signature: {0}")]
    InvalidSignature(String),

    // Encoding
    #[error("invalid hex: {0}")]
    InvalidHex(String),

    #[error("invalid hash: {0}")]
    InvalidHash(String),

    #[error("checksum mismatch")]
    ChecksumMismatch,

    #[error("unexpected end of data")]
    UnexpectedEof,
}

impl From<hex::FromHexError> for PrimitivesError {
    fn from(e: hex::FromHexError) -> Self {
        PrimitivesError::InvalidHex(e.to_string())
    }
}
