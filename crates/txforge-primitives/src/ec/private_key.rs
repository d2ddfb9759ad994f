//! secp256k1 private key with WIF serialization and deterministic
//! RFC6979 signing.

use k256::ecdsa::SigningKey;
use rand::rngs::OsRng;

use crate::ec::public_key::PublicKey;
use crate::ec::signature::Signature;
use crate::hash::sha256d;
use crate::PrimitivesError;

const KEY_LEN: usize = 32;

/// WIF network prefix for mainnet; testnet uses 0xef.
const MAINNET_PREFIX: u8 = 0x80;

/// Trailing payload byte marking a key whose public key serializes
/// compressed.
const COMPRESS_MAGIC: u8 = 0x01;

/// A secp256k1 signing key.
#[derive(Clone, Debug)]
pub struct PrivateKey {
    inner: SigningKey,
}

impl PrivateKey {
    /// Generate a fresh key from the OS entropy source.
    pub fn new() -> Self {
        PrivateKey {
            inner: SigningKey::random(&mut OsRng),
        }
    }

    /// Build a key from a raw 32-byte scalar. Zero and out-of-range
    /// scalars are rejected.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, PrimitivesError> {
        if bytes.len() != KEY_LEN {
            return Err(PrimitivesError::InvalidPrivateKey(format!(
                "expected {} bytes, got {}",
                KEY_LEN,
                bytes.len()
            )));
        }
        let inner = SigningKey::from_bytes(bytes.into())
            .map_err(|e| PrimitivesError::InvalidPrivateKey(e.to_string()))?;
        Ok(PrivateKey { inner })
    }

    /// Build a key from a 64-character hex scalar.
    pub fn from_hex(hex_str: &str) -> Result<Self, PrimitivesError> {
        if hex_str.is_empty() {
            return Err(PrimitivesError::InvalidPrivateKey(
                "private key hex is empty".to_string(),
            ));
        }
        let bytes = hex::decode(hex_str)?;
        Self::from_bytes(&bytes)
    }

    /// Decode a Wallet Import Format string.
    ///
    /// Accepts both the 38-byte compressed layout
    /// (prefix, scalar, compression marker, checksum) and the 37-byte
    /// uncompressed layout without the marker.
    pub fn from_wif(wif: &str) -> Result<Self, PrimitivesError> {
        let decoded = bs58::decode(wif)
            .into_vec()
            .map_err(|e| PrimitivesError::InvalidWif(e.to_string()))?;

        let payload = match decoded.len() {
            38 if decoded[33] != COMPRESS_MAGIC => {
                return Err(PrimitivesError::InvalidWif(
                    "malformed private key: invalid compression flag".to_string(),
                ));
            }
            37 | 38 => &decoded[..decoded.len() - 4],
            other => {
                return Err(PrimitivesError::InvalidWif(format!(
                    "malformed private key: invalid length {}",
                    other
                )));
            }
        };

        let checksum = sha256d(payload);
        if checksum[..4] != decoded[payload.len()..] {
            return Err(PrimitivesError::ChecksumMismatch);
        }
        Self::from_bytes(&payload[1..1 + KEY_LEN])
    }

    /// Encode as mainnet WIF in the compressed layout.
    pub fn to_wif(&self) -> String {
        self.to_wif_prefix(MAINNET_PREFIX)
    }

    /// Encode as WIF under an explicit network prefix byte.
    pub fn to_wif_prefix(&self, prefix: u8) -> String {
        let mut payload = Vec::with_capacity(1 + KEY_LEN + 1 + 4);
        payload.push(prefix);
        payload.extend_from_slice(&self.to_bytes());
        payload.push(COMPRESS_MAGIC);
        let checksum = sha256d(&payload);
        payload.extend_from_slice(&checksum[..4]);
        bs58::encode(payload).into_string()
    }

    /// The scalar as 32 big-endian bytes.
    pub fn to_bytes(&self) -> [u8; 32] {
        self.inner.to_bytes().into()
    }

    pub fn to_hex(&self) -> String {
        hex::encode(self.to_bytes())
    }

    /// The corresponding public key.
    pub fn pub_key(&self) -> PublicKey {
        PublicKey::from_k256_verifying_key(self.inner.verifying_key())
    }

    /// Sign a precomputed digest with an RFC6979 nonce; the result is
    /// low-S normalized.
    pub fn sign(&self, hash: &[u8]) -> Result<Signature, PrimitivesError> {
        Signature::sign(hash, self)
    }

    pub(crate) fn signing_key(&self) -> &SigningKey {
        &self.inner
    }
}

impl Default for PrivateKey {
    fn default() -> Self {
        Self::new()
    }
}

impl PartialEq for PrivateKey {
    fn eq(&self, other: &Self) -> bool {
        self.to_bytes() == other.to_bytes()
    }
}

impl Eq for PrivateKey {}

#[cfg(test)]
mod tests {
    use super::*;

    const SCALAR_HEX: &str = "eaf02ca348c524e6392655ba4d29603cd1a7347d9d65cfe93ce1ebffdca22694";

    #[test]
    fn test_sign_and_verify() {
        let priv_key = PrivateKey::from_hex(SCALAR_HEX).unwrap();
        let pub_key = priv_key.pub_key();

        let digest = crate::hash::sha256(b"message under test");
        let sig = priv_key.sign(&digest).unwrap();
        assert!(pub_key.verify(&digest, &sig));

        // Tampering with the digest invalidates the signature.
        let other = crate::hash::sha256(b"a different message");
        assert!(!pub_key.verify(&other, &sig));
    }

    #[test]
    fn test_roundtrips() {
        let pk = PrivateKey::new();
        assert_eq!(pk, PrivateKey::from_bytes(&pk.to_bytes()).unwrap());
        assert_eq!(pk, PrivateKey::from_hex(&pk.to_hex()).unwrap());
        assert_eq!(pk, PrivateKey::from_wif(&pk.to_wif()).unwrap());

        let known = PrivateKey::from_hex(SCALAR_HEX).unwrap();
        assert_eq!(known.to_hex(), SCALAR_HEX);
    }

    #[test]
    fn test_rejects_bad_scalars() {
        assert!(PrivateKey::from_bytes(&[0u8; 32]).is_err());
        assert!(PrivateKey::from_bytes(&[1u8; 31]).is_err());
        assert!(PrivateKey::from_hex("").is_err());
        assert!(PrivateKey::from_hex("zz").is_err());
    }

    #[test]
    fn test_rejects_bad_wif() {
        // One flipped character breaks the checksum.
        assert!(
            PrivateKey::from_wif("L401GXuUSHauk19f9Cfpm1qfSXZuGLBUAC2VZM6vdmfMxRxAYkWq").is_err()
        );
        // Truncation changes the decoded length.
        assert!(
            PrivateKey::from_wif("L4o1GXuUSHauk19f9Cfpm1qfSXZuGLBUAC2VZM6vdmfMxRxAYkW").is_err()
        );
        assert!(PrivateKey::from_wif("").is_err());
    }

    #[test]
    fn test_testnet_wif_roundtrip() {
        let wif = "cNGwGSc7KRrTmdLUZ54fiSXWbhLNDc2Eg5zNucgQxyQCzuQ5YRDq";
        let priv_key = PrivateKey::from_wif(wif).unwrap();
        assert_eq!(priv_key.to_wif_prefix(0xef), wif);
    }
}
