//! ECDSA signature with DER serialization and RFC6979 deterministic nonces.
//!
//! Supports strict DER encoding/decoding, low-S normalization, the
//! transaction embedding format (DER + 1-byte sighash type), and the
//! consensus strict-encoding validity check.

use k256::ecdsa;
use k256::ecdsa::signature::hazmat::PrehashVerifier;
use num_bigint::BigUint;

use crate::ec::private_key::PrivateKey;
use crate::ec::public_key::PublicKey;
use crate::PrimitivesError;

/// The secp256k1 curve order N.
/// N = FFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFEBAAEDCE6AF48A03BBFD25E8CD0364141
const CURVE_ORDER: [u8; 32] = [
    0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF,
    0xFE, 0xBA, 0xAE, 0xDC, 0xE6, 0xAF, 0x48, 0xA0, 0x3B, 0xBF, 0xD2, 0x5E, 0x8C, 0xD0, 0x36,
    0x41, 0x41,
];

/// Half of the secp256k1 curve order (N/2), used for low-S checks.
const HALF_ORDER: [u8; 32] = [
    0x7F, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF,
    0xFF, 0x5D, 0x57, 0x6E, 0x73, 0x57, 0xA4, 0x50, 0x1D, 0xDF, 0xE9, 0x2F, 0x46, 0x68, 0x1B,
    0x20, 0xA0,
];

fn malformed(detail: &str) -> PrimitivesError {
    PrimitivesError::InvalidSignature(format!("malformed signature: {}", detail))
}

/// An ECDSA signature with R and S components.
///
/// Provides DER serialization, RFC6979 deterministic signing, low-S
/// normalization per BIP-0062, and the on-chain transaction format.
#[derive(Clone, Debug)]
pub struct Signature {
    /// The R component of the signature (32 bytes, big-endian).
    r: [u8; 32],
    /// The S component of the signature (32 bytes, big-endian).
    s: [u8; 32],
}

impl Signature {
    /// Create a signature from raw R and S 32-byte arrays.
    pub fn new(r: [u8; 32], s: [u8; 32]) -> Self {
        Signature { r, s }
    }

    pub fn r(&self) -> &[u8; 32] {
        &self.r
    }

    pub fn s(&self) -> &[u8; 32] {
        &self.s
    }

    /// Parse a DER-encoded ECDSA signature.
    ///
    /// Expected format: 0x30 <len> 0x02 <r_len> <r> 0x02 <s_len> <s>,
    /// without a sighash suffix. R and S must be nonzero and below the
    /// curve order.
    pub fn from_der(bytes: &[u8]) -> Result<Self, PrimitivesError> {
        if bytes.len() < 8 {
            return Err(malformed("too short"));
        }
        if bytes[0] != 0x30 {
            return Err(malformed("no header magic"));
        }

        let sig_len = bytes[1] as usize;
        if sig_len + 2 > bytes.len() || sig_len + 2 < 8 {
            return Err(malformed("bad length"));
        }
        let data = &bytes[..sig_len + 2];

        // R must leave room for at least a marker, a length, and one
        // byte of S behind it.
        let mut idx = 2;
        let r_body = read_der_int(data, &mut idx, "R", 3)?;
        let s_body = read_der_int(data, &mut idx, "S", 0)?;

        let r = to_32_bytes(r_body)?;
        let s = to_32_bytes(s_body)?;
        check_scalar_range("R", &r)?;
        check_scalar_range("S", &s)?;

        Ok(Signature { r, s })
    }

    /// Serialize the signature in DER format with low-S normalization.
    ///
    /// Output format: 0x30 <len> 0x02 <r_len> <r> 0x02 <s_len> <s>.
    /// The S value is normalized to the lower half of the curve order per
    /// BIP-0062.
    pub fn to_der(&self) -> Vec<u8> {
        let rb = canonicalize_int(&self.r);
        let sb = canonicalize_int(&normalize_low_s(self.s));

        let total_len = 6 + rb.len() + sb.len();
        let mut out = Vec::with_capacity(total_len);
        out.push(0x30);
        out.push((total_len - 2) as u8);
        out.push(0x02);
        out.push(rb.len() as u8);
        out.extend_from_slice(&rb);
        out.push(0x02);
        out.push(sb.len() as u8);
        out.extend_from_slice(&sb);
        out
    }

    /// Serialize in the transaction embedding format: the DER encoding
    /// followed by the 1-byte sighash type, exactly the byte string
    /// pushed into an unlocking script.
    pub fn to_tx_format(&self, sighash_type: u8) -> Vec<u8> {
        let mut out = self.to_der();
        out.push(sighash_type);
        out
    }

    /// Check whether `sig` is a strictly valid transaction-format signature.
    ///
    /// `sig` must be a DER signature followed by a 1-byte sighash type.
    /// Enforces the consensus strict-encoding rules: exact structural
    /// lengths, minimally-encoded positive integers, and a low-S value.
    /// An empty slice is not valid.
    ///
    /// This is a pure structural check; it does not verify the signature
    /// against any digest.
    pub fn is_tx_der_encoding(sig: &[u8]) -> bool {
        // Layout: 0x30 [len] 0x02 [rlen] r 0x02 [slen] s [sighash]
        if sig.len() < 9 || sig.len() > 73 {
            return false;
        }
        if sig[0] != 0x30 || sig[1] as usize != sig.len() - 3 {
            return false;
        }

        let r_len = sig[3] as usize;
        if 5 + r_len >= sig.len() {
            return false;
        }
        let s_len = sig[5 + r_len] as usize;
        if r_len + s_len + 7 != sig.len() {
            return false;
        }

        if sig[2] != 0x02 || sig[4 + r_len] != 0x02 {
            return false;
        }
        let r_body = &sig[4..4 + r_len];
        let s_body = &sig[6 + r_len..6 + r_len + s_len];
        if !minimal_positive(r_body) || !minimal_positive(s_body) {
            return false;
        }

        // Low-S: the S integer must not exceed half the curve order.
        BigUint::from_bytes_be(s_body) <= BigUint::from_bytes_be(&HALF_ORDER)
    }

    /// Sign a message digest using RFC6979 deterministic nonces.
    ///
    /// Produces a low-S normalized signature per BIP-0062. Shorter digests
    /// are left-padded, longer ones truncated to 32 bytes.
    pub fn sign(hash: &[u8], priv_key: &PrivateKey) -> Result<Self, PrimitivesError> {
        let padded = Self::normalize_hash(hash);
        let (k256_sig, _recovery_id) = priv_key
            .signing_key()
            .sign_prehash_recoverable(&padded)
            .map_err(|e| PrimitivesError::InvalidSignature(e.to_string()))?;

        let (r_bytes, s_bytes) = k256_sig.split_bytes();
        let mut r = [0u8; 32];
        let mut s = [0u8; 32];
        r.copy_from_slice(&r_bytes);
        s.copy_from_slice(&s_bytes);

        Ok(Signature {
            r,
            s: normalize_low_s(s),
        })
    }

    /// Verify this signature against a message digest and public key.
    pub fn verify(&self, hash: &[u8], pub_key: &PublicKey) -> bool {
        let Ok(k256_sig) = ecdsa::Signature::from_scalars(
            k256::FieldBytes::from(self.r),
            k256::FieldBytes::from(self.s),
        ) else {
            return false;
        };

        let padded = Self::normalize_hash(hash);
        pub_key
            .verifying_key()
            .verify_prehash(&padded, &k256_sig)
            .is_ok()
    }

    /// Normalize an arbitrary-length digest to exactly 32 bytes: pad
    /// shorter digests with leading zeros, truncate longer ones.
    fn normalize_hash(hash: &[u8]) -> [u8; 32] {
        let mut padded = [0u8; 32];
        if hash.len() >= 32 {
            padded.copy_from_slice(&hash[..32]);
        } else {
            padded[32 - hash.len()..].copy_from_slice(hash);
        }
        padded
    }
}

impl PartialEq for Signature {
    fn eq(&self, other: &Self) -> bool {
        self.r == other.r && self.s == other.s
    }
}

impl Eq for Signature {}

/// Read one DER integer (marker, length, body) starting at `idx`,
/// advancing it past the body. `reserve` bytes must remain after the
/// body for what follows.
fn read_der_int<'a>(
    data: &'a [u8],
    idx: &mut usize,
    which: &str,
    reserve: usize,
) -> Result<&'a [u8], PrimitivesError> {
    if data[*idx] != 0x02 {
        return Err(malformed(&format!("no {} integer marker", which)));
    }
    let len = data[*idx + 1] as usize;
    *idx += 2;
    if len == 0 || *idx + len > data.len() - reserve {
        return Err(malformed(&format!("bogus {} length", which)));
    }
    let body = &data[*idx..*idx + len];
    *idx += len;
    Ok(body)
}

/// Reject zero scalars and scalars at or above the curve order.
fn check_scalar_range(which: &str, scalar: &[u8; 32]) -> Result<(), PrimitivesError> {
    let value = BigUint::from_bytes_be(scalar);
    if value == BigUint::from(0u8) {
        return Err(PrimitivesError::InvalidSignature(format!(
            "signature {} is zero",
            which
        )));
    }
    if value >= BigUint::from_bytes_be(&CURVE_ORDER) {
        return Err(PrimitivesError::InvalidSignature(format!(
            "signature {} is >= curve.N",
            which
        )));
    }
    Ok(())
}

/// If S lies in the upper half of the curve order, replace it with N - S.
fn normalize_low_s(s: [u8; 32]) -> [u8; 32] {
    let s_int = BigUint::from_bytes_be(&s);
    if s_int <= BigUint::from_bytes_be(&HALF_ORDER) {
        return s;
    }
    let reduced = (BigUint::from_bytes_be(&CURVE_ORDER) - s_int).to_bytes_be();
    let mut out = [0u8; 32];
    out[32 - reduced.len()..].copy_from_slice(&reduced);
    out
}

/// A strictly-encoded DER integer body: non-empty, positive, and with no
/// superfluous leading zero byte.
fn minimal_positive(body: &[u8]) -> bool {
    match body {
        [] => false,
        [first, ..] if first & 0x80 != 0 => false,
        [0x00, second, ..] if second & 0x80 == 0 => false,
        _ => true,
    }
}

/// Encode a 32-byte big-endian integer as a minimal DER integer body.
///
/// Strips leading zeros, then prepends one zero byte if the leading bit is
/// set (DER integers are signed).
fn canonicalize_int(val: &[u8; 32]) -> Vec<u8> {
    let start = val[..31].iter().take_while(|b| **b == 0).count();
    let trimmed = &val[start..];
    let mut out = Vec::with_capacity(trimmed.len() + 1);
    if trimmed[0] & 0x80 != 0 {
        out.push(0x00);
    }
    out.extend_from_slice(trimmed);
    out
}

/// Left-pad a DER integer body into a fixed 32-byte array.
fn to_32_bytes(bytes: &[u8]) -> Result<[u8; 32], PrimitivesError> {
    // DER allows one leading zero byte of sign padding.
    let stripped = match bytes {
        [0x00, rest @ ..] if rest.len() == 32 => rest,
        other => other,
    };
    if stripped.len() > 32 {
        return Err(PrimitivesError::InvalidSignature(
            "integer component too long".to_string(),
        ));
    }
    let mut out = [0u8; 32];
    out[32 - stripped.len()..].copy_from_slice(stripped);
    Ok(out)
}
