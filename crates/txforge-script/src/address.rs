//! Base58Check addresses for P2PKH outputs.

use std::fmt;

use txforge_primitives::hash::sha256d;
use txforge_primitives::PublicKey;

use crate::template;
use crate::{Script, ScriptError};

/// Decoded address payload: version byte + 20-byte hash + 4-byte checksum.
const ADDRESS_PAYLOAD_LEN: usize = 25;

/// Network an address belongs to, determining its version prefix.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Network {
    #[default]
    Mainnet,
    Testnet,
}

impl Network {
    /// The Base58Check version byte for P2PKH addresses on this network.
    pub fn p2pkh_prefix(&self) -> u8 {
        match self {
            Network::Mainnet => 0x00,
            Network::Testnet => 0x6f,
        }
    }

    fn from_p2pkh_prefix(prefix: u8) -> Result<Self, ScriptError> {
        match prefix {
            0x00 => Ok(Network::Mainnet),
            0x6f => Ok(Network::Testnet),
            other => Err(ScriptError::UnsupportedAddress(other)),
        }
    }
}

/// A P2PKH address: a network tag plus the hash of the owning public key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Address {
    address_string: String,
    public_key_hash: [u8; 20],
    network: Network,
}

impl Address {
    /// Decode and checksum-validate a Base58Check address string.
    pub fn from_string(address: &str) -> Result<Self, ScriptError> {
        let decoded = bs58::decode(address)
            .into_vec()
            .map_err(|e| ScriptError::InvalidAddress(e.to_string()))?;
        if decoded.len() != ADDRESS_PAYLOAD_LEN {
            return Err(ScriptError::InvalidAddressLength {
                expected: ADDRESS_PAYLOAD_LEN,
                got: decoded.len(),
            });
        }

        let checksum = sha256d(&decoded[..21]);
        if checksum[..4] != decoded[21..] {
            return Err(ScriptError::InvalidAddress(
                "checksum mismatch".to_string(),
            ));
        }

        let network = Network::from_p2pkh_prefix(decoded[0])?;
        let mut hash = [0u8; 20];
        hash.copy_from_slice(&decoded[1..21]);
        Ok(Address {
            address_string: address.to_string(),
            public_key_hash: hash,
            network,
        })
    }

    /// Build an address directly from a 20-byte pubkey hash.
    pub fn from_public_key_hash(hash: [u8; 20], network: Network) -> Self {
        let mut payload = Vec::with_capacity(ADDRESS_PAYLOAD_LEN);
        payload.push(network.p2pkh_prefix());
        payload.extend_from_slice(&hash);
        let checksum = sha256d(&payload);
        payload.extend_from_slice(&checksum[..4]);
        Address {
            address_string: bs58::encode(payload).into_string(),
            public_key_hash: hash,
            network,
        }
    }

    /// Derive the address of a public key (compressed encoding).
    pub fn from_public_key(pub_key: &PublicKey, network: Network) -> Self {
        Self::from_public_key_hash(pub_key.hash160(), network)
    }

    /// The Base58Check string form.
    pub fn address_string(&self) -> &str {
        &self.address_string
    }

    /// The 20-byte pubkey hash this address commits to.
    pub fn public_key_hash(&self) -> [u8; 20] {
        self.public_key_hash
    }

    pub fn network(&self) -> Network {
        self.network
    }

    /// The P2PKH locking script paying to this address.
    pub fn lock_script(&self) -> Script {
        template::pay_to_pubkey_hash(&self.public_key_hash)
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.address_string)
    }
}
