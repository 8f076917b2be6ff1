//! Account addresses and deterministic pool identities
//!
//! Every identity the module needs is a pure function of public data so that any
//! replica recomputes the same value:
//!
//! ```text
//! (denomA, denomB, poolTypeId) → pool name "denomA/denomB/1"
//!       pool name → Sha3-256 → first 20 bytes → reserve account
//!       pool name → Sha3-256 → "pool" + uppercase hex → pool coin denom
//! module name → Sha3-256 → first 20 bytes → module account (escrow, community fund)
//! ```

use crate::common::errors::{LiquidityError, Result};
use sha3::{Digest, Sha3_256};
use std::fmt;

/// Length in bytes of an account address
pub const ADDRESS_LEN: usize = 20;

/// Prefix of every pool coin denom
pub const POOL_COIN_DENOM_PREFIX: &str = "pool";

/// 20-byte account address
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
#[repr(transparent)]
pub struct Address(pub [u8; ADDRESS_LEN]);

impl Address {
    pub const fn new(bytes: [u8; ADDRESS_LEN]) -> Self {
        Self(bytes)
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    /// Address owned by a named module (escrow, community fund)
    pub fn module(name: &str) -> Self {
        Self::from_hash(name.as_bytes())
    }

    /// First 20 bytes of the Sha3-256 digest of `data`
    pub fn from_hash(data: &[u8]) -> Self {
        let digest = Sha3_256::digest(data);
        let mut bytes = [0u8; ADDRESS_LEN];
        bytes.copy_from_slice(&digest[..ADDRESS_LEN]);
        Self(bytes)
    }

    /// Parse `0x`-prefixed or bare hex
    pub fn from_hex(input: &str) -> Result<Self> {
        let raw = input.strip_prefix("0x").unwrap_or(input);
        let decoded = hex::decode(raw).map_err(|_| LiquidityError::InvalidAddress)?;
        if decoded.len() != ADDRESS_LEN {
            return Err(LiquidityError::InvalidAddress);
        }
        let mut bytes = [0u8; ADDRESS_LEN];
        bytes.copy_from_slice(&decoded);
        Ok(Self(bytes))
    }

    pub fn to_hex(&self) -> String {
        format!("0x{}", hex::encode(self.0))
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

impl From<[u8; ADDRESS_LEN]> for Address {
    fn from(bytes: [u8; ADDRESS_LEN]) -> Self {
        Self(bytes)
    }
}

// Hex string on the wire keeps genesis documents readable
impl serde::Serialize for Address {
    fn serialize<S>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(&self.to_hex())
    }
}

impl<'de> serde::Deserialize<'de> for Address {
    fn deserialize<D>(deserializer: D) -> std::result::Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let raw = String::deserialize(deserializer)?;
        Address::from_hex(&raw).map_err(serde::de::Error::custom)
    }
}

/// Canonical (lexicographically sorted) ordering of a denom pair
pub fn alphabetical_denom_pair<'a>(a: &'a str, b: &'a str) -> (&'a str, &'a str) {
    if a <= b {
        (a, b)
    } else {
        (b, a)
    }
}

/// Pool name: sorted reserve denoms and the pool type id joined by `/`
pub fn pool_name(reserve_coin_denoms: &[String], pool_type_id: u32) -> String {
    let mut denoms: Vec<&str> = reserve_coin_denoms.iter().map(String::as_str).collect();
    denoms.sort_unstable();
    let mut name = denoms.join("/");
    name.push('/');
    name.push_str(&pool_type_id.to_string());
    name
}

/// Reserve account of the pool with the given name
pub fn pool_reserve_account(pool_name: &str) -> Address {
    Address::from_hash(pool_name.as_bytes())
}

/// Pool coin denom of the pool with the given name
pub fn pool_coin_denom(pool_name: &str) -> String {
    let digest = Sha3_256::digest(pool_name.as_bytes());
    format!("{}{}", POOL_COIN_DENOM_PREFIX, hex::encode_upper(digest))
}

/// Recover the reserve account embedded in a pool coin denom
pub fn reserve_account_from_pool_coin_denom(denom: &str) -> Result<Address> {
    let hash = denom
        .strip_prefix(POOL_COIN_DENOM_PREFIX)
        .ok_or(LiquidityError::BadPoolCoinDenom)?;
    if hash.len() != 64 {
        return Err(LiquidityError::BadPoolCoinDenom);
    }
    let decoded = hex::decode(hash).map_err(|_| LiquidityError::BadPoolCoinDenom)?;
    let mut bytes = [0u8; ADDRESS_LEN];
    bytes.copy_from_slice(&decoded[..ADDRESS_LEN]);
    Ok(Address(bytes))
}
