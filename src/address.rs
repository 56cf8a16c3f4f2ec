// Copyright 2019 Stichting Organism
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! Ledger addresses and the deterministic escrow address.
//!
//! The escrow account is a CREATE2-style account: its address is known
//! before anything is deployed, from a creator, a salt and a code hash.
//! Binding the salt to the hash of the aggregated key means only the two
//! signers of this attempt can take the account over.

use std::fmt;
use std::str::FromStr;

use rand::{CryptoRng, RngCore};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use sha3::{Digest, Keccak256};

use crate::PublicKey;

pub const ADDRESS_LENGTH: usize = 20;

pub(crate) fn keccak256(data: &[u8]) -> [u8; 32] {
    let mut out = [0u8; 32];
    out.copy_from_slice(&Keccak256::digest(data));
    out
}

fn tail20(hash: &[u8; 32]) -> [u8; ADDRESS_LENGTH] {
    let mut out = [0u8; ADDRESS_LENGTH];
    out.copy_from_slice(&hash[12..]);
    out
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ParseAddressError {
    #[error("expected prefix `{0}`")]
    MissingPrefix(&'static str),
    #[error("invalid hex: {0}")]
    Hex(#[from] hex::FromHexError),
    #[error("expected 20 bytes, got {0}")]
    Length(usize),
}

fn parse20(s: &str, prefix: &'static str) -> Result<[u8; ADDRESS_LENGTH], ParseAddressError> {
    let body = s
        .strip_prefix(prefix)
        .ok_or(ParseAddressError::MissingPrefix(prefix))?;
    let bytes = hex::decode(body)?;
    if bytes.len() != ADDRESS_LENGTH {
        return Err(ParseAddressError::Length(bytes.len()));
    }
    let mut out = [0u8; ADDRESS_LENGTH];
    out.copy_from_slice(&bytes);
    Ok(out)
}

/// A 20 byte account address, written `0x…`.
#[derive(Copy, Clone, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Address(pub [u8; ADDRESS_LENGTH]);

impl Address {
    pub fn as_bytes(&self) -> &[u8; ADDRESS_LENGTH] {
        &self.0
    }

    /// Test and demo helper: an address whose every byte is `b`.
    pub fn repeat_byte(b: u8) -> Self {
        Address([b; ADDRESS_LENGTH])
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{}", hex::encode(self.0))
    }
}

impl fmt::Debug for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(self, f)
    }
}

impl FromStr for Address {
    type Err = ParseAddressError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        parse20(&s.to_ascii_lowercase(), "0x").map(Address)
    }
}

impl Serialize for Address {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for Address {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

/// Hash of a signing key as the ledger stores it: the last 20 bytes of
/// Keccak-256 over the compressed point, written `sync:…`.
#[derive(Copy, Clone, Default, PartialEq, Eq, Hash)]
pub struct PubKeyHash(pub [u8; ADDRESS_LENGTH]);

impl PubKeyHash {
    pub fn from_pubkey(pubkey: &PublicKey) -> Self {
        PubKeyHash(tail20(&keccak256(pubkey.as_bytes())))
    }
}

impl fmt::Display for PubKeyHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "sync:{}", hex::encode(self.0))
    }
}

impl fmt::Debug for PubKeyHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(self, f)
    }
}

impl FromStr for PubKeyHash {
    type Err = ParseAddressError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        parse20(&s.to_ascii_lowercase(), "sync:").map(PubKeyHash)
    }
}

impl Serialize for PubKeyHash {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for PubKeyHash {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

/// `keccak(0xff ‖ creator ‖ salt ‖ code_hash)[12..]`, the EIP-1014 rule.
pub fn create2_address(creator: &Address, salt: &[u8; 32], code_hash: &[u8; 32]) -> Address {
    let mut preimage = Vec::with_capacity(1 + ADDRESS_LENGTH + 64);
    preimage.push(0xff);
    preimage.extend_from_slice(creator.as_bytes());
    preimage.extend_from_slice(salt);
    preimage.extend_from_slice(code_hash);
    Address(tail20(&keccak256(&preimage)))
}

/// Inputs of the escrow address derivation other than the signing key.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Create2Data {
    pub creator_address: Address,
    #[serde(with = "hex_bytes32")]
    pub salt: [u8; 32],
    /// Identifies the recovery contract bytecode and constructor arguments.
    #[serde(with = "hex_bytes32")]
    pub code_hash: [u8; 32],
}

impl Create2Data {
    /// The salt actually fed to CREATE2, binding the attempt salt to the
    /// key that will control the account.
    pub fn salt_arg(&self, pubkey_hash: &PubKeyHash) -> [u8; 32] {
        let mut preimage = [0u8; 32 + ADDRESS_LENGTH];
        preimage[..32].copy_from_slice(&self.salt);
        preimage[32..].copy_from_slice(&pubkey_hash.0);
        keccak256(&preimage)
    }

    pub fn derive_address(&self, pubkey_hash: &PubKeyHash) -> Address {
        create2_address(&self.creator_address, &self.salt_arg(pubkey_hash), &self.code_hash)
    }

    /// Draw a fresh salt, giving a retried attempt a fresh escrow account.
    pub fn randomize_salt<R: RngCore + CryptoRng>(&mut self, rng: &mut R) {
        rng.fill_bytes(&mut self.salt);
    }
}

/// The escrow account of one swap attempt.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct EscrowDescriptor {
    #[serde(with = "hex_bytes32")]
    pub salt: [u8; 32],
    pub address: Address,
    pub pubkey_hash: PubKeyHash,
}

impl EscrowDescriptor {
    pub fn derive(aggregated_key: &PublicKey, create2: &Create2Data) -> Self {
        let pubkey_hash = PubKeyHash::from_pubkey(aggregated_key);
        EscrowDescriptor {
            salt: create2.salt,
            address: create2.derive_address(&pubkey_hash),
            pubkey_hash,
        }
    }
}

pub(crate) mod hex_bytes32 {
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(bytes: &[u8; 32], serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&hex::encode(bytes))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<[u8; 32], D::Error> {
        let s = String::deserialize(deserializer)?;
        let bytes = hex::decode(s.trim_start_matches("0x")).map_err(serde::de::Error::custom)?;
        if bytes.len() != 32 {
            return Err(serde::de::Error::invalid_length(bytes.len(), &"32 bytes"));
        }
        let mut out = [0u8; 32];
        out.copy_from_slice(&bytes);
        Ok(out)
    }
}
