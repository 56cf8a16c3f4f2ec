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

//! Ledger transactions.
//!
//! Every transaction has one byte layout, `message_bytes`, which is what
//! both signers sign and what the ledger hashes. Fields are fixed width
//! and big-endian so two machines always produce the same bytes.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::address::{self, Address, Create2Data, PubKeyHash};
use crate::tools::SigningContext;
use crate::{PublicKey, Signature};

/// Token and fee amounts in the token's smallest unit.
pub type Amount = u128;
pub type AccountId = u32;
pub type Nonce = u32;

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TokenId(pub u32);

impl fmt::Display for TokenId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Operation kinds the ledger quotes fees for.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OpType {
    ChangePubKey,
    Transfer,
    Withdraw,
}

impl OpType {
    fn tag(self) -> u8 {
        match self {
            OpType::ChangePubKey => 0x07,
            OpType::Transfer => 0x05,
            OpType::Withdraw => 0x03,
        }
    }
}

/// Inclusive window of ledger time in which a transaction executes.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeRange {
    pub valid_from: u64,
    pub valid_until: u64,
}

impl TimeRange {
    pub fn new(valid_from: u64, valid_until: u64) -> Self {
        TimeRange {
            valid_from,
            valid_until,
        }
    }

    pub fn unbounded() -> Self {
        TimeRange::new(0, u64::MAX)
    }

    pub fn contains(&self, time: u64) -> bool {
        self.valid_from <= time && time <= self.valid_until
    }

    pub fn is_disjoint(&self, other: &TimeRange) -> bool {
        self.valid_until < other.valid_from || other.valid_until < self.valid_from
    }
}

/// Hands an account's signing key over to `new_pk_hash`. Authorized by
/// the CREATE2 derivation of the account address.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChangePubKey {
    pub account_id: AccountId,
    pub account: Address,
    pub new_pk_hash: PubKeyHash,
    pub fee_token: TokenId,
    pub fee: Amount,
    pub nonce: Nonce,
    pub time_range: TimeRange,
    pub create2: Create2Data,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transfer {
    pub account_id: AccountId,
    pub from: Address,
    pub to: Address,
    pub token: TokenId,
    pub amount: Amount,
    pub fee: Amount,
    pub nonce: Nonce,
    pub time_range: TimeRange,
}

/// Moves funds out of the ledger to the `to` address on the base layer.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Withdraw {
    pub account_id: AccountId,
    pub from: Address,
    pub to: Address,
    pub token: TokenId,
    pub amount: Amount,
    pub fee: Amount,
    pub nonce: Nonce,
    pub time_range: TimeRange,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Transaction {
    ChangePubKey(ChangePubKey),
    Transfer(Transfer),
    Withdraw(Withdraw),
}

/// Keccak-256 of a transaction's message bytes.
#[derive(Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TxHash(pub [u8; 32]);

impl fmt::Display for TxHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "sync-tx:{}", hex::encode(self.0))
    }
}

impl fmt::Debug for TxHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(self, f)
    }
}

struct MessageWriter(Vec<u8>);

impl MessageWriter {
    fn new(op: OpType) -> Self {
        MessageWriter(vec![0xff - op.tag(), op.tag()])
    }

    fn u32(mut self, v: u32) -> Self {
        self.0.extend_from_slice(&v.to_be_bytes());
        self
    }

    fn u64(mut self, v: u64) -> Self {
        self.0.extend_from_slice(&v.to_be_bytes());
        self
    }

    fn u128(mut self, v: u128) -> Self {
        self.0.extend_from_slice(&v.to_be_bytes());
        self
    }

    fn bytes(mut self, v: &[u8]) -> Self {
        self.0.extend_from_slice(v);
        self
    }

    fn time_range(self, range: &TimeRange) -> Self {
        self.u64(range.valid_from).u64(range.valid_until)
    }
}

impl Transaction {
    pub fn op_type(&self) -> OpType {
        match self {
            Transaction::ChangePubKey(_) => OpType::ChangePubKey,
            Transaction::Transfer(_) => OpType::Transfer,
            Transaction::Withdraw(_) => OpType::Withdraw,
        }
    }

    pub fn account_id(&self) -> AccountId {
        match self {
            Transaction::ChangePubKey(tx) => tx.account_id,
            Transaction::Transfer(tx) => tx.account_id,
            Transaction::Withdraw(tx) => tx.account_id,
        }
    }

    /// The account the transaction is executed against.
    pub fn account(&self) -> Address {
        match self {
            Transaction::ChangePubKey(tx) => tx.account,
            Transaction::Transfer(tx) => tx.from,
            Transaction::Withdraw(tx) => tx.from,
        }
    }

    pub fn nonce(&self) -> Nonce {
        match self {
            Transaction::ChangePubKey(tx) => tx.nonce,
            Transaction::Transfer(tx) => tx.nonce,
            Transaction::Withdraw(tx) => tx.nonce,
        }
    }

    pub fn time_range(&self) -> TimeRange {
        match self {
            Transaction::ChangePubKey(tx) => tx.time_range,
            Transaction::Transfer(tx) => tx.time_range,
            Transaction::Withdraw(tx) => tx.time_range,
        }
    }

    /// Token the transaction moves, if any.
    pub fn token(&self) -> Option<TokenId> {
        match self {
            Transaction::ChangePubKey(_) => None,
            Transaction::Transfer(tx) => Some(tx.token),
            Transaction::Withdraw(tx) => Some(tx.token),
        }
    }

    pub fn amount(&self) -> Amount {
        match self {
            Transaction::ChangePubKey(_) => 0,
            Transaction::Transfer(tx) => tx.amount,
            Transaction::Withdraw(tx) => tx.amount,
        }
    }

    pub fn fee_token(&self) -> TokenId {
        match self {
            Transaction::ChangePubKey(tx) => tx.fee_token,
            Transaction::Transfer(tx) => tx.token,
            Transaction::Withdraw(tx) => tx.token,
        }
    }

    pub fn fee(&self) -> Amount {
        match self {
            Transaction::ChangePubKey(tx) => tx.fee,
            Transaction::Transfer(tx) => tx.fee,
            Transaction::Withdraw(tx) => tx.fee,
        }
    }

    /// The exact bytes signed for this transaction.
    pub fn message_bytes(&self) -> Vec<u8> {
        let w = MessageWriter::new(self.op_type());
        let w = match self {
            Transaction::ChangePubKey(tx) => w
                .u32(tx.account_id)
                .bytes(tx.account.as_bytes())
                .bytes(&tx.new_pk_hash.0)
                .u32(tx.fee_token.0)
                .u128(tx.fee)
                .u32(tx.nonce)
                .time_range(&tx.time_range)
                .bytes(tx.create2.creator_address.as_bytes())
                .bytes(&tx.create2.salt)
                .bytes(&tx.create2.code_hash),
            Transaction::Transfer(tx) => w
                .u32(tx.account_id)
                .bytes(tx.from.as_bytes())
                .bytes(tx.to.as_bytes())
                .u32(tx.token.0)
                .u128(tx.amount)
                .u128(tx.fee)
                .u32(tx.nonce)
                .time_range(&tx.time_range),
            Transaction::Withdraw(tx) => w
                .u32(tx.account_id)
                .bytes(tx.from.as_bytes())
                .bytes(tx.to.as_bytes())
                .u32(tx.token.0)
                .u128(tx.amount)
                .u128(tx.fee)
                .u32(tx.nonce)
                .time_range(&tx.time_range),
        };
        w.0
    }

    pub fn hash(&self) -> TxHash {
        TxHash(address::keccak256(&self.message_bytes()))
    }

    /// Attach a signature, producing a new signed record.
    pub fn into_signed(self, signature: TxSignature) -> SignedTransaction {
        SignedTransaction {
            tx: self,
            signature,
        }
    }
}

/// A signature over `message_bytes` with the key that made it.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TxSignature {
    pub pubkey: PublicKey,
    pub signature: Signature,
}

impl TxSignature {
    pub fn verify(&self, message: &[u8]) -> bool {
        self.signature
            .verify(&mut SigningContext::transactions().bytes(message), &self.pubkey)
            .is_ok()
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignedTransaction {
    tx: Transaction,
    signature: TxSignature,
}

impl SignedTransaction {
    pub fn tx(&self) -> &Transaction {
        &self.tx
    }

    pub fn signature(&self) -> &TxSignature {
        &self.signature
    }

    /// Same as the unsigned transaction's hash.
    pub fn hash(&self) -> TxHash {
        self.tx.hash()
    }

    pub fn verify(&self) -> bool {
        self.signature.verify(&self.tx.message_bytes())
    }
}
