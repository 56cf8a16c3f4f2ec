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

//! The ledger a swap runs on, seen through one wallet.

use std::collections::BTreeMap;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::address::{Address, PubKeyHash};
use crate::tx::{AccountId, Amount, Nonce, OpType, SignedTransaction, TimeRange, TokenId, TxHash};

pub mod memory;

/// Where a deposit is paid from, or where proceeds are delivered.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Layer {
    /// The base chain, through the ledger's bridge.
    L1,
    /// The ledger itself.
    L2,
}

/// How final a transaction must be before a waiter is woken.
#[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Confirmation {
    Committed,
    Verified,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccountState {
    /// `None` until the account has received funds.
    pub id: Option<AccountId>,
    pub nonce: Nonce,
    pub pub_key_hash: Option<PubKeyHash>,
    pub balances: BTreeMap<TokenId, Amount>,
}

impl AccountState {
    pub fn balance(&self, token: TokenId) -> Amount {
        self.balances.get(&token).copied().unwrap_or(0)
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Receipt {
    pub hash: TxHash,
    pub block: u64,
    pub confirmation: Confirmation,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LedgerError {
    #[error("account {0} does not exist")]
    UnknownAccount(Address),

    #[error("transaction {0} is unknown to the ledger")]
    UnknownTransaction(TxHash),

    #[error("nonce mismatch: account is at {expected}, transaction has {actual}")]
    NonceMismatch { expected: Nonce, actual: Nonce },

    #[error("ledger time {now} is outside the validity window {range:?}")]
    OutsideValidity { now: u64, range: TimeRange },

    #[error("insufficient balance of token {token}: need {required}, have {available}")]
    InsufficientBalance {
        token: TokenId,
        required: Amount,
        available: Amount,
    },

    #[error("signature rejected for account {0}")]
    InvalidSignature(Address),

    #[error("account id mismatch for {0}")]
    AccountIdMismatch(Address),

    #[error("balance overflow")]
    Overflow,

    #[error("ledger transport error: {0}")]
    Transport(String),
}

/// Operations a swap party needs from the ledger.
///
/// A value of this trait acts for one wallet: `deposit` moves that
/// wallet's own funds.
#[async_trait]
pub trait Ledger: Send + Sync {
    /// Current ledger time in seconds, the clock validity windows use.
    async fn block_time(&self) -> Result<u64, LedgerError>;

    async fn account_state(&self, address: &Address) -> Result<AccountState, LedgerError>;

    async fn transaction_fee(&self, op: OpType, payer: &Address, token: TokenId) -> Result<Amount, LedgerError>;

    async fn submit(&self, tx: SignedTransaction) -> Result<TxHash, LedgerError>;

    /// Executes all of `txs` or none of them.
    async fn submit_batch(&self, txs: Vec<SignedTransaction>) -> Result<Vec<TxHash>, LedgerError>;

    async fn deposit(&self, to: &Address, token: TokenId, amount: Amount, layer: Layer) -> Result<TxHash, LedgerError>;

    async fn await_receipt(&self, hash: &TxHash) -> Result<Receipt, LedgerError>;

    /// Resolves once `hash` has reached `level`. Never resolves for a
    /// transaction that is never executed; callers bound it with a timeout.
    async fn notify_on_confirmation(&self, hash: &TxHash, level: Confirmation) -> Result<Receipt, LedgerError>;
}
