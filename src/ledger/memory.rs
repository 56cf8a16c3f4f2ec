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

//! An in-process ledger with the execution rules a swap relies on.
//!
//! Each account nonce executes once and in order, a transaction only
//! executes inside its validity window, and batches are all or nothing.
//! Time is a settable clock so tests can step past a timeout.

use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use async_trait::async_trait;
use tokio::time::sleep;
use tracing::debug;

use super::{AccountState, Confirmation, Layer, Ledger, LedgerError, Receipt};
use crate::address::{keccak256, Address, PubKeyHash};
use crate::tx::{AccountId, Amount, Nonce, OpType, SignedTransaction, TokenId, Transaction, TxHash};

#[derive(Clone, Debug)]
struct Account {
    id: AccountId,
    nonce: Nonce,
    pub_key_hash: Option<PubKeyHash>,
    balances: BTreeMap<TokenId, Amount>,
}

#[derive(Clone, Debug, Default)]
struct State {
    now: u64,
    next_id: AccountId,
    block: u64,
    deposits: u64,
    hold_verification: bool,
    accounts: HashMap<Address, Account>,
    l1: HashMap<Address, BTreeMap<TokenId, Amount>>,
    fees: HashMap<(OpType, TokenId), Amount>,
    receipts: HashMap<TxHash, Receipt>,
}

fn debit(balances: &mut BTreeMap<TokenId, Amount>, token: TokenId, amount: Amount) -> Result<(), LedgerError> {
    let available = balances.get(&token).copied().unwrap_or(0);
    if available < amount {
        return Err(LedgerError::InsufficientBalance {
            token,
            required: amount,
            available,
        });
    }
    balances.insert(token, available - amount);
    Ok(())
}

fn credit(balances: &mut BTreeMap<TokenId, Amount>, token: TokenId, amount: Amount) -> Result<(), LedgerError> {
    let balance = balances.entry(token).or_insert(0);
    *balance = balance.checked_add(amount).ok_or(LedgerError::Overflow)?;
    Ok(())
}

impl State {
    fn account_or_create(&mut self, address: Address) -> &mut Account {
        let next_id = &mut self.next_id;
        self.accounts.entry(address).or_insert_with(|| {
            *next_id += 1;
            Account {
                id: *next_id,
                nonce: 0,
                pub_key_hash: None,
                balances: BTreeMap::new(),
            }
        })
    }

    fn record(&mut self, hash: TxHash) -> Receipt {
        self.block += 1;
        let receipt = Receipt {
            hash,
            block: self.block,
            confirmation: if self.hold_verification {
                Confirmation::Committed
            } else {
                Confirmation::Verified
            },
        };
        self.receipts.insert(hash, receipt);
        receipt
    }

    fn apply(&mut self, signed: &SignedTransaction) -> Result<TxHash, LedgerError> {
        let tx = signed.tx();
        let address = tx.account();
        let now = self.now;

        let account = self
            .accounts
            .get_mut(&address)
            .ok_or(LedgerError::UnknownAccount(address))?;
        if account.id != tx.account_id() {
            return Err(LedgerError::AccountIdMismatch(address));
        }
        if tx.nonce() != account.nonce {
            return Err(LedgerError::NonceMismatch {
                expected: account.nonce,
                actual: tx.nonce(),
            });
        }
        let range = tx.time_range();
        if !range.contains(now) {
            return Err(LedgerError::OutsideValidity { now, range });
        }

        let signer = PubKeyHash::from_pubkey(&signed.signature().pubkey);
        let authorized = match tx {
            Transaction::ChangePubKey(cpk) => {
                cpk.new_pk_hash == signer && cpk.create2.derive_address(&cpk.new_pk_hash) == address
            }
            _ => account.pub_key_hash == Some(signer),
        };
        if !authorized || !signed.verify() {
            return Err(LedgerError::InvalidSignature(address));
        }

        match tx {
            Transaction::ChangePubKey(cpk) => {
                debit(&mut account.balances, cpk.fee_token, cpk.fee)?;
                account.pub_key_hash = Some(cpk.new_pk_hash);
            }
            Transaction::Transfer(t) => {
                let total = t.amount.checked_add(t.fee).ok_or(LedgerError::Overflow)?;
                debit(&mut account.balances, t.token, total)?;
            }
            Transaction::Withdraw(w) => {
                let total = w.amount.checked_add(w.fee).ok_or(LedgerError::Overflow)?;
                debit(&mut account.balances, w.token, total)?;
            }
        }
        account.nonce += 1;

        match tx {
            Transaction::ChangePubKey(_) => {}
            Transaction::Transfer(t) => credit(&mut self.account_or_create(t.to).balances, t.token, t.amount)?,
            Transaction::Withdraw(w) => credit(self.l1.entry(w.to).or_default(), w.token, w.amount)?,
        }

        let hash = signed.hash();
        self.record(hash);
        Ok(hash)
    }
}

/// Shared ledger state. Hand out a [`MemoryWallet`] per participant.
#[derive(Clone, Debug)]
pub struct MemoryLedger {
    state: Arc<Mutex<State>>,
    poll_interval: Duration,
}

impl Default for MemoryLedger {
    fn default() -> Self {
        let now = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_secs())
            .unwrap_or(0);
        MemoryLedger::at_time(now)
    }
}

impl MemoryLedger {
    pub fn new() -> Self {
        MemoryLedger::default()
    }

    /// A ledger whose clock starts at `now`.
    pub fn at_time(now: u64) -> Self {
        MemoryLedger {
            state: Arc::new(Mutex::new(State {
                now,
                ..State::default()
            })),
            poll_interval: Duration::from_millis(10),
        }
    }

    pub fn with_poll_interval(mut self, poll_interval: Duration) -> Self {
        self.poll_interval = poll_interval;
        self
    }

    fn lock(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// A handle acting for `owner`.
    pub fn wallet(&self, owner: Address) -> MemoryWallet {
        MemoryWallet {
            ledger: self.clone(),
            owner,
        }
    }

    pub fn now(&self) -> u64 {
        self.lock().now
    }

    pub fn set_time(&self, now: u64) {
        self.lock().now = now;
    }

    pub fn advance(&self, secs: u64) {
        let mut state = self.lock();
        state.now = state.now.saturating_add(secs);
    }

    pub fn set_fee(&self, op: OpType, token: TokenId, fee: Amount) {
        self.lock().fees.insert((op, token), fee);
    }

    /// Credit base-layer funds to `address`.
    pub fn fund_l1(&self, address: Address, token: TokenId, amount: Amount) {
        let mut state = self.lock();
        let balance = state.l1.entry(address).or_default().entry(token).or_insert(0);
        *balance = balance.saturating_add(amount);
    }

    /// Credit ledger funds to `address`, opening its account if needed.
    pub fn fund(&self, address: Address, token: TokenId, amount: Amount) {
        let mut state = self.lock();
        let balance = state.account_or_create(address).balances.entry(token).or_insert(0);
        *balance = balance.saturating_add(amount);
    }

    pub fn balance(&self, address: &Address, token: TokenId) -> Amount {
        self.account(address).balance(token)
    }

    pub fn l1_balance(&self, address: &Address, token: TokenId) -> Amount {
        self.lock()
            .l1
            .get(address)
            .and_then(|balances| balances.get(&token).copied())
            .unwrap_or(0)
    }

    pub fn account(&self, address: &Address) -> AccountState {
        let state = self.lock();
        match state.accounts.get(address) {
            Some(account) => AccountState {
                id: Some(account.id),
                nonce: account.nonce,
                pub_key_hash: account.pub_key_hash,
                balances: account.balances.clone(),
            },
            None => AccountState::default(),
        }
    }

    /// Overwrite an account nonce, standing in for activity outside a swap.
    pub fn force_nonce(&self, address: &Address, nonce: Nonce) {
        if let Some(account) = self.lock().accounts.get_mut(address) {
            account.nonce = nonce;
        }
    }

    /// While held, new receipts stay `Committed` until `verify_pending`.
    pub fn hold_verification(&self, hold: bool) {
        self.lock().hold_verification = hold;
    }

    pub fn verify_pending(&self) {
        for receipt in self.lock().receipts.values_mut() {
            receipt.confirmation = Confirmation::Verified;
        }
    }
}

/// One participant's view of a [`MemoryLedger`].
#[derive(Clone, Debug)]
pub struct MemoryWallet {
    ledger: MemoryLedger,
    owner: Address,
}

impl MemoryWallet {
    pub fn owner(&self) -> Address {
        self.owner
    }

    pub fn ledger(&self) -> &MemoryLedger {
        &self.ledger
    }
}

#[async_trait]
impl Ledger for MemoryWallet {
    async fn block_time(&self) -> Result<u64, LedgerError> {
        Ok(self.ledger.now())
    }

    async fn account_state(&self, address: &Address) -> Result<AccountState, LedgerError> {
        Ok(self.ledger.account(address))
    }

    async fn transaction_fee(&self, op: OpType, _payer: &Address, token: TokenId) -> Result<Amount, LedgerError> {
        Ok(self.ledger.lock().fees.get(&(op, token)).copied().unwrap_or(0))
    }

    async fn submit(&self, tx: SignedTransaction) -> Result<TxHash, LedgerError> {
        let mut state = self.ledger.lock();
        let mut next = state.clone();
        let hash = next.apply(&tx)?;
        *state = next;
        debug!(%hash, account = %tx.tx().account(), nonce = tx.tx().nonce(), "transaction executed");
        Ok(hash)
    }

    async fn submit_batch(&self, txs: Vec<SignedTransaction>) -> Result<Vec<TxHash>, LedgerError> {
        let mut state = self.ledger.lock();
        let mut next = state.clone();
        let hashes = txs.iter().map(|tx| next.apply(tx)).collect::<Result<Vec<_>, _>>()?;
        *state = next;
        debug!(count = hashes.len(), "batch executed");
        Ok(hashes)
    }

    async fn deposit(&self, to: &Address, token: TokenId, amount: Amount, layer: Layer) -> Result<TxHash, LedgerError> {
        let mut state = self.ledger.lock();
        let mut next = state.clone();

        match layer {
            Layer::L1 => debit(next.l1.entry(self.owner).or_default(), token, amount)?,
            Layer::L2 => {
                let account = next
                    .accounts
                    .get_mut(&self.owner)
                    .ok_or(LedgerError::UnknownAccount(self.owner))?;
                debit(&mut account.balances, token, amount)?;
                account.nonce += 1;
            }
        }
        credit(&mut next.account_or_create(*to).balances, token, amount)?;

        next.deposits += 1;
        let mut preimage = b"deposit".to_vec();
        preimage.extend_from_slice(self.owner.as_bytes());
        preimage.extend_from_slice(to.as_bytes());
        preimage.extend_from_slice(&token.0.to_be_bytes());
        preimage.extend_from_slice(&amount.to_be_bytes());
        preimage.extend_from_slice(&next.deposits.to_be_bytes());
        let hash = TxHash(keccak256(&preimage));
        next.record(hash);

        *state = next;
        debug!(%hash, from = %self.owner, %to, %token, ?layer, "deposit executed");
        Ok(hash)
    }

    async fn await_receipt(&self, hash: &TxHash) -> Result<Receipt, LedgerError> {
        self.ledger
            .lock()
            .receipts
            .get(hash)
            .copied()
            .ok_or(LedgerError::UnknownTransaction(*hash))
    }

    async fn notify_on_confirmation(&self, hash: &TxHash, level: Confirmation) -> Result<Receipt, LedgerError> {
        loop {
            let receipt = self.ledger.lock().receipts.get(hash).copied();
            if let Some(receipt) = receipt {
                if receipt.confirmation >= level {
                    return Ok(receipt);
                }
            }
            sleep(self.ledger.poll_interval).await;
        }
    }
}
