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

//! The five escrow transactions of a swap.
//!
//! | slot | transaction                          | nonce | window             |
//! |------|--------------------------------------|-------|--------------------|
//! | 0    | ChangePubKey to the aggregated key   | n     | always             |
//! | 1    | buy token to the client              | n+1   | up to `timeout`    |
//! | 2    | sell token to the provider           | n+2   | always             |
//! | 3    | sell token back to the client        | n+1   | after `timeout`    |
//! | 4    | buy token back to the provider       | n+2   | after `timeout`    |
//!
//! Slots 1 and 3 share a nonce and have disjoint windows, as do 2 and 4,
//! so the ledger executes at most one of each pair. Both parties build
//! the plan on their own and must end up with identical bytes.

use serde::{Deserialize, Serialize};

use crate::address::{Address, Create2Data, EscrowDescriptor};
use crate::errors::SwapError;
use crate::ledger::{Layer, Ledger};
use crate::tx::{AccountId, Amount, ChangePubKey, Nonce, OpType, TimeRange, TokenId, Transaction, Transfer, Withdraw};

/// Number of transactions in a swap.
pub const SLOTS: usize = 5;

#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Deal {
    pub token: TokenId,
    pub amount: Amount,
}

/// What the client sells and buys; the provider takes the other side.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SwapTerms {
    pub sell: Deal,
    pub buy: Deal,
    /// Last ledger second at which the happy path can execute.
    pub timeout: u64,
    /// Where the provider receives the sell token.
    pub withdraw_type: Layer,
    pub create2: Create2Data,
}

impl SwapTerms {
    pub fn validate(&self) -> Result<(), SwapError> {
        if self.sell.token == self.buy.token {
            return Err(SwapError::InvalidTerms("sell and buy token are the same"));
        }
        if self.sell.amount == 0 || self.buy.amount == 0 {
            return Err(SwapError::InvalidTerms("deal amounts must be positive"));
        }
        if self.timeout == u64::MAX {
            return Err(SwapError::InvalidTerms("timeout leaves no refund window"));
        }
        Ok(())
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Slot {
    ChangePubKey,
    ClientReceives,
    ProviderReceives,
    ClientRefund,
    ProviderRefund,
}

impl Slot {
    pub const ALL: [Slot; SLOTS] = [
        Slot::ChangePubKey,
        Slot::ClientReceives,
        Slot::ProviderReceives,
        Slot::ClientRefund,
        Slot::ProviderRefund,
    ];

    pub const HAPPY_PATH: [Slot; 3] = [Slot::ChangePubKey, Slot::ClientReceives, Slot::ProviderReceives];

    pub const REFUND_PATH: [Slot; 3] = [Slot::ChangePubKey, Slot::ClientRefund, Slot::ProviderRefund];

    pub fn index(self) -> usize {
        self as usize
    }

    pub fn nonce_offset(self) -> Nonce {
        match self {
            Slot::ChangePubKey => 0,
            Slot::ClientReceives | Slot::ClientRefund => 1,
            Slot::ProviderReceives | Slot::ProviderRefund => 2,
        }
    }

    pub fn time_range(self, timeout: u64) -> TimeRange {
        match self {
            Slot::ChangePubKey | Slot::ProviderReceives => TimeRange::unbounded(),
            Slot::ClientReceives => TimeRange::new(0, timeout),
            Slot::ClientRefund | Slot::ProviderRefund => TimeRange::new(timeout.saturating_add(1), u64::MAX),
        }
    }
}

/// Who pays a fee.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Payer {
    Provider,
    Client,
}

/// Payers of the happy-path fees. A fee paid by the recipient of its
/// slot comes out of the delivered amount; any other fee is deposited
/// on top by its payer. Refund fees always come out of the refund.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FeePolicy {
    pub change_pub_key: Payer,
    pub client_receives: Payer,
    pub provider_receives: Payer,
}

impl Default for FeePolicy {
    fn default() -> Self {
        FeePolicy {
            change_pub_key: Payer::Client,
            client_receives: Payer::Provider,
            provider_receives: Payer::Provider,
        }
    }
}

/// Fee quotes for the escrow account.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeeSchedule {
    /// Paid in the sell token.
    pub change_pub_key: Amount,
    pub sell_transfer: Amount,
    pub buy_transfer: Amount,
    pub sell_withdraw: Amount,
}

impl FeeSchedule {
    pub fn for_slot(&self, slot: Slot, withdraw_type: Layer) -> Amount {
        match slot {
            Slot::ChangePubKey => self.change_pub_key,
            Slot::ClientReceives | Slot::ProviderRefund => self.buy_transfer,
            Slot::ClientRefund => self.sell_transfer,
            Slot::ProviderReceives => match withdraw_type {
                Layer::L1 => self.sell_withdraw,
                Layer::L2 => self.sell_transfer,
            },
        }
    }
}

/// What a party observed about the escrow account before building.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedgerSnapshot {
    pub account_id: AccountId,
    pub nonce: Nonce,
    pub fees: FeeSchedule,
}

impl LedgerSnapshot {
    pub async fn fetch<L: Ledger + ?Sized>(ledger: &L, escrow: &Address, terms: &SwapTerms) -> Result<Self, SwapError> {
        let state = ledger.account_state(escrow).await?;
        let account_id = state.id.ok_or(SwapError::EscrowNotOpened(*escrow))?;

        let fees = FeeSchedule {
            change_pub_key: ledger.transaction_fee(OpType::ChangePubKey, escrow, terms.sell.token).await?,
            sell_transfer: ledger.transaction_fee(OpType::Transfer, escrow, terms.sell.token).await?,
            buy_transfer: ledger.transaction_fee(OpType::Transfer, escrow, terms.buy.token).await?,
            sell_withdraw: match terms.withdraw_type {
                Layer::L1 => ledger.transaction_fee(OpType::Withdraw, escrow, terms.sell.token).await?,
                Layer::L2 => 0,
            },
        };

        Ok(LedgerSnapshot {
            account_id,
            nonce: state.nonce,
            fees,
        })
    }

    /// Name of the first field where `other` differs.
    pub fn diverges_from(&self, other: &LedgerSnapshot) -> Option<&'static str> {
        if self.account_id != other.account_id {
            Some("escrow account id")
        } else if self.nonce != other.nonce {
            Some("escrow nonce")
        } else if self.fees != other.fees {
            Some("fee quotes")
        } else {
            None
        }
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Deposit {
    pub token: TokenId,
    pub amount: Amount,
}

/// Deposits each party owes the escrow account.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Funding {
    pub provider: Vec<Deposit>,
    pub client: Vec<Deposit>,
}

impl Funding {
    pub fn of(&self, payer: Payer) -> &[Deposit] {
        match payer {
            Payer::Provider => &self.provider,
            Payer::Client => &self.client,
        }
    }

    fn add(&mut self, payer: Payer, token: TokenId, amount: Amount) -> Result<(), SwapError> {
        if amount == 0 {
            return Ok(());
        }
        let deposits = match payer {
            Payer::Provider => &mut self.provider,
            Payer::Client => &mut self.client,
        };
        match deposits.iter_mut().find(|d| d.token == token) {
            Some(d) => {
                d.amount = d
                    .amount
                    .checked_add(amount)
                    .ok_or(SwapError::InvalidTerms("deposit overflows"))?
            }
            None => deposits.push(Deposit { token, amount }),
        }
        Ok(())
    }
}

/// Addresses of the two parties.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Parties {
    pub provider: Address,
    pub client: Address,
}

/// The batch both parties sign, with the deposits it assumes.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SwapPlan {
    transactions: Vec<Transaction>,
    funding: Funding,
}

fn net(amount: Amount, fee: Amount) -> Result<Amount, SwapError> {
    amount
        .checked_sub(fee)
        .ok_or(SwapError::InvalidTerms("fee exceeds the amount it is paid from"))
}

impl SwapPlan {
    pub fn new(
        terms: &SwapTerms,
        parties: &Parties,
        escrow: &EscrowDescriptor,
        snapshot: &LedgerSnapshot,
        policy: &FeePolicy,
    ) -> Result<Self, SwapError> {
        terms.validate()?;

        let fee = |slot: Slot| snapshot.fees.for_slot(slot, terms.withdraw_type);
        let nonce = |slot: Slot| {
            snapshot
                .nonce
                .checked_add(slot.nonce_offset())
                .ok_or(SwapError::InvalidTerms("escrow nonce overflows"))
        };

        let mut funding = Funding::default();
        funding.add(Payer::Client, terms.sell.token, terms.sell.amount)?;
        funding.add(Payer::Provider, terms.buy.token, terms.buy.amount)?;
        funding.add(policy.change_pub_key, terms.sell.token, fee(Slot::ChangePubKey))?;

        // sell token left after slot 0 and the buy token balance
        let mut sell = terms.sell.amount;
        let mut buy = terms.buy.amount;
        if policy.client_receives == Payer::Provider {
            funding.add(Payer::Provider, terms.buy.token, fee(Slot::ClientReceives))?;
            buy = buy
                .checked_add(fee(Slot::ClientReceives))
                .ok_or(SwapError::InvalidTerms("deposit overflows"))?;
        }
        if policy.provider_receives == Payer::Client {
            funding.add(Payer::Client, terms.sell.token, fee(Slot::ProviderReceives))?;
            sell = sell
                .checked_add(fee(Slot::ProviderReceives))
                .ok_or(SwapError::InvalidTerms("deposit overflows"))?;
        }

        let transfer = |slot: Slot, to: Address, token: TokenId, balance: Amount| -> Result<Transaction, SwapError> {
            Ok(Transaction::Transfer(Transfer {
                account_id: snapshot.account_id,
                from: escrow.address,
                to,
                token,
                amount: net(balance, fee(slot))?,
                fee: fee(slot),
                nonce: nonce(slot)?,
                time_range: slot.time_range(terms.timeout),
            }))
        };

        let change_pub_key = Transaction::ChangePubKey(ChangePubKey {
            account_id: snapshot.account_id,
            account: escrow.address,
            new_pk_hash: escrow.pubkey_hash,
            fee_token: terms.sell.token,
            fee: fee(Slot::ChangePubKey),
            nonce: nonce(Slot::ChangePubKey)?,
            time_range: Slot::ChangePubKey.time_range(terms.timeout),
            create2: terms.create2.clone(),
        });

        let provider_receives = match terms.withdraw_type {
            Layer::L2 => transfer(Slot::ProviderReceives, parties.provider, terms.sell.token, sell)?,
            Layer::L1 => Transaction::Withdraw(Withdraw {
                account_id: snapshot.account_id,
                from: escrow.address,
                to: parties.provider,
                token: terms.sell.token,
                amount: net(sell, fee(Slot::ProviderReceives))?,
                fee: fee(Slot::ProviderReceives),
                nonce: nonce(Slot::ProviderReceives)?,
                time_range: Slot::ProviderReceives.time_range(terms.timeout),
            }),
        };

        let transactions = vec![
            change_pub_key,
            transfer(Slot::ClientReceives, parties.client, terms.buy.token, buy)?,
            provider_receives,
            transfer(Slot::ClientRefund, parties.client, terms.sell.token, sell)?,
            transfer(Slot::ProviderRefund, parties.provider, terms.buy.token, buy)?,
        ];

        Ok(SwapPlan { transactions, funding })
    }

    pub fn transaction(&self, slot: Slot) -> &Transaction {
        &self.transactions[slot.index()]
    }

    pub fn transactions(&self) -> &[Transaction] {
        &self.transactions
    }

    /// Message bytes per slot, in slot order.
    pub fn messages(&self) -> Vec<Vec<u8>> {
        self.transactions.iter().map(Transaction::message_bytes).collect()
    }

    pub fn funding(&self) -> &Funding {
        &self.funding
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::address::PubKeyHash;

    const ETH: TokenId = TokenId(0);
    const DAI: TokenId = TokenId(1);
    const TIMEOUT: u64 = 10_600;

    fn terms(withdraw_type: Layer) -> SwapTerms {
        SwapTerms {
            sell: Deal {
                token: ETH,
                amount: 1_000_000,
            },
            buy: Deal {
                token: DAI,
                amount: 1_000_000_000,
            },
            timeout: TIMEOUT,
            withdraw_type,
            create2: Create2Data {
                creator_address: Address::repeat_byte(0xc0),
                salt: [7u8; 32],
                code_hash: [8u8; 32],
            },
        }
    }

    fn parties() -> Parties {
        Parties {
            provider: Address::repeat_byte(0xa0),
            client: Address::repeat_byte(0xb0),
        }
    }

    fn escrow() -> EscrowDescriptor {
        let pubkey_hash = PubKeyHash([9u8; 20]);
        EscrowDescriptor {
            salt: [7u8; 32],
            address: terms(Layer::L2).create2.derive_address(&pubkey_hash),
            pubkey_hash,
        }
    }

    fn snapshot(nonce: Nonce) -> LedgerSnapshot {
        LedgerSnapshot {
            account_id: 42,
            nonce,
            fees: FeeSchedule {
                change_pub_key: 300,
                sell_transfer: 100,
                buy_transfer: 20_000,
                sell_withdraw: 500,
            },
        }
    }

    fn plan(nonce: Nonce, policy: FeePolicy, withdraw_type: Layer) -> SwapPlan {
        SwapPlan::new(&terms(withdraw_type), &parties(), &escrow(), &snapshot(nonce), &policy).unwrap()
    }

    #[test]
    fn slots_pair_up_on_nonce_with_disjoint_windows() {
        let plan = plan(3, FeePolicy::default(), Layer::L2);

        let nonce = |s: Slot| plan.transaction(s).nonce();
        let window = |s: Slot| plan.transaction(s).time_range();

        assert_eq!(nonce(Slot::ChangePubKey), 3);
        assert_eq!(nonce(Slot::ClientReceives), nonce(Slot::ClientRefund));
        assert_eq!(nonce(Slot::ProviderReceives), nonce(Slot::ProviderRefund));
        assert_eq!(nonce(Slot::ClientReceives), 4);
        assert_eq!(nonce(Slot::ProviderReceives), 5);

        assert!(window(Slot::ClientReceives).is_disjoint(&window(Slot::ClientRefund)));
        assert!(window(Slot::ProviderReceives).contains(TIMEOUT + 1));
        assert_eq!(window(Slot::ClientReceives).valid_until, TIMEOUT);
        assert_eq!(window(Slot::ClientRefund).valid_from, TIMEOUT + 1);
        assert_eq!(window(Slot::ProviderRefund).valid_from, TIMEOUT + 1);
    }

    #[test]
    fn independent_builds_are_byte_identical() {
        let a = plan(0, FeePolicy::default(), Layer::L1);
        let b = plan(0, FeePolicy::default(), Layer::L1);
        assert_eq!(a.messages(), b.messages());
        assert_eq!(a, b);
    }

    #[test]
    fn a_different_nonce_gives_a_different_batch() {
        let a = plan(0, FeePolicy::default(), Layer::L2);
        let b = plan(1, FeePolicy::default(), Layer::L2);
        for (x, y) in a.messages().iter().zip(b.messages().iter()) {
            assert_ne!(x, y);
        }
        assert_eq!(snapshot(0).diverges_from(&snapshot(1)), Some("escrow nonce"));
        assert_eq!(snapshot(1).diverges_from(&snapshot(1)), None);
    }

    #[test]
    fn default_policy_delivers_the_full_buy_amount() {
        let plan = plan(0, FeePolicy::default(), Layer::L2);
        let t = terms(Layer::L2);

        assert_eq!(plan.transaction(Slot::ClientReceives).amount(), t.buy.amount);
        assert_eq!(plan.transaction(Slot::ProviderReceives).amount(), t.sell.amount - 100);
        assert_eq!(plan.transaction(Slot::ClientRefund).amount(), t.sell.amount - 100);
        assert_eq!(plan.transaction(Slot::ProviderRefund).amount(), t.buy.amount);

        assert_eq!(
            plan.funding().of(Payer::Client),
            &[Deposit {
                token: ETH,
                amount: t.sell.amount + 300
            }]
        );
        assert_eq!(
            plan.funding().of(Payer::Provider),
            &[Deposit {
                token: DAI,
                amount: t.buy.amount + 20_000
            }]
        );
    }

    #[test]
    fn both_paths_drain_the_escrow() {
        for policy in [
            FeePolicy::default(),
            FeePolicy {
                change_pub_key: Payer::Provider,
                client_receives: Payer::Client,
                provider_receives: Payer::Client,
            },
        ] {
            for layer in [Layer::L1, Layer::L2] {
                let plan = plan(0, policy, layer);
                let deposited = |token: TokenId| -> Amount {
                    plan.funding()
                        .provider
                        .iter()
                        .chain(plan.funding().client.iter())
                        .filter(|d| d.token == token)
                        .map(|d| d.amount)
                        .sum()
                };
                let spent = |slots: &[Slot], token: TokenId| -> Amount {
                    slots
                        .iter()
                        .map(|s| plan.transaction(*s))
                        .map(|tx| {
                            let moved = if tx.token() == Some(token) { tx.amount() } else { 0 };
                            let fee = if tx.fee_token() == token { tx.fee() } else { 0 };
                            moved + fee
                        })
                        .sum()
                };

                for token in [ETH, DAI] {
                    assert_eq!(spent(&Slot::HAPPY_PATH, token), deposited(token));
                    assert_eq!(spent(&Slot::REFUND_PATH, token), deposited(token));
                }
            }
        }
    }

    #[test]
    fn l1_withdrawal_uses_the_withdraw_fee() {
        let plan = plan(0, FeePolicy::default(), Layer::L1);
        let tx = plan.transaction(Slot::ProviderReceives);
        assert!(matches!(tx, Transaction::Withdraw(_)));
        assert_eq!(tx.fee(), 500);
        assert_eq!(tx.amount(), terms(Layer::L1).sell.amount - 500);
    }

    #[test]
    fn fees_larger_than_the_amount_are_rejected() {
        let mut t = terms(Layer::L2);
        t.sell.amount = 50;
        let err = SwapPlan::new(&t, &parties(), &escrow(), &snapshot(0), &FeePolicy::default()).unwrap_err();
        assert!(matches!(err, SwapError::InvalidTerms(_)));

        let mut t = terms(Layer::L2);
        t.buy.token = ETH;
        assert!(t.validate().is_err());
    }
}
