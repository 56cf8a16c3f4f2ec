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

//! A fully signed swap batch and what can be done with it.

use std::sync::Arc;
use std::time::Duration;

use tokio::time::timeout;
use tracing::{debug, info, warn};

use crate::address::Address;
use crate::config::SwapConfig;
use crate::errors::SwapError;
use crate::ledger::{Confirmation, Ledger, LedgerError, Receipt};
use crate::plan::Slot;
use crate::tx::{Nonce, SignedTransaction, TxHash};

/// Read-only view over a signed batch. Submitting only forwards the
/// pre-signed transactions; nothing is signed here.
#[derive(Debug)]
pub struct Swap<L> {
    ledger: Arc<L>,
    escrow: Address,
    timeout: u64,
    transactions: Vec<SignedTransaction>,
    watch: TxHash,
    confirmation: Confirmation,
    wait_timeout: Duration,
}

impl<L> Clone for Swap<L> {
    fn clone(&self) -> Self {
        Swap {
            ledger: self.ledger.clone(),
            escrow: self.escrow,
            timeout: self.timeout,
            transactions: self.transactions.clone(),
            watch: self.watch,
            confirmation: self.confirmation,
            wait_timeout: self.wait_timeout,
        }
    }
}

impl<L: Ledger> Swap<L> {
    /// `transactions` holds one signed transaction per slot, in slot order.
    pub(crate) fn new(
        ledger: Arc<L>,
        escrow: Address,
        timeout: u64,
        transactions: Vec<SignedTransaction>,
        watch: Slot,
        config: &SwapConfig,
    ) -> Self {
        let watch = transactions[watch.index()].hash();
        Swap {
            ledger,
            escrow,
            timeout,
            transactions,
            watch,
            confirmation: config.confirmation,
            wait_timeout: config.wait_timeout(),
        }
    }

    pub fn escrow(&self) -> Address {
        self.escrow
    }

    pub fn timeout(&self) -> u64 {
        self.timeout
    }

    pub fn transaction(&self, slot: Slot) -> &SignedTransaction {
        &self.transactions[slot.index()]
    }

    /// Hash of the delivery this handle waits for.
    pub fn watched(&self) -> TxHash {
        self.watch
    }

    /// Whether ledger time has passed the happy-path deadline.
    pub async fn is_expired(&self) -> Result<bool, SwapError> {
        Ok(self.ledger.block_time().await? > self.timeout)
    }

    /// Wait until the watched delivery reaches the configured confirmation.
    pub async fn wait(&self) -> Result<Receipt, SwapError> {
        debug!(hash = %self.watch, level = ?self.confirmation, "waiting for delivery");
        match timeout(
            self.wait_timeout,
            self.ledger.notify_on_confirmation(&self.watch, self.confirmation),
        )
        .await
        {
            Ok(receipt) => Ok(receipt?),
            Err(_) => Err(SwapError::WaitTimeout),
        }
    }

    /// Submit the happy-path legs the escrow has not executed yet.
    ///
    /// A happy-path nonce the escrow has moved past must have been spent
    /// by that very leg; if a refund spent it instead, this fails with
    /// [`SwapError::RefundExecuted`].
    pub async fn finalize(&self) -> Result<Vec<TxHash>, SwapError> {
        let state = self.ledger.account_state(&self.escrow).await?;
        for slot in Slot::HAPPY_PATH.iter() {
            if self.transaction(*slot).tx().nonce() < state.nonce {
                self.ensure_executed(*slot).await?;
            }
        }
        let pending = self.filter_executed(&Slot::HAPPY_PATH, state.nonce);
        self.submit("finalize", pending).await
    }

    /// Submit the refund legs the escrow has not executed yet. Valid only
    /// after the timeout.
    ///
    /// The buy-token refund is left out while the escrow cannot pay it,
    /// which is the case when the provider never deposited. Its nonce then
    /// stays unused, so the provider's delivery, valid from time zero
    /// with no upper bound, remains executable: any sell-token amount paid
    /// into the escrow afterwards can be moved to the provider by it.
    pub async fn cancel(&self) -> Result<Vec<TxHash>, SwapError> {
        let state = self.ledger.account_state(&self.escrow).await?;
        let refund = self.transaction(Slot::ProviderRefund).tx();
        let required = refund.amount().saturating_add(refund.fee());
        let available = refund.token().map(|token| state.balance(token)).unwrap_or(0);

        let mut slots = Slot::REFUND_PATH.to_vec();
        if available < required {
            slots.retain(|slot| *slot != Slot::ProviderRefund);
        }
        let pending = self.filter_executed(&slots, state.nonce);
        self.submit("cancel", pending).await
    }

    async fn ensure_executed(&self, slot: Slot) -> Result<(), SwapError> {
        match self.ledger.await_receipt(&self.transaction(slot).hash()).await {
            Ok(_) => Ok(()),
            Err(LedgerError::UnknownTransaction(_)) => {
                warn!(escrow = %self.escrow, ?slot, "nonce spent by the refund path");
                Err(SwapError::RefundExecuted { slot })
            }
            Err(err) => Err(err.into()),
        }
    }

    fn filter_executed(&self, slots: &[Slot], nonce: Nonce) -> Vec<SignedTransaction> {
        slots
            .iter()
            .map(|slot| self.transaction(*slot))
            .filter(|tx| tx.tx().nonce() >= nonce)
            .cloned()
            .collect()
    }

    async fn submit(&self, path: &'static str, pending: Vec<SignedTransaction>) -> Result<Vec<TxHash>, SwapError> {
        if pending.is_empty() {
            debug!(path, escrow = %self.escrow, "nothing left to submit");
            return Ok(Vec::new());
        }
        let count = pending.len();
        let hashes = self.ledger.submit_batch(pending).await?;
        info!(path, escrow = %self.escrow, count, "batch submitted");
        Ok(hashes)
    }
}
