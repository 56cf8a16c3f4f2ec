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

//! State shared by both roles.
//!
//! An [`Identity`] lives as long as the wallet. Every `prepare_swap`
//! creates a fresh `Attempt` owned by the [`Party`]; `reset` drops it,
//! and with it the session nonces.

use std::mem;
use std::sync::Arc;

use tracing::{debug, info, warn};

use super::handle::Swap;
use super::{Role, SwapState};
use crate::address::{Address, EscrowDescriptor};
use crate::config::SwapConfig;
use crate::errors::SwapError;
use crate::ledger::Ledger;
use crate::musig::{NonceCommitment, NoncePrecommitment, PartialSignature, SignerSession};
use crate::plan::{LedgerSnapshot, Parties, SwapPlan, SwapTerms, SLOTS};
use crate::recovery::RecoveryInputs;
use crate::tx::{AccountId, SignedTransaction, TxHash, TxSignature};
use crate::{Keypair, PublicKey};

/// Long-lived keys and ledger handle of one participant.
pub struct Identity<L> {
    keypair: Keypair,
    address: Address,
    ledger: Arc<L>,
    account_id: Option<AccountId>,
}

impl<L: Ledger> Identity<L> {
    /// Resolve the account behind `address`.
    pub async fn connect(keypair: Keypair, address: Address, ledger: Arc<L>) -> Result<Self, SwapError> {
        let state = ledger.account_state(&address).await?;
        info!(%address, account_id = ?state.id, "identity connected");
        Ok(Identity {
            keypair,
            address,
            ledger,
            account_id: state.id,
        })
    }
}

impl<L> Identity<L> {
    pub fn address(&self) -> Address {
        self.address
    }

    pub fn pubkey(&self) -> PublicKey {
        self.keypair.public
    }

    pub fn id(&self) -> Option<AccountId> {
        self.account_id
    }

    pub fn ledger(&self) -> &Arc<L> {
        &self.ledger
    }
}

/// Output of a completed signing round.
pub(super) struct Built {
    pub(super) snapshot: LedgerSnapshot,
    pub(super) plan: SwapPlan,
    pub(super) shares: Vec<PartialSignature>,
}

pub(super) enum Stage {
    Prepared,
    /// The provider holds no signed batch until it sees the client's shares.
    Signed {
        built: Built,
        signed: Option<Vec<SignedTransaction>>,
    },
    Checked {
        built: Built,
        signed: Vec<SignedTransaction>,
    },
    Deposited {
        built: Built,
        signed: Vec<SignedTransaction>,
    },
    Finalized {
        built: Built,
        signed: Vec<SignedTransaction>,
    },
}

impl Stage {
    fn state(&self) -> SwapState {
        match self {
            Stage::Prepared => SwapState::Prepared,
            Stage::Signed { .. } => SwapState::Signed,
            Stage::Checked { .. } => SwapState::Checked,
            Stage::Deposited { .. } => SwapState::Deposited,
            Stage::Finalized { .. } => SwapState::Finalized,
        }
    }

    pub(super) fn built(&self) -> Option<&Built> {
        match self {
            Stage::Prepared => None,
            Stage::Signed { built, .. }
            | Stage::Checked { built, .. }
            | Stage::Deposited { built, .. }
            | Stage::Finalized { built, .. } => Some(built),
        }
    }

    pub(super) fn signed(&self) -> Option<&[SignedTransaction]> {
        match self {
            Stage::Prepared => None,
            Stage::Signed { signed, .. } => signed.as_deref(),
            Stage::Checked { signed, .. } | Stage::Deposited { signed, .. } | Stage::Finalized { signed, .. } => {
                Some(signed)
            }
        }
    }

    /// Move a stage holding a signed batch to `Deposited` or `Finalized`.
    fn promote(self, to: SwapState) -> Stage {
        match (self, to) {
            (Stage::Signed { built, signed: Some(signed) }, SwapState::Deposited)
            | (Stage::Checked { built, signed }, SwapState::Deposited) => Stage::Deposited { built, signed },
            (Stage::Deposited { built, signed }, SwapState::Finalized) => Stage::Finalized { built, signed },
            (stage, _) => stage,
        }
    }
}

/// Everything belonging to one swap attempt.
pub(super) struct Attempt {
    pub(super) terms: SwapTerms,
    pub(super) parties: Parties,
    pub(super) escrow: EscrowDescriptor,
    pub(super) peer_pubkey: PublicKey,
    pub(super) session: SignerSession,
    pub(super) precommitments: Vec<NoncePrecommitment>,
    pub(super) commitments: Vec<NonceCommitment>,
    pub(super) stage: Stage,
    /// Deposits already handed to the ledger, in funding order.
    pub(super) deposits: Vec<TxHash>,
}

impl Attempt {
    pub(super) fn built(&self, operation: &'static str) -> Result<&Built, SwapError> {
        self.stage.built().ok_or(SwapError::InvalidState {
            operation,
            expected: SwapState::Signed,
            actual: self.stage.state(),
        })
    }
}

/// The swap engine of one participant, parameterized by its [`Role`].
pub struct Party<L> {
    identity: Identity<L>,
    role: Role,
    config: SwapConfig,
    attempt: Option<Attempt>,
}

impl<L: Ledger> Party<L> {
    pub fn new(identity: Identity<L>, role: Role, config: SwapConfig) -> Self {
        Party {
            identity,
            role,
            config,
            attempt: None,
        }
    }

    pub fn state(&self) -> SwapState {
        self.attempt
            .as_ref()
            .map(|a| a.stage.state())
            .unwrap_or(SwapState::Empty)
    }

    pub fn role(&self) -> Role {
        self.role
    }

    pub fn identity(&self) -> &Identity<L> {
        &self.identity
    }

    pub fn address(&self) -> Address {
        self.identity.address()
    }

    pub fn pubkey(&self) -> PublicKey {
        self.identity.pubkey()
    }

    pub fn id(&self) -> Option<AccountId> {
        self.identity.id()
    }

    pub fn config(&self) -> &SwapConfig {
        &self.config
    }

    pub fn terms(&self) -> Option<&SwapTerms> {
        self.attempt.as_ref().map(|a| &a.terms)
    }

    pub fn escrow(&self) -> Option<&EscrowDescriptor> {
        self.attempt.as_ref().map(|a| &a.escrow)
    }

    pub fn plan(&self) -> Option<&SwapPlan> {
        self.attempt.as_ref().and_then(|a| a.stage.built()).map(|b| &b.plan)
    }

    /// Ledger state the batch was built against.
    pub fn snapshot(&self) -> Option<&LedgerSnapshot> {
        self.attempt.as_ref().and_then(|a| a.stage.built()).map(|b| &b.snapshot)
    }

    /// What the recovery contracts need to reach this attempt's escrow.
    pub fn recovery_inputs(&self) -> Option<RecoveryInputs> {
        self.attempt
            .as_ref()
            .map(|a| RecoveryInputs::new(&a.terms.create2, &a.escrow))
    }

    /// Handle over the signed batch, once this party holds one.
    pub fn swap(&self) -> Option<Swap<L>> {
        let attempt = self.attempt.as_ref()?;
        let signed = attempt.stage.signed()?;
        Some(self.swap_handle(attempt, signed.to_vec()))
    }

    /// Drop the current attempt, if any. Always succeeds.
    pub fn reset(&mut self) {
        if let Some(attempt) = self.attempt.take() {
            info!(role = ?self.role, escrow = %attempt.escrow.address, state = ?attempt.stage.state(), "attempt discarded");
        }
    }

    /// Pay this party's side of the trade into the escrow account.
    ///
    /// Each deposit is recorded on the attempt as soon as the ledger
    /// accepts it. A retry after a failure waits on those instead of
    /// paying them again.
    pub async fn deposit_funds(&mut self) -> Result<Vec<TxHash>, SwapError> {
        let operation = "deposit_funds";
        let attempt = self.attempt(operation, self.role.deposit_after())?;
        if attempt.stage.signed().is_none() {
            return Err(self.invalid_state(operation, self.role.deposit_after()));
        }
        let deposits = attempt.built(operation)?.plan.funding().of(self.role.payer()).to_vec();
        let paid = attempt.deposits.clone();
        let escrow = attempt.escrow.address;

        let ledger = self.identity.ledger.clone();
        let mut hashes = Vec::with_capacity(deposits.len());
        for (index, deposit) in deposits.into_iter().enumerate() {
            let hash = match paid.get(index) {
                Some(hash) => {
                    debug!(role = ?self.role, %escrow, %hash, "deposit already sent");
                    *hash
                }
                None => {
                    let hash = ledger
                        .deposit(&escrow, deposit.token, deposit.amount, self.config.deposit_layer)
                        .await
                        .map_err(|err| {
                            if index > 0 {
                                warn!(role = ?self.role, %escrow, "deposit interrupted after partial payment");
                            }
                            SwapError::from(err)
                        })?;
                    self.record_deposit(hash);
                    hash
                }
            };
            ledger.await_receipt(&hash).await?;
            info!(role = ?self.role, %escrow, token = %deposit.token, amount = deposit.amount, "deposited");
            hashes.push(hash);
        }

        self.advance(SwapState::Deposited);
        Ok(hashes)
    }

    /// Submit the happy-path legs not yet executed.
    pub async fn finalize_swap(&mut self) -> Result<Vec<TxHash>, SwapError> {
        let operation = "finalize_swap";
        let attempt = self.attempt(operation, SwapState::Deposited)?;
        let signed = attempt
            .stage
            .signed()
            .ok_or_else(|| self.invalid_state(operation, SwapState::Deposited))?;
        let swap = self.swap_handle(attempt, signed.to_vec());

        let hashes = swap.finalize().await?;
        self.advance(SwapState::Finalized);
        Ok(hashes)
    }

    pub(super) fn ledger(&self) -> &Arc<L> {
        self.identity.ledger()
    }

    pub(super) fn keypair(&self) -> &Keypair {
        &self.identity.keypair
    }

    fn invalid_state(&self, operation: &'static str, expected: SwapState) -> SwapError {
        SwapError::InvalidState {
            operation,
            expected,
            actual: self.state(),
        }
    }

    pub(super) fn ensure_empty(&self, operation: &'static str) -> Result<(), SwapError> {
        match self.attempt {
            None => Ok(()),
            Some(_) => Err(self.invalid_state(operation, SwapState::Empty)),
        }
    }

    pub(super) fn attempt(&self, operation: &'static str, expected: SwapState) -> Result<&Attempt, SwapError> {
        match &self.attempt {
            Some(attempt) if attempt.stage.state() == expected => Ok(attempt),
            _ => Err(self.invalid_state(operation, expected)),
        }
    }

    pub(super) fn start(&mut self, attempt: Attempt) {
        info!(role = ?self.role, escrow = %attempt.escrow.address, "swap prepared");
        self.attempt = Some(attempt);
    }

    /// Commit a new session and stage. Called only once every fallible
    /// step of an operation has succeeded.
    pub(super) fn commit(&mut self, session: SignerSession, stage: Stage) {
        if let Some(attempt) = self.attempt.as_mut() {
            attempt.session = session;
            attempt.stage = stage;
            info!(role = ?self.role, escrow = %attempt.escrow.address, state = ?attempt.stage.state(), "state advanced");
        }
    }

    fn record_deposit(&mut self, hash: TxHash) {
        if let Some(attempt) = self.attempt.as_mut() {
            attempt.deposits.push(hash);
        }
    }

    pub(super) fn set_commitments(&mut self, commitments: Vec<NonceCommitment>) {
        if let Some(attempt) = self.attempt.as_mut() {
            attempt.commitments = commitments;
        }
    }

    /// Rebuild the stage in place, moving its contents.
    pub(super) fn replace_stage(&mut self, f: impl FnOnce(Stage) -> Stage) {
        if let Some(attempt) = self.attempt.as_mut() {
            let stage = mem::replace(&mut attempt.stage, Stage::Prepared);
            attempt.stage = f(stage);
            info!(role = ?self.role, escrow = %attempt.escrow.address, state = ?attempt.stage.state(), "state advanced");
        }
    }

    fn advance(&mut self, to: SwapState) {
        self.replace_stage(|stage| stage.promote(to));
    }

    /// This party's share for every slot of `plan`.
    pub(super) fn sign_plan(&self, session: &mut SignerSession, plan: &SwapPlan) -> Result<Vec<PartialSignature>, SwapError> {
        plan.messages()
            .iter()
            .enumerate()
            .map(|(slot, message)| {
                session
                    .sign(&self.keypair().secret, message, slot)
                    .map_err(SwapError::from)
            })
            .collect()
    }

    /// Combine both parties' shares and check every signature against
    /// the aggregated key, returning the signed batch.
    pub(super) fn combine_and_verify(
        &self,
        session: &SignerSession,
        plan: &SwapPlan,
        provider_shares: &[PartialSignature],
        client_shares: &[PartialSignature],
    ) -> Result<Vec<SignedTransaction>, SwapError> {
        if provider_shares.len() != SLOTS || client_shares.len() != SLOTS {
            warn!(role = ?self.role, "peer sent the wrong number of shares");
            return Err(SwapError::InvalidShares {
                slot: provider_shares.len().min(client_shares.len()),
            });
        }

        let pubkey = session.aggregated_key();
        plan.transactions()
            .iter()
            .enumerate()
            .map(|(slot, tx)| -> Result<SignedTransaction, SwapError> {
                let signature = session.combine(&[provider_shares[slot], client_shares[slot]], slot)?;
                if !session.verify(&tx.message_bytes(), &signature) {
                    warn!(role = ?self.role, slot, "combined signature failed to verify");
                    return Err(SwapError::InvalidShares { slot });
                }
                Ok(tx.clone().into_signed(TxSignature { pubkey, signature }))
            })
            .collect()
    }

    pub(super) fn swap_handle(&self, attempt: &Attempt, signed: Vec<SignedTransaction>) -> Swap<L> {
        Swap::new(
            self.identity.ledger.clone(),
            attempt.escrow.address,
            attempt.terms.timeout,
            signed,
            self.role.delivery_slot(),
            &self.config,
        )
    }
}
