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

//! The party that fixes the terms and provides liquidity.

use std::ops::{Deref, DerefMut};

use tracing::{info, warn};

use super::handle::Swap;
use super::messages::{ClientCommitment, ClientSignature, ProviderProposal, ProviderSignature};
use super::party::{Attempt, Built, Identity, Party, Stage};
use super::{Role, SwapState};
use crate::address::{Address, EscrowDescriptor};
use crate::config::SwapConfig;
use crate::errors::SwapError;
use crate::ledger::{Layer, Ledger};
use crate::musig::SignerSession;
use crate::plan::{LedgerSnapshot, Parties, Payer, SwapPlan, SwapTerms, SLOTS};
use crate::PublicKey;

pub struct Provider<L> {
    party: Party<L>,
}

impl<L> Deref for Provider<L> {
    type Target = Party<L>;

    fn deref(&self) -> &Party<L> {
        &self.party
    }
}

impl<L> DerefMut for Provider<L> {
    fn deref_mut(&mut self) -> &mut Party<L> {
        &mut self.party
    }
}

impl<L: Ledger> Provider<L> {
    pub fn new(identity: Identity<L>, config: SwapConfig) -> Self {
        Provider {
            party: Party::new(identity, Role::Provider, config),
        }
    }

    /// Start an attempt: fix the terms, derive and open the escrow
    /// account, and precommit to the nonces.
    pub async fn prepare_swap(
        &mut self,
        mut terms: SwapTerms,
        client_pubkey: PublicKey,
        client_address: Address,
    ) -> Result<ProviderProposal, SwapError> {
        self.party.ensure_empty("prepare_swap")?;
        terms.validate()?;
        if self.party.config().randomize_salt {
            terms.create2.randomize_salt(&mut rand::thread_rng());
        }

        let mut session = SignerSession::new(vec![self.party.pubkey(), client_pubkey], Role::Provider.position(), SLOTS)?;
        let escrow = EscrowDescriptor::derive(&session.aggregated_key(), &terms.create2);

        // a zero transfer gives the escrow an account id to build against
        let ledger = self.party.ledger().clone();
        let hash = ledger.deposit(&escrow.address, terms.buy.token, 0, Layer::L2).await?;
        ledger.await_receipt(&hash).await?;

        let precommitments = session.compute_precommitments()?;
        let proposal = ProviderProposal {
            terms: terms.clone(),
            pubkey: self.party.pubkey(),
            address: self.party.address(),
            precommitments: precommitments.clone(),
            escrow: escrow.address,
        };

        self.party.start(Attempt {
            terms,
            parties: Parties {
                provider: self.party.address(),
                client: client_address,
            },
            escrow,
            peer_pubkey: client_pubkey,
            session,
            precommitments,
            commitments: Vec::new(),
            stage: Stage::Prepared,
            deposits: Vec::new(),
        });
        Ok(proposal)
    }

    /// Finish the nonce exchange, build the batch and sign every slot.
    pub async fn sign_swap(&mut self, msg: &ClientCommitment) -> Result<ProviderSignature, SwapError> {
        let attempt = self.party.attempt("sign_swap", SwapState::Prepared)?;
        if msg.pubkey != attempt.peer_pubkey {
            return Err(SwapError::BatchMismatch { field: "client key" });
        }
        if msg.address != attempt.parties.client {
            return Err(SwapError::BatchMismatch { field: "client address" });
        }

        let ledger = self.party.ledger().clone();
        let snapshot = LedgerSnapshot::fetch(ledger.as_ref(), &attempt.escrow.address, &attempt.terms).await?;

        let mut session = attempt.session.clone();
        let commitments =
            session.receive_precommitments(&[attempt.precommitments.clone(), msg.precommitments.clone()])?;
        session.receive_commitments(&[commitments.clone(), msg.commitments.clone()])?;

        let plan = SwapPlan::new(
            &attempt.terms,
            &attempt.parties,
            &attempt.escrow,
            &snapshot,
            &self.party.config().fee_policy,
        )?;
        let shares = self.party.sign_plan(&mut session, &plan)?;

        self.party.set_commitments(commitments.clone());
        self.party.commit(
            session,
            Stage::Signed {
                built: Built {
                    snapshot,
                    plan,
                    shares: shares.clone(),
                },
                signed: None,
            },
        );
        Ok(ProviderSignature {
            commitments,
            snapshot,
            shares,
        })
    }

    /// Verify the client's shares and that the client has paid in.
    pub async fn check_swap(&mut self, msg: &ClientSignature) -> Result<Swap<L>, SwapError> {
        let operation = "check_swap";
        let attempt = self.party.attempt(operation, SwapState::Signed)?;
        let built = attempt.built(operation)?;
        let signed = self
            .party
            .combine_and_verify(&attempt.session, &built.plan, &built.shares, &msg.shares)?;

        let escrow = attempt.escrow.address;
        let state = self.party.ledger().account_state(&escrow).await?;
        for deposit in built.plan.funding().of(Payer::Client) {
            let available = state.balance(deposit.token);
            if available < deposit.amount {
                warn!(%escrow, token = %deposit.token, required = deposit.amount, available, "client deposit missing");
                return Err(SwapError::InsufficientDeposit {
                    token: deposit.token,
                    required: deposit.amount,
                    available,
                });
            }
        }

        let swap = self.party.swap_handle(attempt, signed.clone());
        self.party.replace_stage(|stage| match stage {
            Stage::Signed { built, .. } => Stage::Checked { built, signed },
            other => other,
        });
        info!(%escrow, "client shares and deposit verified");
        Ok(swap)
    }
}
