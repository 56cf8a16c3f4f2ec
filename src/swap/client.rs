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

//! The party that accepts the provider's terms.

use std::ops::{Deref, DerefMut};

use tracing::warn;

use super::handle::Swap;
use super::messages::{ClientCommitment, ClientSignature, ProviderProposal, ProviderSignature};
use super::party::{Attempt, Built, Identity, Party, Stage};
use super::{Role, SwapState};
use crate::address::EscrowDescriptor;
use crate::config::SwapConfig;
use crate::errors::SwapError;
use crate::ledger::Ledger;
use crate::musig::SignerSession;
use crate::plan::{LedgerSnapshot, Parties, SwapPlan, SLOTS};

pub struct Client<L> {
    party: Party<L>,
}

impl<L> Deref for Client<L> {
    type Target = Party<L>;

    fn deref(&self) -> &Party<L> {
        &self.party
    }
}

impl<L> DerefMut for Client<L> {
    fn deref_mut(&mut self) -> &mut Party<L> {
        &mut self.party
    }
}

impl<L: Ledger> Client<L> {
    pub fn new(identity: Identity<L>, config: SwapConfig) -> Self {
        Client {
            party: Party::new(identity, Role::Client, config),
        }
    }

    /// Accept a proposal: check the escrow address, then precommit and
    /// reveal the nonces in one message.
    pub fn prepare_swap(&mut self, proposal: &ProviderProposal) -> Result<ClientCommitment, SwapError> {
        self.party.ensure_empty("prepare_swap")?;
        proposal.terms.validate()?;

        let mut session = SignerSession::new(vec![proposal.pubkey, self.party.pubkey()], Role::Client.position(), SLOTS)?;
        let escrow = EscrowDescriptor::derive(&session.aggregated_key(), &proposal.terms.create2);
        if escrow.address != proposal.escrow {
            warn!(computed = %escrow.address, declared = %proposal.escrow, "escrow address mismatch");
            return Err(SwapError::EscrowMismatch {
                computed: escrow.address,
                declared: proposal.escrow,
            });
        }

        let precommitments = session.compute_precommitments()?;
        let commitments = session.receive_precommitments(&[proposal.precommitments.clone(), precommitments.clone()])?;

        let message = ClientCommitment {
            pubkey: self.party.pubkey(),
            address: self.party.address(),
            precommitments: precommitments.clone(),
            commitments: commitments.clone(),
        };
        self.party.start(Attempt {
            terms: proposal.terms.clone(),
            parties: Parties {
                provider: proposal.address,
                client: self.party.address(),
            },
            escrow,
            peer_pubkey: proposal.pubkey,
            session,
            precommitments,
            commitments,
            stage: Stage::Prepared,
            deposits: Vec::new(),
        });
        Ok(message)
    }

    /// Build the batch independently, sign it, and verify the result of
    /// combining with the provider's shares. Nothing is returned, and no
    /// share leaves this party, unless every slot verifies.
    pub async fn sign_swap(&mut self, msg: &ProviderSignature) -> Result<(ClientSignature, Swap<L>), SwapError> {
        let attempt = self.party.attempt("sign_swap", SwapState::Prepared)?;

        let ledger = self.party.ledger().clone();
        let snapshot = LedgerSnapshot::fetch(ledger.as_ref(), &attempt.escrow.address, &attempt.terms).await?;
        if let Some(field) = snapshot.diverges_from(&msg.snapshot) {
            warn!(escrow = %attempt.escrow.address, field, "provider built against a different ledger state");
            return Err(SwapError::BatchMismatch { field });
        }

        let mut session = attempt.session.clone();
        session.receive_commitments(&[msg.commitments.clone(), attempt.commitments.clone()])?;

        let plan = SwapPlan::new(
            &attempt.terms,
            &attempt.parties,
            &attempt.escrow,
            &snapshot,
            &self.party.config().fee_policy,
        )?;
        let shares = self.party.sign_plan(&mut session, &plan)?;
        let signed = self.party.combine_and_verify(&session, &plan, &msg.shares, &shares)?;
        let swap = self.party.swap_handle(attempt, signed.clone());

        self.party.commit(
            session,
            Stage::Signed {
                built: Built {
                    snapshot,
                    plan,
                    shares: shares.clone(),
                },
                signed: Some(signed),
            },
        );
        Ok((ClientSignature { shares }, swap))
    }
}
