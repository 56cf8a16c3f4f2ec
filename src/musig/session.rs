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

//! A two-party signing session over a fixed number of slots.
//!
//! Every slot is an independent MuSig run with its own nonce. The rounds
//! advance for all slots at once, because the swap exchanges one message
//! per round carrying a value for every slot:
//!
//! 1. `compute_precommitments`: draw a nonce per slot, publish `H(R_i)`.
//! 2. `receive_precommitments`: once both precommitments are in, reveal `R_i`.
//! 3. `receive_commitments`: check the peer's `R_i` against `H(R_i)`.
//! 4. `sign`: produce this signer's share for one slot, consuming its nonce.
//! 5. `combine` / `verify`: sum the shares, check under the aggregated key.

use curve25519_dalek::ristretto::RistrettoPoint;
use curve25519_dalek::scalar::Scalar;
use merlin::Transcript;
use subtle::ConstantTimeEq;
use tracing::debug;
use zeroize::Zeroize;

use crate::errors::{self, MuSigError};
use crate::musig::counterparty::{Counterparty, CounterpartyCommitted, CounterpartyPrecommitted};
use crate::musig::{NonceCommitment, NoncePrecommitment, PartialSignature};
use crate::tools::{SigningContext, TranscriptProtocol};
use crate::{MultiKey, MuSigContext, PublicKey, SchnorrError, SecretKey, Signature};

/// Number of signers a session supports.
pub const SIGNERS: usize = 2;

/// The local secret nonce of one slot.
#[allow(non_snake_case)]
#[derive(Clone)]
struct LocalNonce {
    r: Scalar,
    R: NonceCommitment,
}

impl Drop for LocalNonce {
    fn drop(&mut self) {
        self.r.zeroize();
    }
}

#[allow(non_snake_case)]
#[derive(Clone)]
enum SlotState {
    Fresh,
    Precommitted {
        nonce: LocalNonce,
    },
    Revealed {
        nonce: LocalNonce,
        peer: CounterpartyPrecommitted,
    },
    Committed {
        nonce: LocalNonce,
        peer: CounterpartyCommitted,
        R: RistrettoPoint,
    },
    Signed {
        peer: CounterpartyCommitted,
        R: RistrettoPoint,
        share: PartialSignature,
        transcript: Transcript,
    },
}

impl SlotState {
    fn name(&self) -> &'static str {
        match self {
            SlotState::Fresh => "fresh",
            SlotState::Precommitted { .. } => "precommitted",
            SlotState::Revealed { .. } => "revealed",
            SlotState::Committed { .. } => "committed",
            SlotState::Signed { .. } => "signed",
        }
    }
}

/// N independent two-party MuSig sessions sharing one key set.
#[derive(Clone)]
pub struct SignerSession {
    multikey: MultiKey,
    position: usize,
    peer: Counterparty,
    context: SigningContext,
    slots: Vec<SlotState>,
}

impl SignerSession {
    /// Start a session for `pubkeys` (ordered, position 0 first) in which
    /// this signer holds `position`, with `slots` independent messages.
    pub fn new(pubkeys: Vec<PublicKey>, position: usize, slots: usize) -> Result<Self, SchnorrError> {
        if pubkeys.len() > SIGNERS {
            return Err(errors::from_musig(MuSigError::TooManyParticipants));
        }
        if pubkeys.len() != SIGNERS || position >= SIGNERS || slots == 0 {
            return Err(errors::from_musig(MuSigError::BadArguments));
        }

        let peer_position = 1 - position;
        let peer = Counterparty::new(peer_position, pubkeys[peer_position]);
        let multikey = MultiKey::new(pubkeys)?;

        Ok(SignerSession {
            multikey,
            position,
            peer,
            context: SigningContext::transactions(),
            slots: vec![SlotState::Fresh; slots],
        })
    }

    /// The key every combined signature verifies under.
    pub fn aggregated_key(&self) -> PublicKey {
        self.multikey.aggregated_key()
    }

    /// This signer's position in the key order.
    pub fn position(&self) -> usize {
        self.position
    }

    /// Number of slots in the session.
    pub fn slots(&self) -> usize {
        self.slots.len()
    }

    /// Round 1: draw a fresh nonce for every slot and return `H(R_i)`.
    #[allow(non_snake_case)]
    pub fn compute_precommitments(&mut self) -> Result<Vec<NoncePrecommitment>, SchnorrError> {
        self.expect_all("fresh", |s| matches!(s, SlotState::Fresh))?;

        let mut precommitments = Vec::with_capacity(self.slots.len());
        for (slot, state) in self.slots.iter_mut().enumerate() {
            let mut t = Transcript::new(b"Musig.nonce");
            t.commit_point(b"X", self.multikey.aggregated_key().as_compressed());
            t.commit_u64(b"position", self.position as u64);
            t.commit_u64(b"slot", slot as u64);
            let mut rng = t.build_rng().finalize(&mut rand::thread_rng());

            // Generate ephemeral keypair (r_i, R_i). r_i is a random nonce.
            let r = Scalar::random(&mut rng);
            // R_i = generator * r_i
            let R = NonceCommitment::new(RistrettoPoint::mul_base(&r));

            precommitments.push(R.precommit());
            *state = SlotState::Precommitted {
                nonce: LocalNonce { r, R },
            };
        }

        debug!(position = self.position, slots = self.slots.len(), "nonces precommitted");
        Ok(precommitments)
    }

    /// Round 2: take every signer's precommitments, indexed by position, and
    /// reveal this signer's nonce points.
    pub fn receive_precommitments(
        &mut self,
        precommitments: &[Vec<NoncePrecommitment>],
    ) -> Result<Vec<NonceCommitment>, SchnorrError> {
        self.expect_all("precommitted", |s| matches!(s, SlotState::Precommitted { .. }))?;
        self.check_shape(precommitments.len(), precommitments.iter().map(|p| p.len()))?;

        let mine = &precommitments[self.position];
        let theirs = &precommitments[self.peer.position()];

        let mut next = Vec::with_capacity(self.slots.len());
        for (slot, state) in self.slots.iter().enumerate() {
            if let SlotState::Precommitted { nonce } = state {
                if nonce.R.precommit().ct_eq(&mine[slot]).unwrap_u8() == 0 {
                    return Err(errors::from_musig(MuSigError::BadArguments));
                }
                next.push(SlotState::Revealed {
                    nonce: nonce.clone(),
                    peer: self.peer.precommit_nonce(theirs[slot]),
                });
            }
        }

        let commitments = next
            .iter()
            .filter_map(|s| match s {
                SlotState::Revealed { nonce, .. } => Some(nonce.R),
                _ => None,
            })
            .collect();
        self.slots = next;
        Ok(commitments)
    }

    /// Round 2, closing half: take every signer's nonce points, indexed by
    /// position, and check the peer's against its precommitments.
    #[allow(non_snake_case)]
    pub fn receive_commitments(&mut self, commitments: &[Vec<NonceCommitment>]) -> Result<(), SchnorrError> {
        self.expect_all("revealed", |s| matches!(s, SlotState::Revealed { .. }))?;
        self.check_shape(commitments.len(), commitments.iter().map(|c| c.len()))?;

        let mine = &commitments[self.position];
        let theirs = &commitments[self.peer.position()];

        let mut next = Vec::with_capacity(self.slots.len());
        for (slot, state) in self.slots.iter().enumerate() {
            if let SlotState::Revealed { nonce, peer } = state {
                if nonce.R != mine[slot] {
                    return Err(errors::from_musig(MuSigError::BadArguments));
                }
                let peer = peer.verify_nonce(theirs[slot], slot)?;

                let mut ordered = [nonce.R; SIGNERS];
                ordered[self.peer.position()] = peer.commitment();
                let R = NonceCommitment::sum(&ordered);

                next.push(SlotState::Committed {
                    nonce: nonce.clone(),
                    peer,
                    R,
                });
            }
        }

        self.slots = next;
        debug!(position = self.position, "nonces opened");
        Ok(())
    }

    /// Round 3: sign `message` in `slot`. The slot's nonce is consumed, so
    /// a slot never signs twice.
    #[allow(non_snake_case)]
    pub fn sign(
        &mut self,
        secret_key: &SecretKey,
        message: &[u8],
        slot: usize,
    ) -> Result<PartialSignature, SchnorrError> {
        self.check_slot(slot)?;
        if PublicKey::from_secret(secret_key) != self.multikey.key(self.position) {
            return Err(errors::from_musig(MuSigError::BadArguments));
        }

        let (signed, share) = match &self.slots[slot] {
            SlotState::Committed { nonce, peer, R } => {
                // kept un-challenged for checking the peer's share later
                let transcript = self.transcript(message, R);
                let c_i = self.multikey.challenge(self.position, &mut transcript.clone());
                let share = PartialSignature(nonce.r + c_i * secret_key.as_scalar());

                let signed = SlotState::Signed {
                    peer: *peer,
                    R: *R,
                    share,
                    transcript,
                };
                (signed, share)
            }
            other => {
                return Err(errors::from_musig(MuSigError::OutOfOrder {
                    slot,
                    expected: "committed",
                    actual: other.name(),
                }))
            }
        };

        self.slots[slot] = signed;
        Ok(share)
    }

    /// Check one signer's share for `slot` before combining, to attribute
    /// a failure to a party.
    pub fn verify_share(&self, share: PartialSignature, slot: usize) -> Result<(), SchnorrError> {
        self.check_slot(slot)?;
        match &self.slots[slot] {
            SlotState::Signed { peer, transcript, .. } => {
                peer.verify_share(share, &self.multikey, transcript)
            }
            other => Err(errors::from_musig(MuSigError::OutOfOrder {
                slot,
                expected: "signed",
                actual: other.name(),
            })),
        }
    }

    /// Sum the shares of `slot`, indexed by position, into a signature.
    pub fn combine(&self, shares: &[PartialSignature], slot: usize) -> Result<Signature, SchnorrError> {
        self.check_slot(slot)?;
        if shares.len() != SIGNERS {
            return Err(errors::from_musig(MuSigError::BadArguments));
        }

        match &self.slots[slot] {
            SlotState::Signed { R, share, .. } => {
                if shares[self.position] != *share {
                    return Err(errors::from_musig(MuSigError::BadArguments));
                }
                Ok(Signature {
                    R: R.compress(),
                    s: shares.iter().map(|s_i| s_i.0).sum(),
                })
            }
            other => Err(errors::from_musig(MuSigError::OutOfOrder {
                slot,
                expected: "signed",
                actual: other.name(),
            })),
        }
    }

    /// Check `signature` on `message` against the aggregated key.
    pub fn verify(&self, message: &[u8], signature: &Signature) -> bool {
        signature
            .verify(&mut self.context.bytes(message), &self.multikey.aggregated_key())
            .is_ok()
    }

    #[allow(non_snake_case)]
    fn transcript(&self, message: &[u8], R: &RistrettoPoint) -> Transcript {
        let mut transcript = self.context.bytes(message);
        self.multikey.commit(&mut transcript);
        transcript.commit_point(b"R", &R.compress());
        transcript
    }

    fn expect_all(&self, expected: &'static str, ok: impl Fn(&SlotState) -> bool) -> Result<(), SchnorrError> {
        match self.slots.iter().enumerate().find(|(_, s)| !ok(s)) {
            None => Ok(()),
            Some((slot, state)) => Err(errors::from_musig(MuSigError::OutOfOrder {
                slot,
                expected,
                actual: state.name(),
            })),
        }
    }

    fn check_shape(&self, signers: usize, mut lengths: impl Iterator<Item = usize>) -> Result<(), SchnorrError> {
        if signers != SIGNERS || !lengths.all(|len| len == self.slots.len()) {
            return Err(errors::from_musig(MuSigError::BadArguments));
        }
        Ok(())
    }

    fn check_slot(&self, slot: usize) -> Result<(), SchnorrError> {
        if slot >= self.slots.len() {
            return Err(errors::from_musig(MuSigError::SlotOutOfRange {
                slot,
                slots: self.slots.len(),
            }));
        }
        Ok(())
    }
}
