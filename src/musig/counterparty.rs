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

//! Other signers in the MuSig Protocol

use crate::{
    errors::{self, MuSigError},
    musig::{NonceCommitment, NoncePrecommitment, PartialSignature},
    MuSigContext, PublicKey, SchnorrError,
};
use curve25519_dalek::ristretto::RistrettoPoint;
use merlin::Transcript;
use subtle::ConstantTimeEq;

#[derive(Copy, Clone)]
pub(crate) struct Counterparty {
    position: usize,
    pubkey: PublicKey,
}

#[derive(Copy, Clone)]
pub(crate) struct CounterpartyPrecommitted {
    precommitment: NoncePrecommitment,
    position: usize,
    pubkey: PublicKey,
}

#[derive(Copy, Clone)]
pub(crate) struct CounterpartyCommitted {
    commitment: NonceCommitment,
    position: usize,
    pubkey: PublicKey,
}

impl Counterparty {
    pub(crate) fn new(position: usize, pubkey: PublicKey) -> Self {
        Counterparty { position, pubkey }
    }

    pub(crate) fn position(&self) -> usize {
        self.position
    }

    pub(crate) fn precommit_nonce(&self, precommitment: NoncePrecommitment) -> CounterpartyPrecommitted {
        CounterpartyPrecommitted {
            precommitment,
            position: self.position,
            pubkey: self.pubkey,
        }
    }
}

impl CounterpartyPrecommitted {
    pub(crate) fn verify_nonce(
        &self,
        commitment: NonceCommitment,
        slot: usize,
    ) -> Result<CounterpartyCommitted, SchnorrError> {
        // Check H(commitment) =? precommitment
        let received_precommitment = commitment.precommit();
        let equal = self.precommitment.ct_eq(&received_precommitment);

        if equal.unwrap_u8() == 0 {
            return Err(errors::from_musig(MuSigError::MismatchedNonce {
                position: self.position,
                slot,
            }));
        }

        Ok(CounterpartyCommitted {
            commitment,
            position: self.position,
            pubkey: self.pubkey,
        })
    }
}

impl CounterpartyCommitted {
    pub(crate) fn commitment(&self) -> NonceCommitment {
        self.commitment
    }

    /// Check the partial Schnorr signature: s_i * G == R_i + c_i * X_i.
    ///
    /// The message, aggregated nonce and aggregated key have already been
    /// fed into `transcript`.
    #[allow(non_snake_case)]
    pub(crate) fn verify_share<C: MuSigContext>(
        &self,
        share: PartialSignature,
        context: &C,
        transcript: &Transcript,
    ) -> Result<(), SchnorrError> {
        let S_i = RistrettoPoint::mul_base(&share.0);
        let c_i = context.challenge(self.position, &mut transcript.clone());
        let X_i = self.pubkey.into_point();

        if S_i != self.commitment.0 + c_i * X_i {
            return Err(errors::from_musig(MuSigError::ShareError {
                pubkey: X_i.compress().to_bytes(),
            }));
        }

        Ok(())
    }
}
