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

//! MuSig Key

use crate::{
    errors::{self, MuSigError},
    signature::SCHNORR_DOMAIN,
    tools::TranscriptProtocol,
    MuSigContext, PublicKey, SchnorrError,
};
use curve25519_dalek::{ristretto::RistrettoPoint, scalar::Scalar};
use merlin::Transcript;

/// MuSig aggregated key context
#[derive(Clone)]
pub struct MultiKey {
    prf: Transcript,
    aggregated_key: PublicKey,
    public_keys: Vec<PublicKey>,
}

impl MultiKey {
    /// Constructs a new MuSig multikey aggregating the pubkeys.
    ///
    /// The order of `pubkeys` is part of the aggregation: signers must agree
    /// on it, and a signer's index is its position in this list.
    #[allow(non_snake_case)]
    pub fn new(pubkeys: Vec<PublicKey>) -> Result<Self, SchnorrError> {
        if pubkeys.len() < 2 {
            return Err(errors::from_musig(MuSigError::BadArguments));
        }

        // Create transcript for Multikey
        let mut prf = Transcript::new(b"Musig.aggregated-key");
        prf.commit_u64(b"n", pubkeys.len() as u64);

        // Commit pubkeys into the transcript
        // <L> = H(X_1 || X_2 || ... || X_n)
        for X in &pubkeys {
            prf.commit_point(b"X", X.as_compressed());
        }

        // aggregated_key = sum_i ( a_i * X_i )
        let aggregated_key: RistrettoPoint = pubkeys
            .iter()
            .enumerate()
            .map(|(i, X)| MultiKey::compute_factor(&prf, i) * X.as_point())
            .sum();

        Ok(MultiKey {
            prf,
            aggregated_key: PublicKey::from_point(aggregated_key),
            public_keys: pubkeys,
        })
    }

    /// Returns `a_i` factor for component key in aggregated key.
    /// a_i = H(<L>, X_i). The list of pubkeys, <L>, has already been committed to the transcript.
    fn compute_factor(prf: &Transcript, i: usize) -> Scalar {
        let mut a_i_prf = prf.clone();
        a_i_prf.commit_u64(b"i", i as u64);
        a_i_prf.challenge_scalar(b"a_i")
    }

    /// Returns VerificationKey representation of aggregated key.
    pub fn aggregated_key(&self) -> PublicKey {
        self.aggregated_key
    }
}

impl MuSigContext for MultiKey {
    fn commit(&self, transcript: &mut Transcript) {
        //domain seperration
        transcript.proto_name(SCHNORR_DOMAIN);
        //commit corresponding public key
        transcript.commit_point(b"public_key", self.aggregated_key.as_compressed());
    }

    fn challenge(&self, i: usize, transcript: &mut Transcript) -> Scalar {
        // Make c = H(X, R, m)
        // The message `m`, nonce commitment `R`, and aggregated key `X`
        // have already been fed into the transcript.
        let c = transcript.challenge_scalar(b"c");

        // Make a_i, the per-party factor. a_i = H(<L>, X_i).
        // The list of pubkeys, <L>, has already been committed to self.transcript.
        let a_i = MultiKey::compute_factor(&self.prf, i);

        c * a_i
    }

    fn key(&self, index: usize) -> PublicKey {
        self.public_keys[index]
    }
}
