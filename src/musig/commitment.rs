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

//! Commitments used in the first two rounds of musig, and the partial
//! signatures of the third.

use crate::errors::SchnorrError;
use crate::tools::TranscriptProtocol;
use curve25519_dalek::ristretto::{CompressedRistretto, RistrettoPoint};
use curve25519_dalek::scalar::Scalar;
use merlin::Transcript;
use subtle::{Choice, ConstantTimeEq};

/// Round 1 message: a hash binding the signer to a nonce it has not revealed.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct NoncePrecommitment(pub(crate) [u8; 32]);

/// Round 2 message: the revealed nonce point `R_i`.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct NonceCommitment(pub(crate) RistrettoPoint);

/// Round 3 message: a signer's share `s_i = r_i + c·a_i·x_i`.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct PartialSignature(pub(crate) Scalar);

impl NoncePrecommitment {
    const DESCRIPTION: &'static str = "A MuSig nonce precommitment as 32 bytes.";

    pub fn to_bytes(&self) -> [u8; 32] {
        self.0
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self, SchnorrError> {
        if bytes.len() != 32 {
            return Err(SchnorrError::SerError);
        }
        let mut bits = [0u8; 32];
        bits.copy_from_slice(bytes);
        Ok(NoncePrecommitment(bits))
    }
}

impl ConstantTimeEq for NoncePrecommitment {
    fn ct_eq(&self, other: &Self) -> Choice {
        self.0.ct_eq(&other.0)
    }
}

impl NonceCommitment {
    const DESCRIPTION: &'static str = "A MuSig nonce commitment as a 32 byte Ristretto point.";

    pub(crate) fn new(commitment: RistrettoPoint) -> Self {
        NonceCommitment(commitment)
    }

    /// H(R_i), what round 1 publishes in place of the nonce.
    pub fn precommit(&self) -> NoncePrecommitment {
        let mut h = Transcript::new(b"Musig.nonce-precommit");
        h.commit_point(b"R", &self.0.compress());
        let mut precommitment = [0u8; 32];
        h.challenge_bytes(b"precommitment", &mut precommitment);
        NoncePrecommitment(precommitment)
    }

    pub fn compress(&self) -> CompressedRistretto {
        self.0.compress()
    }

    pub(crate) fn sum(commitments: &[Self]) -> RistrettoPoint {
        commitments.iter().map(|r_i| r_i.0).sum()
    }

    pub fn to_bytes(&self) -> [u8; 32] {
        self.0.compress().to_bytes()
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self, SchnorrError> {
        if bytes.len() != 32 {
            return Err(SchnorrError::SerError);
        }
        let mut bits = [0u8; 32];
        bits.copy_from_slice(bytes);
        CompressedRistretto(bits)
            .decompress()
            .map(NonceCommitment)
            .ok_or(SchnorrError::PointDecompressionError)
    }
}

impl PartialSignature {
    const DESCRIPTION: &'static str = "A MuSig partial signature as a 32 byte scalar.";

    pub fn to_bytes(&self) -> [u8; 32] {
        self.0.to_bytes()
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self, SchnorrError> {
        if bytes.len() != 32 {
            return Err(SchnorrError::SerError);
        }
        let mut bits = [0u8; 32];
        bits.copy_from_slice(bytes);
        let share: Option<Scalar> = Scalar::from_canonical_bytes(bits).into();
        share.map(PartialSignature).ok_or(SchnorrError::ScalarFormatError)
    }
}

serde_boilerplate!(NoncePrecommitment);
serde_boilerplate!(NonceCommitment);
serde_boilerplate!(PartialSignature);

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn precommitment_binds_the_nonce() {
        let a = NonceCommitment::new(RistrettoPoint::mul_base(&Scalar::from(7u64)));
        let b = NonceCommitment::new(RistrettoPoint::mul_base(&Scalar::from(8u64)));

        assert_eq!(a.precommit(), a.precommit());
        assert_ne!(a.precommit(), b.precommit());
    }

    #[test]
    fn wire_encodings_round_trip() {
        let r = NonceCommitment::new(RistrettoPoint::mul_base(&Scalar::from(11u64)));
        let share = PartialSignature(Scalar::from(12u64));

        assert_eq!(NonceCommitment::from_bytes(&r.to_bytes()), Ok(r));
        assert_eq!(PartialSignature::from_bytes(&share.to_bytes()), Ok(share));
        assert_eq!(
            NoncePrecommitment::from_bytes(&r.precommit().to_bytes()),
            Ok(r.precommit())
        );
        assert_eq!(PartialSignature::from_bytes(&[0u8; 31]), Err(SchnorrError::SerError));
    }
}
