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

//! A Rust implementation of Schnorr signing

use curve25519_dalek::{
    ristretto::{CompressedRistretto, RistrettoPoint},
    scalar::Scalar,
};
use merlin::Transcript;
use std::fmt::Debug;
use zeroize::Zeroize;

use crate::errors::SchnorrError;
use crate::keys::{PublicKey, SecretKey};
use crate::tools::TranscriptProtocol;

/// The length of a curve25519 Schnorr `Signature`, in bytes.
pub const SIGNATURE_LENGTH: usize = 64;

/// Domain separator shared by single-key signing, MuSig sessions and
/// verification. An aggregated signature is an ordinary signature under
/// the aggregated key only because all three commit the same label.
pub(crate) const SCHNORR_DOMAIN: &[u8] = b"organism_schnorr";

/// An Schnorr signature.
///
/// # Note
///
/// These signatures are "detached", that is, they do **not** include a copy
/// of the message which has been signed.
#[allow(non_snake_case)]
#[derive(Copy, Clone, Eq, PartialEq)]
pub struct Signature {
    /// `R` is an `RistrettoPoint`, formed by taking the sampled
    /// random integer `r` in ℤp for each message to be signed.
    ///
    /// For a MuSig signature `R` is the sum of every signer's nonce point.
    pub(crate) R: CompressedRistretto,

    /// `s` is a `Scalar`, formed by s = r + cx
    /// c = HASH(PublicKey, R, message)
    ///
    /// For a MuSig signature `s` is the sum of the partial signatures.
    pub(crate) s: Scalar,
}

impl Debug for Signature {
    fn fmt(&self, f: &mut ::core::fmt::Formatter) -> ::core::fmt::Result {
        write!(f, "Signature( {} )", hex::encode(self.to_bytes()))
    }
}

impl Signature {
    const DESCRIPTION: &'static str = "A Schnorr signature as 64 bytes.";

    /// Convert this `Signature` to a byte array.
    #[inline]
    pub fn to_bytes(&self) -> [u8; SIGNATURE_LENGTH] {
        let mut signature_bytes: [u8; SIGNATURE_LENGTH] = [0u8; SIGNATURE_LENGTH];

        signature_bytes[..32].copy_from_slice(&self.R.as_bytes()[..]);
        signature_bytes[32..].copy_from_slice(&self.s.as_bytes()[..]);
        signature_bytes
    }

    /// Construct a `Signature` from a slice of bytes.
    #[inline]
    pub fn from_bytes(bytes: &[u8]) -> Result<Signature, SchnorrError> {
        if bytes.len() != SIGNATURE_LENGTH {
            return Err(SchnorrError::SerError);
        }
        let mut lower: [u8; 32] = [0u8; 32];
        let mut upper: [u8; 32] = [0u8; 32];

        lower.copy_from_slice(&bytes[..32]);
        upper.copy_from_slice(&bytes[32..]);

        let s: Option<Scalar> = Scalar::from_canonical_bytes(upper).into();

        Ok(Signature {
            R: CompressedRistretto(lower),
            s: s.ok_or(SchnorrError::ScalarFormatError)?,
        })
    }

    /// Sign a transcript with this `SecretKey`.
    ///
    /// Requires a transcript, normally created from a `SigningContext` and
    /// a message. We employ a randomized nonce here, but also incorporate
    /// the transcript like in a derandomized scheme, so there should be no
    /// attacks even if the random number generator fails.
    pub fn sign(transcript: &mut Transcript, secret_key: &SecretKey) -> Signature {
        // The message `m` has already been fed into the transcript
        let public_key = PublicKey::from_secret(secret_key);

        //randomize transcript and commit private key
        let mut rng = transcript
            .build_rng()
            .rekey_with_witness_bytes(b"secret_key", secret_key.as_bytes())
            .finalize(&mut rand::thread_rng());

        // Generate ephemeral keypair (r, R). r is a random nonce.
        let mut r: Scalar = Scalar::random(&mut rng);

        // R = generator * r, commiment to nonce
        let _r: CompressedRistretto = RistrettoPoint::mul_base(&r).compress();

        //Acts as the hash commitment for message, nonce commitment & pubkey
        let c = {
            // Domain seperation
            transcript.proto_name(SCHNORR_DOMAIN);
            //commit corresponding public key
            transcript.commit_point(b"public_key", public_key.as_compressed());
            //commit to our nonce
            transcript.commit_point(b"R", &_r);
            //sample challenge
            transcript.challenge_scalar(b"c")
        };

        //compute the signature, s = r + cx
        let s = r + c * secret_key.as_scalar();

        //zero out secret r
        r.zeroize();

        Signature { R: _r, s }
    }

    /// Verify a signature on a transcript with a public key.
    ///
    /// # Return
    ///
    /// Returns `Ok(())` if the signature is valid, and `Err` otherwise.
    #[allow(non_snake_case)]
    pub fn verify(
        &self,
        transcript: &mut Transcript,
        public_key: &PublicKey,
    ) -> Result<(), SchnorrError> {
        // Derive challenge scalar, c = H(X, R, m)
        // The message has already been fed into the transcript
        let c = {
            transcript.proto_name(SCHNORR_DOMAIN);
            transcript.commit_point(b"public_key", public_key.as_compressed());
            transcript.commit_point(b"R", &self.R);
            transcript.challenge_scalar(b"c")
        };

        let R = self.R.decompress().ok_or(SchnorrError::PointDecompressionError)?;

        // s * G == R + c * X
        if RistrettoPoint::mul_base(&self.s) == R + c * public_key.as_point() {
            Ok(())
        } else {
            Err(SchnorrError::VerifyError)
        }
    }
}

serde_boilerplate!(Signature);
