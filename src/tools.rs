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

//! The Extra Sauce
//! Defines a `TranscriptProtocol` trait for using a Merlin transcript,
//! and the `SigningContext` every transaction message is hashed under.

use curve25519_dalek::ristretto::CompressedRistretto;
use curve25519_dalek::scalar::Scalar;
use merlin::Transcript;

/// Label every swap transaction is signed under. Both parties and the
/// ledger must agree on it byte for byte.
pub const TX_SIGNING_CONTEXT: &[u8] = b"musig-swap transaction v1";

/// Extension trait to the Merlin transcript API that allows committing
/// points and sampling scalars.
pub trait TranscriptProtocol {
    /// Appends a domain separator for the protocol.
    fn proto_name(&mut self, label: &'static [u8]);
    /// Commit a `point` with the given `label`.
    fn commit_point(&mut self, label: &'static [u8], point: &CompressedRistretto);
    /// Commit a `u64` with the given `label`.
    fn commit_u64(&mut self, label: &'static [u8], n: u64);
    /// Compute a `label`ed challenge variable.
    fn challenge_scalar(&mut self, label: &'static [u8]) -> Scalar;
}

impl TranscriptProtocol for Transcript {
    fn proto_name(&mut self, label: &'static [u8]) {
        self.append_message(b"dom-sep", label);
    }

    fn commit_point(&mut self, label: &'static [u8], point: &CompressedRistretto) {
        self.append_message(label, point.as_bytes());
    }

    fn commit_u64(&mut self, label: &'static [u8], n: u64) {
        self.append_u64(label, n);
    }

    fn challenge_scalar(&mut self, label: &'static [u8]) -> Scalar {
        let mut buf = [0u8; 64];
        self.challenge_bytes(label, &mut buf);
        Scalar::from_bytes_mod_order_wide(&buf)
    }
}

/// A Signing Context Provides an abstraction for signature protocol Merlin Transcript
#[derive(Clone)]
pub struct SigningContext(Transcript);

impl SigningContext {
    /// Initialize a signing context from a static byte string that
    /// identifies the signature's role in the larger protocol.
    pub fn new(context: &'static [u8]) -> SigningContext {
        SigningContext(Transcript::new(context))
    }

    /// The context swap transactions are signed and verified under.
    pub fn transactions() -> SigningContext {
        SigningContext::new(TX_SIGNING_CONTEXT)
    }

    /// Initalize an owned signing transcript on a message provided as a byte array
    pub fn bytes(&self, bytes: &[u8]) -> Transcript {
        let mut t = self.0.clone();
        t.append_message(b"sign-bytes", bytes);
        t
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn challenges_depend_on_message() {
        let ctx = SigningContext::transactions();
        let a = ctx.bytes(b"transfer 1").challenge_scalar(b"c");
        let b = ctx.bytes(b"transfer 2").challenge_scalar(b"c");
        let a_again = ctx.bytes(b"transfer 1").challenge_scalar(b"c");

        assert_ne!(a, b);
        assert_eq!(a, a_again);
    }

    #[test]
    fn contexts_are_domain_separated() {
        let a = SigningContext::new(b"one").bytes(b"m").challenge_scalar(b"c");
        let b = SigningContext::new(b"two").bytes(b"m").challenge_scalar(b"c");

        assert_ne!(a, b);
    }
}
