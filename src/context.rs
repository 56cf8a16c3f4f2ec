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

//! MuSig Process Context

use crate::PublicKey;
use curve25519_dalek::scalar::Scalar;
use merlin::Transcript;

/// The context for signing, holding the keys whose owners sign together.
pub trait MuSigContext {
    /// Takes a mutable transcript, and commits the internal context to the transcript.
    fn commit(&self, transcript: &mut Transcript);

    /// Takes an index of a public key and mutable transcript,
    /// and returns the suitable challenge for that public key.
    fn challenge(&self, index: usize, transcript: &mut Transcript) -> Scalar;

    /// Returns the pubkey for the index i
    fn key(&self, index: usize) -> PublicKey;
}
