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

//! Protocol messages exchanged between provider and client.

use serde::{Deserialize, Serialize};

use crate::address::Address;
use crate::musig::{NonceCommitment, NoncePrecommitment, PartialSignature};
use crate::plan::{LedgerSnapshot, SwapTerms};
use crate::PublicKey;

/// Provider to client: the terms and the provider's nonce precommitments.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProviderProposal {
    pub terms: SwapTerms,
    pub pubkey: PublicKey,
    pub address: Address,
    pub precommitments: Vec<NoncePrecommitment>,
    /// The escrow address the provider derived, checked by the client.
    pub escrow: Address,
}

/// Client to provider: the client's precommitments and revealed nonces.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClientCommitment {
    pub pubkey: PublicKey,
    pub address: Address,
    pub precommitments: Vec<NoncePrecommitment>,
    pub commitments: Vec<NonceCommitment>,
}

/// Provider to client: revealed nonces, the ledger state the batch was
/// built from, and the provider's share for every slot.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProviderSignature {
    pub commitments: Vec<NonceCommitment>,
    pub snapshot: LedgerSnapshot,
    pub shares: Vec<PartialSignature>,
}

/// Client to provider: the client's share for every slot.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClientSignature {
    pub shares: Vec<PartialSignature>,
}
