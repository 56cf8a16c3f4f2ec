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

//! The swap protocol run by each party.
//!
//! Messages flow strictly in this order:
//!
//! ```text
//! provider.prepare_swap  -> ProviderProposal
//! client.prepare_swap    -> ClientCommitment
//! provider.sign_swap     -> ProviderSignature
//! client.sign_swap       -> ClientSignature + Swap handle
//! client.deposit_funds
//! provider.check_swap    -> Swap handle
//! provider.deposit_funds
//! provider.finalize_swap
//! ```
//!
//! Every step either advances the party by exactly one state or fails
//! leaving it untouched.

use serde::{Deserialize, Serialize};

use crate::plan::{Payer, Slot};

mod client;
mod handle;
mod messages;
mod party;
mod provider;

pub use client::Client;
pub use handle::Swap;
pub use messages::{ClientCommitment, ClientSignature, ProviderProposal, ProviderSignature};
pub use party::{Identity, Party};
pub use provider::Provider;

#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SwapState {
    Empty,
    Prepared,
    Signed,
    Checked,
    Deposited,
    Finalized,
}

/// Which side of the swap a party is on.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    Provider,
    Client,
}

impl Role {
    /// Position of this role's key in the aggregated key.
    pub fn position(self) -> usize {
        match self {
            Role::Provider => 0,
            Role::Client => 1,
        }
    }

    pub fn payer(self) -> Payer {
        match self {
            Role::Provider => Payer::Provider,
            Role::Client => Payer::Client,
        }
    }

    /// The happy-path slot delivering to this role.
    pub fn delivery_slot(self) -> Slot {
        match self {
            Role::Provider => Slot::ProviderReceives,
            Role::Client => Slot::ClientReceives,
        }
    }

    /// State a party of this role must be in to deposit. The client pays
    /// in right after signing; the provider only after checking the
    /// client's shares and deposit.
    pub fn deposit_after(self) -> SwapState {
        match self {
            Role::Provider => SwapState::Checked,
            Role::Client => SwapState::Signed,
        }
    }
}
