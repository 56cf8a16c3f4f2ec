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

//! Two-party atomic swaps over a jointly controlled escrow account.
//!
//! A provider and a client aggregate their Schnorr keys (MuSig over
//! ristretto) into a key that controls a CREATE2-style escrow address.
//! Before either side deposits, both co-sign a batch of five transactions:
//! one that sets the escrow's signing key, the two deliveries of the
//! happy path and the two refunds that become valid after the timeout.
//! Once every signature verifies, depositing is safe: whatever the peer
//! does, each party can either complete the exchange or take its funds
//! back.
//!
//! ```text
//! Provider                               Client
//!  prepare_swap ── ProviderProposal ──▶   prepare_swap
//!  sign_swap    ◀─ ClientCommitment ───
//!               ── ProviderSignature ─▶   sign_swap
//!  check_swap   ◀─ ClientSignature ────   deposit_funds
//!  deposit_funds
//!  finalize_swap                          Swap::wait
//! ```

// Modified From the hard work off:
// Authors:
// - Isis Agora Lovecruft <isis@patternsinthevoid.net>
// - Jeff Burdges <jeff@web3.foundation>
// - The Tari Project Authors
// - Cathie Yun <cathieyun@gmail.com>
// - Tess Rinearson <tess.rinearson@gmail.com>
// - Oleg Andreev <oleganza@gmail.com>

//Useful links:
//https://blockstream.com/2018/01/23/musig-key-aggregation-schnorr-signatures/
//https://eips.ethereum.org/EIPS/eip-1014

#[macro_use]
mod ser;

mod errors;
pub use errors::{MuSigError, SchnorrError, SwapError};

pub mod tools;
pub use crate::tools::SigningContext;

mod context;
pub use crate::context::MuSigContext;

pub mod keys;
pub use crate::keys::*;

pub mod signature;
pub use crate::signature::{Signature, SIGNATURE_LENGTH};

pub mod musig;

pub mod address;
pub mod tx;
pub mod ledger;
pub mod plan;
pub mod config;
pub mod recovery;
pub mod swap;

pub use crate::address::{Address, Create2Data, EscrowDescriptor, PubKeyHash};
pub use crate::config::SwapConfig;
pub use crate::ledger::memory::MemoryLedger;
pub use crate::plan::{FeePolicy, Slot, SwapPlan, SwapTerms};
pub use crate::swap::{Client, Identity, Provider, Swap, SwapState};
