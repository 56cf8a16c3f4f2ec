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

//! Errors which may occur while running a signing session, parsing wire
//! values, or driving a swap attempt.

use thiserror::Error;

use crate::address::Address;
use crate::ledger::LedgerError;
use crate::plan::Slot;
use crate::swap::SwapState;
use crate::tx::{Amount, TokenId};

/// Represents an error in key aggregation, signing, or verification.
#[derive(Error, Clone, Debug, Eq, PartialEq)]
pub enum MuSigError {
    /// This error occurs when a point is not a valid compressed Ristretto point
    #[error("Point decoding failed")]
    InvalidPoint,

    /// This error occurs when a signature share fails to verify
    #[error("Share {pubkey:?} failed to verify correctly")]
    ShareError {
        /// The pubkey corresponding to the share that failed fo verify correctly
        pubkey: [u8; 32],
    },

    /// A revealed nonce does not open the precommitment received earlier
    #[error("Nonce of signer {position} in slot {slot} does not match its precommitment")]
    MismatchedNonce { position: usize, slot: usize },

    /// A round of the protocol was invoked before its predecessor completed
    #[error("Slot {slot} is {actual}, expected {expected}")]
    OutOfOrder {
        slot: usize,
        expected: &'static str,
        actual: &'static str,
    },

    /// The slot index is not part of this session
    #[error("Slot {slot} out of range for a session of {slots} slots")]
    SlotOutOfRange { slot: usize, slots: usize },

    /// This error occurs when a function is called with bad arguments.
    #[error("Bad arguments")]
    BadArguments,

    /// There are too many parties in the MuSig signature
    #[error("There are too many parties in the MuSig signature")]
    TooManyParticipants,
}

/// Internal errors.  Most application-level developers will likely not
/// need to pay any attention to these.
#[derive(Eq, PartialEq, Debug, Error, Clone)]
pub enum SchnorrError {
    /// Invalid point provided.
    #[error("Cannot decompress Ristretto point")]
    PointDecompressionError,

    /// Invalid scalar provided.
    #[error("Cannot use non-canonical scalar")]
    ScalarFormatError,

    /// Invalid ser provided.
    #[error("Issue When Serilizing Data")]
    SerError,

    /// The verification equation wasn't satisfied
    #[error("Verification equation was not satisfied")]
    VerifyError,

    /// This error occurs when a function is called with bad arguments.
    #[error("Function is called with bad arguments")]
    BadArguments,

    /// Musig
    #[error("Absent {kind:?} violated multi-signature protocol")]
    MuSig { kind: MuSigError },
}

/// Helper function to convert a musig error into schnorr error
pub fn from_musig(err: MuSigError) -> SchnorrError {
    SchnorrError::MuSig { kind: err }
}

/// Convert `SchnorrError` into `::serde::de::Error` aka `SerdeError`
///
/// We should do this with `From` but right now the orphan rules prohibit
/// `impl From<SchnorrError> for E where E: ::serde::de::Error`.
pub(crate) fn serde_error_from_signature_error<E>(err: SchnorrError) -> E
where
    E: ::serde::de::Error,
{
    match err {
        SchnorrError::PointDecompressionError => E::custom("Ristretto point decompression failed"),
        SchnorrError::ScalarFormatError => E::custom("improper scalar is not canonical"),
        SchnorrError::SerError => E::custom("improper serde usage"),
        other => E::custom(other),
    }
}

/// Failures of a swap attempt.
///
/// Variants fall in four families: protocol sequencing (a caller bug),
/// verification failures (a possibly adversarial peer, abort and `reset`),
/// missing deposits (wait and check again) and ledger I/O.
#[derive(Debug, Error)]
pub enum SwapError {
    #[error("`{operation}` requires state {expected:?}, party is {actual:?}")]
    InvalidState {
        operation: &'static str,
        expected: SwapState,
        actual: SwapState,
    },

    #[error("invalid swap terms: {0}")]
    InvalidTerms(&'static str),

    #[error("escrow address mismatch: computed {computed}, counterparty declared {declared}")]
    EscrowMismatch { computed: Address, declared: Address },

    #[error("counterparty batch diverges from local batch: {field} differs")]
    BatchMismatch { field: &'static str },

    #[error("invalid signature shares")]
    InvalidShares { slot: usize },

    #[error("counterparty has not deposited: token {token} requires {required}, escrow holds {available}")]
    InsufficientDeposit {
        token: TokenId,
        required: Amount,
        available: Amount,
    },

    #[error("escrow account {0} is not open on the ledger")]
    EscrowNotOpened(Address),

    #[error("the refund path already executed on the escrow; {slot:?} can no longer run")]
    RefundExecuted { slot: Slot },

    #[error("timed out waiting for confirmation")]
    WaitTimeout,

    #[error(transparent)]
    Ledger(#[from] LedgerError),

    #[error(transparent)]
    Schnorr(#[from] SchnorrError),
}

impl SwapError {
    /// Signals a malicious peer or diverging batches; the attempt must be
    /// dropped and retried with a fresh salt.
    pub fn is_verification_failure(&self) -> bool {
        matches!(
            self,
            SwapError::EscrowMismatch { .. }
                | SwapError::BatchMismatch { .. }
                | SwapError::InvalidShares { .. }
                | SwapError::Schnorr(SchnorrError::MuSig {
                    kind: MuSigError::MismatchedNonce { .. }
                })
        )
    }

    /// The same call may succeed later without resetting the attempt.
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            SwapError::InsufficientDeposit { .. }
                | SwapError::EscrowNotOpened(_)
                | SwapError::WaitTimeout
                | SwapError::Ledger(_)
        )
    }
}

impl From<MuSigError> for SwapError {
    fn from(err: MuSigError) -> Self {
        SwapError::Schnorr(from_musig(err))
    }
}
