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

//! Inputs for the escrow recovery contracts.
//!
//! If the ledger stops processing transactions, the deploy-by-salt factory
//! can place the sweeping contract at the escrow address on the base
//! chain. It only lands there when given exactly the values the escrow
//! address was derived from.

use serde::{Deserialize, Serialize};

use crate::address::{hex_bytes32, Address, Create2Data, EscrowDescriptor, PubKeyHash};

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecoveryInputs {
    pub creator_address: Address,
    /// The CREATE2 salt argument, already bound to `pubkey_hash`.
    #[serde(with = "hex_bytes32")]
    pub salt_arg: [u8; 32],
    #[serde(with = "hex_bytes32")]
    pub code_hash: [u8; 32],
    pub pubkey_hash: PubKeyHash,
    pub escrow_address: Address,
}

impl RecoveryInputs {
    pub fn new(create2: &Create2Data, escrow: &EscrowDescriptor) -> Self {
        RecoveryInputs {
            creator_address: create2.creator_address,
            salt_arg: create2.salt_arg(&escrow.pubkey_hash),
            code_hash: create2.code_hash,
            pubkey_hash: escrow.pubkey_hash,
            escrow_address: escrow.address,
        }
    }

    /// True when deploying with these inputs lands on `escrow_address`.
    pub fn verify(&self) -> bool {
        crate::address::create2_address(&self.creator_address, &self.salt_arg, &self.code_hash) == self.escrow_address
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::Keypair;
    use rand::SeedableRng;
    use rand_chacha::ChaChaRng;

    fn inputs() -> RecoveryInputs {
        let key = Keypair::generate(&mut ChaChaRng::from_seed([6u8; 32])).public;
        let create2 = Create2Data {
            creator_address: Address::repeat_byte(0x5e),
            salt: [3u8; 32],
            code_hash: [4u8; 32],
        };
        RecoveryInputs::new(&create2, &EscrowDescriptor::derive(&key, &create2))
    }

    #[test]
    fn inputs_land_on_the_escrow_address() {
        assert!(inputs().verify());
    }

    #[test]
    fn altered_inputs_land_elsewhere() {
        let mut tampered = inputs();
        tampered.code_hash[0] ^= 1;
        assert!(!tampered.verify());

        let mut tampered = inputs();
        tampered.creator_address = Address::repeat_byte(0x5f);
        assert!(!tampered.verify());
    }
}
