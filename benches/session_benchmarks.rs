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

#[macro_use]
extern crate criterion;

mod session_benches {
    use criterion::Criterion;
    use musig_swap::musig::{PartialSignature, SignerSession};
    use musig_swap::plan::SLOTS;
    use musig_swap::*;

    fn messages() -> Vec<Vec<u8>> {
        (0..SLOTS).map(|slot| vec![slot as u8; 102]).collect()
    }

    /// Both signers through the three rounds, for every slot.
    fn run_session(keys: &[Keypair; 2], messages: &[Vec<u8>]) -> Vec<Signature> {
        let pubkeys: Vec<PublicKey> = keys.iter().map(|k| k.public).collect();
        let mut sessions: Vec<SignerSession> = (0..2)
            .map(|position| SignerSession::new(pubkeys.clone(), position, SLOTS).unwrap())
            .collect();

        let precommitments: Vec<_> = sessions
            .iter_mut()
            .map(|s| s.compute_precommitments().unwrap())
            .collect();
        let commitments: Vec<_> = sessions
            .iter_mut()
            .map(|s| s.receive_precommitments(&precommitments).unwrap())
            .collect();
        for session in sessions.iter_mut() {
            session.receive_commitments(&commitments).unwrap();
        }

        let shares: Vec<Vec<PartialSignature>> = sessions
            .iter_mut()
            .zip(keys.iter())
            .map(|(session, key)| {
                messages
                    .iter()
                    .enumerate()
                    .map(|(slot, msg)| session.sign(&key.secret, msg, slot).unwrap())
                    .collect()
            })
            .collect();

        (0..SLOTS)
            .map(|slot| sessions[0].combine(&[shares[0][slot], shares[1][slot]], slot).unwrap())
            .collect()
    }

    fn full_session(c: &mut Criterion) {
        let mut csprng = rand::thread_rng();
        let keys = [Keypair::generate(&mut csprng), Keypair::generate(&mut csprng)];
        let messages = messages();

        c.bench_function("MuSig session over all swap slots", move |b| {
            b.iter(|| run_session(&keys, &messages))
        });
    }

    fn verify_batch(c: &mut Criterion) {
        let mut csprng = rand::thread_rng();
        let keys = [Keypair::generate(&mut csprng), Keypair::generate(&mut csprng)];
        let messages = messages();
        let signatures = run_session(&keys, &messages);
        let session = SignerSession::new(vec![keys[0].public, keys[1].public], 0, SLOTS).unwrap();

        c.bench_function("Swap batch signature verification", move |b| {
            b.iter(|| {
                messages
                    .iter()
                    .zip(signatures.iter())
                    .all(|(msg, sig)| session.verify(msg, sig))
            })
        });
    }

    criterion_group! {
        name = session_benches;
        config = Criterion::default();
        targets =
            full_session,
            verify_batch,
    }
}

criterion_main!(session_benches::session_benches);
