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

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use musig_swap::ledger::memory::MemoryWallet;
use musig_swap::ledger::{AccountState, Confirmation, Layer, Ledger, LedgerError, Receipt};
use musig_swap::musig::PartialSignature;
use musig_swap::plan::Deal;
use musig_swap::swap::{ClientSignature, ProviderProposal};
use musig_swap::tx::{Amount, OpType, SignedTransaction, TokenId, TxHash};
use musig_swap::{
    Address, Client, Create2Data, Identity, Keypair, MemoryLedger, Provider, Slot, SwapConfig, SwapError, SwapState,
    SwapTerms,
};
use rand::SeedableRng;
use rand_chacha::ChaChaRng;

const ETH: TokenId = TokenId(0);
const DAI: TokenId = TokenId(1);

const SELL: u128 = 1_000_000;
const BUY: u128 = 1_000_000_000;
const CLIENT_ETH: u128 = 2_000_000;
const PROVIDER_DAI: u128 = 5_000_000_000;

const CPK_FEE: u128 = 10;
const ETH_TRANSFER_FEE: u128 = 20;
const DAI_TRANSFER_FEE: u128 = 30;
const ETH_WITHDRAW_FEE: u128 = 40;

const START: u64 = 1_600_000_000;

struct Market {
    ledger: MemoryLedger,
    provider: Provider<MemoryWallet>,
    client: Client<MemoryWallet>,
}

fn provider_address() -> Address {
    Address::repeat_byte(0xa1)
}

fn client_address() -> Address {
    Address::repeat_byte(0xb2)
}

fn open_ledger() -> MemoryLedger {
    let ledger = MemoryLedger::at_time(START).with_poll_interval(Duration::from_millis(1));
    ledger.set_fee(OpType::ChangePubKey, ETH, CPK_FEE);
    ledger.set_fee(OpType::Transfer, ETH, ETH_TRANSFER_FEE);
    ledger.set_fee(OpType::Transfer, DAI, DAI_TRANSFER_FEE);
    ledger.set_fee(OpType::Withdraw, ETH, ETH_WITHDRAW_FEE);
    ledger.fund(provider_address(), DAI, PROVIDER_DAI);
    ledger.fund(client_address(), ETH, CLIENT_ETH);
    ledger
}

async fn identity<L: Ledger>(seed: u8, address: Address, wallet: L) -> Identity<L> {
    let keys = Keypair::generate(&mut ChaChaRng::from_seed([seed; 32]));
    Identity::connect(keys, address, Arc::new(wallet)).await.unwrap()
}

async fn market(config: SwapConfig) -> Market {
    let ledger = open_ledger();
    let provider = identity(1, provider_address(), ledger.wallet(provider_address())).await;
    let client = identity(2, client_address(), ledger.wallet(client_address())).await;

    Market {
        provider: Provider::new(provider, config.clone()),
        client: Client::new(client, config),
        ledger,
    }
}

/// Wallet whose receipt lookups time out a set number of times.
struct FlakyReceipts {
    inner: MemoryWallet,
    failures: AtomicUsize,
}

#[async_trait]
impl Ledger for FlakyReceipts {
    async fn block_time(&self) -> Result<u64, LedgerError> {
        self.inner.block_time().await
    }

    async fn account_state(&self, address: &Address) -> Result<AccountState, LedgerError> {
        self.inner.account_state(address).await
    }

    async fn transaction_fee(&self, op: OpType, payer: &Address, token: TokenId) -> Result<Amount, LedgerError> {
        self.inner.transaction_fee(op, payer, token).await
    }

    async fn submit(&self, tx: SignedTransaction) -> Result<TxHash, LedgerError> {
        self.inner.submit(tx).await
    }

    async fn submit_batch(&self, txs: Vec<SignedTransaction>) -> Result<Vec<TxHash>, LedgerError> {
        self.inner.submit_batch(txs).await
    }

    async fn deposit(&self, to: &Address, token: TokenId, amount: Amount, layer: Layer) -> Result<TxHash, LedgerError> {
        self.inner.deposit(to, token, amount, layer).await
    }

    async fn await_receipt(&self, hash: &TxHash) -> Result<Receipt, LedgerError> {
        let left = self.failures.load(Ordering::SeqCst);
        if left > 0 {
            self.failures.store(left - 1, Ordering::SeqCst);
            return Err(LedgerError::Transport("receipt timeout".into()));
        }
        self.inner.await_receipt(hash).await
    }

    async fn notify_on_confirmation(&self, hash: &TxHash, level: Confirmation) -> Result<Receipt, LedgerError> {
        self.inner.notify_on_confirmation(hash, level).await
    }
}

fn terms(timeout: u64, withdraw_type: Layer) -> SwapTerms {
    SwapTerms {
        sell: Deal {
            token: ETH,
            amount: SELL,
        },
        buy: Deal {
            token: DAI,
            amount: BUY,
        },
        timeout,
        withdraw_type,
        create2: Create2Data {
            creator_address: Address::repeat_byte(0xcc),
            salt: [0u8; 32],
            code_hash: [0x5au8; 32],
        },
    }
}

impl Market {
    async fn propose(&mut self, terms: SwapTerms) -> ProviderProposal {
        let client_pubkey = self.client.pubkey();
        let client_address = self.client.address();
        self.provider
            .prepare_swap(terms, client_pubkey, client_address)
            .await
            .unwrap()
    }

    /// Run the protocol up to the client's signature.
    async fn sign(&mut self, terms: SwapTerms) -> ClientSignature {
        let proposal = self.propose(terms).await;
        let commitment = self.client.prepare_swap(&proposal).unwrap();
        let provider_signature = self.provider.sign_swap(&commitment).await.unwrap();
        let (client_signature, _) = self.client.sign_swap(&provider_signature).await.unwrap();
        client_signature
    }

    fn escrow(&self) -> Address {
        self.provider.escrow().unwrap().address
    }
}

#[tokio::test]
async fn happy_path_delivers_both_sides() {
    let mut m = market(SwapConfig::default()).await;
    let timeout = m.ledger.now() + 600;

    let proposal = m.propose(terms(timeout, Layer::L2)).await;
    assert_eq!(m.provider.state(), SwapState::Prepared);
    // the escrow is open before anyone builds against it
    assert!(m.ledger.account(&proposal.escrow).id.is_some());

    let commitment = m.client.prepare_swap(&proposal).unwrap();
    assert_eq!(m.client.state(), SwapState::Prepared);

    let provider_signature = m.provider.sign_swap(&commitment).await.unwrap();
    assert_eq!(m.provider.state(), SwapState::Signed);

    let (client_signature, client_swap) = m.client.sign_swap(&provider_signature).await.unwrap();
    assert_eq!(m.client.state(), SwapState::Signed);
    assert_eq!(m.client.plan(), m.provider.plan());

    m.client.deposit_funds().await.unwrap();
    assert_eq!(m.client.state(), SwapState::Deposited);

    let provider_swap = m.provider.check_swap(&client_signature).await.unwrap();
    assert_eq!(m.provider.state(), SwapState::Checked);
    assert_eq!(
        provider_swap.transaction(Slot::ClientReceives),
        client_swap.transaction(Slot::ClientReceives)
    );

    m.provider.deposit_funds().await.unwrap();
    assert_eq!(m.provider.state(), SwapState::Deposited);

    let submitted = m.provider.finalize_swap().await.unwrap();
    assert_eq!(submitted.len(), 3);
    assert_eq!(m.provider.state(), SwapState::Finalized);

    let receipt = client_swap.wait().await.unwrap();
    assert_eq!(receipt.hash, client_swap.watched());

    let client = m.client.address();
    let provider = m.provider.address();
    let escrow = proposal.escrow;
    assert_eq!(m.ledger.balance(&client, DAI), BUY);
    assert_eq!(m.ledger.balance(&client, ETH), CLIENT_ETH - SELL - CPK_FEE);
    assert_eq!(m.ledger.balance(&provider, ETH), SELL - ETH_TRANSFER_FEE);
    assert_eq!(m.ledger.balance(&provider, DAI), PROVIDER_DAI - BUY - DAI_TRANSFER_FEE);
    assert_eq!(m.ledger.balance(&escrow, ETH), 0);
    assert_eq!(m.ledger.balance(&escrow, DAI), 0);

    // nothing left to submit, and the refunds can no longer execute
    assert!(m.provider.finalize_swap().await.is_err());
    assert!(provider_swap.finalize().await.unwrap().is_empty());
    m.ledger.advance(3600);
    assert!(provider_swap.cancel().await.unwrap().is_empty());
    assert_eq!(m.ledger.balance(&client, DAI), BUY);
}

#[tokio::test]
async fn provider_can_withdraw_to_the_base_layer() {
    let mut m = market(SwapConfig::default()).await;
    let timeout = m.ledger.now() + 600;

    let client_signature = m.sign(terms(timeout, Layer::L1)).await;
    m.client.deposit_funds().await.unwrap();
    m.provider.check_swap(&client_signature).await.unwrap();
    m.provider.deposit_funds().await.unwrap();
    m.provider.finalize_swap().await.unwrap();

    let provider = m.provider.address();
    assert_eq!(m.ledger.l1_balance(&provider, ETH), SELL - ETH_WITHDRAW_FEE);
    assert_eq!(m.ledger.balance(&provider, ETH), 0);
    assert_eq!(m.ledger.balance(&m.client.address(), DAI), BUY);
}

#[tokio::test]
async fn client_refunds_after_timeout_when_provider_stalls() {
    let mut m = market(SwapConfig::default()).await;
    let timeout = m.ledger.now();

    let proposal = m.propose(terms(timeout, Layer::L2)).await;
    let commitment = m.client.prepare_swap(&proposal).unwrap();
    let provider_signature = m.provider.sign_swap(&commitment).await.unwrap();
    let (_, swap) = m.client.sign_swap(&provider_signature).await.unwrap();
    m.client.deposit_funds().await.unwrap();

    let escrow = proposal.escrow;
    let nonce = m.ledger.account(&escrow).nonce;

    // refunds are not valid yet, and the failed batch leaves no trace
    assert!(!swap.is_expired().await.unwrap());
    let err = swap.cancel().await.unwrap_err();
    assert!(matches!(err, SwapError::Ledger(LedgerError::OutsideValidity { .. })));
    assert_eq!(m.ledger.account(&escrow).nonce, nonce);

    m.ledger.advance(1);
    assert!(swap.is_expired().await.unwrap());
    let submitted = swap.cancel().await.unwrap();
    // the provider never deposited, so its refund is left out
    assert_eq!(submitted.len(), 2);

    let client = m.client.address();
    let lost = CLIENT_ETH - m.ledger.balance(&client, ETH);
    assert_eq!(lost, CPK_FEE + ETH_TRANSFER_FEE);
    assert_eq!(m.ledger.balance(&escrow, ETH), 0);

    // the client's delivery nonce went to its refund
    let err = swap.finalize().await.unwrap_err();
    assert!(matches!(err, SwapError::RefundExecuted { slot: Slot::ClientReceives }));
    assert!(!err.is_recoverable());
    assert_eq!(m.ledger.balance(&client, DAI), 0);

    // the provider's refund never ran, so its nonce still belongs to the
    // provider's delivery: sell tokens arriving later can be moved by it
    assert_eq!(m.ledger.account(&escrow).nonce, nonce + 2);
    m.ledger.fund(escrow, ETH, SELL);
    let provider = m.provider.address();
    let delivery = swap.transaction(Slot::ProviderReceives).clone();
    m.ledger.wallet(provider).submit(delivery).await.unwrap();
    assert_eq!(m.ledger.balance(&provider, ETH), SELL - ETH_TRANSFER_FEE);
    assert_eq!(m.ledger.balance(&escrow, ETH), 0);
}

#[tokio::test]
async fn both_parties_refund_after_timeout() {
    let mut m = market(SwapConfig::default()).await;
    let timeout = m.ledger.now();

    let client_signature = m.sign(terms(timeout, Layer::L2)).await;
    m.client.deposit_funds().await.unwrap();
    let swap = m.provider.check_swap(&client_signature).await.unwrap();
    m.provider.deposit_funds().await.unwrap();

    m.ledger.advance(1);
    assert_eq!(swap.cancel().await.unwrap().len(), 3);

    let provider = m.provider.address();
    let client = m.client.address();
    assert_eq!(m.ledger.balance(&provider, DAI), PROVIDER_DAI - DAI_TRANSFER_FEE);
    assert_eq!(m.ledger.balance(&client, ETH), CLIENT_ETH - CPK_FEE - ETH_TRANSFER_FEE);
    assert_eq!(m.ledger.balance(&m.escrow(), DAI), 0);

    // every happy-path nonce went to a refund, and the provider stays put
    let err = m.provider.finalize_swap().await.unwrap_err();
    assert!(matches!(err, SwapError::RefundExecuted { slot: Slot::ClientReceives }));
    assert_eq!(m.provider.state(), SwapState::Deposited);
    assert!(swap.finalize().await.is_err());
    assert_eq!(m.ledger.balance(&client, DAI), 0);
}

#[tokio::test]
async fn retried_deposit_does_not_pay_twice() {
    let ledger = open_ledger();
    let config = SwapConfig::default();
    let provider = identity(1, provider_address(), ledger.wallet(provider_address())).await;
    let wallet = FlakyReceipts {
        inner: ledger.wallet(client_address()),
        failures: AtomicUsize::new(1),
    };
    let client = identity(2, client_address(), wallet).await;
    let mut provider = Provider::new(provider, config.clone());
    let mut client = Client::new(client, config);

    let timeout = ledger.now() + 600;
    let proposal = provider
        .prepare_swap(terms(timeout, Layer::L2), client.pubkey(), client.address())
        .await
        .unwrap();
    let commitment = client.prepare_swap(&proposal).unwrap();
    let provider_signature = provider.sign_swap(&commitment).await.unwrap();
    let (client_signature, _) = client.sign_swap(&provider_signature).await.unwrap();

    // the deposit lands but its receipt is lost
    let err = client.deposit_funds().await.unwrap_err();
    assert!(matches!(err, SwapError::Ledger(LedgerError::Transport(_))));
    assert!(err.is_recoverable());
    assert_eq!(client.state(), SwapState::Signed);
    let escrow = proposal.escrow;
    assert_eq!(ledger.balance(&escrow, ETH), SELL + CPK_FEE);

    let first = client.deposit_funds().await.unwrap();
    assert_eq!(first.len(), 1);
    assert_eq!(client.state(), SwapState::Deposited);
    assert_eq!(ledger.balance(&escrow, ETH), SELL + CPK_FEE);
    assert_eq!(ledger.balance(&client.address(), ETH), CLIENT_ETH - SELL - CPK_FEE);

    provider.check_swap(&client_signature).await.unwrap();
    provider.deposit_funds().await.unwrap();
    provider.finalize_swap().await.unwrap();
    assert_eq!(ledger.balance(&client.address(), DAI), BUY);
    assert_eq!(ledger.balance(&escrow, ETH), 0);
}

#[tokio::test]
async fn tampered_client_shares_are_rejected() {
    let mut m = market(SwapConfig::default()).await;
    let timeout = m.ledger.now() + 600;

    let mut client_signature = m.sign(terms(timeout, Layer::L2)).await;
    m.client.deposit_funds().await.unwrap();

    let genuine = client_signature.clone();
    let mut bytes = client_signature.shares[2].to_bytes();
    bytes[0] ^= 1;
    client_signature.shares[2] = PartialSignature::from_bytes(&bytes).unwrap();
    let err = m.provider.check_swap(&client_signature).await.unwrap_err();
    assert!(matches!(err, SwapError::InvalidShares { slot: 2 }));
    assert!(err.is_verification_failure());
    assert_eq!(m.provider.state(), SwapState::Signed);

    let mut client_signature = genuine;
    client_signature.shares.swap(0, 1);
    let err = m.provider.check_swap(&client_signature).await.unwrap_err();
    assert!(matches!(err, SwapError::InvalidShares { slot: 0 }));

    client_signature.shares.truncate(4);
    let err = m.provider.check_swap(&client_signature).await.unwrap_err();
    assert!(matches!(err, SwapError::InvalidShares { .. }));

    // the provider never paid in, so dropping the attempt costs nothing
    m.provider.reset();
    assert_eq!(m.provider.state(), SwapState::Empty);
    assert!(m.provider.swap().is_none());
}

#[tokio::test]
async fn provider_waits_for_the_client_deposit() {
    let mut m = market(SwapConfig::default()).await;
    let timeout = m.ledger.now() + 600;

    let client_signature = m.sign(terms(timeout, Layer::L2)).await;

    let err = m.provider.check_swap(&client_signature).await.unwrap_err();
    assert!(err.is_recoverable());
    assert!(!err.is_verification_failure());
    match err {
        SwapError::InsufficientDeposit {
            token,
            required,
            available,
        } => {
            assert_eq!(token, ETH);
            assert_eq!(required, SELL + CPK_FEE);
            assert_eq!(available, 0);
        }
        other => panic!("unexpected error: {}", other),
    }
    assert!(m.provider.state() == SwapState::Signed);

    // the provider cannot pay in before checking
    assert!(matches!(
        m.provider.deposit_funds().await.unwrap_err(),
        SwapError::InvalidState { .. }
    ));

    m.client.deposit_funds().await.unwrap();
    m.provider.check_swap(&client_signature).await.unwrap();
    assert_eq!(m.provider.state(), SwapState::Checked);
}

#[tokio::test]
async fn operations_out_of_order_are_rejected() {
    let mut m = market(SwapConfig::default()).await;
    let timeout = m.ledger.now() + 600;

    let err = m.provider.finalize_swap().await.unwrap_err();
    match err {
        SwapError::InvalidState {
            operation,
            expected,
            actual,
        } => {
            assert_eq!(operation, "finalize_swap");
            assert_eq!(expected, SwapState::Deposited);
            assert_eq!(actual, SwapState::Empty);
        }
        other => panic!("unexpected error: {}", other),
    }
    assert!(m
        .provider
        .check_swap(&ClientSignature { shares: Vec::new() })
        .await
        .is_err());
    assert!(m.client.deposit_funds().await.is_err());
    assert_eq!(m.provider.state(), SwapState::Empty);

    let proposal = m.propose(terms(timeout, Layer::L2)).await;
    let nonce = m.ledger.account(&m.provider.address()).nonce;
    let client_pubkey = m.client.pubkey();
    let client_address = m.client.address();
    let err = m
        .provider
        .prepare_swap(terms(timeout, Layer::L2), client_pubkey, client_address)
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        SwapError::InvalidState {
            expected: SwapState::Empty,
            actual: SwapState::Prepared,
            ..
        }
    ));
    // rejected before touching the ledger
    assert_eq!(m.ledger.account(&m.provider.address()).nonce, nonce);
    assert_eq!(m.provider.escrow().unwrap().address, proposal.escrow);

    m.client.prepare_swap(&proposal).unwrap();
    assert!(m.client.deposit_funds().await.is_err());
    assert!(m.client.finalize_swap().await.is_err());
    assert!(m.client.swap().is_none());
    assert_eq!(m.client.state(), SwapState::Prepared);

    m.client.reset();
    m.provider.reset();
    assert_eq!(m.client.state(), SwapState::Empty);
    assert_eq!(m.provider.state(), SwapState::Empty);

    // a fresh attempt after a reset runs to completion
    let client_signature = m.sign(terms(timeout, Layer::L2)).await;
    m.client.deposit_funds().await.unwrap();
    m.provider.check_swap(&client_signature).await.unwrap();
    m.provider.deposit_funds().await.unwrap();
    m.provider.finalize_swap().await.unwrap();
    assert_eq!(m.ledger.balance(&m.client.address(), DAI), BUY);
}

#[tokio::test]
async fn client_rejects_a_forged_escrow_address() {
    let mut m = market(SwapConfig::default()).await;
    let timeout = m.ledger.now() + 600;

    let mut proposal = m.propose(terms(timeout, Layer::L2)).await;
    let genuine = proposal.escrow;
    proposal.escrow = Address::repeat_byte(0xee);

    let err = m.client.prepare_swap(&proposal).unwrap_err();
    match &err {
        SwapError::EscrowMismatch { computed, declared } => {
            assert_eq!(*computed, genuine);
            assert_eq!(*declared, Address::repeat_byte(0xee));
        }
        other => panic!("unexpected error: {}", other),
    }
    assert!(err.is_verification_failure());
    assert_eq!(m.client.state(), SwapState::Empty);
}

#[tokio::test]
async fn client_rejects_a_batch_built_on_stale_state() {
    let mut m = market(SwapConfig::default()).await;
    let timeout = m.ledger.now() + 600;

    let proposal = m.propose(terms(timeout, Layer::L2)).await;
    let commitment = m.client.prepare_swap(&proposal).unwrap();
    let provider_signature = m.provider.sign_swap(&commitment).await.unwrap();

    m.ledger.force_nonce(&proposal.escrow, 7);

    let err = m.client.sign_swap(&provider_signature).await.unwrap_err();
    assert!(matches!(err, SwapError::BatchMismatch { field: "escrow nonce" }));
    assert!(err.is_verification_failure());
    assert_eq!(m.client.state(), SwapState::Prepared);
    assert!(m.client.swap().is_none());
}

#[tokio::test]
async fn provider_rejects_commitments_from_another_key() {
    let mut m = market(SwapConfig::default()).await;
    let timeout = m.ledger.now() + 600;

    let proposal = m.propose(terms(timeout, Layer::L2)).await;
    let mut commitment = m.client.prepare_swap(&proposal).unwrap();
    commitment.pubkey = Keypair::generate(&mut ChaChaRng::from_seed([9u8; 32])).public;

    let err = m.provider.sign_swap(&commitment).await.unwrap_err();
    assert!(matches!(err, SwapError::BatchMismatch { field: "client key" }));
    assert_eq!(m.provider.state(), SwapState::Prepared);
}

#[tokio::test]
async fn fresh_salt_per_attempt() {
    let mut m = market(SwapConfig::default()).await;
    let timeout = m.ledger.now() + 600;

    let first = m.propose(terms(timeout, Layer::L2)).await;
    m.provider.reset();
    let second = m.propose(terms(timeout, Layer::L2)).await;
    assert_ne!(first.escrow, second.escrow);

    let config = SwapConfig {
        randomize_salt: false,
        ..SwapConfig::default()
    };
    let mut m = market(config).await;
    let first = m.propose(terms(timeout, Layer::L2)).await;
    m.provider.reset();
    let second = m.propose(terms(timeout, Layer::L2)).await;
    assert_eq!(first.escrow, second.escrow);
}

#[tokio::test]
async fn recovery_inputs_reach_the_escrow() {
    let mut m = market(SwapConfig::default()).await;
    let timeout = m.ledger.now() + 600;

    let proposal = m.propose(terms(timeout, Layer::L2)).await;
    m.client.prepare_swap(&proposal).unwrap();

    let provider_inputs = m.provider.recovery_inputs().unwrap();
    let client_inputs = m.client.recovery_inputs().unwrap();
    assert_eq!(provider_inputs, client_inputs);
    assert_eq!(provider_inputs.escrow_address, proposal.escrow);
    assert!(provider_inputs.verify());
}

#[tokio::test]
async fn wait_honors_the_confirmation_level() {
    let config = SwapConfig {
        confirmation: Confirmation::Verified,
        ..SwapConfig::default()
    };
    let mut m = market(config).await;
    let timeout = m.ledger.now() + 600;

    let proposal = m.propose(terms(timeout, Layer::L2)).await;
    let commitment = m.client.prepare_swap(&proposal).unwrap();
    let provider_signature = m.provider.sign_swap(&commitment).await.unwrap();
    let (client_signature, swap) = m.client.sign_swap(&provider_signature).await.unwrap();
    m.client.deposit_funds().await.unwrap();
    m.provider.check_swap(&client_signature).await.unwrap();
    m.provider.deposit_funds().await.unwrap();

    m.ledger.hold_verification(true);
    m.provider.finalize_swap().await.unwrap();

    let waiter = tokio::spawn(async move { swap.wait().await });
    tokio::time::sleep(Duration::from_millis(20)).await;
    assert!(!waiter.is_finished());

    m.ledger.verify_pending();
    let receipt = waiter.await.unwrap().unwrap();
    assert_eq!(receipt.confirmation, Confirmation::Verified);
}
