use std::{collections::HashMap, sync::Arc};

use contracts::{util::convert_h160_to_element, Address, Ledger, H256};
use parking_lot::Mutex;
use tokio::sync::watch;
use tracing::{error, info, warn};
use zk_primitives::{Element, FieldHasher};

use crate::{
    ciphertext::{self, Ciphertext},
    commitment::CommitmentScheme,
    constants::UNKNOWN_CLAIM_TX,
    guard::NullifierGuard,
    note::Note,
    pipeline::{PipelineState, ProofArtifact, ProofPipeline},
    prover::{Prover, WithdrawInputs},
    store::{create_note, CreatedNote, NoteStore},
    submit::Submitter,
    Result,
};

/// A confirmed deposit
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Deposit {
    pub created: CreatedNote,
    pub deposit_tx: H256,
    pub root_tx: H256,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WithdrawOutcome {
    /// The withdrawal is confirmed on-chain. `persisted` is false if marking the stored note
    /// claimed failed afterwards; the redemption itself still stands.
    Redeemed {
        tx_hash: H256,
        artifact: ProofArtifact,
        ciphertext: Ciphertext,
        persisted: bool,
    },
    /// The nullifier was already spent on-chain; the prover was never called
    AlreadyRedeemed,
}

/// Everything a session needs to deposit and redeem notes
pub struct ShieldedClient<H, P> {
    scheme: CommitmentScheme<H>,
    ledger: Arc<dyn Ledger>,
    guard: NullifierGuard,
    submitter: Arc<dyn Submitter>,
    store: Arc<dyn NoteStore>,
    pipeline: ProofPipeline<P>,
    in_flight: InFlightMap,
}

type InFlightMap = Mutex<HashMap<Element, (Arc<tokio::sync::Mutex<()>>, usize)>>;

/// A place in the withdrawal queue of one note. The map entry is removed when the last holder
/// drops out, including when a withdrawal future is cancelled.
struct InFlight<'a> {
    map: &'a InFlightMap,
    nullifier: Element,
    lock: Arc<tokio::sync::Mutex<()>>,
}

impl<'a> InFlight<'a> {
    fn enter(map: &'a InFlightMap, nullifier: Element) -> Self {
        let mut entries = map.lock();
        let (lock, holders) = entries.entry(nullifier).or_default();
        *holders += 1;

        Self {
            map,
            nullifier,
            lock: Arc::clone(lock),
        }
    }
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        let mut entries = self.map.lock();
        if let Some((_, holders)) = entries.get_mut(&self.nullifier) {
            *holders -= 1;
            if *holders == 0 {
                entries.remove(&self.nullifier);
            }
        }
    }
}

impl<H: FieldHasher, P: Prover> ShieldedClient<H, P> {
    pub fn new(
        hasher: H,
        prover: P,
        ledger: Arc<dyn Ledger>,
        submitter: Arc<dyn Submitter>,
        store: Arc<dyn NoteStore>,
    ) -> Self {
        Self {
            scheme: CommitmentScheme::new(hasher),
            guard: NullifierGuard::new(Arc::clone(&ledger)),
            ledger,
            submitter,
            store,
            pipeline: ProofPipeline::new(prover),
            in_flight: Mutex::new(HashMap::new()),
        }
    }

    pub fn scheme(&self) -> &CommitmentScheme<H> {
        &self.scheme
    }

    pub fn pipeline(&self) -> &ProofPipeline<P> {
        &self.pipeline
    }

    pub fn subscribe(&self) -> watch::Receiver<PipelineState> {
        self.pipeline.subscribe()
    }

    pub fn load_note(&self) -> Option<Note> {
        self.store.load()
    }

    /// Create a note, persist it, then deposit `value` and register the note's root.
    ///
    /// The note is saved before anything is sent, and a storage failure stops the deposit.
    pub async fn deposit(
        &self,
        value: Element,
        secret: Element,
        random: Option<Element>,
    ) -> Result<Deposit> {
        let created = create_note(&self.scheme, value, secret, random, &mut rand::thread_rng());
        self.store.save(&created.note)?;

        let deposit_tx = self
            .ledger
            .deposit(created.note.commitment, created.note.value)
            .await?;
        info!(commitment = %created.commitment_hex, ?deposit_tx, "deposited note");

        let root_tx = self.ledger.register_root(created.note.root).await?;
        info!(root = %created.root_hex, ?root_tx, "registered root");

        Ok(Deposit {
            created,
            deposit_tx,
            root_tx,
        })
    }

    /// Redeem `note` to `recipient`.
    ///
    /// Resolves once the ledger has confirmed the withdrawal, and only then marks the note claimed.
    /// Withdrawals of the same note are serialized; a second attempt sees the first one's
    /// result through the spent check.
    pub async fn withdraw(&self, note: &Note, recipient: Address) -> Result<WithdrawOutcome> {
        let in_flight = InFlight::enter(&self.in_flight, note.nullifier);
        let _exclusive = in_flight.lock.lock().await;

        self.withdraw_exclusive(note, recipient).await
    }

    async fn withdraw_exclusive(&self, note: &Note, recipient: Address) -> Result<WithdrawOutcome> {
        if self.guard.is_spent(note.nullifier).await? {
            warn!(nullifier = %note.nullifier.to_hex(), "note already redeemed");
            self.store.mark_claimed(note.nullifier, UNKNOWN_CLAIM_TX)?;
            return Ok(WithdrawOutcome::AlreadyRedeemed);
        }

        let inputs = WithdrawInputs::from_note(note, convert_h160_to_element(&recipient));
        let artifact = self.pipeline.run(&inputs).await?;

        let ciphertext =
            ciphertext::encrypt(note.value, artifact.nullifier(), artifact.recipient());

        let tx_hash = self
            .submitter
            .submit_withdrawal(&artifact, &ciphertext)
            .await?;
        info!(?tx_hash, "withdrawal submitted");

        self.ledger.wait_for_confirmation(tx_hash).await?;
        info!(?tx_hash, "withdrawal confirmed");

        let persisted = match self.store.mark_claimed(note.nullifier, &format!("{tx_hash:?}")) {
            Ok(_) => true,
            Err(err) => {
                error!(?tx_hash, %err, "withdrawal confirmed but the note could not be marked claimed");
                false
            }
        };

        Ok(WithdrawOutcome::Redeemed {
            tx_hash,
            artifact,
            ciphertext,
            persisted,
        })
    }
}

#[cfg(test)]
mod tests {
    use std::{
        sync::atomic::{AtomicUsize, Ordering},
        time::Duration,
    };

    use async_trait::async_trait;
    use contracts::CONFIRMATION_TIMEOUT;
    use zk_primitives::Poseidon2Hasher;

    use super::*;
    use crate::{
        store::{MemoryNoteStore, StorageError},
        test_api::{ConfirmationFailure, MockLedger, MockProver},
        Error, PipelineError,
    };

    /// Hands back a hash without sending anything, like a relay that accepted the action
    struct AcceptOnly;

    #[async_trait]
    impl Submitter for AcceptOnly {
        async fn submit_withdrawal(&self, _: &ProofArtifact, _: &Ciphertext) -> Result<H256> {
            Ok(H256::repeat_byte(0xaa))
        }
    }

    /// Accepts the first save and fails every one after it
    #[derive(Default)]
    struct FailsAfterFirstSave {
        inner: MemoryNoteStore,
        saves: AtomicUsize,
    }

    impl NoteStore for FailsAfterFirstSave {
        fn save(&self, note: &Note) -> std::result::Result<(), StorageError> {
            if self.saves.fetch_add(1, Ordering::SeqCst) > 0 {
                return Err(std::io::Error::new(std::io::ErrorKind::Other, "disk full").into());
            }
            self.inner.save(note)
        }

        fn load(&self) -> Option<Note> {
            self.inner.load()
        }
    }

    fn client(
        prover: MockProver<Poseidon2Hasher>,
        ledger: Arc<MockLedger>,
    ) -> (
        ShieldedClient<Poseidon2Hasher, MockProver<Poseidon2Hasher>>,
        Arc<MemoryNoteStore>,
    ) {
        let store = Arc::new(MemoryNoteStore::new());
        let client = ShieldedClient::new(
            Poseidon2Hasher,
            prover,
            ledger.clone(),
            ledger,
            store.clone(),
        );
        (client, store)
    }

    fn recipient() -> Address {
        Address::repeat_byte(0x42)
    }

    #[tokio::test]
    async fn deposit_then_withdraw() {
        let ledger = Arc::new(MockLedger::default());
        let (client, store) = client(MockProver::new(Poseidon2Hasher), ledger.clone());

        let deposit = client
            .deposit(Element::new(500), Element::new(0x456), None)
            .await
            .unwrap();
        let note = store.load().unwrap();
        assert_eq!(note, deposit.created.note);
        assert!(ledger.has_commitment(note.commitment));
        assert!(ledger.has_root(note.root));

        let outcome = client.withdraw(&note, recipient()).await.unwrap();
        let WithdrawOutcome::Redeemed {
            tx_hash,
            artifact,
            ciphertext,
            persisted,
        } = outcome
        else {
            panic!("expected a redemption");
        };

        assert_eq!(artifact.public_inputs[0], note.nullifier);
        assert_eq!(artifact.public_inputs[1], Element::ONE);
        assert_eq!(artifact.public_inputs[2], note.root);
        assert_eq!(artifact.public_inputs[3], convert_h160_to_element(&recipient()));
        assert_eq!(artifact.public_inputs[4], note.commitment);
        assert_eq!(
            ciphertext::decrypt(&ciphertext, note.nullifier, artifact.recipient()),
            note.value.to_u256()
        );

        assert!(persisted);
        let stored = store.load().unwrap();
        assert!(stored.claimed);
        assert_eq!(stored.claimed_tx_hash, Some(format!("{tx_hash:?}")));
        assert_eq!(client.pipeline().state(), PipelineState::Done);
    }

    #[tokio::test]
    async fn four_public_inputs_are_reconciled() {
        let ledger = Arc::new(MockLedger::default());
        let (client, _) = client(
            MockProver::new(Poseidon2Hasher).omit_merkle_proof_length(),
            ledger,
        );

        let deposit = client
            .deposit(Element::new(7), Element::new(1), Some(Element::new(2)))
            .await
            .unwrap();
        let outcome = client
            .withdraw(&deposit.created.note, recipient())
            .await
            .unwrap();

        let WithdrawOutcome::Redeemed { artifact, .. } = outcome else {
            panic!("expected a redemption");
        };
        assert_eq!(artifact.public_inputs[1], Element::ONE);
        assert_eq!(artifact.public_inputs[4], deposit.created.note.commitment);
    }

    #[tokio::test]
    async fn spent_nullifier_never_reaches_the_prover() {
        let ledger = Arc::new(MockLedger::default());
        let prover = MockProver::new(Poseidon2Hasher);
        let calls = prover.calls();
        let (client, store) = client(prover, ledger.clone());

        let deposit = client
            .deposit(Element::new(500), Element::new(0x456), None)
            .await
            .unwrap();
        ledger.spend(deposit.created.note.nullifier);

        let outcome = client
            .withdraw(&deposit.created.note, recipient())
            .await
            .unwrap();

        assert_eq!(outcome, WithdrawOutcome::AlreadyRedeemed);
        assert_eq!(calls.load(Ordering::SeqCst), 0);

        let stored = store.load().unwrap();
        assert!(stored.claimed);
        assert_eq!(stored.claimed_tx_hash.as_deref(), Some(UNKNOWN_CLAIM_TX));
    }

    #[tokio::test]
    async fn corrupted_commitment_fails_execution() {
        let ledger = Arc::new(MockLedger::default());
        let (client, store) = client(MockProver::new(Poseidon2Hasher), ledger);

        let deposit = client
            .deposit(
                Element::new(500),
                Element::new(0x456),
                Some(Element::new(0xdef456)),
            )
            .await
            .unwrap();

        let mut note = deposit.created.note;
        note.commitment = Element::new(0xdeadbeef);

        let err = client.withdraw(&note, recipient()).await.unwrap_err();
        assert!(
            matches!(
                err,
                Error::Pipeline(PipelineError::CircuitExecution(_))
            ),
            "{err:?}"
        );
        assert_eq!(client.pipeline().state(), PipelineState::Failed);
        assert!(!store.load().unwrap().claimed);
    }

    #[tokio::test]
    async fn second_withdrawal_sees_the_first() {
        let ledger = Arc::new(MockLedger::default());
        let prover = MockProver::new(Poseidon2Hasher);
        let calls = prover.calls();
        let (client, _) = client(prover, ledger);
        let client = Arc::new(client);

        let note = client
            .deposit(Element::new(500), Element::new(0x456), None)
            .await
            .unwrap()
            .created
            .note;

        let (a, b) = tokio::join!(
            client.withdraw(&note, recipient()),
            client.withdraw(&note, recipient())
        );

        let outcomes = [a.unwrap(), b.unwrap()];
        assert_eq!(
            outcomes
                .iter()
                .filter(|o| **o == WithdrawOutcome::AlreadyRedeemed)
                .count(),
            1
        );
        // execute + prove, once
        assert_eq!(calls.load(Ordering::SeqCst), 2);
        assert!(client.in_flight.lock().is_empty());
    }

    #[tokio::test]
    async fn storage_failure_blocks_deposit() {
        let ledger = Arc::new(MockLedger::default());
        let dir = tempdir::TempDir::new("zk_note").unwrap();
        let blocker = dir.path().join("file");
        std::fs::write(&blocker, b"").unwrap();

        let client = ShieldedClient::new(
            Poseidon2Hasher,
            MockProver::new(Poseidon2Hasher),
            ledger.clone(),
            ledger.clone(),
            Arc::new(crate::store::FileNoteStore::new(blocker.join("note.json"))),
        );

        let err = client
            .deposit(Element::new(500), Element::new(0x456), None)
            .await
            .unwrap_err();

        assert!(matches!(err, Error::Storage(_)), "{err:?}");
        assert_eq!(ledger.deposits(), 0);
    }

    #[tokio::test]
    async fn revert_is_surfaced_with_message() {
        let ledger = Arc::new(MockLedger::default());
        let (client, store) = client(MockProver::new(Poseidon2Hasher), ledger.clone());

        let note = client
            .deposit(Element::new(500), Element::new(0x456), None)
            .await
            .unwrap()
            .created
            .note;
        ledger.reject_withdrawals("execution reverted: InvalidProof()");

        let err = client.withdraw(&note, recipient()).await.unwrap_err();
        assert!(
            matches!(&err, Error::LedgerRevert { message, .. } if message.contains("InvalidProof")),
            "{err:?}"
        );
        assert!(!store.load().unwrap().claimed);
    }

    #[tokio::test]
    async fn accepted_but_unconfirmed_withdrawal_stays_unclaimed() {
        let ledger = Arc::new(MockLedger::default());
        let store = Arc::new(MemoryNoteStore::new());
        let client = ShieldedClient::new(
            Poseidon2Hasher,
            MockProver::new(Poseidon2Hasher),
            ledger.clone(),
            Arc::new(AcceptOnly),
            store.clone(),
        );

        let note = client
            .deposit(Element::new(500), Element::new(0x456), None)
            .await
            .unwrap()
            .created
            .note;

        let err = client.withdraw(&note, recipient()).await.unwrap_err();
        assert!(
            matches!(err, Error::LedgerTimeout(tx, _) if tx == H256::repeat_byte(0xaa)),
            "{err:?}"
        );
        assert!(!store.load().unwrap().claimed);
    }

    #[tokio::test]
    async fn confirmation_timeout_is_a_ledger_timeout() {
        let ledger = Arc::new(MockLedger::default());
        let (client, store) = client(MockProver::new(Poseidon2Hasher), ledger.clone());

        let note = client
            .deposit(Element::new(500), Element::new(0x456), None)
            .await
            .unwrap()
            .created
            .note;
        ledger.fail_confirmations(ConfirmationFailure::Timeout);

        let err = client.withdraw(&note, recipient()).await.unwrap_err();
        assert!(
            matches!(err, Error::LedgerTimeout(_, timeout) if timeout == CONFIRMATION_TIMEOUT),
            "{err:?}"
        );
        assert!(!store.load().unwrap().claimed);
    }

    #[tokio::test]
    async fn failed_receipt_is_a_ledger_revert() {
        let ledger = Arc::new(MockLedger::default());
        let (client, store) = client(MockProver::new(Poseidon2Hasher), ledger.clone());

        let note = client
            .deposit(Element::new(500), Element::new(0x456), None)
            .await
            .unwrap()
            .created
            .note;
        ledger.fail_confirmations(ConfirmationFailure::Reverted);

        let err = client.withdraw(&note, recipient()).await.unwrap_err();
        assert!(
            matches!(&err, Error::LedgerRevert { message, debug: None } if message.ends_with("reverted")),
            "{err:?}"
        );
        assert!(!store.load().unwrap().claimed);
    }

    #[tokio::test]
    async fn claim_storage_failure_keeps_the_redemption() {
        let ledger = Arc::new(MockLedger::default());
        let store = Arc::new(FailsAfterFirstSave::default());
        let client = ShieldedClient::new(
            Poseidon2Hasher,
            MockProver::new(Poseidon2Hasher),
            ledger.clone(),
            ledger.clone(),
            store.clone(),
        );

        let note = client
            .deposit(Element::new(500), Element::new(0x456), None)
            .await
            .unwrap()
            .created
            .note;

        let outcome = client.withdraw(&note, recipient()).await.unwrap();
        let WithdrawOutcome::Redeemed {
            tx_hash, persisted, ..
        } = outcome
        else {
            panic!("expected a redemption");
        };

        assert!(!persisted);
        assert_ne!(tx_hash, H256::zero());
        assert!(ledger.is_nullifier_spent(note.nullifier).await.unwrap());
        assert!(!store.load().unwrap().claimed);
    }

    #[tokio::test]
    async fn cancelled_withdrawal_leaves_no_in_flight_entry() {
        let ledger = Arc::new(MockLedger::default());
        let (client, _) = client(MockProver::new(Poseidon2Hasher), ledger);

        let note = client
            .deposit(Element::new(500), Element::new(0x456), None)
            .await
            .unwrap()
            .created
            .note;

        let holder = InFlight::enter(&client.in_flight, note.nullifier);
        let held = holder.lock.lock().await;

        let attempt =
            tokio::time::timeout(Duration::from_millis(20), client.withdraw(&note, recipient()))
                .await;
        assert!(attempt.is_err());

        let holders = client
            .in_flight
            .lock()
            .get(&note.nullifier)
            .map(|(_, holders)| *holders);
        assert_eq!(holders, Some(1));

        drop(held);
        drop(holder);
        assert!(client.in_flight.lock().is_empty());
    }
}
