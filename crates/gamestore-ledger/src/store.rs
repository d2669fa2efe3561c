//! # Ledger Store
//!
//! Holds the authoritative snapshot and serializes every change to it.
//!
//! ## Commit Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Ledger Store                                    │
//! │                                                                         │
//! │  caller A ─┐  commit(mutator)                                          │
//! │  caller B ─┼──────────────► mpsc (unbounded FIFO) ──┐                  │
//! │  caller C ─┘  enqueued at call time                 │                  │
//! │                                                      ▼                  │
//! │                                    ┌────────────────────────────────┐  │
//! │                                    │  LedgerWriter (one task)       │  │
//! │                                    │                                │  │
//! │                                    │  1. base  = published snapshot │  │
//! │                                    │  ┌ spawn_blocking ───────────┐ │  │
//! │                                    │  │2. draft = base.clone()    │ │  │
//! │                                    │  │3. mutator(&mut draft, ctx)│ │  │
//! │                                    │  │4. check_invariants        │ │  │
//! │                                    │  │5. encode + save           │ │  │
//! │                                    │  └───────────────────────────┘ │  │
//! │                                    │  6. publish (watch)            │  │
//! │                                    │  7. reply (oneshot)            │  │
//! │                                    └───────────────┬────────────────┘  │
//! │                                                    │                    │
//! │  read() / subscribe() ◄──── watch<Arc<Snapshot>> ◄─┘                    │
//! │  never wait for the writer                                              │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Any failure in steps 3-5 drops the draft; the published snapshot stays
//! exactly as it was and the caller receives the error. A mutator that
//! panics loses only its own reply (the caller sees `WriterClosed`); the
//! writer keeps serving the queue.

use std::future::Future;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use gamestore_core::commerce::ReplaceSnapshot;
use gamestore_core::{
    seed, Clock, LedgerError, LedgerResult, Mutation, MutationContext, Snapshot,
};
use tokio::sync::{mpsc, oneshot, watch};
use tracing::{debug, error, info, warn};

use crate::persistence::SnapshotPersistence;

// =============================================================================
// Jobs
// =============================================================================

/// Reply half of a job, invoked once the draft is published or dropped.
type Settle = Box<dyn FnOnce(LedgerResult<()>) + Send>;

/// Outcome of running a mutator against the base snapshot.
struct Pending {
    /// `None` when the mutator failed.
    next: Option<Snapshot>,
    settle: Settle,
}

type Job = Box<dyn FnOnce(&Snapshot, &MutationContext) -> Pending + Send>;

// =============================================================================
// Ledger Store Handle
// =============================================================================

/// Cloneable handle to the ledger.
///
/// The writer task stops once every handle is dropped and the queue drains.
#[derive(Debug, Clone)]
pub struct LedgerStore {
    jobs: mpsc::UnboundedSender<Job>,
    snapshot: watch::Receiver<Arc<Snapshot>>,
    clock: Arc<dyn Clock>,
}

impl LedgerStore {
    /// Loads the persisted snapshot (or seeds one) and starts the writer.
    ///
    /// ## Startup
    /// ```text
    /// load(key)
    ///   ├── None            → seed, save
    ///   ├── decode error    → warn, seed, save
    ///   └── Some(snapshot)  → use it (empty categories get defaults)
    /// ```
    ///
    /// Must be called from within a Tokio runtime.
    pub async fn open(persistence: SnapshotPersistence, clock: Arc<dyn Clock>) -> LedgerResult<Self> {
        let loader = persistence.clone();
        let now = clock.now();
        let initial = tokio::task::spawn_blocking(move || load_or_seed(&loader, now))
            .await
            .map_err(|e| LedgerError::PersistenceFailure(format!("Snapshot loader failed: {}", e)))??;

        let base_consistent = match initial.check_invariants() {
            Ok(()) => true,
            Err(violation) => {
                warn!(%violation, "Loaded snapshot is inconsistent; invariant checks relaxed until repaired");
                false
            }
        };

        let (jobs_tx, jobs_rx) = mpsc::unbounded_channel();
        let (snapshot_tx, snapshot_rx) = watch::channel(Arc::new(initial));

        let writer = LedgerWriter {
            jobs: jobs_rx,
            snapshot: snapshot_tx,
            persistence,
            clock: clock.clone(),
            base_consistent,
        };
        tokio::spawn(writer.run());

        Ok(LedgerStore {
            jobs: jobs_tx,
            snapshot: snapshot_rx,
            clock,
        })
    }

    /// The current published snapshot.
    pub fn read(&self) -> Arc<Snapshot> {
        self.snapshot.borrow().clone()
    }

    /// A receiver that observes every published snapshot.
    pub fn subscribe(&self) -> watch::Receiver<Arc<Snapshot>> {
        self.snapshot.clone()
    }

    pub fn clock(&self) -> &Arc<dyn Clock> {
        &self.clock
    }

    /// Submits a read-modify-write.
    ///
    /// The request is queued before this returns; awaiting the future only
    /// waits for the outcome. Dropping the future does not cancel the commit.
    pub fn commit<T, F>(&self, mutator: F) -> impl Future<Output = LedgerResult<T>> + Send + 'static
    where
        T: Send + 'static,
        F: FnOnce(&mut Snapshot, &MutationContext) -> LedgerResult<T> + Send + 'static,
    {
        let (reply_tx, reply_rx) = oneshot::channel::<LedgerResult<T>>();

        let job: Job = Box::new(move |base: &Snapshot, ctx: &MutationContext| {
            let mut draft = base.clone();
            match mutator(&mut draft, ctx) {
                Ok(output) => Pending {
                    next: Some(draft),
                    settle: Box::new(move |published: LedgerResult<()>| {
                        let _ = reply_tx.send(published.map(|()| output));
                    }),
                },
                Err(e) => Pending {
                    next: None,
                    settle: Box::new(move |_: LedgerResult<()>| {
                        let _ = reply_tx.send(Err(e));
                    }),
                },
            }
        });

        let queued = self.jobs.send(job).map_err(|_| LedgerError::WriterClosed);

        async move {
            queued?;
            reply_rx.await.map_err(|_| LedgerError::WriterClosed)?
        }
    }

    /// Submits a typed [`Mutation`].
    pub fn apply<M: Mutation>(
        &self,
        mutation: M,
    ) -> impl Future<Output = LedgerResult<M::Output>> + Send + 'static {
        self.commit(move |draft, ctx| mutation.apply(draft, ctx))
    }

    /// Replaces the whole ledger with a freshly seeded snapshot.
    pub async fn reset(&self) -> LedgerResult<()> {
        let fresh = seed_snapshot(self.clock.now()).await?;
        self.apply(ReplaceSnapshot(fresh)).await
    }
}

/// Builds the default seed off the runtime; seeding hashes the demo secrets.
pub(crate) async fn seed_snapshot(now: DateTime<Utc>) -> LedgerResult<Snapshot> {
    tokio::task::spawn_blocking(move || seed::default_snapshot(now))
        .await
        .map_err(|e| LedgerError::PersistenceFailure(format!("Seeding failed: {}", e)))?
}

fn load_or_seed(persistence: &SnapshotPersistence, now: DateTime<Utc>) -> LedgerResult<Snapshot> {
    if let Some(bytes) = persistence.load()? {
        match Snapshot::decode(&bytes) {
            Ok(snapshot) => {
                info!(
                    key = %persistence.key(),
                    accounts = snapshot.accounts.len(),
                    items = snapshot.catalog_items.len(),
                    transactions = snapshot.transactions.len(),
                    "Loaded ledger snapshot"
                );
                return Ok(snapshot);
            }
            Err(e) => {
                warn!(key = %persistence.key(), error = %e, "Persisted snapshot is unreadable; reseeding");
            }
        }
    } else {
        info!(key = %persistence.key(), "No persisted snapshot; seeding defaults");
    }

    let snapshot = seed::default_snapshot(now)?;
    persistence.save(&snapshot.encode()?)?;
    Ok(snapshot)
}

// =============================================================================
// Writer Task
// =============================================================================

/// The only owner of the publish side of the snapshot channel.
struct LedgerWriter {
    jobs: mpsc::UnboundedReceiver<Job>,
    snapshot: watch::Sender<Arc<Snapshot>>,
    persistence: SnapshotPersistence,
    clock: Arc<dyn Clock>,
    /// Invariants are enforced only once the published snapshot satisfies them.
    base_consistent: bool,
}

/// A verified, persisted draft waiting to be published.
struct Staged {
    next: Snapshot,
    consistent: bool,
    bytes: usize,
}

impl LedgerWriter {
    async fn run(mut self) {
        debug!("Ledger writer started");

        while let Some(job) = self.jobs.recv().await {
            let ctx = MutationContext::new(self.clock.now());
            let base = self.snapshot.borrow().clone();
            let persistence = self.persistence.clone();
            let enforce = self.base_consistent;

            let step = tokio::task::spawn_blocking(move || {
                let Pending { next, settle } = job(&base, &ctx);
                let staged = next.map(|next| stage(next, &persistence, enforce));
                (staged, settle)
            })
            .await;

            match step {
                Ok((staged, settle)) => {
                    let outcome = match staged {
                        Some(Ok(staged)) => {
                            self.publish(staged);
                            Ok(())
                        }
                        Some(Err(e)) => Err(e),
                        None => Ok(()),
                    };
                    settle(outcome);
                }
                Err(e) => {
                    error!(error = %e, "Commit aborted; draft dropped");
                }
            }
        }

        debug!("Ledger writer stopped");
    }

    fn publish(&mut self, staged: Staged) {
        self.snapshot.send_replace(Arc::new(staged.next));
        self.base_consistent = staged.consistent;
        debug!(bytes = staged.bytes, "Published ledger snapshot");
    }
}

/// Verifies and saves a draft. Nothing is staged on failure.
///
/// Invariants are enforced whenever the current base satisfies them; an
/// inconsistent loaded base only relaxes the check until a commit repairs it.
fn stage(next: Snapshot, persistence: &SnapshotPersistence, enforce: bool) -> LedgerResult<Staged> {
    let consistent = match next.check_invariants() {
        Ok(()) => true,
        Err(violation) if enforce => {
            warn!(%violation, "Rejected commit");
            return Err(violation.into());
        }
        Err(violation) => {
            debug!(%violation, "Snapshot still inconsistent after commit");
            false
        }
    };

    let bytes = next.encode()?;
    if let Err(e) = persistence.save(&bytes) {
        warn!(key = %persistence.key(), error = %e, "Failed to persist snapshot; commit dropped");
        return Err(e.into());
    }

    Ok(Staged {
        next,
        consistent,
        bytes: bytes.len(),
    })
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
pub(crate) mod tests {
    use std::sync::atomic::{AtomicBool, Ordering};

    use gamestore_core::commerce::TopUpWallet;
    use gamestore_core::seed::{ADMIN_ACCOUNT_ID, DEMO_ACCOUNT_ID};
    use gamestore_core::{Money, SystemClock};

    use super::*;
    use crate::error::{StorageError, StorageResult};
    use crate::storage::{KeyValueStore, MemoryKeyValueStore};

    /// A store whose writes can be switched off.
    #[derive(Debug, Default)]
    pub(crate) struct FlakyStore {
        inner: MemoryKeyValueStore,
        pub fail_writes: AtomicBool,
    }

    impl KeyValueStore for FlakyStore {
        fn get(&self, key: &str) -> StorageResult<Option<Vec<u8>>> {
            self.inner.get(key)
        }

        fn put(&self, key: &str, value: &[u8]) -> StorageResult<()> {
            if self.fail_writes.load(Ordering::SeqCst) {
                return Err(StorageError::Unavailable("write refused".to_string()));
            }
            self.inner.put(key, value)
        }

        fn remove(&self, key: &str) -> StorageResult<()> {
            self.inner.remove(key)
        }
    }

    const KEY: &str = "gamestore-ledger-v1";

    async fn open(store: Arc<dyn KeyValueStore>) -> LedgerStore {
        LedgerStore::open(SnapshotPersistence::new(store, KEY), Arc::new(SystemClock))
            .await
            .unwrap()
    }

    fn top_up(account_id: &str, cents: i64) -> TopUpWallet {
        TopUpWallet {
            account_id: account_id.to_string(),
            amount: Money::from_cents(cents),
        }
    }

    #[tokio::test]
    async fn test_open_seeds_and_persists() {
        let kv = Arc::new(MemoryKeyValueStore::new());
        let ledger = open(kv.clone()).await;

        assert_eq!(ledger.read().catalog_items.len(), 10);
        let stored = Snapshot::decode(&kv.get(KEY).unwrap().unwrap()).unwrap();
        assert_eq!(stored, *ledger.read());
    }

    #[tokio::test]
    async fn test_open_reseeds_corrupt_document() {
        let kv = Arc::new(MemoryKeyValueStore::new());
        kv.put(KEY, b"{ definitely not json").unwrap();

        let ledger = open(kv.clone()).await;
        assert_eq!(ledger.read().accounts.len(), 2);
        assert!(Snapshot::decode(&kv.get(KEY).unwrap().unwrap()).is_ok());
    }

    #[tokio::test]
    async fn test_open_fills_empty_categories() {
        let kv = Arc::new(MemoryKeyValueStore::new());
        kv.put(KEY, br#"{"accounts":[],"categories":[]}"#).unwrap();

        let ledger = open(kv).await;
        assert_eq!(ledger.read().categories, seed::default_categories());
        assert!(ledger.read().catalog_items.is_empty());
    }

    #[tokio::test]
    async fn test_commit_persists_then_publishes() {
        let kv = Arc::new(MemoryKeyValueStore::new());
        let ledger = open(kv.clone()).await;
        let mut updates = ledger.subscribe();

        let view = ledger.apply(top_up(DEMO_ACCOUNT_ID, 1_000)).await.unwrap();
        assert_eq!(view.wallet_balance, Money::from_cents(51_000));

        assert!(updates.has_changed().unwrap());
        let published = updates.borrow_and_update().clone();
        let stored = Snapshot::decode(&kv.get(KEY).unwrap().unwrap()).unwrap();
        assert_eq!(stored, *published);

        // Reopening yields the identical snapshot.
        let reopened = open(kv).await;
        assert_eq!(*reopened.read(), *published);
    }

    #[tokio::test]
    async fn test_failed_mutator_changes_nothing() {
        let ledger = open(Arc::new(MemoryKeyValueStore::new())).await;
        let before = ledger.read();

        let err = ledger
            .commit(|draft, _ctx| {
                draft.accounts.clear();
                Err::<(), _>(LedgerError::EmptySelection)
            })
            .await
            .unwrap_err();

        assert_eq!(err, LedgerError::EmptySelection);
        assert!(Arc::ptr_eq(&before, &ledger.read()));
    }

    #[tokio::test]
    async fn test_save_failure_keeps_previous_snapshot() {
        let kv = Arc::new(FlakyStore::default());
        let ledger = open(kv.clone()).await;
        let before = ledger.read();

        kv.fail_writes.store(true, Ordering::SeqCst);
        let err = ledger.apply(top_up(DEMO_ACCOUNT_ID, 1_000)).await.unwrap_err();
        assert!(matches!(err, LedgerError::PersistenceFailure(_)));
        assert_eq!(*ledger.read(), *before);

        // The next commit builds on the last persisted snapshot.
        kv.fail_writes.store(false, Ordering::SeqCst);
        let view = ledger.apply(top_up(DEMO_ACCOUNT_ID, 1_000)).await.unwrap();
        assert_eq!(view.wallet_balance, Money::from_cents(51_000));
    }

    #[tokio::test]
    async fn test_invariant_breaking_commit_is_rejected() {
        let ledger = open(Arc::new(MemoryKeyValueStore::new())).await;

        let err = ledger
            .commit(|draft, _ctx| {
                let account = draft.require_account_mut(DEMO_ACCOUNT_ID)?;
                account.wallet_balance = Money::from_cents(-1);
                Ok(())
            })
            .await
            .unwrap_err();

        assert!(matches!(err, LedgerError::InvariantViolation(_)));
        assert_eq!(
            ledger.read().account(DEMO_ACCOUNT_ID).unwrap().wallet_balance,
            Money::from_cents(50_000)
        );
    }

    #[tokio::test]
    async fn test_oversized_top_up_keeps_writer_alive() {
        let ledger = open(Arc::new(MemoryKeyValueStore::new())).await;

        let err = ledger.apply(top_up(DEMO_ACCOUNT_ID, i64::MAX)).await.unwrap_err();
        assert!(matches!(err, LedgerError::InvalidInput(_)));
        assert_eq!(
            ledger.read().account(DEMO_ACCOUNT_ID).unwrap().wallet_balance,
            Money::from_cents(50_000)
        );

        let view = ledger.apply(top_up(ADMIN_ACCOUNT_ID, 100)).await.unwrap();
        assert_eq!(view.wallet_balance, Money::from_cents(1_000_000 + 100));
    }

    #[tokio::test]
    async fn test_panicking_mutator_keeps_writer_alive() {
        let ledger = open(Arc::new(MemoryKeyValueStore::new())).await;

        let err = ledger
            .commit(|_draft, _ctx| -> LedgerResult<()> { panic!("mutator bug") })
            .await
            .unwrap_err();
        assert_eq!(err, LedgerError::WriterClosed);

        let view = ledger.apply(top_up(DEMO_ACCOUNT_ID, 100)).await.unwrap();
        assert_eq!(view.wallet_balance, Money::from_cents(50_100));
    }

    #[tokio::test]
    async fn test_dropped_future_still_commits() {
        let ledger = open(Arc::new(MemoryKeyValueStore::new())).await;

        drop(ledger.apply(top_up(ADMIN_ACCOUNT_ID, 500)));
        // FIFO: once this completes, the dropped one has too.
        ledger.apply(top_up(ADMIN_ACCOUNT_ID, 500)).await.unwrap();

        assert_eq!(
            ledger.read().account(ADMIN_ACCOUNT_ID).unwrap().wallet_balance,
            Money::from_cents(1_000_000 + 1_000)
        );
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_commits_are_serialized() {
        let ledger = open(Arc::new(MemoryKeyValueStore::new())).await;

        let mut handles = Vec::new();
        for _ in 0..50 {
            let ledger = ledger.clone();
            handles.push(tokio::spawn(async move {
                ledger.apply(top_up(DEMO_ACCOUNT_ID, 100)).await
            }));
        }
        for handle in handles {
            handle.await.unwrap().unwrap();
        }

        let snapshot = ledger.read();
        assert_eq!(
            snapshot.account(DEMO_ACCOUNT_ID).unwrap().wallet_balance,
            Money::from_cents(50_000 + 50 * 100)
        );
        snapshot.check_invariants().unwrap();
    }

    #[tokio::test]
    async fn test_reset_restores_seed() {
        let ledger = open(Arc::new(MemoryKeyValueStore::new())).await;
        ledger.apply(top_up(DEMO_ACCOUNT_ID, 100)).await.unwrap();

        ledger.reset().await.unwrap();
        assert_eq!(
            ledger.read().account(DEMO_ACCOUNT_ID).unwrap().wallet_balance,
            Money::from_cents(50_000)
        );
    }
}
