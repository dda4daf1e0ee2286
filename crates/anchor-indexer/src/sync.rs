//! Stream synchronizer: backfill and tail loop.
//!
//! The synchronizer is generic over three seams so the loop logic is
//! testable without a ledger node or a database: the ledger client, the
//! log processor, and the checkpoint store. Entries are always applied in
//! global `(block_number, log_index)` order across both sources, and the
//! checkpoint only advances after every entry of a batch has been
//! attempted. Per-entry failures are logged with the transaction
//! reference and skipped; transport failures abort the loop.

use tokio::sync::mpsc;

use anchor_db::DbError;
use anchor_types::{Address, RawLog};

use crate::processors::ProcessError;
use crate::rpc::{LedgerClient, TransportError};

/// Result of processing one raw log entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    /// The entry decoded to a known event and was applied.
    Applied,
    /// The entry came from an unwatched address; nothing to do.
    Irrelevant,
}

/// Applies one raw log entry to the index.
#[allow(async_fn_in_trait)]
pub trait LogProcessor {
    /// Decode and apply one entry.
    async fn process(&self, raw: &RawLog) -> Result<Outcome, ProcessError>;
}

/// Durable record of the highest fully attempted block.
#[allow(async_fn_in_trait)]
pub trait Checkpoints {
    /// Last fully attempted block, 0 if none.
    async fn read(&self) -> Result<u64, DbError>;
    /// Record `block` as fully attempted. Must never regress.
    async fn advance(&self, block: u64) -> Result<(), DbError>;
}

/// Database-backed checkpoint, a thin wrapper over the `indexer_state`
/// row.
#[derive(Clone)]
pub struct PgCheckpoints {
    pool: sqlx::PgPool,
}

impl PgCheckpoints {
    /// Create a checkpoint store over the given pool.
    pub const fn new(pool: sqlx::PgPool) -> Self {
        Self { pool }
    }
}

impl Checkpoints for PgCheckpoints {
    async fn read(&self) -> Result<u64, DbError> {
        anchor_db::CheckpointStore::new(&self.pool).read().await
    }

    async fn advance(&self, block: u64) -> Result<(), DbError> {
        anchor_db::CheckpointStore::new(&self.pool)
            .advance(block)
            .await
    }
}

/// Errors that abort the synchronizer.
#[derive(Debug, thiserror::Error)]
pub enum SyncError {
    /// The ledger node is unreachable or misbehaving.
    #[error("transport failure: {0}")]
    Transport(#[from] TransportError),

    /// The checkpoint could not be read or advanced.
    #[error("checkpoint failure: {0}")]
    Checkpoint(#[from] DbError),
}

/// Sort entries into global processing order. Cross-source ordering by
/// `(block_number, log_index)` is what makes replays deterministic.
pub fn sort_logs(logs: &mut [RawLog]) {
    logs.sort_by_key(|log| (log.block_number, log.log_index));
}

/// Pulls logs from the ledger and applies them through the processor.
pub struct Synchronizer<C, P, K> {
    client: C,
    processor: P,
    checkpoints: K,
    sources: [Address; 2],
}

impl<C, P, K> Synchronizer<C, P, K>
where
    C: LedgerClient,
    P: LogProcessor,
    K: Checkpoints,
{
    /// Create a synchronizer watching the two source addresses.
    pub const fn new(client: C, processor: P, checkpoints: K, sources: [Address; 2]) -> Self {
        Self {
            client,
            processor,
            checkpoints,
            sources,
        }
    }

    /// Catch up from the stored checkpoint to the current head, then
    /// return the head block number.
    ///
    /// # Errors
    ///
    /// Returns [`SyncError`] on transport or checkpoint failures.
    pub async fn backfill(&self) -> Result<u64, SyncError> {
        let checkpoint = self.checkpoints.read().await?;
        let head = self.client.block_number().await?;

        if head <= checkpoint {
            tracing::info!(checkpoint, head, "index already at head, nothing to backfill");
            return Ok(head);
        }

        let from = checkpoint.saturating_add(1);
        tracing::info!(from, to = head, "backfilling");
        self.process_range(from, head).await?;
        self.checkpoints.advance(head).await?;
        tracing::info!(head, "backfill complete");
        Ok(head)
    }

    /// Fetch and apply one block's entries, then advance the checkpoint.
    ///
    /// # Errors
    ///
    /// Returns [`SyncError`] on transport or checkpoint failures.
    pub async fn process_block(&self, block: u64) -> Result<(), SyncError> {
        self.process_range(block, block).await?;
        self.checkpoints.advance(block).await?;
        Ok(())
    }

    /// Consume head notifications until the channel closes or shutdown
    /// fires. Blocks at or below the stored checkpoint are skipped, so a
    /// watcher started from an older head cannot cause reprocessing.
    ///
    /// # Errors
    ///
    /// Returns [`SyncError`] on transport or checkpoint failures.
    pub async fn run(
        &self,
        mut heads: mpsc::Receiver<u64>,
        shutdown: impl Future<Output = ()>,
    ) -> Result<(), SyncError> {
        let mut checkpoint = self.checkpoints.read().await?;
        tokio::pin!(shutdown);

        loop {
            tokio::select! {
                () = &mut shutdown => {
                    tracing::info!(checkpoint, "shutdown requested, stopping tail loop");
                    return Ok(());
                }
                head = heads.recv() => {
                    let Some(block) = head else {
                        tracing::info!(checkpoint, "head stream closed, stopping tail loop");
                        return Ok(());
                    };
                    if block <= checkpoint {
                        continue;
                    }
                    self.process_block(block).await?;
                    checkpoint = block;
                    tracing::debug!(block, "block indexed");
                }
            }
        }
    }

    /// Fetch both sources' logs for the range, order them globally, and
    /// apply each with per-entry fault isolation.
    async fn process_range(&self, from: u64, to: u64) -> Result<(), SyncError> {
        let mut logs = Vec::new();
        for address in self.sources {
            logs.extend(self.client.get_logs(address, from, to).await?);
        }
        sort_logs(&mut logs);

        for log in &logs {
            match self.processor.process(log).await {
                Ok(Outcome::Applied | Outcome::Irrelevant) => {}
                Err(error) => {
                    tracing::warn!(
                        tx_hash = %log.tx_hash,
                        log_index = log.log_index,
                        block = log.block_number,
                        %error,
                        "entry failed, skipping"
                    );
                }
            }
        }
        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicU64, Ordering};

    use anchor_types::Hash32;

    const SOURCE_A: Address = Address::new([0xaa; 20]);
    const SOURCE_B: Address = Address::new([0xbb; 20]);

    fn raw(address: Address, block: u64, log_index: u64) -> RawLog {
        RawLog {
            address,
            topics: Vec::new(),
            data: Vec::new(),
            block_number: block,
            log_index,
            tx_hash: Hash32::from_u64(block * 1_000 + log_index),
        }
    }

    struct FakeClient {
        head: u64,
        logs: Vec<RawLog>,
    }

    impl LedgerClient for FakeClient {
        async fn block_number(&self) -> Result<u64, TransportError> {
            Ok(self.head)
        }

        async fn get_logs(
            &self,
            address: Address,
            from: u64,
            to: u64,
        ) -> Result<Vec<RawLog>, TransportError> {
            Ok(self
                .logs
                .iter()
                .filter(|log| {
                    log.address == address && log.block_number >= from && log.block_number <= to
                })
                .cloned()
                .collect())
        }
    }

    /// Records processing order; fails entries whose tx hash is listed.
    struct RecordingProcessor {
        seen: Mutex<Vec<(u64, u64)>>,
        failing: Vec<Hash32>,
    }

    impl RecordingProcessor {
        fn new() -> Self {
            Self {
                seen: Mutex::new(Vec::new()),
                failing: Vec::new(),
            }
        }
    }

    impl LogProcessor for RecordingProcessor {
        async fn process(&self, raw: &RawLog) -> Result<Outcome, ProcessError> {
            if self.failing.contains(&raw.tx_hash) {
                return Err(ProcessError::UnknownAgreement {
                    agreement_id: anchor_types::AgreementId::new(0),
                });
            }
            self.seen
                .lock()
                .unwrap()
                .push((raw.block_number, raw.log_index));
            Ok(Outcome::Applied)
        }
    }

    struct MemCheckpoints {
        block: AtomicU64,
    }

    impl MemCheckpoints {
        const fn new(block: u64) -> Self {
            Self {
                block: AtomicU64::new(block),
            }
        }
    }

    impl Checkpoints for MemCheckpoints {
        async fn read(&self) -> Result<u64, DbError> {
            Ok(self.block.load(Ordering::SeqCst))
        }

        async fn advance(&self, block: u64) -> Result<(), DbError> {
            self.block.fetch_max(block, Ordering::SeqCst);
            Ok(())
        }
    }

    fn build(
        head: u64,
        checkpoint: u64,
        logs: Vec<RawLog>,
    ) -> Synchronizer<FakeClient, RecordingProcessor, MemCheckpoints> {
        Synchronizer::new(
            FakeClient { head, logs },
            RecordingProcessor::new(),
            MemCheckpoints::new(checkpoint),
            [SOURCE_A, SOURCE_B],
        )
    }

    #[test]
    fn sorting_is_by_block_then_log_index() {
        let mut logs = vec![
            raw(SOURCE_A, 5, 1),
            raw(SOURCE_B, 3, 7),
            raw(SOURCE_A, 3, 2),
            raw(SOURCE_B, 4, 0),
        ];
        sort_logs(&mut logs);

        let order: Vec<(u64, u64)> = logs
            .iter()
            .map(|log| (log.block_number, log.log_index))
            .collect();
        assert_eq!(order, vec![(3, 2), (3, 7), (4, 0), (5, 1)]);
    }

    #[tokio::test]
    async fn backfill_processes_both_sources_in_global_order() {
        // Source B's entry in block 2 must land between A's entries even
        // though A's logs are fetched first.
        let logs = vec![
            raw(SOURCE_A, 1, 0),
            raw(SOURCE_A, 3, 0),
            raw(SOURCE_B, 2, 0),
            raw(SOURCE_B, 3, 1),
        ];
        let sync = build(3, 0, logs);

        let head = sync.backfill().await.unwrap();
        assert_eq!(head, 3);
        assert_eq!(sync.checkpoints.read().await.unwrap(), 3);

        let seen = sync.processor.seen.lock().unwrap().clone();
        assert_eq!(seen, vec![(1, 0), (2, 0), (3, 0), (3, 1)]);
    }

    #[tokio::test]
    async fn backfill_starts_after_the_checkpoint() {
        let logs = vec![raw(SOURCE_A, 1, 0), raw(SOURCE_A, 2, 0)];
        let sync = build(2, 1, logs);

        sync.backfill().await.unwrap();

        let seen = sync.processor.seen.lock().unwrap().clone();
        assert_eq!(seen, vec![(2, 0)], "block 1 is already indexed");
    }

    #[tokio::test]
    async fn backfill_at_head_is_a_no_op() {
        let sync = build(5, 5, vec![raw(SOURCE_A, 5, 0)]);

        let head = sync.backfill().await.unwrap();
        assert_eq!(head, 5);
        assert!(sync.processor.seen.lock().unwrap().is_empty());
        assert_eq!(sync.checkpoints.read().await.unwrap(), 5);
    }

    #[tokio::test]
    async fn entry_failure_does_not_abort_the_batch() {
        let logs = vec![raw(SOURCE_A, 1, 0), raw(SOURCE_A, 1, 1), raw(SOURCE_A, 2, 0)];
        let mut sync = build(2, 0, logs);
        sync.processor.failing = vec![Hash32::from_u64(1_001)];

        sync.backfill().await.unwrap();

        let seen = sync.processor.seen.lock().unwrap().clone();
        assert_eq!(seen, vec![(1, 0), (2, 0)], "failed entry is skipped");
        assert_eq!(
            sync.checkpoints.read().await.unwrap(),
            2,
            "checkpoint still advances after the batch was attempted"
        );
    }

    #[tokio::test]
    async fn tail_loop_skips_stale_heads_and_stops_on_close() {
        let logs = vec![raw(SOURCE_A, 3, 0), raw(SOURCE_A, 4, 0)];
        let sync = build(4, 3, logs);

        let (tx, rx) = mpsc::channel(8);
        tx.send(2).await.unwrap(); // below checkpoint, skipped
        tx.send(3).await.unwrap(); // at checkpoint, skipped
        tx.send(4).await.unwrap();
        drop(tx);

        sync.run(rx, std::future::pending()).await.unwrap();

        let seen = sync.processor.seen.lock().unwrap().clone();
        assert_eq!(seen, vec![(4, 0)]);
        assert_eq!(sync.checkpoints.read().await.unwrap(), 4);
    }

    #[tokio::test]
    async fn tail_loop_honors_shutdown() {
        let sync = build(10, 0, Vec::new());
        let (_tx, rx) = mpsc::channel::<u64>(1);

        sync.run(rx, std::future::ready(())).await.unwrap();
        assert!(sync.processor.seen.lock().unwrap().is_empty());
    }
}
