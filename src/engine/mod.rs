mod error;
mod mutations;
mod queries;
mod store;

pub use error::EngineError;
pub use mutations::LotteryReport;
pub use queries::Status;
pub use store::Store;

use std::io;
use std::path::PathBuf;

use tokio::sync::{mpsc, oneshot, Mutex, RwLock};

use crate::model::*;
use crate::wal::Wal;

// ── Group-commit WAL channel ─────────────────────────────

pub(super) enum WalCommand {
    Append {
        event: Event,
        response: oneshot::Sender<io::Result<()>>,
    },
    Compact {
        events: Vec<Event>,
        response: oneshot::Sender<io::Result<()>>,
    },
    AppendsSinceCompact {
        response: oneshot::Sender<u64>,
    },
}

/// Background task that owns the WAL and batches appends for group commit.
/// 1. Block until the first Append arrives.
/// 2. Buffer it (no fsync).
/// 3. Drain all immediately available Appends (the batch window).
/// 4. Single flush_sync for the whole batch.
/// 5. Respond to all senders.
async fn wal_writer_loop(mut wal: Wal, mut rx: mpsc::Receiver<WalCommand>) {
    while let Some(cmd) = rx.recv().await {
        match cmd {
            WalCommand::Append { event, response } => {
                let mut batch = vec![(event, response)];
                let mut deferred = None;

                loop {
                    match rx.try_recv() {
                        Ok(WalCommand::Append { event, response }) => {
                            batch.push((event, response));
                        }
                        Ok(other) => {
                            deferred = Some(other);
                            break;
                        }
                        Err(_) => break, // channel empty — flush batch
                    }
                }

                commit_batch(&mut wal, &mut batch);
                if let Some(other) = deferred {
                    handle_non_append(&mut wal, other);
                }
            }
            other => handle_non_append(&mut wal, other),
        }
    }
}

fn commit_batch(wal: &mut Wal, batch: &mut Vec<(Event, oneshot::Sender<io::Result<()>>)>) {
    metrics::histogram!(crate::observability::WAL_FLUSH_BATCH_SIZE).record(batch.len() as f64);
    let flush_start = std::time::Instant::now();
    let result = flush_batch(wal, batch);
    metrics::histogram!(crate::observability::WAL_FLUSH_DURATION_SECONDS)
        .record(flush_start.elapsed().as_secs_f64());
    for (_, tx) in batch.drain(..) {
        let r = match &result {
            Ok(()) => Ok(()),
            Err(e) => Err(io::Error::new(e.kind(), e.to_string())),
        };
        let _ = tx.send(r);
    }
}

fn flush_batch(wal: &mut Wal, batch: &[(Event, oneshot::Sender<io::Result<()>>)]) -> io::Result<()> {
    let result = batch
        .iter()
        .try_for_each(|(event, _)| wal.append_buffered(event))
        .and_then(|()| wal.flush_sync());
    if let Err(e) = &result {
        // Callers are told this batch failed, so none of it may reach disk later.
        if let Err(rollback_err) = wal.rollback() {
            tracing::error!("WAL rollback after failed batch ({e}) failed: {rollback_err}");
        }
    }
    result
}

fn handle_non_append(wal: &mut Wal, cmd: WalCommand) {
    match cmd {
        WalCommand::Compact { events, response } => {
            let result = Wal::write_compact_file(wal.path(), &events)
                .and_then(|()| wal.swap_compact_file());
            let _ = response.send(result);
        }
        WalCommand::AppendsSinceCompact { response } => {
            let _ = response.send(wal.appends_since_compact());
        }
        WalCommand::Append { .. } => unreachable!(),
    }
}

pub(crate) fn now_ms() -> Ms {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_millis() as Ms)
        .unwrap_or(0)
}

/// Clubs, rooms, pending reservations and run history behind one lock, made
/// durable through the WAL.
///
/// Writers hold the store write lock across WAL append and apply, so readers
/// never see an event that is not durable. A lottery run additionally holds
/// `run_gate` so a second concurrent trigger is refused rather than queued.
pub struct Engine {
    pub(super) store: RwLock<Store>,
    pub(super) wal_tx: mpsc::Sender<WalCommand>,
    pub(super) run_gate: Mutex<()>,
    /// Fixed shuffle seed for every run; fresh random seed per run when unset.
    pub(super) seed: Option<u64>,
}

impl Engine {
    pub fn new(wal_path: PathBuf, seed: Option<u64>) -> io::Result<Self> {
        let events = Wal::recover(&wal_path)?;
        let wal = Wal::open(&wal_path)?;
        let (wal_tx, wal_rx) = mpsc::channel(4096);
        tokio::spawn(wal_writer_loop(wal, wal_rx));

        let mut store = Store::new();
        for event in &events {
            store.apply(event);
        }
        tracing::debug!(
            events = events.len(),
            clubs = store.club_count(),
            rooms = store.room_count(),
            pending = store.pending().len(),
            runs = store.history_len(),
            "replayed WAL"
        );

        Ok(Self {
            store: RwLock::new(store),
            wal_tx,
            run_gate: Mutex::new(()),
            seed,
        })
    }

    /// Write event to WAL via the background group-commit writer.
    pub(super) async fn wal_append(&self, event: &Event) -> Result<(), EngineError> {
        let (tx, rx) = oneshot::channel();
        self.wal_tx
            .send(WalCommand::Append {
                event: event.clone(),
                response: tx,
            })
            .await
            .map_err(|_| EngineError::WalError("WAL writer shut down".into()))?;
        rx.await
            .map_err(|_| EngineError::WalError("WAL writer dropped response".into()))?
            .map_err(|e| EngineError::WalError(e.to_string()))
    }

    /// WAL-append + apply in one call. Caller holds the store write lock.
    pub(super) async fn persist_and_apply(
        &self,
        store: &mut Store,
        event: &Event,
    ) -> Result<(), EngineError> {
        self.wal_append(event).await?;
        store.apply(event);
        Ok(())
    }

    pub async fn appends_since_compact(&self) -> Result<u64, EngineError> {
        let (tx, rx) = oneshot::channel();
        self.wal_tx
            .send(WalCommand::AppendsSinceCompact { response: tx })
            .await
            .map_err(|_| EngineError::WalError("WAL writer shut down".into()))?;
        rx.await
            .map_err(|_| EngineError::WalError("WAL writer dropped response".into()))
    }

    /// Rewrite the WAL as a snapshot of the current state.
    pub async fn compact(&self) -> Result<(), EngineError> {
        // Read lock: no writer can append while the snapshot is taken and swapped.
        let store = self.store.read().await;
        let events = store.snapshot();
        let (tx, rx) = oneshot::channel();
        self.wal_tx
            .send(WalCommand::Compact {
                events,
                response: tx,
            })
            .await
            .map_err(|_| EngineError::WalError("WAL writer shut down".into()))?;
        rx.await
            .map_err(|_| EngineError::WalError("WAL writer dropped response".into()))?
            .map_err(|e| EngineError::WalError(e.to_string()))
    }
}
