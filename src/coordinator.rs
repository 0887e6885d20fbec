//! # Batch Coordinator Module
//!
//! Questo è il modulo che orchestra un intero batch di trasferimenti.
//!
//! ## Flusso di esecuzione:
//! 1. **Inizializzazione**: Validazione opzioni, costruzione dei MediaItem
//! 2. **Queue**: La coda viene popolata COMPLETAMENTE prima che i worker
//!    partano; nessun re-enqueue dinamico
//! 3. **Worker pool**: Con `max_workers <= 1` si procede in sequenza
//!    nell'ordine di input; altrimenti partono esattamente `max_workers`
//!    worker che drenano la coda con pop non bloccante e terminano quando
//!    la osservano vuota
//! 4. **Claim**: Ogni worker registra il fingerprint nel registro dedup;
//!    solo il primo claim procede al trasferimento fisico
//! 5. **Isolamento**: Un trasferimento fallito viene catturato al bordo
//!    del worker e registrato; non ferma né il worker né gli altri
//! 6. **Report**: Conteggi, durata, throughput, gruppi di duplicati e
//!    lista dei falliti
//!
//! ## Gestione concorrenza:
//! - UN solo lock di coordinamento protegge registro dedup, contatori,
//!   lista dei falliti e output di progresso: nessuna riga si intreccia
//! - Nessuno stato globale: tutto è costruito per-batch e muore con lui
//!
//! ## Esempio:
//! ```no_run
//! use media_transfer::{BulkTransfer, TransferOptions};
//!
//! # async fn demo() -> anyhow::Result<()> {
//! let options = TransferOptions {
//!     destination_root: "/music/sorted".into(),
//!     ..Default::default()
//! };
//! let summary = BulkTransfer::new(vec!["/music/in/song.flac".into()], options)
//!     .run()
//!     .await?;
//! println!("{} transferred", summary.committed);
//! # Ok(())
//! # }
//! ```

use crate::config::TransferOptions;
use crate::dedup::{Claim, DedupRegistry};
use crate::media_item::MediaItem;
use crate::progress::{ProgressRenderer, TransferStats};
use crate::tags::{LoftyTagStore, TagStore};
use crate::transfer::{TransferEngine, TransferOutcome};
use anyhow::Result;
use std::collections::VecDeque;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};
use tracing::{debug, error, info};

/// One file the batch could not transfer.
#[derive(Debug, Clone)]
pub struct FailedTransfer {
    pub source: PathBuf,
    pub error: String,
}

/// Aggregate outcome of one batch run.
#[derive(Debug)]
pub struct BatchSummary {
    pub total: usize,
    pub committed: usize,
    pub skipped: usize,
    pub failed: Vec<FailedTransfer>,
    pub duplicates: Vec<(String, Vec<Claim>)>,
    pub elapsed: Duration,
    /// Committed items per second.
    pub throughput: f64,
}

/// State behind the single coordination lock.
struct BatchState {
    stats: TransferStats,
    registry: DedupRegistry,
    failed: Vec<FailedTransfer>,
}

/// Everything a worker needs, shared once per batch.
struct BatchContext {
    options: TransferOptions,
    engine: TransferEngine,
    state: Mutex<BatchState>,
    progress: ProgressRenderer,
}

/// Main batch coordinator
pub struct BulkTransfer {
    items: Vec<Arc<MediaItem>>,
    options: TransferOptions,
    tag_store: Arc<dyn TagStore>,
}

impl BulkTransfer {
    /// Create a coordinator over `sources` with the default tag store.
    pub fn new(sources: Vec<PathBuf>, options: TransferOptions) -> Self {
        Self::with_tag_store(sources, options, Arc::new(LoftyTagStore::new()))
    }

    /// Same, with a caller-provided tag store.
    pub fn with_tag_store(
        sources: Vec<PathBuf>,
        options: TransferOptions,
        tag_store: Arc<dyn TagStore>,
    ) -> Self {
        let items = sources
            .into_iter()
            .map(|source| {
                Arc::new(MediaItem::new(
                    source,
                    tag_store.clone(),
                    options.force_album_artist.clone(),
                ))
            })
            .collect();
        Self {
            items,
            options,
            tag_store,
        }
    }

    /// Runs the whole batch. Per-file failures never escape: they end up
    /// in the summary.
    pub async fn run(&self) -> Result<BatchSummary> {
        self.options.validate()?;
        let started = Instant::now();
        let total = self.items.len();
        info!(
            "starting transfer of {} files to {}",
            total,
            self.options.destination_root.display()
        );
        if let Some(album_artist) = &self.options.force_album_artist {
            info!("🎯 Forcing album artist: {}", album_artist);
        }
        for (from, to) in &self.options.transcode {
            info!("🎛 Transcoding {} => {}", from, to);
        }

        let progress = ProgressRenderer::new(total as u64, self.options.show_progress);
        progress.header(total);

        let ctx = Arc::new(BatchContext {
            engine: TransferEngine::new(
                Arc::new(self.options.clone()),
                self.tag_store.clone(),
                Arc::new(tokio::sync::Mutex::new(())),
            ),
            options: self.options.clone(),
            state: Mutex::new(BatchState {
                stats: TransferStats::new(total),
                registry: DedupRegistry::new(),
                failed: Vec::new(),
            }),
            progress,
        });

        if self.options.max_workers <= 1 {
            for item in &self.items {
                Self::process_one(&ctx, item.clone()).await;
            }
        } else {
            let queue: Arc<Mutex<VecDeque<Arc<MediaItem>>>> =
                Arc::new(Mutex::new(self.items.iter().cloned().collect()));
            let mut workers = Vec::new();
            for _ in 0..self.options.max_workers {
                let ctx = ctx.clone();
                let queue = queue.clone();
                workers.push(tokio::spawn(async move {
                    // drain until the queue is observed empty, then exit
                    loop {
                        let next = queue.lock().expect("job queue poisoned").pop_front();
                        match next {
                            Some(item) => Self::process_one(&ctx, item).await,
                            None => break,
                        }
                    }
                }));
            }
            for outcome in futures::future::join_all(workers).await {
                if let Err(e) = outcome {
                    error!("worker aborted: {}", e);
                }
            }
        }

        let elapsed = started.elapsed();
        let summary = {
            let state = ctx.state.lock().expect("coordination lock poisoned");
            BatchSummary {
                total,
                committed: state.stats.committed,
                skipped: state.stats.skipped,
                failed: state.failed.clone(),
                duplicates: state.registry.duplicates(),
                elapsed,
                throughput: state.stats.committed as f64 / elapsed.as_secs_f64().max(f64::EPSILON),
            }
        };

        ctx.progress.finish(&format!(
            "Transferred: {} | Skipped: {} | Failed: {}",
            summary.committed,
            summary.skipped,
            summary.failed.len()
        ));
        self.report(&summary);
        Ok(summary)
    }

    /// One job, claim to completion. Never panics, never propagates.
    async fn process_one(ctx: &BatchContext, item: Arc<MediaItem>) {
        let destination = item.output_path(&ctx.options.destination_root, &ctx.options.transcode);

        {
            let mut state = ctx.state.lock().expect("coordination lock poisoned");
            let first = state.registry.claim(
                item.fingerprint(),
                Claim {
                    source: item.source().to_path_buf(),
                    destination: destination.clone(),
                },
            );
            if !first {
                debug!("duplicate source recorded, not transferred: {}", item);
                ctx.progress.tick();
                return;
            }
            state.stats.claimed += 1;
            state.stats.in_flight += 1;
            let action = if destination.exists() {
                "already exists"
            } else if ctx.options.transcode.contains_key(item.format()) {
                "transcode"
            } else {
                "copy"
            };
            ctx.progress
                .record(&state.stats.snapshot(), action, item.source(), &destination);
        }

        let result = ctx.engine.transfer(&item).await;

        {
            let mut state = ctx.state.lock().expect("coordination lock poisoned");
            state.stats.in_flight -= 1;
            match result {
                Ok(TransferOutcome::Committed) => state.stats.committed += 1,
                Ok(TransferOutcome::Skipped) => state.stats.skipped += 1,
                Err(e) => {
                    error!("failed to transfer {}: {}", item, e);
                    state.stats.failed += 1;
                    state.failed.push(FailedTransfer {
                        source: item.source().to_path_buf(),
                        error: e.to_string(),
                    });
                }
            }
            ctx.progress.tick();
        }
    }

    fn report(&self, summary: &BatchSummary) {
        info!(
            "✅ Transferred {} files in {} (~{:.2} files/second)",
            summary.committed,
            format_duration(summary.elapsed),
            summary.throughput
        );
        if !summary.duplicates.is_empty() {
            info!("duplicate sources detected:");
            for (fingerprint, claims) in &summary.duplicates {
                info!("  {}:", fingerprint);
                for claim in claims {
                    info!(
                        "    {} => {}",
                        claim.source.display(),
                        claim.destination.display()
                    );
                }
            }
        }
        if !summary.failed.is_empty() {
            error!("❌ Some files failed to transfer:");
            for failed in &summary.failed {
                error!("  {}: {}", failed.source.display(), failed.error);
            }
        }
    }
}

fn format_duration(duration: Duration) -> String {
    let secs = duration.as_secs();
    format!("{}:{:02}:{:02}", secs / 3600, (secs % 3600) / 60, secs % 60)
}
