//! # Transfer Engine Module
//!
//! Questo modulo implementa il trasferimento atomico di un singolo file:
//! o la destinazione finale contiene un file completo, o non esiste. Mai
//! un file parziale visibile al nome definitivo.
//!
//! ## Sequenza per file:
//! 1. Calcolo di destinazione e path di staging (sibling dot-prefixed)
//! 2. Sotto lo stage lock condiviso del batch: destinazione già presente
//!    → `Skipped`; staging già presente → `StagingConflict` (un
//!    trasferimento precedente è morto a metà: nessuna azione
//!    distruttiva); creazione delle directory; touch dello staging per
//!    riservare il nome prima che un byte si muova
//! 3. Copia byte-per-byte oppure pipeline di transcodifica, verso staging
//! 4. Patch dei tag sul file in staging (un fallimento qui è solo un
//!    warning: il trasferimento non viene annullato)
//! 5. Rename atomico staging → destinazione (stesso volume)
//!
//! Su QUALSIASI uscita, successo o fallimento, l'artefatto di staging
//! viene rimosso.

use crate::config::TransferOptions;
use crate::error::TransferError;
use crate::media_item::MediaItem;
use crate::pipeline::TranscodePipeline;
use crate::tags::{TagPatch, TagStore};
use std::path::Path;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

/// Benign outcomes of a transfer; real failures use the error channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransferOutcome {
    /// The file now exists, complete, at its destination.
    Committed,
    /// The destination already existed; nothing was touched.
    Skipped,
}

/// Per-file copy/transcode state machine.
pub struct TransferEngine {
    options: Arc<TransferOptions>,
    tag_store: Arc<dyn TagStore>,
    pipeline: TranscodePipeline,
    /// Serializes existence checks and staging reservation across workers.
    stage_lock: Arc<Mutex<()>>,
}

impl TransferEngine {
    pub fn new(
        options: Arc<TransferOptions>,
        tag_store: Arc<dyn TagStore>,
        stage_lock: Arc<Mutex<()>>,
    ) -> Self {
        Self {
            options,
            tag_store,
            pipeline: TranscodePipeline::new(),
            stage_lock,
        }
    }

    /// Moves one item to its destination, all or nothing.
    pub async fn transfer(&self, item: &MediaItem) -> Result<TransferOutcome, TransferError> {
        let destination = item.output_path(&self.options.destination_root, &self.options.transcode);
        let staging = item.staging_path(&self.options.destination_root, &self.options.transcode);
        debug!("staging path is '{}'", staging.display());

        {
            let _guard = self.stage_lock.lock().await;
            if tokio::fs::try_exists(&destination).await? {
                info!(
                    "file has already been transferred {} => {}",
                    item.source().display(),
                    destination.display()
                );
                return Ok(TransferOutcome::Skipped);
            }
            if tokio::fs::try_exists(&staging).await? {
                warn!(
                    "a transfer already appears to be in progress for {} => {}",
                    item.source().display(),
                    staging.display()
                );
                return Err(TransferError::StagingConflict(staging));
            }
            if let Some(parent) = destination.parent() {
                debug!("creating parent directories at '{}'", parent.display());
                tokio::fs::create_dir_all(parent).await?;
            }
            // reserve the staging name before any bytes move
            tokio::fs::File::create(&staging).await?;
        }

        let result = self.fill_and_commit(item, &staging, &destination).await;
        // safety net: the staging artifact never outlives this call
        if tokio::fs::try_exists(&staging).await.unwrap_or(false) {
            let _ = tokio::fs::remove_file(&staging).await;
        }
        result
    }

    async fn fill_and_commit(
        &self,
        item: &MediaItem,
        staging: &Path,
        destination: &Path,
    ) -> Result<TransferOutcome, TransferError> {
        if let Err(e) = self.write_staged(item, staging, destination).await {
            if tokio::fs::try_exists(staging).await.unwrap_or(false) {
                let _ = tokio::fs::remove_file(staging).await;
            }
            return Err(e);
        }
        Ok(TransferOutcome::Committed)
    }

    async fn write_staged(
        &self,
        item: &MediaItem,
        staging: &Path,
        destination: &Path,
    ) -> Result<(), TransferError> {
        match self.options.transcode.get(item.format()) {
            Some(target) => {
                if target == item.format() {
                    warn!(
                        "transcoding {} to its own format '{}'",
                        item.source().display(),
                        target
                    );
                }
                self.pipeline.run(item, target, staging).await?;
            }
            None => {
                tokio::fs::copy(item.source(), staging).await?;
            }
        }
        self.apply_tags(item, staging);
        tokio::fs::rename(staging, destination).await?;
        Ok(())
    }

    /// Tag failures are reported but never roll back the transfer.
    fn apply_tags(&self, item: &MediaItem, staged: &Path) {
        let tags = item.tags();
        let patch = TagPatch {
            album_artist: self.options.force_album_artist.clone(),
            comment: Some(tags.comment.clone()),
            fallback_title: Some(
                tags.title
                    .clone()
                    .unwrap_or_else(|| item.name().replace('_', " ")),
            ),
        };
        if let Err(e) = self.tag_store.write(staged, &patch) {
            warn!("failed to write tags to {}: {}", staged.display(), e);
        }
    }
}
