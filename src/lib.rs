//! # Media Transfer Library
//!
//! Questo è il modulo principale della libreria che espone tutte le API pubbliche.
//!
//! ## Responsabilità:
//! - Definisce la struttura modulare dell'applicazione
//! - Espone i tipi e le funzioni principali tramite re-exports
//! - Fornisce un'interfaccia pulita per il main.rs e per altri consumatori
//!
//! ## Architettura dei moduli:
//! - `config`: Opzioni di batch e validazione parametri
//! - `error`: Tipi di errore custom per i fallimenti per-file
//! - `tags`: Lettura/scrittura dei tag embedded (collaboratore `lofty`)
//! - `media_item`: Unità di lavoro: sorgente, tag, fingerprint, destinazioni
//! - `path_resolver`: Naming canonico e sanitizzazione dei path
//! - `codecs`: Comandi dei processi decoder/encoder esterni
//! - `pipeline`: Supervisione della coppia decoder|encoder
//! - `transfer`: Trasferimento atomico per-file via staging
//! - `dedup`: Registro first-claimant-wins dei fingerprint
//! - `progress`: Progress bar e contatori del batch
//! - `file_manager`: Discovery dei file sorgente
//! - `coordinator`: Worker pool e report aggregato
//!
//! ## Utilizzo:
//! ```no_run
//! use media_transfer::{BulkTransfer, TransferOptions};
//!
//! # async fn demo() -> anyhow::Result<()> {
//! let options = TransferOptions {
//!     destination_root: "/music/sorted".into(),
//!     max_workers: 4,
//!     ..Default::default()
//! };
//! let summary = BulkTransfer::new(vec!["/music/in/song.flac".into()], options)
//!     .run()
//!     .await?;
//! println!("{} files transferred", summary.committed);
//! # Ok(())
//! # }
//! ```

pub mod codecs;
pub mod config;
pub mod coordinator;
pub mod dedup;
pub mod error;
pub mod file_manager;
pub mod media_item;
pub mod path_resolver;
pub mod pipeline;
pub mod progress;
pub mod tags;
pub mod transfer;

pub use config::TransferOptions;
pub use coordinator::{BatchSummary, BulkTransfer, FailedTransfer};
pub use dedup::{Claim, DedupRegistry};
pub use error::TransferError;
pub use file_manager::FileManager;
pub use media_item::MediaItem;
pub use pipeline::{PipelineResult, ProcessRole, TranscodePipeline};
pub use tags::{LoftyTagStore, TagPatch, TagSnapshot, TagStore};
pub use transfer::{TransferEngine, TransferOutcome};
