//! # Error Types Module
//!
//! Questo modulo definisce tutti i tipi di errore custom dell'applicazione.
//!
//! ## Categorie di errori:
//! - `Io`: Errori di I/O (file non trovati, permessi, etc.)
//! - `UnsupportedFormat`: Nessun decoder/encoder definito per il formato
//! - `ProcessSpawn`: Avvio di un processo esterno fallito
//! - `Pipeline`: Decoder o encoder terminato con exit status non-zero
//! - `Timeout`: Pipeline di transcodifica oltre il budget di tempo
//! - `StagingConflict`: File di staging già presente (trasferimento
//!   precedente interrotto o concorrente)
//! - `Metadata`: Scrittura dei tag fallita
//! - `Validation`: Errori di validazione input
//!
//! Una destinazione già presente NON è un errore: viene riportata come
//! esito `Skipped` dal transfer engine.
//!
//! ## Vantaggi:
//! - Errori tipizzati per handling specifico per-file
//! - Integration con `anyhow` per error propagation

use crate::pipeline::{ProcessFailure, ProcessRole};
use std::path::PathBuf;
use std::time::Duration;

/// Custom error types for a single file transfer
#[derive(thiserror::Error, Debug)]
pub enum TransferError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("unsupported format '{0}': no codec command defined")]
    UnsupportedFormat(String),

    #[error("failed to spawn {role}: {source}")]
    ProcessSpawn {
        role: ProcessRole,
        #[source]
        source: std::io::Error,
    },

    #[error("transcode pipeline failed: {}", describe_failures(.0))]
    Pipeline(Vec<ProcessFailure>),

    #[error("transcode exceeded its time budget after {0:?}")]
    Timeout(Duration),

    #[error("staging file already present: {0}")]
    StagingConflict(PathBuf),

    #[error("metadata error: {0}")]
    Metadata(String),

    #[error("validation error: {0}")]
    Validation(String),
}

fn describe_failures(failures: &[ProcessFailure]) -> String {
    failures
        .iter()
        .map(|f| f.to_string())
        .collect::<Vec<_>>()
        .join(" and ")
}
