//! # Progress Tracking Module
//!
//! Questo modulo gestisce il progress tracking del batch.
//!
//! ## Responsabilità:
//! - Progress bar visual con `indicatif` per feedback real-time
//! - Contatori condivisi del batch (`TransferStats`)
//! - Righe di dettaglio per-file: remaining / workers / complete, azione,
//!   sorgente e destinazione
//!
//! Le righe di dettaglio passano da `ProgressBar::println`, così non si
//! intrecciano mai con la barra. Il chiamante le emette mentre tiene il
//! lock di coordinamento, quindi nemmeno tra di loro.
//!
//! ## Percentuali:
//! - remaining e complete sono relative al totale del batch
//! - workers è relativa a quanto restava all'inizio dell'intervallo
//!
//! Gli snapshot servono SOLO alla visualizzazione, mai a decisioni di
//! controllo.

use indicatif::{ProgressBar, ProgressStyle};
use std::path::Path;
use std::time::Duration;

/// Shared batch counters, guarded by the coordination lock.
#[derive(Debug, Default)]
pub struct TransferStats {
    pub total: usize,
    /// First claims handed to a worker so far.
    pub claimed: usize,
    pub in_flight: usize,
    pub committed: usize,
    pub skipped: usize,
    pub failed: usize,
}

impl TransferStats {
    pub fn new(total: usize) -> Self {
        Self {
            total,
            ..Default::default()
        }
    }

    pub fn snapshot(&self) -> ProgressSnapshot {
        ProgressSnapshot {
            total: self.total,
            completed: self.claimed,
            in_flight: self.in_flight,
            failed: self.failed,
        }
    }
}

/// Display-only view of the batch counters.
#[derive(Debug, Clone, Copy)]
pub struct ProgressSnapshot {
    pub total: usize,
    pub completed: usize,
    pub in_flight: usize,
    pub failed: usize,
}

impl ProgressSnapshot {
    pub fn remaining(&self) -> usize {
        self.total.saturating_sub(self.completed)
    }
}

/// Renders the batch progress bar and the per-file detail lines.
#[derive(Clone)]
pub struct ProgressRenderer {
    bar: ProgressBar,
    detail: bool,
    width: usize,
}

impl ProgressRenderer {
    pub fn new(total: u64, detail: bool) -> Self {
        let bar = ProgressBar::new(total);

        bar.set_style(
            ProgressStyle::default_bar()
                .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} ({percent}%) {msg}")
                .unwrap()
                .progress_chars("=>-"),
        );

        bar.enable_steady_tick(Duration::from_millis(100));

        let width = total.to_string().len().max(2);
        Self { bar, detail, width }
    }

    /// Column header plus the initial all-waiting line.
    pub fn header(&self, total: usize) {
        if !self.detail {
            return;
        }
        let w = self.width;
        self.bar.println(format!(
            "{:>hw$}, {:>hw$}, {:>hw$} :: Mode",
            "Remaining",
            "Workers",
            "Complete",
            hw = w + 8
        ));
        self.bar.println(format!(
            "{:>w$} (100.0%), {:>w$} ( 0.0%), {:>w$} ( 0.0%) :: *wait*",
            total,
            0,
            0,
            w = w
        ));
    }

    /// One detail record, rendered after a file is claimed.
    pub fn record(&self, snapshot: &ProgressSnapshot, action: &str, source: &Path, destination: &Path) {
        if !self.detail {
            return;
        }
        let total = snapshot.total.max(1);
        let remaining = snapshot.remaining();
        let remaining_pct = if remaining == 0 {
            0.0
        } else {
            remaining as f64 / total as f64 * 100.0
        };
        let workers_pct = if snapshot.in_flight == 0 || remaining == 0 {
            0.0
        } else {
            snapshot.in_flight as f64 / remaining as f64 * 100.0
        };
        let complete_pct = snapshot.completed as f64 / total as f64 * 100.0;
        let w = self.width;
        self.bar.println(format!(
            "{:>w$} ({:4.1}%), {:>w$} ({:4.1}%), {:>w$} ({:4.1}%) :: *{}*\n    source file => {}\n    destination => {}",
            remaining,
            remaining_pct,
            snapshot.in_flight,
            workers_pct,
            snapshot.completed,
            complete_pct,
            action,
            source.display(),
            destination.display(),
            w = w
        ));
        self.bar.set_message(action.to_string());
    }

    /// Advances the bar by one finished job.
    pub fn tick(&self) {
        self.bar.inc(1);
    }

    /// Finish with a final message
    pub fn finish(&self, message: &str) {
        self.bar.finish_with_message(message.to_string());
    }
}
