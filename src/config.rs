//! # Configuration Management Module
//!
//! Questo modulo gestisce tutta la configurazione di un batch di
//! trasferimento.
//!
//! ## Parametri:
//! - `destination_root`: Radice dell'albero di destinazione
//! - `force_album_artist`: Album artist forzato su ogni file (default: None)
//! - `transcode`: Tabella formato sorgente → formato target (default: vuota)
//! - `max_workers`: Numero di worker paralleli (default: 4)
//! - `show_progress`: Righe di progresso per-file (default: false)
//!
//! ## Validazione:
//! - max_workers deve essere > 0
//! - Ogni formato sorgente della tabella deve avere un decoder, ogni
//!   target un encoder
//!
//! ## Esempio:
//! ```
//! use media_transfer::TransferOptions;
//!
//! let mut options = TransferOptions {
//!     max_workers: 8,
//!     ..Default::default()
//! };
//! options.transcode.insert("flac".to_string(), "mp3".to_string());
//! options.validate().unwrap();
//! ```

use crate::codecs;
use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::PathBuf;

/// Options shared by every file of one batch run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransferOptions {
    /// Root of the destination tree
    pub destination_root: PathBuf,
    /// Album artist forced onto every transferred file
    pub force_album_artist: Option<String>,
    /// Source format -> target format remap table
    pub transcode: HashMap<String, String>,
    /// Number of parallel workers
    pub max_workers: usize,
    /// Print a per-file progress report
    pub show_progress: bool,
}

impl Default for TransferOptions {
    fn default() -> Self {
        Self {
            destination_root: PathBuf::from("."),
            force_album_artist: None,
            transcode: HashMap::new(),
            max_workers: 4,
            show_progress: false,
        }
    }
}

impl TransferOptions {
    /// Validate option values
    pub fn validate(&self) -> Result<()> {
        if self.max_workers == 0 {
            return Err(anyhow::anyhow!("number of workers must be greater than 0"));
        }

        for (from, to) in &self.transcode {
            if !codecs::has_decoder(from) {
                return Err(anyhow::anyhow!("no decoder defined for format '{}'", from));
            }
            if !codecs::has_encoder(to) {
                return Err(anyhow::anyhow!("no encoder defined for format '{}'", to));
            }
        }

        Ok(())
    }

    /// Load options from file
    pub async fn from_file(path: &PathBuf) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let content = tokio::fs::read_to_string(path).await?;
        let options: TransferOptions = serde_json::from_str(&content)?;
        options.validate()?;
        Ok(options)
    }

    /// Save options to file
    pub async fn save_to_file(&self, path: &PathBuf) -> Result<()> {
        let content = serde_json::to_string_pretty(self)?;
        tokio::fs::write(path, content).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_options_validation() {
        let mut options = TransferOptions::default();
        assert!(options.validate().is_ok());

        options.max_workers = 0;
        assert!(options.validate().is_err());

        options.max_workers = 4;
        options
            .transcode
            .insert("ogg".to_string(), "mp3".to_string());
        assert!(options.validate().is_err());

        options.transcode.clear();
        options
            .transcode
            .insert("flac".to_string(), "m4a".to_string());
        assert!(options.validate().is_err());

        options.transcode.clear();
        options
            .transcode
            .insert("flac".to_string(), "mp3".to_string());
        assert!(options.validate().is_ok());
    }

    #[test]
    fn test_options_default() {
        let options = TransferOptions::default();
        assert_eq!(options.destination_root, PathBuf::from("."));
        assert!(options.force_album_artist.is_none());
        assert!(options.transcode.is_empty());
        assert_eq!(options.max_workers, 4);
        assert!(!options.show_progress);
    }

    #[tokio::test]
    async fn test_options_save_load() {
        let temp_dir = TempDir::new().unwrap();
        let options_path = temp_dir.path().join("options.json");

        let mut original = TransferOptions {
            destination_root: PathBuf::from("/music/sorted"),
            force_album_artist: Some("Various".to_string()),
            max_workers: 8,
            show_progress: true,
            ..Default::default()
        };
        original
            .transcode
            .insert("flac".to_string(), "mp3".to_string());

        // Save options
        original.save_to_file(&options_path).await.unwrap();

        // Load options
        let loaded = TransferOptions::from_file(&options_path).await.unwrap();

        assert_eq!(loaded.destination_root, PathBuf::from("/music/sorted"));
        assert_eq!(loaded.force_album_artist.as_deref(), Some("Various"));
        assert_eq!(loaded.transcode.get("flac").map(String::as_str), Some("mp3"));
        assert_eq!(loaded.max_workers, 8);
        assert!(loaded.show_progress);
    }

    #[tokio::test]
    async fn missing_file_yields_defaults() {
        let temp_dir = TempDir::new().unwrap();
        let options = TransferOptions::from_file(&temp_dir.path().join("absent.json"))
            .await
            .unwrap();
        assert_eq!(options.max_workers, 4);
    }
}
