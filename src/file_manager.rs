//! # File Discovery Module
//!
//! Questo modulo gestisce la discovery dei file media e qualche utilità
//! sui file.
//!
//! ## Responsabilità:
//! - Discovery ricorsiva di file audio supportati in una directory
//! - Espansione degli argomenti CLI (file singoli + directory) in una
//!   lista piatta di sorgenti
//! - Formattazione human-readable delle dimensioni
//!
//! ## Formati supportati:
//! - FLAC, MP3, M4A, WAV (dedotti dall'estensione)

use anyhow::Result;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

/// Manages file discovery and small file utilities
pub struct FileManager;

impl FileManager {
    /// Find all supported media files under a directory
    pub fn find_media_files(media_dir: &Path) -> Result<Vec<PathBuf>> {
        let mut files = Vec::new();

        for entry in WalkDir::new(media_dir)
            .into_iter()
            .filter_map(|e| e.ok())
            .filter(|e| e.file_type().is_file())
        {
            let path = entry.path();
            if Self::is_supported_format(path) {
                files.push(path.to_path_buf());
            }
        }

        Ok(files)
    }

    /// Check if a file format is supported
    pub fn is_supported_format(path: &Path) -> bool {
        if let Some(ext) = path.extension() {
            let ext_lower = ext.to_string_lossy().to_lowercase();
            matches!(ext_lower.as_str(), "flac" | "mp3" | "m4a" | "wav")
        } else {
            false
        }
    }

    /// Flattens files and directories into one list of source files;
    /// directories are walked recursively, plain files are kept as given.
    pub fn expand_sources(sources: &[PathBuf]) -> Result<Vec<PathBuf>> {
        let mut files = Vec::new();
        for source in sources {
            if source.is_dir() {
                files.extend(Self::find_media_files(source)?);
            } else if source.exists() {
                files.push(source.clone());
            } else {
                anyhow::bail!("source does not exist: {}", source.display());
            }
        }
        Ok(files)
    }

    /// Get human-readable file size
    pub fn format_size(size: u64) -> String {
        const UNITS: &[&str] = &["B", "KB", "MB", "GB", "TB"];
        let mut size = size as f64;
        let mut unit_index = 0;

        while size >= 1024.0 && unit_index < UNITS.len() - 1 {
            size /= 1024.0;
            unit_index += 1;
        }

        if unit_index == 0 {
            format!("{} {}", size as u64, UNITS[unit_index])
        } else {
            format!("{:.2} {}", size, UNITS[unit_index])
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn supported_formats_by_extension() {
        assert!(FileManager::is_supported_format(Path::new("a.flac")));
        assert!(FileManager::is_supported_format(Path::new("a.MP3")));
        assert!(FileManager::is_supported_format(Path::new("a.m4a")));
        assert!(FileManager::is_supported_format(Path::new("a.wav")));
        assert!(!FileManager::is_supported_format(Path::new("a.ogg")));
        assert!(!FileManager::is_supported_format(Path::new("noext")));
    }

    #[test]
    fn discovery_walks_subdirectories() {
        let dir = TempDir::new().unwrap();
        let nested = dir.path().join("artist/album");
        std::fs::create_dir_all(&nested).unwrap();
        std::fs::write(nested.join("one.flac"), b"x").unwrap();
        std::fs::write(nested.join("two.mp3"), b"x").unwrap();
        std::fs::write(nested.join("skip.txt"), b"x").unwrap();

        let mut files = FileManager::find_media_files(dir.path()).unwrap();
        files.sort();
        assert_eq!(files.len(), 2);
        assert!(files[0].ends_with("one.flac"));
        assert!(files[1].ends_with("two.mp3"));
    }

    #[test]
    fn expand_sources_mixes_files_and_directories() {
        let dir = TempDir::new().unwrap();
        let loose = dir.path().join("loose.wav");
        std::fs::write(&loose, b"x").unwrap();
        let sub = dir.path().join("sub");
        std::fs::create_dir(&sub).unwrap();
        std::fs::write(sub.join("inner.flac"), b"x").unwrap();

        let files =
            FileManager::expand_sources(&[loose.clone(), sub]).unwrap();
        assert_eq!(files.len(), 2);
        assert!(files.contains(&loose));
    }

    #[test]
    fn expand_sources_rejects_missing_paths() {
        assert!(FileManager::expand_sources(&[PathBuf::from("/no/such/file.flac")]).is_err());
    }

    #[test]
    fn sizes_are_human_readable() {
        assert_eq!(FileManager::format_size(512), "512 B");
        assert_eq!(FileManager::format_size(2048), "2.00 KB");
        assert_eq!(FileManager::format_size(5 * 1024 * 1024), "5.00 MB");
    }
}
