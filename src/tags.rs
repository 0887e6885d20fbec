//! # Tag Store Module
//!
//! Questo modulo incapsula tutta la lettura e scrittura dei tag embedded
//! nei file audio.
//!
//! ## Responsabilità:
//! - Definisce `TagSnapshot`, la fotografia immutabile dei tag di un file
//! - Definisce il trait `TagStore`, il punto di estensione per i test
//! - Fornisce `LoftyTagStore`, l'implementazione di default basata su `lofty`
//!
//! ## Semantica di scrittura:
//! - L'album artist forzato sovrascrive sempre quello esistente
//! - Il commento viene sempre riscritto
//! - Il titolo di fallback viene applicato SOLO se il file non ha già un
//!   titolo non vuoto
//!
//! La scrittura è idempotente: applicare la stessa patch due volte produce
//! lo stesso file.

use crate::error::TransferError;
use lofty::{Accessor, ItemKey, Tag, TagExt, TaggedFileExt};
use std::path::Path;

/// Tags read from a media file. Absent fields stay `None` (track: 0).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TagSnapshot {
    pub album: Option<String>,
    pub artist: Option<String>,
    pub album_artist: Option<String>,
    pub title: Option<String>,
    pub genre: Option<String>,
    pub year: Option<u32>,
    pub track: u32,
    pub disc_number: Option<u32>,
    pub disc_total: Option<u32>,
    pub comment: String,
}

/// Fields applied to an already-staged file just before commit.
#[derive(Debug, Clone, Default)]
pub struct TagPatch {
    /// Overrides the album artist unconditionally when set.
    pub album_artist: Option<String>,
    /// Replaces the comment field when set.
    pub comment: Option<String>,
    /// Written as the title only when the file has no non-empty title.
    pub fallback_title: Option<String>,
}

/// Reads and writes embedded tags. Implementations must be cheap to share
/// across workers.
pub trait TagStore: Send + Sync {
    fn read(&self, path: &Path) -> Result<TagSnapshot, TransferError>;
    fn write(&self, path: &Path, patch: &TagPatch) -> Result<(), TransferError>;
}

/// Tag store backed by the lofty library
pub struct LoftyTagStore;

impl LoftyTagStore {
    pub fn new() -> Self {
        Self
    }

    fn text(value: Option<std::borrow::Cow<'_, str>>) -> Option<String> {
        value
            .map(|s| s.to_string())
            .filter(|s| !s.is_empty())
    }
}

impl Default for LoftyTagStore {
    fn default() -> Self {
        Self::new()
    }
}

impl TagStore for LoftyTagStore {
    fn read(&self, path: &Path) -> Result<TagSnapshot, TransferError> {
        let tagged = lofty::read_from_path(path)
            .map_err(|e| TransferError::Metadata(format!("{}: {}", path.display(), e)))?;

        let mut snapshot = TagSnapshot::default();
        // Prefer the format's primary tag, fall back to whichever exists.
        if let Some(tag) = tagged.primary_tag().or_else(|| tagged.first_tag()) {
            snapshot.album = Self::text(tag.album());
            snapshot.artist = Self::text(tag.artist());
            snapshot.title = Self::text(tag.title());
            snapshot.genre = Self::text(tag.genre());
            snapshot.comment = Self::text(tag.comment()).unwrap_or_default();
            snapshot.year = tag.year();
            snapshot.track = tag.track().unwrap_or(0);
            snapshot.disc_number = tag.disk();
            snapshot.disc_total = tag.disk_total();
            snapshot.album_artist = tag
                .get_string(&ItemKey::AlbumArtist)
                .map(str::to_string)
                .filter(|s| !s.is_empty());
        }
        Ok(snapshot)
    }

    fn write(&self, path: &Path, patch: &TagPatch) -> Result<(), TransferError> {
        let mut tagged = lofty::read_from_path(path)
            .map_err(|e| TransferError::Metadata(format!("{}: {}", path.display(), e)))?;

        let tag_type = tagged.primary_tag_type();
        if tagged.primary_tag().is_none() {
            tagged.insert_tag(Tag::new(tag_type));
        }
        let tag = match tagged.primary_tag_mut() {
            Some(tag) => tag,
            None => {
                return Err(TransferError::Metadata(format!(
                    "no writable tag for {}",
                    path.display()
                )))
            }
        };

        if let Some(album_artist) = &patch.album_artist {
            tag.insert_text(ItemKey::AlbumArtist, album_artist.clone());
        }
        if let Some(comment) = &patch.comment {
            tag.set_comment(comment.clone());
        }
        if let Some(title) = &patch.fallback_title {
            let has_title = tag.title().map(|t| !t.is_empty()).unwrap_or(false);
            if !has_title {
                tag.set_title(title.clone());
            }
        }

        tag.save_to_path(path)
            .map_err(|e| TransferError::Metadata(format!("{}: {}", path.display(), e)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn read_nonexistent_file_returns_error() {
        let store = LoftyTagStore::new();
        let result = store.read(Path::new("/nonexistent/file.flac"));
        assert!(result.is_err());
    }

    #[test]
    fn write_nonexistent_file_returns_error() {
        let store = LoftyTagStore::new();
        let patch = TagPatch {
            comment: Some("test".to_string()),
            ..Default::default()
        };
        assert!(store.write(Path::new("/nonexistent/file.mp3"), &patch).is_err());
    }

    #[test]
    fn snapshot_defaults_are_empty() {
        let snapshot = TagSnapshot::default();
        assert_eq!(snapshot.track, 0);
        assert!(snapshot.title.is_none());
        assert!(snapshot.comment.is_empty());
    }
}
