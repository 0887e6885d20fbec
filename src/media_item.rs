//! # Media Item Module
//!
//! Questo modulo definisce `MediaItem`, l'unità di lavoro di un batch.
//!
//! ## Responsabilità:
//! - Identità immutabile: il path sorgente
//! - Formato contenitore dedotto dall'estensione (lower-case)
//! - Snapshot dei tag letto pigramente, UNA volta sola per item
//! - Fingerprint per la deduplicazione (hash del path sorgente)
//! - Memoizzazione dei path di destinazione per (base dir, tabella formati)
//!
//! ## Invarianti:
//! - La prima lettura dei tag vince: lo snapshot è immutabile dopo
//! - Un path di destinazione calcolato per una coppia (base dir, tabella)
//!   resta stabile per tutta la vita dell'item
//!
//! Il fingerprint è derivato dalla STRINGA del path, non dai byte del
//! file: due file identici in posizioni diverse non sono duplicati.

use crate::path_resolver;
use crate::tags::{TagSnapshot, TagStore};
use sha2::{Digest, Sha256};
use std::collections::HashMap;
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, OnceLock};
use tracing::warn;

type DestinationKey = (PathBuf, Vec<(String, String)>);

/// One source file and everything lazily derived from it.
pub struct MediaItem {
    source: PathBuf,
    name: String,
    format: String,
    force_album_artist: Option<String>,
    store: Arc<dyn TagStore>,
    tags: OnceLock<TagSnapshot>,
    fingerprint: OnceLock<String>,
    destinations: Mutex<HashMap<DestinationKey, PathBuf>>,
}

impl MediaItem {
    pub fn new(
        source: impl Into<PathBuf>,
        store: Arc<dyn TagStore>,
        force_album_artist: Option<String>,
    ) -> Self {
        let source = source.into();
        let name = source
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_default();
        let format = source
            .extension()
            .map(|e| e.to_string_lossy().to_lowercase())
            .unwrap_or_default();
        Self {
            source,
            name,
            format,
            force_album_artist,
            store,
            tags: OnceLock::new(),
            fingerprint: OnceLock::new(),
            destinations: Mutex::new(HashMap::new()),
        }
    }

    pub fn source(&self) -> &Path {
        &self.source
    }

    /// Base name of the source file, without extension.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Container format, the lower-cased source extension.
    pub fn format(&self) -> &str {
        &self.format
    }

    /// Dedup key: Sha256 of the source path string.
    pub fn fingerprint(&self) -> &str {
        self.fingerprint.get_or_init(|| {
            let mut hasher = Sha256::new();
            hasher.update(self.source.to_string_lossy().as_bytes());
            hex::encode(hasher.finalize())
        })
    }

    /// Tag snapshot, read from disk at most once. An unreadable file gets
    /// an empty snapshot so naming falls back to the source base name.
    pub fn tags(&self) -> &TagSnapshot {
        self.tags.get_or_init(|| {
            let mut snapshot = match self.store.read(&self.source) {
                Ok(snapshot) => snapshot,
                Err(e) => {
                    warn!("could not read tags from {}: {}", self.source.display(), e);
                    TagSnapshot::default()
                }
            };
            snapshot.comment = format!(
                "MediaTransfer source: {}\n{}",
                self.source.display(),
                snapshot.comment
            );
            snapshot.album_artist = self
                .force_album_artist
                .clone()
                .or_else(|| snapshot.album_artist.take())
                .or_else(|| snapshot.artist.clone());
            snapshot
        })
    }

    /// Destination path under `base_dir`, memoized per (base dir, table).
    pub fn output_path(&self, base_dir: &Path, transcode: &HashMap<String, String>) -> PathBuf {
        let key = (base_dir.to_path_buf(), Self::table_key(transcode));
        let mut cache = self.destinations.lock().expect("destination cache poisoned");
        if let Some(path) = cache.get(&key) {
            return path.clone();
        }
        let path =
            path_resolver::output_path(base_dir, self.tags(), &self.name, &self.format, transcode);
        cache.insert(key, path.clone());
        path
    }

    /// Dot-prefixed sibling of the destination used while bytes move.
    pub fn staging_path(&self, base_dir: &Path, transcode: &HashMap<String, String>) -> PathBuf {
        path_resolver::staging_path(base_dir, self.tags(), &self.name, &self.format, transcode)
    }

    fn table_key(transcode: &HashMap<String, String>) -> Vec<(String, String)> {
        let mut pairs: Vec<_> = transcode
            .iter()
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect();
        pairs.sort();
        pairs
    }
}

impl fmt::Display for MediaItem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.source.display())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::TransferError;
    use crate::tags::TagPatch;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct CountingStore {
        reads: AtomicUsize,
        snapshot: TagSnapshot,
    }

    impl CountingStore {
        fn new(snapshot: TagSnapshot) -> Self {
            Self {
                reads: AtomicUsize::new(0),
                snapshot,
            }
        }
    }

    impl TagStore for CountingStore {
        fn read(&self, _path: &Path) -> Result<TagSnapshot, TransferError> {
            self.reads.fetch_add(1, Ordering::SeqCst);
            Ok(self.snapshot.clone())
        }

        fn write(&self, _path: &Path, _patch: &TagPatch) -> Result<(), TransferError> {
            Ok(())
        }
    }

    fn band_snapshot() -> TagSnapshot {
        TagSnapshot {
            album_artist: Some("The Band".to_string()),
            album: Some("Great Album".to_string()),
            artist: Some("The Band".to_string()),
            title: Some("First Song".to_string()),
            track: 1,
            ..Default::default()
        }
    }

    #[test]
    fn format_is_lowercased_extension() {
        let store = Arc::new(CountingStore::new(TagSnapshot::default()));
        let item = MediaItem::new("/music/Artist/Song.FLAC", store, None);
        assert_eq!(item.format(), "flac");
        assert_eq!(item.name(), "Song");
    }

    #[test]
    fn fingerprint_is_stable_and_path_sensitive() {
        let store: Arc<dyn TagStore> = Arc::new(CountingStore::new(TagSnapshot::default()));
        let a = MediaItem::new("/music/a.flac", store.clone(), None);
        let b = MediaItem::new("/music/a.flac", store.clone(), None);
        let c = MediaItem::new("/other/a.flac", store, None);
        assert_eq!(a.fingerprint(), b.fingerprint());
        assert_ne!(a.fingerprint(), c.fingerprint());
        // repeated calls return the same value
        assert_eq!(a.fingerprint(), a.fingerprint());
    }

    #[test]
    fn tags_are_read_at_most_once() {
        let store = Arc::new(CountingStore::new(band_snapshot()));
        let item = MediaItem::new("/music/Artist/Song.flac", store.clone(), None);
        let _ = item.tags();
        let _ = item.tags();
        let _ = item.output_path(Path::new("/out"), &HashMap::new());
        assert_eq!(store.reads.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn comment_gains_source_prefix() {
        let mut snapshot = band_snapshot();
        snapshot.comment = "original note".to_string();
        let store = Arc::new(CountingStore::new(snapshot));
        let item = MediaItem::new("/music/Artist/Song.flac", store, None);
        assert_eq!(
            item.tags().comment,
            "MediaTransfer source: /music/Artist/Song.flac\noriginal note"
        );
    }

    #[test]
    fn forced_album_artist_wins() {
        let store = Arc::new(CountingStore::new(band_snapshot()));
        let item = MediaItem::new(
            "/music/Artist/Song.flac",
            store,
            Some("Various".to_string()),
        );
        assert_eq!(item.tags().album_artist.as_deref(), Some("Various"));
    }

    #[test]
    fn album_artist_falls_back_to_artist() {
        let mut snapshot = band_snapshot();
        snapshot.album_artist = None;
        snapshot.artist = Some("Solo Artist".to_string());
        let store = Arc::new(CountingStore::new(snapshot));
        let item = MediaItem::new("/music/Artist/Song.flac", store, None);
        assert_eq!(item.tags().album_artist.as_deref(), Some("Solo Artist"));
    }

    #[test]
    fn output_path_is_memoized_per_base_and_table() {
        let store = Arc::new(CountingStore::new(band_snapshot()));
        let item = MediaItem::new("/music/Artist/Song.flac", store, None);
        let no_remap = HashMap::new();
        let mut remap = HashMap::new();
        remap.insert("flac".to_string(), "mp3".to_string());

        let first = item.output_path(Path::new("/out"), &no_remap);
        assert_eq!(first, item.output_path(Path::new("/out"), &no_remap));
        assert_eq!(
            first,
            PathBuf::from("/out/The_Band/Great_Album/01-First_Song.flac")
        );
        assert_eq!(
            item.output_path(Path::new("/out"), &remap),
            PathBuf::from("/out/The_Band/Great_Album/01-First_Song.mp3")
        );
        assert_eq!(
            item.output_path(Path::new("/elsewhere"), &no_remap),
            PathBuf::from("/elsewhere/The_Band/Great_Album/01-First_Song.flac")
        );
    }

    #[test]
    fn staging_path_hides_the_file_name() {
        let store = Arc::new(CountingStore::new(band_snapshot()));
        let item = MediaItem::new("/music/Artist/Song.flac", store, None);
        assert_eq!(
            item.staging_path(Path::new("/out"), &HashMap::new()),
            PathBuf::from("/out/The_Band/Great_Album/.01-First_Song.flac")
        );
    }
}
