//! # Path Resolution Module
//!
//! Pure naming logic: given the tags of a file, decide where it lives in
//! the destination tree. No I/O happens here.
//!
//! The layout produced is
//! `<base>/<album artist>/<album>/<file name>.<ext>`, every segment
//! sanitized so the result is legal on common filesystems and pleasant to
//! browse. Directory names must never end with a '.' — it breaks Windows
//! (really!).

use crate::tags::TagSnapshot;
use std::collections::HashMap;
use std::path::{Path, PathBuf};

/// Characters removed outright from every path segment.
const STRIPPED: &[char] = &[
    ',', ':', ';', ')', ']', '[', '(', '\'', '"', '@', '$', '^', '*', '<', '>', '?', '!', '=',
];

/// Cleans one path segment or file name.
///
/// Steps, in order: drop dot runs, turn path separators and whitespace
/// runs into single underscores, strip punctuation, rewrite `&` as the
/// `and` token, upper-case the first letter of every `_`- and
/// `-`-delimited word, collapse underscore runs, drop a leading dot.
/// Upper-casing touches only the first letter so the whole function is
/// idempotent. An empty result becomes `UNKNOWN`.
///
/// ```
/// use media_transfer::path_resolver::sanitize;
///
/// assert_eq!(sanitize("the good, the bad & the ugly"), "The_Good_The_Bad_And_The_Ugly");
/// assert_eq!(sanitize("..."), "UNKNOWN");
/// ```
pub fn sanitize(raw: &str) -> String {
    let no_dots: String = raw.chars().filter(|c| *c != '.').collect();

    let mut collapsed = String::with_capacity(no_dots.len());
    let mut in_separator = false;
    for c in no_dots.chars() {
        if c == '/' || c == '\\' || c.is_whitespace() {
            if !in_separator {
                collapsed.push('_');
            }
            in_separator = true;
        } else {
            collapsed.push(c);
            in_separator = false;
        }
    }

    let stripped: String = collapsed.chars().filter(|c| !STRIPPED.contains(c)).collect();

    // "a & b" is already "a_&_b" here; the pad underscores fold into the token
    let mut anded = String::with_capacity(stripped.len());
    let mut chars = stripped.chars().peekable();
    while let Some(c) = chars.next() {
        if c == '&' {
            if anded.ends_with('_') {
                anded.pop();
            }
            anded.push_str("_and_");
            if chars.peek() == Some(&'_') {
                chars.next();
            }
        } else {
            anded.push(c);
        }
    }

    let capitalized = anded
        .split('_')
        .map(|word| {
            word.split('-')
                .map(capitalize_first)
                .collect::<Vec<_>>()
                .join("-")
        })
        .collect::<Vec<_>>()
        .join("_");

    let mut cleaned = String::with_capacity(capitalized.len());
    for c in capitalized.chars() {
        if c == '_' && cleaned.ends_with('_') {
            continue;
        }
        cleaned.push(c);
    }
    let cleaned = cleaned.strip_prefix('.').unwrap_or(cleaned.as_str());

    if cleaned.is_empty() {
        "UNKNOWN".to_string()
    } else {
        cleaned.to_string()
    }
}

fn capitalize_first(word: &str) -> String {
    let mut chars = word.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().collect::<String>() + chars.as_str(),
        None => String::new(),
    }
}

/// Relative directory for an item: sanitized album artist / album.
pub fn relative_directory(tags: &TagSnapshot) -> PathBuf {
    let album_artist = tags.album_artist.as_deref().unwrap_or("");
    let album = tags.album.as_deref().unwrap_or("");
    PathBuf::from(sanitize(album_artist)).join(sanitize(album))
}

/// File name without extension. First matching rule wins:
/// disc + zero-padded track + title (skipped for single-disc albums),
/// zero-padded track + title, bare title, then the source base name.
pub fn file_name(tags: &TagSnapshot, fallback: &str) -> String {
    let multi_disc = tags.disc_total != Some(1);
    match (&tags.title, tags.disc_number) {
        (Some(title), Some(disc)) if tags.track > 0 && multi_disc => {
            format!("{}_{:02}-{}", disc, tags.track, sanitize(title))
        }
        (Some(title), _) if tags.track > 0 => {
            format!("{:02}-{}", tags.track, sanitize(title))
        }
        (Some(title), _) if !title.is_empty() => sanitize(title),
        _ => sanitize(fallback),
    }
}

/// Full destination path, extension remapped through `transcode` when the
/// source format has an entry there.
pub fn output_path(
    base_dir: &Path,
    tags: &TagSnapshot,
    fallback: &str,
    source_format: &str,
    transcode: &HashMap<String, String>,
) -> PathBuf {
    let ext = transcode
        .get(source_format)
        .map(String::as_str)
        .unwrap_or(source_format);
    let name = file_name(tags, fallback);
    let file = if ext.is_empty() {
        name
    } else {
        format!("{}.{}", name, ext)
    };
    base_dir.join(relative_directory(tags)).join(file)
}

/// Staging path: a dot-prefixed sibling of the destination, same extension.
pub fn staging_path(
    base_dir: &Path,
    tags: &TagSnapshot,
    fallback: &str,
    source_format: &str,
    transcode: &HashMap<String, String>,
) -> PathBuf {
    let ext = transcode
        .get(source_format)
        .map(String::as_str)
        .unwrap_or(source_format);
    let name = format!(".{}", file_name(tags, fallback));
    let file = if ext.is_empty() {
        name
    } else {
        format!("{}.{}", name, ext)
    };
    base_dir.join(relative_directory(tags)).join(file)
}
