//! # Codec Command Module
//!
//! Builds the argv for the external decoder and encoder processes that
//! make up a transcode pipeline. Decoders stream raw audio to stdout,
//! encoders read stdin and write the destination file, embedding whatever
//! tag fields the target format supports natively.
//!
//! An unknown source or target format is a configuration error
//! (`UnsupportedFormat`), never a runtime crash.

use crate::error::TransferError;
use crate::tags::TagSnapshot;
use std::path::Path;

/// Formats a decoder command is defined for.
pub fn has_decoder(format: &str) -> bool {
    matches!(format, "flac" | "mp3" | "m4a" | "wav")
}

/// Formats an encoder command is defined for.
pub fn has_encoder(format: &str) -> bool {
    matches!(format, "flac" | "mp3" | "wav")
}

/// Decoder argv for `format`, streaming decoded audio to stdout.
pub fn decoder_command(format: &str, source: &Path) -> Result<Vec<String>, TransferError> {
    let src = source.to_string_lossy().to_string();
    let argv = match format {
        "flac" => vec![
            "flac".to_string(),
            "-c".to_string(),
            "-s".to_string(),
            "-d".to_string(),
            src,
        ],
        "mp3" => vec![
            "sox".to_string(),
            src,
            "-t".to_string(),
            "wav".to_string(),
            "-".to_string(),
        ],
        "m4a" => vec![
            "ffmpeg".to_string(),
            "-i".to_string(),
            src,
            "-f".to_string(),
            "wav".to_string(),
            "-".to_string(),
        ],
        "wav" => vec!["cat".to_string(), src],
        other => return Err(TransferError::UnsupportedFormat(other.to_string())),
    };
    Ok(argv)
}

/// Encoder argv for `target`, reading audio from stdin and writing
/// `destination` with `tags` embedded where the format supports them.
pub fn encoder_command(
    target: &str,
    destination: &Path,
    tags: &TagSnapshot,
) -> Result<Vec<String>, TransferError> {
    let dest = destination.to_string_lossy().to_string();
    let comment = format!(
        "{}; Transcoded by media-transfer on {}",
        tags.comment,
        chrono::Local::now().format("%Y-%m-%d %H:%M:%S")
    );

    let argv = match target {
        "flac" => {
            // -f: the staging file is touched before the encoder runs
            let mut args: Vec<String> = ["flac", "-7", "-V", "-s", "-f", "-o"]
                .iter()
                .map(|s| s.to_string())
                .collect();
            args.push(dest);
            if let Some(artist) = &tags.artist {
                vorbis_tag(&mut args, "artist", artist);
            }
            if let Some(title) = &tags.title {
                vorbis_tag(&mut args, "title", title);
            }
            if let Some(album) = &tags.album {
                vorbis_tag(&mut args, "album", album);
            }
            if tags.track > 0 {
                vorbis_tag(&mut args, "tracknumber", &tags.track.to_string());
            }
            if let Some(year) = tags.year {
                vorbis_tag(&mut args, "date", &year.to_string());
            }
            if let Some(genre) = &tags.genre {
                vorbis_tag(&mut args, "genre", genre);
            }
            vorbis_tag(&mut args, "comment", &comment);
            if let Some(album_artist) = &tags.album_artist {
                vorbis_tag(&mut args, "albumartist", album_artist);
            }
            if let Some(disc) = tags.disc_number {
                vorbis_tag(&mut args, "discnumber", &disc.to_string());
            }
            args.push("-".to_string());
            args
        }
        "mp3" => {
            let mut args: Vec<String> = [
                "lame",
                "--quiet",
                "--preset",
                "extreme",
                "-h",
                "--add-id3v2",
                "--id3v2-only",
            ]
            .iter()
            .map(|s| s.to_string())
            .collect();
            if let Some(title) = &tags.title {
                id3_arg(&mut args, "--tt", title);
            }
            if let Some(artist) = &tags.artist {
                id3_arg(&mut args, "--ta", artist);
            }
            if let Some(album) = &tags.album {
                id3_arg(&mut args, "--tl", album);
            }
            if tags.track > 0 {
                id3_arg(&mut args, "--tn", &tags.track.to_string());
            }
            if let Some(year) = tags.year {
                id3_arg(&mut args, "--ty", &year.to_string());
            }
            if let Some(genre) = &tags.genre {
                id3_arg(&mut args, "--tg", genre);
            }
            id3_arg(&mut args, "--tc", &comment);
            if let Some(album_artist) = &tags.album_artist {
                id3_arg(&mut args, "--tv", &format!("TPE2={}", album_artist));
            }
            if let Some(disc) = tags.disc_number {
                id3_arg(&mut args, "--tv", &format!("TPOS={}", disc));
            }
            args.push("-".to_string());
            args.push(dest);
            args
        }
        "wav" => vec!["dd".to_string(), format!("of={}", dest)],
        other => return Err(TransferError::UnsupportedFormat(other.to_string())),
    };
    Ok(argv)
}

fn vorbis_tag(args: &mut Vec<String>, name: &str, value: &str) {
    args.push("-T".to_string());
    args.push(format!("{}={}", name, value));
}

fn id3_arg(args: &mut Vec<String>, flag: &str, value: &str) {
    args.push(flag.to_string());
    args.push(value.to_string());
}

#[cfg(test)]
mod tests {
    use super::*;

    fn snapshot() -> TagSnapshot {
        TagSnapshot {
            album: Some("Great Album".to_string()),
            artist: Some("The Band".to_string()),
            album_artist: Some("The Band".to_string()),
            title: Some("First Song".to_string()),
            track: 1,
            year: Some(2001),
            comment: "source note".to_string(),
            ..Default::default()
        }
    }

    #[test]
    fn unknown_formats_are_rejected() {
        assert!(decoder_command("ogg", Path::new("x.ogg")).is_err());
        assert!(encoder_command("m4a", Path::new("x.m4a"), &snapshot()).is_err());
        assert!(!has_decoder("ogg"));
        assert!(!has_encoder("m4a"));
    }

    #[test]
    fn flac_decoder_streams_to_stdout() {
        let argv = decoder_command("flac", Path::new("/in/a.flac")).unwrap();
        assert_eq!(argv, vec!["flac", "-c", "-s", "-d", "/in/a.flac"]);
    }

    #[test]
    fn wav_decoder_is_cat() {
        let argv = decoder_command("wav", Path::new("/in/a.wav")).unwrap();
        assert_eq!(argv, vec!["cat", "/in/a.wav"]);
    }

    #[test]
    fn mp3_encoder_carries_id3_fields() {
        let argv = encoder_command("mp3", Path::new("/out/x.mp3"), &snapshot()).unwrap();
        assert_eq!(argv[0], "lame");
        let joined = argv.join(" ");
        assert!(joined.contains("--tt First Song"));
        assert!(joined.contains("--tv TPE2=The Band"));
        assert!(joined.contains("--tn 1"));
        // stdin marker comes right before the destination
        assert_eq!(argv[argv.len() - 2], "-");
        assert_eq!(argv[argv.len() - 1], "/out/x.mp3");
    }

    #[test]
    fn flac_encoder_ends_with_stdin_marker() {
        let argv = encoder_command("flac", Path::new("/out/x.flac"), &snapshot()).unwrap();
        assert_eq!(argv[0], "flac");
        assert_eq!(argv.last().map(String::as_str), Some("-"));
        assert!(argv.contains(&"title=First Song".to_string()));
    }

    #[test]
    fn encoder_comment_gains_transcode_note() {
        let argv = encoder_command("mp3", Path::new("/out/x.mp3"), &snapshot()).unwrap();
        let comment = argv
            .iter()
            .position(|a| a == "--tc")
            .map(|i| argv[i + 1].clone())
            .unwrap();
        assert!(comment.starts_with("source note; Transcoded by media-transfer on "));
    }

    #[test]
    fn wav_encoder_writes_stdin_to_destination() {
        let argv = encoder_command("wav", Path::new("/out/x.wav"), &snapshot()).unwrap();
        assert_eq!(argv, vec!["dd", "of=/out/x.wav"]);
    }
}
