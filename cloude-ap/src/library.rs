//! Local music library
//!
//! Tracks are discovered by walking a folder, then probed for tags, cover
//! art and duration. Probing never fails a scan: a file that cannot be read
//! keeps filename-derived metadata and a zero duration, which the engine
//! treats as "will not progress".

use crate::error::{Error, Result};
use crate::lyrics;
use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use lofty::prelude::*;
use lofty::probe::Probe;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::UNIX_EPOCH;
use symphonia::core::codecs::CODEC_TYPE_NULL;
use symphonia::core::formats::FormatOptions;
use symphonia::core::io::MediaSourceStream;
use symphonia::core::meta::MetadataOptions;
use symphonia::core::probe::Hint;
use tracing::{debug, info, warn};
use walkdir::WalkDir;

/// Placeholder cover used when a file carries no picture
pub const DEFAULT_ART: &str = "data:image/svg+xml;base64,PHN2ZyB4bWxucz0iaHR0cDovL3d3dy53My5vcmcvMjAwMC9zdmciIHZpZXdCb3g9IjAgMCAxIDEiPjxyZWN0IHdpZHRoPSIxIiBoZWlnaHQ9IjEiIGZpbGw9IiMyMjIiLz48L3N2Zz4=";

pub const UNKNOWN_ARTIST: &str = "Unknown Artist";
pub const UNKNOWN_ALBUM: &str = "Unknown Album";

/// Extensions picked up by the folder scan
pub const SUPPORTED_EXTENSIONS: &[&str] = &[
    "mp3", "flac", "wav", "aiff", "alac", "m4a", "aac", "ogg", "oga",
];

const LOSSLESS_EXTENSIONS: &[&str] = &["flac", "wav", "aiff", "alac"];
const HIRES_EXTENSIONS: &[&str] = &["flac", "wav"];

/// Raw tag values as read from a file
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RawTags {
    pub title: Option<String>,
    pub artist: Option<String>,
    pub album: Option<String>,
    pub picture: Option<Vec<u8>>,
}

/// File identity used to derive a stable track id
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FileStamp {
    pub size: u64,
    pub modified_ms: u64,
}

/// Normalised library entry
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrackRecord {
    pub id: String,
    pub path: PathBuf,
    pub title: String,
    pub artist: String,
    pub album: String,
    pub cover_url: String,
    pub duration_seconds: f64,
    pub lossless: bool,
    pub hires: bool,
    pub explicit: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub lyrics: Option<String>,
}

impl TrackRecord {
    /// Build a record from whatever the file yielded
    pub fn normalize(path: &Path, tags: RawTags, stamp: FileStamp, duration_seconds: f64) -> Self {
        let file_name = path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_default();
        let stem = path
            .file_stem()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_else(|| "Unknown".to_string());

        let title = non_empty(tags.title).unwrap_or_else(|| stem.trim().to_string());
        let artist = non_empty(tags.artist).unwrap_or_else(|| UNKNOWN_ARTIST.to_string());
        let album = non_empty(tags.album).unwrap_or_else(|| UNKNOWN_ALBUM.to_string());

        let low = format!("{} {}", title, artist).to_lowercase();
        let explicit = low.contains("explicit") || low.contains("[e]") || low.contains("(e)");

        let ext = path
            .extension()
            .map(|e| e.to_string_lossy().to_lowercase())
            .unwrap_or_default();
        let lossless = LOSSLESS_EXTENSIONS.contains(&ext.as_str());
        let hires = lossless && HIRES_EXTENSIONS.contains(&ext.as_str());

        let cover_url = tags
            .picture
            .as_deref()
            .map(picture_data_url)
            .unwrap_or_else(|| DEFAULT_ART.to_string());

        Self {
            id: track_id(&file_name, stamp),
            path: path.to_path_buf(),
            title,
            artist,
            album,
            cover_url,
            duration_seconds: if duration_seconds.is_finite() && duration_seconds > 0.0 {
                duration_seconds
            } else {
                0.0
            },
            lossless,
            hires,
            explicit,
            lyrics: None,
        }
    }

    /// Key grouping this track into an album
    pub fn album_key(&self) -> String {
        format!("{}__{}", self.album, self.artist)
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

/// `trk_<first 24 chars of base64(lower-cased name)>_<size>_<mtime>`
pub fn track_id(file_name: &str, stamp: FileStamp) -> String {
    let encoded = STANDARD.encode(file_name.trim().to_lowercase());
    let prefix: String = encoded.chars().take(24).collect();
    format!("trk_{}_{}_{}", prefix, stamp.size, stamp.modified_ms)
}

fn picture_data_url(data: &[u8]) -> String {
    let mime = if data.starts_with(&[0x89, b'P', b'N', b'G']) {
        "image/png"
    } else if data.starts_with(b"GIF8") {
        "image/gif"
    } else if data.len() > 12 && &data[8..12] == b"WEBP" {
        "image/webp"
    } else {
        "image/jpeg"
    };
    format!("data:{};base64,{}", mime, STANDARD.encode(data))
}

/// Tracks sharing an album and artist, in library order
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Album {
    pub key: String,
    pub album: String,
    pub artist: String,
    pub cover_url: String,
    /// Library indices
    pub tracks: Vec<usize>,
}

/// Ordered track list plus its album index
#[derive(Debug, Clone, Default)]
pub struct Library {
    tracks: Vec<TrackRecord>,
    albums: Vec<Album>,
    album_index: HashMap<String, usize>,
}

impl Library {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_tracks(tracks: Vec<TrackRecord>) -> Self {
        let mut library = Self::new();
        library.extend(tracks);
        library
    }

    /// Append tracks and rebuild albums
    pub fn extend(&mut self, tracks: impl IntoIterator<Item = TrackRecord>) -> usize {
        let before = self.tracks.len();
        self.tracks.extend(tracks);
        self.rebuild_albums();
        self.tracks.len() - before
    }

    pub fn tracks(&self) -> &[TrackRecord] {
        &self.tracks
    }

    pub fn get(&self, index: usize) -> Option<&TrackRecord> {
        self.tracks.get(index)
    }

    pub fn len(&self) -> usize {
        self.tracks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tracks.is_empty()
    }

    pub fn albums(&self) -> &[Album] {
        &self.albums
    }

    pub fn album(&self, key: &str) -> Option<&Album> {
        self.album_index.get(key).map(|&i| &self.albums[i])
    }

    fn rebuild_albums(&mut self) {
        self.albums.clear();
        self.album_index.clear();
        for (idx, track) in self.tracks.iter().enumerate() {
            let key = track.album_key();
            match self.album_index.get(&key) {
                Some(&i) => self.albums[i].tracks.push(idx),
                None => {
                    self.album_index.insert(key.clone(), self.albums.len());
                    self.albums.push(Album {
                        key,
                        album: track.album.clone(),
                        artist: track.artist.clone(),
                        cover_url: track.cover_url.clone(),
                        tracks: vec![idx],
                    });
                }
            }
        }
    }
}

/// Probe one file; never fails
pub fn probe_file(path: &Path) -> TrackRecord {
    let stamp = file_stamp(path);
    let (tags, tag_duration) = match read_tags(path) {
        Ok(found) => found,
        Err(e) => {
            debug!("No tags for {}: {}", path.display(), e);
            (RawTags::default(), 0.0)
        }
    };

    let duration = if tag_duration > 0.0 {
        tag_duration
    } else {
        probe_duration(path).unwrap_or_else(|e| {
            warn!("Could not determine duration of {}: {}", path.display(), e);
            0.0
        })
    };

    let mut record = TrackRecord::normalize(path, tags, stamp, duration);
    record.lyrics = lyrics::load_sidecar(path);
    record
}

fn file_stamp(path: &Path) -> FileStamp {
    let Ok(meta) = std::fs::metadata(path) else {
        return FileStamp::default();
    };
    let modified_ms = meta
        .modified()
        .ok()
        .and_then(|t| t.duration_since(UNIX_EPOCH).ok())
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0);
    FileStamp {
        size: meta.len(),
        modified_ms,
    }
}

fn read_tags(path: &Path) -> Result<(RawTags, f64)> {
    let tagged = Probe::open(path)
        .map_err(|e| Error::Decode(e.to_string()))?
        .read()
        .map_err(|e| Error::Decode(e.to_string()))?;

    let duration = tagged.properties().duration().as_secs_f64();
    let tags = match tagged.primary_tag().or_else(|| tagged.first_tag()) {
        Some(tag) => RawTags {
            title: tag.title().map(|s| s.to_string()),
            artist: tag.artist().map(|s| s.to_string()),
            album: tag.album().map(|s| s.to_string()),
            picture: tag.pictures().first().map(|p| p.data().to_vec()),
        },
        None => RawTags::default(),
    };
    Ok((tags, duration))
}

/// Duration from the container's frame count
pub fn probe_duration(path: &Path) -> Result<f64> {
    let file = std::fs::File::open(path)?;
    let mss = MediaSourceStream::new(Box::new(file), Default::default());

    let mut hint = Hint::new();
    if let Some(ext) = path.extension().and_then(|e| e.to_str()) {
        hint.with_extension(ext);
    }

    let probed = symphonia::default::get_probe()
        .format(&hint, mss, &FormatOptions::default(), &MetadataOptions::default())
        .map_err(|e| Error::Decode(format!("Failed to probe format: {}", e)))?;

    let track = probed
        .format
        .tracks()
        .iter()
        .find(|t| t.codec_params.codec != CODEC_TYPE_NULL)
        .ok_or_else(|| Error::Decode("No audio track found".to_string()))?;

    let params = &track.codec_params;
    match (params.n_frames, params.sample_rate) {
        (Some(frames), Some(rate)) if rate > 0 => Ok(frames as f64 / rate as f64),
        _ => Err(Error::Decode("Frame count or sample rate unknown".to_string())),
    }
}

/// Supported audio files under `root`, sorted by path
pub fn discover(root: &Path) -> Result<Vec<PathBuf>> {
    if !root.is_dir() {
        return Err(Error::Config(format!(
            "Library folder {} is not a directory",
            root.display()
        )));
    }

    let mut files: Vec<PathBuf> = WalkDir::new(root)
        .follow_links(true)
        .into_iter()
        .filter_map(|entry| match entry {
            Ok(entry) => Some(entry),
            Err(e) => {
                warn!("Skipping unreadable entry: {}", e);
                None
            }
        })
        .filter(|entry| entry.file_type().is_file())
        .map(|entry| entry.into_path())
        .filter(|path| is_supported(path))
        .collect();
    files.sort();
    Ok(files)
}

pub fn is_supported(path: &Path) -> bool {
    path.extension()
        .map(|e| e.to_string_lossy().to_lowercase())
        .map(|e| SUPPORTED_EXTENSIONS.contains(&e.as_str()))
        .unwrap_or(false)
}

/// Discover and probe every supported file under `root`
pub fn scan_folder(root: &Path) -> Result<Vec<TrackRecord>> {
    let files = discover(root)?;
    info!("Scanning {} audio files under {}", files.len(), root.display());
    let records: Vec<TrackRecord> = files.iter().map(|path| probe_file(path)).collect();
    let missing = records.iter().filter(|r| r.duration_seconds <= 0.0).count();
    if missing > 0 {
        warn!("{} files have no usable duration", missing);
    }
    Ok(records)
}
