//! Time-synchronised lyrics
//!
//! Lyrics are either LRC (`[mm:ss.xx] text`) or plain text. Plain lines get
//! timestamps far apart so only the first line is ever highlighted.
//!
//! The follower is coupled to playback only through `Progress` events: it
//! maps the active slot's position to a line and publishes
//! `LyricLineChanged` when the highlighted line moves.

use cloude_common::events::{EngineEvent, EventBus};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::Serialize;
use std::path::{Path, PathBuf};
use tokio::sync::broadcast::error::RecvError;
use tokio::sync::broadcast::Receiver;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

/// Spacing of plain-text lines, in seconds
pub const PLAIN_LINE_SPACING: f64 = 9999.0;

static LRC_DETECT: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\[\d{1,2}:\d{2}(?:\.\d{1,2})?\]").expect("valid LRC detect pattern"));
static LRC_STAMP: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\[(\d+):(\d+(?:\.\d+)?)\]").expect("valid LRC stamp pattern"));
static ANY_TAG: Lazy<Regex> = Lazy::new(|| Regex::new(r"\[.*?\]").expect("valid tag pattern"));

/// One timed line
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LyricLine {
    pub time: f64,
    pub text: String,
}

pub fn has_lrc_timestamps(text: &str) -> bool {
    LRC_DETECT.is_match(text)
}

/// Parse LRC text
///
/// Each timestamp on a line yields its own entry with the tag-stripped
/// text. Lines with no text are dropped. Output is sorted by time, keeping
/// file order for equal times.
pub fn parse_lrc(text: &str) -> Vec<LyricLine> {
    let mut out = Vec::new();
    for line in text.lines() {
        let lyric = ANY_TAG.replace_all(line, "");
        let lyric = lyric.trim();
        if lyric.is_empty() {
            continue;
        }
        for caps in LRC_STAMP.captures_iter(line) {
            let minutes: f64 = caps[1].parse().unwrap_or(0.0);
            let seconds: f64 = caps[2].parse().unwrap_or(0.0);
            out.push(LyricLine {
                time: minutes * 60.0 + seconds,
                text: lyric.to_string(),
            });
        }
    }
    out.sort_by(|a, b| a.time.total_cmp(&b.time));
    out
}

/// Plain text: one line per non-empty trimmed line
pub fn plain_lines(text: &str) -> Vec<LyricLine> {
    text.lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .enumerate()
        .map(|(i, line)| LyricLine {
            time: i as f64 * PLAIN_LINE_SPACING,
            text: line.to_string(),
        })
        .collect()
}

/// Timed lines for any lyrics text
pub fn lines_for(text: &str) -> Vec<LyricLine> {
    if text.trim().is_empty() {
        Vec::new()
    } else if has_lrc_timestamps(text) {
        parse_lrc(text)
    } else {
        plain_lines(text)
    }
}

/// Sidecar lyrics next to an audio file (`.lrc`, then `.txt`)
pub fn load_sidecar(audio_path: &Path) -> Option<String> {
    ["lrc", "txt"]
        .iter()
        .map(|ext| audio_path.with_extension(ext))
        .find_map(|path| std::fs::read_to_string(path).ok())
        .filter(|text| !text.trim().is_empty())
}

/// Highlighted-line tracker
#[derive(Debug, Clone, Default)]
pub struct LyricsCursor {
    lines: Vec<LyricLine>,
    active: Option<usize>,
}

impl LyricsCursor {
    pub fn new(lines: Vec<LyricLine>) -> Self {
        Self {
            lines,
            active: None,
        }
    }

    pub fn lines(&self) -> &[LyricLine] {
        &self.lines
    }

    pub fn active(&self) -> Option<usize> {
        self.active
    }

    /// Move to `time`, returning the new line index only when it changed
    ///
    /// The highlighted line is the last one starting at or before `time`;
    /// before the first timestamp it is line 0.
    pub fn update(&mut self, time: f64) -> Option<usize> {
        if self.lines.is_empty() {
            return None;
        }
        let index = self
            .lines
            .partition_point(|line| time >= line.time)
            .saturating_sub(1);
        if self.active == Some(index) {
            return None;
        }
        self.active = Some(index);
        Some(index)
    }
}

/// Maps progress events to highlighted lyric lines
#[derive(Debug)]
pub struct LyricsFollower {
    cursor: LyricsCursor,
    enabled: bool,
}

impl LyricsFollower {
    pub fn new(enabled: bool) -> Self {
        Self {
            cursor: LyricsCursor::default(),
            enabled,
        }
    }

    pub fn enabled(&self) -> bool {
        self.enabled
    }

    pub fn cursor(&self) -> &LyricsCursor {
        &self.cursor
    }

    /// Replace the current lyrics
    pub fn load(&mut self, text: &str) {
        self.cursor = LyricsCursor::new(lines_for(text));
    }

    /// React to one engine event, returning an event to publish
    pub fn handle(&mut self, event: &EngineEvent) -> Option<EngineEvent> {
        match event {
            EngineEvent::TrackChanged { path, title, .. } => {
                let text = if self.enabled {
                    load_sidecar(&PathBuf::from(path)).unwrap_or_default()
                } else {
                    String::new()
                };
                self.load(&text);
                debug!("Lyrics for '{}': {} lines", title, self.cursor.lines().len());
                None
            }
            EngineEvent::AutoLyricsChanged { enabled, .. } => {
                self.enabled = *enabled;
                debug!("Lyrics follower auto-load {}", enabled);
                None
            }
            EngineEvent::Progress {
                position_seconds, ..
            } => {
                let index = self.cursor.update(*position_seconds)?;
                let text = self.cursor.lines()[index].text.clone();
                Some(EngineEvent::LyricLineChanged {
                    index,
                    text,
                    timestamp: chrono::Utc::now(),
                })
            }
            _ => None,
        }
    }

    /// Subscribe now and follow the bus on a background task
    ///
    /// The subscription is taken before returning, so events emitted right
    /// after this call are seen.
    pub fn spawn(self, events: EventBus) -> JoinHandle<()> {
        let rx = events.subscribe();
        tokio::spawn(self.follow(rx, events))
    }

    async fn follow(mut self, mut rx: Receiver<EngineEvent>, events: EventBus) {
        info!("Lyrics follower started");
        loop {
            match rx.recv().await {
                Ok(event) => {
                    if let Some(out) = self.handle(&event) {
                        events.emit_lossy(out);
                    }
                }
                Err(RecvError::Lagged(skipped)) => {
                    warn!("Lyrics follower lagged, skipped {} events", skipped);
                }
                Err(RecvError::Closed) => break,
            }
        }
        info!("Lyrics follower stopped");
    }
}
