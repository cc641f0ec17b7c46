//! Event types for the CloudE event system
//!
//! Provides the shared event definitions and the EventBus used by the engine,
//! the HTTP/SSE surface and the lyrics follower.

use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;

/// One of the two interchangeable playback slots
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum SlotId {
    A,
    B,
}

impl SlotId {
    /// Get the other slot
    pub fn other(&self) -> Self {
        match self {
            SlotId::A => SlotId::B,
            SlotId::B => SlotId::A,
        }
    }

    pub fn both() -> [SlotId; 2] {
        [SlotId::A, SlotId::B]
    }
}

impl std::fmt::Display for SlotId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SlotId::A => write!(f, "A"),
            SlotId::B => write!(f, "B"),
        }
    }
}

/// Playback state enumeration
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum PlaybackState {
    Playing,
    Paused,
}

impl std::fmt::Display for PlaybackState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PlaybackState::Playing => write!(f, "playing"),
            PlaybackState::Paused => write!(f, "paused"),
        }
    }
}

/// How a track change is presented
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ChangeMode {
    Crossfade,
    Instant,
}

/// CloudE event types
///
/// Events are broadcast via EventBus and can be serialized for SSE transmission.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum EngineEvent {
    /// Playback state changed (Playing ↔ Paused)
    PlaybackStateChanged {
        old_state: PlaybackState,
        new_state: PlaybackState,
        timestamp: chrono::DateTime<chrono::Utc>,
    },

    /// A track was loaded into the incoming slot
    ///
    /// Triggers:
    /// - SSE: Update title/artist/artwork
    /// - Lyrics follower: Load lyrics for `path`
    TrackChanged {
        queue_index: usize,
        track_id: String,
        title: String,
        artist: String,
        album: String,
        path: String,
        mode: ChangeMode,
        timestamp: chrono::DateTime<chrono::Utc>,
    },

    /// Position of the active slot
    ///
    /// The lyrics follower maps `position_seconds` to a highlighted line.
    Progress {
        slot: SlotId,
        position_seconds: f64,
        duration_seconds: f64,
        timestamp: chrono::DateTime<chrono::Utc>,
    },

    /// Incoming slot started playing; `crossfade` is false for hard cuts
    TransitionStarted {
        outgoing: SlotId,
        incoming: SlotId,
        crossfade: bool,
        timestamp: chrono::DateTime<chrono::Utc>,
    },

    /// Active designation moved to `active`
    TransitionCompleted {
        active: SlotId,
        timestamp: chrono::DateTime<chrono::Utc>,
    },

    /// Incoming slot refused to play; previous slot stays active
    TransitionFailed {
        slot: SlotId,
        reason: String,
        timestamp: chrono::DateTime<chrono::Utc>,
    },

    /// Environment-sound settings changed
    EffectsChanged {
        enabled: bool,
        preset: String,
        strength: u8,
        timestamp: chrono::DateTime<chrono::Utc>,
    },

    /// Queue contents replaced
    QueueChanged {
        queue: Vec<usize>,
        index: usize,
        timestamp: chrono::DateTime<chrono::Utc>,
    },

    /// Master volume changed
    VolumeChanged {
        volume: f32,
        timestamp: chrono::DateTime<chrono::Utc>,
    },

    /// Automatic lyrics loading switched on or off
    ///
    /// Takes effect from the next track change.
    AutoLyricsChanged {
        enabled: bool,
        timestamp: chrono::DateTime<chrono::Utc>,
    },

    /// Highlighted lyric line changed
    LyricLineChanged {
        index: usize,
        text: String,
        timestamp: chrono::DateTime<chrono::Utc>,
    },
}

impl EngineEvent {
    /// Event type name, used as the SSE event field
    pub fn event_type(&self) -> &'static str {
        match self {
            EngineEvent::PlaybackStateChanged { .. } => "PlaybackStateChanged",
            EngineEvent::TrackChanged { .. } => "TrackChanged",
            EngineEvent::Progress { .. } => "Progress",
            EngineEvent::TransitionStarted { .. } => "TransitionStarted",
            EngineEvent::TransitionCompleted { .. } => "TransitionCompleted",
            EngineEvent::TransitionFailed { .. } => "TransitionFailed",
            EngineEvent::EffectsChanged { .. } => "EffectsChanged",
            EngineEvent::QueueChanged { .. } => "QueueChanged",
            EngineEvent::VolumeChanged { .. } => "VolumeChanged",
            EngineEvent::AutoLyricsChanged { .. } => "AutoLyricsChanged",
            EngineEvent::LyricLineChanged { .. } => "LyricLineChanged",
        }
    }
}

// ========================================
// EventBus Implementation
// ========================================

/// Central event distribution bus
///
/// Uses `tokio::sync::broadcast`: publishing never blocks, slow subscribers
/// observe `Lagged` instead of stalling the engine.
///
/// ```
/// use cloude_common::events::{EventBus, EngineEvent};
///
/// let bus = EventBus::new(16);
/// let mut rx = bus.subscribe();
/// bus.emit_lossy(EngineEvent::VolumeChanged {
///     volume: 0.5,
///     timestamp: chrono::Utc::now(),
/// });
/// assert!(rx.try_recv().is_ok());
/// ```
#[derive(Clone)]
pub struct EventBus {
    tx: broadcast::Sender<EngineEvent>,
    capacity: usize,
}

impl EventBus {
    /// Creates a new EventBus with the given channel capacity
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity.max(1));
        Self { tx, capacity }
    }

    /// Subscribe to all future events
    pub fn subscribe(&self) -> broadcast::Receiver<EngineEvent> {
        self.tx.subscribe()
    }

    /// Emit an event, returning the number of subscribers reached
    pub fn emit(
        &self,
        event: EngineEvent,
    ) -> Result<usize, broadcast::error::SendError<EngineEvent>> {
        self.tx.send(event)
    }

    /// Emit an event, ignoring the no-subscriber case
    pub fn emit_lossy(&self, event: EngineEvent) {
        let _ = self.tx.send(event);
    }

    pub fn subscriber_count(&self) -> usize {
        self.tx.receiver_count()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }
}

impl std::fmt::Debug for EventBus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventBus")
            .field("capacity", &self.capacity)
            .field("subscribers", &self.tx.receiver_count())
            .finish()
    }
}
