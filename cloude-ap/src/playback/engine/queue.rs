//! Queue navigation and library-driven queue building
//!
//! **Responsibilities:**
//! - next / previous with shuffle and repeat
//! - Starting playback from the library (smart-play) or an album
//! - Appending scanned tracks

use super::core::{LoadOutcome, PlayerEngine};
use crate::error::{Error, Result};
use crate::library::TrackRecord;
use crate::playback::queue::Step;
use cloude_common::events::{EngineEvent, PlaybackState};
use tracing::{debug, info};

impl PlayerEngine {
    /// Advance to the next queue entry
    ///
    /// Returns `None` when nothing was loaded: an empty queue, or the end of
    /// a queue with repeat off, which stops playback on the active slot.
    pub fn next_song(&mut self) -> Result<Option<LoadOutcome>> {
        self.reject_if_busy()?;
        if self.queue.is_empty() {
            return Ok(None);
        }

        match self.queue.next_index(&mut self.rng) {
            Some(index) => self.load_entry(index, true, Step::Forward).map(Some),
            None => {
                info!("End of queue reached, stopping");
                self.slots.active_mut().pause();
                self.set_playback_state(PlaybackState::Paused);
                self.transition.clear_advance();
                Ok(None)
            }
        }
    }

    /// Step back through the queue
    ///
    /// With shuffle on this returns to the previously played entry while
    /// history remains. Otherwise it moves one entry back, wrapping only
    /// with repeat all.
    pub fn prev_song(&mut self) -> Result<Option<LoadOutcome>> {
        self.reject_if_busy()?;
        match self.queue.previous_index() {
            Some(index) => self.load_entry(index, true, Step::Back).map(Some),
            None => Ok(None),
        }
    }

    /// Start playback at library entry `library_index`
    ///
    /// Smart-play queues the whole library; otherwise the queue holds just
    /// this track.
    pub fn start_from_library_index(&mut self, library_index: usize) -> Result<LoadOutcome> {
        self.reject_if_busy()?;
        if library_index >= self.library.len() {
            return Err(Error::Queue(format!(
                "Library index {} out of range ({} tracks)",
                library_index,
                self.library.len()
            )));
        }

        if self.settings.playback.smart_play {
            self.replace_queue((0..self.library.len()).collect(), library_index);
        } else {
            self.replace_queue(vec![library_index], 0);
        }
        let index = self.queue.index();
        self.load_entry(index, true, Step::Forward)
    }

    /// Queue an album's tracks and play from `start`
    ///
    /// `start` is a library index that must belong to the album; `None`
    /// starts at the album's first track.
    pub fn play_album(&mut self, key: &str, start: Option<usize>) -> Result<LoadOutcome> {
        self.reject_if_busy()?;
        let tracks = self
            .library
            .album(key)
            .map(|album| album.tracks.clone())
            .ok_or_else(|| Error::Queue(format!("Unknown album '{}'", key)))?;

        let index = match start {
            Some(library_index) => tracks
                .iter()
                .position(|t| *t == library_index)
                .ok_or_else(|| {
                    cloude_common::Error::InvalidInput(format!(
                        "Library index {} is not on album '{}'",
                        library_index, key
                    ))
                })?,
            None => 0,
        };

        self.replace_queue(tracks, index);
        self.load_entry(index, true, Step::Forward)
    }

    /// Append tracks to the library
    ///
    /// When the queue was empty it becomes the whole library and the first
    /// track is cued without playing.
    pub fn add_tracks(&mut self, records: Vec<TrackRecord>) -> Result<usize> {
        let added = self.library.extend(records);
        if added == 0 {
            return Ok(0);
        }
        info!("Library now holds {} tracks ({} added)", self.library.len(), added);

        if self.queue.is_empty() {
            self.replace_queue((0..self.library.len()).collect(), 0);
            if !self.transition.is_busy() {
                self.load_entry(0, false, Step::Forward)?;
            }
        }
        Ok(added)
    }

    fn replace_queue(&mut self, entries: Vec<usize>, index: usize) {
        self.queue.replace(entries, index);
        debug!("Queue replaced: {} entries at {}", self.queue.len(), self.queue.index());
        self.emit(EngineEvent::QueueChanged {
            queue: self.queue.entries().to_vec(),
            index: self.queue.index(),
            timestamp: chrono::Utc::now(),
        });
    }

    fn reject_if_busy(&self) -> Result<()> {
        if self.transition.is_busy() {
            debug!("Request rejected: transition {} in flight", self.transition.state().name());
            return Err(Error::TransitionInFlight);
        }
        Ok(())
    }
}
