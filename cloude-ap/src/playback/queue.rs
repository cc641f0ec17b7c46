//! Play queue
//!
//! The queue is an ordered list of library indices and a cursor pointing at
//! the entry that drives the active slot. Shuffle picks a uniformly random
//! entry on every forward step; a bounded history of visited entries lets
//! "previous" walk back through a shuffled sequence.

use rand::Rng;
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;

/// Visited entries kept for stepping back
pub const HISTORY_LIMIT: usize = 100;

/// Repeat behaviour at the end of the queue and of each track
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum RepeatMode {
    #[default]
    Off,
    /// Wrap from the last entry to the first
    All,
    /// Restart the current track when it ends
    One,
}

impl RepeatMode {
    /// Off -> All -> One -> Off
    pub fn cycle(self) -> Self {
        match self {
            RepeatMode::Off => RepeatMode::All,
            RepeatMode::All => RepeatMode::One,
            RepeatMode::One => RepeatMode::Off,
        }
    }
}

/// How the cursor moved
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step {
    /// Forward through next or a direct selection; recorded in history
    Forward,
    /// Backward through previous; consumes history
    Back,
}

#[derive(Debug, Clone, Default)]
pub struct PlayQueue {
    entries: Vec<usize>,
    index: usize,
    shuffle: bool,
    repeat: RepeatMode,
    history: VecDeque<usize>,
}

impl PlayQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the contents; history is cleared
    pub fn replace(&mut self, entries: Vec<usize>, index: usize) {
        self.index = if entries.is_empty() {
            0
        } else {
            index.min(entries.len() - 1)
        };
        self.entries = entries;
        self.history.clear();
    }

    pub fn entries(&self) -> &[usize] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn index(&self) -> usize {
        self.index
    }

    /// Library index at queue position `index`
    pub fn get(&self, index: usize) -> Option<usize> {
        self.entries.get(index).copied()
    }

    /// Library index of the current entry
    pub fn current(&self) -> Option<usize> {
        self.get(self.index)
    }

    pub fn is_last(&self) -> bool {
        !self.entries.is_empty() && self.index == self.entries.len() - 1
    }

    /// True when a forward step would move to another entry
    pub fn has_next(&self) -> bool {
        self.entries.len() > 1 && !(self.repeat == RepeatMode::Off && self.is_last())
    }

    /// Position the next forward step moves to
    ///
    /// `None` for an empty queue, or at the last entry with repeat off.
    pub fn next_index<R: Rng + ?Sized>(&self, rng: &mut R) -> Option<usize> {
        if self.entries.is_empty() {
            return None;
        }
        if self.repeat == RepeatMode::Off && self.is_last() {
            return None;
        }
        if self.shuffle {
            Some(rng.gen_range(0..self.entries.len()))
        } else {
            Some((self.index + 1) % self.entries.len())
        }
    }

    /// Position a backward step moves to
    ///
    /// With shuffle on, returns the most recently visited entry. Otherwise
    /// steps back one entry, wrapping to the end only with repeat all.
    pub fn previous_index(&self) -> Option<usize> {
        if self.entries.is_empty() {
            return None;
        }
        if self.shuffle {
            if let Some(&last) = self.history.back() {
                return Some(last);
            }
        }
        if self.index > 0 {
            Some(self.index - 1)
        } else if self.repeat == RepeatMode::All {
            Some(self.entries.len() - 1)
        } else {
            Some(0)
        }
    }

    /// Move the cursor to `index`
    pub fn commit(&mut self, index: usize, step: Step) {
        if index >= self.entries.len() {
            return;
        }
        match step {
            Step::Forward => {
                if index != self.index {
                    self.history.push_back(self.index);
                    if self.history.len() > HISTORY_LIMIT {
                        self.history.pop_front();
                    }
                }
            }
            Step::Back => {
                if self.history.back() == Some(&index) {
                    self.history.pop_back();
                }
            }
        }
        self.index = index;
    }

    pub fn shuffle(&self) -> bool {
        self.shuffle
    }

    pub fn toggle_shuffle(&mut self) -> bool {
        self.shuffle = !self.shuffle;
        self.shuffle
    }

    pub fn repeat(&self) -> RepeatMode {
        self.repeat
    }

    pub fn set_repeat(&mut self, repeat: RepeatMode) {
        self.repeat = repeat;
    }

    pub fn cycle_repeat(&mut self) -> RepeatMode {
        self.repeat = self.repeat.cycle();
        self.repeat
    }

    pub fn history_len(&self) -> usize {
        self.history.len()
    }
}
