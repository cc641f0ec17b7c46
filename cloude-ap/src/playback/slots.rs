//! The two playback slots and the active-slot pointer

use crate::playback::media::MediaElement;
use cloude_common::events::SlotId;
use tracing::debug;

/// One playback element plus the library entry it holds
pub struct Slot {
    element: Box<dyn MediaElement>,
    track: Option<usize>,
}

impl Slot {
    fn new(element: Box<dyn MediaElement>) -> Self {
        Self {
            element,
            track: None,
        }
    }
}

/// Slots A and B; exactly one is active at any time
pub struct PlaybackSlots {
    a: Slot,
    b: Slot,
    active: SlotId,
}

impl PlaybackSlots {
    /// Slot A starts active
    pub fn new(a: Box<dyn MediaElement>, b: Box<dyn MediaElement>) -> Self {
        Self {
            a: Slot::new(a),
            b: Slot::new(b),
            active: SlotId::A,
        }
    }

    pub fn active_slot(&self) -> SlotId {
        self.active
    }

    pub fn inactive_slot(&self) -> SlotId {
        self.active.other()
    }

    pub fn element(&self, slot: SlotId) -> &dyn MediaElement {
        self.slot(slot).element.as_ref()
    }

    pub fn element_mut(&mut self, slot: SlotId) -> &mut dyn MediaElement {
        self.slot_mut(slot).element.as_mut()
    }

    pub fn active(&self) -> &dyn MediaElement {
        self.element(self.active)
    }

    pub fn active_mut(&mut self) -> &mut dyn MediaElement {
        let slot = self.active;
        self.element_mut(slot)
    }

    /// Library index loaded into `slot`
    pub fn track(&self, slot: SlotId) -> Option<usize> {
        self.slot(slot).track
    }

    pub fn set_track(&mut self, slot: SlotId, track: Option<usize>) {
        self.slot_mut(slot).track = track;
    }

    /// Move the active designation to `slot`, returning the previous one
    pub fn swap_to(&mut self, slot: SlotId) -> SlotId {
        let previous = self.active;
        if previous != slot {
            debug!("Active slot {} -> {}", previous, slot);
            self.active = slot;
        }
        previous
    }

    fn slot(&self, slot: SlotId) -> &Slot {
        match slot {
            SlotId::A => &self.a,
            SlotId::B => &self.b,
        }
    }

    fn slot_mut(&mut self, slot: SlotId) -> &mut Slot {
        match slot {
            SlotId::A => &mut self.a,
            SlotId::B => &mut self.b,
        }
    }
}

impl std::fmt::Debug for PlaybackSlots {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PlaybackSlots")
            .field("active", &self.active)
            .field("track_a", &self.a.track)
            .field("track_b", &self.b.track)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio::clock::ManualClock;
    use crate::playback::media::{MediaSource, SimulatedMedia};
    use std::sync::Arc;

    fn slots() -> PlaybackSlots {
        let clock = Arc::new(ManualClock::new());
        PlaybackSlots::new(
            Box::new(SimulatedMedia::new(SlotId::A, clock.clone())),
            Box::new(SimulatedMedia::new(SlotId::B, clock)),
        )
    }

    #[test]
    fn test_a_starts_active() {
        let slots = slots();
        assert_eq!(slots.active_slot(), SlotId::A);
        assert_eq!(slots.inactive_slot(), SlotId::B);
    }

    #[test]
    fn test_swap_returns_previous() {
        let mut slots = slots();
        assert_eq!(slots.swap_to(SlotId::B), SlotId::A);
        assert_eq!(slots.active_slot(), SlotId::B);
        assert_eq!(slots.swap_to(SlotId::B), SlotId::B);
        assert_eq!(slots.active_slot(), SlotId::B);
    }

    #[test]
    fn test_elements_are_independent() {
        let mut slots = slots();
        slots
            .element_mut(SlotId::B)
            .load(MediaSource::new("b.flac", 12.0));
        slots.set_track(SlotId::B, Some(4));

        assert!(!slots.active().has_source());
        assert!(slots.element(SlotId::B).has_source());
        assert_eq!(slots.track(SlotId::B), Some(4));
        assert_eq!(slots.track(SlotId::A), None);
    }
}
