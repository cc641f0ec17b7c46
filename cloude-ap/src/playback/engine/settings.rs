//! Effects and playback-mode setters
//!
//! Effects changes only rewrite parameter values on the existing chain;
//! the chain is built on first enable and never torn down. Every setter
//! writes the settings through the store.

use super::core::PlayerEngine;
use crate::error::Result;
use crate::playback::effects::{Preset, StageValues};
use crate::playback::queue::RepeatMode;
use crate::playback::transition::TransitionState;
use cloude_common::config::{EffectsSettings, PlaybackModes, PlayerSettings};
use cloude_common::events::EngineEvent;
use cloude_common::FadeCurve;
use tracing::{debug, info};

impl PlayerEngine {
    pub fn settings(&self) -> &PlayerSettings {
        &self.settings
    }

    pub fn effects_settings(&self) -> &EffectsSettings {
        &self.settings.effects
    }

    pub fn playback_modes(&self) -> &PlaybackModes {
        &self.settings.playback
    }

    /// Values the effects stages should hold for the current settings
    pub fn stage_values(&self) -> StageValues {
        StageValues::compute(&self.settings.effects)
    }

    /// Turn the effects chain on or off
    ///
    /// Reroutes the active slot, and the incoming one too while a track
    /// change is in flight, so both halves of a crossfade share a path.
    pub fn set_effects_enabled(&mut self, enabled: bool) -> Result<()> {
        self.settings.effects.enabled = enabled;
        if enabled {
            self.ensure_graph()?;
        }
        self.apply_effects()?;

        let active = self.slots.active_slot();
        let route = self.route(active)?;
        if let TransitionState::Transitioning { incoming, .. } = self.transition.state() {
            if incoming != active {
                self.route(incoming)?;
            }
        }
        info!("Effects {} (slot {} {:?})", if enabled { "on" } else { "off" }, active, route);
        Ok(())
    }

    /// Select a preset by name; unknown names select studio
    pub fn set_preset(&mut self, name: &str) -> Result<Preset> {
        let preset = Preset::from_name(name);
        self.settings.effects.preset = preset.name().to_string();
        self.apply_effects()?;
        Ok(preset)
    }

    pub fn set_strength(&mut self, strength: u8) -> Result<()> {
        self.settings.effects.strength = strength.min(100);
        self.apply_effects()
    }

    pub fn set_separation(&mut self, separation: bool) -> Result<()> {
        self.settings.effects.separation = separation;
        self.apply_effects()
    }

    pub fn set_bass(&mut self, bass_db: i8) -> Result<()> {
        self.settings.effects.bass_db = bass_db.clamp(-12, 12);
        self.apply_effects()
    }

    pub fn set_clarity(&mut self, clarity_db: i8) -> Result<()> {
        self.settings.effects.clarity_db = clarity_db.clamp(-12, 12);
        self.apply_effects()
    }

    /// Recompute stage values and write them into the chain, if built
    fn apply_effects(&mut self) -> Result<()> {
        let values = StageValues::compute(&self.settings.effects);
        if let Some(effects) = &self.effects {
            effects.apply(&mut self.graph, &values)?;
            debug!("Effects stages updated: {:?}", values);
        }

        let effects = &self.settings.effects;
        self.emit(EngineEvent::EffectsChanged {
            enabled: effects.enabled,
            preset: effects.preset.clone(),
            strength: effects.strength,
            timestamp: chrono::Utc::now(),
        });
        self.persist();
        Ok(())
    }

    /// Crossfade on disables gapless
    pub fn set_crossfade(&mut self, enabled: bool) {
        self.settings.playback.crossfade = enabled;
        if enabled {
            self.settings.playback.gapless = false;
        }
        self.modes_changed();
    }

    /// Gapless on disables crossfade
    pub fn set_gapless(&mut self, enabled: bool) {
        self.settings.playback.gapless = enabled;
        if enabled {
            self.settings.playback.crossfade = false;
        }
        self.modes_changed();
    }

    pub fn set_smart_play(&mut self, enabled: bool) {
        self.settings.playback.smart_play = enabled;
        self.modes_changed();
    }

    /// Load sidecar lyrics automatically on track changes
    pub fn set_auto_lyrics(&mut self, enabled: bool) {
        if self.settings.auto_lyrics == enabled {
            return;
        }
        self.settings.auto_lyrics = enabled;
        debug!("Auto lyrics {}", enabled);
        self.emit(EngineEvent::AutoLyricsChanged {
            enabled,
            timestamp: chrono::Utc::now(),
        });
        self.persist();
    }

    pub fn set_fade_curve(&mut self, curve: FadeCurve) {
        self.settings.playback.fade_curve = curve;
        self.scheduler.set_curve(curve);
        self.modes_changed();
    }

    /// Crossfade duration for the next track change
    pub fn set_crossfade_seconds(&mut self, seconds: f64) -> Result<()> {
        if !seconds.is_finite() || seconds <= 0.0 {
            return Err(cloude_common::Error::InvalidInput(format!(
                "crossfade duration must be positive, got {}",
                seconds
            ))
            .into());
        }
        self.settings.playback.crossfade_seconds = seconds;
        self.scheduler.set_duration(seconds);
        self.modes_changed();
        Ok(())
    }

    pub fn toggle_shuffle(&mut self) -> bool {
        let shuffle = self.queue.toggle_shuffle();
        debug!("Shuffle {}", shuffle);
        shuffle
    }

    /// Off -> All -> One -> Off
    pub fn cycle_repeat(&mut self) -> RepeatMode {
        let repeat = self.queue.cycle_repeat();
        debug!("Repeat {:?}", repeat);
        repeat
    }

    pub fn set_repeat(&mut self, repeat: RepeatMode) {
        self.queue.set_repeat(repeat);
    }

    fn modes_changed(&mut self) {
        let modes = &self.settings.playback;
        debug!(
            "Modes: crossfade {} ({:.1}s {}), gapless {}, smart-play {}",
            modes.crossfade,
            modes.crossfade_seconds,
            modes.fade_curve.as_str(),
            modes.gapless,
            modes.smart_play
        );
        self.persist();
    }
}
