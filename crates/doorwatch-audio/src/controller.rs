//! The event/audio controller.
//!
//! Tracks the visitor category across frames and decides what the speaker
//! does: loop background music while nobody is there, play the category's
//! one-shot when a visitor appears, and fall back to background once the
//! one-shot ends. Evaluated once per frame tick with an explicit timestamp
//! so the behavior is deterministic under test.

use crate::player::{AudioError, PlayMode, Playback};
use crate::sounds::{SoundBank, Track};
use doorwatch_core::Category;
use std::time::{Duration, Instant};

/// How long a category must be continuously current before its one-shot
/// starts. Zero means immediate.
#[derive(Debug, Clone, Copy, Default)]
pub struct EventDelays {
    pub friend: Duration,
    pub thief: Duration,
    pub delivery: Duration,
}

impl EventDelays {
    fn for_category(&self, category: Category) -> Duration {
        match category {
            Category::Friend => self.friend,
            Category::Thief => self.thief,
            Category::Delivery => self.delivery,
            Category::NoPerson => Duration::ZERO,
        }
    }
}

/// Audio state machine over category transitions.
///
/// Invariants: at most one track plays at a time, and every track switch
/// stops the previous one before loading the next.
pub struct AudioController<P: Playback> {
    player: P,
    sounds: SoundBank,
    delays: EventDelays,
    current_track: Option<Track>,
    last_category: Option<Category>,
    event_started: Instant,
    event_played: bool,
}

impl<P: Playback> AudioController<P> {
    /// Build the controller and start the background loop.
    pub fn start(
        player: P,
        sounds: SoundBank,
        delays: EventDelays,
        now: Instant,
    ) -> Result<Self, AudioError> {
        let mut controller = Self {
            player,
            sounds,
            delays,
            current_track: None,
            last_category: None,
            event_started: now,
            event_played: false,
        };
        controller.play(Track::Background, PlayMode::Looping)?;
        Ok(controller)
    }

    /// Advance the state machine by one frame tick.
    pub fn tick(&mut self, category: Category, now: Instant) -> Result<(), AudioError> {
        if self.last_category != Some(category) {
            tracing::debug!(
                from = ?self.last_category.map(|c| c.as_str()),
                to = category.as_str(),
                "visitor category changed"
            );
            self.last_category = Some(category);
            self.event_started = now;
            self.event_played = false;
            // Free the output immediately so the next track starts cleanly.
            self.player.stop();
        }

        match Track::for_category(category) {
            // Nobody there: keep the background loop alive.
            None => {
                if self.current_track != Some(Track::Background) || !self.player.is_busy() {
                    self.play(Track::Background, PlayMode::Looping)?;
                }
            }
            Some(track) => {
                let delay = self.delays.for_category(category);
                if !self.event_played && now.duration_since(self.event_started) >= delay {
                    self.play(track, PlayMode::Once)?;
                    self.event_played = true;
                }

                // One-shot ran out: resume background. Resetting the event
                // clock lets the same category replay its one-shot after
                // another delay period, with background audible in between.
                if self.event_played && !self.player.is_busy() {
                    self.play(Track::Background, PlayMode::Looping)?;
                    self.event_played = false;
                    self.event_started = now;
                }
            }
        }

        Ok(())
    }

    /// Stop whatever is playing (shutdown path).
    pub fn stop(&mut self) {
        self.player.stop();
    }

    pub fn current_track(&self) -> Option<Track> {
        self.current_track
    }

    fn play(&mut self, track: Track, mode: PlayMode) -> Result<(), AudioError> {
        tracing::debug!(track = track.name(), ?mode, "starting track");
        self.player.play(self.sounds.path(track), mode)?;
        self.current_track = Some(track);
        Ok(())
    }
}
