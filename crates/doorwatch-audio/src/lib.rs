//! doorwatch-audio — Sound bank, playback, and the event/audio controller.

pub mod controller;
pub mod player;
pub mod sounds;

pub use controller::{AudioController, EventDelays};
pub use player::{AudioError, PlayMode, Playback, RodioPlayer};
pub use sounds::{SoundBank, SoundBankError, Track};
