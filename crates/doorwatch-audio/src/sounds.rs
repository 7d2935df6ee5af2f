//! Logical track names and the files backing them.

use doorwatch_core::Category;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Audio file extensions the sound bank will pick up, in preference order.
const AUDIO_EXTENSIONS: &[&str] = &["mp3", "wav", "ogg", "flac"];

/// The four logical tracks.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Track {
    Background,
    Friend,
    Thief,
    Delivery,
}

impl Track {
    pub const ALL: [Track; 4] = [Track::Background, Track::Friend, Track::Thief, Track::Delivery];

    /// Logical name, which is also the expected file stem in the sound
    /// directory.
    pub fn name(self) -> &'static str {
        match self {
            Track::Background => "background",
            Track::Friend => "friend",
            Track::Thief => "thief",
            Track::Delivery => "delivery",
        }
    }

    /// The one-shot track for a visitor category; `NoPerson` has none (it
    /// is backed by the background loop instead).
    pub fn for_category(category: Category) -> Option<Track> {
        match category {
            Category::Friend => Some(Track::Friend),
            Category::Thief => Some(Track::Thief),
            Category::Delivery => Some(Track::Delivery),
            Category::NoPerson => None,
        }
    }
}

#[derive(Error, Debug)]
pub enum SoundBankError {
    #[error("sound directory not found: {0}")]
    DirectoryNotFound(String),
    #[error("no sound file for track \"{track}\" in {dir} (looked for {track}.{{mp3,wav,ogg,flac}})")]
    TrackMissing { track: &'static str, dir: String },
}

/// Resolved file paths for all four tracks. Built once at startup; a
/// missing track is a startup failure.
pub struct SoundBank {
    background: PathBuf,
    friend: PathBuf,
    thief: PathBuf,
    delivery: PathBuf,
}

impl SoundBank {
    /// Resolve every track inside `dir` by file stem.
    pub fn from_dir(dir: &Path) -> Result<Self, SoundBankError> {
        if !dir.is_dir() {
            return Err(SoundBankError::DirectoryNotFound(dir.display().to_string()));
        }

        let resolve = |track: Track| -> Result<PathBuf, SoundBankError> {
            for ext in AUDIO_EXTENSIONS {
                let candidate = dir.join(format!("{}.{ext}", track.name()));
                if candidate.is_file() {
                    tracing::debug!(track = track.name(), path = %candidate.display(), "resolved track");
                    return Ok(candidate);
                }
            }
            Err(SoundBankError::TrackMissing {
                track: track.name(),
                dir: dir.display().to_string(),
            })
        };

        Ok(Self {
            background: resolve(Track::Background)?,
            friend: resolve(Track::Friend)?,
            thief: resolve(Track::Thief)?,
            delivery: resolve(Track::Delivery)?,
        })
    }

    /// Build a bank from explicit paths (no existence check).
    pub fn from_paths(background: PathBuf, friend: PathBuf, thief: PathBuf, delivery: PathBuf) -> Self {
        Self {
            background,
            friend,
            thief,
            delivery,
        }
    }

    pub fn path(&self, track: Track) -> &Path {
        match track {
            Track::Background => &self.background,
            Track::Friend => &self.friend,
            Track::Thief => &self.thief,
            Track::Delivery => &self.delivery,
        }
    }
}
