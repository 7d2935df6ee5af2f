//! Audio playback behind the `Playback` seam.
//!
//! The controller only ever starts a track, stops the current one, and
//! polls whether playback is still running; `RodioPlayer` implements that
//! surface on the default output device.

use rodio::{Decoder, OutputStream, OutputStreamHandle, Sink, Source};
use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum AudioError {
    #[error("audio output unavailable: {0}")]
    Output(#[from] rodio::StreamError),
    #[error("playback failed: {0}")]
    Play(#[from] rodio::PlayError),
    #[error("cannot open sound file {path}: {source}")]
    Open {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("cannot decode sound file {path}: {source}")]
    Decode {
        path: PathBuf,
        #[source]
        source: rodio::decoder::DecoderError,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlayMode {
    Once,
    Looping,
}

/// Playback surface as the controller sees it. One track at a time; `play`
/// replaces whatever is currently playing.
pub trait Playback {
    fn play(&mut self, path: &Path, mode: PlayMode) -> Result<(), AudioError>;
    fn stop(&mut self);
    /// Non-blocking: is the current track still audible?
    fn is_busy(&self) -> bool;
}

/// rodio-backed playback on the default output device.
///
/// Each `play` builds a fresh sink so a stopped track can never bleed
/// queue state into the next one.
pub struct RodioPlayer {
    // Dropping the stream kills the output; hold it for the player's lifetime.
    _stream: OutputStream,
    handle: OutputStreamHandle,
    sink: Option<Sink>,
}

impl RodioPlayer {
    /// Open the default audio output device.
    pub fn new() -> Result<Self, AudioError> {
        let (stream, handle) = OutputStream::try_default()?;
        Ok(Self {
            _stream: stream,
            handle,
            sink: None,
        })
    }
}

impl Playback for RodioPlayer {
    fn play(&mut self, path: &Path, mode: PlayMode) -> Result<(), AudioError> {
        self.stop();

        let file = File::open(path).map_err(|e| AudioError::Open {
            path: path.to_path_buf(),
            source: e,
        })?;
        let source = Decoder::new(BufReader::new(file)).map_err(|e| AudioError::Decode {
            path: path.to_path_buf(),
            source: e,
        })?;

        let sink = Sink::try_new(&self.handle)?;
        match mode {
            PlayMode::Once => sink.append(source),
            PlayMode::Looping => sink.append(source.repeat_infinite()),
        }

        self.sink = Some(sink);
        Ok(())
    }

    fn stop(&mut self) {
        if let Some(sink) = self.sink.take() {
            sink.stop();
        }
    }

    fn is_busy(&self) -> bool {
        self.sink.as_ref().is_some_and(|s| !s.empty())
    }
}
