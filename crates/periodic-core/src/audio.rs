//! Audio player seam.
//!
//! The scheduler only decides which key should sound. Playing it is someone
//! else's job, and a failure there must never affect timer state.

use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use rodio::{Decoder, OutputStream, OutputStreamHandle, Sink};
use tracing::debug;

use crate::error::PlaybackError;

pub trait AudioPlayer {
    /// Start playing the sound for `key`. Fire-and-forget: returning `Ok`
    /// means playback was launched, not that it finished.
    fn play(&mut self, key: &str) -> Result<(), PlaybackError>;
}

/// Plays nothing. Used when notifications are disabled.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullPlayer;

impl AudioPlayer for NullPlayer {
    fn play(&mut self, _key: &str) -> Result<(), PlaybackError> {
        Ok(())
    }
}

/// Plays `<sound_dir>/<key>.<extension>` through the default output device.
///
/// The output stream is opened on the first sound and kept for the life of
/// the player; each sound gets its own detached sink so overlapping
/// notifications mix instead of queueing.
pub struct RodioPlayer {
    sound_dir: PathBuf,
    extension: String,
    volume: f32,
    output: Option<(OutputStream, OutputStreamHandle)>,
}

impl RodioPlayer {
    pub fn new(sound_dir: impl Into<PathBuf>, extension: impl Into<String>, volume: f32) -> Self {
        Self {
            sound_dir: sound_dir.into(),
            extension: extension.into(),
            volume: volume.clamp(0.0, 1.0),
            output: None,
        }
    }

    /// First existing sound file for `key`. A `timesup_<next>` key falls back
    /// to the plain `timesup` sound.
    pub fn sound_path(&self, key: &str) -> Result<PathBuf, PlaybackError> {
        let mut candidates = vec![key];
        if key.starts_with("timesup_") {
            candidates.push("timesup");
        }
        candidates
            .iter()
            .map(|k| self.file_for(k))
            .find(|p| p.is_file())
            .ok_or_else(|| PlaybackError::MissingSound {
                key: key.to_string(),
                path: self.file_for(key),
            })
    }

    fn file_for(&self, key: &str) -> PathBuf {
        Path::new(&self.sound_dir).join(format!("{key}.{}", self.extension))
    }

    /// Open and decode the sound for `key` without touching the output device.
    pub fn decode(&self, key: &str) -> Result<Decoder<BufReader<File>>, PlaybackError> {
        let path = self.sound_path(key)?;
        let file = File::open(&path).map_err(|source| PlaybackError::Open {
            path: path.clone(),
            source,
        })?;
        Decoder::new(BufReader::new(file)).map_err(|e| PlaybackError::Decode {
            path,
            message: e.to_string(),
        })
    }

    fn output(&mut self) -> Result<&OutputStreamHandle, PlaybackError> {
        if self.output.is_none() {
            let opened = OutputStream::try_default()
                .map_err(|e| PlaybackError::Output(e.to_string()))?;
            self.output = Some(opened);
        }
        match &self.output {
            Some((_, handle)) => Ok(handle),
            None => Err(PlaybackError::Output("output stream not open".into())),
        }
    }
}

impl AudioPlayer for RodioPlayer {
    fn play(&mut self, key: &str) -> Result<(), PlaybackError> {
        let source = self.decode(key)?;
        let volume = self.volume;
        let sink =
            Sink::try_new(self.output()?).map_err(|e| PlaybackError::Output(e.to_string()))?;
        sink.set_volume(volume);
        sink.append(source);
        sink.detach();
        debug!(key, "notification sound started");
        Ok(())
    }
}

/// Remembers every key it was asked to play. Clones share the record, so a
/// test can keep a handle after giving the player away.
#[derive(Debug, Clone, Default)]
pub struct RecordingPlayer {
    played: Arc<Mutex<Vec<String>>>,
    fail: bool,
}

impl RecordingPlayer {
    pub fn new() -> Self {
        Self::default()
    }

    /// A player that records the attempt and then reports failure.
    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Self::default()
        }
    }

    pub fn played(&self) -> Vec<String> {
        self.played.lock().map(|p| p.clone()).unwrap_or_default()
    }
}

impl AudioPlayer for RecordingPlayer {
    fn play(&mut self, key: &str) -> Result<(), PlaybackError> {
        if let Ok(mut played) = self.played.lock() {
            played.push(key.to_string());
        }
        if self.fail {
            return Err(PlaybackError::Failed(format!("refusing to play {key}")));
        }
        Ok(())
    }
}
