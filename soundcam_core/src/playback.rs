// Playback side of the detector. The controller trait is what the host's audio
// player implements; Playlist is a state-only model of one.

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::detector::DetectorObserver;
use crate::types::{ActionEvent, ZoneId};

/// Receives discrete playback commands. Outcomes are not reported back.
pub trait PlaybackController {
    fn on_action(&mut self, action: ZoneId);
}

/// One playlist entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Track {
    pub title: String,
    pub artist: String,
    pub url: String,
}

impl Track {
    pub fn new(
        title: impl Into<String>,
        artist: impl Into<String>,
        url: impl Into<String>,
    ) -> Self {
        Track {
            title: title.into(),
            artist: artist.into(),
            url: url.into(),
        }
    }
}

/// Track list with a cursor and a playing flag.
///
/// Next and previous wrap around. Changing track while playing keeps playing
/// the new track.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Playlist {
    tracks: Vec<Track>,
    current: usize,
    playing: bool,
}

impl Playlist {
    pub fn new(tracks: Vec<Track>) -> Self {
        Playlist {
            tracks,
            current: 0,
            playing: false,
        }
    }

    pub fn current(&self) -> Option<&Track> {
        self.tracks.get(self.current)
    }

    pub fn current_index(&self) -> usize {
        self.current
    }

    pub fn is_playing(&self) -> bool {
        self.playing
    }

    pub fn len(&self) -> usize {
        self.tracks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tracks.is_empty()
    }

    pub fn play(&mut self) {
        if !self.playing && !self.tracks.is_empty() {
            self.playing = true;
            debug!(track = self.current, "playing");
        }
    }

    pub fn pause(&mut self) {
        if self.playing {
            self.playing = false;
            debug!(track = self.current, "paused");
        }
    }

    pub fn next(&mut self) {
        if self.tracks.is_empty() {
            return;
        }
        self.current = (self.current + 1) % self.tracks.len();
    }

    pub fn previous(&mut self) {
        if self.tracks.is_empty() {
            return;
        }
        self.current = (self.current + self.tracks.len() - 1) % self.tracks.len();
    }

    /// The current track finished: move on to the next.
    pub fn track_ended(&mut self) {
        self.next();
    }
}

impl PlaybackController for Playlist {
    fn on_action(&mut self, action: ZoneId) {
        match action {
            ZoneId::Previous => self.previous(),
            ZoneId::Next => self.next(),
            ZoneId::Play => self.play(),
            ZoneId::Pause => self.pause(),
        }
    }
}

impl DetectorObserver for Playlist {
    fn on_action(&mut self, event: ActionEvent) {
        PlaybackController::on_action(self, event.zone);
    }
}

/// `m:ss`. Non-finite or negative input renders as `0:00`.
pub fn format_time(seconds: f64) -> String {
    if !seconds.is_finite() || seconds < 0.0 {
        return "0:00".to_string();
    }
    let total = seconds.floor() as u64;
    format!("{}:{:02}", total / 60, total % 60)
}
