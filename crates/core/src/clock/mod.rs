//! Beat-space clock driven by the external audio play head.
//!
//! The clock never advances on its own. Once per frame the playback
//! collaborator reports the play head through [`BeatClock::update_playhead`]
//! and every consumer queries the clock afterwards.

use crate::{config::ClockConfig, Result, TimingError};

#[derive(Debug, Clone)]
pub struct BeatClock {
    seconds_per_beat: f64,
    playback_rate: f64,
    current_seconds: f64,
    is_playing: bool,
    // The seconds -> beats mapping is linear from this anchor. Tempo and rate
    // changes move the anchor so the beat value stays continuous.
    anchor_seconds: f64,
    anchor_beat: f64,
    // Last beat observed while playing. Returned verbatim while stopped.
    held_beat: f64,
}

impl BeatClock {
    /// Creates a stopped clock at beat zero.
    pub fn new(bpm: f64) -> Result<Self> {
        Ok(Self {
            seconds_per_beat: seconds_per_beat(bpm)?,
            playback_rate: 1.0,
            current_seconds: 0.0,
            is_playing: false,
            anchor_seconds: 0.0,
            anchor_beat: 0.0,
            held_beat: 0.0,
        })
    }

    pub fn from_config(config: &ClockConfig) -> Result<Self> {
        let mut clock = Self::new(config.bpm)?;
        clock.playback_rate = sanitize_rate(config.playback_rate);
        Ok(clock)
    }

    /// Records the play head for this frame.
    ///
    /// A play head that moves backwards while playing is held at its previous
    /// value; restarting a song goes through [`BeatClock::reset`].
    pub fn update_playhead(&mut self, current_seconds: f64, playback_rate: f64, is_playing: bool) {
        let mut seconds = current_seconds;
        if !seconds.is_finite() {
            tracing::warn!(seconds, "ignoring non-finite play head reading");
            seconds = self.current_seconds;
        }
        if is_playing && self.is_playing && seconds < self.current_seconds {
            tracing::warn!(
                previous = self.current_seconds,
                seconds,
                "play head moved backwards, holding position"
            );
            seconds = self.current_seconds;
        }

        let rate = sanitize_rate(playback_rate);
        if rate != self.playback_rate {
            self.reanchor(seconds);
            self.playback_rate = rate;
        }

        self.current_seconds = seconds;
        self.is_playing = is_playing;
        if is_playing {
            self.held_beat = self.map(seconds);
        }
    }

    /// Changes the tempo without moving the current beat.
    pub fn set_tempo(&mut self, bpm: f64) -> Result<()> {
        let spb = seconds_per_beat(bpm)?;
        self.reanchor(self.current_seconds);
        self.seconds_per_beat = spb;
        Ok(())
    }

    /// Returns to beat zero for a song restart. Tempo and rate are kept.
    pub fn reset(&mut self) {
        self.current_seconds = 0.0;
        self.is_playing = false;
        self.anchor_seconds = 0.0;
        self.anchor_beat = 0.0;
        self.held_beat = 0.0;
    }

    /// Maps elapsed seconds to beats. While stopped the last played beat is
    /// returned regardless of `now_seconds`.
    pub fn beat_position(&self, now_seconds: f64) -> f64 {
        if self.is_playing {
            self.map(now_seconds)
        } else {
            self.held_beat
        }
    }

    /// Beat position at the most recent play head reading.
    pub fn current_beat(&self) -> f64 {
        self.beat_position(self.current_seconds)
    }

    /// `0` at `start_beat`, `1` at `start_beat + duration_beats`. Values past
    /// either end are returned unclamped.
    pub fn normalized_progress(&self, start_beat: f64, duration_beats: f64) -> f64 {
        (self.current_beat() - start_beat) / duration_beats
    }

    /// Edge detector for quantized beat boundaries.
    ///
    /// Returns `true` the first time the quantum index
    /// `floor((beat - phase_offset_beats) / quantum_beats)` exceeds
    /// `last_index`, storing the new index. Never fires while stopped.
    pub fn report_beat_crossing(
        &self,
        quantum_beats: f64,
        phase_offset_beats: f64,
        last_index: &mut i64,
    ) -> bool {
        if !self.is_playing || !(quantum_beats > 0.0) {
            return false;
        }

        let index = ((self.current_beat() - phase_offset_beats) / quantum_beats).floor() as i64;
        if index > *last_index {
            *last_index = index;
            true
        } else {
            false
        }
    }

    pub fn seconds_to_beats(&self, seconds: f64) -> f64 {
        seconds * self.playback_rate / self.seconds_per_beat
    }

    /// Inverse of [`BeatClock::seconds_to_beats`]. Infinite while the playback
    /// rate is zero.
    pub fn beats_to_seconds(&self, beats: f64) -> f64 {
        if self.playback_rate == 0.0 {
            return f64::INFINITY;
        }
        beats * self.seconds_per_beat / self.playback_rate
    }

    pub fn seconds_per_beat(&self) -> f64 {
        self.seconds_per_beat
    }

    pub fn bpm(&self) -> f64 {
        60.0 / self.seconds_per_beat
    }

    pub fn playback_rate(&self) -> f64 {
        self.playback_rate
    }

    pub fn current_seconds(&self) -> f64 {
        self.current_seconds
    }

    pub fn is_playing(&self) -> bool {
        self.is_playing
    }

    fn map(&self, seconds: f64) -> f64 {
        self.anchor_beat + self.seconds_to_beats(seconds - self.anchor_seconds)
    }

    fn reanchor(&mut self, seconds: f64) {
        self.anchor_beat = if self.is_playing {
            self.map(seconds)
        } else {
            self.held_beat
        };
        self.anchor_seconds = seconds;
    }
}

fn seconds_per_beat(bpm: f64) -> Result<f64> {
    if bpm.is_finite() && bpm > 0.0 {
        Ok(60.0 / bpm)
    } else {
        Err(TimingError::InvalidTempo(bpm))
    }
}

fn sanitize_rate(rate: f64) -> f64 {
    if rate.is_finite() && rate >= 0.0 {
        rate
    } else {
        tracing::warn!(rate, "invalid playback rate, treating as paused");
        0.0
    }
}
