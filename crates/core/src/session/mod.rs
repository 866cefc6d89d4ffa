//! Per-frame orchestration of the clock, the scheduler and input routing.

use crate::{
    clock::BeatClock,
    config::AppConfig,
    input::{InputEvent, InputSource, SignalKind},
    scheduler::JudgmentScheduler,
    window::{Callbacks, JudgmentEvent, WindowId},
    Result,
};

/// Everything that happened during one frame.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FrameReport {
    pub beat: f64,
    pub judgments: Vec<JudgmentEvent>,
    /// Inputs that resolved nothing: no window matched, or a repeated
    /// boundary input landed on a window whose edge already fired.
    pub dropped: Vec<InputEvent>,
}

/// One gameplay session: a beat clock plus the scheduler judging against it.
///
/// Gameplay objects receive the session (or its clock) explicitly instead of
/// reaching for a global conductor.
#[derive(Debug)]
pub struct Session {
    clock: BeatClock,
    scheduler: JudgmentScheduler,
}

impl Session {
    pub fn new(config: &AppConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            clock: BeatClock::from_config(&config.clock)?,
            scheduler: JudgmentScheduler::with_config(&config.judgment),
        })
    }

    /// Runs one frame: the clock advances first, then expired windows time
    /// out, then each polled input is routed in arrival order.
    pub fn advance(
        &mut self,
        current_seconds: f64,
        playback_rate: f64,
        is_playing: bool,
        input: &mut dyn InputSource,
    ) -> FrameReport {
        self.clock.update_playhead(current_seconds, playback_rate, is_playing);
        let beat = self.clock.current_beat();

        let mut report = FrameReport {
            beat,
            judgments: self.scheduler.tick(beat),
            dropped: Vec::new(),
        };

        for event in input.poll(beat) {
            match self.scheduler.submit_input(event) {
                Some(judgment) => report.judgments.push(judgment),
                None => report.dropped.push(event),
            }
        }

        report
    }

    pub fn schedule(
        &mut self,
        start_beat: f64,
        duration_beats: f64,
        accepted: SignalKind,
        callbacks: Callbacks,
    ) -> Result<WindowId> {
        self.scheduler.schedule(start_beat, duration_beats, accepted, callbacks)
    }

    pub fn cancel(&mut self, id: WindowId) -> bool {
        self.scheduler.cancel(id)
    }

    pub fn set_tempo(&mut self, bpm: f64) -> Result<()> {
        self.clock.set_tempo(bpm)
    }

    /// Song restart: back to beat zero with no open windows.
    pub fn restart(&mut self) {
        self.clock.reset();
        self.scheduler.clear();
    }

    pub fn clock(&self) -> &BeatClock {
        &self.clock
    }

    pub fn scheduler(&self) -> &JudgmentScheduler {
        &self.scheduler
    }

    pub fn beat_position(&self, now_seconds: f64) -> f64 {
        self.clock.beat_position(now_seconds)
    }

    pub fn normalized_progress(&self, start_beat: f64, duration_beats: f64) -> f64 {
        self.clock.normalized_progress(start_beat, duration_beats)
    }
}
