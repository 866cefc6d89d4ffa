//! Beat-quantized repeating steps (marching, bouncing, metronome ticks).

use crate::{clock::BeatClock, Result, TimingError};

/// Fires once per quantized boundary `anchor + k * interval`, reporting a
/// gap-free step index starting at zero.
#[derive(Debug, Clone)]
pub struct PeriodicBeatTrigger {
    anchor_beat: f64,
    interval_beats: f64,
    // Index of the last quantum reported by the clock edge detector.
    last_crossing: i64,
    last_fired_index: Option<u64>,
    active: bool,
}

impl PeriodicBeatTrigger {
    pub fn new(interval_beats: f64) -> Result<Self> {
        if !(interval_beats.is_finite() && interval_beats > 0.0) {
            return Err(TimingError::InvalidInterval(interval_beats));
        }
        Ok(Self {
            anchor_beat: 0.0,
            interval_beats,
            last_crossing: -1,
            last_fired_index: None,
            active: false,
        })
    }

    /// Arms the trigger so the first tick at or after `anchor_beat` reports
    /// index zero. Restarting resets the index.
    pub fn start(&mut self, anchor_beat: f64) -> Result<()> {
        if !anchor_beat.is_finite() {
            return Err(TimingError::msg(format!(
                "trigger anchor must be a finite beat, got {anchor_beat}"
            )));
        }
        self.anchor_beat = anchor_beat;
        self.last_crossing = -1;
        self.last_fired_index = None;
        self.active = true;
        Ok(())
    }

    pub fn stop(&mut self) {
        self.active = false;
    }

    /// Returns the next step index when the clock crossed a boundary since
    /// the previous tick. No-op while inactive.
    pub fn tick(&mut self, clock: &BeatClock) -> Option<u64> {
        if !self.active {
            return None;
        }

        let previous = self.last_crossing;
        let crossed =
            clock.report_beat_crossing(self.interval_beats, self.anchor_beat, &mut self.last_crossing);
        if !crossed {
            return None;
        }
        self.step(previous, clock.current_beat())
    }

    /// Advances the index for a crossing reported after `previous`.
    fn step(&mut self, previous: i64, beat: f64) -> Option<u64> {
        if self.last_crossing <= previous {
            debug_assert!(false, "boundary {} reported twice", self.last_crossing);
            tracing::error!(crossing = self.last_crossing, "ignoring repeated periodic boundary");
            return None;
        }
        let skipped = self.last_crossing - previous - 1;
        if skipped > 0 {
            tracing::debug!(skipped, beat, "frame skipped periodic boundaries, reporting one step");
        }

        let index = self.last_fired_index.map_or(0, |last| last + 1);
        self.last_fired_index = Some(index);
        Some(index)
    }

    pub fn is_active(&self) -> bool {
        self.active
    }

    pub fn anchor_beat(&self) -> f64 {
        self.anchor_beat
    }

    pub fn interval_beats(&self) -> f64 {
        self.interval_beats
    }

    pub fn last_fired_index(&self) -> Option<u64> {
        self.last_fired_index
    }

    /// Offset of the quantized grid from whole beats, in seconds at the
    /// clock's current tempo and rate.
    pub fn phase_offset_seconds(&self, clock: &BeatClock) -> f64 {
        clock.beats_to_seconds(self.anchor_beat.rem_euclid(self.interval_beats))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn clock_at(clock: &mut BeatClock, beat: f64) {
        let seconds = beat * clock.seconds_per_beat();
        clock.update_playhead(seconds, 1.0, true);
    }

    fn run(
        trigger: &mut PeriodicBeatTrigger,
        clock: &mut BeatClock,
        from: f64,
        to: f64,
        step: f64,
    ) -> Vec<u64> {
        let mut fired = Vec::new();
        let mut beat = from;
        while beat <= to {
            clock_at(clock, beat);
            fired.extend(trigger.tick(clock));
            beat += step;
        }
        fired
    }

    #[test]
    fn fires_each_beat_after_anchor() {
        let mut clock = BeatClock::new(60.0).unwrap();
        let mut trigger = PeriodicBeatTrigger::new(1.0).unwrap();
        trigger.start(4.0).unwrap();

        let fired = run(&mut trigger, &mut clock, 3.9, 7.1, 1.0 / 60.0);
        assert_eq!(fired, vec![0, 1, 2, 3]);
    }

    #[test]
    fn aligns_to_fractional_anchor() {
        let mut clock = BeatClock::new(120.0).unwrap();
        let mut trigger = PeriodicBeatTrigger::new(1.0).unwrap();
        trigger.start(2.5).unwrap();

        clock_at(&mut clock, 3.0);
        assert_eq!(trigger.tick(&clock), Some(0));
        clock_at(&mut clock, 3.4);
        assert_eq!(trigger.tick(&clock), None);
        clock_at(&mut clock, 3.5);
        assert_eq!(trigger.tick(&clock), Some(1));
        assert!((trigger.phase_offset_seconds(&clock) - 0.25).abs() < 1e-9);
    }

    #[test]
    fn tick_before_start_or_after_stop_is_a_no_op() {
        let mut clock = BeatClock::new(60.0).unwrap();
        let mut trigger = PeriodicBeatTrigger::new(1.0).unwrap();
        clock_at(&mut clock, 5.0);
        assert_eq!(trigger.tick(&clock), None);

        trigger.start(0.0).unwrap();
        assert_eq!(trigger.tick(&clock), Some(0));
        trigger.stop();
        clock_at(&mut clock, 6.0);
        assert_eq!(trigger.tick(&clock), None);
        assert!(!trigger.is_active());
    }

    #[test]
    fn does_not_fire_while_paused() {
        let mut clock = BeatClock::new(60.0).unwrap();
        let mut trigger = PeriodicBeatTrigger::new(1.0).unwrap();
        trigger.start(1.0).unwrap();
        clock.update_playhead(2.0, 1.0, false);
        assert_eq!(trigger.tick(&clock), None);
    }

    #[test]
    fn frame_hitch_reports_one_step() {
        let mut clock = BeatClock::new(60.0).unwrap();
        let mut trigger = PeriodicBeatTrigger::new(1.0).unwrap();
        trigger.start(0.0).unwrap();

        clock_at(&mut clock, 0.0);
        assert_eq!(trigger.tick(&clock), Some(0));
        clock_at(&mut clock, 3.5);
        assert_eq!(trigger.tick(&clock), Some(1));
        clock_at(&mut clock, 4.0);
        assert_eq!(trigger.tick(&clock), Some(2));
    }

    #[test]
    fn restart_resets_index() {
        let mut clock = BeatClock::new(60.0).unwrap();
        let mut trigger = PeriodicBeatTrigger::new(2.0).unwrap();
        trigger.start(0.0).unwrap();
        let fired = run(&mut trigger, &mut clock, 0.0, 4.5, 0.5);
        assert_eq!(fired, vec![0, 1, 2]);

        trigger.start(8.0).unwrap();
        let fired = run(&mut trigger, &mut clock, 5.0, 10.0, 0.5);
        assert_eq!(fired, vec![0, 1]);
        assert_eq!(trigger.last_fired_index(), Some(1));
    }

    #[test]
    #[cfg(debug_assertions)]
    #[should_panic(expected = "reported twice")]
    fn repeated_boundary_panics_in_debug() {
        let mut trigger = PeriodicBeatTrigger::new(1.0).unwrap();
        trigger.start(0.0).unwrap();
        trigger.last_crossing = 3;
        assert_eq!(trigger.step(2, 3.0), Some(0));
        trigger.step(3, 3.0);
    }

    #[test]
    #[cfg(not(debug_assertions))]
    fn repeated_boundary_is_skipped() {
        let mut trigger = PeriodicBeatTrigger::new(1.0).unwrap();
        trigger.start(0.0).unwrap();
        trigger.last_crossing = 3;
        assert_eq!(trigger.step(2, 3.0), Some(0));
        assert_eq!(trigger.step(3, 3.0), None);
        assert_eq!(trigger.last_fired_index(), Some(0));
    }

    #[test]
    fn rejects_invalid_interval() {
        for interval in [0.0, -2.0, f64::NAN] {
            assert!(matches!(
                PeriodicBeatTrigger::new(interval),
                Err(TimingError::InvalidInterval(_))
            ));
        }
    }
}
