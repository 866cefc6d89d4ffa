use std::path::Path;

use beatsync_core::{
    AppConfig, Beatmap, Callbacks, Entity, Grade, InputEvent, JudgmentLog, PeriodicBeatTrigger,
    Result, ScriptedInput, Session, SignalKind, TimingError,
};
use serde::Deserialize;

const CUE_DATAMODEL: &str = "script/cue";
const MARCH_DATAMODEL: &str = "script/start marching";

/// Headless level description replayed by the `simulate` and `verify`
/// commands.
#[derive(Debug, Clone, Deserialize)]
pub struct Script {
    #[serde(default = "default_frame_rate")]
    pub frame_rate: f64,
    pub length_beats: f64,
    /// Windows are handed to the scheduler this many beats before they open.
    #[serde(default = "default_lead_beats")]
    pub lead_beats: f64,
    #[serde(default)]
    pub tempo_changes: Vec<TempoChange>,
    #[serde(default)]
    pub windows: Vec<WindowCue>,
    #[serde(default)]
    pub cue_events: Vec<CueEvent>,
    #[serde(default)]
    pub inputs: Vec<InputEvent>,
    #[serde(default)]
    pub periodic: Vec<PeriodicSpec>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TempoChange {
    pub beat: f64,
    pub bpm: f64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct WindowCue {
    pub beat: f64,
    pub duration: f64,
    pub kind: SignalKind,
}

/// Block event that spawns one window every `spacing` beats.
#[derive(Debug, Clone, Deserialize)]
pub struct CueEvent {
    pub beat: f64,
    pub length: f64,
    pub spacing: f64,
    pub duration: f64,
    pub kind: SignalKind,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PeriodicSpec {
    pub anchor_beat: f64,
    pub interval_beats: f64,
    #[serde(default)]
    pub stop_beat: Option<f64>,
}

fn default_frame_rate() -> f64 {
    60.0
}

fn default_lead_beats() -> f64 {
    1.0
}

/// Result of one scripted run.
#[derive(Debug, Default)]
pub struct Simulation {
    pub log: JudgmentLog,
    pub frames: u64,
    pub periodic_steps: u64,
}

impl Script {
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        let script: Self = serde_json::from_str(&text)?;
        script.validate()?;
        Ok(script)
    }

    fn validate(&self) -> Result<()> {
        if !(self.frame_rate.is_finite() && self.frame_rate > 0.0) {
            return Err(TimingError::msg(format!(
                "frame rate must be positive, got {}",
                self.frame_rate
            )));
        }
        if !self.length_beats.is_finite() {
            return Err(TimingError::msg("script length must be a finite beat"));
        }
        if let Some(spec) = self.periodic.iter().find(|spec| !spec.anchor_beat.is_finite()) {
            return Err(TimingError::msg(format!(
                "periodic anchor must be a finite beat, got {}",
                spec.anchor_beat
            )));
        }
        Ok(())
    }

    /// Every window in the script, sorted by start beat.
    fn window_cues(&self) -> Vec<WindowCue> {
        let mut cues = self.windows.clone();
        for event in &self.cue_events {
            let entity = Entity::new(event.beat, event.length, CUE_DATAMODEL);
            cues.extend(entity.cue_beats(event.spacing).map(|beat| WindowCue {
                beat,
                duration: event.duration,
                kind: event.kind,
            }));
        }
        cues.sort_by(|a, b| a.beat.total_cmp(&b.beat));
        cues
    }

    /// Authored events as a beatmap. Each march entity's track is the index
    /// of the periodic spec it starts.
    pub fn beatmap(&self) -> Beatmap {
        let cues = self
            .cue_events
            .iter()
            .map(|event| Entity::new(event.beat, event.length, CUE_DATAMODEL));
        let marches = self.periodic.iter().enumerate().map(|(track, spec)| Entity {
            track: track as u32,
            ..Entity::new(spec.anchor_beat, 0.0, MARCH_DATAMODEL)
        });
        Beatmap::from_entities(cues.chain(marches).collect())
    }
}

/// Plays the script frame by frame against a fresh session.
pub fn run(script: &Script, config: &AppConfig) -> Result<Simulation> {
    let mut session = Session::new(config)?;
    let mut input = ScriptedInput::new(script.inputs.clone());

    let cues = script.window_cues();
    let mut next_cue = 0;

    let mut tempo_changes = script.tempo_changes.clone();
    tempo_changes.sort_by(|a, b| a.beat.total_cmp(&b.beat));
    let mut next_tempo = 0;

    let beatmap = script.beatmap();
    let mut march_cursor = f64::NEG_INFINITY;
    let mut triggers = Vec::with_capacity(script.periodic.len());
    for spec in &script.periodic {
        let trigger = PeriodicBeatTrigger::new(spec.interval_beats)?;
        triggers.push((trigger, spec.stop_beat));
    }

    let rate = config.clock.playback_rate;
    let mut simulation = Simulation::default();
    loop {
        let seconds = simulation.frames as f64 / script.frame_rate;
        simulation.frames += 1;

        let beat = session.clock().current_beat();
        while let Some(change) = tempo_changes.get(next_tempo) {
            if change.beat > beat {
                break;
            }
            tracing::info!(beat = change.beat, bpm = change.bpm, "tempo change");
            session.set_tempo(change.bpm)?;
            next_tempo += 1;
        }

        while let Some(cue) = cues.get(next_cue) {
            if cue.beat - script.lead_beats > beat {
                break;
            }
            let callbacks = logging_callbacks(cue.beat);
            let id = session.schedule(cue.beat, cue.duration, cue.kind, callbacks)?;
            tracing::debug!(window = %id, beat = cue.beat, kind = %cue.kind, "registered window");
            next_cue += 1;
        }

        // Triggers are armed once their march start comes within lead time.
        while let Some(next) = beatmap.next_after(MARCH_DATAMODEL, march_cursor) {
            let anchor = next.beat;
            if anchor - script.lead_beats > beat {
                break;
            }
            for entity in beatmap.find_all(MARCH_DATAMODEL).filter(|e| e.beat == anchor) {
                if let Some((trigger, _)) = triggers.get_mut(entity.track as usize) {
                    trigger.start(anchor)?;
                    tracing::debug!(anchor, track = entity.track, "armed periodic trigger");
                }
            }
            march_cursor = anchor;
        }

        let report = session.advance(seconds, rate, true, &mut input);
        for dropped in &report.dropped {
            tracing::debug!(
                kind = %dropped.kind,
                beat = dropped.at_beat,
                "input resolved no window"
            );
        }
        simulation.log.extend(report.judgments);

        for (trigger, stop_beat) in &mut triggers {
            if let Some(stop) = *stop_beat {
                if report.beat >= stop && trigger.is_active() {
                    trigger.stop();
                }
            }
            if let Some(index) = trigger.tick(session.clock()) {
                let motion = if index % 2 == 0 { "lift" } else { "step" };
                tracing::info!(index, beat = report.beat, motion, "periodic step");
                simulation.periodic_steps += 1;
            }
        }

        if report.beat > script.length_beats {
            break;
        }
        if rate == 0.0 && simulation.frames > 1 {
            return Err(TimingError::msg("playback rate is zero, the script would never end"));
        }
    }

    Ok(simulation)
}

fn logging_callbacks(cue_beat: f64) -> Callbacks {
    Callbacks::new()
        .on_exact(move |state| {
            tracing::info!(cue_beat, state, grade = ?Grade::from_state(state), "hit");
        })
        .on_edge(move |state| {
            tracing::info!(cue_beat, state, "near miss");
        })
        .on_timeout(move || {
            tracing::info!(cue_beat, "miss");
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use beatsync_core::Outcome;

    const SCRIPT: &str = r#"{
        "frame_rate": 60,
        "length_beats": 16,
        "windows": [
            { "beat": 10, "duration": 2, "kind": "standard_down" },
            { "beat": 13, "duration": 1, "kind": "direction_down" }
        ],
        "cue_events": [
            { "beat": 4, "length": 4, "spacing": 2, "duration": 1, "kind": "standard_down" }
        ],
        "inputs": [
            { "beat": 4.5, "kind": "standard_down" },
            { "beat": 11, "kind": "standard_down" },
            { "beat": 6, "kind": "standard_down" }
        ],
        "periodic": [ { "anchor_beat": 4, "interval_beats": 1, "stop_beat": 8 } ]
    }"#;

    fn script() -> Script {
        let script: Script = serde_json::from_str(SCRIPT).unwrap();
        script.validate().unwrap();
        script
    }

    #[test]
    fn simulates_a_level() {
        let simulation = run(&script(), &AppConfig::default()).unwrap();
        let outcomes: Vec<Outcome> = simulation.log.events().iter().map(|e| e.outcome).collect();

        // Cue at 4 hit, cue at 6 grazed then missed, window at 10 hit,
        // direction window at 13 missed.
        assert_eq!(
            outcomes,
            vec![
                Outcome::Exact,
                Outcome::Edge,
                Outcome::Timeout,
                Outcome::Exact,
                Outcome::Timeout
            ]
        );
        assert_eq!(simulation.periodic_steps, 4);
    }

    #[test]
    fn replays_deterministically() {
        let config = AppConfig::default();
        let first = run(&script(), &config).unwrap();
        let second = run(&script(), &config).unwrap();
        assert_eq!(first.log.first_divergence(&second.log), None);
    }

    #[test]
    fn builds_a_sorted_beatmap() {
        let beatmap = script().beatmap();
        assert_eq!(beatmap.len(), 2);
        assert_eq!(beatmap.entities()[0].datamodel, CUE_DATAMODEL);
        assert_eq!(beatmap.find_all(MARCH_DATAMODEL).count(), 1);
    }

    #[test]
    fn arms_each_march_at_its_own_start() {
        let mut script = script();
        script.windows.clear();
        script.cue_events.clear();
        script.inputs.clear();
        let march = |anchor_beat, interval_beats, stop_beat| PeriodicSpec {
            anchor_beat,
            interval_beats,
            stop_beat,
        };
        script.periodic = vec![
            march(12.0, 2.0, None),
            march(2.0, 1.0, Some(4.5)),
            march(12.0, 1.0, None),
        ];

        let simulation = run(&script, &AppConfig::default()).unwrap();
        // Beats 2 to 4, then 12, 14 and 16, then 12 to 16.
        assert_eq!(simulation.periodic_steps, 3 + 3 + 5);
        assert!(simulation.log.is_empty());
    }
}
