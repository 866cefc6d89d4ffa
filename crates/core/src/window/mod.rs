//! Judgment windows and the events produced when they resolve.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::{input::SignalKind, Result, TimingError};

/// Opaque handle returned by the scheduler. Ids increase in registration
/// order and are never reused within one scheduler.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct WindowId(pub u64);

impl fmt::Display for WindowId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Outcome {
    /// Input landed strictly inside the window.
    Exact,
    /// Input landed on one of the window boundaries.
    Edge,
    /// The window closed without an accepted input.
    Timeout,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WindowState {
    Pending,
    Resolved(Outcome),
}

/// Score tier for an exact hit, derived from the magnitude of the signed
/// window position.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Grade {
    Perfect,
    Great,
    Good,
}

impl Grade {
    pub fn from_state(state: f64) -> Self {
        let magnitude = state.abs();
        if magnitude < 0.25 {
            Grade::Perfect
        } else if magnitude < 0.5 {
            Grade::Great
        } else {
            Grade::Good
        }
    }
}

/// Record of one callback invocation.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct JudgmentEvent {
    pub window: WindowId,
    pub outcome: Outcome,
    /// Signed window position of the input. `None` for timeouts.
    pub state: Option<f64>,
    /// Input beat for hits, the current beat for timeouts.
    pub at_beat: f64,
}

type StateCallback = Box<dyn FnMut(f64)>;
type TimeoutCallback = Box<dyn FnMut()>;

/// Gameplay hooks invoked when a window resolves. Unset hooks are no-ops.
#[derive(Default)]
pub struct Callbacks {
    on_exact: Option<StateCallback>,
    on_edge: Option<StateCallback>,
    on_timeout: Option<TimeoutCallback>,
}

impl Callbacks {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn on_exact(mut self, callback: impl FnMut(f64) + 'static) -> Self {
        self.on_exact = Some(Box::new(callback));
        self
    }

    pub fn on_edge(mut self, callback: impl FnMut(f64) + 'static) -> Self {
        self.on_edge = Some(Box::new(callback));
        self
    }

    pub fn on_timeout(mut self, callback: impl FnMut() + 'static) -> Self {
        self.on_timeout = Some(Box::new(callback));
        self
    }
}

impl fmt::Debug for Callbacks {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Callbacks")
            .field("on_exact", &self.on_exact.is_some())
            .field("on_edge", &self.on_edge.is_some())
            .field("on_timeout", &self.on_timeout.is_some())
            .finish()
    }
}

/// One pending judgment, owned by the scheduler once registered.
#[derive(Debug)]
pub struct ActionWindow {
    id: WindowId,
    start_beat: f64,
    duration_beats: f64,
    accepted: SignalKind,
    state: WindowState,
    edge_fired: bool,
    callbacks: Callbacks,
}

impl ActionWindow {
    pub(crate) fn new(
        id: WindowId,
        start_beat: f64,
        duration_beats: f64,
        accepted: SignalKind,
        callbacks: Callbacks,
    ) -> Result<Self> {
        validate_window(start_beat, duration_beats)?;
        Ok(Self {
            id,
            start_beat,
            duration_beats,
            accepted,
            state: WindowState::Pending,
            edge_fired: false,
            callbacks,
        })
    }

    pub fn id(&self) -> WindowId {
        self.id
    }

    pub fn start_beat(&self) -> f64 {
        self.start_beat
    }

    pub fn duration_beats(&self) -> f64 {
        self.duration_beats
    }

    pub fn end_beat(&self) -> f64 {
        self.start_beat + self.duration_beats
    }

    pub fn accepted(&self) -> SignalKind {
        self.accepted
    }

    pub fn state(&self) -> WindowState {
        self.state
    }

    pub fn edge_fired(&self) -> bool {
        self.edge_fired
    }

    /// Whether `beat` lies in the closed interval `[start, end]`.
    pub fn contains(&self, beat: f64) -> bool {
        beat >= self.start_beat && beat <= self.end_beat()
    }

    /// Signed position of `at_beat`: `-1` at the start, `0` at the centre,
    /// `1` at the end, clamped outside.
    pub fn judgment_state(&self, at_beat: f64) -> f64 {
        judgment_state(self.start_beat, self.duration_beats, at_beat)
    }

    /// Fires the edge hook. Returns `false` if it already fired for this
    /// window.
    pub(crate) fn fire_edge(&mut self, state: f64) -> bool {
        if self.edge_fired {
            return false;
        }
        self.edge_fired = true;
        if let Some(callback) = self.callbacks.on_edge.as_mut() {
            callback(state);
        }
        true
    }

    /// Transitions to `Resolved` and fires the matching hook.
    ///
    /// A second resolution is a scheduler bug: it panics in debug builds and
    /// is logged and skipped in release builds.
    pub(crate) fn resolve(&mut self, outcome: Outcome, state: Option<f64>) -> bool {
        if let WindowState::Resolved(previous) = self.state {
            debug_assert!(false, "window {} resolved twice", self.id);
            tracing::error!(
                window = %self.id,
                ?previous,
                ?outcome,
                "ignoring second resolution of window"
            );
            return false;
        }

        self.state = WindowState::Resolved(outcome);
        match outcome {
            Outcome::Exact => {
                if let Some(callback) = self.callbacks.on_exact.as_mut() {
                    callback(state.unwrap_or(0.0));
                }
            }
            Outcome::Edge => {
                if self.edge_fired {
                    return true;
                }
                self.edge_fired = true;
                if let Some(callback) = self.callbacks.on_edge.as_mut() {
                    callback(state.unwrap_or(0.0));
                }
            }
            Outcome::Timeout => {
                if let Some(callback) = self.callbacks.on_timeout.as_mut() {
                    callback();
                }
            }
        }
        true
    }
}

/// `clamp(2 * (at - start) / duration - 1, -1, 1)`.
pub fn judgment_state(start_beat: f64, duration_beats: f64, at_beat: f64) -> f64 {
    (2.0 * (at_beat - start_beat) / duration_beats - 1.0).clamp(-1.0, 1.0)
}

pub(crate) fn validate_window(start_beat: f64, duration_beats: f64) -> Result<()> {
    if !start_beat.is_finite() {
        return Err(TimingError::msg(format!(
            "window start must be a finite beat, got {start_beat}"
        )));
    }
    if !(duration_beats.is_finite() && duration_beats > 0.0) {
        return Err(TimingError::InvalidDuration(duration_beats));
    }
    Ok(())
}
