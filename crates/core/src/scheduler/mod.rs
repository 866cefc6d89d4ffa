//! Central authority over every open judgment window.
//!
//! Windows are kept ordered by `(start_beat, registration)` so input routing
//! picks the earliest outstanding cue, and a second index ordered by end beat
//! lets each tick pop expired windows without rescanning the active set.

use std::{
    cmp::Ordering,
    collections::{BTreeMap, BTreeSet, HashMap},
};

use crate::{
    config::{EdgePolicy, JudgmentConfig},
    input::{InputEvent, SignalKind},
    window::{ActionWindow, Callbacks, JudgmentEvent, Outcome, WindowId},
    Result,
};

/// Totally ordered beat value for use as a map key.
#[derive(Debug, Clone, Copy)]
struct BeatKey(f64);

impl PartialEq for BeatKey {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for BeatKey {}

impl PartialOrd for BeatKey {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for BeatKey {
    fn cmp(&self, other: &Self) -> Ordering {
        self.0.total_cmp(&other.0)
    }
}

impl BeatKey {
    // `total_cmp` orders -0.0 below 0.0, the containment check does not.
    fn new(beat: f64) -> Self {
        Self(beat + 0.0)
    }
}

type SlotKey = (BeatKey, WindowId);

#[derive(Debug, Default)]
pub struct JudgmentScheduler {
    windows: BTreeMap<SlotKey, ActionWindow>,
    deadlines: BTreeSet<(BeatKey, SlotKey)>,
    slots: HashMap<WindowId, SlotKey>,
    next_id: u64,
    now_beat: Option<f64>,
    edge_policy: EdgePolicy,
    // Timeouts resolved at registration time, reported by the next tick.
    backlog: Vec<JudgmentEvent>,
}

impl JudgmentScheduler {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_config(config: &JudgmentConfig) -> Self {
        Self {
            edge_policy: config.edge_policy,
            ..Self::default()
        }
    }

    pub fn edge_policy(&self) -> EdgePolicy {
        self.edge_policy
    }

    /// Registers a window and hands ownership to the scheduler.
    ///
    /// A window whose end is already behind the last ticked beat resolves as
    /// a timeout immediately; its `on_timeout` hook runs before this returns.
    pub fn schedule(
        &mut self,
        start_beat: f64,
        duration_beats: f64,
        accepted: SignalKind,
        callbacks: Callbacks,
    ) -> Result<WindowId> {
        let id = WindowId(self.next_id);
        let mut window = ActionWindow::new(id, start_beat, duration_beats, accepted, callbacks)?;
        self.next_id += 1;

        if let Some(now) = self.now_beat {
            if window.end_beat() < now {
                tracing::debug!(window = %id, start_beat, now, "window registered after its end");
                if window.resolve(Outcome::Timeout, None) {
                    self.backlog.push(JudgmentEvent {
                        window: id,
                        outcome: Outcome::Timeout,
                        state: None,
                        at_beat: now,
                    });
                }
                return Ok(id);
            }
        }

        let key = (BeatKey::new(start_beat), id);
        self.deadlines.insert((BeatKey::new(window.end_beat()), key));
        self.slots.insert(id, key);
        self.windows.insert(key, window);
        tracing::trace!(window = %id, start_beat, duration_beats, %accepted, "scheduled window");
        Ok(id)
    }

    /// Removes a pending window without invoking any hook. Unknown, resolved
    /// and already cancelled ids are ignored.
    pub fn cancel(&mut self, id: WindowId) -> bool {
        match self.take(id) {
            Some(_) => {
                tracing::trace!(window = %id, "cancelled window");
                true
            }
            None => false,
        }
    }

    /// Resolves every window whose end lies strictly before `now_beat` as a
    /// timeout, in ascending start beat then registration order.
    pub fn tick(&mut self, now_beat: f64) -> Vec<JudgmentEvent> {
        self.now_beat = Some(now_beat);
        let mut events = std::mem::take(&mut self.backlog);

        let mut expired = Vec::new();
        while let Some(&(end, key)) = self.deadlines.first() {
            if end.0 >= now_beat {
                break;
            }
            self.deadlines.pop_first();
            expired.push(key);
        }
        expired.sort();

        for key in expired {
            let Some(mut window) = self.windows.remove(&key) else {
                debug_assert!(false, "deadline without window {}", key.1);
                tracing::error!(window = %key.1, "deadline refers to a missing window");
                continue;
            };
            self.slots.remove(&key.1);
            if window.resolve(Outcome::Timeout, None) {
                tracing::trace!(window = %key.1, now_beat, "window timed out");
                events.push(JudgmentEvent {
                    window: key.1,
                    outcome: Outcome::Timeout,
                    state: None,
                    at_beat: now_beat,
                });
            }
        }

        events
    }

    /// Routes one input to the earliest pending window that accepts its kind
    /// and contains its beat. Unmatched input is dropped.
    pub fn submit_input(&mut self, input: InputEvent) -> Option<JudgmentEvent> {
        let at_beat = input.at_beat;
        if !at_beat.is_finite() {
            tracing::debug!(kind = %input.kind, "dropping input with non-finite beat");
            return None;
        }

        let Some(key) = self
            .windows
            .range(..=(BeatKey::new(at_beat), WindowId(u64::MAX)))
            .find(|(_, window)| window.accepted() == input.kind && window.contains(at_beat))
            .map(|(key, _)| *key)
        else {
            tracing::debug!(kind = %input.kind, at_beat, "input matched no window");
            return None;
        };

        let window = self.windows.get_mut(&key)?;
        let state = window.judgment_state(at_beat);

        if state.abs() < 1.0 {
            let mut window = self.take(key.1)?;
            window.resolve(Outcome::Exact, Some(state));
            tracing::trace!(window = %key.1, state, "exact hit");
            return Some(JudgmentEvent {
                window: key.1,
                outcome: Outcome::Exact,
                state: Some(state),
                at_beat,
            });
        }

        let event = JudgmentEvent {
            window: key.1,
            outcome: Outcome::Edge,
            state: Some(state),
            at_beat,
        };
        match self.edge_policy {
            EdgePolicy::KeepOpen => {
                if window.fire_edge(state) {
                    tracing::trace!(window = %key.1, state, "edge hit, window kept open");
                    Some(event)
                } else {
                    tracing::debug!(window = %key.1, state, "edge already reported for window");
                    None
                }
            }
            EdgePolicy::Close => {
                let mut window = self.take(key.1)?;
                window.resolve(Outcome::Edge, Some(state));
                tracing::trace!(window = %key.1, state, "edge hit, window closed");
                Some(event)
            }
        }
    }

    /// Drops every window without invoking hooks, e.g. on song restart.
    pub fn clear(&mut self) {
        self.windows.clear();
        self.deadlines.clear();
        self.slots.clear();
        self.backlog.clear();
        self.now_beat = None;
    }

    pub fn is_pending(&self, id: WindowId) -> bool {
        self.slots.contains_key(&id)
    }

    pub fn window(&self, id: WindowId) -> Option<&ActionWindow> {
        self.slots.get(&id).and_then(|key| self.windows.get(key))
    }

    /// Pending windows in routing order.
    pub fn pending(&self) -> impl Iterator<Item = &ActionWindow> {
        self.windows.values()
    }

    pub fn len(&self) -> usize {
        self.windows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.windows.is_empty()
    }

    /// Beat passed to the most recent [`JudgmentScheduler::tick`].
    pub fn now_beat(&self) -> Option<f64> {
        self.now_beat
    }

    fn take(&mut self, id: WindowId) -> Option<ActionWindow> {
        let key = self.slots.remove(&id)?;
        let window = self.windows.remove(&key)?;
        self.deadlines.remove(&(BeatKey::new(window.end_beat()), key));
        Some(window)
    }
}
