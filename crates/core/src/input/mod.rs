//! Discrete input signals delivered by the platform layer.

use std::{collections::VecDeque, fmt, str::FromStr};

use serde::{Deserialize, Serialize};

use crate::{Result, TimingError};

/// Physical button family an input came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Button {
    Standard,
    Alternate,
    Direction,
}

/// What happened to the button during the frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Action {
    Press,
    Hold,
    Release,
}

/// Signal a judgment window accepts and an input event carries.
///
/// The text form is `<button>_<action>`, e.g. `standard_down` or
/// `direction_hold`. `down` and `up` are aliases for `press` and `release`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct SignalKind {
    pub button: Button,
    pub action: Action,
}

impl SignalKind {
    pub const STANDARD_DOWN: Self = Self::new(Button::Standard, Action::Press);
    pub const STANDARD_UP: Self = Self::new(Button::Standard, Action::Release);
    pub const ALTERNATE_DOWN: Self = Self::new(Button::Alternate, Action::Press);
    pub const ALTERNATE_UP: Self = Self::new(Button::Alternate, Action::Release);
    pub const DIRECTION_DOWN: Self = Self::new(Button::Direction, Action::Press);
    pub const DIRECTION_UP: Self = Self::new(Button::Direction, Action::Release);

    pub const fn new(button: Button, action: Action) -> Self {
        Self { button, action }
    }
}

impl fmt::Display for SignalKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let button = match self.button {
            Button::Standard => "standard",
            Button::Alternate => "alternate",
            Button::Direction => "direction",
        };
        let action = match self.action {
            Action::Press => "down",
            Action::Hold => "hold",
            Action::Release => "up",
        };
        write!(f, "{button}_{action}")
    }
}

impl FromStr for SignalKind {
    type Err = TimingError;

    fn from_str(text: &str) -> Result<Self> {
        let unknown = || TimingError::UnknownSignalKind(text.to_string());
        let normalized = text.trim().to_ascii_lowercase();
        let (button, action) = normalized.split_once('_').ok_or_else(unknown)?;

        let button = match button {
            "standard" => Button::Standard,
            "alternate" | "alt" => Button::Alternate,
            "direction" => Button::Direction,
            _ => return Err(unknown()),
        };
        let action = match action {
            "down" | "press" => Action::Press,
            "hold" => Action::Hold,
            "up" | "release" => Action::Release,
            _ => return Err(unknown()),
        };
        Ok(Self::new(button, action))
    }
}

impl TryFrom<String> for SignalKind {
    type Error = TimingError;

    fn try_from(value: String) -> Result<Self> {
        value.parse()
    }
}

impl From<SignalKind> for String {
    fn from(value: SignalKind) -> Self {
        value.to_string()
    }
}

/// One discrete input, timestamped in beats.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct InputEvent {
    pub kind: SignalKind,
    #[serde(rename = "beat")]
    pub at_beat: f64,
}

impl InputEvent {
    pub fn new(kind: SignalKind, at_beat: f64) -> Self {
        Self { kind, at_beat }
    }
}

/// Per-frame supplier of input events.
///
/// Implementations return events in arrival order and never repeat an event
/// for a held button within one poll.
pub trait InputSource {
    fn poll(&mut self, now_beat: f64) -> Vec<InputEvent>;
}

/// Input source that replays a fixed list of events.
#[derive(Debug, Default, Clone)]
pub struct ScriptedInput {
    pending: VecDeque<InputEvent>,
}

impl ScriptedInput {
    pub fn new(mut events: Vec<InputEvent>) -> Self {
        events.sort_by(|a, b| a.at_beat.total_cmp(&b.at_beat));
        Self {
            pending: events.into(),
        }
    }

    pub fn remaining(&self) -> usize {
        self.pending.len()
    }
}

impl InputSource for ScriptedInput {
    fn poll(&mut self, now_beat: f64) -> Vec<InputEvent> {
        let mut ready: Vec<InputEvent> = Vec::new();
        while let Some(event) = self.pending.front() {
            if event.at_beat > now_beat {
                break;
            }
            let event = *event;
            self.pending.pop_front();
            if ready.iter().any(|seen| *seen == event) {
                tracing::trace!(kind = %event.kind, beat = event.at_beat, "dropping repeated input");
                continue;
            }
            ready.push(event);
        }
        ready
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_signal_names() {
        assert_eq!("standard_down".parse::<SignalKind>().unwrap(), SignalKind::STANDARD_DOWN);
        assert_eq!("Direction_Release".parse::<SignalKind>().unwrap(), SignalKind::DIRECTION_UP);
        assert_eq!(
            "alt_hold".parse::<SignalKind>().unwrap(),
            SignalKind::new(Button::Alternate, Action::Hold)
        );
        assert_eq!(SignalKind::DIRECTION_DOWN.to_string(), "direction_down");
    }

    #[test]
    fn rejects_unknown_signal_names() {
        for text in ["pedal_down", "standard", "standard_tap", ""] {
            let err = text.parse::<SignalKind>().unwrap_err();
            assert!(matches!(err, TimingError::UnknownSignalKind(_)), "{text}");
        }
    }

    #[test]
    fn deserializes_events_from_json() {
        let event: InputEvent =
            serde_json::from_str(r#"{ "kind": "standard_down", "beat": 11.0 }"#).unwrap();
        assert_eq!(event, InputEvent::new(SignalKind::STANDARD_DOWN, 11.0));

        let bad = serde_json::from_str::<InputEvent>(r#"{ "kind": "kick", "beat": 1.0 }"#);
        assert!(bad.is_err());
    }

    #[test]
    fn scripted_input_releases_events_in_beat_order() {
        let mut input = ScriptedInput::new(vec![
            InputEvent::new(SignalKind::STANDARD_DOWN, 2.0),
            InputEvent::new(SignalKind::DIRECTION_DOWN, 1.0),
            InputEvent::new(SignalKind::STANDARD_UP, 5.0),
        ]);

        assert!(input.poll(0.5).is_empty());
        let ready = input.poll(2.0);
        assert_eq!(ready.len(), 2);
        assert_eq!(ready[0].kind, SignalKind::DIRECTION_DOWN);
        assert_eq!(ready[1].kind, SignalKind::STANDARD_DOWN);
        assert_eq!(input.remaining(), 1);
    }

    #[test]
    fn scripted_input_drops_duplicates_within_a_poll() {
        let event = InputEvent::new(SignalKind::STANDARD_DOWN, 1.0);
        let mut input = ScriptedInput::new(vec![event, event]);
        assert_eq!(input.poll(1.0), vec![event]);
    }
}
