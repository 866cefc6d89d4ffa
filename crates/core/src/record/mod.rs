use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::{window::JudgmentEvent, Result};

/// Ordered log of every judgment a session produced. Two runs over the same
/// inputs must produce identical logs.
#[derive(Debug, Default, Clone, PartialEq, Serialize, Deserialize)]
pub struct JudgmentLog {
    events: Vec<JudgmentEvent>,
}

impl JudgmentLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&mut self, event: JudgmentEvent) {
        self.events.push(event);
    }

    pub fn extend(&mut self, events: impl IntoIterator<Item = JudgmentEvent>) {
        self.events.extend(events);
    }

    pub fn events(&self) -> &[JudgmentEvent] {
        &self.events
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    /// Index of the first event that differs from `other`, including one log
    /// being a prefix of the other.
    pub fn first_divergence(&self, other: &JudgmentLog) -> Option<usize> {
        let shared = self.events.len().min(other.events.len());
        (0..shared)
            .find(|&i| self.events[i] != other.events[i])
            .or_else(|| (self.events.len() != other.events.len()).then_some(shared))
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn from_json(text: &str) -> Result<Self> {
        Ok(serde_json::from_str(text)?)
    }

    pub fn write_json(&self, path: impl AsRef<Path>) -> Result<()> {
        std::fs::write(path, self.to_json()?)?;
        Ok(())
    }

    pub fn read_json(path: impl AsRef<Path>) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        Self::from_json(&text)
    }
}
