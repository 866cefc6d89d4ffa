use serde::{Deserialize, Serialize};

/// One authored event on the level timeline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Entity {
    pub beat: f64,
    #[serde(default)]
    pub length: f64,
    /// Event type, namespaced by minigame (e.g. `cropStomp/veggies`).
    pub datamodel: String,
    #[serde(default)]
    pub track: u32,
}

impl Entity {
    pub fn new(beat: f64, length: f64, datamodel: impl Into<String>) -> Self {
        Self {
            beat,
            length,
            datamodel: datamodel.into(),
            track: 0,
        }
    }

    pub fn end_beat(&self) -> f64 {
        self.beat + self.length
    }

    /// Cue beats spawned by a block event: `beat + k * spacing` for every
    /// `k` with `k * spacing < length`.
    pub fn cue_beats(&self, spacing: f64) -> impl Iterator<Item = f64> + '_ {
        let count = if spacing > 0.0 && self.length > 0.0 {
            (self.length / spacing).ceil() as usize
        } else {
            0
        };
        (0..count).map(move |k| self.beat + k as f64 * spacing)
    }
}

/// Level events sorted by beat, with ties kept in authoring order.
#[derive(Debug, Default, Clone, Serialize, Deserialize)]
pub struct Beatmap {
    entities: Vec<Entity>,
}

impl Beatmap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_entities(mut entities: Vec<Entity>) -> Self {
        entities.sort_by(|a, b| a.beat.total_cmp(&b.beat));
        Self { entities }
    }

    pub fn insert(&mut self, entity: Entity) {
        let index = self.entities.partition_point(|e| e.beat <= entity.beat);
        self.entities.insert(index, entity);
    }

    pub fn entities(&self) -> &[Entity] {
        &self.entities
    }

    pub fn len(&self) -> usize {
        self.entities.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }

    pub fn find_all<'a>(&'a self, datamodel: &'a str) -> impl Iterator<Item = &'a Entity> + 'a {
        self.entities.iter().filter(move |e| e.datamodel == datamodel)
    }

    /// Entities with `from <= beat < to`.
    pub fn in_range(&self, from: f64, to: f64) -> &[Entity] {
        let start = self.entities.partition_point(|e| e.beat < from);
        let end = self.entities.partition_point(|e| e.beat < to).max(start);
        &self.entities[start..end]
    }

    /// First entity of the given type strictly after `beat`.
    pub fn next_after(&self, datamodel: &str, beat: f64) -> Option<&Entity> {
        let start = self.entities.partition_point(|e| e.beat <= beat);
        self.entities[start..].iter().find(|e| e.datamodel == datamodel)
    }
}
