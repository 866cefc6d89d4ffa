//! Timing core shared by every rhythm minigame.
//!
//! A [`BeatClock`] turns the audio play head into beats, a
//! [`JudgmentScheduler`] owns every open judgment window and decides exactly
//! once whether each one was hit, grazed or missed, and a
//! [`PeriodicBeatTrigger`] drives beat-quantized repeating motion. Everything
//! runs synchronously inside the host's per-frame update; [`Session`] wires
//! the pieces together in the required order.

pub mod clock;
pub mod config;
pub mod error;
pub mod input;
pub mod periodic;
pub mod record;
pub mod scheduler;
pub mod session;
pub mod timeline;
pub mod window;

pub use clock::BeatClock;
pub use config::{AppConfig, ClockConfig, EdgePolicy, JudgmentConfig};
pub use error::{Result, TimingError};
pub use input::{Action, Button, InputEvent, InputSource, ScriptedInput, SignalKind};
pub use periodic::PeriodicBeatTrigger;
pub use record::JudgmentLog;
pub use scheduler::JudgmentScheduler;
pub use session::{FrameReport, Session};
pub use timeline::{Beatmap, Entity};
pub use window::{
    judgment_state, ActionWindow, Callbacks, Grade, JudgmentEvent, Outcome, WindowId, WindowState,
};
