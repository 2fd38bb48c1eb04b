//! The bulb session state machine.
//!
//! A session walks `Idle → AdapterUnready → Scanning → Connecting →
//! Discovering → Ready`, with `Failed` as the terminal sink. Transitions are
//! computed by [`transition`]; executing the resulting [`Effect`]s is the
//! driver's job.

pub mod config;
pub mod effect;
pub mod event;
pub mod state;
pub mod transition;

pub use config::SessionConfig;
pub use effect::{Effect, Notification};
pub use event::{AdapterState, SessionEvent};
pub use state::{ConnectAttempt, DiscoveryStage, SessionState, SessionStatus};
pub use transition::{Transition, transition};
