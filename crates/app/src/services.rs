//! Application services.
//!
//! The session driver accepts port implementations via generic parameters
//! (constructor injection), keeping this layer decoupled from concrete adapters.

pub mod bring_up;
pub mod bulb_session;
pub mod channel_observer;

pub use bring_up::{BringUp, BringUpStep};
pub use bulb_session::{BulbSession, SessionClosed, SessionHandle};
pub use channel_observer::ChannelObserver;
