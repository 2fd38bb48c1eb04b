//! Port definitions: traits that adapters implement.
//!
//! Ports are the boundaries between the application core and the outside world.
//! They are defined here (in `app`) so that both the session driver and the
//! adapter layer can depend on them without creating circular dependencies.

pub mod adapter;
pub mod observer;

pub use adapter::{BleAdapter, EventStream};
pub use observer::SessionObserver;
