//! # bulb-app
//!
//! Application layer: the session driver and **port definitions** (traits).
//!
//! ## Responsibilities
//! - Define **port traits** the outside world plugs into:
//!   - `BleAdapter`: the BLE capabilities the session consumes
//!   - `SessionObserver`: lifecycle and send-outcome callbacks
//! - Drive the pure `bulb_domain::session::transition` function: receive
//!   caller requests and adapter results on one task, execute the resulting
//!   effects against the adapter
//! - Sequence the post-connection handshake (`BringUp`)
//!
//! ## Dependency rule
//! Depends on `bulb-domain` only (plus `tokio` for channels and tasks).
//! Never imports adapter crates. Adapters depend on *this* crate, not the reverse.

pub mod ports;
pub mod services;
