//! # bulb-domain
//!
//! Pure domain model for driving a Prestigio BLE RGB bulb.
//!
//! ## Responsibilities
//! - Encode lighting intents into the bulb's 9-byte command payloads
//! - Model the session lifecycle (adapter readiness, scan, connect,
//!   discovery, ready) as a pure transition function
//! - Define the error taxonomy shared by every layer
//!
//! ## Dependency rule
//! This crate has **no internal dependencies**.
//! It must never import anything from `app`, adapters, or external IO crates.
//! All IO boundaries are expressed as traits in the `app` crate (ports).

pub mod command;
pub mod error;
pub mod peripheral;
pub mod session;
pub mod token;
