//! Server lifecycle orchestration.
//!
//! Bridges the presentation layers and the supervisor: UI commands in,
//! supervisor events out.

mod controller;

pub(crate) use controller::{run_controller, UiCommand};
