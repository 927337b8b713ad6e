//! Simulation collaborators
//!
//! Thin glue around the server core:
//! - `client` - Randomized client threads that submit deposits and transfers
//! - `runner` - Run-duration timer that starts everything, then drains it

pub mod client;
pub mod runner;

pub use client::{random_operation, run_client, spawn_clients};
pub use runner::{run_simulation, SimulationOutcome};
