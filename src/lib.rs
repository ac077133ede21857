//! Event-driven simulation of an ideal hard-disk gas in a box that may be
//! joined to a second chamber through a door.
//!
//! The engine lives in [`core`]; [`io`] and [`config`] cover the particle
//! files, trajectories and run settings used by the `diskgas` binary.

pub mod config;
pub mod core;
pub mod error;
pub mod io;

#[cfg(feature = "python")]
mod python;

pub use crate::core::{Enclosure, Particle, Simulation};
pub use crate::error::{Error, Result};
