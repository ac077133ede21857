#![allow(missing_docs)]

//! Event-driven hard-disk engine.
//!
//! Particles, predicted collisions, the two-chamber enclosure and the
//! scheduler that ties them together; pressure and diffusion statistics over
//! the runs it produces.

pub mod diffusion;
pub mod enclosure;
pub mod event;
pub mod particle;
pub mod pressure;
pub mod sim;

pub use diffusion::{
    diffusion_coefficient, linear_fit, Diffusion, LinearFit, MsdObserver, MsdSample,
};
pub use enclosure::{BoundaryHit, Chamber, Enclosure};
pub use event::{Collision, CollisionKind, Wall, WallImpact};
pub use particle::Particle;
pub use pressure::{mean_pressure, pressure_series, PressureBin, MAX_BINS};
pub use sim::{Horizon, ImpactLog, RunSummary, Simulation, StepObserver, StepReport, Termination};
