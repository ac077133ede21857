//! Random initial configurations for the left chamber.

use std::f64::consts::TAU;
use std::io::Write;

use rand::{rng, rngs::StdRng, Rng, SeedableRng};

use crate::core::particle::{Particle, DEFAULT_MASS, DIM};
use crate::error::{Error, Result};

/// Placement attempts per particle before giving up.
pub const MAX_ATTEMPTS: usize = 1_000_000;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GeneratorConfig {
    pub count: usize,
    pub box_width: f64,
    pub box_height: f64,
    pub speed: f64,
    pub radius: f64,
}

impl GeneratorConfig {
    pub fn validate(&self) -> Result<()> {
        if self.count == 0 {
            return Err(Error::InvalidParam("particle count must be > 0".into()));
        }
        if !self.radius.is_finite() || self.radius <= 0.0 {
            return Err(Error::InvalidParam("radius must be finite and > 0".into()));
        }
        if !self.speed.is_finite() || self.speed < 0.0 {
            return Err(Error::InvalidParam("speed must be finite and >= 0".into()));
        }
        for l in [self.box_width, self.box_height] {
            if !l.is_finite() || l < 2.0 * self.radius {
                return Err(Error::InvalidParam(
                    "box must be at least 2 * radius in every dimension".into(),
                ));
            }
        }
        Ok(())
    }
}

/// `seed_from_u64(seed)`, or a fresh seed drawn from the thread rng.
pub fn seeded_rng(seed: Option<u64>) -> StdRng {
    match seed {
        Some(s) => SeedableRng::seed_from_u64(s),
        None => SeedableRng::seed_from_u64(rng().random()),
    }
}

/// Rejection-sample `count` non-overlapping disks inside the
/// `box_width x box_height` chamber anchored at the origin, each moving at
/// `speed` in a uniformly random direction.
pub fn generate<R: Rng + ?Sized>(config: &GeneratorConfig, rng: &mut R) -> Result<Vec<Particle>> {
    config.validate()?;
    let radius = config.radius;
    let size = [config.box_width, config.box_height];

    let mut particles: Vec<Particle> = Vec::with_capacity(config.count);
    for id in 0..(config.count as u32) {
        let mut attempts = 0usize;
        let r = loop {
            if attempts >= MAX_ATTEMPTS {
                return Err(Error::InvalidParam(format!(
                    "failed to place particle {id} without overlap; \
                     try fewer particles or smaller radius"
                )));
            }
            attempts += 1;
            let mut r = [0.0_f64; DIM];
            for (k, r_k) in r.iter_mut().enumerate() {
                *r_k = rng.random_range(radius..=size[k] - radius);
            }
            if !overlaps_existing(&particles, &r, radius) {
                break r;
            }
        };

        let angle = rng.random_range(0.0..TAU);
        let v = [config.speed * angle.cos(), config.speed * angle.sin()];
        particles.push(Particle::new(id, r, v, radius, DEFAULT_MASS)?);
    }
    Ok(particles)
}

fn overlaps_existing(existing: &[Particle], r: &[f64; DIM], radius: f64) -> bool {
    existing.iter().any(|p| {
        let dx = p.r[0] - r[0];
        let dy = p.r[1] - r[1];
        let sigma = p.radius + radius;
        dx * dx + dy * dy < sigma * sigma
    })
}

/// Write particles in the input format: `x y vx vy radius`, one per line.
pub fn write_particles<W: Write>(writer: &mut W, particles: &[Particle]) -> Result<()> {
    for p in particles {
        writeln!(
            writer,
            "{:.16e} {:.16e} {:.16e} {:.16e} {:.16e}",
            p.r[0], p.r[1], p.v[0], p.v[1], p.radius
        )?;
    }
    writer.flush()?;
    Ok(())
}
