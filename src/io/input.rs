//! Particle-list parser.
//!
//! One particle per line, five whitespace-separated floats `x y vx vy radius`.
//! Particles get unit mass and the zero-based line index as id.

use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

use crate::core::particle::{Particle, DEFAULT_MASS};
use crate::error::{Error, Result};

const FIELDS: usize = 5;

/// Parse exactly `expected` particles from `reader`.
pub fn parse_particles<R: BufRead>(reader: R, expected: usize) -> Result<Vec<Particle>> {
    let mut particles = Vec::with_capacity(expected);
    for (idx, line) in reader.lines().enumerate() {
        let line = line?;
        let lineno = idx + 1;
        let fields: Vec<&str> = line.split_whitespace().collect();
        if fields.len() != FIELDS {
            return Err(Error::Input {
                line: lineno,
                message: format!("expected {FIELDS} fields, got {}", fields.len()),
            });
        }

        let mut values = [0.0_f64; FIELDS];
        for (k, (slot, field)) in values.iter_mut().zip(&fields).enumerate() {
            *slot = field.parse().map_err(|e| Error::Input {
                line: lineno,
                message: format!("field {} ({field:?}): {e}", k + 1),
            })?;
        }
        let [x, y, vx, vy, radius] = values;
        let particle = Particle::new(idx as u32, [x, y], [vx, vy], radius, DEFAULT_MASS)
            .map_err(|e| Error::Input {
                line: lineno,
                message: e.to_string(),
            })?;
        particles.push(particle);
    }

    if particles.len() != expected {
        return Err(Error::ParticleCount {
            expected,
            found: particles.len(),
        });
    }
    Ok(particles)
}

/// Open `path` and parse exactly `expected` particles from it.
pub fn read_particles(path: &Path, expected: usize) -> Result<Vec<Particle>> {
    let file = File::open(path)?;
    parse_particles(BufReader::new(file), expected)
}
