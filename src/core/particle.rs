use crate::error::{Error, Result};

/// Fixed spatial dimension (2D).
pub const DIM: usize = 2;

/// Sentinel time for a pair (or particle and wall) that never collides.
pub const NO_HIT: f64 = f64::INFINITY;

/// Mass given to particles read from input files.
pub const DEFAULT_MASS: f64 = 1.0;

/// A hard disk of the gas.
///
/// Fields:
/// - `id`: stable index of the particle in the simulation arena
/// - `r`: position vector [x, y]
/// - `v`: velocity vector [vx, vy]
/// - `radius`: disk radius (> 0)
/// - `mass`: particle mass (> 0)
/// - `collision_count`: incremented each time the particle participates in a realized event
#[derive(Debug, Clone, PartialEq)]
pub struct Particle {
    /// Stable particle identifier (arena index).
    pub id: u32,
    /// Position (x, y).
    pub r: [f64; DIM],
    /// Velocity (vx, vy).
    pub v: [f64; DIM],
    /// Disk radius (> 0).
    pub radius: f64,
    /// Mass (> 0).
    pub mass: f64,
    /// Collision participation counter (for event invalidation).
    pub collision_count: u64,
}

impl Particle {
    /// Create a new particle after validating invariants.
    ///
    /// Errors:
    /// - `Error::InvalidParam` if `radius` or `mass` is non-positive or any component is NaN/inf.
    pub fn new(id: u32, r: [f64; DIM], v: [f64; DIM], radius: f64, mass: f64) -> Result<Self> {
        if !radius.is_finite() || radius <= 0.0 {
            return Err(Error::InvalidParam("radius must be finite and > 0".into()));
        }
        if !mass.is_finite() || mass <= 0.0 {
            return Err(Error::InvalidParam("mass must be finite and > 0".into()));
        }
        if !r.iter().all(|x| x.is_finite()) {
            return Err(Error::InvalidParam("position must be finite".into()));
        }
        if !v.iter().all(|x| x.is_finite()) {
            return Err(Error::InvalidParam("velocity must be finite".into()));
        }
        Ok(Self {
            id,
            r,
            v,
            radius,
            mass,
            collision_count: 0,
        })
    }

    /// Relative time until this disk touches `other`, or [`NO_HIT`].
    ///
    /// Solves |Δr + Δv t| = σ for the earliest root. Pairs that are not
    /// approaching (Δr·Δv >= 0) or whose paths miss never hit. An approaching
    /// pair that already overlaps reports `0.0`.
    pub fn time_to_hit(&self, other: &Particle) -> f64 {
        let dr = sub(&other.r, &self.r);
        let dv = sub(&other.v, &self.v);

        let dvdr = dot(&dr, &dv);
        if dvdr >= 0.0 {
            return NO_HIT;
        }

        let dvdv = dot(&dv, &dv);
        let drdr = dot(&dr, &dr);
        let sigma = self.radius + other.radius;

        let d = dvdr * dvdr - dvdv * (drdr - sigma * sigma);
        if d < 0.0 {
            return NO_HIT;
        }

        let t = -(dvdr + d.sqrt()) / dvdv;
        t.max(0.0)
    }

    /// Ballistic update `r += v * dt`.
    #[inline]
    pub fn drift(&mut self, dt: f64) {
        for (rk, &vk) in self.r.iter_mut().zip(self.v.iter()) {
            *rk += vk * dt;
        }
    }

    /// Elastic impulse exchange with `other` along the line of centres.
    ///
    /// Assumes the disks are in contact; the impulse is scaled by the
    /// contact distance r₁ + r₂, not the current centre distance.
    pub fn bounce_off(&mut self, other: &mut Particle) {
        let dr = sub(&other.r, &self.r);
        let dv = sub(&other.v, &self.v);
        let dvdr = dot(&dr, &dv);
        let dist = self.radius + other.radius;

        let (m1, m2) = (self.mass, other.mass);
        let j = 2.0 * m1 * m2 * dvdr / ((m1 + m2) * dist);
        for k in 0..DIM {
            let jk = j * dr[k] / dist;
            self.v[k] += jk / m1;
            other.v[k] -= jk / m2;
        }
    }

    /// Increment the collision counter (used for event invalidation).
    #[inline]
    pub fn bump_collision_count(&mut self) {
        self.collision_count = self.collision_count.saturating_add(1);
    }

    /// Returns the particle's kinetic energy: 1/2 m |v|^2.
    #[inline]
    pub fn kinetic_energy(&self) -> f64 {
        0.5 * self.mass * dot(&self.v, &self.v)
    }

    /// Linear momentum m v.
    #[inline]
    pub fn momentum(&self) -> [f64; DIM] {
        [self.mass * self.v[0], self.mass * self.v[1]]
    }

    /// Speed |v|.
    #[inline]
    pub fn speed(&self) -> f64 {
        self.v[0].hypot(self.v[1])
    }

    /// True if the two disks intersect (touching does not count).
    pub fn overlaps(&self, other: &Particle) -> bool {
        let dr = sub(&other.r, &self.r);
        let sigma = self.radius + other.radius;
        dot(&dr, &dr) < sigma * sigma
    }

    /// Set position (validated as finite).
    pub fn set_position(&mut self, r: [f64; DIM]) -> Result<()> {
        if !r.iter().all(|x| x.is_finite()) {
            return Err(Error::InvalidParam("position must be finite".into()));
        }
        self.r = r;
        Ok(())
    }

    /// Set velocity (validated as finite).
    pub fn set_velocity(&mut self, v: [f64; DIM]) -> Result<()> {
        if !v.iter().all(|x| x.is_finite()) {
            return Err(Error::InvalidParam("velocity must be finite".into()));
        }
        self.v = v;
        Ok(())
    }
}

#[inline]
pub(crate) fn dot(a: &[f64; DIM], b: &[f64; DIM]) -> f64 {
    a[0] * b[0] + a[1] * b[1]
}

#[inline]
pub(crate) fn sub(a: &[f64; DIM], b: &[f64; DIM]) -> [f64; DIM] {
    [a[0] - b[0], a[1] - b[1]]
}
