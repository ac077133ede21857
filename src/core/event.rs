use crate::core::particle::{Particle, DIM};
use crate::error::{Error, Result};
use ordered_float::NotNan;
use std::cmp::Ordering;
use std::fmt;

/// Named boundary pieces of the enclosure.
///
/// The discriminant is the wall id written to the collision log: ids 0 to 3
/// bound the left chamber, 4 to 6 the right one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Wall {
    /// Top wall of the left chamber at `y0`.
    Top1 = 0,
    /// Bottom wall of the left chamber at `y0 + height`.
    Bottom1 = 1,
    /// Outer wall of the left chamber at `x0`.
    Left = 2,
    /// Right wall of the left chamber (the door jambs when a door is present).
    Right1 = 3,
    /// Top wall of the right chamber.
    Top2 = 4,
    /// Bottom wall of the right chamber.
    Bottom2 = 5,
    /// Far wall of the right chamber.
    Right2 = 6,
    /// A jamb tip or a chamber corner struck on both axes at once.
    Corner = 7,
}

impl Wall {
    /// Every wall, in id order.
    pub const ALL: [Wall; 8] = [
        Wall::Top1,
        Wall::Bottom1,
        Wall::Left,
        Wall::Right1,
        Wall::Top2,
        Wall::Bottom2,
        Wall::Right2,
        Wall::Corner,
    ];

    /// Stable numeric id.
    #[inline]
    pub fn id(self) -> u32 {
        self as u32
    }

    /// Inverse of [`Wall::id`].
    pub fn from_id(id: u32) -> Result<Self> {
        Wall::ALL
            .get(id as usize)
            .copied()
            .ok_or_else(|| Error::InvalidParam(format!("wall id must be in [0, 7], got {id}")))
    }

    /// Walls with a constant x (normal along the x axis).
    #[inline]
    pub fn is_vertical(self) -> bool {
        matches!(self, Wall::Left | Wall::Right1 | Wall::Right2)
    }

    /// Walls with a constant y (normal along the y axis).
    #[inline]
    pub fn is_horizontal(self) -> bool {
        matches!(self, Wall::Top1 | Wall::Top2 | Wall::Bottom1 | Wall::Bottom2)
    }
}

impl fmt::Display for Wall {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Wall::Left => "LEFT",
            Wall::Right1 => "RIGHT_1",
            Wall::Right2 => "RIGHT_2",
            Wall::Top1 => "TOP_1",
            Wall::Top2 => "TOP_2",
            Wall::Bottom1 => "BOTTOM_1",
            Wall::Bottom2 => "BOTTOM_2",
            Wall::Corner => "CORNER",
        };
        f.write_str(name)
    }
}

/// Participants of a scheduled collision (arena indices).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CollisionKind {
    /// Disk-disk collision between particles `i` and `j`.
    Particle { i: u32, j: u32 },
    /// Disk-wall collision of particle `i` against `wall`.
    Wall { i: u32, wall: Wall },
}

impl CollisionKind {
    /// Deterministic tie-break key: lowest participant first, then
    /// particle collisions before wall collisions, then partner/wall.
    #[inline]
    fn order_key(&self) -> (u32, u8, u32) {
        match *self {
            CollisionKind::Particle { i, j } => (i.min(j), 0, i.max(j)),
            CollisionKind::Wall { i, wall } => (i, 1, wall.id()),
        }
    }
}

/// Output record of a resolved wall collision.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WallImpact {
    pub time: f64,
    pub particle: u32,
    pub wall: Wall,
    /// Velocity just before the reflection.
    pub velocity_before: [f64; DIM],
    pub mass: f64,
}

impl WallImpact {
    /// Magnitude of the velocity component normal to the struck wall before
    /// the bounce; the full speed for a corner.
    pub fn normal_speed(&self) -> f64 {
        let [vx, vy] = self.velocity_before;
        if self.wall.is_vertical() {
            vx.abs()
        } else if self.wall.is_horizontal() {
            vy.abs()
        } else {
            vx.hypot(vy)
        }
    }

    /// Momentum transferred to the wall, 2 m |v_n|.
    #[inline]
    pub fn impulse(&self) -> f64 {
        2.0 * self.mass * self.normal_speed()
    }
}

/// A scheduled collision in the priority queue with deterministic ordering.
///
/// - `time`: absolute event time (finite, non-NaN).
/// - `kind`: participants.
/// - `stamp_i`, `stamp_j`: collision-count snapshots for invalidation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Collision {
    pub time: NotNan<f64>,
    pub kind: CollisionKind,
    pub stamp_i: u64,
    pub stamp_j: Option<u64>,
}

impl Collision {
    /// Schedule a disk-disk collision, stamping both participants' current counts.
    pub fn between(time: f64, particles: &[Particle], i: usize, j: usize) -> Result<Self> {
        let (pi, pj) = (&particles[i], &particles[j]);
        Self::new(
            time,
            CollisionKind::Particle { i: pi.id, j: pj.id },
            pi.collision_count,
            Some(pj.collision_count),
        )
    }

    /// Schedule a disk-wall collision, stamping the particle's current count.
    pub fn with_wall(time: f64, particle: &Particle, wall: Wall) -> Result<Self> {
        Self::new(
            time,
            CollisionKind::Wall {
                i: particle.id,
                wall,
            },
            particle.collision_count,
            None,
        )
    }

    /// Create a new collision, validating that time is finite and non-NaN.
    pub fn new(
        time: f64,
        kind: CollisionKind,
        stamp_i: u64,
        stamp_j: Option<u64>,
    ) -> Result<Self> {
        if !time.is_finite() {
            return Err(Error::MathError(format!(
                "collision time must be finite, got {time} for {kind:?}"
            )));
        }
        let time = NotNan::new(time)
            .map_err(|_| Error::MathError("collision time cannot be NaN".into()))?;
        if matches!(kind, CollisionKind::Particle { .. }) != stamp_j.is_some() {
            return Err(Error::InvalidParam(
                "particle collisions carry two stamps, wall collisions one".into(),
            ));
        }
        if let CollisionKind::Particle { i, j } = kind {
            if i == j {
                return Err(Error::InvalidParam(format!(
                    "particle {i} cannot collide with itself"
                )));
            }
        }
        Ok(Self {
            time,
            kind,
            stamp_i,
            stamp_j,
        })
    }

    /// Returns the raw f64 event time.
    #[inline]
    pub fn time_f64(&self) -> f64 {
        self.time.into_inner()
    }

    /// Indices of the participants; the second is `None` for wall collisions.
    #[inline]
    pub fn participants(&self) -> (usize, Option<usize>) {
        match self.kind {
            CollisionKind::Particle { i, j } => (i as usize, Some(j as usize)),
            CollisionKind::Wall { i, .. } => (i as usize, None),
        }
    }

    /// True while every participant's live collision count still matches its stamp.
    pub fn is_valid(&self, particles: &[Particle]) -> bool {
        match (self.kind, self.stamp_j) {
            (CollisionKind::Particle { i, j }, Some(stamp_j)) => {
                particles[i as usize].collision_count == self.stamp_i
                    && particles[j as usize].collision_count == stamp_j
            }
            (CollisionKind::Wall { i, .. }, None) => {
                particles[i as usize].collision_count == self.stamp_i
            }
            _ => false,
        }
    }

    /// Apply the collision to the participants' velocities.
    ///
    /// Returns the impact record for wall collisions. Counts are not touched;
    /// bumping them is the scheduler's job.
    pub fn resolve(&self, particles: &mut [Particle]) -> Option<WallImpact> {
        match self.kind {
            CollisionKind::Particle { i, j } => {
                let (a, b) = pair_mut(particles, i as usize, j as usize);
                a.bounce_off(b);
                None
            }
            CollisionKind::Wall { i, wall } => {
                let p = &mut particles[i as usize];
                let impact = WallImpact {
                    time: self.time_f64(),
                    particle: p.id,
                    wall,
                    velocity_before: p.v,
                    mass: p.mass,
                };
                if wall.is_vertical() {
                    p.v[0] = -p.v[0];
                } else if wall.is_horizontal() {
                    p.v[1] = -p.v[1];
                } else {
                    p.v[0] = -p.v[0];
                    p.v[1] = -p.v[1];
                }
                Some(impact)
            }
        }
    }
}

impl Ord for Collision {
    fn cmp(&self, other: &Self) -> Ordering {
        self.time
            .cmp(&other.time)
            .then_with(|| self.kind.order_key().cmp(&other.kind.order_key()))
            .then_with(|| {
                // Final tie-breaker on stamps to ensure a total order.
                (self.stamp_i, self.stamp_j.unwrap_or(0))
                    .cmp(&(other.stamp_i, other.stamp_j.unwrap_or(0)))
            })
    }
}

impl PartialOrd for Collision {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// Two distinct mutable borrows into the arena.
fn pair_mut(particles: &mut [Particle], i: usize, j: usize) -> (&mut Particle, &mut Particle) {
    debug_assert_ne!(i, j, "self-collisions are rejected by Collision::new");
    if i < j {
        let (lo, hi) = particles.split_at_mut(j);
        (&mut lo[i], &mut hi[0])
    } else {
        let (lo, hi) = particles.split_at_mut(i);
        (&mut hi[0], &mut lo[j])
    }
}
