use crate::core::enclosure::{Enclosure, TIME_EPS};
use crate::core::event::{Collision, CollisionKind, WallImpact};
use crate::core::particle::{Particle, DIM, NO_HIT};
use crate::error::{Error, Result};
use std::cmp::Reverse;
use std::collections::BinaryHeap;
use tracing::{debug, trace, warn};

/// When a run stops.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Horizon {
    /// After this many accepted events.
    Steps(u64),
    /// Before accepting any event later than this absolute time.
    Time(f64),
}

impl Horizon {
    fn validate(&self) -> Result<()> {
        match *self {
            Horizon::Steps(0) => Err(Error::InvalidParam("step horizon must be > 0".into())),
            Horizon::Time(t) if !t.is_finite() || t <= 0.0 => Err(Error::InvalidParam(
                "time horizon must be finite and > 0".into(),
            )),
            _ => Ok(()),
        }
    }
}

/// Why a run stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Termination {
    Horizon,
    /// No valid event left (only possible for degenerate populations).
    QueueExhausted,
}

/// Outcome of one accepted event.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StepReport {
    pub time: f64,
    pub kind: CollisionKind,
    pub impact: Option<WallImpact>,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RunSummary {
    pub steps: u64,
    pub time: f64,
    pub stale_discarded: u64,
    pub termination: Termination,
}

/// Receives the state after every accepted event (and the initial state).
pub trait StepObserver {
    fn observe(
        &mut self,
        time: f64,
        particles: &[Particle],
        impact: Option<&WallImpact>,
    ) -> Result<()>;
}

impl StepObserver for () {
    fn observe(&mut self, _: f64, _: &[Particle], _: Option<&WallImpact>) -> Result<()> {
        Ok(())
    }
}

impl<T: StepObserver + ?Sized> StepObserver for &mut T {
    fn observe(
        &mut self,
        time: f64,
        particles: &[Particle],
        impact: Option<&WallImpact>,
    ) -> Result<()> {
        (**self).observe(time, particles, impact)
    }
}

impl<A: StepObserver, B: StepObserver> StepObserver for (A, B) {
    fn observe(
        &mut self,
        time: f64,
        particles: &[Particle],
        impact: Option<&WallImpact>,
    ) -> Result<()> {
        self.0.observe(time, particles, impact)?;
        self.1.observe(time, particles, impact)
    }
}

/// Observer that only keeps the wall impacts.
#[derive(Debug, Default, Clone)]
pub struct ImpactLog {
    pub impacts: Vec<WallImpact>,
}

impl StepObserver for ImpactLog {
    fn observe(&mut self, _: f64, _: &[Particle], impact: Option<&WallImpact>) -> Result<()> {
        if let Some(impact) = impact {
            self.impacts.push(*impact);
        }
        Ok(())
    }
}

/// Event-driven hard-disk simulation inside an [`Enclosure`].
///
/// Events live in a min-heap keyed on absolute time. Stale entries are not
/// removed eagerly: they are recognised by their collision-count stamps and
/// skipped when they reach the top of the queue.
#[derive(Debug)]
pub struct Simulation {
    time_now: f64,
    enclosure: Enclosure,
    pub particles: Vec<Particle>,
    pq: BinaryHeap<Reverse<Collision>>,
    steps: u64,
    stale_discarded: u64,
}

impl Simulation {
    /// Build a simulation from an initial population and schedule every initial event.
    ///
    /// Particle ids must equal their index; every disk must lie inside the
    /// enclosure and no two disks may overlap.
    pub fn new(particles: Vec<Particle>, enclosure: Enclosure) -> Result<Self> {
        if particles.is_empty() {
            return Err(Error::InvalidParam("at least one particle is required".into()));
        }
        for (idx, p) in particles.iter().enumerate() {
            if p.id as usize != idx {
                return Err(Error::InvalidParam(format!(
                    "particle at index {idx} has id {}; ids must equal indices",
                    p.id
                )));
            }
            if !enclosure.contains(p) {
                return Err(Error::InvalidParam(format!(
                    "particle {idx} at {:?} with radius {} is outside the enclosure",
                    p.r, p.radius
                )));
            }
        }
        for (i, a) in particles.iter().enumerate() {
            if let Some(b) = particles[i + 1..].iter().find(|b| a.overlaps(b)) {
                return Err(Error::InvalidParam(format!(
                    "particles {} and {} overlap",
                    a.id, b.id
                )));
            }
        }

        let mut sim = Self {
            time_now: 0.0,
            enclosure,
            particles,
            pq: BinaryHeap::new(),
            steps: 0,
            stale_discarded: 0,
        };
        sim.schedule_initial_events()?;
        debug!(
            particles = sim.particles.len(),
            queued = sim.pq.len(),
            door = ?sim.enclosure.door(),
            "simulation initialised"
        );
        Ok(sim)
    }

    /// Returns current simulation time.
    pub fn time(&self) -> f64 {
        self.time_now
    }

    /// Number of particles.
    pub fn num_particles(&self) -> usize {
        self.particles.len()
    }

    pub fn particles(&self) -> &[Particle] {
        &self.particles
    }

    pub fn enclosure(&self) -> &Enclosure {
        &self.enclosure
    }

    /// Accepted events so far.
    pub fn steps(&self) -> u64 {
        self.steps
    }

    /// Stale events dropped from the queue so far.
    pub fn stale_discarded(&self) -> u64 {
        self.stale_discarded
    }

    /// Queued events, stale ones included.
    pub fn queue_len(&self) -> usize {
        self.pq.len()
    }

    /// Positions as a Vec of fixed-size arrays.
    pub fn positions(&self) -> Vec<[f64; DIM]> {
        self.particles.iter().map(|p| p.r).collect()
    }

    /// Velocities as a Vec of fixed-size arrays.
    pub fn velocities(&self) -> Vec<[f64; DIM]> {
        self.particles.iter().map(|p| p.v).collect()
    }

    /// Compute total kinetic energy (diagnostic).
    pub fn kinetic_energy(&self) -> f64 {
        self.particles.iter().map(|p| p.kinetic_energy()).sum()
    }

    /// Total linear momentum (diagnostic; walls do not conserve it).
    pub fn momentum(&self) -> [f64; DIM] {
        self.particles.iter().fold([0.0; DIM], |acc, p| {
            let m = p.momentum();
            [acc[0] + m[0], acc[1] + m[1]]
        })
    }

    /// Process the next valid event. Returns `None` once the queue is exhausted.
    pub fn step(&mut self) -> Result<Option<StepReport>> {
        match self.take_next() {
            Some(ev) => self.apply(ev).map(Some),
            None => Ok(None),
        }
    }

    /// Run until `horizon` or queue exhaustion, reporting the initial state
    /// and every accepted event to `observer`.
    pub fn run<O: StepObserver + ?Sized>(
        &mut self,
        horizon: Horizon,
        observer: &mut O,
    ) -> Result<RunSummary> {
        horizon.validate()?;
        observer.observe(self.time_now, &self.particles, None)?;

        let start = self.steps;
        let termination = loop {
            if let Horizon::Steps(n) = horizon {
                if self.steps - start >= n {
                    break Termination::Horizon;
                }
            }
            let Some(t_next) = self.next_valid_time() else {
                break Termination::QueueExhausted;
            };
            if let Horizon::Time(t_end) = horizon {
                if t_next > t_end {
                    break Termination::Horizon;
                }
            }
            let Some(ev) = self.take_next() else {
                break Termination::QueueExhausted;
            };
            let report = self.apply(ev)?;
            observer.observe(report.time, &self.particles, report.impact.as_ref())?;
        };

        let summary = RunSummary {
            steps: self.steps - start,
            time: self.time_now,
            stale_discarded: self.stale_discarded,
            termination,
        };
        debug!(?summary, "run finished");
        Ok(summary)
    }

    /// Advance the simulation to `target_time` (must be ≥ current time).
    ///
    /// Every event up to `target_time` is processed and reported to
    /// `observer`; particles are then drifted to `target_time`.
    pub fn advance_to<O: StepObserver + ?Sized>(
        &mut self,
        target_time: f64,
        observer: &mut O,
    ) -> Result<()> {
        if !target_time.is_finite() {
            return Err(Error::InvalidParam("target_time must be finite".into()));
        }
        if target_time < self.time_now - TIME_EPS {
            return Err(Error::InvalidParam(
                "target_time cannot be earlier than current time".into(),
            ));
        }

        while let Some(t_next) = self.next_valid_time() {
            if t_next > target_time {
                break;
            }
            let Some(ev) = self.take_next() else { break };
            let report = self.apply(ev)?;
            observer.observe(report.time, &self.particles, report.impact.as_ref())?;
        }

        if target_time > self.time_now {
            self.drift_all(target_time)?;
            self.time_now = target_time;
        }
        Ok(())
    }

    /// Rebuild the event queue from the current particle states.
    ///
    /// Call after modifying positions or velocities from outside.
    pub fn rebuild_event_queue(&mut self) -> Result<()> {
        self.pq.clear();
        self.schedule_initial_events()
    }

    // ============ Internal helpers ============

    fn schedule_initial_events(&mut self) -> Result<()> {
        let n = self.particles.len();
        // Boundary first: a prediction may rewind its particle.
        for i in 0..n {
            self.predict_boundary(i)?;
        }
        for i in 0..n {
            for j in (i + 1)..n {
                self.push_pair(i, j)?;
            }
        }
        Ok(())
    }

    /// Drop stale events from the top of the queue and return the next valid time.
    fn next_valid_time(&mut self) -> Option<f64> {
        while let Some(Reverse(top)) = self.pq.peek() {
            if top.is_valid(&self.particles) {
                return Some(top.time_f64());
            }
            trace!(kind = ?top.kind, time = top.time_f64(), "discarding stale collision");
            self.pq.pop();
            self.stale_discarded += 1;
        }
        None
    }

    fn take_next(&mut self) -> Option<Collision> {
        self.next_valid_time()?;
        self.pq.pop().map(|Reverse(ev)| ev)
    }

    fn apply(&mut self, ev: Collision) -> Result<StepReport> {
        let t_ev = ev.time_f64();
        self.drift_all(t_ev)?;
        self.time_now = t_ev;

        let impact = ev.resolve(&mut self.particles);
        let (i, j) = ev.participants();
        self.ensure_finite(i)?;
        self.particles[i].bump_collision_count();
        if let Some(j) = j {
            self.ensure_finite(j)?;
            self.particles[j].bump_collision_count();
        }

        match j {
            Some(j) => {
                self.reschedule_for_particle(i, Some(j))?;
                self.reschedule_for_particle(j, None)?;
            }
            None => self.reschedule_for_particle(i, None)?,
        }

        self.steps += 1;
        trace!(step = self.steps, time = t_ev, kind = ?ev.kind, "collision resolved");
        Ok(StepReport {
            time: t_ev,
            kind: ev.kind,
            impact,
        })
    }

    /// Predict new events for `i`; `skip` is left out of the pair scan.
    fn reschedule_for_particle(&mut self, i: usize, skip: Option<usize>) -> Result<()> {
        self.predict_boundary(i)?;
        for j in 0..self.particles.len() {
            if j == i || Some(j) == skip {
                continue;
            }
            self.push_pair(i, j)?;
        }
        Ok(())
    }

    fn predict_boundary(&mut self, i: usize) -> Result<()> {
        let Some(hit) = self.enclosure.time_to_hit_boundary(&self.particles[i])? else {
            return Ok(());
        };
        if hit.rewind > 0.0 {
            warn!(
                particle = i,
                rewind = hit.rewind,
                wall = %hit.wall,
                time = self.time_now,
                "rewinding particle to escape a degenerate boundary state"
            );
            self.particles[i].drift(-hit.rewind);
        }
        let ev = Collision::with_wall(self.time_now + hit.dt, &self.particles[i], hit.wall)?;
        self.pq.push(Reverse(ev));
        Ok(())
    }

    fn push_pair(&mut self, i: usize, j: usize) -> Result<()> {
        let t = self.particles[i].time_to_hit(&self.particles[j]);
        if t == NO_HIT {
            return Ok(());
        }
        let ev = Collision::between(self.time_now + t, &self.particles, i, j)?;
        self.pq.push(Reverse(ev));
        Ok(())
    }

    /// Drift all particles to the specified absolute time by linear motion.
    fn drift_all(&mut self, to_time: f64) -> Result<()> {
        let dt = to_time - self.time_now;
        if dt < -TIME_EPS {
            return Err(Error::MathError(format!(
                "cannot drift backwards in time (from {} to {to_time})",
                self.time_now
            )));
        }
        if dt <= 0.0 {
            return Ok(());
        }
        for p in &mut self.particles {
            p.drift(dt);
        }
        Ok(())
    }

    fn ensure_finite(&self, i: usize) -> Result<()> {
        let p = &self.particles[i];
        if p.v.iter().chain(p.r.iter()).all(|x| x.is_finite()) {
            Ok(())
        } else {
            Err(Error::MathError(format!(
                "particle {i} reached a non-finite state at t = {}",
                self.time_now
            )))
        }
    }
}
