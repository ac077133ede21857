//! Trajectory and collision-log writers.
//!
//! Trajectory frame: the time at 4 decimals on its own line, then one
//! `x,y,vx,vy,radius` line per particle. Collision log: one
//! `time,wallId,normalSpeed` line per flat-wall impact.

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use crate::core::event::{Wall, WallImpact};
use crate::core::particle::Particle;
use crate::core::sim::StepObserver;
use crate::error::{Error, Result};

/// Writes a trajectory and its collision log side by side.
#[derive(Debug)]
pub struct TrajectoryWriter<W: Write> {
    frames: W,
    collisions: W,
    frames_written: u64,
    impacts_written: u64,
}

impl TrajectoryWriter<BufWriter<File>> {
    /// Create (truncating) `path` and its sibling `<stem>_collisions.csv`.
    pub fn create(path: &Path) -> Result<Self> {
        let collisions = collisions_path(path)?;
        let frames = BufWriter::new(File::create(path)?);
        let collisions = BufWriter::new(File::create(collisions)?);
        Ok(Self::new(frames, collisions))
    }
}

impl<W: Write> TrajectoryWriter<W> {
    pub fn new(frames: W, collisions: W) -> Self {
        Self {
            frames,
            collisions,
            frames_written: 0,
            impacts_written: 0,
        }
    }

    pub fn write_frame(&mut self, time: f64, particles: &[Particle]) -> Result<()> {
        writeln!(self.frames, "{time:.4}")?;
        for p in particles {
            writeln!(
                self.frames,
                "{:.16e},{:.16e},{:.16e},{:.16e},{:.16e}",
                p.r[0], p.r[1], p.v[0], p.v[1], p.radius
            )?;
        }
        self.frames_written += 1;
        Ok(())
    }

    /// Log a wall impact; corner impacts are skipped.
    pub fn write_impact(&mut self, impact: &WallImpact) -> Result<()> {
        if impact.wall == Wall::Corner {
            return Ok(());
        }
        writeln!(
            self.collisions,
            "{:.4},{},{:.16e}",
            impact.time,
            impact.wall.id(),
            impact.normal_speed()
        )?;
        self.impacts_written += 1;
        Ok(())
    }

    pub fn frames_written(&self) -> u64 {
        self.frames_written
    }

    pub fn impacts_written(&self) -> u64 {
        self.impacts_written
    }

    /// Flush both streams and hand them back.
    pub fn finish(mut self) -> Result<(W, W)> {
        self.frames.flush()?;
        self.collisions.flush()?;
        Ok((self.frames, self.collisions))
    }
}

impl<W: Write> StepObserver for TrajectoryWriter<W> {
    fn observe(
        &mut self,
        time: f64,
        particles: &[Particle],
        impact: Option<&WallImpact>,
    ) -> Result<()> {
        self.write_frame(time, particles)?;
        if let Some(impact) = impact {
            self.write_impact(impact)?;
        }
        Ok(())
    }
}

/// `dir/output.csv` → `dir/output_collisions.csv`.
pub fn collisions_path(path: &Path) -> Result<PathBuf> {
    let stem = path
        .file_stem()
        .and_then(|s| s.to_str())
        .ok_or_else(|| Error::InvalidParam(format!("invalid trajectory path {path:?}")))?;
    Ok(path.with_file_name(format!("{stem}_collisions.csv")))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn impact(wall: Wall, v: [f64; 2]) -> WallImpact {
        WallImpact {
            time: 1.23456,
            particle: 3,
            wall,
            velocity_before: v,
            mass: 1.0,
        }
    }

    #[test]
    fn frame_layout() -> Result<()> {
        let particles = vec![
            Particle::new(0, [0.5, 0.25], [-1.0, 0.125], 0.0015, 1.0)?,
            Particle::new(1, [0.1, 0.2], [0.0, 0.0], 0.0015, 1.0)?,
        ];
        let mut w = TrajectoryWriter::new(Vec::new(), Vec::new());
        w.write_frame(0.0, &particles)?;
        w.write_frame(2.5, &particles)?;
        assert_eq!(w.frames_written(), 2);
        let (frames, _) = w.finish()?;
        let text = String::from_utf8(frames).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines.len(), 6);
        assert_eq!(lines[0], "0.0000");
        assert_eq!(lines[3], "2.5000");

        let fields: Vec<f64> = lines[1].split(',').map(|f| f.parse().unwrap()).collect();
        assert_eq!(fields, vec![0.5, 0.25, -1.0, 0.125, 0.0015]);
        Ok(())
    }

    #[test]
    fn impacts_use_wall_ids_and_skip_corners() -> Result<()> {
        let mut w = TrajectoryWriter::new(Vec::new(), Vec::new());
        w.write_impact(&impact(Wall::Top2, [0.3, -2.0]))?;
        w.write_impact(&impact(Wall::Corner, [1.0, 1.0]))?;
        w.write_impact(&impact(Wall::Left, [-0.5, 7.0]))?;
        assert_eq!(w.impacts_written(), 2);
        let (_, log) = w.finish()?;
        let text = String::from_utf8(log).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines.len(), 2);
        assert!(lines[0].starts_with("1.2346,4,"));
        assert!(lines[1].starts_with("1.2346,2,"));
        let speed: f64 = lines[0].rsplit(',').next().unwrap().parse().unwrap();
        assert_eq!(speed, 2.0);
        Ok(())
    }

    #[test]
    fn observer_writes_frame_then_impact() -> Result<()> {
        let particles = vec![Particle::new(0, [0.5, 0.5], [1.0, 0.0], 0.1, 1.0)?];
        let mut w = TrajectoryWriter::new(Vec::new(), Vec::new());
        w.observe(0.0, &particles, None)?;
        w.observe(0.4, &particles, Some(&impact(Wall::Right1, [1.0, 0.0])))?;
        assert_eq!(w.frames_written(), 2);
        assert_eq!(w.impacts_written(), 1);
        Ok(())
    }

    #[test]
    fn create_opens_the_sibling_log() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let path = dir.path().join("output_N1_L0.050_t10_0000.csv");
        let mut w = TrajectoryWriter::create(&path)?;
        w.write_impact(&impact(Wall::Bottom1, [0.0, 3.0]))?;
        w.finish()?;
        let log_path = dir.path().join("output_N1_L0.050_t10_0000_collisions.csv");
        let log = std::fs::read_to_string(log_path)?;
        assert!(log.starts_with("1.2346,1,"));
        assert!(path.is_file());
        Ok(())
    }
}
