//! Run configuration read from a TOML file.
//!
//! Every field has a default, so an empty file (or no file at all) yields the
//! standard 300-particle, 0.09 m box setup. The `[analysis]` table only
//! affects the statistics logged after each run. Command-line flags are applied on
//! top of the loaded values and [`RunConfig::validate`] runs last.

use std::fs::read_to_string;
use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::core::diffusion::{DEFAULT_FIT_WINDOW, DEFAULT_STEADY_STATE};
use crate::core::enclosure::{
    Enclosure, DEFAULT_CORNER_PROXIMITY, DEFAULT_NUDGE, DEFAULT_SIZE,
};
use crate::core::sim::Horizon;
use crate::error::{Error, Result};
use crate::io::generator::GeneratorConfig;

/// Step horizon used when the configuration names none.
pub const DEFAULT_STEPS: u64 = 1000;

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RunConfig {
    pub particles: usize,
    pub iterations: usize,
    pub input_dir: PathBuf,
    pub output_dir: PathBuf,
    pub horizon: HorizonConfig,
    pub enclosure: EnclosureConfig,
    pub generator: GeneratorSettings,
    pub analysis: AnalysisConfig,
}

/// At most one of `steps` or `time`; neither means [`DEFAULT_STEPS`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct HorizonConfig {
    pub steps: Option<u64>,
    pub time: Option<f64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct EnclosureConfig {
    pub x0: f64,
    pub y0: f64,
    pub width: f64,
    pub height: f64,
    /// Door opening; `None` is a plain box.
    pub door: Option<f64>,
    pub corner_proximity: f64,
    pub nudge: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct GeneratorSettings {
    pub speed: f64,
    pub radius: f64,
    pub seed: Option<u64>,
}

/// Post-run statistics: pressure bins and the MSD fit.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct AnalysisConfig {
    /// Start of the steady state; earlier impacts and frames are ignored.
    pub steady_state: f64,
    pub pressure_bin: f64,
    pub fit_min_tau: f64,
    pub fit_max_tau: f64,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            particles: 300,
            iterations: 5,
            input_dir: PathBuf::from("inputs"),
            output_dir: PathBuf::from("outputs"),
            horizon: HorizonConfig::default(),
            enclosure: EnclosureConfig::default(),
            generator: GeneratorSettings::default(),
            analysis: AnalysisConfig::default(),
        }
    }
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            steady_state: DEFAULT_STEADY_STATE,
            pressure_bin: 1.0,
            fit_min_tau: DEFAULT_FIT_WINDOW[0],
            fit_max_tau: DEFAULT_FIT_WINDOW[1],
        }
    }
}

impl Default for EnclosureConfig {
    fn default() -> Self {
        Self {
            x0: 0.0,
            y0: 0.0,
            width: DEFAULT_SIZE,
            height: DEFAULT_SIZE,
            door: None,
            corner_proximity: DEFAULT_CORNER_PROXIMITY,
            nudge: DEFAULT_NUDGE,
        }
    }
}

impl Default for GeneratorSettings {
    fn default() -> Self {
        Self {
            speed: 0.01,
            radius: 0.0015,
            seed: None,
        }
    }
}

impl RunConfig {
    pub fn load(path: &Path) -> Result<Self> {
        let content = read_to_string(path)?;
        Ok(toml::from_str(&content)?)
    }

    /// Reject empty, non-positive or contradictory settings.
    pub fn validate(&self) -> Result<()> {
        if self.particles == 0 {
            return Err(Error::InvalidParam("particles must be > 0".into()));
        }
        if self.iterations == 0 {
            return Err(Error::InvalidParam("iterations must be > 0".into()));
        }
        if self.input_dir.as_os_str().is_empty() {
            return Err(Error::InvalidParam("input directory must not be empty".into()));
        }
        if self.output_dir.as_os_str().is_empty() {
            return Err(Error::InvalidParam("output directory must not be empty".into()));
        }
        self.horizon.to_horizon()?;
        self.enclosure.build()?;
        self.analysis.validate()?;
        self.generator_config().validate()
    }

    /// Generator parameters for the left chamber of the configured enclosure.
    pub fn generator_config(&self) -> GeneratorConfig {
        GeneratorConfig {
            count: self.particles,
            box_width: self.enclosure.width,
            box_height: self.enclosure.height,
            speed: self.generator.speed,
            radius: self.generator.radius,
        }
    }
}

impl HorizonConfig {
    pub fn to_horizon(&self) -> Result<Horizon> {
        match (self.steps, self.time) {
            (Some(_), Some(_)) => Err(Error::InvalidParam(
                "horizon takes either steps or time, not both".into(),
            )),
            (Some(0), None) => Err(Error::InvalidParam("horizon steps must be > 0".into())),
            (Some(n), None) => Ok(Horizon::Steps(n)),
            (None, Some(t)) if t.is_finite() && t > 0.0 => Ok(Horizon::Time(t)),
            (None, Some(t)) => Err(Error::InvalidParam(format!(
                "horizon time must be finite and > 0, got {t}"
            ))),
            (None, None) => Ok(Horizon::Steps(DEFAULT_STEPS)),
        }
    }

    /// Tag used in output file names (`t{tag}`).
    pub fn tag(&self) -> String {
        match (self.steps, self.time) {
            (Some(n), _) => n.to_string(),
            (None, Some(t)) => format!("{t}"),
            (None, None) => DEFAULT_STEPS.to_string(),
        }
    }
}

impl AnalysisConfig {
    pub fn validate(&self) -> Result<()> {
        if !self.steady_state.is_finite() || self.steady_state < 0.0 {
            return Err(Error::InvalidParam(format!(
                "steady_state must be finite and >= 0, got {}",
                self.steady_state
            )));
        }
        if !self.pressure_bin.is_finite() || self.pressure_bin <= 0.0 {
            return Err(Error::InvalidParam(format!(
                "pressure_bin must be finite and > 0, got {}",
                self.pressure_bin
            )));
        }
        let (lo, hi) = (self.fit_min_tau, self.fit_max_tau);
        if !(lo.is_finite() && hi.is_finite() && 0.0 <= lo && lo < hi) {
            return Err(Error::InvalidParam(format!(
                "fit window must satisfy 0 <= fit_min_tau < fit_max_tau, got [{lo}, {hi}]"
            )));
        }
        Ok(())
    }
}

impl EnclosureConfig {
    pub fn build(&self) -> Result<Enclosure> {
        let enclosure = Enclosure::new(self.x0, self.y0, self.width, self.height)?
            .with_corner_proximity(self.corner_proximity)?
            .with_nudge(self.nudge)?;
        match self.door {
            Some(l) => enclosure.with_door(l),
            None => Ok(enclosure),
        }
    }
}
