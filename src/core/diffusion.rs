//! Mean squared displacement and the self-diffusion coefficient.
//!
//! The MSD is anchored at the first frame whose time is at or after the
//! steady-state start `t_ss`; later frames give
//! `MSD(t) = (1/N) Σ |r_i(t) - r_i(anchor)|²` at `t - t_anchor`.
//! In two dimensions `MSD ≈ 2·DIM·D·t`, so `D` is the fitted slope over `4`.

use crate::core::event::WallImpact;
use crate::core::particle::{dot, sub, Particle, DIM};
use crate::core::sim::StepObserver;
use crate::error::{Error, Result};
use tracing::warn;

/// Steady-state start used when none is configured (seconds).
pub const DEFAULT_STEADY_STATE: f64 = 0.0;

/// Default fit window on the relative time axis (seconds).
pub const DEFAULT_FIT_WINDOW: [f64; 2] = [0.15, 0.60];

/// Points used when the fit window holds fewer than [`MIN_FIT_POINTS`].
const FALLBACK_POINTS: usize = 10;

const MIN_FIT_POINTS: usize = 3;

/// One MSD value at a time relative to the anchor frame.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MsdSample {
    pub t: f64,
    pub msd: f64,
}

/// Observer that records the anchored MSD of every frame after `t_ss`.
#[derive(Debug, Clone)]
pub struct MsdObserver {
    since: f64,
    anchor: Option<(f64, Vec<[f64; DIM]>)>,
    samples: Vec<MsdSample>,
}

impl MsdObserver {
    pub fn new(since: f64) -> Result<Self> {
        if !since.is_finite() || since < 0.0 {
            return Err(Error::InvalidParam(format!(
                "steady-state start must be finite and >= 0, got {since}"
            )));
        }
        Ok(Self {
            since,
            anchor: None,
            samples: Vec::new(),
        })
    }

    /// Absolute time of the anchor frame, once one has been seen.
    pub fn anchor_time(&self) -> Option<f64> {
        self.anchor.as_ref().map(|(t, _)| *t)
    }

    pub fn samples(&self) -> &[MsdSample] {
        &self.samples
    }
}

impl StepObserver for MsdObserver {
    fn observe(
        &mut self,
        time: f64,
        particles: &[Particle],
        _: Option<&WallImpact>,
    ) -> Result<()> {
        let Some((t0, origin)) = &self.anchor else {
            if time >= self.since {
                self.anchor = Some((time, particles.iter().map(|p| p.r).collect()));
            }
            return Ok(());
        };
        let n = origin.len().min(particles.len());
        if n == 0 {
            return Ok(());
        }
        let sum: f64 = particles
            .iter()
            .zip(origin)
            .map(|(p, r0)| {
                let d = sub(&p.r, r0);
                dot(&d, &d)
            })
            .sum();
        self.samples.push(MsdSample {
            t: time - t0,
            msd: sum / n as f64,
        });
        Ok(())
    }
}

/// Ordinary least squares fit of `y = intercept + slope·x`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LinearFit {
    pub intercept: f64,
    pub slope: f64,
    /// Residual variance, `Σ r² / max(n - 2, 1)`.
    pub sigma2: f64,
    pub var_intercept: f64,
    pub var_slope: f64,
}

pub fn linear_fit(x: &[f64], y: &[f64]) -> Result<LinearFit> {
    if x.len() != y.len() {
        return Err(Error::InvalidParam(format!(
            "fit needs paired samples, got {} x and {} y",
            x.len(),
            y.len()
        )));
    }
    let n = x.len();
    if n < 2 {
        return Err(Error::InvalidParam(format!(
            "fit needs at least 2 points, got {n}"
        )));
    }
    let s = n as f64;
    let sx: f64 = x.iter().sum();
    let sy: f64 = y.iter().sum();
    let sxx: f64 = x.iter().map(|v| v * v).sum();
    let sxy: f64 = x.iter().zip(y).map(|(a, b)| a * b).sum();
    let delta = s * sxx - sx * sx;
    if !(delta.is_finite() && delta > 0.0) {
        return Err(Error::MathError(
            "fit abscissae are all equal or not finite".into(),
        ));
    }
    let slope = (s * sxy - sx * sy) / delta;
    let intercept = (sxx * sy - sx * sxy) / delta;
    let ss: f64 = x
        .iter()
        .zip(y)
        .map(|(a, b)| {
            let r = b - (intercept + slope * a);
            r * r
        })
        .sum();
    let sigma2 = ss / n.saturating_sub(2).max(1) as f64;
    Ok(LinearFit {
        intercept,
        slope,
        sigma2,
        var_intercept: sigma2 * sxx / delta,
        var_slope: sigma2 * s / delta,
    })
}

/// Diffusion coefficient with its standard error and the fit behind it.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Diffusion {
    pub coefficient: f64,
    pub error: f64,
    pub fit: LinearFit,
    /// Number of MSD samples the fit used.
    pub points: usize,
}

/// Fit the MSD samples with `tau_min <= t <= tau_max`.
///
/// When the window holds fewer than three samples the first ten are used
/// instead, with a warning.
pub fn diffusion_coefficient(
    samples: &[MsdSample],
    tau_min: f64,
    tau_max: f64,
) -> Result<Diffusion> {
    if !(tau_min.is_finite() && tau_max.is_finite() && 0.0 <= tau_min && tau_min < tau_max) {
        return Err(Error::InvalidParam(format!(
            "fit window must satisfy 0 <= min < max, got [{tau_min}, {tau_max}]"
        )));
    }
    let mut window: Vec<MsdSample> = samples
        .iter()
        .copied()
        .filter(|s| s.t >= tau_min && s.t <= tau_max)
        .collect();
    if window.len() < MIN_FIT_POINTS {
        warn!(
            in_window = window.len(),
            tau_min, tau_max, "fit window too small, using the first samples"
        );
        window = samples.iter().copied().take(FALLBACK_POINTS).collect();
    }
    let (x, y): (Vec<f64>, Vec<f64>) = window.iter().map(|s| (s.t, s.msd)).unzip();
    let fit = linear_fit(&x, &y)?;
    let scale = 2.0 * DIM as f64;
    Ok(Diffusion {
        coefficient: fit.slope / scale,
        error: fit.var_slope.sqrt() / scale,
        fit,
        points: window.len(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn assert_close(a: f64, b: f64) {
        assert!((a - b).abs() < 1e-12, "{a} != {b}");
    }

    /// Two free disks moving at constant velocity from fixed starts.
    fn ballistic(t: f64) -> Vec<Particle> {
        vec![
            Particle::new(0, [0.1 + t, 0.2], [1.0, 0.0], 0.01, 1.0).unwrap(),
            Particle::new(1, [0.5, 0.5 + 2.0 * t], [0.0, 2.0], 0.01, 1.0).unwrap(),
        ]
    }

    #[test]
    fn exact_line_has_no_residual() -> Result<()> {
        let x = [0.0, 1.0, 2.0, 3.0];
        let y = x.map(|v| 1.0 + 2.0 * v);
        let fit = linear_fit(&x, &y)?;
        assert_close(fit.intercept, 1.0);
        assert_close(fit.slope, 2.0);
        assert_close(fit.sigma2, 0.0);
        Ok(())
    }

    #[test]
    fn noisy_fit_reports_variances() -> Result<()> {
        let fit = linear_fit(&[0.0, 1.0, 2.0, 3.0], &[0.0, 1.0, 1.0, 3.0])?;
        assert_close(fit.slope, 0.9);
        assert_close(fit.intercept, -0.1);
        assert_close(fit.sigma2, 0.35);
        assert_close(fit.var_slope, 0.07);
        assert_close(fit.var_intercept, 0.245);
        Ok(())
    }

    #[test]
    fn degenerate_fits_rejected() {
        assert!(matches!(linear_fit(&[1.0], &[2.0]), Err(Error::InvalidParam(_))));
        assert!(matches!(linear_fit(&[1.0, 2.0], &[2.0]), Err(Error::InvalidParam(_))));
        assert!(matches!(
            linear_fit(&[1.0, 1.0, 1.0], &[0.0, 1.0, 2.0]),
            Err(Error::MathError(_))
        ));
    }

    #[test]
    fn ballistic_msd_grows_quadratically_from_the_anchor() -> Result<()> {
        let mut msd = MsdObserver::new(1.0)?;
        for k in 0..=20 {
            let t = 0.1 * k as f64;
            msd.observe(t, &ballistic(t), None)?;
        }
        let t0 = msd.anchor_time().expect("anchored");
        assert!((t0 - 1.0).abs() < 1e-12);
        // Frames 11..=20 come after the anchor at frame 10.
        assert_eq!(msd.samples().len(), 10);
        for s in msd.samples() {
            // (1² + 2²) / 2 = 2.5 per unit time squared.
            let expected = 2.5 * s.t * s.t;
            assert!((s.msd - expected).abs() < 1e-9, "{} vs {expected}", s.msd);
        }
        Ok(())
    }

    #[test]
    fn frames_before_steady_state_are_ignored() -> Result<()> {
        let mut msd = MsdObserver::new(5.0)?;
        msd.observe(1.0, &ballistic(1.0), None)?;
        msd.observe(4.9, &ballistic(4.9), None)?;
        assert_eq!(msd.anchor_time(), None);
        assert!(msd.samples().is_empty());
        assert!(MsdObserver::new(-1.0).is_err());
        Ok(())
    }

    #[test]
    fn linear_msd_gives_the_coefficient() -> Result<()> {
        let d = 2.5e-5;
        let samples: Vec<MsdSample> = (1..=100)
            .map(|k| {
                let t = k as f64 / 100.0;
                MsdSample { t, msd: 4.0 * d * t }
            })
            .collect();
        let [lo, hi] = DEFAULT_FIT_WINDOW;
        let got = diffusion_coefficient(&samples, lo, hi)?;
        assert!((got.coefficient - d).abs() < 1e-15);
        assert!(got.error < 1e-15);
        assert_eq!(got.points, 46);
        Ok(())
    }

    #[test]
    fn ballistic_fit_slope_matches_the_window_secant() -> Result<()> {
        // For MSD = c t² sampled symmetrically, the OLS slope is c (lo + hi).
        let c = 2.5;
        let samples: Vec<MsdSample> = (0..=10)
            .map(|k| {
                let t = 1.0 + 0.1 * k as f64;
                MsdSample { t, msd: c * t * t }
            })
            .collect();
        let got = diffusion_coefficient(&samples, 1.0, 2.0)?;
        assert!((got.fit.slope - c * 3.0).abs() < 1e-9, "{}", got.fit.slope);
        assert!((got.coefficient - c * 3.0 / 4.0).abs() < 1e-9);
        Ok(())
    }

    #[test]
    fn small_window_falls_back_to_the_first_samples() -> Result<()> {
        let samples: Vec<MsdSample> = (1..=30)
            .map(|k| MsdSample {
                t: k as f64,
                msd: 8.0 * k as f64,
            })
            .collect();
        let got = diffusion_coefficient(&samples, 0.15, 0.6)?;
        assert_eq!(got.points, 10);
        assert!((got.coefficient - 2.0).abs() < 1e-12);
        assert!(diffusion_coefficient(&samples, 1.0, 0.5).is_err());
        assert!(diffusion_coefficient(&samples[..1], 0.15, 0.6).is_err());
        Ok(())
    }
}
