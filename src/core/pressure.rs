//! Wall pressure from recorded impacts.
//!
//! Each impact transfers `2·m·|v_n|` of momentum to its wall. Pressure over a
//! window of length `Δt` on a chamber is the summed transfer divided by
//! `Δt` and by the chamber perimeter.

use crate::core::enclosure::{Chamber, Enclosure};
use crate::core::event::WallImpact;
use crate::error::{Error, Result};

/// Pressure on both chambers over `[start, end)`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PressureBin {
    pub start: f64,
    pub end: f64,
    pub left: f64,
    /// Zero when the enclosure has no second chamber.
    pub right: f64,
}

impl PressureBin {
    pub fn center(&self) -> f64 {
        0.5 * (self.start + self.end)
    }

    pub fn get(&self, chamber: Chamber) -> f64 {
        match chamber {
            Chamber::Left => self.left,
            Chamber::Right => self.right,
        }
    }
}

/// Largest number of bins [`pressure_series`] will allocate.
pub const MAX_BINS: usize = 1 << 20;

fn validate_width(bin: f64) -> Result<()> {
    if !bin.is_finite() || bin <= 0.0 {
        return Err(Error::InvalidParam(format!(
            "pressure bin width must be finite and > 0, got {bin}"
        )));
    }
    Ok(())
}

fn pressure(impulse: f64, dt: f64, perimeter: f64) -> f64 {
    if perimeter > 0.0 {
        impulse / (dt * perimeter)
    } else {
        0.0
    }
}

/// Bin impacts into consecutive windows of width `bin` starting at t = 0.
///
/// Only complete windows are returned: the trailing partial window after the
/// last full bin is dropped. Corner impacts carry no wall and are ignored.
/// A width giving more than [`MAX_BINS`] windows is an `InvalidParam`.
pub fn pressure_series(
    impacts: &[WallImpact],
    enclosure: &Enclosure,
    bin: f64,
) -> Result<Vec<PressureBin>> {
    validate_width(bin)?;
    let last = impacts.iter().map(|i| i.time).fold(0.0_f64, f64::max);
    let n_bins = (last / bin).floor();
    if n_bins > MAX_BINS as f64 {
        return Err(Error::InvalidParam(format!(
            "bin width {bin} over {last} time units gives more than {MAX_BINS} bins"
        )));
    }
    let n_bins = n_bins as usize;
    let mut sums = vec![[0.0_f64; 2]; n_bins];

    for impact in impacts {
        let Some(chamber) = Chamber::of(impact.wall) else {
            continue;
        };
        let k = (impact.time / bin).floor() as usize;
        if let Some(slot) = sums.get_mut(k) {
            slot[chamber as usize] += impact.impulse();
        }
    }

    let p_left = enclosure.perimeter(Chamber::Left);
    let p_right = enclosure.perimeter(Chamber::Right);
    Ok(sums
        .iter()
        .enumerate()
        .map(|(k, [left, right])| PressureBin {
            start: k as f64 * bin,
            end: (k + 1) as f64 * bin,
            left: pressure(*left, bin, p_left),
            right: pressure(*right, bin, p_right),
        })
        .collect())
}

/// Mean pressure on `chamber` from `since` to the last recorded impact.
///
/// Returns 0 when no time elapses after `since`.
pub fn mean_pressure(
    impacts: &[WallImpact],
    enclosure: &Enclosure,
    chamber: Chamber,
    since: f64,
) -> Result<f64> {
    if !since.is_finite() || since < 0.0 {
        return Err(Error::InvalidParam(format!(
            "steady-state start must be finite and >= 0, got {since}"
        )));
    }
    let last = impacts.iter().map(|i| i.time).fold(since, f64::max);
    let dt = last - since;
    if dt <= 0.0 {
        return Ok(0.0);
    }
    let impulse: f64 = impacts
        .iter()
        .filter(|i| i.time >= since && Chamber::of(i.wall) == Some(chamber))
        .map(WallImpact::impulse)
        .sum();
    Ok(pressure(impulse, dt, enclosure.perimeter(chamber)))
}
