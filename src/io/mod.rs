//! File formats and on-disk layout of a simulation campaign.

pub mod generator;
pub mod input;
pub mod output;

use std::path::{Path, PathBuf};

pub use generator::{generate, write_particles, GeneratorConfig};
pub use input::{parse_particles, read_particles};
pub use output::TrajectoryWriter;

/// `dir/N{n}/input_N{n}_{iteration:04}.txt`
pub fn input_path(dir: &Path, n: usize, iteration: usize) -> PathBuf {
    dir.join(format!("N{n}"))
        .join(format!("input_N{n}_{iteration:04}.txt"))
}

/// `dir/N_{n}_L{door:.3}/output_N{n}_L{door:.3}_t{tag}_{iteration:04}.csv`
pub fn output_path(dir: &Path, n: usize, door: f64, tag: &str, iteration: usize) -> PathBuf {
    let l = format!("L{door:.3}");
    dir.join(format!("N_{n}_{l}"))
        .join(format!("output_N{n}_{l}_t{tag}_{iteration:04}.csv"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn campaign_layout() {
        assert_eq!(
            input_path(Path::new("inputs"), 300, 3),
            PathBuf::from("inputs/N300/input_N300_0003.txt")
        );
        assert_eq!(
            output_path(Path::new("out"), 300, 0.05, "1000", 12),
            PathBuf::from("out/N_300_L0.050/output_N300_L0.050_t1000_0012.csv")
        );
    }
}
