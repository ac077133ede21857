use std::fs;
use std::io::BufWriter;

use diskgas::config::RunConfig;
use diskgas::core::{Horizon, ImpactLog, Simulation, Wall};
use diskgas::io::generator::{generate, seeded_rng, write_particles};
use diskgas::io::{input_path, output_path, read_particles, TrajectoryWriter};
use diskgas::Result;

#[test]
fn generated_inputs_run_into_trajectory_files() -> Result<()> {
    let dir = tempfile::tempdir()?;
    let cfg: RunConfig = toml::from_str(&format!(
        r#"
        particles = 25
        iterations = 2
        input_dir = "{input}"
        output_dir = "{output}"

        [horizon]
        steps = 200

        [enclosure]
        door = 0.05

        [generator]
        seed = 99
        "#,
        input = dir.path().join("inputs").display(),
        output = dir.path().join("outputs").display(),
    ))?;
    cfg.validate()?;

    for i in 0..cfg.iterations {
        let particles = generate(&cfg.generator_config(), &mut seeded_rng(Some(99 + i as u64)))?;
        let path = input_path(&cfg.input_dir, cfg.particles, i);
        fs::create_dir_all(path.parent().unwrap())?;
        write_particles(&mut BufWriter::new(fs::File::create(&path)?), &particles)?;
    }

    let enclosure = cfg.enclosure.build()?;
    let horizon = cfg.horizon.to_horizon()?;
    for i in 0..cfg.iterations {
        let input = input_path(&cfg.input_dir, cfg.particles, i);
        let particles = read_particles(&input, cfg.particles)?;
        let out = output_path(&cfg.output_dir, cfg.particles, 0.05, &cfg.horizon.tag(), i);
        fs::create_dir_all(out.parent().unwrap())?;

        let mut sim = Simulation::new(particles, enclosure.clone())?;
        let mut writer = TrajectoryWriter::create(&out)?;
        let mut log = ImpactLog::default();
        let summary = sim.run(horizon, &mut (&mut writer, &mut log))?;
        writer.finish()?;
        assert_eq!(summary.steps, 200);

        let frames = fs::read_to_string(&out)?;
        assert_eq!(frames.lines().count(), (200 + 1) * (25 + 1));
        assert_eq!(frames.lines().next(), Some("0.0000"));

        let log_path = out.with_file_name(format!(
            "output_N25_L0.050_t200_{i:04}_collisions.csv"
        ));
        let collisions = fs::read_to_string(log_path)?;
        let flat = log.impacts.iter().filter(|i| i.wall != Wall::Corner).count();
        assert_eq!(collisions.lines().count(), flat);
        for line in collisions.lines() {
            let fields: Vec<&str> = line.split(',').collect();
            assert_eq!(fields.len(), 3);
            let wall: u32 = fields[1].parse().unwrap();
            assert!(wall < 7);
            let speed: f64 = fields[2].parse().unwrap();
            assert!(speed >= 0.0);
        }
    }

    assert!(dir
        .path()
        .join("outputs/N_25_L0.050/output_N25_L0.050_t200_0001.csv")
        .is_file());
    Ok(())
}

#[test]
fn wrong_count_in_input_file_is_reported() -> Result<()> {
    let dir = tempfile::tempdir()?;
    let path = dir.path().join("input.txt");
    let particles = generate(
        &RunConfig::default().generator_config(),
        &mut seeded_rng(Some(1)),
    )?;
    write_particles(&mut fs::File::create(&path)?, &particles[..10])?;
    let err = read_particles(&path, 300).unwrap_err();
    assert!(err.to_string().contains("expected 300 particles, found 10"));
    Ok(())
}

#[test]
fn time_horizon_tag_in_output_name() -> Result<()> {
    let cfg: RunConfig = toml::from_str("[horizon]\ntime = 20.0\n")?;
    assert_eq!(cfg.horizon.to_horizon()?, Horizon::Time(20.0));
    let out = output_path(&cfg.output_dir, 300, 0.03, &cfg.horizon.tag(), 0);
    assert!(out.ends_with("N_300_L0.030/output_N300_L0.030_t20_0000.csv"));
    Ok(())
}
