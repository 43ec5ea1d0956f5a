//! Drives a rod with a travelling curvature wave and prints its progress.
//!
//! # Usage
//!
//! ```text
//! cargo run --example undulation
//! cargo run --example undulation -- 2.0
//! cargo run --example undulation -- 2.0 0.005
//! ```
//!
//! The optional arguments are the simulated duration (default `1.0`) and the
//! time step (default `0.01`). Every tenth of a time unit the example prints
//! the head position, the elastic energy `V` and the power dissipated in the
//! fluid.

use std::{error::Error, f64::consts::TAU, sync::Arc};

use nalgebra::Vector3;
use undulate_fem::P1Galerkin;
use undulate_solvers::{
    finite_difference::CoefficientCache,
    transient::implicit::{
        Actuation, Config, Controls, Event, FieldKey, FieldValue, Frame, ReportConfig, Run,
        Series, Simulation, Status,
    },
};

const AMPLITUDE: f64 = 4.0;
const WAVELENGTH: f64 = 1.0;
const FREQUENCY: f64 = 1.0;

fn main() -> Result<(), Box<dyn Error>> {
    let horizon = argument(1, 1.0);
    let dt = argument(2, 0.01);

    let config = Config::new(65, dt, 2)?.with_report(
        ReportConfig::default()
            .every(0.1)
            .with_points(17)
            .with_fields([
                FieldKey::Time,
                FieldKey::Centerline,
                FieldKey::Potential,
                FieldKey::FluidDissipationRate,
            ]),
    )?;
    let simulation = Simulation::new(P1Galerkin::new(), config, Arc::new(CoefficientCache::new()))?;

    let controls = Controls::new(
        Actuation::varying(|s, t| {
            let phase = TAU * (s / WAVELENGTH - FREQUENCY * t);
            Vector3::new(AMPLITUDE * phase.sin(), 0.0, 0.0)
        }),
        Actuation::zero(),
    );
    let run = Run::new(horizon).with_controls(controls);

    println!("{:>6} {:>28} {:>10} {:>10}", "t", "head", "V", "D_F_dot");
    let trajectory = simulation.solve(&run, |event: &Event| {
        if let Some(frame) = &event.frame {
            print_frame(event.time, frame);
        }
    })?;

    match trajectory.status() {
        Status::Complete => println!("completed {} steps", trajectory.steps),
        Status::Failed => {
            if let Some(failure) = &trajectory.failure {
                eprintln!("stopped after {} steps: {failure}", trajectory.steps);
            }
        }
    }

    if let Some(Series::Vector(r)) = trajectory.frames.get(FieldKey::Centerline) {
        let frames = r.dim().0;
        if frames > 1 {
            let start = r[[0, 1, 0]];
            let end = r[[frames - 1, 1, 0]];
            println!("lateral head drift: {:.4}", end - start);
        }
    }

    Ok(())
}

fn print_frame(time: f64, frame: &Frame) {
    let head = match frame.get(FieldKey::Centerline) {
        Some(FieldValue::Vector(r)) => {
            format!("({:+.3}, {:+.3}, {:+.3})", r[[0, 0]], r[[1, 0]], r[[2, 0]])
        }
        _ => "-".into(),
    };
    let scalar = |key| match frame.get(key) {
        Some(FieldValue::Scalar(value)) => *value,
        _ => f64::NAN,
    };
    println!(
        "{time:>6.2} {head:>28} {:>10.4} {:>10.4}",
        scalar(FieldKey::Potential),
        scalar(FieldKey::FluidDissipationRate),
    );
}

/// Parses the positional argument at `index`, exiting on malformed input.
fn argument(index: usize, default: f64) -> f64 {
    std::env::args()
        .nth(index)
        .as_deref()
        .map(str::parse::<f64>)
        .transpose()
        .unwrap_or_else(|_| {
            eprintln!("Invalid argument {index}, expected a number, e.g. 0.5");
            std::process::exit(1);
        })
        .unwrap_or(default)
}
