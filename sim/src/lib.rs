pub mod agent;
pub mod collision;
pub mod evolution;
pub mod obstacle;
pub mod sensing;
pub mod simulation;

pub use agent::{Agent, Kinematics};
pub use obstacle::Obstacle;
pub use simulation::{Simulation, StepOutcome};

use shared::{ConfigError, Controller, GenerationReport, SimConfig};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum SimError {
    #[error("invalid configuration: {0}")]
    Config(#[from] ConfigError),

    /// Selection ran on a generation with no retired agents
    #[error("cannot select a parent from an empty generation")]
    EmptyGeneration,

    #[error("controller produced {actual} outputs, decision policy needs {expected}")]
    ControllerOutput { expected: usize, actual: usize },
}

/// Run a headless simulation until `generations` generations have died out
pub fn run_generations<C: Controller>(
    config: SimConfig,
    seed: u64,
    generations: u64,
) -> Result<Vec<GenerationReport>, SimError> {
    let mut sim = Simulation::<C>::with_seed(config, seed)?;
    let mut reports = Vec::with_capacity(generations as usize);

    while (reports.len() as u64) < generations {
        if let StepOutcome::Extinct(report) = sim.step()? {
            reports.push(report);
        }
    }

    Ok(reports)
}
