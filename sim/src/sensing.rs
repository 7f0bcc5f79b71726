use crate::agent::Kinematics;
use crate::{Obstacle, SimError};
use shared::{AgentConfig, Controller, DecisionPolicy, PlayfieldConfig, Sensor};

/// The obstacle geometry an agent perceives this tick.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SensedGate {
    pub x: f64,
    pub width: f64,
    pub gap_top: f64,
    pub gap_bottom: f64,
}

impl SensedGate {
    /// Fallback when nothing is ahead: a zero-width gate at the far edge
    /// spanning the whole field height.
    pub fn open_field(field: &PlayfieldConfig) -> Self {
        Self {
            x: field.width,
            width: 0.0,
            gap_top: 0.0,
            gap_bottom: field.height,
        }
    }
}

impl From<&Obstacle> for SensedGate {
    fn from(obstacle: &Obstacle) -> Self {
        Self {
            x: obstacle.x,
            width: obstacle.width,
            gap_top: obstacle.gap_top,
            gap_bottom: obstacle.gap_bottom,
        }
    }
}

/// First obstacle whose trailing edge is still ahead of `x`.
///
/// `obstacles` is ordered by ascending position, so the predicate is
/// monotone and a binary search finds the boundary.
pub fn nearest_upcoming(obstacles: &[Obstacle], x: f64) -> Option<&Obstacle> {
    let idx = obstacles.partition_point(|o| o.trailing_edge() <= x);
    obstacles.get(idx)
}

/// Build the normalized input vector for the configured sensor set
pub fn inputs(
    body: &Kinematics,
    gate: &SensedGate,
    sensors: &[Sensor],
    field: &PlayfieldConfig,
    physics: &AgentConfig,
) -> Vec<f64> {
    sensors
        .iter()
        .map(|sensor| match sensor {
            Sensor::ObstacleDistance => (gate.x - body.x) / field.width,
            Sensor::GapTop => gate.gap_top / field.height,
            Sensor::GapBottom => gate.gap_bottom / field.height,
            Sensor::ObstacleTrailingEdge => (gate.x + gate.width - body.x) / field.width,
            Sensor::Altitude => body.y / field.height,
            Sensor::Acceleration => {
                if physics.gravity_cap > 0.0 {
                    body.acceleration / physics.gravity_cap
                } else {
                    0.0
                }
            }
            Sensor::Velocity => {
                let scale = physics.jump_impulse.abs();
                if scale > 0.0 {
                    body.velocity / scale
                } else {
                    0.0
                }
            }
        })
        .collect()
}

/// Turn controller outputs into a jump decision
pub fn should_jump(outputs: &[f64], policy: &DecisionPolicy) -> Result<bool, SimError> {
    let expected = policy.output_size();
    if outputs.len() < expected {
        return Err(SimError::ControllerOutput {
            expected,
            actual: outputs.len(),
        });
    }

    Ok(match policy {
        DecisionPolicy::Threshold { threshold } => outputs[0] < *threshold,
        DecisionPolicy::Compare => outputs[0] > outputs[1],
    })
}

/// Sense the gate from `body`, query `controller` and decide whether to jump
pub fn decide<C: Controller>(
    controller: &C,
    body: &Kinematics,
    gate: &SensedGate,
    config: &shared::SimConfig,
) -> Result<bool, SimError> {
    let inputs = inputs(
        body,
        gate,
        &config.controller.sensors,
        &config.playfield,
        &config.agents,
    );
    let outputs = controller.predict(&inputs);
    should_jump(&outputs, &config.controller.decision)
}
