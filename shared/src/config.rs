use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;
use thiserror::Error;

/// Errors raised while loading or validating a [`SimConfig`].
///
/// All of these are fatal at startup; none can occur once the tick loop runs.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to parse config file: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("playfield must have positive width and height (got {width}x{height})")]
    Playfield { width: f64, height: f64 },

    #[error(
        "gap {gap} plus two minimum segments of {min_segment} exceeds playfield height {height}"
    )]
    GapTooLarge {
        gap: f64,
        min_segment: f64,
        height: f64,
    },

    #[error("invalid obstacle setting: {0}")]
    Obstacle(&'static str),

    #[error("spawn point ({x}, {y}) lies outside the playfield")]
    SpawnOutsideField { x: f64, y: f64 },

    #[error("invalid agent setting: {0}")]
    Agent(&'static str),

    #[error("tick rate must be positive with a representable period (got {0})")]
    TickRate(f64),

    #[error("population size must be at least 1")]
    EmptyPopulation,

    #[error("mutation probability must lie in [0, 1] (got {0})")]
    MutationProbability(f64),

    #[error("mutation magnitude must be finite and non-negative (got {0})")]
    MutationMagnitude(f64),

    #[error("controller needs at least one sensor")]
    NoSensors,

    #[error("sensor {0:?} listed more than once")]
    DuplicateSensor(Sensor),

    #[error("controller hidden layer must have at least one neuron")]
    EmptyHiddenLayer,

    #[error("decision threshold must lie in [0, 1] (got {0})")]
    Threshold(f64),
}

/// Complete simulation configuration.
///
/// Every section falls back to its defaults when missing from a config file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimConfig {
    pub playfield: PlayfieldConfig,
    pub obstacles: ObstacleConfig,
    pub agents: AgentConfig,
    pub controller: ControllerConfig,
    pub evolution: EvolutionConfig,
    /// Ticks per second requested from the scheduler
    pub tick_rate: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlayfieldConfig {
    pub width: f64,
    pub height: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ObstacleConfig {
    pub width: f64,
    /// Smallest height either solid segment of a pair may take
    pub min_segment_height: f64,
    /// Vertical size of the passable gap
    pub gap: f64,
    /// Ticks between two generated pairs
    pub spacing_ticks: u64,
    /// Horizontal distance travelled per tick
    pub speed: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AgentConfig {
    pub spawn_x: f64,
    pub spawn_y: f64,
    /// Collision radius; zero treats the agent as a point
    pub radius: f64,
    pub gravity_increment: f64,
    pub gravity_cap: f64,
    /// Velocity set by a jump (negative is upward)
    pub jump_impulse: f64,
    /// Clamp altitude to the field instead of letting the agent leave it
    pub clamp_altitude: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ControllerConfig {
    pub sensors: Vec<Sensor>,
    pub hidden_size: usize,
    pub decision: DecisionPolicy,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EvolutionConfig {
    pub population_size: usize,
    pub selection: SelectionStrategy,
    /// Chance that any single weight is perturbed
    pub mutation_probability: f64,
    pub mutation_magnitude: f64,
    pub mutation_kind: MutationKind,
}

/// A scalar feature exposed to the controller, normalized to roughly [0, 1].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Sensor {
    /// Horizontal distance to the nearest upcoming obstacle
    ObstacleDistance,
    GapTop,
    GapBottom,
    /// Distance to the obstacle's trailing edge
    ObstacleTrailingEdge,
    Altitude,
    Acceleration,
    Velocity,
}

impl Sensor {
    /// Two-input preset: distance and altitude.
    pub const MINIMAL: [Sensor; 2] = [Sensor::ObstacleDistance, Sensor::Altitude];

    /// Four-input preset.
    pub const STANDARD: [Sensor; 4] = [
        Sensor::ObstacleDistance,
        Sensor::GapTop,
        Sensor::GapBottom,
        Sensor::Altitude,
    ];

    /// Every feature.
    pub const EXTENDED: [Sensor; 7] = [
        Sensor::ObstacleDistance,
        Sensor::GapTop,
        Sensor::GapBottom,
        Sensor::ObstacleTrailingEdge,
        Sensor::Altitude,
        Sensor::Acceleration,
        Sensor::Velocity,
    ];
}

/// How controller outputs become a jump decision.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum DecisionPolicy {
    /// One output; jump when it falls below `threshold`
    Threshold { threshold: f64 },
    /// Two outputs; jump when output 0 exceeds output 1
    Compare,
}

impl DecisionPolicy {
    pub fn output_size(&self) -> usize {
        match self {
            DecisionPolicy::Threshold { .. } => 1,
            DecisionPolicy::Compare => 2,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SelectionStrategy {
    /// Fitness-proportional sampling, drawn independently per child
    Roulette,
    /// Every child descends from the single fittest agent
    Fittest,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MutationKind {
    /// Offset drawn from [-magnitude, magnitude)
    Symmetric,
    /// Offset drawn from [0, magnitude); weights only ever grow
    Additive,
}

impl Default for SimConfig {
    fn default() -> Self {
        Self {
            playfield: PlayfieldConfig::default(),
            obstacles: ObstacleConfig::default(),
            agents: AgentConfig::default(),
            controller: ControllerConfig::default(),
            evolution: EvolutionConfig::default(),
            tick_rate: 120.0,
        }
    }
}

impl Default for PlayfieldConfig {
    fn default() -> Self {
        Self {
            width: 800.0,
            height: 500.0,
        }
    }
}

impl Default for ObstacleConfig {
    fn default() -> Self {
        Self {
            width: 80.0,
            min_segment_height: 40.0,
            gap: 100.0,
            spacing_ticks: 320,
            speed: 1.0,
        }
    }
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            spawn_x: 100.0,
            spawn_y: 150.0,
            radius: 15.0,
            gravity_increment: 0.03,
            gravity_cap: 0.1,
            jump_impulse: -1.8,
            clamp_altitude: false,
        }
    }
}

impl Default for ControllerConfig {
    fn default() -> Self {
        Self {
            sensors: Sensor::STANDARD.to_vec(),
            hidden_size: 8,
            decision: DecisionPolicy::Threshold { threshold: 0.5 },
        }
    }
}

impl Default for EvolutionConfig {
    fn default() -> Self {
        Self {
            population_size: 50,
            selection: SelectionStrategy::Roulette,
            mutation_probability: 0.1,
            mutation_magnitude: 0.5,
            mutation_kind: MutationKind::Symmetric,
        }
    }
}

impl SimConfig {
    /// Load a config from a JSON file and validate it
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let raw = std::fs::read_to_string(path)?;
        let config: SimConfig = serde_json::from_str(&raw)?;
        config.validate()?;
        Ok(config)
    }

    /// Reject every combination the tick loop cannot run with
    pub fn validate(&self) -> Result<(), ConfigError> {
        let PlayfieldConfig { width, height } = self.playfield;
        if !(width > 0.0 && height > 0.0 && width.is_finite() && height.is_finite()) {
            return Err(ConfigError::Playfield { width, height });
        }

        let obstacles = &self.obstacles;
        if !(obstacles.width > 0.0) {
            return Err(ConfigError::Obstacle("width must be positive"));
        }
        if !(obstacles.gap > 0.0) {
            return Err(ConfigError::Obstacle("gap must be positive"));
        }
        if !(obstacles.min_segment_height >= 0.0) {
            return Err(ConfigError::Obstacle(
                "minimum segment height must be non-negative",
            ));
        }
        if obstacles.gap + 2.0 * obstacles.min_segment_height > height {
            return Err(ConfigError::GapTooLarge {
                gap: obstacles.gap,
                min_segment: obstacles.min_segment_height,
                height,
            });
        }
        if obstacles.spacing_ticks == 0 {
            return Err(ConfigError::Obstacle("spacing must be at least one tick"));
        }
        if !(obstacles.speed > 0.0 && obstacles.speed.is_finite()) {
            return Err(ConfigError::Obstacle("speed must be finite and positive"));
        }

        let agents = &self.agents;
        if !(0.0..=width).contains(&agents.spawn_x) || !(agents.spawn_y > 0.0 && agents.spawn_y < height)
        {
            return Err(ConfigError::SpawnOutsideField {
                x: agents.spawn_x,
                y: agents.spawn_y,
            });
        }
        if !(agents.radius >= 0.0) {
            return Err(ConfigError::Agent("radius must be non-negative"));
        }
        if !(agents.gravity_increment >= 0.0 && agents.gravity_cap >= 0.0) {
            return Err(ConfigError::Agent("gravity settings must be non-negative"));
        }
        if !agents.jump_impulse.is_finite() {
            return Err(ConfigError::Agent("jump impulse must be finite"));
        }

        if tick_period(self.tick_rate).is_none() {
            return Err(ConfigError::TickRate(self.tick_rate));
        }

        let evolution = &self.evolution;
        if evolution.population_size == 0 {
            return Err(ConfigError::EmptyPopulation);
        }
        if !(0.0..=1.0).contains(&evolution.mutation_probability) {
            return Err(ConfigError::MutationProbability(
                evolution.mutation_probability,
            ));
        }
        if !(evolution.mutation_magnitude >= 0.0 && evolution.mutation_magnitude.is_finite()) {
            return Err(ConfigError::MutationMagnitude(evolution.mutation_magnitude));
        }

        let controller = &self.controller;
        if controller.sensors.is_empty() {
            return Err(ConfigError::NoSensors);
        }
        for (idx, sensor) in controller.sensors.iter().enumerate() {
            if controller.sensors[..idx].contains(sensor) {
                return Err(ConfigError::DuplicateSensor(*sensor));
            }
        }
        if controller.hidden_size == 0 {
            return Err(ConfigError::EmptyHiddenLayer);
        }
        if let DecisionPolicy::Threshold { threshold } = controller.decision {
            if !(0.0..=1.0).contains(&threshold) {
                return Err(ConfigError::Threshold(threshold));
            }
        }

        Ok(())
    }

    /// Network shape implied by the sensor set and decision policy
    pub fn network_shape(&self) -> crate::Shape {
        crate::Shape {
            inputs: self.controller.sensors.len(),
            hidden: self.controller.hidden_size,
            outputs: self.controller.decision.output_size(),
        }
    }
}

/// Interval between ticks at `tick_rate` ticks per second.
///
/// `None` when the rate is not finite and positive, or its period does not
/// fit in a [`Duration`]. Very fast rates bottom out at one nanosecond.
pub fn tick_period(tick_rate: f64) -> Option<Duration> {
    if !(tick_rate > 0.0 && tick_rate.is_finite()) {
        return None;
    }
    Duration::try_from_secs_f64(1.0 / tick_rate)
        .ok()
        .map(|period| period.max(Duration::from_nanos(1)))
}
