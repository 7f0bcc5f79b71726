use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Lifecycle state of the simulation loop
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    Initializing,
    Running,
    Extinct,
}

/// Read-only snapshot of a completed tick, handed to renderers.
///
/// Either collection may be empty (for example right after extinction).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Frame {
    pub tick: u64,
    pub generation: u64,
    pub phase: Phase,
    pub width: f64,
    pub height: f64,
    pub agents: Vec<AgentView>,
    pub obstacles: Vec<ObstacleView>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AgentView {
    pub id: Uuid,
    pub x: f64,
    pub y: f64,
    pub radius: f64,
    pub velocity: f64,
    pub score: u32,
}

/// Solid rectangle of one obstacle segment
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ObstacleView {
    pub x: f64,
    pub top: f64,
    pub width: f64,
    pub height: f64,
}

/// Summary of one generation, produced when its last agent dies
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GenerationReport {
    pub generation: u64,
    pub population: usize,
    /// Ticks the generation lasted before extinction
    pub ticks: u64,
    pub total_age: u64,
    pub best_age: u64,
    pub mean_age: f64,
    pub best_score: u32,
    pub best_fitness: f64,
}

/// Driver-level statistics served alongside frames
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimStats {
    pub generation: u64,
    pub tick: u64,
    pub live_agents: usize,
    pub tick_rate: f64,
    pub running: bool,
    pub best_age_ever: u64,
    /// Most recent generations, oldest first
    pub history: Vec<GenerationReport>,
}

impl Frame {
    /// An empty frame for a field of the given size
    pub fn empty(width: f64, height: f64) -> Self {
        Self {
            tick: 0,
            generation: 0,
            phase: Phase::Initializing,
            width,
            height,
            agents: Vec::new(),
            obstacles: Vec::new(),
        }
    }
}
