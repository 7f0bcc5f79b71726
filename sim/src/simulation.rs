use crate::collision::mark_deaths;
use crate::evolution::{self, Offspring};
use crate::obstacle::{generate_pair, Anchor};
use crate::sensing::{self, SensedGate};
use crate::{Agent, Obstacle, SimError};
use rand::rngs::StdRng;
use rand::SeedableRng;
use shared::{Controller, Frame, GenerationReport, Phase, SimConfig};

/// What a single call to [`Simulation::step`] produced
#[derive(Debug, Clone, PartialEq)]
pub enum StepOutcome {
    /// At least one agent is still alive
    Running { deaths: usize },
    /// The last agent died this tick; the next generation is prepared
    Extinct(GenerationReport),
}

/// The generational simulation loop.
///
/// Cycles `Initializing -> Running -> Extinct -> Initializing` forever; only
/// the caller stops it by no longer calling [`step`](Self::step).
pub struct Simulation<C> {
    config: SimConfig,
    rng: StdRng,
    phase: Phase,
    agents: Vec<Agent<C>>,
    retired: Vec<Agent<C>>,
    obstacles: Vec<Obstacle>,
    /// Controllers bred from the last extinct generation
    pending: Option<Vec<Offspring<C>>>,
    tick: u64,
    generation: u64,
}

impl<C: Controller> Simulation<C> {
    /// Create a simulation seeded from entropy
    pub fn new(config: SimConfig) -> Result<Self, SimError> {
        Self::with_rng(config, StdRng::from_entropy())
    }

    /// Create a simulation with a reproducible random source
    pub fn with_seed(config: SimConfig, seed: u64) -> Result<Self, SimError> {
        Self::with_rng(config, StdRng::seed_from_u64(seed))
    }

    fn with_rng(config: SimConfig, rng: StdRng) -> Result<Self, SimError> {
        config.validate()?;

        let mut sim = Self {
            config,
            rng,
            phase: Phase::Initializing,
            agents: Vec::new(),
            retired: Vec::new(),
            obstacles: Vec::new(),
            pending: None,
            tick: 0,
            generation: 0,
        };
        sim.initialize();
        Ok(sim)
    }

    /// Start over from generation zero with fresh controllers
    pub fn reinitialize(&mut self) {
        self.pending = None;
        self.generation = 0;
        self.phase = Phase::Initializing;
        self.initialize();
    }

    /// Reset the field and spawn the population, from pending offspring if
    /// a previous generation bred any, otherwise with random controllers.
    fn initialize(&mut self) {
        self.tick = 0;
        self.obstacles.clear();
        self.retired.clear();
        self.agents.clear();
        spawn_obstacle_pair(&self.config, &mut self.obstacles, &mut self.rng);

        let agents_config = &self.config.agents;
        match self.pending.take() {
            Some(offspring) => {
                for o in offspring {
                    let agent =
                        Agent::spawn(o.controller, o.parent_id, agents_config, &mut self.rng);
                    self.agents.push(agent);
                }
            }
            None => {
                let shape = self.config.network_shape();
                for _ in 0..self.config.evolution.population_size {
                    let controller = C::random(shape, &mut self.rng);
                    let agent = Agent::spawn(controller, None, agents_config, &mut self.rng);
                    self.agents.push(agent);
                }
            }
        }

        tracing::debug!(
            generation = self.generation,
            population = self.agents.len(),
            "generation spawned"
        );
        self.phase = Phase::Running;
    }

    /// Advance the simulation by one tick.
    ///
    /// Controllers are queried against a staged copy of the field before
    /// anything is committed, so an error leaves the last completed tick
    /// intact.
    pub fn step(&mut self) -> Result<StepOutcome, SimError> {
        if self.phase != Phase::Running {
            self.initialize();
        }

        let tick = self.tick + 1;
        let mut rng = self.rng.clone();

        // 1. Scroll obstacles, score passed pairs, drop the ones off-field
        let mut obstacles = self.obstacles.clone();
        let passed = self.advance_obstacles(tick, &mut obstacles);

        // 2. Periodically add a new pair at the far edge
        if tick % self.config.obstacles.spacing_ticks == 0 {
            spawn_obstacle_pair(&self.config, &mut obstacles, &mut rng);
        }

        // 3. Sensing and decisions against the post-physics state
        let jumps = self.decide_jumps(&obstacles)?;

        self.tick = tick;
        self.rng = rng;
        self.obstacles = obstacles;
        self.advance_agents(passed, &jumps);

        // 4. Collisions
        let deaths = mark_deaths(
            &mut self.agents,
            &self.obstacles,
            self.config.playfield.height,
        );

        // 5. Retire the dead
        if deaths > 0 {
            let (dead, alive): (Vec<_>, Vec<_>) =
                std::mem::take(&mut self.agents).into_iter().partition(|a| !a.alive);
            self.agents = alive;
            self.retired.extend(dead);
        }

        if self.agents.is_empty() {
            self.phase = Phase::Extinct;
            let report = self.evolve()?;
            return Ok(StepOutcome::Extinct(report));
        }

        Ok(StepOutcome::Running { deaths })
    }

    /// Scroll `obstacles` one tick and return how many pairs the agents'
    /// column passed
    fn advance_obstacles(&self, tick: u64, obstacles: &mut Vec<Obstacle>) -> u32 {
        let speed = self.config.obstacles.speed;
        let column = self.config.agents.spawn_x;
        let mut passed = 0;

        for obstacle in obstacles.iter_mut() {
            obstacle.advance(speed);
            if !obstacle.passed && obstacle.trailing_edge() < column {
                obstacle.passed = true;
                if obstacle.anchor == Anchor::Ceiling {
                    passed += 1;
                }
            }
        }

        let before = obstacles.len();
        obstacles.retain(|o| o.alive);
        if obstacles.len() != before {
            tracing::trace!(
                tick,
                pruned = before - obstacles.len(),
                "obstacles left the field"
            );
        }
        passed
    }

    /// Ask every live agent's controller whether to jump after this tick's
    /// physics, without moving anyone
    fn decide_jumps(&self, obstacles: &[Obstacle]) -> Result<Vec<bool>, SimError> {
        let config = &self.config;
        let gate = sensing::nearest_upcoming(obstacles, config.agents.spawn_x)
            .map(SensedGate::from)
            .unwrap_or_else(|| SensedGate::open_field(&config.playfield));

        self.agents
            .iter()
            .map(|agent| {
                let body = agent.next_kinematics(&config.agents, config.playfield.height);
                sensing::decide(&agent.controller, &body, &gate, config)
            })
            .collect()
    }

    fn advance_agents(&mut self, passed: u32, jumps: &[bool]) {
        let config = &self.config;
        for (agent, &jump) in self.agents.iter_mut().zip(jumps) {
            agent.score += passed;
            agent.advance(&config.agents, config.playfield.height);
            if jump {
                agent.jump(config.agents.jump_impulse);
            }
        }
    }

    /// Score the extinct generation and breed the next one
    fn evolve(&mut self) -> Result<GenerationReport, SimError> {
        evolution::assign_fitness(&mut self.retired);
        let report = self.report();

        let offspring =
            evolution::next_generation(&self.retired, &self.config.evolution, &mut self.rng)?;
        self.pending = Some(offspring);

        tracing::info!(
            generation = report.generation,
            ticks = report.ticks,
            best_age = report.best_age,
            mean_age = report.mean_age,
            best_score = report.best_score,
            "generation extinct"
        );

        self.generation += 1;
        Ok(report)
    }

    fn report(&self) -> GenerationReport {
        let population = self.retired.len();
        let total_age: u64 = self.retired.iter().map(|a| a.age).sum();
        GenerationReport {
            generation: self.generation,
            population,
            ticks: self.tick,
            total_age,
            best_age: self.retired.iter().map(|a| a.age).max().unwrap_or(0),
            mean_age: if population > 0 {
                total_age as f64 / population as f64
            } else {
                0.0
            },
            best_score: self.retired.iter().map(|a| a.score).max().unwrap_or(0),
            best_fitness: self
                .retired
                .iter()
                .map(|a| a.fitness)
                .fold(0.0, f64::max),
        }
    }

    /// Snapshot of the last completed tick
    pub fn snapshot(&self) -> Frame {
        Frame {
            tick: self.tick,
            generation: self.generation,
            phase: self.phase,
            width: self.config.playfield.width,
            height: self.config.playfield.height,
            agents: self.agents.iter().map(Agent::view).collect(),
            obstacles: self.obstacles.iter().map(Obstacle::view).collect(),
        }
    }

    pub fn config(&self) -> &SimConfig {
        &self.config
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn tick(&self) -> u64 {
        self.tick
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn agents(&self) -> &[Agent<C>] {
        &self.agents
    }

    /// Agents retired from the current generation; scored once extinct
    pub fn retired(&self) -> &[Agent<C>] {
        &self.retired
    }

    pub fn obstacles(&self) -> &[Obstacle] {
        &self.obstacles
    }
}

fn spawn_obstacle_pair(config: &SimConfig, obstacles: &mut Vec<Obstacle>, rng: &mut StdRng) {
    let (ceiling, floor) = generate_pair(
        &config.obstacles,
        config.playfield.width,
        config.playfield.height,
        rng,
    );
    tracing::trace!(gap_top = ceiling.gap_top, "obstacle pair spawned");
    obstacles.push(ceiling);
    obstacles.push(floor);
}
