use rand::Rng;
use shared::{AgentConfig, AgentView};
use uuid::{Builder, Uuid};

/// Position and vertical motion, the part of an agent its sensors read
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Kinematics {
    pub x: f64,
    pub y: f64,
    pub velocity: f64,
    pub acceleration: f64,
}

/// A simulated agent and the controller it exclusively owns.
#[derive(Debug, Clone)]
pub struct Agent<C> {
    pub id: Uuid,
    /// Agent whose controller this one was cloned from
    pub parent_id: Option<Uuid>,
    pub x: f64,
    pub y: f64,
    pub velocity: f64,
    pub acceleration: f64,
    pub radius: f64,
    /// Ticks survived
    pub age: u64,
    /// Obstacle pairs passed
    pub score: u32,
    /// Share of the generation's total age; set after extinction
    pub fitness: f64,
    pub alive: bool,
    pub controller: C,
}

impl<C> Agent<C> {
    /// Create an agent at the configured spawn point. The id is drawn from
    /// `rng` so seeded runs reproduce their lineage.
    pub fn spawn<R: Rng + ?Sized>(
        controller: C,
        parent_id: Option<Uuid>,
        config: &AgentConfig,
        rng: &mut R,
    ) -> Self {
        Self {
            id: Builder::from_random_bytes(rng.gen()).into_uuid(),
            parent_id,
            x: config.spawn_x,
            y: config.spawn_y,
            velocity: 0.0,
            acceleration: 0.0,
            radius: config.radius,
            age: 0,
            score: 0,
            fitness: 0.0,
            alive: true,
            controller,
        }
    }

    pub fn kinematics(&self) -> Kinematics {
        Kinematics {
            x: self.x,
            y: self.y,
            velocity: self.velocity,
            acceleration: self.acceleration,
        }
    }

    /// Where one tick of gravity would take the agent, without moving it
    pub fn next_kinematics(&self, config: &AgentConfig, field_height: f64) -> Kinematics {
        let acceleration = (self.acceleration + config.gravity_increment).min(config.gravity_cap);
        let velocity = self.velocity + acceleration;
        let mut y = self.y + velocity;

        if config.clamp_altitude {
            y = y.clamp(0.0, field_height);
        }

        Kinematics {
            x: self.x,
            y,
            velocity,
            acceleration,
        }
    }

    /// Apply one tick of gravity and age the agent
    pub fn advance(&mut self, config: &AgentConfig, field_height: f64) {
        let next = self.next_kinematics(config, field_height);
        self.y = next.y;
        self.velocity = next.velocity;
        self.acceleration = next.acceleration;
        self.age += 1;
    }

    /// Replace the current velocity with the jump impulse
    pub fn jump(&mut self, impulse: f64) {
        self.velocity = impulse;
    }

    /// Mark the agent dead. Returns false if it already was.
    pub fn kill(&mut self) -> bool {
        std::mem::replace(&mut self.alive, false)
    }

    pub fn view(&self) -> AgentView {
        AgentView {
            id: self.id,
            x: self.x,
            y: self.y,
            radius: self.radius,
            velocity: self.velocity,
            score: self.score,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn agent() -> Agent<()> {
        Agent::spawn((), None, &AgentConfig::default(), &mut StdRng::seed_from_u64(0))
    }

    #[test]
    fn test_agent_creation() {
        let agent = agent();
        assert_eq!(agent.x, 100.0);
        assert_eq!(agent.y, 150.0);
        assert_eq!(agent.age, 0);
        assert_eq!(agent.fitness, 0.0);
        assert!(agent.alive);
    }

    #[test]
    fn test_acceleration_is_capped() {
        let config = AgentConfig::default();
        let mut agent = agent();

        agent.advance(&config, 500.0);
        assert!((agent.acceleration - 0.03).abs() < 1e-12);
        assert!((agent.velocity - 0.03).abs() < 1e-12);
        assert_eq!(agent.age, 1);

        for _ in 0..10 {
            agent.advance(&config, 500.0);
        }
        assert_eq!(agent.acceleration, 0.1);
        assert_eq!(agent.age, 11);
    }

    #[test]
    fn test_jump_overrides_velocity() {
        let config = AgentConfig::default();
        let mut agent = agent();
        for _ in 0..20 {
            agent.advance(&config, 500.0);
        }
        assert!(agent.velocity > 1.0);

        agent.jump(config.jump_impulse);
        assert_eq!(agent.velocity, -1.8);
    }

    #[test]
    fn test_clamping_policy() {
        let mut config = AgentConfig {
            clamp_altitude: true,
            ..Default::default()
        };
        let mut agent = agent();
        agent.y = 499.0;
        agent.velocity = 10.0;
        agent.advance(&config, 500.0);
        assert_eq!(agent.y, 500.0);

        config.clamp_altitude = false;
        agent.y = 499.0;
        agent.advance(&config, 500.0);
        assert!(agent.y > 500.0);
    }

    #[test]
    fn test_next_kinematics_leaves_agent_untouched() {
        let config = AgentConfig::default();
        let mut agent = agent();
        agent.velocity = 0.5;

        let next = agent.next_kinematics(&config, 500.0);
        assert_eq!(agent.y, 150.0);
        assert_eq!(agent.age, 0);

        agent.advance(&config, 500.0);
        assert_eq!(agent.kinematics(), next);
        assert_eq!(agent.age, 1);
    }

    #[test]
    fn test_ids_follow_the_seed() {
        let config = AgentConfig::default();
        let spawn_two = |seed| {
            let mut rng = StdRng::seed_from_u64(seed);
            let a = Agent::spawn((), None, &config, &mut rng);
            let b = Agent::spawn((), None, &config, &mut rng);
            (a.id, b.id)
        };

        let (a, b) = spawn_two(8);
        assert_ne!(a, b);
        assert_eq!(spawn_two(8), (a, b));
        assert_ne!(spawn_two(9).0, a);
    }

    #[test]
    fn test_kill_happens_once() {
        let mut agent = agent();
        assert!(agent.kill());
        assert!(!agent.kill());
        assert!(!agent.alive);
    }
}
