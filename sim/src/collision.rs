use crate::{Agent, Obstacle};

impl<C> Agent<C> {
    /// True when the agent touches or crosses either vertical field boundary
    pub fn out_of_bounds(&self, field_height: f64) -> bool {
        self.y - self.radius <= 0.0 || self.y + self.radius >= field_height
    }

    /// True when the agent's extent touches the obstacle's solid rectangle.
    ///
    /// Both comparisons are inclusive: touching an edge counts as a hit.
    pub fn overlaps(&self, obstacle: &Obstacle) -> bool {
        let horizontal = self.x + self.radius >= obstacle.x
            && self.x - self.radius <= obstacle.trailing_edge();
        let vertical =
            self.y + self.radius >= obstacle.top && self.y - self.radius <= obstacle.bottom();
        horizontal && vertical
    }
}

/// Mark every live agent that left the field or hit an obstacle as dead.
///
/// Returns how many agents died during this check.
pub fn mark_deaths<C>(agents: &mut [Agent<C>], obstacles: &[Obstacle], field_height: f64) -> usize {
    let mut deaths = 0;
    for agent in agents.iter_mut().filter(|a| a.alive) {
        let hit = agent.out_of_bounds(field_height)
            || obstacles
                .iter()
                .filter(|o| o.alive && o.height > 0.0)
                .any(|o| agent.overlaps(o));
        if hit && agent.kill() {
            deaths += 1;
        }
    }
    deaths
}
