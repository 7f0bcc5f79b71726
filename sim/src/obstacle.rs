use rand::Rng;
use shared::{ObstacleConfig, ObstacleView};

/// Which field edge a solid segment hangs from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Anchor {
    Ceiling,
    Floor,
}

/// One solid segment of a gated obstacle pair.
///
/// The segment occupies `[top, top + height]` vertically and
/// `[x, x + width]` horizontally. Both segments of a pair share the same
/// gap bounds so either can be sensed.
#[derive(Debug, Clone, PartialEq)]
pub struct Obstacle {
    pub x: f64,
    pub width: f64,
    pub top: f64,
    pub height: f64,
    pub gap_top: f64,
    pub gap_bottom: f64,
    pub anchor: Anchor,
    pub alive: bool,
    /// Set once the trailing edge has passed the agents' column
    pub passed: bool,
}

impl Obstacle {
    pub fn bottom(&self) -> f64 {
        self.top + self.height
    }

    pub fn trailing_edge(&self) -> f64 {
        self.x + self.width
    }

    /// Scroll toward the near edge; dies once fully off-field
    pub fn advance(&mut self, speed: f64) {
        self.x -= speed;
        if self.trailing_edge() < 0.0 {
            self.alive = false;
        }
    }

    pub fn view(&self) -> ObstacleView {
        ObstacleView {
            x: self.x,
            top: self.top,
            width: self.width,
            height: self.height,
        }
    }
}

/// Generate a ceiling/floor pair at the far edge with a random gap position.
///
/// The first segment's height is drawn uniformly from
/// `[min_segment_height, field_height - gap - min_segment_height]` and rounded
/// to a whole unit, so with integral settings the two segments and the gap
/// add up to exactly `field_height`.
pub fn generate_pair<R: Rng + ?Sized>(
    config: &ObstacleConfig,
    field_width: f64,
    field_height: f64,
    rng: &mut R,
) -> (Obstacle, Obstacle) {
    let lo = config.min_segment_height;
    let hi = field_height - config.gap - config.min_segment_height;
    let first_height = rng.gen_range(lo..=hi).round().clamp(lo, hi);
    let second_height = field_height - first_height - config.gap;

    let gap_top = first_height;
    let gap_bottom = first_height + config.gap;

    let ceiling = Obstacle {
        x: field_width,
        width: config.width,
        top: 0.0,
        height: first_height,
        gap_top,
        gap_bottom,
        anchor: Anchor::Ceiling,
        alive: true,
        passed: false,
    };
    let floor = Obstacle {
        top: field_height - second_height,
        height: second_height,
        anchor: Anchor::Floor,
        ..ceiling.clone()
    };

    (ceiling, floor)
}
