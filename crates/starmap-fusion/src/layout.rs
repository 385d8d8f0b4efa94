//! Seeded layout positions for nodes that arrive without one.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use starmap_core::{defaults, Position};

/// Draws positions uniformly across a canvas from a seeded generator, so the
/// same seed and call order always produce the same layout.
#[derive(Debug, Clone)]
pub struct LayoutGenerator {
    rng: StdRng,
    width: f64,
    height: f64,
}

impl LayoutGenerator {
    pub fn new(seed: u64) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
            width: defaults::CANVAS_WIDTH,
            height: defaults::CANVAS_HEIGHT,
        }
    }

    /// Override the canvas size. Negative or non-finite sizes collapse to 0.
    pub fn with_canvas(mut self, width: f64, height: f64) -> Self {
        self.width = sanitize(width);
        self.height = sanitize(height);
        self
    }

    pub fn next_position(&mut self) -> Position {
        let x = self.rng.gen::<f64>() * self.width;
        let y = self.rng.gen::<f64>() * self.height;
        Position::new(x, y)
    }
}

impl Default for LayoutGenerator {
    fn default() -> Self {
        Self::new(defaults::LAYOUT_SEED)
    }
}

fn sanitize(size: f64) -> f64 {
    if size.is_finite() && size > 0.0 {
        size
    } else {
        0.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_same_seed_same_positions() {
        let mut a = LayoutGenerator::new(7);
        let mut b = LayoutGenerator::new(7);
        for _ in 0..10 {
            assert_eq!(a.next_position(), b.next_position());
        }
    }

    #[test]
    fn test_positions_within_canvas() {
        let mut layout = LayoutGenerator::default();
        for _ in 0..100 {
            let p = layout.next_position();
            assert!((0.0..800.0).contains(&p.x));
            assert!((0.0..600.0).contains(&p.y));
        }
    }

    #[test]
    fn test_degenerate_canvas() {
        let mut layout = LayoutGenerator::new(1).with_canvas(-5.0, f64::NAN);
        assert_eq!(layout.next_position(), Position::new(0.0, 0.0));
    }
}
