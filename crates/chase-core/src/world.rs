use serde::{Deserialize, Serialize};

/// Axis-aligned playfield centered on the origin.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct WorldBounds {
    pub width: f32,
    pub height: f32,
}

impl WorldBounds {
    pub fn new(width: f32, height: f32) -> Self {
        Self { width, height }
    }

    pub fn half_extents(&self) -> [f32; 2] {
        [self.width / 2.0, self.height / 2.0]
    }

    pub fn clamp(&self, position: [f32; 2]) -> [f32; 2] {
        let [hw, hh] = self.half_extents();
        [position[0].clamp(-hw, hw), position[1].clamp(-hh, hh)]
    }

    pub fn contains(&self, position: [f32; 2]) -> bool {
        let [hw, hh] = self.half_extents();
        (-hw..=hw).contains(&position[0]) && (-hh..=hh).contains(&position[1])
    }
}

pub fn distance(a: [f32; 2], b: [f32; 2]) -> f32 {
    let dx = a[0] - b[0];
    let dy = a[1] - b[1];
    (dx * dx + dy * dy).sqrt()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clamp_keeps_positions_on_the_field() {
        let bounds = WorldBounds::new(7.2, 12.8);
        assert_eq!(bounds.clamp([10.0, -10.0]), [3.6, -6.4]);
        assert_eq!(bounds.clamp([1.0, 2.0]), [1.0, 2.0]);
        assert!(bounds.contains([3.6, 6.4]));
        assert!(!bounds.contains([3.7, 0.0]));
    }

    #[test]
    fn distance_is_euclidean() {
        assert_eq!(distance([0.0, -3.0], [0.0, 3.0]), 6.0);
        assert_eq!(distance([0.0, 0.0], [3.0, 4.0]), 5.0);
    }
}
