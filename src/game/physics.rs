//! Movement vectors and play-area bounds

use serde::{Deserialize, Serialize};
use std::f64::consts::PI;

/// Axis-aligned play area
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Rect {
    pub start_x: f64,
    pub start_y: f64,
    pub end_x: f64,
    pub end_y: f64,
}

impl Rect {
    pub const fn new(start_x: f64, start_y: f64, end_x: f64, end_y: f64) -> Self {
        Self {
            start_x,
            start_y,
            end_x,
            end_y,
        }
    }

    pub fn width(&self) -> f64 {
        self.end_x - self.start_x
    }

    pub fn height(&self) -> f64 {
        self.end_y - self.start_y
    }

    /// Inset both edges of each axis by one unit while that axis is wider than `floor`.
    pub fn shrink(&mut self, floor: f64) {
        if self.width() > floor {
            self.start_x += 1.0;
            self.end_x -= 1.0;
        }
        if self.height() > floor {
            self.start_y += 1.0;
            self.end_y -= 1.0;
        }
    }

    /// Point strictly inside the rectangle. Points on an edge are outside.
    pub fn contains_strict(&self, x: f64, y: f64) -> bool {
        x > self.start_x && x < self.end_x && y > self.start_y && y < self.end_y
    }
}

/// Physics helpers shared by movement and bullets
pub struct PhysicsSystem;

impl PhysicsSystem {
    /// Convert a travel angle into a displacement of length `distance`.
    ///
    /// The vertical sign is negative for angles below π/2 or above 3π/2 and
    /// positive otherwise, so 0 points "up" the screen and π points "down".
    /// Clients depend on this exact mapping, including its behaviour at the
    /// boundaries and for angles outside `[0, 2π)`.
    pub fn displacement(angle: f64, distance: f64) -> (f64, f64) {
        let dx = angle.sin() * distance;
        let sign = if angle < PI / 2.0 || angle > PI * 3.0 / 2.0 {
            -1.0
        } else {
            1.0
        };
        let dy = sign * angle.cos().abs() * distance;
        (dx, dy)
    }

    /// Pull a square of side `size` with top-left `(x, y)` back into `area`.
    ///
    /// A violated edge pushes the square one unit inside rather than onto the
    /// boundary. Returns the corrected position.
    pub fn clamp_square(x: f64, y: f64, size: f64, area: &Rect) -> (f64, f64) {
        let max_x = area.end_x - size;
        let max_y = area.end_y - size;

        let mut x = x;
        let mut y = y;
        if x <= area.start_x {
            x = area.start_x + 1.0;
        }
        if x >= max_x {
            x = max_x - 1.0;
        }
        if y <= area.start_y {
            y = area.start_y + 1.0;
        }
        if y >= max_y {
            y = max_y - 1.0;
        }
        (x, y)
    }

    /// Point inside the square at `(sx, sy)` with side `size`, edges included
    pub fn point_in_square(px: f64, py: f64, sx: f64, sy: f64, size: f64) -> bool {
        sx <= px && px <= sx + size && sy <= py && py <= sy + size
    }

    /// Replace angles that cannot drive the simulation with 0
    pub fn sanitize_angle(angle: f64) -> f64 {
        if angle.is_finite() {
            angle
        } else {
            0.0
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const EPS: f64 = 1e-9;

    fn close(a: f64, b: f64) -> bool {
        (a - b).abs() < EPS
    }

    #[test]
    fn test_displacement_cardinal_angles() {
        let (dx, dy) = PhysicsSystem::displacement(0.0, 10.0);
        assert!(close(dx, 0.0) && close(dy, -10.0));

        let (dx, dy) = PhysicsSystem::displacement(PI, 10.0);
        assert!(close(dx, 0.0) && close(dy, 10.0));

        let (dx, dy) = PhysicsSystem::displacement(PI / 2.0, 10.0);
        assert!(close(dx, 10.0) && close(dy, 0.0));

        let (dx, dy) = PhysicsSystem::displacement(PI * 3.0 / 2.0, 10.0);
        assert!(close(dx, -10.0) && close(dy, 0.0));
    }

    #[test]
    fn test_displacement_sign_convention() {
        // Just past π/2 the vertical component points down, just before 3π/2 too.
        let (_, dy) = PhysicsSystem::displacement(PI / 2.0 + 0.5, 10.0);
        assert!(dy > 0.0);
        let (_, dy) = PhysicsSystem::displacement(PI * 3.0 / 2.0 - 0.5, 10.0);
        assert!(dy > 0.0);

        // Negative angles and angles past 2π fall in the "up" branch.
        let (_, dy) = PhysicsSystem::displacement(-PI, 10.0);
        assert!(close(dy, -10.0));
        let (_, dy) = PhysicsSystem::displacement(3.0 * PI, 10.0);
        assert!(close(dy, -10.0));
    }

    #[test]
    fn test_shrink_respects_floor() {
        let mut rect = Rect::new(0.0, 0.0, 1000.0, 101.0);
        rect.shrink(100.0);
        assert_eq!(rect, Rect::new(1.0, 1.0, 999.0, 100.0));

        // Height is now 99, only X keeps shrinking.
        rect.shrink(100.0);
        assert_eq!(rect, Rect::new(2.0, 1.0, 998.0, 100.0));
    }

    #[test]
    fn test_contains_strict_excludes_edges() {
        let rect = Rect::new(0.0, 0.0, 100.0, 100.0);
        assert!(rect.contains_strict(50.0, 50.0));
        assert!(!rect.contains_strict(0.0, 50.0));
        assert!(!rect.contains_strict(50.0, 100.0));
        assert!(!rect.contains_strict(-1.0, 50.0));
    }

    #[test]
    fn test_clamp_square_pushes_one_unit_inside() {
        let area = Rect::new(0.0, 0.0, 1000.0, 600.0);

        assert_eq!(PhysicsSystem::clamp_square(-5.0, 300.0, 20.0, &area), (1.0, 300.0));
        assert_eq!(PhysicsSystem::clamp_square(0.0, 300.0, 20.0, &area), (1.0, 300.0));
        assert_eq!(PhysicsSystem::clamp_square(985.0, 590.0, 20.0, &area), (979.0, 579.0));
        assert_eq!(PhysicsSystem::clamp_square(500.0, 300.0, 20.0, &area), (500.0, 300.0));
    }

    #[test]
    fn test_point_in_square_inclusive() {
        assert!(PhysicsSystem::point_in_square(10.0, 10.0, 10.0, 10.0, 20.0));
        assert!(PhysicsSystem::point_in_square(30.0, 30.0, 10.0, 10.0, 20.0));
        assert!(!PhysicsSystem::point_in_square(30.1, 30.0, 10.0, 10.0, 20.0));
        assert!(!PhysicsSystem::point_in_square(9.9, 20.0, 10.0, 10.0, 20.0));
    }

    #[test]
    fn test_sanitize_angle() {
        assert_eq!(PhysicsSystem::sanitize_angle(1.5), 1.5);
        assert_eq!(PhysicsSystem::sanitize_angle(f64::NAN), 0.0);
        assert_eq!(PhysicsSystem::sanitize_angle(f64::INFINITY), 0.0);
    }
}
