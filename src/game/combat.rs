//! Combat system - cooldowns, bullets, hit detection

use serde::{Deserialize, Serialize};

use super::physics::{PhysicsSystem, Rect};

/// Bullet in flight. Travels in a straight line at a fixed angle.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Bullet {
    /// Name of the participant who fired it
    pub owner: String,
    pub x: f64,
    pub y: f64,
    pub start_x: f64,
    pub start_y: f64,
    /// Travel angle in radians
    pub angle: f64,
    /// Copied from the owner when fired
    pub color: String,
    pub finished: bool,
}

impl Bullet {
    /// Create a bullet at `(x, y)`
    pub fn new(owner: String, color: String, x: f64, y: f64, angle: f64) -> Self {
        Self {
            owner,
            x,
            y,
            start_x: x,
            start_y: y,
            angle,
            color,
            finished: false,
        }
    }

    /// Move one tick along the travel angle
    pub fn advance(&mut self, speed: f64) {
        let (dx, dy) = PhysicsSystem::displacement(self.angle, speed);
        self.x += dx;
        self.y += dy;
    }

    /// Check the bullet point against a square target
    pub fn hits(&self, target_x: f64, target_y: f64, size: f64) -> bool {
        PhysicsSystem::point_in_square(self.x, self.y, target_x, target_y, size)
    }

    /// Finish the bullet if it has left `area`; returns whether it is finished
    pub fn check_bounds(&mut self, area: &Rect) -> bool {
        if !area.contains_strict(self.x, self.y) {
            self.finished = true;
        }
        self.finished
    }
}

/// Combat rules shared by the tick
pub struct CombatSystem;

impl CombatSystem {
    /// Check if a participant can fire (cooldown check)
    pub fn can_fire(shoot_cooldown: i64) -> bool {
        shoot_cooldown <= 0
    }

    /// Cooldown after one tick. May go negative.
    pub fn update_cooldown(shoot_cooldown: i64) -> i64 {
        shoot_cooldown - 1
    }

    /// Cooldown to set after firing
    pub fn fire_cooldown(shoot_interval: i64) -> i64 {
        shoot_interval
    }
}

/// Kill recorded during bullet resolution
#[derive(Debug, Clone, PartialEq)]
pub struct HitResult {
    pub shooter: String,
    pub victim: String,
    pub x: f64,
    pub y: f64,
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f64::consts::PI;

    #[test]
    fn test_bullet_advances_along_angle() {
        let mut bullet = Bullet::new("abc".into(), "#ffffff".into(), 100.0, 100.0, PI);
        bullet.advance(20.0);
        assert!((bullet.x - 100.0).abs() < 1e-9);
        assert!((bullet.y - 120.0).abs() < 1e-9);
        assert_eq!((bullet.start_x, bullet.start_y), (100.0, 100.0));
    }

    #[test]
    fn test_bullet_out_of_bounds() {
        let area = Rect::new(0.0, 0.0, 100.0, 100.0);
        let mut bullet = Bullet::new("abc".into(), "#000000".into(), 50.0, 50.0, 0.0);
        assert!(!bullet.check_bounds(&area));

        bullet.y = 0.0;
        assert!(bullet.check_bounds(&area));
        assert!(bullet.finished);
    }

    #[test]
    fn test_cooldown_rules() {
        assert!(CombatSystem::can_fire(0));
        assert!(CombatSystem::can_fire(-4));
        assert!(!CombatSystem::can_fire(1));
        assert_eq!(CombatSystem::update_cooldown(0), -1);
        assert_eq!(CombatSystem::fire_cooldown(5), 5);
    }
}
