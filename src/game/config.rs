//! Arena tuning constants

use serde::{Deserialize, Serialize};

use super::physics::Rect;

/// Tunable simulation constants for one arena.
///
/// Every field can be overridden independently; `Default` gives the stock
/// 1000x600 arena with 60 seats.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ArenaConfig {
    /// Side length of a participant's square
    pub user_width: f64,
    /// Distance covered by one move intent
    pub move_speed: f64,
    /// Ticks between two shots of the same participant
    pub shoot_interval: i64,
    /// Distance a bullet travels per tick
    pub bullet_speed: f64,
    /// Ticks the area holds before a shrink phase
    pub wait_shrink_steps: u32,
    /// Counter value that ends a shrink phase
    pub shrink_steps: u32,
    /// The area stops shrinking along an axis once it is this narrow
    pub min_area_extent: f64,
    /// Initial play area
    pub area: Rect,
    /// Seat grid columns
    pub seat_columns: u32,
    /// Seat grid rows
    pub seat_rows: u32,
    /// Fixed RNG seed (seat shuffle, colors). Random when `None`.
    pub seed: Option<u64>,
}

impl Default for ArenaConfig {
    fn default() -> Self {
        Self {
            user_width: 20.0,
            move_speed: 10.0,
            shoot_interval: 5,
            bullet_speed: 20.0,
            wait_shrink_steps: 100,
            shrink_steps: 20,
            min_area_extent: 100.0,
            area: Rect::new(0.0, 0.0, 1000.0, 600.0),
            seat_columns: 10,
            seat_rows: 6,
            seed: None,
        }
    }
}

impl ArenaConfig {
    /// Total number of seats in the grid
    pub fn seat_capacity(&self) -> usize {
        self.seat_columns as usize * self.seat_rows as usize
    }

    /// Check that the constants describe a playable arena
    pub fn validate(&self) -> Result<(), ArenaConfigError> {
        if !self.user_width.is_finite() || self.user_width <= 0.0 {
            return Err(ArenaConfigError::UserWidth(self.user_width));
        }
        for (field, speed) in [
            ("move_speed", self.move_speed),
            ("bullet_speed", self.bullet_speed),
            ("min_area_extent", self.min_area_extent),
        ] {
            if !speed.is_finite() || speed < 0.0 {
                return Err(ArenaConfigError::Negative(field));
            }
        }
        if self.shoot_interval < 0 {
            return Err(ArenaConfigError::Negative("shoot_interval"));
        }
        if self.wait_shrink_steps == 0 {
            return Err(ArenaConfigError::ZeroSteps("wait_shrink_steps"));
        }
        if self.shrink_steps == 0 {
            return Err(ArenaConfigError::ZeroSteps("shrink_steps"));
        }

        let area = self.area;
        let finite = [area.start_x, area.start_y, area.end_x, area.end_y]
            .iter()
            .all(|v| v.is_finite());
        if !finite || area.width() <= 0.0 || area.height() <= 0.0 {
            return Err(ArenaConfigError::EmptyArea);
        }

        if self.seat_columns == 0 || self.seat_rows == 0 {
            return Err(ArenaConfigError::EmptySeatGrid);
        }
        let cell_w = area.width() / self.seat_columns as f64;
        let cell_h = area.height() / self.seat_rows as f64;
        if cell_w < self.user_width || cell_h < self.user_width {
            return Err(ArenaConfigError::SeatTooSmall {
                cell: cell_w.min(cell_h),
                user_width: self.user_width,
            });
        }

        Ok(())
    }
}

/// Rejected arena configuration
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ArenaConfigError {
    #[error("user_width must be a positive number, got {0}")]
    UserWidth(f64),

    #[error("{0} must be a non-negative number")]
    Negative(&'static str),

    #[error("{0} must be at least 1")]
    ZeroSteps(&'static str),

    #[error("arena area must have positive width and height")]
    EmptyArea,

    #[error("seat grid needs at least one column and one row")]
    EmptySeatGrid,

    #[error("seat cell ({cell}) is narrower than user_width ({user_width})")]
    SeatTooSmall { cell: f64, user_width: f64 },
}
