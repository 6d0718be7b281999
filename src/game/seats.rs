//! Spawn seat pool

use rand::seq::SliceRandom;
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;

use super::config::ArenaConfig;

/// Spawn point: top-left corner of a participant square
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Seat {
    pub x: f64,
    pub y: f64,
}

/// Shuffled queue of free seats. Taken from the front, returned to the back.
#[derive(Debug, Clone, Default)]
pub struct SeatPool {
    seats: VecDeque<Seat>,
}

impl SeatPool {
    /// Build the full seat grid and shuffle it once
    pub fn shuffled<R: Rng + ?Sized>(config: &ArenaConfig, rng: &mut R) -> Self {
        let mut seats = Self::grid(config);
        seats.shuffle(rng);
        Self {
            seats: seats.into(),
        }
    }

    /// Seats centred in each grid cell, column-major
    pub fn grid(config: &ArenaConfig) -> Vec<Seat> {
        let area = config.area;
        let cell_w = area.width() / config.seat_columns as f64;
        let cell_h = area.height() / config.seat_rows as f64;
        let half = config.user_width / 2.0;

        let mut seats = Vec::with_capacity(config.seat_capacity());
        for i in 0..config.seat_columns {
            for j in 0..config.seat_rows {
                seats.push(Seat {
                    x: area.start_x + i as f64 * cell_w + cell_w / 2.0 - half,
                    y: area.start_y + j as f64 * cell_h + cell_h / 2.0 - half,
                });
            }
        }
        seats
    }

    pub fn take(&mut self) -> Option<Seat> {
        self.seats.pop_front()
    }

    pub fn give_back(&mut self, seat: Seat) {
        self.seats.push_back(seat);
    }

    #[cfg(test)]
    pub fn len(&self) -> usize {
        self.seats.len()
    }

    pub fn is_empty(&self) -> bool {
        self.seats.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    #[test]
    fn test_default_grid() {
        let seats = SeatPool::grid(&ArenaConfig::default());
        assert_eq!(seats.len(), 60);
        assert_eq!(seats[0], Seat { x: 40.0, y: 40.0 });
        assert_eq!(seats[59], Seat { x: 940.0, y: 540.0 });
    }

    #[test]
    fn test_shuffle_is_seeded() {
        let config = ArenaConfig::default();
        let a = SeatPool::shuffled(&config, &mut ChaCha8Rng::seed_from_u64(7));
        let b = SeatPool::shuffled(&config, &mut ChaCha8Rng::seed_from_u64(7));
        assert_eq!(a.seats, b.seats);
        assert_eq!(a.len(), 60);
    }

    #[test]
    fn test_returned_seat_goes_last() {
        let config = ArenaConfig::default();
        let mut pool = SeatPool::shuffled(&config, &mut ChaCha8Rng::seed_from_u64(1));

        let first = pool.take().unwrap();
        assert_eq!(pool.len(), 59);

        pool.give_back(first);
        assert_eq!(pool.len(), 60);
        assert_eq!(pool.seats.back(), Some(&first));
        assert_ne!(pool.seats.front(), Some(&first));
    }
}
