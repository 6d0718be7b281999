//! Snapshot of the arena for broadcasting

use serde::{Deserialize, Serialize};

use super::arena::{ArenaStatus, Participant};
use super::combat::Bullet;
use super::physics::Rect;

/// Full world state as sent to clients after every tick and state change.
///
/// Eliminated participants stay in `participants` so clients can render them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ArenaSnapshot {
    pub status: ArenaStatus,
    pub tick: u64,
    /// Number of participant records
    pub count: usize,
    pub participants: Vec<Participant>,
    pub bullets: Vec<Bullet>,
    pub area: Rect,
}

impl ArenaSnapshot {
    #[cfg(test)]
    pub fn participant(&self, name: &str) -> Option<&Participant> {
        self.participants.iter().find(|p| p.name == name)
    }

    pub fn alive_count(&self) -> usize {
        self.participants.iter().filter(|p| p.alive).count()
    }
}
