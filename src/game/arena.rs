//! Arena state and the authoritative tick

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::debug;

use crate::util::time::unix_millis;

use super::combat::{Bullet, CombatSystem, HitResult};
use super::config::{ArenaConfig, ArenaConfigError};
use super::physics::{PhysicsSystem, Rect};
use super::seats::{Seat, SeatPool};
use super::snapshot::ArenaSnapshot;

/// Arena lifecycle status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ArenaStatus {
    /// Accepting registrations
    Pending,
    /// Ticks advance the world
    Running,
    /// Paused, ticks are ignored
    Stopped,
}

/// Participant state (authoritative)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Participant {
    /// Unique key, 1-3 characters
    pub name: String,
    pub color: String,
    /// Top-left corner of the participant square
    pub x: f64,
    pub y: f64,
    pub alive: bool,
    /// Ticks until the next shot is allowed
    pub shoot_cooldown: i64,
    /// Owner of the bullet that eliminated this participant
    pub murderer: Option<String>,
    /// Unix millis of the last shot, diagnostics only
    pub last_shoot_at: Option<u64>,
}

impl Participant {
    fn new(name: String, color: String, seat: Seat) -> Self {
        Self {
            name,
            color,
            x: seat.x,
            y: seat.y,
            alive: true,
            shoot_cooldown: 0,
            murderer: None,
            last_shoot_at: None,
        }
    }
}

/// Registration failures
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ArenaError {
    #[error("match already started")]
    InvalidState,

    #[error("arena is full")]
    ArenaFull,

    #[error("name is empty")]
    InvalidName,

    #[error("name {0:?} is taken")]
    DuplicateName(String),
}

impl ArenaError {
    /// Stable code for the wire protocol
    pub fn code(&self) -> &'static str {
        match self {
            ArenaError::InvalidState => "invalid_state",
            ArenaError::ArenaFull => "arena_full",
            ArenaError::InvalidName => "invalid_name",
            ArenaError::DuplicateName(_) => "duplicate_name",
        }
    }
}

/// Hold/shrink cycle of the play area.
///
/// Holding counts down from `wait_shrink_steps`; hitting 0 starts a shrink.
/// Shrinking counts up from 0; hitting `shrink_steps` resets to holding.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct ShrinkState {
    counter: u32,
    shrinking: bool,
}

impl ShrinkState {
    fn holding(wait_shrink_steps: u32) -> Self {
        Self {
            counter: wait_shrink_steps,
            shrinking: false,
        }
    }

    fn step(&mut self, area: &mut Rect, config: &ArenaConfig) {
        if self.shrinking {
            area.shrink(config.min_area_extent);
            self.counter += 1;
            if self.counter == config.shrink_steps {
                *self = Self::holding(config.wait_shrink_steps);
            }
        } else {
            self.counter -= 1;
            if self.counter == 0 {
                self.shrinking = true;
            }
        }
    }
}

/// Maximum name length in characters
pub const MAX_NAME_CHARS: usize = 3;

/// Truncate a display name and apply the fixed substitutions
pub fn normalize_name(raw: &str) -> String {
    let truncated: String = raw.chars().take(MAX_NAME_CHARS).collect();
    truncated
        .replacen("于经文", "吴彦祖", 1)
        .replacen("经文", "彦祖", 1)
}

/// The authoritative arena. All mutation goes through its methods.
pub struct Arena {
    config: ArenaConfig,
    status: ArenaStatus,
    tick: u64,
    participants: BTreeMap<String, Participant>,
    bullets: Vec<Bullet>,
    area: Rect,
    pending_moves: BTreeMap<String, f64>,
    pending_shots: BTreeMap<String, f64>,
    shrink: ShrinkState,
    seats: SeatPool,
    rng: ChaCha8Rng,
}

impl Arena {
    /// Validate `config` and build a fresh Pending arena
    pub fn new(config: ArenaConfig) -> Result<Self, ArenaConfigError> {
        config.validate()?;

        let rng = match config.seed {
            Some(seed) => ChaCha8Rng::seed_from_u64(seed),
            None => ChaCha8Rng::from_entropy(),
        };
        let mut arena = Self {
            status: ArenaStatus::Pending,
            tick: 0,
            participants: BTreeMap::new(),
            bullets: Vec::new(),
            area: config.area,
            pending_moves: BTreeMap::new(),
            pending_shots: BTreeMap::new(),
            shrink: ShrinkState::holding(config.wait_shrink_steps),
            seats: SeatPool::default(),
            rng,
            config,
        };
        arena.reset();
        Ok(arena)
    }

    /// Replace the configuration and reset. Safe at any status.
    pub fn init(&mut self, config: ArenaConfig) -> Result<(), ArenaConfigError> {
        config.validate()?;
        self.config = config;
        self.reset();
        Ok(())
    }

    /// Reset everything to a fresh Pending arena with the current configuration
    fn reset(&mut self) {
        if let Some(seed) = self.config.seed {
            self.rng = ChaCha8Rng::seed_from_u64(seed);
        }

        self.status = ArenaStatus::Pending;
        self.tick = 0;
        self.participants.clear();
        self.bullets.clear();
        self.area = self.config.area;
        self.pending_moves.clear();
        self.pending_shots.clear();
        self.shrink = ShrinkState::holding(self.config.wait_shrink_steps);
        self.seats = SeatPool::shuffled(&self.config, &mut self.rng);
    }

    /// Seat a new participant
    pub fn register(&mut self, name: &str) -> Result<Participant, ArenaError> {
        if self.status != ArenaStatus::Pending {
            return Err(ArenaError::InvalidState);
        }
        if self.seats.is_empty() {
            return Err(ArenaError::ArenaFull);
        }

        let name = normalize_name(name);
        if name.is_empty() {
            return Err(ArenaError::InvalidName);
        }
        if self.participants.contains_key(&name) {
            return Err(ArenaError::DuplicateName(name));
        }

        let seat = self.seats.take().ok_or(ArenaError::ArenaFull)?;
        let color = format!("#{:06x}", self.rng.gen_range(0..=0xFF_FFFFu32));
        let participant = Participant::new(name.clone(), color, seat);
        self.participants.insert(name, participant.clone());

        Ok(participant)
    }

    /// Remove a participant before the match, or eliminate them after it started.
    ///
    /// Returns false if the name is unknown.
    pub fn exit(&mut self, name: &str) -> bool {
        self.pending_moves.remove(name);
        self.pending_shots.remove(name);

        if self.status == ArenaStatus::Pending {
            match self.participants.remove(name) {
                Some(participant) => {
                    self.seats.give_back(Seat {
                        x: participant.x,
                        y: participant.y,
                    });
                    true
                }
                None => false,
            }
        } else {
            match self.participants.get_mut(name) {
                Some(participant) => {
                    participant.alive = false;
                    true
                }
                None => false,
            }
        }
    }

    /// Record a move angle for the next tick. Last write wins.
    pub fn set_move_intent(&mut self, name: &str, angle: f64) -> bool {
        if !self.participants.contains_key(name) {
            return false;
        }
        self.pending_moves
            .insert(name.to_owned(), PhysicsSystem::sanitize_angle(angle));
        true
    }

    /// Record a shot angle. Kept until the cooldown allows the shot.
    pub fn set_shoot_intent(&mut self, name: &str, angle: f64) -> bool {
        if !self.participants.contains_key(name) {
            return false;
        }
        self.pending_shots
            .insert(name.to_owned(), PhysicsSystem::sanitize_angle(angle));
        true
    }

    pub fn start(&mut self) {
        if self.status != ArenaStatus::Pending {
            debug!(status = ?self.status, "Starting arena that is not pending");
        }
        self.status = ArenaStatus::Running;
    }

    pub fn stop(&mut self) {
        self.status = ArenaStatus::Stopped;
    }

    /// Run one tick. No-op unless Running. Returns the eliminations of this tick.
    pub fn advance(&mut self) -> Vec<HitResult> {
        if self.status != ArenaStatus::Running {
            return Vec::new();
        }
        self.tick += 1;

        self.shrink.step(&mut self.area, &self.config);
        self.update_movement();
        self.update_shooting();
        let hits = self.update_bullets();

        self.bullets.retain(|b| !b.finished);
        self.pending_moves.clear();

        hits
    }

    fn update_movement(&mut self) {
        let speed = self.config.move_speed;
        for (name, angle) in &self.pending_moves {
            if let Some(participant) = self.participants.get_mut(name) {
                if participant.alive {
                    let (dx, dy) = PhysicsSystem::displacement(*angle, speed);
                    participant.x += dx;
                    participant.y += dy;
                }
            }
        }

        let size = self.config.user_width;
        for participant in self.participants.values_mut() {
            if !participant.alive {
                continue;
            }
            let (x, y) = PhysicsSystem::clamp_square(participant.x, participant.y, size, &self.area);
            participant.x = x;
            participant.y = y;
            participant.shoot_cooldown = CombatSystem::update_cooldown(participant.shoot_cooldown);
        }
    }

    fn update_shooting(&mut self) {
        let now = unix_millis();
        let half = self.config.user_width / 2.0;
        let interval = self.config.shoot_interval;
        let participants = &mut self.participants;
        let bullets = &mut self.bullets;

        self.pending_shots.retain(|name, angle| {
            let Some(participant) = participants.get_mut(name) else {
                return false;
            };
            if !participant.alive {
                return false;
            }
            if !CombatSystem::can_fire(participant.shoot_cooldown) {
                return true;
            }

            participant.shoot_cooldown = CombatSystem::fire_cooldown(interval);
            participant.last_shoot_at = Some(now);
            bullets.push(Bullet::new(
                name.clone(),
                participant.color.clone(),
                participant.x + half,
                participant.y + half,
                *angle,
            ));
            false
        });
    }

    fn update_bullets(&mut self) -> Vec<HitResult> {
        let mut hits = Vec::new();
        let speed = self.config.bullet_speed;
        let size = self.config.user_width;

        for bullet in self.bullets.iter_mut() {
            bullet.advance(speed);

            for participant in self.participants.values_mut() {
                if bullet.finished {
                    break;
                }
                if participant.name == bullet.owner || !participant.alive {
                    continue;
                }
                if bullet.hits(participant.x, participant.y, size) {
                    participant.alive = false;
                    participant.murderer = Some(bullet.owner.clone());
                    bullet.finished = true;
                    hits.push(HitResult {
                        shooter: bullet.owner.clone(),
                        victim: participant.name.clone(),
                        x: bullet.x,
                        y: bullet.y,
                    });
                }
            }

            bullet.check_bounds(&self.area);
        }

        hits
    }

    /// Pure read of the current world
    pub fn snapshot(&self) -> ArenaSnapshot {
        ArenaSnapshot {
            status: self.status,
            tick: self.tick,
            count: self.participants.len(),
            participants: self.participants.values().cloned().collect(),
            bullets: self.bullets.clone(),
            area: self.area,
        }
    }

    pub fn participant_count(&self) -> usize {
        self.participants.len()
    }
}

/// Direct state inspection for unit tests
#[cfg(test)]
impl Arena {
    pub fn status(&self) -> ArenaStatus {
        self.status
    }

    pub fn tick(&self) -> u64 {
        self.tick
    }

    pub fn config(&self) -> &ArenaConfig {
        &self.config
    }

    pub fn area(&self) -> Rect {
        self.area
    }

    pub fn participant(&self, name: &str) -> Option<&Participant> {
        self.participants.get(name)
    }

    pub fn bullets(&self) -> &[Bullet] {
        &self.bullets
    }

    pub fn available_seats(&self) -> usize {
        self.seats.len()
    }

    pub fn is_shrinking(&self) -> bool {
        self.shrink.shrinking
    }
}
