//! Arena rooms: serialized access, tick loop and update broadcast

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use parking_lot::Mutex;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tokio::time::{interval, MissedTickBehavior};
use tracing::{debug, info, warn};

use crate::util::time::{unix_millis, Timer};
use crate::ws::protocol::ServerMsg;

use super::arena::{Arena, ArenaError, Participant};
use super::config::{ArenaConfig, ArenaConfigError};
use super::snapshot::ArenaSnapshot;

/// Longest accepted room name
pub const MAX_ROOM_NAME_LEN: usize = 32;

/// Room names are short ASCII identifiers
pub fn valid_room_name(name: &str) -> bool {
    !name.is_empty()
        && name.len() <= MAX_ROOM_NAME_LEN
        && name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
}

/// Handle to the periodic tick task. Cancelling is idempotent.
pub struct TickHandle {
    task: JoinHandle<()>,
}

impl TickHandle {
    pub fn cancel(&self) {
        self.task.abort();
    }
}

impl Drop for TickHandle {
    fn drop(&mut self) {
        self.task.abort();
    }
}

/// Successful registration, tagged with the room generation it belongs to
#[derive(Debug, Clone)]
pub struct Registration {
    pub participant: Participant,
    pub snapshot: ArenaSnapshot,
    pub generation: u64,
}

/// One arena plus the machinery that drives it.
///
/// The arena mutex is the single serialization point for every mutation,
/// including ticks.
pub struct ArenaRoom {
    name: String,
    /// Constants every rebuild starts from
    config: ArenaConfig,
    arena: Mutex<Arena>,
    updates: broadcast::Sender<ServerMsg>,
    ticker: Mutex<Option<TickHandle>>,
    tick_interval: Duration,
    /// Bumped on every rebuild; identities from older generations are stale
    generation: AtomicU64,
    connections: AtomicUsize,
}

impl ArenaRoom {
    pub fn new(
        name: impl Into<String>,
        config: ArenaConfig,
        tick_interval: Duration,
    ) -> Result<Arc<Self>, ArenaConfigError> {
        let arena = Arena::new(config.clone())?;
        let (updates, _) = broadcast::channel(64);

        Ok(Arc::new(Self {
            name: name.into(),
            config,
            arena: Mutex::new(arena),
            updates,
            ticker: Mutex::new(None),
            tick_interval,
            generation: AtomicU64::new(0),
            connections: AtomicUsize::new(0),
        }))
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn subscribe(&self) -> broadcast::Receiver<ServerMsg> {
        self.updates.subscribe()
    }

    pub fn snapshot(&self) -> ArenaSnapshot {
        self.arena.lock().snapshot()
    }

    pub fn generation(&self) -> u64 {
        self.generation.load(Ordering::Acquire)
    }

    pub fn participant_count(&self) -> usize {
        self.arena.lock().participant_count()
    }

    pub fn connections(&self) -> usize {
        self.connections.load(Ordering::Relaxed)
    }

    pub fn is_ticking(&self) -> bool {
        self.ticker.lock().is_some()
    }

    fn broadcast(&self, msg: ServerMsg) {
        // No receivers is fine, nobody is watching.
        let _ = self.updates.send(msg);
    }

    pub fn register(&self, name: &str) -> Result<Registration, ArenaError> {
        let registration = {
            let mut arena = self.arena.lock();
            let participant = arena.register(name)?;
            Registration {
                participant,
                snapshot: arena.snapshot(),
                generation: self.generation(),
            }
        };

        info!(
            room = %self.name,
            participant = %registration.participant.name,
            count = registration.snapshot.count,
            "Participant registered"
        );
        self.broadcast(ServerMsg::Info {
            snapshot: registration.snapshot.clone(),
        });
        Ok(registration)
    }

    pub fn exit(&self, name: &str) {
        let snapshot = {
            let mut arena = self.arena.lock();
            if !arena.exit(name) {
                return;
            }
            arena.snapshot()
        };

        info!(room = %self.name, participant = %name, "Participant exited");
        self.broadcast(ServerMsg::Info { snapshot });
    }

    pub fn set_move(&self, name: &str, angle: f64) {
        self.arena.lock().set_move_intent(name, angle);
    }

    pub fn set_shoot(&self, name: &str, angle: f64) {
        self.arena.lock().set_shoot_intent(name, angle);
    }

    /// Start the arena and its tick loop. Returns false if a loop is already active.
    pub fn start(self: &Arc<Self>) -> bool {
        let mut ticker = self.ticker.lock();
        if ticker.is_some() {
            debug!(room = %self.name, "Tick loop already running");
            return false;
        }

        self.arena.lock().start();

        let weak = Arc::downgrade(self);
        let period = self.tick_interval;
        let task = tokio::spawn(async move {
            let mut tick_interval = interval(period);
            tick_interval.set_missed_tick_behavior(MissedTickBehavior::Skip);
            // The first tick fires immediately; the first advance waits a full period.
            tick_interval.tick().await;

            loop {
                tick_interval.tick().await;
                let Some(room) = weak.upgrade() else {
                    break;
                };
                room.tick();
            }
        });

        *ticker = Some(TickHandle { task });
        info!(room = %self.name, period_ms = period.as_millis() as u64, "Tick loop started");
        true
    }

    /// Cancel the tick loop and pause the arena. Returns false if no loop was active.
    pub fn stop(&self) -> bool {
        let Some(handle) = self.ticker.lock().take() else {
            return false;
        };
        handle.cancel();

        self.arena.lock().stop();
        self.broadcast(ServerMsg::Stop { at: unix_millis() });
        info!(room = %self.name, "Tick loop stopped");
        true
    }

    /// Stop, re-initialise the arena from the room's configuration and drop
    /// every session mapping
    pub fn rebuild(&self) -> Result<(), ArenaConfigError> {
        self.stop();

        let snapshot = {
            let mut arena = self.arena.lock();
            arena.init(self.config.clone())?;
            self.generation.fetch_add(1, Ordering::AcqRel);
            arena.snapshot()
        };

        self.broadcast(ServerMsg::Close { at: unix_millis() });
        self.broadcast(ServerMsg::Rebuild { at: unix_millis() });
        self.broadcast(ServerMsg::Info { snapshot });
        info!(room = %self.name, generation = self.generation(), "Arena rebuilt");
        Ok(())
    }

    /// Advance one tick and broadcast the result
    pub fn tick(&self) {
        let timer = Timer::new();
        let (hits, snapshot) = {
            let mut arena = self.arena.lock();
            let hits = arena.advance();
            (hits, arena.snapshot())
        };

        for hit in &hits {
            info!(
                room = %self.name,
                shooter = %hit.shooter,
                victim = %hit.victim,
                x = hit.x,
                y = hit.y,
                alive = snapshot.alive_count(),
                "Participant eliminated"
            );
        }

        let tick = snapshot.tick;
        self.broadcast(ServerMsg::Info { snapshot });

        let elapsed = timer.elapsed_micros();
        if elapsed > self.tick_interval.as_micros() as u64 {
            warn!(room = %self.name, tick, elapsed_micros = elapsed, "Tick overran its period");
        }
    }

    fn is_idle(&self) -> bool {
        self.connections() == 0 && !self.is_ticking() && self.participant_count() == 0
    }
}

/// Room lookup failures
#[derive(Debug, thiserror::Error)]
pub enum RoomError {
    #[error("invalid room name")]
    InvalidName,

    #[error("room limit of {0} reached")]
    TooManyRooms(usize),

    #[error(transparent)]
    Config(#[from] ArenaConfigError),
}

/// Registry of all live rooms
pub struct RoomRegistry {
    rooms: DashMap<String, Arc<ArenaRoom>>,
    config: ArenaConfig,
    tick_interval: Duration,
    max_rooms: usize,
}

impl RoomRegistry {
    pub fn new(config: ArenaConfig, tick_interval: Duration, max_rooms: usize) -> Self {
        Self {
            rooms: DashMap::new(),
            config,
            tick_interval,
            max_rooms,
        }
    }

    pub fn get(&self, name: &str) -> Option<Arc<ArenaRoom>> {
        self.rooms.get(name).map(|r| r.value().clone())
    }

    /// Get or create a room and count a new connection to it
    pub fn join(&self, name: &str) -> Result<Arc<ArenaRoom>, RoomError> {
        if !valid_room_name(name) {
            return Err(RoomError::InvalidName);
        }

        // len() locks every shard, so it is read before taking the entry lock.
        let at_capacity = self.rooms.len() >= self.max_rooms;
        // Count the connection under the entry guard; leave() checks idleness under the same shard lock.
        match self.rooms.entry(name.to_owned()) {
            Entry::Occupied(entry) => {
                let room = entry.get().clone();
                room.connections.fetch_add(1, Ordering::Relaxed);
                Ok(room)
            }
            Entry::Vacant(entry) => {
                if at_capacity {
                    return Err(RoomError::TooManyRooms(self.max_rooms));
                }
                let room = ArenaRoom::new(name, self.config.clone(), self.tick_interval)?;
                room.connections.fetch_add(1, Ordering::Relaxed);
                info!(room = %name, "Room created");
                entry.insert(room.clone());
                Ok(room)
            }
        }
    }

    /// Count a closed connection and drop the room once nothing uses it
    pub fn leave(&self, room: &ArenaRoom) {
        room.connections.fetch_sub(1, Ordering::Relaxed);
        if self
            .rooms
            .remove_if(room.name(), |_, r| std::ptr::eq(r.as_ref(), room) && r.is_idle())
            .is_some()
        {
            info!(room = %room.name(), "Idle room removed");
        }
    }

    pub fn active_rooms(&self) -> usize {
        self.rooms.len()
    }

    pub fn total_participants(&self) -> usize {
        self.rooms
            .iter()
            .map(|r| r.value().participant_count())
            .sum()
    }

    pub fn total_connections(&self) -> usize {
        self.rooms.iter().map(|r| r.value().connections()).sum()
    }
}
