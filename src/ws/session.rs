//! Per-connection session: maps one client to at most one participant

use std::sync::Arc;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::game::ArenaRoom;
use crate::util::rate_limit::SessionRateLimiter;

use super::protocol::{ClientMsg, ServerMsg};

/// Participant identity held by a session. The name is only a lookup key;
/// the participant itself lives in the arena.
#[derive(Debug, Clone, PartialEq, Eq)]
struct Identity {
    name: String,
    generation: u64,
}

/// One connected client
pub struct Session {
    id: Uuid,
    room: Arc<ArenaRoom>,
    identity: Option<Identity>,
    limiter: SessionRateLimiter,
}

impl Session {
    pub fn new(room: Arc<ArenaRoom>) -> Self {
        Self {
            id: Uuid::new_v4(),
            room,
            identity: None,
            limiter: SessionRateLimiter::new(),
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    /// Forget the participant if the room was rebuilt since registration
    fn refresh_identity(&mut self) {
        let generation = self.room.generation();
        if self
            .identity
            .as_ref()
            .is_some_and(|identity| identity.generation != generation)
        {
            self.identity = None;
        }
    }

    /// Name of the participant this session plays as
    pub fn participant(&mut self) -> Option<&str> {
        self.refresh_identity();
        self.identity.as_ref().map(|identity| identity.name.as_str())
    }

    /// Apply a client message subject to the input rate limit.
    ///
    /// Throttled intents are dropped. A throttled register is answered with
    /// `rate_limited` so the client is not left waiting for a reply.
    pub fn receive(&mut self, msg: ClientMsg) -> Option<ServerMsg> {
        if self.limiter.check_input() {
            return self.handle(msg);
        }

        warn!(session = %self.id, "Rate limited input message");
        match msg {
            ClientMsg::Register { .. } => Some(ServerMsg::error(
                "rate_limited",
                "too many messages, retry registration shortly",
            )),
            _ => None,
        }
    }

    /// Apply a client message. Returns a reply meant for this client only.
    pub fn handle(&mut self, msg: ClientMsg) -> Option<ServerMsg> {
        match msg {
            ClientMsg::Register { name } => Some(self.handle_register(&name)),
            ClientMsg::Move { angle } => {
                self.refresh_identity();
                if let Some(identity) = &self.identity {
                    self.room.set_move(&identity.name, angle);
                }
                None
            }
            ClientMsg::Shoot { angle } => {
                self.refresh_identity();
                if let Some(identity) = &self.identity {
                    self.room.set_shoot(&identity.name, angle);
                }
                None
            }
            ClientMsg::Start => {
                self.room.start();
                None
            }
            ClientMsg::Stop => {
                self.room.stop();
                None
            }
            ClientMsg::Rebuild => {
                info!(session = %self.id, room = %self.room.name(), "Rebuild requested");
                if let Err(e) = self.room.rebuild() {
                    warn!(session = %self.id, error = %e, "Rebuild failed");
                    return Some(ServerMsg::error("rebuild_failed", e.to_string()));
                }
                None
            }
            ClientMsg::Ping { t } => Some(ServerMsg::Pong { t }),
        }
    }

    fn handle_register(&mut self, name: &str) -> ServerMsg {
        self.refresh_identity();
        if let Some(current) = &self.identity {
            return ServerMsg::error(
                "already_registered",
                format!("already playing as {}", current.name),
            );
        }

        match self.room.register(name) {
            Ok(registration) => {
                self.identity = Some(Identity {
                    name: registration.participant.name.clone(),
                    generation: registration.generation,
                });
                ServerMsg::Registered {
                    participant: registration.participant,
                    info: registration.snapshot,
                }
            }
            Err(e) => {
                debug!(session = %self.id, error = %e, "Registration rejected");
                ServerMsg::error(e.code(), e.to_string())
            }
        }
    }

    /// React to a room broadcast before it is forwarded to the client
    pub fn on_broadcast(&mut self, msg: &ServerMsg) {
        if let ServerMsg::Close { .. } = msg {
            self.identity = None;
        }
    }

    /// Connection closed: release the participant
    pub fn close(&mut self) {
        if let Some(name) = self.participant().map(str::to_owned) {
            self.room.exit(&name);
        }
        self.identity = None;
    }
}
