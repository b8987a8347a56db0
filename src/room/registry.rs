//! The process-wide room registry: create, look up, list, and delete
//! rooms by share code.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use log::info;
use rand::Rng;
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;

use super::actor::{RoomActor, RoomHandle};
use super::config::RoomConfig;
use super::messages::RoomError;
use crate::ai::AiStrategy;
use crate::game::constants::ROOM_CODE_LENGTH;
use crate::game::entities::PlayerName;
use crate::ledger::LedgerStore;

const CODE_ALPHABET: &[u8] = b"abcdefghjkmnpqrstuvwxyz23456789";

/// A room's share code. Short, unambiguous, and the only thing a
/// player needs to join.
#[derive(Clone, Debug, Deserialize, Eq, Hash, Ord, PartialEq, PartialOrd, Serialize)]
pub struct RoomCode(String);

impl RoomCode {
    #[must_use]
    pub fn generate() -> Self {
        let mut rng = rand::rng();
        let code = (0..ROOM_CODE_LENGTH)
            .map(|_| CODE_ALPHABET[rng.random_range(0..CODE_ALPHABET.len())] as char)
            .collect();
        Self(code)
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for RoomCode {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        self.0.fmt(f)
    }
}

impl From<&str> for RoomCode {
    fn from(value: &str) -> Self {
        Self(value.to_ascii_lowercase())
    }
}

/// Listing metadata for a room.
#[derive(Clone, Debug)]
pub struct RoomMeta {
    pub code: RoomCode,
    pub name: String,
    pub creator: Option<PlayerName>,
    pub created_at: DateTime<Utc>,
    pub expires_at: Option<DateTime<Utc>>,
}

struct RoomEntry {
    handle: RoomHandle,
    meta: RoomMeta,
}

/// Owns every live room. Rooms are independent actors; the registry
/// only routes and bookkeeps.
pub struct RoomRegistry {
    rooms: RwLock<HashMap<RoomCode, RoomEntry>>,
    strategy: Arc<dyn AiStrategy>,
    ledger: Arc<dyn LedgerStore>,
}

impl RoomRegistry {
    #[must_use]
    pub fn new(strategy: Arc<dyn AiStrategy>, ledger: Arc<dyn LedgerStore>) -> Self {
        Self {
            rooms: RwLock::new(HashMap::new()),
            strategy,
            ledger,
        }
    }

    /// Create a room under a freshly generated share code.
    pub async fn create(
        &self,
        config: RoomConfig,
        creator: Option<PlayerName>,
    ) -> Result<RoomHandle, RoomError> {
        self.create_with_code(RoomCode::generate(), config, creator)
            .await
    }

    /// Create a room under a specific code. A colliding code is
    /// rejected outright, never silently regenerated.
    pub async fn create_with_code(
        &self,
        code: RoomCode,
        config: RoomConfig,
        creator: Option<PlayerName>,
    ) -> Result<RoomHandle, RoomError> {
        config.validate().map_err(RoomError::InvalidConfig)?;
        let mut rooms = self.rooms.write().await;
        Self::sweep(&mut rooms);
        if rooms.contains_key(&code) {
            return Err(RoomError::CodeCollision);
        }
        let meta = RoomMeta {
            code: code.clone(),
            name: config.name.clone(),
            creator,
            created_at: Utc::now(),
            expires_at: config
                .ttl
                .map(|ttl| Utc::now() + chrono::Duration::seconds(ttl.as_secs() as i64)),
        };
        let handle = RoomActor::spawn(
            code.as_str().to_string(),
            config,
            Arc::clone(&self.strategy),
            Arc::clone(&self.ledger),
        );
        info!("registry: created room {code}");
        rooms.insert(
            code,
            RoomEntry {
                handle: handle.clone(),
                meta,
            },
        );
        Ok(handle)
    }

    /// Look a room up by code. Closed and expired rooms are swept and
    /// read as absent.
    pub async fn get(&self, code: &RoomCode) -> Option<RoomHandle> {
        let rooms = self.rooms.read().await;
        let entry = rooms.get(code)?;
        if entry.handle.is_closed() {
            return None;
        }
        Some(entry.handle.clone())
    }

    /// Metadata for every live room.
    pub async fn list(&self) -> Vec<RoomMeta> {
        let mut rooms = self.rooms.write().await;
        Self::sweep(&mut rooms);
        let mut metas: Vec<RoomMeta> = rooms.values().map(|entry| entry.meta.clone()).collect();
        metas.sort_by(|a, b| a.created_at.cmp(&b.created_at));
        metas
    }

    /// Shut a room down and forget it.
    pub async fn delete(&self, code: &RoomCode) -> Result<(), RoomError> {
        let entry = {
            let mut rooms = self.rooms.write().await;
            rooms.remove(code).ok_or(RoomError::RoomNotFound)?
        };
        // The room may already have expired on its own.
        let _ = entry.handle.close().await;
        info!("registry: deleted room {code}");
        Ok(())
    }

    /// Extend a room's lifetime and refresh its listing metadata.
    pub async fn extend(&self, code: &RoomCode) -> Result<Option<DateTime<Utc>>, RoomError> {
        let handle = self.get(code).await.ok_or(RoomError::RoomNotFound)?;
        let expires_at = handle.extend().await?;
        let mut rooms = self.rooms.write().await;
        if let Some(entry) = rooms.get_mut(code) {
            entry.meta.expires_at = expires_at;
        }
        Ok(expires_at)
    }

    pub async fn room_count(&self) -> usize {
        self.rooms.read().await.len()
    }

    /// Drop entries whose actors have shut down (closed or expired).
    fn sweep(rooms: &mut HashMap<RoomCode, RoomEntry>) {
        rooms.retain(|_, entry| !entry.handle.is_closed());
    }
}
