//! The injected ledger store trait and an in-memory reference
//! implementation for tests and single-process deployments.

use std::collections::{HashMap, HashSet};

use async_trait::async_trait;
use tokio::sync::Mutex;

use super::errors::{LedgerError, LedgerResult};
use super::models::SettlementEntry;
use crate::game::entities::{Chips, PlayerName};

/// Where settlement results go. Implementations are expected to be
/// durable and idempotent on `idempotency_key`; the engine retries
/// reported failures with the same key.
#[async_trait]
pub trait LedgerStore: Send + Sync {
    /// Record one seat's hand result. Must reject duplicates of a key
    /// it has already recorded with [`LedgerError::DuplicateEntry`].
    async fn record(&self, entry: &SettlementEntry) -> LedgerResult<()>;

    /// The last known balance for a player, if any entry mentioned
    /// them.
    async fn balance(&self, player: &PlayerName) -> LedgerResult<Option<Chips>>;
}

/// In-memory ledger: a plain append log plus a balance map.
#[derive(Debug, Default)]
pub struct MemoryLedger {
    inner: Mutex<MemoryLedgerInner>,
}

#[derive(Debug, Default)]
struct MemoryLedgerInner {
    entries: Vec<SettlementEntry>,
    balances: HashMap<PlayerName, Chips>,
    seen_keys: HashSet<String>,
}

impl MemoryLedger {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// All recorded entries, oldest first.
    pub async fn entries(&self) -> Vec<SettlementEntry> {
        self.inner.lock().await.entries.clone()
    }
}

#[async_trait]
impl LedgerStore for MemoryLedger {
    async fn record(&self, entry: &SettlementEntry) -> LedgerResult<()> {
        let mut inner = self.inner.lock().await;
        if !inner.seen_keys.insert(entry.idempotency_key.clone()) {
            return Err(LedgerError::DuplicateEntry(entry.idempotency_key.clone()));
        }
        inner
            .balances
            .insert(entry.player.clone(), entry.balance_after);
        inner.entries.push(entry.clone());
        Ok(())
    }

    async fn balance(&self, player: &PlayerName) -> LedgerResult<Option<Chips>> {
        Ok(self.inner.lock().await.balances.get(player).copied())
    }
}
