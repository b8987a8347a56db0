//! The room actor: one tokio task per room, consuming a mailbox.
//!
//! The mailbox serializes everything that can mutate the room's table
//! and round, which is what makes the engine's "at most one `apply` at
//! a time per room" guarantee hold. Distinct rooms are independent
//! tasks and run in parallel. The actor's `select!` races the mailbox
//! against the turn deadline and the room's expiry.

use std::collections::{HashMap, VecDeque};
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use log::{debug, info, warn};
use tokio::sync::{mpsc, oneshot};
use tokio::time::Instant;
use uuid::Uuid;

use super::config::RoomConfig;
use super::messages::{RoomError, RoomMessage, RoomSnapshot, RoomUpdate, SeatView};
use super::scheduler::TurnScheduler;
use crate::ai::{self, AiRequest, AiStrategy, HeuristicStrategy};
use crate::game::constants::{AI_SEAT_NAMES, ROOM_EXTENSION_SECS};
use crate::game::entities::{
    Action, AppliedAction, PlayerName, SeatBacking, SeatIndex,
};
use crate::game::round::RoundEvent;
use crate::game::table::Table;
use crate::ledger::{LedgerError, LedgerStore, SettlementEntry};

const MAILBOX_DEPTH: usize = 64;
const UPDATE_BUFFER: usize = 32;

/// Cloneable handle for talking to a room actor.
#[derive(Clone, Debug)]
pub struct RoomHandle {
    code: String,
    sender: mpsc::Sender<RoomMessage>,
}

impl RoomHandle {
    #[must_use]
    pub fn code(&self) -> &str {
        &self.code
    }

    /// Whether the actor behind this handle has shut down.
    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.sender.is_closed()
    }

    async fn request<T>(
        &self,
        make: impl FnOnce(oneshot::Sender<T>) -> RoomMessage,
    ) -> Result<T, RoomError> {
        let (tx, rx) = oneshot::channel();
        self.sender
            .send(make(tx))
            .await
            .map_err(|_| RoomError::RoomClosed)?;
        rx.await.map_err(|_| RoomError::RoomClosed)
    }

    pub async fn seat(&self, name: PlayerName) -> Result<SeatIndex, RoomError> {
        self.request(|respond| RoomMessage::Seat { name, respond })
            .await?
    }

    pub async fn leave(&self, name: PlayerName) -> Result<(), RoomError> {
        self.request(|respond| RoomMessage::Leave { name, respond })
            .await?
    }

    pub async fn start(&self, name: PlayerName) -> Result<(), RoomError> {
        self.request(|respond| RoomMessage::Start { name, respond })
            .await?
    }

    pub async fn act(&self, name: PlayerName, action: Action) -> Result<(), RoomError> {
        self.request(|respond| RoomMessage::Act {
            name,
            action,
            respond,
        })
        .await?
    }

    pub async fn snapshot(&self, observer: Option<PlayerName>) -> Result<RoomSnapshot, RoomError> {
        self.request(|respond| RoomMessage::Snapshot { observer, respond })
            .await
    }

    /// Subscribe to per-action updates for an observer.
    pub async fn subscribe(&self, name: PlayerName) -> Result<mpsc::Receiver<RoomUpdate>, RoomError> {
        let (tx, rx) = mpsc::channel(UPDATE_BUFFER);
        self.sender
            .send(RoomMessage::Subscribe { name, sender: tx })
            .await
            .map_err(|_| RoomError::RoomClosed)?;
        Ok(rx)
    }

    pub async fn unsubscribe(&self, name: PlayerName) -> Result<(), RoomError> {
        self.sender
            .send(RoomMessage::Unsubscribe { name })
            .await
            .map_err(|_| RoomError::RoomClosed)
    }

    pub async fn disconnected(&self, name: PlayerName) -> Result<(), RoomError> {
        self.sender
            .send(RoomMessage::Disconnected { name })
            .await
            .map_err(|_| RoomError::RoomClosed)
    }

    pub async fn reconnected(&self, name: PlayerName) -> Result<(), RoomError> {
        self.sender
            .send(RoomMessage::Reconnected { name })
            .await
            .map_err(|_| RoomError::RoomClosed)
    }

    /// Push the expiry out. Returns the new expiry, or `None` for
    /// rooms that never expire.
    pub async fn extend(&self) -> Result<Option<DateTime<Utc>>, RoomError> {
        self.request(|respond| RoomMessage::Extend { respond })
            .await
    }

    pub async fn close(&self) -> Result<(), RoomError> {
        self.request(|respond| RoomMessage::Close { respond })
            .await
    }
}

/// One room: a table, a roster, a broadcast fan-out, a turn deadline,
/// and an expiry timer.
pub struct RoomActor {
    code: String,
    /// Distinguishes this room instance in ledger idempotency keys,
    /// even if a code is ever reused.
    instance: Uuid,
    config: RoomConfig,
    table: Table,
    strategy: Arc<dyn AiStrategy>,
    ledger: Arc<dyn LedgerStore>,
    inbox: mpsc::Receiver<RoomMessage>,
    /// For background AI queries to post their decisions back through
    /// the mailbox.
    self_tx: mpsc::Sender<RoomMessage>,
    subscribers: HashMap<PlayerName, mpsc::Sender<RoomUpdate>>,
    scheduler: TurnScheduler,
    expires_at: Option<Instant>,
    expires_at_wall: Option<DateTime<Utc>>,
    /// A `start` request stays in force: the table re-deals after each
    /// settlement while the start conditions still hold.
    keep_dealing: bool,
    pending_ledger: VecDeque<SettlementEntry>,
    closed: bool,
}

impl RoomActor {
    /// Build a room actor and spawn it onto the runtime.
    pub fn spawn(
        code: String,
        config: RoomConfig,
        strategy: Arc<dyn AiStrategy>,
        ledger: Arc<dyn LedgerStore>,
    ) -> RoomHandle {
        let (sender, inbox) = mpsc::channel(MAILBOX_DEPTH);
        let expires_at = config.ttl.map(|ttl| Instant::now() + ttl);
        let expires_at_wall = config
            .ttl
            .map(|ttl| Utc::now() + chrono::Duration::seconds(ttl.as_secs() as i64));
        let actor = Self {
            code: code.clone(),
            instance: Uuid::new_v4(),
            table: Table::new(config.max_seats, config.forced_bet),
            scheduler: TurnScheduler::new(config.turn_timeout),
            config,
            strategy,
            ledger,
            inbox,
            self_tx: sender.clone(),
            subscribers: HashMap::new(),
            expires_at,
            expires_at_wall,
            keep_dealing: false,
            pending_ledger: VecDeque::new(),
            closed: false,
        };
        tokio::spawn(actor.run());
        RoomHandle { code, sender }
    }

    async fn run(mut self) {
        info!("room {}: open", self.code);
        let far_future = || Instant::now() + Duration::from_secs(86_400);
        loop {
            let turn_deadline = self.scheduler.deadline();
            let turn_at = turn_deadline.unwrap_or_else(far_future);
            let expiry_at = self.expires_at.unwrap_or_else(far_future);
            tokio::select! {
                maybe = self.inbox.recv() => {
                    let Some(message) = maybe else { break };
                    self.handle_message(message).await;
                    if self.closed {
                        break;
                    }
                }
                () = tokio::time::sleep_until(turn_at), if turn_deadline.is_some() => {
                    self.on_turn_deadline().await;
                }
                () = tokio::time::sleep_until(expiry_at), if self.expires_at.is_some() => {
                    info!("room {}: expired", self.code);
                    break;
                }
            }
        }
        info!("room {}: closed", self.code);
    }

    async fn handle_message(&mut self, message: RoomMessage) {
        match message {
            RoomMessage::Seat { name, respond } => {
                let result = self
                    .table
                    .seat_player(name, self.config.starting_stack, SeatBacking::Human)
                    .map_err(RoomError::from);
                if result.is_ok() {
                    self.broadcast(None, &[]);
                }
                let _ = respond.send(result);
            }

            RoomMessage::Leave { name, respond } => {
                self.subscribers.remove(&name);
                match self.table.leave(&name) {
                    Ok((_, events)) => {
                        let _ = respond.send(Ok(()));
                        self.after_engine_pass(None, events).await;
                    }
                    Err(e) => {
                        let _ = respond.send(Err(e.into()));
                    }
                }
            }

            RoomMessage::Start { name, respond } => {
                // The original auto-seats whoever asks to start.
                if self.table.seat_of(&name).is_none()
                    && let Err(e) = self.table.seat_player(
                        name.clone(),
                        self.config.starting_stack,
                        SeatBacking::Human,
                    )
                {
                    let _ = respond.send(Err(e.into()));
                    return;
                }
                self.keep_dealing = true;
                let result = self.try_deal().await;
                let _ = respond.send(result);
            }

            RoomMessage::Act {
                name,
                action,
                respond,
            } => {
                let Some(seat) = self.table.seat_of(&name) else {
                    let _ = respond.send(Err(
                        crate::game::errors::TableError::NotSeated(name).into()
                    ));
                    return;
                };
                match self.table.apply_action(seat, action, false) {
                    Ok((applied, events)) => {
                        let _ = respond.send(Ok(()));
                        self.after_engine_pass(Some(applied), events).await;
                    }
                    Err(rejected) => {
                        debug!("room {}: {name} rejected: {rejected}", self.code);
                        let _ = respond.send(Err(rejected.into()));
                    }
                }
            }

            RoomMessage::Snapshot { observer, respond } => {
                let _ = respond.send(self.build_snapshot(observer.as_ref()));
            }

            RoomMessage::Subscribe { name, sender } => {
                self.subscribers.insert(name, sender);
            }

            RoomMessage::Unsubscribe { name } => {
                self.subscribers.remove(&name);
            }

            RoomMessage::Disconnected { name } => {
                info!("room {}: {name} disconnected", self.code);
                self.subscribers.remove(&name);
                let events = self.table.disconnect(&name);
                self.after_engine_pass(None, events).await;
            }

            RoomMessage::Reconnected { name } => {
                self.table.reconnect(&name);
                self.broadcast(None, &[]);
            }

            RoomMessage::Extend { respond } => {
                if self.expires_at.is_some() {
                    let extension = Duration::from_secs(ROOM_EXTENSION_SECS);
                    self.expires_at = Some(Instant::now() + extension);
                    self.expires_at_wall =
                        Some(Utc::now() + chrono::Duration::seconds(extension.as_secs() as i64));
                }
                let _ = respond.send(self.expires_at_wall);
            }

            RoomMessage::Close { respond } => {
                self.closed = true;
                let _ = respond.send(());
            }

            RoomMessage::AiDecision {
                serial,
                seat,
                action,
            } => {
                let live_serial = self.table.round().map(|r| r.turn_serial());
                if live_serial != Some(serial) {
                    debug!(
                        "room {}: discarding stale ai decision for seat {seat}",
                        self.code
                    );
                    return;
                }
                match self.table.apply_action(seat, action, false) {
                    Ok((applied, events)) => {
                        self.after_engine_pass(Some(applied), events).await;
                    }
                    Err(rejected) => {
                        // A coerced response should always be legal;
                        // fall back to the timeout action so the turn
                        // cannot stall.
                        warn!(
                            "room {}: ai action for seat {seat} rejected ({rejected}), synthesizing",
                            self.code
                        );
                        self.synthesize_for(seat).await;
                    }
                }
            }
        }
    }

    /// The turn deadline fired. If it still refers to the live turn,
    /// synthesize the holder's action; otherwise it lost the race and
    /// is discarded.
    async fn on_turn_deadline(&mut self) {
        let Some(serial) = self.scheduler.fire() else {
            return;
        };
        let live = self
            .table
            .round()
            .and_then(|r| r.turn().map(|t| (r.turn_serial(), t)));
        let Some((live_serial, seat)) = live else {
            return;
        };
        if live_serial != serial {
            debug!("room {}: stale turn deadline discarded", self.code);
            self.arm_turn();
            return;
        }
        info!("room {}: seat {seat} timed out", self.code);
        self.synthesize_for(seat).await;
    }

    /// Apply the engine's synthetic fold-or-check for a seat.
    async fn synthesize_for(&mut self, seat: SeatIndex) {
        let Some(action) = self.table.round().map(|r| r.timeout_action(seat)) else {
            return;
        };
        match self.table.apply_action(seat, action, true) {
            Ok((applied, events)) => {
                self.after_engine_pass(Some(applied), events).await;
            }
            Err(rejected) => {
                warn!(
                    "room {}: could not synthesize action for seat {seat}: {rejected}",
                    self.code
                );
                // Keep the deadline machinery alive rather than stall
                // the turn.
                self.arm_turn();
            }
        }
    }

    /// Shared tail of every engine mutation: settle the books if the
    /// hand ended, re-arm the turn machinery, fan out the update, and
    /// keep dealing while the start request is still valid.
    async fn after_engine_pass(
        &mut self,
        applied: Option<AppliedAction>,
        events: Vec<RoundEvent>,
    ) {
        let settled = self.table.round().is_some_and(|r| r.is_settled());
        if settled {
            self.scheduler.cancel();
            self.settle_books().await;
        } else {
            self.arm_turn();
        }
        self.broadcast(applied, &events);
        if settled && self.keep_dealing {
            if let Err(e) = self.try_deal().await {
                debug!("room {}: not dealing on: {e}", self.code);
                self.keep_dealing = false;
            }
        }
    }

    /// Deal the next hand if the standing start request is valid.
    async fn try_deal(&mut self) -> Result<(), RoomError> {
        if self.table.round().is_some() {
            return Err(crate::game::errors::RoundError::HandInProgress.into());
        }
        self.backfill_ai_seats();
        let events = self.table.start_hand().map_err(RoomError::from)?;
        self.arm_turn();
        self.broadcast(None, &events);
        Ok(())
    }

    /// Seat AI-backed players until the configured fill target is
    /// reached, the way the original topped tables up with bots.
    fn backfill_ai_seats(&mut self) {
        while self.table.player_count() < self.config.ai_fill_to {
            let next = AI_SEAT_NAMES
                .iter()
                .map(|n| PlayerName::new(n))
                .find(|n| self.table.seat_of(n).is_none());
            let Some(name) = next else { break };
            if self
                .table
                .seat_player(name, self.config.starting_stack, SeatBacking::Ai)
                .is_err()
            {
                break;
            }
        }
    }

    /// Arm the scheduler for the live turn and, for an AI-backed seat,
    /// kick off the time-boxed background query.
    fn arm_turn(&mut self) {
        let live = self
            .table
            .round()
            .and_then(|r| r.turn().map(|t| (r.turn_serial(), t)));
        let Some((serial, seat)) = live else {
            self.scheduler.cancel();
            self.table.set_turn_deadline(None);
            return;
        };
        // Already armed for this exact turn: leave the running
        // deadline (and any in-flight AI query) alone.
        if self.scheduler.armed_serial() == Some(serial) {
            return;
        }
        let wall = self.scheduler.arm(serial);
        self.table.set_turn_deadline(Some(wall));
        if self
            .table
            .player(seat)
            .is_some_and(|p| p.backing == SeatBacking::Ai)
        {
            self.spawn_ai_query(seat, serial);
        }
    }

    /// Query the strategy collaborator off the actor task. The result
    /// comes back through the mailbox tagged with the turn serial; if
    /// the deadline wins the race, the answer is simply discarded.
    fn spawn_ai_query(&self, seat: SeatIndex, serial: u64) {
        let Some(round) = self.table.round() else {
            return;
        };
        let Some(player) = self.table.player(seat) else {
            return;
        };
        let request = AiRequest {
            phase: round.phase(),
            community: round.community().to_vec(),
            hole_cards: player.cards.clone(),
            legal: round.legal_actions(self.table.seats(), seat),
            pot_size: round.pot_total(),
            stack: player.chips,
            time_budget: self.config.turn_timeout,
        };
        let strategy = Arc::clone(&self.strategy);
        let tx = self.self_tx.clone();
        let code = self.code.clone();
        tokio::spawn(async move {
            let legal = request.legal;
            let budget = request.time_budget;
            let response = match tokio::time::timeout(budget, strategy.decide(request.clone())).await
            {
                Ok(Ok(response)) => response,
                Ok(Err(e)) => {
                    // Collaborator failure degrades to the built-in
                    // heuristic rather than stalling the turn.
                    warn!("room {code}: ai strategy failed ({e}), using heuristic");
                    match HeuristicStrategy::default().decide(request).await {
                        Ok(response) => response,
                        Err(_) => return,
                    }
                }
                Err(_) => {
                    debug!("room {code}: ai query blew its time budget");
                    return;
                }
            };
            let action = ai::coerce_response(&legal, &response);
            let _ = tx
                .send(RoomMessage::AiDecision {
                    serial,
                    seat,
                    action,
                })
                .await;
        });
    }

    /// Emit one settlement entry per dealt seat, exactly once per
    /// hand. Failures queue for reconciliation; the deterministic
    /// idempotency key makes the retry safe.
    async fn settle_books(&mut self) {
        self.retry_pending_ledger().await;
        let Some(outcome) = self.table.finish_hand() else {
            return;
        };
        if outcome.aborted {
            warn!(
                "room {}: hand {} aborted, contributions refunded",
                self.code, outcome.hand_no
            );
            return;
        }
        for delta in outcome.deltas {
            let entry = SettlementEntry {
                idempotency_key: format!(
                    "settle_{}_{}_{}",
                    self.instance, outcome.hand_no, delta.seat
                ),
                player: delta.name,
                delta: delta.delta,
                balance_before: delta.balance_before,
                balance_after: delta.balance_after,
                hand_no: outcome.hand_no,
                recorded_at: Utc::now(),
            };
            self.write_ledger(entry).await;
        }
        for (name, chips) in outcome.departed {
            info!(
                "room {}: {name} left after the hand with ${chips}",
                self.code
            );
        }
    }

    async fn write_ledger(&mut self, entry: SettlementEntry) {
        match self.ledger.record(&entry).await {
            Ok(()) => {}
            // Already recorded by an earlier attempt.
            Err(LedgerError::DuplicateEntry(_)) => {}
            Err(e) => {
                warn!(
                    "room {}: ledger write failed ({e}), queued for reconciliation",
                    self.code
                );
                self.pending_ledger.push_back(entry);
            }
        }
    }

    async fn retry_pending_ledger(&mut self) {
        for _ in 0..self.pending_ledger.len() {
            let Some(entry) = self.pending_ledger.pop_front() else {
                break;
            };
            match self.ledger.record(&entry).await {
                Ok(()) | Err(LedgerError::DuplicateEntry(_)) => {
                    info!(
                        "room {}: reconciled settlement {}",
                        self.code, entry.idempotency_key
                    );
                }
                Err(_) => self.pending_ledger.push_back(entry),
            }
        }
    }

    /// Fan an update out to every subscriber with their own view.
    /// Slow subscribers drop updates; dead ones are pruned.
    fn broadcast(&mut self, applied: Option<AppliedAction>, events: &[RoundEvent]) {
        let mut subscribers = std::mem::take(&mut self.subscribers);
        subscribers.retain(|name, sender| {
            let update = RoomUpdate {
                applied: applied.clone(),
                events: events.to_vec(),
                snapshot: self.build_snapshot(Some(name)),
            };
            match sender.try_send(update) {
                Ok(()) => true,
                Err(mpsc::error::TrySendError::Full(_)) => {
                    warn!("room {}: {name} is lagging, dropping update", self.code);
                    true
                }
                Err(mpsc::error::TrySendError::Closed(_)) => false,
            }
        });
        self.subscribers = subscribers;
    }

    /// The observer-specific state snapshot: hole cards are included
    /// only for the observer's own seat.
    fn build_snapshot(&self, observer: Option<&PlayerName>) -> RoomSnapshot {
        let round = self.table.round();
        let turn = round.and_then(|r| r.turn());
        let seats = self
            .table
            .occupied()
            .map(|player| {
                let own = observer == Some(&player.name);
                SeatView {
                    seat: player.seat_idx,
                    name: player.name.clone(),
                    chips: player.chips,
                    state: player.state,
                    backing: player.backing,
                    street_contribution: round
                        .map_or(0, |r| r.street_contribution(player.seat_idx)),
                    total_contribution: round
                        .map_or(0, |r| r.total_contribution(player.seat_idx)),
                    is_turn: turn == Some(player.seat_idx),
                    cards: own.then(|| player.cards.clone()),
                }
            })
            .collect();
        RoomSnapshot {
            room: self.code.clone(),
            hand_no: self.table.hand_no(),
            phase: round.map(|r| r.phase()),
            community: round.map_or_else(Vec::new, |r| r.community().to_vec()),
            pots: round.map_or_else(Vec::new, |r| r.pots()),
            pot_total: round.map_or(0, |r| r.pot_total()),
            seats,
            turn,
            deadline: round.and_then(|r| r.deadline),
            needs_reconciliation: !self.pending_ledger.is_empty(),
        }
    }
}
