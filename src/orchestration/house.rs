use std::sync::Arc;

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use rand::rngs::OsRng;
use rand::Rng;
use tokio::sync::broadcast::error::RecvError;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::chain::{GameEvent, GameId};
use crate::resolution::Move;
use crate::tokio_tools::{spawn_cancellable_task, spawn_named_task};

use super::{GameOrchestrator, ResolutionStatus};

const LOG_TARGET: &str = "rps::orchestration::house";

/// Picks the house move at submission time.
pub trait HouseStrategy: Send + Sync {
    fn choose_move(&self, game_id: GameId) -> Move;
}

/// Uniform over the three moves, from the OS generator.
#[derive(Clone, Copy, Debug, Default)]
pub struct RandomHouseStrategy;

impl HouseStrategy for RandomHouseStrategy {
    fn choose_move(&self, _game_id: GameId) -> Move {
        Move::ALL[OsRng.gen_range(0..Move::ALL.len())]
    }
}

#[derive(Clone, Copy, Debug)]
pub struct FixedHouseStrategy(pub Move);

impl HouseStrategy for FixedHouseStrategy {
    fn choose_move(&self, _game_id: GameId) -> Move {
        self.0
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum JoinState {
    InFlight,
    Joined,
}

/// Joins every newly created game as the house.
pub struct HouseService {
    orchestrator: Arc<GameOrchestrator>,
    joins: Arc<DashMap<GameId, JoinState>>,
}

impl HouseService {
    pub fn new(orchestrator: Arc<GameOrchestrator>) -> Self {
        Self {
            orchestrator,
            joins: Arc::new(DashMap::new()),
        }
    }

    pub fn join_state(&self, game_id: GameId) -> Option<JoinState> {
        self.joins.get(&game_id).map(|state| *state)
    }

    /// Listen for `GameCreated` until `cancel` fires and forget games once
    /// `GameResolved` is seen. The subscription is taken before this
    /// returns, so no event emitted afterwards is missed.
    pub fn spawn(&self, cancel: CancellationToken) -> JoinHandle<Option<()>> {
        let mut events = self.orchestrator.subscribe();
        let orchestrator = Arc::clone(&self.orchestrator);
        let joins = Arc::clone(&self.joins);

        spawn_cancellable_task("house-service", cancel, async move {
            loop {
                match events.recv().await {
                    Ok(GameEvent::GameCreated { game_id, player, bet }) => {
                        tracing::info!(target: LOG_TARGET, game_id, %player, bet, "game created");
                        Self::join(&orchestrator, &joins, game_id);
                    }
                    Ok(GameEvent::GameResolved { game_id, .. }) => {
                        if joins.remove(&game_id).is_some() {
                            tracing::debug!(target: LOG_TARGET, game_id, "game resolved; join record dropped");
                        }
                    }
                    Ok(_) => {}
                    Err(RecvError::Lagged(skipped)) => {
                        tracing::warn!(target: LOG_TARGET, skipped, "event stream lagged; some games may need a manual join");
                    }
                    Err(RecvError::Closed) => {
                        tracing::info!(target: LOG_TARGET, "event stream closed");
                        break;
                    }
                }
            }
        })
    }

    fn join(orchestrator: &Arc<GameOrchestrator>, joins: &Arc<DashMap<GameId, JoinState>>, game_id: GameId) {
        match joins.entry(game_id) {
            Entry::Occupied(_) => {
                tracing::debug!(target: LOG_TARGET, game_id, "join already handled");
                return;
            }
            Entry::Vacant(slot) => {
                slot.insert(JoinState::InFlight);
            }
        }

        let orchestrator = Arc::clone(orchestrator);
        let joins = Arc::clone(joins);
        spawn_named_task(format!("house-join-{game_id}"), async move {
            let response = orchestrator.join_game(game_id).await;
            match response.status {
                ResolutionStatus::Failed => {
                    tracing::warn!(
                        target: LOG_TARGET,
                        game_id,
                        error = response.error.as_deref().unwrap_or_default(),
                        "auto-join failed"
                    );
                    joins.remove(&game_id);
                }
                // Receipt still outstanding; stays in flight
                ResolutionStatus::Pending => {}
                // A resolution seen meanwhile has already dropped the record
                _ => {
                    if let Some(mut state) = joins.get_mut(&game_id) {
                        *state = JoinState::Joined;
                    }
                }
            }
        });
    }
}
