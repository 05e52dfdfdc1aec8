//! Request orchestration: load, rehydrate, apply, drive the AI, persist.

use crate::battle::action::BattleAction;
use crate::battle::ai::{ai_should_act, run_ai_turn, TurnPlay};
use crate::battle::context::BattleContext;
use crate::battle::engine::apply_action_with_events;
use crate::battle::outcome::finalize_if_ended;
use crate::battle::projection::{hydrate_for_client, ClientBattleView};
use crate::battle::setup::{complete_ai_preparation, initialize_battle};
use crate::battle::state::{BattleState, EventBus, Phase, Side, Winner};
use crate::catalog::{CardCatalog, InMemoryCatalog};
use crate::config::PveConfig;
use crate::errors::{IntegrityError, PveError, PveResult, RepositoryError, RuleViolation};
use crate::progress::{BattleResult, InMemoryProgressTracker, ProgressUpdater};
use crate::repository::{
    unix_now, ActionLogEntry, BattleRecord, BattleRepository, InMemoryBattleRepository,
};
use crate::roster::OpponentRoster;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, error, info, warn};

/// What became of one inbound action.
#[derive(Debug, Clone)]
pub enum ActionOutcome {
    /// The action (and any AI turns it triggered) went through and was persisted.
    Applied {
        view: ClientBattleView,
        battle_ended: bool,
        winner: Option<Winner>,
    },
    /// The action was illegal. Nothing was persisted.
    Rejected(RuleViolation),
}

impl ActionOutcome {
    pub fn is_applied(&self) -> bool {
        matches!(self, ActionOutcome::Applied { .. })
    }
}

pub struct BattleService {
    repository: Arc<dyn BattleRepository>,
    catalog: Arc<dyn CardCatalog>,
    progress: Arc<dyn ProgressUpdater>,
    roster: OpponentRoster,
    config: PveConfig,
    rng: Mutex<StdRng>,
    locks: Mutex<HashMap<String, Arc<Mutex<()>>>>,
}

impl BattleService {
    pub fn new(
        repository: Arc<dyn BattleRepository>,
        catalog: Arc<dyn CardCatalog>,
        progress: Arc<dyn ProgressUpdater>,
        roster: OpponentRoster,
        config: PveConfig,
    ) -> Self {
        Self {
            repository,
            catalog,
            progress,
            roster,
            config,
            rng: Mutex::new(StdRng::from_os_rng()),
            locks: Mutex::new(HashMap::new()),
        }
    }

    /// A single-process service over the bundled cards and opponents, with
    /// in-memory storage and progress tracking.
    pub fn in_memory(config: PveConfig) -> PveResult<Self> {
        let roster = OpponentRoster::bundled()?;
        Ok(Self::new(
            Arc::new(InMemoryBattleRepository::new()),
            Arc::new(InMemoryCatalog::bundled()?),
            Arc::new(InMemoryProgressTracker::new(roster.clone())),
            roster,
            config,
        ))
    }

    /// Replaces the shuffling and id source with a seeded one.
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.rng = Mutex::new(StdRng::seed_from_u64(seed));
        self
    }

    pub fn config(&self) -> &PveConfig {
        &self.config
    }

    pub fn roster(&self) -> &OpponentRoster {
        &self.roster
    }

    /// Starts a battle between `player_deck` and the roster opponent's deck.
    ///
    /// Opponents above the user's unlocked difficulty are refused. The AI
    /// makes its preparation placement before the battle is stored.
    pub async fn create_battle(
        &self,
        user_id: &str,
        opponent_id: &str,
        player_deck: &[String],
    ) -> PveResult<ClientBattleView> {
        let opponent = self
            .roster
            .get(opponent_id)
            .cloned()
            .ok_or_else(|| PveError::UnknownOpponent(opponent_id.to_string()))?;
        if !self
            .progress
            .has_access_to_difficulty(user_id, opponent.difficulty)
            .await?
        {
            debug!(user_id, opponent_id, difficulty = %opponent.difficulty, "difficulty locked");
            return Err(PveError::DifficultyLocked {
                user_id: user_id.to_string(),
                difficulty: opponent.difficulty,
            });
        }

        let ids = player_deck.iter().chain(opponent.deck.iter()).cloned();
        let context = BattleContext::load(ids, self.catalog.as_ref(), self.config.rules.clone())
            .await?
            .with_opponent(opponent.clone());

        let state = {
            let mut rng = self.rng.lock().await;
            let battle_id = format!("battle_{:016x}", rng.random::<u64>());
            initialize_battle(battle_id, player_deck, &opponent.deck, &context, &mut *rng)?
        };
        let state = complete_ai_preparation(state, &context);

        let record = BattleRecord::new(
            user_id.to_string(),
            opponent.id.clone(),
            opponent.difficulty,
            &state,
        )?;
        self.repository.insert(record).await?;

        info!(
            battle_id = %state.battle_id,
            user_id,
            opponent_id = %opponent.id,
            "battle created"
        );
        Ok(hydrate_for_client(&state, &context, Side::Player))
    }

    /// Parses a raw JSON action and submits it. Malformed payloads are rejected
    /// without touching the stored battle.
    pub async fn submit_action_json(
        &self,
        battle_id: &str,
        payload: serde_json::Value,
    ) -> PveResult<ActionOutcome> {
        match BattleAction::from_value(payload) {
            Ok(action) => self.submit_action(battle_id, action).await,
            Err(violation) => {
                debug!(battle_id, reason = %violation, "malformed action rejected");
                Ok(ActionOutcome::Rejected(violation))
            }
        }
    }

    /// Handles one player action end to end.
    ///
    /// Rule violations come back as [`ActionOutcome::Rejected`]; `Err` is reserved
    /// for storage, catalog and integrity failures, which abort the action.
    pub async fn submit_action(
        &self,
        battle_id: &str,
        action: BattleAction,
    ) -> PveResult<ActionOutcome> {
        let lock = self.lock_for(battle_id).await;
        let outcome = {
            let _guard = lock.lock().await;
            self.submit_locked(battle_id, action).await
        };
        self.release_lock(battle_id, lock).await;
        outcome
    }

    async fn submit_locked(
        &self,
        battle_id: &str,
        action: BattleAction,
    ) -> PveResult<ActionOutcome> {
        let mut record = self.load_record(battle_id).await?;
        let state = decode_state(&record)?;
        let context = self.rehydrate(&state, &record.opponent_id).await?;
        let loaded_version = record.version;

        let mut bus = EventBus::new();
        let mut current = state;

        if finalize_if_ended(&mut current, &mut bus) {
            self.persist(&mut record, &current, loaded_version, Vec::new())
                .await?;
            self.report_progress(&record, &current, &context).await;
            return Ok(applied(&current, &context));
        }

        if action.side() != Side::Player {
            return Ok(ActionOutcome::Rejected(RuleViolation::NotYourTurn));
        }

        current = match apply_action_with_events(&current, &action, &context, &mut bus) {
            Ok(next) => next,
            Err(violation) => return Ok(ActionOutcome::Rejected(violation)),
        };
        let mut log = vec![ActionLogEntry {
            turn: current.turn,
            actor: Side::Player,
            action,
        }];
        finalize_if_ended(&mut current, &mut bus);

        if current.phase != Phase::Ended {
            let driven = drive_ai(
                &current,
                &context,
                self.config.service.max_ai_turns_per_action,
            );
            log.extend(driven.actions.into_iter().map(|action| ActionLogEntry {
                turn: driven.state.turn,
                actor: action.side(),
                action,
            }));
            bus.extend(driven.events);
            current = driven.state;
        }

        self.persist(&mut record, &current, loaded_version, log)
            .await?;
        if current.phase == Phase::Ended {
            self.report_progress(&record, &current, &context).await;
        }

        debug!(battle_id, events = bus.len(), phase = ?current.phase, "action handled");
        Ok(applied(&current, &context))
    }

    /// The player's view of a stored battle.
    pub async fn get_battle(&self, battle_id: &str) -> PveResult<ClientBattleView> {
        let record = self.load_record(battle_id).await?;
        let state = decode_state(&record)?;
        let context = self.rehydrate(&state, &record.opponent_id).await?;
        Ok(hydrate_for_client(&state, &context, Side::Player))
    }

    /// The raw stored state, without projection.
    pub async fn load_state(&self, battle_id: &str) -> PveResult<BattleState> {
        let record = self.load_record(battle_id).await?;
        decode_state(&record)
    }

    async fn lock_for(&self, battle_id: &str) -> Arc<Mutex<()>> {
        self.locks
            .lock()
            .await
            .entry(battle_id.to_string())
            .or_default()
            .clone()
    }

    /// Drops the per-battle lock once no other request holds or awaits it, so
    /// the table only ever contains battles with requests in flight.
    async fn release_lock(&self, battle_id: &str, lock: Arc<Mutex<()>>) {
        let mut locks = self.locks.lock().await;
        // One reference lives in the table, one is `lock`.
        if Arc::strong_count(&lock) == 2 {
            locks.remove(battle_id);
        }
    }

    async fn load_record(&self, battle_id: &str) -> PveResult<BattleRecord> {
        self.repository
            .load(battle_id)
            .await?
            .ok_or_else(|| RepositoryError::NotFound(battle_id.to_string()).into())
    }

    async fn rehydrate(&self, state: &BattleState, opponent_id: &str) -> PveResult<BattleContext> {
        let context =
            BattleContext::rehydrate(state, self.catalog.as_ref(), self.config.rules.clone())
                .await
                .inspect_err(|e| {
                    error!(battle_id = %state.battle_id, error = %e, "battle could not be rehydrated")
                })?;
        Ok(match self.roster.get(opponent_id) {
            Some(opponent) => context.with_opponent(opponent.clone()),
            None => context,
        })
    }

    async fn persist(
        &self,
        record: &mut BattleRecord,
        state: &BattleState,
        expected_version: u64,
        log: Vec<ActionLogEntry>,
    ) -> PveResult<()> {
        record.set_state(state)?;
        record.version = self
            .repository
            .save(record, expected_version)
            .await
            .inspect_err(|e| warn!(battle_id = %record.id, error = %e, "battle save failed"))?;
        // The state is committed at this point; the log is an audit trail only.
        if !log.is_empty() {
            if let Err(e) = self.repository.append_actions(&record.id, log).await {
                warn!(battle_id = %record.id, error = %e, "action log append failed");
            }
        }
        Ok(())
    }

    /// Reports a decided battle to the progress collaborator. Failures are
    /// logged and otherwise ignored.
    async fn report_progress(
        &self,
        record: &BattleRecord,
        state: &BattleState,
        context: &BattleContext,
    ) {
        let winner = match state.winner {
            Some(winner @ (Winner::Player | Winner::Ai)) => winner,
            _ => return,
        };
        let result = BattleResult {
            battle_id: record.id.clone(),
            user_id: record.user_id.clone(),
            opponent_id: record.opponent_id.clone(),
            difficulty: record.difficulty,
            winner,
            duration_secs: unix_now().saturating_sub(record.created_at),
            turns_played: state.turn,
            player_final_hp: hp_ratio(state, context, Side::Player),
            ai_final_hp: hp_ratio(state, context, Side::Ai),
        };
        match self.progress.update_progress_on_battle_end(&result).await {
            Ok(update) => info!(
                battle_id = %record.id,
                coins = update.coins_earned,
                xp = update.xp_earned,
                "progress recorded"
            ),
            Err(e) => warn!(battle_id = %record.id, error = %e, "failed to update progress"),
        }
    }
}

/// Runs AI turns while the AI holds the move, at most `max_turns` of them.
///
/// Stops early once the battle ends or a turn makes no progress.
pub fn drive_ai(state: &BattleState, context: &BattleContext, max_turns: u32) -> TurnPlay {
    let mut driven = TurnPlay {
        state: state.clone(),
        actions: Vec::new(),
        events: EventBus::new(),
    };

    for _ in 0..max_turns {
        if !ai_should_act(&driven.state) {
            break;
        }
        let turn = run_ai_turn(&driven.state, context);
        let stalled = turn.actions.is_empty();
        driven.state = turn.state;
        driven.actions.extend(turn.actions);
        driven.events.extend(turn.events);
        finalize_if_ended(&mut driven.state, &mut driven.events);
        if stalled {
            break;
        }
    }

    if ai_should_act(&driven.state) {
        warn!(
            battle_id = %driven.state.battle_id,
            max_turns,
            "AI still holds the move after its turn budget"
        );
    }
    driven
}

fn decode_state(record: &BattleRecord) -> PveResult<BattleState> {
    serde_json::from_str(&record.state).map_err(|e| {
        error!(battle_id = %record.id, error = %e, "stored battle state is corrupt");
        IntegrityError::StateDecode(e.to_string()).into()
    })
}

fn applied(state: &BattleState, context: &BattleContext) -> ActionOutcome {
    ActionOutcome::Applied {
        view: hydrate_for_client(state, context, Side::Player),
        battle_ended: state.phase == Phase::Ended,
        winner: state.winner,
    }
}

/// Remaining over maximum HP across a side's cards in play.
fn hp_ratio(state: &BattleState, context: &BattleContext, side: Side) -> f64 {
    let (current, max) = state
        .zones(side)
        .in_play()
        .filter_map(|card| {
            let max_hp = context.max_hp(&card.id)?;
            Some((context.current_hp(state, &card.id, &card.iid), max_hp))
        })
        .fold((0u32, 0u32), |(c, m), (hp, max_hp)| (c + hp, m + max_hp));
    if max == 0 {
        0.0
    } else {
        f64::from(current) / f64::from(max)
    }
}
