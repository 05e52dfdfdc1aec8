//! A module for defining AI behaviors for battle opponents.

use crate::battle::action::BattleAction;
use crate::battle::calculators::{calculate_damage, can_pay};
use crate::battle::context::BattleContext;
use crate::battle::engine::apply_action_with_events;
use crate::battle::outcome::needs_bench_promotion;
use crate::battle::state::{BattleState, EventBus, Phase, Side};

/// A trait for any system that can decide on a battle action.
/// This provides a common interface for different opponent strategies.
pub trait Behavior {
    /// Inspects the battle state and decides the next action for `side`.
    ///
    /// `None` means the behavior has nothing left to do this turn.
    fn decide_action(
        &self,
        side: Side,
        state: &BattleState,
        context: &BattleContext,
    ) -> Option<BattleAction>;
}

/// Fixed-priority policy: promote, place, attach, attack, bench, end turn.
///
/// Deterministic: identical inputs always produce the same decision.
#[derive(Debug, Clone, Copy, Default)]
pub struct ScriptedAi;

impl ScriptedAi {
    pub fn new() -> Self {
        Self
    }

    fn choose_attack(
        &self,
        side: Side,
        state: &BattleState,
        context: &BattleContext,
    ) -> Option<BattleAction> {
        if !state.can_attack_this_turn {
            return None;
        }
        let attacker = state.zones(side).active.as_ref()?;
        if state.entered_active_this_turn(&attacker.iid) {
            return None;
        }
        let target = state.zones(side.opponent()).active.as_ref()?;
        let attacker_template = context.card(&attacker.id)?;
        let target_template = context.card(&target.id)?;
        let pool = state.energy_attached(&attacker.iid);

        attacker_template
            .attacks
            .iter()
            .position(|attack| {
                can_pay(pool, attacker_template.element, attack.cost.len())
                    && calculate_damage(attack.damage, attacker_template.element, target_template)
                        > 0
            })
            .map(|attack_index| BattleAction::Attack {
                side,
                attacker_iid: attacker.iid.clone(),
                target_iid: target.iid.clone(),
                attack_index,
            })
    }
}

impl Behavior for ScriptedAi {
    fn decide_action(
        &self,
        side: Side,
        state: &BattleState,
        context: &BattleContext,
    ) -> Option<BattleAction> {
        let zones = state.zones(side);

        if needs_bench_promotion(state, side) {
            let (bench_position, card) = zones.bench_occupants().next()?;
            return Some(BattleAction::PromoteFromBench {
                side,
                card_iid: card.iid.clone(),
                bench_position,
            });
        }

        let Some(active) = zones.active.as_ref() else {
            if state.phase != Phase::Preparation {
                return None;
            }
            let card = zones.hand.first()?;
            return Some(BattleAction::PlaceActive {
                side,
                card_iid: card.iid.clone(),
            });
        };

        if state.phase == Phase::Preparation {
            return None;
        }

        if let Some(template) = context.card(&active.id) {
            let pool = state.energy_attached(&active.iid);
            if !state.flags.has_attached_energy_this_turn
                && pool.len() < context.rules.max_energy_per_card
            {
                return Some(BattleAction::AttachEnergy {
                    side,
                    card_iid: active.iid.clone(),
                    energy_type: template.element,
                });
            }
        }

        if let Some(attack) = self.choose_attack(side, state, context) {
            return Some(attack);
        }

        if let (Some(position), Some(card)) = (zones.first_empty_bench_slot(), zones.hand.first()) {
            return Some(BattleAction::PlaceBench {
                side,
                card_iid: card.iid.clone(),
                position,
            });
        }

        Some(BattleAction::EndTurn { side })
    }
}

/// Whether `side` currently holds the move: its own turn, or preparation
/// with its active slot still empty.
pub fn side_should_act(state: &BattleState, side: Side) -> bool {
    match state.phase {
        Phase::Ended => false,
        Phase::Preparation => state.zones(side).active.is_none(),
        Phase::PlayerTurn | Phase::AiTurn => state.phase.acting_side() == Some(side),
    }
}

pub fn ai_should_act(state: &BattleState) -> bool {
    side_should_act(state, Side::Ai)
}

/// Everything one scripted turn produced.
#[derive(Debug, Clone)]
pub struct TurnPlay {
    pub state: BattleState,
    /// Applied actions, in order. Rejected decisions are not included.
    pub actions: Vec<BattleAction>,
    pub events: EventBus,
}

/// Plays `side` with `behavior` until it no longer holds the move.
///
/// Each decision goes through the same validation path as player input. A
/// rejected decision falls back to ending the turn, and the number of
/// decisions is bounded by `rules.max_ai_steps`.
pub fn play_turn(
    behavior: &dyn Behavior,
    side: Side,
    state: &BattleState,
    context: &BattleContext,
) -> TurnPlay {
    let mut current = state.clone();
    let mut actions = Vec::new();
    let mut events = EventBus::new();

    for _ in 0..context.rules.max_ai_steps {
        if !side_should_act(&current, side) {
            break;
        }

        let decision = behavior
            .decide_action(side, &current, context)
            .unwrap_or(BattleAction::EndTurn { side });

        match apply_action_with_events(&current, &decision, context, &mut events) {
            Ok(next) => {
                actions.push(decision);
                current = next;
            }
            Err(violation) => {
                tracing::warn!(
                    battle_id = %current.battle_id,
                    side = %side,
                    action = ?decision,
                    reason = %violation,
                    "scripted decision rejected, ending turn"
                );
                let fallback = BattleAction::EndTurn { side };
                match apply_action_with_events(&current, &fallback, context, &mut events) {
                    Ok(next) => {
                        actions.push(fallback);
                        current = next;
                    }
                    Err(violation) => {
                        tracing::warn!(
                            battle_id = %current.battle_id,
                            side = %side,
                            reason = %violation,
                            "scripted side cannot end its turn"
                        );
                        break;
                    }
                }
            }
        }
    }

    if side_should_act(&current, side) {
        tracing::warn!(
            battle_id = %current.battle_id,
            side = %side,
            steps = context.rules.max_ai_steps,
            "scripted turn hit its step limit"
        );
    }

    TurnPlay {
        state: current,
        actions,
        events,
    }
}

/// Runs the AI opponent's turn with [`ScriptedAi`], keeping the applied actions.
pub fn run_ai_turn(state: &BattleState, context: &BattleContext) -> TurnPlay {
    play_turn(&ScriptedAi::new(), Side::Ai, state, context)
}

/// Runs the AI opponent's turn and returns only the resulting state.
pub fn ai_turn(state: &BattleState, context: &BattleContext) -> BattleState {
    run_ai_turn(state, context).state
}
