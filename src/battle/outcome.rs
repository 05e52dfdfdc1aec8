//! Win and loss detection.

use crate::battle::state::{BattleEvent, BattleState, EventBus, Phase, Side, Winner};

/// A side with nothing in play cannot continue. Hand cards do not count:
/// after preparation they can only reach play through the bench.
///
/// Never true before both sides have set up, or after the battle ended.
pub fn has_lost_due_to_no_pokemon(state: &BattleState, side: Side) -> bool {
    if matches!(state.phase, Phase::Preparation | Phase::Ended) {
        return false;
    }
    let zones = state.zones(side);
    zones.active.is_none() && !zones.has_bench_occupant()
}

pub fn is_battle_ended(state: &BattleState) -> bool {
    state.phase == Phase::Ended
        || Side::BOTH
            .into_iter()
            .any(|side| has_lost_due_to_no_pokemon(state, side))
}

/// The recorded winner, or the winner implied by the loss condition.
pub fn get_battle_winner(state: &BattleState) -> Option<Winner> {
    if state.winner.is_some() {
        return state.winner;
    }
    let player_lost = has_lost_due_to_no_pokemon(state, Side::Player);
    let ai_lost = has_lost_due_to_no_pokemon(state, Side::Ai);
    match (player_lost, ai_lost) {
        (true, true) => Some(Winner::Draw),
        (true, false) => Some(Winner::Ai),
        (false, true) => Some(Winner::Player),
        (false, false) => None,
    }
}

pub fn needs_bench_promotion(state: &BattleState, side: Side) -> bool {
    state
        .flags
        .needs_bench_promotion
        .is_some_and(|request| request.side == side)
}

/// Stamps `ENDED` and the winner onto a state that has ended but not been
/// marked as such. Returns whether the state changed.
pub fn finalize_if_ended(state: &mut BattleState, bus: &mut EventBus) -> bool {
    if state.phase == Phase::Ended || !is_battle_ended(state) {
        return false;
    }
    let winner = get_battle_winner(state).unwrap_or(Winner::Draw);
    tracing::info!(battle_id = %state.battle_id, winner = ?winner, "battle finalized by loss check");
    state.phase = Phase::Ended;
    state.winner = Some(winner);
    state.legal_moves.clear();
    bus.push(BattleEvent::BattleEnded { winner });
    true
}
