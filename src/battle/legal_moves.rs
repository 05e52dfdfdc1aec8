use crate::battle::action::BattleAction;
use crate::battle::context::BattleContext;
use crate::battle::engine::validate_action;
use crate::battle::state::{BattleState, Phase, Side};

/// Every action either side may currently take, in a stable order.
///
/// Candidate shapes are generated from the zones and filtered through
/// [`validate_action`], so this list can never disagree with the engine.
/// `CONCEDE` is always available before the battle ends and is not listed.
pub fn legal_moves(state: &BattleState, context: &BattleContext) -> Vec<BattleAction> {
    if state.phase == Phase::Ended {
        return Vec::new();
    }
    Side::BOTH
        .into_iter()
        .flat_map(|side| candidate_actions(state, context, side))
        .filter(|action| validate_action(state, action, context).is_ok())
        .collect()
}

/// Legal moves restricted to one side.
pub fn legal_moves_for(state: &BattleState, side: Side) -> Vec<BattleAction> {
    state
        .legal_moves
        .iter()
        .filter(|action| action.side() == side)
        .cloned()
        .collect()
}

fn candidate_actions(state: &BattleState, context: &BattleContext, side: Side) -> Vec<BattleAction> {
    let zones = state.zones(side);
    let mut actions = Vec::new();

    for card in &zones.hand {
        actions.push(BattleAction::PlaceActive {
            side,
            card_iid: card.iid.clone(),
        });
    }

    for card in &zones.hand {
        for (position, slot) in zones.bench.iter().enumerate() {
            if slot.is_none() {
                actions.push(BattleAction::PlaceBench {
                    side,
                    card_iid: card.iid.clone(),
                    position,
                });
            }
        }
    }

    for (position, card) in zones.bench_occupants() {
        actions.push(BattleAction::PromoteFromBench {
            side,
            card_iid: card.iid.clone(),
            bench_position: position,
        });
    }

    for card in zones.in_play() {
        if let Some(template) = context.card(&card.id) {
            actions.push(BattleAction::AttachEnergy {
                side,
                card_iid: card.iid.clone(),
                energy_type: template.element,
            });
        }
    }

    if let (Some(attacker), Some(target)) = (&zones.active, &state.zones(side.opponent()).active) {
        let attack_count = context.card(&attacker.id).map_or(0, |t| t.attacks.len());
        for attack_index in 0..attack_count {
            actions.push(BattleAction::Attack {
                side,
                attacker_iid: attacker.iid.clone(),
                target_iid: target.iid.clone(),
                attack_index,
            });
        }
    }

    for (position, _) in zones.bench_occupants() {
        actions.push(BattleAction::Retreat {
            side,
            bench_position: position,
        });
    }

    actions.push(BattleAction::EndTurn { side });
    actions
}
