use crate::battle::action::BattleAction;
use crate::battle::calculators::{calculate_damage, can_pay, retreat_cost};
use crate::battle::commands::{execute_command_batch, BattleCommand};
use crate::battle::context::BattleContext;
use crate::battle::legal_moves::legal_moves;
use crate::battle::state::{
    BattleEvent, BattleState, CardRef, EventBus, Phase, PromotionReason, PromotionRequest, Side,
    Winner, Zone,
};
use crate::errors::{RuleResult, RuleViolation};

// --- ENTRY POINTS ---

/// Applies `action`, returning the next state or `None` when it is illegal.
///
/// The input state is never mutated.
pub fn apply_action(
    state: &BattleState,
    action: &BattleAction,
    context: &BattleContext,
) -> Option<BattleState> {
    try_apply_action(state, action, context).ok()
}

/// Like [`apply_action`], reporting why an action was rejected.
pub fn try_apply_action(
    state: &BattleState,
    action: &BattleAction,
    context: &BattleContext,
) -> RuleResult<BattleState> {
    let mut bus = EventBus::new();
    apply_action_with_events(state, action, context, &mut bus)
}

/// Applies `action` and records the resulting events into `bus`.
///
/// Events are only appended when the action succeeds.
pub fn apply_action_with_events(
    state: &BattleState,
    action: &BattleAction,
    context: &BattleContext,
    bus: &mut EventBus,
) -> RuleResult<BattleState> {
    if let Err(violation) = validate_action(state, action, context) {
        tracing::debug!(
            battle_id = %state.battle_id,
            side = %action.side(),
            action = action.kind(),
            reason = %violation,
            "action rejected"
        );
        return Err(violation);
    }

    let commands = plan_commands(state, action, context)?;
    let mut next = state.clone();
    let mut local_bus = EventBus::new();
    if let Err(error) = execute_command_batch(commands, &mut next, &mut local_bus) {
        tracing::error!(
            battle_id = %state.battle_id,
            action = ?action,
            error = %error,
            "validated action failed to execute"
        );
        return Err(RuleViolation::ExecutionFailed(error.to_string()));
    }

    next.legal_moves = legal_moves(&next, context);
    local_bus.trace_formatted(context);
    bus.extend(local_bus);
    Ok(next)
}

// --- VALIDATION ---

/// Checks whether `action` is applicable to `state`.
pub fn validate_action(
    state: &BattleState,
    action: &BattleAction,
    context: &BattleContext,
) -> RuleResult<()> {
    if state.phase == Phase::Ended {
        return Err(RuleViolation::BattleEnded);
    }
    if matches!(action, BattleAction::Concede { .. }) {
        return Ok(());
    }

    let side = action.side();
    check_actor(state, action, side)?;

    if state
        .flags
        .needs_bench_promotion
        .is_some_and(|request| request.side == side)
        && !matches!(action, BattleAction::PromoteFromBench { .. })
    {
        return Err(RuleViolation::PromotionPending);
    }

    let zones = state.zones(side);
    match action {
        BattleAction::PlaceActive { card_iid, .. } => {
            // After setup an empty active slot is only refilled by promotion.
            if state.phase != Phase::Preparation {
                return Err(RuleViolation::ActionNotAllowedInPhase);
            }
            if zones.active.is_some() {
                return Err(RuleViolation::ActiveOccupied);
            }
            let card = zones
                .hand_card(card_iid)
                .ok_or_else(|| RuleViolation::CardNotInHand(card_iid.clone()))?;
            context.require_card(&card.id)?;
        }
        BattleAction::PlaceBench {
            card_iid, position, ..
        } => {
            match zones.bench.get(*position) {
                None => return Err(RuleViolation::InvalidBenchPosition(*position)),
                Some(Some(_)) => return Err(RuleViolation::BenchSlotOccupied(*position)),
                Some(None) => {}
            }
            let card = zones
                .hand_card(card_iid)
                .ok_or_else(|| RuleViolation::CardNotInHand(card_iid.clone()))?;
            context.require_card(&card.id)?;
        }
        BattleAction::PromoteFromBench {
            card_iid,
            bench_position,
            ..
        } => {
            if !state
                .flags
                .needs_bench_promotion
                .is_some_and(|request| request.side == side)
            {
                return Err(RuleViolation::NoPromotionPending);
            }
            if zones.active.is_some() {
                return Err(RuleViolation::ActiveOccupied);
            }
            let occupant = bench_occupant(zones.bench.as_slice(), *bench_position)?;
            if occupant.iid != *card_iid {
                return Err(RuleViolation::BenchCardMismatch {
                    position: *bench_position,
                    card_iid: card_iid.clone(),
                });
            }
        }
        BattleAction::AttachEnergy { card_iid, .. } => {
            if state.flags.has_attached_energy_this_turn {
                return Err(RuleViolation::EnergyAlreadyAttached);
            }
            if !zones.in_play().any(|card| card.iid == *card_iid) {
                return Err(RuleViolation::CardNotInPlay(card_iid.clone()));
            }
            if state.energy_attached(card_iid).len() >= context.rules.max_energy_per_card {
                return Err(RuleViolation::EnergyLimitReached(card_iid.clone()));
            }
        }
        BattleAction::Attack {
            attacker_iid,
            target_iid,
            attack_index,
            ..
        } => {
            if !state.can_attack_this_turn {
                return Err(RuleViolation::AttackAlreadyUsed);
            }
            let attacker = zones.active.as_ref().ok_or(RuleViolation::NoActive)?;
            if attacker.iid != *attacker_iid {
                return Err(RuleViolation::AttackerNotActive(attacker_iid.clone()));
            }
            if state.entered_active_this_turn(attacker_iid) {
                return Err(RuleViolation::JustEnteredActive(attacker_iid.clone()));
            }
            let template = context.require_card(&attacker.id)?;
            let attack = template
                .attack(*attack_index)
                .ok_or(RuleViolation::InvalidAttackIndex(*attack_index))?;
            let pool = state.energy_attached(attacker_iid);
            if !can_pay(pool, template.element, attack.cost.len()) {
                return Err(RuleViolation::InsufficientEnergy {
                    required: attack.cost.len(),
                    available: state.matching_energy(attacker_iid, template.element),
                });
            }
            let target = state
                .zones(side.opponent())
                .active
                .as_ref()
                .filter(|target| target.iid == *target_iid)
                .ok_or_else(|| RuleViolation::TargetNotOpposingActive(target_iid.clone()))?;
            context.require_card(&target.id)?;
        }
        BattleAction::Retreat { bench_position, .. } => {
            if state.flags.has_retreated_this_turn {
                return Err(RuleViolation::AlreadyRetreated);
            }
            let active = zones.active.as_ref().ok_or(RuleViolation::NoActive)?;
            bench_occupant(zones.bench.as_slice(), *bench_position)?;
            let template = context.require_card(&active.id)?;
            let cost = retreat_cost(template.hp);
            let available = state.matching_energy(&active.iid, template.element);
            if available < cost {
                return Err(RuleViolation::InsufficientEnergy {
                    required: cost,
                    available,
                });
            }
        }
        BattleAction::EndTurn { .. } => {
            if zones.active.is_none() {
                return Err(RuleViolation::NoActive);
            }
        }
        BattleAction::Concede { .. } => {}
    }

    Ok(())
}

/// Enforces who may act in the current phase.
fn check_actor(state: &BattleState, action: &BattleAction, side: Side) -> RuleResult<()> {
    match state.phase {
        Phase::Ended => Err(RuleViolation::BattleEnded),
        Phase::Preparation => match action {
            BattleAction::PlaceActive { .. } | BattleAction::PlaceBench { .. } => Ok(()),
            _ => Err(RuleViolation::ActionNotAllowedInPhase),
        },
        Phase::PlayerTurn | Phase::AiTurn => {
            let forced_catch_up = matches!(action, BattleAction::PromoteFromBench { .. })
                && state
                    .flags
                    .needs_bench_promotion
                    .is_some_and(|request| request.side == side);
            if forced_catch_up || state.phase.acting_side() == Some(side) {
                Ok(())
            } else {
                Err(RuleViolation::NotYourTurn)
            }
        }
    }
}

fn bench_occupant(bench: &[Option<CardRef>], position: usize) -> RuleResult<&CardRef> {
    match bench.get(position) {
        None => Err(RuleViolation::InvalidBenchPosition(position)),
        Some(None) => Err(RuleViolation::BenchSlotEmpty(position)),
        Some(Some(card)) => Ok(card),
    }
}

// --- COMMAND PLANNING ---

/// Translates a validated action into the commands that carry it out.
///
/// Everything is computed from the pre-action state, so knockout and
/// end-of-battle consequences are decided here rather than during execution.
fn plan_commands(
    state: &BattleState,
    action: &BattleAction,
    context: &BattleContext,
) -> RuleResult<Vec<BattleCommand>> {
    let side = action.side();
    let zones = state.zones(side);
    let mut commands = Vec::new();

    match action {
        BattleAction::PlaceActive { card_iid, .. } => {
            let card = zones
                .hand_card(card_iid)
                .ok_or_else(|| RuleViolation::CardNotInHand(card_iid.clone()))?;
            let max_hp = context.require_card(&card.id)?.hp;
            commands.push(BattleCommand::MoveCard {
                side,
                iid: card_iid.clone(),
                from: Zone::Hand,
                to: Zone::Active,
            });
            commands.push(BattleCommand::SetHp {
                iid: card_iid.clone(),
                hp: max_hp,
            });
            commands.push(BattleCommand::EmitEvent(BattleEvent::ActivePlaced {
                side,
                card: card.clone(),
            }));

            let opponent_ready = state.zones(side.opponent()).active.is_some();
            if opponent_ready {
                commands.push(BattleCommand::SetPhase(state.first_player.turn_phase()));
                commands.push(BattleCommand::EmitEvent(BattleEvent::PreparationComplete {
                    first_player: state.first_player,
                }));
                commands.push(BattleCommand::EmitEvent(BattleEvent::TurnStarted {
                    side: state.first_player,
                    turn: state.turn,
                }));
            }
        }
        BattleAction::PlaceBench {
            card_iid, position, ..
        } => {
            let card = zones
                .hand_card(card_iid)
                .ok_or_else(|| RuleViolation::CardNotInHand(card_iid.clone()))?;
            let max_hp = context.require_card(&card.id)?.hp;
            commands.push(BattleCommand::MoveCard {
                side,
                iid: card_iid.clone(),
                from: Zone::Hand,
                to: Zone::Bench(*position),
            });
            commands.push(BattleCommand::SetHp {
                iid: card_iid.clone(),
                hp: max_hp,
            });
            commands.push(BattleCommand::EmitEvent(BattleEvent::Benched {
                side,
                card: card.clone(),
                position: *position,
            }));
        }
        BattleAction::PromoteFromBench {
            card_iid,
            bench_position,
            ..
        } => {
            let card = bench_occupant(zones.bench.as_slice(), *bench_position)?;
            commands.push(BattleCommand::MoveCard {
                side,
                iid: card_iid.clone(),
                from: Zone::Bench(*bench_position),
                to: Zone::Active,
            });
            commands.push(BattleCommand::SetPromotion(None));
            commands.push(BattleCommand::MarkEnteredActive {
                iid: card_iid.clone(),
            });
            commands.push(BattleCommand::EmitEvent(BattleEvent::Promoted {
                side,
                card: card.clone(),
                position: *bench_position,
            }));
        }
        BattleAction::AttachEnergy {
            card_iid,
            energy_type,
            ..
        } => {
            let card = zones
                .in_play()
                .find(|card| card.iid == *card_iid)
                .ok_or_else(|| RuleViolation::CardNotInPlay(card_iid.clone()))?;
            commands.push(BattleCommand::AttachEnergy {
                iid: card_iid.clone(),
                element: *energy_type,
            });
            commands.push(BattleCommand::MarkEnergyAttached);
            commands.push(BattleCommand::EmitEvent(BattleEvent::EnergyAttached {
                side,
                card: card.clone(),
                element: *energy_type,
            }));
        }
        BattleAction::Attack { attack_index, .. } => {
            plan_attack(state, side, *attack_index, context, &mut commands)?;
        }
        BattleAction::Retreat { bench_position, .. } => {
            let outgoing = zones.active.as_ref().ok_or(RuleViolation::NoActive)?;
            let incoming = bench_occupant(zones.bench.as_slice(), *bench_position)?;
            let template = context.require_card(&outgoing.id)?;
            let cost = retreat_cost(template.hp);
            commands.push(BattleCommand::SpendEnergy {
                iid: outgoing.iid.clone(),
                element: template.element,
                count: cost,
            });
            commands.push(BattleCommand::SwapActiveWithBench {
                side,
                position: *bench_position,
            });
            commands.push(BattleCommand::MarkRetreated);
            commands.push(BattleCommand::EmitEvent(BattleEvent::Retreated {
                side,
                outgoing: outgoing.clone(),
                incoming: incoming.clone(),
                energy_spent: cost,
            }));
        }
        BattleAction::EndTurn { .. } => {
            let next = side.opponent();
            let next_turn = if next == state.first_player {
                state.turn + 1
            } else {
                state.turn
            };
            commands.push(BattleCommand::EmitEvent(BattleEvent::TurnEnded { side }));
            commands.push(BattleCommand::SetPhase(next.turn_phase()));
            if next_turn != state.turn {
                commands.push(BattleCommand::IncrementTurn);
            }
            commands.push(BattleCommand::ResetTurnMarkers);
            commands.push(BattleCommand::SetCanAttack(true));
            if state.zones(next).deck.is_empty() {
                commands.push(BattleCommand::EmitEvent(BattleEvent::DeckOut { side: next }));
                commands.push(BattleCommand::EndBattle {
                    winner: Winner::from(side),
                });
            } else {
                commands.push(BattleCommand::EmitEvent(BattleEvent::TurnStarted {
                    side: next,
                    turn: next_turn,
                }));
                commands.push(BattleCommand::DrawCard { side: next });
            }
        }
        BattleAction::Concede { .. } => {
            commands.push(BattleCommand::EmitEvent(BattleEvent::Conceded { side }));
            commands.push(BattleCommand::EndBattle {
                winner: Winner::from(side.opponent()),
            });
        }
    }

    Ok(commands)
}

fn plan_attack(
    state: &BattleState,
    side: Side,
    attack_index: usize,
    context: &BattleContext,
    commands: &mut Vec<BattleCommand>,
) -> RuleResult<()> {
    let victim = side.opponent();
    let attacker = state.zones(side).active.as_ref().ok_or(RuleViolation::NoActive)?;
    let target = state.zones(victim).active.as_ref().ok_or(RuleViolation::NoActive)?;
    let attacker_template = context.require_card(&attacker.id)?;
    let target_template = context.require_card(&target.id)?;
    let attack = attacker_template
        .attack(attack_index)
        .ok_or(RuleViolation::InvalidAttackIndex(attack_index))?;

    let damage = calculate_damage(attack.damage, attacker_template.element, target_template);
    let remaining_hp = context
        .current_hp(state, &target.id, &target.iid)
        .saturating_sub(damage);

    commands.push(BattleCommand::SetHp {
        iid: target.iid.clone(),
        hp: remaining_hp,
    });
    commands.push(BattleCommand::SetCanAttack(false));
    commands.push(BattleCommand::MarkAttacked);
    commands.push(BattleCommand::EmitEvent(BattleEvent::AttackUsed {
        side,
        attacker: attacker.clone(),
        target: target.clone(),
        attack_index,
        damage,
        remaining_hp,
    }));

    if remaining_hp > 0 {
        return Ok(());
    }

    // Knockout
    commands.push(BattleCommand::MoveCard {
        side: victim,
        iid: target.iid.clone(),
        from: Zone::Active,
        to: Zone::Discard,
    });
    commands.push(BattleCommand::ClearEnergy {
        iid: target.iid.clone(),
    });
    commands.push(BattleCommand::EmitEvent(BattleEvent::KnockedOut {
        side: victim,
        card: target.clone(),
    }));
    commands.push(BattleCommand::DecrementPrize { side });

    let victim_zones = state.zones(victim);
    if state.prizes.remaining(side) <= 1 {
        commands.push(BattleCommand::EndBattle {
            winner: Winner::from(side),
        });
    } else if victim_zones.has_bench_occupant() {
        commands.push(BattleCommand::SetPromotion(Some(PromotionRequest {
            side: victim,
            reason: PromotionReason::Knockout,
        })));
        commands.push(BattleCommand::EmitEvent(BattleEvent::PromotionRequired {
            side: victim,
        }));
    } else {
        commands.push(BattleCommand::EndBattle {
            winner: Winner::from(side),
        });
    }
    Ok(())
}
