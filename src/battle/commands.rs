use crate::battle::state::{
    BattleEvent, BattleState, CardRef, EventBus, Phase, PromotionRequest, Side, Winner, Zone,
};
use schema::Element;
use thiserror::Error;

/// Atomic commands representing final state changes
#[derive(Debug, Clone, PartialEq)]
pub enum BattleCommand {
    // Card movement
    MoveCard {
        side: Side,
        iid: String,
        from: Zone,
        to: Zone,
    },
    SwapActiveWithBench {
        side: Side,
        position: usize,
    },
    DrawCard {
        side: Side,
    },

    // Card state
    SetHp {
        iid: String,
        hp: u32,
    },
    AttachEnergy {
        iid: String,
        element: Element,
    },
    SpendEnergy {
        iid: String,
        element: Element,
        count: usize,
    },
    ClearEnergy {
        iid: String,
    },

    // Turn markers
    MarkEnteredActive {
        iid: String,
    },
    MarkAttacked,
    MarkEnergyAttached,
    MarkRetreated,
    SetCanAttack(bool),
    ResetTurnMarkers,
    SetPromotion(Option<PromotionRequest>),

    // Battle flow
    SetPhase(Phase),
    IncrementTurn,
    DecrementPrize {
        side: Side,
    },
    EndBattle {
        winner: Winner,
    },
    EmitEvent(BattleEvent),
}

/// Error types for command execution
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ExecutionError {
    #[error("card {iid} is not in {zone:?}")]
    CardNotInZone { iid: String, zone: Zone },
    #[error("destination {0:?} is occupied")]
    ZoneOccupied(Zone),
    #[error("bench position {0} does not exist")]
    InvalidBenchPosition(usize),
    #[error("{0} has no cards left to draw")]
    EmptyDeck(Side),
    #[error("{0} has no active card")]
    NoActive(Side),
    #[error("card {iid} has only {available} matching energy, {required} required")]
    NotEnoughEnergy {
        iid: String,
        required: usize,
        available: usize,
    },
}

/// Execute a batch of commands atomically
///
/// The caller owns rollback: commands run against a scratch clone and the
/// clone is dropped if any command fails.
pub fn execute_command_batch(
    commands: Vec<BattleCommand>,
    state: &mut BattleState,
    bus: &mut EventBus,
) -> Result<(), ExecutionError> {
    for command in commands {
        execute_command(command, state, bus)?;
    }
    Ok(())
}

/// Removes `iid` from `zone` on `side`, returning the reference.
fn take_from_zone(
    state: &mut BattleState,
    side: Side,
    iid: &str,
    zone: Zone,
) -> Result<CardRef, ExecutionError> {
    let zones = state.zones_mut(side);
    let missing = || ExecutionError::CardNotInZone {
        iid: iid.to_string(),
        zone,
    };
    match zone {
        Zone::Active => {
            if zones.active.as_ref().is_some_and(|c| c.iid == iid) {
                zones.active.take().ok_or_else(missing)
            } else {
                Err(missing())
            }
        }
        Zone::Bench(position) => {
            let slot = zones
                .bench
                .get_mut(position)
                .ok_or(ExecutionError::InvalidBenchPosition(position))?;
            if slot.as_ref().is_some_and(|c| c.iid == iid) {
                slot.take().ok_or_else(missing)
            } else {
                Err(missing())
            }
        }
        Zone::Hand | Zone::Deck | Zone::Discard => {
            let list = match zone {
                Zone::Hand => &mut zones.hand,
                Zone::Deck => &mut zones.deck,
                _ => &mut zones.discard,
            };
            let index = list.iter().position(|c| c.iid == iid).ok_or_else(missing)?;
            Ok(list.remove(index))
        }
    }
}

fn put_into_zone(
    state: &mut BattleState,
    side: Side,
    card: CardRef,
    zone: Zone,
) -> Result<(), ExecutionError> {
    let zones = state.zones_mut(side);
    match zone {
        Zone::Active => {
            if zones.active.is_some() {
                return Err(ExecutionError::ZoneOccupied(zone));
            }
            zones.active = Some(card);
        }
        Zone::Bench(position) => {
            let slot = zones
                .bench
                .get_mut(position)
                .ok_or(ExecutionError::InvalidBenchPosition(position))?;
            if slot.is_some() {
                return Err(ExecutionError::ZoneOccupied(zone));
            }
            *slot = Some(card);
        }
        Zone::Hand => zones.hand.push(card),
        Zone::Deck => zones.deck.push(card),
        Zone::Discard => zones.discard.push(card),
    }
    Ok(())
}

fn execute_command(
    command: BattleCommand,
    state: &mut BattleState,
    bus: &mut EventBus,
) -> Result<(), ExecutionError> {
    match command {
        BattleCommand::EmitEvent(event) => {
            bus.push(event);
            Ok(())
        }
        BattleCommand::MoveCard { side, iid, from, to } => {
            let card = take_from_zone(state, side, &iid, from)?;
            put_into_zone(state, side, card, to)
        }
        BattleCommand::SwapActiveWithBench { side, position } => {
            let zones = state.zones_mut(side);
            if zones.active.is_none() {
                return Err(ExecutionError::NoActive(side));
            }
            let slot = zones
                .bench
                .get_mut(position)
                .ok_or(ExecutionError::InvalidBenchPosition(position))?;
            std::mem::swap(&mut zones.active, slot);
            Ok(())
        }
        BattleCommand::DrawCard { side } => {
            let zones = state.zones_mut(side);
            if zones.deck.is_empty() {
                return Err(ExecutionError::EmptyDeck(side));
            }
            let card = zones.deck.remove(0);
            bus.push(BattleEvent::CardDrawn {
                side,
                card: card.clone(),
            });
            zones.hand.push(card);
            Ok(())
        }
        BattleCommand::SetHp { iid, hp } => {
            state.hp_by_iid.insert(iid, hp);
            Ok(())
        }
        BattleCommand::AttachEnergy { iid, element } => {
            state.energies.entry(iid).or_default().push(element);
            Ok(())
        }
        BattleCommand::SpendEnergy {
            iid,
            element,
            count,
        } => {
            let available = state.matching_energy(&iid, element);
            if available < count {
                return Err(ExecutionError::NotEnoughEnergy {
                    iid,
                    required: count,
                    available,
                });
            }
            if count == 0 {
                return Ok(());
            }
            let pool = state.energies.entry(iid.clone()).or_default();
            let mut remaining = count;
            pool.retain(|attached| {
                if remaining > 0 && *attached == element {
                    remaining -= 1;
                    false
                } else {
                    true
                }
            });
            if pool.is_empty() {
                state.energies.remove(&iid);
            }
            Ok(())
        }
        BattleCommand::ClearEnergy { iid } => {
            state.energies.remove(&iid);
            Ok(())
        }
        BattleCommand::MarkEnteredActive { iid } => {
            if !state.entered_active_this_turn(&iid) {
                state.flags.entered_active_this_turn.push(iid);
            }
            Ok(())
        }
        BattleCommand::MarkAttacked => {
            state.flags.has_attacked_this_turn = true;
            Ok(())
        }
        BattleCommand::MarkEnergyAttached => {
            state.flags.has_attached_energy_this_turn = true;
            Ok(())
        }
        BattleCommand::MarkRetreated => {
            state.flags.has_retreated_this_turn = true;
            Ok(())
        }
        BattleCommand::SetCanAttack(can_attack) => {
            state.can_attack_this_turn = can_attack;
            Ok(())
        }
        BattleCommand::ResetTurnMarkers => {
            state.flags.reset_for_new_turn();
            Ok(())
        }
        BattleCommand::SetPromotion(request) => {
            state.flags.needs_bench_promotion = request;
            Ok(())
        }
        BattleCommand::SetPhase(phase) => {
            state.phase = phase;
            Ok(())
        }
        BattleCommand::IncrementTurn => {
            state.turn += 1;
            Ok(())
        }
        BattleCommand::DecrementPrize { side } => {
            let remaining = state.prizes.remaining_mut(side);
            *remaining = remaining.saturating_sub(1);
            Ok(())
        }
        BattleCommand::EndBattle { winner } => {
            state.phase = Phase::Ended;
            state.winner = Some(winner);
            bus.push(BattleEvent::BattleEnded { winner });
            Ok(())
        }
    }
}
