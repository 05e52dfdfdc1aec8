//! Client-safe views of a battle.
//!
//! The persisted state only carries ids and numbers. The projection resolves
//! them against the context so a client can render a card without knowing the
//! catalog, and hides what the viewer should not see.

use crate::battle::action::BattleAction;
use crate::battle::calculators::retreat_cost;
use crate::battle::context::BattleContext;
use crate::battle::legal_moves::legal_moves_for;
use crate::battle::state::{
    BattleState, CardRef, Phase, Prizes, PromotionRequest, Side, TurnFlags, Winner,
};
use schema::{Attack, Element, Resistance, Weakness};
use serde::Serialize;

#[derive(Serialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ClientCard {
    /// Instance id.
    pub id: String,
    /// Template id.
    pub token_id: String,
    pub name: String,
    pub image: String,
    pub element: Element,
    pub hp: u32,
    pub max_hp: u32,
    pub attacks: Vec<Attack>,
    pub weaknesses: Vec<Weakness>,
    pub resistances: Vec<Resistance>,
    pub energies: Vec<Element>,
    pub retreat_cost: usize,
}

#[derive(Serialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ClientSideView {
    pub active: Option<ClientCard>,
    pub bench: Vec<Option<ClientCard>>,
    /// Empty for the opposing side; see `hand_count`.
    pub hand: Vec<ClientCard>,
    pub hand_count: usize,
    pub deck_count: usize,
    pub discard: Vec<ClientCard>,
}

#[derive(Serialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ClientFlags {
    pub has_attacked_this_turn: bool,
    pub has_attached_energy_this_turn: bool,
    pub has_retreated_this_turn: bool,
    pub entered_active_this_turn: Vec<String>,
    /// Serialized as `null` when no promotion is pending.
    pub needs_bench_promotion: Option<PromotionRequest>,
}

impl From<&TurnFlags> for ClientFlags {
    fn from(flags: &TurnFlags) -> Self {
        Self {
            has_attacked_this_turn: flags.has_attacked_this_turn,
            has_attached_energy_this_turn: flags.has_attached_energy_this_turn,
            has_retreated_this_turn: flags.has_retreated_this_turn,
            entered_active_this_turn: flags.entered_active_this_turn.clone(),
            needs_bench_promotion: flags.needs_bench_promotion,
        }
    }
}

#[derive(Serialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ClientBattleView {
    pub battle_id: String,
    pub viewer: Side,
    pub phase: Phase,
    pub turn: u32,
    pub first_player: Side,
    pub winner: Option<Winner>,
    pub player: ClientSideView,
    pub ai: ClientSideView,
    pub prizes: Prizes,
    pub can_attack_this_turn: bool,
    /// Only the viewer's own legal moves.
    pub legal_moves: Vec<BattleAction>,
    pub flags: ClientFlags,
}

/// Projects `state` for `viewer`.
///
/// References whose template is missing are dropped from hand and discard
/// lists and shown as empty in active and bench slots.
pub fn hydrate_for_client(
    state: &BattleState,
    context: &BattleContext,
    viewer: Side,
) -> ClientBattleView {
    if let Some(request) = state.flags.needs_bench_promotion {
        tracing::debug!(
            battle_id = %state.battle_id,
            side = %request.side,
            "projecting pending bench promotion"
        );
    }

    ClientBattleView {
        battle_id: state.battle_id.clone(),
        viewer,
        phase: state.phase,
        turn: state.turn,
        first_player: state.first_player,
        winner: state.winner,
        player: side_view(state, context, Side::Player, viewer),
        ai: side_view(state, context, Side::Ai, viewer),
        prizes: state.prizes,
        can_attack_this_turn: state.can_attack_this_turn,
        legal_moves: legal_moves_for(state, viewer),
        flags: ClientFlags::from(&state.flags),
    }
}

fn side_view(
    state: &BattleState,
    context: &BattleContext,
    side: Side,
    viewer: Side,
) -> ClientSideView {
    let zones = state.zones(side);
    let hydrate = |card: &CardRef| client_card(state, context, card);
    let hydrate_all = |cards: &[CardRef]| cards.iter().filter_map(hydrate).collect::<Vec<_>>();

    ClientSideView {
        active: zones.active.as_ref().and_then(hydrate),
        bench: zones
            .bench
            .iter()
            .map(|slot| slot.as_ref().and_then(hydrate))
            .collect(),
        hand: if side == viewer {
            hydrate_all(&zones.hand)
        } else {
            Vec::new()
        },
        hand_count: zones.hand.len(),
        deck_count: zones.deck.len(),
        discard: hydrate_all(&zones.discard),
    }
}

fn client_card(state: &BattleState, context: &BattleContext, card: &CardRef) -> Option<ClientCard> {
    let template = context.card(&card.id)?;
    Some(ClientCard {
        id: card.iid.clone(),
        token_id: card.id.clone(),
        name: template.name.clone(),
        image: template.image.clone(),
        element: template.element,
        hp: state.hp_by_iid.get(&card.iid).copied().unwrap_or(template.hp),
        max_hp: template.hp,
        attacks: template.attacks.clone(),
        weaknesses: template.weaknesses.clone(),
        resistances: template.resistances.clone(),
        energies: state.energy_attached(&card.iid).to_vec(),
        retreat_cost: retreat_cost(template.hp),
    })
}
