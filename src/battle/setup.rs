use crate::battle::ai::{ai_should_act, run_ai_turn};
use crate::battle::context::BattleContext;
use crate::battle::legal_moves::legal_moves;
use crate::battle::state::{BattleState, CardRef, Side};
use crate::errors::SetupError;
use rand::seq::SliceRandom;
use rand::Rng;

/// Creates a battle in `PREPARATION` from two decks of template ids.
///
/// Each deck is shuffled with `rng` and dealt into an opening hand; the rest
/// stays in the deck. Instance ids are `player_{n}` and `ai_{n}` in dealt order.
pub fn initialize_battle<R: Rng + ?Sized>(
    battle_id: String,
    player_deck: &[String],
    ai_deck: &[String],
    context: &BattleContext,
    rng: &mut R,
) -> Result<BattleState, SetupError> {
    let rules = &context.rules;
    check_deck("player", player_deck, rules.max_deck_size)?;
    check_deck("ai", ai_deck, rules.max_deck_size)?;

    let first_player = if rng.random_bool(0.5) {
        Side::Player
    } else {
        Side::Ai
    };
    let mut state = BattleState::new(battle_id, first_player, rules.bench_size, rules.prizes_to_win);

    for (side, deck) in [(Side::Player, player_deck), (Side::Ai, ai_deck)] {
        let mut ids = deck.to_vec();
        ids.shuffle(rng);

        let mut cards: Vec<CardRef> = ids
            .into_iter()
            .enumerate()
            .map(|(n, id)| CardRef::new(id, format!("{}_{}", side.iid_prefix(), n)))
            .collect();

        for card in &cards {
            if let Some(max_hp) = context.max_hp(&card.id) {
                state.hp_by_iid.insert(card.iid.clone(), max_hp);
            }
        }

        let hand_size = rules.opening_hand.min(cards.len());
        let deck_rest = cards.split_off(hand_size);
        let zones = state.zones_mut(side);
        zones.hand = cards;
        zones.deck = deck_rest;
    }

    state.legal_moves = legal_moves(&state, context);
    tracing::info!(
        battle_id = %state.battle_id,
        first_player = %first_player,
        "battle initialized"
    );
    Ok(state)
}

/// Lets the AI make its preparation placement so the player only ever sees
/// a battle waiting on them.
pub fn complete_ai_preparation(state: BattleState, context: &BattleContext) -> BattleState {
    if ai_should_act(&state) {
        run_ai_turn(&state, context).state
    } else {
        state
    }
}

fn check_deck(side: &'static str, deck: &[String], max: usize) -> Result<(), SetupError> {
    if deck.is_empty() {
        return Err(SetupError::EmptyDeck(side));
    }
    if deck.len() > max {
        return Err(SetupError::DeckTooLarge {
            side,
            size: deck.len(),
            max,
        });
    }
    Ok(())
}
