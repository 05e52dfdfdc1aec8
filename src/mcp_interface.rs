//! Text rendering for the MCP front end.
//!
//! Turns battle views, outcomes and the opponent roster into the short
//! natural-language summaries the MCP tools hand back to a language model.

use crate::battle::action::BattleAction;
use crate::battle::projection::{ClientBattleView, ClientCard, ClientSideView};
use crate::battle::state::{Phase, Winner};
use crate::errors::PveError;
use crate::roster::OpponentRoster;
use crate::service::ActionOutcome;
use std::fmt::Write;

/// Returns formatted text listing every opponent, grouped by difficulty order.
pub fn get_available_opponents_display(roster: &OpponentRoster) -> String {
    let mut opponents: Vec<_> = roster.all().iter().collect();
    opponents.sort_by_key(|o| o.difficulty);

    let mut output = String::from("Available Opponents:\n");
    for opponent in opponents {
        let _ = writeln!(
            output,
            "  {} [{}] {} ({} deck)",
            opponent.id, opponent.difficulty, opponent.name, opponent.element
        );
        if !opponent.intro.is_empty() {
            let _ = writeln!(output, "      \"{}\"", opponent.intro);
        }
    }
    output
}

fn card_line(card: &ClientCard) -> String {
    let mut line = format!("{} ({}) {} HP {}/{}", card.name, card.id, card.element, card.hp, card.max_hp);
    if !card.energies.is_empty() {
        let energies: Vec<String> = card.energies.iter().map(|e| e.to_string()).collect();
        let _ = write!(line, " energy [{}]", energies.join(", "));
    }
    line
}

fn side_block(output: &mut String, title: &str, side: &ClientSideView, show_hand: bool) {
    let _ = writeln!(output, "--- {} ---", title);
    match &side.active {
        Some(card) => {
            let _ = writeln!(output, "  Active: {}", card_line(card));
            for (i, attack) in card.attacks.iter().enumerate() {
                let _ = writeln!(
                    output,
                    "    {}. {} ({} damage, {} energy)",
                    i, attack.name, attack.damage, attack.cost.len()
                );
            }
        }
        None => {
            let _ = writeln!(output, "  Active: (empty)");
        }
    }
    for (slot, card) in side.bench.iter().enumerate() {
        let text = card.as_ref().map(card_line).unwrap_or_else(|| "(empty)".to_string());
        let _ = writeln!(output, "  Bench {}: {}", slot, text);
    }
    if show_hand {
        for card in &side.hand {
            let _ = writeln!(output, "  Hand: {}", card_line(card));
        }
    } else {
        let _ = writeln!(output, "  Hand: {} cards", side.hand_count);
    }
    let _ = writeln!(
        output,
        "  Deck: {} cards, discard: {} cards",
        side.deck_count,
        side.discard.len()
    );
}

/// One line per move the viewer may submit, as wire JSON.
pub fn legal_moves_display(moves: &[BattleAction]) -> String {
    if moves.is_empty() {
        return "No moves available.".to_string();
    }
    let mut output = String::from("Legal moves:\n");
    for action in moves {
        let json = serde_json::to_string(action).unwrap_or_else(|_| action.kind().to_string());
        let _ = writeln!(output, "  {}", json);
    }
    output
}

/// Summary of a battle from the player's seat.
pub fn get_battle_status_summary(view: &ClientBattleView) -> String {
    let mut output = format!("Battle {} | turn {} | ", view.battle_id, view.turn);
    output.push_str(match view.phase {
        Phase::Preparation => "preparation: choose your active Pokemon",
        Phase::PlayerTurn => "your turn",
        Phase::AiTurn => "opponent's turn",
        Phase::Ended => "battle over",
    });
    output.push('\n');
    let _ = writeln!(
        output,
        "Knockouts needed: you {}, opponent {}",
        view.prizes.player, view.prizes.ai
    );
    if let Some(request) = view.flags.needs_bench_promotion {
        let _ = writeln!(output, "{} must promote a benched Pokemon.", request.side);
    }

    side_block(&mut output, "Opponent", &view.ai, false);
    side_block(&mut output, "You", &view.player, true);

    if let Some(winner) = view.winner {
        output.push_str(&winner_text(winner));
        output.push('\n');
    } else {
        output.push_str(&legal_moves_display(&view.legal_moves));
    }
    output
}

fn winner_text(winner: Winner) -> String {
    match winner {
        Winner::Player => "You won the battle!".to_string(),
        Winner::Ai => "You lost the battle.".to_string(),
        Winner::Draw => "The battle ended in a draw.".to_string(),
    }
}

/// Renders the result of a submitted action.
pub fn describe_outcome(outcome: &ActionOutcome) -> String {
    match outcome {
        ActionOutcome::Applied { view, .. } => get_battle_status_summary(view),
        ActionOutcome::Rejected(violation) => format!("Action rejected: {}", violation),
    }
}

pub fn describe_error(error: &PveError) -> String {
    format!("Error: {}", error)
}
