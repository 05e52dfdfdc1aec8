//! Demo battle: the scripted policy plays the player's seat against a roster
//! opponent through the full service path.
//!
//! Usage: `pokemon-tcg-pve [opponent-id] [seed]`. A fresh demo player has only
//! EASY opponents unlocked.

use pokemon_tcg_pve::battle::ai::{Behavior, ScriptedAi};
use pokemon_tcg_pve::battle::context::BattleContext;
use pokemon_tcg_pve::battle::state::{Phase, Side};
use pokemon_tcg_pve::mcp_interface::{describe_outcome, get_battle_status_summary};
use pokemon_tcg_pve::progress::InMemoryProgressTracker;
use pokemon_tcg_pve::repository::InMemoryBattleRepository;
use pokemon_tcg_pve::roster::starter_deck;
use pokemon_tcg_pve::{BattleAction, BattleService, InMemoryCatalog, OpponentRoster, PveConfig};
use std::sync::Arc;

const MAX_PLAYER_ACTIONS: usize = 200;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .with_writer(std::io::stderr)
        .init();

    let mut args = std::env::args().skip(1);
    let opponent_id = args.next().unwrap_or_else(|| "fire-easy".to_string());
    let seed = args.next().and_then(|s| s.parse::<u64>().ok());

    let config = PveConfig::from_env()?;
    let catalog = Arc::new(InMemoryCatalog::bundled()?);
    let roster = OpponentRoster::bundled()?;
    let mut service = BattleService::new(
        Arc::new(InMemoryBattleRepository::new()),
        catalog.clone(),
        Arc::new(InMemoryProgressTracker::new(roster.clone())),
        roster,
        config.clone(),
    );
    if let Some(seed) = seed {
        service = service.with_seed(seed);
    }

    let view = service
        .create_battle("demo-player", &opponent_id, &starter_deck())
        .await?;
    let battle_id = view.battle_id.clone();
    println!("{}", get_battle_status_summary(&view));

    let policy = ScriptedAi::new();
    for _ in 0..MAX_PLAYER_ACTIONS {
        let state = service.load_state(&battle_id).await?;
        if state.phase == Phase::Ended {
            break;
        }
        let context =
            BattleContext::rehydrate(&state, catalog.as_ref(), config.rules.clone()).await?;
        let action = policy
            .decide_action(Side::Player, &state, &context)
            .unwrap_or(BattleAction::EndTurn { side: Side::Player });

        println!("> {}", serde_json::to_string(&action)?);
        let outcome = service.submit_action(&battle_id, action).await?;
        println!("{}", describe_outcome(&outcome));
        if !outcome.is_applied() {
            let fallback = BattleAction::EndTurn { side: Side::Player };
            println!("> {}", serde_json::to_string(&fallback)?);
            let outcome = service.submit_action(&battle_id, fallback).await?;
            println!("{}", describe_outcome(&outcome));
        }
    }

    let state = service.load_state(&battle_id).await?;
    match state.winner {
        Some(winner) => println!("Battle over after {} turns: {:?}", state.turn, winner),
        None => println!("Stopped after {} player actions without a result.", MAX_PLAYER_ACTIONS),
    }
    Ok(())
}
