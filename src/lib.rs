//! Pokemon TCG PvE Battle Engine
//!
//! A turn-based trading-card battle between a player and a scripted AI
//! opponent. Battle state is a plain serializable value; every request loads
//! it, applies one validated action, lets the AI respond and persists the result.

// --- MODULE DECLARATIONS ---
pub mod battle;
pub mod catalog;
pub mod config;
pub mod errors;
pub mod mcp_interface;
pub mod progress;
pub mod repository;
pub mod roster;
pub mod service;

// --- PUBLIC API RE-EXPORTS ---

// --- From the `schema` crate ---
pub use schema::{
    Attack, CardTemplate, Difficulty, Element, OpponentProfile, Resistance, Weakness,
};

// --- From this crate's modules (`src/`) ---

// Core battle engine functions and state.
pub use battle::action::BattleAction;
pub use battle::context::BattleContext;
pub use battle::engine::{apply_action, try_apply_action, validate_action};
pub use battle::legal_moves::legal_moves;
pub use battle::outcome::{get_battle_winner, is_battle_ended};
pub use battle::projection::{hydrate_for_client, ClientBattleView};
pub use battle::setup::initialize_battle;
pub use battle::state::{BattleEvent, BattleState, CardRef, Phase, Side, Winner};

// Collaborators and orchestration.
pub use catalog::{CardCatalog, InMemoryCatalog};
pub use config::{PveConfig, RulesConfig, ServiceConfig};
pub use progress::{BattleResult, ProgressUpdate, ProgressUpdater};
pub use repository::{BattleRecord, BattleRepository, BattleStatus};
pub use roster::OpponentRoster;
pub use service::{ActionOutcome, BattleService};

// Crate-specific error and result types.
pub use errors::{PveError, PveResult, RuleResult, RuleViolation};
