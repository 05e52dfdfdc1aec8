// PvE Schema - Shared type definitions
// This crate holds the static card data shapes that the battle engine, the
// catalog loaders and the opponent roster all agree on.

// Re-export the main types
pub use card_data::*;
pub use elements::*;
pub use opponent_data::*;

pub mod card_data;
pub mod elements;
pub mod opponent_data;
