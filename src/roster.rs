//! The set of PvE opponents and their decks.

use crate::errors::CatalogError;
use schema::{Difficulty, OpponentProfile};
use std::path::Path;

/// Opponents shipped with the crate.
pub const BUNDLED_OPPONENTS: &str = include_str!("../data/opponents.ron");

/// Deck handed to players who do not bring their own.
pub const STARTER_DECK: [&str; 10] = ["58", "58", "20", "14", "63", "63", "42", "52", "52", "56"];

pub fn starter_deck() -> Vec<String> {
    STARTER_DECK.iter().map(|id| id.to_string()).collect()
}

#[derive(Debug, Clone, Default)]
pub struct OpponentRoster {
    opponents: Vec<OpponentProfile>,
}

impl OpponentRoster {
    pub fn new(opponents: Vec<OpponentProfile>) -> Self {
        Self { opponents }
    }

    pub fn from_ron_str(text: &str) -> Result<Self, CatalogError> {
        Ok(Self::new(ron::from_str(text)?))
    }

    pub fn load(path: &Path) -> Result<Self, CatalogError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_ron_str(&content)
    }

    pub fn bundled() -> Result<Self, CatalogError> {
        Self::from_ron_str(BUNDLED_OPPONENTS)
    }

    pub fn get(&self, id: &str) -> Option<&OpponentProfile> {
        self.opponents.iter().find(|o| o.id == id)
    }

    pub fn by_difficulty(&self, difficulty: Difficulty) -> impl Iterator<Item = &OpponentProfile> {
        self.opponents.iter().filter(move |o| o.difficulty == difficulty)
    }

    pub fn count(&self, difficulty: Difficulty) -> usize {
        self.by_difficulty(difficulty).count()
    }

    pub fn all(&self) -> &[OpponentProfile] {
        &self.opponents
    }
}
