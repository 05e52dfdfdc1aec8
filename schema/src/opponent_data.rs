use crate::{Difficulty, Element};
use serde::{Deserialize, Serialize};

/// A scripted opponent the player can challenge. The deck lists card template ids.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OpponentProfile {
    pub id: String,
    pub name: String,
    pub difficulty: Difficulty,
    pub element: Element,
    #[serde(default)]
    pub intro: String,
    #[serde(default)]
    pub reward_coins: u32,
    pub deck: Vec<String>,
}
