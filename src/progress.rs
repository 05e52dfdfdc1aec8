//! Player progression: rewards, win/loss records and difficulty unlocks.

use crate::battle::state::Winner;
use crate::errors::ProgressError;
use crate::roster::OpponentRoster;
use async_trait::async_trait;
use schema::Difficulty;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashMap};
use tokio::sync::RwLock;
use tracing::info;

/// Summary of a finished battle, handed to the progress collaborator.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct BattleResult {
    pub battle_id: String,
    pub user_id: String,
    pub opponent_id: String,
    pub difficulty: Difficulty,
    pub winner: Winner,
    pub duration_secs: u64,
    pub turns_played: u32,
    /// Remaining over maximum HP across the player's cards in play.
    pub player_final_hp: f64,
    pub ai_final_hp: f64,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ProgressUpdate {
    pub user_id: String,
    pub difficulty: Difficulty,
    pub wins: u32,
    pub losses: u32,
    pub defeated_opponents: Vec<String>,
    pub coins_earned: u32,
    pub xp_earned: u32,
    pub new_difficulties_unlocked: Vec<Difficulty>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Rewards {
    pub coins: u32,
    pub xp: u32,
}

/// Coins and XP for one battle. Bonuses compound and each step floors.
pub fn calculate_rewards(result: &BattleResult) -> Rewards {
    if result.winner != Winner::Player {
        return Rewards { coins: 0, xp: 5 };
    }

    let mut rewards = match result.difficulty {
        Difficulty::Easy => Rewards { coins: 50, xp: 100 },
        Difficulty::Medium => Rewards { coins: 75, xp: 150 },
        Difficulty::Hard => Rewards { coins: 100, xp: 200 },
    };

    // Quick victory
    if result.turns_played < 10 {
        rewards.coins = rewards.coins * 12 / 10;
        rewards.xp = rewards.xp * 11 / 10;
    }
    if result.player_final_hp > 0.8 {
        rewards.coins = rewards.coins * 11 / 10;
    }
    rewards
}

/// Per-user, per-difficulty standing.
#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct DifficultyProgress {
    pub wins: u32,
    pub losses: u32,
    pub defeated_opponents: BTreeSet<String>,
}

#[async_trait]
pub trait ProgressUpdater: Send + Sync {
    async fn update_progress_on_battle_end(
        &self,
        result: &BattleResult,
    ) -> Result<ProgressUpdate, ProgressError>;

    /// Whether `user_id` may start battles at `difficulty`. Trackers that do
    /// not gate tiers leave every difficulty open.
    async fn has_access_to_difficulty(
        &self,
        _user_id: &str,
        _difficulty: Difficulty,
    ) -> Result<bool, ProgressError> {
        Ok(true)
    }
}

/// Keeps progression in memory and judges unlocks against an opponent roster.
pub struct InMemoryProgressTracker {
    roster: OpponentRoster,
    records: RwLock<HashMap<(String, Difficulty), DifficultyProgress>>,
}

impl InMemoryProgressTracker {
    pub fn new(roster: OpponentRoster) -> Self {
        Self {
            roster,
            records: RwLock::new(HashMap::new()),
        }
    }

    pub async fn progress(&self, user_id: &str, difficulty: Difficulty) -> DifficultyProgress {
        self.records
            .read()
            .await
            .get(&(user_id.to_string(), difficulty))
            .cloned()
            .unwrap_or_default()
    }

    pub async fn user_progress(&self, user_id: &str) -> Vec<(Difficulty, DifficultyProgress)> {
        let records = self.records.read().await;
        let mut progress: Vec<_> = records
            .iter()
            .filter(|((user, _), _)| user == user_id)
            .map(|((_, difficulty), record)| (*difficulty, record.clone()))
            .collect();
        progress.sort_by_key(|(difficulty, _)| *difficulty);
        progress
    }

    fn tier_cleared(&self, difficulty: Difficulty, defeated: Option<&BTreeSet<String>>) -> bool {
        let mut opponents = self.roster.by_difficulty(difficulty).peekable();
        if opponents.peek().is_none() {
            return false;
        }
        let Some(defeated) = defeated else {
            return false;
        };
        opponents.all(|opponent| defeated.contains(&opponent.id))
    }
}

#[async_trait]
impl ProgressUpdater for InMemoryProgressTracker {
    async fn update_progress_on_battle_end(
        &self,
        result: &BattleResult,
    ) -> Result<ProgressUpdate, ProgressError> {
        let player_won = result.winner == Winner::Player;
        let rewards = calculate_rewards(result);
        let mut records = self.records.write().await;

        let key = (result.user_id.clone(), result.difficulty);
        let cleared_before = self.tier_cleared(
            result.difficulty,
            records.get(&key).map(|r| &r.defeated_opponents),
        );

        let record = records.entry(key).or_default();
        if player_won {
            record.wins += 1;
            record.defeated_opponents.insert(result.opponent_id.clone());
        } else {
            record.losses += 1;
        }
        let record = record.clone();

        let mut unlocked = Vec::new();
        if player_won && !cleared_before {
            if let Some(next) = result.difficulty.next() {
                if self.tier_cleared(result.difficulty, Some(&record.defeated_opponents)) {
                    records
                        .entry((result.user_id.clone(), next))
                        .or_default();
                    info!(user_id = %result.user_id, difficulty = %next, "difficulty unlocked");
                    unlocked.push(next);
                }
            }
        }

        info!(
            battle_id = %result.battle_id,
            user_id = %result.user_id,
            wins = record.wins,
            losses = record.losses,
            coins = rewards.coins,
            "progress updated"
        );

        Ok(ProgressUpdate {
            user_id: result.user_id.clone(),
            difficulty: result.difficulty,
            wins: record.wins,
            losses: record.losses,
            defeated_opponents: record.defeated_opponents.into_iter().collect(),
            coins_earned: rewards.coins,
            xp_earned: rewards.xp,
            new_difficulties_unlocked: unlocked,
        })
    }

    /// EASY is always open; every other tier needs the one below it cleared.
    async fn has_access_to_difficulty(
        &self,
        user_id: &str,
        difficulty: Difficulty,
    ) -> Result<bool, ProgressError> {
        let Some(previous) = difficulty.previous() else {
            return Ok(true);
        };
        let records = self.records.read().await;
        let defeated = records
            .get(&(user_id.to_string(), previous))
            .map(|record| &record.defeated_opponents);
        Ok(self.tier_cleared(previous, defeated))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use rstest::rstest;
    use schema::{Element, OpponentProfile};

    fn result(winner: Winner, difficulty: Difficulty, turns: u32, hp: f64) -> BattleResult {
        BattleResult {
            battle_id: "b1".to_string(),
            user_id: "ash".to_string(),
            opponent_id: "fire-easy".to_string(),
            difficulty,
            winner,
            duration_secs: 120,
            turns_played: turns,
            player_final_hp: hp,
            ai_final_hp: 0.0,
        }
    }

    fn opponent(id: &str, difficulty: Difficulty) -> OpponentProfile {
        OpponentProfile {
            id: id.to_string(),
            name: id.to_string(),
            difficulty,
            element: Element::Fire,
            intro: String::new(),
            reward_coins: 0,
            deck: vec!["4".to_string()],
        }
    }

    fn tracker() -> InMemoryProgressTracker {
        InMemoryProgressTracker::new(OpponentRoster::new(vec![
            opponent("easy-1", Difficulty::Easy),
            opponent("easy-2", Difficulty::Easy),
            opponent("medium-1", Difficulty::Medium),
            opponent("hard-1", Difficulty::Hard),
        ]))
    }

    fn win_against(id: &str, difficulty: Difficulty) -> BattleResult {
        BattleResult {
            opponent_id: id.to_string(),
            ..result(Winner::Player, difficulty, 12, 0.5)
        }
    }

    #[rstest]
    #[case::loss(Winner::Ai, Difficulty::Hard, 3, 1.0, 0, 5)]
    #[case::easy_plain(Winner::Player, Difficulty::Easy, 12, 0.5, 50, 100)]
    #[case::medium_plain(Winner::Player, Difficulty::Medium, 12, 0.5, 75, 150)]
    #[case::hard_plain(Winner::Player, Difficulty::Hard, 12, 0.5, 100, 200)]
    #[case::easy_quick(Winner::Player, Difficulty::Easy, 9, 0.5, 60, 110)]
    #[case::easy_healthy(Winner::Player, Difficulty::Easy, 12, 0.9, 55, 100)]
    #[case::easy_quick_and_healthy(Winner::Player, Difficulty::Easy, 4, 0.81, 66, 110)]
    #[case::medium_quick_and_healthy(Winner::Player, Difficulty::Medium, 4, 1.0, 99, 165)]
    #[case::hard_quick_and_healthy(Winner::Player, Difficulty::Hard, 4, 1.0, 132, 220)]
    #[case::exactly_eighty_percent(Winner::Player, Difficulty::Easy, 10, 0.8, 50, 100)]
    fn test_reward_arithmetic(
        #[case] winner: Winner,
        #[case] difficulty: Difficulty,
        #[case] turns: u32,
        #[case] hp: f64,
        #[case] coins: u32,
        #[case] xp: u32,
    ) {
        let rewards = calculate_rewards(&result(winner, difficulty, turns, hp));
        assert_eq!(rewards, Rewards { coins, xp });
    }

    #[tokio::test]
    async fn test_wins_and_losses_are_counted_per_difficulty() {
        let tracker = tracker();

        tracker
            .update_progress_on_battle_end(&win_against("easy-1", Difficulty::Easy))
            .await
            .unwrap();
        let update = tracker
            .update_progress_on_battle_end(&result(Winner::Ai, Difficulty::Easy, 12, 0.0))
            .await
            .unwrap();

        assert_eq!((update.wins, update.losses), (1, 1));
        assert_eq!(update.defeated_opponents, vec!["easy-1".to_string()]);
        assert_eq!(update.coins_earned, 0);
        assert_eq!(tracker.progress("ash", Difficulty::Medium).await, DifficultyProgress::default());
    }

    #[tokio::test]
    async fn test_medium_unlocks_after_every_easy_opponent_falls() {
        let tracker = tracker();
        assert!(tracker.has_access_to_difficulty("ash", Difficulty::Easy).await.unwrap());
        assert!(!tracker.has_access_to_difficulty("ash", Difficulty::Medium).await.unwrap());

        let first = tracker
            .update_progress_on_battle_end(&win_against("easy-1", Difficulty::Easy))
            .await
            .unwrap();
        let repeat = tracker
            .update_progress_on_battle_end(&win_against("easy-1", Difficulty::Easy))
            .await
            .unwrap();
        let second = tracker
            .update_progress_on_battle_end(&win_against("easy-2", Difficulty::Easy))
            .await
            .unwrap();

        assert!(first.new_difficulties_unlocked.is_empty());
        assert!(repeat.new_difficulties_unlocked.is_empty());
        assert_eq!(second.new_difficulties_unlocked, vec![Difficulty::Medium]);
        assert!(tracker.has_access_to_difficulty("ash", Difficulty::Medium).await.unwrap());
        assert!(!tracker.has_access_to_difficulty("ash", Difficulty::Hard).await.unwrap());
        assert!(!tracker.has_access_to_difficulty("misty", Difficulty::Medium).await.unwrap());
    }

    #[tokio::test]
    async fn test_unlock_is_reported_once() {
        let tracker = tracker();
        tracker
            .update_progress_on_battle_end(&win_against("medium-1", Difficulty::Medium))
            .await
            .unwrap();

        let again = tracker
            .update_progress_on_battle_end(&win_against("medium-1", Difficulty::Medium))
            .await
            .unwrap();

        assert!(again.new_difficulties_unlocked.is_empty());
        assert!(tracker.has_access_to_difficulty("ash", Difficulty::Hard).await.unwrap());
        let tiers: Vec<Difficulty> = tracker
            .user_progress("ash")
            .await
            .into_iter()
            .map(|(difficulty, _)| difficulty)
            .collect();
        assert_eq!(tiers, vec![Difficulty::Medium, Difficulty::Hard]);
    }

    #[tokio::test]
    async fn test_hard_clear_unlocks_nothing_further() {
        let tracker = tracker();

        let update = tracker
            .update_progress_on_battle_end(&win_against("hard-1", Difficulty::Hard))
            .await
            .unwrap();

        assert!(update.new_difficulties_unlocked.is_empty());
        assert_eq!(update.coins_earned, 100);
    }
}
