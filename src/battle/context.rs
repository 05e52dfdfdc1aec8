//! Per-request view of the catalog data a battle needs.

use crate::battle::state::{BattleState, Side};
use crate::catalog::CardCatalog;
use crate::config::RulesConfig;
use crate::errors::{IntegrityError, PveResult, RuleResult, RuleViolation};
use schema::{CardTemplate, OpponentProfile};
use std::collections::{BTreeSet, HashMap, HashSet};
use std::sync::Arc;

/// Templates for every card referenced by one battle, plus the rules in force.
///
/// Built fresh for each request and dropped afterwards; nothing here is persisted.
#[derive(Debug, Clone, Default)]
pub struct BattleContext {
    cards: HashMap<String, Arc<CardTemplate>>,
    pub rules: RulesConfig,
    pub opponent: Option<OpponentProfile>,
}

impl BattleContext {
    pub fn with_cards(cards: impl IntoIterator<Item = CardTemplate>, rules: RulesConfig) -> Self {
        Self {
            cards: cards
                .into_iter()
                .map(|card| (card.id.clone(), Arc::new(card)))
                .collect(),
            rules,
            opponent: None,
        }
    }

    pub fn with_opponent(mut self, opponent: OpponentProfile) -> Self {
        self.opponent = Some(opponent);
        self
    }

    pub fn card(&self, id: &str) -> Option<&Arc<CardTemplate>> {
        self.cards.get(id)
    }

    /// Like [`card`](Self::card), for rule evaluation.
    pub fn require_card(&self, id: &str) -> RuleResult<&Arc<CardTemplate>> {
        self.card(id).ok_or_else(|| RuleViolation::UnknownCard(id.to_string()))
    }

    pub fn max_hp(&self, id: &str) -> Option<u32> {
        self.card(id).map(|card| card.hp)
    }

    /// Resolves `ids` with a single catalog call. Every id must be found.
    pub async fn load(
        ids: impl IntoIterator<Item = String>,
        catalog: &dyn CardCatalog,
        rules: RulesConfig,
    ) -> PveResult<Self> {
        let wanted: BTreeSet<String> = ids.into_iter().collect();
        let wanted: Vec<String> = wanted.into_iter().collect();
        let templates = catalog.get_cards(&wanted).await?;

        let context = Self::with_cards(templates, rules);
        let missing: Vec<String> = wanted
            .into_iter()
            .filter(|id| context.card(id).is_none())
            .collect();
        if !missing.is_empty() {
            tracing::error!(missing = ?missing, "catalog is missing referenced cards");
            return Err(IntegrityError::MissingCards(missing).into());
        }
        Ok(context)
    }

    /// Rebuilds the context for a persisted battle from every template id it
    /// references, in every zone of both sides.
    pub async fn rehydrate(
        state: &BattleState,
        catalog: &dyn CardCatalog,
        rules: RulesConfig,
    ) -> PveResult<Self> {
        let ids = state.all_cards().map(|card| card.id.clone());
        let context = Self::load(ids, catalog, rules).await?;
        context.validate_integrity(state)?;
        Ok(context)
    }

    /// Checks structural invariants a decoded state must satisfy before play resumes.
    pub fn validate_integrity(&self, state: &BattleState) -> Result<(), IntegrityError> {
        for side in Side::BOTH {
            let found = state.zones(side).bench.len();
            if found != self.rules.bench_size {
                return Err(IntegrityError::BenchSize {
                    expected: self.rules.bench_size,
                    found,
                });
            }
        }

        let mut seen = HashSet::new();
        for card in state.all_cards() {
            if !seen.insert(card.iid.as_str()) {
                return Err(IntegrityError::DuplicateInstance(card.iid.clone()));
            }
        }

        for card in state.all_cards() {
            let (Some(hp), Some(max_hp)) = (state.hp_by_iid.get(&card.iid), self.max_hp(&card.id))
            else {
                continue;
            };
            if *hp > max_hp {
                return Err(IntegrityError::HpOutOfRange {
                    iid: card.iid.clone(),
                    hp: *hp,
                    max_hp,
                });
            }
        }
        Ok(())
    }

    /// Current HP of an instance. A missing entry means full health.
    pub fn current_hp(&self, state: &BattleState, id: &str, iid: &str) -> u32 {
        state
            .hp_by_iid
            .get(iid)
            .copied()
            .or_else(|| self.max_hp(id))
            .unwrap_or(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::battle::state::CardRef;
    use crate::catalog::InMemoryCatalog;
    use crate::errors::PveError;
    use pretty_assertions::assert_eq;

    fn state_with(ids: &[(&str, &str)]) -> BattleState {
        let mut state = BattleState::new("b1".to_string(), Side::Player, 3, 2);
        state.player.active = ids.first().map(|(id, iid)| CardRef::new(*id, *iid));
        for (id, iid) in ids.iter().skip(1) {
            state.ai.discard.push(CardRef::new(*id, *iid));
        }
        state
    }

    #[tokio::test]
    async fn test_rehydrate_covers_every_zone() {
        let catalog = InMemoryCatalog::bundled().unwrap();
        let state = state_with(&[("4", "player_0"), ("58", "ai_0")]);

        let context = BattleContext::rehydrate(&state, &catalog, RulesConfig::default())
            .await
            .unwrap();

        assert!(context.card("4").is_some());
        assert!(context.card("58").is_some(), "discarded cards are rehydrated too");
    }

    #[tokio::test]
    async fn test_rehydrate_reports_missing_cards() {
        let catalog = InMemoryCatalog::bundled().unwrap();
        let state = state_with(&[("4", "player_0"), ("nope", "ai_0")]);

        let result = BattleContext::rehydrate(&state, &catalog, RulesConfig::default()).await;

        match result {
            Err(PveError::Integrity(IntegrityError::MissingCards(ids))) => {
                assert_eq!(ids, vec!["nope".to_string()])
            }
            other => panic!("expected missing cards, got {:?}", other.map(|_| ())),
        }
    }

    #[tokio::test]
    async fn test_integrity_rejects_duplicate_instances() {
        let catalog = InMemoryCatalog::bundled().unwrap();
        let state = state_with(&[("4", "player_0"), ("58", "player_0")]);

        let result = BattleContext::rehydrate(&state, &catalog, RulesConfig::default()).await;

        assert!(matches!(
            result,
            Err(PveError::Integrity(IntegrityError::DuplicateInstance(_)))
        ));
    }

    #[test]
    fn test_integrity_rejects_hp_above_max() {
        let catalog = InMemoryCatalog::bundled().unwrap();
        let pikachu = catalog.get("58").unwrap().clone();
        let context = BattleContext::with_cards([pikachu], RulesConfig::default());
        let mut state = state_with(&[("58", "player_0")]);
        state.hp_by_iid.insert("player_0".to_string(), 41);

        assert_eq!(
            context.validate_integrity(&state),
            Err(IntegrityError::HpOutOfRange {
                iid: "player_0".to_string(),
                hp: 41,
                max_hp: 40
            })
        );
    }

    #[test]
    fn test_integrity_rejects_wrong_bench_size() {
        let context = BattleContext::with_cards(Vec::new(), RulesConfig::default());
        let mut state = state_with(&[]);
        state.ai.bench.push(None);

        assert_eq!(
            context.validate_integrity(&state),
            Err(IntegrityError::BenchSize {
                expected: 3,
                found: 4
            })
        );
    }

    #[test]
    fn test_current_hp_defaults_to_max() {
        let catalog = InMemoryCatalog::bundled().unwrap();
        let context =
            BattleContext::with_cards([catalog.get("58").unwrap().clone()], RulesConfig::default());
        let mut state = state_with(&[("58", "player_0")]);
        assert_eq!(context.current_hp(&state, "58", "player_0"), 40);
        state.hp_by_iid.insert("player_0".to_string(), 15);
        assert_eq!(context.current_hp(&state, "58", "player_0"), 15);
    }
}
