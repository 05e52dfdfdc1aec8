use crate::battle::state::Side;
use crate::errors::{RuleResult, RuleViolation};
use schema::Element;
use serde::{Deserialize, Serialize};

/// A move either side can submit.
///
/// On the wire this is a tagged object such as
/// `{"type":"ATTACK","side":"PLAYER","attackerIid":"player_0","targetIid":"ai_2","attackIndex":0}`.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(
    tag = "type",
    rename_all = "SCREAMING_SNAKE_CASE",
    rename_all_fields = "camelCase"
)]
pub enum BattleAction {
    PlaceActive {
        side: Side,
        card_iid: String,
    },
    PlaceBench {
        side: Side,
        card_iid: String,
        position: usize,
    },
    PromoteFromBench {
        side: Side,
        card_iid: String,
        bench_position: usize,
    },
    AttachEnergy {
        side: Side,
        card_iid: String,
        energy_type: Element,
    },
    Attack {
        side: Side,
        attacker_iid: String,
        target_iid: String,
        attack_index: usize,
    },
    Retreat {
        side: Side,
        bench_position: usize,
    },
    EndTurn {
        side: Side,
    },
    Concede {
        side: Side,
    },
}

impl BattleAction {
    /// Parses an inbound action, mapping any decode failure to a rule violation.
    pub fn from_json(text: &str) -> RuleResult<Self> {
        serde_json::from_str(text).map_err(|e| RuleViolation::MalformedAction(e.to_string()))
    }

    pub fn from_value(value: serde_json::Value) -> RuleResult<Self> {
        serde_json::from_value(value).map_err(|e| RuleViolation::MalformedAction(e.to_string()))
    }

    pub fn side(&self) -> Side {
        match self {
            BattleAction::PlaceActive { side, .. }
            | BattleAction::PlaceBench { side, .. }
            | BattleAction::PromoteFromBench { side, .. }
            | BattleAction::AttachEnergy { side, .. }
            | BattleAction::Attack { side, .. }
            | BattleAction::Retreat { side, .. }
            | BattleAction::EndTurn { side }
            | BattleAction::Concede { side } => *side,
        }
    }

    /// Wire name of the action kind, for logs.
    pub fn kind(&self) -> &'static str {
        match self {
            BattleAction::PlaceActive { .. } => "PLACE_ACTIVE",
            BattleAction::PlaceBench { .. } => "PLACE_BENCH",
            BattleAction::PromoteFromBench { .. } => "PROMOTE_FROM_BENCH",
            BattleAction::AttachEnergy { .. } => "ATTACH_ENERGY",
            BattleAction::Attack { .. } => "ATTACK",
            BattleAction::Retreat { .. } => "RETREAT",
            BattleAction::EndTurn { .. } => "END_TURN",
            BattleAction::Concede { .. } => "CONCEDE",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_attack_wire_shape() {
        let action = BattleAction::Attack {
            side: Side::Player,
            attacker_iid: "player_0".to_string(),
            target_iid: "ai_2".to_string(),
            attack_index: 1,
        };
        let json = serde_json::to_value(&action).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "type": "ATTACK",
                "side": "PLAYER",
                "attackerIid": "player_0",
                "targetIid": "ai_2",
                "attackIndex": 1
            })
        );
    }

    #[test]
    fn test_energy_type_is_case_insensitive() {
        let action = BattleAction::from_json(
            r#"{"type":"ATTACH_ENERGY","side":"PLAYER","cardIid":"player_1","energyType":"fire"}"#,
        )
        .unwrap();
        assert_eq!(
            action,
            BattleAction::AttachEnergy {
                side: Side::Player,
                card_iid: "player_1".to_string(),
                energy_type: Element::Fire,
            }
        );
    }

    #[test]
    fn test_unknown_type_is_malformed() {
        let result = BattleAction::from_json(r#"{"type":"DRAW_CARD","side":"PLAYER"}"#);
        assert!(matches!(result, Err(RuleViolation::MalformedAction(_))));
    }

    #[test]
    fn test_unknown_energy_is_malformed() {
        let result = BattleAction::from_json(
            r#"{"type":"ATTACH_ENERGY","side":"AI","cardIid":"ai_0","energyType":"plasma"}"#,
        );
        assert!(matches!(result, Err(RuleViolation::MalformedAction(_))));
    }

    #[test]
    fn test_side_accessor() {
        assert_eq!(BattleAction::EndTurn { side: Side::Ai }.side(), Side::Ai);
        assert_eq!(BattleAction::Concede { side: Side::Player }.kind(), "CONCEDE");
    }
}
