#[cfg(test)]
mod tests {
    use crate::battle::action::BattleAction;
    use crate::battle::engine::{apply_action, try_apply_action};
    use crate::battle::outcome::is_battle_ended;
    use crate::battle::setup::initialize_battle;
    use crate::battle::state::{BattleState, Phase};
    use crate::battle::tests::common::{assert_state_invariants, sample_context};
    use crate::errors::RuleViolation;
    use rand::rngs::StdRng;
    use rand::seq::IndexedRandom;
    use rand::SeedableRng;

    const WALKS: u64 = 40;
    const MAX_STEPS: usize = 300;

    fn start(seed: u64) -> BattleState {
        let context = sample_context();
        let deck: Vec<String> = ["4", "58", "7", "74", "150", "0", "7", "58", "4", "74"]
            .iter()
            .map(|id| id.to_string())
            .collect();
        initialize_battle(
            format!("walk_{}", seed),
            &deck,
            &deck,
            &context,
            &mut StdRng::seed_from_u64(seed),
        )
        .unwrap()
    }

    #[test]
    fn test_random_legal_walks_preserve_invariants() {
        let context = sample_context();

        for seed in 0..WALKS {
            let mut rng = StdRng::seed_from_u64(seed);
            let mut state = start(seed);

            for _ in 0..MAX_STEPS {
                assert_state_invariants(&state, &context);
                assert_eq!(
                    is_battle_ended(&state),
                    state.phase == Phase::Ended,
                    "seed {}: loss condition reached without ending the battle",
                    seed
                );
                if state.phase == Phase::Ended {
                    break;
                }

                let action = state
                    .legal_moves
                    .choose(&mut rng)
                    .cloned()
                    .unwrap_or_else(|| panic!("seed {}: no legal moves in {:?}", seed, state.phase));
                state = apply_action(&state, &action, &context)
                    .unwrap_or_else(|| panic!("seed {}: listed move {:?} was rejected", seed, action));
            }
        }
    }

    #[test]
    fn test_forced_promotion_holds_on_random_walks() {
        let context = sample_context();

        for seed in 0..WALKS {
            let mut rng = StdRng::seed_from_u64(seed + 1_000);
            let mut state = start(seed);

            for _ in 0..MAX_STEPS {
                if state.phase == Phase::Ended {
                    break;
                }
                if let Some(request) = state.flags.needs_bench_promotion {
                    let side = request.side;
                    let blocked = [
                        BattleAction::EndTurn { side },
                        BattleAction::Retreat {
                            side,
                            bench_position: 0,
                        },
                    ];
                    for candidate in blocked {
                        let result = try_apply_action(&state, &candidate, &context);
                        if state.phase.acting_side() == Some(side) {
                            assert_eq!(
                                result.err(),
                                Some(RuleViolation::PromotionPending),
                                "seed {}: {:?} slipped past a pending promotion",
                                seed,
                                candidate
                            );
                        } else {
                            assert!(result.is_err(), "seed {}: off-turn {:?} applied", seed, candidate);
                        }
                    }
                    assert!(state
                        .legal_moves
                        .iter()
                        .filter(|action| action.side() == side)
                        .all(|action| matches!(action, BattleAction::PromoteFromBench { .. })));
                }

                let Some(action) = state.legal_moves.choose(&mut rng).cloned() else {
                    break;
                };
                state = apply_action(&state, &action, &context).unwrap_or(state);
            }
        }
    }

    #[test]
    fn test_walks_eventually_finish_when_sides_keep_attacking() {
        let context = sample_context();
        let mut finished = 0;

        for seed in 0..WALKS {
            let mut rng = StdRng::seed_from_u64(seed + 2_000);
            let mut state = start(seed);

            for _ in 0..MAX_STEPS {
                if state.phase == Phase::Ended {
                    finished += 1;
                    break;
                }
                let preferred = state
                    .legal_moves
                    .iter()
                    .find(|action| matches!(action, BattleAction::Attack { .. }))
                    .cloned();
                let Some(action) = preferred.or_else(|| state.legal_moves.choose(&mut rng).cloned())
                else {
                    break;
                };
                state = apply_action(&state, &action, &context).unwrap_or(state);
            }
        }

        assert!(finished > 0, "no walk reached an end state");
    }
}
