use crate::battle::context::BattleContext;
use crate::battle::legal_moves::legal_moves;
use crate::battle::state::{BattleState, CardRef, Phase, Side, SideZones};
use crate::config::RulesConfig;
use crate::errors::RuleResult;
use schema::{Attack, CardTemplate, Element, Resistance, Weakness};

/// A builder for card templates with test-friendly defaults.
///
/// # Example
/// ```
/// let pikachu = TestCardBuilder::new("58", Element::Lightning, 40)
///     .with_attack("Gnaw", 10, vec![])
///     .with_weakness(Element::Fighting)
///     .build();
/// ```
pub struct TestCardBuilder {
    template: CardTemplate,
}

impl TestCardBuilder {
    pub fn new(id: &str, element: Element, hp: u32) -> Self {
        Self {
            template: CardTemplate {
                id: id.to_string(),
                tcg_id: format!("test-{}", id),
                name: format!("Card {}", id),
                element,
                hp,
                attacks: Vec::new(),
                weaknesses: Vec::new(),
                resistances: Vec::new(),
                rarity: "Common".to_string(),
                image: String::new(),
            },
        }
    }

    pub fn named(mut self, name: &str) -> Self {
        self.template.name = name.to_string();
        self
    }

    pub fn with_attack(mut self, name: &str, damage: u32, cost: Vec<Element>) -> Self {
        self.template.attacks.push(Attack {
            name: name.to_string(),
            damage,
            cost,
            description: None,
        });
        self
    }

    pub fn with_weakness(mut self, element: Element) -> Self {
        self.template.weaknesses.push(Weakness {
            element,
            value: "×2".to_string(),
        });
        self
    }

    pub fn with_resistance(mut self, element: Element, value: &str) -> Self {
        self.template.resistances.push(Resistance {
            element,
            value: value.to_string(),
        });
        self
    }

    pub fn build(self) -> CardTemplate {
        self.template
    }
}

/// The small card pool scenario tests play with.
///
/// - `"4"` Charmeleon, Fire, 60 HP: Ember 50 for one Fire energy.
/// - `"58"` Pikachu, Lightning, 40 HP: Gnaw 10 for free, Thunder Jolt 30 for two Lightning.
/// - `"7"` Squirtle, Water, 50 HP: Bubble 10 for one Water. Weak to Lightning.
/// - `"74"` Geodude, Fighting, 70 HP: Tackle 20 for free. Resists Lightning by 30.
/// - `"150"` Mewtwo, Psychic, 160 HP: Psychic 60 for three Psychic.
/// - `"0"` Magikarp, Water, 30 HP: Splash 0 for free.
pub fn sample_cards() -> Vec<CardTemplate> {
    vec![
        TestCardBuilder::new("4", Element::Fire, 60)
            .named("Charmeleon")
            .with_attack("Ember", 50, vec![Element::Fire])
            .with_weakness(Element::Water)
            .build(),
        TestCardBuilder::new("58", Element::Lightning, 40)
            .named("Pikachu")
            .with_attack("Gnaw", 10, vec![])
            .with_attack("Thunder Jolt", 30, vec![Element::Lightning, Element::Lightning])
            .with_weakness(Element::Fighting)
            .build(),
        TestCardBuilder::new("7", Element::Water, 50)
            .named("Squirtle")
            .with_attack("Bubble", 10, vec![Element::Water])
            .with_weakness(Element::Lightning)
            .build(),
        TestCardBuilder::new("74", Element::Fighting, 70)
            .named("Geodude")
            .with_attack("Tackle", 20, vec![])
            .with_resistance(Element::Lightning, "-30")
            .build(),
        TestCardBuilder::new("150", Element::Psychic, 160)
            .named("Mewtwo")
            .with_attack(
                "Psychic",
                60,
                vec![Element::Psychic, Element::Psychic, Element::Psychic],
            )
            .build(),
        TestCardBuilder::new("0", Element::Water, 30)
            .named("Magikarp")
            .with_attack("Splash", 0, vec![])
            .build(),
    ]
}

pub fn sample_context() -> BattleContext {
    BattleContext::with_cards(sample_cards(), RulesConfig::default())
}

/// Builds a battle state directly, bypassing setup.
///
/// Defaults to turn 1 of `PLAYER_TURN` with `"4"` as the player active (`p1`),
/// `"58"` as the AI active (`a1`), empty hands and benches, and two cards in
/// each deck.
pub struct TestBattleBuilder {
    state: BattleState,
}

impl Default for TestBattleBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl TestBattleBuilder {
    pub fn new() -> Self {
        let rules = RulesConfig::default();
        let mut state = BattleState::new(
            "test_battle".to_string(),
            Side::Player,
            rules.bench_size,
            rules.prizes_to_win,
        );
        state.phase = Phase::PlayerTurn;
        state.player.active = Some(CardRef::new("4", "p1"));
        state.ai.active = Some(CardRef::new("58", "a1"));
        state.player.deck = vec![CardRef::new("7", "p_d0"), CardRef::new("7", "p_d1")];
        state.ai.deck = vec![CardRef::new("7", "a_d0"), CardRef::new("7", "a_d1")];
        Self { state }
    }

    pub fn default_context() -> BattleContext {
        sample_context()
    }

    /// Fresh preparation phase: no actives, three cards in each hand.
    pub fn preparation(mut self) -> Self {
        self.state.phase = Phase::Preparation;
        self.state.player.active = None;
        self.state.ai.active = None;
        self.with_player_hand(&["4", "58", "7"])
            .with_ai_hand(&["58", "74", "7"])
    }

    pub fn with_phase(mut self, phase: Phase) -> Self {
        self.state.phase = phase;
        self
    }

    pub fn with_first_player(mut self, side: Side) -> Self {
        self.state.first_player = side;
        self
    }

    pub fn with_turn(mut self, turn: u32) -> Self {
        self.state.turn = turn;
        self
    }

    pub fn with_player_active(mut self, id: &str) -> Self {
        self.state.player.active = Some(CardRef::new(id, "p1"));
        self
    }

    pub fn with_ai_active(mut self, id: &str) -> Self {
        self.state.ai.active = Some(CardRef::new(id, "a1"));
        self
    }

    pub fn without_active(mut self, side: Side) -> Self {
        self.state.zones_mut(side).active = None;
        self
    }

    /// Bench card ids are `p_b{position}`.
    pub fn with_player_bench(mut self, position: usize, id: &str) -> Self {
        self.state.player.bench[position] = Some(CardRef::new(id, format!("p_b{}", position)));
        self
    }

    /// Bench card ids are `a_b{position}`.
    pub fn with_ai_bench(mut self, position: usize, id: &str) -> Self {
        self.state.ai.bench[position] = Some(CardRef::new(id, format!("a_b{}", position)));
        self
    }

    /// Hand card ids are `p_h{index}`.
    pub fn with_player_hand(mut self, ids: &[&str]) -> Self {
        self.state.player.hand = refs(ids, "p_h");
        self
    }

    /// Hand card ids are `a_h{index}`.
    pub fn with_ai_hand(mut self, ids: &[&str]) -> Self {
        self.state.ai.hand = refs(ids, "a_h");
        self
    }

    pub fn with_deck(mut self, side: Side, ids: &[&str]) -> Self {
        let prefix = match side {
            Side::Player => "p_d",
            Side::Ai => "a_d",
        };
        self.state.zones_mut(side).deck = refs(ids, prefix);
        self
    }

    pub fn with_hp(mut self, iid: &str, hp: u32) -> Self {
        self.state.hp_by_iid.insert(iid.to_string(), hp);
        self
    }

    pub fn with_energy(mut self, iid: &str, energy: Vec<Element>) -> Self {
        self.state.energies.insert(iid.to_string(), energy);
        self
    }

    pub fn with_prizes(mut self, player: u8, ai: u8) -> Self {
        self.state.prizes.player = player;
        self.state.prizes.ai = ai;
        self
    }

    pub fn with_zones(mut self, side: Side, zones: SideZones) -> Self {
        *self.state.zones_mut(side) = zones;
        self
    }

    pub fn build(self) -> BattleState {
        let mut state = self.state;
        state.legal_moves = legal_moves(&state, &sample_context());
        state
    }
}

fn refs(ids: &[&str], prefix: &str) -> Vec<CardRef> {
    ids.iter()
        .enumerate()
        .map(|(index, id)| CardRef::new(*id, format!("{}{}", prefix, index)))
        .collect()
}

/// Asserts that a rule result is Ok and returns the value.
pub fn assert_applied<T>(result: RuleResult<T>) -> T {
    match result {
        Ok(value) => value,
        Err(violation) => panic!("Expected action to apply but got: {}", violation),
    }
}

/// Asserts that no instance id appears in two zones and every HP is in range.
pub fn assert_state_invariants(state: &BattleState, context: &BattleContext) {
    if let Err(error) = context.validate_integrity(state) {
        panic!("integrity violated: {}", error);
    }
    for side in Side::BOTH {
        if let Some(active) = &state.zones(side).active {
            assert!(
                context.current_hp(state, &active.id, &active.iid) > 0,
                "{} active {} sits at 0 HP",
                side,
                active.iid
            );
        }
    }
}
