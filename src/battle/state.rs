use crate::battle::action::BattleAction;
use crate::battle::context::BattleContext;
use schema::Element;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Side {
    Player,
    Ai,
}

impl Side {
    pub const BOTH: [Side; 2] = [Side::Player, Side::Ai];

    pub fn opponent(self) -> Side {
        match self {
            Side::Player => Side::Ai,
            Side::Ai => Side::Player,
        }
    }

    /// The phase in which this side holds the turn.
    pub fn turn_phase(self) -> Phase {
        match self {
            Side::Player => Phase::PlayerTurn,
            Side::Ai => Phase::AiTurn,
        }
    }

    /// Prefix used when minting instance ids for this side's cards.
    pub fn iid_prefix(self) -> &'static str {
        match self {
            Side::Player => "player",
            Side::Ai => "ai",
        }
    }
}

impl fmt::Display for Side {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Side::Player => write!(f, "PLAYER"),
            Side::Ai => write!(f, "AI"),
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Phase {
    Preparation,
    PlayerTurn,
    AiTurn,
    Ended,
}

impl Phase {
    /// The side holding the turn, if the battle is in a turn phase.
    pub fn acting_side(self) -> Option<Side> {
        match self {
            Phase::PlayerTurn => Some(Side::Player),
            Phase::AiTurn => Some(Side::Ai),
            Phase::Preparation | Phase::Ended => None,
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Winner {
    Player,
    Ai,
    Draw,
}

impl From<Side> for Winner {
    fn from(side: Side) -> Self {
        match side {
            Side::Player => Winner::Player,
            Side::Ai => Winner::Ai,
        }
    }
}

/// A reference to one physical card in this battle.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq, Hash)]
pub struct CardRef {
    /// Catalog template id.
    pub id: String,
    /// Instance id, unique within the battle.
    pub iid: String,
}

impl CardRef {
    pub fn new(id: impl Into<String>, iid: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            iid: iid.into(),
        }
    }
}

/// Where a card sits on one side of the table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Zone {
    Active,
    Bench(usize),
    Hand,
    Deck,
    Discard,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq, Default)]
pub struct SideZones {
    pub active: Option<CardRef>,
    /// Fixed length; `None` is an empty slot.
    pub bench: Vec<Option<CardRef>>,
    pub hand: Vec<CardRef>,
    /// Front is the next draw.
    pub deck: Vec<CardRef>,
    pub discard: Vec<CardRef>,
}

impl SideZones {
    pub fn new(bench_size: usize) -> Self {
        Self {
            bench: vec![None; bench_size],
            ..Self::default()
        }
    }

    pub fn bench_occupants(&self) -> impl Iterator<Item = (usize, &CardRef)> {
        self.bench
            .iter()
            .enumerate()
            .filter_map(|(position, slot)| slot.as_ref().map(|card| (position, card)))
    }

    pub fn has_bench_occupant(&self) -> bool {
        self.bench.iter().any(Option::is_some)
    }

    pub fn first_empty_bench_slot(&self) -> Option<usize> {
        self.bench.iter().position(Option::is_none)
    }

    pub fn hand_card(&self, iid: &str) -> Option<&CardRef> {
        self.hand.iter().find(|card| card.iid == iid)
    }

    /// The active card and bench occupants, active first.
    pub fn in_play(&self) -> impl Iterator<Item = &CardRef> {
        self.active
            .iter()
            .chain(self.bench.iter().filter_map(Option::as_ref))
    }

    /// Every card reference on this side, in zone order.
    pub fn all_cards(&self) -> impl Iterator<Item = &CardRef> {
        self.in_play()
            .chain(self.hand.iter())
            .chain(self.deck.iter())
            .chain(self.discard.iter())
    }

    /// Locates an instance on this side.
    pub fn locate(&self, iid: &str) -> Option<(Zone, &CardRef)> {
        if let Some(card) = self.active.as_ref().filter(|c| c.iid == iid) {
            return Some((Zone::Active, card));
        }
        if let Some((position, card)) = self.bench_occupants().find(|(_, c)| c.iid == iid) {
            return Some((Zone::Bench(position), card));
        }
        let lists = [
            (Zone::Hand, &self.hand),
            (Zone::Deck, &self.deck),
            (Zone::Discard, &self.discard),
        ];
        lists.into_iter().find_map(|(zone, cards)| {
            cards.iter().find(|c| c.iid == iid).map(|card| (zone, card))
        })
    }
}

/// Knockouts each side still needs before it wins.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
pub struct Prizes {
    pub player: u8,
    pub ai: u8,
}

impl Prizes {
    pub fn new(prizes_to_win: u8) -> Self {
        Self {
            player: prizes_to_win,
            ai: prizes_to_win,
        }
    }

    pub fn remaining(&self, side: Side) -> u8 {
        match side {
            Side::Player => self.player,
            Side::Ai => self.ai,
        }
    }

    pub fn remaining_mut(&mut self, side: Side) -> &mut u8 {
        match side {
            Side::Player => &mut self.player,
            Side::Ai => &mut self.ai,
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PromotionReason {
    Knockout,
}

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
pub struct PromotionRequest {
    pub side: Side,
    pub reason: PromotionReason,
}

/// Markers scoped to the current turn, plus the forced-promotion flag.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq, Default)]
pub struct TurnFlags {
    pub has_attacked_this_turn: bool,
    pub has_attached_energy_this_turn: bool,
    pub has_retreated_this_turn: bool,
    /// Cards placed or promoted into an active slot this turn. They cannot attack yet.
    pub entered_active_this_turn: Vec<String>,
    /// Set when a knockout empties an active slot while the bench is occupied.
    /// Survives turn changes until the named side promotes.
    pub needs_bench_promotion: Option<PromotionRequest>,
}

impl TurnFlags {
    /// Clears every per-turn marker, keeping a pending promotion.
    pub fn reset_for_new_turn(&mut self) {
        *self = Self {
            needs_bench_promotion: self.needs_bench_promotion,
            ..Self::default()
        };
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub enum BattleEvent {
    // Setup & placement
    ActivePlaced { side: Side, card: CardRef },
    Benched { side: Side, card: CardRef, position: usize },
    Promoted { side: Side, card: CardRef, position: usize },
    PreparationComplete { first_player: Side },

    // Energy & combat
    EnergyAttached { side: Side, card: CardRef, element: Element },
    AttackUsed {
        side: Side,
        attacker: CardRef,
        target: CardRef,
        attack_index: usize,
        damage: u32,
        remaining_hp: u32,
    },
    KnockedOut { side: Side, card: CardRef },
    PromotionRequired { side: Side },
    Retreated {
        side: Side,
        outgoing: CardRef,
        incoming: CardRef,
        energy_spent: usize,
    },

    // Turn management
    TurnEnded { side: Side },
    TurnStarted { side: Side, turn: u32 },
    CardDrawn { side: Side, card: CardRef },
    DeckOut { side: Side },

    // Battle end
    Conceded { side: Side },
    BattleEnded { winner: Winner },
}

impl BattleEvent {
    /// Human readable text for this event, or `None` for silent bookkeeping events.
    pub fn format(&self, context: &BattleContext) -> Option<String> {
        let name = |card: &CardRef| {
            context
                .card(&card.id)
                .map(|template| template.name.clone())
                .unwrap_or_else(|| card.iid.clone())
        };

        match self {
            BattleEvent::ActivePlaced { side, card } => {
                Some(format!("{} sent out {}!", side, name(card)))
            }
            BattleEvent::Benched { side, card, position } => Some(format!(
                "{} placed {} on bench slot {}.",
                side,
                name(card),
                position + 1
            )),
            BattleEvent::Promoted { side, card, .. } => {
                Some(format!("{} promoted {} to the active spot!", side, name(card)))
            }
            BattleEvent::PreparationComplete { first_player } => {
                Some(format!("Both sides are ready. {} goes first.", first_player))
            }
            BattleEvent::EnergyAttached { card, element, .. } => {
                Some(format!("{} energy attached to {}.", element, name(card)))
            }
            BattleEvent::AttackUsed {
                attacker,
                target,
                attack_index,
                damage,
                remaining_hp,
                ..
            } => {
                let attack_name = context
                    .card(&attacker.id)
                    .and_then(|template| template.attack(*attack_index))
                    .map(|attack| attack.name.clone())
                    .unwrap_or_else(|| format!("attack #{}", attack_index));
                Some(format!(
                    "{} used {}! {} took {} damage ({} HP left).",
                    name(attacker),
                    attack_name,
                    name(target),
                    damage,
                    remaining_hp
                ))
            }
            BattleEvent::KnockedOut { card, .. } => Some(format!("{} was knocked out!", name(card))),
            BattleEvent::PromotionRequired { side } => {
                Some(format!("{} must promote a benched Pokemon.", side))
            }
            BattleEvent::Retreated {
                outgoing, incoming, ..
            } => Some(format!(
                "{} retreated. {} is now active.",
                name(outgoing),
                name(incoming)
            )),
            BattleEvent::TurnEnded { .. } => None,
            BattleEvent::TurnStarted { side, turn } => {
                Some(format!("Turn {}: {} to move.", turn, side))
            }
            BattleEvent::CardDrawn { .. } => None,
            BattleEvent::DeckOut { side } => Some(format!("{} has no cards left to draw!", side)),
            BattleEvent::Conceded { side } => Some(format!("{} conceded.", side)),
            BattleEvent::BattleEnded { winner } => Some(match winner {
                Winner::Draw => "The battle ended in a draw.".to_string(),
                Winner::Player => "The battle is over. PLAYER wins!".to_string(),
                Winner::Ai => "The battle is over. AI wins!".to_string(),
            }),
        }
    }
}

/// Collects the events raised while applying actions.
#[derive(Debug, Clone, Default)]
pub struct EventBus {
    events: Vec<BattleEvent>,
}

impl EventBus {
    pub fn new() -> Self {
        Self { events: Vec::new() }
    }

    pub fn push(&mut self, event: BattleEvent) {
        self.events.push(event);
    }

    pub fn events(&self) -> &[BattleEvent] {
        &self.events
    }

    pub fn extend(&mut self, other: EventBus) {
        self.events.extend(other.events);
    }

    /// Emits every formatted event through `tracing` at debug level.
    pub fn trace_formatted(&self, context: &BattleContext) {
        for event in &self.events {
            match event.format(context) {
                Some(text) => tracing::debug!(target: "battle_events", "{}", text),
                None => tracing::trace!(target: "battle_events", event = ?event, "silent event"),
            }
        }
    }

    /// Formatted text of every non-silent event, in order.
    pub fn formatted(&self, context: &BattleContext) -> Vec<String> {
        self.events.iter().filter_map(|e| e.format(context)).collect()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }
}

impl fmt::Display for EventBus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for event in &self.events {
            writeln!(f, "  {:?}", event)?;
        }
        Ok(())
    }
}

/// One battle's exact progress. Holds identifiers and numbers only; catalog
/// attributes come from the [`BattleContext`].
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct BattleState {
    pub battle_id: String,
    pub phase: Phase,
    pub turn: u32,
    pub first_player: Side,
    pub winner: Option<Winner>,
    pub player: SideZones,
    pub ai: SideZones,
    pub prizes: Prizes,
    /// Current HP per instance. A missing entry means full HP.
    pub hp_by_iid: BTreeMap<String, u32>,
    /// Energy attached to each instance, in attachment order.
    pub energies: BTreeMap<String, Vec<Element>>,
    pub can_attack_this_turn: bool,
    pub legal_moves: Vec<BattleAction>,
    pub flags: TurnFlags,
}

impl BattleState {
    pub fn new(battle_id: String, first_player: Side, bench_size: usize, prizes_to_win: u8) -> Self {
        Self {
            battle_id,
            phase: Phase::Preparation,
            turn: 1,
            first_player,
            winner: None,
            player: SideZones::new(bench_size),
            ai: SideZones::new(bench_size),
            prizes: Prizes::new(prizes_to_win),
            hp_by_iid: BTreeMap::new(),
            energies: BTreeMap::new(),
            can_attack_this_turn: true,
            legal_moves: Vec::new(),
            flags: TurnFlags::default(),
        }
    }

    pub fn zones(&self, side: Side) -> &SideZones {
        match side {
            Side::Player => &self.player,
            Side::Ai => &self.ai,
        }
    }

    pub fn zones_mut(&mut self, side: Side) -> &mut SideZones {
        match side {
            Side::Player => &mut self.player,
            Side::Ai => &mut self.ai,
        }
    }

    /// Finds an instance anywhere on the table.
    pub fn locate(&self, iid: &str) -> Option<(Side, Zone, &CardRef)> {
        Side::BOTH.into_iter().find_map(|side| {
            self.zones(side)
                .locate(iid)
                .map(|(zone, card)| (side, zone, card))
        })
    }

    /// Every card reference in every zone of both sides.
    pub fn all_cards(&self) -> impl Iterator<Item = &CardRef> {
        self.player.all_cards().chain(self.ai.all_cards())
    }

    pub fn energy_attached(&self, iid: &str) -> &[Element] {
        self.energies.get(iid).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Attached energy on `iid` that matches `element`.
    pub fn matching_energy(&self, iid: &str, element: Element) -> usize {
        self.energy_attached(iid)
            .iter()
            .filter(|attached| **attached == element)
            .count()
    }

    pub fn entered_active_this_turn(&self, iid: &str) -> bool {
        self.flags.entered_active_this_turn.iter().any(|e| e == iid)
    }
}

#[cfg(test)]
mod event_formatting_tests {
    use super::*;
    use crate::battle::tests::common::{sample_context, TestCardBuilder};
    use schema::Element;

    #[test]
    fn test_silent_events_return_none() {
        let context = sample_context();
        assert_eq!(BattleEvent::TurnEnded { side: Side::Player }.format(&context), None);
        let drawn = BattleEvent::CardDrawn {
            side: Side::Ai,
            card: CardRef::new("58", "ai_0"),
        };
        assert_eq!(drawn.format(&context), None);
    }

    #[test]
    fn test_attack_event_names_cards_and_attack() {
        let context = BattleContext::with_cards(
            [
                TestCardBuilder::new("4", Element::Fire, 60)
                    .named("Charmeleon")
                    .with_attack("Flamethrower", 50, vec![Element::Fire])
                    .build(),
                TestCardBuilder::new("58", Element::Lightning, 40).named("Pikachu").build(),
            ],
            Default::default(),
        );
        let event = BattleEvent::AttackUsed {
            side: Side::Player,
            attacker: CardRef::new("4", "p1"),
            target: CardRef::new("58", "a1"),
            attack_index: 0,
            damage: 30,
            remaining_hp: 10,
        };
        assert_eq!(
            event.format(&context).as_deref(),
            Some("Charmeleon used Flamethrower! Pikachu took 30 damage (10 HP left).")
        );
    }

    #[test]
    fn test_unknown_template_falls_back_to_instance_id() {
        let context = BattleContext::with_cards(Vec::new(), Default::default());
        let event = BattleEvent::KnockedOut {
            side: Side::Ai,
            card: CardRef::new("missing", "ai_3"),
        };
        assert_eq!(event.format(&context).as_deref(), Some("ai_3 was knocked out!"));
    }

    #[test]
    fn test_event_bus_collects_in_order() {
        let context = sample_context();
        let mut bus = EventBus::new();
        bus.push(BattleEvent::TurnStarted { side: Side::Ai, turn: 2 });
        bus.push(BattleEvent::TurnEnded { side: Side::Ai });
        bus.push(BattleEvent::Conceded { side: Side::Ai });
        assert_eq!(bus.len(), 3);
        assert_eq!(
            bus.formatted(&context),
            vec!["Turn 2: AI to move.".to_string(), "AI conceded.".to_string()]
        );
    }

    #[test]
    fn test_reset_for_new_turn_keeps_pending_promotion() {
        let mut flags = TurnFlags {
            has_attacked_this_turn: true,
            has_attached_energy_this_turn: true,
            has_retreated_this_turn: true,
            entered_active_this_turn: vec!["p1".to_string()],
            needs_bench_promotion: Some(PromotionRequest {
                side: Side::Player,
                reason: PromotionReason::Knockout,
            }),
        };
        flags.reset_for_new_turn();
        assert!(!flags.has_attacked_this_turn);
        assert!(flags.entered_active_this_turn.is_empty());
        assert!(flags.needs_bench_promotion.is_some());
    }

    #[test]
    fn test_locate_finds_every_zone() {
        let mut zones = SideZones::new(3);
        zones.active = Some(CardRef::new("4", "p0"));
        zones.bench[2] = Some(CardRef::new("4", "p1"));
        zones.hand.push(CardRef::new("4", "p2"));
        zones.deck.push(CardRef::new("4", "p3"));
        zones.discard.push(CardRef::new("4", "p4"));
        assert_eq!(zones.locate("p0").map(|(z, _)| z), Some(Zone::Active));
        assert_eq!(zones.locate("p1").map(|(z, _)| z), Some(Zone::Bench(2)));
        assert_eq!(zones.locate("p2").map(|(z, _)| z), Some(Zone::Hand));
        assert_eq!(zones.locate("p3").map(|(z, _)| z), Some(Zone::Deck));
        assert_eq!(zones.locate("p4").map(|(z, _)| z), Some(Zone::Discard));
        assert_eq!(zones.locate("p5"), None);
    }
}
