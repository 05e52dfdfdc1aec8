use crate::Element;
use serde::{Deserialize, Serialize};

/// Damage removed by a resistance whose printed value carries no number.
pub const DEFAULT_RESISTANCE_REDUCTION: u32 = 20;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Attack {
    pub name: String,
    pub damage: u32,
    /// One entry per energy symbol printed on the card.
    pub cost: Vec<Element>,
    #[serde(default)]
    pub description: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Weakness {
    pub element: Element,
    /// Printed value, e.g. "×2". The engine always doubles.
    pub value: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Resistance {
    pub element: Element,
    /// Printed value, e.g. "-30".
    pub value: String,
}

impl Resistance {
    /// The flat damage reduction this resistance grants.
    ///
    /// Reads the first run of digits in the printed value, ignoring any sign,
    /// so both "-30" and "−30" reduce by 30. Falls back to
    /// [`DEFAULT_RESISTANCE_REDUCTION`] when no digits are printed, and
    /// saturates at `u32::MAX` for numbers too long to fit.
    pub fn reduction(&self) -> u32 {
        let mut digits = self
            .value
            .chars()
            .skip_while(|c| !c.is_ascii_digit())
            .map_while(|c| c.to_digit(10))
            .peekable();
        if digits.peek().is_none() {
            return DEFAULT_RESISTANCE_REDUCTION;
        }
        digits.fold(0u32, |total, digit| {
            total.saturating_mul(10).saturating_add(digit)
        })
    }
}

/// Static, shared definition of a card. Battles only ever reference these by `id`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CardTemplate {
    pub id: String,
    #[serde(default)]
    pub tcg_id: String,
    pub name: String,
    pub element: Element,
    pub hp: u32,
    pub attacks: Vec<Attack>,
    #[serde(default)]
    pub weaknesses: Vec<Weakness>,
    #[serde(default)]
    pub resistances: Vec<Resistance>,
    #[serde(default)]
    pub rarity: String,
    #[serde(default)]
    pub image: String,
}

impl CardTemplate {
    pub fn attack(&self, index: usize) -> Option<&Attack> {
        self.attacks.get(index)
    }

    pub fn weakness_to(&self, element: Element) -> Option<&Weakness> {
        self.weaknesses.iter().find(|w| w.element == element)
    }

    pub fn resistance_to(&self, element: Element) -> Option<&Resistance> {
        self.resistances.iter().find(|r| r.element == element)
    }

    /// Largest energy cost over all printed attacks.
    pub fn max_attack_cost(&self) -> usize {
        self.attacks.iter().map(|a| a.cost.len()).max().unwrap_or(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn resistance(value: &str) -> Resistance {
        Resistance {
            element: Element::Fighting,
            value: value.to_string(),
        }
    }

    #[test]
    fn test_resistance_reduction_reads_printed_number() {
        assert_eq!(resistance("-30").reduction(), 30);
        assert_eq!(resistance("−20").reduction(), 20);
        assert_eq!(resistance("10").reduction(), 10);
    }

    #[test]
    fn test_resistance_reduction_saturates_oversized_numbers() {
        assert_eq!(resistance("-99999999999999").reduction(), u32::MAX);
        assert_eq!(resistance("4294967295").reduction(), u32::MAX);
        assert_eq!(resistance("-0030").reduction(), 30);
    }

    #[test]
    fn test_resistance_reduction_defaults_without_number() {
        assert_eq!(resistance("").reduction(), DEFAULT_RESISTANCE_REDUCTION);
        assert_eq!(resistance("-").reduction(), DEFAULT_RESISTANCE_REDUCTION);
    }

    #[test]
    fn test_card_template_from_ron() {
        let text = r#"(
            id: "58",
            tcg_id: "base1-58",
            name: "Pikachu",
            element: "Lightning",
            hp: 40,
            attacks: [(name: "Gnaw", damage: 10, cost: ["Colorless"])],
            weaknesses: [(element: "Fighting", value: "×2")],
        )"#;
        let card: CardTemplate = ron::from_str(text).unwrap();
        assert_eq!(card.element, Element::Lightning);
        assert_eq!(card.max_attack_cost(), 1);
        assert!(card.weakness_to(Element::Fighting).is_some());
        assert!(card.resistance_to(Element::Fighting).is_none());
        assert_eq!(card.attack(0).map(|a| a.damage), Some(10));
    }
}
