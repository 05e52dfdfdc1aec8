use serde::{Deserialize, Serialize};
use strum::{Display, EnumIter, EnumString};

/// Printed card element. Also used as the energy kind attached to a card.
///
/// Parsing is case-insensitive and accepts the older "ELECTRIC"/"DARK"
/// spellings, so `"fire"`, `"Fire"` and `"FIRE"` all resolve to `Element::Fire`.
/// The canonical text form is upper case.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    EnumIter,
)]
#[serde(try_from = "String", into = "String")]
#[strum(serialize_all = "UPPERCASE", ascii_case_insensitive)]
pub enum Element {
    Fire,
    Water,
    Grass,
    #[strum(to_string = "LIGHTNING", serialize = "ELECTRIC")]
    Lightning,
    Psychic,
    Fighting,
    #[strum(to_string = "DARKNESS", serialize = "DARK")]
    Darkness,
    Metal,
    Dragon,
    Fairy,
    Colorless,
}

impl TryFrom<String> for Element {
    type Error = strum::ParseError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.trim().parse()
    }
}

impl From<Element> for String {
    fn from(element: Element) -> Self {
        element.to_string()
    }
}

/// Opponent difficulty tier. Unlocks progress EASY -> MEDIUM -> HARD.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    EnumIter,
)]
#[serde(rename_all = "UPPERCASE")]
#[strum(serialize_all = "UPPERCASE", ascii_case_insensitive)]
pub enum Difficulty {
    Easy,
    Medium,
    Hard,
}

impl Difficulty {
    /// The tier unlocked by clearing every opponent of this tier.
    pub fn next(self) -> Option<Difficulty> {
        match self {
            Difficulty::Easy => Some(Difficulty::Medium),
            Difficulty::Medium => Some(Difficulty::Hard),
            Difficulty::Hard => None,
        }
    }

    /// The tier that must be cleared before this one opens.
    pub fn previous(self) -> Option<Difficulty> {
        match self {
            Difficulty::Easy => None,
            Difficulty::Medium => Some(Difficulty::Easy),
            Difficulty::Hard => Some(Difficulty::Medium),
        }
    }
}
