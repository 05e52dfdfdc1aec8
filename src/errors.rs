use thiserror::Error;

/// Main error type for the PvE battle engine and its collaborators.
///
/// Rule violations are deliberately absent: an illegal action is an expected
/// outcome and travels as [`RuleViolation`] inside an `Ok` value.
#[derive(Debug, Error)]
pub enum PveError {
    /// Persisted data could not be turned back into a playable battle
    #[error("integrity error: {0}")]
    Integrity(#[from] IntegrityError),
    /// Card catalog lookup failed
    #[error("catalog error: {0}")]
    Catalog(#[from] CatalogError),
    /// Battle record storage failed
    #[error("repository error: {0}")]
    Repository(#[from] RepositoryError),
    /// Progress bookkeeping failed
    #[error("progress error: {0}")]
    Progress(#[from] ProgressError),
    /// A battle could not be set up from the given decks
    #[error("setup error: {0}")]
    Setup(#[from] SetupError),
    /// Configuration could not be loaded
    #[error("config error: {0}")]
    Config(#[from] ConfigError),
    #[error("opponent {0} is not in the roster")]
    UnknownOpponent(String),
    #[error("user {user_id} has not unlocked {difficulty} opponents")]
    DifficultyLocked {
        user_id: String,
        difficulty: schema::Difficulty,
    },
}

/// Reasons an action is inapplicable to the current battle state.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RuleViolation {
    #[error("the battle has already ended")]
    BattleEnded,
    #[error("it is not this side's turn")]
    NotYourTurn,
    #[error("this action is not allowed during the current phase")]
    ActionNotAllowedInPhase,
    /// The acting side must promote from its bench first
    #[error("a bench promotion is pending")]
    PromotionPending,
    #[error("no bench promotion is pending for this side")]
    NoPromotionPending,
    #[error("the active slot is already occupied")]
    ActiveOccupied,
    #[error("there is no active Pokemon")]
    NoActive,
    #[error("card {0} is not in hand")]
    CardNotInHand(String),
    #[error("bench position {0} does not exist")]
    InvalidBenchPosition(usize),
    #[error("bench position {0} is occupied")]
    BenchSlotOccupied(usize),
    #[error("bench position {0} is empty")]
    BenchSlotEmpty(usize),
    #[error("bench position {position} does not hold card {card_iid}")]
    BenchCardMismatch { position: usize, card_iid: String },
    #[error("card {0} is not in play for this side")]
    CardNotInPlay(String),
    #[error("energy has already been attached this turn")]
    EnergyAlreadyAttached,
    #[error("card {0} cannot hold more energy")]
    EnergyLimitReached(String),
    #[error("an attack has already been made this turn")]
    AttackAlreadyUsed,
    #[error("card {0} is not the active Pokemon")]
    AttackerNotActive(String),
    #[error("card {0} entered the active slot this turn")]
    JustEnteredActive(String),
    #[error("attack index {0} does not exist")]
    InvalidAttackIndex(usize),
    #[error("not enough energy: need {required}, have {available}")]
    InsufficientEnergy { required: usize, available: usize },
    #[error("card {0} is not the opposing active Pokemon")]
    TargetNotOpposingActive(String),
    #[error("this side has already retreated this turn")]
    AlreadyRetreated,
    /// A referenced template is missing from the battle context
    #[error("card template {0} is unknown")]
    UnknownCard(String),
    /// The inbound payload did not match any action shape
    #[error("malformed action: {0}")]
    MalformedAction(String),
    /// A validated action could not be carried out; indicates an engine defect
    #[error("action could not be executed: {0}")]
    ExecutionFailed(String),
}

/// Defects or corruption in persisted battle data.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum IntegrityError {
    #[error("stored battle state could not be decoded: {0}")]
    StateDecode(String),
    #[error("card templates missing from catalog: {0:?}")]
    MissingCards(Vec<String>),
    #[error("card instance {0} appears in more than one zone")]
    DuplicateInstance(String),
    #[error("card instance {iid} has {hp} HP but at most {max_hp}")]
    HpOutOfRange { iid: String, hp: u32, max_hp: u32 },
    #[error("bench has {found} slots, expected {expected}")]
    BenchSize { expected: usize, found: usize },
}

#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("card data could not be parsed: {0}")]
    Parse(#[from] ron::error::SpannedError),
    #[error("catalog unavailable: {0}")]
    Unavailable(String),
}

#[derive(Debug, Error)]
pub enum RepositoryError {
    #[error("battle {0} not found")]
    NotFound(String),
    #[error("battle {0} already exists")]
    AlreadyExists(String),
    /// Another writer saved the record first
    #[error("battle {battle_id} was modified concurrently (expected version {expected}, found {found})")]
    VersionConflict {
        battle_id: String,
        expected: u64,
        found: u64,
    },
    #[error("serialization error: {0}")]
    Serialization(String),
    #[error("storage unavailable: {0}")]
    Unavailable(String),
}

#[derive(Debug, Error)]
pub enum ProgressError {
    #[error("progress storage unavailable: {0}")]
    Unavailable(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SetupError {
    #[error("the {0} deck is empty")]
    EmptyDeck(&'static str),
    #[error("the {side} deck has {size} cards, at most {max} are allowed")]
    DeckTooLarge {
        side: &'static str,
        size: usize,
        max: usize,
    },
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("config could not be parsed: {0}")]
    Parse(#[from] ron::error::SpannedError),
}

/// Type alias for Results using PveError
pub type PveResult<T> = Result<T, PveError>;

/// Type alias for action validation results
pub type RuleResult<T> = Result<T, RuleViolation>;
