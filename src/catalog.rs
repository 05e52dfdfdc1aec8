//! Card template lookup.
//!
//! The catalog is a read-only collaborator. Battles hold template ids only and
//! resolve them through [`CardCatalog::get_cards`] in one batched call per request.

use crate::errors::CatalogError;
use async_trait::async_trait;
use schema::CardTemplate;
use std::collections::HashMap;
use std::path::Path;

/// Card data shipped with the crate.
pub const BUNDLED_CARDS: &str = include_str!("../data/cards.ron");

#[async_trait]
pub trait CardCatalog: Send + Sync {
    /// Resolves a batch of template ids.
    ///
    /// Ids with no template are simply absent from the result; callers decide
    /// whether that is fatal.
    async fn get_cards(&self, ids: &[String]) -> Result<Vec<CardTemplate>, CatalogError>;
}

/// A catalog held fully in memory, typically loaded from RON card data.
#[derive(Debug, Clone, Default)]
pub struct InMemoryCatalog {
    cards: HashMap<String, CardTemplate>,
}

impl InMemoryCatalog {
    pub fn new(cards: impl IntoIterator<Item = CardTemplate>) -> Self {
        Self {
            cards: cards.into_iter().map(|card| (card.id.clone(), card)).collect(),
        }
    }

    pub fn from_ron_str(text: &str) -> Result<Self, CatalogError> {
        let cards: Vec<CardTemplate> = ron::from_str(text)?;
        Ok(Self::new(cards))
    }

    pub fn load(path: &Path) -> Result<Self, CatalogError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_ron_str(&content)
    }

    pub fn bundled() -> Result<Self, CatalogError> {
        Self::from_ron_str(BUNDLED_CARDS)
    }

    pub fn get(&self, id: &str) -> Option<&CardTemplate> {
        self.cards.get(id)
    }

    pub fn len(&self) -> usize {
        self.cards.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cards.is_empty()
    }
}

#[async_trait]
impl CardCatalog for InMemoryCatalog {
    async fn get_cards(&self, ids: &[String]) -> Result<Vec<CardTemplate>, CatalogError> {
        Ok(ids.iter().filter_map(|id| self.cards.get(id).cloned()).collect())
    }
}
