use std::collections::HashSet;

use crate::error::RecordError;

/// One hop in a chain: a producing/consuming actor and the entities of it
/// addressed at this hop.
#[derive(Debug, Clone)]
pub struct ChainCard {
    pub actor: String,
    pub entities: Vec<String>,
}

impl ChainCard {
    pub fn new(actor: impl Into<String>, entities: Vec<String>) -> Self {
        Self {
            actor: actor.into(),
            entities,
        }
    }
}

/// Declarative ordered pipeline of (actor, entities) cards.
#[derive(Debug, Clone)]
pub struct Chain {
    pub name: String,
    pub cards: Vec<ChainCard>,
}

impl Chain {
    pub fn new(name: impl Into<String>, cards: Vec<ChainCard>) -> Self {
        Self {
            name: name.into(),
            cards,
        }
    }

    /// Validates the shape invariants from §3/§4.2/§6.1: at least two cards,
    /// every card lists at least one entity, and no (actor, entity) pair
    /// appears more than once across the flattened chain (I3).
    pub fn validate(&self) -> Result<(), RecordError> {
        if self.cards.len() < 2 {
            return Err(RecordError::ChainTooShort {
                name: self.name.clone(),
                found: self.cards.len(),
            });
        }

        let mut seen: HashSet<(String, String)> = HashSet::new();
        for card in &self.cards {
            if card.entities.is_empty() {
                return Err(RecordError::ChainCardEmpty {
                    chain: self.name.clone(),
                    actor: card.actor.clone(),
                });
            }
            for entity in &card.entities {
                let key = (card.actor.clone(), entity.clone());
                if !seen.insert(key) {
                    return Err(RecordError::ChainDuplicateEntity {
                        chain: self.name.clone(),
                        actor: card.actor.clone(),
                        entity: entity.clone(),
                    });
                }
            }
        }
        Ok(())
    }
}
