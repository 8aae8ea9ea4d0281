use std::fmt;

use crate::error::RecordError;

/// Which side of the bus a topic addresses: producers publish on `Output`,
/// consumers subscribe on `Inputs`. The chain compiler bridges the two.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Direction {
    Inputs,
    Output,
}

impl Direction {
    fn as_str(&self) -> &'static str {
        match self {
            Direction::Inputs => "inputs",
            Direction::Output => "output",
        }
    }
}

impl std::str::FromStr for Direction {
    type Err = RecordError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "inputs" => Ok(Direction::Inputs),
            "output" => Ok(Direction::Output),
            other => Err(RecordError::InvalidDirection(other.to_string())),
        }
    }
}

/// `<direction>/<actor>/<entity>/<chain>`. An empty `chain` is a wildcard:
/// on a publish topic it means "unassigned, fan out to everything"; on a
/// subscription topic it means "match any chain".
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Topic {
    pub direction: Direction,
    pub actor: String,
    pub entity: String,
    pub chain: String,
}

impl Topic {
    pub fn new(
        direction: Direction,
        actor: impl Into<String>,
        entity: impl Into<String>,
        chain: impl Into<String>,
    ) -> Self {
        Self {
            direction,
            actor: actor.into(),
            entity: entity.into(),
            chain: chain.into(),
        }
    }

    pub fn parse(s: &str) -> Result<Self, RecordError> {
        let parts: Vec<&str> = s.splitn(4, '/').collect();
        let [direction, actor, entity, chain] = parts.as_slice() else {
            return Err(RecordError::InvalidTopic(s.to_string()));
        };
        Ok(Self {
            direction: direction.parse()?,
            actor: actor.to_string(),
            entity: entity.to_string(),
            chain: chain.to_string(),
        })
    }

    /// The generic form of this topic with its chain blanked — the key the
    /// bus's history ring is indexed by (§4.1 rule 4).
    pub fn generic(&self) -> Topic {
        Topic {
            direction: self.direction,
            actor: self.actor.clone(),
            entity: self.entity.clone(),
            chain: String::new(),
        }
    }

    /// True iff `self` (a subscription topic) matches a publish on `published`.
    /// `direction` must differ by convention (subscriptions are `Inputs`,
    /// publications are `Output`), but this method only checks the chain
    /// matching rule of §4.1 rule 2; callers compare direction/actor/entity
    /// themselves via equality on those fields, since both sides of a
    /// forwarder rewrite direction deliberately.
    pub fn chain_matches(&self, published_chain: &str) -> bool {
        self.chain.is_empty() || published_chain.is_empty() || self.chain == published_chain
    }
}

impl fmt::Display for Topic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}/{}/{}/{}",
            self.direction.as_str(),
            self.actor,
            self.entity,
            self.chain
        )
    }
}
