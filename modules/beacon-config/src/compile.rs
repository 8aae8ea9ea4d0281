use std::collections::HashSet;
use std::sync::Arc;

use beacon_bus::Bus;
use beacon_chain::{compile_chain, CompiledChain};
use beacon_record::{Chain, ChainCard, CommonEntityConfig};
use beacon_runtime::{Actor, ActorKind, EntityBehavior, EntityHandle};
use serde_yaml::Value;

use crate::error::{truncate, ConfigError};
use crate::raw::{flatten_entity, with_injected_name, RawFile};
use crate::registry::Registry;
use crate::settings::RuntimeSettings;

type Factory = fn(&Value, &[(String, Value)]) -> anyhow::Result<Arc<dyn EntityBehavior>>;

pub struct CompiledActor {
    pub name: String,
    pub kind: ActorKind,
    pub config: Value,
    pub entities: Vec<(String, Value)>,
    factory: Factory,
}

pub struct CompiledFile {
    pub settings: RuntimeSettings,
    pub actors: Vec<CompiledActor>,
    pub chains: Vec<Chain>,
}

/// Parses, flattens, and validates a YAML document against the plugin
/// registry (§4.6 steps 1-3). Does not instantiate anything — see
/// [`instantiate`] for step 4.
pub fn compile(yaml: &str, registry: &Registry) -> Result<CompiledFile, ConfigError> {
    let raw: RawFile = serde_yaml::from_str(yaml).map_err(|source| ConfigError::Parse {
        path: "<config>".to_string(),
        source,
    })?;

    let mut seen_actor_names = HashSet::new();
    let mut actors = Vec::new();

    for (actor_name, raw_actor) in &raw.actors {
        if !seen_actor_names.insert(actor_name.clone()) {
            return Err(ConfigError::DuplicateActorName(actor_name.clone()));
        }

        let descriptor = registry
            .get(actor_name)
            .ok_or_else(|| ConfigError::UnknownPlugin(actor_name.clone()))?;

        let config = with_injected_name(&raw_actor.config, actor_name);
        (descriptor.validate_config)(&config).map_err(|reason| ConfigError::InvalidActorConfig {
            actor: actor_name.clone(),
            reason,
            value: truncate(&serde_yaml::to_string(&config).unwrap_or_default(), 85),
        })?;

        let mut entities = Vec::new();
        let mut seen_entity_names = HashSet::new();
        for raw_entity in &raw_actor.entities {
            if !seen_entity_names.insert(raw_entity.name.clone()) {
                return Err(ConfigError::Structural {
                    path: format!("actors.{actor_name}.entities"),
                    reason: format!("entity name '{}' is not unique within this actor", raw_entity.name),
                });
            }

            let merged = flatten_entity(&raw_actor.defaults, &raw_entity.rest);

            if descriptor.kind == ActorKind::Monitor && reset_origin_is_set(&merged) {
                return Err(ConfigError::ResetOriginOnMonitor {
                    actor: actor_name.clone(),
                    entity: raw_entity.name.clone(),
                });
            }

            (descriptor.validate_entity)(&merged).map_err(|reason| ConfigError::InvalidEntityConfig {
                actor: actor_name.clone(),
                entity: raw_entity.name.clone(),
                reason,
                value: truncate(&serde_yaml::to_string(&merged).unwrap_or_default(), 85),
            })?;

            entities.push((raw_entity.name.clone(), merged));
        }

        actors.push(CompiledActor {
            name: actor_name.clone(),
            kind: descriptor.kind,
            config,
            entities,
            factory: descriptor.factory,
        });
    }

    let mut chains = Vec::new();
    for (chain_name, cards) in &raw.chains {
        let mut chain_cards = Vec::new();
        for card in cards {
            if card.len() != 1 {
                return Err(ConfigError::Structural {
                    path: format!("chains.{chain_name}"),
                    reason: format!("each chain card must map exactly one actor, found {}", card.len()),
                });
            }
            for (actor, entities) in card {
                chain_cards.push(ChainCard::new(actor.clone(), entities.clone()));
            }
        }
        let chain = Chain::new(chain_name.clone(), chain_cards);
        chain.validate()?;
        chains.push(chain);
    }

    Ok(CompiledFile {
        settings: RuntimeSettings::from_raw(raw.settings),
        actors,
        chains,
    })
}

fn reset_origin_is_set(value: &Value) -> bool {
    matches!(value.get("reset_origin"), Some(Value::Bool(true)))
}

fn common_entity_config(value: &Value) -> CommonEntityConfig {
    serde_yaml::from_value(value.clone()).unwrap_or_default()
}

/// Instantiation (§4.6 step 4): builds every actor via its plugin factory,
/// installs its bus subscriptions, and wires every chain via the chain
/// compiler.
pub async fn instantiate(
    compiled: &CompiledFile,
    bus: Arc<Bus>,
) -> Result<(Vec<Arc<Actor>>, Vec<CompiledChain>), ConfigError> {
    let mut actors = Vec::new();

    for compiled_actor in &compiled.actors {
        let behavior = (compiled_actor.factory)(&compiled_actor.config, &compiled_actor.entities)?;

        let entity_handles: Vec<EntityHandle> = compiled_actor
            .entities
            .iter()
            .map(|(name, value)| EntityHandle {
                name: name.clone(),
                common: common_entity_config(value),
            })
            .collect();

        let actor = Actor::new(
            compiled_actor.name.clone(),
            compiled_actor.kind,
            entity_handles,
            bus.clone(),
            behavior,
        );
        actor.install().await;
        actors.push(actor);
    }

    let mut compiled_chains = Vec::new();
    for chain in &compiled.chains {
        let entity_exists = |actor: &str, entity: &str| {
            actors
                .iter()
                .find(|a| a.name == actor)
                .map(|a| a.entity(entity).is_some())
                .unwrap_or(false)
        };
        compiled_chains.push(compile_chain(&bus, chain, entity_exists).await?);
    }

    Ok((actors, compiled_chains))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::PluginDescriptor;

    struct Noop;
    #[async_trait::async_trait]
    impl EntityBehavior for Noop {}

    fn monitor_descriptor() -> PluginDescriptor {
        PluginDescriptor {
            kind: ActorKind::Monitor,
            validate_config: |_| Ok(()),
            validate_entity: |_| Ok(()),
            factory: |_, _| Ok(Arc::new(Noop)),
        }
    }

    fn registry_with_monitor(name: &str) -> Registry {
        let mut registry = Registry::default();
        registry.register(name, monitor_descriptor());
        registry
    }

    #[test]
    fn unknown_plugin_is_rejected() {
        let registry = Registry::default();
        let yaml = "actors:\n  mystery:\n    entities: []\n";
        let err = compile(yaml, &registry).unwrap_err();
        assert!(matches!(err, ConfigError::UnknownPlugin(name) if name == "mystery"));
    }

    #[test]
    fn duplicate_entity_name_within_actor_is_rejected() {
        let registry = registry_with_monitor("m");
        let yaml = "actors:\n  m:\n    entities:\n      - name: e1\n      - name: e1\n";
        let err = compile(yaml, &registry).unwrap_err();
        assert!(matches!(err, ConfigError::Structural { .. }));
    }

    #[test]
    fn reset_origin_on_monitor_entity_is_rejected() {
        let registry = registry_with_monitor("m");
        let yaml = "actors:\n  m:\n    entities:\n      - name: e1\n        reset_origin: true\n";
        let err = compile(yaml, &registry).unwrap_err();
        assert!(matches!(err, ConfigError::ResetOriginOnMonitor { .. }));
    }

    #[test]
    fn chain_too_short_is_rejected() {
        let registry = registry_with_monitor("m");
        let yaml = "actors:\n  m:\n    entities:\n      - name: e1\n\
                     chains:\n  c1:\n    - m: [e1]\n";
        let err = compile(yaml, &registry).unwrap_err();
        assert!(matches!(err, ConfigError::ChainShape(_)));
    }

    #[test]
    fn chain_card_with_two_actors_is_rejected() {
        let registry = registry_with_monitor("m");
        let yaml = "actors:\n  m:\n    entities:\n      - name: e1\n      - name: e2\n\
                     chains:\n  c1:\n    - m: [e1]\n      other: [x]\n    - m: [e2]\n";
        let err = compile(yaml, &registry).unwrap_err();
        assert!(matches!(err, ConfigError::Structural { .. }));
    }

    #[test]
    fn chain_card_with_zero_actors_is_rejected() {
        let registry = registry_with_monitor("m");
        let yaml = "actors:\n  m:\n    entities:\n      - name: e1\n      - name: e2\n\
                     chains:\n  c1:\n    - {}\n    - m: [e2]\n";
        let err = compile(yaml, &registry).unwrap_err();
        assert!(matches!(err, ConfigError::Structural { .. }));
    }

    #[test]
    fn well_formed_config_compiles() {
        let registry = registry_with_monitor("m");
        let yaml = "actors:\n  m:\n    defaults:\n      quiet_start: false\n    entities:\n      - name: e1\n      - name: e2\n\
                     chains:\n  c1:\n    - m: [e1]\n    - m: [e2]\n";
        let compiled = compile(yaml, &registry).unwrap();
        assert_eq!(compiled.actors.len(), 1);
        assert_eq!(compiled.actors[0].entities[0].0, "e1");
    }
}
