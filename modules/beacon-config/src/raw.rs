use std::collections::BTreeMap;

use serde::Deserialize;
use serde_yaml::Value;

/// Structural shape of the top-level YAML document (§6.1), parsed before any
/// plugin-specific schema is consulted.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RawFile {
    #[serde(default)]
    pub settings: RawSettings,
    #[serde(default)]
    pub actors: BTreeMap<String, RawActor>,
    #[serde(default)]
    pub chains: BTreeMap<String, Vec<BTreeMap<String, Vec<String>>>>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields, default)]
pub struct RawSettings {
    pub log_directory: Option<String>,
    pub logfile_size: Option<u64>,
    pub logfile_level: Option<String>,
    pub loglevel_override: BTreeMap<String, String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RawActor {
    #[serde(default = "empty_mapping")]
    pub config: Value,
    #[serde(default = "empty_mapping")]
    pub defaults: Value,
    #[serde(default)]
    pub entities: Vec<RawEntity>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RawEntity {
    pub name: String,
    #[serde(flatten)]
    pub rest: Value,
}

fn empty_mapping() -> Value {
    Value::Mapping(serde_yaml::Mapping::new())
}

/// Merges `defaults` under `entity`, entity-level keys winning ties — the
/// "flattening" step of the two-phase parse (§4.6 step 2).
pub fn flatten_entity(defaults: &Value, entity: &Value) -> Value {
    match (defaults, entity) {
        (Value::Mapping(defaults_map), Value::Mapping(entity_map)) => {
            let mut merged = defaults_map.clone();
            for (key, value) in entity_map {
                merged.insert(key.clone(), value.clone());
            }
            Value::Mapping(merged)
        }
        _ => entity.clone(),
    }
}

/// Injects `name: <actor_name>` into an actor's config mapping, as the
/// loader does before a plugin's config schema ever sees it.
pub fn with_injected_name(config: &Value, name: &str) -> Value {
    let mut mapping = match config {
        Value::Mapping(m) => m.clone(),
        _ => serde_yaml::Mapping::new(),
    };
    mapping.insert(Value::String("name".to_string()), Value::String(name.to_string()));
    Value::Mapping(mapping)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flatten_entity_overrides_defaults_on_conflict() {
        let defaults: Value = serde_yaml::from_str("update_interval: 60\nquiet_start: false").unwrap();
        let entity: Value = serde_yaml::from_str("update_interval: 30").unwrap();
        let merged = flatten_entity(&defaults, &entity);
        let merged: BTreeMap<String, Value> = serde_yaml::from_value(merged).unwrap();
        assert_eq!(merged["update_interval"].as_i64(), Some(30));
        assert_eq!(merged["quiet_start"].as_bool(), Some(false));
    }

    #[test]
    fn with_injected_name_adds_name_key() {
        let config: Value = serde_yaml::from_str("timeout: 5").unwrap();
        let injected = with_injected_name(&config, "rss_monitor");
        let map: BTreeMap<String, Value> = serde_yaml::from_value(injected).unwrap();
        assert_eq!(map["name"].as_str(), Some("rss_monitor"));
        assert_eq!(map["timeout"].as_i64(), Some(5));
    }
}
