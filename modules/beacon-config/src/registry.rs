use std::collections::HashMap;
use std::sync::{Arc, OnceLock, RwLock};

use beacon_bus::Bus;
use beacon_runtime::{ActorKind, EntityBehavior};
use serde_yaml::Value;

/// One registered actor plugin: its kind, its two schema checks, and the
/// factory that turns a validated config + entity list into behavior.
///
/// Schema checks return `Err(message)` rather than a typed error because
/// they run before any instantiation context (bus, store, session) exists —
/// they only get to see the raw, already-flattened YAML value.
pub struct PluginDescriptor {
    pub kind: ActorKind,
    pub validate_config: fn(&Value) -> Result<(), String>,
    pub validate_entity: fn(&Value) -> Result<(), String>,
    pub factory: fn(&Value, &[(String, Value)]) -> anyhow::Result<Arc<dyn EntityBehavior>>,
}

#[derive(Default)]
pub struct Registry {
    plugins: HashMap<String, PluginDescriptor>,
}

impl Registry {
    pub fn register(&mut self, name: impl Into<String>, descriptor: PluginDescriptor) {
        self.plugins.insert(name.into(), descriptor);
    }

    pub fn get(&self, name: &str) -> Option<&PluginDescriptor> {
        self.plugins.get(name)
    }
}

static REGISTRY: OnceLock<RwLock<Registry>> = OnceLock::new();

/// Process-wide plugin registry (§4.6 "Plugin registry"). Plugins register
/// themselves explicitly during process startup, before any config is
/// compiled — there is no directory-walk/dynamic-import discovery in this
/// runtime, so registration is an ordinary function call `main()` makes for
/// each built-in plugin rather than a decorator running at import time.
pub fn registry() -> &'static RwLock<Registry> {
    REGISTRY.get_or_init(|| RwLock::new(Registry::default()))
}

/// Also usable as a standalone bus-publishing reference; kept so
/// `beacon-config`'s only direct bus dependency is this type hint for
/// factories, not an actual subscription.
pub type BusHandle = Arc<Bus>;

#[cfg(test)]
mod tests {
    use super::*;

    struct Noop;
    #[async_trait::async_trait]
    impl EntityBehavior for Noop {}

    fn descriptor() -> PluginDescriptor {
        PluginDescriptor {
            kind: ActorKind::Monitor,
            validate_config: |_| Ok(()),
            validate_entity: |_| Ok(()),
            factory: |_, _| Ok(Arc::new(Noop)),
        }
    }

    #[test]
    fn register_then_get_roundtrips() {
        let mut reg = Registry::default();
        reg.register("text_record", descriptor());
        assert!(reg.get("text_record").is_some());
        assert!(reg.get("missing").is_none());
    }
}
