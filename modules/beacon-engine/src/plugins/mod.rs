mod text_record;

pub use text_record::{
    action_delivery_count, action_sink, build_monitor_entities, TextRecordActionBehavior, TextRecordFilterBehavior,
    TextRecordMonitorSource,
};

use std::sync::Arc;

use async_trait::async_trait;
use beacon_config::{PluginDescriptor, Registry};
use beacon_runtime::{ActorKind, EntityBehavior};

struct NoopBehavior;
#[async_trait]
impl EntityBehavior for NoopBehavior {}

/// Registers the in-tree example plugins. Real deployments would call one
/// `register` per plugin crate linked into the binary; there is no
/// directory-walk discovery (§4.6).
pub fn register_builtin_plugins(registry: &mut Registry) {
    registry.register(
        "text_record_monitor",
        PluginDescriptor {
            kind: ActorKind::Monitor,
            validate_config: |_| Ok(()),
            validate_entity: |_| Ok(()),
            factory: |_config, _entities| Ok(Arc::new(NoopBehavior) as Arc<dyn EntityBehavior>),
        },
    );

    registry.register(
        "text_record_filter",
        PluginDescriptor {
            kind: ActorKind::Filter,
            validate_config: |_| Ok(()),
            validate_entity: |_| Ok(()),
            factory: |_config, entities| Ok(TextRecordFilterBehavior::new(entities) as Arc<dyn EntityBehavior>),
        },
    );

    registry.register(
        "text_record_action",
        PluginDescriptor {
            kind: ActorKind::Action,
            validate_config: |_| Ok(()),
            validate_entity: |_| Ok(()),
            factory: |_config, _entities| Ok(TextRecordActionBehavior::new() as Arc<dyn EntityBehavior>),
        },
    );
}
