mod compile;
mod error;
mod raw;
mod registry;
mod settings;

pub use compile::{compile, instantiate, CompiledActor, CompiledFile};
pub use error::{truncate, ConfigError};
pub use raw::{flatten_entity, with_injected_name, RawActor, RawEntity, RawFile, RawSettings};
pub use registry::{registry, PluginDescriptor, Registry};
pub use settings::RuntimeSettings;
