use thiserror::Error;

/// Truncates `input` to `len` chars, appending a marker if it was cut —
/// used so schema-validation errors never dump an entire entity block.
pub fn truncate(input: &str, len: usize) -> String {
    if input.chars().count() <= len {
        input.to_string()
    } else {
        let head: String = input.chars().take(len).collect();
        format!("{head}[...]")
    }
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse {path} as YAML: {source}")]
    Parse {
        path: String,
        #[source]
        source: serde_yaml::Error,
    },

    #[error("{path}: {reason}")]
    Structural { path: String, reason: String },

    #[error("actor '{actor}' config: {reason} (value: {value})")]
    InvalidActorConfig {
        actor: String,
        reason: String,
        value: String,
    },

    #[error("actor '{actor}' entity '{entity}': {reason} (value: {value})")]
    InvalidEntityConfig {
        actor: String,
        entity: String,
        reason: String,
        value: String,
    },

    #[error("actor '{0}' references no registered plugin")]
    UnknownPlugin(String),

    #[error("actor '{actor}' entity '{entity}': reset_origin is not valid on a Monitor entity")]
    ResetOriginOnMonitor { actor: String, entity: String },

    #[error("actor names must be process-unique; '{0}' is declared more than once")]
    DuplicateActorName(String),

    #[error(transparent)]
    ChainShape(#[from] beacon_record::RecordError),

    #[error(transparent)]
    ChainCompile(#[from] beacon_chain::ChainCompileError),

    #[error(transparent)]
    PluginFactory(#[from] anyhow::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn truncate_passes_short_input_through() {
        assert_eq!(truncate("short", 85), "short");
    }

    #[test]
    fn truncate_cuts_and_marks_long_input() {
        let input = "x".repeat(200);
        let out = truncate(&input, 85);
        assert_eq!(out.chars().count(), 85 + "[...]".chars().count());
        assert!(out.ends_with("[...]"));
    }
}
