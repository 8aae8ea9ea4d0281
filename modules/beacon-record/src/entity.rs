use chrono::FixedOffset;
use chrono_tz::Tz;
use serde::Deserialize;

use crate::error::RecordError;

/// Flags every entity carries regardless of which plugin defines it.
/// Plugin-specific entity config structs `#[serde(flatten)]` this in.
///
/// `reset_origin` is only meaningful on Filter/Action entities — a Monitor
/// has no upstream record whose origin it could reset. The config compiler
/// rejects `reset_origin: true` on a Monitor entity at validation time.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct CommonEntityConfig {
    pub reset_origin: bool,
    pub consume_record: bool,
    pub event_passthrough: bool,
    pub timezone: Option<String>,
}

impl Default for CommonEntityConfig {
    fn default() -> Self {
        Self {
            reset_origin: false,
            // Action entities re-emit only when this is explicitly false
            // (§4.3); the original's `ActionEntity.consume_record` defaults
            // to true, so an Action is terminal unless configured otherwise.
            consume_record: true,
            event_passthrough: false,
            timezone: None,
        }
    }
}

/// A timezone resolved from an entity's `timezone` config field: either a
/// literal numeric offset (`"+02:00"`, `"Z"`) or an IANA zone-database name
/// (`"America/New_York"`), whose offset varies with the date being
/// converted (DST).
#[derive(Debug, Clone, Copy)]
pub enum ResolvedTimezone {
    Fixed(FixedOffset),
    Named(Tz),
}

impl CommonEntityConfig {
    /// Resolves `timezone` into a [`ResolvedTimezone`]. Returns `None` if
    /// unset; errors if set but neither a valid offset nor a recognized
    /// zone name.
    pub fn resolved_timezone(&self) -> Result<Option<ResolvedTimezone>, RecordError> {
        let Some(tz) = &self.timezone else {
            return Ok(None);
        };

        let probe = format!("2000-01-01T00:00:00{tz}");
        if let Ok(parsed) = chrono::DateTime::parse_from_rfc3339(&probe) {
            return Ok(Some(ResolvedTimezone::Fixed(*parsed.offset())));
        }

        if let Ok(named) = tz.parse::<Tz>() {
            return Ok(Some(ResolvedTimezone::Named(named)));
        }

        Err(RecordError::InvalidTimezone(tz.clone()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_consume_record_is_true() {
        assert!(CommonEntityConfig::default().consume_record);
    }

    #[test]
    fn resolves_numeric_offset() {
        let config = CommonEntityConfig {
            timezone: Some("+02:00".to_string()),
            ..CommonEntityConfig::default()
        };
        assert!(matches!(
            config.resolved_timezone().unwrap(),
            Some(ResolvedTimezone::Fixed(_))
        ));
    }

    #[test]
    fn resolves_named_zone() {
        let config = CommonEntityConfig {
            timezone: Some("America/New_York".to_string()),
            ..CommonEntityConfig::default()
        };
        assert!(matches!(
            config.resolved_timezone().unwrap(),
            Some(ResolvedTimezone::Named(_))
        ));
    }

    #[test]
    fn rejects_unrecognized_timezone() {
        let config = CommonEntityConfig {
            timezone: Some("not/a_zone".to_string()),
            ..CommonEntityConfig::default()
        };
        assert!(matches!(
            config.resolved_timezone().unwrap_err(),
            RecordError::InvalidTimezone(_)
        ));
    }

    #[test]
    fn unset_timezone_resolves_to_none() {
        assert!(CommonEntityConfig::default().resolved_timezone().unwrap().is_none());
    }
}
