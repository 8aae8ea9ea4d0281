use chrono::{DateTime, Utc};
use serde_json::Value;
use sqlx::sqlite::SqliteRow;
use sqlx::Row;

/// One row of the content-addressed `records` table (§6.3).
#[derive(Debug, Clone, PartialEq)]
pub struct RecordRow {
    pub parsed_at: DateTime<Utc>,
    pub feed_name: String,
    pub uid: String,
    pub hashsum: String,
    pub class_name: String,
    pub as_json: Value,
}

impl RecordRow {
    pub fn new(
        feed_name: impl Into<String>,
        uid: impl Into<String>,
        hashsum: impl Into<String>,
        class_name: impl Into<String>,
        as_json: Value,
    ) -> Self {
        Self {
            parsed_at: Utc::now(),
            feed_name: feed_name.into(),
            uid: uid.into(),
            hashsum: hashsum.into(),
            class_name: class_name.into(),
            as_json,
        }
    }
}

impl sqlx::FromRow<'_, SqliteRow> for RecordRow {
    fn from_row(row: &SqliteRow) -> sqlx::Result<Self> {
        let parsed_at_raw: String = row.try_get("parsed_at")?;
        let parsed_at = DateTime::parse_from_rfc3339(&parsed_at_raw)
            .map(|dt| dt.with_timezone(&Utc))
            .map_err(|e| sqlx::Error::ColumnDecode {
                index: "parsed_at".to_string(),
                source: Box::new(e),
            })?;
        let as_json_raw: String = row.try_get("as_json")?;
        let as_json: Value = serde_json::from_str(&as_json_raw).map_err(|e| sqlx::Error::ColumnDecode {
            index: "as_json".to_string(),
            source: Box::new(e),
        })?;

        Ok(Self {
            parsed_at,
            feed_name: row.try_get("feed_name")?,
            uid: row.try_get("uid")?,
            hashsum: row.try_get("hashsum")?,
            class_name: row.try_get("class_name")?,
            as_json,
        })
    }
}
