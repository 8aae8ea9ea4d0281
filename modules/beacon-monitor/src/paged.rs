use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use beacon_record::Record;
use beacon_runtime::{Actor, TaskController};
use beacon_store::{RecordRow, RecordStore};
use tracing::warn;

use crate::feed::{dedupe_and_store, FeedSource};
use crate::scheduler::Scheduler;

/// Opaque continuation token threaded between page fetches. Plugins decide
/// what it holds (a cursor, an offset, a "next" URL); the monitor only ever
/// passes it back unexamined.
#[derive(Debug, Clone)]
pub struct PageContext(pub String);

/// A feed source that may need several requests to recover the full set of
/// currently-visible records, most-recent page first (§4.5 "PagedFeedMonitor").
#[async_trait]
pub trait PagedFeedSource: FeedSource {
    /// Fetches the first (most recent) page.
    async fn handle_first_page(&self, entity_name: &str) -> anyhow::Result<(Vec<Record>, Option<PageContext>)>;

    /// Fetches the page following `context`.
    async fn handle_next_page(
        &self,
        entity_name: &str,
        context: &PageContext,
    ) -> anyhow::Result<(Vec<Record>, Option<PageContext>)>;
}

#[derive(Debug, Clone)]
pub struct PagedFeedConfig {
    pub name: String,
    pub base_update_interval: Duration,
    pub quiet_start: bool,
    /// On a mid-pagination page error, keep whatever was already collected
    /// instead of discarding the whole poll.
    pub allow_discontinuity: bool,
    /// Keep paginating past the first already-known record instead of
    /// stopping early, up to `max_continuation_depth`.
    pub fetch_until_the_end_of_feed_mode: bool,
    pub max_continuation_depth: u32,
    pub next_page_delay: Duration,
}

pub struct PagedFeedMonitor;

impl PagedFeedMonitor {
    pub async fn spawn<S>(
        controller: &Arc<TaskController>,
        actor: Arc<Actor>,
        store: Arc<RecordStore>,
        source: Arc<S>,
        entities: Vec<PagedFeedConfig>,
    ) where
        S: PagedFeedSource + 'static,
    {
        let offsets = Scheduler::stagger_offsets(
            &entities.iter().map(|e| e.base_update_interval).collect::<Vec<_>>(),
        );

        for (config, offset) in entities.into_iter().zip(offsets) {
            let actor = actor.clone();
            let store = store.clone();
            let source = source.clone();
            let task_name = format!("paged-feed-monitor:{}:{}", actor.name, config.name);

            controller
                .create_task(task_name, async move {
                    if !offset.is_zero() {
                        tokio::time::sleep(offset).await;
                    }

                    let had_zero_rows_at_startup = match store.row_count_for_feed(&config.name).await {
                        Ok(count) => count == 0,
                        Err(err) => {
                            warn!(entity = %config.name, error = %err, "failed to read priming state, assuming non-empty store");
                            false
                        }
                    };
                    let mut first_iteration = true;

                    loop {
                        let records = collect_paged_records(source.as_ref(), &store, &config).await;
                        let is_priming_poll = first_iteration && (had_zero_rows_at_startup || config.quiet_start);

                        match dedupe_and_store(&store, &config.name, source.as_ref(), records, is_priming_poll).await {
                            Ok(to_emit) => {
                                for record in to_emit {
                                    actor.on_record(&config.name, record).await;
                                }
                            }
                            Err(err) => {
                                warn!(entity = %config.name, error = %err, "failed to update record store");
                            }
                        }

                        first_iteration = false;
                        tokio::time::sleep(config.base_update_interval).await;
                    }
                })
                .await;
        }
    }
}

/// Walks pages most-recent-first, stopping at the first already-known
/// record unless `fetch_until_the_end_of_feed_mode` is set, and returns the
/// collected records oldest-first so emission preserves source order (I10).
///
/// On a page fetch error: if `allow_discontinuity` or
/// `fetch_until_the_end_of_feed_mode` is set, whatever was already collected
/// is kept; otherwise the whole poll is discarded (returns empty, so the
/// store is left untouched by the caller's subsequent write pass).
pub(crate) async fn collect_paged_records<S: PagedFeedSource + ?Sized>(
    source: &S,
    store: &RecordStore,
    config: &PagedFeedConfig,
) -> Vec<Record> {
    let mut collected = Vec::new();
    let mut depth: u32 = 0;

    let mut page = match source.handle_first_page(&config.name).await {
        Ok(page) => Some(page),
        Err(err) => {
            warn!(entity = %config.name, error = %err, "first page fetch failed");
            return Vec::new();
        }
    };

    while let Some((records, next_context)) = page.take() {
        let mut saw_known_record = false;
        for record in records {
            let record_id = source.record_id(&record);
            let uid = format!("{}:{}", config.name, record_id);
            match store.row_exists(&uid).await {
                Ok(true) => {
                    saw_known_record = true;
                    if !config.fetch_until_the_end_of_feed_mode {
                        break;
                    }
                }
                Ok(false) => collected.push(record),
                Err(err) => {
                    warn!(entity = %config.name, error = %err, "store lookup failed during pagination");
                }
            }
        }

        if saw_known_record && !config.fetch_until_the_end_of_feed_mode {
            break;
        }

        depth += 1;
        if depth >= config.max_continuation_depth {
            break;
        }

        let Some(context) = next_context else {
            break;
        };

        if !config.next_page_delay.is_zero() {
            tokio::time::sleep(config.next_page_delay).await;
        }

        match source.handle_next_page(&config.name, &context).await {
            Ok(next_page) => page = Some(next_page),
            Err(err) => {
                warn!(entity = %config.name, error = %err, "continuation page fetch failed");
                if !(config.allow_discontinuity || config.fetch_until_the_end_of_feed_mode) {
                    return Vec::new();
                }
                break;
            }
        }
    }

    collected.reverse();
    collected
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    struct TwoPageSource;

    #[async_trait]
    impl FeedSource for TwoPageSource {
        fn url(&self, _entity_name: &str) -> String {
            String::new()
        }
        fn parse(&self, _entity_name: &str, _body: &str) -> anyhow::Result<Vec<Record>> {
            Ok(Vec::new())
        }
        fn record_id(&self, record: &Record) -> String {
            record.field("id").and_then(|v| v.as_str()).unwrap_or_default().to_string()
        }
    }

    #[async_trait]
    impl PagedFeedSource for TwoPageSource {
        async fn handle_first_page(&self, _entity_name: &str) -> anyhow::Result<(Vec<Record>, Option<PageContext>)> {
            Ok((
                vec![record_with_id("3"), record_with_id("2")],
                Some(PageContext("page2".to_string())),
            ))
        }
        async fn handle_next_page(
            &self,
            _entity_name: &str,
            _context: &PageContext,
        ) -> anyhow::Result<(Vec<Record>, Option<PageContext>)> {
            Ok((vec![record_with_id("1")], None))
        }
    }

    fn record_with_id(id: &str) -> Record {
        Record::new("text_record").with_field("id", json!(id))
    }

    fn base_config() -> PagedFeedConfig {
        PagedFeedConfig {
            name: "entity".to_string(),
            base_update_interval: Duration::from_secs(60),
            quiet_start: false,
            allow_discontinuity: false,
            fetch_until_the_end_of_feed_mode: false,
            max_continuation_depth: 10,
            next_page_delay: Duration::ZERO,
        }
    }

    #[tokio::test]
    async fn first_poll_collects_all_pages_oldest_first() {
        let store = RecordStore::connect(":memory:").await.unwrap();
        let source = TwoPageSource;
        let config = base_config();

        let records = collect_paged_records(&source, &store, &config).await;
        let ids: Vec<String> = records.iter().map(|r| source.record_id(r)).collect();

        assert_eq!(ids, vec!["1", "2", "3"]);
    }

    #[tokio::test]
    async fn stops_at_first_known_record_by_default() {
        let store = RecordStore::connect(":memory:").await.unwrap();
        let source = TwoPageSource;
        let config = base_config();

        store
            .store(&RecordRow::new("entity", "entity:2", "h", "text_record", json!({})))
            .await
            .unwrap();

        let records = collect_paged_records(&source, &store, &config).await;
        let ids: Vec<String> = records.iter().map(|r| source.record_id(r)).collect();

        assert_eq!(ids, vec!["3"]);
    }

    #[tokio::test]
    async fn fetch_until_end_of_feed_keeps_paginating_past_known_records() {
        let store = RecordStore::connect(":memory:").await.unwrap();
        let source = TwoPageSource;
        let mut config = base_config();
        config.fetch_until_the_end_of_feed_mode = true;

        store
            .store(&RecordRow::new("entity", "entity:2", "h", "text_record", json!({})))
            .await
            .unwrap();

        let records = collect_paged_records(&source, &store, &config).await;
        let ids: Vec<String> = records.iter().map(|r| source.record_id(r)).collect();

        assert_eq!(ids, vec!["1", "3"]);
    }
}
