use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use beacon_http::{decide_on_update_interval, Delay, EndpointState, HttpEngine, IntervalContext, RetryPolicy, Session};
use beacon_record::Record;
use beacon_runtime::{Actor, TaskController};
use beacon_store::{RecordRow, RecordStore, StoreError};
use reqwest::header::HeaderMap;
use reqwest::Method;
use tracing::warn;

use crate::scheduler::Scheduler;

/// Abstract operations a feed plugin supplies (§4.5 "BaseFeedMonitor").
#[async_trait]
pub trait FeedSource: Send + Sync {
    fn url(&self, entity_name: &str) -> String;

    /// Parses the full list of records currently visible on the source
    /// (both old and new) out of a successful response body.
    fn parse(&self, entity_name: &str, body: &str) -> anyhow::Result<Vec<Record>>;

    /// Source-stable identifier; the store key is `<entity_name>:<record_id>`.
    fn record_id(&self, record: &Record) -> String;
}

#[derive(Debug, Clone)]
pub struct FeedEntityConfig {
    pub name: String,
    pub base_update_interval: Duration,
    /// Forces the first poll after this startup to be treated as priming
    /// even if the store already has rows for this entity.
    pub quiet_start: bool,
    pub adjust_interval: bool,
    pub extra_headers: HeaderMap,
}

/// Specializes the generic poll loop with a content-addressed record store:
/// conditional HTTP requests, adaptive update interval, and new/updated
/// dedup semantics (I1/I2), plus priming on first poll (I9).
pub struct BaseFeedMonitor;

impl BaseFeedMonitor {
    #[allow(clippy::too_many_arguments)]
    pub async fn spawn<S>(
        controller: &Arc<TaskController>,
        actor: Arc<Actor>,
        engine: Arc<HttpEngine>,
        session: Arc<Session>,
        store: Arc<RecordStore>,
        source: Arc<S>,
        entities: Vec<FeedEntityConfig>,
        retry_policy: RetryPolicy,
    ) where
        S: FeedSource + 'static,
    {
        let offsets = Scheduler::stagger_offsets(
            &entities.iter().map(|e| e.base_update_interval).collect::<Vec<_>>(),
        );

        for (config, offset) in entities.into_iter().zip(offsets) {
            let actor = actor.clone();
            let engine = engine.clone();
            let session = session.clone();
            let store = store.clone();
            let source = source.clone();
            let retry_policy = retry_policy.clone();
            let task_name = format!("feed-monitor:{}:{}", actor.name, config.name);

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

                    let mut update_interval = config.base_update_interval;
                    let mut endpoint_state = EndpointState::default();
                    let delay = Delay::new(config.base_update_interval, config.base_update_interval * 10, 1.5);

                    loop {
                        let url = source.url(&config.name);
                        let response = engine
                            .request(
                                &session,
                                Method::GET,
                                &url,
                                config.extra_headers.clone(),
                                &endpoint_state,
                                &retry_policy,
                            )
                            .await;

                        // On 304 the response's endpoint_state is the caller's
                        // unchanged copy, since request_once only refreshes
                        // last_modified/etag on status < 300 — satisfying
                        // "does not reset cache headers" for not-modified polls.
                        endpoint_state = response.endpoint_state.clone();
                        update_interval = decide_on_update_interval(
                            IntervalContext {
                                status: response.status,
                                headers: Some(&response.headers),
                                adjust: config.adjust_interval,
                            },
                            update_interval,
                            config.base_update_interval,
                            &delay,
                        );

                        if response.ok && !response.is_not_modified() {
                            match source.parse(&config.name, &response.text) {
                                Ok(records) => {
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
                                }
                                Err(err) => {
                                    warn!(entity = %config.name, error = %err, "feed parse error, skipping this poll");
                                }
                            }
                        }

                        first_iteration = false;
                        tokio::time::sleep(update_interval).await;
                    }
                })
                .await;
        }
    }
}

/// New iff `row_exists(uid)` is false. Updated iff `row_exists(uid)` is true
/// but `row_exists(uid, hashsum)` is false — the whole batch is always
/// persisted, but only genuinely new records (and none, during a priming
/// poll) are returned for emission.
pub(crate) async fn dedupe_and_store<S: FeedSource + ?Sized>(
    store: &RecordStore,
    entity_name: &str,
    source: &S,
    records: Vec<Record>,
    is_priming_poll: bool,
) -> Result<Vec<Record>, StoreError> {
    let mut to_emit = Vec::new();
    for record in records {
        let record_id = source.record_id(&record);
        let uid = format!("{entity_name}:{record_id}");
        let hashsum = record.hash();
        let is_new = !store.row_exists(&uid).await?;

        store
            .store(&RecordRow::new(
                entity_name,
                uid,
                hashsum,
                record.class_name(),
                record.as_json(),
            ))
            .await?;

        if is_new && !is_priming_poll {
            to_emit.push(record);
        }
    }
    Ok(to_emit)
}
