//! Drains one region's queue: claim a batch, probe concurrently, persist
//! ticks, acknowledge the whole delivered set.

use std::time::Duration;

use futures::StreamExt;
use futures::stream;
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::dispatch::DispatchError;
use crate::dispatch::catalog::{DispatchCatalog, NewTick};
use crate::dispatch::probe::Probe;
use crate::dispatch::queue::{DeliveredEntry, RegionQueue};

/// Entries claimed per `read_group` call.
pub const DEFAULT_BATCH_SIZE: usize = 16;
/// Cap on simultaneous in-flight probes within one batch, so a large batch
/// cannot fan out into unbounded parallel connections.
pub const PROBE_CONCURRENCY: usize = 8;
/// How long the resident loop sleeps after an empty read.
pub const IDLE_POLL_INTERVAL: Duration = Duration::from_secs(5);

/// Counts for one drained batch. `processed` is the number of entries that
/// produced a tick; entries whose website was deleted mid-flight, or whose
/// tick insert failed, are excluded but still acknowledged.
#[derive(Debug, Clone, Copy, Default)]
pub struct BatchReport {
    pub processed: usize,
    pub total: usize,
}

/// Runs a single dispatch pass for one (region, consumer) pair.
///
/// Per-entry failures never fail the batch: a deleted website is skipped
/// without a tick, an unexpected catalog error is logged and skipped. The
/// full delivered id set is acknowledged in one call after all attempts
/// finish; if that ack itself fails, the batch stays pending and is
/// redelivered later (at-least-once).
pub async fn run_batch<C, P>(
    catalog: &C,
    prober: &P,
    queue: &RegionQueue,
    region_id: Uuid,
    consumer: &str,
    batch_size: usize,
) -> Result<BatchReport, DispatchError>
where
    C: DispatchCatalog + ?Sized,
    P: Probe + ?Sized,
{
    let delivered = queue.read_group(region_id, consumer, batch_size).await?;
    if delivered.is_empty() {
        return Ok(BatchReport::default());
    }
    let total = delivered.len();

    let processed = stream::iter(0..delivered.len())
        .map(|i| process_entry(catalog, prober, region_id, &delivered[i]))
        .buffer_unordered(PROBE_CONCURRENCY)
        .fold(0usize, |acc, ticked| async move { acc + usize::from(ticked) })
        .await;

    let entry_ids: Vec<u64> = delivered.iter().map(|entry| entry.id).collect();
    queue.ack_bulk(region_id, &entry_ids).await?;
    info!(%region_id, consumer, processed, total, "Batch processed and acknowledged.");

    Ok(BatchReport { processed, total })
}

/// Probes one delivered entry and persists its tick. Returns whether a tick
/// was written.
async fn process_entry<C, P>(
    catalog: &C,
    prober: &P,
    region_id: Uuid,
    entry: &DeliveredEntry,
) -> bool
where
    C: DispatchCatalog + ?Sized,
    P: Probe + ?Sized,
{
    let website_id = entry.message.website_id;
    match catalog.find_website(website_id).await {
        Ok(Some(_)) => {}
        Ok(None) => {
            info!(%website_id, "Website deleted before probing, skipping.");
            return false;
        }
        Err(err) => {
            error!(%website_id, error = %err, "Website lookup failed, skipping entry.");
            return false;
        }
    }

    let report = prober.probe(&entry.message.url).await;
    let tick = NewTick {
        website_id,
        region_id,
        status: report.status,
        response_time_ms: report.response_time_ms,
    };
    if let Err(err) = catalog.record_tick(tick).await {
        error!(%website_id, error = %err, "Failed to persist tick, skipping entry.");
        return false;
    }
    true
}

/// Long-running variant: drains batches back to back while the queue is
/// non-empty and sleeps between empty reads. Runs until the task is
/// aborted.
pub async fn run_worker_loop<C, P>(
    catalog: &C,
    prober: &P,
    queue: &RegionQueue,
    region_id: Uuid,
    consumer: &str,
) where
    C: DispatchCatalog + ?Sized,
    P: Probe + ?Sized,
{
    info!(%region_id, consumer, "Worker loop started.");
    loop {
        match run_batch(catalog, prober, queue, region_id, consumer, DEFAULT_BATCH_SIZE).await {
            Ok(report) if report.total == 0 => {
                tokio::time::sleep(IDLE_POLL_INTERVAL).await;
            }
            Ok(_) => {
                // Keep draining without delay while there is work.
            }
            Err(err) => {
                warn!(%region_id, consumer, error = %err, "Dispatch pass failed, backing off.");
                tokio::time::sleep(IDLE_POLL_INTERVAL).await;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    use async_trait::async_trait;

    use crate::db::enums::TickStatus;
    use crate::dispatch::catalog::testing::MemoryCatalog;
    use crate::dispatch::probe::{ProbeOutcome, ProbeReport, classify};
    use crate::dispatch::queue::QueueMessage;

    /// Deterministic probe: maps url → outcome, defaults to HTTP 200.
    struct StubProbe {
        outcomes: HashMap<String, ProbeOutcome>,
    }

    impl StubProbe {
        fn up() -> Self {
            Self {
                outcomes: HashMap::new(),
            }
        }

        fn with(mut self, url: &str, outcome: ProbeOutcome) -> Self {
            self.outcomes.insert(url.to_string(), outcome);
            self
        }
    }

    #[async_trait]
    impl Probe for StubProbe {
        async fn probe(&self, url: &str) -> ProbeReport {
            let outcome = self
                .outcomes
                .get(url)
                .cloned()
                .unwrap_or(ProbeOutcome::HttpStatus(200));
            ProbeReport {
                status: classify(&outcome),
                response_time_ms: 5,
                outcome,
            }
        }
    }

    async fn enqueue(queue: &RegionQueue, region: Uuid, catalog: &MemoryCatalog, urls: &[&str]) -> Vec<Uuid> {
        let mut ids = Vec::new();
        let mut items = Vec::new();
        for url in urls {
            let id = catalog.add_website(1, url);
            ids.push(id);
            items.push(QueueMessage {
                website_id: id,
                url: url.to_string(),
            });
        }
        queue.append_bulk(region, items).await.unwrap();
        ids
    }

    #[tokio::test]
    async fn empty_queue_reports_nothing_to_process() {
        let catalog = MemoryCatalog::new();
        let queue = RegionQueue::new();
        let region = Uuid::new_v4();
        queue.create_group(region).await.unwrap();

        let report = run_batch(&catalog, &StubProbe::up(), &queue, region, "w1", 16)
            .await
            .unwrap();
        assert_eq!(report.processed, 0);
        assert_eq!(report.total, 0);
    }

    #[tokio::test]
    async fn deleted_website_is_skipped_but_still_acknowledged() {
        let catalog = MemoryCatalog::new();
        let queue = RegionQueue::new();
        let region = Uuid::new_v4();
        queue.create_group(region).await.unwrap();

        let ids = enqueue(&queue, region, &catalog, &["a.com", "b.com", "c.com"]).await;
        catalog.remove_website(ids[1]);

        let report = run_batch(&catalog, &StubProbe::up(), &queue, region, "w1", 16)
            .await
            .unwrap();
        assert_eq!(report.processed, 2);
        assert_eq!(report.total, 3);

        let ticks = catalog.ticks();
        assert_eq!(ticks.len(), 2);
        assert!(ticks.iter().all(|t| t.website_id != ids[1]));

        // All three entries were acknowledged regardless of the skip.
        assert_eq!(queue.pending_count(region).await, 0);
        assert!(queue.read_group(region, "w1", 16).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn outcomes_are_classified_and_persisted_per_entry() {
        let catalog = MemoryCatalog::new();
        let queue = RegionQueue::new();
        let region = Uuid::new_v4();
        queue.create_group(region).await.unwrap();

        let ids = enqueue(&queue, region, &catalog, &["ok.com", "busted.com", "gone.com"]).await;
        let prober = StubProbe::up()
            .with("busted.com", ProbeOutcome::HttpStatus(503))
            .with("gone.com", ProbeOutcome::DnsFailure);

        let report = run_batch(&catalog, &prober, &queue, region, "w1", 16)
            .await
            .unwrap();
        assert_eq!(report.processed, 3);

        let status_of = |id: Uuid| {
            catalog
                .ticks()
                .into_iter()
                .find(|t| t.website_id == id)
                .unwrap()
                .status
        };
        assert_eq!(status_of(ids[0]), TickStatus::Up);
        assert_eq!(status_of(ids[1]), TickStatus::Down);
        assert_eq!(status_of(ids[2]), TickStatus::Down);
        assert!(catalog.ticks().iter().all(|t| t.region_id == region));
    }

    #[tokio::test]
    async fn failed_tick_insert_is_skipped_but_still_acknowledged() {
        let catalog = MemoryCatalog::new();
        let queue = RegionQueue::new();
        let region = Uuid::new_v4();
        queue.create_group(region).await.unwrap();

        enqueue(&queue, region, &catalog, &["a.com"]).await;
        catalog.fail_tick_inserts();

        let report = run_batch(&catalog, &StubProbe::up(), &queue, region, "w1", 16)
            .await
            .unwrap();
        assert_eq!(report.processed, 0);
        assert_eq!(report.total, 1);
        assert_eq!(queue.pending_count(region).await, 0);
    }

    #[tokio::test]
    async fn redelivered_website_produces_a_second_tick() {
        let catalog = MemoryCatalog::new();
        let queue = RegionQueue::new();
        let region = Uuid::new_v4();
        queue.create_group(region).await.unwrap();

        let id = catalog.add_website(1, "twice.com");
        let item = QueueMessage {
            website_id: id,
            url: "twice.com".to_string(),
        };
        queue
            .append_bulk(region, vec![item.clone(), item])
            .await
            .unwrap();

        let report = run_batch(&catalog, &StubProbe::up(), &queue, region, "w1", 16)
            .await
            .unwrap();
        assert_eq!(report.processed, 2);
        assert_eq!(catalog.ticks().len(), 2);
    }

    #[tokio::test]
    async fn batch_size_limits_one_pass() {
        let catalog = MemoryCatalog::new();
        let queue = RegionQueue::new();
        let region = Uuid::new_v4();
        queue.create_group(region).await.unwrap();

        enqueue(&queue, region, &catalog, &["a.com", "b.com", "c.com"]).await;

        let report = run_batch(&catalog, &StubProbe::up(), &queue, region, "w1", 2)
            .await
            .unwrap();
        assert_eq!(report.total, 2);
        let rest = run_batch(&catalog, &StubProbe::up(), &queue, region, "w1", 2)
            .await
            .unwrap();
        assert_eq!(rest.total, 1);
    }
}
