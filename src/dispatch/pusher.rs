//! Seeds never-probed websites into a region's queue.
//!
//! Catch-up-once semantics: only websites with zero ticks are enqueued.
//! Periodic re-probing is an external scheduling concern, not this
//! component's. The target region is chosen by the caller.

use serde::Serialize;
use tracing::info;
use uuid::Uuid;

use crate::dispatch::DispatchError;
use crate::dispatch::catalog::DispatchCatalog;
use crate::dispatch::queue::{QueueMessage, RegionQueue};

/// Outcome of one pusher run, returned verbatim to the caller.
#[derive(Debug, Clone, Serialize)]
pub struct PushReport {
    pub message: String,
    pub count: usize,
    pub total: u64,
    pub unchecked: usize,
}

/// Enqueues all of `user_id`'s never-probed websites onto `region_id`'s
/// log. Validation happens before any queue interaction; on queue or
/// catalog failure nothing is partially applied beyond what the log has
/// already durably appended.
pub async fn push_unchecked_websites<C>(
    catalog: &C,
    queue: &RegionQueue,
    region_id: Uuid,
    user_id: i32,
) -> Result<PushReport, DispatchError>
where
    C: DispatchCatalog + ?Sized,
{
    let unchecked = catalog.unchecked_websites(user_id).await?;
    let total = catalog.count_websites(user_id).await?;

    if unchecked.is_empty() {
        if total == 0 {
            return Ok(PushReport {
                message: "No websites found. Add some websites first!".to_string(),
                count: 0,
                total: 0,
                unchecked: 0,
            });
        }
        return Ok(PushReport {
            message: format!(
                "All {total} websites have already been checked. Add new websites to monitor more!"
            ),
            count: 0,
            total,
            unchecked: 0,
        });
    }

    let items: Vec<QueueMessage> = unchecked
        .iter()
        .map(|website| QueueMessage {
            website_id: website.id,
            url: website.url.clone(),
        })
        .collect();
    let count = items.len();
    queue.append_bulk(region_id, items).await?;
    info!(%region_id, user_id, count, total, "Pushed unchecked websites to queue.");

    Ok(PushReport {
        message: format!(
            "Successfully pushed {count} new websites to monitoring queue ({} already monitored)",
            total - count as u64
        ),
        count,
        total,
        unchecked: count,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::enums::TickStatus;
    use crate::dispatch::catalog::testing::MemoryCatalog;

    #[tokio::test]
    async fn enqueues_only_never_probed_websites() {
        let catalog = MemoryCatalog::new();
        let queue = RegionQueue::new();
        let region = Uuid::new_v4();
        queue.create_group(region).await.unwrap();

        let w1 = catalog.add_website(1, "probed.com");
        let w2 = catalog.add_website(1, "fresh-a.com");
        let w3 = catalog.add_website(1, "fresh-b.com");
        catalog.seed_tick(w1, region, TickStatus::Up);

        let report = push_unchecked_websites(&catalog, &queue, region, 1)
            .await
            .unwrap();
        assert_eq!(report.count, 2);
        assert_eq!(report.total, 3);
        assert_eq!(report.unchecked, 2);

        let batch = queue.read_group(region, "c1", 10).await.unwrap();
        let mut ids: Vec<Uuid> = batch.iter().map(|e| e.message.website_id).collect();
        ids.sort();
        let mut expected = vec![w2, w3];
        expected.sort();
        assert_eq!(ids, expected);
    }

    #[tokio::test]
    async fn reports_when_owner_has_no_websites() {
        let catalog = MemoryCatalog::new();
        let queue = RegionQueue::new();
        let region = Uuid::new_v4();

        let report = push_unchecked_websites(&catalog, &queue, region, 1)
            .await
            .unwrap();
        assert_eq!(report.count, 0);
        assert_eq!(report.total, 0);
        assert!(report.message.contains("Add some websites first"));
    }

    #[tokio::test]
    async fn reports_when_everything_is_already_monitored() {
        let catalog = MemoryCatalog::new();
        let queue = RegionQueue::new();
        let region = Uuid::new_v4();
        queue.create_group(region).await.unwrap();

        let w1 = catalog.add_website(1, "probed.com");
        catalog.seed_tick(w1, region, TickStatus::Down);

        let report = push_unchecked_websites(&catalog, &queue, region, 1)
            .await
            .unwrap();
        assert_eq!(report.count, 0);
        assert_eq!(report.total, 1);
        assert_eq!(report.unchecked, 0);
        assert!(report.message.contains("already been checked"));
        // Nothing was enqueued.
        assert!(queue.read_group(region, "c1", 10).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn other_owners_websites_are_not_enqueued() {
        let catalog = MemoryCatalog::new();
        let queue = RegionQueue::new();
        let region = Uuid::new_v4();
        queue.create_group(region).await.unwrap();

        catalog.add_website(1, "mine.com");
        catalog.add_website(2, "theirs.com");

        let report = push_unchecked_websites(&catalog, &queue, region, 1)
            .await
            .unwrap();
        assert_eq!(report.count, 1);
        assert_eq!(report.total, 1);

        let batch = queue.read_group(region, "c1", 10).await.unwrap();
        assert_eq!(batch.len(), 1);
        assert_eq!(batch[0].message.url, "mine.com");
    }
}
