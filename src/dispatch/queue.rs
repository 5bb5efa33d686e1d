//! Per-region ordered work log with competing-consumer group semantics.
//!
//! Each region owns one log and at most one consumer group. Appends go to
//! the log tail; `read_group` claims entries past the group's delivery
//! cursor and tracks them as pending until `ack_bulk` removes them. A crash
//! between read and ack leaves entries pending indefinitely; there is no
//! reclaim pass yet, but pending entries record who claimed them and when,
//! so one can be added without a format change.
//!
//! The log retains acknowledged entries: delivery is group-scoped, not
//! log-scoped, so a freshly created group starts at the log head and sees
//! everything appended before it existed.

use std::collections::BTreeMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::sync::Mutex;
use tracing::debug;
use uuid::Uuid;

#[derive(Error, Debug)]
pub enum QueueError {
    #[error("consumer group already exists for region {region_id}")]
    GroupAlreadyExists { region_id: Uuid },
    #[error("no consumer group exists for region {region_id}")]
    NoSuchGroup { region_id: Uuid },
}

/// Payload of one queued work item. Fixed, typed shape; malformed entries
/// cannot enter the queue.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueueMessage {
    pub website_id: Uuid,
    pub url: String,
}

/// An entry handed to a consumer by `read_group`. The id is only meaningful
/// within its region's log.
#[derive(Debug, Clone)]
pub struct DeliveredEntry {
    pub id: u64,
    pub message: QueueMessage,
}

#[derive(Debug, Clone)]
struct PendingEntry {
    consumer: String,
    delivered_at: DateTime<Utc>,
}

#[derive(Debug, Default)]
struct GroupState {
    /// Index into the log of the next not-yet-delivered entry.
    cursor: usize,
    pending: BTreeMap<u64, PendingEntry>,
}

#[derive(Debug, Default)]
struct RegionLog {
    next_id: u64,
    entries: Vec<(u64, QueueMessage)>,
    group: Option<GroupState>,
}

/// Region-keyed queue state. All mutation goes through the four operations
/// below; a per-region async mutex serializes them, so two concurrent
/// `read_group` calls on the same region can never claim overlapping
/// entries. Different regions share nothing but the outer map.
#[derive(Debug, Default)]
pub struct RegionQueue {
    regions: DashMap<Uuid, Arc<Mutex<RegionLog>>>,
}

impl RegionQueue {
    pub fn new() -> Self {
        Self::default()
    }

    fn region_log(&self, region_id: Uuid) -> Arc<Mutex<RegionLog>> {
        // Clone the Arc out so no map guard is held across an await.
        self.regions.entry(region_id).or_default().value().clone()
    }

    /// Initializes the consumer group for a region, with its cursor at the
    /// log head so entries appended before group creation are delivered.
    ///
    /// Re-creating an existing group is rejected with `GroupAlreadyExists`
    /// and leaves the cursor and pending set untouched; callers treat that
    /// as non-fatal.
    pub async fn create_group(&self, region_id: Uuid) -> Result<(), QueueError> {
        let log = self.region_log(region_id);
        let mut log = log.lock().await;
        if log.group.is_some() {
            return Err(QueueError::GroupAlreadyExists { region_id });
        }
        log.group = Some(GroupState::default());
        debug!(%region_id, "Consumer group created.");
        Ok(())
    }

    /// Appends items in call order to the region's log tail, creating the
    /// log on first use. Returns the assigned entry ids.
    pub async fn append_bulk(
        &self,
        region_id: Uuid,
        items: Vec<QueueMessage>,
    ) -> Result<Vec<u64>, QueueError> {
        let log = self.region_log(region_id);
        let mut log = log.lock().await;
        let mut ids = Vec::with_capacity(items.len());
        for message in items {
            let id = log.next_id;
            log.next_id += 1;
            log.entries.push((id, message));
            ids.push(id);
        }
        debug!(%region_id, appended = ids.len(), "Appended entries to region log.");
        Ok(ids)
    }

    /// Claims up to `max_count` undelivered entries for `consumer`, in log
    /// order, and marks them pending for the region's group. Returns an
    /// empty vec (not an error) when the group has nothing new.
    pub async fn read_group(
        &self,
        region_id: Uuid,
        consumer: &str,
        max_count: usize,
    ) -> Result<Vec<DeliveredEntry>, QueueError> {
        let log = self.region_log(region_id);
        let mut log = log.lock().await;
        let RegionLog { entries, group, .. } = &mut *log;
        let group = group
            .as_mut()
            .ok_or(QueueError::NoSuchGroup { region_id })?;

        let now = Utc::now();
        let mut delivered = Vec::new();
        while delivered.len() < max_count && group.cursor < entries.len() {
            let (id, message) = &entries[group.cursor];
            group.cursor += 1;
            group.pending.insert(
                *id,
                PendingEntry {
                    consumer: consumer.to_string(),
                    delivered_at: now,
                },
            );
            delivered.push(DeliveredEntry {
                id: *id,
                message: message.clone(),
            });
        }
        if !delivered.is_empty() {
            debug!(%region_id, consumer, count = delivered.len(), "Delivered batch.");
        }
        Ok(delivered)
    }

    /// Removes the given entries from the region's pending set. Unknown or
    /// already-acknowledged ids are ignored; other pending entries are
    /// unaffected. Returns how many entries were actually acknowledged.
    pub async fn ack_bulk(&self, region_id: Uuid, entry_ids: &[u64]) -> Result<usize, QueueError> {
        let Some(log) = self.regions.get(&region_id).map(|l| l.value().clone()) else {
            return Ok(0);
        };
        let mut log = log.lock().await;
        let Some(group) = log.group.as_mut() else {
            return Ok(0);
        };
        let now = Utc::now();
        let mut acked = 0;
        for id in entry_ids {
            if let Some(entry) = group.pending.remove(id) {
                acked += 1;
                debug!(
                    %region_id,
                    id,
                    consumer = %entry.consumer,
                    in_flight_ms = (now - entry.delivered_at).num_milliseconds(),
                    "Entry acknowledged."
                );
            }
        }
        Ok(acked)
    }

    /// Number of delivered-but-unacknowledged entries for a region.
    pub async fn pending_count(&self, region_id: Uuid) -> usize {
        let Some(log) = self.regions.get(&region_id).map(|l| l.value().clone()) else {
            return 0;
        };
        let log = log.lock().await;
        log.group.as_ref().map_or(0, |g| g.pending.len())
    }
}
