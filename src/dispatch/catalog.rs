//! The dispatch pipeline's view of the catalog store.
//!
//! The pusher and worker never touch the database layer directly; they go
//! through this trait, which the SeaORM services implement (see
//! `db::services::dispatch_catalog`). Tests substitute an in-memory
//! catalog.

use async_trait::async_trait;
use thiserror::Error;
use uuid::Uuid;

use crate::db::enums::TickStatus;

#[derive(Error, Debug)]
pub enum CatalogError {
    #[error("catalog storage error: {0}")]
    Storage(String),
}

/// The subset of a website the dispatch pipeline needs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WebsiteRecord {
    pub id: Uuid,
    pub url: String,
}

/// One probe result to persist. Immutable once recorded.
#[derive(Debug, Clone)]
pub struct NewTick {
    pub website_id: Uuid,
    pub region_id: Uuid,
    pub status: TickStatus,
    pub response_time_ms: i32,
}

#[async_trait]
pub trait DispatchCatalog: Send + Sync {
    /// Looks up a website by id; `None` when it was deleted.
    async fn find_website(&self, website_id: Uuid) -> Result<Option<WebsiteRecord>, CatalogError>;

    /// Appends one tick. Never deduplicates: a redelivered entry yields a
    /// second tick.
    async fn record_tick(&self, tick: NewTick) -> Result<(), CatalogError>;

    /// The owner's websites with zero ticks, i.e. never probed from any
    /// region.
    async fn unchecked_websites(&self, user_id: i32) -> Result<Vec<WebsiteRecord>, CatalogError>;

    /// Total number of websites the owner has.
    async fn count_websites(&self, user_id: i32) -> Result<u64, CatalogError>;
}

#[cfg(test)]
pub(crate) mod testing {
    //! In-memory catalog for dispatch tests, in the spirit of an in-memory
    //! queue behind the same trait as the real one.

    use std::collections::HashMap;
    use std::sync::Mutex;

    use super::*;

    #[derive(Default)]
    pub struct MemoryCatalog {
        websites: Mutex<HashMap<Uuid, (i32, WebsiteRecord)>>,
        ticks: Mutex<Vec<NewTick>>,
        fail_inserts: Mutex<bool>,
    }

    impl MemoryCatalog {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn add_website(&self, user_id: i32, url: &str) -> Uuid {
            let id = Uuid::new_v4();
            self.websites.lock().unwrap().insert(
                id,
                (
                    user_id,
                    WebsiteRecord {
                        id,
                        url: url.to_string(),
                    },
                ),
            );
            id
        }

        pub fn remove_website(&self, website_id: Uuid) {
            self.websites.lock().unwrap().remove(&website_id);
        }

        pub fn seed_tick(&self, website_id: Uuid, region_id: Uuid, status: TickStatus) {
            self.ticks.lock().unwrap().push(NewTick {
                website_id,
                region_id,
                status,
                response_time_ms: 1,
            });
        }

        pub fn ticks(&self) -> Vec<NewTick> {
            self.ticks.lock().unwrap().clone()
        }

        /// Makes every subsequent `record_tick` fail, to exercise the
        /// logged-and-skipped path.
        pub fn fail_tick_inserts(&self) {
            *self.fail_inserts.lock().unwrap() = true;
        }
    }

    #[async_trait]
    impl DispatchCatalog for MemoryCatalog {
        async fn find_website(
            &self,
            website_id: Uuid,
        ) -> Result<Option<WebsiteRecord>, CatalogError> {
            Ok(self
                .websites
                .lock()
                .unwrap()
                .get(&website_id)
                .map(|(_, record)| record.clone()))
        }

        async fn record_tick(&self, tick: NewTick) -> Result<(), CatalogError> {
            if *self.fail_inserts.lock().unwrap() {
                return Err(CatalogError::Storage("tick insert failed".to_string()));
            }
            self.ticks.lock().unwrap().push(tick);
            Ok(())
        }

        async fn unchecked_websites(
            &self,
            user_id: i32,
        ) -> Result<Vec<WebsiteRecord>, CatalogError> {
            let ticks = self.ticks.lock().unwrap();
            let websites = self.websites.lock().unwrap();
            let mut unchecked: Vec<WebsiteRecord> = websites
                .values()
                .filter(|(owner, record)| {
                    *owner == user_id && !ticks.iter().any(|t| t.website_id == record.id)
                })
                .map(|(_, record)| record.clone())
                .collect();
            unchecked.sort_by(|a, b| a.url.cmp(&b.url));
            Ok(unchecked)
        }

        async fn count_websites(&self, user_id: i32) -> Result<u64, CatalogError> {
            Ok(self
                .websites
                .lock()
                .unwrap()
                .values()
                .filter(|(owner, _)| *owner == user_id)
                .count() as u64)
        }
    }
}
