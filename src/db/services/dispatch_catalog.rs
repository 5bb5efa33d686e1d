//! `DispatchCatalog` implementation backed by the SeaORM services, giving
//! the dispatch pipeline its narrow view of the catalog store.

use async_trait::async_trait;
use sea_orm::{DatabaseConnection, DbErr};
use uuid::Uuid;

use crate::db::services::{tick_service, website_service};
use crate::dispatch::catalog::{CatalogError, DispatchCatalog, NewTick, WebsiteRecord};

fn storage_err(err: DbErr) -> CatalogError {
    CatalogError::Storage(err.to_string())
}

#[async_trait]
impl DispatchCatalog for DatabaseConnection {
    async fn find_website(&self, website_id: Uuid) -> Result<Option<WebsiteRecord>, CatalogError> {
        let website = website_service::get_website_by_id(self, website_id)
            .await
            .map_err(storage_err)?;
        Ok(website.map(|w| WebsiteRecord { id: w.id, url: w.url }))
    }

    async fn record_tick(&self, tick: NewTick) -> Result<(), CatalogError> {
        tick_service::create_tick(
            self,
            tick.website_id,
            tick.region_id,
            tick.status,
            tick.response_time_ms,
        )
        .await
        .map_err(storage_err)?;
        Ok(())
    }

    async fn unchecked_websites(&self, user_id: i32) -> Result<Vec<WebsiteRecord>, CatalogError> {
        let websites = website_service::get_unchecked_websites(self, user_id)
            .await
            .map_err(storage_err)?;
        Ok(websites
            .into_iter()
            .map(|w| WebsiteRecord { id: w.id, url: w.url })
            .collect())
    }

    async fn count_websites(&self, user_id: i32) -> Result<u64, CatalogError> {
        website_service::count_websites_by_user_id(self, user_id)
            .await
            .map_err(storage_err)
    }
}
