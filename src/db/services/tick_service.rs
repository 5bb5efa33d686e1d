//! Append-only tick recording and read-side aggregation. Ticks are never
//! updated; the only deletion path is the cascade when a website goes away.

use std::collections::HashMap;

use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, DbErr, EntityTrait, PaginatorTrait,
    QueryFilter, QueryOrder, Set,
};
use uuid::Uuid;

use crate::db::entities::{prelude::*, website_tick};
use crate::db::enums::TickStatus;

pub async fn create_tick(
    db: &DatabaseConnection,
    website_id: Uuid,
    region_id: Uuid,
    status: TickStatus,
    response_time_ms: i32,
) -> Result<website_tick::Model, DbErr> {
    website_tick::ActiveModel {
        id: Set(Uuid::new_v4()),
        website_id: Set(website_id),
        region_id: Set(region_id),
        status: Set(status),
        response_time_ms: Set(response_time_ms),
        created_at: Set(Utc::now()),
    }
    .insert(db)
    .await
}

/// Most recent tick for one website, or `None` when it was never probed.
pub async fn get_latest_tick(
    db: &DatabaseConnection,
    website_id: Uuid,
) -> Result<Option<website_tick::Model>, DbErr> {
    WebsiteTick::find()
        .filter(website_tick::Column::WebsiteId.eq(website_id))
        .order_by_desc(website_tick::Column::CreatedAt)
        .one(db)
        .await
}

/// Latest tick per website for a set of websites, one query plus an
/// in-memory group-by. Websites with no ticks are simply absent from the
/// map; their display status is `Unknown`.
pub async fn get_latest_ticks_by_website(
    db: &DatabaseConnection,
    website_ids: &[Uuid],
) -> Result<HashMap<Uuid, website_tick::Model>, DbErr> {
    if website_ids.is_empty() {
        return Ok(HashMap::new());
    }

    let ticks = WebsiteTick::find()
        .filter(website_tick::Column::WebsiteId.is_in(website_ids.iter().copied()))
        .order_by_desc(website_tick::Column::CreatedAt)
        .all(db)
        .await?;

    let mut latest: HashMap<Uuid, website_tick::Model> = HashMap::new();
    for tick in ticks {
        latest.entry(tick.website_id).or_insert(tick);
    }
    Ok(latest)
}

/// How many ticks reference a region; a non-zero count blocks region
/// deletion.
pub async fn count_ticks_by_region(
    db: &DatabaseConnection,
    region_id: Uuid,
) -> Result<u64, DbErr> {
    WebsiteTick::find()
        .filter(website_tick::Column::RegionId.eq(region_id))
        .count(db)
        .await
}
