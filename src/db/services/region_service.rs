use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, DbErr, EntityTrait, QueryFilter, QueryOrder,
    Set,
};
use uuid::Uuid;

use crate::db::entities::{prelude::*, region};

/// Creates a region. Name uniqueness is checked by the caller first (and
/// enforced by the unique index).
pub async fn create_region(db: &DatabaseConnection, name: &str) -> Result<region::Model, DbErr> {
    region::ActiveModel {
        id: Set(Uuid::new_v4()),
        name: Set(name.to_string()),
        created_at: Set(Utc::now()),
    }
    .insert(db)
    .await
}

pub async fn get_region_by_id(
    db: &DatabaseConnection,
    region_id: Uuid,
) -> Result<Option<region::Model>, DbErr> {
    Region::find_by_id(region_id).one(db).await
}

pub async fn get_region_by_name(
    db: &DatabaseConnection,
    name: &str,
) -> Result<Option<region::Model>, DbErr> {
    Region::find()
        .filter(region::Column::Name.eq(name))
        .one(db)
        .await
}

pub async fn get_all_regions(db: &DatabaseConnection) -> Result<Vec<region::Model>, DbErr> {
    Region::find()
        .order_by_asc(region::Column::Name)
        .all(db)
        .await
}

/// Deletes a region. Callers must first verify no tick references it (see
/// `tick_service::count_ticks_by_region`); the FK restriction backs that
/// check up at the database level.
pub async fn delete_region(db: &DatabaseConnection, region_id: Uuid) -> Result<u64, DbErr> {
    let result = Region::delete_by_id(region_id).exec(db).await?;
    Ok(result.rows_affected)
}
