use chrono::Utc;
use sea_orm::sea_query::Query;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, DbErr, EntityTrait, PaginatorTrait,
    QueryFilter, Set, TransactionTrait,
};
use uuid::Uuid;

use crate::db::entities::{prelude::*, website, website_tick};

pub async fn create_website(
    db: &DatabaseConnection,
    user_id: i32,
    url: &str,
) -> Result<website::Model, DbErr> {
    website::ActiveModel {
        id: Set(Uuid::new_v4()),
        url: Set(url.to_string()),
        user_id: Set(user_id),
        created_at: Set(Utc::now()),
    }
    .insert(db)
    .await
}

pub async fn get_website_by_id(
    db: &DatabaseConnection,
    website_id: Uuid,
) -> Result<Option<website::Model>, DbErr> {
    Website::find_by_id(website_id).one(db).await
}

/// Duplicate check: websites are unique per (owner, url).
pub async fn get_website_by_user_and_url(
    db: &DatabaseConnection,
    user_id: i32,
    url: &str,
) -> Result<Option<website::Model>, DbErr> {
    Website::find()
        .filter(website::Column::UserId.eq(user_id))
        .filter(website::Column::Url.eq(url))
        .one(db)
        .await
}

pub async fn get_websites_by_user_id(
    db: &DatabaseConnection,
    user_id: i32,
) -> Result<Vec<website::Model>, DbErr> {
    Website::find()
        .filter(website::Column::UserId.eq(user_id))
        .all(db)
        .await
}

/// The owner's websites that have never been probed from any region, i.e.
/// with zero ticks.
pub async fn get_unchecked_websites(
    db: &DatabaseConnection,
    user_id: i32,
) -> Result<Vec<website::Model>, DbErr> {
    let probed = Query::select()
        .column(website_tick::Column::WebsiteId)
        .from(website_tick::Entity)
        .to_owned();

    Website::find()
        .filter(website::Column::UserId.eq(user_id))
        .filter(website::Column::Id.not_in_subquery(probed))
        .all(db)
        .await
}

pub async fn count_websites_by_user_id(
    db: &DatabaseConnection,
    user_id: i32,
) -> Result<u64, DbErr> {
    Website::find()
        .filter(website::Column::UserId.eq(user_id))
        .count(db)
        .await
}

/// Deletes a website and its tick history in one transaction. Returns the
/// number of website rows removed (0 when it was already gone).
pub async fn delete_website_with_ticks(
    db: &DatabaseConnection,
    website_id: Uuid,
) -> Result<u64, DbErr> {
    let txn = db.begin().await?;
    WebsiteTick::delete_many()
        .filter(website_tick::Column::WebsiteId.eq(website_id))
        .exec(&txn)
        .await?;
    let deleted = Website::delete_by_id(website_id).exec(&txn).await?;
    txn.commit().await?;
    Ok(deleted.rows_affected)
}
