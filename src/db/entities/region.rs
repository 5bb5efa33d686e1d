use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// A named probing origin with its own work queue. One consumer group per
/// region; deletion is blocked while any tick still references it.
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "regions")]
#[serde(rename_all = "camelCase")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    #[sea_orm(unique)]
    pub name: String,
    pub created_at: ChronoDateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::website_tick::Entity")]
    WebsiteTicks,
}

impl Related<super::website_tick::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::WebsiteTicks.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
