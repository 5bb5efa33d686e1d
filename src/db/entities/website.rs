use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// A monitored website. URLs are stored scheme-less (host plus optional
/// path); the prober prepends `https://` at probe time.
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "websites")]
#[serde(rename_all = "camelCase")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub url: String,
    pub user_id: i32,
    pub created_at: ChronoDateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::user::Entity",
        from = "Column::UserId",
        to = "super::user::Column::Id",
        on_delete = "Cascade"
    )]
    User,

    #[sea_orm(has_many = "super::website_tick::Entity")]
    WebsiteTicks,
}

impl Related<super::user::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::User.def()
    }
}

impl Related<super::website_tick::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::WebsiteTicks.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
