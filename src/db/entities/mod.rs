//! SeaORM entities mapping to the catalog tables.
//!
//! Each entity lives in its own module (`user.rs`, `website.rs`, ...).

pub mod region;
pub mod user;
pub mod website;
pub mod website_tick;

// Prelude module for easy importing of all entities and their related types
pub mod prelude {
    pub use super::user::Entity as User;
    pub use super::user::Model as UserModel;
    pub use super::user::ActiveModel as UserActiveModel;
    pub use super::user::Column as UserColumn;

    pub use super::region::Entity as Region;
    pub use super::region::Model as RegionModel;
    pub use super::region::ActiveModel as RegionActiveModel;
    pub use super::region::Column as RegionColumn;

    pub use super::website::Entity as Website;
    pub use super::website::Model as WebsiteModel;
    pub use super::website::ActiveModel as WebsiteActiveModel;
    pub use super::website::Column as WebsiteColumn;

    pub use super::website_tick::Entity as WebsiteTick;
    pub use super::website_tick::Model as WebsiteTickModel;
    pub use super::website_tick::ActiveModel as WebsiteTickActiveModel;
    pub use super::website_tick::Column as WebsiteTickColumn;
}
