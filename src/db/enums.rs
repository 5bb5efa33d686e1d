use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Probe result status persisted on every tick.
///
/// `Unknown` is never written by the probe path; it is the computed display
/// status of a website that has no ticks yet.
#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "Text", enum_name = "tick_status_enum")]
pub enum TickStatus {
    #[sea_orm(string_value = "Up")]
    Up,
    #[sea_orm(string_value = "Down")]
    Down,
    #[sea_orm(string_value = "Unknown")]
    Unknown,
}

impl fmt::Display for TickStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}", self)
    }
}
