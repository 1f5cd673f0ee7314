use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use time::OffsetDateTime;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct SupportReport {
    pub id: i32,
    pub name: String,
    pub email: String,
    pub message: String,
    pub resolved: bool,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewSupportReport {
    pub name: String,
    pub email: String,
    pub message: String,
}

/// Ticket counts taken from a single snapshot, so `total == unresolved + resolved`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct SupportStats {
    pub total: i64,
    pub unresolved: i64,
    pub resolved: i64,
}
