use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

use crate::expenses::repo::ExpenseRow;

#[derive(Debug, Deserialize)]
pub struct ExpenseQuery {
    pub group: i64,
}

#[derive(Debug, Deserialize)]
pub struct CreateExpenseRequest {
    pub group: i64,
    pub amount_cents: i64,
    #[serde(default)]
    pub note: String,
}

#[derive(Debug, Serialize)]
pub struct ExpenseResponse {
    pub id: i64,
    pub group: i64,
    pub paid_by: Option<i64>,
    pub paid_by_username: Option<String>,
    pub amount_cents: i64,
    pub note: String,
    #[serde(with = "time::serde::rfc3339")]
    pub created: OffsetDateTime,
}

impl From<ExpenseRow> for ExpenseResponse {
    fn from(row: ExpenseRow) -> Self {
        Self {
            id: row.id,
            group: row.group_id,
            paid_by: row.paid_by,
            paid_by_username: row.paid_by_username,
            amount_cents: row.amount_cents,
            note: row.note,
            created: row.created_at,
        }
    }
}
