use sqlx::{FromRow, SqlitePool};
use time::OffsetDateTime;

/// Expense joined with its payer's username. `paid_by` stays null when the
/// payer's account has been deleted; the record itself is preserved.
#[derive(Debug, Clone, FromRow)]
pub struct ExpenseRow {
    pub id: i64,
    pub group_id: i64,
    pub paid_by: Option<i64>,
    pub paid_by_username: Option<String>,
    pub amount_cents: i64,
    pub note: String,
    pub created_at: OffsetDateTime,
}

const EXPENSE_SELECT: &str = "SELECT e.id, e.group_id, e.paid_by, u.username AS paid_by_username,
       e.amount_cents, e.note, e.created_at
 FROM expenses e
 LEFT JOIN users u ON u.id = e.paid_by";

pub async fn list_by_group(db: &SqlitePool, group_id: i64) -> anyhow::Result<Vec<ExpenseRow>> {
    let rows = sqlx::query_as::<_, ExpenseRow>(&format!(
        "{EXPENSE_SELECT} WHERE e.group_id = ? ORDER BY e.id"
    ))
    .bind(group_id)
    .fetch_all(db)
    .await?;
    Ok(rows)
}

pub async fn create(
    db: &SqlitePool,
    group_id: i64,
    paid_by: i64,
    amount_cents: i64,
    note: &str,
) -> anyhow::Result<ExpenseRow> {
    let (id,): (i64,) = sqlx::query_as(
        "INSERT INTO expenses (group_id, paid_by, amount_cents, note, created_at)
         VALUES (?, ?, ?, ?, ?)
         RETURNING id",
    )
    .bind(group_id)
    .bind(paid_by)
    .bind(amount_cents)
    .bind(note)
    .bind(OffsetDateTime::now_utc())
    .fetch_one(db)
    .await?;

    let row = sqlx::query_as::<_, ExpenseRow>(&format!("{EXPENSE_SELECT} WHERE e.id = ?"))
        .bind(id)
        .fetch_one(db)
        .await?;
    Ok(row)
}
