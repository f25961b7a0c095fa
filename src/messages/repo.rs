use sqlx::{FromRow, SqlitePool};
use time::OffsetDateTime;

/// Chat message joined with its sender's username. `sender` stays null when
/// the sender's account has been deleted.
#[derive(Debug, Clone, FromRow)]
pub struct MessageRow {
    pub id: i64,
    pub group_id: i64,
    pub sender: Option<i64>,
    pub sender_username: Option<String>,
    pub text: String,
    pub ts: OffsetDateTime,
}

const MESSAGE_SELECT: &str = "SELECT m.id, m.group_id, m.sender, u.username AS sender_username, m.text, m.ts
 FROM messages m
 LEFT JOIN users u ON u.id = m.sender";

pub async fn list_by_group(db: &SqlitePool, group_id: i64) -> anyhow::Result<Vec<MessageRow>> {
    let rows = sqlx::query_as::<_, MessageRow>(&format!(
        "{MESSAGE_SELECT} WHERE m.group_id = ? ORDER BY m.id"
    ))
    .bind(group_id)
    .fetch_all(db)
    .await?;
    Ok(rows)
}

pub async fn create(
    db: &SqlitePool,
    group_id: i64,
    sender: i64,
    text: &str,
) -> anyhow::Result<MessageRow> {
    let (id,): (i64,) = sqlx::query_as(
        "INSERT INTO messages (group_id, sender, text, ts) VALUES (?, ?, ?, ?) RETURNING id",
    )
    .bind(group_id)
    .bind(sender)
    .bind(text)
    .bind(OffsetDateTime::now_utc())
    .fetch_one(db)
    .await?;

    let row = sqlx::query_as::<_, MessageRow>(&format!("{MESSAGE_SELECT} WHERE m.id = ?"))
        .bind(id)
        .fetch_one(db)
        .await?;
    Ok(row)
}
