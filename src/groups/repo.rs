use serde::{Deserialize, Serialize};
use sqlx::{FromRow, Sqlite, SqlitePool, Transaction};

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Group {
    pub id: i64,
    pub name: String,
    pub invite_code: String,
    pub owner_id: i64,
}

/// Member row as exposed by GET /groups/{id}/members.
#[derive(Debug, Clone, FromRow)]
pub struct MemberRow {
    pub id: i64,
    pub username: String,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub avatar: String,
}

impl Group {
    pub async fn find_by_id(db: &SqlitePool, id: i64) -> anyhow::Result<Option<Group>> {
        let group = sqlx::query_as::<_, Group>(
            "SELECT id, name, invite_code, owner_id FROM groups WHERE id = ?",
        )
        .bind(id)
        .fetch_optional(db)
        .await?;
        Ok(group)
    }

    /// Exact-match lookup; invite codes are case-sensitive tokens.
    pub async fn find_by_invite_code(
        db: &SqlitePool,
        invite_code: &str,
    ) -> anyhow::Result<Option<Group>> {
        let group = sqlx::query_as::<_, Group>(
            "SELECT id, name, invite_code, owner_id FROM groups WHERE invite_code = ?",
        )
        .bind(invite_code)
        .fetch_optional(db)
        .await?;
        Ok(group)
    }

    pub async fn invite_code_exists(db: &SqlitePool, invite_code: &str) -> anyhow::Result<bool> {
        let row: Option<(i64,)> = sqlx::query_as("SELECT id FROM groups WHERE invite_code = ?")
            .bind(invite_code)
            .fetch_optional(db)
            .await?;
        Ok(row.is_some())
    }

    /// All groups the user belongs to or owns. Owners are expected to also
    /// be members; the union tolerates the case where they are not.
    pub async fn list_visible(db: &SqlitePool, user_id: i64) -> anyhow::Result<Vec<Group>> {
        let groups = sqlx::query_as::<_, Group>(
            "SELECT DISTINCT g.id, g.name, g.invite_code, g.owner_id
             FROM groups g
             LEFT JOIN group_members m ON m.group_id = g.id
             WHERE m.user_id = ? OR g.owner_id = ?
             ORDER BY g.id",
        )
        .bind(user_id)
        .bind(user_id)
        .fetch_all(db)
        .await?;
        Ok(groups)
    }

    pub async fn member_ids(db: &SqlitePool, group_id: i64) -> anyhow::Result<Vec<i64>> {
        let rows: Vec<(i64,)> = sqlx::query_as(
            "SELECT user_id FROM group_members WHERE group_id = ? ORDER BY user_id",
        )
        .bind(group_id)
        .fetch_all(db)
        .await?;
        Ok(rows.into_iter().map(|(id,)| id).collect())
    }

    pub async fn members(db: &SqlitePool, group_id: i64) -> anyhow::Result<Vec<MemberRow>> {
        let rows = sqlx::query_as::<_, MemberRow>(
            "SELECT u.id, u.username, u.email, u.first_name, u.last_name, p.avatar
             FROM group_members m
             JOIN users u ON u.id = m.user_id
             JOIN profiles p ON p.user_id = u.id
             WHERE m.group_id = ?
             ORDER BY u.id",
        )
        .bind(group_id)
        .fetch_all(db)
        .await?;
        Ok(rows)
    }

    pub async fn is_member(db: &SqlitePool, group_id: i64, user_id: i64) -> anyhow::Result<bool> {
        let row: Option<(i64,)> = sqlx::query_as(
            "SELECT user_id FROM group_members WHERE group_id = ? AND user_id = ?",
        )
        .bind(group_id)
        .bind(user_id)
        .fetch_optional(db)
        .await?;
        Ok(row.is_some())
    }

    /// Idempotent: joining a group you already belong to is a no-op.
    pub async fn add_member(db: &SqlitePool, group_id: i64, user_id: i64) -> anyhow::Result<()> {
        sqlx::query(
            "INSERT INTO group_members (group_id, user_id) VALUES (?, ?)
             ON CONFLICT (group_id, user_id) DO NOTHING",
        )
        .bind(group_id)
        .bind(user_id)
        .execute(db)
        .await?;
        Ok(())
    }

    pub async fn create(
        db: &SqlitePool,
        name: &str,
        invite_code: &str,
        owner_id: i64,
    ) -> anyhow::Result<Group> {
        let mut tx = db.begin().await?;
        let group = sqlx::query_as::<_, Group>(
            "INSERT INTO groups (name, invite_code, owner_id) VALUES (?, ?, ?)
             RETURNING id, name, invite_code, owner_id",
        )
        .bind(name)
        .bind(invite_code)
        .bind(owner_id)
        .fetch_one(&mut *tx)
        .await?;
        sqlx::query("INSERT INTO group_members (group_id, user_id) VALUES (?, ?)")
            .bind(group.id)
            .bind(owner_id)
            .execute(&mut *tx)
            .await?;
        tx.commit().await?;
        Ok(group)
    }

    pub async fn rename(db: &SqlitePool, group_id: i64, name: &str) -> anyhow::Result<()> {
        sqlx::query("UPDATE groups SET name = ? WHERE id = ?")
            .bind(name)
            .bind(group_id)
            .execute(db)
            .await?;
        Ok(())
    }
}

// Mutations used by the leave state machine; these run inside the caller's
// transaction so the hand-off and removal land as one atomic unit.

pub async fn remove_member_tx(
    tx: &mut Transaction<'_, Sqlite>,
    group_id: i64,
    user_id: i64,
) -> anyhow::Result<()> {
    sqlx::query("DELETE FROM group_members WHERE group_id = ? AND user_id = ?")
        .bind(group_id)
        .bind(user_id)
        .execute(&mut **tx)
        .await?;
    Ok(())
}

pub async fn set_owner_tx(
    tx: &mut Transaction<'_, Sqlite>,
    group_id: i64,
    owner_id: i64,
) -> anyhow::Result<()> {
    sqlx::query("UPDATE groups SET owner_id = ? WHERE id = ?")
        .bind(owner_id)
        .bind(group_id)
        .execute(&mut **tx)
        .await?;
    Ok(())
}

pub async fn delete_group_tx(tx: &mut Transaction<'_, Sqlite>, group_id: i64) -> anyhow::Result<()> {
    sqlx::query("DELETE FROM groups WHERE id = ?")
        .bind(group_id)
        .execute(&mut **tx)
        .await?;
    Ok(())
}

/// Lowest user id among the remaining members, the deterministic successor
/// rule for ownership hand-off.
pub async fn successor_tx(
    tx: &mut Transaction<'_, Sqlite>,
    group_id: i64,
    excluding_user: i64,
) -> anyhow::Result<Option<i64>> {
    let row: (Option<i64>,) = sqlx::query_as(
        "SELECT MIN(user_id) FROM group_members WHERE group_id = ? AND user_id != ?",
    )
    .bind(group_id)
    .bind(excluding_user)
    .fetch_one(&mut **tx)
    .await?;
    Ok(row.0)
}
