use sqlx::{FromRow, SqlitePool};

/// One-to-one extension of a user. `email_token` is the single outstanding
/// one-time code slot (empty when none pending); `pending_email` stages a
/// new address until it is confirmed.
#[derive(Debug, Clone, FromRow)]
pub struct Profile {
    pub user_id: i64,
    pub avatar: String,
    pub email_token: String,
    pub pending_email: String,
}

impl Profile {
    pub async fn get(db: &SqlitePool, user_id: i64) -> anyhow::Result<Option<Profile>> {
        let profile = sqlx::query_as::<_, Profile>(
            "SELECT user_id, avatar, email_token, pending_email FROM profiles WHERE user_id = ?",
        )
        .bind(user_id)
        .fetch_optional(db)
        .await?;
        Ok(profile)
    }

    /// Overwrite the outstanding one-time code. Issuing a new code
    /// implicitly invalidates the previous one.
    pub async fn set_email_token(db: &SqlitePool, user_id: i64, code: &str) -> anyhow::Result<()> {
        sqlx::query("UPDATE profiles SET email_token = ? WHERE user_id = ?")
            .bind(code)
            .bind(user_id)
            .execute(db)
            .await?;
        Ok(())
    }

    /// Stage a new email address together with the code that must confirm it.
    pub async fn stage_email_change(
        db: &SqlitePool,
        user_id: i64,
        pending_email: &str,
        code: &str,
    ) -> anyhow::Result<()> {
        sqlx::query("UPDATE profiles SET pending_email = ?, email_token = ? WHERE user_id = ?")
            .bind(pending_email)
            .bind(code)
            .bind(user_id)
            .execute(db)
            .await?;
        Ok(())
    }

    pub async fn set_avatar(db: &SqlitePool, user_id: i64, avatar: &str) -> anyhow::Result<()> {
        sqlx::query("UPDATE profiles SET avatar = ? WHERE user_id = ?")
            .bind(avatar)
            .bind(user_id)
            .execute(db)
            .await?;
        Ok(())
    }
}
