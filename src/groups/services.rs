//! Membership and ownership state machine.
//!
//! Groups have exactly two lifecycle states: active (at least one member)
//! and gone. A group is never left ownerless; when the owner leaves,
//! ownership hands off to the member with the lowest user id, and when the
//! last member leaves the group row is deleted, cascading its expenses and
//! messages.

use rand::{Rng, SeedableRng};
use sqlx::SqlitePool;
use tracing::info;

use crate::error::ApiError;
use crate::groups::repo::{
    delete_group_tx, remove_member_tx, set_owner_tx, successor_tx, Group,
};
use crate::verification::generate_invite_code;

/// Result of a leave operation.
#[derive(Debug)]
pub enum LeaveOutcome {
    /// The group persists; carries its post-leave state.
    Left(Group),
    /// The leaving user was the sole member, the group was deleted.
    Deleted,
}

/// Generate an invite code that no existing group uses, retrying on
/// collision. The unique column on `groups.invite_code` remains the source
/// of truth under races; generation only minimizes retries.
pub async fn generate_unique_invite_code<R: Rng>(
    db: &SqlitePool,
    rng: &mut R,
) -> anyhow::Result<String> {
    loop {
        let code = generate_invite_code(rng);
        if !Group::invite_code_exists(db, &code).await? {
            return Ok(code);
        }
    }
}

/// Create a group; the creator becomes owner and first member.
pub async fn create_group(
    db: &SqlitePool,
    name: &str,
    creator_id: i64,
) -> Result<Group, ApiError> {
    let name = name.trim();
    if name.is_empty() {
        return Err(ApiError::field("name", "This field may not be blank."));
    }
    let code = generate_unique_invite_code(db, &mut rand::rngs::StdRng::from_entropy()).await?;
    let group = Group::create(db, name, &code, creator_id).await?;
    info!(group_id = group.id, owner_id = creator_id, "group created");
    Ok(group)
}

/// Join by exact invite code match. Already-a-member is a no-op, not an
/// error; either way the group's current state comes back.
pub async fn join_by_code(
    db: &SqlitePool,
    invite_code: &str,
    user_id: i64,
) -> Result<Group, ApiError> {
    let group = Group::find_by_invite_code(db, invite_code)
        .await?
        .ok_or_else(|| ApiError::not_found("Invalid invite code."))?;
    Group::add_member(db, group.id, user_id).await?;
    info!(group_id = group.id, user_id, "member joined");
    Ok(group)
}

/// Leave a group. Non-owners are simply removed. A leaving owner hands
/// ownership to the remaining member with the lowest id; a sole-member
/// owner takes the group down with them.
pub async fn leave(db: &SqlitePool, group_id: i64, user_id: i64) -> Result<LeaveOutcome, ApiError> {
    let group = Group::find_by_id(db, group_id)
        .await?
        .ok_or_else(|| ApiError::not_found("Group not found."))?;
    if !Group::is_member(db, group_id, user_id).await? {
        return Err(ApiError::not_found("You are not a member of this group."));
    }

    let mut tx = db.begin().await?;
    if group.owner_id == user_id {
        match successor_tx(&mut tx, group_id, user_id).await? {
            Some(successor) => {
                set_owner_tx(&mut tx, group_id, successor).await?;
                remove_member_tx(&mut tx, group_id, user_id).await?;
                tx.commit().await?;
                info!(group_id, old_owner = user_id, new_owner = successor, "ownership handed off");
            }
            None => {
                delete_group_tx(&mut tx, group_id).await?;
                tx.commit().await?;
                info!(group_id, user_id, "last member left, group deleted");
                return Ok(LeaveOutcome::Deleted);
            }
        }
    } else {
        remove_member_tx(&mut tx, group_id, user_id).await?;
        tx.commit().await?;
        info!(group_id, user_id, "member left");
    }

    let group = Group::find_by_id(db, group_id)
        .await?
        .ok_or_else(|| ApiError::not_found("Group not found."))?;
    Ok(LeaveOutcome::Left(group))
}

/// Owner-only removal of another member. The owner must use leave for
/// themselves so the hand-off rules apply.
pub async fn remove_member(
    db: &SqlitePool,
    group_id: i64,
    acting_user_id: i64,
    target_user_id: i64,
) -> Result<(), ApiError> {
    let group = Group::find_by_id(db, group_id)
        .await?
        .ok_or_else(|| ApiError::not_found("Group not found."))?;
    if group.owner_id != acting_user_id {
        return Err(ApiError::forbidden("Only the group owner can remove members."));
    }
    if target_user_id == acting_user_id {
        return Err(ApiError::field(
            "user_id",
            "Owners cannot remove themselves; leave the group instead.",
        ));
    }
    if !Group::is_member(db, group_id, target_user_id).await? {
        return Err(ApiError::not_found("User is not a member of this group."));
    }

    let mut tx = db.begin().await?;
    remove_member_tx(&mut tx, group_id, target_user_id).await?;
    tx.commit().await?;
    info!(group_id, target_user_id, "member removed by owner");
    Ok(())
}

/// Owner-only rename.
pub async fn rename(
    db: &SqlitePool,
    group_id: i64,
    acting_user_id: i64,
    new_name: &str,
) -> Result<Group, ApiError> {
    let group = Group::find_by_id(db, group_id)
        .await?
        .ok_or_else(|| ApiError::not_found("Group not found."))?;
    if group.owner_id != acting_user_id {
        return Err(ApiError::forbidden("Only the group owner can rename the group."));
    }
    let name = new_name.trim();
    if name.is_empty() {
        return Err(ApiError::field("name", "This field may not be blank."));
    }
    Group::rename(db, group_id, name).await?;
    Ok(Group {
        name: name.to_string(),
        ..group
    })
}

/// Run the leave state machine on every group the user owns. Used by
/// account deletion so ownership hands off (or the group dies) before the
/// user row disappears.
pub async fn relinquish_all_owned(db: &SqlitePool, user_id: i64) -> Result<(), ApiError> {
    let owned: Vec<(i64,)> = sqlx::query_as("SELECT id FROM groups WHERE owner_id = ?")
        .bind(user_id)
        .fetch_all(db)
        .await?;
    for (group_id,) in owned {
        // The owner may not be a member of their own group in degenerate
        // data; hand off or delete directly in that case.
        match leave(db, group_id, user_id).await {
            Ok(_) => {}
            Err(ApiError::NotFound(_)) => {
                let mut tx = db.begin().await?;
                match successor_tx(&mut tx, group_id, user_id).await? {
                    Some(successor) => set_owner_tx(&mut tx, group_id, successor).await?,
                    None => delete_group_tx(&mut tx, group_id).await?,
                }
                tx.commit().await?;
            }
            Err(e) => return Err(e),
        }
    }
    Ok(())
}
