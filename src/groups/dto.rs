use serde::{Deserialize, Serialize};

use crate::groups::repo::{Group, MemberRow};

/// Group as returned by the API: the row plus its member id set.
#[derive(Debug, Serialize)]
pub struct GroupResponse {
    pub id: i64,
    pub name: String,
    pub invite_code: String,
    pub owner: i64,
    pub members: Vec<i64>,
}

impl GroupResponse {
    pub fn from_parts(group: Group, members: Vec<i64>) -> Self {
        Self {
            id: group.id,
            name: group.name,
            invite_code: group.invite_code,
            owner: group.owner_id,
            members,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct MemberResponse {
    pub id: i64,
    pub username: String,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub avatar: String,
    /// True for the group owner.
    pub is_admin: bool,
}

impl MemberResponse {
    pub fn from_row(row: MemberRow, owner_id: i64) -> Self {
        Self {
            is_admin: row.id == owner_id,
            id: row.id,
            username: row.username,
            email: row.email,
            first_name: row.first_name,
            last_name: row.last_name,
            avatar: row.avatar,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct CreateGroupRequest {
    pub name: String,
}

#[derive(Debug, Deserialize)]
pub struct JoinGroupRequest {
    pub invite_code: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct RemoveMemberRequest {
    pub user_id: i64,
}

#[derive(Debug, Deserialize)]
pub struct RenameGroupRequest {
    pub name: String,
}
