use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

use crate::messages::repo::MessageRow;

#[derive(Debug, Deserialize)]
pub struct MessageQuery {
    pub group: i64,
}

#[derive(Debug, Deserialize)]
pub struct CreateMessageRequest {
    pub group: i64,
    pub text: String,
}

#[derive(Debug, Serialize)]
pub struct MessageResponse {
    pub id: i64,
    pub group: i64,
    pub sender: Option<i64>,
    pub sender_username: Option<String>,
    pub text: String,
    #[serde(with = "time::serde::rfc3339")]
    pub ts: OffsetDateTime,
}

impl From<MessageRow> for MessageResponse {
    fn from(row: MessageRow) -> Self {
        Self {
            id: row.id,
            group: row.group_id,
            sender: row.sender,
            sender_username: row.sender_username,
            text: row.text,
            ts: row.ts,
        }
    }
}
