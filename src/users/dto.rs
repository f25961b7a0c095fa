use serde::{Deserialize, Serialize};

/// Full profile view returned by GET/PUT /profile.
#[derive(Debug, Serialize)]
pub struct ProfileResponse {
    pub id: i64,
    pub username: String,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub avatar: String,
    /// Staged address awaiting confirmation, empty when none.
    pub pending_email: String,
}

/// Partial update; absent fields are left untouched.
#[derive(Debug, Deserialize)]
pub struct UpdateProfileRequest {
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub username: Option<String>,
    pub avatar: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct RequestEmailChange {
    pub email: String,
}

#[derive(Debug, Deserialize)]
pub struct VerifyEmailChange {
    pub code: String,
}
