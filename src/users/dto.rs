use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use uuid::Uuid;

use super::repo_types::User;

/// Public part of the user returned to the client.
#[derive(Debug, Clone, Serialize)]
pub struct PublicUser {
    pub id: Uuid,
    pub username: String,
    pub fullname: String,
    pub email: Option<String>,
    #[serde(rename = "TTP")]
    pub ttp: i64,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}

impl From<User> for PublicUser {
    fn from(u: User) -> Self {
        Self {
            id: u.id,
            username: u.username,
            fullname: u.fullname,
            email: u.email,
            ttp: u.ttp,
            created_at: u.created_at,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct Profile {
    #[serde(flatten)]
    pub user: PublicUser,
    pub friends: Vec<PublicUser>,
}

#[derive(Debug, Serialize)]
pub struct FriendList {
    pub friends: Vec<PublicUser>,
}

#[derive(Debug, Serialize)]
pub struct Message {
    pub message: String,
}

/// Leaderboard row; `rank` starts at 1.
#[derive(Debug, Serialize)]
pub struct LeaderboardEntry {
    pub rank: usize,
    #[serde(flatten)]
    pub user: PublicUser,
}

#[derive(Debug, Deserialize)]
pub struct SearchQuery {
    pub name: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct UpdateUserRequest {
    pub fullname: Option<String>,
    pub email: Option<String>,
    #[serde(rename = "TTP", alias = "ttp")]
    pub ttp: Option<i64>,
    pub password: Option<String>,
}
