use sqlx::FromRow;
use time::OffsetDateTime;
use uuid::Uuid;

/// User record in the database.
#[derive(Debug, Clone, FromRow)]
pub struct User {
    pub id: Uuid,                   // unique user ID
    pub username: String,           // unique login name
    pub password_hash: String,      // Argon2 hash, never leaves the server
    pub fullname: String,           // display name, searchable
    pub email: Option<String>,
    pub ttp: i64,                   // leaderboard score
    pub created_at: OffsetDateTime,
}

/// Fields needed to insert a user; the password is already hashed.
#[derive(Debug, Clone)]
pub struct NewUser {
    pub username: String,
    pub password_hash: String,
    pub fullname: String,
    pub email: Option<String>,
    pub ttp: i64,
}

/// Partial update; `None` leaves the column untouched.
#[derive(Debug, Clone, Default)]
pub struct UserPatch {
    pub fullname: Option<String>,
    /// `Some(None)` clears the stored email.
    pub email: Option<Option<String>>,
    pub ttp: Option<i64>,
    pub password_hash: Option<String>,
}

impl UserPatch {
    pub fn is_empty(&self) -> bool {
        self.fullname.is_none()
            && self.email.is_none()
            && self.ttp.is_none()
            && self.password_hash.is_none()
    }
}
