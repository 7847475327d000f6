use async_trait::async_trait;
use sqlx::PgPool;
use thiserror::Error;
use uuid::Uuid;

use super::repo_types::{NewUser, User, UserPatch};

#[derive(Error, Debug)]
pub enum RepoError {
    #[error("username already taken")]
    UsernameTaken,

    #[error("user not found")]
    NotFound,

    #[error("database error: {0}")]
    Db(#[from] sqlx::Error),
}

pub type RepoResult<T> = Result<T, RepoError>;

/// Persistence seam for users and the friend relation.
#[async_trait]
pub trait UserRepository: Send + Sync {
    async fn find_by_id(&self, id: Uuid) -> RepoResult<Option<User>>;
    async fn find_by_username(&self, username: &str) -> RepoResult<Option<User>>;
    async fn create(&self, new_user: NewUser) -> RepoResult<User>;
    async fn update(&self, id: Uuid, patch: UserPatch) -> RepoResult<User>;

    /// Links both users to each other. Linking an existing pair is a no-op.
    async fn add_friendship(&self, user_id: Uuid, friend_id: Uuid) -> RepoResult<()>;

    /// Friends of `user_id` in the order they were added.
    async fn list_friends(&self, user_id: Uuid) -> RepoResult<Vec<User>>;

    /// Users ordered by TTP descending, ties by username.
    async fn top_by_ttp(&self, limit: i64) -> RepoResult<Vec<User>>;

    /// Case-insensitive regex match on full name, ordered by full name.
    async fn search_by_fullname(&self, pattern: &str, limit: i64) -> RepoResult<Vec<User>>;
}

const USER_COLUMNS: &str = "id, username, password_hash, fullname, email, ttp, created_at";

#[derive(Clone)]
pub struct PgUserRepository {
    db: PgPool,
}

impl PgUserRepository {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }
}

fn is_unique_violation(e: &sqlx::Error) -> bool {
    matches!(e, sqlx::Error::Database(db) if db.is_unique_violation())
}

fn is_foreign_key_violation(e: &sqlx::Error) -> bool {
    matches!(e, sqlx::Error::Database(db) if db.is_foreign_key_violation())
}

#[async_trait]
impl UserRepository for PgUserRepository {
    async fn find_by_id(&self, id: Uuid) -> RepoResult<Option<User>> {
        let user = sqlx::query_as::<_, User>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.db)
        .await?;
        Ok(user)
    }

    async fn find_by_username(&self, username: &str) -> RepoResult<Option<User>> {
        let user = sqlx::query_as::<_, User>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE username = $1"
        ))
        .bind(username)
        .fetch_optional(&self.db)
        .await?;
        Ok(user)
    }

    async fn create(&self, new_user: NewUser) -> RepoResult<User> {
        let res = sqlx::query_as::<_, User>(&format!(
            r#"
            INSERT INTO users (id, username, password_hash, fullname, email, ttp)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING {USER_COLUMNS}
            "#
        ))
        .bind(Uuid::new_v4())
        .bind(&new_user.username)
        .bind(&new_user.password_hash)
        .bind(&new_user.fullname)
        .bind(&new_user.email)
        .bind(new_user.ttp)
        .fetch_one(&self.db)
        .await;

        match res {
            Ok(user) => Ok(user),
            Err(e) if is_unique_violation(&e) => Err(RepoError::UsernameTaken),
            Err(e) => Err(e.into()),
        }
    }

    async fn update(&self, id: Uuid, patch: UserPatch) -> RepoResult<User> {
        let user = sqlx::query_as::<_, User>(&format!(
            r#"
            UPDATE users
               SET fullname      = COALESCE($2, fullname),
                   email         = CASE WHEN $3 THEN $4 ELSE email END,
                   ttp           = COALESCE($5, ttp),
                   password_hash = COALESCE($6, password_hash)
             WHERE id = $1
            RETURNING {USER_COLUMNS}
            "#
        ))
        .bind(id)
        .bind(patch.fullname)
        .bind(patch.email.is_some())
        .bind(patch.email.flatten())
        .bind(patch.ttp)
        .bind(patch.password_hash)
        .fetch_optional(&self.db)
        .await?;
        user.ok_or(RepoError::NotFound)
    }

    async fn add_friendship(&self, user_id: Uuid, friend_id: Uuid) -> RepoResult<()> {
        let mut tx = self.db.begin().await?;
        for (a, b) in [(user_id, friend_id), (friend_id, user_id)] {
            let res = sqlx::query(
                r#"
                INSERT INTO friendships (user_id, friend_id)
                VALUES ($1, $2)
                ON CONFLICT (user_id, friend_id) DO NOTHING
                "#,
            )
            .bind(a)
            .bind(b)
            .execute(&mut *tx)
            .await;

            match res {
                Ok(_) => {}
                Err(e) if is_foreign_key_violation(&e) => return Err(RepoError::NotFound),
                Err(e) => return Err(e.into()),
            }
        }
        tx.commit().await?;
        Ok(())
    }

    async fn list_friends(&self, user_id: Uuid) -> RepoResult<Vec<User>> {
        let rows = sqlx::query_as::<_, User>(
            r#"
            SELECT u.id, u.username, u.password_hash, u.fullname, u.email, u.ttp, u.created_at
              FROM friendships f
              JOIN users u ON u.id = f.friend_id
             WHERE f.user_id = $1
             ORDER BY f.seq ASC
            "#,
        )
        .bind(user_id)
        .fetch_all(&self.db)
        .await?;
        Ok(rows)
    }

    async fn top_by_ttp(&self, limit: i64) -> RepoResult<Vec<User>> {
        let rows = sqlx::query_as::<_, User>(&format!(
            r#"
            SELECT {USER_COLUMNS}
              FROM users
             ORDER BY ttp DESC, username ASC
             LIMIT $1
            "#
        ))
        .bind(limit)
        .fetch_all(&self.db)
        .await?;
        Ok(rows)
    }

    async fn search_by_fullname(&self, pattern: &str, limit: i64) -> RepoResult<Vec<User>> {
        let rows = sqlx::query_as::<_, User>(&format!(
            r#"
            SELECT {USER_COLUMNS}
              FROM users
             WHERE fullname ~* $1
             ORDER BY fullname ASC, username ASC
             LIMIT $2
            "#
        ))
        .bind(pattern)
        .bind(limit)
        .fetch_all(&self.db)
        .await?;
        Ok(rows)
    }
}
