use std::collections::HashMap;

use async_trait::async_trait;
use regex::RegexBuilder;
use time::OffsetDateTime;
use tokio::sync::RwLock;
use uuid::Uuid;

use super::repo::{RepoError, RepoResult, UserRepository};
use super::repo_types::{NewUser, User, UserPatch};

#[derive(Default)]
struct Inner {
    users: HashMap<Uuid, User>,
    // (user_id, friend_id) in insertion order
    friendships: Vec<(Uuid, Uuid)>,
}

/// In-process stand-in for the Postgres repository, used by tests.
#[derive(Default)]
pub struct InMemoryUserRepository {
    inner: RwLock<Inner>,
}

impl InMemoryUserRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn remove(&self, id: Uuid) {
        let mut inner = self.inner.write().await;
        inner.users.remove(&id);
        inner.friendships.retain(|(a, b)| *a != id && *b != id);
    }
}

#[async_trait]
impl UserRepository for InMemoryUserRepository {
    async fn find_by_id(&self, id: Uuid) -> RepoResult<Option<User>> {
        Ok(self.inner.read().await.users.get(&id).cloned())
    }

    async fn find_by_username(&self, username: &str) -> RepoResult<Option<User>> {
        let inner = self.inner.read().await;
        Ok(inner.users.values().find(|u| u.username == username).cloned())
    }

    async fn create(&self, new_user: NewUser) -> RepoResult<User> {
        let mut inner = self.inner.write().await;
        if inner.users.values().any(|u| u.username == new_user.username) {
            return Err(RepoError::UsernameTaken);
        }
        let user = User {
            id: Uuid::new_v4(),
            username: new_user.username,
            password_hash: new_user.password_hash,
            fullname: new_user.fullname,
            email: new_user.email,
            ttp: new_user.ttp,
            created_at: OffsetDateTime::now_utc(),
        };
        inner.users.insert(user.id, user.clone());
        Ok(user)
    }

    async fn update(&self, id: Uuid, patch: UserPatch) -> RepoResult<User> {
        let mut inner = self.inner.write().await;
        let user = inner.users.get_mut(&id).ok_or(RepoError::NotFound)?;
        if let Some(fullname) = patch.fullname {
            user.fullname = fullname;
        }
        if let Some(email) = patch.email {
            user.email = email;
        }
        if let Some(ttp) = patch.ttp {
            user.ttp = ttp;
        }
        if let Some(hash) = patch.password_hash {
            user.password_hash = hash;
        }
        Ok(user.clone())
    }

    async fn add_friendship(&self, user_id: Uuid, friend_id: Uuid) -> RepoResult<()> {
        let mut inner = self.inner.write().await;
        if !inner.users.contains_key(&user_id) || !inner.users.contains_key(&friend_id) {
            return Err(RepoError::NotFound);
        }
        for pair in [(user_id, friend_id), (friend_id, user_id)] {
            if !inner.friendships.contains(&pair) {
                inner.friendships.push(pair);
            }
        }
        Ok(())
    }

    async fn list_friends(&self, user_id: Uuid) -> RepoResult<Vec<User>> {
        let inner = self.inner.read().await;
        Ok(inner
            .friendships
            .iter()
            .filter(|(a, _)| *a == user_id)
            .filter_map(|(_, b)| inner.users.get(b).cloned())
            .collect())
    }

    async fn top_by_ttp(&self, limit: i64) -> RepoResult<Vec<User>> {
        let inner = self.inner.read().await;
        let mut users: Vec<User> = inner.users.values().cloned().collect();
        users.sort_by(|a, b| b.ttp.cmp(&a.ttp).then_with(|| a.username.cmp(&b.username)));
        users.truncate(limit.max(0) as usize);
        Ok(users)
    }

    async fn search_by_fullname(&self, pattern: &str, limit: i64) -> RepoResult<Vec<User>> {
        let re = RegexBuilder::new(pattern)
            .case_insensitive(true)
            .build()
            .map_err(|e| RepoError::Db(sqlx::Error::Protocol(e.to_string())))?;
        let inner = self.inner.read().await;
        let mut users: Vec<User> = inner
            .users
            .values()
            .filter(|u| re.is_match(&u.fullname))
            .cloned()
            .collect();
        users.sort_by(|a, b| {
            a.fullname
                .cmp(&b.fullname)
                .then_with(|| a.username.cmp(&b.username))
        });
        users.truncate(limit.max(0) as usize);
        Ok(users)
    }
}
