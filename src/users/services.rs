use tracing::{info, warn};
use uuid::Uuid;

use super::{
    dto::{FriendList, LeaderboardEntry, Profile, PublicUser, UpdateUserRequest},
    repo::UserRepository,
    repo_types::{User, UserPatch},
};
use crate::{
    auth::{
        password::hash_password,
        services::{check_password, check_ttp, normalize_email},
    },
    error::ApiError,
};

pub const TOP_PLAYER_LIMIT: i64 = 10;
pub const SEARCH_LIMIT: i64 = 50;

fn public(users: Vec<User>) -> Vec<PublicUser> {
    users.into_iter().map(PublicUser::from).collect()
}

async fn require_user(repo: &dyn UserRepository, id: Uuid) -> Result<User, ApiError> {
    repo.find_by_id(id)
        .await?
        .ok_or_else(|| ApiError::NotFound("User not found".into()))
}

pub async fn get_profile(repo: &dyn UserRepository, user_id: Uuid) -> Result<Profile, ApiError> {
    let user = require_user(repo, user_id).await?;
    let friends = repo.list_friends(user_id).await?;
    Ok(Profile {
        user: user.into(),
        friends: public(friends),
    })
}

pub async fn add_friend(
    repo: &dyn UserRepository,
    user_id: Uuid,
    friend_id: Uuid,
) -> Result<(), ApiError> {
    if user_id == friend_id {
        return Err(ApiError::BadRequest("Cannot add yourself as a friend".into()));
    }
    require_user(repo, user_id).await?;
    if repo.find_by_id(friend_id).await?.is_none() {
        warn!(%user_id, %friend_id, "add friend: unknown friend");
        return Err(ApiError::NotFound("Friend not found".into()));
    }
    repo.add_friendship(user_id, friend_id).await?;
    info!(%user_id, %friend_id, "friend added");
    Ok(())
}

pub async fn get_friend_list(
    repo: &dyn UserRepository,
    user_id: Uuid,
) -> Result<FriendList, ApiError> {
    require_user(repo, user_id).await?;
    let friends = repo.list_friends(user_id).await?;
    Ok(FriendList {
        friends: public(friends),
    })
}

pub async fn top_players(repo: &dyn UserRepository) -> Result<Vec<LeaderboardEntry>, ApiError> {
    let users = repo.top_by_ttp(TOP_PLAYER_LIMIT).await?;
    Ok(users
        .into_iter()
        .enumerate()
        .map(|(i, u)| LeaderboardEntry {
            rank: i + 1,
            user: u.into(),
        })
        .collect())
}

/// Case-insensitive substring search; regex metacharacters in `name` match literally.
pub async fn search_users(
    repo: &dyn UserRepository,
    name: Option<&str>,
) -> Result<Vec<PublicUser>, ApiError> {
    let name = name.map(str::trim).unwrap_or_default();
    if name.is_empty() {
        return Err(ApiError::BadRequest("Query parameter `name` is required".into()));
    }
    let pattern = regex::escape(name);
    let users = repo.search_by_fullname(&pattern, SEARCH_LIMIT).await?;
    Ok(public(users))
}

pub async fn update_user(
    repo: &dyn UserRepository,
    user_id: Uuid,
    req: UpdateUserRequest,
) -> Result<PublicUser, ApiError> {
    let mut patch = UserPatch::default();

    if let Some(fullname) = req.fullname {
        let fullname = fullname.trim().to_string();
        if fullname.is_empty() {
            return Err(ApiError::BadRequest("Full name must not be empty".into()));
        }
        patch.fullname = Some(fullname);
    }
    if req.email.is_some() {
        // blank clears the email
        patch.email = Some(normalize_email(req.email)?);
    }
    if let Some(ttp) = req.ttp {
        check_ttp(ttp)?;
        patch.ttp = Some(ttp);
    }
    if let Some(password) = req.password {
        check_password(&password)?;
        patch.password_hash = Some(hash_password(&password)?);
    }

    if patch.is_empty() {
        return Err(ApiError::BadRequest("Nothing to update".into()));
    }

    let user = repo.update(user_id, patch).await?;
    info!(%user_id, "user updated");
    Ok(user.into())
}
