use lazy_static::lazy_static;
use regex::Regex;
use tracing::{info, warn};
use uuid::Uuid;

use super::{
    dto::{LoginRequest, RegisterRequest},
    password::{hash_password, verify_password},
};
use crate::{
    error::ApiError,
    users::{
        repo::UserRepository,
        repo_types::{NewUser, User},
    },
};

pub const MIN_PASSWORD_LEN: usize = 8;

lazy_static! {
    static ref EMAIL_RE: Regex = Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").unwrap();
    static ref USERNAME_RE: Regex = Regex::new(r"^[A-Za-z0-9_.\-]{3,32}$").unwrap();
}

pub(crate) fn is_valid_email(email: &str) -> bool {
    EMAIL_RE.is_match(email)
}

pub(crate) fn is_valid_username(username: &str) -> bool {
    USERNAME_RE.is_match(username)
}

/// Trims and validates an optional email; blank means "no email".
pub(crate) fn normalize_email(email: Option<String>) -> Result<Option<String>, ApiError> {
    match email.map(|e| e.trim().to_string()) {
        None => Ok(None),
        Some(e) if e.is_empty() => Ok(None),
        Some(e) if is_valid_email(&e) => Ok(Some(e)),
        Some(e) => {
            warn!(email = %e, "invalid email");
            Err(ApiError::BadRequest("Invalid email".into()))
        }
    }
}

pub(crate) fn check_password(password: &str) -> Result<(), ApiError> {
    if password.chars().count() < MIN_PASSWORD_LEN {
        warn!("password too short");
        return Err(ApiError::BadRequest("Password too short".into()));
    }
    Ok(())
}

pub(crate) fn check_ttp(ttp: i64) -> Result<(), ApiError> {
    if ttp < 0 {
        return Err(ApiError::BadRequest("TTP must not be negative".into()));
    }
    Ok(())
}

pub async fn register_user(
    repo: &dyn UserRepository,
    req: RegisterRequest,
) -> Result<User, ApiError> {
    let username = req.username.trim().to_string();
    if !is_valid_username(&username) {
        warn!(username = %username, "invalid username");
        return Err(ApiError::BadRequest("Invalid username".into()));
    }
    check_password(&req.password)?;

    let fullname = req.fullname.trim().to_string();
    if fullname.is_empty() {
        return Err(ApiError::BadRequest("Full name is required".into()));
    }
    let email = normalize_email(req.email)?;
    let ttp = req.ttp.unwrap_or(0);
    check_ttp(ttp)?;

    // The unique constraint still catches a concurrent registration.
    if repo.find_by_username(&username).await?.is_some() {
        warn!(username = %username, "username already registered");
        return Err(ApiError::Conflict("User already exist !".into()));
    }

    let password_hash = hash_password(&req.password)?;
    let user = repo
        .create(NewUser {
            username,
            password_hash,
            fullname,
            email,
            ttp,
        })
        .await?;

    info!(user_id = %user.id, username = %user.username, "user registered");
    Ok(user)
}

pub async fn authenticate(repo: &dyn UserRepository, req: LoginRequest) -> Result<User, ApiError> {
    let username = req.username.trim();
    let invalid = || ApiError::Unauthorized("Invalid credentials".into());

    let Some(user) = repo.find_by_username(username).await? else {
        warn!(username = %username, "login unknown username");
        return Err(invalid());
    };

    if !verify_password(&req.password, &user.password_hash)? {
        warn!(user_id = %user.id, "login invalid password");
        return Err(invalid());
    }

    info!(user_id = %user.id, "user logged in");
    Ok(user)
}

/// Reloads the user a refresh token was issued for.
pub async fn load_token_subject(repo: &dyn UserRepository, id: Uuid) -> Result<User, ApiError> {
    repo.find_by_id(id)
        .await?
        .ok_or_else(|| ApiError::Unauthorized("User not found".into()))
}
