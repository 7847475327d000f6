use axum::{
    extract::{
        rejection::{JsonRejection, PathRejection, QueryRejection},
        Path, Query, State,
    },
    routing::{get, post, put},
    Json, Router,
};
use tracing::instrument;
use uuid::Uuid;

use super::{
    dto::{FriendList, LeaderboardEntry, Message, Profile, PublicUser, SearchQuery, UpdateUserRequest},
    services,
};
use crate::{
    auth::extractors::AuthUser,
    error::{ApiError, Envelope},
    state::AppState,
};

pub fn read_routes() -> Router<AppState> {
    Router::new()
        .route("/user/topPlayer", get(top_player))
        .route("/user/search", get(search_user))
}

pub fn me_routes() -> Router<AppState> {
    Router::new()
        .route("/user", put(update_user))
        .route("/user/profile", get(get_profile))
        .route("/user/friends", get(get_friend_list))
        .route("/user/friends/:friend_id", post(add_friend))
}

#[instrument(skip(state))]
pub async fn get_profile(
    State(state): State<AppState>,
    user: AuthUser,
) -> Result<Json<Envelope<Profile>>, ApiError> {
    let profile = services::get_profile(state.users.as_ref(), user.id).await?;
    Ok(Envelope::ok(profile))
}

#[instrument(skip(state))]
pub async fn add_friend(
    State(state): State<AppState>,
    user: AuthUser,
    friend_id: Result<Path<Uuid>, PathRejection>,
) -> Result<Json<Envelope<Message>>, ApiError> {
    let Path(friend_id) = friend_id?;
    services::add_friend(state.users.as_ref(), user.id, friend_id).await?;
    Ok(Envelope::ok(Message {
        message: "Friend added !".into(),
    }))
}

#[instrument(skip(state))]
pub async fn get_friend_list(
    State(state): State<AppState>,
    user: AuthUser,
) -> Result<Json<Envelope<FriendList>>, ApiError> {
    let friends = services::get_friend_list(state.users.as_ref(), user.id).await?;
    Ok(Envelope::ok(friends))
}

#[instrument(skip(state))]
pub async fn top_player(
    State(state): State<AppState>,
) -> Result<Json<Envelope<Vec<LeaderboardEntry>>>, ApiError> {
    let players = services::top_players(state.users.as_ref()).await?;
    Ok(Envelope::ok(players))
}

#[instrument(skip(state))]
pub async fn search_user(
    State(state): State<AppState>,
    query: Result<Query<SearchQuery>, QueryRejection>,
) -> Result<Json<Envelope<Vec<PublicUser>>>, ApiError> {
    let Query(q) = query?;
    let users = services::search_users(state.users.as_ref(), q.name.as_deref()).await?;
    Ok(Envelope::ok(users))
}

#[instrument(skip(state, payload))]
pub async fn update_user(
    State(state): State<AppState>,
    user: AuthUser,
    payload: Result<Json<UpdateUserRequest>, JsonRejection>,
) -> Result<Json<Envelope<PublicUser>>, ApiError> {
    let Json(payload) = payload?;
    let updated = services::update_user(state.users.as_ref(), user.id, payload).await?;
    Ok(Envelope::ok(updated))
}
