//! Account, profile and subject catalog endpoints

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    routing::get,
    routing::post,
    Json, Router,
};
use studyhub_common::db::Role;
use studyhub_common::time;
use tracing::info;

use crate::db::{self, users::NewUser, users::ProfileUpdate};
use crate::error::{ApiError, ApiResult};
use crate::models::{
    is_plausible_email, Actor, CreateSubjectRequest, RegisterRequest, Subject,
    UpdateProfileRequest, User, UserFilter,
};
use crate::AppState;

const MAX_USERNAME_LEN: usize = 150;

/// Letters, digits and `@ . + - _`
fn check_username(username: &str) -> ApiResult<()> {
    if username.is_empty() {
        return Err(ApiError::field("username", "This field is required."));
    }
    if username.chars().count() > MAX_USERNAME_LEN {
        return Err(ApiError::field(
            "username",
            format!("Ensure this field has no more than {} characters.", MAX_USERNAME_LEN),
        ));
    }
    let valid = username
        .chars()
        .all(|c| c.is_alphanumeric() || matches!(c, '@' | '.' | '+' | '-' | '_'));
    if !valid {
        return Err(ApiError::field(
            "username",
            "Enter a valid username. This value may contain only letters, numbers, and @/./+/-/_ characters.",
        ));
    }
    Ok(())
}

fn check_email(email: &str) -> ApiResult<()> {
    if !is_plausible_email(email) {
        return Err(ApiError::field("email", "Enter a valid email address."));
    }
    Ok(())
}

async fn check_subject_ids(state: &AppState, ids: &[i64]) -> ApiResult<()> {
    let missing = db::subjects::missing(&state.db, ids).await?;
    if let Some(id) = missing.first() {
        return Err(ApiError::field("subject_ids", format!("Subject {} not found", id)));
    }
    Ok(())
}

async fn load_user(state: &AppState, id: i64) -> ApiResult<User> {
    db::users::get(&state.db, id)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("User {} not found", id)))
}

/// POST /api/auth/register
///
/// Creates the platform profile for an identity managed upstream.
pub async fn register(
    State(state): State<AppState>,
    Json(req): Json<RegisterRequest>,
) -> ApiResult<(StatusCode, Json<User>)> {
    let username = req.username.as_deref().unwrap_or_default().trim();
    check_username(username)?;
    let email = req.email.as_deref().unwrap_or_default().trim();
    check_email(email)?;
    check_subject_ids(&state, &req.subject_ids).await?;

    let new_user = NewUser {
        username,
        email,
        first_name: req.first_name.trim(),
        last_name: req.last_name.trim(),
        role: req.role,
        bio: &req.bio,
    };

    let id = db::users::insert(&state.db, &new_user, &req.subject_ids, time::now())
        .await
        .map_err(|e| {
            if e.is_unique_violation() {
                ApiError::Conflict("A user with that username already exists".to_string())
            } else {
                e.into()
            }
        })?;

    info!(user_id = id, role = %req.role, "User registered");
    Ok((StatusCode::CREATED, Json(load_user(&state, id).await?)))
}

/// GET /api/auth/me
pub async fn me(State(state): State<AppState>, actor: Actor) -> ApiResult<Json<User>> {
    Ok(Json(load_user(&state, actor.id).await?))
}

/// PATCH /api/auth/me
pub async fn update_me(
    State(state): State<AppState>,
    actor: Actor,
    Json(req): Json<UpdateProfileRequest>,
) -> ApiResult<Json<User>> {
    let current = load_user(&state, actor.id).await?;

    let email = req.email.as_deref().map(str::trim).unwrap_or(&current.email);
    if req.email.is_some() {
        check_email(email)?;
    }
    if let Some(ids) = &req.subject_ids {
        check_subject_ids(&state, ids).await?;
    }

    let profile = ProfileUpdate {
        first_name: req.first_name.as_deref().unwrap_or(&current.first_name),
        last_name: req.last_name.as_deref().unwrap_or(&current.last_name),
        email,
        bio: req.bio.as_deref().unwrap_or(&current.bio),
    };
    db::users::update_profile(&state.db, actor.id, &profile, req.subject_ids.as_deref()).await?;

    Ok(Json(load_user(&state, actor.id).await?))
}

/// GET /api/users
pub async fn list_users(
    State(state): State<AppState>,
    _actor: Actor,
    Query(filter): Query<UserFilter>,
) -> ApiResult<Json<Vec<User>>> {
    Ok(Json(db::users::list(&state.db, &filter).await?))
}

/// GET /api/users/tutors
pub async fn list_tutors(
    State(state): State<AppState>,
    _actor: Actor,
    Query(filter): Query<UserFilter>,
) -> ApiResult<Json<Vec<User>>> {
    let filter = UserFilter {
        role: Some(Role::Tutor),
        subject: filter.subject,
    };
    Ok(Json(db::users::list(&state.db, &filter).await?))
}

/// GET /api/users/:id
pub async fn get_user(
    State(state): State<AppState>,
    _actor: Actor,
    Path(id): Path<i64>,
) -> ApiResult<Json<User>> {
    Ok(Json(load_user(&state, id).await?))
}

/// GET /api/auth/subjects
pub async fn list_subjects(State(state): State<AppState>) -> ApiResult<Json<Vec<Subject>>> {
    Ok(Json(db::subjects::list(&state.db).await?))
}

/// POST /api/auth/subjects
pub async fn create_subject(
    State(state): State<AppState>,
    actor: Actor,
    Json(req): Json<CreateSubjectRequest>,
) -> ApiResult<(StatusCode, Json<Subject>)> {
    let name = req.name.as_deref().unwrap_or_default().trim();
    if name.is_empty() {
        return Err(ApiError::field("name", "This field is required."));
    }

    let id = db::subjects::insert(&state.db, name, req.description.trim(), time::now())
        .await
        .map_err(|e| {
            if e.is_unique_violation() {
                ApiError::Conflict(format!("Subject '{}' already exists", name))
            } else {
                e.into()
            }
        })?;

    info!(subject_id = id, actor = actor.id, "Subject created");
    let subject = db::subjects::get(&state.db, id)
        .await?
        .ok_or_else(|| ApiError::Internal(format!("Subject {} vanished after insert", id)))?;
    Ok((StatusCode::CREATED, Json(subject)))
}

/// Build account, user directory and subject routes
pub fn user_routes() -> Router<AppState> {
    Router::new()
        .route("/auth/register", post(register))
        .route("/auth/me", get(me).patch(update_me))
        .route("/auth/subjects", get(list_subjects).post(create_subject))
        .route("/users", get(list_users))
        .route("/users/tutors", get(list_tutors))
        .route("/users/:id", get(get_user))
}
