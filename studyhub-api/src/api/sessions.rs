//! Tutoring session and review endpoints
//!
//! Thin handlers over [`crate::lifecycle`]; reads go straight to the
//! session queries.

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use studyhub_common::time;

use crate::db::{self, sessions::SessionView};
use crate::error::{ApiError, ApiResult};
use crate::lifecycle;
use crate::models::{
    Actor, CancelSessionRequest, CreateReviewRequest, CreateSessionRequest, SessionFilter,
    SessionReview, TutoringSession, UpdateReviewRequest, UpdateSessionRequest,
};
use crate::AppState;

/// GET /api/sessions
pub async fn list_sessions(
    State(state): State<AppState>,
    _actor: Actor,
    Query(filter): Query<SessionFilter>,
) -> ApiResult<Json<Vec<TutoringSession>>> {
    Ok(Json(db::sessions::list(&state.db, SessionView::All, &filter).await?))
}

/// GET /api/sessions/upcoming
///
/// Active sessions from today (UTC) on; `student` and `status` filters are ignored.
pub async fn upcoming_sessions(
    State(state): State<AppState>,
    _actor: Actor,
    Query(filter): Query<SessionFilter>,
) -> ApiResult<Json<Vec<TutoringSession>>> {
    let filter = SessionFilter {
        subject: filter.subject,
        tutor: filter.tutor,
        ..Default::default()
    };
    let view = SessionView::Upcoming(time::today());
    Ok(Json(db::sessions::list(&state.db, view, &filter).await?))
}

/// GET /api/sessions/completed
pub async fn completed_sessions(
    State(state): State<AppState>,
    _actor: Actor,
    Query(filter): Query<SessionFilter>,
) -> ApiResult<Json<Vec<TutoringSession>>> {
    let filter = SessionFilter {
        subject: filter.subject,
        tutor: filter.tutor,
        ..Default::default()
    };
    Ok(Json(
        db::sessions::list(&state.db, SessionView::Completed, &filter).await?,
    ))
}

/// GET /api/sessions/my
pub async fn my_sessions(
    State(state): State<AppState>,
    actor: Actor,
) -> ApiResult<Json<Vec<TutoringSession>>> {
    let view = SessionView::InvolvingUser(actor.id);
    Ok(Json(
        db::sessions::list(&state.db, view, &SessionFilter::default()).await?,
    ))
}

/// POST /api/sessions
pub async fn create_session(
    State(state): State<AppState>,
    actor: Actor,
    Json(req): Json<CreateSessionRequest>,
) -> ApiResult<(StatusCode, Json<TutoringSession>)> {
    let session = lifecycle::create_session(&state, &actor, &req).await?;
    Ok((StatusCode::CREATED, Json(session)))
}

/// GET /api/sessions/:id
pub async fn get_session(
    State(state): State<AppState>,
    _actor: Actor,
    Path(id): Path<i64>,
) -> ApiResult<Json<TutoringSession>> {
    db::sessions::get(&state.db, id)
        .await?
        .map(Json)
        .ok_or_else(|| ApiError::NotFound(format!("Session {} not found", id)))
}

/// PATCH /api/sessions/:id
pub async fn update_session(
    State(state): State<AppState>,
    actor: Actor,
    Path(id): Path<i64>,
    Json(req): Json<UpdateSessionRequest>,
) -> ApiResult<Json<TutoringSession>> {
    Ok(Json(lifecycle::update_session(&state, &actor, id, &req).await?))
}

/// DELETE /api/sessions/:id
pub async fn delete_session(
    State(state): State<AppState>,
    actor: Actor,
    Path(id): Path<i64>,
) -> ApiResult<StatusCode> {
    lifecycle::delete_session(&state, &actor, id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// POST /api/sessions/:id/confirm
pub async fn confirm_session(
    State(state): State<AppState>,
    actor: Actor,
    Path(id): Path<i64>,
) -> ApiResult<Json<TutoringSession>> {
    Ok(Json(lifecycle::confirm_session(&state, &actor, id).await?))
}

/// POST /api/sessions/:id/cancel
///
/// Body `{"reason": "..."}` is optional.
pub async fn cancel_session(
    State(state): State<AppState>,
    actor: Actor,
    Path(id): Path<i64>,
    body: Option<Json<CancelSessionRequest>>,
) -> ApiResult<Json<TutoringSession>> {
    let reason = body.and_then(|Json(req)| req.reason);
    Ok(Json(
        lifecycle::cancel_session(&state, &actor, id, reason.as_deref()).await?,
    ))
}

/// GET /api/sessions/reviews
pub async fn list_reviews(
    State(state): State<AppState>,
    _actor: Actor,
) -> ApiResult<Json<Vec<SessionReview>>> {
    Ok(Json(db::reviews::list(&state.db).await?))
}

/// POST /api/sessions/reviews
pub async fn create_review(
    State(state): State<AppState>,
    actor: Actor,
    Json(req): Json<CreateReviewRequest>,
) -> ApiResult<(StatusCode, Json<SessionReview>)> {
    let review = lifecycle::create_review(&state, &actor, &req).await?;
    Ok((StatusCode::CREATED, Json(review)))
}

/// GET /api/sessions/reviews/:id
pub async fn get_review(
    State(state): State<AppState>,
    _actor: Actor,
    Path(id): Path<i64>,
) -> ApiResult<Json<SessionReview>> {
    Ok(Json(lifecycle::load_review(&state, id).await?))
}

/// PATCH /api/sessions/reviews/:id
pub async fn update_review(
    State(state): State<AppState>,
    actor: Actor,
    Path(id): Path<i64>,
    Json(req): Json<UpdateReviewRequest>,
) -> ApiResult<Json<SessionReview>> {
    Ok(Json(lifecycle::update_review(&state, &actor, id, &req).await?))
}

/// DELETE /api/sessions/reviews/:id
pub async fn delete_review(
    State(state): State<AppState>,
    actor: Actor,
    Path(id): Path<i64>,
) -> ApiResult<StatusCode> {
    lifecycle::delete_review(&state, &actor, id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Build session routes
pub fn session_routes() -> Router<AppState> {
    Router::new()
        .route("/sessions", get(list_sessions).post(create_session))
        .route("/sessions/upcoming", get(upcoming_sessions))
        .route("/sessions/completed", get(completed_sessions))
        .route("/sessions/my", get(my_sessions))
        .route("/sessions/reviews", get(list_reviews).post(create_review))
        .route(
            "/sessions/reviews/:id",
            get(get_review).patch(update_review).delete(delete_review),
        )
        .route(
            "/sessions/:id",
            get(get_session).patch(update_session).delete(delete_session),
        )
        .route("/sessions/:id/confirm", post(confirm_session))
        .route("/sessions/:id/cancel", post(cancel_session))
}
