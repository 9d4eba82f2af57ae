//! Discussion forum endpoints

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use studyhub_common::db::NotificationType;
use studyhub_common::time;
use tracing::info;

use crate::db;
use crate::error::{ApiError, ApiResult};
use crate::models::{
    build_reply_tree, Actor, CreateDiscussionRequest, CreateReplyRequest, Discussion,
    DiscussionDetail, DiscussionFilter, Reply, UpdateDiscussionRequest,
};
use crate::notify::{self, Notice};
use crate::AppState;

use super::required;

async fn load_discussion(state: &AppState, id: i64) -> ApiResult<Discussion> {
    db::forum::get_discussion(&state.db, id)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("Discussion {} not found", id)))
}

async fn check_optional_subject(state: &AppState, subject: Option<i64>) -> ApiResult<()> {
    if let Some(id) = subject {
        if !db::subjects::exists(&state.db, id).await? {
            return Err(ApiError::field("subject", "Subject not found"));
        }
    }
    Ok(())
}

fn ensure_author(actor: &Actor, discussion: &Discussion) -> ApiResult<()> {
    if discussion.author != actor.id {
        return Err(ApiError::Forbidden(
            "Only the author can change this discussion".to_string(),
        ));
    }
    Ok(())
}

/// GET /api/discussions
pub async fn list_discussions(
    State(state): State<AppState>,
    _actor: Actor,
    Query(filter): Query<DiscussionFilter>,
) -> ApiResult<Json<Vec<Discussion>>> {
    Ok(Json(db::forum::list_discussions(&state.db, &filter).await?))
}

/// POST /api/discussions
///
/// Users affiliated with the subject hear about the new thread.
pub async fn create_discussion(
    State(state): State<AppState>,
    actor: Actor,
    Json(req): Json<CreateDiscussionRequest>,
) -> ApiResult<(StatusCode, Json<Discussion>)> {
    let title = required("title", req.title.as_deref())?;
    let content = required("content", req.content.as_deref())?;
    check_optional_subject(&state, req.subject).await?;

    let id = db::forum::insert_discussion(&state.db, actor.id, req.subject, title, content, time::now())
        .await?;
    let discussion = load_discussion(&state, id).await?;
    info!(discussion_id = id, actor = actor.id, "Discussion created");

    if let Some(subject_id) = discussion.subject {
        let notice = Notice::new(
            NotificationType::NewDiscussion,
            "New discussion",
            format!(
                "{} started '{}' in {}",
                actor.username,
                discussion.title,
                discussion.subject_name.as_deref().unwrap_or_default()
            ),
            format!("/forum/{}", id),
        );
        notify::send_to_subject(&state, subject_id, actor.id, &notice).await;
    }

    Ok((StatusCode::CREATED, Json(discussion)))
}

/// GET /api/discussions/:id
pub async fn get_discussion(
    State(state): State<AppState>,
    _actor: Actor,
    Path(id): Path<i64>,
) -> ApiResult<Json<DiscussionDetail>> {
    let discussion = load_discussion(&state, id).await?;
    let replies = db::forum::replies_of(&state.db, id).await?;

    Ok(Json(DiscussionDetail {
        discussion,
        replies: build_reply_tree(replies),
    }))
}

/// PATCH /api/discussions/:id
pub async fn update_discussion(
    State(state): State<AppState>,
    actor: Actor,
    Path(id): Path<i64>,
    Json(req): Json<UpdateDiscussionRequest>,
) -> ApiResult<Json<Discussion>> {
    let discussion = load_discussion(&state, id).await?;
    ensure_author(&actor, &discussion)?;

    let title = match req.title.as_deref() {
        Some(t) => required("title", Some(t))?,
        None => discussion.title.as_str(),
    };
    let content = match req.content.as_deref() {
        Some(c) => required("content", Some(c))?,
        None => discussion.content.as_str(),
    };
    let subject = req.subject.or(discussion.subject);
    check_optional_subject(&state, req.subject).await?;

    db::forum::update_discussion(&state.db, id, subject, title, content, time::now()).await?;
    Ok(Json(load_discussion(&state, id).await?))
}

/// DELETE /api/discussions/:id
pub async fn delete_discussion(
    State(state): State<AppState>,
    actor: Actor,
    Path(id): Path<i64>,
) -> ApiResult<StatusCode> {
    let discussion = load_discussion(&state, id).await?;
    ensure_author(&actor, &discussion)?;

    db::forum::delete_discussion(&state.db, id).await?;
    info!(discussion_id = id, actor = actor.id, "Discussion deleted");
    Ok(StatusCode::NO_CONTENT)
}

/// POST /api/discussions/:id/replies
///
/// Notifies the discussion author and, for nested replies, the parent
/// reply's author. The replier is never notified.
pub async fn create_reply(
    State(state): State<AppState>,
    actor: Actor,
    Path(id): Path<i64>,
    Json(req): Json<CreateReplyRequest>,
) -> ApiResult<(StatusCode, Json<Reply>)> {
    let discussion = load_discussion(&state, id).await?;
    let content = required("content", req.content.as_deref())?;

    let parent = match req.parent {
        Some(parent_id) => {
            let parent = db::forum::get_reply(&state.db, parent_id)
                .await?
                .ok_or_else(|| ApiError::field("parent", "Parent reply not found"))?;
            if parent.discussion != id {
                return Err(ApiError::field(
                    "parent",
                    "Parent reply must belong to the same discussion",
                ));
            }
            Some(parent)
        }
        None => None,
    };

    let reply_id = db::forum::insert_reply(
        &state.db,
        id,
        actor.id,
        parent.as_ref().map(|p| p.id),
        content,
        time::now(),
    )
    .await?;
    let reply = db::forum::get_reply(&state.db, reply_id)
        .await?
        .ok_or_else(|| ApiError::Internal(format!("Reply {} vanished after insert", reply_id)))?;
    info!(discussion_id = id, reply_id, actor = actor.id, "Reply posted");

    let mut recipients = vec![discussion.author];
    if let Some(parent) = &parent {
        recipients.push(parent.author);
    }
    let notice = Notice::new(
        NotificationType::NewReply,
        "New reply",
        format!("{} replied in '{}'", actor.username, discussion.title),
        format!("/forum/{}", id),
    );
    notify::send_many(&state, &recipients, actor.id, &notice).await;

    Ok((StatusCode::CREATED, Json(reply)))
}

/// Build forum routes
pub fn forum_routes() -> Router<AppState> {
    Router::new()
        .route("/discussions", get(list_discussions).post(create_discussion))
        .route(
            "/discussions/:id",
            get(get_discussion)
                .patch(update_discussion)
                .delete(delete_discussion),
        )
        .route("/discussions/:id/replies", post(create_reply))
}
