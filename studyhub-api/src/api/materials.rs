//! Study material endpoints

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    routing::get,
    Json, Router,
};
use studyhub_common::db::NotificationType;
use studyhub_common::time;
use tracing::info;

use crate::db::{self, materials::MaterialFields};
use crate::error::{ApiError, ApiResult};
use crate::models::{
    Actor, CreateMaterialRequest, MaterialFilter, MaterialOrdering, StudyMaterial,
    UpdateMaterialRequest,
};
use crate::notify::{self, Notice};
use crate::AppState;

use super::required;

async fn load_material(state: &AppState, id: i64) -> ApiResult<StudyMaterial> {
    db::materials::get(&state.db, id)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("Material {} not found", id)))
}

async fn check_subject(state: &AppState, id: i64) -> ApiResult<()> {
    if !db::subjects::exists(&state.db, id).await? {
        return Err(ApiError::field("subject", "Subject not found"));
    }
    Ok(())
}

fn ensure_author(actor: &Actor, material: &StudyMaterial) -> ApiResult<()> {
    if material.author != actor.id {
        return Err(ApiError::Forbidden(
            "Only the author can change this material".to_string(),
        ));
    }
    Ok(())
}

/// GET /api/materials
pub async fn list_materials(
    State(state): State<AppState>,
    _actor: Actor,
    Query(filter): Query<MaterialFilter>,
) -> ApiResult<Json<Vec<StudyMaterial>>> {
    let ordering = match filter.ordering.as_deref() {
        None | Some("") => MaterialOrdering::default(),
        Some(key) => MaterialOrdering::parse(key).ok_or_else(|| {
            ApiError::field("ordering", format!("Unsupported ordering '{}'", key))
        })?,
    };

    Ok(Json(
        db::materials::list(&state.db, filter.subject, filter.author, ordering).await?,
    ))
}

/// POST /api/materials
///
/// Users affiliated with the subject are notified, except the author.
pub async fn create_material(
    State(state): State<AppState>,
    actor: Actor,
    Json(req): Json<CreateMaterialRequest>,
) -> ApiResult<(StatusCode, Json<StudyMaterial>)> {
    let title = required("title", req.title.as_deref())?;
    let description = required("description", req.description.as_deref())?;
    let subject_id = req
        .subject
        .ok_or_else(|| ApiError::field("subject", "This field is required."))?;
    check_subject(&state, subject_id).await?;

    let fields = MaterialFields {
        subject_id,
        title,
        description,
        link: req.link.trim(),
    };
    let id = db::materials::insert(&state.db, actor.id, &fields, time::now()).await?;
    let material = load_material(&state, id).await?;
    info!(material_id = id, actor = actor.id, "Material shared");

    let notice = Notice::new(
        NotificationType::NewMaterial,
        "New study material",
        format!(
            "{} shared '{}' in {}",
            actor.username, material.title, material.subject_name
        ),
        format!("/materials/{}", id),
    );
    notify::send_to_subject(&state, subject_id, actor.id, &notice).await;

    Ok((StatusCode::CREATED, Json(material)))
}

/// GET /api/materials/:id
pub async fn get_material(
    State(state): State<AppState>,
    _actor: Actor,
    Path(id): Path<i64>,
) -> ApiResult<Json<StudyMaterial>> {
    Ok(Json(load_material(&state, id).await?))
}

/// PATCH /api/materials/:id
pub async fn update_material(
    State(state): State<AppState>,
    actor: Actor,
    Path(id): Path<i64>,
    Json(req): Json<UpdateMaterialRequest>,
) -> ApiResult<Json<StudyMaterial>> {
    let material = load_material(&state, id).await?;
    ensure_author(&actor, &material)?;

    if let Some(subject_id) = req.subject {
        check_subject(&state, subject_id).await?;
    }
    let title = match req.title.as_deref() {
        Some(t) => required("title", Some(t))?,
        None => material.title.as_str(),
    };
    let description = match req.description.as_deref() {
        Some(d) => required("description", Some(d))?,
        None => material.description.as_str(),
    };

    let fields = MaterialFields {
        subject_id: req.subject.unwrap_or(material.subject),
        title,
        description,
        link: req.link.as_deref().map(str::trim).unwrap_or(&material.link),
    };
    db::materials::update(&state.db, id, &fields, time::now()).await?;

    Ok(Json(load_material(&state, id).await?))
}

/// DELETE /api/materials/:id
pub async fn delete_material(
    State(state): State<AppState>,
    actor: Actor,
    Path(id): Path<i64>,
) -> ApiResult<StatusCode> {
    let material = load_material(&state, id).await?;
    ensure_author(&actor, &material)?;

    db::materials::delete(&state.db, id).await?;
    info!(material_id = id, actor = actor.id, "Material deleted");
    Ok(StatusCode::NO_CONTENT)
}

/// Build material routes
pub fn material_routes() -> Router<AppState> {
    Router::new()
        .route("/materials", get(list_materials).post(create_material))
        .route(
            "/materials/:id",
            get(get_material).patch(update_material).delete(delete_material),
        )
}
