use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::errors::AppError;
use crate::materials::storage::{object_key, tenant_prefix};
use crate::models::material::MaterialRow;
use crate::school::groups::fetch_group;
use crate::state::AppState;
use crate::tenant::TenantScope;
use crate::validate::{non_negative, optional_text, required_text};

#[derive(Debug, Deserialize)]
pub struct MaterialListQuery {
    pub group_id: Option<Uuid>,
}

#[derive(Debug, Deserialize)]
pub struct UploadUrlRequest {
    pub admin_id: Option<Uuid>,
    pub file_name: String,
    pub content_type: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct UploadUrlResponse {
    pub object_key: String,
    pub upload_url: String,
    pub expires_in: u64,
}

#[derive(Debug, Deserialize)]
pub struct CreateMaterialRequest {
    pub admin_id: Option<Uuid>,
    pub group_id: Option<Uuid>,
    pub title: String,
    pub description: Option<String>,
    pub object_key: String,
    pub content_type: Option<String>,
    pub size_bytes: Option<i64>,
}

#[derive(Debug, Serialize)]
pub struct MaterialDetailResponse {
    #[serde(flatten)]
    pub material: MaterialRow,
    pub download_url: String,
}

async fn fetch_material(
    state: &AppState,
    id: Uuid,
    admin_id: Option<Uuid>,
) -> Result<MaterialRow, AppError> {
    sqlx::query_as::<_, MaterialRow>(
        "SELECT * FROM materials WHERE id = $1 AND ($2::uuid IS NULL OR admin_id = $2)",
    )
    .bind(id)
    .bind(admin_id)
    .fetch_optional(&state.db)
    .await?
    .ok_or_else(|| AppError::not_found("Material", id))
}

/// POST /api/materials/upload-url
///
/// Step one of an upload: returns where to PUT the file.
pub async fn handle_upload_url(
    State(state): State<AppState>,
    scope: TenantScope,
    Json(req): Json<UploadUrlRequest>,
) -> Result<Json<UploadUrlResponse>, AppError> {
    let admin_id = scope.owner_for_create(req.admin_id)?;
    let file_name = required_text("file_name", &req.file_name)?;
    let key = object_key(admin_id, &file_name);
    let content_type = optional_text(req.content_type);
    let upload_url = state
        .blobs
        .presign_upload(&key, content_type.as_deref())
        .await?;

    Ok(Json(UploadUrlResponse {
        object_key: key,
        upload_url,
        expires_in: state.blobs.url_ttl_secs(),
    }))
}

/// POST /api/materials
///
/// Step two: records an uploaded object. The key must sit under the
/// caller's own prefix.
pub async fn handle_create_material(
    State(state): State<AppState>,
    scope: TenantScope,
    Json(req): Json<CreateMaterialRequest>,
) -> Result<(StatusCode, Json<MaterialRow>), AppError> {
    let admin_id = scope.owner_for_create(req.admin_id)?;
    let title = required_text("title", &req.title)?;
    let key = required_text("object_key", &req.object_key)?;
    if !key.starts_with(&tenant_prefix(admin_id)) {
        return Err(AppError::Validation(
            "object_key does not belong to this account".to_string(),
        ));
    }
    let size_bytes = req
        .size_bytes
        .map(|s| non_negative("size_bytes", s))
        .transpose()?;
    if let Some(group_id) = req.group_id {
        fetch_group(&state.db, group_id, Some(admin_id)).await?;
    }

    let material = sqlx::query_as::<_, MaterialRow>(
        r#"
        INSERT INTO materials
            (id, admin_id, group_id, title, description, object_key, content_type, size_bytes)
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
        RETURNING *
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(admin_id)
    .bind(req.group_id)
    .bind(title)
    .bind(optional_text(req.description))
    .bind(key)
    .bind(optional_text(req.content_type))
    .bind(size_bytes)
    .fetch_one(&state.db)
    .await?;

    tracing::info!("Recorded material {} ({})", material.id, material.object_key);
    Ok((StatusCode::CREATED, Json(material)))
}

/// GET /api/materials
pub async fn handle_list_materials(
    State(state): State<AppState>,
    scope: TenantScope,
    Query(params): Query<MaterialListQuery>,
) -> Result<Json<Vec<MaterialRow>>, AppError> {
    let materials = sqlx::query_as::<_, MaterialRow>(
        r#"
        SELECT * FROM materials
        WHERE ($1::uuid IS NULL OR admin_id = $1)
          AND ($2::uuid IS NULL OR group_id = $2)
        ORDER BY created_at DESC
        "#,
    )
    .bind(scope.admin_id())
    .bind(params.group_id)
    .fetch_all(&state.db)
    .await?;
    Ok(Json(materials))
}

/// GET /api/materials/:id
pub async fn handle_get_material(
    State(state): State<AppState>,
    scope: TenantScope,
    Path(id): Path<Uuid>,
) -> Result<Json<MaterialDetailResponse>, AppError> {
    let material = fetch_material(&state, id, scope.admin_id()).await?;
    let download_url = state.blobs.presign_download(&material.object_key).await?;
    Ok(Json(MaterialDetailResponse {
        material,
        download_url,
    }))
}

/// DELETE /api/materials/:id
///
/// Removes the row first; a failed object delete only leaves an orphan blob.
pub async fn handle_delete_material(
    State(state): State<AppState>,
    scope: TenantScope,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, AppError> {
    let material = fetch_material(&state, id, scope.admin_id()).await?;
    sqlx::query("DELETE FROM materials WHERE id = $1")
        .bind(material.id)
        .execute(&state.db)
        .await?;
    if let Err(e) = state.blobs.delete(&material.object_key).await {
        tracing::warn!("Material {id} removed but object cleanup failed: {e}");
    }
    Ok(StatusCode::NO_CONTENT)
}
