use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use serde::Deserialize;
use sqlx::PgPool;
use uuid::Uuid;

use crate::errors::AppError;
use crate::models::group::GroupRow;
use crate::state::AppState;
use crate::tenant::TenantScope;
use crate::validate::{non_negative, optional_text, required_text};

#[derive(Debug, Deserialize)]
pub struct CreateGroupRequest {
    pub admin_id: Option<Uuid>,
    pub name: String,
    pub teacher_name: Option<String>,
    pub schedule: Option<String>,
    #[serde(default)]
    pub monthly_fee: i64,
}

#[derive(Debug, Deserialize)]
pub struct UpdateGroupRequest {
    pub name: Option<String>,
    pub teacher_name: Option<String>,
    pub schedule: Option<String>,
    pub monthly_fee: Option<i64>,
}

/// Loads a group visible to the given tenant, or 404.
pub async fn fetch_group(
    pool: &PgPool,
    id: Uuid,
    admin_id: Option<Uuid>,
) -> Result<GroupRow, AppError> {
    sqlx::query_as::<_, GroupRow>(
        "SELECT * FROM groups WHERE id = $1 AND ($2::uuid IS NULL OR admin_id = $2)",
    )
    .bind(id)
    .bind(admin_id)
    .fetch_optional(pool)
    .await?
    .ok_or_else(|| AppError::not_found("Group", id))
}

/// GET /api/groups
pub async fn handle_list_groups(
    State(state): State<AppState>,
    scope: TenantScope,
) -> Result<Json<Vec<GroupRow>>, AppError> {
    let groups = sqlx::query_as::<_, GroupRow>(
        "SELECT * FROM groups WHERE ($1::uuid IS NULL OR admin_id = $1) ORDER BY name",
    )
    .bind(scope.admin_id())
    .fetch_all(&state.db)
    .await?;
    Ok(Json(groups))
}

/// POST /api/groups
pub async fn handle_create_group(
    State(state): State<AppState>,
    scope: TenantScope,
    Json(req): Json<CreateGroupRequest>,
) -> Result<(StatusCode, Json<GroupRow>), AppError> {
    let admin_id = scope.owner_for_create(req.admin_id)?;
    let name = required_text("name", &req.name)?;
    let monthly_fee = non_negative("monthly_fee", req.monthly_fee)?;

    let group = sqlx::query_as::<_, GroupRow>(
        r#"
        INSERT INTO groups (id, admin_id, name, teacher_name, schedule, monthly_fee)
        VALUES ($1, $2, $3, $4, $5, $6)
        RETURNING *
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(admin_id)
    .bind(name)
    .bind(optional_text(req.teacher_name))
    .bind(optional_text(req.schedule))
    .bind(monthly_fee)
    .fetch_one(&state.db)
    .await?;

    tracing::info!("Created group {} for admin {admin_id}", group.id);
    Ok((StatusCode::CREATED, Json(group)))
}

/// GET /api/groups/:id
pub async fn handle_get_group(
    State(state): State<AppState>,
    scope: TenantScope,
    Path(id): Path<Uuid>,
) -> Result<Json<GroupRow>, AppError> {
    Ok(Json(fetch_group(&state.db, id, scope.admin_id()).await?))
}

/// PUT /api/groups/:id
pub async fn handle_update_group(
    State(state): State<AppState>,
    scope: TenantScope,
    Path(id): Path<Uuid>,
    Json(req): Json<UpdateGroupRequest>,
) -> Result<Json<GroupRow>, AppError> {
    let name = req
        .name
        .as_deref()
        .map(|n| required_text("name", n))
        .transpose()?;
    let monthly_fee = req
        .monthly_fee
        .map(|fee| non_negative("monthly_fee", fee))
        .transpose()?;

    let group = sqlx::query_as::<_, GroupRow>(
        r#"
        UPDATE groups
        SET name = COALESCE($3, name),
            teacher_name = COALESCE($4, teacher_name),
            schedule = COALESCE($5, schedule),
            monthly_fee = COALESCE($6, monthly_fee)
        WHERE id = $1 AND ($2::uuid IS NULL OR admin_id = $2)
        RETURNING *
        "#,
    )
    .bind(id)
    .bind(scope.admin_id())
    .bind(name)
    .bind(optional_text(req.teacher_name))
    .bind(optional_text(req.schedule))
    .bind(monthly_fee)
    .fetch_optional(&state.db)
    .await?
    .ok_or_else(|| AppError::not_found("Group", id))?;

    Ok(Json(group))
}

/// DELETE /api/groups/:id
pub async fn handle_delete_group(
    State(state): State<AppState>,
    scope: TenantScope,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, AppError> {
    let result = sqlx::query("DELETE FROM groups WHERE id = $1 AND ($2::uuid IS NULL OR admin_id = $2)")
        .bind(id)
        .bind(scope.admin_id())
        .execute(&state.db)
        .await?;
    if result.rows_affected() == 0 {
        return Err(AppError::not_found("Group", id));
    }
    Ok(StatusCode::NO_CONTENT)
}
