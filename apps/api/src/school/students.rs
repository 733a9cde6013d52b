use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use chrono::NaiveDate;
use serde::Deserialize;
use sqlx::PgPool;
use uuid::Uuid;

use crate::errors::AppError;
use crate::models::student::StudentRow;
use crate::school::groups::fetch_group;
use crate::state::AppState;
use crate::tenant::TenantScope;
use crate::validate::{optional_text, required_text};

#[derive(Debug, Deserialize)]
pub struct StudentListQuery {
    pub group_id: Option<Uuid>,
}

#[derive(Debug, Deserialize)]
pub struct CreateStudentRequest {
    pub admin_id: Option<Uuid>,
    pub group_id: Option<Uuid>,
    pub full_name: String,
    pub phone: Option<String>,
    pub birth_date: Option<NaiveDate>,
}

#[derive(Debug, Deserialize)]
pub struct UpdateStudentRequest {
    pub group_id: Option<Uuid>,
    pub full_name: Option<String>,
    pub phone: Option<String>,
    pub birth_date: Option<NaiveDate>,
}

/// Loads a student visible to the given tenant, or 404.
pub async fn fetch_student(
    pool: &PgPool,
    id: Uuid,
    admin_id: Option<Uuid>,
) -> Result<StudentRow, AppError> {
    sqlx::query_as::<_, StudentRow>(
        "SELECT * FROM students WHERE id = $1 AND ($2::uuid IS NULL OR admin_id = $2)",
    )
    .bind(id)
    .bind(admin_id)
    .fetch_optional(pool)
    .await?
    .ok_or_else(|| AppError::not_found("Student", id))
}

/// GET /api/students
pub async fn handle_list_students(
    State(state): State<AppState>,
    scope: TenantScope,
    Query(params): Query<StudentListQuery>,
) -> Result<Json<Vec<StudentRow>>, AppError> {
    let students = sqlx::query_as::<_, StudentRow>(
        r#"
        SELECT * FROM students
        WHERE ($1::uuid IS NULL OR admin_id = $1)
          AND ($2::uuid IS NULL OR group_id = $2)
        ORDER BY full_name
        "#,
    )
    .bind(scope.admin_id())
    .bind(params.group_id)
    .fetch_all(&state.db)
    .await?;
    Ok(Json(students))
}

/// POST /api/students
pub async fn handle_create_student(
    State(state): State<AppState>,
    scope: TenantScope,
    Json(req): Json<CreateStudentRequest>,
) -> Result<(StatusCode, Json<StudentRow>), AppError> {
    let admin_id = scope.owner_for_create(req.admin_id)?;
    let full_name = required_text("full_name", &req.full_name)?;
    if let Some(group_id) = req.group_id {
        fetch_group(&state.db, group_id, Some(admin_id)).await?;
    }

    let student = sqlx::query_as::<_, StudentRow>(
        r#"
        INSERT INTO students (id, admin_id, group_id, full_name, phone, birth_date)
        VALUES ($1, $2, $3, $4, $5, $6)
        RETURNING *
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(admin_id)
    .bind(req.group_id)
    .bind(full_name)
    .bind(optional_text(req.phone))
    .bind(req.birth_date)
    .fetch_one(&state.db)
    .await?;

    tracing::info!("Created student {} for admin {admin_id}", student.id);
    Ok((StatusCode::CREATED, Json(student)))
}

/// GET /api/students/:id
pub async fn handle_get_student(
    State(state): State<AppState>,
    scope: TenantScope,
    Path(id): Path<Uuid>,
) -> Result<Json<StudentRow>, AppError> {
    Ok(Json(fetch_student(&state.db, id, scope.admin_id()).await?))
}

/// PUT /api/students/:id
pub async fn handle_update_student(
    State(state): State<AppState>,
    scope: TenantScope,
    Path(id): Path<Uuid>,
    Json(req): Json<UpdateStudentRequest>,
) -> Result<Json<StudentRow>, AppError> {
    let existing = fetch_student(&state.db, id, scope.admin_id()).await?;
    if let Some(group_id) = req.group_id {
        fetch_group(&state.db, group_id, Some(existing.admin_id)).await?;
    }
    let full_name = req
        .full_name
        .as_deref()
        .map(|n| required_text("full_name", n))
        .transpose()?;

    let student = sqlx::query_as::<_, StudentRow>(
        r#"
        UPDATE students
        SET group_id = COALESCE($2, group_id),
            full_name = COALESCE($3, full_name),
            phone = COALESCE($4, phone),
            birth_date = COALESCE($5, birth_date)
        WHERE id = $1
        RETURNING *
        "#,
    )
    .bind(id)
    .bind(req.group_id)
    .bind(full_name)
    .bind(optional_text(req.phone))
    .bind(req.birth_date)
    .fetch_one(&state.db)
    .await?;

    Ok(Json(student))
}

/// DELETE /api/students/:id
pub async fn handle_delete_student(
    State(state): State<AppState>,
    scope: TenantScope,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, AppError> {
    let result =
        sqlx::query("DELETE FROM students WHERE id = $1 AND ($2::uuid IS NULL OR admin_id = $2)")
            .bind(id)
            .bind(scope.admin_id())
            .execute(&state.db)
            .await?;
    if result.rows_affected() == 0 {
        return Err(AppError::not_found("Student", id));
    }
    Ok(StatusCode::NO_CONTENT)
}
