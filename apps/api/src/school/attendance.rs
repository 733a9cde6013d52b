use std::collections::HashMap;

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::errors::AppError;
use crate::models::attendance::{AttendanceRow, AttendanceStatus};
use crate::notify::{messages, notify_student_parents};
use crate::school::groups::fetch_group;
use crate::state::AppState;
use crate::tenant::TenantScope;
use crate::validate::optional_text;

#[derive(Debug, Deserialize)]
pub struct AttendanceQuery {
    pub student_id: Option<Uuid>,
    pub group_id: Option<Uuid>,
    pub date: Option<NaiveDate>,
    pub from: Option<NaiveDate>,
    pub to: Option<NaiveDate>,
}

#[derive(Debug, Deserialize)]
pub struct AttendanceMark {
    pub student_id: Uuid,
    pub status: AttendanceStatus,
    pub note: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct MarkAttendanceRequest {
    pub admin_id: Option<Uuid>,
    pub group_id: Option<Uuid>,
    pub date: NaiveDate,
    pub records: Vec<AttendanceMark>,
}

#[derive(Debug, Serialize)]
pub struct MarkAttendanceResponse {
    pub saved: Vec<AttendanceRow>,
    pub absent_count: usize,
}

#[derive(Debug, Deserialize)]
pub struct UpdateAttendanceRequest {
    pub status: Option<AttendanceStatus>,
    pub note: Option<String>,
}

/// GET /api/attendance
pub async fn handle_list_attendance(
    State(state): State<AppState>,
    scope: TenantScope,
    Query(params): Query<AttendanceQuery>,
) -> Result<Json<Vec<AttendanceRow>>, AppError> {
    let (from, to) = match params.date {
        Some(day) => (Some(day), Some(day)),
        None => (params.from, params.to),
    };
    let rows = sqlx::query_as::<_, AttendanceRow>(
        r#"
        SELECT * FROM attendance
        WHERE ($1::uuid IS NULL OR admin_id = $1)
          AND ($2::uuid IS NULL OR student_id = $2)
          AND ($3::uuid IS NULL OR group_id = $3)
          AND ($4::date IS NULL OR date >= $4)
          AND ($5::date IS NULL OR date <= $5)
        ORDER BY date DESC, student_id
        "#,
    )
    .bind(scope.admin_id())
    .bind(params.student_id)
    .bind(params.group_id)
    .bind(from)
    .bind(to)
    .fetch_all(&state.db)
    .await?;
    Ok(Json(rows))
}

/// POST /api/attendance
///
/// Upserts one day of marks in a single transaction. Re-marking the same
/// student on the same date overwrites the earlier mark. Parents of absent
/// students are notified after commit.
pub async fn handle_mark_attendance(
    State(state): State<AppState>,
    scope: TenantScope,
    Json(req): Json<MarkAttendanceRequest>,
) -> Result<(StatusCode, Json<MarkAttendanceResponse>), AppError> {
    let admin_id = scope.owner_for_create(req.admin_id)?;
    if req.records.is_empty() {
        return Err(AppError::Validation("records cannot be empty".to_string()));
    }
    if let Some(group_id) = req.group_id {
        fetch_group(&state.db, group_id, Some(admin_id)).await?;
    }

    let ids: Vec<Uuid> = req.records.iter().map(|r| r.student_id).collect();
    let names: HashMap<Uuid, String> = sqlx::query_as::<_, (Uuid, String)>(
        "SELECT id, full_name FROM students WHERE admin_id = $1 AND id = ANY($2)",
    )
    .bind(admin_id)
    .bind(&ids)
    .fetch_all(&state.db)
    .await?
    .into_iter()
    .collect();

    if let Some(unknown) = ids.iter().find(|id| !names.contains_key(id)) {
        return Err(AppError::Validation(format!("Unknown student {unknown}")));
    }

    let mut tx = state.db.begin().await?;
    let mut saved = Vec::with_capacity(req.records.len());
    for mark in req.records {
        let row = sqlx::query_as::<_, AttendanceRow>(
            r#"
            INSERT INTO attendance (id, admin_id, student_id, group_id, date, status, note)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            ON CONFLICT (student_id, date) DO UPDATE
            SET status = EXCLUDED.status,
                note = EXCLUDED.note,
                group_id = COALESCE(EXCLUDED.group_id, attendance.group_id)
            RETURNING *
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(admin_id)
        .bind(mark.student_id)
        .bind(req.group_id)
        .bind(req.date)
        .bind(mark.status.as_str())
        .bind(optional_text(mark.note))
        .fetch_one(&mut *tx)
        .await?;
        saved.push(row);
    }
    tx.commit().await?;

    let absent: Vec<&AttendanceRow> = saved
        .iter()
        .filter(|r| r.status == AttendanceStatus::Absent.as_str())
        .collect();
    for row in &absent {
        if let Some(name) = names.get(&row.student_id) {
            notify_student_parents(
                &state,
                admin_id,
                row.student_id,
                messages::absence(name, row.date),
            );
        }
    }

    tracing::info!(
        "Saved {} attendance mark(s) for {} ({} absent)",
        saved.len(),
        req.date,
        absent.len()
    );
    let absent_count = absent.len();
    Ok((
        StatusCode::CREATED,
        Json(MarkAttendanceResponse {
            saved,
            absent_count,
        }),
    ))
}

/// PUT /api/attendance/:id
pub async fn handle_update_attendance(
    State(state): State<AppState>,
    scope: TenantScope,
    Path(id): Path<Uuid>,
    Json(req): Json<UpdateAttendanceRequest>,
) -> Result<Json<AttendanceRow>, AppError> {
    let row = sqlx::query_as::<_, AttendanceRow>(
        r#"
        UPDATE attendance
        SET status = COALESCE($3, status),
            note = COALESCE($4, note)
        WHERE id = $1 AND ($2::uuid IS NULL OR admin_id = $2)
        RETURNING *
        "#,
    )
    .bind(id)
    .bind(scope.admin_id())
    .bind(req.status.map(|s| s.as_str()))
    .bind(optional_text(req.note))
    .fetch_optional(&state.db)
    .await?
    .ok_or_else(|| AppError::not_found("Attendance record", id))?;
    Ok(Json(row))
}

/// DELETE /api/attendance/:id
pub async fn handle_delete_attendance(
    State(state): State<AppState>,
    scope: TenantScope,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, AppError> {
    let result =
        sqlx::query("DELETE FROM attendance WHERE id = $1 AND ($2::uuid IS NULL OR admin_id = $2)")
            .bind(id)
            .bind(scope.admin_id())
            .execute(&state.db)
            .await?;
    if result.rows_affected() == 0 {
        return Err(AppError::not_found("Attendance record", id));
    }
    Ok(StatusCode::NO_CONTENT)
}
