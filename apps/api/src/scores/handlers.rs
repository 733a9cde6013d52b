use std::collections::BTreeMap;

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use serde::{Deserialize, Serialize};
use sqlx::types::Json as SqlJson;
use uuid::Uuid;

use crate::errors::AppError;
use crate::models::score::{ScoreRow, ScoreType};
use crate::notify::{messages, notify_student_parents};
use crate::school::groups::fetch_group;
use crate::school::students::fetch_student;
use crate::scores::breakdown::{normalize_breakdown, overall_percent, CategoryInput};
use crate::scores::ranking::{rank_entries, RankCandidate, RankEntry};
use crate::state::AppState;
use crate::tenant::TenantScope;
use crate::validate::optional_text;

#[derive(Debug, Deserialize)]
pub struct ScoreListQuery {
    pub student_id: Option<Uuid>,
    pub group_id: Option<Uuid>,
    pub score_type: Option<ScoreType>,
}

#[derive(Debug, Deserialize)]
pub struct CreateScoreRequest {
    pub admin_id: Option<Uuid>,
    pub student_id: Uuid,
    pub group_id: Option<Uuid>,
    pub score_type: ScoreType,
    pub level: Option<String>,
    #[serde(default)]
    pub breakdown: BTreeMap<String, CategoryInput>,
    /// Used as the overall result only when `breakdown` is empty.
    pub overall_percent: Option<f64>,
    pub note: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct RankingQuery {
    pub group_id: Option<Uuid>,
    pub score_type: Option<ScoreType>,
}

#[derive(Debug, Serialize)]
pub struct RankingResponse {
    pub group_id: Uuid,
    pub score_type: Option<ScoreType>,
    pub entries: Vec<RankEntry>,
}

/// GET /api/scores
pub async fn handle_list_scores(
    State(state): State<AppState>,
    scope: TenantScope,
    Query(params): Query<ScoreListQuery>,
) -> Result<Json<Vec<ScoreRow>>, AppError> {
    let scores = sqlx::query_as::<_, ScoreRow>(
        r#"
        SELECT * FROM scores
        WHERE ($1::uuid IS NULL OR admin_id = $1)
          AND ($2::uuid IS NULL OR student_id = $2)
          AND ($3::uuid IS NULL OR group_id = $3)
          AND ($4::text IS NULL OR score_type = $4)
        ORDER BY created_at DESC
        "#,
    )
    .bind(scope.admin_id())
    .bind(params.student_id)
    .bind(params.group_id)
    .bind(params.score_type.map(|t| t.as_str()))
    .fetch_all(&state.db)
    .await?;
    Ok(Json(scores))
}

/// POST /api/scores
pub async fn handle_create_score(
    State(state): State<AppState>,
    scope: TenantScope,
    Json(req): Json<CreateScoreRequest>,
) -> Result<(StatusCode, Json<ScoreRow>), AppError> {
    let admin_id = scope.owner_for_create(req.admin_id)?;
    let breakdown = normalize_breakdown(req.breakdown).map_err(AppError::Validation)?;
    if breakdown.is_empty() && req.overall_percent.is_none() {
        return Err(AppError::Validation(
            "either breakdown or overall_percent is required".to_string(),
        ));
    }
    let fallback = req.overall_percent.unwrap_or(0.0);
    if !fallback.is_finite() {
        return Err(AppError::Validation("overall_percent must be a number".to_string()));
    }
    let overall = overall_percent(&breakdown, fallback);

    let student = fetch_student(&state.db, req.student_id, Some(admin_id)).await?;
    let group_id = req.group_id.or(student.group_id);
    if let Some(group_id) = req.group_id {
        fetch_group(&state.db, group_id, Some(admin_id)).await?;
    }

    let score = sqlx::query_as::<_, ScoreRow>(
        r#"
        INSERT INTO scores
            (id, admin_id, student_id, group_id, score_type, level, breakdown, overall_percent, note)
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
        RETURNING *
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(admin_id)
    .bind(student.id)
    .bind(group_id)
    .bind(req.score_type.as_str())
    .bind(optional_text(req.level))
    .bind(SqlJson(&breakdown))
    .bind(overall)
    .bind(optional_text(req.note))
    .fetch_one(&state.db)
    .await?;

    notify_student_parents(
        &state,
        admin_id,
        student.id,
        messages::new_score(&student.full_name, req.score_type.as_str(), overall),
    );

    Ok((StatusCode::CREATED, Json(score)))
}

/// DELETE /api/scores/:id
pub async fn handle_delete_score(
    State(state): State<AppState>,
    scope: TenantScope,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, AppError> {
    let result =
        sqlx::query("DELETE FROM scores WHERE id = $1 AND ($2::uuid IS NULL OR admin_id = $2)")
            .bind(id)
            .bind(scope.admin_id())
            .execute(&state.db)
            .await?;
    if result.rows_affected() == 0 {
        return Err(AppError::not_found("Score", id));
    }
    Ok(StatusCode::NO_CONTENT)
}

/// GET /api/scores/ranking
///
/// Ranks the students currently in a group by their most recent score.
/// Students with no matching score are left out.
pub async fn handle_ranking(
    State(state): State<AppState>,
    scope: TenantScope,
    Query(params): Query<RankingQuery>,
) -> Result<Json<RankingResponse>, AppError> {
    let group_id = params
        .group_id
        .ok_or_else(|| AppError::Validation("group_id is required".to_string()))?;
    let group = fetch_group(&state.db, group_id, scope.admin_id()).await?;

    let rows: Vec<(Uuid, String, f64)> = sqlx::query_as(
        r#"
        SELECT DISTINCT ON (s.id) s.id, s.full_name, sc.overall_percent
        FROM students s
        JOIN scores sc ON sc.student_id = s.id
        WHERE s.group_id = $1
          AND ($2::text IS NULL OR sc.score_type = $2)
        ORDER BY s.id, sc.created_at DESC
        "#,
    )
    .bind(group.id)
    .bind(params.score_type.map(|t| t.as_str()))
    .fetch_all(&state.db)
    .await?;

    let mut candidates: Vec<RankCandidate> = rows
        .into_iter()
        .map(|(student_id, student_name, score)| RankCandidate {
            student_id,
            student_name,
            score,
        })
        .collect();
    // Alphabetical input order makes tie order deterministic.
    candidates.sort_by(|a, b| a.student_name.cmp(&b.student_name));

    Ok(Json(RankingResponse {
        group_id: group.id,
        score_type: params.score_type,
        entries: rank_entries(candidates),
    }))
}
