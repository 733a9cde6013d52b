use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use serde::Deserialize;
use uuid::Uuid;

use crate::auth::password::hash_password;
use crate::auth::usernames::{ensure_username_free, Account};
use crate::errors::AppError;
use crate::models::parent::{Parent, ParentRow};
use crate::parents::metadata::unpack;
use crate::parents::repo::{fetch_parent, list_parents, save_parent};
use crate::school::students::fetch_student;
use crate::state::AppState;
use crate::tenant::TenantScope;
use crate::validate::{optional_text, required_text};

#[derive(Debug, Deserialize)]
pub struct ParentListQuery {
    pub student_id: Option<Uuid>,
}

#[derive(Debug, Deserialize)]
pub struct CreateParentRequest {
    pub admin_id: Option<Uuid>,
    pub full_name: String,
    pub phone: Option<String>,
    pub username: Option<String>,
    pub password: Option<String>,
    pub student_id: Option<Uuid>,
    pub telegram_chat_id: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct UpdateParentRequest {
    pub full_name: Option<String>,
    pub phone: Option<String>,
    pub username: Option<String>,
    pub password: Option<String>,
    pub student_id: Option<Uuid>,
    pub telegram_chat_id: Option<String>,
}

impl UpdateParentRequest {
    /// Applies the provided fields onto an already-unpacked parent.
    fn apply(self, parent: &mut Parent) -> Result<(), AppError> {
        if let Some(name) = self.full_name {
            parent.full_name = required_text("full_name", &name)?;
        }
        if let Some(phone) = optional_text(self.phone) {
            parent.phone = Some(phone);
        }
        if let Some(username) = optional_text(self.username) {
            parent.username = Some(username);
        }
        if let Some(password) = optional_text(self.password) {
            parent.password_hash = Some(hash_password(&password)?);
            parent.legacy_password = None;
        }
        if let Some(student_id) = self.student_id {
            parent.student_id = Some(student_id);
        }
        if let Some(chat_id) = optional_text(self.telegram_chat_id) {
            parent.telegram_chat_id = Some(chat_id);
        }
        Ok(())
    }
}

/// GET /api/parents
pub async fn handle_list_parents(
    State(state): State<AppState>,
    scope: TenantScope,
    Query(params): Query<ParentListQuery>,
) -> Result<Json<Vec<Parent>>, AppError> {
    Ok(Json(
        list_parents(&state.db, scope.admin_id(), params.student_id).await?,
    ))
}

/// POST /api/parents
pub async fn handle_create_parent(
    State(state): State<AppState>,
    scope: TenantScope,
    Json(req): Json<CreateParentRequest>,
) -> Result<(StatusCode, Json<Parent>), AppError> {
    let admin_id = scope.owner_for_create(req.admin_id)?;
    let full_name = required_text("full_name", &req.full_name)?;
    if let Some(student_id) = req.student_id {
        fetch_student(&state.db, student_id, Some(admin_id)).await?;
    }
    let password_hash = optional_text(req.password)
        .map(|p| hash_password(&p))
        .transpose()?;
    let username = optional_text(req.username);
    if let Some(username) = &username {
        ensure_username_free(&state.db, username, None).await?;
    }

    let row = sqlx::query_as::<_, ParentRow>(
        r#"
        INSERT INTO parents
            (id, admin_id, full_name, phone, username, password_hash, student_id, telegram_chat_id)
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
        RETURNING *
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(admin_id)
    .bind(full_name)
    .bind(optional_text(req.phone))
    .bind(username)
    .bind(password_hash)
    .bind(req.student_id)
    .bind(optional_text(req.telegram_chat_id))
    .fetch_one(&state.db)
    .await?;

    tracing::info!("Created parent {} for admin {admin_id}", row.id);
    Ok((StatusCode::CREATED, Json(unpack(row))))
}

/// GET /api/parents/:id
pub async fn handle_get_parent(
    State(state): State<AppState>,
    scope: TenantScope,
    Path(id): Path<Uuid>,
) -> Result<Json<Parent>, AppError> {
    fetch_parent(&state.db, id, scope.admin_id())
        .await?
        .map(Json)
        .ok_or_else(|| AppError::not_found("Parent", id))
}

/// PUT /api/parents/:id
///
/// Always rewrites the full record, which also moves any legacy packed
/// metadata into real columns.
pub async fn handle_update_parent(
    State(state): State<AppState>,
    scope: TenantScope,
    Path(id): Path<Uuid>,
    Json(req): Json<UpdateParentRequest>,
) -> Result<Json<Parent>, AppError> {
    let mut parent = fetch_parent(&state.db, id, scope.admin_id())
        .await?
        .ok_or_else(|| AppError::not_found("Parent", id))?;
    if let Some(student_id) = req.student_id {
        fetch_student(&state.db, student_id, Some(parent.admin_id)).await?;
    }
    let migrating = parent.needs_migration;
    req.apply(&mut parent)?;
    if let Some(username) = &parent.username {
        ensure_username_free(&state.db, username, Some(Account::Parent(parent.id))).await?;
    }

    let row = save_parent(&state.db, &parent).await?;
    if migrating {
        tracing::info!("Migrated legacy metadata for parent {id}");
    }
    Ok(Json(unpack(row)))
}

/// DELETE /api/parents/:id
pub async fn handle_delete_parent(
    State(state): State<AppState>,
    scope: TenantScope,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, AppError> {
    let result =
        sqlx::query("DELETE FROM parents WHERE id = $1 AND ($2::uuid IS NULL OR admin_id = $2)")
            .bind(id)
            .bind(scope.admin_id())
            .execute(&state.db)
            .await?;
    if result.rows_affected() == 0 {
        return Err(AppError::not_found("Parent", id));
    }
    Ok(StatusCode::NO_CONTENT)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::password::verify_password;
    use crate::parents::metadata::fixtures::encode;
    use crate::parents::metadata::ParentMetadata;
    use chrono::Utc;

    fn legacy_parent() -> Parent {
        let blob = encode(&ParentMetadata {
            username: Some("old-login".into()),
            password: Some("legacy-pass".into()),
            phone: Some("+998900001122".into()),
            ..Default::default()
        })
        .unwrap();
        unpack(ParentRow {
            id: Uuid::new_v4(),
            admin_id: Uuid::new_v4(),
            full_name: "Dilnoza".into(),
            phone: Some(blob),
            username: None,
            password_hash: None,
            student_id: None,
            telegram_chat_id: None,
            created_at: Utc::now(),
        })
    }

    fn empty_update() -> UpdateParentRequest {
        UpdateParentRequest {
            full_name: None,
            phone: None,
            username: None,
            password: None,
            student_id: None,
            telegram_chat_id: None,
        }
    }

    #[test]
    fn test_apply_keeps_legacy_fields_when_untouched() {
        let mut parent = legacy_parent();
        UpdateParentRequest {
            telegram_chat_id: Some("777".into()),
            ..empty_update()
        }
        .apply(&mut parent)
        .unwrap();
        assert_eq!(parent.username.as_deref(), Some("old-login"));
        assert_eq!(parent.phone.as_deref(), Some("+998900001122"));
        assert_eq!(parent.telegram_chat_id.as_deref(), Some("777"));
        assert_eq!(parent.legacy_password.as_deref(), Some("legacy-pass"));
    }

    #[test]
    fn test_apply_new_password_replaces_legacy() {
        let mut parent = legacy_parent();
        UpdateParentRequest {
            password: Some("fresh".into()),
            ..empty_update()
        }
        .apply(&mut parent)
        .unwrap();
        assert_eq!(parent.legacy_password, None);
        assert!(verify_password("fresh", parent.password_hash.as_deref().unwrap()));
    }

    #[test]
    fn test_apply_rejects_blank_name() {
        let mut parent = legacy_parent();
        let err = UpdateParentRequest {
            full_name: Some("  ".into()),
            ..empty_update()
        }
        .apply(&mut parent)
        .unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));
    }
}
