use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use serde::Deserialize;
use uuid::Uuid;

use crate::auth::password::hash_password;
use crate::auth::usernames::{ensure_username_free, Account};
use crate::errors::AppError;
use crate::models::admin::AdminRow;
use crate::state::AppState;
use crate::tenant::TenantScope;
use crate::validate::{optional_text, required_text};

const MIN_PASSWORD_LEN: usize = 6;

#[derive(Debug, Deserialize)]
pub struct CreateAdminRequest {
    pub username: String,
    pub password: String,
    pub full_name: String,
    pub school_name: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct UpdateAdminRequest {
    pub username: Option<String>,
    pub password: Option<String>,
    pub full_name: Option<String>,
    pub school_name: Option<String>,
}

fn checked_password(password: &str) -> Result<String, AppError> {
    if password.chars().count() < MIN_PASSWORD_LEN {
        return Err(AppError::Validation(format!(
            "password must be at least {MIN_PASSWORD_LEN} characters"
        )));
    }
    hash_password(password)
}

/// GET /api/admins
///
/// A scoped caller only sees its own account.
pub async fn handle_list_admins(
    State(state): State<AppState>,
    scope: TenantScope,
) -> Result<Json<Vec<AdminRow>>, AppError> {
    let admins = sqlx::query_as::<_, AdminRow>(
        "SELECT * FROM admins WHERE ($1::uuid IS NULL OR id = $1) ORDER BY created_at",
    )
    .bind(scope.admin_id())
    .fetch_all(&state.db)
    .await?;
    Ok(Json(admins))
}

/// POST /api/admins
pub async fn handle_create_admin(
    State(state): State<AppState>,
    Json(req): Json<CreateAdminRequest>,
) -> Result<(StatusCode, Json<AdminRow>), AppError> {
    let username = required_text("username", &req.username)?;
    let full_name = required_text("full_name", &req.full_name)?;
    let password_hash = checked_password(&req.password)?;
    ensure_username_free(&state.db, &username, None).await?;

    let admin = sqlx::query_as::<_, AdminRow>(
        r#"
        INSERT INTO admins (id, username, password_hash, full_name, school_name)
        VALUES ($1, $2, $3, $4, $5)
        RETURNING *
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(&username)
    .bind(password_hash)
    .bind(full_name)
    .bind(optional_text(req.school_name))
    .fetch_one(&state.db)
    .await?;

    tracing::info!("Created admin account '{username}' ({})", admin.id);
    Ok((StatusCode::CREATED, Json(admin)))
}

/// GET /api/admins/:id
pub async fn handle_get_admin(
    State(state): State<AppState>,
    scope: TenantScope,
    Path(id): Path<Uuid>,
) -> Result<Json<AdminRow>, AppError> {
    if !scope.permits(id) {
        return Err(AppError::not_found("Admin", id));
    }
    sqlx::query_as::<_, AdminRow>("SELECT * FROM admins WHERE id = $1")
        .bind(id)
        .fetch_optional(&state.db)
        .await?
        .map(Json)
        .ok_or_else(|| AppError::not_found("Admin", id))
}

/// PUT /api/admins/:id
pub async fn handle_update_admin(
    State(state): State<AppState>,
    scope: TenantScope,
    Path(id): Path<Uuid>,
    Json(req): Json<UpdateAdminRequest>,
) -> Result<Json<AdminRow>, AppError> {
    if !scope.permits(id) {
        return Err(AppError::not_found("Admin", id));
    }
    let username = req
        .username
        .as_deref()
        .map(|u| required_text("username", u))
        .transpose()?;
    if let Some(username) = &username {
        ensure_username_free(&state.db, username, Some(Account::Admin(id))).await?;
    }
    let full_name = req
        .full_name
        .as_deref()
        .map(|n| required_text("full_name", n))
        .transpose()?;
    let password_hash = req.password.as_deref().map(checked_password).transpose()?;

    sqlx::query_as::<_, AdminRow>(
        r#"
        UPDATE admins
        SET username = COALESCE($2, username),
            password_hash = COALESCE($3, password_hash),
            full_name = COALESCE($4, full_name),
            school_name = COALESCE($5, school_name)
        WHERE id = $1
        RETURNING *
        "#,
    )
    .bind(id)
    .bind(username)
    .bind(password_hash)
    .bind(full_name)
    .bind(optional_text(req.school_name))
    .fetch_optional(&state.db)
    .await?
    .map(Json)
    .ok_or_else(|| AppError::not_found("Admin", id))
}

/// DELETE /api/admins/:id
///
/// Cascades to everything the admin owns.
pub async fn handle_delete_admin(
    State(state): State<AppState>,
    scope: TenantScope,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, AppError> {
    if !scope.permits(id) {
        return Err(AppError::not_found("Admin", id));
    }
    let result = sqlx::query("DELETE FROM admins WHERE id = $1")
        .bind(id)
        .execute(&state.db)
        .await?;
    if result.rows_affected() == 0 {
        return Err(AppError::not_found("Admin", id));
    }
    tracing::warn!("Deleted admin {id} and all tenant data");
    Ok(StatusCode::NO_CONTENT)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::password::verify_password;

    #[test]
    fn test_short_password_rejected() {
        assert!(matches!(
            checked_password("12345"),
            Err(AppError::Validation(_))
        ));
    }

    #[test]
    fn test_password_hashed() {
        let hash = checked_password("longenough").unwrap();
        assert_ne!(hash, "longenough");
        assert!(verify_password("longenough", &hash));
    }

    #[test]
    fn test_admin_json_omits_hash() {
        let admin = AdminRow {
            id: Uuid::nil(),
            username: "root".into(),
            password_hash: "salt$hash".into(),
            full_name: "Root".into(),
            school_name: None,
            created_at: chrono::Utc::now(),
        };
        let json = serde_json::to_value(admin).unwrap();
        assert!(json.get("password_hash").is_none());
    }
}
