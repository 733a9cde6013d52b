use sqlx::PgPool;
use uuid::Uuid;

use crate::auth::password::hash_password;
use crate::errors::AppError;
use crate::models::parent::{Parent, ParentRow};
use crate::notify::Recipient;
use crate::parents::metadata::unpack;
use crate::parents::phone::{phones_match, subscriber_suffix};

/// Rows whose phone still holds a blob can only be filtered after decoding,
/// so lookups by a packed field always include them as candidates.
const LEGACY_CANDIDATES: &str = "phone LIKE 'meta:%'";

pub async fn fetch_parent(
    pool: &PgPool,
    id: Uuid,
    admin_id: Option<Uuid>,
) -> Result<Option<Parent>, sqlx::Error> {
    let row = sqlx::query_as::<_, ParentRow>(
        "SELECT * FROM parents WHERE id = $1 AND ($2::uuid IS NULL OR admin_id = $2)",
    )
    .bind(id)
    .bind(admin_id)
    .fetch_optional(pool)
    .await?;
    Ok(row.map(unpack))
}

pub async fn list_parents(
    pool: &PgPool,
    admin_id: Option<Uuid>,
    student_id: Option<Uuid>,
) -> Result<Vec<Parent>, sqlx::Error> {
    let rows = sqlx::query_as::<_, ParentRow>(&format!(
        r#"
        SELECT * FROM parents
        WHERE ($1::uuid IS NULL OR admin_id = $1)
          AND ($2::uuid IS NULL OR student_id = $2 OR {LEGACY_CANDIDATES})
        ORDER BY full_name, created_at
        "#
    ))
    .bind(admin_id)
    .bind(student_id)
    .fetch_all(pool)
    .await?;

    Ok(rows
        .into_iter()
        .map(unpack)
        .filter(|p| student_id.is_none() || p.student_id == student_id)
        .collect())
}

/// Parents linked to a student, reduced to their deliverable addresses.
pub async fn recipients_for_student(
    pool: &PgPool,
    admin_id: Uuid,
    student_id: Uuid,
) -> Result<Vec<Recipient>, sqlx::Error> {
    let parents = list_parents(pool, Some(admin_id), Some(student_id)).await?;
    Ok(parents
        .into_iter()
        .map(|p| Recipient {
            phone: p.phone,
            telegram_chat_id: p.telegram_chat_id,
        })
        .filter(Recipient::is_reachable)
        .collect())
}

/// Parents in any tenant whose phone matches. Used by the Telegram webhook.
pub async fn find_by_phone(pool: &PgPool, phone: &str) -> Result<Vec<Parent>, sqlx::Error> {
    let Some(suffix) = subscriber_suffix(phone) else {
        return Ok(Vec::new());
    };
    let rows = sqlx::query_as::<_, ParentRow>(&format!(
        r#"
        SELECT * FROM parents
        WHERE right(regexp_replace(phone, '[^0-9]', '', 'g'), 9) = $1
           OR {LEGACY_CANDIDATES}
        "#
    ))
    .bind(suffix)
    .fetch_all(pool)
    .await?;

    Ok(rows
        .into_iter()
        .map(unpack)
        .filter(|p| p.phone.as_deref().is_some_and(|own| phones_match(own, phone)))
        .collect())
}

/// Every parent, in any tenant, whose login is `username`. Legacy rows can
/// still collide until they are migrated, so this may return more than one.
pub async fn parents_with_username(
    pool: &PgPool,
    username: &str,
) -> Result<Vec<Parent>, sqlx::Error> {
    let rows = sqlx::query_as::<_, ParentRow>(&format!(
        "SELECT * FROM parents WHERE username = $1 OR {LEGACY_CANDIDATES}"
    ))
    .bind(username)
    .fetch_all(pool)
    .await?;

    Ok(rows
        .into_iter()
        .map(unpack)
        .filter(|p| p.username.as_deref() == Some(username))
        .collect())
}

/// Writes every field to its real column. A row that still carried a blob
/// is migrated: the phone column gets the plain number and any legacy
/// password is hashed.
pub async fn save_parent(pool: &PgPool, parent: &Parent) -> Result<ParentRow, AppError> {
    let password_hash = match (&parent.password_hash, &parent.legacy_password) {
        (Some(hash), _) => Some(hash.clone()),
        (None, Some(plain)) => Some(hash_password(plain)?),
        (None, None) => None,
    };

    let row = sqlx::query_as::<_, ParentRow>(
        r#"
        UPDATE parents
        SET full_name = $2, phone = $3, username = $4, password_hash = $5,
            student_id = $6, telegram_chat_id = $7
        WHERE id = $1
        RETURNING *
        "#,
    )
    .bind(parent.id)
    .bind(&parent.full_name)
    .bind(&parent.phone)
    .bind(&parent.username)
    .bind(password_hash)
    .bind(parent.student_id)
    .bind(&parent.telegram_chat_id)
    .fetch_one(pool)
    .await?;
    Ok(row)
}
