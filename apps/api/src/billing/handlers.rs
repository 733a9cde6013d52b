use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::billing::penalty::{
    compute_penalty, summarize, PaymentSummary, PenaltyBreakdown, PenaltyInput,
};
use crate::billing::reminders::{reminder_for, Reminder};
use crate::errors::AppError;
use crate::models::payment::{PaymentRow, PaymentStatus};
use crate::notify::{messages, notify_student_parents};
use crate::school::students::fetch_student;
use crate::state::AppState;
use crate::tenant::TenantScope;
use crate::validate::{non_negative, optional_text};

// ────────────────────────────────────────────────────────────────────────────
// Request / Response types
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct PaymentListQuery {
    pub student_id: Option<Uuid>,
    pub status: Option<PaymentStatus>,
}

#[derive(Debug, Deserialize)]
pub struct CreatePaymentRequest {
    pub admin_id: Option<Uuid>,
    pub student_id: Uuid,
    pub amount: i64,
    pub status: Option<PaymentStatus>,
    pub start_date: Option<DateTime<Utc>>,
    pub end_date: Option<DateTime<Utc>>,
    pub due_date: Option<DateTime<Utc>>,
    pub penalty_per_day: Option<i64>,
    pub note: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct UpdatePaymentRequest {
    pub amount: Option<i64>,
    pub status: Option<PaymentStatus>,
    pub start_date: Option<DateTime<Utc>>,
    pub end_date: Option<DateTime<Utc>>,
    pub due_date: Option<DateTime<Utc>>,
    pub penalty_per_day: Option<i64>,
    pub note: Option<String>,
}

/// A stored payment plus its late-fee figures as of the request time.
#[derive(Debug, Serialize)]
pub struct PaymentView {
    #[serde(flatten)]
    pub payment: PaymentRow,
    #[serde(flatten)]
    pub penalty: PenaltyBreakdown,
}

#[derive(Debug, sqlx::FromRow)]
struct UnpaidPaymentRow {
    #[sqlx(flatten)]
    payment: PaymentRow,
    student_name: String,
}

#[derive(Debug, Serialize)]
pub struct ReminderRunResponse {
    pub scanned: usize,
    pub due_soon: usize,
    pub overdue: usize,
}

impl PaymentView {
    fn new(payment: PaymentRow, default_penalty_per_day: i64, now: DateTime<Utc>) -> Self {
        let input = PenaltyInput::from_row(&payment, default_penalty_per_day);
        let penalty = compute_penalty(&input, now);
        Self { payment, penalty }
    }
}

async fn fetch_payment(
    state: &AppState,
    id: Uuid,
    admin_id: Option<Uuid>,
) -> Result<PaymentRow, AppError> {
    sqlx::query_as::<_, PaymentRow>(
        "SELECT * FROM payments WHERE id = $1 AND ($2::uuid IS NULL OR admin_id = $2)",
    )
    .bind(id)
    .bind(admin_id)
    .fetch_optional(&state.db)
    .await?
    .ok_or_else(|| AppError::not_found("Payment", id))
}

async fn list_payments(
    state: &AppState,
    admin_id: Option<Uuid>,
    student_id: Option<Uuid>,
) -> Result<Vec<PaymentRow>, AppError> {
    Ok(sqlx::query_as::<_, PaymentRow>(
        r#"
        SELECT * FROM payments
        WHERE ($1::uuid IS NULL OR admin_id = $1)
          AND ($2::uuid IS NULL OR student_id = $2)
        ORDER BY COALESCE(end_date, due_date, created_at) DESC
        "#,
    )
    .bind(admin_id)
    .bind(student_id)
    .fetch_all(&state.db)
    .await?)
}

fn validate_rate(rate: Option<i64>) -> Result<Option<i64>, AppError> {
    rate.map(|r| non_negative("penalty_per_day", r)).transpose()
}

// ────────────────────────────────────────────────────────────────────────────
// Handlers
// ────────────────────────────────────────────────────────────────────────────

/// GET /api/payments
///
/// The `status` filter matches the displayed status, so `?status=overdue`
/// also returns pending payments whose end date has passed.
pub async fn handle_list_payments(
    State(state): State<AppState>,
    scope: TenantScope,
    Query(params): Query<PaymentListQuery>,
) -> Result<Json<Vec<PaymentView>>, AppError> {
    let now = Utc::now();
    let rate = state.config.penalty_per_day;
    let views = list_payments(&state, scope.admin_id(), params.student_id)
        .await?
        .into_iter()
        .map(|p| PaymentView::new(p, rate, now))
        .filter(|v| params.status.map_or(true, |s| v.penalty.display_status == s))
        .collect();
    Ok(Json(views))
}

/// GET /api/payments/summary
pub async fn handle_payment_summary(
    State(state): State<AppState>,
    scope: TenantScope,
    Query(params): Query<PaymentListQuery>,
) -> Result<Json<PaymentSummary>, AppError> {
    let payments = list_payments(&state, scope.admin_id(), params.student_id).await?;
    Ok(Json(summarize(&payments, state.config.penalty_per_day, Utc::now())))
}

/// POST /api/payments
pub async fn handle_create_payment(
    State(state): State<AppState>,
    scope: TenantScope,
    Json(req): Json<CreatePaymentRequest>,
) -> Result<(StatusCode, Json<PaymentView>), AppError> {
    let admin_id = scope.owner_for_create(req.admin_id)?;
    let amount = non_negative("amount", req.amount)?;
    let penalty_per_day = validate_rate(req.penalty_per_day)?;
    let student = fetch_student(&state.db, req.student_id, Some(admin_id)).await?;

    let status = req.status.unwrap_or(PaymentStatus::Pending);
    let paid_at = (status == PaymentStatus::Paid).then(Utc::now);

    let payment = sqlx::query_as::<_, PaymentRow>(
        r#"
        INSERT INTO payments
            (id, admin_id, student_id, amount, status, start_date, end_date,
             due_date, penalty_per_day, paid_at, note)
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
        RETURNING *
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(admin_id)
    .bind(student.id)
    .bind(amount)
    .bind(status.as_str())
    .bind(req.start_date)
    .bind(req.end_date)
    .bind(req.due_date)
    .bind(penalty_per_day)
    .bind(paid_at)
    .bind(optional_text(req.note))
    .fetch_one(&state.db)
    .await?;

    tracing::info!(
        "Created payment {} of {} for student {}",
        payment.id,
        payment.amount,
        student.id
    );

    let text = if status == PaymentStatus::Paid {
        messages::payment_received(&student.full_name, amount)
    } else {
        messages::payment_created(&student.full_name, amount, payment.effective_end())
    };
    notify_student_parents(&state, admin_id, student.id, text);

    let view = PaymentView::new(payment, state.config.penalty_per_day, Utc::now());
    Ok((StatusCode::CREATED, Json(view)))
}

/// GET /api/payments/:id
pub async fn handle_get_payment(
    State(state): State<AppState>,
    scope: TenantScope,
    Path(id): Path<Uuid>,
) -> Result<Json<PaymentView>, AppError> {
    let payment = fetch_payment(&state, id, scope.admin_id()).await?;
    Ok(Json(PaymentView::new(payment, state.config.penalty_per_day, Utc::now())))
}

/// PUT /api/payments/:id
///
/// Moving a payment to `paid` stamps `paid_at` and notifies the parents;
/// moving it away from `paid` clears the stamp.
pub async fn handle_update_payment(
    State(state): State<AppState>,
    scope: TenantScope,
    Path(id): Path<Uuid>,
    Json(req): Json<UpdatePaymentRequest>,
) -> Result<Json<PaymentView>, AppError> {
    let existing = fetch_payment(&state, id, scope.admin_id()).await?;
    let amount = req.amount.map(|a| non_negative("amount", a)).transpose()?;
    let penalty_per_day = validate_rate(req.penalty_per_day)?;

    let was_paid = existing.parsed_status() == PaymentStatus::Paid;
    let new_status = req.status.unwrap_or_else(|| existing.parsed_status());
    let now_paid = new_status == PaymentStatus::Paid;
    let paid_at = match (was_paid, now_paid) {
        (false, true) => Some(Utc::now()),
        (true, true) => existing.paid_at,
        (_, false) => None,
    };

    let payment = sqlx::query_as::<_, PaymentRow>(
        r#"
        UPDATE payments
        SET amount = COALESCE($2, amount),
            status = $3,
            start_date = COALESCE($4, start_date),
            end_date = COALESCE($5, end_date),
            due_date = COALESCE($6, due_date),
            penalty_per_day = COALESCE($7, penalty_per_day),
            note = COALESCE($8, note),
            paid_at = $9
        WHERE id = $1
        RETURNING *
        "#,
    )
    .bind(id)
    .bind(amount)
    .bind(new_status.as_str())
    .bind(req.start_date)
    .bind(req.end_date)
    .bind(req.due_date)
    .bind(penalty_per_day)
    .bind(optional_text(req.note))
    .bind(paid_at)
    .fetch_one(&state.db)
    .await?;

    if !was_paid && now_paid {
        let student = fetch_student(&state.db, payment.student_id, Some(payment.admin_id)).await?;
        notify_student_parents(
            &state,
            payment.admin_id,
            student.id,
            messages::payment_received(&student.full_name, payment.amount),
        );
    }

    Ok(Json(PaymentView::new(payment, state.config.penalty_per_day, Utc::now())))
}

/// DELETE /api/payments/:id
pub async fn handle_delete_payment(
    State(state): State<AppState>,
    scope: TenantScope,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, AppError> {
    let result =
        sqlx::query("DELETE FROM payments WHERE id = $1 AND ($2::uuid IS NULL OR admin_id = $2)")
            .bind(id)
            .bind(scope.admin_id())
            .execute(&state.db)
            .await?;
    if result.rows_affected() == 0 {
        return Err(AppError::not_found("Payment", id));
    }
    Ok(StatusCode::NO_CONTENT)
}

/// POST /api/payments/reminders
///
/// Scans unpaid payments and notifies parents of every one that is due
/// soon or overdue. Meant to be hit once a day by an external scheduler.
pub async fn handle_send_reminders(
    State(state): State<AppState>,
    scope: TenantScope,
) -> Result<Json<ReminderRunResponse>, AppError> {
    let rows = sqlx::query_as::<_, UnpaidPaymentRow>(
        r#"
        SELECT p.*, s.full_name AS student_name
        FROM payments p
        JOIN students s ON s.id = p.student_id
        WHERE p.status <> 'paid'
          AND ($1::uuid IS NULL OR p.admin_id = $1)
        "#,
    )
    .bind(scope.admin_id())
    .fetch_all(&state.db)
    .await?;

    let now = Utc::now();
    let mut response = ReminderRunResponse {
        scanned: rows.len(),
        due_soon: 0,
        overdue: 0,
    };

    for UnpaidPaymentRow {
        payment,
        student_name,
    } in rows
    {
        let text = match reminder_for(&payment, state.config.penalty_per_day, now) {
            Some(Reminder::DueSoon { days_left }) => {
                response.due_soon += 1;
                messages::payment_due_soon(&student_name, payment.amount, days_left)
            }
            Some(Reminder::Overdue {
                overdue_days,
                penalty_amount,
                total_due,
            }) => {
                response.overdue += 1;
                messages::payment_overdue(&student_name, overdue_days, penalty_amount, total_due)
            }
            None => continue,
        };
        notify_student_parents(&state, payment.admin_id, payment.student_id, text);
    }

    tracing::info!(
        "Reminder run: scanned={} due_soon={} overdue={}",
        response.scanned,
        response.due_soon,
        response.overdue
    );
    Ok(Json(response))
}
