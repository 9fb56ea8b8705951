// src/services/leave.rs

use chrono::{Datelike, Utc};
use sqlx::SqlitePool;
use tracing::info;

use crate::errors::{AppError, AppResult};
use crate::models::{Leave, LeaveDetail, LeaveType, NewLeave, UnpaidLeaveRequest, WorkflowStatus};
use crate::store::Store;

/// Leave requests, supporting documents, and the unpaid-leave overflow path.
pub struct LeaveService {
    pool: SqlitePool,
}

impl LeaveService {
    pub fn new(store: &Store) -> Self {
        LeaveService {
            pool: store.pool().clone(),
        }
    }

    // ─── Leave types ──────────────────────────────────────────────────────────

    pub async fn create_leave_type(
        &self,
        name: &str,
        is_paid: bool,
        default_days: i64,
    ) -> AppResult<LeaveType> {
        let row = sqlx::query_as::<_, LeaveType>(
            "INSERT INTO leave_types (name, is_paid, default_days) VALUES (?, ?, ?) RETURNING *",
        )
        .bind(name)
        .bind(is_paid)
        .bind(default_days)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| AppError::from_dml("leave_types", e))?;
        Ok(row)
    }

    /// Restrict-guarded against existing leaves and unpaid requests.
    pub async fn delete_leave_type(&self, id: i64) -> AppResult<()> {
        let result = sqlx::query("DELETE FROM leave_types WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(|e| AppError::from_dml("leave_types", e))?;
        if result.rows_affected() == 0 {
            return Err(AppError::NotFound(format!("leave_types {id}")));
        }
        Ok(())
    }

    pub async fn leave_types(&self) -> AppResult<Vec<LeaveType>> {
        let rows = sqlx::query_as::<_, LeaveType>("SELECT * FROM leave_types ORDER BY name")
            .fetch_all(&self.pool)
            .await?;
        Ok(rows)
    }

    // ─── Leaves ───────────────────────────────────────────────────────────────

    pub async fn request(&self, new: NewLeave) -> AppResult<Leave> {
        if new.end_date < new.start_date {
            return Err(AppError::Validation(
                "leave end date precedes its start date".to_string(),
            ));
        }
        if new.total_days <= 0.0 {
            return Err(AppError::Validation(
                "leave must cover at least half a day".to_string(),
            ));
        }
        let leave = sqlx::query_as::<_, Leave>(
            "INSERT INTO leaves (employee_id, leave_type_id, start_date, end_date, total_days, reason)
             VALUES (?, ?, ?, ?, ?, ?) RETURNING *",
        )
        .bind(&new.employee_id)
        .bind(new.leave_type_id)
        .bind(new.start_date)
        .bind(new.end_date)
        .bind(new.total_days)
        .bind(&new.reason)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| AppError::from_dml("leaves", e))?;
        info!(leave_id = leave.id, employee_id = %leave.employee_id, "leave requested");
        Ok(leave)
    }

    pub async fn get(&self, id: i64) -> AppResult<Leave> {
        sqlx::query_as::<_, Leave>("SELECT * FROM leaves WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("leaves {id}")))
    }

    pub async fn approve(&self, id: i64, approved_by: &str) -> AppResult<Leave> {
        self.decide(id, WorkflowStatus::Approved, approved_by).await
    }

    pub async fn reject(&self, id: i64, rejected_by: &str) -> AppResult<Leave> {
        self.decide(id, WorkflowStatus::Rejected, rejected_by).await
    }

    async fn decide(&self, id: i64, status: WorkflowStatus, actor: &str) -> AppResult<Leave> {
        // Guarded in the WHERE clause so concurrent deciders cannot both win.
        let leave = sqlx::query_as::<_, Leave>(
            "UPDATE leaves SET status = ?, approval_date = ?, approved_by = ?
             WHERE id = ? AND status = 'Pending' RETURNING *",
        )
        .bind(status)
        .bind(Utc::now())
        .bind(actor)
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        match leave {
            Some(leave) => Ok(leave),
            None => {
                self.get(id).await?;
                Err(AppError::Validation(format!(
                    "leave {id} has already been decided"
                )))
            }
        }
    }

    pub async fn add_detail(
        &self,
        leave_id: i64,
        leave_type_id: i64,
        document_path: &str,
    ) -> AppResult<LeaveDetail> {
        let row = sqlx::query_as::<_, LeaveDetail>(
            "INSERT INTO leave_details (leave_id, leave_type_id, document_path)
             VALUES (?, ?, ?) RETURNING *",
        )
        .bind(leave_id)
        .bind(leave_type_id)
        .bind(document_path)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| AppError::from_dml("leave_details", e))?;
        Ok(row)
    }

    // ─── Unpaid leave ─────────────────────────────────────────────────────────

    /// Days already approved this calendar year against the type's paid
    /// entitlement. Anything the new request pushes past the entitlement is
    /// recorded as excess and flows to payroll as an unpaid deduction.
    pub async fn request_unpaid(&self, new: NewLeave) -> AppResult<UnpaidLeaveRequest> {
        if new.end_date < new.start_date {
            return Err(AppError::Validation(
                "leave end date precedes its start date".to_string(),
            ));
        }
        let leave_type = sqlx::query_as::<_, LeaveType>("SELECT * FROM leave_types WHERE id = ?")
            .bind(new.leave_type_id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("leave_types {}", new.leave_type_id)))?;

        let year = new.start_date.year();
        let taken: f64 = sqlx::query_scalar(
            "SELECT CAST(COALESCE(SUM(total_days), 0) AS REAL)
             FROM leaves
             WHERE employee_id = ? AND leave_type_id = ? AND status = 'Approved'
               AND CAST(strftime('%Y', start_date) AS INTEGER) = ?",
        )
        .bind(&new.employee_id)
        .bind(new.leave_type_id)
        .bind(year)
        .fetch_one(&self.pool)
        .await?;

        let entitlement = leave_type.default_days as f64;
        let excess = (taken + new.total_days - entitlement).max(0.0);

        let request = sqlx::query_as::<_, UnpaidLeaveRequest>(
            "INSERT INTO unpaid_leave_requests
                (employee_id, leave_type_id, start_date, end_date, excess_days, reason)
             VALUES (?, ?, ?, ?, ?, ?) RETURNING *",
        )
        .bind(&new.employee_id)
        .bind(new.leave_type_id)
        .bind(new.start_date)
        .bind(new.end_date)
        .bind(excess)
        .bind(&new.reason)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| AppError::from_dml("unpaid_leave_requests", e))?;
        info!(
            request_id = request.id,
            excess_days = request.excess_days,
            "unpaid leave requested"
        );
        Ok(request)
    }

    pub async fn review_unpaid(
        &self,
        id: i64,
        status: WorkflowStatus,
        reviewed_by: &str,
    ) -> AppResult<UnpaidLeaveRequest> {
        let request = sqlx::query_as::<_, UnpaidLeaveRequest>(
            "UPDATE unpaid_leave_requests
             SET status = ?, reviewed_by = ?, reviewed_at = ?
             WHERE id = ? AND status = 'Pending'
             RETURNING *",
        )
        .bind(status)
        .bind(reviewed_by)
        .bind(Utc::now())
        .bind(id)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("pending unpaid_leave_requests {id}")))?;
        Ok(request)
    }
}
