// src/services/claim.rs

use chrono::Utc;
use rust_decimal::Decimal;
use sqlx::SqlitePool;
use tracing::info;

use crate::errors::{AppError, AppResult};
use crate::models::{money_param, Claim, ClaimDetail, ClaimType, NewClaim, WorkflowStatus};
use crate::store::Store;

/// Expense claims and their detail lines. Claims soft-delete; approved
/// history must survive removal from the working set, so deletion only flips
/// is_deleted and the active listings filter on it.
pub struct ClaimService {
    pool: SqlitePool,
}

impl ClaimService {
    pub fn new(store: &Store) -> Self {
        ClaimService {
            pool: store.pool().clone(),
        }
    }

    // ─── Claim types ──────────────────────────────────────────────────────────

    pub async fn create_claim_type(
        &self,
        name: &str,
        description: Option<&str>,
    ) -> AppResult<ClaimType> {
        let row = sqlx::query_as::<_, ClaimType>(
            "INSERT INTO claim_types (name, description) VALUES (?, ?) RETURNING *",
        )
        .bind(name)
        .bind(description)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| AppError::from_dml("claim_types", e))?;
        Ok(row)
    }

    /// Restrict-guarded: fails while any claim detail references the type.
    pub async fn delete_claim_type(&self, id: i64) -> AppResult<()> {
        let result = sqlx::query("DELETE FROM claim_types WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(|e| AppError::from_dml("claim_types", e))?;
        if result.rows_affected() == 0 {
            return Err(AppError::NotFound(format!("claim_types {id}")));
        }
        Ok(())
    }

    pub async fn claim_types(&self) -> AppResult<Vec<ClaimType>> {
        let rows = sqlx::query_as::<_, ClaimType>("SELECT * FROM claim_types ORDER BY name")
            .fetch_all(&self.pool)
            .await?;
        Ok(rows)
    }

    // ─── Claims ───────────────────────────────────────────────────────────────

    /// The insert leaves status out so the storage default ('Pending')
    /// applies; a claim can never be born approved.
    pub async fn submit(&self, new: NewClaim) -> AppResult<Claim> {
        if new.amount < Decimal::ZERO {
            return Err(AppError::Validation(
                "claim amount cannot be negative".to_string(),
            ));
        }
        let claim = sqlx::query_as::<_, Claim>(
            "INSERT INTO claims (employee_id, title, description, amount, receipt_path)
             VALUES (?, ?, ?, ?, ?) RETURNING *",
        )
        .bind(&new.employee_id)
        .bind(&new.title)
        .bind(&new.description)
        .bind(money_param(new.amount))
        .bind(&new.receipt_path)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| AppError::from_dml("claims", e))?;
        info!(claim_id = claim.id, employee_id = %claim.employee_id, "claim submitted");
        Ok(claim)
    }

    pub async fn get(&self, id: i64) -> AppResult<Claim> {
        sqlx::query_as::<_, Claim>("SELECT * FROM claims WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("claims {id}")))
    }

    pub async fn add_detail(
        &self,
        claim_id: i64,
        claim_type_id: i64,
        description: Option<&str>,
        amount: Decimal,
        document_path: Option<&str>,
    ) -> AppResult<ClaimDetail> {
        let row = sqlx::query_as::<_, ClaimDetail>(
            "INSERT INTO claim_details (claim_id, claim_type_id, description, amount, document_path)
             VALUES (?, ?, ?, ?, ?) RETURNING *",
        )
        .bind(claim_id)
        .bind(claim_type_id)
        .bind(description)
        .bind(money_param(amount))
        .bind(document_path)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| AppError::from_dml("claim_details", e))?;
        Ok(row)
    }

    pub async fn details(&self, claim_id: i64) -> AppResult<Vec<ClaimDetail>> {
        let rows = sqlx::query_as::<_, ClaimDetail>(
            "SELECT * FROM claim_details WHERE claim_id = ? ORDER BY id",
        )
        .bind(claim_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }

    pub async fn approve(&self, id: i64, approved_by: &str) -> AppResult<Claim> {
        self.decide(id, WorkflowStatus::Approved, approved_by).await
    }

    pub async fn reject(&self, id: i64, rejected_by: &str) -> AppResult<Claim> {
        self.decide(id, WorkflowStatus::Rejected, rejected_by).await
    }

    async fn decide(&self, id: i64, status: WorkflowStatus, actor: &str) -> AppResult<Claim> {
        // Guarded in the WHERE clause so concurrent deciders cannot both win.
        let claim = sqlx::query_as::<_, Claim>(
            "UPDATE claims SET status = ?, approval_date = ?, approved_by = ?
             WHERE id = ? AND status = 'Pending' RETURNING *",
        )
        .bind(status)
        .bind(Utc::now())
        .bind(actor)
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        match claim {
            Some(claim) => {
                info!(claim_id = id, status = ?claim.status, "claim decided");
                Ok(claim)
            }
            None => {
                self.get(id).await?;
                Err(AppError::Validation(format!(
                    "claim {id} has already been decided"
                )))
            }
        }
    }

    pub async fn soft_delete(&self, id: i64) -> AppResult<()> {
        let result = sqlx::query(
            "UPDATE claims SET is_deleted = 1, deleted_date = ? WHERE id = ? AND is_deleted = 0",
        )
        .bind(Utc::now())
        .bind(id)
        .execute(&self.pool)
        .await?;
        if result.rows_affected() == 0 {
            return Err(AppError::NotFound(format!("claims {id}")));
        }
        Ok(())
    }

    pub async fn list_active(&self, employee_id: &str) -> AppResult<Vec<Claim>> {
        let rows = sqlx::query_as::<_, Claim>(
            "SELECT * FROM claims
             WHERE employee_id = ? AND is_deleted = 0
             ORDER BY submitted_at DESC",
        )
        .bind(employee_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }
}
