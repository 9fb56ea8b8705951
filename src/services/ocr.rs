// src/services/ocr.rs

use chrono::NaiveDate;
use rust_decimal::Decimal;
use sqlx::SqlitePool;
use tracing::info;

use crate::errors::{AppError, AppResult};
use crate::models::{money_param, OcrSubmission};
use crate::store::Store;

/// Receipt OCR staging. Submissions carry no foreign keys; they are promoted
/// into claims by hand and must survive whatever happens around them.
pub struct OcrService {
    pool: SqlitePool,
}

impl OcrService {
    pub fn new(store: &Store) -> Self {
        OcrService {
            pool: store.pool().clone(),
        }
    }

    pub async fn stage(&self, file_path: &str, submitted_by: Option<&str>) -> AppResult<OcrSubmission> {
        let row = sqlx::query_as::<_, OcrSubmission>(
            "INSERT INTO process_ocr_submissions (file_path, submitted_by)
             VALUES (?, ?) RETURNING *",
        )
        .bind(file_path)
        .bind(submitted_by)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| AppError::from_dml("process_ocr_submissions", e))?;
        info!(submission_id = row.id, "ocr submission staged");
        Ok(row)
    }

    pub async fn complete(
        &self,
        id: i64,
        extracted_amount: Decimal,
        extracted_date: Option<NaiveDate>,
    ) -> AppResult<OcrSubmission> {
        sqlx::query_as::<_, OcrSubmission>(
            "UPDATE process_ocr_submissions
             SET ocr_status = 'Processed', extracted_amount = ?, extracted_date = ?
             WHERE id = ? AND ocr_status = 'Pending'
             RETURNING *",
        )
        .bind(money_param(extracted_amount))
        .bind(extracted_date)
        .bind(id)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("pending process_ocr_submissions {id}")))
    }

    pub async fn fail(&self, id: i64) -> AppResult<OcrSubmission> {
        sqlx::query_as::<_, OcrSubmission>(
            "UPDATE process_ocr_submissions
             SET ocr_status = 'Failed'
             WHERE id = ? AND ocr_status = 'Pending'
             RETURNING *",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("pending process_ocr_submissions {id}")))
    }

    pub async fn list_pending(&self) -> AppResult<Vec<OcrSubmission>> {
        let rows = sqlx::query_as::<_, OcrSubmission>(
            "SELECT * FROM process_ocr_submissions
             WHERE ocr_status = 'Pending'
             ORDER BY created_at",
        )
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }
}
