// src/services/invoice.rs

use chrono::Utc;
use rust_decimal::Decimal;
use sqlx::SqlitePool;
use tracing::info;

use crate::errors::{AppError, AppResult};
use crate::models::{money_param, Invoice, InvoiceItem, InvoiceStatus, NewInvoice};
use crate::store::Store;

/// Client invoices with line items. The header and its items are written in
/// one transaction; totals are derived from the lines, never trusted from the
/// caller.
pub struct InvoiceService {
    pool: SqlitePool,
}

impl InvoiceService {
    pub fn new(store: &Store) -> Self {
        InvoiceService {
            pool: store.pool().clone(),
        }
    }

    pub async fn create(&self, new: NewInvoice) -> AppResult<Invoice> {
        if new.items.is_empty() {
            return Err(AppError::Validation(
                "an invoice needs at least one line item".to_string(),
            ));
        }

        let mut subtotal = Decimal::ZERO;
        for item in &new.items {
            if item.quantity <= 0 {
                return Err(AppError::Validation(format!(
                    "line '{}' has non-positive quantity",
                    item.description
                )));
            }
            subtotal += (item.unit_price * Decimal::from(item.quantity)).round_dp(2);
        }
        let total_amount = subtotal + new.tax_amount;

        let mut tx = self.pool.begin().await?;
        let invoice = sqlx::query_as::<_, Invoice>(
            "INSERT INTO invoices
                (invoice_number, client_name, client_email, subtotal, tax_amount, total_amount, issued_date)
             VALUES (?, ?, ?, ?, ?, ?, ?) RETURNING *",
        )
        .bind(&new.invoice_number)
        .bind(&new.client_name)
        .bind(&new.client_email)
        .bind(money_param(subtotal))
        .bind(money_param(new.tax_amount))
        .bind(money_param(total_amount))
        .bind(new.issued_date)
        .fetch_one(&mut *tx)
        .await
        .map_err(|e| AppError::from_dml("invoices", e))?;

        for item in &new.items {
            let line_total = (item.unit_price * Decimal::from(item.quantity)).round_dp(2);
            sqlx::query(
                "INSERT INTO invoice_items (invoice_id, description, quantity, unit_price, line_total)
                 VALUES (?, ?, ?, ?, ?)",
            )
            .bind(invoice.id)
            .bind(&item.description)
            .bind(item.quantity)
            .bind(money_param(item.unit_price))
            .bind(money_param(line_total))
            .execute(&mut *tx)
            .await
            .map_err(|e| AppError::from_dml("invoice_items", e))?;
        }
        tx.commit().await?;
        info!(invoice_id = invoice.id, number = %invoice.invoice_number, "invoice created");
        Ok(invoice)
    }

    pub async fn get(&self, id: i64) -> AppResult<Invoice> {
        sqlx::query_as::<_, Invoice>("SELECT * FROM invoices WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("invoices {id}")))
    }

    pub async fn items(&self, invoice_id: i64) -> AppResult<Vec<InvoiceItem>> {
        let rows = sqlx::query_as::<_, InvoiceItem>(
            "SELECT * FROM invoice_items WHERE invoice_id = ? ORDER BY id",
        )
        .bind(invoice_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }

    pub async fn set_status(&self, id: i64, status: InvoiceStatus) -> AppResult<Invoice> {
        sqlx::query_as::<_, Invoice>(
            "UPDATE invoices SET status = ? WHERE id = ? AND is_deleted = 0 RETURNING *",
        )
        .bind(status)
        .bind(id)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("invoices {id}")))
    }

    pub async fn soft_delete(&self, id: i64) -> AppResult<()> {
        let result = sqlx::query(
            "UPDATE invoices SET is_deleted = 1, deleted_date = ? WHERE id = ? AND is_deleted = 0",
        )
        .bind(Utc::now())
        .bind(id)
        .execute(&self.pool)
        .await?;
        if result.rows_affected() == 0 {
            return Err(AppError::NotFound(format!("invoices {id}")));
        }
        Ok(())
    }

    pub async fn list_active(&self) -> AppResult<Vec<Invoice>> {
        let rows = sqlx::query_as::<_, Invoice>(
            "SELECT * FROM invoices WHERE is_deleted = 0 ORDER BY created_at DESC",
        )
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }
}
