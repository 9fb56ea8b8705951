// src/models/mod.rs

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::sqlite::SqliteRow;
use sqlx::{FromRow, Row};

// ─── Money bridge ─────────────────────────────────────────────────────────────

// SQLite has no native decimal type; money columns are declared DECIMAL(18,2),
// which carries NUMERIC affinity. SQLite stores integral amounts (150.0, the
// DEFAULT 0 literal) in the INTEGER storage class, so a fetch must accept both
// classes. Rows go through these helpers so every Decimal in the model layer
// is rounded to the stored scale.

fn decimal_from_f64(raw: f64, column: &str) -> Result<Decimal, sqlx::Error> {
    Decimal::from_f64_retain(raw)
        .map(|d| d.round_dp(2))
        .ok_or_else(|| sqlx::Error::ColumnDecode {
            index: column.to_string(),
            source: format!("value {raw} does not fit a decimal").into(),
        })
}

pub(crate) fn money_column(row: &SqliteRow, column: &str) -> Result<Decimal, sqlx::Error> {
    match row.try_get::<f64, _>(column) {
        Ok(raw) => decimal_from_f64(raw, column),
        Err(sqlx::Error::ColumnDecode { .. }) => {
            let raw: i64 = row.try_get(column)?;
            Ok(Decimal::from(raw))
        }
        Err(err) => Err(err),
    }
}

pub(crate) fn money_column_opt(
    row: &SqliteRow,
    column: &str,
) -> Result<Option<Decimal>, sqlx::Error> {
    match row.try_get::<Option<f64>, _>(column) {
        Ok(raw) => raw.map(|v| decimal_from_f64(v, column)).transpose(),
        Err(sqlx::Error::ColumnDecode { .. }) => {
            let raw: Option<i64> = row.try_get(column)?;
            Ok(raw.map(Decimal::from))
        }
        Err(err) => Err(err),
    }
}

/// Bind-side half of the bridge. Every two-decimal amount has an exact or
/// nearest f64; `to_f64` on a Decimal never returns `None` in practice.
pub fn money_param(amount: Decimal) -> f64 {
    amount.to_f64().unwrap_or_default()
}

// ─── Status enums ─────────────────────────────────────────────────────────────

// Stored as TEXT with the variant name verbatim, matching the column defaults
// in the schema ('Pending', 'Draft').

#[derive(Debug, Clone, Copy, Serialize, Deserialize, sqlx::Type, PartialEq, Eq)]
pub enum WorkflowStatus {
    Pending,
    Approved,
    Rejected,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, sqlx::Type, PartialEq, Eq)]
pub enum PaymentStatus {
    Pending,
    Paid,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, sqlx::Type, PartialEq, Eq)]
pub enum ConfirmationStatus {
    Pending,
    Confirmed,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, sqlx::Type, PartialEq, Eq)]
pub enum InvoiceStatus {
    Draft,
    Sent,
    Paid,
    Cancelled,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, sqlx::Type, PartialEq, Eq)]
pub enum OcrStatus {
    Pending,
    Processed,
    Failed,
}

// ─── Identity ─────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct AuthUser {
    pub id: String,
    pub user_name: String,
    pub normalized_user_name: String,
    pub email: String,
    pub normalized_email: String,
    #[serde(skip_serializing)]
    pub password_hash: String,
    pub created_at: DateTime<Utc>,
}

// ─── Employee aggregate ───────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Employee {
    pub id: String,
    pub full_name: String,
    pub email: String,
    pub phone: Option<String>,
    #[serde(skip_serializing)]
    pub password_hash: String,
    /// National IC; absent for foreign hires identified by passport.
    pub ic: Option<String>,
    pub passport_no: Option<String>,
    pub date_joined: NaiveDate,
    pub epf_no: Option<String>,
    pub income_tax_no: Option<String>,
    pub bank_information_id: i64,
    pub emergency_contact_id: i64,
    pub job_role_id: i64,
    pub auth_user_id: Option<String>,
    pub confirmation_status: ConfirmationStatus,
    pub confirmation_date: Option<NaiveDate>,
    pub created_at: DateTime<Utc>,
}

impl Employee {
    /// Rows carrying the rollback sentinel in place of a real IC; produced
    /// when the passport revision is reverted and flagged for operator review.
    pub fn has_sentinel_ic(&self) -> bool {
        self.ic.as_deref() == Some("000000-00-0000")
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct BankInformation {
    pub id: i64,
    pub bank_name: String,
    pub account_number: String,
    pub account_holder: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct EmergencyContact {
    pub id: i64,
    pub name: String,
    pub relationship: String,
    pub phone: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct JobRole {
    pub id: i64,
    pub title: String,
    pub department: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct EmployeeDocument {
    pub id: i64,
    pub employee_id: String,
    pub file_name: String,
    pub file_path: String,
    pub file_size: Option<i64>,
    pub uploaded_at: DateTime<Utc>,
}

#[derive(Debug, Deserialize)]
pub struct NewEmployee {
    pub full_name: String,
    pub email: String,
    pub phone: Option<String>,
    pub password_hash: String,
    pub ic: Option<String>,
    pub passport_no: Option<String>,
    pub date_joined: NaiveDate,
    pub epf_no: Option<String>,
    pub income_tax_no: Option<String>,
    pub bank_information_id: i64,
    pub emergency_contact_id: i64,
    pub job_role_id: i64,
}

// ─── Claims ───────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct ClaimType {
    pub id: i64,
    pub name: String,
    pub description: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claim {
    pub id: i64,
    pub employee_id: String,
    pub title: String,
    pub description: Option<String>,
    pub amount: Decimal,
    pub currency: String,
    pub receipt_path: Option<String>,
    pub status: WorkflowStatus,
    pub submitted_at: DateTime<Utc>,
    pub approval_date: Option<DateTime<Utc>>,
    pub approved_by: Option<String>,
    pub is_deleted: bool,
    pub deleted_date: Option<DateTime<Utc>>,
}

impl FromRow<'_, SqliteRow> for Claim {
    fn from_row(row: &SqliteRow) -> Result<Self, sqlx::Error> {
        Ok(Claim {
            id: row.try_get("id")?,
            employee_id: row.try_get("employee_id")?,
            title: row.try_get("title")?,
            description: row.try_get("description")?,
            amount: money_column(row, "amount")?,
            currency: row.try_get("currency")?,
            receipt_path: row.try_get("receipt_path")?,
            status: row.try_get("status")?,
            submitted_at: row.try_get("submitted_at")?,
            approval_date: row.try_get("approval_date")?,
            approved_by: row.try_get("approved_by")?,
            is_deleted: row.try_get("is_deleted")?,
            deleted_date: row.try_get("deleted_date")?,
        })
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClaimDetail {
    pub id: i64,
    pub claim_id: i64,
    pub claim_type_id: i64,
    pub description: Option<String>,
    pub amount: Decimal,
    pub document_path: Option<String>,
}

impl FromRow<'_, SqliteRow> for ClaimDetail {
    fn from_row(row: &SqliteRow) -> Result<Self, sqlx::Error> {
        Ok(ClaimDetail {
            id: row.try_get("id")?,
            claim_id: row.try_get("claim_id")?,
            claim_type_id: row.try_get("claim_type_id")?,
            description: row.try_get("description")?,
            amount: money_column(row, "amount")?,
            document_path: row.try_get("document_path")?,
        })
    }
}

#[derive(Debug, Deserialize)]
pub struct NewClaim {
    pub employee_id: String,
    pub title: String,
    pub description: Option<String>,
    pub amount: Decimal,
    pub receipt_path: Option<String>,
}

// ─── Leave ────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct LeaveType {
    pub id: i64,
    pub name: String,
    pub is_paid: bool,
    pub default_days: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Leave {
    pub id: i64,
    pub employee_id: String,
    pub leave_type_id: i64,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    /// Fractional since the half-day revision.
    pub total_days: f64,
    pub reason: Option<String>,
    pub status: WorkflowStatus,
    pub applied_at: DateTime<Utc>,
    pub approved_by: Option<String>,
    pub approval_date: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct LeaveDetail {
    pub id: i64,
    pub leave_id: i64,
    pub leave_type_id: i64,
    pub document_path: String,
    pub uploaded_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct UnpaidLeaveRequest {
    pub id: i64,
    pub employee_id: String,
    pub leave_type_id: i64,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub excess_days: f64,
    pub reason: Option<String>,
    pub status: WorkflowStatus,
    pub requested_at: DateTime<Utc>,
    pub reviewed_by: Option<String>,
    pub reviewed_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Deserialize)]
pub struct NewLeave {
    pub employee_id: String,
    pub leave_type_id: i64,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub total_days: f64,
    pub reason: Option<String>,
}

// ─── Payroll ──────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Payroll {
    pub id: i64,
    pub employee_id: String,
    pub month: i64,
    pub year: i64,
    pub basic_salary: Decimal,
    pub allowances: Decimal,
    pub employer_epf: Decimal,
    pub employee_epf: Decimal,
    pub employer_socso: Decimal,
    pub employee_socso: Decimal,
    pub employer_eis: Decimal,
    pub employee_eis: Decimal,
    pub pcb_tax: Decimal,
    pub gross_pay: Decimal,
    pub net_pay: Decimal,
    pub payment_status: PaymentStatus,
    pub generated_at: DateTime<Utc>,
}

impl FromRow<'_, SqliteRow> for Payroll {
    fn from_row(row: &SqliteRow) -> Result<Self, sqlx::Error> {
        Ok(Payroll {
            id: row.try_get("id")?,
            employee_id: row.try_get("employee_id")?,
            month: row.try_get("month")?,
            year: row.try_get("year")?,
            basic_salary: money_column(row, "basic_salary")?,
            allowances: money_column(row, "allowances")?,
            employer_epf: money_column(row, "employer_epf")?,
            employee_epf: money_column(row, "employee_epf")?,
            employer_socso: money_column(row, "employer_socso")?,
            employee_socso: money_column(row, "employee_socso")?,
            employer_eis: money_column(row, "employer_eis")?,
            employee_eis: money_column(row, "employee_eis")?,
            pcb_tax: money_column(row, "pcb_tax")?,
            gross_pay: money_column(row, "gross_pay")?,
            net_pay: money_column(row, "net_pay")?,
            payment_status: row.try_get("payment_status")?,
            generated_at: row.try_get("generated_at")?,
        })
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Approval {
    pub id: i64,
    pub payroll_id: i64,
    pub employee_id: String,
    pub action: String,
    pub action_by: String,
    pub status: WorkflowStatus,
    pub remarks: Option<String>,
    pub acted_at: Option<DateTime<Utc>>,
}

// ─── Invoicing ────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Invoice {
    pub id: i64,
    pub invoice_number: String,
    pub client_name: String,
    pub client_email: Option<String>,
    pub currency: String,
    pub subtotal: Decimal,
    pub tax_amount: Decimal,
    pub total_amount: Decimal,
    pub status: InvoiceStatus,
    pub issued_date: Option<NaiveDate>,
    pub is_deleted: bool,
    pub deleted_date: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl FromRow<'_, SqliteRow> for Invoice {
    fn from_row(row: &SqliteRow) -> Result<Self, sqlx::Error> {
        Ok(Invoice {
            id: row.try_get("id")?,
            invoice_number: row.try_get("invoice_number")?,
            client_name: row.try_get("client_name")?,
            client_email: row.try_get("client_email")?,
            currency: row.try_get("currency")?,
            subtotal: money_column(row, "subtotal")?,
            tax_amount: money_column(row, "tax_amount")?,
            total_amount: money_column(row, "total_amount")?,
            status: row.try_get("status")?,
            issued_date: row.try_get("issued_date")?,
            is_deleted: row.try_get("is_deleted")?,
            deleted_date: row.try_get("deleted_date")?,
            created_at: row.try_get("created_at")?,
        })
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InvoiceItem {
    pub id: i64,
    pub invoice_id: i64,
    pub description: String,
    pub quantity: i64,
    pub unit_price: Decimal,
    pub line_total: Decimal,
}

impl FromRow<'_, SqliteRow> for InvoiceItem {
    fn from_row(row: &SqliteRow) -> Result<Self, sqlx::Error> {
        Ok(InvoiceItem {
            id: row.try_get("id")?,
            invoice_id: row.try_get("invoice_id")?,
            description: row.try_get("description")?,
            quantity: row.try_get("quantity")?,
            unit_price: money_column(row, "unit_price")?,
            line_total: money_column(row, "line_total")?,
        })
    }
}

#[derive(Debug, Deserialize)]
pub struct NewInvoice {
    pub invoice_number: String,
    pub client_name: String,
    pub client_email: Option<String>,
    pub tax_amount: Decimal,
    pub issued_date: Option<NaiveDate>,
    pub items: Vec<NewInvoiceItem>,
}

#[derive(Debug, Deserialize)]
pub struct NewInvoiceItem {
    pub description: String,
    pub quantity: i64,
    pub unit_price: Decimal,
}

// ─── OCR staging ──────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OcrSubmission {
    pub id: i64,
    pub file_path: String,
    pub extracted_amount: Option<Decimal>,
    pub extracted_date: Option<NaiveDate>,
    pub ocr_status: OcrStatus,
    pub submitted_by: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl FromRow<'_, SqliteRow> for OcrSubmission {
    fn from_row(row: &SqliteRow) -> Result<Self, sqlx::Error> {
        Ok(OcrSubmission {
            id: row.try_get("id")?,
            file_path: row.try_get("file_path")?,
            extracted_amount: money_column_opt(row, "extracted_amount")?,
            extracted_date: row.try_get("extracted_date")?,
            ocr_status: row.try_get("ocr_status")?,
            submitted_by: row.try_get("submitted_by")?,
            created_at: row.try_get("created_at")?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn money_param_round_trips_two_decimal_amounts() {
        let raw = money_param(dec!(1234.56));
        let back = Decimal::from_f64_retain(raw).unwrap().round_dp(2);
        assert_eq!(back, dec!(1234.56));
    }

    #[test]
    fn sentinel_ic_is_flagged() {
        let mut employee = Employee {
            id: "e1".to_string(),
            full_name: "Aisyah Binti Rahman".to_string(),
            email: "aisyah@finserve.test".to_string(),
            phone: None,
            password_hash: "hash".to_string(),
            ic: Some("000000-00-0000".to_string()),
            passport_no: None,
            date_joined: NaiveDate::from_ymd_opt(2023, 9, 1).unwrap(),
            epf_no: None,
            income_tax_no: None,
            bank_information_id: 1,
            emergency_contact_id: 1,
            job_role_id: 1,
            auth_user_id: None,
            confirmation_status: ConfirmationStatus::Pending,
            confirmation_date: None,
            created_at: Utc::now(),
        };
        assert!(employee.has_sentinel_ic());
        employee.ic = Some("901212-10-5678".to_string());
        assert!(!employee.has_sentinel_ic());
    }
}
