// src/services/payroll.rs

use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use sqlx::SqlitePool;
use tracing::info;

use crate::errors::{AppError, AppResult};
use crate::models::{money_param, Approval, Payroll, WorkflowStatus};
use crate::store::Store;

/// Statutory contribution rates as percentages. EPF and SOCSO/EIS carry
/// separate employer and employee sides; PCB is the monthly tax deduction
/// withheld from the employee only.
#[derive(Debug, Clone)]
pub struct StatutoryRates {
    pub employee_epf: Decimal,
    pub employer_epf: Decimal,
    pub employee_socso: Decimal,
    pub employer_socso: Decimal,
    pub employee_eis: Decimal,
    pub employer_eis: Decimal,
    pub pcb: Decimal,
}

impl Default for StatutoryRates {
    fn default() -> Self {
        StatutoryRates {
            employee_epf: dec!(11),
            employer_epf: dec!(13),
            employee_socso: dec!(0.5),
            employer_socso: dec!(1.75),
            employee_eis: dec!(0.2),
            employer_eis: dec!(0.2),
            pcb: dec!(0),
        }
    }
}

pub struct PayrollBreakdown {
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
}

pub struct PayrollService {
    pool: SqlitePool,
}

impl PayrollService {
    pub fn new(store: &Store) -> Self {
        PayrollService {
            pool: store.pool().clone(),
        }
    }

    /// Pure calculation; every line is rounded to the stored two-decimal
    /// scale so the persisted record sums exactly.
    pub fn calculate(
        basic_salary: Decimal,
        allowances: Decimal,
        rates: &StatutoryRates,
    ) -> PayrollBreakdown {
        let hundred = dec!(100);
        let gross_pay = basic_salary + allowances;
        let line = |rate: Decimal| (gross_pay * rate / hundred).round_dp(2);

        let employee_epf = line(rates.employee_epf);
        let employer_epf = line(rates.employer_epf);
        let employee_socso = line(rates.employee_socso);
        let employer_socso = line(rates.employer_socso);
        let employee_eis = line(rates.employee_eis);
        let employer_eis = line(rates.employer_eis);
        let pcb_tax = line(rates.pcb);

        let employee_deductions = employee_epf + employee_socso + employee_eis + pcb_tax;
        let net_pay = (gross_pay - employee_deductions).max(dec!(0));

        PayrollBreakdown {
            basic_salary,
            allowances,
            employer_epf,
            employee_epf,
            employer_socso,
            employee_socso,
            employer_eis,
            employee_eis,
            pcb_tax,
            gross_pay,
            net_pay,
        }
    }

    /// One record per employee per month; the unique index on
    /// (employee_id, month, year) rejects a second generation for the same
    /// period as a unique violation.
    pub async fn generate(
        &self,
        employee_id: &str,
        month: i64,
        year: i64,
        basic_salary: Decimal,
        allowances: Decimal,
        rates: &StatutoryRates,
    ) -> AppResult<Payroll> {
        if !(1..=12).contains(&month) {
            return Err(AppError::Validation(format!("invalid month {month}")));
        }
        let b = Self::calculate(basic_salary, allowances, rates);
        let payroll = sqlx::query_as::<_, Payroll>(
            "INSERT INTO payrolls (
                employee_id, month, year,
                basic_salary, allowances,
                employer_epf, employee_epf,
                employer_socso, employee_socso,
                employer_eis, employee_eis,
                pcb_tax, gross_pay, net_pay
             ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
             RETURNING *",
        )
        .bind(employee_id)
        .bind(month)
        .bind(year)
        .bind(money_param(b.basic_salary))
        .bind(money_param(b.allowances))
        .bind(money_param(b.employer_epf))
        .bind(money_param(b.employee_epf))
        .bind(money_param(b.employer_socso))
        .bind(money_param(b.employee_socso))
        .bind(money_param(b.employer_eis))
        .bind(money_param(b.employee_eis))
        .bind(money_param(b.pcb_tax))
        .bind(money_param(b.gross_pay))
        .bind(money_param(b.net_pay))
        .fetch_one(&self.pool)
        .await
        .map_err(|e| AppError::from_dml("payrolls", e))?;
        info!(
            payroll_id = payroll.id,
            employee_id = %payroll.employee_id,
            month, year,
            "payroll generated"
        );
        Ok(payroll)
    }

    pub async fn get(&self, id: i64) -> AppResult<Payroll> {
        sqlx::query_as::<_, Payroll>("SELECT * FROM payrolls WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("payrolls {id}")))
    }

    pub async fn for_period(&self, month: i64, year: i64) -> AppResult<Vec<Payroll>> {
        let rows = sqlx::query_as::<_, Payroll>(
            "SELECT * FROM payrolls WHERE month = ? AND year = ? ORDER BY employee_id",
        )
        .bind(month)
        .bind(year)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }

    /// Approval rows cascade away with their payroll; the action-taker link
    /// is NoAction so an approver's history never blocks other records.
    pub async fn record_approval(
        &self,
        payroll_id: i64,
        employee_id: &str,
        action: &str,
        action_by: &str,
        status: WorkflowStatus,
        remarks: Option<&str>,
    ) -> AppResult<Approval> {
        let row = sqlx::query_as::<_, Approval>(
            "INSERT INTO approvals (payroll_id, employee_id, action, action_by, status, remarks, acted_at)
             VALUES (?, ?, ?, ?, ?, ?, ?) RETURNING *",
        )
        .bind(payroll_id)
        .bind(employee_id)
        .bind(action)
        .bind(action_by)
        .bind(status)
        .bind(remarks)
        .bind(chrono::Utc::now())
        .fetch_one(&self.pool)
        .await
        .map_err(|e| AppError::from_dml("approvals", e))?;
        Ok(row)
    }

    pub async fn approvals(&self, payroll_id: i64) -> AppResult<Vec<Approval>> {
        let rows = sqlx::query_as::<_, Approval>(
            "SELECT * FROM approvals WHERE payroll_id = ? ORDER BY id",
        )
        .bind(payroll_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }

    pub async fn mark_paid(&self, id: i64) -> AppResult<Payroll> {
        sqlx::query_as::<_, Payroll>(
            "UPDATE payrolls SET payment_status = 'Paid'
             WHERE id = ? AND payment_status = 'Pending'
             RETURNING *",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("pending payrolls {id}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn statutory_breakdown_sums_exactly() {
        let b = PayrollService::calculate(dec!(5000), dec!(500), &StatutoryRates::default());
        assert_eq!(b.gross_pay, dec!(5500));
        assert_eq!(b.employee_epf, dec!(605.00));
        assert_eq!(b.employer_epf, dec!(715.00));
        assert_eq!(b.employee_socso, dec!(27.50));
        assert_eq!(b.employer_socso, dec!(96.25));
        assert_eq!(b.employee_eis, dec!(11.00));
        assert_eq!(b.employer_eis, dec!(11.00));
        assert_eq!(
            b.net_pay,
            b.gross_pay - b.employee_epf - b.employee_socso - b.employee_eis - b.pcb_tax
        );
    }

    #[test]
    fn net_pay_never_goes_negative() {
        let rates = StatutoryRates {
            pcb: dec!(150),
            ..StatutoryRates::default()
        };
        let b = PayrollService::calculate(dec!(100), dec!(0), &rates);
        assert_eq!(b.net_pay, dec!(0));
    }
}
