// src/services/employee.rs

use chrono::NaiveDate;
use sqlx::SqlitePool;
use tracing::info;
use uuid::Uuid;

use crate::errors::{AppError, AppResult};
use crate::models::{
    BankInformation, EmergencyContact, Employee, EmployeeDocument, JobRole, NewEmployee,
};
use crate::store::Store;

/// Employee aggregate plus its Restrict-guarded lookup tables. Lookup deletes
/// are allowed to fail: the storage layer rejects removing a bank record,
/// emergency contact or job role any employee still points at, and the
/// rejection surfaces as `AppError::ReferentialConstraint`.
pub struct EmployeeService {
    pool: SqlitePool,
}

impl EmployeeService {
    pub fn new(store: &Store) -> Self {
        EmployeeService {
            pool: store.pool().clone(),
        }
    }

    // ─── Lookups ──────────────────────────────────────────────────────────────

    pub async fn create_bank_information(
        &self,
        bank_name: &str,
        account_number: &str,
        account_holder: &str,
    ) -> AppResult<BankInformation> {
        let row = sqlx::query_as::<_, BankInformation>(
            "INSERT INTO bank_information (bank_name, account_number, account_holder)
             VALUES (?, ?, ?) RETURNING *",
        )
        .bind(bank_name)
        .bind(account_number)
        .bind(account_holder)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| AppError::from_dml("bank_information", e))?;
        Ok(row)
    }

    pub async fn delete_bank_information(&self, id: i64) -> AppResult<()> {
        let result = sqlx::query("DELETE FROM bank_information WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(|e| AppError::from_dml("bank_information", e))?;
        if result.rows_affected() == 0 {
            return Err(AppError::NotFound(format!("bank_information {id}")));
        }
        Ok(())
    }

    pub async fn create_emergency_contact(
        &self,
        name: &str,
        relationship: &str,
        phone: &str,
    ) -> AppResult<EmergencyContact> {
        let row = sqlx::query_as::<_, EmergencyContact>(
            "INSERT INTO emergency_contacts (name, relationship, phone)
             VALUES (?, ?, ?) RETURNING *",
        )
        .bind(name)
        .bind(relationship)
        .bind(phone)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| AppError::from_dml("emergency_contacts", e))?;
        Ok(row)
    }

    pub async fn delete_emergency_contact(&self, id: i64) -> AppResult<()> {
        let result = sqlx::query("DELETE FROM emergency_contacts WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(|e| AppError::from_dml("emergency_contacts", e))?;
        if result.rows_affected() == 0 {
            return Err(AppError::NotFound(format!("emergency_contacts {id}")));
        }
        Ok(())
    }

    pub async fn create_job_role(&self, title: &str, department: Option<&str>) -> AppResult<JobRole> {
        let row = sqlx::query_as::<_, JobRole>(
            "INSERT INTO job_roles (title, department) VALUES (?, ?) RETURNING *",
        )
        .bind(title)
        .bind(department)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| AppError::from_dml("job_roles", e))?;
        Ok(row)
    }

    pub async fn delete_job_role(&self, id: i64) -> AppResult<()> {
        let result = sqlx::query("DELETE FROM job_roles WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(|e| AppError::from_dml("job_roles", e))?;
        if result.rows_affected() == 0 {
            return Err(AppError::NotFound(format!("job_roles {id}")));
        }
        Ok(())
    }

    // ─── Employees ────────────────────────────────────────────────────────────

    pub async fn create(&self, new: NewEmployee) -> AppResult<Employee> {
        if new.ic.is_none() && new.passport_no.is_none() {
            return Err(AppError::Validation(
                "an employee needs an IC number or a passport number".to_string(),
            ));
        }
        let id = Uuid::new_v4().to_string();
        let employee = sqlx::query_as::<_, Employee>(
            "INSERT INTO employees (
                id, full_name, email, phone, password_hash, ic, passport_no,
                date_joined, epf_no, income_tax_no,
                bank_information_id, emergency_contact_id, job_role_id
             ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
             RETURNING *",
        )
        .bind(&id)
        .bind(&new.full_name)
        .bind(&new.email)
        .bind(&new.phone)
        .bind(&new.password_hash)
        .bind(&new.ic)
        .bind(&new.passport_no)
        .bind(new.date_joined)
        .bind(&new.epf_no)
        .bind(&new.income_tax_no)
        .bind(new.bank_information_id)
        .bind(new.emergency_contact_id)
        .bind(new.job_role_id)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| AppError::from_dml("employees", e))?;
        info!(employee_id = %employee.id, "employee created");
        Ok(employee)
    }

    pub async fn get(&self, id: &str) -> AppResult<Employee> {
        sqlx::query_as::<_, Employee>("SELECT * FROM employees WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("employees {id}")))
    }

    pub async fn list(&self) -> AppResult<Vec<Employee>> {
        let rows = sqlx::query_as::<_, Employee>("SELECT * FROM employees ORDER BY full_name")
            .fetch_all(&self.pool)
            .await?;
        Ok(rows)
    }

    /// Deleting an employee cascades to their claims, leaves, payroll records,
    /// documents and unpaid leave requests at the storage layer.
    pub async fn delete(&self, id: &str) -> AppResult<()> {
        let result = sqlx::query("DELETE FROM employees WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(|e| AppError::from_dml("employees", e))?;
        if result.rows_affected() == 0 {
            return Err(AppError::NotFound(format!("employees {id}")));
        }
        info!(employee_id = %id, "employee deleted");
        Ok(())
    }

    pub async fn confirm(&self, id: &str, confirmation_date: NaiveDate) -> AppResult<Employee> {
        sqlx::query_as::<_, Employee>(
            "UPDATE employees
             SET confirmation_status = 'Confirmed', confirmation_date = ?
             WHERE id = ?
             RETURNING *",
        )
        .bind(confirmation_date)
        .bind(id)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("employees {id}")))
    }

    /// Links an identity account. The unique index on auth_user_id means a
    /// second employee linking the same account fails as a unique violation.
    pub async fn link_auth_user(&self, id: &str, auth_user_id: &str) -> AppResult<Employee> {
        sqlx::query_as::<_, Employee>(
            "UPDATE employees SET auth_user_id = ? WHERE id = ? RETURNING *",
        )
        .bind(auth_user_id)
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| AppError::from_dml("employees", e))?
        .ok_or_else(|| AppError::NotFound(format!("employees {id}")))
    }

    pub async fn add_document(
        &self,
        employee_id: &str,
        file_name: &str,
        file_path: &str,
        file_size: Option<i64>,
    ) -> AppResult<EmployeeDocument> {
        let row = sqlx::query_as::<_, EmployeeDocument>(
            "INSERT INTO employee_documents (employee_id, file_name, file_path, file_size)
             VALUES (?, ?, ?, ?) RETURNING *",
        )
        .bind(employee_id)
        .bind(file_name)
        .bind(file_path)
        .bind(file_size)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| AppError::from_dml("employee_documents", e))?;
        Ok(row)
    }

    pub async fn documents(&self, employee_id: &str) -> AppResult<Vec<EmployeeDocument>> {
        let rows = sqlx::query_as::<_, EmployeeDocument>(
            "SELECT * FROM employee_documents WHERE employee_id = ? ORDER BY uploaded_at",
        )
        .bind(employee_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }

    /// Employees left holding the 000000-00-0000 IC sentinel after the
    /// passport revision was reverted. These need manual re-entry.
    pub async fn with_sentinel_ic(&self) -> AppResult<Vec<Employee>> {
        let rows = sqlx::query_as::<_, Employee>(
            "SELECT * FROM employees WHERE ic = '000000-00-0000' ORDER BY full_name",
        )
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }
}
